use std::fs;
use std::process::Command;

use tempfile::tempdir;

#[test]
fn convert_cli_reads_a_run_file_and_honours_overrides() {
    let tmp = tempdir().expect("temporary directory");
    let input = tmp.path().join("PTV_test");
    fs::create_dir_all(&input).expect("create input dir");

    fs::write(
        tmp.path().join("transcript_gene_map.csv"),
        "chr,transcript,gene,symbol\n1,T1,G1,A\n",
    )
    .expect("write transcript map");
    fs::write(
        tmp.path().join("modules.json"),
        r#"{"GS1": ["G1"], "GS2": "[G1, G5]"}"#,
    )
    .expect("write gene sets");
    fs::write(
        input.join("PTV_test.chr1.REGENIE.setListFile.txt"),
        "T1\t1\t100\trs2,rs1\n",
    )
    .expect("write setlist");

    let run_file = tmp.path().join("run.toml");
    fs::write(
        &run_file,
        r#"
input_dir = "PTV_test"
output_dir = "ignored"
prefix = "PTV_test"
transcript_map = "transcript_gene_map.csv"
chromosomes = ["chr1"]

[gene_sets]
path = "modules.json"
format = "json"
"#,
    )
    .expect("write run file");

    let exe = env!("CARGO_BIN_EXE_genoset");
    let status = Command::new(exe)
        .current_dir(tmp.path())
        .args([
            "convert",
            "--config",
            run_file.to_str().expect("path str"),
            "--output-dir",
            "converted",
            "--no-parallel",
        ])
        .status()
        .expect("run genoset cli");

    assert!(status.success(), "CLI exited with status {status:?}");
    let written = fs::read_to_string(
        tmp.path()
            .join("converted")
            .join("PTV_test.chr1.REGENIE.setListFile.txt"),
    )
    .expect("converted setlist");
    assert_eq!(written, "GS1\t1\t100\trs1,rs2\nGS2\t1\t100\trs1,rs2\n");
    assert!(!tmp.path().join("ignored").exists());
}

#[test]
fn convert_cli_without_required_settings_fails() {
    let tmp = tempdir().expect("temporary directory");
    let exe = env!("CARGO_BIN_EXE_genoset");
    let output = Command::new(exe)
        .current_dir(tmp.path())
        .args(["convert", "--input-dir", "in"])
        .output()
        .expect("run genoset cli");

    assert_eq!(output.status.code(), Some(1));
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stderr.contains("Error: Missing required setting 'output_dir'"), "{stderr}");
}

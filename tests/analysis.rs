use std::fs;

use genoset::regenie::TableFormat;
use genoset::regenie::analyze::analyze;
use genoset::regenie::tables::{read_gene_sets, read_transcript_map};
use genoset::value::Value;
use tempfile::tempdir;

#[test]
fn analysis_reports_duplicates_and_orphans_without_failing() {
    let tmp = tempdir().expect("temporary directory");
    let input = tmp.path().join("PTV_test");
    fs::create_dir_all(&input).expect("create input dir");

    fs::write(
        tmp.path().join("map.csv"),
        "chr,transcript,gene,symbol\n1,T1,G1,A\n1,T2,G2,B\n2,T3,G7,C\n",
    )
    .expect("write map");
    fs::write(
        tmp.path().join("sets.csv"),
        "module,genes\nGS1,\"['G1', 'G2']\"\nGS2,\"['G2', 'G9']\"\n",
    )
    .expect("write gene sets");

    fs::write(
        input.join("PTV_test.chr1.REGENIE.setListFile.txt"),
        "T1\t1\t100\trs1\nT2\t1\t200\trs2\n",
    )
    .expect("write chr1 setlist");
    fs::write(
        input.join("PTV_test.chr2.REGENIE.setListFile.txt"),
        "T1\t1\t100\trs1\nT8\t2\t5\trs8\n",
    )
    .expect("write chr2 setlist");
    fs::write(
        input.join("PTV_test.chr1.REGENIE.annotationFile.txt"),
        "rs1\tT1\tLoF\nrs1\tT1\tLoF\nrs1\tT1\tLoF\nrs2\tT2\tLoF\nrs3\tT2\tLoF\nrs3\tT2\tLoF\n",
    )
    .expect("write annotation");

    let gene_sets = read_gene_sets(&tmp.path().join("sets.csv"), TableFormat::Csv)
        .expect("read gene sets");
    let transcript_map = read_transcript_map(&tmp.path().join("map.csv")).expect("read map");
    let report = analyze(&input, &gene_sets, &transcript_map).expect("analysis");

    assert_eq!(report.setlist_files, 2);
    assert_eq!(report.annotation_files, 1);

    assert_eq!(report.duplicate_snps.distinct_keys(), 2);
    assert_eq!(report.duplicate_snps.rows.height(), 5);
    assert_eq!(report.duplicate_transcripts.distinct_keys(), 1);

    assert_eq!(report.matching_genes, 2);
    assert_eq!(report.gene_set_genes_not_in_map, vec![Value::scalar("G9")]);
    assert_eq!(report.map_genes_not_in_gene_sets, vec![Value::scalar("G7")]);
    assert!(report.duplicate_mapped_transcripts.is_empty());

    assert_eq!(report.setlist_join.left_rows, 4);
    assert_eq!(report.setlist_join.output_rows, 4);
    assert_eq!(report.setlist_join.missing_keys, 1);
    assert_eq!(report.annotation_join.missing_keys, 0);
}

#![deny(unused_variables)]
#![deny(dead_code)]
#![deny(unused_imports)]
#![deny(clippy::no_effect_underscore_binding)]

use clap::{Args, CommandFactory, Parser, Subcommand};
use env_logger::Env;
use std::path::PathBuf;
use std::process;

use genoset::config::{ConfigLayer, RelationSource};
use genoset::regenie::TableFormat;
use genoset::regenie::analyze::analyze;
use genoset::regenie::convert::{self, FileOutcome, TranscriptGeneSets};
use genoset::regenie::tables::{read_gene_sets, read_transcript_map};
use genoset::terms::TraitModuleSpec;
use genoset::terms::traits::{default_output_path, trait_modules_to_tsv};

#[derive(Args)]
pub struct ConvertArgs {
    /// TOML run file; command-line flags override its values
    #[arg(long, value_name = "PATH")]
    pub config: Option<PathBuf>,

    /// Directory holding the per-chromosome REGENIE set files
    #[arg(long, value_name = "DIR")]
    pub input_dir: Option<PathBuf>,

    /// Directory the converted files are written to (created if missing)
    #[arg(long, value_name = "DIR")]
    pub output_dir: Option<PathBuf>,

    /// File name prefix of the inputs, e.g. PTV_test for PTV_test.chr1.REGENIE.setListFile.txt
    #[arg(long)]
    pub prefix: Option<String>,

    /// Transcript-to-gene map (CSV with header: chrom, transcript, gene, gene_symbol)
    #[arg(long, value_name = "PATH")]
    pub transcript_map: Option<PathBuf>,

    /// Gene-set relation: one gene-set id column and one list-of-genes column
    #[arg(long, value_name = "PATH")]
    pub gene_sets: Option<PathBuf>,

    /// Storage format of the gene-set relation
    #[arg(long, value_enum)]
    pub gene_sets_format: Option<TableFormat>,

    /// Chromosomes to convert, comma-separated (default: chr1..chr22)
    #[arg(long, value_delimiter = ',')]
    pub chromosomes: Option<Vec<String>>,

    /// Convert chromosomes in parallel, even if the run file disables it
    #[arg(long, overrides_with = "no_parallel")]
    pub parallel: bool,

    /// Convert chromosomes one after another instead of in parallel
    #[arg(long, overrides_with = "parallel")]
    pub no_parallel: bool,

    /// Show a progress bar over chromosomes
    #[arg(long)]
    pub progress: bool,
}

#[derive(Args)]
pub struct AnalyzeArgs {
    /// Directory holding the REGENIE set files to check
    #[arg(value_name = "INPUT_DIR")]
    pub input_dir: PathBuf,

    /// Gene-set relation: one gene-set id column and one list-of-genes column
    #[arg(long, value_name = "PATH")]
    pub gene_sets: PathBuf,

    /// Storage format of the gene-set relation
    #[arg(long, value_enum, default_value_t = TableFormat::Csv)]
    pub gene_sets_format: TableFormat,

    /// Transcript-to-gene map (CSV with header)
    #[arg(long, value_name = "PATH")]
    pub transcript_map: PathBuf,
}

#[derive(Args)]
pub struct TraitsArgs {
    /// Trait relation: trait id column plus ICD-10 code list column
    #[arg(value_name = "TRAITS_PATH")]
    pub traits: PathBuf,

    /// Individuals table with a column of ICD-10 codes per person
    #[arg(value_name = "INDIVIDUALS_PATH")]
    pub individuals: PathBuf,

    #[arg(long, value_enum, default_value_t = TableFormat::Csv)]
    pub traits_format: TableFormat,

    #[arg(long, value_enum, default_value_t = TableFormat::Csv)]
    pub individuals_format: TableFormat,

    /// Output TSV (default: <INDIVIDUALS_PATH stem>.trait_modules.tsv)
    #[arg(long, value_name = "PATH")]
    pub output: Option<PathBuf>,

    /// Individuals column holding ICD-10 codes
    #[arg(long, default_value = "icd10_codes")]
    pub codes_column: String,

    /// Trait relation column holding the trait id
    #[arg(long, default_value = "idx")]
    pub trait_index_column: String,

    /// Trait relation column holding the ICD-10 code list
    #[arg(long, default_value = "icd10")]
    pub trait_codes_column: String,
}

#[derive(Parser)]
#[command(
    name = "genoset",
    about = "Remap REGENIE burden-test set files from transcripts to gene sets",
    long_about = "Converts per-chromosome REGENIE setlist and annotation files from transcript \
                 units to gene-set units, checks the inputs for duplicate and orphaned keys, \
                 and assigns ICD-10 based trait modules to individuals."
)]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Convert setlist and annotation files chromosome by chromosome
    #[command(about = "Remap REGENIE set files to gene sets (outputs: one file per input)")]
    Convert(ConvertArgs),

    /// Check set files, gene sets and the transcript map against each other
    #[command(about = "Report duplicate and orphaned keys across all input files")]
    Analyze(AnalyzeArgs),

    /// Assign trait modules to individuals from their ICD-10 codes
    #[command(about = "Build trait modules for individuals (outputs: trait_modules.tsv)")]
    Traits(TraitsArgs),

    /// Display version and build information
    #[command(about = "Display version and build information")]
    Version,
}

fn main() {
    env_logger::Builder::from_env(Env::default().default_filter_or("info")).init();

    let cli = Cli::parse();
    let Cli { command } = cli;

    let result = match command {
        Some(Commands::Convert(args)) => run_convert(args),
        Some(Commands::Analyze(args)) => run_analyze(args),
        Some(Commands::Traits(args)) => run_traits(args),
        Some(Commands::Version) => {
            print_version_info();
            Ok(())
        }
        None => Cli::command()
            .print_help()
            .map(|()| println!())
            .map_err(Into::into),
    };

    if let Err(e) = result {
        eprintln!("Error: {e}");
        process::exit(1);
    }
}

/// Maps the `--parallel` / `--no-parallel` pair onto a config value; neither
/// flag leaves the run file in charge.
fn parallel_override(parallel: bool, no_parallel: bool) -> Option<bool> {
    match (parallel, no_parallel) {
        (true, _) => Some(true),
        (_, true) => Some(false),
        _ => None,
    }
}

fn run_convert(args: ConvertArgs) -> Result<(), Box<dyn std::error::Error>> {
    let file_layer = match &args.config {
        Some(path) => {
            println!("Loading run configuration from: {}", path.display());
            ConfigLayer::load(path)?
        }
        None => ConfigLayer::default(),
    };

    let gene_sets = match (args.gene_sets, args.gene_sets_format) {
        (Some(path), format) => Some(RelationSource {
            path,
            format: format.unwrap_or_default(),
        }),
        (None, Some(format)) => file_layer
            .gene_sets
            .clone()
            .map(|source| RelationSource { format, ..source }),
        (None, None) => None,
    };

    let cli_layer = ConfigLayer {
        input_dir: args.input_dir,
        output_dir: args.output_dir,
        prefix: args.prefix,
        transcript_map: args.transcript_map,
        gene_sets,
        chromosomes: args.chromosomes,
        parallel: parallel_override(args.parallel, args.no_parallel),
    };
    let config = file_layer.merge(cli_layer).finish()?;

    println!(
        "Loading gene sets from: {} ({})",
        config.gene_sets.path.display(),
        config.gene_sets.format
    );
    let gene_sets = read_gene_sets(&config.gene_sets.path, config.gene_sets.format)?;
    println!("Loading transcript map from: {}", config.transcript_map.display());
    let transcript_map = read_transcript_map(&config.transcript_map)?;
    let map = TranscriptGeneSets::new(&transcript_map, &gene_sets)?;

    let plan = convert::plan(&config.input_dir, &config.prefix, &config.chromosomes);
    let summary = convert::convert_all(
        &plan,
        &map,
        &config.output_dir,
        config.parallel,
        args.progress,
    )?;

    for report in &summary.reports {
        println!("{}", report.chromosome);
        println!("  setlist:    {}", report.setlist);
        println!("  annotation: {}", report.annotation);
    }
    println!(
        "Converted {} files ({} skipped, {} failed) into {}",
        summary.converted(),
        summary.skipped(),
        summary.failed(),
        config.output_dir.display()
    );

    if summary.failed() > 0 {
        let failed: Vec<String> = summary
            .reports
            .iter()
            .flat_map(|r| [&r.setlist, &r.annotation])
            .filter_map(|outcome| match outcome {
                FileOutcome::Failed { path, .. } => Some(path.display().to_string()),
                _ => None,
            })
            .collect();
        return Err(format!("conversion failed for: {}", failed.join(", ")).into());
    }
    Ok(())
}

fn run_analyze(args: AnalyzeArgs) -> Result<(), Box<dyn std::error::Error>> {
    println!(
        "Loading gene sets from: {} ({})",
        args.gene_sets.display(),
        args.gene_sets_format
    );
    let gene_sets = read_gene_sets(&args.gene_sets, args.gene_sets_format)?;
    println!("Loading transcript map from: {}", args.transcript_map.display());
    let transcript_map = read_transcript_map(&args.transcript_map)?;

    let report = analyze(&args.input_dir, &gene_sets, &transcript_map)?;
    println!("{report}");
    Ok(())
}

fn run_traits(args: TraitsArgs) -> Result<(), Box<dyn std::error::Error>> {
    let spec = TraitModuleSpec {
        codes_column: args.codes_column,
        trait_index_column: args.trait_index_column,
        trait_codes_column: args.trait_codes_column,
    };
    let output = args
        .output
        .unwrap_or_else(|| default_output_path(&args.individuals));

    let modules = trait_modules_to_tsv(
        &args.traits,
        args.traits_format,
        &args.individuals,
        args.individuals_format,
        &spec,
        &output,
    )?;

    println!(
        "Trait modules for {} individuals written to {}",
        modules.table.height(),
        output.display()
    );
    if !modules.unknown_codes.is_empty() {
        println!(
            "{} codes matched no trait: {}",
            modules.unknown_codes.len(),
            modules.unknown_codes.join(", ")
        );
    }
    Ok(())
}

/// "3.5 hours ago" style age of a build.
fn format_age(seconds: u64) -> String {
    const UNITS: [(u64, &str); 5] = [
        (365 * 86_400, "years"),
        (7 * 86_400, "weeks"),
        (86_400, "days"),
        (3_600, "hours"),
        (60, "minutes"),
    ];
    for (unit, name) in UNITS {
        if seconds >= unit {
            return format!("{:.1} {name} ago", seconds as f64 / unit as f64);
        }
    }
    format!("{seconds} seconds ago")
}

fn print_version_info() {
    let version = env!("CARGO_PKG_VERSION");
    let release_tag = option_env!("GENOSET_RELEASE_TAG");
    let build_timestamp: u64 = env!("GENOSET_BUILD_TIMESTAMP").parse().unwrap_or(0);

    println!("genoset {version}");
    match release_tag {
        Some(tag) => println!("Release: {tag}"),
        None => println!("Release: development build"),
    }

    if build_timestamp > 0 {
        let now = std::time::SystemTime::now()
            .duration_since(std::time::UNIX_EPOCH)
            .map(|d| d.as_secs())
            .unwrap_or(0);
        if now > build_timestamp {
            println!("Built: {}", format_age(now - build_timestamp));
        } else {
            println!("Built: just now");
        }
    }
}

// ========================================================================================
//
//                       Per-chromosome transcript → gene-set conversion
//
// ========================================================================================
//
// Each chromosome is converted by a pure function: it reads its own setlist and
// annotation files, joins them against the shared, read-only transcript → gene-set
// map, and writes its own outputs. Nothing is accumulated across chromosomes, so
// the set of chromosomes can be processed in parallel. A fatal condition in one
// file stops that file only; a missing file is skipped with a notice.

use super::io::{self, LoadError};
use crate::aggregate::{self, AggregateError, GroupSpec};
use crate::join::{self, JoinKind};
use crate::table::{Table, TableError};
use indicatif::{ProgressBar, ProgressStyle};
use rayon::prelude::*;
use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Regrouping applied to converted setlists: one line per gene set and position.
pub const SETLIST_GROUPING: GroupSpec<'static> = GroupSpec {
    keys: &["gene_set", "chrom", "pos"],
    members: "snp",
    required: "gene_set",
    delimiter: ',',
};

/// Column order of converted annotation files.
pub const ANNOTATION_OUTPUT: [&str; 3] = ["snp", "gene_set", "snp_set"];

#[derive(Debug, Error)]
pub enum ConvertError {
    #[error(transparent)]
    Load(#[from] LoadError),
    #[error("{}: {source}", .path.display())]
    Aggregate {
        path: PathBuf,
        #[source]
        source: AggregateError,
    },
    #[error("{}: {source}", .path.display())]
    Table {
        path: PathBuf,
        #[source]
        source: TableError,
    },
    #[error("{} has no file name to reuse for the output", .0.display())]
    NoFileName(PathBuf),
}

/// The chromosomes of a default run: the 22 autosomes.
pub fn default_chromosomes() -> Vec<String> {
    (1..=22).map(|i| format!("chr{i}")).collect()
}

/// The transcript → gene-set map every chromosome is converted against.
///
/// Built once from the transcript-to-gene map and the exploded gene-set
/// relation (inner join on `gene`), then only read.
#[derive(Debug, Clone)]
pub struct TranscriptGeneSets {
    table: Table,
}

impl TranscriptGeneSets {
    pub fn new(transcript_map: &Table, gene_sets: &Table) -> Result<Self, TableError> {
        let merged = join::join(transcript_map, gene_sets, "gene", JoinKind::Inner)?;
        log::info!(
            "Transcript map: {} transcript/gene-set pairs over {} genes",
            merged.table.height(),
            merged.table.distinct("gene")?.len()
        );
        Ok(Self {
            table: merged.into_table(),
        })
    }

    #[inline]
    pub fn table(&self) -> &Table {
        &self.table
    }
}

/// The two input files of one chromosome.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChromosomeInputs {
    pub chromosome: String,
    pub setlist: PathBuf,
    pub annotation: PathBuf,
}

/// Expected input paths `<dir>/<prefix>.<chrom>.REGENIE.*` for each chromosome.
pub fn plan(input_dir: &Path, prefix: &str, chromosomes: &[String]) -> Vec<ChromosomeInputs> {
    chromosomes
        .iter()
        .map(|chrom| ChromosomeInputs {
            chromosome: chrom.clone(),
            setlist: input_dir.join(format!("{prefix}.{chrom}{}", io::SETLIST_SUFFIX)),
            annotation: input_dir.join(format!("{prefix}.{chrom}{}", io::ANNOTATION_SUFFIX)),
        })
        .collect()
}

/// Row accounting for one converted file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileStats {
    pub output: PathBuf,
    pub rows_in: usize,
    pub rows_out: usize,
    /// Distinct transcripts of the input absent from the map; their rows are dropped.
    pub missing_transcripts: usize,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FileOutcome {
    Converted(FileStats),
    Skipped { path: PathBuf },
    Failed { path: PathBuf, error: String },
}

impl FileOutcome {
    pub fn is_converted(&self) -> bool {
        matches!(self, Self::Converted(_))
    }

    pub fn is_skipped(&self) -> bool {
        matches!(self, Self::Skipped { .. })
    }

    pub fn is_failed(&self) -> bool {
        matches!(self, Self::Failed { .. })
    }
}

impl fmt::Display for FileOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Converted(stats) => write!(
                f,
                "{} rows -> {} rows in {} ({} missing transcripts)",
                stats.rows_in,
                stats.rows_out,
                stats.output.display(),
                stats.missing_transcripts
            ),
            Self::Skipped { path } => write!(f, "skipped, {} does not exist", path.display()),
            Self::Failed { path, error } => write!(f, "failed on {}: {error}", path.display()),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChromosomeReport {
    pub chromosome: String,
    pub setlist: FileOutcome,
    pub annotation: FileOutcome,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ConversionSummary {
    pub reports: Vec<ChromosomeReport>,
}

impl ConversionSummary {
    fn outcomes(&self) -> impl Iterator<Item = &FileOutcome> {
        self.reports
            .iter()
            .flat_map(|r| [&r.setlist, &r.annotation])
    }

    pub fn converted(&self) -> usize {
        self.outcomes().filter(|o| o.is_converted()).count()
    }

    pub fn skipped(&self) -> usize {
        self.outcomes().filter(|o| o.is_skipped()).count()
    }

    pub fn failed(&self) -> usize {
        self.outcomes().filter(|o| o.is_failed()).count()
    }
}

/// Remaps one setlist file to gene sets and writes it under `out_dir` with the
/// same file name.
///
/// Transcripts absent from the map are dropped (inner join). The regrouped table
/// is fully built before anything is written, so a null gene set aborts the file
/// without leaving a partial output behind.
pub fn convert_setlist(
    path: &Path,
    map: &TranscriptGeneSets,
    out_dir: &Path,
) -> Result<FileStats, ConvertError> {
    let setlist = io::read_setlist(path)?;
    let table_error = |source: TableError| ConvertError::Table {
        path: path.to_path_buf(),
        source,
    };

    let missing = join::keys_not_in(&setlist, "transcript", map.table(), "transcript")
        .map_err(table_error)?
        .len();
    warn_missing(path, missing);

    let merged = join::join(&setlist, map.table(), "transcript", JoinKind::Inner)
        .map_err(table_error)?;
    let groups =
        aggregate::aggregate(&merged.table, &SETLIST_GROUPING).map_err(|source| {
            ConvertError::Aggregate {
                path: path.to_path_buf(),
                source,
            }
        })?;
    let converted =
        aggregate::groups_to_table(&groups, &SETLIST_GROUPING).map_err(table_error)?;

    let output = output_path(path, out_dir)?;
    io::write_headerless(&converted, &output)?;

    Ok(FileStats {
        output,
        rows_in: setlist.height(),
        rows_out: converted.height(),
        missing_transcripts: missing,
    })
}

/// Remaps one annotation file to gene sets: `snp, gene_set, snp_set`.
///
/// A SNP annotated to a transcript that belongs to several gene sets appears once
/// per gene set.
pub fn convert_annotation(
    path: &Path,
    map: &TranscriptGeneSets,
    out_dir: &Path,
) -> Result<FileStats, ConvertError> {
    let annotation = io::read_annotation(path)?;
    let table_error = |source: TableError| ConvertError::Table {
        path: path.to_path_buf(),
        source,
    };

    let missing = join::keys_not_in(&annotation, "transcript", map.table(), "transcript")
        .map_err(table_error)?
        .len();
    warn_missing(path, missing);

    let merged = join::join(&annotation, map.table(), "transcript", JoinKind::Inner)
        .map_err(table_error)?;
    let nulls = merged.table.null_count("gene_set").map_err(table_error)?;
    if nulls > 0 {
        return Err(ConvertError::Aggregate {
            path: path.to_path_buf(),
            source: AggregateError::NullGroupKey {
                column: "gene_set".to_string(),
                count: nulls,
            },
        });
    }
    let converted = merged.table.select(&ANNOTATION_OUTPUT).map_err(table_error)?;

    let output = output_path(path, out_dir)?;
    io::write_headerless(&converted, &output)?;

    Ok(FileStats {
        output,
        rows_in: annotation.height(),
        rows_out: converted.height(),
        missing_transcripts: missing,
    })
}

/// Converts both files of one chromosome. Never fails as a whole: each file's
/// result is reported separately.
pub fn convert_chromosome(
    inputs: &ChromosomeInputs,
    map: &TranscriptGeneSets,
    out_dir: &Path,
) -> ChromosomeReport {
    log::info!("Processing chromosome: {}", inputs.chromosome);
    ChromosomeReport {
        chromosome: inputs.chromosome.clone(),
        setlist: run_file(&inputs.setlist, "Setlist", &inputs.chromosome, || {
            convert_setlist(&inputs.setlist, map, out_dir)
        }),
        annotation: run_file(&inputs.annotation, "Annotation", &inputs.chromosome, || {
            convert_annotation(&inputs.annotation, map, out_dir)
        }),
    }
}

/// Converts every planned chromosome, in parallel when asked to.
///
/// Reports come back in plan order either way.
pub fn convert_all(
    plan: &[ChromosomeInputs],
    map: &TranscriptGeneSets,
    out_dir: &Path,
    parallel: bool,
    show_progress: bool,
) -> Result<ConversionSummary, ConvertError> {
    fs::create_dir_all(out_dir).map_err(|source| LoadError::io(out_dir, source))?;

    let pb = if show_progress {
        let pb = ProgressBar::new(plan.len() as u64);
        if let Ok(style) =
            ProgressStyle::with_template("> Chromosomes [{bar:40.cyan/blue}] {pos}/{len} ({eta})")
        {
            pb.set_style(style.progress_chars("█▉▊▋▌▍▎▏ "));
        }
        pb
    } else {
        ProgressBar::hidden()
    };

    let convert_one = |inputs: &ChromosomeInputs| {
        let report = convert_chromosome(inputs, map, out_dir);
        pb.inc(1);
        report
    };

    let reports: Vec<ChromosomeReport> = if parallel {
        plan.par_iter().map(convert_one).collect()
    } else {
        plan.iter().map(convert_one).collect()
    };
    pb.finish_and_clear();

    let summary = ConversionSummary { reports };
    log::info!(
        "Conversion completed for all chromosomes: {} files converted, {} skipped, {} failed",
        summary.converted(),
        summary.skipped(),
        summary.failed()
    );
    Ok(summary)
}

fn run_file<F>(path: &Path, kind: &str, chromosome: &str, convert: F) -> FileOutcome
where
    F: FnOnce() -> Result<FileStats, ConvertError>,
{
    if !path.exists() {
        log::warn!(
            "{kind} file for {chromosome} does not exist: {}",
            path.display()
        );
        return FileOutcome::Skipped {
            path: path.to_path_buf(),
        };
    }
    match convert() {
        Ok(stats) => {
            log::debug!("{kind} for {chromosome}: {}", FileOutcome::Converted(stats.clone()));
            FileOutcome::Converted(stats)
        }
        Err(err) => {
            log::error!("{kind} conversion failed for {chromosome}: {err}");
            FileOutcome::Failed {
                path: path.to_path_buf(),
                error: err.to_string(),
            }
        }
    }
}

fn warn_missing(path: &Path, missing: usize) {
    if missing > 0 {
        log::warn!(
            "{missing} transcripts in {} are not present in the transcript map; their rows are dropped",
            path.display()
        );
    }
}

fn output_path(input: &Path, out_dir: &Path) -> Result<PathBuf, ConvertError> {
    input
        .file_name()
        .map(|name| out_dir.join(name))
        .ok_or_else(|| ConvertError::NoFileName(input.to_path_buf()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::value::Value;

    fn map() -> TranscriptGeneSets {
        let transcripts = Table::from_rows(
            ["chrom", "transcript", "gene", "gene_symbol"],
            vec![
                vec!["1".into(), "T1".into(), "G1".into(), "A".into()],
                vec!["1".into(), "T2".into(), "G2".into(), "B".into()],
                vec!["1".into(), "T3".into(), "G9".into(), "C".into()],
            ],
        )
        .unwrap();
        let sets = Table::from_rows(
            ["gene_set", "gene"],
            vec![
                vec!["GS1".into(), "G1".into()],
                vec!["GS1".into(), "G2".into()],
                vec!["GS2".into(), "G2".into()],
            ],
        )
        .unwrap();
        TranscriptGeneSets::new(&transcripts, &sets).unwrap()
    }

    #[test]
    fn map_keeps_only_genes_with_a_set() {
        let map = map();
        assert_eq!(map.table().height(), 3);
        let transcripts: Vec<&Value> = map.table().column("transcript").unwrap().collect();
        assert!(!transcripts.contains(&&Value::scalar("T3")));
    }

    #[test]
    fn plan_uses_the_regenie_naming_convention() {
        let inputs = plan(Path::new("data"), "PTV", &["chr7".to_string()]);
        assert_eq!(
            inputs[0].setlist,
            Path::new("data/PTV.chr7.REGENIE.setListFile.txt")
        );
        assert_eq!(
            inputs[0].annotation,
            Path::new("data/PTV.chr7.REGENIE.annotationFile.txt")
        );
    }

    #[test]
    fn default_run_covers_the_autosomes() {
        let chroms = default_chromosomes();
        assert_eq!(chroms.len(), 22);
        assert_eq!(chroms.first().map(String::as_str), Some("chr1"));
        assert_eq!(chroms.last().map(String::as_str), Some("chr22"));
    }

    #[test]
    fn summary_counts_each_outcome_kind() {
        let stats = FileStats {
            output: PathBuf::from("out"),
            rows_in: 1,
            rows_out: 1,
            missing_transcripts: 0,
        };
        let summary = ConversionSummary {
            reports: vec![ChromosomeReport {
                chromosome: "chr1".to_string(),
                setlist: FileOutcome::Skipped {
                    path: PathBuf::from("a"),
                },
                annotation: FileOutcome::Converted(stats),
            }],
        };
        assert_eq!(summary.converted(), 1);
        assert_eq!(summary.skipped(), 1);
        assert_eq!(summary.failed(), 0);
    }
}

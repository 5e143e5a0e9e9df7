// ========================================================================================
//
//                         Cross-file referential-integrity checks
//
// ========================================================================================
//
// Reads every setlist and annotation file of a directory at once and checks them
// against the gene-set relation and the transcript map before any conversion is
// attempted. Nothing here fails on bad data: duplicates and orphans are counted,
// logged and returned in an `AnalysisReport`.

use super::io::{self, LoadError};
use crate::duplicates::{DuplicateReport, find_duplicates};
use crate::index::InvertedIndex;
use crate::join::{self, JoinKind, JoinSummary};
use crate::table::{Table, TableError};
use crate::value::Value;
use std::fmt;
use std::path::Path;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum AnalyzeError {
    #[error(transparent)]
    Load(#[from] LoadError),
    #[error(transparent)]
    Table(#[from] TableError),
}

#[derive(Debug, Clone)]
pub struct AnalysisReport {
    pub setlist_files: usize,
    pub annotation_files: usize,
    /// SNPs listed in more than one annotation row across all files.
    pub duplicate_snps: DuplicateReport,
    /// Transcripts listed in more than one setlist row across all files.
    pub duplicate_transcripts: DuplicateReport,
    /// Genes present both in the gene sets and in the transcript map.
    pub matching_genes: usize,
    pub gene_set_genes_not_in_map: Vec<Value>,
    pub map_genes_not_in_gene_sets: Vec<Value>,
    /// Transcripts occurring on several rows of the merged transcript map.
    pub duplicate_mapped_transcripts: DuplicateReport,
    pub setlist_join: JoinSummary,
    pub annotation_join: JoinSummary,
}

/// Collapses the exploded gene-set relation to one row per gene, holding the
/// naturally sorted list of gene sets the gene belongs to.
pub fn gene_sets_by_gene(gene_sets: &Table) -> Result<Table, TableError> {
    let index = InvertedIndex::build(gene_sets, "gene_set", "gene")?;

    let mut genes: Vec<&str> = index.tokens().collect();
    genes.sort_by(|a, b| natord::compare(a, b));

    let rows = genes
        .into_iter()
        .map(|gene| {
            vec![
                Value::scalar(gene),
                Value::list(index.sorted_keys(gene)),
            ]
        })
        .collect();
    Table::from_rows(["gene", "gene_set"], rows)
}

/// Runs every integrity check over the set files found in `input_dir`.
pub fn analyze(
    input_dir: &Path,
    gene_sets: &Table,
    transcript_map: &Table,
) -> Result<AnalysisReport, AnalyzeError> {
    let (annotations, annotation_files) = io::combine(
        input_dir,
        io::ANNOTATION_SUFFIX,
        &io::ANNOTATION_COLUMNS,
        io::read_annotation,
    )?;
    let duplicate_snps = find_duplicates(&annotations, "snp")?;
    log::info!(
        "Found {} snps that appear more than once across all files.",
        duplicate_snps.distinct_keys()
    );

    let (setlists, setlist_files) = io::combine(
        input_dir,
        io::SETLIST_SUFFIX,
        &io::SETLIST_COLUMNS,
        io::read_setlist,
    )?;
    let duplicate_transcripts = find_duplicates(&setlists, "transcript")?;
    log::info!(
        "Found {} transcripts that appear more than once across all files.",
        duplicate_transcripts.distinct_keys()
    );

    let by_gene = gene_sets_by_gene(gene_sets)?;
    let merged = join::join(transcript_map, &by_gene, "gene", JoinKind::Inner)?.into_table();

    let matching_genes = merged.distinct("gene")?.len();
    log::info!("Found {matching_genes} matching genes between transcript and gene set.");

    let gene_set_genes_not_in_map: Vec<Value> =
        join::keys_not_in(&by_gene, "gene", transcript_map, "gene")?
            .into_iter()
            .cloned()
            .collect();
    log::info!(
        "Found {} genes in the gene set that are not in the transcript to gene mapping.",
        gene_set_genes_not_in_map.len()
    );

    let map_genes_not_in_gene_sets: Vec<Value> =
        join::keys_not_in(transcript_map, "gene", &by_gene, "gene")?
            .into_iter()
            .cloned()
            .collect();
    log::info!(
        "Found {} genes in the transcript to gene mapping that are not in the gene set.",
        map_genes_not_in_gene_sets.len()
    );

    let duplicate_mapped_transcripts = find_duplicates(&merged, "transcript")?;
    if duplicate_mapped_transcripts.is_empty() {
        log::info!("No duplicates found in the merged transcript to gene mapping.");
    } else {
        log::warn!(
            "Found {} transcripts that appear more than once in the merged transcript to gene mapping.",
            duplicate_mapped_transcripts.distinct_keys()
        );
    }

    let setlist_join = join::join(&setlists, &merged, "transcript", JoinKind::Left)?.summary();
    report_missing("setlist", &setlist_join);
    let annotation_join =
        join::join(&annotations, &merged, "transcript", JoinKind::Left)?.summary();
    report_missing("annotation", &annotation_join);

    Ok(AnalysisReport {
        setlist_files,
        annotation_files,
        duplicate_snps,
        duplicate_transcripts,
        matching_genes,
        gene_set_genes_not_in_map,
        map_genes_not_in_gene_sets,
        duplicate_mapped_transcripts,
        setlist_join,
        annotation_join,
    })
}

fn report_missing(kind: &str, summary: &JoinSummary) {
    if summary.missing_keys > 0 {
        log::warn!(
            "{} transcripts in the {kind} are not present in the transcript to gene mapping.",
            summary.missing_keys
        );
    } else {
        log::info!("All transcripts in the {kind} are present in the transcript to gene mapping.");
    }
}

impl fmt::Display for AnalysisReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(
            f,
            "Files read:                         {} setlists, {} annotations",
            self.setlist_files, self.annotation_files
        )?;
        writeln!(
            f,
            "Duplicate SNPs (annotations):       {}",
            self.duplicate_snps.distinct_keys()
        )?;
        writeln!(
            f,
            "Duplicate transcripts (setlists):   {}",
            self.duplicate_transcripts.distinct_keys()
        )?;
        writeln!(f, "Matching genes:                     {}", self.matching_genes)?;
        writeln!(
            f,
            "Gene-set genes not in map:          {}",
            self.gene_set_genes_not_in_map.len()
        )?;
        writeln!(
            f,
            "Map genes not in any gene set:      {}",
            self.map_genes_not_in_gene_sets.len()
        )?;
        writeln!(
            f,
            "Duplicate transcripts (merged map): {}",
            self.duplicate_mapped_transcripts.distinct_keys()
        )?;
        writeln!(
            f,
            "Unmapped setlist transcripts:       {} ({} rows)",
            self.setlist_join.missing_keys, self.setlist_join.unmatched_rows
        )?;
        write!(
            f,
            "Unmapped annotation transcripts:    {} ({} rows)",
            self.annotation_join.missing_keys, self.annotation_join.unmatched_rows
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn genes_collect_every_set_that_lists_them() {
        let sets = Table::from_rows(
            ["gene_set", "gene"],
            vec![
                vec!["GS10".into(), "G1".into()],
                vec!["GS2".into(), "G1".into()],
                vec!["GS2".into(), "G2".into()],
                vec!["GS3".into(), Value::Null],
            ],
        )
        .unwrap();
        let by_gene = gene_sets_by_gene(&sets).unwrap();
        assert_eq!(by_gene.height(), 2);
        assert_eq!(
            by_gene.value(0, "gene_set").unwrap(),
            Some(&Value::list(["GS2", "GS10"]))
        );
        assert_eq!(
            by_gene.value(1, "gene_set").unwrap(),
            Some(&Value::list(["GS2"]))
        );
    }
}

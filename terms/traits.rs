use std::fs;
use std::path::{Path, PathBuf};

use ahash::AHashSet;
use natord::compare;
use thiserror::Error;

use crate::index::InvertedIndex;
use crate::regenie::io::{self, LoadError};
use crate::regenie::tables::{TableFormat, read_table};
use crate::resolve;
use crate::table::{Table, TableError};

/// Column appended to the individuals table.
pub const TRAIT_MODULES_COLUMN: &str = "trait_modules";

#[derive(Debug, Error)]
pub enum TraitError {
    #[error(transparent)]
    Load(#[from] LoadError),
    #[error("trait module table: {0}")]
    Table(#[from] TableError),
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Column names used to match individuals to traits.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TraitModuleSpec {
    /// Individuals column holding each person's ICD-10 codes.
    pub codes_column: String,
    /// Trait relation column holding the trait identifier.
    pub trait_index_column: String,
    /// Trait relation column holding the trait's ICD-10 codes.
    pub trait_codes_column: String,
}

impl Default for TraitModuleSpec {
    fn default() -> Self {
        Self {
            codes_column: "icd10_codes".to_string(),
            trait_index_column: "idx".to_string(),
            trait_codes_column: "icd10".to_string(),
        }
    }
}

#[derive(Debug, Clone)]
pub struct TraitModules {
    /// The individuals table with [`TRAIT_MODULES_COLUMN`] appended.
    pub table: Table,
    /// Codes carried by individuals that no trait lists, naturally sorted.
    pub unknown_codes: Vec<String>,
    /// Individuals that resolved to no trait at all.
    pub without_traits: usize,
}

/// Assigns every individual the sorted list of traits any of their codes belongs to.
///
/// The individuals table is otherwise returned unchanged. An individual with no
/// codes, or only unknown ones, gets an empty list.
pub fn create_trait_modules(
    traits: &Table,
    individuals: &Table,
    spec: &TraitModuleSpec,
) -> Result<TraitModules, TableError> {
    let index = InvertedIndex::build(traits, &spec.trait_index_column, &spec.trait_codes_column)?;
    let table = resolve::annotate(individuals, &index, &spec.codes_column, TRAIT_MODULES_COLUMN)?;

    let mut unknown: AHashSet<&str> = AHashSet::new();
    for value in individuals.column(&spec.codes_column)? {
        unknown.extend(resolve::unresolved(&index, value));
    }
    let mut unknown_codes: Vec<String> = unknown.into_iter().map(str::to_string).collect();
    unknown_codes.sort_by(|a, b| compare(a, b));

    let without_traits = table
        .column(TRAIT_MODULES_COLUMN)?
        .filter(|value| value.tokens().is_empty())
        .count();

    if !unknown_codes.is_empty() {
        log::warn!(
            "{} ICD-10 codes of individuals are not part of any trait",
            unknown_codes.len()
        );
    }
    log::info!(
        "Assigned trait modules to {} individuals ({} without any trait)",
        table.height(),
        without_traits
    );

    Ok(TraitModules {
        table,
        unknown_codes,
        without_traits,
    })
}

/// Loads both tables, builds the trait modules and writes them as TSV with a header.
pub fn trait_modules_to_tsv(
    traits_path: &Path,
    traits_format: TableFormat,
    individuals_path: &Path,
    individuals_format: TableFormat,
    spec: &TraitModuleSpec,
    output: &Path,
) -> Result<TraitModules, TraitError> {
    let traits = read_table(traits_path, traits_format)?;
    let individuals = read_table(individuals_path, individuals_format)?;
    let modules = create_trait_modules(&traits, &individuals, spec)?;
    write_results(output, &modules.table)?;
    Ok(modules)
}

/// Default output location: next to the individuals file.
pub fn default_output_path(individuals_path: &Path) -> PathBuf {
    individuals_path.with_extension("trait_modules.tsv")
}

fn write_results(path: &Path, table: &Table) -> Result<(), TraitError> {
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            fs::create_dir_all(parent)?;
        }
    }

    io::write_with_header(table, path)?;
    Ok(())
}

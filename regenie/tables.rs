//! Loading of the header'd relation tables: gene sets, the transcript-to-gene
//! map, trait definitions and individuals.
//!
//! The storage format is never guessed from a file extension. Callers pass a
//! [`TableFormat`], and every cell comes back resolved through
//! [`Value::parse`], so bracket-encoded lists are already lists.

use super::io::LoadError;
use crate::table::Table;
use crate::value::Value;
use polars::prelude::*;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::fs::{self, File};
use std::path::Path;

/// Column names given to the transcript-to-gene map, positionally.
pub const TRANSCRIPT_MAP_COLUMNS: [&str; 4] = ["chrom", "transcript", "gene", "gene_symbol"];

/// Columns of a relation stored as a JSON object of key -> values.
pub const JSON_MAPPING_COLUMNS: [&str; 2] = ["index", "value"];

/// Column names given to the gene-set relation, positionally.
pub const GENE_SET_COLUMNS: [&str; 2] = ["gene_set", "gene"];

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum TableFormat {
    /// Comma-separated with a header line.
    #[default]
    Csv,
    /// Tab-separated with a header line.
    Tsv,
    /// A JSON array of row objects, or one object mapping each key to its values.
    Json,
}

impl fmt::Display for TableFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Csv => f.write_str("csv"),
            Self::Tsv => f.write_str("tsv"),
            Self::Json => f.write_str("json"),
        }
    }
}

/// Reads a header'd table in the given format.
pub fn read_table(path: &Path, format: TableFormat) -> Result<Table, LoadError> {
    let table = match format {
        TableFormat::Csv => read_delimited(path, b',')?,
        TableFormat::Tsv => read_delimited(path, b'\t')?,
        TableFormat::Json => read_json_records(path)?,
    };
    log::debug!(
        "Loaded {} rows x {} columns from {} ({format})",
        table.height(),
        table.width(),
        path.display()
    );
    Ok(table)
}

/// Loads the gene-set relation and explodes it to one gene per row.
///
/// The table must have exactly two columns, the gene-set identifier followed by
/// its list of member genes. Gene sets with an empty list keep one row with a
/// null gene.
pub fn read_gene_sets(path: &Path, format: TableFormat) -> Result<Table, LoadError> {
    let mut table = read_table(path, format)?;
    table
        .rename_columns(&GENE_SET_COLUMNS)
        .map_err(|source| LoadError::table(path, source))?;
    table
        .explode("gene")
        .map_err(|source| LoadError::table(path, source))
}

/// Loads the transcript-to-gene map, a CSV whose four columns are renamed to
/// `chrom, transcript, gene, gene_symbol`.
pub fn read_transcript_map(path: &Path) -> Result<Table, LoadError> {
    let mut table = read_table(path, TableFormat::Csv)?;
    table
        .rename_columns(&TRANSCRIPT_MAP_COLUMNS)
        .map_err(|source| LoadError::table(path, source))?;
    Ok(table)
}

fn read_delimited(path: &Path, separator: u8) -> Result<Table, LoadError> {
    let polars_error = |source: PolarsError| LoadError::Polars {
        path: path.to_path_buf(),
        source,
    };

    let file = File::open(path).map_err(|source| LoadError::io(path, source))?;

    // A zero-length inference window reads every column as text, which keeps
    // identifiers such as "01" or "1e5" exactly as written.
    let df = CsvReader::new(file)
        .with_options(
            CsvReadOptions::default()
                .with_has_header(true)
                .with_infer_schema_length(Some(0))
                .with_parse_options(CsvParseOptions::default().with_separator(separator)),
        )
        .finish()
        .map_err(polars_error)?;

    let names: Vec<String> = df
        .get_column_names()
        .into_iter()
        .map(|s| s.to_string())
        .collect();

    let mut rows: Vec<Vec<Value>> = vec![Vec::with_capacity(names.len()); df.height()];
    for name in &names {
        let column = df.column(name).map_err(polars_error)?;
        let text = column.as_materialized_series().str().map_err(polars_error)?;
        for (row, cell) in rows.iter_mut().zip(text.into_iter()) {
            row.push(cell.map_or(Value::Null, Value::parse));
        }
    }

    Table::from_rows(names, rows).map_err(|source| LoadError::table(path, source))
}

fn read_json_records(path: &Path) -> Result<Table, LoadError> {
    let text = fs::read_to_string(path).map_err(|source| LoadError::io(path, source))?;
    let parsed: serde_json::Value = serde_json::from_str(&text).map_err(|source| LoadError::Json {
        path: path.to_path_buf(),
        source,
    })?;

    let records = match parsed {
        serde_json::Value::Array(records) => records,
        serde_json::Value::Object(mapping) => return json_mapping(path, mapping),
        _ => {
            return Err(LoadError::Layout {
                path: path.to_path_buf(),
                message: "expected a JSON array of row objects or an object of key -> values"
                    .to_string(),
            });
        }
    };

    let mut columns: Vec<String> = Vec::new();
    let mut objects = Vec::with_capacity(records.len());
    for (i, record) in records.into_iter().enumerate() {
        let serde_json::Value::Object(object) = record else {
            return Err(LoadError::Layout {
                path: path.to_path_buf(),
                message: format!("row {i} is not a JSON object"),
            });
        };
        for key in object.keys() {
            if !columns.iter().any(|c| c == key) {
                columns.push(key.clone());
            }
        }
        objects.push(object);
    }

    let rows = objects
        .iter()
        .map(|object| {
            columns
                .iter()
                .map(|column| object.get(column).map_or(Value::Null, json_cell))
                .collect()
        })
        .collect();

    Table::from_rows(columns, rows).map_err(|source| LoadError::table(path, source))
}

/// `{"GS1": ["G1", "G2"], ...}`: one row per key, in file order.
fn json_mapping(
    path: &Path,
    mapping: serde_json::Map<String, serde_json::Value>,
) -> Result<Table, LoadError> {
    let rows = mapping
        .iter()
        .map(|(key, value)| vec![Value::scalar(key.as_str()), json_cell(value)])
        .collect();
    Table::from_rows(JSON_MAPPING_COLUMNS, rows).map_err(|source| LoadError::table(path, source))
}

fn json_cell(value: &serde_json::Value) -> Value {
    match value {
        serde_json::Value::Null => Value::Null,
        serde_json::Value::String(text) => Value::parse(text),
        serde_json::Value::Array(items) => Value::List(
            items
                .iter()
                .filter(|item| !item.is_null())
                .map(json_scalar)
                .collect(),
        ),
        other => Value::Scalar(json_scalar(other)),
    }
}

fn json_scalar(value: &serde_json::Value) -> String {
    match value {
        serde_json::Value::String(text) => text.clone(),
        other => other.to_string(),
    }
}

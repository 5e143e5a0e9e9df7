// ========================================================================================
//
//                          REGENIE set-file reading & writing
//
// ========================================================================================

use crate::table::{Table, TableError};
use crate::value::Value;
use natord::compare;
use polars::prelude::PolarsError;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use thiserror::Error;

pub const SETLIST_SUFFIX: &str = ".REGENIE.setListFile.txt";
pub const ANNOTATION_SUFFIX: &str = ".REGENIE.annotationFile.txt";

pub const SETLIST_COLUMNS: [&str; 4] = ["transcript", "chr", "pos", "snp"];
pub const ANNOTATION_COLUMNS: [&str; 3] = ["snp", "transcript", "snp_set"];

#[derive(Debug, Error)]
pub enum LoadError {
    #[error("I/O error on {}: {source}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("failed to read delimited records from {}: {source}", .path.display())]
    Csv {
        path: PathBuf,
        #[source]
        source: csv::Error,
    },
    #[error("failed to load table {}: {source}", .path.display())]
    Polars {
        path: PathBuf,
        #[source]
        source: PolarsError,
    },
    #[error("invalid JSON table {}: {source}", .path.display())]
    Json {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
    #[error("{}:{line}: expected {expected} columns, found {found}", .path.display())]
    MalformedRecord {
        path: PathBuf,
        line: u64,
        expected: usize,
        found: usize,
    },
    #[error("{}: {message}", .path.display())]
    Layout { path: PathBuf, message: String },
    #[error("table {}: {source}", .path.display())]
    Table {
        path: PathBuf,
        #[source]
        source: TableError,
    },
}

impl LoadError {
    pub(crate) fn io(path: &Path, source: io::Error) -> Self {
        Self::Io {
            path: path.to_path_buf(),
            source,
        }
    }

    pub(crate) fn table(path: &Path, source: TableError) -> Self {
        Self::Table {
            path: path.to_path_buf(),
            source,
        }
    }
}

/// Reads a REGENIE setlist: `transcript, chr, pos, snp`, tab-separated, no header.
pub fn read_setlist(path: &Path) -> Result<Table, LoadError> {
    read_headerless(path, &SETLIST_COLUMNS)
}

/// Reads a REGENIE annotation file: `snp, transcript, snp_set`.
pub fn read_annotation(path: &Path) -> Result<Table, LoadError> {
    read_headerless(path, &ANNOTATION_COLUMNS)
}

/// Reads a headerless tab-separated file whose every record has exactly
/// `columns.len()` fields.
///
/// Cells are taken as written; set files carry no bracket lists, so a cell
/// such as `[LoF,missense]` is passed through unchanged.
pub fn read_headerless(path: &Path, columns: &[&str]) -> Result<Table, LoadError> {
    let mut reader = csv::ReaderBuilder::new()
        .delimiter(b'\t')
        .has_headers(false)
        .flexible(true)
        .from_path(path)
        .map_err(|source| csv_error(path, source))?;

    let mut table = Table::new(columns.iter().copied());
    for record in reader.records() {
        let record = record.map_err(|source| csv_error(path, source))?;
        if record.len() != columns.len() {
            return Err(LoadError::MalformedRecord {
                path: path.to_path_buf(),
                line: record.position().map_or(0, |p| p.line()),
                expected: columns.len(),
                found: record.len(),
            });
        }
        table
            .push_row(record.iter().map(Value::verbatim).collect())
            .map_err(|source| LoadError::table(path, source))?;
    }

    log::debug!("Read {} records from {}", table.height(), path.display());
    Ok(table)
}

/// Writes `table` tab-separated without a header, one line per row.
pub fn write_headerless(table: &Table, path: &Path) -> Result<(), LoadError> {
    write_delimited(table, path, false)
}

/// Writes `table` tab-separated with a header line.
pub fn write_with_header(table: &Table, path: &Path) -> Result<(), LoadError> {
    write_delimited(table, path, true)
}

fn write_delimited(table: &Table, path: &Path, header: bool) -> Result<(), LoadError> {
    let mut writer = csv::WriterBuilder::new()
        .delimiter(b'\t')
        .has_headers(false)
        .from_path(path)
        .map_err(|source| csv_error(path, source))?;

    if header {
        writer
            .write_record(table.columns())
            .map_err(|source| csv_error(path, source))?;
    }
    for row in table.rows() {
        writer
            .write_record(row.iter().map(|value| value.to_string()))
            .map_err(|source| csv_error(path, source))?;
    }
    writer.flush().map_err(|source| LoadError::io(path, source))?;
    Ok(())
}

/// Lists the files in `dir` whose names end with `suffix`, naturally sorted so
/// that `chr2` precedes `chr10`.
pub fn discover(dir: &Path, suffix: &str) -> Result<Vec<PathBuf>, LoadError> {
    let entries = fs::read_dir(dir).map_err(|source| LoadError::io(dir, source))?;

    let mut found = Vec::new();
    for entry in entries {
        let entry = entry.map_err(|source| LoadError::io(dir, source))?;
        let path = entry.path();
        let matches = path
            .file_name()
            .and_then(|name| name.to_str())
            .is_some_and(|name| name.ends_with(suffix));
        if matches && path.is_file() {
            found.push(path);
        }
    }

    found.sort_by(|a, b| compare(&a.to_string_lossy(), &b.to_string_lossy()));
    log::debug!(
        "Discovered {} files matching *{suffix} in {}",
        found.len(),
        dir.display()
    );
    Ok(found)
}

/// Reads every file matched by [`discover`] with `read` and stacks the results.
///
/// An empty directory yields an empty table with `columns`.
pub fn combine<F>(dir: &Path, suffix: &str, columns: &[&str], read: F) -> Result<(Table, usize), LoadError>
where
    F: Fn(&Path) -> Result<Table, LoadError>,
{
    let files = discover(dir, suffix)?;
    let mut tables = Vec::with_capacity(files.len());
    for file in &files {
        log::info!("Reading {}", file.display());
        tables.push(read(file)?);
    }
    let combined = Table::concat(tables)
        .map_err(|source| LoadError::table(dir, source))?
        .unwrap_or_else(|| Table::new(columns.iter().copied()));
    Ok((combined, files.len()))
}

fn csv_error(path: &Path, source: csv::Error) -> LoadError {
    LoadError::Csv {
        path: path.to_path_buf(),
        source,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::tempdir;

    fn write_file(dir: &Path, name: &str, content: &str) -> PathBuf {
        let path = dir.join(name);
        let mut file = fs::File::create(&path).expect("create test file");
        file.write_all(content.as_bytes()).expect("write test file");
        path
    }

    #[test]
    fn setlists_read_into_four_named_columns() {
        let dir = tempdir().expect("tempdir");
        let path = write_file(
            dir.path(),
            "x.chr1.REGENIE.setListFile.txt",
            "ENST1\t1\t100\trs1,rs2\nENST2\t1\t200\trs3\n",
        );
        let table = read_setlist(&path).unwrap();
        assert_eq!(table.columns(), SETLIST_COLUMNS);
        assert_eq!(table.height(), 2);
        assert_eq!(table.value(0, "snp").unwrap(), Some(&Value::scalar("rs1,rs2")));
    }

    #[test]
    fn short_records_are_rejected_with_their_line() {
        let dir = tempdir().expect("tempdir");
        let path = write_file(dir.path(), "bad.txt", "rs1\tENST1\tLoF\nrs2\tENST2\n");
        match read_annotation(&path) {
            Err(LoadError::MalformedRecord {
                line,
                expected,
                found,
                ..
            }) => {
                assert_eq!(line, 2);
                assert_eq!(expected, 3);
                assert_eq!(found, 2);
            }
            other => panic!("expected MalformedRecord, got {other:?}"),
        }
    }

    #[test]
    fn headerless_output_has_no_header_and_tab_separators() {
        let dir = tempdir().expect("tempdir");
        let table = Table::from_rows(
            ["gene_set", "chrom", "pos", "snp"],
            vec![vec!["GS1".into(), "1".into(), "100".into(), "rs1,rs2".into()]],
        )
        .unwrap();
        let path = dir.path().join("out.txt");
        write_headerless(&table, &path).unwrap();
        assert_eq!(fs::read_to_string(&path).unwrap(), "GS1\t1\t100\trs1,rs2\n");
    }

    #[test]
    fn discovery_matches_suffix_and_sorts_naturally() {
        let dir = tempdir().expect("tempdir");
        for chrom in ["chr10", "chr2", "chr1"] {
            write_file(
                dir.path(),
                &format!("PTV.{chrom}{SETLIST_SUFFIX}"),
                "T\t1\t1\trs\n",
            );
        }
        write_file(dir.path(), "PTV.chr1.REGENIE.annotationFile.txt", "");

        let names: Vec<String> = discover(dir.path(), SETLIST_SUFFIX)
            .unwrap()
            .iter()
            .map(|p| p.file_name().unwrap().to_string_lossy().into_owned())
            .collect();
        assert_eq!(
            names,
            vec![
                "PTV.chr1.REGENIE.setListFile.txt",
                "PTV.chr2.REGENIE.setListFile.txt",
                "PTV.chr10.REGENIE.setListFile.txt"
            ]
        );
    }

    #[test]
    fn combining_an_empty_directory_yields_an_empty_table() {
        let dir = tempdir().expect("tempdir");
        let (table, files) =
            combine(dir.path(), ANNOTATION_SUFFIX, &ANNOTATION_COLUMNS, read_annotation).unwrap();
        assert_eq!(files, 0);
        assert!(table.is_empty());
        assert_eq!(table.columns(), ANNOTATION_COLUMNS);
    }
}

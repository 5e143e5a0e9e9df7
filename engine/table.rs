//! In-memory record sets.
//!
//! A [`Table`] is an ordered list of column names plus rows of [`Value`]s. Every
//! row has exactly as many cells as there are columns; that is the only schema
//! rule the engine enforces. Key columns may repeat values freely.

use crate::value::Value;
use ahash::AHashSet;
use thiserror::Error;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum TableError {
    #[error("column '{column}' not found (available: {})", .available.join(", "))]
    UnknownColumn {
        column: String,
        available: Vec<String>,
    },
    #[error("row {row} has {found} cells but the table has {expected} columns")]
    WidthMismatch {
        row: usize,
        expected: usize,
        found: usize,
    },
    #[error("cannot rename {found} columns to {expected} names")]
    RenameMismatch { expected: usize, found: usize },
    #[error("tables have different columns: [{}] vs [{}]", .left.join(", "), .right.join(", "))]
    ColumnMismatch {
        left: Vec<String>,
        right: Vec<String>,
    },
}

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Table {
    columns: Vec<String>,
    rows: Vec<Vec<Value>>,
}

impl Table {
    pub fn new<I, S>(columns: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            columns: columns.into_iter().map(Into::into).collect(),
            rows: Vec::new(),
        }
    }

    pub fn from_rows<I, S>(columns: I, rows: Vec<Vec<Value>>) -> Result<Self, TableError>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let mut table = Self::new(columns);
        table.rows.reserve(rows.len());
        for row in rows {
            table.push_row(row)?;
        }
        Ok(table)
    }

    pub fn push_row(&mut self, row: Vec<Value>) -> Result<(), TableError> {
        if row.len() != self.columns.len() {
            return Err(TableError::WidthMismatch {
                row: self.rows.len(),
                expected: self.columns.len(),
                found: row.len(),
            });
        }
        self.rows.push(row);
        Ok(())
    }

    #[inline]
    pub fn columns(&self) -> &[String] {
        &self.columns
    }

    #[inline]
    pub fn rows(&self) -> &[Vec<Value>] {
        &self.rows
    }

    #[inline]
    pub fn height(&self) -> usize {
        self.rows.len()
    }

    #[inline]
    pub fn width(&self) -> usize {
        self.columns.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn has_column(&self, name: &str) -> bool {
        self.columns.iter().any(|c| c == name)
    }

    pub fn column_index(&self, name: &str) -> Result<usize, TableError> {
        self.columns
            .iter()
            .position(|c| c == name)
            .ok_or_else(|| TableError::UnknownColumn {
                column: name.to_string(),
                available: self.columns.clone(),
            })
    }

    /// Iterates the cells of one column in row order.
    pub fn column(&self, name: &str) -> Result<impl Iterator<Item = &Value>, TableError> {
        let idx = self.column_index(name)?;
        Ok(self.rows.iter().map(move |row| &row[idx]))
    }

    pub fn value(&self, row: usize, column: &str) -> Result<Option<&Value>, TableError> {
        let idx = self.column_index(column)?;
        Ok(self.rows.get(row).map(|cells| &cells[idx]))
    }

    /// Distinct non-null values of a column, in first-seen order.
    pub fn distinct(&self, column: &str) -> Result<Vec<&Value>, TableError> {
        let mut seen = AHashSet::new();
        let mut ordered = Vec::new();
        for value in self.column(column)? {
            if !value.is_null() && seen.insert(value) {
                ordered.push(value);
            }
        }
        Ok(ordered)
    }

    pub fn null_count(&self, column: &str) -> Result<usize, TableError> {
        Ok(self.column(column)?.filter(|v| v.is_null()).count())
    }

    /// Projects the table onto the named columns, in the order given.
    pub fn select(&self, names: &[&str]) -> Result<Table, TableError> {
        let indices = names
            .iter()
            .map(|name| self.column_index(name))
            .collect::<Result<Vec<_>, _>>()?;
        let rows = self
            .rows
            .iter()
            .map(|row| indices.iter().map(|&i| row[i].clone()).collect())
            .collect();
        Ok(Table {
            columns: names.iter().map(|s| s.to_string()).collect(),
            rows,
        })
    }

    /// A copy of the rows at `indices`, in the order given.
    pub fn take(&self, indices: &[usize]) -> Table {
        Table {
            columns: self.columns.clone(),
            rows: indices.iter().map(|&i| self.rows[i].clone()).collect(),
        }
    }

    /// Replaces all column names positionally.
    pub fn rename_columns(&mut self, names: &[&str]) -> Result<(), TableError> {
        if names.len() != self.columns.len() {
            return Err(TableError::RenameMismatch {
                expected: names.len(),
                found: self.columns.len(),
            });
        }
        self.columns = names.iter().map(|s| s.to_string()).collect();
        Ok(())
    }

    /// One row per item of a list column.
    ///
    /// An empty list leaves a single row holding `Null`; scalar and null cells
    /// pass through untouched.
    pub fn explode(&self, column: &str) -> Result<Table, TableError> {
        let idx = self.column_index(column)?;
        let mut rows = Vec::with_capacity(self.rows.len());
        for row in &self.rows {
            match &row[idx] {
                Value::List(items) if items.is_empty() => {
                    let mut out = row.clone();
                    out[idx] = Value::Null;
                    rows.push(out);
                }
                Value::List(items) => {
                    for item in items {
                        let mut out = row.clone();
                        out[idx] = Value::Scalar(item.clone());
                        rows.push(out);
                    }
                }
                _ => rows.push(row.clone()),
            }
        }
        Ok(Table {
            columns: self.columns.clone(),
            rows,
        })
    }

    /// Stacks tables that share the same columns.
    pub fn concat<I>(tables: I) -> Result<Option<Table>, TableError>
    where
        I: IntoIterator<Item = Table>,
    {
        let mut combined: Option<Table> = None;
        for table in tables {
            match combined.as_mut() {
                None => combined = Some(table),
                Some(acc) => {
                    if acc.columns != table.columns {
                        return Err(TableError::ColumnMismatch {
                            left: acc.columns.clone(),
                            right: table.columns,
                        });
                    }
                    acc.rows.extend(table.rows);
                }
            }
        }
        Ok(combined)
    }

    /// Appends a column holding one value per row.
    pub fn with_column(mut self, name: &str, values: Vec<Value>) -> Result<Table, TableError> {
        if values.len() != self.rows.len() {
            return Err(TableError::WidthMismatch {
                row: self.rows.len().min(values.len()),
                expected: self.rows.len(),
                found: values.len(),
            });
        }
        self.columns.push(name.to_string());
        for (row, value) in self.rows.iter_mut().zip(values) {
            row.push(value);
        }
        Ok(self)
    }
}

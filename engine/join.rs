// ========================================================================================
//
//                                 Key-preserving joins
//
// ========================================================================================
//
// Joins two record sets on a shared identifier column. A left join keeps every
// left row; an inner join keeps only rows with a partner. Duplicate keys on the
// right fan out into one output row per partner, exactly as a relational join
// does. An unmatched row is data, not a failure: it carries null right-side cells
// and is listed in `JoinResult::left_only` so callers can report it.

use crate::table::{Table, TableError};
use crate::value::Value;
use ahash::{AHashMap, AHashSet};
use std::fmt;

/// Suffix given to a right-side column whose name is already taken on the left.
pub const RIGHT_SUFFIX: &str = "_y";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum JoinKind {
    Left,
    Inner,
}

impl fmt::Display for JoinKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Left => f.write_str("left"),
            Self::Inner => f.write_str("inner"),
        }
    }
}

/// The joined table plus the partition of its rows.
#[derive(Debug, Clone)]
pub struct JoinResult {
    pub table: Table,
    /// Output row indices whose right side was found.
    pub matched: Vec<usize>,
    /// Output row indices whose right side is null. Always empty for inner joins.
    pub left_only: Vec<usize>,
    on: String,
    left_height: usize,
}

/// Counts describing how a join went, for diagnostics.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct JoinSummary {
    pub left_rows: usize,
    pub output_rows: usize,
    pub matched_rows: usize,
    pub unmatched_rows: usize,
    /// Distinct join keys with no partner on the right.
    pub missing_keys: usize,
}

impl JoinResult {
    /// Distinct join keys of the unmatched rows, in first-seen order.
    ///
    /// Left rows whose key is itself null never match and are not listed.
    pub fn missing_keys(&self) -> Vec<&Value> {
        let Ok(idx) = self.table.column_index(&self.on) else {
            return Vec::new();
        };
        let mut seen = AHashSet::new();
        self.left_only
            .iter()
            .map(|&row| &self.table.rows()[row][idx])
            .filter(|key| !key.is_null() && seen.insert(*key))
            .collect()
    }

    pub fn summary(&self) -> JoinSummary {
        JoinSummary {
            left_rows: self.left_height,
            output_rows: self.table.height(),
            matched_rows: self.matched.len(),
            unmatched_rows: self.left_only.len(),
            missing_keys: self.missing_keys().len(),
        }
    }

    pub fn into_table(self) -> Table {
        self.table
    }
}

/// Joins `left` and `right` on the column `on`, which both must carry.
///
/// Output columns are every left column followed by every right column except
/// `on`; a right column named like a left column is suffixed with `_y`.
/// Rows follow left order, and right order within a key.
pub fn join(left: &Table, right: &Table, on: &str, kind: JoinKind) -> Result<JoinResult, TableError> {
    let left_key = left.column_index(on)?;
    let right_key = right.column_index(on)?;

    let right_payload: Vec<usize> = (0..right.width()).filter(|&i| i != right_key).collect();

    let mut columns: Vec<String> = left.columns().to_vec();
    for &i in &right_payload {
        let name = &right.columns()[i];
        if left.has_column(name) {
            columns.push(format!("{name}{RIGHT_SUFFIX}"));
        } else {
            columns.push(name.clone());
        }
    }

    let mut partners: AHashMap<&Value, Vec<usize>> = AHashMap::new();
    for (row_idx, row) in right.rows().iter().enumerate() {
        let key = &row[right_key];
        if !key.is_null() {
            partners.entry(key).or_default().push(row_idx);
        }
    }

    let mut table = Table::new(columns);
    let mut matched = Vec::new();
    let mut left_only = Vec::new();

    for row in left.rows() {
        let key = &row[left_key];
        let found = if key.is_null() {
            None
        } else {
            partners.get(key)
        };

        match found {
            Some(right_rows) => {
                for &r in right_rows {
                    let mut out = Vec::with_capacity(row.len() + right_payload.len());
                    out.extend(row.iter().cloned());
                    out.extend(right_payload.iter().map(|&i| right.rows()[r][i].clone()));
                    matched.push(table.height());
                    table.push_row(out)?;
                }
            }
            None if kind == JoinKind::Left => {
                let mut out = Vec::with_capacity(row.len() + right_payload.len());
                out.extend(row.iter().cloned());
                out.extend(std::iter::repeat_n(Value::Null, right_payload.len()));
                left_only.push(table.height());
                table.push_row(out)?;
            }
            None => {}
        }
    }

    log::debug!(
        "{kind} join on '{on}': {} left rows, {} right rows -> {} rows ({} unmatched)",
        left.height(),
        right.height(),
        table.height(),
        left_only.len()
    );

    Ok(JoinResult {
        table,
        matched,
        left_only,
        on: on.to_string(),
        left_height: left.height(),
    })
}

/// Distinct non-null keys of `table[column]` that never occur in
/// `other[other_column]`, in first-seen order.
///
/// This is the orphan check a join does not perform on its own: it finds the
/// keys one side has and the other lacks.
pub fn keys_not_in<'a>(
    table: &'a Table,
    column: &str,
    other: &Table,
    other_column: &str,
) -> Result<Vec<&'a Value>, TableError> {
    let known: AHashSet<&Value> = other.column(other_column)?.collect();
    Ok(table
        .distinct(column)?
        .into_iter()
        .filter(|key| !known.contains(key))
        .collect())
}

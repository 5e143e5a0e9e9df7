//! Duplicate key detection.

use crate::table::{Table, TableError};
use crate::value::Value;
use ahash::AHashMap;

/// Rows sharing a key value with at least one other row.
#[derive(Debug, Clone)]
pub struct DuplicateReport {
    pub column: String,
    /// Every occurrence of a repeated key, not just the second and later ones.
    pub rows: Table,
    /// Repeated key values, in first-seen order.
    pub keys: Vec<Value>,
}

impl DuplicateReport {
    /// Number of distinct key values that repeat. Three rows sharing one key
    /// count once.
    #[inline]
    pub fn distinct_keys(&self) -> usize {
        self.keys.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.keys.is_empty()
    }
}

/// Scans `column` of `table` for values that occur more than once.
///
/// Rows with a missing key are kept in `rows` when several of them occur, but
/// a missing key is never a key value, so it is not listed in `keys`. The scan
/// never fails on duplicates; deciding whether they matter is left to the caller.
pub fn find_duplicates(table: &Table, column: &str) -> Result<DuplicateReport, TableError> {
    let mut counts: AHashMap<&Value, usize> = AHashMap::new();
    let mut order: Vec<&Value> = Vec::new();
    for value in table.column(column)? {
        let count = counts.entry(value).or_insert(0);
        if *count == 0 {
            order.push(value);
        }
        *count += 1;
    }

    let repeated = |value: &Value| counts.get(value).is_some_and(|&n| n > 1);

    let keys: Vec<Value> = order
        .iter()
        .filter(|value| !value.is_null() && repeated(**value))
        .map(|value| (*value).clone())
        .collect();

    let indices: Vec<usize> = table
        .column(column)?
        .enumerate()
        .filter(|(_, value)| repeated(*value))
        .map(|(i, _)| i)
        .collect();

    Ok(DuplicateReport {
        column: column.to_string(),
        rows: table.take(&indices),
        keys,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn keyed(keys: &[&str]) -> Table {
        Table::from_rows(
            ["snp", "row"],
            keys.iter()
                .enumerate()
                .map(|(i, k)| vec![Value::scalar(*k), Value::scalar(i.to_string())])
                .collect(),
        )
        .unwrap()
    }

    #[test]
    fn counts_distinct_keys_not_rows() {
        let report = find_duplicates(&keyed(&["a", "a", "a", "b", "c", "c"]), "snp").unwrap();
        assert_eq!(report.distinct_keys(), 2);
        assert_eq!(report.keys, vec![Value::scalar("a"), Value::scalar("c")]);
        assert_eq!(report.rows.height(), 5);
    }

    #[test]
    fn keeps_every_occurrence_in_original_order() {
        let report = find_duplicates(&keyed(&["x", "y", "x"]), "snp").unwrap();
        let rows: Vec<&Value> = report.rows.column("row").unwrap().collect();
        assert_eq!(rows, vec![&Value::scalar("0"), &Value::scalar("2")]);
    }

    #[test]
    fn unique_keys_produce_an_empty_report() {
        let report = find_duplicates(&keyed(&["a", "b"]), "snp").unwrap();
        assert!(report.is_empty());
        assert!(report.rows.is_empty());
    }

    #[test]
    fn missing_keys_never_count_as_a_repeated_key() {
        let table = Table::from_rows(
            ["snp"],
            vec![vec![Value::Null], vec![Value::Null], vec![Value::scalar("a")]],
        )
        .unwrap();
        let report = find_duplicates(&table, "snp").unwrap();
        assert_eq!(report.distinct_keys(), 0);
        assert!(report.keys.is_empty());
        assert_eq!(report.rows.height(), 2);
    }

    #[test]
    fn unknown_column_is_an_error() {
        assert!(find_duplicates(&keyed(&["a"]), "transcript").is_err());
    }
}

//! Membership resolution: which primary keys does a record's multi-valued field
//! belong to?

use crate::index::InvertedIndex;
use crate::table::{Table, TableError};
use crate::value::Value;
use ahash::AHashSet;
use natord::compare;

/// Resolves one cell against the index.
///
/// Every token with at least one posting contributes its keys; unknown tokens are
/// ignored here and left for the caller to report. The result is deduplicated
/// and naturally sorted, so trait `2` comes before trait `10`.
pub fn resolve(index: &InvertedIndex, value: &Value) -> Vec<String> {
    let mut keys: AHashSet<&str> = AHashSet::new();
    for token in value.tokens() {
        if let Some(postings) = index.get(token) {
            keys.extend(postings.iter().map(String::as_str));
        }
    }
    let mut sorted: Vec<String> = keys.into_iter().map(str::to_string).collect();
    sorted.sort_by(|a, b| compare(a, b));
    sorted
}

/// Tokens of `value` that the index does not know about, in input order.
pub fn unresolved<'a>(index: &InvertedIndex, value: &'a Value) -> Vec<&'a str> {
    value
        .tokens()
        .into_iter()
        .filter(|token| !index.contains(token))
        .collect()
}

/// Appends `output_column` to `table`, holding the resolved keys of
/// `input_column` for every row as a list.
pub fn annotate(
    table: &Table,
    index: &InvertedIndex,
    input_column: &str,
    output_column: &str,
) -> Result<Table, TableError> {
    let resolved: Vec<Value> = table
        .column(input_column)?
        .map(|value| Value::List(resolve(index, value)))
        .collect();
    table.clone().with_column(output_column, resolved)
}

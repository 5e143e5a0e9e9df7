// ========================================================================================
//
//                        Regrouping multi-valued fields under a new key
//
// ========================================================================================
//
// After a join has attached the new identifier (a gene set) to every record, the
// multi-valued field (a comma-delimited SNP list) is exploded into tokens, the
// tokens are grouped by the full key tuple, and each group collapses into a
// deduplicated set. Output order is fixed: groups sort by key tuple with natural
// ordering per component (so position 900 precedes 1000), members sort
// lexicographically. The same input always serializes to the same bytes.

use crate::table::{Table, TableError};
use crate::value::Value;
use natord::compare;
use std::cmp::Ordering;
use std::collections::{BTreeMap, BTreeSet};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum AggregateError {
    #[error(
        "{count} rows have no value in required column '{column}'; the join did not resolve them"
    )]
    NullGroupKey { column: String, count: usize },
    #[error(transparent)]
    Table(#[from] TableError),
}

/// Describes one regrouping.
#[derive(Debug, Clone, Copy)]
pub struct GroupSpec<'a> {
    /// Columns forming the composite group key, in output order.
    pub keys: &'a [&'a str],
    /// The multi-valued column collapsed within each group.
    pub members: &'a str,
    /// Column that must be fully populated before grouping may start.
    pub required: &'a str,
    /// Separator of the multi-valued column, both on input and on output.
    pub delimiter: char,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AggregatedGroup {
    pub key: Vec<String>,
    pub members: BTreeSet<String>,
}

impl AggregatedGroup {
    pub fn joined(&self, delimiter: char) -> String {
        let mut out = String::new();
        for (i, member) in self.members.iter().enumerate() {
            if i > 0 {
                out.push(delimiter);
            }
            out.push_str(member);
        }
        out
    }
}

/// A key tuple ordered component-wise with natural ordering.
#[derive(Debug, Clone, PartialEq, Eq)]
struct NaturalKey(Vec<String>);

impl Ord for NaturalKey {
    fn cmp(&self, other: &Self) -> Ordering {
        for (a, b) in self.0.iter().zip(&other.0) {
            // natord treats "01" and "1" as equal; fall back to bytes so that
            // distinct keys never merge.
            let ord = compare(a, b).then_with(|| a.cmp(b));
            if ord != Ordering::Equal {
                return ord;
            }
        }
        self.0.len().cmp(&other.0.len())
    }
}

impl PartialOrd for NaturalKey {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

/// Explodes, groups and collapses `table` according to `spec`.
///
/// Fails with [`AggregateError::NullGroupKey`] before any grouping work if the
/// required column holds a null. Rows with a null in any other key column are
/// dropped, as a group-by drops missing keys, and the drop is logged.
pub fn aggregate(table: &Table, spec: &GroupSpec) -> Result<Vec<AggregatedGroup>, AggregateError> {
    let nulls = table.null_count(spec.required)?;
    if nulls > 0 {
        return Err(AggregateError::NullGroupKey {
            column: spec.required.to_string(),
            count: nulls,
        });
    }

    let key_indices = spec
        .keys
        .iter()
        .map(|name| table.column_index(name))
        .collect::<Result<Vec<_>, _>>()?;
    let member_idx = table.column_index(spec.members)?;

    let mut groups: BTreeMap<NaturalKey, BTreeSet<String>> = BTreeMap::new();
    let mut dropped = 0usize;

    'rows: for row in table.rows() {
        let mut key = Vec::with_capacity(key_indices.len());
        for &i in &key_indices {
            match &row[i] {
                Value::Null => {
                    dropped += 1;
                    continue 'rows;
                }
                Value::Scalar(text) => key.push(text.clone()),
                listed @ Value::List(_) => key.push(listed.to_string()),
            }
        }

        let members = groups.entry(NaturalKey(key)).or_default();
        for token in row[member_idx].delimited_tokens(spec.delimiter) {
            members.insert(token.to_string());
        }
    }

    if dropped > 0 {
        log::warn!(
            "Dropped {dropped} rows with a missing value in grouping columns [{}]",
            spec.keys.join(", ")
        );
    }

    Ok(groups
        .into_iter()
        .map(|(key, members)| AggregatedGroup { key: key.0, members })
        .collect())
}

/// Lays aggregated groups out as a table: the key columns followed by the
/// member column, members joined with the grouping delimiter.
pub fn groups_to_table(groups: &[AggregatedGroup], spec: &GroupSpec) -> Result<Table, TableError> {
    let mut columns: Vec<&str> = spec.keys.to_vec();
    columns.push(spec.members);

    let mut table = Table::new(columns);
    for group in groups {
        let mut row: Vec<Value> = group.key.iter().map(|k| Value::scalar(k.as_str())).collect();
        row.push(Value::Scalar(group.joined(spec.delimiter)));
        table.push_row(row)?;
    }
    Ok(table)
}

#[cfg(test)]
mod tests {
    use super::*;

    const GENE_SET_GROUPS: GroupSpec<'static> = GroupSpec {
        keys: &["gene_set", "chrom", "pos"],
        members: "snp",
        required: "gene_set",
        delimiter: ',',
    };

    fn joined(rows: &[(&str, &str, &str, &str)]) -> Table {
        Table::from_rows(
            ["gene_set", "chrom", "pos", "snp"],
            rows.iter()
                .map(|(g, c, p, s)| vec![Value::parse(g), Value::parse(c), Value::parse(p), Value::parse(s)])
                .collect(),
        )
        .unwrap()
    }

    #[test]
    fn regrouping_deduplicates_tokens_from_different_rows() {
        let table = joined(&[
            ("GS1", "1", "100", "rs2,rs1"),
            ("GS1", "1", "100", "rs1,rs3"),
            ("GS2", "1", "100", "rs1"),
        ]);
        let groups = aggregate(&table, &GENE_SET_GROUPS).unwrap();
        assert_eq!(groups.len(), 2);
        assert_eq!(groups[0].key, vec!["GS1", "1", "100"]);
        assert_eq!(groups[0].joined(','), "rs1,rs2,rs3");
        assert_eq!(groups[1].joined(','), "rs1");
    }

    #[test]
    fn identity_regrouping_round_trips_the_token_set() {
        let table = joined(&[("GS1", "1", "100", "rs9,rs1,rs5,rs1")]);
        let groups = aggregate(&table, &GENE_SET_GROUPS).unwrap();
        let tokens: BTreeSet<&str> = groups[0].members.iter().map(String::as_str).collect();
        let original: BTreeSet<&str> = "rs9,rs1,rs5,rs1".split(',').collect();
        assert_eq!(tokens, original);
    }

    #[test]
    fn null_required_column_is_fatal() {
        let table = joined(&[("GS1", "1", "100", "rs1"), ("NA", "1", "200", "rs2")]);
        match aggregate(&table, &GENE_SET_GROUPS) {
            Err(AggregateError::NullGroupKey { column, count }) => {
                assert_eq!(column, "gene_set");
                assert_eq!(count, 1);
            }
            other => panic!("expected NullGroupKey, got {other:?}"),
        }
    }

    #[test]
    fn groups_sort_naturally_by_key_tuple() {
        let table = joined(&[
            ("GS1", "1", "1000", "rs1"),
            ("GS1", "1", "900", "rs2"),
            ("GS0", "2", "5", "rs3"),
        ]);
        let groups = aggregate(&table, &GENE_SET_GROUPS).unwrap();
        let keys: Vec<&str> = groups.iter().map(|g| g.key[2].as_str()).collect();
        assert_eq!(keys, vec!["5", "900", "1000"]);
    }

    #[test]
    fn rows_missing_a_secondary_key_are_dropped() {
        let table = joined(&[("GS1", "NA", "100", "rs1"), ("GS1", "1", "100", "rs2")]);
        let groups = aggregate(&table, &GENE_SET_GROUPS).unwrap();
        assert_eq!(groups.len(), 1);
        assert_eq!(groups[0].joined(','), "rs2");
    }

    #[test]
    fn keys_differing_only_in_zero_padding_stay_apart() {
        let table = joined(&[("GS1", "1", "01", "rs1"), ("GS1", "1", "1", "rs2")]);
        assert_eq!(aggregate(&table, &GENE_SET_GROUPS).unwrap().len(), 2);
    }

    #[test]
    fn table_layout_follows_the_grouping_columns() {
        let table = joined(&[("GS1", "1", "100", "rs2,rs1")]);
        let groups = aggregate(&table, &GENE_SET_GROUPS).unwrap();
        let out = groups_to_table(&groups, &GENE_SET_GROUPS).unwrap();
        assert_eq!(out.columns(), ["gene_set", "chrom", "pos", "snp"]);
        assert_eq!(out.value(0, "snp").unwrap(), Some(&Value::scalar("rs1,rs2")));
    }
}

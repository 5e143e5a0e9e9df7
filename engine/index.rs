//! Inverted index over a one-to-many relation.
//!
//! A relation maps each primary key (a gene set, a trait) to a list of secondary
//! tokens (genes, ICD-10 codes). The index turns it around: every token points at
//! the set of primary keys whose lists mention it. The relation is many-to-many
//! overall, so one token may collect any number of keys.

use crate::table::{Table, TableError};
use crate::value::Value;
use ahash::{AHashMap, AHashSet};
use natord::compare;

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct InvertedIndex {
    postings: AHashMap<String, AHashSet<String>>,
}

impl InvertedIndex {
    /// Builds the index from a relation table.
    ///
    /// Rows whose primary key is null are skipped. Secondary cells contribute
    /// their tokens as resolved at ingestion: list items, a lone scalar, or
    /// nothing for a null cell.
    pub fn build(
        relation: &Table,
        key_column: &str,
        values_column: &str,
    ) -> Result<Self, TableError> {
        let key_idx = relation.column_index(key_column)?;
        let values_idx = relation.column_index(values_column)?;

        let mut index = Self::default();
        for row in relation.rows() {
            let Some(key) = primary_key(&row[key_idx]) else {
                continue;
            };
            for token in row[values_idx].tokens() {
                index.insert(token, &key);
            }
        }

        log::debug!(
            "Built inverted index of {} tokens from {} relation rows",
            index.len(),
            relation.height()
        );
        Ok(index)
    }

    /// Builds the index from `(primary key, tokens)` pairs.
    pub fn from_pairs<I, K, T, S>(pairs: I) -> Self
    where
        I: IntoIterator<Item = (K, T)>,
        K: AsRef<str>,
        T: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut index = Self::default();
        for (key, tokens) in pairs {
            for token in tokens {
                index.insert(token.as_ref(), key.as_ref());
            }
        }
        index
    }

    fn insert(&mut self, token: &str, key: &str) {
        self.postings
            .entry(token.to_string())
            .or_default()
            .insert(key.to_string());
    }

    /// The primary keys referencing `token`, in no particular order.
    #[inline]
    pub fn get(&self, token: &str) -> Option<&AHashSet<String>> {
        self.postings.get(token)
    }

    /// The primary keys referencing `token`, naturally sorted for display.
    pub fn sorted_keys(&self, token: &str) -> Vec<&str> {
        let mut keys: Vec<&str> = self
            .get(token)
            .map(|set| set.iter().map(String::as_str).collect())
            .unwrap_or_default();
        keys.sort_by(|a, b| compare(a, b));
        keys
    }

    #[inline]
    pub fn contains(&self, token: &str) -> bool {
        self.postings.contains_key(token)
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.postings.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.postings.is_empty()
    }

    pub fn tokens(&self) -> impl Iterator<Item = &str> {
        self.postings.keys().map(String::as_str)
    }
}

/// Text of a primary-key cell. A list-valued key is rendered in bracket form.
fn primary_key(value: &Value) -> Option<String> {
    match value {
        Value::Null => None,
        Value::Scalar(text) => Some(text.clone()),
        Value::List(_) => Some(value.to_string()),
    }
}

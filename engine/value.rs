// ========================================================================================
//
//                           Cell values, resolved once at ingestion
//
// ========================================================================================
//
// Upstream tables carry multi-valued fields in several shapes: a native list, a
// bracketed string such as `"['I48', 'I422']"`, a bare scalar, or nothing at all.
// Every shape is folded into `Value` the moment a cell is read, so that nothing
// downstream ever has to look at the raw text again.

use std::fmt;

/// Raw cell spellings that are read as a missing value.
const NULL_SPELLINGS: &[&str] = &[
    "", "NA", "N/A", "NaN", "nan", "null", "NULL", "None", "<NA>",
];

/// A single cell of a [`crate::table::Table`].
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Value {
    Null,
    Scalar(String),
    List(Vec<String>),
}

impl Value {
    /// Resolves a raw text cell.
    ///
    /// A cell that starts with `[` is a bracket-encoded list: the brackets are
    /// stripped, the remainder is split on `,`, and every token is trimmed of
    /// whitespace and of surrounding quote characters. Empty tokens are dropped,
    /// so `"[]"` becomes an empty list.
    pub fn parse(raw: &str) -> Self {
        let trimmed = raw.trim();
        if NULL_SPELLINGS.contains(&trimmed) {
            return Value::Null;
        }
        if trimmed.starts_with('[') {
            return Value::List(parse_bracketed(trimmed));
        }
        Value::Scalar(raw.to_string())
    }

    /// Resolves a raw text cell that never holds a list: a null spelling is
    /// `Null`, anything else is kept byte for byte as a scalar.
    pub fn verbatim(raw: &str) -> Self {
        if NULL_SPELLINGS.contains(&raw.trim()) {
            Value::Null
        } else {
            Value::Scalar(raw.to_string())
        }
    }

    pub fn scalar(text: impl Into<String>) -> Self {
        Value::Scalar(text.into())
    }

    pub fn list<I, S>(items: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Value::List(items.into_iter().map(Into::into).collect())
    }

    #[inline]
    pub fn is_null(&self) -> bool {
        matches!(self, Value::Null)
    }

    /// The scalar text of this cell, if it holds exactly one.
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::Scalar(text) => Some(text.as_str()),
            _ => None,
        }
    }

    /// The atomic tokens this cell contributes to an index or a lookup.
    ///
    /// Lists yield their items, a scalar yields itself, `Null` yields nothing.
    pub fn tokens(&self) -> Vec<&str> {
        match self {
            Value::Null => Vec::new(),
            Value::Scalar(text) => vec![text.as_str()],
            Value::List(items) => items.iter().map(String::as_str).collect(),
        }
    }

    /// Tokens of a comma-delimited field, as used for SNP lists.
    ///
    /// A scalar is split on `,`; a list contributes its items unchanged.
    /// Empty tokens are skipped.
    pub fn delimited_tokens(&self, delimiter: char) -> Vec<&str> {
        match self {
            Value::Null => Vec::new(),
            Value::Scalar(text) => text
                .split(delimiter)
                .filter(|token| !token.is_empty())
                .collect(),
            Value::List(items) => items
                .iter()
                .map(String::as_str)
                .filter(|token| !token.is_empty())
                .collect(),
        }
    }
}

impl fmt::Display for Value {
    /// Lists are written back in bracket form so that a written table can be
    /// read again with [`Value::parse`].
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Null => Ok(()),
            Value::Scalar(text) => f.write_str(text),
            Value::List(items) => write!(f, "[{}]", items.join(", ")),
        }
    }
}

impl From<&str> for Value {
    fn from(raw: &str) -> Self {
        Value::parse(raw)
    }
}

fn parse_bracketed(text: &str) -> Vec<String> {
    let inner = text.trim_start_matches('[').trim_end_matches(']');
    inner
        .split(',')
        .map(|token| token.trim().trim_matches(|c| c == '\'' || c == '"'))
        .filter(|token| !token.is_empty())
        .map(str::to_string)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn bracketed_strings_become_lists() {
        assert_eq!(
            Value::parse("['I48', \"I422\" ,I489]"),
            Value::list(["I48", "I422", "I489"])
        );
        assert_eq!(Value::parse("[A, B, C]"), Value::list(["A", "B", "C"]));
        assert_eq!(Value::parse("[]"), Value::List(Vec::new()));
    }

    #[test]
    fn missing_spellings_are_null() {
        for raw in ["", "  ", "NA", "NaN", "nan", "None"] {
            assert!(Value::parse(raw).is_null(), "{raw:?} should be null");
        }
    }

    #[test]
    fn plain_text_stays_scalar_and_keeps_whitespace() {
        assert_eq!(Value::parse("ENST0001"), Value::scalar("ENST0001"));
        assert_eq!(Value::parse("rs1,rs2"), Value::scalar("rs1,rs2"));
        assert_eq!(Value::parse(" I48"), Value::scalar(" I48"));
    }

    #[test]
    fn verbatim_cells_keep_brackets_as_text() {
        assert_eq!(
            Value::verbatim("[LoF,missense]"),
            Value::scalar("[LoF,missense]")
        );
        assert_eq!(Value::verbatim("NA"), Value::Null);
    }

    #[test]
    fn delimited_tokens_split_scalars_only() {
        let snps = Value::scalar("rs1,rs2,,rs3");
        assert_eq!(snps.delimited_tokens(','), vec!["rs1", "rs2", "rs3"]);

        let listed = Value::list(["rs1,rs2"]);
        assert_eq!(listed.delimited_tokens(','), vec!["rs1,rs2"]);
        assert!(Value::Null.delimited_tokens(',').is_empty());
    }

    #[test]
    fn lists_display_in_bracket_form() {
        let value = Value::list(["1", "2"]);
        assert_eq!(value.to_string(), "[1, 2]");
        assert_eq!(Value::parse(&value.to_string()), value);
        assert_eq!(Value::Null.to_string(), "");
    }
}

//! Parsing and formatting of the GTF attribute (9th) column.
//!
//! The attribute column is a list of `key value;` clauses, e.g.
//! `gene_id "EDEN"; transcript_id "EDEN.1"; exon_number 1;`. Values may be
//! double-quoted, and a clause may carry several comma-separated values.
//! Keys keep their first-seen order, which is why [`Attributes`] is an
//! [`IndexMap`].

use indexmap::IndexMap;

use crate::escape::{escape, unescape};

/// An ordered mapping of attribute key to its (never empty) list of
/// unescaped values.
pub type Attributes = IndexMap<String, Vec<String>>;

/// Strip one pair of surrounding double quotes (either side may be
/// missing, as happens when a quoted value itself contained a comma).
fn strip_quotes(value: &str) -> &str {
    let value = value.strip_prefix('"').unwrap_or(value);
    value.strip_suffix('"').unwrap_or(value)
}

/// Parse the 9th column of a GTF feature line.
///
/// An empty column or a lone `.` gives an empty mapping. Clauses without
/// a value are skipped.
pub fn parse_attributes(text: &str) -> Attributes {
    let mut attributes = Attributes::new();
    let text = text.trim_end_matches(['\n', '\r']);
    if text.is_empty() || text == "." {
        return attributes;
    }

    // every clause ends in ';', so the last one has to go before splitting
    let text = text.trim_end();
    let text = text.strip_suffix(';').unwrap_or(text);

    for clause in text.split(';') {
        let clause = clause.trim();
        let Some((key, raw_value)) = clause.split_once(' ') else {
            continue;
        };
        let raw_value = raw_value.trim();
        if raw_value.is_empty() {
            continue;
        }
        let values = attributes.entry(key.trim().to_string()).or_default();
        values.extend(
            raw_value
                .split(',')
                .map(|piece| strip_quotes(&unescape(piece.trim())).to_string()),
        );
    }
    attributes
}

/// Whether a value is written bare rather than double-quoted.
fn is_bare_value(value: &str) -> bool {
    let digits = value.strip_prefix('-').unwrap_or(value);
    !digits.is_empty() && digits.bytes().all(|b| b.is_ascii_digit())
}

/// Format an attribute value: escaped, and quoted unless it is an integer.
fn format_value(value: &str) -> String {
    if is_bare_value(value) {
        value.to_string()
    } else {
        format!("\"{}\"", escape(value))
    }
}

/// Format an attribute mapping into a string suitable for the 9th column.
///
/// Each key renders as `key value[,value...]`, clauses are joined with
/// `"; "` and terminated by a single `;`. An empty mapping is `.`.
pub fn format_attributes(attributes: &Attributes) -> String {
    let clauses: Vec<String> = attributes
        .iter()
        .filter(|(_, values)| !values.is_empty())
        .map(|(key, values)| {
            let values: Vec<String> = values.iter().map(|v| format_value(v)).collect();
            format!("{} {}", escape(key), values.join(","))
        })
        .collect();
    if clauses.is_empty() {
        return ".".to_string();
    }
    let mut formatted = clauses.join("; ");
    formatted.push(';');
    formatted
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn test_parse_attributes() {
        let attrs = parse_attributes(r#"transcript_id "EDEN.3"; gene_id "EDEN"; gene_name "EDEN";"#);
        assert_eq!(attrs["gene_id"], vec!["EDEN"]);
        assert_eq!(attrs["transcript_id"], vec!["EDEN.3"]);
        let keys: Vec<&str> = attrs.keys().map(|k| k.as_str()).collect();
        assert_eq!(keys, vec!["transcript_id", "gene_id", "gene_name"]);
    }

    #[test]
    fn test_parse_attributes_empty() {
        assert!(parse_attributes("").is_empty());
        assert!(parse_attributes(".").is_empty());
        assert!(parse_attributes(".\n").is_empty());
    }

    #[test]
    fn test_parse_attributes_multivalue() {
        let attrs = parse_attributes("tag \"a\", \"b\",c; tag d; note \"x%2Cy\";\r\n");
        assert_eq!(attrs["tag"], vec!["a", "b", "c", "d"]);
        assert_eq!(attrs["note"], vec!["x,y"]);
        assert_eq!(attrs.len(), 2);
    }

    #[test]
    fn test_parse_attributes_skips_valueless_clauses() {
        let attrs = parse_attributes("gene_id \"g1\"; lonely; level 2");
        assert_eq!(attrs.len(), 2);
        assert_eq!(attrs["level"], vec!["2"]);
        assert!(!attrs.contains_key("lonely"));
    }

    #[test]
    fn test_parse_attributes_value_with_space() {
        let attrs = parse_attributes("product \"heat shock protein\";");
        assert_eq!(attrs["product"], vec!["heat shock protein"]);
    }

    #[test]
    fn test_format_attributes() {
        let mut attrs = Attributes::new();
        attrs.insert("gene_id".to_string(), vec!["EDEN".to_string()]);
        attrs.insert("exon_number".to_string(), vec!["2".to_string()]);
        attrs.insert(
            "tag".to_string(),
            vec!["basic".to_string(), "a;b".to_string()],
        );
        assert_eq!(
            format_attributes(&attrs),
            r#"gene_id "EDEN"; exon_number 2; tag "basic","a%3Bb";"#
        );
        assert_eq!(format_attributes(&Attributes::new()), ".");
    }

    fn attribute_map() -> impl Strategy<Value = Attributes> {
        let value = "[a-zA-Z0-9._%=&,-]([a-zA-Z0-9 ._%=&,-]{0,10}[a-zA-Z0-9._%=&,-])?";
        prop::collection::vec(
            ("[a-z_]{1,10}", prop::collection::vec(value, 1..4)),
            1..6,
        )
        .prop_map(|pairs| pairs.into_iter().collect())
    }

    proptest! {
        #[test]
        fn attributes_round_trip(attrs in attribute_map()) {
            let formatted = format_attributes(&attrs);
            prop_assert_eq!(parse_attributes(&formatted), attrs);
        }
    }
}

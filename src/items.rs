//! The parsed item types: features, directives, comments and sequences.
//!
//! A GTF file is a stream of [`Item`]s. Features carry the nine GTF columns
//! plus the subtrees the assembler grouped under them; the other three kinds
//! are flat records.

use serde::{Serialize, Serializer};

use crate::attributes::Attributes;
use crate::Position;

/// The fixed strand table, indexed by a signed strand offset plus one.
pub const STRAND_SYMBOLS: [&str; 3] = ["-", ".", "+"];

/// Nucleotide strand of a feature.
///
/// Anything other than `+`, `-` or `.` is passed through untouched as
/// [`Strand::Other`].
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Strand {
    Reverse,
    Unstranded,
    Forward,
    Other(String),
}

impl Strand {
    /// Build a strand from a signed offset: `-1`, `0` or `1`.
    pub fn from_offset(offset: i8) -> Option<Self> {
        match offset {
            -1 => Some(Strand::Reverse),
            0 => Some(Strand::Unstranded),
            1 => Some(Strand::Forward),
            _ => None,
        }
    }

    /// The column symbol for this strand.
    pub fn symbol(&self) -> &str {
        match self {
            Strand::Reverse => STRAND_SYMBOLS[0],
            Strand::Unstranded => STRAND_SYMBOLS[1],
            Strand::Forward => STRAND_SYMBOLS[2],
            Strand::Other(literal) => literal.as_str(),
        }
    }
}

impl From<&str> for Strand {
    fn from(literal: &str) -> Self {
        match literal {
            "-" => Strand::Reverse,
            "." => Strand::Unstranded,
            "+" => Strand::Forward,
            other => Strand::Other(other.to_string()),
        }
    }
}

impl Serialize for Strand {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.symbol())
    }
}

/// One GTF annotation record, and the features grouped under it.
///
/// Absent columns (`.` in the file) are `None`. Coordinates are 1-based
/// and inclusive; `start <= end` is not checked.
#[derive(Clone, Debug, Default, PartialEq, Serialize)]
pub struct Feature {
    pub seq_name: Option<String>,
    pub source: Option<String>,
    pub feature_type: Option<String>,
    pub start: Option<Position>,
    pub end: Option<Position>,
    pub score: Option<f64>,
    pub strand: Option<Strand>,
    pub frame: Option<String>,
    pub attributes: Attributes,
    pub child_features: Vec<Feature>,
    pub derived_features: Vec<Feature>,
}

impl Feature {
    /// The first value of attribute `key`, if present.
    pub fn attribute(&self, key: &str) -> Option<&str> {
        self.attributes
            .get(key)
            .and_then(|values| values.first())
            .map(|v| v.as_str())
    }

    /// Whether this feature's type is `feature_type`.
    pub fn is_type(&self, feature_type: &str) -> bool {
        self.feature_type.as_deref() == Some(feature_type)
    }

    /// The number of features in this tree, including this one.
    pub fn tree_size(&self) -> usize {
        let mut count = 0;
        let mut stack = vec![self];
        while let Some(feature) = stack.pop() {
            count += 1;
            stack.extend(feature.child_features.iter());
            stack.extend(feature.derived_features.iter());
        }
        count
    }
}

/// Structured fields extracted from the two directives that carry them.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
#[serde(untagged)]
pub enum DirectiveFields {
    SequenceRegion {
        seq_id: Option<String>,
        start: Option<String>,
        end: Option<String>,
    },
    GenomeBuild {
        source: Option<String>,
        buildname: Option<String>,
    },
}

/// A `##name [value]` control line.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct Directive {
    #[serde(rename = "directive")]
    pub name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub value: Option<String>,
    #[serde(flatten)]
    pub fields: Option<DirectiveFields>,
}

impl Directive {
    pub fn new(name: impl Into<String>, value: Option<String>) -> Self {
        Self {
            name: name.into(),
            value,
            fields: None,
        }
    }
}

/// A `#` comment line, without its leading `#`.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct Comment {
    pub comment: String,
}

/// A FASTA record from the trailing sequence section.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct Sequence {
    pub id: String,
    pub description: Option<String>,
    pub sequence: String,
}

/// Any item parsed from, or formatted to, GTF.
#[derive(Clone, Debug, PartialEq, Serialize)]
#[serde(untagged)]
pub enum Item {
    Feature(Feature),
    Directive(Directive),
    Comment(Comment),
    Sequence(Sequence),
}

impl Item {
    pub fn as_feature(&self) -> Option<&Feature> {
        match self {
            Item::Feature(feature) => Some(feature),
            _ => None,
        }
    }

    pub fn as_directive(&self) -> Option<&Directive> {
        match self {
            Item::Directive(directive) => Some(directive),
            _ => None,
        }
    }

    pub fn is_sequence(&self) -> bool {
        matches!(self, Item::Sequence(_))
    }
}

impl From<Feature> for Item {
    fn from(feature: Feature) -> Self {
        Item::Feature(feature)
    }
}

impl From<Directive> for Item {
    fn from(directive: Directive) -> Self {
        Item::Directive(directive)
    }
}

impl From<Comment> for Item {
    fn from(comment: Comment) -> Self {
        Item::Comment(comment)
    }
}

impl From<Sequence> for Item {
    fn from(sequence: Sequence) -> Self {
        Item::Sequence(sequence)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_strand_table() {
        assert_eq!(Strand::from_offset(-1).unwrap().symbol(), "-");
        assert_eq!(Strand::from_offset(0).unwrap().symbol(), ".");
        assert_eq!(Strand::from_offset(1).unwrap().symbol(), "+");
        assert_eq!(Strand::from_offset(2), None);
        assert_eq!(Strand::from("?"), Strand::Other("?".to_string()));
        assert_eq!(Strand::from("?").symbol(), "?");
    }

    #[test]
    fn test_feature_tree_size() {
        let mut gene = Feature::default();
        let mut transcript = Feature::default();
        transcript.child_features.push(Feature::default());
        transcript.child_features.push(Feature::default());
        gene.child_features.push(transcript);
        gene.derived_features.push(Feature::default());
        assert_eq!(gene.tree_size(), 5);
    }

    #[test]
    fn test_directive_json() {
        let directive = Directive {
            name: "sequence-region".to_string(),
            value: Some("ctgA 1 50000".to_string()),
            fields: Some(DirectiveFields::SequenceRegion {
                seq_id: Some("ctgA".to_string()),
                start: Some("1".to_string()),
                end: Some("50000".to_string()),
            }),
        };
        let json = serde_json::to_string(&Item::Directive(directive)).unwrap();
        assert_eq!(
            json,
            r#"{"directive":"sequence-region","value":"ctgA 1 50000","seq_id":"ctgA","start":"1","end":"50000"}"#
        );
    }

    #[test]
    fn test_feature_json_strand() {
        let feature = Feature {
            strand: Some(Strand::Forward),
            ..Default::default()
        };
        let json = serde_json::to_value(&feature).unwrap();
        assert_eq!(json["strand"], "+");
        assert!(json["frame"].is_null());
    }
}

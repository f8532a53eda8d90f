//! Decoding of 9-column GTF feature lines.

use crate::attributes::parse_attributes;
use crate::error::GtfError;
use crate::escape::unescape_optional;
use crate::items::{Feature, Strand};
use crate::Position;

use super::utils::{missing_to_none, parse_optional_column};

/// The number of tab-separated columns in a feature line.
pub const GTF_COLUMNS: usize = 9;

/// Parses a GTF feature line into a [`Feature`] with no children.
///
/// Cells holding `.` become `None`. The first three columns are
/// percent-unescaped, start and end are parsed as [`Position`]s, score as
/// an `f64`, and the attribute column through [`parse_attributes()`].
///
/// # Errors
///
/// Returns [`GtfError::WrongColumnCount`] if the line does not have
/// exactly nine columns, and [`GtfError::InvalidColumnType`] if a
/// numeric column cannot be parsed.
pub fn parse_feature(line: &str) -> Result<Feature, GtfError> {
    let line = line.trim_end_matches(['\n', '\r']);
    let columns: Vec<&str> = line.split('\t').collect();
    if columns.len() != GTF_COLUMNS {
        return Err(GtfError::WrongColumnCount(columns.len(), line.to_string()));
    }

    let start: Option<Position> = parse_optional_column("start", missing_to_none(columns[3]), line)?;
    let end: Option<Position> = parse_optional_column("end", missing_to_none(columns[4]), line)?;
    let score: Option<f64> = parse_optional_column("score", missing_to_none(columns[5]), line)?;

    Ok(Feature {
        seq_name: unescape_optional(missing_to_none(columns[0])),
        source: unescape_optional(missing_to_none(columns[1])),
        feature_type: unescape_optional(missing_to_none(columns[2])),
        start,
        end,
        score,
        strand: missing_to_none(columns[6]).map(Strand::from),
        frame: missing_to_none(columns[7]).map(String::from),
        attributes: parse_attributes(columns[8]),
        child_features: Vec::new(),
        derived_features: Vec::new(),
    })
}

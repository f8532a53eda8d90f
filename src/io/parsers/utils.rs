use std::str::FromStr;

use crate::error::GtfError;

/// The cell value GTF uses for an absent column.
pub const MISSING: &str = ".";

/// Map the `.` placeholder to `None`.
pub fn missing_to_none(cell: &str) -> Option<&str> {
    if cell == MISSING {
        None
    } else {
        Some(cell)
    }
}

/// Parse a column into `T`, reporting the column name and line on failure.
pub fn parse_column<T: FromStr>(
    column: &'static str,
    cell: &str,
    line: &str,
) -> Result<T, GtfError> {
    cell.trim()
        .parse::<T>()
        .map_err(|_| GtfError::InvalidColumnType {
            column,
            expected_type: std::any::type_name::<T>().to_string(),
            found_value: cell.to_string(),
            line: line.to_string(),
        })
}

/// Null-preserving [`parse_column()`]: `None` stays `None`.
pub fn parse_optional_column<T: FromStr>(
    column: &'static str,
    cell: Option<&str>,
    line: &str,
) -> Result<Option<T>, GtfError> {
    cell.map(|cell| parse_column(column, cell, line)).transpose()
}

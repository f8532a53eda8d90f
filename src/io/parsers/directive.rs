//! Decoding of `##` directive and `#` comment lines.

use lazy_static::lazy_static;
use regex::Regex;

use crate::error::GtfError;
use crate::items::{Comment, Directive, DirectiveFields};

lazy_static! {
    static ref DIRECTIVE: Regex = Regex::new(r"^\s*##\s*(\S+)\s*(.*)").unwrap();
}

/// Parse a directive line like `##sequence-region ctgA 1 50000`.
///
/// The text after the name becomes the directive's value when it is not
/// empty. `sequence-region` and `genome-build` directives also get their
/// value split into [`DirectiveFields`].
///
/// # Errors
///
/// Returns [`GtfError::InvalidDirective`] if the line is not of the form
/// `##name [value]`.
pub fn parse_directive(line: &str) -> Result<Directive, GtfError> {
    let captures = DIRECTIVE
        .captures(line)
        .ok_or_else(|| GtfError::InvalidDirective(line.to_string()))?;
    let name = &captures[1];
    let contents = captures[2].trim_end_matches(['\n', '\r']);

    let value = (!contents.is_empty()).then(|| contents.to_string());
    let mut parts = contents.split_whitespace().map(String::from);
    let fields = match name {
        "sequence-region" => Some(DirectiveFields::SequenceRegion {
            seq_id: parts.next(),
            start: parts.next().map(|s| only_digits(&s)),
            end: parts.next().map(|s| only_digits(&s)),
        }),
        "genome-build" => Some(DirectiveFields::GenomeBuild {
            source: parts.next(),
            buildname: parts.next(),
        }),
        _ => None,
    };

    Ok(Directive {
        name: name.to_string(),
        value,
        fields,
    })
}

fn only_digits(s: &str) -> String {
    s.chars().filter(|c| c.is_ascii_digit()).collect()
}

/// Parse a comment line, dropping one leading `#` and the whitespace after it.
pub fn parse_comment(line: &str) -> Comment {
    let text = line.trim_start();
    let text = text.strip_prefix('#').unwrap_or(text);
    Comment {
        comment: text.trim_start().trim_end_matches(['\n', '\r']).to_string(),
    }
}

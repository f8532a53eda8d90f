//! Line classification and record decoding for GTF text.
//!
//! Every physical line of a GTF file is one of a handful of kinds, told
//! apart by its first non-whitespace characters:
//!
//!  - `###`: a synchronization mark, asserting that nothing after it nests
//!    under anything before it.
//!  - `##name value`: a directive. `##FASTA` additionally starts the
//!    trailing sequence section.
//!  - `#text` (or four or more `#`): a comment.
//!  - `>id description`: a FASTA header, which also starts the sequence
//!    section when no `##FASTA` preceded it.
//!  - anything else: a 9-column, tab-delimited feature line.
//!
//! The decoders here are pure functions over a single line. Grouping
//! features into trees is the job of the [`Assembler`], and feeding lines
//! in is the job of the streaming driver.
//!
//! [`Assembler`]: crate::assembler::Assembler

pub mod directive;
pub mod fasta;
pub mod feature;
pub mod utils;

pub use directive::{parse_comment, parse_directive};
pub use fasta::{parse_sequence_header, SequenceBuilder};
pub use feature::parse_feature;

/// The kind of a single line of GTF text.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum LineKind {
    Blank,
    SyncMark,
    FastaStart,
    Directive,
    Comment,
    SequenceHeader,
    Feature,
}

/// Classify a line (without its line terminator).
pub fn classify_line(line: &str) -> LineKind {
    let trimmed = line.trim_start();
    if trimmed.is_empty() {
        return LineKind::Blank;
    }
    if trimmed.starts_with('#') {
        let hashes = trimmed.bytes().take_while(|b| *b == b'#').count();
        return match hashes {
            3 => LineKind::SyncMark,
            2 if trimmed[2..].split_whitespace().next() == Some("FASTA") => LineKind::FastaStart,
            2 => LineKind::Directive,
            _ => LineKind::Comment,
        };
    }
    if trimmed.starts_with('>') {
        return LineKind::SequenceHeader;
    }
    LineKind::Feature
}

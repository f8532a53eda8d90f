//! Accumulation of the trailing FASTA section into [`Sequence`] records.

use log::debug;

use crate::items::Sequence;

/// Parse a `>id description` header into an empty [`Sequence`].
pub fn parse_sequence_header(line: &str) -> Sequence {
    let header = line.trim().trim_start_matches('>');
    let (id, description) = match header.split_once(char::is_whitespace) {
        Some((id, rest)) => {
            let rest = rest.trim();
            (id, (!rest.is_empty()).then(|| rest.to_string()))
        }
        None => (header, None),
    };
    Sequence {
        id: id.to_string(),
        description,
        sequence: String::new(),
    }
}

/// Builds [`Sequence`] records one line at a time. A record is complete
/// when the next header arrives, or when [`SequenceBuilder::finish()`] is
/// called at the end of input.
#[derive(Debug, Default)]
pub struct SequenceBuilder {
    current: Option<Sequence>,
}

impl SequenceBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add one line of the FASTA section, returning the previous record if
    /// this line starts a new one.
    pub fn add_line(&mut self, line: &str) -> Option<Sequence> {
        let trimmed = line.trim_start();
        if trimmed.starts_with('>') {
            return self.current.replace(parse_sequence_header(trimmed));
        }
        if trimmed.is_empty() || trimmed.starts_with('#') {
            return None;
        }
        match self.current.as_mut() {
            Some(sequence) => sequence
                .sequence
                .extend(trimmed.chars().filter(|c| !c.is_whitespace())),
            None => debug!("skipping sequence data before the first FASTA header"),
        }
        None
    }

    /// Take the record under construction, if any.
    pub fn finish(&mut self) -> Option<Sequence> {
        self.current.take()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_sequence_header() {
        let seq = parse_sequence_header(">ctgA test contig");
        assert_eq!(seq.id, "ctgA");
        assert_eq!(seq.description.as_deref(), Some("test contig"));

        let seq = parse_sequence_header(">ctgB");
        assert_eq!(seq.id, "ctgB");
        assert_eq!(seq.description, None);
    }

    #[test]
    fn test_sequence_builder() {
        let mut builder = SequenceBuilder::new();
        assert_eq!(builder.add_line("ACGT"), None);
        assert_eq!(builder.add_line(">one first"), None);
        assert_eq!(builder.add_line("ACGT"), None);
        assert_eq!(builder.add_line("TT GG "), None);
        assert_eq!(builder.add_line(""), None);
        let first = builder.add_line(">two").unwrap();
        assert_eq!(first.id, "one");
        assert_eq!(first.sequence, "ACGTTTGG");
        builder.add_line("NNNN");
        let second = builder.finish().unwrap();
        assert_eq!(second.id, "two");
        assert_eq!(second.sequence, "NNNN");
        assert_eq!(builder.finish(), None);
    }
}

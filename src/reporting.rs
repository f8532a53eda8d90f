//! Types for standardized reports to the user about a parse or format run.
//!
//! Streaming commands keep going past bad lines, so anything that was
//! skipped, evicted early or grouped ambiguously is collected here and
//! shown to the user at the end instead of being lost in the log.

use std::fmt;

use crate::io::ParseStats;

/// The [`CommandOutput<U>`] type output is generic over some data output
/// from a command, and a [`Report`] that reports information to the user.
#[derive(Debug)]
pub struct CommandOutput<U> {
    value: U,
    report: Report,
}

impl<U> CommandOutput<U> {
    pub fn new(value: U, report: Report) -> Self {
        Self { value, report }
    }

    pub fn value(&self) -> &U {
        &self.value
    }

    pub fn report(&self) -> &Report {
        &self.report
    }
}

/// A type to (semi) standardize reporting to the user.
#[derive(Debug, Default)]
pub struct Report {
    entries: Vec<String>,
    stats: Option<ParseStats>,
}

impl Report {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_issue(&mut self, message: String) {
        self.entries.push(message)
    }

    pub fn issues(&self) -> &[String] {
        &self.entries
    }

    pub fn stats(&self) -> Option<&ParseStats> {
        self.stats.as_ref()
    }

    /// Record the final counters of a parse, adding an issue for each kind
    /// of problem it ran into.
    pub fn set_stats(&mut self, stats: ParseStats) {
        if stats.evictions > 0 {
            self.add_issue(format!(
                "{} feature units were emitted early because the lookback buffer was full; \
                 some children may have been split from their parents",
                stats.evictions
            ));
        }
        if stats.ambiguous_groupings > 0 {
            self.add_issue(format!(
                "{} features reused a gene_id or transcript_id that was still pending",
                stats.ambiguous_groupings
            ));
        }
        self.stats = Some(stats);
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl fmt::Display for Report {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if let Some(stats) = &self.stats {
            writeln!(
                f,
                "{} lines: {} features, {} directives, {} comments, {} sequences",
                stats.lines, stats.features, stats.directives, stats.comments, stats.sequences
            )?;
        }
        for entry in &self.entries {
            writeln!(f, "warning: {}", entry)?;
        }
        Ok(())
    }
}

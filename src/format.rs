//! The canonical formatter, which writes items back out as GTF text.
//!
//! A [`GtfFormatter`] is one formatting session. It de-duplicates feature
//! lines across everything it formats, inserts a `###` synchronization mark
//! every [`FormatConfig::min_sync_lines`] lines or so, switches to the
//! FASTA section on the first [`Sequence`], and can prepend a
//! `##gff-version 2` directive.
//!
//! [`format_sync()`] formats a whole list of items in one go, with sequences
//! gathered at the end and no synchronization marks.

use std::collections::HashSet;
use std::io::Write;

use log::debug;

use crate::attributes::format_attributes;
use crate::error::GtfError;
use crate::escape::escape_column;
use crate::io::parsers::utils::MISSING;
use crate::items::{Comment, Directive, Feature, Item, Sequence};

pub const DEFAULT_MIN_SYNC_LINES: usize = 100;
pub const DEFAULT_MAX_DEPTH: usize = 64;
pub const VERSION_DIRECTIVE: &str = "##gff-version 2\n";

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct FormatConfig {
    /// Minimum number of lines between `###` marks.
    pub min_sync_lines: usize,
    /// Prepend `##gff-version 2` unless the first item already is one.
    pub insert_version_directive: bool,
    /// Deepest allowed feature nesting, counting the root as depth 0.
    pub max_depth: usize,
}

impl Default for FormatConfig {
    fn default() -> Self {
        Self {
            min_sync_lines: DEFAULT_MIN_SYNC_LINES,
            insert_version_directive: false,
            max_depth: DEFAULT_MAX_DEPTH,
        }
    }
}

impl FormatConfig {
    pub fn with_min_sync_lines(mut self, min_sync_lines: usize) -> Self {
        self.min_sync_lines = min_sync_lines;
        self
    }

    pub fn with_version_directive(mut self, insert: bool) -> Self {
        self.insert_version_directive = insert;
        self
    }

    pub fn with_max_depth(mut self, max_depth: usize) -> Self {
        self.max_depth = max_depth;
        self
    }
}

fn column<T: ToString>(value: Option<&T>) -> String {
    match value {
        Some(value) => escape_column(&value.to_string()).into_owned(),
        None => MISSING.to_string(),
    }
}

/// Render a single feature as one GTF line, ignoring its children.
pub fn format_feature_line(feature: &Feature) -> String {
    let strand = feature
        .strand
        .as_ref()
        .map_or(MISSING, |strand| strand.symbol());
    let columns = [
        column(feature.seq_name.as_ref()),
        column(feature.source.as_ref()),
        column(feature.feature_type.as_ref()),
        column(feature.start.as_ref()),
        column(feature.end.as_ref()),
        column(feature.score.as_ref()),
        strand.to_string(),
        column(feature.frame.as_ref()),
        format_attributes(&feature.attributes),
    ];
    let mut line = columns.join("\t");
    line.push('\n');
    line
}

/// Render a feature tree depth-first: each feature line, then its
/// `child_features`, then its `derived_features`. Lines already in `seen`
/// are skipped.
fn render_feature_tree(
    root: &Feature,
    seen: &mut HashSet<String>,
    max_depth: usize,
    out: &mut String,
) -> Result<(), GtfError> {
    let mut stack = vec![(root, 0usize)];
    while let Some((feature, depth)) = stack.pop() {
        if depth > max_depth {
            return Err(GtfError::MaxDepthExceeded(max_depth));
        }
        let line = format_feature_line(feature);
        if !seen.contains(&line) {
            out.push_str(&line);
            seen.insert(line);
        }
        let children = feature
            .child_features
            .iter()
            .chain(feature.derived_features.iter());
        // reversed, so they pop off in order
        for child in children.rev() {
            stack.push((child, depth + 1));
        }
    }
    Ok(())
}

/// Format a feature tree into GTF lines, de-duplicating identical lines
/// within the tree.
///
/// # Errors
///
/// Returns [`GtfError::MaxDepthExceeded`] if the tree nests deeper than
/// [`DEFAULT_MAX_DEPTH`].
pub fn format_feature(feature: &Feature) -> Result<String, GtfError> {
    let mut out = String::new();
    render_feature_tree(feature, &mut HashSet::new(), DEFAULT_MAX_DEPTH, &mut out)?;
    Ok(out)
}

pub fn format_directive(directive: &Directive) -> String {
    match directive.value.as_deref() {
        Some(value) if !value.is_empty() => format!("##{} {}\n", directive.name, value),
        _ => format!("##{}\n", directive.name),
    }
}

pub fn format_comment(comment: &Comment) -> String {
    format!("# {}\n", comment.comment)
}

/// Format a sequence as a FASTA record, with the whole sequence on one line.
pub fn format_sequence(sequence: &Sequence) -> String {
    match sequence.description.as_deref() {
        Some(description) if !description.is_empty() => format!(
            ">{} {}\n{}\n",
            sequence.id, description, sequence.sequence
        ),
        _ => format!(">{}\n{}\n", sequence.id, sequence.sequence),
    }
}

/// One formatting session.
#[derive(Clone, Debug, Default)]
pub struct GtfFormatter {
    config: FormatConfig,
    lines_since_last_sync_mark: usize,
    have_emitted_data: bool,
    fasta_mode: bool,
    seen: HashSet<String>,
}

impl GtfFormatter {
    pub fn new(config: FormatConfig) -> Self {
        Self {
            config,
            ..Default::default()
        }
    }

    pub fn config(&self) -> &FormatConfig {
        &self.config
    }

    /// Whether a sequence has been formatted, after which only FASTA
    /// records follow.
    pub fn is_fasta_mode(&self) -> bool {
        self.fasta_mode
    }

    fn render_item(&mut self, item: &Item, out: &mut String) -> Result<(), GtfError> {
        match item {
            Item::Feature(feature) => {
                render_feature_tree(feature, &mut self.seen, self.config.max_depth, out)?
            }
            Item::Directive(directive) => out.push_str(&format_directive(directive)),
            Item::Comment(comment) => out.push_str(&format_comment(comment)),
            Item::Sequence(sequence) => {
                if !self.fasta_mode {
                    out.push_str("##FASTA\n");
                    self.fasta_mode = true;
                }
                out.push_str(&format_sequence(sequence));
            }
        }
        Ok(())
    }

    /// Format one emitted chunk: a single item, or the items of one unit.
    pub fn format_chunk(&mut self, chunk: &[Item]) -> Result<String, GtfError> {
        let mut out = String::new();
        if !self.have_emitted_data && self.config.insert_version_directive {
            let has_version = matches!(
                chunk.first(),
                Some(Item::Directive(directive)) if directive.name == "gff-version"
            );
            if !has_version {
                out.push_str(VERSION_DIRECTIVE);
            }
        }

        let mut body = String::new();
        for item in chunk {
            self.render_item(item, &mut body)?;
        }
        self.lines_since_last_sync_mark += body.matches('\n').count();
        out.push_str(&body);

        if !self.fasta_mode
            && self.lines_since_last_sync_mark > 0
            && self.lines_since_last_sync_mark >= self.config.min_sync_lines
        {
            debug!(
                "writing sync mark after {} lines",
                self.lines_since_last_sync_mark
            );
            out.push_str("###\n");
            self.lines_since_last_sync_mark = 0;
        }

        self.have_emitted_data = true;
        Ok(out)
    }

    pub fn format_item(&mut self, item: &Item) -> Result<String, GtfError> {
        self.format_chunk(std::slice::from_ref(item))
    }
}

/// Streams formatted items into any [`Write`].
#[derive(Debug)]
pub struct GtfWriter<W: Write> {
    writer: W,
    formatter: GtfFormatter,
    lines: usize,
}

impl<W: Write> GtfWriter<W> {
    pub fn new(writer: W, config: FormatConfig) -> Self {
        Self {
            writer,
            formatter: GtfFormatter::new(config),
            lines: 0,
        }
    }

    pub fn formatter(&self) -> &GtfFormatter {
        &self.formatter
    }

    /// Number of lines written so far.
    pub fn lines_written(&self) -> usize {
        self.lines
    }

    pub fn write_chunk(&mut self, chunk: &[Item]) -> Result<(), GtfError> {
        let text = self.formatter.format_chunk(chunk)?;
        self.lines += text.matches('\n').count();
        self.writer.write_all(text.as_bytes())?;
        Ok(())
    }

    pub fn write_item(&mut self, item: &Item) -> Result<(), GtfError> {
        self.write_chunk(std::slice::from_ref(item))
    }

    /// Flush and hand back the underlying writer.
    pub fn finish(mut self) -> Result<W, GtfError> {
        self.writer.flush()?;
        Ok(self.writer)
    }
}

/// Format a list of items into GTF text.
///
/// Features, directives and comments are written in order. If there are
/// any sequences, they follow after a single `##FASTA` line. No sync marks
/// or version directive are inserted.
///
/// # Example
///
/// ```
/// use gtfio::prelude::*;
///
/// let gtf = "ctgA\texample\tgene\t1\t100\t.\t+\t.\tgene_id \"a\";\n";
/// let items = parse_str_sync(gtf, &ParserConfig::default()).unwrap();
/// assert_eq!(format_sync(&items).unwrap(), gtf);
/// ```
pub fn format_sync(items: &[Item]) -> Result<String, GtfError> {
    let (sequences, others): (Vec<&Item>, Vec<&Item>) =
        items.iter().partition(|item| item.is_sequence());
    let mut formatter = GtfFormatter::default();
    let mut out = String::new();
    for item in others {
        formatter.render_item(item, &mut out)?;
    }
    for item in sequences {
        formatter.render_item(item, &mut out)?;
    }
    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::attributes::Attributes;
    use crate::items::Strand;

    fn gene(id: &str) -> Feature {
        let mut attributes = Attributes::new();
        attributes.insert("gene_id".to_string(), vec![id.to_string()]);
        Feature {
            seq_name: Some("ctgA".to_string()),
            source: Some("example".to_string()),
            feature_type: Some("gene".to_string()),
            start: Some(1050),
            end: Some(9000),
            strand: Some(Strand::Forward),
            attributes,
            ..Default::default()
        }
    }

    #[test]
    fn test_format_feature_line() {
        let mut feature = gene("EDEN");
        feature.score = Some(0.5);
        feature.frame = Some("0".to_string());
        assert_eq!(
            format_feature_line(&feature),
            "ctgA\texample\tgene\t1050\t9000\t0.5\t+\t0\tgene_id \"EDEN\";\n"
        );
        assert_eq!(
            format_feature_line(&Feature::default()),
            ".\t.\t.\t.\t.\t.\t.\t.\t.\n"
        );
    }

    #[test]
    fn test_format_feature_line_escapes_columns() {
        let mut feature = gene("x");
        feature.seq_name = Some("SL2.40%ch01".to_string());
        feature.source = Some("a\tb".to_string());
        feature.strand = Some(Strand::Reverse);
        feature.score = Some(1.0);
        let line = format_feature_line(&feature);
        assert!(line.starts_with("SL2.40%25ch01\ta%09b\tgene\t1050\t9000\t1\t-\t"));
    }

    #[test]
    fn test_children_depth_first() {
        let mut root = gene("a");
        let mut transcript = gene("a");
        transcript.feature_type = Some("transcript".to_string());
        let mut exon = gene("a");
        exon.feature_type = Some("exon".to_string());
        let mut derived = gene("a");
        derived.feature_type = Some("CDS".to_string());
        transcript.child_features.push(exon);
        root.child_features.push(transcript);
        root.derived_features.push(derived);

        let text = format_feature(&root).unwrap();
        let types: Vec<&str> = text
            .lines()
            .map(|line| line.split('\t').nth(2).unwrap())
            .collect();
        assert_eq!(types, vec!["gene", "transcript", "exon", "CDS"]);
    }

    #[test]
    fn test_dedup_within_session() {
        let items = vec![Item::Feature(gene("a")), Item::Feature(gene("a"))];
        let text = format_sync(&items).unwrap();
        assert_eq!(text.lines().count(), 1);

        let mut formatter = GtfFormatter::default();
        assert_eq!(formatter.format_chunk(&items).unwrap().lines().count(), 1);
        assert_eq!(formatter.format_item(&items[0]).unwrap(), "");
    }

    #[test]
    fn test_max_depth() {
        let mut feature = gene("leaf");
        for _ in 0..4 {
            let mut parent = gene("node");
            parent.child_features.push(feature);
            feature = parent;
        }
        let mut formatter = GtfFormatter::new(FormatConfig::default().with_max_depth(3));
        let err = formatter
            .format_item(&Item::Feature(feature.clone()))
            .unwrap_err();
        assert!(matches!(err, GtfError::MaxDepthExceeded(3)));

        let mut formatter = GtfFormatter::new(FormatConfig::default().with_max_depth(4));
        assert!(formatter.format_item(&Item::Feature(feature)).is_ok());
    }

    #[test]
    fn test_directive_comment_sequence() {
        assert_eq!(
            format_directive(&Directive::new("gff-version", Some("2".to_string()))),
            "##gff-version 2\n"
        );
        assert_eq!(format_directive(&Directive::new("FASTA", None)), "##FASTA\n");
        assert_eq!(
            format_comment(&Comment {
                comment: "hi".to_string()
            }),
            "# hi\n"
        );
        let mut sequence = Sequence {
            id: "ctgA".to_string(),
            description: Some("test contig".to_string()),
            sequence: "ACGT".to_string(),
        };
        assert_eq!(format_sequence(&sequence), ">ctgA test contig\nACGT\n");
        sequence.description = None;
        assert_eq!(format_sequence(&sequence), ">ctgA\nACGT\n");
    }

    #[test]
    fn test_version_directive_insertion() {
        let config = FormatConfig::default().with_version_directive(true);
        let mut formatter = GtfFormatter::new(config.clone());
        let text = formatter.format_item(&Item::Feature(gene("a"))).unwrap();
        assert!(text.starts_with(VERSION_DIRECTIVE));
        let text = formatter.format_item(&Item::Feature(gene("b"))).unwrap();
        assert!(!text.contains("gff-version"));

        let mut formatter = GtfFormatter::new(config);
        let version = Item::Directive(Directive::new("gff-version", Some("2".to_string())));
        assert_eq!(formatter.format_item(&version).unwrap(), "##gff-version 2\n");
    }

    #[test]
    fn test_sync_marks() {
        let mut formatter = GtfFormatter::new(FormatConfig::default().with_min_sync_lines(2));
        assert!(!formatter
            .format_item(&Item::Feature(gene("a")))
            .unwrap()
            .contains("###"));
        assert!(formatter
            .format_item(&Item::Feature(gene("b")))
            .unwrap()
            .ends_with("###\n"));
        assert!(!formatter
            .format_item(&Item::Feature(gene("c")))
            .unwrap()
            .contains("###"));
    }

    #[test]
    fn test_fasta_mode() {
        let mut formatter = GtfFormatter::new(FormatConfig::default().with_min_sync_lines(1));
        let sequence = Item::Sequence(Sequence {
            id: "s".to_string(),
            description: None,
            sequence: "AC".to_string(),
        });
        assert_eq!(
            formatter.format_item(&sequence).unwrap(),
            "##FASTA\n>s\nAC\n"
        );
        assert!(formatter.is_fasta_mode());
        assert_eq!(formatter.format_item(&sequence).unwrap(), ">s\nAC\n");
    }

    #[test]
    fn test_format_sync_moves_sequences_last() {
        let items = vec![
            Item::Sequence(Sequence {
                id: "s".to_string(),
                description: None,
                sequence: "AC".to_string(),
            }),
            Item::Feature(gene("a")),
            Item::Comment(Comment {
                comment: "note".to_string(),
            }),
        ];
        let text = format_sync(&items).unwrap();
        let lines: Vec<&str> = text.lines().collect();
        assert_eq!(lines.len(), 5);
        assert!(lines[0].starts_with("ctgA\t"));
        assert_eq!(&lines[1..], &["# note", "##FASTA", ">s", "AC"]);
        assert_eq!(format_sync(&[]).unwrap(), "");
    }

    #[test]
    fn test_gtf_writer() {
        let mut writer = GtfWriter::new(Vec::new(), FormatConfig::default());
        writer.write_item(&Item::Feature(gene("a"))).unwrap();
        writer
            .write_item(&Item::Directive(Directive::new("FASTA", None)))
            .unwrap();
        assert_eq!(writer.lines_written(), 2);
        let bytes = writer.finish().unwrap();
        let text = String::from_utf8(bytes).unwrap();
        assert!(text.ends_with("##FASTA\n"));
    }
}

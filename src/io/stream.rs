//! The streaming driver: feeds lines through the decoders and the
//! [`Assembler`], and hands finished items to an [`ItemSink`].
//!
//! There are three ways in:
//!
//!  1. [`GtfParser::add_line()`], push-based, one line at a time.
//!
//!  2. [`GtfStreamParser::write()`], push-based over arbitrary byte chunks,
//!     which are re-split on `\r?\n` here.
//!
//!  3. [`GtfIterator`], a pull-based parsing iterator over any
//!     [`BufRead`], and [`parse_str_sync()`] for a whole string at once.
//!
//! Whichever is used, [`GtfParser::finish()`] must be called at the end of
//! input. Abandoning a parse drops the feature trees that were still
//! pending in the lookback window.

use std::collections::VecDeque;
use std::io::BufRead;

use bytes::{Buf, BytesMut};
use log::{debug, warn};

use crate::assembler::{Assembler, DEFAULT_BUFFER_SIZE};
use crate::error::GtfError;
use crate::io::parsers::{
    classify_line, parse_comment, parse_directive, parse_feature, LineKind, SequenceBuilder,
};
use crate::items::{Comment, Directive, Feature, Item, Sequence};

// line buffer capacity for the reading iterator
pub const PARSE_CAPACITY: usize = 512;

/// Which item kinds a parse delivers, and how much it may buffer.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ParserConfig {
    pub parse_features: bool,
    pub parse_directives: bool,
    pub parse_comments: bool,
    pub parse_sequences: bool,
    /// Maximum number of pending top-level feature units (`None` is unbounded).
    pub buffer_size: Option<usize>,
    /// Maximum number of bytes held without a line break (`None` is unbounded).
    pub max_line_length: Option<usize>,
}

impl Default for ParserConfig {
    fn default() -> Self {
        Self {
            parse_features: true,
            parse_directives: false,
            parse_comments: false,
            parse_sequences: true,
            buffer_size: Some(DEFAULT_BUFFER_SIZE),
            max_line_length: None,
        }
    }
}

impl ParserConfig {
    pub fn new() -> Self {
        Self::default()
    }

    /// Deliver every item kind.
    pub fn parse_all(mut self) -> Self {
        self.parse_features = true;
        self.parse_directives = true;
        self.parse_comments = true;
        self.parse_sequences = true;
        self
    }

    pub fn with_features(mut self, parse: bool) -> Self {
        self.parse_features = parse;
        self
    }

    pub fn with_directives(mut self, parse: bool) -> Self {
        self.parse_directives = parse;
        self
    }

    pub fn with_comments(mut self, parse: bool) -> Self {
        self.parse_comments = parse;
        self
    }

    pub fn with_sequences(mut self, parse: bool) -> Self {
        self.parse_sequences = parse;
        self
    }

    pub fn with_buffer_size(mut self, buffer_size: Option<usize>) -> Self {
        self.buffer_size = buffer_size;
        self
    }

    pub fn with_max_line_length(mut self, max_line_length: Option<usize>) -> Self {
        self.max_line_length = max_line_length;
        self
    }
}

/// The receiving end of a parse. Each kind of item has its own method;
/// kinds the [`ParserConfig`] turned off are never delivered.
///
/// [`ItemSink::error()`] decides what a decode error means: returning
/// `Ok(())` skips the bad line and keeps parsing, returning the error
/// aborts the parse. The default logs a warning and keeps going.
pub trait ItemSink {
    fn feature(&mut self, feature: Feature);

    fn directive(&mut self, _directive: Directive) {}

    fn comment(&mut self, _comment: Comment) {}

    fn sequence(&mut self, _sequence: Sequence) {}

    fn error(&mut self, error: GtfError) -> Result<(), GtfError> {
        warn!("skipping line: {}", error);
        Ok(())
    }
}

/// Collects items in order. Decode errors are fatal.
impl ItemSink for Vec<Item> {
    fn feature(&mut self, feature: Feature) {
        self.push(Item::Feature(feature));
    }

    fn directive(&mut self, directive: Directive) {
        self.push(Item::Directive(directive));
    }

    fn comment(&mut self, comment: Comment) {
        self.push(Item::Comment(comment));
    }

    fn sequence(&mut self, sequence: Sequence) {
        self.push(Item::Sequence(sequence));
    }

    fn error(&mut self, error: GtfError) -> Result<(), GtfError> {
        Err(error)
    }
}

/// Queues items and decode errors in order, for [`GtfIterator`].
impl ItemSink for VecDeque<Result<Item, GtfError>> {
    fn feature(&mut self, feature: Feature) {
        self.push_back(Ok(Item::Feature(feature)));
    }

    fn directive(&mut self, directive: Directive) {
        self.push_back(Ok(Item::Directive(directive)));
    }

    fn comment(&mut self, comment: Comment) {
        self.push_back(Ok(Item::Comment(comment)));
    }

    fn sequence(&mut self, sequence: Sequence) {
        self.push_back(Ok(Item::Sequence(sequence)));
    }

    fn error(&mut self, error: GtfError) -> Result<(), GtfError> {
        self.push_back(Err(error));
        Ok(())
    }
}

type Callback<'a, T> = Option<Box<dyn FnMut(T) + 'a>>;

/// An [`ItemSink`] built from optional closures, one per item kind.
/// Kinds without a registered closure are dropped.
///
/// # Example
///
/// ```
/// use gtfio::prelude::*;
///
/// let mut features = 0;
/// let callbacks = Callbacks::new().on_feature(|_| features += 1);
/// let mut parser = GtfParser::new(ParserConfig::default(), callbacks);
/// parser
///     .add_line("ctgA\texample\tgene\t1\t100\t.\t+\t.\tgene_id \"a\";")
///     .unwrap();
/// parser.finish().unwrap();
/// assert_eq!(features, 1);
/// ```
#[derive(Default)]
pub struct Callbacks<'a> {
    feature: Callback<'a, Feature>,
    directive: Callback<'a, Directive>,
    comment: Callback<'a, Comment>,
    sequence: Callback<'a, Sequence>,
    error: Option<Box<dyn FnMut(GtfError) -> Result<(), GtfError> + 'a>>,
}

impl std::fmt::Debug for Callbacks<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Callbacks")
            .field("feature", &self.feature.is_some())
            .field("directive", &self.directive.is_some())
            .field("comment", &self.comment.is_some())
            .field("sequence", &self.sequence.is_some())
            .field("error", &self.error.is_some())
            .finish()
    }
}

impl<'a> Callbacks<'a> {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn on_feature(mut self, callback: impl FnMut(Feature) + 'a) -> Self {
        self.feature = Some(Box::new(callback));
        self
    }

    pub fn on_directive(mut self, callback: impl FnMut(Directive) + 'a) -> Self {
        self.directive = Some(Box::new(callback));
        self
    }

    pub fn on_comment(mut self, callback: impl FnMut(Comment) + 'a) -> Self {
        self.comment = Some(Box::new(callback));
        self
    }

    pub fn on_sequence(mut self, callback: impl FnMut(Sequence) + 'a) -> Self {
        self.sequence = Some(Box::new(callback));
        self
    }

    pub fn on_error(
        mut self,
        callback: impl FnMut(GtfError) -> Result<(), GtfError> + 'a,
    ) -> Self {
        self.error = Some(Box::new(callback));
        self
    }
}

impl ItemSink for Callbacks<'_> {
    fn feature(&mut self, feature: Feature) {
        if let Some(callback) = self.feature.as_mut() {
            callback(feature);
        }
    }

    fn directive(&mut self, directive: Directive) {
        if let Some(callback) = self.directive.as_mut() {
            callback(directive);
        }
    }

    fn comment(&mut self, comment: Comment) {
        if let Some(callback) = self.comment.as_mut() {
            callback(comment);
        }
    }

    fn sequence(&mut self, sequence: Sequence) {
        if let Some(callback) = self.sequence.as_mut() {
            callback(sequence);
        }
    }

    fn error(&mut self, error: GtfError) -> Result<(), GtfError> {
        match self.error.as_mut() {
            Some(callback) => callback(error),
            None => {
                warn!("skipping line: {}", error);
                Ok(())
            }
        }
    }
}

/// Counters for one parse.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct ParseStats {
    pub lines: u64,
    pub features: usize,
    pub directives: usize,
    pub comments: usize,
    pub sequences: usize,
    pub decode_errors: usize,
    pub evictions: usize,
    pub ambiguous_groupings: usize,
}

/// Whether lines are still GTF records or part of the FASTA section.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum ParseState {
    ScanningLines,
    InFastaBlock,
}

/// The line-at-a-time GTF parser.
#[derive(Debug)]
pub struct GtfParser<S: ItemSink> {
    config: ParserConfig,
    assembler: Assembler,
    state: ParseState,
    sequences: SequenceBuilder,
    sink: S,
    stats: ParseStats,
}

impl<S: ItemSink> GtfParser<S> {
    pub fn new(config: ParserConfig, sink: S) -> Self {
        let assembler = Assembler::new(config.buffer_size);
        Self {
            config,
            assembler,
            state: ParseState::ScanningLines,
            sequences: SequenceBuilder::new(),
            sink,
            stats: ParseStats::default(),
        }
    }

    pub fn config(&self) -> &ParserConfig {
        &self.config
    }

    pub fn sink(&self) -> &S {
        &self.sink
    }

    pub fn sink_mut(&mut self) -> &mut S {
        &mut self.sink
    }

    pub fn stats(&self) -> ParseStats {
        let assembler = self.assembler.stats();
        ParseStats {
            evictions: assembler.evictions,
            ambiguous_groupings: assembler.ambiguous_groupings,
            ..self.stats
        }
    }

    fn emit_feature(&mut self, feature: Feature) {
        self.stats.features += 1;
        self.sink.feature(feature);
    }

    fn emit_sequence(&mut self, sequence: Sequence) {
        if self.config.parse_sequences {
            self.stats.sequences += 1;
            self.sink.sequence(sequence);
        }
    }

    /// Emit every pending feature tree, oldest first.
    fn flush(&mut self) {
        for feature in self.assembler.drain() {
            self.emit_feature(feature);
        }
    }

    /// Hand a decode error to the sink, which decides whether to go on.
    fn report(&mut self, error: GtfError) -> Result<(), GtfError> {
        self.stats.decode_errors += 1;
        self.sink.error(error.at_line(self.stats.lines))
    }

    /// Feed one line of text, without its line terminator.
    pub fn add_line(&mut self, line: &str) -> Result<(), GtfError> {
        self.stats.lines += 1;
        let line = line.strip_suffix('\r').unwrap_or(line);

        if self.state == ParseState::InFastaBlock {
            if let Some(sequence) = self.sequences.add_line(line) {
                self.emit_sequence(sequence);
            }
            return Ok(());
        }

        match classify_line(line) {
            LineKind::Blank => {}
            LineKind::SyncMark => self.flush(),
            LineKind::FastaStart => {
                self.flush();
                debug!("entering FASTA section at line {}", self.stats.lines);
                self.state = ParseState::InFastaBlock;
            }
            LineKind::SequenceHeader => {
                self.flush();
                debug!("entering FASTA section at line {}", self.stats.lines);
                self.state = ParseState::InFastaBlock;
                self.sequences.add_line(line);
            }
            LineKind::Directive => match parse_directive(line) {
                Ok(directive) => {
                    if directive.name == "sequence-region" {
                        self.flush();
                    }
                    if self.config.parse_directives {
                        self.stats.directives += 1;
                        self.sink.directive(directive);
                    }
                }
                Err(e) => {
                    if self.config.parse_directives {
                        self.report(e)?;
                    }
                }
            },
            LineKind::Comment => {
                if self.config.parse_comments {
                    self.stats.comments += 1;
                    self.sink.comment(parse_comment(line));
                }
            }
            LineKind::Feature => {
                if self.config.parse_features {
                    match parse_feature(line) {
                        Ok(feature) => {
                            if let Some(evicted) = self.assembler.push(feature) {
                                self.emit_feature(evicted);
                            }
                        }
                        Err(e) => self.report(e)?,
                    }
                }
            }
        }
        Ok(())
    }

    /// End of input: emit the last sequence and every pending feature tree,
    /// and give back the sink.
    pub fn finish(mut self) -> Result<S, GtfError> {
        self.finish_in_place();
        Ok(self.sink)
    }

    fn finish_in_place(&mut self) {
        self.flush();
        if let Some(sequence) = self.sequences.finish() {
            self.emit_sequence(sequence);
        }
    }
}

/// Re-splits arbitrary byte chunks into lines on `\r?\n`.
///
/// The unterminated tail of the last chunk is held until more data or the
/// end of input arrives. A `\n` byte never occurs inside a multi-byte UTF-8
/// character, so chunk boundaries may fall anywhere.
#[derive(Debug, Default)]
pub struct LineSplitter {
    buffer: BytesMut,
    max_line_length: Option<usize>,
}

impl LineSplitter {
    pub fn new(max_line_length: Option<usize>) -> Self {
        Self {
            buffer: BytesMut::with_capacity(PARSE_CAPACITY),
            max_line_length,
        }
    }

    /// Append a chunk and call `on_line` for each complete line in it.
    ///
    /// # Errors
    ///
    /// Returns [`GtfError::LineTooLong`] if the held fragment grows past
    /// the maximum line length, or whatever `on_line` returns.
    pub fn push<F>(&mut self, chunk: &[u8], mut on_line: F) -> Result<(), GtfError>
    where
        F: FnMut(&[u8]) -> Result<(), GtfError>,
    {
        self.buffer.extend_from_slice(chunk);
        while let Some(newline) = self.buffer.iter().position(|b| *b == b'\n') {
            let line = self.buffer.split_to(newline + 1);
            on_line(trim_line_ending(&line))?;
        }
        if let Some(max) = self.max_line_length {
            if self.buffer.len() > max {
                return Err(GtfError::LineTooLong {
                    max,
                    length: self.buffer.len(),
                });
            }
        }
        Ok(())
    }

    /// Take the final unterminated fragment, if any.
    pub fn finish(&mut self) -> Option<Vec<u8>> {
        if self.buffer.is_empty() {
            return None;
        }
        let rest = self.buffer.split();
        Some(trim_line_ending(rest.chunk()).to_vec())
    }
}

fn trim_line_ending(line: &[u8]) -> &[u8] {
    let line = line.strip_suffix(b"\n").unwrap_or(line);
    line.strip_suffix(b"\r").unwrap_or(line)
}

/// A push-based parser over raw byte chunks, as they arrive from a socket,
/// pipe or file.
#[derive(Debug)]
pub struct GtfStreamParser<S: ItemSink> {
    splitter: LineSplitter,
    parser: GtfParser<S>,
}

impl<S: ItemSink> GtfStreamParser<S> {
    pub fn new(config: ParserConfig, sink: S) -> Self {
        let splitter = LineSplitter::new(config.max_line_length);
        Self {
            splitter,
            parser: GtfParser::new(config, sink),
        }
    }

    pub fn parser(&self) -> &GtfParser<S> {
        &self.parser
    }

    pub fn parser_mut(&mut self) -> &mut GtfParser<S> {
        &mut self.parser
    }

    /// Feed the next chunk of input.
    pub fn write(&mut self, chunk: &[u8]) -> Result<(), GtfError> {
        let parser = &mut self.parser;
        self.splitter.push(chunk, |line| add_bytes_line(parser, line))
    }

    /// End of input: parse the final unterminated line, if any, then flush.
    pub fn finish(mut self) -> Result<S, GtfError> {
        if let Some(rest) = self.splitter.finish() {
            add_bytes_line(&mut self.parser, &rest)?;
        }
        self.parser.finish()
    }
}

fn add_bytes_line<S: ItemSink>(parser: &mut GtfParser<S>, line: &[u8]) -> Result<(), GtfError> {
    match std::str::from_utf8(line) {
        Ok(line) => parser.add_line(line),
        Err(_) => {
            parser.stats.lines += 1;
            let line_number = parser.stats.lines;
            parser.stats.decode_errors += 1;
            parser.sink.error(GtfError::InvalidUtf8(line_number))
        }
    }
}

/// A lazy parsing iterator over GTF text from any [`BufRead`].
///
/// Yields one [`Item`] per emitted feature tree, directive, comment or
/// sequence. Decode errors (including lines that are not valid UTF-8) are
/// yielded in place and iteration continues with the next line. IO errors
/// and lines longer than [`ParserConfig::max_line_length`] end the
/// iteration.
pub struct GtfIterator<R: BufRead> {
    reader: R,
    line_buffer: Vec<u8>,
    parser: Option<GtfParser<VecDeque<Result<Item, GtfError>>>>,
    finished: Option<VecDeque<Result<Item, GtfError>>>,
    final_stats: ParseStats,
}

impl<R: BufRead> std::fmt::Debug for GtfIterator<R> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GtfIterator").finish_non_exhaustive()
    }
}

impl<R: BufRead> GtfIterator<R> {
    pub fn new(reader: R, config: ParserConfig) -> Self {
        Self {
            reader,
            line_buffer: Vec::with_capacity(PARSE_CAPACITY),
            parser: Some(GtfParser::new(config, VecDeque::new())),
            finished: None,
            final_stats: ParseStats::default(),
        }
    }

    /// Counters for the parse so far.
    pub fn stats(&self) -> ParseStats {
        match self.parser.as_ref() {
            Some(parser) => parser.stats(),
            None => self.final_stats,
        }
    }
}

impl<R: BufRead> Iterator for GtfIterator<R> {
    type Item = Result<Item, GtfError>;

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            if let Some(queue) = self.finished.as_mut() {
                return queue.pop_front();
            }
            let parser = self.parser.as_mut()?;
            if let Some(item) = parser.sink_mut().pop_front() {
                return Some(item);
            }

            self.line_buffer.clear();
            let max_line_length = parser.config().max_line_length;
            match read_bounded_line(&mut self.reader, &mut self.line_buffer, max_line_length) {
                Ok(0) => {
                    let parser = self.parser.take()?;
                    self.final_stats = parser.stats();
                    match parser.finish() {
                        Ok(queue) => self.finished = Some(queue),
                        Err(e) => return Some(Err(e)),
                    }
                }
                Ok(_) => {
                    // the queue sink never aborts, so this cannot fail
                    if let Err(e) = add_bytes_line(parser, trim_line_ending(&self.line_buffer)) {
                        return Some(Err(e));
                    }
                }
                Err(e) => {
                    self.final_stats = parser.stats();
                    self.parser = None;
                    return Some(Err(e));
                }
            }
        }
    }
}

/// Read one line, up to and including its `\n`, into `buf`, returning the
/// number of bytes read (zero at end of input).
///
/// Fails with [`GtfError::LineTooLong`] as soon as the line held exceeds
/// `max_line_length`, without reading the rest of it.
fn read_bounded_line<R: BufRead>(
    reader: &mut R,
    buf: &mut Vec<u8>,
    max_line_length: Option<usize>,
) -> Result<usize, GtfError> {
    let mut read = 0;
    loop {
        let available = match reader.fill_buf() {
            Ok(available) => available,
            Err(e) if e.kind() == std::io::ErrorKind::Interrupted => continue,
            Err(e) => return Err(e.into()),
        };
        if available.is_empty() {
            return Ok(read);
        }
        let (complete, used) = match available.iter().position(|b| *b == b'\n') {
            Some(newline) => (true, newline + 1),
            None => (false, available.len()),
        };
        buf.extend_from_slice(&available[..used]);
        reader.consume(used);
        read += used;

        if let Some(max) = max_line_length {
            let length = trim_line_ending(buf).len();
            if length > max {
                return Err(GtfError::LineTooLong { max, length });
            }
        }
        if complete {
            return Ok(read);
        }
    }
}

/// Synchronously parse a string containing GTF, returning the parsed items
/// in emission order.
///
/// The lookback window is unbounded here, so features are only grouped
/// (never evicted early), and the first decode error aborts the parse.
///
/// # Example
///
/// ```
/// use gtfio::prelude::*;
///
/// let gtf = "ctgA\texample\texon\t1050\t1500\t.\t+\t.\ttranscript_id \"EDEN.1\"; gene_id \"EDEN\"; gene_name \"EDEN\";\n";
/// let items = parse_str_sync(gtf, &ParserConfig::default()).unwrap();
/// assert_eq!(items.len(), 1);
/// let feature = items[0].as_feature().unwrap();
/// assert_eq!(feature.seq_name.as_deref(), Some("ctgA"));
/// assert_eq!(feature.start, Some(1050));
/// ```
pub fn parse_str_sync(text: &str, config: &ParserConfig) -> Result<Vec<Item>, GtfError> {
    if text.is_empty() {
        return Ok(Vec::new());
    }
    let config = config.clone().with_buffer_size(None);
    let mut parser = GtfParser::new(config, Vec::new());
    for line in text.split('\n') {
        parser.add_line(line)?;
    }
    parser.finish()
}

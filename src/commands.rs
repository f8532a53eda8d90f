//! Command line tool implementations.

use std::io::{Read, Write};
use std::path::PathBuf;

use log::warn;

use crate::{
    error::GtfError,
    format::{format_sync, FormatConfig, GtfWriter},
    io::{parse_str_sync, GtfIterator, InputFile, LocalFileSystem, OutputFile, ParserConfig},
    items::Item,
    reporting::{CommandOutput, Report},
};

/// Whether to stream items through the parser, or parse everything first.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ProcessingMode {
    Streaming,
    InMemory,
}

/// Pull the next item out of a parsing iterator, recording decode errors in
/// the report and skipping them. Fatal errors are returned.
fn next_item<R: std::io::BufRead>(
    iter: &mut GtfIterator<R>,
    report: &mut Report,
) -> Result<Option<Item>, GtfError> {
    for result in iter.by_ref() {
        match result {
            Ok(item) => return Ok(Some(item)),
            Err(e) if e.is_decode_error() => {
                warn!("{}", e);
                report.add_issue(e.to_string());
            }
            Err(e) => return Err(e),
        }
    }
    Ok(None)
}

/// Parse a GTF file (or standard input) with every item kind enabled, and
/// write the items as a JSON array, one item per line.
///
/// Returns the number of items written.
pub fn gtfio_to_json(
    input: Option<&PathBuf>,
    output: Option<&PathBuf>,
    buffer_size: Option<usize>,
    max_line_length: Option<usize>,
) -> Result<CommandOutput<usize>, GtfError> {
    let fs = LocalFileSystem;
    let reader = InputFile::from_option(input).reader(&fs)?;
    let config = ParserConfig::default()
        .parse_all()
        .with_buffer_size(buffer_size)
        .with_max_line_length(max_line_length);
    let mut iter = GtfIterator::new(reader, config);

    let mut writer = OutputFile::from_option(output).writer(&fs)?;

    // For reporting stuff to the user.
    let mut report = Report::new();

    let mut n = 0;
    writer.write_all(b"[\n")?;
    while let Some(item) = next_item(&mut iter, &mut report)? {
        if n > 0 {
            writer.write_all(b",\n")?;
        }
        serde_json::to_writer(&mut writer, &item)?;
        n += 1;
    }
    writer.write_all(b"\n]\n")?;
    writer.flush()?;

    report.set_stats(iter.stats());
    Ok(CommandOutput::new(n, report))
}

/// Parse a GTF file (or standard input) and write it back out as canonical
/// GTF.
///
/// In [`ProcessingMode::Streaming`] mode, items are written as they are
/// emitted, with sync marks every `format_config.min_sync_lines` lines, and
/// bad lines are skipped and reported. In [`ProcessingMode::InMemory`]
/// mode, the whole input is parsed first (any bad line is an error) and
/// written with [`format_sync()`]. The `max_line_length` limit applies to
/// streaming only.
///
/// Returns the number of lines written.
pub fn gtfio_format(
    input: Option<&PathBuf>,
    output: Option<&PathBuf>,
    format_config: FormatConfig,
    buffer_size: Option<usize>,
    max_line_length: Option<usize>,
    mode: ProcessingMode,
) -> Result<CommandOutput<usize>, GtfError> {
    let fs = LocalFileSystem;
    let mut reader = InputFile::from_option(input).reader(&fs)?;
    let config = ParserConfig::default()
        .parse_all()
        .with_buffer_size(buffer_size)
        .with_max_line_length(max_line_length);
    let mut writer = OutputFile::from_option(output).writer(&fs)?;

    let mut report = Report::new();

    let lines = match mode {
        ProcessingMode::Streaming => {
            let mut iter = GtfIterator::new(reader, config);
            let mut gtf_writer = GtfWriter::new(&mut writer, format_config);
            while let Some(item) = next_item(&mut iter, &mut report)? {
                gtf_writer.write_item(&item)?;
            }
            let lines = gtf_writer.lines_written();
            gtf_writer.finish()?;
            report.set_stats(iter.stats());
            lines
        }
        ProcessingMode::InMemory => {
            let mut text = String::new();
            reader.read_to_string(&mut text)?;
            let items = parse_str_sync(&text, &config)?;
            let formatted = format_sync(&items)?;
            writer.write_all(formatted.as_bytes())?;
            writer.flush()?;
            formatted.lines().count()
        }
    };
    Ok(CommandOutput::new(lines, report))
}

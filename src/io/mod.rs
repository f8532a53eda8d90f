//! Types and methods for reading and parsing input and writing output.

pub mod file;
pub mod parsers;
pub mod stream;

pub use file::{
    format_file, parse_file, parse_reader, FileSystem, InputFile, LocalFileSystem, OutputFile,
};
pub use parsers::{classify_line, LineKind};
pub use stream::{
    parse_str_sync, Callbacks, GtfIterator, GtfParser, GtfStreamParser, ItemSink, LineSplitter,
    ParseStats, ParserConfig,
};

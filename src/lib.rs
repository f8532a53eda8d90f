//! # gtfio: streaming GTF parsing and formatting
//!
//! `gtfio` reads [Gene Transfer Format](https://en.wikipedia.org/wiki/Gene_transfer_format)
//! annotation text into typed [`Item`](items::Item)s, grouping each gene's
//! transcripts, exons and CDS lines into one [`Feature`](items::Feature)
//! tree, and writes items back out as canonical GTF.
//!
//! Parsing is streaming: features are held in a bounded lookback window
//! until their unit is complete (a `###` sync mark, a `##sequence-region`
//! directive, the FASTA section, end of input, or eviction when the
//! window is full). The pieces are:
//!
//!  - [`escape`]: percent-encoding of column and attribute text.
//!  - [`attributes`]: the 9th-column `key "value";` codec.
//!  - [`io::parsers`]: line classification and single-line decoders.
//!  - [`assembler`]: the feature hierarchy assembler.
//!  - [`io::stream`]: push-based and pull-based parsing drivers.
//!  - [`format`]: the canonical formatter.
//!
//! ```
//! use gtfio::prelude::*;
//!
//! let gtf = "\
//! ctgA\texample\tgene\t1050\t9000\t.\t+\t.\tgene_id \"EDEN\";
//! ctgA\texample\ttranscript\t1050\t9000\t.\t+\t.\tgene_id \"EDEN\"; transcript_id \"EDEN.1\";
//! ctgA\texample\texon\t1050\t1500\t.\t+\t.\tgene_id \"EDEN\"; transcript_id \"EDEN.1\";
//! ";
//! let items = parse_str_sync(gtf, &ParserConfig::default()).unwrap();
//! assert_eq!(items.len(), 1);
//! let gene = items[0].as_feature().unwrap();
//! assert_eq!(gene.child_features[0].child_features.len(), 1);
//! assert_eq!(format_sync(&items).unwrap(), gtf);
//! ```

pub mod assembler;
pub mod attributes;
pub mod commands;
pub mod error;
pub mod escape;
pub mod format;
pub mod io;
pub mod items;
pub mod reporting;
pub mod test_utilities;

#[cfg(not(feature = "big-position"))]
pub type Position = u32;
#[cfg(feature = "big-position")]
pub type Position = u64;

pub mod prelude {
    pub use crate::assembler::Assembler;
    pub use crate::attributes::{format_attributes, parse_attributes, Attributes};
    pub use crate::error::GtfError;
    pub use crate::escape::{escape, escape_column, unescape};
    pub use crate::format::{
        format_comment, format_directive, format_feature, format_sequence, format_sync,
        FormatConfig, GtfFormatter, GtfWriter,
    };
    pub use crate::io::{
        format_file, parse_file, parse_str_sync, Callbacks, FileSystem, GtfIterator, GtfParser,
        GtfStreamParser, InputFile, ItemSink, LocalFileSystem, OutputFile, ParseStats,
        ParserConfig,
    };
    pub use crate::items::{Comment, Directive, DirectiveFields, Feature, Item, Sequence, Strand};
}

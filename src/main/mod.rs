use std::path::PathBuf;

use clap::{Parser, Subcommand};
use gtfio::{
    commands::{gtfio_format, gtfio_to_json, ProcessingMode},
    format::{FormatConfig, DEFAULT_MIN_SYNC_LINES},
    prelude::GtfError,
    reporting::CommandOutput,
};
use log::LevelFilter;

const INFO: &str = "\
gtfio: parse and format GTF (Gene Transfer Format) annotation files
usage: gtfio [--help] <subcommand>

Subcommands:

  to-json: parse a GTF file into a JSON array of features, directives,
           comments and sequences.

  format: re-write a GTF file in canonical form, with ### sync marks.

";

#[derive(Parser)]
#[clap(name = "gtfio")]
#[clap(about = INFO)]
struct Cli {
    /// more verbose logging (repeat for more)
    #[arg(short, long, action = clap::ArgAction::Count)]
    debug: u8,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Parse GTF into JSON, one item per line
    ToJson {
        /// an input GTF file (standard input will be used if not specified)
        input: Option<PathBuf>,

        /// an optional output file (standard output will be used if not specified)
        #[arg(long)]
        output: Option<PathBuf>,

        /// maximum number of pending top-level features held while grouping
        #[arg(long, default_value_t = gtfio::assembler::DEFAULT_BUFFER_SIZE)]
        buffer_size: usize,

        /// fail if a line is longer than this many bytes (no limit if not specified)
        #[arg(long)]
        max_line_length: Option<usize>,
    },
    /// Re-write GTF in canonical form
    Format {
        /// an input GTF file (standard input will be used if not specified)
        input: Option<PathBuf>,

        /// an optional output file (standard output will be used if not specified)
        #[arg(long)]
        output: Option<PathBuf>,

        /// minimum number of lines between ### sync marks
        #[arg(long, default_value_t = DEFAULT_MIN_SYNC_LINES)]
        min_sync_lines: usize,

        /// write a ##gff-version 2 directive first, if the input lacks one
        #[arg(long)]
        insert_version: bool,

        /// maximum number of pending top-level features held while grouping
        #[arg(long, default_value_t = gtfio::assembler::DEFAULT_BUFFER_SIZE)]
        buffer_size: usize,

        /// fail if a line is longer than this many bytes (no limit if not specified)
        #[arg(long)]
        max_line_length: Option<usize>,

        /// parse the whole input first and format it without sync marks
        /// (any malformed line is an error)
        #[arg(long)]
        sync: bool,
    },
}

fn init_logging(debug: u8) {
    let level = match debug {
        0 => LevelFilter::Warn,
        1 => LevelFilter::Info,
        2 => LevelFilter::Debug,
        _ => LevelFilter::Trace,
    };
    pretty_env_logger::formatted_builder()
        .filter_level(level)
        .parse_default_env()
        .init();
}

fn run() -> Result<CommandOutput<usize>, GtfError> {
    let cli = Cli::try_parse()?;
    init_logging(cli.debug);
    match &cli.command {
        Some(Commands::ToJson {
            input,
            output,
            buffer_size,
            max_line_length,
        }) => gtfio_to_json(
            input.as_ref(),
            output.as_ref(),
            Some(*buffer_size),
            *max_line_length,
        ),
        Some(Commands::Format {
            input,
            output,
            min_sync_lines,
            insert_version,
            buffer_size,
            max_line_length,
            sync,
        }) => {
            let config = FormatConfig::default()
                .with_min_sync_lines(*min_sync_lines)
                .with_version_directive(*insert_version);
            let mode = if *sync {
                ProcessingMode::InMemory
            } else {
                ProcessingMode::Streaming
            };
            gtfio_format(
                input.as_ref(),
                output.as_ref(),
                config,
                Some(*buffer_size),
                *max_line_length,
                mode,
            )
        }
        None => {
            println!("{}\n", INFO);
            std::process::exit(1);
        }
    }
}

fn main() {
    match run() {
        Ok(output) => {
            let report = output.report();
            if !report.is_empty() {
                eprint!("{}", report);
            }
        }
        // clap prints usage errors, --help and --version itself
        Err(GtfError::ArgumentError(e)) => e.exit(),
        Err(e) => {
            eprintln!("Error: {}", e);
            std::process::exit(1);
        }
    }
}

//! Input/Output file handling with [`InputFile`] and [`OutputFile`].
//!
//! All file-system access goes through the [`FileSystem`] trait, so the
//! parsing and formatting code never touches the file system directly.
//! [`LocalFileSystem`] is the ordinary implementation; tests and embedders
//! can supply their own.

use std::fs::File;
use std::io::{self, BufReader, BufWriter, Read, Write};
use std::path::{Path, PathBuf};

use log::info;

use crate::error::GtfError;
use crate::format::{FormatConfig, GtfWriter};
use crate::io::stream::{GtfStreamParser, ParserConfig};
use crate::items::Item;

/// Size of the byte chunks read by [`parse_file()`].
pub const READ_CHUNK_SIZE: usize = 64 * 1024;

/// Opens paths for reading and writing.
pub trait FileSystem {
    fn open_read(&self, path: &Path) -> io::Result<Box<dyn Read>>;
    fn open_write(&self, path: &Path) -> io::Result<Box<dyn Write>>;
}

/// The local file system, through [`std::fs`].
#[derive(Clone, Copy, Debug, Default)]
pub struct LocalFileSystem;

impl FileSystem for LocalFileSystem {
    fn open_read(&self, path: &Path) -> io::Result<Box<dyn Read>> {
        Ok(Box::new(File::open(path)?))
    }

    fn open_write(&self, path: &Path) -> io::Result<Box<dyn Write>> {
        Ok(Box::new(File::create(path)?))
    }
}

#[derive(Clone, Debug)]
enum InputSource {
    File(PathBuf),
    Stdin,
}

/// Represents an input file, or standard input.
#[derive(Clone, Debug)]
pub struct InputFile {
    source: InputSource,
}

impl InputFile {
    /// Constructs a new `InputFile`.
    pub fn new(filepath: impl Into<PathBuf>) -> Self {
        Self {
            source: InputSource::File(filepath.into()),
        }
    }

    /// Constructs a new [`InputFile`] for standard input.
    pub fn new_stdin() -> Self {
        Self {
            source: InputSource::Stdin,
        }
    }

    /// An input file for `path`, or standard input if `path` is `None` or `-`.
    pub fn from_option(path: Option<&PathBuf>) -> Self {
        match path {
            Some(path) if path.as_os_str() != "-" => Self::new(path.clone()),
            _ => Self::new_stdin(),
        }
    }

    /// Opens the input and returns a buffered reader.
    pub fn reader(&self, fs: &dyn FileSystem) -> io::Result<BufReader<Box<dyn Read>>> {
        let reader: Box<dyn Read> = match &self.source {
            InputSource::File(path) => fs.open_read(path)?,
            InputSource::Stdin => Box::new(io::stdin()),
        };
        Ok(BufReader::new(reader))
    }
}

#[derive(Clone, Debug)]
enum OutputDestination {
    File(PathBuf),
    Stdout,
}

/// Represents an output file, or standard output.
#[derive(Clone, Debug)]
pub struct OutputFile {
    destination: OutputDestination,
    pub header: Option<Vec<String>>,
}

impl OutputFile {
    /// Constructs a new `OutputFile`.
    ///
    /// # Arguments
    ///
    /// * `filepath` - the path to write to.
    /// * `header` - optional comment lines written (each prefixed with `# `)
    ///   before anything else.
    pub fn new(filepath: impl Into<PathBuf>, header: Option<Vec<String>>) -> Self {
        Self {
            destination: OutputDestination::File(filepath.into()),
            header,
        }
    }

    /// Constructs a new [`OutputFile`] for standard output.
    pub fn new_stdout(header: Option<Vec<String>>) -> Self {
        Self {
            destination: OutputDestination::Stdout,
            header,
        }
    }

    /// An output file for `path`, or standard output if `path` is `None`.
    pub fn from_option(path: Option<&PathBuf>) -> Self {
        match path {
            Some(path) => Self::new(path.clone(), None),
            None => Self::new_stdout(None),
        }
    }

    /// Opens the output and returns a buffered writer, with the header
    /// already written if one is set.
    pub fn writer(&self, fs: &dyn FileSystem) -> io::Result<Box<dyn Write>> {
        let mut writer: Box<dyn Write> = match &self.destination {
            OutputDestination::File(path) => Box::new(BufWriter::new(fs.open_write(path)?)),
            OutputDestination::Stdout => Box::new(BufWriter::new(io::stdout())),
        };
        if let Some(entries) = &self.header {
            for entry in entries {
                writeln!(writer, "# {}", entry)?;
            }
        }
        Ok(writer)
    }
}

/// Feed everything from `reader` through a [`GtfStreamParser`] in
/// [`READ_CHUNK_SIZE`] byte chunks, collecting the items.
///
/// Decode errors are fatal.
pub fn parse_reader<R: Read>(mut reader: R, config: &ParserConfig) -> Result<Vec<Item>, GtfError> {
    let mut parser = GtfStreamParser::new(config.clone(), Vec::new());
    let mut buffer = vec![0u8; READ_CHUNK_SIZE];
    loop {
        let n = match reader.read(&mut buffer) {
            Ok(0) => break,
            Ok(n) => n,
            Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
            Err(e) => return Err(e.into()),
        };
        parser.write(&buffer[..n])?;
    }
    parser.finish()
}

/// Parse the GTF file at `path`, opened through `fs`.
pub fn parse_file(
    fs: &dyn FileSystem,
    path: impl AsRef<Path>,
    config: &ParserConfig,
) -> Result<Vec<Item>, GtfError> {
    let path = path.as_ref();
    let items = parse_reader(fs.open_read(path)?, config)?;
    info!("parsed {} items from {}", items.len(), path.display());
    Ok(items)
}

/// Format `items` into a GTF file at `path`, opened through `fs`, returning
/// the number of lines written.
///
/// With no `config`, sync marks are inserted every 100 lines and a
/// `##gff-version 2` directive is written first unless the items already
/// start with one.
pub fn format_file<'a>(
    fs: &dyn FileSystem,
    items: impl IntoIterator<Item = &'a Item>,
    path: impl AsRef<Path>,
    config: Option<FormatConfig>,
) -> Result<usize, GtfError> {
    let path = path.as_ref();
    let config = config.unwrap_or_else(|| FormatConfig::default().with_version_directive(true));
    let mut writer = GtfWriter::new(BufWriter::new(fs.open_write(path)?), config);
    for item in items {
        writer.write_item(item)?;
    }
    let lines = writer.lines_written();
    writer.finish()?;
    info!("wrote {} lines to {}", lines, path.display());
    Ok(lines)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::RefCell;
    use std::collections::HashMap;
    use std::rc::Rc;

    type Files = Rc<RefCell<HashMap<PathBuf, Vec<u8>>>>;

    /// Holds files in memory, to check that nothing bypasses [`FileSystem`].
    #[derive(Default)]
    struct MemoryFileSystem {
        files: Files,
    }

    struct MemoryFile {
        path: PathBuf,
        files: Files,
    }

    impl Write for MemoryFile {
        fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
            self.files
                .borrow_mut()
                .entry(self.path.clone())
                .or_default()
                .extend_from_slice(buf);
            Ok(buf.len())
        }

        fn flush(&mut self) -> io::Result<()> {
            Ok(())
        }
    }

    impl FileSystem for MemoryFileSystem {
        fn open_read(&self, path: &Path) -> io::Result<Box<dyn Read>> {
            match self.files.borrow().get(path) {
                Some(data) => Ok(Box::new(io::Cursor::new(data.clone()))),
                None => Err(io::Error::new(io::ErrorKind::NotFound, "no such file")),
            }
        }

        fn open_write(&self, path: &Path) -> io::Result<Box<dyn Write>> {
            self.files.borrow_mut().insert(path.to_path_buf(), Vec::new());
            Ok(Box::new(MemoryFile {
                path: path.to_path_buf(),
                files: Rc::clone(&self.files),
            }))
        }
    }

    const GENES: &str = "ctgA\tx\tgene\t1\t10\t.\t+\t.\tgene_id \"a\";\nctgA\tx\tgene\t20\t30\t.\t-\t.\tgene_id \"b\";\n";

    #[test]
    fn test_parse_and_format_file_in_memory() {
        let fs = MemoryFileSystem::default();
        fs.files
            .borrow_mut()
            .insert(PathBuf::from("in.gtf"), GENES.as_bytes().to_vec());

        let items = parse_file(&fs, "in.gtf", &ParserConfig::default()).unwrap();
        assert_eq!(items.len(), 2);

        let lines = format_file(&fs, &items, "out.gtf", None).unwrap();
        assert_eq!(lines, 3);
        let written = fs.files.borrow()[Path::new("out.gtf")].clone();
        let text = String::from_utf8(written).unwrap();
        assert_eq!(text, format!("##gff-version 2\n{}", GENES));
    }

    #[test]
    fn test_parse_file_missing() {
        let fs = MemoryFileSystem::default();
        let err = parse_file(&fs, "nope.gtf", &ParserConfig::default()).unwrap_err();
        assert!(matches!(err, GtfError::IOError(_)));
    }

    #[test]
    fn test_local_file_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("genes.gtf");
        std::fs::write(&path, GENES).unwrap();

        let items = parse_file(&LocalFileSystem, &path, &ParserConfig::default()).unwrap();
        let out = dir.path().join("out.gtf");
        let config = FormatConfig::default();
        format_file(&LocalFileSystem, &items, &out, Some(config)).unwrap();
        assert_eq!(std::fs::read_to_string(&out).unwrap(), GENES);

        let input = InputFile::new(&out);
        let mut reader = input.reader(&LocalFileSystem).unwrap();
        let mut text = String::new();
        reader.read_to_string(&mut text).unwrap();
        assert_eq!(text.lines().count(), 2);
    }

    #[test]
    fn test_output_file_header() {
        let fs = MemoryFileSystem::default();
        let output = OutputFile::new("h.gtf", Some(vec!["made by a test".to_string()]));
        {
            let mut writer = output.writer(&fs).unwrap();
            writer.flush().unwrap();
        }
        let written = fs.files.borrow()[Path::new("h.gtf")].clone();
        assert_eq!(written, b"# made by a test\n");
    }

    #[test]
    fn test_parse_reader_line_too_long() {
        let config = ParserConfig::default().with_max_line_length(Some(8));
        let err = parse_reader("x".repeat(100).as_bytes(), &config).unwrap_err();
        assert!(matches!(err, GtfError::LineTooLong { max: 8, .. }));
    }
}

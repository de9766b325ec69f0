//! Streaming fingerprint reader
//!
//! [`FpReader`] decodes one record at a time from any of the four wire
//! formats. Callers pick how much to hold in memory: a single record, a
//! chunk of `n`, a window `(first, count)` that skips everything before
//! `first` without decoding it, or the whole file.
//!
//! A decode error poisons the reader. The error is returned once and every
//! later read reports end of stream, so a partial record never reaches the
//! caller's collection.
//!
//! # Example
//!
//! ```no_run
//! use fingerprint_fs::file::{FileFormat, FpReader, WireFormat};
//! use fingerprint_fs::fp::Session;
//!
//! let mut session = Session::new(1024);
//! let format = FileFormat::new(WireFormat::FlushDense);
//! let mut reader = FpReader::open("targets.fpd", &format, &mut session)?;
//! loop {
//!     let chunk = reader.read_chunk(10_000)?;
//!     if chunk.is_empty() {
//!         break;
//!     }
//!     println!("{} fingerprints", chunk.len());
//! }
//! # Ok::<(), fingerprint_fs::FingerprintError>(())
//! ```

use std::path::{Path, PathBuf};

use tracing::{debug, info, warn};

use super::ascii;
use super::binary::{self, BinaryHeader};
use super::format::{FileFormat, WireFormat};
use super::stream::FpInput;
use crate::error::{FingerprintError, FpResult};
use crate::fp::{Fingerprint, Session};

/// Configures and opens an [`FpReader`]
pub struct FpReaderBuilder<'s> {
    session: &'s mut Session,
    path: PathBuf,
    format: FileFormat,
    forced_swap: Option<bool>,
}

impl<'s> FpReaderBuilder<'s> {
    pub fn new(session: &'s mut Session, path: impl AsRef<Path>, format: FileFormat) -> Self {
        Self {
            session,
            path: path.as_ref().to_path_buf(),
            format,
            forced_swap: None,
        }
    }

    /// Override byte-order detection for binary files
    ///
    /// `true` reads the file as written on a machine of the other byte order.
    pub fn with_byte_swapping(mut self, swap: bool) -> Self {
        self.forced_swap = Some(swap);
        self
    }

    /// Open the file and decode its header
    ///
    /// Dense files lock the session width. A binary dense header with a
    /// different width is adopted if the session is still unlocked and is a
    /// [`FingerprintError::WidthReconfiguration`] otherwise.
    pub fn open(self) -> FpResult<FpReader> {
        let mut input = FpInput::open(&self.path, self.format.compression)?;
        let wire = self.format.wire;

        let header = if wire.is_binary() {
            let header = BinaryHeader::read(&mut input, wire, self.forced_swap)?;
            debug!(
                "{}: {} header, {} bits, byte swapping {}",
                self.path.display(),
                header.wire,
                header.num_bits,
                header.byte_swapping()
            );
            if wire == WireFormat::FlushDense {
                if header.num_bits == 0 {
                    return Err(FingerprintError::MalformedRecord(format!(
                        "{} declares a zero-width dense fingerprint",
                        self.path.display()
                    )));
                }
                self.session.set_num_bits(header.num_bits)?;
            }
            Some(header)
        } else {
            None
        };

        if wire == WireFormat::FlushDense || wire == WireFormat::AsciiBitstring {
            self.session.lock_width();
        }

        Ok(FpReader {
            input,
            format: self.format,
            header,
            num_bits: self.session.num_bits(),
            records_read: 0,
            poisoned: false,
        })
    }
}

/// Record-at-a-time reader over one fingerprint file
pub struct FpReader {
    input: FpInput,
    format: FileFormat,
    header: Option<BinaryHeader>,
    num_bits: u32,
    records_read: usize,
    poisoned: bool,
}

impl FpReader {
    /// Open with byte-order detection
    pub fn open(path: impl AsRef<Path>, format: &FileFormat, session: &mut Session) -> FpResult<Self> {
        FpReaderBuilder::new(session, path, format.clone()).open()
    }

    pub fn path(&self) -> &Path {
        self.input.path()
    }

    pub fn format(&self) -> &FileFormat {
        &self.format
    }

    /// Dense width records are decoded at
    pub fn num_bits(&self) -> u32 {
        self.num_bits
    }

    /// True if binary words are being byte swapped
    pub fn byte_swapping(&self) -> bool {
        self.header.map(|h| h.byte_swapping()).unwrap_or(false)
    }

    /// Records consumed (decoded or skipped) since open or rewind
    pub fn records_read(&self) -> usize {
        self.records_read
    }

    /// True once a decode error has ended the stream
    pub fn is_poisoned(&self) -> bool {
        self.poisoned
    }

    fn poison(&mut self, err: FingerprintError) -> FingerprintError {
        warn!(
            "{}: stopped after {} records: {}",
            self.path().display(),
            self.records_read,
            err
        );
        self.poisoned = true;
        err
    }

    /// Next non-blank ASCII line
    fn next_line(&mut self) -> FpResult<Option<String>> {
        while let Some(line) = self.input.read_full_line()? {
            if !line.trim().is_empty() {
                return Ok(Some(line));
            }
        }
        Ok(None)
    }

    fn decode_next(&mut self) -> FpResult<Option<Fingerprint>> {
        if let Some(header) = self.header {
            return binary::read_record(&mut self.input, &header);
        }
        match self.next_line()? {
            Some(line) => ascii::parse_line(&line, self.format.wire, &self.format.separator, self.num_bits),
            None => Ok(None),
        }
    }

    fn skip_next(&mut self) -> FpResult<Option<String>> {
        if let Some(header) = self.header {
            return binary::skip_record(&mut self.input, &header);
        }
        Ok(self.next_line()?.map(|line| {
            ascii::split_line(&line, &self.format.separator)
                .map(|(name, _)| name.to_string())
                .unwrap_or_default()
        }))
    }

    /// Decode the next fingerprint; `None` at end of file
    pub fn next_fingerprint(&mut self) -> FpResult<Option<Fingerprint>> {
        if self.poisoned {
            return Ok(None);
        }
        match self.decode_next() {
            Ok(Some(fp)) => {
                self.records_read += 1;
                Ok(Some(fp))
            }
            Ok(None) => Ok(None),
            Err(e) => Err(self.poison(e)),
        }
    }

    /// Name of the next record, skipping its payload
    pub fn next_name(&mut self) -> FpResult<Option<String>> {
        if self.poisoned {
            return Ok(None);
        }
        match self.skip_next() {
            Ok(Some(name)) => {
                self.records_read += 1;
                Ok(Some(name))
            }
            Ok(None) => Ok(None),
            Err(e) => Err(self.poison(e)),
        }
    }

    /// Skip up to `n` records; returns how many were skipped
    pub fn skip_records(&mut self, n: usize) -> FpResult<usize> {
        let mut skipped = 0;
        while skipped < n && self.next_name()?.is_some() {
            skipped += 1;
        }
        Ok(skipped)
    }

    /// Read up to `n` fingerprints; an empty chunk means end of file
    pub fn read_chunk(&mut self, n: usize) -> FpResult<Vec<Fingerprint>> {
        let mut chunk = Vec::with_capacity(n.min(4096));
        while chunk.len() < n {
            match self.next_fingerprint()? {
                Some(fp) => chunk.push(fp),
                None => break,
            }
        }
        Ok(chunk)
    }

    /// Read records `first .. first + count` of the file
    ///
    /// Rewinds first, so the window is independent of earlier reads. Records
    /// before `first` are skipped without being decoded.
    pub fn read_window(&mut self, first: usize, count: usize) -> FpResult<Vec<Fingerprint>> {
        self.rewind()?;
        if self.skip_records(first)? < first {
            return Ok(Vec::new());
        }
        self.read_chunk(count)
    }

    /// Read everything that is left
    pub fn read_all(&mut self) -> FpResult<Vec<Fingerprint>> {
        self.read_chunk(usize::MAX)
    }

    /// Return to the first record and clear any poisoning
    pub fn rewind(&mut self) -> FpResult<()> {
        self.input.rewind()?;
        if let Some(header) = self.header {
            let forced = Some(header.byte_swapping());
            self.header = Some(BinaryHeader::read(&mut self.input, header.wire, forced)?);
        }
        self.records_read = 0;
        self.poisoned = false;
        Ok(())
    }
}

impl Iterator for FpReader {
    type Item = FpResult<Fingerprint>;

    fn next(&mut self) -> Option<Self::Item> {
        self.next_fingerprint().transpose()
    }
}

/// Read a whole file into memory
pub fn read_fp_file(path: impl AsRef<Path>, format: &FileFormat, session: &mut Session) -> FpResult<Vec<Fingerprint>> {
    let mut reader = FpReader::open(path, format, session)?;
    let fps = reader.read_all()?;
    info!("Read {} fingerprints from {}", fps.len(), reader.path().display());
    Ok(fps)
}

/// Count the records in a file without decoding their payloads
///
/// Uses a private session, so the caller's width is not touched.
pub fn count_fps_in_file(path: impl AsRef<Path>, format: &FileFormat) -> FpResult<usize> {
    let mut session = Session::default();
    let mut reader = FpReader::open(path, format, &mut session)?;
    let count = reader.skip_records(usize::MAX)?;
    info!("{} holds {} fingerprints", reader.path().display(), count);
    Ok(count)
}

/// Names of every record, in file order
pub fn get_fp_names(path: impl AsRef<Path>, format: &FileFormat) -> FpResult<Vec<String>> {
    let mut session = Session::default();
    let mut reader = FpReader::open(path, format, &mut session)?;
    let mut names = Vec::new();
    while let Some(name) = reader.next_name()? {
        names.push(name);
    }
    Ok(names)
}

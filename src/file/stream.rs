//! Plain or gzip-compressed file streams
//!
//! [`FpInput`] and [`FpOutput`] hide whether a fingerprint file is
//! compressed. Compression is decided once at open time, either forced by the
//! caller or (for reads) detected from the gzip magic bytes; it is never
//! re-sniffed mid-stream. Both own their file handle, so every exit path,
//! including errors, closes the descriptor.

use std::fs::File;
use std::io::{self, BufRead, BufReader, BufWriter, Read, Write};
use std::path::{Path, PathBuf};

use flate2::bufread::MultiGzDecoder;
use flate2::write::GzEncoder;
use tracing::debug;

use super::format::Compression;
use crate::error::{FingerprintError, FpResult};

/// First two bytes of every gzip member
const GZIP_MAGIC: [u8; 2] = [0x1f, 0x8b];

/// Default buffer size for both directions
const STREAM_BUFFER_SIZE: usize = 64 * 1024;

/// Readable fingerprint file, plain or compressed
pub struct FpInput {
    path: PathBuf,
    compression: Compression,
    reader: Box<dyn BufRead + Send>,
}

impl FpInput {
    /// Open a file for reading
    ///
    /// With `compression == None` the first bytes are inspected; an empty file
    /// counts as plain. Missing or unreadable paths fail here, not on the
    /// first read.
    pub fn open(path: impl AsRef<Path>, compression: Option<Compression>) -> FpResult<Self> {
        let path = path.as_ref().to_path_buf();
        let file = File::open(&path).map_err(|e| FingerprintError::open(&path, "reading", e))?;
        let mut buffered = BufReader::with_capacity(STREAM_BUFFER_SIZE, file);

        let compression = match compression {
            Some(c) => c,
            None => {
                let head = buffered
                    .fill_buf()
                    .map_err(|e| FingerprintError::open(&path, "reading", e))?;
                if head.starts_with(&GZIP_MAGIC) {
                    Compression::Gzip
                } else {
                    Compression::Plain
                }
            }
        };

        let reader: Box<dyn BufRead + Send> = match compression {
            Compression::Plain => Box::new(buffered),
            Compression::Gzip => Box::new(BufReader::with_capacity(
                STREAM_BUFFER_SIZE,
                MultiGzDecoder::new(buffered),
            )),
        };

        debug!("Opened {} for reading ({:?})", path.display(), compression);
        Ok(Self {
            path,
            compression,
            reader,
        })
    }

    /// Path this stream was opened from
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Compression in effect
    pub fn compression(&self) -> Compression {
        self.compression
    }

    /// Go back to the start of the file
    ///
    /// Compressed streams cannot seek, so the file is reopened.
    pub fn rewind(&mut self) -> FpResult<()> {
        let reopened = Self::open(&self.path, Some(self.compression))?;
        *self = reopened;
        Ok(())
    }

    /// Read the next line without its terminator
    ///
    /// Returns `None` at end of file. A final line without a newline is still
    /// returned.
    pub fn read_full_line(&mut self) -> FpResult<Option<String>> {
        let mut line = String::new();
        if self.reader.read_line(&mut line)? == 0 {
            return Ok(None);
        }
        while line.ends_with('\n') || line.ends_with('\r') {
            line.pop();
        }
        Ok(Some(line))
    }

    /// Fill as much of `buf` as the stream allows
    ///
    /// Returns the number of bytes read; fewer than `buf.len()` means end of
    /// file was reached.
    pub fn read_up_to(&mut self, buf: &mut [u8]) -> FpResult<usize> {
        let mut filled = 0;
        while filled < buf.len() {
            match self.reader.read(&mut buf[filled..]) {
                Ok(0) => break,
                Ok(n) => filled += n,
                Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
                Err(e) => return Err(e.into()),
            }
        }
        Ok(filled)
    }

    /// Discard exactly `n` bytes
    ///
    /// Returns the number actually skipped, short only at end of file.
    pub fn skip(&mut self, n: u64) -> FpResult<u64> {
        Ok(io::copy(&mut (&mut self.reader).take(n), &mut io::sink())?)
    }
}

enum OutputInner {
    Plain(BufWriter<File>),
    Gzip(GzEncoder<BufWriter<File>>),
}

/// Writable fingerprint file, plain or compressed
pub struct FpOutput {
    path: PathBuf,
    inner: OutputInner,
}

impl FpOutput {
    /// Create (truncate) a file for writing
    ///
    /// `record_size_hint` is the expected size of one record in bytes and
    /// only sizes the write buffer.
    pub fn create(
        path: impl AsRef<Path>,
        compression: Compression,
        record_size_hint: usize,
    ) -> FpResult<Self> {
        let path = path.as_ref().to_path_buf();
        let file = File::create(&path).map_err(|e| FingerprintError::open(&path, "writing", e))?;
        let buffered = BufWriter::with_capacity(STREAM_BUFFER_SIZE.max(record_size_hint), file);

        let inner = match compression {
            Compression::Plain => OutputInner::Plain(buffered),
            Compression::Gzip => {
                OutputInner::Gzip(GzEncoder::new(buffered, flate2::Compression::default()))
            }
        };

        debug!("Opened {} for writing ({:?})", path.display(), compression);
        Ok(Self { path, inner })
    }

    /// Path this stream writes to
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Flush everything, writing the gzip trailer if compressed
    ///
    /// Dropping without calling this still closes the file but swallows
    /// errors.
    pub fn finish(self) -> FpResult<()> {
        let mut buffered = match self.inner {
            OutputInner::Plain(w) => w,
            OutputInner::Gzip(enc) => enc.finish()?,
        };
        buffered.flush()?;
        debug!("Closed {}", self.path.display());
        Ok(())
    }
}

impl Write for FpOutput {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        match &mut self.inner {
            OutputInner::Plain(w) => w.write(buf),
            OutputInner::Gzip(w) => w.write(buf),
        }
    }

    fn flush(&mut self) -> io::Result<()> {
        match &mut self.inner {
            OutputInner::Plain(w) => w.flush(),
            OutputInner::Gzip(w) => w.flush(),
        }
    }
}

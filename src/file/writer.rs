//! Streaming fingerprint writer

use std::io::Write;
use std::path::{Path, PathBuf};

use tracing::debug;

use super::ascii;
use super::binary::{self, BinaryHeader, Endian};
use super::format::{FileFormat, WireFormat};
use super::stream::FpOutput;
use crate::error::FpResult;
use crate::fp::{calc_num_words, Fingerprint, Session};

/// Configures and creates an [`FpWriter`]
pub struct FpWriterBuilder {
    path: PathBuf,
    format: FileFormat,
    num_bits: u32,
    endian: Endian,
}

impl FpWriterBuilder {
    pub fn new(path: impl AsRef<Path>, format: FileFormat) -> Self {
        Self {
            path: path.as_ref().to_path_buf(),
            format,
            num_bits: 0,
            endian: Endian::native(),
        }
    }

    /// Dense width written to the binary header
    pub fn with_num_bits(mut self, num_bits: u32) -> Self {
        self.num_bits = num_bits;
        self
    }

    /// Byte order for binary formats; native by default
    pub fn with_byte_order(mut self, endian: Endian) -> Self {
        self.endian = endian;
        self
    }

    /// Create the file and write the header, if the format has one
    pub fn create(self) -> FpResult<FpWriter> {
        let record_hint = calc_num_words(self.num_bits) * 4 + 64;
        let mut output = FpOutput::create(&self.path, self.format.write_compression(), record_hint)?;

        let header = if self.format.wire.is_binary() {
            let header = BinaryHeader {
                wire: self.format.wire,
                num_bits: match self.format.wire {
                    WireFormat::FlushDense => self.num_bits,
                    _ => 0,
                },
                endian: self.endian,
            };
            header.write(&mut output)?;
            Some(header)
        } else {
            None
        };

        Ok(FpWriter {
            output,
            format: self.format,
            header,
            records_written: 0,
        })
    }
}

/// Record-at-a-time writer for one fingerprint file
pub struct FpWriter {
    output: FpOutput,
    format: FileFormat,
    header: Option<BinaryHeader>,
    records_written: usize,
}

impl FpWriter {
    /// Create a file in native byte order at the session width
    pub fn create(path: impl AsRef<Path>, format: &FileFormat, session: &Session) -> FpResult<Self> {
        FpWriterBuilder::new(path, format.clone())
            .with_num_bits(session.num_bits())
            .create()
    }

    pub fn path(&self) -> &Path {
        self.output.path()
    }

    pub fn records_written(&self) -> usize {
        self.records_written
    }

    /// Append one fingerprint
    ///
    /// The shape must match the format, and Dense widths must match the
    /// header.
    pub fn write(&mut self, fp: &Fingerprint) -> FpResult<()> {
        match &self.header {
            Some(header) => binary::write_record(&mut self.output, fp, header)?,
            None => {
                let line = ascii::format_line(
                    fp,
                    self.format.wire,
                    &self.format.separator,
                    self.format.fix_names,
                )?;
                self.output.write_all(line.as_bytes())?;
                self.output.write_all(b"\n")?;
            }
        }
        self.records_written += 1;
        Ok(())
    }

    /// Append every fingerprint in order
    pub fn write_fingerprints<'a, I>(&mut self, fps: I) -> FpResult<()>
    where
        I: IntoIterator<Item = &'a Fingerprint>,
    {
        for fp in fps {
            self.write(fp)?;
        }
        Ok(())
    }

    /// Flush and close; returns the number of records written
    pub fn finish(self) -> FpResult<usize> {
        debug!("Wrote {} fingerprints to {}", self.records_written, self.output.path().display());
        self.output.finish()?;
        Ok(self.records_written)
    }
}

/// Write a whole collection to a new file
pub fn write_fp_file(
    path: impl AsRef<Path>,
    format: &FileFormat,
    session: &Session,
    fps: &[Fingerprint],
) -> FpResult<usize> {
    let mut writer = FpWriter::create(path, format, session)?;
    writer.write_fingerprints(fps)?;
    writer.finish()
}

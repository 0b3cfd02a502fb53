use crate::sample::RawSample;
use bytemuck::{Pod, Zeroable};
use memmap2::Mmap;
use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::Path;
use thiserror::Error;

pub const TRACE_MAGIC: [u8; 4] = *b"FWTR";
pub const TRACE_VERSION: u32 = 1;
const HEADER_LEN: usize = size_of::<TraceHeader>();
const RECORD_LEN: usize = size_of::<RawSample>();

/// Fixed-size preamble of a trace file. All fields are little-endian on the platforms we
/// record on; traces are not meant to travel between architectures.
#[repr(C)]
#[derive(Debug, Clone, Copy, Pod, Zeroable, PartialEq)]
pub struct TraceHeader {
    pub magic: [u8; 4],
    pub version: u32,
    /// Nominal interval the recording device sampled at.
    pub sample_interval_ms: i64,
}

impl TraceHeader {
    pub fn new(sample_interval_ms: i64) -> Self {
        Self {
            magic: TRACE_MAGIC,
            version: TRACE_VERSION,
            sample_interval_ms,
        }
    }
}

#[derive(Debug, Error)]
pub enum TraceError {
    #[error("trace I/O failed: {0}")]
    Io(#[from] std::io::Error),
    #[error("not a trace file (magic {0:?})")]
    BadMagic([u8; 4]),
    #[error("unsupported trace version {0}")]
    UnsupportedVersion(u32),
    #[error("trace of {0} bytes does not hold a header and whole samples")]
    Truncated(usize),
}

/// Appends raw samples to a trace, header first.
pub struct TraceWriter<W: Write> {
    out: BufWriter<W>,
    written: usize,
}

impl TraceWriter<File> {
    pub fn create(path: impl AsRef<Path>, sample_interval_ms: i64) -> Result<Self, TraceError> {
        Self::new(File::create(path)?, sample_interval_ms)
    }
}

impl<W: Write> TraceWriter<W> {
    pub fn new(inner: W, sample_interval_ms: i64) -> Result<Self, TraceError> {
        let mut out = BufWriter::new(inner);
        out.write_all(bytemuck::bytes_of(&TraceHeader::new(sample_interval_ms)))?;
        Ok(Self { out, written: 0 })
    }

    pub fn write(&mut self, sample: &RawSample) -> Result<(), TraceError> {
        self.out.write_all(bytemuck::bytes_of(sample))?;
        self.written += 1;
        Ok(())
    }

    pub fn write_all(&mut self, samples: &[RawSample]) -> Result<(), TraceError> {
        self.out.write_all(bytemuck::cast_slice(samples))?;
        self.written += samples.len();
        Ok(())
    }

    /// Samples written so far.
    pub fn written(&self) -> usize {
        self.written
    }

    /// Flushes and hands back the underlying writer.
    pub fn finish(self) -> Result<W, TraceError> {
        self.out.into_inner().map_err(|e| TraceError::Io(e.into_error()))
    }
}

/// Read-only, memory-mapped view of a trace file.
pub struct TraceReader {
    mmap: Mmap,
    header: TraceHeader,
}

impl TraceReader {
    pub fn open(path: impl AsRef<Path>) -> Result<Self, TraceError> {
        let file = File::open(path)?;
        let len = file.metadata()?.len() as usize;
        if len < HEADER_LEN {
            return Err(TraceError::Truncated(len));
        }

        // SAFETY: the mapping is read-only and the file is not modified while mapped.
        let mmap = unsafe { Mmap::map(&file)? };

        let header: TraceHeader = bytemuck::pod_read_unaligned(&mmap[..HEADER_LEN]);
        if header.magic != TRACE_MAGIC {
            return Err(TraceError::BadMagic(header.magic));
        }
        if header.version != TRACE_VERSION {
            return Err(TraceError::UnsupportedVersion(header.version));
        }
        if bytemuck::try_cast_slice::<u8, RawSample>(&mmap[HEADER_LEN..]).is_err() {
            return Err(TraceError::Truncated(mmap.len()));
        }

        Ok(Self { mmap, header })
    }

    pub fn header(&self) -> &TraceHeader {
        &self.header
    }

    pub fn samples(&self) -> &[RawSample] {
        // Size and alignment were checked in `open`.
        bytemuck::cast_slice(&self.mmap[HEADER_LEN..])
    }

    pub fn len(&self) -> usize {
        (self.mmap.len() - HEADER_LEN) / RECORD_LEN
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[cfg(test)]
mod trace_tests {
    use super::*;

    #[test]
    fn test_header_layout() {
        assert_eq!(HEADER_LEN, 16);
        let header = TraceHeader::new(20);
        assert_eq!(&bytemuck::bytes_of(&header)[..4], b"FWTR");
    }

    #[test]
    fn test_writer_emits_header_then_records() {
        let mut writer = TraceWriter::new(Vec::new(), 20).unwrap();
        writer.write(&RawSample::new(0.0, 0.0, 9.8, 20)).unwrap();
        writer
            .write_all(&[
                RawSample::new(0.0, 0.0, 9.8, 40),
                RawSample::new(0.0, 0.0, 9.8, 60),
            ])
            .unwrap();
        assert_eq!(writer.written(), 3);

        let bytes = writer.finish().unwrap();
        assert_eq!(bytes.len(), HEADER_LEN + 3 * RECORD_LEN);
        let header: TraceHeader = bytemuck::pod_read_unaligned(&bytes[..HEADER_LEN]);
        assert_eq!(header, TraceHeader::new(20));
    }
}

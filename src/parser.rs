//! Parsers of fixed-size binary point records, such as the TinyImage dataset
//! (one byte per dimension) and its GIST descriptors (little-endian f32).

use std::io::{ErrorKind, Read};

use byteorder::{ByteOrder, LittleEndian};

use crate::error::{Error, Result};

/// Dimensionality of TinyImage points (32x32 RGB).
pub const TINY_IMAGE_DIM: usize = 3072;

/// Dimensionality of the GIST descriptors of TinyImage.
pub const TINY_IMAGE_GIST_DIM: usize = 384;

/// Byte layout of one coordinate.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Layout {
    U8,
    F32Le,
}

impl Layout {
    pub fn width(self) -> usize {
        match self {
            Layout::U8 => 1,
            Layout::F32Le => 4,
        }
    }
}

/// Decoder of fixed-size point records.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct PointParser {
    layout: Layout,
    dim: usize,
}

impl PointParser {
    pub fn new(layout: Layout, dim: usize) -> Self {
        Self { layout, dim }
    }

    pub fn tiny_image() -> Self {
        Self::new(Layout::U8, TINY_IMAGE_DIM)
    }

    pub fn tiny_image_gist() -> Self {
        Self::new(Layout::F32Le, TINY_IMAGE_GIST_DIM)
    }

    pub fn dim(&self) -> usize {
        self.dim
    }

    /// Gets the byte length of one record.
    pub fn record_len(&self) -> usize {
        self.dim * self.layout.width()
    }

    /// Gets the number of records in `total_bytes` bytes.
    /// If it is not a multiple of the record length, returns Error::MalformedRecord.
    pub fn count_records(&self, total_bytes: usize) -> Result<usize> {
        let len = self.record_len();
        if len == 0 || total_bytes % len != 0 {
            return Err(Error::MalformedRecord {
                expected: len,
                actual: total_bytes % len.max(1),
            });
        }
        Ok(total_bytes / len)
    }

    /// Decodes one record.
    pub fn parse(&self, record: &[u8]) -> Result<Vec<f64>> {
        if record.len() != self.record_len() {
            return Err(Error::MalformedRecord {
                expected: self.record_len(),
                actual: record.len(),
            });
        }
        let point = match self.layout {
            Layout::U8 => record.iter().map(|&x| x as f64).collect(),
            Layout::F32Le => {
                let mut buf = vec![0f32; self.dim];
                LittleEndian::read_f32_into(record, &mut buf);
                buf.into_iter().map(|x| x as f64).collect()
            }
        };
        Ok(point)
    }

    /// Decodes all the records until the end of reader.
    /// A truncated trailing record is an Error::MalformedRecord.
    pub fn read_points<R: Read>(&self, mut reader: R) -> Result<Vec<Vec<f64>>> {
        let len = self.record_len();
        let mut record = vec![0u8; len];
        let mut points = Vec::new();
        loop {
            let filled = fill(&mut reader, &mut record)?;
            if filled == 0 {
                break;
            }
            if filled < len {
                return Err(Error::MalformedRecord {
                    expected: len,
                    actual: filled,
                });
            }
            points.push(self.parse(&record)?);
        }
        Ok(points)
    }
}

/// Reads until buf is full or the reader ends. Returns the number of bytes read.
fn fill<R: Read>(reader: &mut R, buf: &mut [u8]) -> Result<usize> {
    let mut filled = 0;
    while filled < buf.len() {
        match reader.read(&mut buf[filled..]) {
            Ok(0) => break,
            Ok(n) => filled += n,
            Err(e) if e.kind() == ErrorKind::Interrupted => continue,
            Err(e) => return Err(e.into()),
        }
    }
    Ok(filled)
}

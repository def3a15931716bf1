//! Literals section.
//!
//! A literals section is a header followed by the literal bytes in one of
//! four encodings:
//!
//! | Type       | Payload                                   |
//! |------------|-------------------------------------------|
//! | Raw        | the bytes, verbatim                       |
//! | Rle        | one byte, repeated `regenerated_size` times |
//! | Compressed | Huffman table description + 1 or 4 streams |
//! | Treeless   | 1 or 4 streams using the previous table   |
//!
//! Header layouts (little-endian, type in the low two bits):
//!
//! ```text
//! Raw/Rle     1 byte:  type:2 | 0:1 | size:5
//!             2 bytes: type:2 | 01  | size:12
//!             3 bytes: type:2 | 11  | size:20
//! Compressed  3 bytes: type:2 | 00 (1 stream) or 01 | size:10 | csize:10
//!             4 bytes: type:2 | 10  | size:14 | csize:14
//!             5 bytes: type:2 | 11  | size:18 | csize:18
//! ```

mod compress;
mod decompress;

pub use compress::LiteralsEncoder;
pub use decompress::LiteralsDecoder;

use zentropy_core::{Error, LiteralsBlockType, Result};

/// Largest literals section (one block).
pub const LITERALS_MAX: usize = 128 * 1024;

/// Smallest regenerated size that may use four streams.
pub const MIN_LITERALS_FOR_4_STREAMS: usize = 6;

/// Parsed literals section header.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LiteralsHeader {
    /// Encoding of the payload.
    pub block_type: LiteralsBlockType,
    /// Number of literal bytes.
    pub regenerated_size: usize,
    /// Payload size. Equals `regenerated_size` for raw, 1 for RLE.
    pub compressed_size: usize,
    /// Huffman payload is one stream (only meaningful when compressed).
    pub single_stream: bool,
    /// Header length in bytes.
    pub header_size: usize,
}

impl LiteralsHeader {
    /// Header for a raw section.
    pub fn raw(size: usize) -> Self {
        LiteralsHeader {
            block_type: LiteralsBlockType::Raw,
            regenerated_size: size,
            compressed_size: size,
            single_stream: true,
            header_size: raw_header_size(size),
        }
    }

    /// Header for an RLE section.
    pub fn rle(size: usize) -> Self {
        LiteralsHeader {
            block_type: LiteralsBlockType::Rle,
            regenerated_size: size,
            compressed_size: 1,
            single_stream: true,
            header_size: raw_header_size(size),
        }
    }

    /// Header for a Huffman section (`Compressed` or `Treeless`).
    pub fn huffman(
        block_type: LiteralsBlockType,
        size: usize,
        compressed_size: usize,
        single_stream: bool,
    ) -> Self {
        LiteralsHeader {
            block_type,
            regenerated_size: size,
            compressed_size,
            single_stream,
            header_size: compressed_header_size(size),
        }
    }

    /// Bytes the whole section occupies, header included.
    pub fn section_size(&self) -> usize {
        self.header_size + self.compressed_size
    }

    /// Parse a header from the start of `src`.
    pub fn parse(src: &[u8]) -> Result<Self> {
        let Some(&first) = src.first() else {
            return Err(Error::SrcSizeWrong("literals: empty section"));
        };
        let block_type = LiteralsBlockType::from_field(first);
        let size_format = (first >> 2) & 3;

        let header = match block_type {
            LiteralsBlockType::Raw | LiteralsBlockType::Rle => {
                let (regenerated_size, header_size) = match size_format {
                    0 | 2 => ((first >> 3) as usize, 1),
                    1 => (read_le(src, 2)? >> 4, 2),
                    _ => (read_le(src, 3)? >> 4, 3),
                };
                let compressed_size = if block_type == LiteralsBlockType::Raw {
                    regenerated_size
                } else {
                    1
                };
                LiteralsHeader {
                    block_type,
                    regenerated_size,
                    compressed_size,
                    single_stream: true,
                    header_size,
                }
            }
            LiteralsBlockType::Compressed | LiteralsBlockType::Treeless => {
                let (regenerated_size, compressed_size, header_size) = match size_format {
                    0 | 1 => {
                        let lhc = read_le(src, 3)?;
                        ((lhc >> 4) & 0x3FF, (lhc >> 14) & 0x3FF, 3)
                    }
                    2 => {
                        let lhc = read_le(src, 4)?;
                        ((lhc >> 4) & 0x3FFF, lhc >> 18, 4)
                    }
                    _ => {
                        let lhc = read_le(src, 4)?;
                        let extra = (src[4..].first().copied().ok_or_else(truncated)? as usize) << 10;
                        ((lhc >> 4) & 0x3FFFF, (lhc >> 22) + extra, 5)
                    }
                };
                LiteralsHeader {
                    block_type,
                    regenerated_size,
                    compressed_size,
                    single_stream: size_format == 0,
                    header_size,
                }
            }
        };

        if header.regenerated_size > LITERALS_MAX {
            tracing::debug!(size = header.regenerated_size, "literals size above block maximum");
            return Err(Error::corrupted("literals: regenerated size above 128 KiB"));
        }
        Ok(header)
    }

    /// Write the header into `dst`, returning its size.
    pub fn write(&self, dst: &mut [u8]) -> Result<usize> {
        if dst.len() < self.header_size {
            return Err(Error::dst_too_small(self.header_size, dst.len()));
        }
        let ty = u32::from(self.block_type.field());
        let size = self.regenerated_size as u32;
        let csize = self.compressed_size as u32;
        match (self.block_type, self.header_size) {
            (LiteralsBlockType::Raw | LiteralsBlockType::Rle, 1) => {
                dst[0] = (ty + (size << 3)) as u8;
            }
            (LiteralsBlockType::Raw | LiteralsBlockType::Rle, 2) => {
                write_le(dst, ty + (1 << 2) + (size << 4), 2);
            }
            (LiteralsBlockType::Raw | LiteralsBlockType::Rle, _) => {
                write_le(dst, ty + (3 << 2) + (size << 4), 3);
            }
            (_, 3) => {
                let four_streams = u32::from(!self.single_stream);
                write_le(dst, ty + (four_streams << 2) + (size << 4) + (csize << 14), 3);
            }
            (_, 4) => {
                write_le(dst, ty + (2 << 2) + (size << 4) + (csize << 18), 4);
            }
            _ => {
                write_le(dst, ty + (3 << 2) + (size << 4) + (csize << 22), 4);
                dst[4] = (csize >> 10) as u8;
            }
        }
        Ok(self.header_size)
    }
}

/// Header size of a raw or RLE section of `size` bytes.
#[inline]
pub fn raw_header_size(size: usize) -> usize {
    1 + usize::from(size > 31) + usize::from(size > 4095)
}

/// Header size of a Huffman section regenerating `size` bytes.
#[inline]
pub fn compressed_header_size(size: usize) -> usize {
    3 + usize::from(size >= 1024) + usize::from(size >= 16 * 1024)
}

fn truncated() -> Error {
    Error::corrupted("literals: truncated header")
}

fn read_le(src: &[u8], len: usize) -> Result<usize> {
    let bytes = src.get(..len).ok_or_else(truncated)?;
    Ok(bytes
        .iter()
        .rev()
        .fold(0usize, |acc, &b| (acc << 8) | b as usize))
}

fn write_le(dst: &mut [u8], value: u32, len: usize) {
    dst[..len].copy_from_slice(&value.to_le_bytes()[..len]);
}

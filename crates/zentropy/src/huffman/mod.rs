//! Huffman coding for literals.
//!
//! ## Overview
//!
//! Literals use canonical Huffman codes of at most 12 bits. A section
//! carries the code as a weight list ([`write_table`] / [`read_weights`])
//! followed by the payload as one stream, or as four streams behind a
//! 6-byte jump table so the decoder can interleave them.
//!
//! ```text
//! 4 streams:  [ len1 | len2 | len3 ] [ stream 1 ][ stream 2 ][ stream 3 ][ stream 4 ]
//!               LE16   LE16   LE16     each covers (S+3)/4 bytes, the last the rest
//! ```
//!
//! Decoding offers two table flavors. [`DecoderKind::SingleSymbol`] reads
//! one symbol per lookup; [`DecoderKind::DoubleSymbol`] reads two when
//! they fit, which pays off on highly compressible input.
//! [`select_decoder`] picks between them from the section sizes.
//!
//! ## References
//!
//! - [RFC 8878 Section 4.2](https://datatracker.ietf.org/doc/html/rfc8878#section-4.2)

mod compress;
mod decoder;
mod encoder;
mod table;
mod weights;

pub use compress::{compress_with_repeat, compress_with_workspace, HuffmanOptions, HuffmanRepeat};
pub use decoder::{decompress_1x, decompress_4x};
pub use encoder::{HuffmanCode, HuffmanTable, HUF_BUILD_WORKSPACE_SIZE};
pub use table::{DecodeTableX1, DecodeTableX2, EntryX1, EntryX2, HuffmanDecodeTable};
pub use weights::{read_weights, write_table, Weights};

/// Largest code length.
pub const HUF_TABLELOG_MAX: u32 = 12;

/// Default code length bound for literals.
pub const HUF_TABLELOG_DEFAULT: u32 = 11;

/// Largest symbol value.
pub const HUF_SYMBOLVALUE_MAX: u32 = 255;

/// Largest block a single call may compress.
pub const HUF_BLOCKSIZE_MAX: usize = 128 * 1024;

/// FSE table log bound for compressed weight lists.
pub const MAX_FSE_TABLELOG_FOR_WEIGHTS: u32 = 6;

/// Decoding table flavor.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DecoderKind {
    /// One symbol per lookup.
    SingleSymbol,
    /// Up to two symbols per lookup.
    DoubleSymbol,
}

/// Fixed and per-256-bytes decode cost per compression-ratio bucket,
/// single-symbol then double-symbol.
const ALGO_TIME: [[(u32, u32); 2]; 16] = [
    [(0, 0), (1, 1)],
    [(0, 0), (1, 1)],
    [(150, 216), (381, 119)],
    [(170, 205), (514, 112)],
    [(177, 199), (539, 110)],
    [(197, 194), (644, 107)],
    [(221, 192), (735, 107)],
    [(256, 189), (881, 106)],
    [(359, 188), (1167, 109)],
    [(582, 187), (1570, 114)],
    [(688, 187), (1712, 122)],
    [(825, 186), (1965, 136)],
    [(976, 185), (2131, 150)],
    [(1180, 186), (2070, 175)],
    [(1377, 185), (1731, 202)],
    [(1412, 185), (1695, 202)],
];

/// Choose a decoder flavor for `dst_size` bytes regenerated from
/// `c_src_size` compressed bytes.
pub fn select_decoder(dst_size: usize, c_src_size: usize) -> DecoderKind {
    if dst_size == 0 {
        return DecoderKind::SingleSymbol;
    }
    let q = if c_src_size >= dst_size {
        15
    } else {
        c_src_size * 16 / dst_size
    };
    let d256 = (dst_size >> 8) as u32;
    let [(t0, d0), (t1, d1)] = ALGO_TIME[q];
    let time_x1 = t0 + d0 * d256;
    let mut time_x2 = t1 + d1 * d256;
    // slight preference for the smaller table
    time_x2 += time_x2 >> 5;
    let kind = if time_x2 < time_x1 {
        DecoderKind::DoubleSymbol
    } else {
        DecoderKind::SingleSymbol
    };
    tracing::trace!(dst_size, c_src_size, ?kind, "huffman decoder selected");
    kind
}

impl HuffmanDecodeTable {
    /// Build a table of the requested flavor.
    pub fn build(weights: &Weights, kind: DecoderKind) -> zentropy_core::Result<Self> {
        let x1 = DecodeTableX1::build(weights)?;
        Ok(match kind {
            DecoderKind::SingleSymbol => HuffmanDecodeTable::X1(x1),
            DecoderKind::DoubleSymbol => HuffmanDecodeTable::X2(DecodeTableX2::from_x1(&x1)),
        })
    }
}

//! Core type definitions shared by the entropy coders.

use serde::{Deserialize, Serialize};

/// Match-finding strategy of the enclosing compressor.
///
/// The entropy stage only uses the strategy to tune heuristics: the
/// minimum literal count worth compressing, the minimum gain a Huffman
/// attempt must show, and whether sequence tables are chosen by a cost
/// model. Discriminants match the reference numbering.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize, Deserialize,
)]
#[repr(u8)]
pub enum Strategy {
    /// Single hash, greedy.
    Fast = 1,
    /// Double hash (default for low levels).
    #[default]
    DFast = 2,
    /// Greedy hash chain.
    Greedy = 3,
    /// Lazy evaluation, depth 1.
    Lazy = 4,
    /// Lazy evaluation, depth 2.
    Lazy2 = 5,
    /// Binary tree, lazy.
    BtLazy2 = 6,
    /// Binary tree with optimal parsing.
    BtOpt = 7,
    /// Optimal parsing, ultra.
    BtUltra = 8,
    /// Optimal parsing, two passes.
    BtUltra2 = 9,
}

impl Strategy {
    /// Numeric value used by the tuning formulas.
    pub fn to_level(self) -> u32 {
        self as u32
    }

    /// Create from numeric value, clamping into the valid range.
    pub fn from_level(level: u32) -> Self {
        match level {
            0 | 1 => Strategy::Fast,
            2 => Strategy::DFast,
            3 => Strategy::Greedy,
            4 => Strategy::Lazy,
            5 => Strategy::Lazy2,
            6 => Strategy::BtLazy2,
            7 => Strategy::BtOpt,
            8 => Strategy::BtUltra,
            _ => Strategy::BtUltra2,
        }
    }
}

/// Reuse state of a previously built entropy table.
///
/// `Valid` is a caller promise: the table is used without checking it
/// against the new statistics. Promising it wrongly produces a stream that
/// decodes to the wrong bytes with no error.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum RepeatMode {
    /// No usable previous table; a fresh one must be built.
    #[default]
    None,
    /// A previous table exists and may be reused after validation.
    Check,
    /// A previous table exists and is known compatible.
    Valid,
}

/// Encoding of a literals section (2-bit block type field).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum LiteralsBlockType {
    /// Stored verbatim.
    Raw,
    /// One byte repeated.
    Rle,
    /// Huffman with a table description in the section.
    Compressed,
    /// Huffman reusing the previous section's table.
    Treeless,
}

impl LiteralsBlockType {
    /// Parse from the low two bits of the first header byte.
    pub fn from_field(field: u8) -> Self {
        match field & 0x03 {
            0 => LiteralsBlockType::Raw,
            1 => LiteralsBlockType::Rle,
            2 => LiteralsBlockType::Compressed,
            _ => LiteralsBlockType::Treeless,
        }
    }

    /// The 2-bit field value.
    pub fn field(self) -> u8 {
        match self {
            LiteralsBlockType::Raw => 0,
            LiteralsBlockType::Rle => 1,
            LiteralsBlockType::Compressed => 2,
            LiteralsBlockType::Treeless => 3,
        }
    }
}

/// Encoding of one sequence symbol stream (literal length, offset, match length).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SymbolEncodingType {
    /// Predefined distribution, no table description.
    Predefined,
    /// Single symbol stored in one byte.
    Rle,
    /// FSE table described by an NCount header.
    Compressed,
    /// Previous section's table.
    Repeat,
}

impl SymbolEncodingType {
    /// Parse from a 2-bit mode field.
    pub fn from_field(field: u8) -> Self {
        match field & 0x03 {
            0 => SymbolEncodingType::Predefined,
            1 => SymbolEncodingType::Rle,
            2 => SymbolEncodingType::Compressed,
            _ => SymbolEncodingType::Repeat,
        }
    }

    /// The 2-bit field value.
    pub fn field(self) -> u8 {
        match self {
            SymbolEncodingType::Predefined => 0,
            SymbolEncodingType::Rle => 1,
            SymbolEncodingType::Compressed => 2,
            SymbolEncodingType::Repeat => 3,
        }
    }
}

/// Compression ratio metrics.
#[derive(Debug, Clone, Copy)]
pub struct CompressionRatio {
    /// Original size in bytes.
    pub original_size: usize,
    /// Encoded size in bytes.
    pub compressed_size: usize,
}

impl CompressionRatio {
    /// Create new ratio from sizes.
    pub fn new(original: usize, compressed: usize) -> Self {
        CompressionRatio {
            original_size: original,
            compressed_size: compressed,
        }
    }

    /// Calculate ratio (original / compressed). Higher is better.
    pub fn ratio(&self) -> f64 {
        if self.compressed_size == 0 {
            return 0.0;
        }
        self.original_size as f64 / self.compressed_size as f64
    }

    /// Calculate bytes saved.
    pub fn bytes_saved(&self) -> isize {
        self.original_size as isize - self.compressed_size as isize
    }

    /// Check if encoding saved space.
    pub fn is_effective(&self) -> bool {
        self.compressed_size < self.original_size
    }
}

//! Finite State Entropy (FSE) coding.
//!
//! FSE is the tANS coder used for Huffman weights and the three sequence
//! symbol streams. A table of `2^table_log` states is derived from a
//! normalized distribution; encoder and decoder walk the same state
//! machine in opposite directions.
//!
//! ## Pipeline
//!
//! ```text
//! counts ─► normalize_count ─► write_ncount ─► EncodeTable ─► compress_using_table
//!                                   │
//!                 read_ncount ◄─────┘  DecodeTable ─► decompress_using_table
//! ```
//!
//! Table construction is bit-exact: any change to the spread step or the
//! low-probability placement makes tables incompatible with every other
//! Zstandard implementation.
//!
//! ## References
//!
//! - [RFC 8878 Section 4.1](https://datatracker.ietf.org/doc/html/rfc8878#section-4.1)

mod decoder;
mod encoder;
mod ncount;
mod normalize;
mod table;

pub use decoder::{decompress, decompress_using_table, DecodeState};
pub use encoder::{compress, compress_using_table, EncodeState, EncodeTable, SymbolTransform};
pub use ncount::{ncount_bound, read_ncount, write_ncount, NCount};
pub use normalize::normalize_count;
pub use table::{DecodeEntry, DecodeTable};

use crate::bitstream::highbit32;

/// Smallest table log produced by [`optimal_table_log`].
pub const FSE_MIN_TABLELOG: u32 = 5;

/// Largest table log produced by [`optimal_table_log`].
pub const FSE_MAX_TABLELOG: u32 = 12;

/// Table log used when the caller does not ask for one.
pub const FSE_DEFAULT_TABLELOG: u32 = 11;

/// Largest table log an NCount header can declare.
pub const FSE_TABLELOG_ABSOLUTE_MAX: u32 = 15;

/// Largest symbol value an FSE table can carry.
pub const FSE_MAX_SYMBOL_VALUE: u32 = 255;

/// Slot stride of the symbol spread. Coprime with every power-of-two size.
#[inline]
pub const fn table_step(table_size: usize) -> usize {
    (table_size >> 1) + (table_size >> 3) + 3
}

/// Smallest log able to give every present symbol at least one slot.
pub fn min_table_log(src_size: usize, max_symbol: u32) -> u32 {
    debug_assert!(src_size > 1);
    let from_src = highbit32(src_size as u32) + 1;
    let from_symbols = highbit32(max_symbol.max(1)) + 2;
    from_src.min(from_symbols)
}

/// Table log for a source of `src_size` bytes, clamped to the FSE range.
///
/// `max_log == 0` selects [`FSE_DEFAULT_TABLELOG`].
pub fn optimal_table_log(max_log: u32, src_size: usize, max_symbol: u32) -> u32 {
    optimal_table_log_internal(max_log, src_size, max_symbol, 2)
}

/// Shared by FSE (`minus == 2`) and Huffman (`minus == 1`).
pub(crate) fn optimal_table_log_internal(
    max_log: u32,
    src_size: usize,
    max_symbol: u32,
    minus: u32,
) -> u32 {
    let src_size = src_size.min(u32::MAX as usize).max(2);
    let max_bits_src = highbit32((src_size - 1) as u32).wrapping_sub(minus);
    let min_bits = min_table_log(src_size, max_symbol);

    let mut table_log = if max_log == 0 {
        FSE_DEFAULT_TABLELOG
    } else {
        max_log
    };
    if max_bits_src < table_log {
        table_log = max_bits_src;
    }
    if min_bits > table_log {
        table_log = min_bits;
    }
    table_log.clamp(FSE_MIN_TABLELOG, FSE_MAX_TABLELOG)
}

/// Predefined literal-length distribution (log 6).
pub const LITERAL_LENGTH_DEFAULT_DISTRIBUTION: [i16; 36] = [
    4, 3, 2, 2, 2, 2, 2, 2, 2, 2, 2, 2, 2, 1, 1, 1, 2, 2, 2, 2, 2, 2, 2, 2, 2, 3, 2, 1, 1, 1, 1, 1,
    -1, -1, -1, -1,
];

/// Predefined match-length distribution (log 6).
pub const MATCH_LENGTH_DEFAULT_DISTRIBUTION: [i16; 53] = [
    1, 4, 3, 2, 2, 2, 2, 2, 2, 1, 1, 1, 1, 1, 1, 1, 1, 1, 1, 1, 1, 1, 1, 1, 1, 1, 1, 1, 1, 1, 1, 1,
    1, 1, 1, 1, 1, 1, 1, 1, 1, 1, 1, 1, 1, 1, -1, -1, -1, -1, -1, -1, -1,
];

/// Predefined offset-code distribution (log 5).
pub const OFFSET_DEFAULT_DISTRIBUTION: [i16; 29] = [
    1, 1, 1, 1, 1, 1, 2, 2, 2, 1, 1, 1, 1, 1, 1, 1, 1, 1, 1, 1, 1, 1, 1, 1, -1, -1, -1, -1, -1,
];

/// Accuracy log of [`LITERAL_LENGTH_DEFAULT_DISTRIBUTION`].
pub const LITERAL_LENGTH_DEFAULT_LOG: u32 = 6;

/// Accuracy log of [`MATCH_LENGTH_DEFAULT_DISTRIBUTION`].
pub const MATCH_LENGTH_DEFAULT_LOG: u32 = 6;

/// Accuracy log of [`OFFSET_DEFAULT_DISTRIBUTION`].
pub const OFFSET_DEFAULT_LOG: u32 = 5;

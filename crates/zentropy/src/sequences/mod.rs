//! Sequences section coding.
//!
//! A sequence is one LZ77 command: copy `lit_length` literals, then copy
//! `match_length` bytes from a back-reference. Each field is split into a
//! *code*, coded with FSE, and *extra bits* stored raw alongside it:
//!
//! ```text
//! ┌────────┬──────────┬─────────────┬──────────────────────────────────┐
//! │ nbSeq  │ mode byte│ table descs │ interleaved LL/OF/ML bitstream   │
//! │ 1-3 B  │ LL OF ML │ 0..3        │ (read backward)                  │
//! └────────┴──────────┴─────────────┴──────────────────────────────────┘
//! ```
//!
//! ## Mode byte
//!
//! `LL << 6 | OF << 4 | ML << 2`, each a [`SymbolEncodingType`] field. The
//! low two bits are reserved and must be zero. Table descriptions follow in
//! LL, OF, ML order: one byte for RLE, an NCount header for compressed,
//! nothing for predefined and repeat.
//!
//! ## Offsets
//!
//! `off_base` is passed through untouched: values 1..=3 name repeat
//! offsets and larger values are `offset + 3`. Resolving them is the block
//! decoder's job.
//!
//! ## References
//!
//! - [RFC 8878 Section 3.1.1.3.2](https://datatracker.ietf.org/doc/html/rfc8878#section-3.1.1.3.2)

mod decode;
mod encode;
mod tables;

pub use decode::SequencesDecoder;
pub use encode::{select_encoding_type, SequencesEncoder};
pub use tables::{predefined_decode_table, predefined_encode_table};

use zentropy_core::{Error, Result, SymbolEncodingType};

use crate::bitstream::highbit32;
use crate::fse::{
    LITERAL_LENGTH_DEFAULT_DISTRIBUTION, LITERAL_LENGTH_DEFAULT_LOG,
    MATCH_LENGTH_DEFAULT_DISTRIBUTION, MATCH_LENGTH_DEFAULT_LOG, OFFSET_DEFAULT_DISTRIBUTION,
    OFFSET_DEFAULT_LOG,
};

/// Largest literal-length code.
pub const MAX_LL: u32 = 35;

/// Largest match-length code.
pub const MAX_ML: u32 = 52;

/// Largest offset code.
pub const MAX_OFF: u32 = 31;

/// Largest offset code the predefined table covers.
pub const DEFAULT_MAX_OFF: u32 = 28;

/// Table log bound for literal lengths.
pub const LL_FSE_LOG: u32 = 9;

/// Table log bound for match lengths.
pub const ML_FSE_LOG: u32 = 9;

/// Table log bound for offsets.
pub const OFF_FSE_LOG: u32 = 8;

/// Workspace bytes for spreading one stream's FSE table.
pub const SEQUENCES_SPREAD_SIZE: usize = 1 << LL_FSE_LOG;

/// Smallest match length.
pub const MIN_MATCH: u32 = 3;

/// Largest literal length a sequence can carry.
pub const MAX_LIT_LENGTH: u32 = 65536 + 0xFFFF;

/// Largest match length a sequence can carry.
pub const MAX_MATCH_LENGTH: u32 = 65539 + 0xFFFF;

/// Sequence counts from here on use the 3-byte header.
pub const LONG_NB_SEQ: usize = 0x7F00;

/// Largest sequence count the header can express.
pub const MAX_NB_SEQ: usize = LONG_NB_SEQ + 0xFFFF;

/// One LZ77 command.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Sequence {
    /// Literals copied before the match.
    pub lit_length: u32,
    /// Bytes copied from the match (at least [`MIN_MATCH`]).
    pub match_length: u32,
    /// Repeat code (1..=3) or `offset + 3`.
    pub off_base: u32,
}

impl Sequence {
    /// Create a sequence from its raw fields.
    pub fn new(lit_length: u32, match_length: u32, off_base: u32) -> Self {
        Sequence {
            lit_length,
            match_length,
            off_base,
        }
    }

    /// Sequence with an explicit back-reference distance.
    pub fn with_offset(lit_length: u32, match_length: u32, offset: u32) -> Self {
        Self::new(lit_length, match_length, offset + 3)
    }

    /// Check the fields fit the code tables.
    pub fn validate(&self) -> Result<()> {
        if self.lit_length > MAX_LIT_LENGTH {
            return Err(Error::generic("sequence literal length out of range"));
        }
        if self.match_length < MIN_MATCH || self.match_length > MAX_MATCH_LENGTH {
            return Err(Error::generic("sequence match length out of range"));
        }
        if self.off_base == 0 {
            return Err(Error::generic("sequence offset base is zero"));
        }
        Ok(())
    }
}

/// One of the three symbol streams of a sequences section.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SymbolStream {
    /// Literal-length codes.
    LiteralLength,
    /// Offset codes.
    Offset,
    /// Match-length codes.
    MatchLength,
}

impl SymbolStream {
    /// Streams in the order their table descriptions appear.
    pub const ALL: [SymbolStream; 3] = [
        SymbolStream::LiteralLength,
        SymbolStream::Offset,
        SymbolStream::MatchLength,
    ];

    #[inline]
    pub(crate) fn index(self) -> usize {
        match self {
            SymbolStream::LiteralLength => 0,
            SymbolStream::Offset => 1,
            SymbolStream::MatchLength => 2,
        }
    }

    /// Largest code in the alphabet.
    pub fn max_symbol(self) -> u32 {
        match self {
            SymbolStream::LiteralLength => MAX_LL,
            SymbolStream::Offset => MAX_OFF,
            SymbolStream::MatchLength => MAX_ML,
        }
    }

    /// Largest table log a description may declare.
    pub fn max_log(self) -> u32 {
        match self {
            SymbolStream::LiteralLength => LL_FSE_LOG,
            SymbolStream::Offset => OFF_FSE_LOG,
            SymbolStream::MatchLength => ML_FSE_LOG,
        }
    }

    /// Predefined distribution.
    pub fn default_distribution(self) -> &'static [i16] {
        match self {
            SymbolStream::LiteralLength => &LITERAL_LENGTH_DEFAULT_DISTRIBUTION,
            SymbolStream::Offset => &OFFSET_DEFAULT_DISTRIBUTION,
            SymbolStream::MatchLength => &MATCH_LENGTH_DEFAULT_DISTRIBUTION,
        }
    }

    /// Accuracy log of the predefined distribution.
    pub fn default_log(self) -> u32 {
        match self {
            SymbolStream::LiteralLength => LITERAL_LENGTH_DEFAULT_LOG,
            SymbolStream::Offset => OFFSET_DEFAULT_LOG,
            SymbolStream::MatchLength => MATCH_LENGTH_DEFAULT_LOG,
        }
    }

    /// Extra bits carried with `code`.
    #[inline]
    pub fn extra_bits(self, code: u8) -> u32 {
        match self {
            SymbolStream::LiteralLength => u32::from(LITERAL_LENGTH_BASELINE[code as usize].0),
            SymbolStream::Offset => u32::from(code),
            SymbolStream::MatchLength => u32::from(MATCH_LENGTH_BASELINE[code as usize].0),
        }
    }
}

/// Literal-length code to `(extra bits, baseline)`.
pub const LITERAL_LENGTH_BASELINE: [(u8, u32); 36] = [
    (0, 0),
    (0, 1),
    (0, 2),
    (0, 3),
    (0, 4),
    (0, 5),
    (0, 6),
    (0, 7),
    (0, 8),
    (0, 9),
    (0, 10),
    (0, 11),
    (0, 12),
    (0, 13),
    (0, 14),
    (0, 15),
    (1, 16),
    (1, 18),
    (1, 20),
    (1, 22),
    (2, 24),
    (2, 28),
    (3, 32),
    (3, 40),
    (4, 48),
    (6, 64),
    (7, 128),
    (8, 256),
    (9, 512),
    (10, 1024),
    (11, 2048),
    (12, 4096),
    (13, 8192),
    (14, 16384),
    (15, 32768),
    (16, 65536),
];

/// Match-length code to `(extra bits, baseline)`.
///
/// Codes 43 and up follow the reference encoder's widths (7 bits from 131),
/// which is what every deployed decoder expects.
pub const MATCH_LENGTH_BASELINE: [(u8, u32); 53] = [
    (0, 3),
    (0, 4),
    (0, 5),
    (0, 6),
    (0, 7),
    (0, 8),
    (0, 9),
    (0, 10),
    (0, 11),
    (0, 12),
    (0, 13),
    (0, 14),
    (0, 15),
    (0, 16),
    (0, 17),
    (0, 18),
    (0, 19),
    (0, 20),
    (0, 21),
    (0, 22),
    (0, 23),
    (0, 24),
    (0, 25),
    (0, 26),
    (0, 27),
    (0, 28),
    (0, 29),
    (0, 30),
    (0, 31),
    (0, 32),
    (0, 33),
    (0, 34),
    (1, 35),
    (1, 37),
    (1, 39),
    (1, 41),
    (2, 43),
    (2, 47),
    (3, 51),
    (3, 59),
    (4, 67),
    (4, 83),
    (5, 99),
    (7, 131),
    (8, 259),
    (9, 515),
    (10, 1027),
    (11, 2051),
    (12, 4099),
    (13, 8195),
    (14, 16387),
    (15, 32771),
    (16, 65539),
];

#[rustfmt::skip]
const LL_CODE: [u8; 64] = [
     0,  1,  2,  3,  4,  5,  6,  7,  8,  9, 10, 11, 12, 13, 14, 15,
    16, 16, 17, 17, 18, 18, 19, 19, 20, 20, 20, 20, 21, 21, 21, 21,
    22, 22, 22, 22, 22, 22, 22, 22, 23, 23, 23, 23, 23, 23, 23, 23,
    24, 24, 24, 24, 24, 24, 24, 24, 24, 24, 24, 24, 24, 24, 24, 24,
];

#[rustfmt::skip]
const ML_CODE: [u8; 128] = [
     0,  1,  2,  3,  4,  5,  6,  7,  8,  9, 10, 11, 12, 13, 14, 15,
    16, 17, 18, 19, 20, 21, 22, 23, 24, 25, 26, 27, 28, 29, 30, 31,
    32, 32, 33, 33, 34, 34, 35, 35, 36, 36, 36, 36, 37, 37, 37, 37,
    38, 38, 38, 38, 38, 38, 38, 38, 39, 39, 39, 39, 39, 39, 39, 39,
    40, 40, 40, 40, 40, 40, 40, 40, 40, 40, 40, 40, 40, 40, 40, 40,
    41, 41, 41, 41, 41, 41, 41, 41, 41, 41, 41, 41, 41, 41, 41, 41,
    42, 42, 42, 42, 42, 42, 42, 42, 42, 42, 42, 42, 42, 42, 42, 42,
    42, 42, 42, 42, 42, 42, 42, 42, 42, 42, 42, 42, 42, 42, 42, 42,
];

const LL_DELTA_CODE: u32 = 19;
const ML_DELTA_CODE: u32 = 36;

/// Literal-length code of `lit_length`.
#[inline]
pub fn ll_code(lit_length: u32) -> u8 {
    if lit_length > 63 {
        (highbit32(lit_length) + LL_DELTA_CODE) as u8
    } else {
        LL_CODE[lit_length as usize]
    }
}

/// Match-length code of `ml_base` (match length minus [`MIN_MATCH`]).
#[inline]
pub fn ml_code(ml_base: u32) -> u8 {
    if ml_base > 127 {
        (highbit32(ml_base) + ML_DELTA_CODE) as u8
    } else {
        ML_CODE[ml_base as usize]
    }
}

/// Offset code of `off_base` (non-zero).
#[inline]
pub fn of_code(off_base: u32) -> u8 {
    highbit32(off_base) as u8
}

/// Literal length from its code and extra bits.
#[inline]
pub fn decode_lit_length(code: u8, extra: u32) -> u32 {
    LITERAL_LENGTH_BASELINE[code as usize].1 + extra
}

/// Match length from its code and extra bits.
#[inline]
pub fn decode_match_length(code: u8, extra: u32) -> u32 {
    MATCH_LENGTH_BASELINE[code as usize].1 + extra
}

/// Offset base from its code and extra bits.
#[inline]
pub fn decode_off_base(code: u8, extra: u32) -> u32 {
    (1u32 << code) + extra
}

/// Bytes the sequence-count header takes for `nb_seq`.
pub fn nb_seq_header_size(nb_seq: usize) -> usize {
    if nb_seq < 128 {
        1
    } else if nb_seq < LONG_NB_SEQ {
        2
    } else {
        3
    }
}

/// Write the sequence-count header; returns its size.
pub fn write_nb_seq(dst: &mut [u8], nb_seq: usize) -> Result<usize> {
    if nb_seq > MAX_NB_SEQ {
        return Err(Error::SrcSizeWrong("sequences: count above header range"));
    }
    let size = nb_seq_header_size(nb_seq);
    if dst.len() < size {
        return Err(Error::dst_too_small(size, dst.len()));
    }
    match size {
        1 => dst[0] = nb_seq as u8,
        2 => {
            dst[0] = ((nb_seq >> 8) + 0x80) as u8;
            dst[1] = nb_seq as u8;
        }
        _ => {
            dst[0] = 0xFF;
            dst[1..3].copy_from_slice(&((nb_seq - LONG_NB_SEQ) as u16).to_le_bytes());
        }
    }
    Ok(size)
}

/// Parse the sequence-count header; returns `(nb_seq, header_size)`.
pub fn read_nb_seq(src: &[u8]) -> Result<(usize, usize)> {
    let Some(&first) = src.first() else {
        return Err(Error::SrcSizeWrong("sequences: empty section"));
    };
    let first = usize::from(first);
    match first {
        0..=0x7F => Ok((first, 1)),
        0xFF => {
            if src.len() < 3 {
                return Err(Error::SrcSizeWrong("sequences: truncated count"));
            }
            Ok((usize::from(u16::from_le_bytes([src[1], src[2]])) + LONG_NB_SEQ, 3))
        }
        _ => {
            if src.len() < 2 {
                return Err(Error::SrcSizeWrong("sequences: truncated count"));
            }
            Ok((((first - 0x80) << 8) + usize::from(src[1]), 2))
        }
    }
}

/// Encoding types of the three streams, as packed in the mode byte.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SequenceModes {
    /// Literal-length stream.
    pub literal_lengths: SymbolEncodingType,
    /// Offset stream.
    pub offsets: SymbolEncodingType,
    /// Match-length stream.
    pub match_lengths: SymbolEncodingType,
}

impl SequenceModes {
    /// All three streams with the same type.
    pub fn uniform(ty: SymbolEncodingType) -> Self {
        SequenceModes {
            literal_lengths: ty,
            offsets: ty,
            match_lengths: ty,
        }
    }

    /// Type of one stream.
    pub fn get(&self, stream: SymbolStream) -> SymbolEncodingType {
        match stream {
            SymbolStream::LiteralLength => self.literal_lengths,
            SymbolStream::Offset => self.offsets,
            SymbolStream::MatchLength => self.match_lengths,
        }
    }

    /// Set the type of one stream.
    pub fn set(&mut self, stream: SymbolStream, ty: SymbolEncodingType) {
        match stream {
            SymbolStream::LiteralLength => self.literal_lengths = ty,
            SymbolStream::Offset => self.offsets = ty,
            SymbolStream::MatchLength => self.match_lengths = ty,
        }
    }

    /// Pack into the mode byte.
    pub fn to_byte(self) -> u8 {
        (self.literal_lengths.field() << 6) | (self.offsets.field() << 4) | (self.match_lengths.field() << 2)
    }

    /// Unpack the mode byte; the reserved bits must be zero.
    pub fn from_byte(byte: u8) -> Result<Self> {
        if byte & 0x03 != 0 {
            return Err(Error::corrupted("sequences: reserved mode bits set"));
        }
        Ok(SequenceModes {
            literal_lengths: SymbolEncodingType::from_field(byte >> 6),
            offsets: SymbolEncodingType::from_field(byte >> 4),
            match_lengths: SymbolEncodingType::from_field(byte >> 2),
        })
    }
}

impl Default for SequenceModes {
    fn default() -> Self {
        Self::uniform(SymbolEncodingType::Predefined)
    }
}

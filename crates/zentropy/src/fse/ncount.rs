//! NCount: the serialized form of a normalized distribution.
//!
//! ```text
//! [accuracy_log - 5 : 4 bits] [count_0] [count_1] ... (LSB first)
//! ```
//!
//! Each count is stored as `norm + 1` in a variable number of bits that
//! shrinks as the remaining probability mass shrinks. A stored `0` (norm of
//! -1) marks a low-probability symbol; a stored `1` (norm of 0) is followed
//! by 2-bit repeat flags counting further zero symbols, where `3` means
//! "three more, keep reading".

use zentropy_core::{Error, Result};

use super::{FSE_MAX_TABLELOG, FSE_MIN_TABLELOG, FSE_TABLELOG_ABSOLUTE_MAX};
use crate::bitstream::highbit32;

/// Worst-case NCount size for the given alphabet and log.
pub fn ncount_bound(max_symbol: u32, table_log: u32) -> usize {
    if max_symbol == 0 {
        return 512;
    }
    (((max_symbol as usize + 1) * table_log as usize + 4 + 2) / 8) + 1 + 2
}

/// Serialize `norm` (length `max_symbol + 1`) into `dst`.
///
/// Returns the header size in bytes.
pub fn write_ncount(dst: &mut [u8], norm: &[i16], max_symbol: u32, table_log: u32) -> Result<usize> {
    if table_log > FSE_MAX_TABLELOG {
        return Err(Error::table_log_too_large(table_log, FSE_MAX_TABLELOG));
    }
    if table_log < FSE_MIN_TABLELOG {
        return Err(Error::Generic("ncount: table log below minimum"));
    }
    let alphabet_size = max_symbol as usize + 1;
    if norm.len() < alphabet_size {
        return Err(Error::Generic("ncount: distribution shorter than alphabet"));
    }

    let table_size = 1i32 << table_log;
    let mut out: Vec<u8> = Vec::with_capacity(ncount_bound(max_symbol, table_log));
    let mut bit_stream: u32 = table_log - FSE_MIN_TABLELOG;
    let mut bit_count: u32 = 4;
    let mut remaining = table_size + 1;
    let mut threshold = table_size;
    let mut nb_bits = table_log + 1;
    let mut symbol = 0usize;
    let mut previous_is_0 = false;

    while symbol < alphabet_size && remaining > 1 {
        if previous_is_0 {
            let mut start = symbol;
            while symbol < alphabet_size && norm[symbol] == 0 {
                symbol += 1;
            }
            if symbol == alphabet_size {
                break;
            }
            while symbol >= start + 24 {
                start += 24;
                bit_stream = bit_stream.wrapping_add(0xFFFF << bit_count);
                flush16(&mut out, &mut bit_stream);
            }
            while symbol >= start + 3 {
                start += 3;
                bit_stream = bit_stream.wrapping_add(3 << bit_count);
                bit_count += 2;
            }
            bit_stream = bit_stream.wrapping_add(((symbol - start) as u32) << bit_count);
            bit_count += 2;
            if bit_count > 16 {
                flush16(&mut out, &mut bit_stream);
                bit_count -= 16;
            }
        }

        let mut count = i32::from(norm[symbol]);
        symbol += 1;
        let max = (2 * threshold - 1) - remaining;
        remaining -= count.abs();
        count += 1;
        if count >= threshold {
            count += max;
        }
        bit_stream = bit_stream.wrapping_add((count as u32) << bit_count);
        bit_count += nb_bits;
        if count < max {
            bit_count -= 1;
        }
        previous_is_0 = count == 1;
        if remaining < 1 {
            return Err(Error::Generic("ncount: distribution overflows table"));
        }
        while remaining < threshold {
            nb_bits -= 1;
            threshold >>= 1;
        }

        if bit_count > 16 {
            flush16(&mut out, &mut bit_stream);
            bit_count -= 16;
        }
    }

    if remaining != 1 {
        return Err(Error::Generic("ncount: distribution does not fill table"));
    }

    // final flush always stores two bytes; only the used ones count
    let required = out.len() + 2;
    if required > dst.len() {
        return Err(Error::dst_too_small(required, dst.len()));
    }
    flush16(&mut out, &mut bit_stream);
    let size = required - 2 + ((bit_count as usize + 7) / 8);
    dst[..required].copy_from_slice(&out);
    Ok(size)
}

fn flush16(out: &mut Vec<u8>, bit_stream: &mut u32) {
    out.push(*bit_stream as u8);
    out.push((*bit_stream >> 8) as u8);
    *bit_stream >>= 16;
}

/// A parsed NCount header.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NCount {
    /// Normalized counts, indexed by symbol up to `max_symbol`.
    pub norm: Vec<i16>,
    /// Highest symbol described by the header.
    pub max_symbol: u32,
    /// Accuracy log.
    pub table_log: u32,
    /// Bytes consumed from the source.
    pub header_size: usize,
}

/// Forward LSB-first cursor; bits past the end read as zero.
struct ForwardBits<'a> {
    src: &'a [u8],
    bit_pos: usize,
}

impl<'a> ForwardBits<'a> {
    fn peek(&self, nb_bits: u32) -> u32 {
        debug_assert!(nb_bits <= 24);
        let byte = self.bit_pos >> 3;
        let mut window = 0u32;
        for i in 0..4 {
            if let Some(&b) = self.src.get(byte + i) {
                window |= u32::from(b) << (8 * i);
            }
        }
        (window >> (self.bit_pos & 7)) & ((1u32 << nb_bits) - 1)
    }

    fn skip(&mut self, nb_bits: u32) {
        self.bit_pos += nb_bits as usize;
    }
}

/// Parse an NCount header whose symbols must not exceed `max_symbol`.
pub fn read_ncount(src: &[u8], max_symbol: u32) -> Result<NCount> {
    let alphabet_size = max_symbol as usize + 1;
    let mut bits = ForwardBits { src, bit_pos: 0 };

    let table_log = bits.peek(4) + FSE_MIN_TABLELOG;
    bits.skip(4);
    if table_log > FSE_TABLELOG_ABSOLUTE_MAX {
        return Err(Error::table_log_too_large(table_log, FSE_TABLELOG_ABSOLUTE_MAX));
    }

    let mut norm = vec![0i16; alphabet_size];
    let mut remaining: i32 = (1 << table_log) + 1;
    let mut threshold: i32 = 1 << table_log;
    let mut nb_bits = table_log + 1;
    let mut charnum = 0usize;
    let mut previous_0 = false;

    loop {
        if previous_0 {
            loop {
                let repeat = bits.peek(2) as usize;
                bits.skip(2);
                charnum += repeat;
                if repeat != 3 {
                    break;
                }
            }
            if charnum >= alphabet_size {
                break;
            }
        }

        let max = (2 * threshold - 1) - remaining;
        let low = bits.peek(nb_bits - 1) as i32;
        let mut count = if low < max {
            bits.skip(nb_bits - 1);
            low
        } else {
            let mut count = bits.peek(nb_bits) as i32;
            if count >= threshold {
                count -= max;
            }
            bits.skip(nb_bits);
            count
        };

        count -= 1;
        remaining -= count.abs();
        norm[charnum] = count as i16;
        charnum += 1;
        previous_0 = count == 0;

        if remaining < threshold {
            if remaining <= 1 {
                break;
            }
            nb_bits = highbit32(remaining as u32) + 1;
            threshold = 1 << (nb_bits - 1);
        }
        if charnum >= alphabet_size {
            break;
        }
    }

    if remaining != 1 {
        tracing::debug!(remaining, "rejecting ncount header");
        return Err(Error::corrupted("ncount: probabilities do not sum to table size"));
    }
    if charnum > alphabet_size {
        return Err(Error::MaxSymbolValueTooSmall {
            found: charnum as u32 - 1,
            declared: max_symbol,
        });
    }
    let header_size = (bits.bit_pos + 7) >> 3;
    if header_size > src.len() {
        return Err(Error::corrupted("ncount: header extends past input"));
    }

    norm.truncate(charnum);
    Ok(NCount {
        norm,
        max_symbol: charnum as u32 - 1,
        table_log,
        header_size,
    })
}

//! FSE decoding tables and the symbol spread shared with the encoder.

use zentropy_core::{Error, Result};

use super::{table_step, FSE_MAX_SYMBOL_VALUE, FSE_MAX_TABLELOG, FSE_MIN_TABLELOG};
use crate::bitstream::highbit32;

/// Validate a normalized distribution against its table log.
pub(crate) fn check_distribution(norm: &[i16], table_log: u32) -> Result<()> {
    if norm.is_empty() {
        return Err(Error::Generic("fse: empty distribution"));
    }
    if norm.len() - 1 > FSE_MAX_SYMBOL_VALUE as usize {
        return Err(Error::MaxSymbolValueTooLarge {
            value: (norm.len() - 1) as u32,
            max: FSE_MAX_SYMBOL_VALUE,
        });
    }
    if table_log > FSE_MAX_TABLELOG {
        return Err(Error::table_log_too_large(table_log, FSE_MAX_TABLELOG));
    }
    if table_log < FSE_MIN_TABLELOG {
        return Err(Error::Generic("fse: table log below minimum"));
    }
    let mut total: i64 = 0;
    for &n in norm {
        if n < -1 {
            return Err(Error::Generic("fse: normalized count below -1"));
        }
        total += i64::from(n).abs();
    }
    if total != 1i64 << table_log {
        return Err(Error::Generic("fse: distribution does not fill table"));
    }
    Ok(())
}

/// Assign a symbol to each of the first `2^table_log` bytes of `table`.
///
/// Low-probability symbols take one slot each from the top of the table,
/// in ascending symbol order starting at the last slot. Everything else is
/// spread with a fixed stride that visits every remaining slot once.
pub(crate) fn spread_symbols(norm: &[i16], table_log: u32, table: &mut [u8]) -> Result<()> {
    let table_size = 1usize << table_log;
    if table.len() < table_size {
        return Err(Error::workspace_too_small(table_size, table.len()));
    }
    let table = &mut table[..table_size];
    let table_mask = table_size - 1;
    let step = table_step(table_size);

    let mut high_threshold = table_size - 1;
    for (s, &n) in norm.iter().enumerate() {
        if n == -1 {
            table[high_threshold] = s as u8;
            high_threshold = high_threshold.wrapping_sub(1);
        }
    }

    if high_threshold == table_size - 1 {
        // no low-probability symbols: lay symbols out in order, then permute
        let mut spread = [0u8; 1 << FSE_MAX_TABLELOG];
        let mut end = 0usize;
        for (s, &n) in norm.iter().enumerate() {
            let run = n.max(0) as usize;
            spread[end..end + run].fill(s as u8);
            end += run;
        }
        let mut position = 0usize;
        for &symbol in &spread[..end] {
            table[position] = symbol;
            position = (position + step) & table_mask;
        }
        if position != 0 {
            return Err(Error::Generic("fse: spread did not cover table"));
        }
    } else {
        let mut position = 0usize;
        for (s, &n) in norm.iter().enumerate() {
            for _ in 0..n.max(0) {
                table[position] = s as u8;
                position = (position + step) & table_mask;
                while position > high_threshold {
                    position = (position + step) & table_mask;
                }
            }
        }
        if position != 0 {
            return Err(Error::Generic("fse: spread did not cover table"));
        }
    }
    Ok(())
}

/// One decoding state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct DecodeEntry {
    /// Base of the next state; the bits read are added to it.
    pub new_state: u16,
    /// Symbol emitted by this state.
    pub symbol: u8,
    /// Bits to read for the transition.
    pub nb_bits: u8,
}

/// FSE decoding table.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DecodeTable {
    table_log: u32,
    fast_mode: bool,
    entries: Vec<DecodeEntry>,
}

impl DecodeTable {
    /// Build from a normalized distribution.
    pub fn build(norm: &[i16], table_log: u32) -> Result<Self> {
        check_distribution(norm, table_log)?;
        let table_size = 1u32 << table_log;
        let large_limit = 1i16 << (table_log - 1);

        let mut fast_mode = true;
        let mut symbol_next: Vec<u32> = norm
            .iter()
            .map(|&n| {
                if n == -1 {
                    1
                } else {
                    if n >= large_limit {
                        fast_mode = false;
                    }
                    n as u32
                }
            })
            .collect();

        let mut spread = [0u8; 1 << FSE_MAX_TABLELOG];
        spread_symbols(norm, table_log, &mut spread)?;
        let entries = spread[..table_size as usize]
            .iter()
            .map(|&symbol| {
                let next = symbol_next[symbol as usize];
                symbol_next[symbol as usize] += 1;
                let nb_bits = table_log - highbit32(next);
                DecodeEntry {
                    symbol,
                    nb_bits: nb_bits as u8,
                    new_state: ((next << nb_bits) - table_size) as u16,
                }
            })
            .collect();

        Ok(DecodeTable {
            table_log,
            fast_mode,
            entries,
        })
    }

    /// Table that always yields `symbol` and consumes no bits.
    pub fn rle(symbol: u8) -> Self {
        DecodeTable {
            table_log: 0,
            fast_mode: false,
            entries: vec![DecodeEntry {
                new_state: 0,
                symbol,
                nb_bits: 0,
            }],
        }
    }

    /// Accuracy log.
    #[inline]
    pub fn table_log(&self) -> u32 {
        self.table_log
    }

    /// True when no symbol holds half the table, so every transition reads
    /// at least one bit and the unchecked bit peek is valid.
    #[inline]
    pub fn fast_mode(&self) -> bool {
        self.fast_mode
    }

    /// State `state` of the table.
    #[inline]
    pub fn entry(&self, state: usize) -> DecodeEntry {
        self.entries[state]
    }

    /// All states.
    pub fn entries(&self) -> &[DecodeEntry] {
        &self.entries
    }
}

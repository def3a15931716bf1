//! FSE encoding.

use zentropy_core::Result;

use super::table::{check_distribution, spread_symbols};
use super::{normalize_count, optimal_table_log, write_ncount, FSE_MAX_SYMBOL_VALUE, FSE_MAX_TABLELOG};
use crate::bitstream::{highbit32, BitWriter};
use crate::histogram::Histogram;

/// Per-symbol transform driving the encoder state machine.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct SymbolTransform {
    /// `nb_bits_out = (state + delta_nb_bits) >> 16`.
    pub delta_nb_bits: u32,
    /// Offset of the symbol's run in the state table.
    pub delta_find_state: i32,
}

/// FSE encoding table.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EncodeTable {
    table_log: u32,
    max_symbol: u32,
    state_table: Vec<u16>,
    symbol_tt: Vec<SymbolTransform>,
}

impl EncodeTable {
    /// Build from a normalized distribution (length `max_symbol + 1`).
    pub fn build(norm: &[i16], table_log: u32) -> Result<Self> {
        let mut spread = [0u8; 1 << FSE_MAX_TABLELOG];
        Self::build_with_workspace(norm, table_log, &mut spread)
    }

    /// Like [`build`](Self::build), spreading symbols into `scratch`
    /// (at least `2^table_log` bytes).
    pub fn build_with_workspace(norm: &[i16], table_log: u32, scratch: &mut [u8]) -> Result<Self> {
        check_distribution(norm, table_log)?;
        let table_size = 1u32 << table_log;

        // start of each symbol's run of states
        let mut cumul = [0u32; FSE_MAX_SYMBOL_VALUE as usize + 2];
        for (s, &n) in norm.iter().enumerate() {
            cumul[s + 1] = cumul[s] + if n == -1 { 1 } else { n as u32 };
        }

        spread_symbols(norm, table_log, scratch)?;
        let spread = &scratch[..table_size as usize];
        let mut state_table = vec![0u16; table_size as usize];
        for (u, &symbol) in spread.iter().enumerate() {
            let slot = &mut cumul[symbol as usize];
            state_table[*slot as usize] = (table_size + u as u32) as u16;
            *slot += 1;
        }

        let mut total: i32 = 0;
        let symbol_tt = norm
            .iter()
            .map(|&n| match n {
                0 => SymbolTransform {
                    delta_nb_bits: ((table_log + 1) << 16) - table_size,
                    delta_find_state: 0,
                },
                -1 | 1 => {
                    let tt = SymbolTransform {
                        delta_nb_bits: (table_log << 16) - table_size,
                        delta_find_state: total - 1,
                    };
                    total += 1;
                    tt
                }
                n => {
                    let n = n as u32;
                    let max_bits_out = table_log - highbit32(n - 1);
                    let min_state_plus = n << max_bits_out;
                    let tt = SymbolTransform {
                        delta_nb_bits: (max_bits_out << 16) - min_state_plus,
                        delta_find_state: total - n as i32,
                    };
                    total += n as i32;
                    tt
                }
            })
            .collect();

        Ok(EncodeTable {
            table_log,
            max_symbol: (norm.len() - 1) as u32,
            state_table,
            symbol_tt,
        })
    }

    /// Table for a stream made of one repeated symbol; encodes to zero bits.
    pub fn rle(symbol: u8) -> Self {
        EncodeTable {
            table_log: 0,
            max_symbol: u32::from(symbol),
            state_table: vec![0, 0],
            symbol_tt: vec![SymbolTransform::default(); symbol as usize + 1],
        }
    }

    /// Accuracy log.
    #[inline]
    pub fn table_log(&self) -> u32 {
        self.table_log
    }

    /// Highest symbol the table can encode.
    #[inline]
    pub fn max_symbol(&self) -> u32 {
        self.max_symbol
    }

    #[inline]
    fn transform(&self, symbol: u8) -> SymbolTransform {
        self.symbol_tt[symbol as usize]
    }

    #[inline]
    fn next_state(&self, value: u32, nb_bits_out: u32, tt: SymbolTransform) -> u32 {
        let index = ((value >> nb_bits_out) as i64 + i64::from(tt.delta_find_state)) as usize;
        u32::from(self.state_table[index])
    }

    /// Approximate cost of `symbol` in `1/2^accuracy_log` bits.
    ///
    /// Returns `None` for symbols the table cannot encode and for RLE tables.
    pub fn bit_cost(&self, symbol: u32, accuracy_log: u32) -> Option<u32> {
        if self.table_log == 0 || symbol > self.max_symbol {
            return None;
        }
        debug_assert!(accuracy_log < 31 - self.table_log);
        let tt = self.symbol_tt[symbol as usize];
        let min_nb_bits = tt.delta_nb_bits >> 16;
        let threshold = (min_nb_bits + 1) << 16;
        let table_size = 1u32 << self.table_log;
        let delta_from_threshold = threshold.checked_sub(tt.delta_nb_bits + table_size)?;
        let normalized = (delta_from_threshold << accuracy_log) >> self.table_log;
        let bit_multiplier = 1u32 << accuracy_log;
        ((min_nb_bits + 1) * bit_multiplier).checked_sub(normalized)
    }

    /// Total cost in bits of encoding `counts` with this table, or `None`
    /// when some present symbol has no slot.
    pub fn repeat_cost(&self, counts: &[u32]) -> Option<usize> {
        const ACCURACY_LOG: u32 = 8;
        if counts.len() > self.max_symbol as usize + 1 {
            return None;
        }
        let bad_cost = (self.table_log + 1) << ACCURACY_LOG;
        let mut cost = 0usize;
        for (s, &count) in counts.iter().enumerate() {
            if count == 0 {
                continue;
            }
            let bit_cost = self.bit_cost(s as u32, ACCURACY_LOG)?;
            if bit_cost >= bad_cost {
                return None;
            }
            cost += count as usize * bit_cost as usize;
        }
        Some(cost >> ACCURACY_LOG)
    }
}

/// One encoder state.
#[derive(Debug, Clone, Copy)]
pub struct EncodeState {
    value: u32,
}

impl EncodeState {
    /// Start in the state that encodes `symbol` for free; the symbol is
    /// therefore the last one decoded.
    pub fn new(table: &EncodeTable, symbol: u8) -> Self {
        let tt = table.transform(symbol);
        let nb_bits_out = tt.delta_nb_bits.wrapping_add(1 << 15) >> 16;
        let value = (nb_bits_out << 16).wrapping_sub(tt.delta_nb_bits);
        EncodeState {
            value: table.next_state(value, nb_bits_out, tt),
        }
    }

    /// Emit the low bits of the current state and move to the state for `symbol`.
    #[inline]
    pub fn encode(&mut self, writer: &mut BitWriter<'_>, table: &EncodeTable, symbol: u8) {
        let tt = table.transform(symbol);
        let nb_bits_out = (self.value + tt.delta_nb_bits) >> 16;
        writer.add_bits(u64::from(self.value), nb_bits_out);
        self.value = table.next_state(self.value, nb_bits_out, tt);
    }

    /// Write the final state so the decoder can start from it.
    pub fn flush(&self, writer: &mut BitWriter<'_>, table: &EncodeTable) {
        writer.add_bits(u64::from(self.value), table.table_log);
        writer.flush_bits();
    }
}

/// Encode `src` with two interleaved states.
///
/// Returns the bitstream size, or 0 when `src` has fewer than three bytes
/// or the stream does not fit in `dst`.
pub fn compress_using_table(dst: &mut [u8], src: &[u8], table: &EncodeTable) -> usize {
    if src.len() <= 2 {
        return 0;
    }
    let fast = dst.len() >= src.len() + (src.len() >> 7) + 4 + 8;
    let Ok(mut writer) = BitWriter::new(dst) else {
        return 0;
    };
    let mut ip = src.len();
    let mut state1;
    let mut state2;
    if ip & 1 == 1 {
        state1 = EncodeState::new(table, src[ip - 1]);
        state2 = EncodeState::new(table, src[ip - 2]);
        state1.encode(&mut writer, table, src[ip - 3]);
        flush_bits(&mut writer, fast);
        ip -= 3;
    } else {
        state2 = EncodeState::new(table, src[ip - 1]);
        state1 = EncodeState::new(table, src[ip - 2]);
        ip -= 2;
    }

    // join to a multiple of four
    if (src.len() - 2) & 2 != 0 {
        state2.encode(&mut writer, table, src[ip - 1]);
        state1.encode(&mut writer, table, src[ip - 2]);
        flush_bits(&mut writer, fast);
        ip -= 2;
    }

    while ip > 0 {
        state2.encode(&mut writer, table, src[ip - 1]);
        state1.encode(&mut writer, table, src[ip - 2]);
        state2.encode(&mut writer, table, src[ip - 3]);
        state1.encode(&mut writer, table, src[ip - 4]);
        flush_bits(&mut writer, fast);
        ip -= 4;
    }

    state2.flush(&mut writer, table);
    state1.flush(&mut writer, table);
    writer.close().unwrap_or(0)
}

#[inline]
fn flush_bits(writer: &mut BitWriter<'_>, fast: bool) {
    if fast {
        writer.flush_bits_fast();
    } else {
        writer.flush_bits();
    }
}

/// Compress `src` as an NCount header followed by an FSE bitstream.
///
/// Returns `Ok(0)` when the input is not worth compressing and `Ok(1)`
/// when it is a single repeated symbol, in which case nothing is written.
pub fn compress(dst: &mut [u8], src: &[u8], max_symbol: u32, table_log: u32) -> Result<usize> {
    if src.len() <= 1 {
        return Ok(0);
    }
    let max_symbol = if max_symbol == 0 {
        FSE_MAX_SYMBOL_VALUE
    } else {
        max_symbol
    };
    let histogram = Histogram::count(src, max_symbol)?;
    let largest = histogram.largest as usize;
    if largest == src.len() {
        return Ok(1);
    }
    if largest == 1 || largest < (src.len() >> 7) {
        return Ok(0);
    }

    let table_log = optimal_table_log(table_log, src.len(), histogram.max_symbol);
    let norm = normalize_count(histogram.as_slice(), src.len(), table_log, src.len() >= 2048)?;
    let header_size = write_ncount(dst, &norm, histogram.max_symbol, table_log)?;

    let table = EncodeTable::build(&norm, table_log)?;
    let payload = compress_using_table(&mut dst[header_size..], src, &table);
    if payload == 0 {
        return Ok(0);
    }
    let total = header_size + payload;
    if total >= src.len() - 1 {
        return Ok(0);
    }
    Ok(total)
}

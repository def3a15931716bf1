//! FSE decoding.

use zentropy_core::{Error, Result};

use super::{read_ncount, DecodeTable, FSE_MAX_SYMBOL_VALUE};
use crate::bitstream::{BitReader, ReloadStatus};

/// One decoder state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DecodeState {
    state: usize,
}

impl DecodeState {
    /// Read the initial state written by the encoder's final flush.
    pub fn new(reader: &mut BitReader<'_>, table: &DecodeTable) -> Self {
        let state = reader.read_bits(table.table_log());
        reader.reload();
        DecodeState { state }
    }

    /// Symbol of the current state, without transitioning.
    #[inline]
    pub fn peek_symbol(&self, table: &DecodeTable) -> u8 {
        table.entry(self.state).symbol
    }

    /// Transition to the next state.
    #[inline]
    pub fn update(&mut self, reader: &mut BitReader<'_>, table: &DecodeTable) {
        let entry = table.entry(self.state);
        let low_bits = reader.read_bits(u32::from(entry.nb_bits));
        self.state = usize::from(entry.new_state) + low_bits;
    }

    /// Emit the current symbol and transition.
    #[inline]
    pub fn decode(&mut self, reader: &mut BitReader<'_>, table: &DecodeTable) -> u8 {
        let entry = table.entry(self.state);
        let low_bits = reader.read_bits(u32::from(entry.nb_bits));
        self.state = usize::from(entry.new_state) + low_bits;
        entry.symbol
    }

    /// [`decode`](Self::decode) for tables in fast mode, where every
    /// transition reads at least one bit.
    #[inline]
    pub fn decode_fast(&mut self, reader: &mut BitReader<'_>, table: &DecodeTable) -> u8 {
        let entry = table.entry(self.state);
        debug_assert!(entry.nb_bits > 0, "fast decode on a table without fast mode");
        let low_bits = reader.read_bits_fast(u32::from(entry.nb_bits));
        self.state = usize::from(entry.new_state) + low_bits;
        entry.symbol
    }
}

/// Decode a two-state FSE bitstream into `dst`.
///
/// Returns the number of symbols written. The stream must end exactly on
/// its terminator; running out of `dst` first is `DstSizeTooSmall`.
pub fn decompress_using_table(dst: &mut [u8], src: &[u8], table: &DecodeTable) -> Result<usize> {
    if table.fast_mode() {
        decompress_generic::<true>(dst, src, table)
    } else {
        decompress_generic::<false>(dst, src, table)
    }
}

fn decompress_generic<const FAST: bool>(
    dst: &mut [u8],
    src: &[u8],
    table: &DecodeTable,
) -> Result<usize> {
    let mut reader = BitReader::new(src)?;
    let mut state1 = DecodeState::new(&mut reader, table);
    let mut state2 = DecodeState::new(&mut reader, table);
    if reader.reload() == ReloadStatus::Overflow {
        return Err(Error::corrupted("fse: stream shorter than its initial states"));
    }

    let len = dst.len();
    let mut op = 0usize;
    while reader.reload() == ReloadStatus::Unfinished && op + 4 <= len {
        dst[op] = decode_one::<FAST>(&mut state1, &mut reader, table);
        dst[op + 1] = decode_one::<FAST>(&mut state2, &mut reader, table);
        dst[op + 2] = decode_one::<FAST>(&mut state1, &mut reader, table);
        dst[op + 3] = decode_one::<FAST>(&mut state2, &mut reader, table);
        op += 4;
    }

    // tail: the first state to hit overflow leaves one symbol in the other
    loop {
        if op + 2 > len {
            return Err(Error::dst_too_small(op + 2, len));
        }
        dst[op] = decode_one::<FAST>(&mut state1, &mut reader, table);
        op += 1;
        if reader.reload() == ReloadStatus::Overflow {
            dst[op] = decode_one::<FAST>(&mut state2, &mut reader, table);
            op += 1;
            break;
        }

        if op + 2 > len {
            return Err(Error::dst_too_small(op + 2, len));
        }
        dst[op] = decode_one::<FAST>(&mut state2, &mut reader, table);
        op += 1;
        if reader.reload() == ReloadStatus::Overflow {
            dst[op] = decode_one::<FAST>(&mut state1, &mut reader, table);
            op += 1;
            break;
        }
    }
    Ok(op)
}

#[inline]
fn decode_one<const FAST: bool>(
    state: &mut DecodeState,
    reader: &mut BitReader<'_>,
    table: &DecodeTable,
) -> u8 {
    if FAST {
        state.decode_fast(reader, table)
    } else {
        state.decode(reader, table)
    }
}

/// Decompress an NCount header plus FSE bitstream produced by
/// [`compress`](super::compress).
///
/// Headers declaring a table log above `max_log` are rejected.
pub fn decompress(src: &[u8], dst: &mut [u8], max_log: u32) -> Result<usize> {
    let ncount = read_ncount(src, FSE_MAX_SYMBOL_VALUE)?;
    if ncount.table_log > max_log {
        tracing::debug!(log = ncount.table_log, max_log, "fse table log above limit");
        return Err(Error::table_log_too_large(ncount.table_log, max_log));
    }
    let table = DecodeTable::build(&ncount.norm, ncount.table_log)?;
    decompress_using_table(dst, &src[ncount.header_size..], &table)
}

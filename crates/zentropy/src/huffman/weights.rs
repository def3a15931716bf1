//! Table description (weight list) serialization.
//!
//! A code with table log `L` is described by one weight per symbol,
//! `w = L + 1 - nb_bits` (0 for absent symbols). The weight of the highest
//! symbol is omitted: the decoder restores it as whatever completes the
//! Kraft sum to a power of two.
//!
//! The first byte selects the form:
//!
//! ```text
//! 0..=127   FSE-compressed weights, byte = compressed size
//! 128..=255 4-bit weights, byte - 127 = number of weights
//! ```

use zentropy_core::{Error, Result};

use super::encoder::HuffmanTable;
use super::{HUF_SYMBOLVALUE_MAX, HUF_TABLELOG_MAX, MAX_FSE_TABLELOG_FOR_WEIGHTS};
use crate::bitstream::highbit32;
use crate::fse::{self, EncodeTable};
use crate::histogram::Histogram;

/// Decoded table description.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Weights {
    /// Weight per symbol, implicit last weight included.
    pub weights: Vec<u8>,
    /// Number of symbols per weight.
    pub rank_stats: [u32; HUF_TABLELOG_MAX as usize + 1],
    /// Table log derived from the weight sum.
    pub table_log: u32,
    /// Bytes of `src` consumed by the description.
    pub header_size: usize,
}

impl Weights {
    /// Number of described symbols (`max_symbol + 1`).
    #[inline]
    pub fn nb_symbols(&self) -> usize {
        self.weights.len()
    }
}

/// Serialize the description of `table` into `dst`.
pub fn write_table(dst: &mut [u8], table: &HuffmanTable) -> Result<usize> {
    let max_symbol = table.max_symbol();
    let huff_log = table.max_nb_bits();
    if max_symbol > HUF_SYMBOLVALUE_MAX {
        return Err(Error::MaxSymbolValueTooLarge {
            value: max_symbol,
            max: HUF_SYMBOLVALUE_MAX,
        });
    }
    if dst.is_empty() {
        return Err(Error::dst_too_small(1, 0));
    }

    let mut weights = vec![0u8; max_symbol as usize + 1];
    for (weight, code) in weights.iter_mut().zip(table.codes()).take(max_symbol as usize) {
        if code.nb_bits != 0 {
            *weight = (huff_log + 1 - u32::from(code.nb_bits)) as u8;
        }
    }
    let described = &weights[..max_symbol as usize];

    let h_size = compress_weights(&mut dst[1..], described)?;
    if h_size > 1 && h_size < (max_symbol / 2) as usize {
        dst[0] = h_size as u8;
        return Ok(h_size + 1);
    }

    if max_symbol > 128 {
        return Err(Error::Generic("huffman: too many weights for direct form"));
    }
    let required = (max_symbol as usize + 1) / 2 + 1;
    if required > dst.len() {
        return Err(Error::dst_too_small(required, dst.len()));
    }
    dst[0] = (128 + (max_symbol - 1)) as u8;
    // weights[max_symbol] stays 0 and pads an odd count
    for (n, pair) in weights.chunks(2).enumerate().take(required - 1) {
        let low = pair.get(1).copied().unwrap_or(0);
        dst[n + 1] = (pair[0] << 4) + low;
    }
    Ok(required)
}

/// FSE-compress a weight list. Returns 0 when the list is not
/// compressible and 1 when it is a single repeated weight.
fn compress_weights(dst: &mut [u8], weights: &[u8]) -> Result<usize> {
    if weights.len() <= 1 {
        return Ok(0);
    }
    let histogram = Histogram::count(weights, HUF_TABLELOG_MAX)?;
    if histogram.largest as usize == weights.len() {
        return Ok(1);
    }
    if histogram.largest == 1 {
        return Ok(0);
    }

    let table_log = fse::optimal_table_log(
        MAX_FSE_TABLELOG_FOR_WEIGHTS,
        weights.len(),
        histogram.max_symbol,
    );
    let norm = fse::normalize_count(histogram.as_slice(), weights.len(), table_log, false)?;
    let header_size = fse::write_ncount(dst, &norm, histogram.max_symbol, table_log)?;
    let table = EncodeTable::build(&norm, table_log)?;
    let payload = fse::compress_using_table(&mut dst[header_size..], weights, &table);
    if payload == 0 {
        return Ok(0);
    }
    Ok(header_size + payload)
}

/// Parse a table description from the start of `src`.
pub fn read_weights(src: &[u8]) -> Result<Weights> {
    let Some(&header) = src.first() else {
        return Err(Error::SrcSizeWrong("huffman: empty table description"));
    };

    let mut raw = [0u8; HUF_SYMBOLVALUE_MAX as usize + 1];
    let (described, input_size) = if header >= 128 {
        let output_size = header as usize - 127;
        let input_size = (output_size + 1) / 2;
        if input_size + 1 > src.len() {
            return Err(Error::SrcSizeWrong("huffman: truncated direct weights"));
        }
        if output_size > HUF_SYMBOLVALUE_MAX as usize {
            return Err(Error::corrupted("huffman: too many direct weights"));
        }
        for (n, &byte) in src[1..=input_size].iter().enumerate() {
            raw[2 * n] = byte >> 4;
            raw[2 * n + 1] = byte & 15;
        }
        (output_size, input_size)
    } else {
        let input_size = header as usize;
        if input_size + 1 > src.len() {
            return Err(Error::SrcSizeWrong("huffman: truncated compressed weights"));
        }
        let output_size = fse::decompress(
            &src[1..=input_size],
            &mut raw[..HUF_SYMBOLVALUE_MAX as usize],
            MAX_FSE_TABLELOG_FOR_WEIGHTS,
        )
        .map_err(|e| {
            tracing::debug!(error = %e, "huffman weights failed to decode");
            Error::corrupted("huffman: bad compressed weights")
        })?;
        (output_size, input_size)
    };

    let mut rank_stats = [0u32; HUF_TABLELOG_MAX as usize + 1];
    let mut weight_total: u32 = 0;
    for &w in &raw[..described] {
        if u32::from(w) > HUF_TABLELOG_MAX {
            return Err(Error::corrupted(format!("huffman: weight {} above limit", w)));
        }
        rank_stats[w as usize] += 1;
        weight_total += (1 << w) >> 1;
    }
    if weight_total == 0 {
        return Err(Error::corrupted("huffman: all weights zero"));
    }

    let table_log = highbit32(weight_total) + 1;
    if table_log > HUF_TABLELOG_MAX {
        return Err(Error::corrupted(format!("huffman: table log {} above limit", table_log)));
    }
    let rest = (1u32 << table_log) - weight_total;
    let true_bit = 1u32 << highbit32(rest);
    if true_bit != rest {
        return Err(Error::corrupted("huffman: last weight is not a power of two"));
    }
    let last_weight = highbit32(rest) + 1;
    raw[described] = last_weight as u8;
    rank_stats[last_weight as usize] += 1;

    // a complete prefix code has an even, non-zero number of longest codes
    if rank_stats[1] < 2 || rank_stats[1] & 1 != 0 {
        return Err(Error::corrupted("huffman: odd number of weight-1 symbols"));
    }

    Ok(Weights {
        weights: raw[..=described].to_vec(),
        rank_stats,
        table_log,
        header_size: input_size + 1,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn table_for(counts: &[u32]) -> HuffmanTable {
        HuffmanTable::build(counts, 11).unwrap()
    }

    #[test]
    fn test_direct_form_roundtrip() {
        // four symbols: one repeated weight per pair, too few to compress
        let table = table_for(&[8, 4, 2, 2]);
        let mut dst = [0u8; 64];
        let size = write_table(&mut dst, &table).unwrap();
        assert_eq!(dst[0], 128 + 2);
        assert_eq!(size, 3);

        let weights = read_weights(&dst[..size]).unwrap();
        assert_eq!(weights.header_size, size);
        assert_eq!(weights.table_log, 3);
        assert_eq!(weights.weights, vec![3, 2, 1, 1]);
        assert_eq!(weights.rank_stats[1], 2);
    }

    #[test]
    fn test_compressed_form_roundtrip() {
        let mut counts = vec![0u32; 200];
        for (i, c) in counts.iter_mut().enumerate() {
            *c = match i % 5 {
                0 => 40,
                1 | 2 => 9,
                _ => 3,
            };
        }
        let table = table_for(&counts);
        let mut dst = [0u8; 256];
        let size = write_table(&mut dst, &table).unwrap();
        assert!(dst[0] < 128, "expected FSE-compressed weights");

        let weights = read_weights(&dst[..size]).unwrap();
        assert_eq!(weights.nb_symbols(), 200);
        assert_eq!(weights.table_log, table.max_nb_bits());
        for (symbol, &w) in weights.weights.iter().enumerate() {
            let nb_bits = table.code(symbol as u8).nb_bits as u32;
            assert_eq!(u32::from(w), table.max_nb_bits() + 1 - nb_bits);
        }
    }

    #[test]
    fn test_read_rejects_truncated() {
        assert!(matches!(read_weights(&[]), Err(Error::SrcSizeWrong(_))));
        assert!(matches!(read_weights(&[130, 0x32]), Err(Error::SrcSizeWrong(_))));
        assert!(matches!(read_weights(&[5, 1, 2]), Err(Error::SrcSizeWrong(_))));
    }

    #[test]
    fn test_read_rejects_bad_weights() {
        // weight above 12
        assert!(read_weights(&[128, 0xD0]).unwrap_err().is_corruption());
        // weights 3,1 sum to 5: the remainder 3 is not a power of two
        assert!(read_weights(&[128 + 1, 0x31]).unwrap_err().is_corruption());
        // all zero
        assert!(read_weights(&[128 + 1, 0x00]).unwrap_err().is_corruption());
    }

    #[test]
    fn test_read_restores_last_weight() {
        let weights = read_weights(&[128 + 1, 0x11]).unwrap();
        assert_eq!(weights.weights, vec![1, 1, 2]);
        assert_eq!(weights.table_log, 2);

        let single = read_weights(&[128, 0x10]).unwrap();
        assert_eq!(single.weights, vec![1, 1]);
        assert_eq!(single.table_log, 1);
    }
}

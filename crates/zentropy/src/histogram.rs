//! Byte histograms.
//!
//! Every table builder starts here: FSE needs the counts and the actual
//! alphabet size, Huffman and the section compressors additionally need the
//! peak count to spot single-symbol (RLE) input early.

use zentropy_core::{Error, Result};

/// Number of possible byte values.
pub const MAX_SYMBOLS: usize = 256;

/// Inputs at least this long are counted with interleaved tables.
const INTERLEAVED_THRESHOLD: usize = 1500;

/// Symbol occurrence counts.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Histogram {
    /// Count per symbol; entries above `max_symbol` are zero.
    pub counts: [u32; MAX_SYMBOLS],
    /// Highest symbol present, or 0 for empty input.
    pub max_symbol: u32,
    /// Largest single count.
    pub largest: u32,
}

impl Histogram {
    /// Count every byte of `src` over the full byte alphabet.
    pub fn count_fast(src: &[u8]) -> Self {
        let counts = if src.len() >= INTERLEAVED_THRESHOLD {
            count_interleaved(src)
        } else {
            let mut counts = [0u32; MAX_SYMBOLS];
            for &b in src {
                counts[b as usize] += 1;
            }
            counts
        };
        Self::from_counts(counts)
    }

    /// Count `src`, failing if a byte exceeds `max_symbol`.
    pub fn count(src: &[u8], max_symbol: u32) -> Result<Self> {
        let histogram = Self::count_fast(src);
        if histogram.max_symbol > max_symbol {
            return Err(Error::MaxSymbolValueTooSmall {
                found: histogram.max_symbol,
                declared: max_symbol,
            });
        }
        Ok(histogram)
    }

    /// Build from precomputed counts.
    pub fn from_counts(counts: [u32; MAX_SYMBOLS]) -> Self {
        let max_symbol = counts.iter().rposition(|&c| c != 0).unwrap_or(0) as u32;
        let largest = counts.iter().copied().max().unwrap_or(0);
        Histogram {
            counts,
            max_symbol,
            largest,
        }
    }

    /// Counts for symbols `0..=max_symbol`.
    #[inline]
    pub fn as_slice(&self) -> &[u32] {
        &self.counts[..=self.max_symbol as usize]
    }

    /// Sum of all counts.
    pub fn total(&self) -> usize {
        self.as_slice().iter().map(|&c| c as usize).sum()
    }

    /// Number of distinct symbols present.
    pub fn distinct(&self) -> usize {
        self.as_slice().iter().filter(|&&c| c != 0).count()
    }
}

/// Four interleaved tables so consecutive identical bytes do not serialize
/// on one counter.
fn count_interleaved(src: &[u8]) -> [u32; MAX_SYMBOLS] {
    let mut freq0 = [0u32; MAX_SYMBOLS];
    let mut freq1 = [0u32; MAX_SYMBOLS];
    let mut freq2 = [0u32; MAX_SYMBOLS];
    let mut freq3 = [0u32; MAX_SYMBOLS];

    let chunks = src.chunks_exact(16);
    let remainder = chunks.remainder();

    for chunk in chunks {
        freq0[chunk[0] as usize] += 1;
        freq1[chunk[1] as usize] += 1;
        freq2[chunk[2] as usize] += 1;
        freq3[chunk[3] as usize] += 1;
        freq0[chunk[4] as usize] += 1;
        freq1[chunk[5] as usize] += 1;
        freq2[chunk[6] as usize] += 1;
        freq3[chunk[7] as usize] += 1;
        freq0[chunk[8] as usize] += 1;
        freq1[chunk[9] as usize] += 1;
        freq2[chunk[10] as usize] += 1;
        freq3[chunk[11] as usize] += 1;
        freq0[chunk[12] as usize] += 1;
        freq1[chunk[13] as usize] += 1;
        freq2[chunk[14] as usize] += 1;
        freq3[chunk[15] as usize] += 1;
    }
    for &b in remainder {
        freq0[b as usize] += 1;
    }

    for i in 0..MAX_SYMBOLS {
        freq0[i] += freq1[i] + freq2[i] + freq3[i];
    }
    freq0
}

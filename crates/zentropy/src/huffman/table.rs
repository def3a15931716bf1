//! Huffman decoding tables.
//!
//! Both tables are flat arrays indexed by `table_log` bits of lookahead.
//! The single-symbol table ([`DecodeTableX1`]) resolves one code per
//! lookup; the double-symbol table ([`DecodeTableX2`]) resolves two when
//! both codes fit in the lookahead window.

use zentropy_core::{Error, Result};

use super::weights::Weights;
use super::HUF_TABLELOG_MAX;

/// Single-symbol table entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct EntryX1 {
    /// Decoded symbol.
    pub symbol: u8,
    /// Code length.
    pub nb_bits: u8,
}

/// One symbol per lookup.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DecodeTableX1 {
    table_log: u32,
    entries: Vec<EntryX1>,
}

impl DecodeTableX1 {
    /// Build from a decoded table description.
    ///
    /// Slots are filled rank by rank, starting with weight 1 (the longest
    /// codes), and within a rank by ascending symbol. This matches the
    /// canonical value assignment of the encoder.
    pub fn build(weights: &Weights) -> Result<Self> {
        let table_log = weights.table_log;
        if table_log == 0 || table_log > HUF_TABLELOG_MAX {
            return Err(Error::table_log_too_large(table_log, HUF_TABLELOG_MAX));
        }

        let mut rank_start = [0usize; HUF_TABLELOG_MAX as usize + 2];
        let mut next = 0usize;
        for w in 1..=table_log as usize {
            rank_start[w] = next;
            next += (weights.rank_stats[w] as usize) << (w - 1);
        }
        if next != 1 << table_log {
            return Err(Error::corrupted("huffman: weights do not fill the table"));
        }

        let mut entries = vec![EntryX1::default(); 1 << table_log];
        for (symbol, &w) in weights.weights.iter().enumerate() {
            if w == 0 {
                continue;
            }
            if u32::from(w) > table_log {
                return Err(Error::corrupted("huffman: weight above table log"));
            }
            let length = (1usize << w) >> 1;
            let start = rank_start[w as usize];
            let entry = EntryX1 {
                symbol: symbol as u8,
                nb_bits: (table_log + 1 - u32::from(w)) as u8,
            };
            let Some(slots) = entries.get_mut(start..start + length) else {
                return Err(Error::corrupted("huffman: rank counts disagree with weights"));
            };
            slots.fill(entry);
            rank_start[w as usize] += length;
        }

        Ok(DecodeTableX1 { table_log, entries })
    }

    /// Lookahead width.
    #[inline]
    pub fn table_log(&self) -> u32 {
        self.table_log
    }

    /// Entry for a lookahead value.
    #[inline]
    pub fn entry(&self, index: usize) -> EntryX1 {
        self.entries[index]
    }
}

/// Double-symbol table entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct EntryX2 {
    /// Decoded symbols; only the first `length` are meaningful.
    pub symbols: [u8; 2],
    /// Bits consumed by all decoded symbols.
    pub nb_bits: u8,
    /// 1 or 2.
    pub length: u8,
    /// Bits consumed by the first symbol alone.
    pub first_bits: u8,
}

/// Up to two symbols per lookup.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DecodeTableX2 {
    table_log: u32,
    entries: Vec<EntryX2>,
}

impl DecodeTableX2 {
    /// Derive from a single-symbol table.
    pub fn from_x1(x1: &DecodeTableX1) -> Self {
        let table_log = x1.table_log;
        let mask = (1usize << table_log) - 1;
        let entries = x1
            .entries
            .iter()
            .enumerate()
            .map(|(index, first)| {
                let first_bits = u32::from(first.nb_bits);
                let follow = x1.entries[(index << first_bits) & mask];
                if u32::from(follow.nb_bits) <= table_log - first_bits {
                    EntryX2 {
                        symbols: [first.symbol, follow.symbol],
                        nb_bits: first.nb_bits + follow.nb_bits,
                        length: 2,
                        first_bits: first.nb_bits,
                    }
                } else {
                    EntryX2 {
                        symbols: [first.symbol, 0],
                        nb_bits: first.nb_bits,
                        length: 1,
                        first_bits: first.nb_bits,
                    }
                }
            })
            .collect();
        DecodeTableX2 { table_log, entries }
    }

    /// Build from a decoded table description.
    pub fn build(weights: &Weights) -> Result<Self> {
        Ok(Self::from_x1(&DecodeTableX1::build(weights)?))
    }

    /// Lookahead width.
    #[inline]
    pub fn table_log(&self) -> u32 {
        self.table_log
    }

    /// Entry for a lookahead value.
    #[inline]
    pub fn entry(&self, index: usize) -> EntryX2 {
        self.entries[index]
    }
}

/// A decoding table of either flavor.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum HuffmanDecodeTable {
    /// Single-symbol lookups.
    X1(DecodeTableX1),
    /// Double-symbol lookups.
    X2(DecodeTableX2),
}

impl HuffmanDecodeTable {
    /// Table log of the underlying table.
    pub fn table_log(&self) -> u32 {
        match self {
            HuffmanDecodeTable::X1(t) => t.table_log(),
            HuffmanDecodeTable::X2(t) => t.table_log(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::huffman::read_weights;

    // weights 3,2,1,1: codes 1, 01, 000, 001
    fn sample() -> Weights {
        read_weights(&[128 + 2, 0x32, 0x10]).unwrap()
    }

    #[test]
    fn test_x1_layout() {
        let table = DecodeTableX1::build(&sample()).unwrap();
        assert_eq!(table.table_log(), 3);
        let symbols: Vec<u8> = (0..8).map(|i| table.entry(i).symbol).collect();
        assert_eq!(symbols, vec![2, 3, 1, 1, 0, 0, 0, 0]);
        assert_eq!(table.entry(0).nb_bits, 3);
        assert_eq!(table.entry(2).nb_bits, 2);
        assert_eq!(table.entry(7).nb_bits, 1);
    }

    #[test]
    fn test_x2_pairs() {
        let x1 = DecodeTableX1::build(&sample()).unwrap();
        let x2 = DecodeTableX2::from_x1(&x1);
        // 1 then 1
        let e = x2.entry(0b110);
        assert_eq!((e.length, e.symbols, e.nb_bits, e.first_bits), (2, [0, 0], 2, 1));
        // 1 then 01
        let e = x2.entry(0b101);
        assert_eq!((e.length, e.symbols, e.nb_bits), (2, [0, 1], 3));
        // 01 then a 3-bit code that does not fit
        let e = x2.entry(0b010);
        assert_eq!((e.length, e.symbols[0], e.nb_bits), (1, 1, 2));
        // 000 fills the window
        let e = x2.entry(0);
        assert_eq!((e.length, e.symbols[0], e.nb_bits), (1, 2, 3));
    }
}

//! Huffman stream decoding.
//!
//! Streams are decoded back to front with a [`BitReader`]. Each table
//! flavor implements [`StreamDecoder`]; the 1-stream and 4-stream drivers
//! are generic over it.

use zentropy_core::{Error, Result};

use super::table::{DecodeTableX1, DecodeTableX2, HuffmanDecodeTable};
use crate::bitstream::{read_le16, BitReader, ReloadStatus};

/// Decoding loops for one table flavor.
pub(crate) trait StreamDecoder {
    /// Most symbols a single [`decode_round`](Self::decode_round) writes.
    const ROUND: usize;

    /// Decode one round starting at `op`. Requires `op + ROUND <= dst.len()`
    /// and a freshly reloaded reader. Returns the new position.
    fn decode_round(&self, reader: &mut BitReader<'_>, dst: &mut [u8], op: usize) -> usize;

    /// Decode symbols from `op` until `dst` is full.
    fn decode_tail(&self, reader: &mut BitReader<'_>, dst: &mut [u8], op: usize);
}

impl DecodeTableX1 {
    #[inline]
    fn decode_symbol(&self, reader: &mut BitReader<'_>) -> u8 {
        let entry = self.entry(reader.look_bits_fast(self.table_log()));
        reader.skip_bits(u32::from(entry.nb_bits));
        entry.symbol
    }
}

impl StreamDecoder for DecodeTableX1 {
    const ROUND: usize = 4;

    #[inline]
    fn decode_round(&self, reader: &mut BitReader<'_>, dst: &mut [u8], op: usize) -> usize {
        for slot in &mut dst[op..op + 4] {
            *slot = self.decode_symbol(reader);
        }
        op + 4
    }

    fn decode_tail(&self, reader: &mut BitReader<'_>, dst: &mut [u8], mut op: usize) {
        let end = dst.len();
        if end - op > 3 {
            while reader.reload() == ReloadStatus::Unfinished && op + 4 <= end {
                op = self.decode_round(reader, dst, op);
            }
        } else {
            reader.reload();
        }
        // the register now holds every remaining bit
        while op < end {
            dst[op] = self.decode_symbol(reader);
            op += 1;
        }
    }
}

impl DecodeTableX2 {
    /// Writes two bytes, advances by the number decoded.
    #[inline]
    fn decode_pair(&self, reader: &mut BitReader<'_>, dst: &mut [u8], op: usize) -> usize {
        let entry = self.entry(reader.look_bits_fast(self.table_log()));
        dst[op..op + 2].copy_from_slice(&entry.symbols);
        reader.skip_bits(u32::from(entry.nb_bits));
        op + entry.length as usize
    }

    #[inline]
    fn decode_last(&self, reader: &mut BitReader<'_>, dst: &mut [u8], op: usize) {
        let entry = self.entry(reader.look_bits_fast(self.table_log()));
        dst[op] = entry.symbols[0];
        reader.skip_bits(u32::from(entry.first_bits));
    }
}

impl StreamDecoder for DecodeTableX2 {
    const ROUND: usize = 8;

    #[inline]
    fn decode_round(&self, reader: &mut BitReader<'_>, dst: &mut [u8], mut op: usize) -> usize {
        for _ in 0..4 {
            op = self.decode_pair(reader, dst, op);
        }
        op
    }

    fn decode_tail(&self, reader: &mut BitReader<'_>, dst: &mut [u8], mut op: usize) {
        let end = dst.len();
        if end - op >= Self::ROUND {
            while reader.reload() == ReloadStatus::Unfinished && op + Self::ROUND <= end {
                op = self.decode_round(reader, dst, op);
            }
        } else {
            reader.reload();
        }

        if end - op >= 2 {
            while reader.reload() == ReloadStatus::Unfinished && op + 2 <= end {
                op = self.decode_pair(reader, dst, op);
            }
            while op + 2 <= end {
                op = self.decode_pair(reader, dst, op);
            }
        }
        if op < end {
            self.decode_last(reader, dst, op);
        }
    }
}

fn decompress_1x_with<D: StreamDecoder>(dst: &mut [u8], src: &[u8], table: &D) -> Result<usize> {
    let mut reader = BitReader::new(src)?;
    table.decode_tail(&mut reader, dst, 0);
    if !reader.end_of_stream() {
        return Err(Error::corrupted("huffman: stream did not end exactly"));
    }
    Ok(dst.len())
}

fn decompress_4x_with<D: StreamDecoder>(dst: &mut [u8], src: &[u8], table: &D) -> Result<usize> {
    if src.len() < 10 {
        return Err(Error::corrupted("huffman: 4-stream input below 10 bytes"));
    }
    if dst.len() < 6 {
        return Err(Error::corrupted("huffman: 4-stream output below 6 bytes"));
    }

    let length1 = read_le16(src, 0);
    let length2 = read_le16(src, 2);
    let length3 = read_le16(src, 4);
    let Some(length4) = src.len().checked_sub(length1 + length2 + length3 + 6) else {
        return Err(Error::corrupted("huffman: jump table exceeds input"));
    };
    let segment_size = (dst.len() + 3) / 4;
    if 3 * segment_size > dst.len() {
        return Err(Error::corrupted("huffman: segments exceed output"));
    }

    let start2 = 6 + length1;
    let start3 = start2 + length2;
    let start4 = start3 + length3;
    let mut readers = [
        BitReader::new(&src[6..start2])?,
        BitReader::new(&src[start2..start3])?,
        BitReader::new(&src[start3..start4])?,
        BitReader::new(&src[start4..start4 + length4])?,
    ];

    let (lane1, rest) = dst.split_at_mut(segment_size);
    let (lane2, rest) = rest.split_at_mut(segment_size);
    let (lane3, lane4) = rest.split_at_mut(segment_size);
    let mut lanes = [lane1, lane2, lane3, lane4];
    let mut ops = [0usize; 4];

    // lockstep while every lane has room for a full round
    while ops.iter().zip(lanes.iter()).all(|(&op, lane)| op + D::ROUND <= lane.len()) {
        for ((reader, lane), op) in readers.iter_mut().zip(lanes.iter_mut()).zip(ops.iter_mut()) {
            *op = table.decode_round(reader, &mut lane[..], *op);
        }
        let mut unfinished = true;
        for reader in readers.iter_mut() {
            unfinished &= reader.reload() == ReloadStatus::Unfinished;
        }
        if !unfinished {
            break;
        }
    }

    for ((reader, lane), op) in readers.iter_mut().zip(lanes.iter_mut()).zip(ops.iter()) {
        table.decode_tail(reader, &mut lane[..], *op);
    }
    if !readers.iter().all(BitReader::end_of_stream) {
        return Err(Error::corrupted("huffman: 4-stream did not end exactly"));
    }
    Ok(dst.len())
}

/// Decode a single stream filling all of `dst`.
pub fn decompress_1x(dst: &mut [u8], src: &[u8], table: &HuffmanDecodeTable) -> Result<usize> {
    match table {
        HuffmanDecodeTable::X1(t) => decompress_1x_with(dst, src, t),
        HuffmanDecodeTable::X2(t) => decompress_1x_with(dst, src, t),
    }
}

/// Decode four streams behind a jump table filling all of `dst`.
pub fn decompress_4x(dst: &mut [u8], src: &[u8], table: &HuffmanDecodeTable) -> Result<usize> {
    match table {
        HuffmanDecodeTable::X1(t) => decompress_4x_with(dst, src, t),
        HuffmanDecodeTable::X2(t) => decompress_4x_with(dst, src, t),
    }
}

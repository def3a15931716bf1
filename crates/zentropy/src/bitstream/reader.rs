//! Backward bit reader.

use zentropy_core::{Error, Result};

use super::{read_le64, CONTAINER_BITS, CONTAINER_BYTES};

/// Result of [`BitReader::reload`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum ReloadStatus {
    /// Register refilled; at least 57 bits can be read before the next reload.
    Unfinished,
    /// Reached the start of the buffer with bits still pending.
    EndOfBuffer,
    /// Every bit has been consumed.
    Completed,
    /// More bits were consumed than the stream holds.
    Overflow,
}

/// Reads a stream produced by [`BitWriter`](super::BitWriter), last bit first.
#[derive(Debug, Clone)]
pub struct BitReader<'a> {
    src: &'a [u8],
    pos: usize,
    container: u64,
    bits_consumed: u32,
}

impl<'a> BitReader<'a> {
    /// Position the reader on the terminator bit of `src`.
    pub fn new(src: &'a [u8]) -> Result<Self> {
        let Some(&last) = src.last() else {
            return Err(Error::SrcSizeWrong("empty bitstream"));
        };
        if last == 0 {
            return Err(Error::corrupted("bitstream end marker missing"));
        }
        let marker_bits = last.leading_zeros() + 1;

        if src.len() >= CONTAINER_BYTES {
            let pos = src.len() - CONTAINER_BYTES;
            Ok(BitReader {
                src,
                pos,
                container: read_le64(src, pos),
                bits_consumed: marker_bits,
            })
        } else {
            let container = src
                .iter()
                .enumerate()
                .fold(0u64, |acc, (i, &b)| acc | (u64::from(b) << (8 * i)));
            let missing = (CONTAINER_BYTES - src.len()) as u32 * 8;
            Ok(BitReader {
                src,
                pos: 0,
                container,
                bits_consumed: marker_bits + missing,
            })
        }
    }

    /// Peek `nb_bits` (0..=31) without consuming them.
    #[inline]
    pub fn look_bits(&self, nb_bits: u32) -> usize {
        debug_assert!(nb_bits < 32);
        let aligned = self.container << (self.bits_consumed & 63);
        ((aligned >> 1) >> ((63 - nb_bits) & 63)) as usize
    }

    /// Peek `nb_bits` (1..=31) without consuming them.
    #[inline]
    pub fn look_bits_fast(&self, nb_bits: u32) -> usize {
        debug_assert!(nb_bits >= 1 && nb_bits < 32);
        let aligned = self.container << (self.bits_consumed & 63);
        (aligned >> ((CONTAINER_BITS - nb_bits) & 63)) as usize
    }

    /// Consume `nb_bits`.
    #[inline]
    pub fn skip_bits(&mut self, nb_bits: u32) {
        self.bits_consumed += nb_bits;
    }

    /// Read and consume `nb_bits` (0..=31).
    #[inline]
    pub fn read_bits(&mut self, nb_bits: u32) -> usize {
        let value = self.look_bits(nb_bits);
        self.skip_bits(nb_bits);
        value
    }

    /// Read and consume `nb_bits` (1..=31).
    #[inline]
    pub fn read_bits_fast(&mut self, nb_bits: u32) -> usize {
        let value = self.look_bits_fast(nb_bits);
        self.skip_bits(nb_bits);
        value
    }

    /// Refill the register from the buffer.
    pub fn reload(&mut self) -> ReloadStatus {
        if self.bits_consumed > CONTAINER_BITS {
            return ReloadStatus::Overflow;
        }
        if self.pos >= CONTAINER_BYTES {
            self.pos -= (self.bits_consumed >> 3) as usize;
            self.bits_consumed &= 7;
            self.container = read_le64(self.src, self.pos);
            return ReloadStatus::Unfinished;
        }
        if self.pos == 0 {
            return if self.bits_consumed < CONTAINER_BITS {
                ReloadStatus::EndOfBuffer
            } else {
                ReloadStatus::Completed
            };
        }

        let mut nb_bytes = (self.bits_consumed >> 3) as usize;
        let mut status = ReloadStatus::Unfinished;
        if nb_bytes > self.pos {
            nb_bytes = self.pos;
            status = ReloadStatus::EndOfBuffer;
        }
        self.pos -= nb_bytes;
        self.bits_consumed -= nb_bytes as u32 * 8;
        self.container = read_le64(self.src, self.pos);
        status
    }

    /// True when exactly every payload bit has been consumed.
    #[inline]
    pub fn end_of_stream(&self) -> bool {
        self.pos == 0 && self.bits_consumed == CONTAINER_BITS
    }

    /// Bits consumed from the current register.
    pub fn bits_consumed(&self) -> u32 {
        self.bits_consumed
    }
}

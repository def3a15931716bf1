//! Forward-filling bit writer whose output is read backward.

use zentropy_core::{Error, Result};

use super::{CONTAINER_BITS, CONTAINER_BYTES};

/// Bit writer over a caller-provided destination.
///
/// Bits accumulate in a 64-bit register. The caller tracks how many bits
/// are pending and calls [`flush_bits`](Self::flush_bits) before the
/// register would overflow. Flushing past the end of `dst` is silently
/// clamped; [`close`](Self::close) reports it.
#[derive(Debug)]
pub struct BitWriter<'a> {
    dst: &'a mut [u8],
    pos: usize,
    limit: usize,
    container: u64,
    bit_pos: u32,
}

impl<'a> BitWriter<'a> {
    /// Create a writer. Fails unless `dst` can hold more than one register.
    pub fn new(dst: &'a mut [u8]) -> Result<Self> {
        if dst.len() <= CONTAINER_BYTES {
            return Err(Error::dst_too_small(CONTAINER_BYTES + 1, dst.len()));
        }
        let limit = dst.len() - CONTAINER_BYTES;
        Ok(BitWriter {
            dst,
            pos: 0,
            limit,
            container: 0,
            bit_pos: 0,
        })
    }

    /// Append the low `nb_bits` of `value` (at most 31 bits).
    #[inline]
    pub fn add_bits(&mut self, value: u64, nb_bits: u32) {
        debug_assert!(nb_bits < 32);
        debug_assert!(nb_bits + self.bit_pos < CONTAINER_BITS);
        let mask = (1u64 << nb_bits) - 1;
        self.container |= (value & mask) << self.bit_pos;
        self.bit_pos += nb_bits;
    }

    /// Append `value` whose bits above `nb_bits` are already zero.
    #[inline]
    pub fn add_bits_fast(&mut self, value: u64, nb_bits: u32) {
        debug_assert!(value >> nb_bits == 0);
        debug_assert!(nb_bits + self.bit_pos < CONTAINER_BITS);
        self.container |= value << self.bit_pos;
        self.bit_pos += nb_bits;
    }

    /// Move whole bytes out of the register, clamping at the end of `dst`.
    #[inline]
    pub fn flush_bits(&mut self) {
        let nb_bytes = (self.bit_pos >> 3) as usize;
        self.store();
        self.pos = (self.pos + nb_bytes).min(self.limit);
        self.consume(nb_bytes);
    }

    /// Move whole bytes out of the register. The caller guarantees room.
    #[inline]
    pub fn flush_bits_fast(&mut self) {
        let nb_bytes = (self.bit_pos >> 3) as usize;
        self.store();
        self.pos += nb_bytes;
        debug_assert!(self.pos <= self.limit, "bit writer overran its buffer");
        self.consume(nb_bytes);
    }

    /// Append the terminator bit and flush.
    ///
    /// Returns the number of bytes written, or `None` when the stream did
    /// not fit in the destination.
    pub fn close(mut self) -> Option<usize> {
        self.add_bits_fast(1, 1);
        self.flush_bits();
        if self.pos >= self.limit {
            return None;
        }
        Some(self.pos + usize::from(self.bit_pos > 0))
    }

    #[inline]
    fn store(&mut self) {
        self.dst[self.pos..self.pos + CONTAINER_BYTES].copy_from_slice(&self.container.to_le_bytes());
    }

    #[inline]
    fn consume(&mut self, nb_bytes: usize) {
        self.bit_pos &= 7;
        self.container = self.container.checked_shr(nb_bytes as u32 * 8).unwrap_or(0);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_too_small_destination() {
        let mut buf = [0u8; 8];
        let err = BitWriter::new(&mut buf).unwrap_err();
        assert!(err.is_capacity());
    }

    #[test]
    fn test_close_reports_overflow() {
        let mut buf = [0u8; 10];
        let mut writer = BitWriter::new(&mut buf).unwrap();
        for _ in 0..4 {
            writer.add_bits(0xFFFF, 16);
            writer.flush_bits();
        }
        assert_eq!(writer.close(), None);
    }

    #[test]
    fn test_fast_flush_matches_checked() {
        let mut a = [0u8; 32];
        let mut b = [0u8; 32];
        let mut wa = BitWriter::new(&mut a).unwrap();
        let mut wb = BitWriter::new(&mut b).unwrap();
        for i in 0..20u64 {
            wa.add_bits(i, 5);
            wa.flush_bits();
            wb.add_bits_fast(i & 0x1F, 5);
            wb.flush_bits_fast();
        }
        assert_eq!(wa.close(), wb.close());
        assert_eq!(a, b);
    }

    #[test]
    fn test_empty_stream_is_one_byte() {
        let mut buf = [0u8; 9];
        let writer = BitWriter::new(&mut buf).unwrap();
        assert_eq!(writer.close(), Some(1));
        assert_eq!(buf[0], 1);
    }
}

//! LIFO bitstream primitives.
//!
//! Encoders append bits forward into a 64-bit register and flush whole
//! bytes low-to-high. Decoders start from the *end* of the buffer and walk
//! backward, so the first bits written are the last bits read.
//!
//! ```text
//! write: add(a,3) add(b,5) add(c,2) close()
//!
//!   byte stream:  [ a b c ... | 1 000 ]   <- terminator bit, zero padding
//!                                ▲
//! read:  init() finds the terminator, then read(2)=c read(5)=b read(3)=a
//! ```
//!
//! The terminator is the highest set bit of the final byte; a final byte of
//! zero is therefore corrupt. [`BitReader::end_of_stream`] is the bit-exact
//! completion check: it holds only when every payload bit was consumed.

mod reader;
mod writer;

pub use reader::{BitReader, ReloadStatus};
pub use writer::BitWriter;

/// Register width in bytes.
pub const CONTAINER_BYTES: usize = 8;

/// Register width in bits.
pub const CONTAINER_BITS: u32 = 64;

/// Position of the highest set bit. `value` must be non-zero.
#[inline]
pub fn highbit32(value: u32) -> u32 {
    debug_assert!(value != 0, "highbit32 of zero");
    31 - value.leading_zeros()
}

#[inline]
pub(crate) fn read_le64(src: &[u8], pos: usize) -> u64 {
    let mut bytes = [0u8; CONTAINER_BYTES];
    bytes.copy_from_slice(&src[pos..pos + CONTAINER_BYTES]);
    u64::from_le_bytes(bytes)
}

#[inline]
pub(crate) fn read_le16(src: &[u8], pos: usize) -> usize {
    u16::from_le_bytes([src[pos], src[pos + 1]]) as usize
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_highbit() {
        assert_eq!(highbit32(1), 0);
        assert_eq!(highbit32(2), 1);
        assert_eq!(highbit32(3), 1);
        assert_eq!(highbit32(0x8000_0000), 31);
        assert_eq!(highbit32(4096), 12);
    }

    #[test]
    fn test_write_read_exact() {
        let fields: [(u64, u32); 7] = [
            (5, 3),
            (0, 0),
            (0x7FFF_FFFF, 31),
            (1, 1),
            (0x1234, 13),
            (0, 7),
            (0x5A5A_5A5A & 0x7FFF_FFFF, 31),
        ];
        let mut buf = vec![0u8; 64];
        let mut writer = BitWriter::new(&mut buf).unwrap();
        for &(value, nb_bits) in &fields {
            writer.add_bits(value, nb_bits);
            writer.flush_bits();
        }
        let size = writer.close().unwrap();
        let total_bits: u32 = fields.iter().map(|&(_, n)| n).sum::<u32>() + 1;
        assert_eq!(size, total_bits.div_ceil(8) as usize);

        let mut reader = BitReader::new(&buf[..size]).unwrap();
        for &(value, nb_bits) in fields.iter().rev() {
            assert_eq!(reader.read_bits(nb_bits) as u64, value);
            reader.reload();
        }
        assert!(reader.end_of_stream());
        assert_eq!(reader.reload(), ReloadStatus::Completed);
    }

    #[test]
    fn test_masking_drops_high_bits() {
        let mut buf = vec![0u8; 16];
        let mut writer = BitWriter::new(&mut buf).unwrap();
        writer.add_bits(0xFF, 4);
        writer.add_bits(0x3, 2);
        let size = writer.close().unwrap();
        assert_eq!(size, 1);
        // 1111 + 11 + terminator at bit 6
        assert_eq!(buf[0], 0b0111_1111);

        let mut reader = BitReader::new(&buf[..size]).unwrap();
        assert_eq!(reader.read_bits(2), 0x3);
        assert_eq!(reader.read_bits(4), 0xF);
        assert!(reader.end_of_stream());
    }

    #[test]
    fn test_many_bytes_through_reload() {
        let mut buf = vec![0u8; 4096];
        let mut writer = BitWriter::new(&mut buf).unwrap();
        for i in 0..1000u64 {
            writer.add_bits(i & 0x3FF, 10);
            writer.add_bits(i % 7, 3);
            writer.flush_bits();
        }
        let size = writer.close().unwrap();

        let mut reader = BitReader::new(&buf[..size]).unwrap();
        for i in (0..1000u64).rev() {
            assert_eq!(reader.read_bits(3) as u64, i % 7);
            assert_eq!(reader.read_bits(10) as u64, i & 0x3FF);
            let status = reader.reload();
            assert_ne!(status, ReloadStatus::Overflow);
        }
        assert!(reader.end_of_stream());
    }
}

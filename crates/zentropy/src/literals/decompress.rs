//! Literals section decoding.

use zentropy_core::{Error, LiteralsBlockType, Result};

use super::{LiteralsHeader, MIN_LITERALS_FOR_4_STREAMS};
use crate::huffman::{
    decompress_1x, decompress_4x, read_weights, select_decoder, DecoderKind, HuffmanDecodeTable,
};

/// Decodes literals sections, keeping the last Huffman table for
/// treeless sections.
#[derive(Debug, Clone, Default)]
pub struct LiteralsDecoder {
    table: Option<HuffmanDecodeTable>,
}

impl LiteralsDecoder {
    /// Create a decoder with no previous table.
    pub fn new() -> Self {
        Self::default()
    }

    /// Install a table for treeless sections (e.g. from a dictionary).
    pub fn with_table(table: HuffmanDecodeTable) -> Self {
        LiteralsDecoder { table: Some(table) }
    }

    /// Table a treeless section would use.
    pub fn table(&self) -> Option<&HuffmanDecodeTable> {
        self.table.as_ref()
    }

    /// Forget the previous table.
    pub fn reset(&mut self) {
        self.table = None;
    }

    /// Decode the section at the start of `src` into `dst`.
    ///
    /// Returns `(bytes_consumed, literals_len)`.
    pub fn decompress(&mut self, src: &[u8], dst: &mut [u8]) -> Result<(usize, usize)> {
        let header = LiteralsHeader::parse(src)?;
        let size = header.regenerated_size;
        let h = header.header_size;

        match header.block_type {
            LiteralsBlockType::Raw => {
                if h + size > src.len() {
                    return Err(Error::corrupted("literals: raw payload truncated"));
                }
                if size > dst.len() {
                    return Err(Error::dst_too_small(size, dst.len()));
                }
                dst[..size].copy_from_slice(&src[h..h + size]);
                Ok((h + size, size))
            }
            LiteralsBlockType::Rle => {
                let Some(&byte) = src.get(h) else {
                    return Err(Error::corrupted("literals: rle byte missing"));
                };
                if size > dst.len() {
                    return Err(Error::dst_too_small(size, dst.len()));
                }
                dst[..size].fill(byte);
                Ok((h + 1, size))
            }
            LiteralsBlockType::Compressed | LiteralsBlockType::Treeless => {
                let c_size = header.compressed_size;
                if header.block_type == LiteralsBlockType::Treeless && self.table.is_none() {
                    return Err(Error::DictionaryCorrupted("literals: treeless section without a table"));
                }
                if !header.single_stream && size < MIN_LITERALS_FOR_4_STREAMS {
                    tracing::debug!(size, "literals: 4 streams below minimum size");
                    return Err(Error::corrupted("literals: 4-stream section too small"));
                }
                if c_size + h > src.len() {
                    return Err(Error::corrupted("literals: compressed payload truncated"));
                }
                if size > dst.len() {
                    return Err(Error::dst_too_small(size, dst.len()));
                }

                let payload = &src[h..h + c_size];
                let out = &mut dst[..size];
                self.decode_huffman(&header, payload, out).map_err(|e| {
                    tracing::debug!(error = %e, "literals: huffman payload rejected");
                    if e.is_capacity() {
                        e
                    } else {
                        Error::corrupted("literals: bad huffman payload")
                    }
                })?;
                Ok((h + c_size, size))
            }
        }
    }

    fn decode_huffman(&mut self, header: &LiteralsHeader, payload: &[u8], out: &mut [u8]) -> Result<()> {
        if header.block_type == LiteralsBlockType::Treeless {
            let table = self
                .table
                .as_ref()
                .ok_or(Error::DictionaryCorrupted("literals: treeless section without a table"))?;
            if header.single_stream {
                decompress_1x(out, payload, table)?;
            } else {
                decompress_4x(out, payload, table)?;
            }
            return Ok(());
        }

        if payload.is_empty() {
            return Err(Error::corrupted("literals: empty huffman payload"));
        }
        let kind = if header.single_stream {
            DecoderKind::SingleSymbol
        } else {
            select_decoder(out.len(), payload.len())
        };
        let weights = read_weights(payload)?;
        if weights.header_size >= payload.len() {
            return Err(Error::SrcSizeWrong("literals: table description fills the payload"));
        }
        let table = HuffmanDecodeTable::build(&weights, kind)?;
        let streams = &payload[weights.header_size..];
        if header.single_stream {
            decompress_1x(out, streams, &table)?;
        } else {
            decompress_4x(out, streams, &table)?;
        }
        self.table = Some(table);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::literals::LiteralsEncoder;
    use crate::workspace::Workspace;
    use zentropy_core::EntropyConfig;

    fn text(len: usize) -> Vec<u8> {
        b"Shall I compare thee to a summer's day? Thou art more lovely and more temperate. "
            .iter()
            .cycle()
            .take(len)
            .copied()
            .collect()
    }

    #[test]
    fn test_raw_and_rle() {
        let mut decoder = LiteralsDecoder::new();
        let mut dst = [0u8; 16];
        assert_eq!(decoder.decompress(&[3 << 3, 1, 2, 3], &mut dst), Ok((4, 3)));
        assert_eq!(&dst[..3], &[1, 2, 3]);

        assert_eq!(decoder.decompress(&[1 + (10 << 3), 0x7F], &mut dst), Ok((2, 10)));
        assert_eq!(&dst[..10], &[0x7F; 10]);
    }

    #[test]
    fn test_truncated_raw() {
        let mut decoder = LiteralsDecoder::new();
        let mut dst = [0u8; 16];
        assert!(decoder.decompress(&[5 << 3, 1, 2], &mut dst).unwrap_err().is_corruption());
        assert!(decoder.decompress(&[1 + (5 << 3)], &mut dst).unwrap_err().is_corruption());
    }

    #[test]
    fn test_dst_too_small() {
        let mut decoder = LiteralsDecoder::new();
        let mut dst = [0u8; 2];
        let err = decoder.decompress(&[1 + (10 << 3), 0x7F], &mut dst).unwrap_err();
        assert!(err.is_capacity());
    }

    #[test]
    fn test_treeless_without_table() {
        let mut decoder = LiteralsDecoder::new();
        let mut dst = [0u8; 64];
        // treeless, 1 stream, 20 literals in 10 bytes
        let lhc: u32 = 3 + (20 << 4) + (10 << 14);
        let mut src = lhc.to_le_bytes()[..3].to_vec();
        src.extend_from_slice(&[0xAA; 10]);
        let err = decoder.decompress(&src, &mut dst).unwrap_err();
        assert!(matches!(err, Error::DictionaryCorrupted(_)));
    }

    #[test]
    fn test_four_streams_too_small() {
        let mut decoder = LiteralsDecoder::new();
        let mut dst = [0u8; 64];
        let lhc: u32 = 2 + (1 << 2) + (5 << 4) + (10 << 14);
        let mut src = lhc.to_le_bytes()[..3].to_vec();
        src.extend_from_slice(&[0xAA; 10]);
        assert!(decoder.decompress(&src, &mut dst).unwrap_err().is_corruption());
    }

    #[test]
    fn test_encoder_roundtrip_keeps_table() {
        let mut encoder = LiteralsEncoder::new();
        let mut decoder = LiteralsDecoder::new();
        let mut ws = Workspace::new(1 << 16);
        let config = EntropyConfig::default();

        for len in [300usize, 700, 2000, 20_000] {
            let src = text(len);
            let mut section = vec![0u8; len + 8];
            let stats = encoder.compress(&src, &mut section, &config, &mut ws).unwrap();

            let mut out = vec![0u8; len];
            let (consumed, n) = decoder.decompress(&section, &mut out).unwrap();
            assert_eq!(consumed, stats.output_size);
            assert_eq!(n, len);
            assert_eq!(out, src);
        }
    }
}

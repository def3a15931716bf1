//! Sequences section decoding.

use zentropy_core::{Error, Result, SymbolEncodingType};

use super::{
    decode_lit_length, decode_match_length, decode_off_base, predefined_decode_table, read_nb_seq,
    Sequence, SequenceModes, SymbolStream,
};
use crate::bitstream::{BitReader, ReloadStatus};
use crate::fse::{read_ncount, DecodeState, DecodeTable};

/// Decodes sequences sections, keeping the last table of each stream for
/// `Repeat`.
#[derive(Debug, Clone, Default)]
pub struct SequencesDecoder {
    tables: [Option<DecodeTable>; 3],
}

impl SequencesDecoder {
    /// Create a decoder with no previous tables.
    pub fn new() -> Self {
        Self::default()
    }

    /// Install the table a `Repeat` stream will use (e.g. from a dictionary).
    pub fn set_table(&mut self, stream: SymbolStream, table: DecodeTable) {
        self.tables[stream.index()] = Some(table);
    }

    /// Table a `Repeat` stream would use.
    pub fn table(&self, stream: SymbolStream) -> Option<&DecodeTable> {
        self.tables[stream.index()].as_ref()
    }

    /// Forget every previous table.
    pub fn reset(&mut self) {
        self.tables = Default::default();
    }

    /// Decode a whole sequences section.
    ///
    /// `src` must hold exactly the section: the bitstream runs to its last
    /// byte and must be consumed bit-exactly.
    pub fn decompress(&mut self, src: &[u8]) -> Result<Vec<Sequence>> {
        let (nb_seq, mut pos) = read_nb_seq(src)?;
        if nb_seq == 0 {
            if pos != src.len() {
                tracing::debug!(extra = src.len() - pos, "sequences: data after empty section");
                return Err(Error::corrupted_at("sequences: data after empty section", pos));
            }
            return Ok(Vec::new());
        }
        let Some(&mode_byte) = src.get(pos) else {
            return Err(Error::SrcSizeWrong("sequences: missing mode byte"));
        };
        let modes = SequenceModes::from_byte(mode_byte).map_err(|e| {
            tracing::debug!(mode_byte, "sequences: reserved mode bits set");
            e
        })?;
        pos += 1;

        let mut next = self.tables.clone();
        for stream in SymbolStream::ALL {
            let (table, size) =
                self.build_table(stream, modes.get(stream), &src[pos..])
                    .map_err(|e| {
                        tracing::debug!(?stream, error = %e, "sequences: bad table description");
                        if e.is_capacity() {
                            e
                        } else {
                            Error::corrupted_at(format!("sequences: {stream:?} table: {e}"), pos)
                        }
                    })?;
            next[stream.index()] = Some(table);
            pos += size;
        }

        let [Some(ll), Some(of), Some(ml)] = &next else {
            return Err(Error::generic("sequences: stream table missing"));
        };
        let sequences = decode_sequences(&src[pos..], nb_seq, [ll, of, ml])?;
        self.tables = next;
        tracing::trace!(nb_seq, ?modes, "sequences: section decoded");
        Ok(sequences)
    }

    fn build_table(
        &self,
        stream: SymbolStream,
        ty: SymbolEncodingType,
        src: &[u8],
    ) -> Result<(DecodeTable, usize)> {
        match ty {
            SymbolEncodingType::Predefined => Ok((predefined_decode_table(stream)?.clone(), 0)),
            SymbolEncodingType::Rle => {
                let Some(&symbol) = src.first() else {
                    return Err(Error::SrcSizeWrong("sequences: missing RLE symbol"));
                };
                if u32::from(symbol) > stream.max_symbol() {
                    return Err(Error::corrupted("RLE symbol outside alphabet"));
                }
                Ok((DecodeTable::rle(symbol), 1))
            }
            SymbolEncodingType::Repeat => match &self.tables[stream.index()] {
                Some(table) => Ok((table.clone(), 0)),
                None => Err(Error::corrupted("repeat without a previous table")),
            },
            SymbolEncodingType::Compressed => {
                let ncount = read_ncount(src, stream.max_symbol())?;
                if ncount.table_log > stream.max_log() {
                    return Err(Error::table_log_too_large(ncount.table_log, stream.max_log()));
                }
                let table = DecodeTable::build(&ncount.norm, ncount.table_log)?;
                Ok((table, ncount.header_size))
            }
        }
    }
}

/// Decode `nb_seq` sequences from the interleaved bitstream. Tables are in
/// LL, OF, ML order.
fn decode_sequences(src: &[u8], nb_seq: usize, tables: [&DecodeTable; 3]) -> Result<Vec<Sequence>> {
    let [ll_table, of_table, ml_table] = tables;
    let mut reader = BitReader::new(src).map_err(|e| {
        if e.is_corruption() {
            e
        } else {
            Error::corrupted(format!("sequences bitstream: {e}"))
        }
    })?;

    let mut ll_state = DecodeState::new(&mut reader, ll_table);
    let mut of_state = DecodeState::new(&mut reader, of_table);
    let mut ml_state = DecodeState::new(&mut reader, ml_table);

    let mut sequences = Vec::with_capacity(nb_seq);
    for n in (0..nb_seq).rev() {
        let ll = ll_state.peek_symbol(ll_table);
        let of = of_state.peek_symbol(of_table);
        let ml = ml_state.peek_symbol(ml_table);
        if u32::from(ll) > SymbolStream::LiteralLength.max_symbol()
            || u32::from(of) > SymbolStream::Offset.max_symbol()
            || u32::from(ml) > SymbolStream::MatchLength.max_symbol()
        {
            return Err(Error::corrupted("sequences: code outside alphabet"));
        }
        let ll_bits = SymbolStream::LiteralLength.extra_bits(ll);
        let ml_bits = SymbolStream::MatchLength.extra_bits(ml);
        let of_bits = u32::from(of);

        let off_base = decode_off_base(of, reader.read_bits(of_bits) as u32);
        let match_length = decode_match_length(ml, reader.read_bits(ml_bits) as u32);
        if of_bits + ml_bits + ll_bits >= 64 - 7 - 26 {
            reader.reload();
        }
        let lit_length = decode_lit_length(ll, reader.read_bits(ll_bits) as u32);
        sequences.push(Sequence {
            lit_length,
            match_length,
            off_base,
        });

        if n > 0 {
            ll_state.update(&mut reader, ll_table);
            ml_state.update(&mut reader, ml_table);
            of_state.update(&mut reader, of_table);
            if reader.reload() == ReloadStatus::Overflow {
                return Err(Error::corrupted("sequences: bitstream overrun"));
            }
        }
    }

    if !reader.end_of_stream() {
        return Err(Error::corrupted("sequences: bitstream not fully consumed"));
    }
    Ok(sequences)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sequences::SequencesEncoder;
    use crate::workspace::Workspace;
    use zentropy_core::{EntropyConfig, RepeatMode, Strategy};

    fn encode(encoder: &mut SequencesEncoder, seqs: &[Sequence], config: &EntropyConfig) -> Vec<u8> {
        let mut dst = vec![0u8; 64 + seqs.len() * 16];
        let mut ws = Workspace::with_default_size();
        let stats = encoder.compress(seqs, &mut dst, config, &mut ws).unwrap();
        assert_ne!(stats.output_size, 0);
        dst.truncate(stats.output_size);
        dst
    }

    fn varied(n: u32) -> Vec<Sequence> {
        (0..n)
            .map(|i| {
                let lit_length = match i % 9 {
                    0 => 70_000 + i,
                    1 => 300 + i % 50,
                    _ => i % 17,
                };
                let match_length = match i % 11 {
                    0 => 100_000 + i,
                    1 => 200 + i % 64,
                    _ => 3 + i % 20,
                };
                let off_base = match i % 5 {
                    0 => 1 + i % 3,
                    1 => (1 << 30) + i,
                    _ => 4 + (i * 37) % 5000,
                };
                Sequence::new(lit_length, match_length, off_base)
            })
            .collect()
    }

    #[test]
    fn test_empty_section() {
        let mut decoder = SequencesDecoder::new();
        assert!(decoder.decompress(&[0]).unwrap().is_empty());
        assert!(decoder.decompress(&[0, 0]).unwrap_err().is_corruption());
        assert!(decoder.decompress(&[]).is_err());
    }

    #[test]
    fn test_roundtrip_strategies() {
        for strategy in [Strategy::Fast, Strategy::Greedy, Strategy::Lazy2, Strategy::BtUltra2] {
            let config = EntropyConfig::new(strategy);
            for n in [1u32, 2, 3, 40, 127, 128, 1500] {
                let seqs = varied(n);
                let mut encoder = SequencesEncoder::new();
                let bytes = encode(&mut encoder, &seqs, &config);
                let decoded = SequencesDecoder::new().decompress(&bytes).unwrap();
                assert_eq!(decoded, seqs, "strategy {strategy:?}, {n} sequences");
            }
        }
    }

    #[test]
    fn test_roundtrip_rle_streams() {
        let seqs: Vec<Sequence> = (0..50).map(|_| Sequence::new(7, 9, 2)).collect();
        let bytes = encode(&mut SequencesEncoder::new(), &seqs, &EntropyConfig::default());
        assert_eq!(
            SequenceModes::from_byte(bytes[1]).unwrap(),
            SequenceModes::uniform(SymbolEncodingType::Rle)
        );
        assert_eq!(SequencesDecoder::new().decompress(&bytes).unwrap(), seqs);
    }

    #[test]
    fn test_repeat_across_sections() {
        let config = EntropyConfig::new(Strategy::Fast);
        let mut encoder = SequencesEncoder::new();
        let mut decoder = SequencesDecoder::new();

        let first = varied(800);
        let bytes = encode(&mut encoder, &first, &config);
        assert_eq!(decoder.decompress(&bytes).unwrap(), first);

        for stream in SymbolStream::ALL {
            encoder.set_repeat_mode(stream, RepeatMode::Valid);
        }
        let second = varied(400);
        let bytes = encode(&mut encoder, &second, &config);
        let modes = SequenceModes::from_byte(bytes[2]).unwrap();
        assert_eq!(modes.literal_lengths, SymbolEncodingType::Repeat);
        assert_eq!(modes.match_lengths, SymbolEncodingType::Repeat);
        // offset codes above the predefined range always get a new table
        assert_eq!(modes.offsets, SymbolEncodingType::Compressed);
        assert_eq!(decoder.decompress(&bytes).unwrap(), second);

        // a fresh decoder has nothing to repeat
        assert!(SequencesDecoder::new().decompress(&bytes).unwrap_err().is_corruption());
    }

    #[test]
    fn test_reserved_bits_rejected() {
        let seqs = varied(10);
        let mut bytes = encode(&mut SequencesEncoder::new(), &seqs, &EntropyConfig::default());
        bytes[1] |= 0x01;
        assert!(SequencesDecoder::new().decompress(&bytes).unwrap_err().is_corruption());
    }

    #[test]
    fn test_rle_symbol_outside_alphabet() {
        // one sequence, LL as RLE with code 36
        let src = [1u8, 0b01_00_00_00, 36, 0x80];
        assert!(SequencesDecoder::new().decompress(&src).unwrap_err().is_corruption());
    }

    #[test]
    fn test_trailing_and_truncated_stream() {
        // all-RLE streams: the decoder consumes exactly one offset bit per sequence
        let seqs: Vec<Sequence> = (0..50).map(|_| Sequence::new(7, 9, 2)).collect();
        let bytes = encode(&mut SequencesEncoder::new(), &seqs, &EntropyConfig::default());
        assert_eq!(&bytes[5..], &[0, 0, 0, 0, 0, 0, 0x04]);

        let mut longer = bytes.clone();
        longer.push(0x01);
        assert!(SequencesDecoder::new().decompress(&longer).unwrap_err().is_corruption());

        let shorter = &bytes[..bytes.len() - 1];
        assert!(SequencesDecoder::new().decompress(shorter).unwrap_err().is_corruption());
    }

    #[test]
    fn test_failed_section_keeps_tables() {
        let config = EntropyConfig::new(Strategy::Fast);
        let mut encoder = SequencesEncoder::new();
        let mut decoder = SequencesDecoder::new();
        let bytes = encode(&mut encoder, &varied(800), &config);
        decoder.decompress(&bytes).unwrap();
        let before = decoder.table(SymbolStream::LiteralLength).cloned();

        let mut broken = encode(&mut SequencesEncoder::new(), &varied(20), &config);
        let last = broken.len() - 1;
        broken[last] = 0;
        assert!(decoder.decompress(&broken).is_err());
        assert_eq!(decoder.table(SymbolStream::LiteralLength).cloned(), before);
    }

    #[test]
    fn test_garbage_never_panics() {
        let mut state = 0x9E37_79B9u32;
        for len in 1..200usize {
            let src: Vec<u8> = (0..len)
                .map(|_| {
                    state ^= state << 13;
                    state ^= state >> 17;
                    state ^= state << 5;
                    state as u8
                })
                .collect();
            let _ = SequencesDecoder::new().decompress(&src);
        }
    }
}

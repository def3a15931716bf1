//! Sequences section compression.

use zentropy_core::{
    EntropyConfig, Error, RepeatMode, Result, SectionStats, Strategy, SymbolEncodingType,
};

use super::{
    ll_code, ml_code, of_code, predefined_encode_table, write_nb_seq, Sequence, SequenceModes,
    SymbolStream, DEFAULT_MAX_OFF, MAX_NB_SEQ, MIN_MATCH, SEQUENCES_SPREAD_SIZE,
};
use crate::bitstream::BitWriter;
use crate::fse::{normalize_count, optimal_table_log, write_ncount, EncodeState, EncodeTable};
use crate::histogram::Histogram;
use crate::workspace::{Phase, Workspace};

/// `-log2(x / 256) * 256`, rounded down.
#[rustfmt::skip]
const INVERSE_PROBABILITY_LOG256: [u32; 256] = [
    0, 2048, 1792, 1642, 1536, 1453, 1386, 1329, 1280, 1236, 1197, 1162, 1130, 1100, 1073, 1047,
    1024, 1001, 980, 960, 941, 923, 906, 889, 874, 859, 844, 830, 817, 804, 791, 779,
    768, 756, 745, 734, 724, 714, 704, 694, 685, 676, 667, 658, 650, 642, 633, 626,
    618, 610, 603, 595, 588, 581, 574, 567, 561, 554, 548, 542, 535, 529, 523, 517,
    512, 506, 500, 495, 489, 484, 478, 473, 468, 463, 458, 453, 448, 443, 438, 434,
    429, 424, 420, 415, 411, 407, 402, 398, 394, 390, 386, 382, 377, 373, 370, 366,
    362, 358, 354, 350, 347, 343, 339, 336, 332, 329, 325, 322, 318, 315, 311, 308,
    305, 302, 298, 295, 292, 289, 286, 282, 279, 276, 273, 270, 267, 264, 261, 258,
    256, 253, 250, 247, 244, 241, 239, 236, 233, 230, 228, 225, 222, 220, 217, 215,
    212, 209, 207, 204, 202, 199, 197, 194, 192, 190, 187, 185, 182, 180, 178, 175,
    173, 171, 168, 166, 164, 162, 159, 157, 155, 153, 151, 149, 146, 144, 142, 140,
    138, 136, 134, 132, 130, 128, 126, 123, 121, 119, 117, 115, 114, 112, 110, 108,
    106, 104, 102, 100, 98, 96, 94, 93, 91, 89, 87, 85, 83, 82, 80, 78,
    76, 74, 73, 71, 69, 67, 66, 64, 62, 61, 59, 57, 55, 54, 52, 50,
    49, 47, 46, 44, 42, 41, 39, 37, 36, 34, 33, 31, 30, 28, 26, 25,
    23, 22, 20, 19, 17, 16, 14, 13, 11, 10, 8, 7, 5, 4, 2, 1,
];

/// Sections with more sequences than this never reuse a table blindly.
const STATIC_FSE_NB_SEQ_MAX: usize = 1000;

/// Worst-case NCount size for any sequence alphabet.
const NCOUNT_BOUND: usize = 512;

/// Counts at or above this total use low-probability markers.
const LOW_PROB_COUNT_MIN: usize = 2048;

/// Reuse state of one symbol stream.
#[derive(Debug, Clone, Default)]
struct StreamState {
    table: Option<EncodeTable>,
    mode: RepeatMode,
}

/// Compresses sequences sections, carrying the three FSE tables between
/// blocks.
#[derive(Debug, Clone, Default)]
pub struct SequencesEncoder {
    streams: [StreamState; 3],
}

impl SequencesEncoder {
    /// Create an encoder with no previous tables.
    pub fn new() -> Self {
        Self::default()
    }

    /// Install a table the decoder already knows for `stream`.
    pub fn set_table(&mut self, stream: SymbolStream, table: EncodeTable, mode: RepeatMode) {
        self.streams[stream.index()] = StreamState {
            table: Some(table),
            mode,
        };
    }

    /// Table available to `stream` in the next section.
    pub fn table(&self, stream: SymbolStream) -> Option<&EncodeTable> {
        self.streams[stream.index()].table.as_ref()
    }

    /// Reuse state of `stream`.
    pub fn repeat_mode(&self, stream: SymbolStream) -> RepeatMode {
        self.streams[stream.index()].mode
    }

    /// Override the reuse state of `stream`.
    pub fn set_repeat_mode(&mut self, stream: SymbolStream, mode: RepeatMode) {
        self.streams[stream.index()].mode = mode;
    }

    /// Forget every previous table.
    pub fn reset(&mut self) {
        self.streams = Default::default();
    }

    /// Encode `sequences` as a sequences section into `dst`.
    ///
    /// A returned `output_size` of 0 means the section hit a pattern old
    /// decoders reject and the block should be stored uncompressed; the
    /// encoder state is left untouched in that case.
    pub fn compress(
        &mut self,
        sequences: &[Sequence],
        dst: &mut [u8],
        config: &EntropyConfig,
        workspace: &mut Workspace,
    ) -> Result<SectionStats> {
        config.validate()?;
        let nb_seq = sequences.len();
        if nb_seq > MAX_NB_SEQ {
            return Err(Error::SrcSizeWrong("sequences: count above header range"));
        }
        // count header plus mode byte
        if dst.len() < 4 {
            return Err(Error::dst_too_small(4, dst.len()));
        }
        let mut pos = write_nb_seq(dst, nb_seq)?;
        if nb_seq == 0 {
            return Ok(SectionStats::sequences(0, pos, 0));
        }

        workspace.clear();
        let region = workspace.try_reserve(Phase::Tables, 3 * nb_seq + SEQUENCES_SPREAD_SIZE)?;
        workspace.check()?;
        let (codes, spread) = workspace.slice_mut(region).split_at_mut(3 * nb_seq);
        let (ll_codes, rest) = codes.split_at_mut(nb_seq);
        let (of_codes, ml_codes) = rest.split_at_mut(nb_seq);
        for (i, seq) in sequences.iter().enumerate() {
            seq.validate()?;
            ll_codes[i] = ll_code(seq.lit_length);
            of_codes[i] = of_code(seq.off_base);
            ml_codes[i] = ml_code(seq.match_length - MIN_MATCH);
        }

        let mode_pos = pos;
        pos += 1;
        let mut modes = SequenceModes::default();
        let mut last_count_size = 0;
        let mut next: [StreamState; 3] = Default::default();
        for (stream, stream_codes) in SymbolStream::ALL
            .into_iter()
            .zip([&*ll_codes, &*of_codes, &*ml_codes])
        {
            let mut state = self.streams[stream.index()].clone();
            let (ty, size, table) = build_stream_table(
                stream,
                stream_codes,
                &mut state,
                &mut dst[pos..],
                spread,
                config,
            )?;
            if ty == SymbolEncodingType::Compressed {
                last_count_size = size;
            }
            pos += size;
            modes.set(stream, ty);
            next[stream.index()] = StreamState {
                table: Some(table),
                mode: state.mode,
            };
        }
        let mode_byte = modes.to_byte();
        dst[mode_pos] = mode_byte;

        let [ll_state, of_state, ml_state] = &next;
        let tables = match (&ll_state.table, &of_state.table, &ml_state.table) {
            (Some(ll), Some(of), Some(ml)) => [ll, of, ml],
            _ => return Err(Error::generic("sequences: stream table missing")),
        };
        let stream_size = encode_sequences(
            &mut dst[pos..],
            tables,
            sequences,
            [&*ll_codes, &*of_codes, &*ml_codes],
        )?;
        pos += stream_size;

        // an NCount of 2-3 bytes followed by a 1-byte bitstream trips decoders
        // older than 1.3.4
        if last_count_size != 0 && last_count_size + stream_size < 4 {
            tracing::debug!(
                last_count_size,
                stream_size,
                "sequences: section too short for legacy decoders"
            );
            return Ok(SectionStats::sequences(nb_seq, 0, mode_byte));
        }

        self.streams = next;
        tracing::debug!(nb_seq, size = pos, ?modes, "sequences: section encoded");
        Ok(SectionStats::sequences(nb_seq, pos, mode_byte))
    }
}

/// Choose how one symbol stream is described.
///
/// `mode` is the stream's reuse state; it is updated the way the chosen
/// type requires (`None` after predefined or RLE, `Check` after a new
/// table). `prev` is the table a `Repeat` would reuse.
pub fn select_encoding_type(
    mode: &mut RepeatMode,
    prev: Option<&EncodeTable>,
    histogram: &Histogram,
    nb_seq: usize,
    stream: SymbolStream,
    default_allowed: bool,
    strategy: Strategy,
) -> Result<SymbolEncodingType> {
    if prev.is_none() {
        *mode = RepeatMode::None;
    }
    let most_frequent = histogram.largest as usize;
    let default_log = stream.default_log();

    if most_frequent == nb_seq {
        *mode = RepeatMode::None;
        // predefined costs a few bits per symbol, RLE a whole byte
        if default_allowed && nb_seq <= 2 {
            return Ok(SymbolEncodingType::Predefined);
        }
        return Ok(SymbolEncodingType::Rle);
    }

    if strategy < Strategy::Lazy {
        if default_allowed {
            let mult = 10 - strategy.to_level() as usize;
            let dynamic_fse_nb_seq_min = ((1usize << default_log) * mult) >> 3;
            if *mode == RepeatMode::Valid && nb_seq < STATIC_FSE_NB_SEQ_MAX {
                return Ok(SymbolEncodingType::Repeat);
            }
            if nb_seq < dynamic_fse_nb_seq_min
                || most_frequent < (nb_seq >> (default_log - 1))
            {
                *mode = RepeatMode::None;
                return Ok(SymbolEncodingType::Predefined);
            }
        }
    } else {
        let counts = histogram.as_slice();
        let basic_cost = if default_allowed {
            cross_entropy_cost(stream.default_distribution(), default_log, counts)
        } else {
            usize::MAX
        };
        let repeat_cost = match (*mode, prev) {
            (RepeatMode::None, _) | (_, None) => usize::MAX,
            (_, Some(table)) => table.repeat_cost(counts).unwrap_or(usize::MAX),
        };
        let ncount_cost = ncount_cost(counts, nb_seq, stream.max_log())?;
        let compressed_cost = (ncount_cost << 3) + entropy_cost(counts, nb_seq);
        tracing::trace!(
            ?stream,
            basic_cost,
            repeat_cost,
            compressed_cost,
            "sequences: estimated bit costs"
        );

        if basic_cost <= repeat_cost && basic_cost <= compressed_cost {
            *mode = RepeatMode::None;
            return Ok(SymbolEncodingType::Predefined);
        }
        if repeat_cost <= compressed_cost {
            return Ok(SymbolEncodingType::Repeat);
        }
    }

    *mode = RepeatMode::Check;
    Ok(SymbolEncodingType::Compressed)
}

/// Pick the encoding of one stream, write its description and return the
/// table the bitstream will use. A new table is spread in `spread`.
fn build_stream_table(
    stream: SymbolStream,
    codes: &[u8],
    state: &mut StreamState,
    dst: &mut [u8],
    spread: &mut [u8],
    config: &EntropyConfig,
) -> Result<(SymbolEncodingType, usize, EncodeTable)> {
    let nb_seq = codes.len();
    let histogram = Histogram::count_fast(codes);
    let max = histogram.max_symbol;
    let default_allowed = config.default_tables_allowed
        && (stream != SymbolStream::Offset || max <= DEFAULT_MAX_OFF);

    let ty = select_encoding_type(
        &mut state.mode,
        state.table.as_ref(),
        &histogram,
        nb_seq,
        stream,
        default_allowed,
        config.strategy,
    )?;
    tracing::debug!(?stream, ?ty, nb_seq, max_symbol = max, "sequences: stream encoding");

    match ty {
        SymbolEncodingType::Rle => {
            let Some(first) = dst.first_mut() else {
                return Err(Error::dst_too_small(1, 0));
            };
            *first = codes[0];
            Ok((ty, 1, EncodeTable::rle(max as u8)))
        }
        SymbolEncodingType::Repeat => match state.table.clone() {
            Some(table) => Ok((ty, 0, table)),
            None => Err(Error::generic("sequences: repeat without a previous table")),
        },
        SymbolEncodingType::Predefined => Ok((ty, 0, predefined_encode_table(stream)?.clone())),
        SymbolEncodingType::Compressed => {
            let table_log = optimal_table_log(stream.max_log(), nb_seq, max);
            let mut counts = histogram.counts;
            let mut total = nb_seq;
            // the last symbol seeds the initial state and costs nothing
            let last = codes[nb_seq - 1] as usize;
            if counts[last] > 1 {
                counts[last] -= 1;
                total -= 1;
            }
            let norm = normalize_count(
                &counts[..=max as usize],
                total,
                table_log,
                total >= LOW_PROB_COUNT_MIN,
            )?;
            let size = write_ncount(dst, &norm, max, table_log)?;
            let table = EncodeTable::build_with_workspace(&norm, table_log, spread)?;
            tracing::trace!(?stream, table_log, header = size, "sequences: new table");
            Ok((ty, size, table))
        }
    }
}

/// Write the interleaved bitstream. Tables and codes are in LL, OF, ML
/// order.
fn encode_sequences(
    dst: &mut [u8],
    tables: [&EncodeTable; 3],
    sequences: &[Sequence],
    codes: [&[u8]; 3],
) -> Result<usize> {
    let [ll_table, of_table, ml_table] = tables;
    let [ll_codes, of_codes, ml_codes] = codes;
    let capacity = dst.len();
    let mut writer = BitWriter::new(dst)?;

    let last = sequences.len() - 1;
    let mut ml_state = EncodeState::new(ml_table, ml_codes[last]);
    let mut of_state = EncodeState::new(of_table, of_codes[last]);
    let mut ll_state = EncodeState::new(ll_table, ll_codes[last]);

    let seq = &sequences[last];
    writer.add_bits(
        u64::from(seq.lit_length),
        SymbolStream::LiteralLength.extra_bits(ll_codes[last]),
    );
    writer.add_bits(
        u64::from(seq.match_length - MIN_MATCH),
        SymbolStream::MatchLength.extra_bits(ml_codes[last]),
    );
    writer.add_bits(u64::from(seq.off_base), u32::from(of_codes[last]));
    writer.flush_bits();

    for n in (0..last).rev() {
        let seq = &sequences[n];
        let (ll, of, ml) = (ll_codes[n], of_codes[n], ml_codes[n]);
        let ll_bits = SymbolStream::LiteralLength.extra_bits(ll);
        let ml_bits = SymbolStream::MatchLength.extra_bits(ml);
        let of_bits = u32::from(of);
        let total_bits = ll_bits + ml_bits + of_bits;

        // at most 26 state bits on top of 7 pending
        of_state.encode(&mut writer, of_table, of);
        ml_state.encode(&mut writer, ml_table, ml);
        ll_state.encode(&mut writer, ll_table, ll);
        if total_bits >= 64 - 7 - 26 {
            writer.flush_bits();
        }
        writer.add_bits(u64::from(seq.lit_length), ll_bits);
        writer.add_bits(u64::from(seq.match_length - MIN_MATCH), ml_bits);
        if total_bits > 56 {
            writer.flush_bits();
        }
        writer.add_bits(u64::from(seq.off_base), of_bits);
        writer.flush_bits();
    }

    ml_state.flush(&mut writer, ml_table);
    of_state.flush(&mut writer, of_table);
    ll_state.flush(&mut writer, ll_table);

    writer
        .close()
        .ok_or_else(|| Error::dst_too_small(capacity + 1, capacity))
}

/// Bits to encode `counts` with the predefined distribution `norm`.
fn cross_entropy_cost(norm: &[i16], accuracy_log: u32, counts: &[u32]) -> usize {
    let shift = 8 - accuracy_log;
    let mut cost = 0usize;
    for (s, &count) in counts.iter().enumerate() {
        if count == 0 {
            continue;
        }
        let Some(&n) = norm.get(s) else {
            return usize::MAX;
        };
        let n = if n == -1 { 1 } else { n.max(0) as u32 };
        if n == 0 {
            return usize::MAX;
        }
        let norm256 = ((n << shift) as usize).min(255);
        cost += count as usize * INVERSE_PROBABILITY_LOG256[norm256] as usize;
    }
    cost >> 8
}

/// Shannon cost in bits of `counts`, quantized to 1/256 probabilities.
fn entropy_cost(counts: &[u32], total: usize) -> usize {
    let mut cost = 0usize;
    for &count in counts {
        if count == 0 {
            continue;
        }
        let norm = ((256 * count as usize) / total).clamp(1, 255);
        cost += count as usize * INVERSE_PROBABILITY_LOG256[norm] as usize;
    }
    cost >> 8
}

/// Bytes of the NCount header a new table would need.
fn ncount_cost(counts: &[u32], nb_seq: usize, max_log: u32) -> Result<usize> {
    let max_symbol = (counts.len() - 1) as u32;
    let table_log = optimal_table_log(max_log, nb_seq, max_symbol);
    let norm = normalize_count(counts, nb_seq, table_log, nb_seq >= LOW_PROB_COUNT_MIN)?;
    let mut buf = [0u8; NCOUNT_BOUND];
    write_ncount(&mut buf, &norm, max_symbol, table_log)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn seqs_from(f: impl Fn(u32) -> Sequence, n: u32) -> Vec<Sequence> {
        (0..n).map(f).collect()
    }

    fn compress(
        encoder: &mut SequencesEncoder,
        seqs: &[Sequence],
        config: &EntropyConfig,
    ) -> (Vec<u8>, SectionStats) {
        let mut dst = vec![0u8; 64 + seqs.len() * 16];
        let mut ws = Workspace::with_default_size();
        let stats = encoder.compress(seqs, &mut dst, config, &mut ws).unwrap();
        dst.truncate(stats.output_size);
        (dst, stats)
    }

    #[test]
    fn test_empty_section() {
        let mut encoder = SequencesEncoder::new();
        let (out, stats) = compress(&mut encoder, &[], &EntropyConfig::default());
        assert_eq!(out, vec![0]);
        assert_eq!(stats.input_size, 0);
        assert!(encoder.table(SymbolStream::Offset).is_none());
    }

    #[test]
    fn test_single_sequence_uses_predefined() {
        let mut encoder = SequencesEncoder::new();
        let seqs = [Sequence::with_offset(4, 8, 100)];
        let (out, stats) = compress(&mut encoder, &seqs, &EntropyConfig::default());
        assert_eq!(out[0], 1);
        assert_eq!(out[1], 0, "all streams predefined");
        assert_eq!(stats.block_type, 0);
        assert!(out.len() > 2);
        assert_eq!(encoder.repeat_mode(SymbolStream::LiteralLength), RepeatMode::None);
    }

    #[test]
    fn test_rle_streams() {
        let mut encoder = SequencesEncoder::new();
        let seqs = seqs_from(|_| Sequence::new(2, 5, 1), 40);
        let (out, _) = compress(&mut encoder, &seqs, &EntropyConfig::default());
        let modes = SequenceModes::from_byte(out[1]).unwrap();
        assert_eq!(modes, SequenceModes::uniform(SymbolEncodingType::Rle));
        // one RLE byte per stream: ll code 2, of code 0, ml code 2
        assert_eq!(&out[2..5], &[2, 0, 2]);
    }

    #[test]
    fn test_new_tables_set_check() {
        let mut encoder = SequencesEncoder::new();
        let seqs = seqs_from(|i| Sequence::new(i % 7, 3 + (i * 5) % 11, 4 + (i % 50) * 97), 600);
        let (out, _) = compress(&mut encoder, &seqs, &EntropyConfig::new(Strategy::Fast));
        let modes = SequenceModes::from_byte(out[2]).unwrap();
        assert_eq!(modes.literal_lengths, SymbolEncodingType::Compressed);
        assert_eq!(encoder.repeat_mode(SymbolStream::LiteralLength), RepeatMode::Check);
        assert!(encoder.table(SymbolStream::LiteralLength).is_some());
    }

    #[test]
    fn test_repeat_when_valid() {
        let mut encoder = SequencesEncoder::new();
        let config = EntropyConfig::new(Strategy::Fast);
        let seqs = seqs_from(|i| Sequence::new(i % 7, 3 + (i * 5) % 11, 4 + (i % 50) * 97), 600);
        compress(&mut encoder, &seqs, &config);
        encoder.set_repeat_mode(SymbolStream::LiteralLength, RepeatMode::Valid);

        let (out, _) = compress(&mut encoder, &seqs[..300], &config);
        let modes = SequenceModes::from_byte(out[2]).unwrap();
        assert_eq!(modes.literal_lengths, SymbolEncodingType::Repeat);
        assert_eq!(encoder.repeat_mode(SymbolStream::LiteralLength), RepeatMode::Valid);
    }

    #[test]
    fn test_cost_model_prefers_repeat_over_new_header() {
        let mut encoder = SequencesEncoder::new();
        let config = EntropyConfig::new(Strategy::BtOpt);
        let seqs = seqs_from(|i| Sequence::new(i % 13, 3 + (i * 7) % 29, 4 + (i % 31) * 1013), 2000);
        compress(&mut encoder, &seqs, &config);
        assert_eq!(encoder.repeat_mode(SymbolStream::MatchLength), RepeatMode::Check);

        let (out, _) = compress(&mut encoder, &seqs, &config);
        let modes = SequenceModes::from_byte(out[2]).unwrap();
        assert_eq!(modes.match_lengths, SymbolEncodingType::Repeat);
    }

    #[test]
    fn test_defaults_disallowed() {
        let mut encoder = SequencesEncoder::new();
        let config = EntropyConfig::default().with_default_tables(false);
        let seqs = seqs_from(|i| Sequence::new(i % 3, 3 + i % 4, 4 + i % 5), 20);
        let (out, _) = compress(&mut encoder, &seqs, &config);
        let modes = SequenceModes::from_byte(out[1]).unwrap();
        assert_eq!(modes, SequenceModes::uniform(SymbolEncodingType::Compressed));
    }

    #[test]
    fn test_short_compressed_section_is_withheld() {
        let config = EntropyConfig::new(Strategy::Fast).with_default_tables(false);
        let mut encoder = SequencesEncoder::new();
        let seqs = seqs_from(|i| Sequence::new(i % 7, 3 + (i * 5) % 11, 4 + (i % 50) * 97), 600);
        let (_, stats) = compress(&mut encoder, &seqs, &config);
        assert!(stats.output_size > 0);
        let before: Vec<_> = SymbolStream::ALL
            .into_iter()
            .map(|s| (encoder.table(s).cloned(), encoder.repeat_mode(s)))
            .collect();

        // literal lengths 0,0,0,0,1 normalize to [26, 6] at log 5: a 2-byte
        // NCount and a 1-byte bitstream; offsets and match lengths are RLE
        let tiny = seqs_from(|i| Sequence::new(u32::from(i == 4), 4, 1), 5);
        let (out, stats) = compress(&mut encoder, &tiny, &config);
        assert_eq!(stats.output_size, 0);
        assert!(out.is_empty());
        let modes = SequenceModes::from_byte(stats.block_type).unwrap();
        assert_eq!(modes.literal_lengths, SymbolEncodingType::Compressed);
        assert_eq!(modes.offsets, SymbolEncodingType::Rle);
        assert_eq!(modes.match_lengths, SymbolEncodingType::Rle);

        let after: Vec<_> = SymbolStream::ALL
            .into_iter()
            .map(|s| (encoder.table(s).cloned(), encoder.repeat_mode(s)))
            .collect();
        assert_eq!(before, after);

        // the rare length first costs bits in the stream and the section is kept
        let kept = seqs_from(|i| Sequence::new(u32::from(i == 0), 4, 1), 5);
        let (_, stats) = compress(&mut encoder, &kept, &config);
        assert!(stats.output_size > 0);
        assert_eq!(encoder.repeat_mode(SymbolStream::LiteralLength), RepeatMode::Check);
    }

    #[test]
    fn test_large_offsets_skip_predefined() {
        let mut histogram_codes = vec![29u8; 10];
        histogram_codes.extend_from_slice(&[5; 30]);
        let histogram = Histogram::count_fast(&histogram_codes);
        let mut mode = RepeatMode::None;
        // the caller clears default_allowed for offset codes above 28
        let ty = select_encoding_type(
            &mut mode,
            None,
            &histogram,
            histogram_codes.len(),
            SymbolStream::Offset,
            false,
            Strategy::Fast,
        )
        .unwrap();
        assert_eq!(ty, SymbolEncodingType::Compressed);
        assert_eq!(mode, RepeatMode::Check);
    }

    #[test]
    fn test_two_identical_prefers_predefined() {
        let histogram = Histogram::count_fast(&[4, 4]);
        let mut mode = RepeatMode::Check;
        let ty = select_encoding_type(
            &mut mode,
            None,
            &histogram,
            2,
            SymbolStream::LiteralLength,
            true,
            Strategy::Fast,
        )
        .unwrap();
        assert_eq!(ty, SymbolEncodingType::Predefined);
        assert_eq!(mode, RepeatMode::None);
    }

    #[test]
    fn test_invalid_sequence_rejected() {
        let mut encoder = SequencesEncoder::new();
        let mut dst = vec![0u8; 64];
        let mut ws = Workspace::with_default_size();
        let err = encoder
            .compress(&[Sequence::new(0, 2, 4)], &mut dst, &EntropyConfig::default(), &mut ws)
            .unwrap_err();
        assert!(matches!(err, Error::Generic(_)));
    }

    #[test]
    fn test_dst_too_small() {
        let mut encoder = SequencesEncoder::new();
        let seqs = seqs_from(|i| Sequence::new(i % 7, 3 + (i * 5) % 11, 4 + (i % 50) * 97), 600);
        let mut dst = vec![0u8; 40];
        let mut ws = Workspace::with_default_size();
        let err = encoder
            .compress(&seqs, &mut dst, &EntropyConfig::default(), &mut ws)
            .unwrap_err();
        assert!(err.is_capacity());
        assert!(encoder.table(SymbolStream::LiteralLength).is_none());
    }

    #[test]
    fn test_small_workspace() {
        let mut encoder = SequencesEncoder::new();
        let seqs = seqs_from(|i| Sequence::new(i, 4, 5), 100);
        let mut dst = vec![0u8; 4096];
        let mut ws = Workspace::new(100);
        let err = encoder
            .compress(&seqs, &mut dst, &EntropyConfig::default(), &mut ws)
            .unwrap_err();
        assert!(matches!(err, Error::WorkSpaceTooSmall { .. }));
    }

    #[test]
    fn test_cost_helpers() {
        // uniform over 4 symbols at 64/256 each: 2 bits per symbol
        assert_eq!(entropy_cost(&[10, 10, 10, 10], 40), 80);
        let norm = [16i16, 16, 16, 16];
        assert_eq!(cross_entropy_cost(&norm, 6, &[10, 10, 10, 10]), 80);
        // a symbol the distribution cannot encode
        assert_eq!(cross_entropy_cost(&[32, 32, 0], 6, &[1, 1, 1]), usize::MAX);
    }
}

//! Section-level integration tests.
//!
//! Drives the literals and sequences codecs the way a block encoder does:
//! one encoder and one decoder kept alive across consecutive blocks.
//!
//! Run with: cargo test --test sections

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use zentropy::sequences::SymbolStream;
use zentropy::{
    EntropyConfig, Error, LiteralsBlockType, LiteralsDecoder, LiteralsEncoder, Metrics,
    RepeatMode, Sequence, SequencesDecoder, SequencesEncoder, Strategy, SymbolEncodingType,
    Workspace,
};

fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}

fn prose(len: usize) -> Vec<u8> {
    b"It was the best of times, it was the worst of times, it was the age of wisdom. "
        .iter()
        .cycle()
        .take(len)
        .copied()
        .collect()
}

fn random_bytes(len: usize, seed: u64) -> Vec<u8> {
    let mut rng = StdRng::seed_from_u64(seed);
    (0..len).map(|_| rng.gen()).collect()
}

fn block_sequences(count: usize, seed: u64) -> Vec<Sequence> {
    let mut rng = StdRng::seed_from_u64(seed);
    (0..count)
        .map(|_| {
            let off_base = if rng.gen_bool(0.25) {
                rng.gen_range(1..=3)
            } else {
                3 + rng.gen_range(1..20_000)
            };
            Sequence::new(rng.gen_range(0..20), rng.gen_range(3..36), off_base)
        })
        .collect()
}

/// Encode then decode one literals section, returning its block type.
fn literals_roundtrip(
    encoder: &mut LiteralsEncoder,
    decoder: &mut LiteralsDecoder,
    src: &[u8],
    config: &EntropyConfig,
    workspace: &mut Workspace,
) -> (u8, usize) {
    let mut section = vec![0u8; src.len() + 8];
    let stats = encoder.compress(src, &mut section, config, workspace).unwrap();
    assert!(stats.output_size <= src.len() + 3);

    let mut out = vec![0u8; src.len()];
    let (consumed, len) = decoder
        .decompress(&section[..stats.output_size], &mut out)
        .unwrap();
    assert_eq!(consumed, stats.output_size);
    assert_eq!(len, src.len());
    assert_eq!(out, src);
    (stats.block_type, stats.output_size)
}

// ============================================================================
// Literals
// ============================================================================

#[test]
fn test_random_literals_are_stored_raw() {
    init_tracing();
    let src = random_bytes(1000, 7);
    let mut workspace = Workspace::with_default_size();
    let (block_type, size) = literals_roundtrip(
        &mut LiteralsEncoder::new(),
        &mut LiteralsDecoder::new(),
        &src,
        &EntropyConfig::default(),
        &mut workspace,
    );
    assert_eq!(block_type, LiteralsBlockType::Raw.field());
    assert_eq!(size, 1002);
}

#[test]
fn test_single_byte_literals_are_rle() {
    let src = vec![0x41u8; 1000];
    let mut workspace = Workspace::with_default_size();
    let (block_type, size) = literals_roundtrip(
        &mut LiteralsEncoder::new(),
        &mut LiteralsDecoder::new(),
        &src,
        &EntropyConfig::default(),
        &mut workspace,
    );
    assert_eq!(block_type, LiteralsBlockType::Rle.field());
    assert_eq!(size, 3);
}

#[test]
fn test_literals_size_edges() {
    let config = EntropyConfig::default();
    let mut workspace = Workspace::with_default_size();
    for len in [0usize, 1, 7, 8, 31, 32, 255, 256, 1023, 1024, 4095, 4096] {
        let src = prose(len);
        let (block_type, size) = literals_roundtrip(
            &mut LiteralsEncoder::new(),
            &mut LiteralsDecoder::new(),
            &src,
            &config,
            &mut workspace,
        );
        if len < 64 {
            assert_eq!(block_type, LiteralsBlockType::Raw.field(), "len {len}");
        } else {
            assert_eq!(block_type, LiteralsBlockType::Compressed.field(), "len {len}");
            assert!(size < len, "len {len}");
        }
    }
}

#[test]
fn test_literals_across_blocks() {
    init_tracing();
    let config = EntropyConfig::default();
    let mut workspace = Workspace::with_default_size();
    let mut encoder = LiteralsEncoder::new();
    let mut decoder = LiteralsDecoder::new();
    let src = prose(800);

    let (first, _) = literals_roundtrip(&mut encoder, &mut decoder, &src, &config, &mut workspace);
    assert_eq!(first, LiteralsBlockType::Compressed.field());

    let (second, _) =
        literals_roundtrip(&mut encoder, &mut decoder, &src[..500], &config, &mut workspace);
    assert_eq!(second, LiteralsBlockType::Treeless.field());

    // a raw block in between leaves both tables in place
    let noise = random_bytes(300, 11);
    let (third, _) = literals_roundtrip(&mut encoder, &mut decoder, &noise, &config, &mut workspace);
    assert_eq!(third, LiteralsBlockType::Raw.field());
    assert!(decoder.table().is_some());

    let (fourth, _) =
        literals_roundtrip(&mut encoder, &mut decoder, &src[100..600], &config, &mut workspace);
    assert_eq!(fourth, LiteralsBlockType::Treeless.field());
}

#[test]
fn test_treeless_section_needs_a_table() {
    let config = EntropyConfig::default();
    let mut workspace = Workspace::with_default_size();
    let mut encoder = LiteralsEncoder::new();
    let src = prose(800);
    let mut section = vec![0u8; 1024];
    encoder.compress(&src, &mut section, &config, &mut workspace).unwrap();
    let stats = encoder
        .compress(&src[..500], &mut section, &config, &mut workspace)
        .unwrap();
    assert_eq!(stats.block_type, LiteralsBlockType::Treeless.field());

    let mut out = vec![0u8; 500];
    let err = LiteralsDecoder::new()
        .decompress(&section[..stats.output_size], &mut out)
        .unwrap_err();
    assert!(matches!(err, Error::DictionaryCorrupted(_)));
}

#[test]
fn test_literals_reset_forgets_table() {
    let config = EntropyConfig::default();
    let mut workspace = Workspace::with_default_size();
    let mut encoder = LiteralsEncoder::new();
    let src = prose(800);
    let mut section = vec![0u8; 1024];
    encoder.compress(&src, &mut section, &config, &mut workspace).unwrap();
    assert_eq!(encoder.repeat_mode(), RepeatMode::Check);

    encoder.reset();
    assert_eq!(encoder.repeat_mode(), RepeatMode::None);
    let stats = encoder
        .compress(&src[..500], &mut section, &config, &mut workspace)
        .unwrap();
    assert_eq!(stats.block_type, LiteralsBlockType::Compressed.field());
}

#[test]
fn test_corrupted_literals_rejected() {
    let config = EntropyConfig::default();
    let mut workspace = Workspace::with_default_size();
    let src = prose(2000);
    let mut section = vec![0u8; 2100];
    let stats = LiteralsEncoder::new()
        .compress(&src, &mut section, &config, &mut workspace)
        .unwrap();

    let mut out = vec![0u8; src.len()];
    let truncated = &section[..stats.output_size - 1];
    let err = LiteralsDecoder::new().decompress(truncated, &mut out).unwrap_err();
    assert!(err.is_corruption());

    let mut short = vec![0u8; src.len() - 1];
    let err = LiteralsDecoder::new()
        .decompress(&section[..stats.output_size], &mut short)
        .unwrap_err();
    assert!(err.is_capacity());
}

// ============================================================================
// Sequences
// ============================================================================

#[test]
fn test_sequences_across_blocks() {
    init_tracing();
    let mut workspace = Workspace::with_default_size();
    let mut encoder = SequencesEncoder::new();
    let mut decoder = SequencesDecoder::new();

    for strategy in [Strategy::DFast, Strategy::BtUltra] {
        let config = EntropyConfig::new(strategy);
        encoder.reset();
        decoder.reset();
        for (block, count) in [1500usize, 900, 40, 2000].into_iter().enumerate() {
            let sequences = block_sequences(count, block as u64);
            let mut section = vec![0u8; count * 16 + 64];
            let stats = encoder
                .compress(&sequences, &mut section, &config, &mut workspace)
                .unwrap();
            assert!(stats.output_size > 0);
            let decoded = decoder.decompress(&section[..stats.output_size]).unwrap();
            assert_eq!(decoded, sequences, "{strategy:?} block {block}");
        }
    }
}

#[test]
fn test_sequences_tables_carry_over() {
    let config = EntropyConfig::new(Strategy::Fast);
    let mut workspace = Workspace::with_default_size();
    let mut encoder = SequencesEncoder::new();
    let sequences = block_sequences(1200, 3);
    let mut section = vec![0u8; 1200 * 16 + 64];

    let stats = encoder
        .compress(&sequences, &mut section, &config, &mut workspace)
        .unwrap();
    for (stream, shift) in SymbolStream::ALL.into_iter().zip([6, 4, 2]) {
        assert!(encoder.table(stream).is_some());
        let ty = SymbolEncodingType::from_field((stats.block_type >> shift) & 3);
        let expected = match ty {
            SymbolEncodingType::Compressed => RepeatMode::Check,
            SymbolEncodingType::Repeat => unreachable!("first section cannot repeat"),
            _ => RepeatMode::None,
        };
        assert_eq!(encoder.repeat_mode(stream), expected, "{stream:?}");
    }

    encoder.reset();
    for stream in SymbolStream::ALL {
        assert!(encoder.table(stream).is_none());
        assert_eq!(encoder.repeat_mode(stream), RepeatMode::None);
    }
}

#[test]
fn test_sequence_modes_reported() {
    let config = EntropyConfig::default();
    let mut workspace = Workspace::with_default_size();
    let sequences = vec![Sequence::with_offset(4, 8, 100); 2];
    let mut section = vec![0u8; 64];
    let stats = SequencesEncoder::new()
        .compress(&sequences, &mut section, &config, &mut workspace)
        .unwrap();
    let predefined = SymbolEncodingType::Predefined.field();
    let expected = (predefined << 6) | (predefined << 4) | (predefined << 2);
    assert_eq!(stats.block_type, expected);
}

#[test]
fn test_metrics_over_a_block() {
    let config = EntropyConfig::default();
    let mut workspace = Workspace::with_default_size();
    let mut metrics = Metrics::new();

    let literals = prose(4000);
    let mut section = vec![0u8; 4100];
    let stats = LiteralsEncoder::new()
        .compress(&literals, &mut section, &config, &mut workspace)
        .unwrap();
    assert!(stats.ratio().is_effective());
    metrics.record(&stats);

    let noise = random_bytes(500, 5);
    let stats = LiteralsEncoder::new()
        .compress(&noise, &mut section, &config, &mut workspace)
        .unwrap();
    metrics.record(&stats);

    let sequences = block_sequences(300, 9);
    let mut section = vec![0u8; 300 * 16 + 64];
    let stats = SequencesEncoder::new()
        .compress(&sequences, &mut section, &config, &mut workspace)
        .unwrap();
    metrics.record(&stats);

    // too short for legacy decoders: nothing is emitted
    let tiny: Vec<Sequence> = (0..5u32).map(|i| Sequence::new(u32::from(i == 4), 4, 1)).collect();
    let strict = EntropyConfig::new(Strategy::Fast).with_default_tables(false);
    let stats = SequencesEncoder::new()
        .compress(&tiny, &mut section, &strict, &mut workspace)
        .unwrap();
    assert_eq!(stats.output_size, 0);
    metrics.record(&stats);

    assert_eq!(metrics.sections, 4);
    assert_eq!(metrics.raw_sections, 1);
    assert_eq!(metrics.withheld_sections, 1);
    assert!(metrics.total_bytes_out > 0);
}

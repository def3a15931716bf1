//! Property-based tests for the entropy stage.
//!
//! These tests check invariants that must hold for every input:
//! - bit fields read back exactly as written
//! - FSE and Huffman streams decode to their source
//! - a literals section is never larger than raw storage
//! - sequences sections decode to the sequences that produced them
//!
//! Run with: cargo test --test proptest_entropy

use proptest::prelude::*;

use zentropy::bitstream::{BitReader, BitWriter};
use zentropy::huffman::{
    decompress_1x, decompress_4x, read_weights, write_table, DecoderKind, HuffmanDecodeTable,
    HuffmanTable,
};
use zentropy::literals::raw_header_size;
use zentropy::{
    fse, EntropyConfig, Histogram, LiteralsDecoder, LiteralsEncoder, Sequence, SequencesDecoder,
    SequencesEncoder, Strategy as EntropyStrategy, Workspace,
};

/// Bit fields of 1 to 25 bits, each value already masked to its width.
fn bit_fields_strategy() -> impl Strategy<Value = Vec<(u64, u32)>> {
    prop::collection::vec(
        (1u32..=25).prop_flat_map(|n| ((0u64..(1u64 << n)), Just(n))),
        1..400,
    )
}

/// Bytes over a small alphabet, so both coders have something to gain.
fn skewed_bytes_strategy(max_len: usize) -> impl Strategy<Value = Vec<u8>> {
    (2u8..=64).prop_flat_map(move |alphabet| {
        prop::collection::vec(
            prop_oneof![
                6 => Just(0u8),
                3 => 0u8..4,
                1 => 0u8..alphabet,
            ],
            16..max_len,
        )
    })
}

fn entropy_strategy() -> impl Strategy<Value = EntropyStrategy> {
    prop_oneof![
        Just(EntropyStrategy::Fast),
        Just(EntropyStrategy::DFast),
        Just(EntropyStrategy::Lazy2),
        Just(EntropyStrategy::BtOpt),
        Just(EntropyStrategy::BtUltra2),
    ]
}

fn sequence_strategy() -> impl Strategy<Value = Sequence> {
    (
        prop_oneof![8 => 0u32..32, 1 => 32u32..70_000],
        prop_oneof![8 => 3u32..40, 1 => 40u32..100_000],
        prop_oneof![3 => 1u32..=3, 6 => 4u32..70_000, 1 => 70_000u32..(1 << 31)],
    )
        .prop_map(|(ll, ml, off)| Sequence::new(ll, ml, off))
}

proptest! {
    #![proptest_config(ProptestConfig {
        cases: 64,
        max_shrink_iters: 100,
        ..ProptestConfig::default()
    })]

    /// Fields come back in reverse order with their exact values.
    #[test]
    fn prop_bitstream_reads_back_exactly(fields in bit_fields_strategy()) {
        let total_bits: usize = fields.iter().map(|&(_, n)| n as usize).sum();
        let mut buf = vec![0u8; total_bits / 8 + 16];
        let mut writer = BitWriter::new(&mut buf).unwrap();
        for &(value, n) in &fields {
            writer.add_bits(value, n);
            writer.flush_bits();
        }
        let size = writer.close().unwrap();
        prop_assert_eq!(size, (total_bits + 1 + 7) / 8);

        let mut reader = BitReader::new(&buf[..size]).unwrap();
        for &(value, n) in fields.iter().rev() {
            prop_assert_eq!(reader.read_bits(n) as u64, value);
            reader.reload();
        }
        prop_assert!(reader.end_of_stream());
    }

    /// FSE output decodes to the source, or the encoder declines.
    #[test]
    fn prop_fse_roundtrip(data in skewed_bytes_strategy(4000), log in 5u32..=12) {
        let mut compressed = vec![0u8; data.len() + 512];
        let size = fse::compress(&mut compressed, &data, 0, log).unwrap();
        if size > 1 {
            prop_assert!(size < data.len());
            let mut out = vec![0u8; data.len()];
            let n = fse::decompress(&compressed[..size], &mut out, 12).unwrap();
            prop_assert_eq!(n, data.len());
            prop_assert_eq!(out, data);
        } else if size == 1 {
            prop_assert!(data.iter().all(|&b| b == data[0]));
        }
    }

    /// Both stream layouts decode with both decoder kinds.
    #[test]
    fn prop_huffman_roundtrip(data in skewed_bytes_strategy(6000), max_bits in 8u32..=11) {
        let histogram = Histogram::count_fast(&data);
        prop_assume!(histogram.distinct() >= 2);

        let table = HuffmanTable::build(histogram.as_slice(), max_bits).unwrap();
        prop_assert!(table.max_nb_bits() <= max_bits);

        let mut buf = vec![0u8; 2 * data.len() + 256];
        let header = write_table(&mut buf, &table).unwrap();
        let weights = read_weights(&buf[..header]).unwrap();
        prop_assert_eq!(weights.header_size, header);

        let single = table.compress_1x(&mut buf[header..], &data);
        prop_assert!(single > 0);
        let single_stream = buf[header..header + single].to_vec();
        let four = table.compress_4x(&mut buf[header..], &data);
        prop_assert!(four > 0);
        let four_streams = buf[header..header + four].to_vec();

        for kind in [DecoderKind::SingleSymbol, DecoderKind::DoubleSymbol] {
            let decode_table = HuffmanDecodeTable::build(&weights, kind).unwrap();
            let mut out = vec![0u8; data.len()];
            decompress_1x(&mut out, &single_stream, &decode_table).unwrap();
            prop_assert_eq!(&out, &data);

            out.fill(0);
            decompress_4x(&mut out, &four_streams, &decode_table).unwrap();
            prop_assert_eq!(&out, &data);
        }
    }

    /// A literals section never exceeds the raw form and always decodes.
    #[test]
    fn prop_literals_never_expand(
        data in prop_oneof![
            prop::collection::vec(any::<u8>(), 0..3000),
            skewed_bytes_strategy(3000),
        ],
        strategy in entropy_strategy(),
    ) {
        let config = EntropyConfig::new(strategy);
        let mut workspace = Workspace::with_default_size();
        let bound = data.len() + raw_header_size(data.len());
        let mut section = vec![0u8; bound];

        let stats = LiteralsEncoder::new()
            .compress(&data, &mut section, &config, &mut workspace)
            .unwrap();
        prop_assert!(stats.output_size <= bound);

        let mut out = vec![0u8; data.len()];
        let (consumed, len) = LiteralsDecoder::new()
            .decompress(&section[..stats.output_size], &mut out)
            .unwrap();
        prop_assert_eq!(consumed, stats.output_size);
        prop_assert_eq!(len, data.len());
        prop_assert_eq!(out, data);
    }

    /// Sequences survive a section round trip at every strategy.
    #[test]
    fn prop_sequences_roundtrip(
        sequences in prop::collection::vec(sequence_strategy(), 0..600),
        strategy in entropy_strategy(),
    ) {
        let config = EntropyConfig::new(strategy);
        let mut workspace = Workspace::with_default_size();
        let mut section = vec![0u8; sequences.len() * 24 + 64];

        let stats = SequencesEncoder::new()
            .compress(&sequences, &mut section, &config, &mut workspace)
            .unwrap();
        // a section under four bytes is withheld; nothing to decode then
        if stats.output_size > 0 {
            let decoded = SequencesDecoder::new()
                .decompress(&section[..stats.output_size])
                .unwrap();
            prop_assert_eq!(decoded, sequences);
        }
    }

    /// Arbitrary bytes are rejected or decoded, never a panic.
    #[test]
    fn prop_decoders_survive_garbage(bytes in prop::collection::vec(any::<u8>(), 0..300)) {
        let mut out = vec![0u8; 1 << 17];
        let _ = LiteralsDecoder::new().decompress(&bytes, &mut out);
        let _ = SequencesDecoder::new().decompress(&bytes);
        let _ = fse::decompress(&bytes, &mut out[..1024], 12);
        let _ = read_weights(&bytes);
    }
}

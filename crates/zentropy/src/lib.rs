//! # Zentropy
//!
//! The entropy stage of Zstandard (RFC 8878) in native Rust: bitstreams,
//! FSE and Huffman coding, and the literals and sequences sections of a
//! compressed block.
//!
//! Match finding, framing and checksums live outside this crate. It
//! consumes the literal bytes and the sequence list an LZ77 stage
//! produced, and hands back section bytes that any Zstandard decoder
//! accepts (and the reverse).
//!
//! ## Features
//!
//! - **Bit-exact**: table construction, normalization and header packing
//!   follow the reference encoder, so output matches it byte for byte
//! - **Repeat tables**: literals and sequence encoders carry their tables
//!   between blocks and reuse them when that is cheaper
//! - **No panics on corrupt input**: every decoder bounds-checks and
//!   reports [`Error::CorruptionDetected`]
//! - **Arena scratch**: section encoders draw their temporaries from a
//!   caller-owned [`Workspace`](workspace::Workspace)
//! - **`parallel` feature**: 4-stream Huffman encoding on `rayon`
//!
//! ## Quick Start
//!
//! ```rust
//! use zentropy::literals::{LiteralsDecoder, LiteralsEncoder};
//! use zentropy::sequences::{Sequence, SequencesDecoder, SequencesEncoder};
//! use zentropy::workspace::Workspace;
//! use zentropy::EntropyConfig;
//!
//! # fn main() -> zentropy::Result<()> {
//! let config = EntropyConfig::default();
//! let mut workspace = Workspace::with_default_size();
//!
//! // literals
//! let literals = b"entropy coding turns skewed byte statistics into short codes. ".repeat(20);
//! let mut section = vec![0u8; literals.len() + 8];
//! let stats = LiteralsEncoder::new().compress(&literals, &mut section, &config, &mut workspace)?;
//! assert!(stats.output_size < literals.len());
//!
//! let mut decoded = vec![0u8; literals.len()];
//! let (consumed, len) = LiteralsDecoder::new().decompress(&section[..stats.output_size], &mut decoded)?;
//! assert_eq!(consumed, stats.output_size);
//! assert_eq!(&decoded[..len], &literals[..]);
//!
//! // sequences
//! let sequences: Vec<Sequence> = (0..100)
//!     .map(|i| Sequence::with_offset(i % 5, 4 + i % 8, 1 + i * 3))
//!     .collect();
//! let mut section = vec![0u8; 1024];
//! let stats = SequencesEncoder::new().compress(&sequences, &mut section, &config, &mut workspace)?;
//! let decoded = SequencesDecoder::new().decompress(&section[..stats.output_size])?;
//! assert_eq!(decoded, sequences);
//! # Ok(())
//! # }
//! ```
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │                         zentropy                            │
//! ├─────────────────────────────────────────────────────────────┤
//! │  literals/           │  sequences/                          │
//! │  ├── compress.rs     │  ├── encode.rs   (type selection)    │
//! │  └── decompress.rs   │  ├── decode.rs                       │
//! │                      │  └── tables.rs   (predefined)        │
//! ├─────────────────────────────────────────────────────────────┤
//! │  huffman/            │  fse/                                │
//! │  ├── encoder.rs      │  ├── normalize.rs                    │
//! │  ├── weights.rs      │  ├── ncount.rs                       │
//! │  ├── table.rs        │  ├── table.rs                        │
//! │  ├── decoder.rs      │  ├── encoder.rs                      │
//! │  └── compress.rs     │  └── decoder.rs                      │
//! ├─────────────────────────────────────────────────────────────┤
//! │  bitstream/  histogram.rs  workspace.rs                     │
//! └─────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## References
//!
//! - [RFC 8878 - Zstandard Compression](https://datatracker.ietf.org/doc/html/rfc8878)
//! - [Zstd Format Specification](https://github.com/facebook/zstd/blob/dev/doc/zstd_compression_format.md)

pub mod bitstream;
pub mod fse;
pub mod histogram;
pub mod huffman;
pub mod literals;
pub mod sequences;
pub mod workspace;

pub use zentropy_core::{
    CompressionRatio, EntropyConfig, Error, LiteralsBlockType, Metrics, RepeatMode, Result,
    SectionKind, SectionStats, Strategy, SymbolEncodingType,
};

pub use histogram::Histogram;
pub use literals::{LiteralsDecoder, LiteralsEncoder};
pub use sequences::{Sequence, SequencesDecoder, SequencesEncoder};
pub use workspace::Workspace;

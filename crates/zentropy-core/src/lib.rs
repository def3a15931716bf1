//! # Zentropy Core
//!
//! Error codes, configuration and shared types for the zentropy entropy
//! coders.
//!
//! ## Contents
//!
//! - [`Error`] / [`Result`]: the fixed error enumeration of the entropy stage
//! - [`EntropyConfig`]: explicit configuration threaded into every encoder
//! - [`Strategy`], [`RepeatMode`]: tuning and table-reuse state
//! - [`LiteralsBlockType`], [`SymbolEncodingType`]: section header tags
//! - [`SectionStats`], [`Metrics`]: per-section accounting

pub mod config;
pub mod error;
pub mod stats;
pub mod types;

pub use config::{EntropyConfig, HUFFMAN_TABLE_LOG_DEFAULT, HUFFMAN_TABLE_LOG_MAX};
pub use error::{Error, Result};
pub use stats::{Metrics, SectionKind, SectionStats};
pub use types::{CompressionRatio, LiteralsBlockType, RepeatMode, Strategy, SymbolEncodingType};

//! Explicit configuration for the entropy stage.
//!
//! There is no process-wide state: every compressor call receives the
//! configuration it should honor.

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};
use crate::types::Strategy;

/// Largest Huffman table log the literals format can describe.
pub const HUFFMAN_TABLE_LOG_MAX: u32 = 12;

/// Default Huffman table log for literals.
pub const HUFFMAN_TABLE_LOG_DEFAULT: u32 = 11;

/// Configuration for literals and sequences encoding.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct EntropyConfig {
    /// Strategy of the enclosing compressor (tunes heuristics only).
    pub strategy: Strategy,

    /// Always store literals raw.
    pub disable_literal_compression: bool,

    /// Sample the input before building a Huffman table.
    pub suspect_uncompressible: bool,

    /// Upper bound on the Huffman table log (default: 11).
    pub huffman_max_table_log: u32,

    /// Allow predefined sequence tables.
    pub default_tables_allowed: bool,
}

impl Default for EntropyConfig {
    fn default() -> Self {
        EntropyConfig {
            strategy: Strategy::default(),
            disable_literal_compression: false,
            suspect_uncompressible: false,
            huffman_max_table_log: HUFFMAN_TABLE_LOG_DEFAULT,
            default_tables_allowed: true,
        }
    }
}

impl EntropyConfig {
    /// Create a configuration for the given strategy.
    pub fn new(strategy: Strategy) -> Self {
        EntropyConfig {
            strategy,
            ..Default::default()
        }
    }

    /// Set the strategy.
    pub fn with_strategy(mut self, strategy: Strategy) -> Self {
        self.strategy = strategy;
        self
    }

    /// Enable or disable literal compression.
    pub fn with_literal_compression(mut self, enabled: bool) -> Self {
        self.disable_literal_compression = !enabled;
        self
    }

    /// Set the suspect-uncompressible hint.
    pub fn with_suspect_uncompressible(mut self, suspect: bool) -> Self {
        self.suspect_uncompressible = suspect;
        self
    }

    /// Set the Huffman table log bound.
    pub fn with_huffman_max_table_log(mut self, log: u32) -> Self {
        self.huffman_max_table_log = log;
        self
    }

    /// Allow or forbid predefined sequence tables.
    pub fn with_default_tables(mut self, allowed: bool) -> Self {
        self.default_tables_allowed = allowed;
        self
    }

    /// Check that every field is within format limits.
    pub fn validate(&self) -> Result<()> {
        if self.huffman_max_table_log > HUFFMAN_TABLE_LOG_MAX {
            return Err(Error::table_log_too_large(
                self.huffman_max_table_log,
                HUFFMAN_TABLE_LOG_MAX,
            ));
        }
        Ok(())
    }

    /// Huffman table log to request, with 0 meaning the default.
    pub fn huffman_table_log(&self) -> u32 {
        if self.huffman_max_table_log == 0 {
            HUFFMAN_TABLE_LOG_DEFAULT
        } else {
            self.huffman_max_table_log
        }
    }
}

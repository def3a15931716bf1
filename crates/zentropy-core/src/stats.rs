//! Statistics for encoded sections.

use crate::types::CompressionRatio;

/// Which section a [`SectionStats`] describes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SectionKind {
    /// Literals section.
    Literals,
    /// Sequences section.
    Sequences,
}

/// Outcome of encoding one section.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SectionStats {
    /// Section encoded.
    pub kind: SectionKind,

    /// Input size (literal bytes, or sequence count).
    pub input_size: usize,

    /// Bytes written, header included.
    pub output_size: usize,

    /// Literals block type, or the packed sequence mode byte.
    pub block_type: u8,
}

impl SectionStats {
    /// Create stats for a literals section.
    pub fn literals(input_size: usize, output_size: usize, block_type: u8) -> Self {
        SectionStats {
            kind: SectionKind::Literals,
            input_size,
            output_size,
            block_type,
        }
    }

    /// Create stats for a sequences section.
    pub fn sequences(nb_seq: usize, output_size: usize, modes: u8) -> Self {
        SectionStats {
            kind: SectionKind::Sequences,
            input_size: nb_seq,
            output_size,
            block_type: modes,
        }
    }

    /// Get compression ratio.
    pub fn ratio(&self) -> CompressionRatio {
        CompressionRatio::new(self.input_size, self.output_size)
    }
}

/// Aggregate counters over many sections.
#[derive(Debug, Clone, Default)]
pub struct Metrics {
    /// Sections encoded.
    pub sections: u64,

    /// Total input bytes.
    pub total_bytes_in: u64,

    /// Total output bytes.
    pub total_bytes_out: u64,

    /// Literals sections stored without entropy coding.
    pub raw_sections: u64,

    /// Sequences sections the encoder declined to emit (`output_size == 0`).
    pub withheld_sections: u64,
}

impl Metrics {
    /// Create new metrics collector.
    pub fn new() -> Self {
        Self::default()
    }

    /// Record an encoded section.
    pub fn record(&mut self, stats: &SectionStats) {
        self.sections += 1;
        self.total_bytes_in += stats.input_size as u64;
        self.total_bytes_out += stats.output_size as u64;
        match stats.kind {
            SectionKind::Literals if stats.block_type == 0 => self.raw_sections += 1,
            SectionKind::Sequences if stats.output_size == 0 => self.withheld_sections += 1,
            _ => {}
        }
    }

    /// Get average compression ratio.
    pub fn average_ratio(&self) -> f64 {
        if self.total_bytes_out == 0 {
            return 1.0;
        }
        self.total_bytes_in as f64 / self.total_bytes_out as f64
    }

    /// Reset all metrics.
    pub fn reset(&mut self) {
        *self = Self::default();
    }
}

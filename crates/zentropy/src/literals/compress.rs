//! Literals section compression.

use zentropy_core::{EntropyConfig, Error, LiteralsBlockType, RepeatMode, Result, SectionStats, Strategy};

use super::{compressed_header_size, LiteralsHeader, LITERALS_MAX};
use crate::huffman::{
    compress_with_workspace, HuffmanOptions, HuffmanRepeat, HuffmanTable, HUF_BUILD_WORKSPACE_SIZE,
};
use crate::workspace::{Phase, Workspace};

/// Compresses literals sections, carrying the Huffman table between
/// blocks.
#[derive(Debug, Clone, Default)]
pub struct LiteralsEncoder {
    prev: HuffmanRepeat,
}

impl LiteralsEncoder {
    /// Create an encoder with no previous table.
    pub fn new() -> Self {
        Self::default()
    }

    /// Install a table the decoder already knows (e.g. from a dictionary).
    pub fn with_table(table: HuffmanTable, mode: RepeatMode) -> Self {
        LiteralsEncoder {
            prev: HuffmanRepeat {
                table: Some(table),
                mode,
            },
        }
    }

    /// Table available for the next block, if any.
    pub fn table(&self) -> Option<&HuffmanTable> {
        self.prev.table.as_ref()
    }

    /// Reuse state of the previous table.
    pub fn repeat_mode(&self) -> RepeatMode {
        self.prev.mode
    }

    /// Override the reuse state of the previous table.
    pub fn set_repeat_mode(&mut self, mode: RepeatMode) {
        self.prev.mode = mode;
    }

    /// Forget the previous table.
    pub fn reset(&mut self) {
        self.prev = HuffmanRepeat::default();
    }

    /// Encode `src` as a literals section into `dst`.
    ///
    /// The section is never larger than the raw form. On return the
    /// encoder holds the table the decoder will have after this section.
    pub fn compress(
        &mut self,
        src: &[u8],
        dst: &mut [u8],
        config: &EntropyConfig,
        workspace: &mut Workspace,
    ) -> Result<SectionStats> {
        config.validate()?;
        if src.len() > LITERALS_MAX {
            return Err(Error::SrcSizeWrong("literals: block above 128 KiB"));
        }
        let size = src.len();
        let strategy = config.strategy;

        if config.disable_literal_compression || size < min_literals_to_compress(strategy, self.prev.mode) {
            return store_raw(src, dst);
        }

        let lh_size = compressed_header_size(size);
        if dst.len() < lh_size + 1 {
            return Err(Error::dst_too_small(lh_size + 1, dst.len()));
        }

        workspace.clear();
        let tree = workspace.try_reserve(Phase::Tables, HUF_BUILD_WORKSPACE_SIZE)?;
        let scratch = workspace.try_reserve(Phase::Buffers, size)?;
        workspace.check()?;

        let mut single_stream = size < 256;
        if self.prev.mode == RepeatMode::Valid && lh_size == 3 {
            single_stream = true;
        }
        let options = HuffmanOptions {
            table_log: config.huffman_table_log(),
            single_stream,
            prefer_repeat: strategy < Strategy::Lazy && size <= 1024,
            suspect_uncompressible: config.suspect_uncompressible,
            ..Default::default()
        };

        let mut next = self.prev.clone();
        let (nodes, out) = workspace.split_mut(tree, scratch)?;
        let result = compress_with_workspace(out, src, &options, &mut next, nodes);
        let block_type = if next.mode != RepeatMode::None {
            LiteralsBlockType::Treeless
        } else {
            LiteralsBlockType::Compressed
        };

        let min_gain = min_gain(size, strategy);
        let c_size = match result {
            Ok(c) if c != 0 && c < size - min_gain && lh_size + c <= dst.len() => c,
            Ok(_) => return store_raw(src, dst),
            Err(e @ Error::WorkSpaceTooSmall { .. }) => return Err(e),
            Err(e) => {
                tracing::debug!(error = %e, "literals: huffman attempt failed, storing raw");
                return store_raw(src, dst);
            }
        };
        if c_size == 1 && (size >= 8 || src.iter().all(|&b| b == src[0])) {
            return store_rle(src, dst);
        }

        if block_type == LiteralsBlockType::Compressed {
            next.mode = RepeatMode::Check;
        }
        let header = LiteralsHeader::huffman(block_type, size, c_size, single_stream);
        header.write(dst)?;
        dst[lh_size..lh_size + c_size].copy_from_slice(&workspace.slice(scratch)[..c_size]);
        self.prev = next;

        tracing::debug!(
            size,
            compressed = c_size,
            ?block_type,
            single_stream,
            "literals: huffman section"
        );
        Ok(SectionStats::literals(size, lh_size + c_size, block_type.field()))
    }
}

/// Smallest literal count worth a Huffman attempt.
pub(crate) fn min_literals_to_compress(strategy: Strategy, mode: RepeatMode) -> usize {
    if mode == RepeatMode::Valid {
        return 6;
    }
    let shift = (9 - strategy.to_level()).min(3);
    8 << shift
}

/// Bytes a Huffman section must save over raw storage.
pub(crate) fn min_gain(size: usize, strategy: Strategy) -> usize {
    let min_log = if strategy >= Strategy::BtUltra {
        strategy.to_level() - 1
    } else {
        6
    };
    (size >> min_log) + 2
}

fn store_raw(src: &[u8], dst: &mut [u8]) -> Result<SectionStats> {
    let header = LiteralsHeader::raw(src.len());
    let total = header.section_size();
    if total > dst.len() {
        return Err(Error::dst_too_small(total, dst.len()));
    }
    let h = header.write(dst)?;
    dst[h..total].copy_from_slice(src);
    tracing::trace!(size = src.len(), "literals: raw section");
    Ok(SectionStats::literals(src.len(), total, LiteralsBlockType::Raw.field()))
}

fn store_rle(src: &[u8], dst: &mut [u8]) -> Result<SectionStats> {
    let header = LiteralsHeader::rle(src.len());
    let total = header.section_size();
    if total > dst.len() {
        return Err(Error::dst_too_small(total, dst.len()));
    }
    let h = header.write(dst)?;
    dst[h] = src[0];
    tracing::trace!(size = src.len(), "literals: rle section");
    Ok(SectionStats::literals(src.len(), total, LiteralsBlockType::Rle.field()))
}

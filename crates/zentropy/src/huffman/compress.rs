//! Whole-block Huffman compression with table reuse.

use zentropy_core::{Error, RepeatMode, Result};

use super::encoder::{flattened_counts, HuffmanTable, HUF_BUILD_WORKSPACE_SIZE};
use super::weights::write_table;
use super::{HUF_BLOCKSIZE_MAX, HUF_SYMBOLVALUE_MAX, HUF_TABLELOG_DEFAULT, HUF_TABLELOG_MAX};
use crate::fse::optimal_table_log_internal;
use crate::histogram::Histogram;

const SUSPECT_UNCOMPRESSIBLE_SAMPLE_SIZE: usize = 4096;
const SUSPECT_UNCOMPRESSIBLE_SAMPLE_RATIO: usize = 10;

/// Table carried from the previous block.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct HuffmanRepeat {
    /// Previous table, if any.
    pub table: Option<HuffmanTable>,
    /// How far `table` can be trusted.
    pub mode: RepeatMode,
}

/// Options for [`compress_with_repeat`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct HuffmanOptions {
    /// Highest symbol value (0 selects 255).
    pub max_symbol: u32,
    /// Table log bound (0 selects the default).
    pub table_log: u32,
    /// Encode one stream instead of four.
    pub single_stream: bool,
    /// Use a reusable previous table without building a new one.
    pub prefer_repeat: bool,
    /// Sample the head and tail of large inputs before counting.
    pub suspect_uncompressible: bool,
}

impl Default for HuffmanOptions {
    fn default() -> Self {
        HuffmanOptions {
            max_symbol: HUF_SYMBOLVALUE_MAX,
            table_log: HUF_TABLELOG_DEFAULT,
            single_stream: false,
            prefer_repeat: false,
            suspect_uncompressible: false,
        }
    }
}

/// Compress `src` into `dst` as a table description plus 1 or 4 streams,
/// or as payload only when the previous table is reused.
///
/// Returns 0 when the input is not worth compressing and 1 when it is a
/// single repeated byte (written to `dst[0]`). When a new table is built
/// it replaces `repeat.table` and `repeat.mode` becomes `None`; a
/// `repeat.mode` other than `None` on return means the previous table was
/// used and no description was written.
pub fn compress_with_repeat(
    dst: &mut [u8],
    src: &[u8],
    options: &HuffmanOptions,
    repeat: &mut HuffmanRepeat,
) -> Result<usize> {
    let mut scratch = [0u8; HUF_BUILD_WORKSPACE_SIZE];
    compress_with_workspace(dst, src, options, repeat, &mut scratch)
}

/// [`compress_with_repeat`] building the tree in `scratch`, which must
/// hold at least [`HUF_BUILD_WORKSPACE_SIZE`] bytes.
pub fn compress_with_workspace(
    dst: &mut [u8],
    src: &[u8],
    options: &HuffmanOptions,
    repeat: &mut HuffmanRepeat,
    scratch: &mut [u8],
) -> Result<usize> {
    if scratch.len() < HUF_BUILD_WORKSPACE_SIZE {
        return Err(Error::workspace_too_small(HUF_BUILD_WORKSPACE_SIZE, scratch.len()));
    }
    if src.is_empty() || dst.is_empty() {
        return Ok(0);
    }
    if src.len() > HUF_BLOCKSIZE_MAX {
        return Err(Error::SrcSizeWrong("huffman: block above 128 KiB"));
    }
    if options.table_log > HUF_TABLELOG_MAX {
        return Err(Error::table_log_too_large(options.table_log, HUF_TABLELOG_MAX));
    }
    if options.max_symbol > HUF_SYMBOLVALUE_MAX {
        return Err(Error::MaxSymbolValueTooLarge {
            value: options.max_symbol,
            max: HUF_SYMBOLVALUE_MAX,
        });
    }
    let max_symbol = if options.max_symbol == 0 {
        HUF_SYMBOLVALUE_MAX
    } else {
        options.max_symbol
    };
    let table_log = if options.table_log == 0 {
        HUF_TABLELOG_DEFAULT
    } else {
        options.table_log
    };

    if repeat.table.is_none() {
        repeat.mode = RepeatMode::None;
    }
    if options.prefer_repeat && repeat.mode == RepeatMode::Valid {
        if let Some(old) = &repeat.table {
            return Ok(compress_payload(dst, 0, src, options.single_stream, old));
        }
    }

    let sample_threshold = SUSPECT_UNCOMPRESSIBLE_SAMPLE_SIZE * SUSPECT_UNCOMPRESSIBLE_SAMPLE_RATIO;
    if options.suspect_uncompressible && src.len() >= sample_threshold {
        let head = Histogram::count(&src[..SUSPECT_UNCOMPRESSIBLE_SAMPLE_SIZE], max_symbol)?;
        let tail = Histogram::count(
            &src[src.len() - SUSPECT_UNCOMPRESSIBLE_SAMPLE_SIZE..],
            max_symbol,
        )?;
        let largest_total = head.largest as usize + tail.largest as usize;
        if largest_total <= ((2 * SUSPECT_UNCOMPRESSIBLE_SAMPLE_SIZE) >> 7) + 4 {
            tracing::trace!(size = src.len(), "huffman: sampled input looks uncompressible");
            return Ok(0);
        }
    }

    let histogram = Histogram::count(src, max_symbol)?;
    if histogram.largest as usize == src.len() {
        dst[0] = src[0];
        return Ok(1);
    }
    if histogram.largest as usize <= (src.len() >> 7) + 4 {
        return Ok(0);
    }
    let counts = histogram.as_slice();

    if repeat.mode == RepeatMode::Check {
        let usable = repeat.table.as_ref().is_some_and(|old| old.validate(counts));
        if !usable {
            repeat.mode = RepeatMode::None;
        }
    }
    if options.prefer_repeat && repeat.mode != RepeatMode::None {
        if let Some(old) = &repeat.table {
            return Ok(compress_payload(dst, 0, src, options.single_stream, old));
        }
    }

    let huff_log = optimal_table_log_internal(table_log, src.len(), histogram.max_symbol, 1);
    let mut table = HuffmanTable::build_with_workspace(counts, huff_log, scratch)?;
    if table.is_flat() {
        table = HuffmanTable::build_with_workspace(&flattened_counts(counts), huff_log, scratch)?;
    }

    let header_size = write_table(dst, &table)?;
    if repeat.mode != RepeatMode::None {
        if let Some(old) = &repeat.table {
            let old_size = old.estimate_compressed_size(counts);
            let new_size = table.estimate_compressed_size(counts);
            if old_size <= header_size + new_size || header_size + 12 >= src.len() {
                return Ok(compress_payload(dst, 0, src, options.single_stream, old));
            }
        }
    }

    if header_size + 12 >= src.len() {
        return Ok(0);
    }
    tracing::trace!(
        table_log = table.max_nb_bits(),
        header_size,
        "huffman: built new table"
    );
    let size = compress_payload(dst, header_size, src, options.single_stream, &table);
    repeat.mode = RepeatMode::None;
    repeat.table = Some(table);
    Ok(size)
}

/// Encode the streams after `header_size` bytes already in `dst`.
/// Returns the total size, or 0 when there is no gain.
fn compress_payload(
    dst: &mut [u8],
    header_size: usize,
    src: &[u8],
    single_stream: bool,
    table: &HuffmanTable,
) -> usize {
    let out = &mut dst[header_size..];
    let payload = if single_stream {
        table.compress_1x(out, src)
    } else {
        table.compress_4x(out, src)
    };
    if payload == 0 {
        return 0;
    }
    let total = header_size + payload;
    if total >= src.len() - 1 {
        return 0;
    }
    total
}

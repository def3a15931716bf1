//! Huffman table construction and encoding.
//!
//! Code lengths come from a classic Huffman tree built over symbols sorted
//! by decreasing count, then limited to the requested maximum depth by
//! pushing the deepest leaves up and repaying the Kraft debt with the
//! cheapest shallower leaves. Codes are canonical: within one length,
//! values increase with the symbol value, and longer codes take the
//! smallest values.

#[cfg(feature = "parallel")]
use rayon::prelude::*;

use zentropy_core::{Error, Result};

use super::{HUF_SYMBOLVALUE_MAX, HUF_TABLELOG_DEFAULT, HUF_TABLELOG_MAX};
use crate::bitstream::{highbit32, BitWriter};

/// Index of the first internal node.
const STARTNODE: isize = HUF_SYMBOLVALUE_MAX as isize + 1;
/// Leaves, internal nodes and the leading sentinel.
const NODE_COUNT: usize = 2 * (HUF_SYMBOLVALUE_MAX as usize + 1) + 1;
/// Packed node: count (8 bytes), parent (2), symbol (1), depth (1).
const NODE_SIZE: usize = 12;
const NO_SYMBOL: u32 = 0xF0F0_F0F0;

/// Scratch bytes needed by [`HuffmanTable::build_with_workspace`].
pub const HUF_BUILD_WORKSPACE_SIZE: usize = NODE_COUNT * NODE_SIZE;

/// Sort buckets: one per count below the cutoff, then one per power of two.
const RANK_POSITION_TABLE_SIZE: usize = 192;
const RANK_POSITION_LOG_BUCKETS_BEGIN: usize = RANK_POSITION_TABLE_SIZE - 1 - 32 - 1;
/// `LOG_BUCKETS_BEGIN + highbit32(LOG_BUCKETS_BEGIN)`
const RANK_POSITION_DISTINCT_COUNT_CUTOFF: usize = RANK_POSITION_LOG_BUCKETS_BEGIN + 7;
const INSERTION_SORT_THRESHOLD: isize = 8;

/// One symbol's code.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct HuffmanCode {
    /// Code value, `nb_bits` wide.
    pub value: u16,
    /// Code length; 0 for absent symbols.
    pub nb_bits: u8,
}

#[derive(Debug, Clone, Copy, Default)]
struct Node {
    count: u64,
    parent: u16,
    byte: u8,
    nb_bits: u8,
}

/// Tree nodes packed into caller scratch, addressed from -1 (the sentinel).
struct Nodes<'a>(&'a mut [u8]);

impl Nodes<'_> {
    #[inline]
    fn offset(i: isize) -> usize {
        (i + 1) as usize * NODE_SIZE
    }

    fn get(&self, i: isize) -> Node {
        let at = Self::offset(i);
        let b = &self.0[at..at + NODE_SIZE];
        let mut count = [0u8; 8];
        count.copy_from_slice(&b[..8]);
        Node {
            count: u64::from_le_bytes(count),
            parent: u16::from_le_bytes([b[8], b[9]]),
            byte: b[10],
            nb_bits: b[11],
        }
    }

    fn set(&mut self, i: isize, node: Node) {
        let at = Self::offset(i);
        let b = &mut self.0[at..at + NODE_SIZE];
        b[..8].copy_from_slice(&node.count.to_le_bytes());
        b[8..10].copy_from_slice(&node.parent.to_le_bytes());
        b[10] = node.byte;
        b[11] = node.nb_bits;
    }

    #[inline]
    fn count(&self, i: isize) -> u64 {
        self.get(i).count
    }

    #[inline]
    fn set_count(&mut self, i: isize, count: u64) {
        let at = Self::offset(i);
        self.0[at..at + 8].copy_from_slice(&count.to_le_bytes());
    }

    #[inline]
    fn parent(&self, i: isize) -> isize {
        let at = Self::offset(i) + 8;
        u16::from_le_bytes([self.0[at], self.0[at + 1]]) as isize
    }

    #[inline]
    fn set_parent(&mut self, i: isize, parent: isize) {
        let at = Self::offset(i) + 8;
        self.0[at..at + 2].copy_from_slice(&(parent as u16).to_le_bytes());
    }

    #[inline]
    fn byte(&self, i: isize) -> u8 {
        self.0[Self::offset(i) + 10]
    }

    #[inline]
    fn nb_bits(&self, i: isize) -> u32 {
        u32::from(self.0[Self::offset(i) + 11])
    }

    #[inline]
    fn set_nb_bits(&mut self, i: isize, nb_bits: u32) {
        self.0[Self::offset(i) + 11] = nb_bits as u8;
    }

    fn swap(&mut self, a: isize, b: isize) {
        let (na, nb) = (self.get(a), self.get(b));
        self.set(a, nb);
        self.set(b, na);
    }
}

/// Huffman encoding table.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HuffmanTable {
    codes: [HuffmanCode; HUF_SYMBOLVALUE_MAX as usize + 1],
    max_symbol: u32,
    pub(crate) max_nb_bits: u32,
}

impl HuffmanTable {
    /// Build a length-limited canonical code from `counts`
    /// (indexed by symbol, length `max_symbol + 1`).
    ///
    /// `max_nb_bits == 0` selects the default limit. At least two symbols
    /// must be present. The tree is built in a stack buffer; use
    /// [`build_with_workspace`](Self::build_with_workspace) to supply it.
    pub fn build(counts: &[u32], max_nb_bits: u32) -> Result<Self> {
        let mut scratch = [0u8; HUF_BUILD_WORKSPACE_SIZE];
        Self::build_with_workspace(counts, max_nb_bits, &mut scratch)
    }

    /// Like [`build`](Self::build), with the tree nodes kept in `scratch`
    /// (at least [`HUF_BUILD_WORKSPACE_SIZE`] bytes).
    pub fn build_with_workspace(counts: &[u32], max_nb_bits: u32, scratch: &mut [u8]) -> Result<Self> {
        if scratch.len() < HUF_BUILD_WORKSPACE_SIZE {
            return Err(Error::workspace_too_small(HUF_BUILD_WORKSPACE_SIZE, scratch.len()));
        }
        let max_nb_bits = if max_nb_bits == 0 {
            HUF_TABLELOG_DEFAULT
        } else {
            max_nb_bits
        };
        if counts.is_empty() || counts.len() > HUF_SYMBOLVALUE_MAX as usize + 1 {
            return Err(Error::MaxSymbolValueTooLarge {
                value: counts.len().saturating_sub(1) as u32,
                max: HUF_SYMBOLVALUE_MAX,
            });
        }
        if max_nb_bits > HUF_TABLELOG_MAX {
            return Err(Error::table_log_too_large(max_nb_bits, HUF_TABLELOG_MAX));
        }
        if counts.iter().filter(|&&c| c != 0).count() < 2 {
            return Err(Error::Generic("huffman: fewer than two symbols"));
        }

        let scratch = &mut scratch[..HUF_BUILD_WORKSPACE_SIZE];
        scratch.fill(0);
        let mut nodes = Nodes(scratch);
        sort_nodes(&mut nodes, counts);
        let non_null_rank = build_tree(&mut nodes, counts.len() as isize - 1);
        let max_nb_bits = set_max_height(&mut nodes, non_null_rank, max_nb_bits);
        if max_nb_bits > HUF_TABLELOG_MAX {
            return Err(Error::Generic("huffman: code longer than table log limit"));
        }

        // canonical values: start of each rank, longest codes first
        let mut nb_per_rank = [0u16; HUF_TABLELOG_MAX as usize + 1];
        let mut val_per_rank = [0u16; HUF_TABLELOG_MAX as usize + 1];
        for n in 0..=non_null_rank {
            nb_per_rank[nodes.nb_bits(n) as usize] += 1;
        }
        let mut min = 0u16;
        for n in (1..=max_nb_bits as usize).rev() {
            val_per_rank[n] = min;
            min += nb_per_rank[n];
            min >>= 1;
        }

        let mut codes = [HuffmanCode::default(); HUF_SYMBOLVALUE_MAX as usize + 1];
        for n in 0..counts.len() as isize {
            codes[nodes.byte(n) as usize].nb_bits = nodes.nb_bits(n) as u8;
        }
        for code in codes[..counts.len()].iter_mut() {
            let rank = code.nb_bits as usize;
            code.value = val_per_rank[rank];
            val_per_rank[rank] = val_per_rank[rank].wrapping_add(1);
        }

        Ok(HuffmanTable {
            codes,
            max_symbol: (counts.len() - 1) as u32,
            max_nb_bits,
        })
    }

    /// Codes of symbols `0..=max_symbol`.
    #[inline]
    pub(crate) fn codes(&self) -> &[HuffmanCode] {
        &self.codes[..=self.max_symbol as usize]
    }

    /// Longest code length, which is also the table log.
    #[inline]
    pub fn max_nb_bits(&self) -> u32 {
        self.max_nb_bits
    }

    /// Highest symbol covered by the table.
    #[inline]
    pub fn max_symbol(&self) -> u32 {
        self.max_symbol
    }

    /// Code of `symbol`.
    #[inline]
    pub fn code(&self, symbol: u8) -> HuffmanCode {
        self.codes().get(symbol as usize).copied().unwrap_or_default()
    }

    /// Every byte value present with the same 8-bit code.
    ///
    /// Such a table has a weight list of 255 identical entries, which
    /// neither weight encoding can describe.
    pub fn is_flat(&self) -> bool {
        self.max_nb_bits == 8
            && self.max_symbol == HUF_SYMBOLVALUE_MAX
            && self.codes.iter().all(|c| c.nb_bits == 8)
    }

    /// Payload size in bytes for `counts`, headers and padding excluded.
    pub fn estimate_compressed_size(&self, counts: &[u32]) -> usize {
        let bits: usize = counts
            .iter()
            .zip(self.codes())
            .map(|(&count, code)| count as usize * code.nb_bits as usize)
            .sum();
        bits >> 3
    }

    /// True when every symbol present in `counts` has a code.
    pub fn validate(&self, counts: &[u32]) -> bool {
        if counts.len() > self.max_symbol as usize + 1 {
            return false;
        }
        counts
            .iter()
            .zip(self.codes())
            .all(|(&count, code)| count == 0 || code.nb_bits != 0)
    }

    #[inline]
    fn encode_symbol(&self, writer: &mut BitWriter<'_>, symbol: u8) {
        let code = self.codes[symbol as usize];
        writer.add_bits_fast(u64::from(code.value), u32::from(code.nb_bits));
    }

    /// Encode `src` as a single stream.
    ///
    /// Returns 0 when the stream does not fit in `dst`.
    pub fn compress_1x(&self, dst: &mut [u8], src: &[u8]) -> usize {
        if dst.len() < 8 {
            return 0;
        }
        let Ok(mut writer) = BitWriter::new(dst) else {
            return 0;
        };

        let mut n = src.len() & !3;
        let tail = &src[n..];
        for &symbol in tail.iter().rev() {
            self.encode_symbol(&mut writer, symbol);
        }
        writer.flush_bits();

        while n > 0 {
            self.encode_symbol(&mut writer, src[n - 1]);
            self.encode_symbol(&mut writer, src[n - 2]);
            self.encode_symbol(&mut writer, src[n - 3]);
            self.encode_symbol(&mut writer, src[n - 4]);
            writer.flush_bits();
            n -= 4;
        }
        writer.close().unwrap_or(0)
    }

    /// Encode `src` as four streams behind a 6-byte jump table.
    ///
    /// Returns 0 when the input is too small to benefit or any stream
    /// does not fit.
    pub fn compress_4x(&self, dst: &mut [u8], src: &[u8]) -> usize {
        if dst.len() < 6 + 1 + 1 + 1 + 8 || src.len() < 12 {
            return 0;
        }
        let segment_size = (src.len() + 3) / 4;

        #[cfg(feature = "parallel")]
        if let Some(size) = self.compress_4x_parallel(dst, src, segment_size) {
            return size;
        }

        let mut op = 6;
        for (i, segment) in src.chunks(segment_size).enumerate() {
            let c_size = self.compress_1x(&mut dst[op..], segment);
            if c_size == 0 || c_size > 65535 {
                return 0;
            }
            if i < 3 {
                dst[2 * i..2 * i + 2].copy_from_slice(&(c_size as u16).to_le_bytes());
            }
            op += c_size;
        }
        op
    }

    /// Encode the four segments concurrently. Falls back (`None`) whenever
    /// the sequential path could behave differently near the end of `dst`.
    #[cfg(feature = "parallel")]
    fn compress_4x_parallel(&self, dst: &mut [u8], src: &[u8], segment_size: usize) -> Option<usize> {
        let capacity = dst.len() - 6;
        let segments: Vec<&[u8]> = src.chunks(segment_size).collect();
        let streams: Vec<Vec<u8>> = segments
            .par_iter()
            .map(|segment| {
                let mut buf = vec![0u8; capacity];
                let size = self.compress_1x(&mut buf, segment);
                buf.truncate(size);
                buf
            })
            .collect();

        let total: usize = streams.iter().map(Vec::len).sum();
        if streams.len() != 4 || streams.iter().any(|s| s.is_empty() || s.len() > 65535) {
            return None;
        }
        // the last flush needs a full register of slack in the sequential writer
        if total + 6 + 8 >= dst.len() {
            return None;
        }

        let mut op = 6;
        for (i, stream) in streams.iter().enumerate() {
            if i < 3 {
                dst[2 * i..2 * i + 2].copy_from_slice(&(stream.len() as u16).to_le_bytes());
            }
            dst[op..op + stream.len()].copy_from_slice(stream);
            op += stream.len();
        }
        Some(op)
    }
}

/// Sort bucket of a count.
#[inline]
fn rank_index(count: u32) -> usize {
    if (count as usize) < RANK_POSITION_DISTINCT_COUNT_CUTOFF {
        count as usize
    } else {
        highbit32(count) as usize + RANK_POSITION_LOG_BUCKETS_BEGIN
    }
}

/// Lay out one node per symbol, sorted by decreasing count.
///
/// Counts below the cutoff get a bucket each and keep ascending symbol
/// order. Larger counts share one bucket per power of two, which is then
/// quicksorted; equal counts there do not keep symbol order.
fn sort_nodes(nodes: &mut Nodes<'_>, counts: &[u32]) {
    let mut base = [0u16; RANK_POSITION_TABLE_SIZE];
    let mut curr = [0u16; RANK_POSITION_TABLE_SIZE];
    for &count in counts {
        base[rank_index(count)] += 1;
    }
    for n in (1..RANK_POSITION_TABLE_SIZE).rev() {
        base[n - 1] += base[n];
        curr[n - 1] = base[n - 1];
    }
    for (symbol, &count) in counts.iter().enumerate() {
        let rank = rank_index(count) + 1;
        let pos = curr[rank];
        curr[rank] += 1;
        nodes.set(
            pos as isize,
            Node {
                count: u64::from(count),
                parent: 0,
                byte: symbol as u8,
                nb_bits: 0,
            },
        );
    }
    for n in RANK_POSITION_DISTINCT_COUNT_CUTOFF..RANK_POSITION_TABLE_SIZE - 1 {
        let start = base[n] as isize;
        let size = curr[n] as isize - start;
        if size > 1 {
            quick_sort(nodes, start, start + size - 1);
        }
    }
}

/// Descending insertion sort of `low..=high`.
fn insertion_sort(nodes: &mut Nodes<'_>, low: isize, high: isize) {
    for i in low + 1..=high {
        let key = nodes.get(i);
        let mut j = i - 1;
        while j >= low && nodes.count(j) < key.count {
            let moved = nodes.get(j);
            nodes.set(j + 1, moved);
            j -= 1;
        }
        nodes.set(j + 1, key);
    }
}

/// Partition around the last node; larger counts go left.
fn partition(nodes: &mut Nodes<'_>, low: isize, high: isize) -> isize {
    let pivot = nodes.count(high);
    let mut i = low - 1;
    for j in low..high {
        if nodes.count(j) > pivot {
            i += 1;
            nodes.swap(i, j);
        }
    }
    nodes.swap(i + 1, high);
    i + 1
}

/// Descending quicksort of `low..=high`, recursing into the smaller side.
fn quick_sort(nodes: &mut Nodes<'_>, mut low: isize, mut high: isize) {
    if high - low < INSERTION_SORT_THRESHOLD {
        insertion_sort(nodes, low, high);
        return;
    }
    while low < high {
        let pivot = partition(nodes, low, high);
        if pivot - low < high - pivot {
            quick_sort(nodes, low, pivot - 1);
            low = pivot + 1;
        } else {
            quick_sort(nodes, pivot + 1, high);
            high = pivot - 1;
        }
    }
}

/// Build an unlimited-depth tree. Returns the index of the last leaf
/// with a non-zero count.
fn build_tree(nodes: &mut Nodes<'_>, max_symbol: isize) -> isize {
    let mut non_null_rank = max_symbol;
    while nodes.count(non_null_rank) == 0 {
        non_null_rank -= 1;
    }

    let mut low_s = non_null_rank;
    let node_root = STARTNODE + low_s - 1;
    let mut low_n = STARTNODE;
    let mut node_nb = STARTNODE;

    nodes.set_count(node_nb, nodes.count(low_s) + nodes.count(low_s - 1));
    nodes.set_parent(low_s, node_nb);
    nodes.set_parent(low_s - 1, node_nb);
    node_nb += 1;
    low_s -= 2;
    for n in node_nb..=node_root {
        nodes.set_count(n, 1 << 62);
    }
    nodes.set_count(-1, 1 << 63);

    while node_nb <= node_root {
        let n1 = if nodes.count(low_s) < nodes.count(low_n) {
            low_s -= 1;
            low_s + 1
        } else {
            low_n += 1;
            low_n - 1
        };
        let n2 = if nodes.count(low_s) < nodes.count(low_n) {
            low_s -= 1;
            low_s + 1
        } else {
            low_n += 1;
            low_n - 1
        };
        nodes.set_count(node_nb, nodes.count(n1) + nodes.count(n2));
        nodes.set_parent(n1, node_nb);
        nodes.set_parent(n2, node_nb);
        node_nb += 1;
    }

    nodes.set_nb_bits(node_root, 0);
    for n in (STARTNODE..node_root).rev() {
        let depth = nodes.nb_bits(nodes.parent(n)) + 1;
        nodes.set_nb_bits(n, depth);
    }
    for n in 0..=non_null_rank {
        let depth = nodes.nb_bits(nodes.parent(n)) + 1;
        nodes.set_nb_bits(n, depth);
    }
    non_null_rank
}

/// Limit every code to `target_nb_bits`. Returns the resulting maximum.
fn set_max_height(nodes: &mut Nodes<'_>, last_non_null: isize, target_nb_bits: u32) -> u32 {
    let largest_bits = nodes.nb_bits(last_non_null);
    if largest_bits <= target_nb_bits {
        return largest_bits;
    }

    let mut total_cost: i64 = 0;
    let base_cost: i64 = 1 << (largest_bits - target_nb_bits);
    let mut n = last_non_null;

    while nodes.nb_bits(n) > target_nb_bits {
        total_cost += base_cost - (1i64 << (largest_bits - nodes.nb_bits(n)));
        nodes.set_nb_bits(n, target_nb_bits);
        n -= 1;
    }
    while nodes.nb_bits(n) == target_nb_bits {
        n -= 1;
    }

    // renormalize from 2^largest_bits to 2^target_nb_bits
    total_cost >>= largest_bits - target_nb_bits;

    // last (smallest count) position of each rank below the target
    let mut rank_last = [NO_SYMBOL; HUF_TABLELOG_MAX as usize + 2];
    {
        let mut current_nb_bits = target_nb_bits;
        let mut pos = n;
        while pos >= 0 {
            let nb = nodes.nb_bits(pos);
            if nb < current_nb_bits {
                current_nb_bits = nb;
                rank_last[(target_nb_bits - current_nb_bits) as usize] = pos as u32;
            }
            pos -= 1;
        }
    }

    while total_cost > 0 {
        let mut nb_bits_to_decrease = highbit32(total_cost as u32) + 1;
        while nb_bits_to_decrease > 1 {
            let high_pos = rank_last[nb_bits_to_decrease as usize];
            let low_pos = rank_last[nb_bits_to_decrease as usize - 1];
            if high_pos == NO_SYMBOL {
                nb_bits_to_decrease -= 1;
                continue;
            }
            if low_pos == NO_SYMBOL {
                break;
            }
            let high_total = nodes.count(high_pos as isize);
            let low_total = 2 * nodes.count(low_pos as isize);
            if high_total <= low_total {
                break;
            }
            nb_bits_to_decrease -= 1;
        }
        while nb_bits_to_decrease <= HUF_TABLELOG_MAX
            && rank_last[nb_bits_to_decrease as usize] == NO_SYMBOL
        {
            nb_bits_to_decrease += 1;
        }

        let rank = nb_bits_to_decrease as usize;
        total_cost -= 1 << (nb_bits_to_decrease - 1);
        let promoted = rank_last[rank] as isize;
        nodes.set_nb_bits(promoted, nodes.nb_bits(promoted) + 1);

        if rank_last[rank - 1] == NO_SYMBOL {
            rank_last[rank - 1] = rank_last[rank];
        }
        if rank_last[rank] == 0 {
            rank_last[rank] = NO_SYMBOL;
        } else {
            rank_last[rank] -= 1;
            let nb = nodes.nb_bits(rank_last[rank] as isize);
            if nb != target_nb_bits.wrapping_sub(nb_bits_to_decrease) {
                rank_last[rank] = NO_SYMBOL;
            }
        }
    }

    // overshoot: move the largest leaves of the deepest rank back up
    while total_cost < 0 {
        if rank_last[1] == NO_SYMBOL {
            while nodes.nb_bits(n) == target_nb_bits {
                n -= 1;
            }
            nodes.set_nb_bits(n + 1, nodes.nb_bits(n + 1) - 1);
            rank_last[1] = (n + 1) as u32;
            total_cost += 1;
            continue;
        }
        let pos = rank_last[1] as isize + 1;
        nodes.set_nb_bits(pos, nodes.nb_bits(pos) - 1);
        rank_last[1] += 1;
        total_cost += 1;
    }

    target_nb_bits
}

/// Counts reshaped so the code has one 7-bit, two 9-bit and otherwise
/// 8-bit lengths. Used when every byte value would get an 8-bit code.
pub(crate) fn flattened_counts(counts: &[u32]) -> Vec<u32> {
    let mut order: Vec<usize> = (0..counts.len()).collect();
    order.sort_by(|&a, &b| counts[b].cmp(&counts[a]));
    let mut flat = vec![2u32; counts.len()];
    if let Some(&first) = order.first() {
        flat[first] = 4;
    }
    for &last in order.iter().rev().take(2) {
        flat[last] = 1;
    }
    flat
}

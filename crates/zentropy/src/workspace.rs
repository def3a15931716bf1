//! Workspace arena for section compression.
//!
//! One contiguous buffer is carved into regions in a fixed phase order:
//!
//! ```text
//! [ objects | tables | aligned (64-byte) | buffers | free ]
//! ```
//!
//! Reservations bump a single cursor, so a phase cannot be reopened once a
//! later one has started. A failed reservation sets a sticky flag that
//! only [`Workspace::reset`] clears; callers check it once, after
//! reserving everything they need.
//!
//! ## Usage
//!
//! ```
//! use zentropy::workspace::{Phase, Workspace};
//!
//! let mut ws = Workspace::new(4096);
//! let codes = ws.reserve(Phase::Tables, 300).unwrap();
//! let scratch = ws.reserve(Phase::Buffers, 1024).unwrap();
//! ws.slice_mut(codes).fill(0);
//! assert_eq!(ws.slice(scratch).len(), 1024);
//!
//! // tables and buffers are released between blocks
//! ws.clear();
//! ```

use zentropy_core::{Error, Result};

use crate::huffman::HUF_BUILD_WORKSPACE_SIZE;
use crate::sequences::SEQUENCES_SPREAD_SIZE;

/// Default workspace size (enough for one full block).
pub const DEFAULT_WORKSPACE_SIZE: usize = 256 * 1024;

/// Alignment of the aligned phase.
pub const WORKSPACE_ALIGNMENT: usize = 64;

/// Reservation phase, in the order regions are laid out.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum Phase {
    /// Long-lived objects, kept across [`Workspace::clear`].
    Objects,
    /// Per-block tables.
    Tables,
    /// 64-byte aligned per-block data.
    Aligned,
    /// Per-block scratch buffers.
    Buffers,
}

/// Handle to a reserved byte range.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Region {
    offset: usize,
    len: usize,
}

impl Region {
    /// Length in bytes.
    #[inline]
    pub fn len(&self) -> usize {
        self.len
    }

    /// True for a zero-length region.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.len == 0
    }
}

/// Bump arena with phase ordering.
#[derive(Debug)]
pub struct Workspace {
    buffer: Vec<u8>,
    pos: usize,
    objects_end: usize,
    phase: Phase,
    reserve_failed: bool,
    peak_usage: usize,
}

impl Workspace {
    /// Create a workspace of `capacity` bytes.
    pub fn new(capacity: usize) -> Self {
        Workspace {
            buffer: vec![0; capacity],
            pos: 0,
            objects_end: 0,
            phase: Phase::Objects,
            reserve_failed: false,
            peak_usage: 0,
        }
    }

    /// Create a workspace of [`DEFAULT_WORKSPACE_SIZE`] bytes.
    pub fn with_default_size() -> Self {
        Self::new(DEFAULT_WORKSPACE_SIZE)
    }

    /// Bytes needed to compress one block with `block_size` literal bytes
    /// and up to `nb_seq` sequences.
    pub fn bound(block_size: usize, nb_seq: usize) -> usize {
        let literals = HUF_BUILD_WORKSPACE_SIZE + block_size;
        let sequences = 3 * nb_seq + SEQUENCES_SPREAD_SIZE;
        literals.max(sequences) + WORKSPACE_ALIGNMENT
    }

    /// Reserve `len` bytes in `phase`.
    ///
    /// Returns `None`, and sets the sticky failure flag, when the
    /// workspace is full or `phase` precedes the current phase.
    pub fn reserve(&mut self, phase: Phase, len: usize) -> Option<Region> {
        if phase < self.phase {
            tracing::debug!(?phase, current = ?self.phase, "workspace phase out of order");
            self.reserve_failed = true;
            return None;
        }
        let mut start = self.pos;
        let mut len = len;
        if phase == Phase::Aligned {
            start = start.next_multiple_of(WORKSPACE_ALIGNMENT);
            len = len.next_multiple_of(WORKSPACE_ALIGNMENT);
        }
        let end = match start.checked_add(len) {
            Some(end) if end <= self.buffer.len() => end,
            _ => {
                tracing::debug!(requested = len, remaining = self.remaining(), "workspace exhausted");
                self.reserve_failed = true;
                return None;
            }
        };

        self.phase = phase;
        self.pos = end;
        if phase == Phase::Objects {
            self.objects_end = end;
        }
        self.peak_usage = self.peak_usage.max(end);
        Some(Region { offset: start, len })
    }

    /// Like [`reserve`](Self::reserve), reporting failure as an error.
    pub fn try_reserve(&mut self, phase: Phase, len: usize) -> Result<Region> {
        let remaining = self.remaining();
        self.reserve(phase, len)
            .ok_or_else(|| Error::workspace_too_small(len, remaining))
    }

    /// Borrow a region.
    #[inline]
    pub fn slice(&self, region: Region) -> &[u8] {
        &self.buffer[region.offset..region.offset + region.len]
    }

    /// Borrow a region mutably.
    #[inline]
    pub fn slice_mut(&mut self, region: Region) -> &mut [u8] {
        &mut self.buffer[region.offset..region.offset + region.len]
    }

    /// Borrow two regions at once. `first` must end before `second` starts.
    pub fn split_mut(&mut self, first: Region, second: Region) -> Result<(&mut [u8], &mut [u8])> {
        if first.offset + first.len > second.offset {
            return Err(Error::Generic("workspace: overlapping regions"));
        }
        let (head, tail) = self.buffer.split_at_mut(second.offset);
        Ok((
            &mut head[first.offset..first.offset + first.len],
            &mut tail[..second.len],
        ))
    }

    /// Release tables and buffers, keeping objects. The failure flag is
    /// kept.
    pub fn clear(&mut self) {
        self.pos = self.objects_end;
        self.phase = Phase::Tables;
    }

    /// Release everything and clear the failure flag.
    pub fn reset(&mut self) {
        self.pos = 0;
        self.objects_end = 0;
        self.phase = Phase::Objects;
        self.reserve_failed = false;
    }

    /// True if any reservation failed since the last [`reset`](Self::reset).
    #[inline]
    pub fn reserve_failed(&self) -> bool {
        self.reserve_failed
    }

    /// Fail with [`Error::WorkSpaceTooSmall`] if any reservation failed.
    pub fn check(&self) -> Result<()> {
        if self.reserve_failed {
            return Err(Error::workspace_too_small(self.peak_usage, self.buffer.len()));
        }
        Ok(())
    }

    /// Current phase.
    #[inline]
    pub fn phase(&self) -> Phase {
        self.phase
    }

    /// Bytes currently reserved.
    #[inline]
    pub fn usage(&self) -> usize {
        self.pos
    }

    /// Total capacity.
    #[inline]
    pub fn capacity(&self) -> usize {
        self.buffer.len()
    }

    /// Bytes still available.
    #[inline]
    pub fn remaining(&self) -> usize {
        self.buffer.len().saturating_sub(self.pos)
    }

    /// Highest usage seen.
    #[inline]
    pub fn peak_usage(&self) -> usize {
        self.peak_usage
    }
}

impl Default for Workspace {
    fn default() -> Self {
        Self::with_default_size()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_workspace_creation() {
        let ws = Workspace::new(1024);
        assert_eq!(ws.capacity(), 1024);
        assert_eq!(ws.usage(), 0);
        assert_eq!(ws.remaining(), 1024);
        assert!(!ws.reserve_failed());
    }

    #[test]
    fn test_phase_order() {
        let mut ws = Workspace::new(1024);
        let obj = ws.reserve(Phase::Objects, 10).unwrap();
        let table = ws.reserve(Phase::Tables, 100).unwrap();
        assert_eq!(ws.slice(obj).len(), 10);
        assert_eq!(ws.slice(table).len(), 100);

        let buf = ws.reserve(Phase::Buffers, 50).unwrap();
        assert_eq!(buf.len(), 50);
        assert!(ws.reserve(Phase::Tables, 1).is_none());
        assert!(ws.reserve_failed());
    }

    #[test]
    fn test_aligned_phase() {
        let mut ws = Workspace::new(1024);
        ws.reserve(Phase::Tables, 3).unwrap();
        let aligned = ws.reserve(Phase::Aligned, 10).unwrap();
        assert_eq!(aligned.offset % WORKSPACE_ALIGNMENT, 0);
        assert_eq!(aligned.len(), WORKSPACE_ALIGNMENT);
        assert_eq!(ws.usage(), 2 * WORKSPACE_ALIGNMENT);
    }

    #[test]
    fn test_overflow_is_sticky() {
        let mut ws = Workspace::new(100);
        assert!(ws.reserve(Phase::Buffers, 50).is_some());
        assert!(ws.reserve(Phase::Buffers, 60).is_none());
        assert_eq!(ws.usage(), 50);
        assert!(matches!(ws.check(), Err(Error::WorkSpaceTooSmall { .. })));

        ws.clear();
        assert!(ws.reserve_failed());
        ws.reset();
        assert!(!ws.reserve_failed());
        assert!(ws.check().is_ok());
    }

    #[test]
    fn test_clear_keeps_objects() {
        let mut ws = Workspace::new(256);
        let obj = ws.reserve(Phase::Objects, 16).unwrap();
        ws.slice_mut(obj).fill(0xAB);
        ws.reserve(Phase::Buffers, 100).unwrap();

        ws.clear();
        assert_eq!(ws.usage(), 16);
        assert_eq!(ws.phase(), Phase::Tables);
        assert!(ws.slice(obj).iter().all(|&b| b == 0xAB));
        assert!(ws.reserve(Phase::Objects, 1).is_none());
        assert_eq!(ws.peak_usage(), 116);
    }

    #[test]
    fn test_split_mut() {
        let mut ws = Workspace::new(256);
        let table = ws.reserve(Phase::Tables, 16).unwrap();
        let buf = ws.reserve(Phase::Buffers, 32).unwrap();
        let (a, b) = ws.split_mut(table, buf).unwrap();
        a.fill(1);
        b.fill(2);
        assert_eq!((a.len(), b.len()), (16, 32));
        assert!(ws.slice(table).iter().all(|&x| x == 1));
        assert!(ws.split_mut(buf, table).is_err());
    }

    #[test]
    fn test_bound_covers_both_sections() {
        let bound = Workspace::bound(1000, 100);
        assert!(bound >= HUF_BUILD_WORKSPACE_SIZE + 1000);
        assert!(bound >= 300 + SEQUENCES_SPREAD_SIZE);
    }

    #[test]
    fn test_try_reserve_error() {
        let mut ws = Workspace::new(8);
        let err = ws.try_reserve(Phase::Buffers, 9).unwrap_err();
        assert!(err.is_capacity());
    }
}

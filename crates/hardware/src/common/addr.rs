//! Addresses, block alignment, and address ranges.
//!
//! This module defines the address vocabulary shared by the cache, its ports,
//! and the backing memory. It provides:
//! 1. **Addresses:** A plain byte address type used as the key of the block store.
//! 2. **Alignment:** Helpers for truncating an address to its block boundary.
//! 3. **Ranges:** Half-open address ranges published by memory-side endpoints.

use std::fmt;

/// A byte address in the simulated physical address space.
pub type Addr = u64;

/// Truncates `addr` to the start of its enclosing block.
///
/// # Arguments
///
/// * `addr` - Byte address to align.
/// * `block_size` - Block size in bytes; must be a power of two.
///
/// # Returns
///
/// The block-aligned address.
#[inline(always)]
pub const fn block_align(addr: Addr, block_size: usize) -> Addr {
    addr & !(block_size as u64 - 1)
}

/// Returns the byte offset of `addr` within its enclosing block.
#[inline(always)]
pub const fn block_offset(addr: Addr, block_size: usize) -> usize {
    (addr & (block_size as u64 - 1)) as usize
}

/// A half-open range of addresses `[start, end)`.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct AddrRange {
    /// First address covered by the range.
    pub start: Addr,
    /// One past the last address covered by the range.
    pub end: Addr,
}

impl AddrRange {
    /// Creates a range covering `size` bytes starting at `start`.
    pub const fn with_size(start: Addr, size: u64) -> Self {
        Self {
            start,
            end: start + size,
        }
    }

    /// Number of bytes covered by the range.
    pub const fn size(&self) -> u64 {
        self.end - self.start
    }

    /// Returns `true` if `addr` falls inside the range.
    pub const fn contains(&self, addr: Addr) -> bool {
        addr >= self.start && addr < self.end
    }

    /// Returns `true` if the whole span `[addr, addr + len)` falls inside the range.
    pub const fn contains_span(&self, addr: Addr, len: usize) -> bool {
        match addr.checked_add(len as u64) {
            Some(end) => addr >= self.start && end <= self.end,
            None => false,
        }
    }
}

impl fmt::Display for AddrRange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{:#x}, {:#x})", self.start, self.end)
    }
}

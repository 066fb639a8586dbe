//! Block storage.
//!
//! A capacity-bounded map from aligned block address to the block's bytes. Keys
//! are kept sorted so that victim selection by index is reproducible.

use std::collections::BTreeMap;
use std::fmt;

use crate::common::addr::Addr;
use crate::common::error::ProtocolError;

/// One block of cached data.
#[derive(Clone, PartialEq, Eq)]
pub struct CacheLine(Box<[u8]>);

impl CacheLine {
    /// Creates a zero-filled line.
    pub fn zeroed(block_size: usize) -> Self {
        Self(vec![0; block_size].into_boxed_slice())
    }

    /// Creates a line holding `data`.
    pub fn from_bytes(data: impl Into<Vec<u8>>) -> Self {
        Self(data.into().into_boxed_slice())
    }

    /// Line contents.
    pub fn bytes(&self) -> &[u8] {
        &self.0
    }

    /// Mutable line contents.
    pub fn bytes_mut(&mut self) -> &mut [u8] {
        &mut self.0
    }

    /// Consumes the line and returns its bytes.
    pub fn into_vec(self) -> Vec<u8> {
        self.0.into_vec()
    }
}

impl fmt::Debug for CacheLine {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "CacheLine({} bytes)", self.0.len())
    }
}

/// Resident blocks, keyed by aligned block address.
#[derive(Clone, Debug)]
pub struct BlockStore {
    lines: BTreeMap<Addr, CacheLine>,
    capacity: usize,
    block_size: usize,
}

impl BlockStore {
    /// Creates an empty store holding at most `capacity` blocks of `block_size` bytes.
    pub const fn new(capacity: usize, block_size: usize) -> Self {
        Self {
            lines: BTreeMap::new(),
            capacity,
            block_size,
        }
    }

    /// Number of resident blocks.
    pub fn len(&self) -> usize {
        self.lines.len()
    }

    /// Returns `true` if no blocks are resident.
    pub fn is_empty(&self) -> bool {
        self.lines.is_empty()
    }

    /// Maximum number of resident blocks.
    pub const fn capacity(&self) -> usize {
        self.capacity
    }

    /// Bytes per block.
    pub const fn block_size(&self) -> usize {
        self.block_size
    }

    /// Returns `true` if one more insertion needs an eviction first.
    pub fn is_full(&self) -> bool {
        self.lines.len() >= self.capacity
    }

    /// Returns `true` if the block at `addr` is resident.
    pub fn contains(&self, addr: Addr) -> bool {
        self.lines.contains_key(&addr)
    }

    /// Resident line at `addr`.
    pub fn get(&self, addr: Addr) -> Option<&CacheLine> {
        self.lines.get(&addr)
    }

    /// Mutable resident line at `addr`.
    pub fn get_mut(&mut self, addr: Addr) -> Option<&mut CacheLine> {
        self.lines.get_mut(&addr)
    }

    /// Inserts a line at `addr`. The caller evicts first when the store is full.
    ///
    /// # Errors
    ///
    /// `DuplicateBlock` if `addr` is already resident.
    pub fn insert(&mut self, addr: Addr, line: CacheLine) -> Result<(), ProtocolError> {
        if self.lines.contains_key(&addr) {
            return Err(ProtocolError::DuplicateBlock { addr });
        }
        debug_assert!(self.lines.len() < self.capacity, "insert into full store");
        let _ = self.lines.insert(addr, line);
        Ok(())
    }

    /// Removes and returns the line at `addr`.
    pub fn remove(&mut self, addr: Addr) -> Option<CacheLine> {
        self.lines.remove(&addr)
    }

    /// Address of the `index`-th resident block in ascending address order.
    pub fn nth_addr(&self, index: usize) -> Option<Addr> {
        self.lines.keys().nth(index).copied()
    }

    /// Resident block addresses in ascending order.
    pub fn addrs(&self) -> impl Iterator<Item = Addr> + '_ {
        self.lines.keys().copied()
    }
}

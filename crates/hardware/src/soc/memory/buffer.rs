//! Sparse Memory Buffer.
//!
//! Backing bytes for the simulated memory. Pages are allocated on first write, so a
//! large address range costs host memory only for the parts a run touches.
//! Unwritten bytes read as zero.

use std::collections::BTreeMap;
use std::fmt;

use crate::common::addr::Addr;

/// Allocation granule in bytes.
pub const PAGE_SIZE: usize = 4096;

/// Lazily allocated byte storage addressed by absolute address.
#[derive(Clone, Default)]
pub struct SparseBuffer {
    pages: BTreeMap<Addr, Box<[u8]>>,
}

impl SparseBuffer {
    /// Creates an empty buffer.
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of pages allocated so far.
    pub fn allocated_pages(&self) -> usize {
        self.pages.len()
    }

    /// Splits `[addr, addr + len)` into per-page `(page, offset, len)` pieces.
    ///
    /// A span running past the top of the address space stops at `Addr::MAX`.
    fn chunks(addr: Addr, len: usize) -> impl Iterator<Item = (Addr, usize, usize)> {
        let mut cur = addr;
        let end = addr.checked_add(len as u64).unwrap_or(Addr::MAX);
        std::iter::from_fn(move || {
            if cur >= end {
                return None;
            }
            let page = cur & !(PAGE_SIZE as u64 - 1);
            let offset = (cur - page) as usize;
            let n = (PAGE_SIZE - offset).min((end - cur) as usize);
            cur += n as u64;
            Some((page, offset, n))
        })
    }

    /// Fills `buf` with the bytes at `addr`.
    pub fn read_slice(&self, addr: Addr, buf: &mut [u8]) {
        let mut done = 0;
        for (page, offset, n) in Self::chunks(addr, buf.len()) {
            let dest = &mut buf[done..done + n];
            match self.pages.get(&page) {
                Some(bytes) => dest.copy_from_slice(&bytes[offset..offset + n]),
                None => dest.fill(0),
            }
            done += n;
        }
    }

    /// Writes `data` at `addr`.
    pub fn write_slice(&mut self, addr: Addr, data: &[u8]) {
        let mut done = 0;
        for (page, offset, n) in Self::chunks(addr, data.len()) {
            let bytes = self
                .pages
                .entry(page)
                .or_insert_with(|| vec![0; PAGE_SIZE].into_boxed_slice());
            bytes[offset..offset + n].copy_from_slice(&data[done..done + n]);
            done += n;
        }
    }
}

impl fmt::Debug for SparseBuffer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SparseBuffer")
            .field("pages", &self.pages.len())
            .finish()
    }
}

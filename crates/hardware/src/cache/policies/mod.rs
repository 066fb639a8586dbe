//! Cache Replacement Policies.
//!
//! Selects which resident block to evict when an insertion finds the store full.
//!
//! # Policies
//!
//! - `Random`: uniform choice over the resident blocks.

/// Random replacement policy.
pub mod random;

pub use random::RandomPolicy;

use super::store::BlockStore;
use crate::common::addr::Addr;

/// Trait for cache replacement policies.
pub trait ReplacementPolicy {
    /// Notes an access to the block at `addr`.
    ///
    /// Policies without recency state ignore it.
    fn touch(&mut self, _addr: Addr) {}

    /// Selects a victim among the blocks resident in `store`.
    ///
    /// # Returns
    ///
    /// The victim's block address, or `None` if the store is empty.
    fn victim(&mut self, store: &BlockStore) -> Option<Addr>;
}

//! Random Replacement Policy.
//!
//! Evicts a block chosen uniformly at random among all resident blocks. The
//! draw indexes the store's ascending address order, so a seeded generator
//! reproduces the same victims for the same access sequence.

use rand::rngs::StdRng;
use rand::{Rng, RngCore, SeedableRng};

use super::ReplacementPolicy;
use crate::cache::store::BlockStore;
use crate::common::addr::Addr;

/// Random Policy state.
#[derive(Debug)]
pub struct RandomPolicy<R = StdRng> {
    rng: R,
}

impl RandomPolicy<StdRng> {
    /// Creates a policy driven by a `StdRng` seeded with `seed`.
    pub fn seeded(seed: u64) -> Self {
        Self::new(StdRng::seed_from_u64(seed))
    }
}

impl<R: RngCore> RandomPolicy<R> {
    /// Creates a policy driven by `rng`.
    pub const fn new(rng: R) -> Self {
        Self { rng }
    }
}

impl<R: RngCore> ReplacementPolicy for RandomPolicy<R> {
    fn victim(&mut self, store: &BlockStore) -> Option<Addr> {
        if store.is_empty() {
            return None;
        }
        let index = self.rng.gen_range(0..store.len());
        store.nth_addr(index)
    }
}

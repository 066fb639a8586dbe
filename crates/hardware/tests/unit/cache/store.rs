//! Block Store and Replacement Policy Tests.
//!
//! Verifies duplicate detection, ordered enumeration, and seeded random
//! victim selection in isolation from the controller.

use proptest::prelude::*;
use rand::SeedableRng;
use rand::rngs::StdRng;

use cachesim_core::cache::policies::{RandomPolicy, ReplacementPolicy};
use cachesim_core::cache::store::{BlockStore, CacheLine};
use cachesim_core::common::ProtocolError;

// ══════════════════════════════════════════════════════════
// 1. BlockStore
// ══════════════════════════════════════════════════════════

#[test]
fn duplicate_insert_is_rejected() {
    let mut store = BlockStore::new(2, 64);
    assert!(store.insert(0x40, CacheLine::zeroed(64)).is_ok());
    assert_eq!(
        store.insert(0x40, CacheLine::zeroed(64)),
        Err(ProtocolError::DuplicateBlock { addr: 0x40 })
    );
    assert_eq!(store.len(), 1);
}

#[test]
fn addresses_enumerate_in_ascending_order() {
    let mut store = BlockStore::new(4, 64);
    for addr in [0x300, 0x40, 0x1000, 0x0] {
        assert!(store.insert(addr, CacheLine::zeroed(64)).is_ok());
    }
    assert_eq!(store.addrs().collect::<Vec<_>>(), vec![0x0, 0x40, 0x300, 0x1000]);
    assert_eq!(store.nth_addr(2), Some(0x300));
    assert_eq!(store.nth_addr(4), None);
    assert!(store.is_full());
}

#[test]
fn removed_line_keeps_its_bytes() {
    let mut store = BlockStore::new(1, 4);
    assert!(store.insert(0x8, CacheLine::from_bytes(vec![1, 2, 3, 4])).is_ok());
    store.get_mut(0x8).unwrap().bytes_mut()[0] = 9;
    let line = store.remove(0x8).unwrap();
    assert_eq!(line.into_vec(), vec![9, 2, 3, 4]);
    assert!(store.is_empty());
}

// ══════════════════════════════════════════════════════════
// 2. RandomPolicy
// ══════════════════════════════════════════════════════════

#[test]
fn victim_is_always_resident() {
    let mut store = BlockStore::new(3, 64);
    for addr in [0x80, 0x200, 0x4000] {
        assert!(store.insert(addr, CacheLine::zeroed(64)).is_ok());
    }
    let mut policy = RandomPolicy::new(StdRng::seed_from_u64(3));
    for _ in 0..64 {
        let victim = policy.victim(&store).unwrap();
        assert!(store.contains(victim));
    }
}

proptest! {
    /// Evicting a policy-chosen victim before every insert never exceeds capacity.
    #[test]
    fn evict_then_insert_respects_capacity(
        capacity in 1usize..8,
        blocks in prop::collection::vec(0u64..32, 1..64),
        seed in any::<u64>(),
    ) {
        let mut store = BlockStore::new(capacity, 64);
        let mut policy = RandomPolicy::seeded(seed);
        for block in blocks {
            let addr = block * 64;
            if store.contains(addr) {
                continue;
            }
            if store.is_full() {
                let victim = policy.victim(&store).unwrap();
                prop_assert!(store.remove(victim).is_some());
            }
            prop_assert!(store.insert(addr, CacheLine::zeroed(64)).is_ok());
            prop_assert!(store.len() <= capacity);
        }
    }
}

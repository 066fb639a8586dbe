//! Randomized Cache Properties.
//!
//! Drives random access sequences through a four-block cache and checks it
//! against a flat reference memory: reads always return the latest written
//! bytes, the store never exceeds its capacity, every timing access is counted
//! exactly once, and nothing written is lost through eviction.

use proptest::prelude::*;

use cachesim_core::soc::packet::Request;

use crate::common::harness::{CacheHarness, small_config};

const BLOCKS: u64 = 8;
const BLOCK_SIZE: usize = 64;

#[derive(Clone, Debug)]
enum Op {
    Read { addr: u64, size: usize },
    Write { addr: u64, data: Vec<u8> },
}

fn op() -> impl Strategy<Value = Op> {
    let read = (0..BLOCKS, 0..BLOCK_SIZE)
        .prop_flat_map(|(block, offset)| {
            (Just(block * 64 + offset as u64), 1..=BLOCK_SIZE - offset)
        })
        .prop_map(|(addr, size)| Op::Read { addr, size });
    let write = (0..BLOCKS, 0..BLOCK_SIZE)
        .prop_flat_map(|(block, offset)| {
            (
                Just(block * 64 + offset as u64),
                prop::collection::vec(any::<u8>(), 1..=BLOCK_SIZE - offset),
            )
        })
        .prop_map(|(addr, data)| Op::Write { addr, data });
    prop_oneof![read, write]
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(64))]

    #[test]
    fn cache_agrees_with_flat_memory(
        ops in prop::collection::vec(op(), 1..48),
        seed in any::<u64>(),
    ) {
        let config = small_config();
        let capacity = config.capacity();
        let mut h = CacheHarness::with_seed(&config, seed);
        let mut reference = vec![0u8; BLOCKS as usize * BLOCK_SIZE];

        for op in &ops {
            match op {
                Op::Read { addr, size } => {
                    let got = h.read(*addr, *size);
                    let start = *addr as usize;
                    prop_assert_eq!(got.as_slice(), &reference[start..start + size]);
                }
                Op::Write { addr, data } => {
                    h.write(*addr, data);
                    let start = *addr as usize;
                    reference[start..start + data.len()].copy_from_slice(data);
                }
            }
            prop_assert!(h.cache.store().len() <= capacity);
        }

        prop_assert_eq!(h.cache.stats().accesses(), ops.len() as u64);

        // Every byte is either resident or was written back.
        for block in 0..BLOCKS {
            let addr = block * 64;
            let resp = h.cache.recv_functional(Request::read(addr, BLOCK_SIZE)).unwrap();
            let start = addr as usize;
            prop_assert_eq!(resp.data(), &reference[start..start + BLOCK_SIZE]);
        }
    }
}

//! Functional Access and Address Range Tests.
//!
//! Functional accesses complete immediately: served from a resident block when
//! present, otherwise passed through to memory. They never change timing state
//! or statistics.

use pretty_assertions::assert_eq;

use cachesim_core::cache::{CachePeers, CacheState};
use cachesim_core::common::{AddrRange, ProtocolError};
use cachesim_core::config::CacheConfig;
use cachesim_core::soc::packet::{MemCmd, Request, RespCmd};
use cachesim_core::soc::traits::ResponsePeer;

use crate::common::harness::{CacheHarness, MEMORY_SIZE, small_config};

#[test]
fn functional_read_of_absent_block_reaches_memory() {
    let mut h = CacheHarness::new(&small_config());
    h.memory.fill_with(0x200, 8, |i| 0x10 + i as u8);

    let resp = h.cache.recv_functional(Request::read(0x200, 8)).unwrap();

    assert_eq!(resp.cmd(), RespCmd::ReadResp);
    assert_eq!(resp.data(), h.memory.bytes(0x200, 8).as_slice());
    assert_eq!(h.memory.functional_count(), 1);
    assert!(h.memory.received().is_empty());
    assert!(h.cache.store().is_empty());
    assert_eq!(h.cache.stats().accesses(), 0);
}

#[test]
fn functional_write_to_resident_block_stays_in_cache() {
    let mut h = CacheHarness::new(&small_config());
    let _ = h.read(0x40, 4);
    let stats = h.cache.stats().clone();

    let resp = h.cache.recv_functional(Request::write(0x44, vec![7, 7])).unwrap();

    assert_eq!(resp.cmd(), RespCmd::WriteResp);
    assert_eq!(&h.line(0x40).unwrap()[4..6], &[7, 7]);
    assert_eq!(h.memory.bytes(0x44, 2), vec![0, 0]);
    assert_eq!(h.memory.functional_count(), 0);
    assert_eq!(h.cache.stats(), &stats);
}

/// Functional accesses are served even while a timing request is in flight.
#[test]
fn functional_access_ignores_timing_state() {
    let mut h = CacheHarness::new(&small_config());
    assert!(h.send(0, Request::read(0, 4)).is_ok());

    assert!(h.cache.recv_functional(Request::read(0x100, 4)).is_ok());

    assert_eq!(h.cache.state(), CacheState::AccessPending);
}

#[test]
fn functional_writeback_is_rejected() {
    let mut h = CacheHarness::new(&small_config());
    assert_eq!(
        h.cache.recv_functional(Request::writeback(0, vec![0; 64])),
        Err(ProtocolError::UnexpectedCommand {
            cmd: MemCmd::WritebackDirty
        })
    );
}

#[test]
fn address_ranges_are_memorys() {
    let h = CacheHarness::new(&small_config());
    assert_eq!(
        h.cache.addr_ranges(),
        vec![AddrRange::with_size(0, MEMORY_SIZE as u64)]
    );
}

#[test]
fn range_change_reaches_every_requester() {
    let config = CacheConfig {
        cpu_side_ports: 3,
        ..small_config()
    };
    let mut h = CacheHarness::new(&config);

    h.cache.recv_range_change();

    assert!(h.cpus.iter().all(|cpu| cpu.range_changes() == 1));
}

#[test]
fn peers_debug_reports_port_count() {
    let h = CacheHarness::new(&CacheConfig {
        cpu_side_ports: 2,
        ..small_config()
    });
    let peers = CachePeers {
        mem_side: Box::new(h.memory.clone()),
        cpu_side: h
            .cpus
            .iter()
            .map(|cpu| Box::new(cpu.clone()) as Box<dyn ResponsePeer>)
            .collect(),
    };

    assert_eq!(format!("{peers:?}"), "CachePeers { cpu_side: 2, .. }");
}

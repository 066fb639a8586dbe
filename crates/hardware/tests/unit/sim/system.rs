//! System Tests.
//!
//! End-to-end runs of requesters, cache, and memory on one event queue.
//! Configurations are small so the exact tick of every step can be checked.

use pretty_assertions::assert_eq;

use cachesim_core::common::{ProtocolError, SimError};
use cachesim_core::config::{CacheConfig, Config, MemoryConfig, SimConfig};
use cachesim_core::sim::requester::TraceOp;
use cachesim_core::sim::system::RunSummary;
use cachesim_core::soc::memory::AccessRecord;
use cachesim_core::soc::packet::{MemCmd, Request};
use cachesim_core::System;

use crate::common::init_tracing;

/// One-cycle access latency at 1000 ticks per cycle, 5000-tick memory.
fn config(blocks: usize, ports: usize, queue_depth: usize) -> Config {
    init_tracing();
    Config {
        cache: CacheConfig {
            access_latency: 1,
            block_size: 64,
            size_bytes: blocks * 64,
            cpu_side_ports: ports,
            clock_period: 1000,
        },
        memory: MemoryConfig {
            base: 0,
            size_bytes: 1 << 20,
            latency: 5000,
            queue_depth,
        },
        sim: SimConfig::default(),
    }
}

fn record(tick: u64, cmd: MemCmd, addr: u64, size: usize) -> AccessRecord {
    AccessRecord {
        tick,
        cmd,
        addr,
        size,
    }
}

#[test]
fn write_then_read_returns_merged_block() {
    let trace = vec![
        TraceOp::write(0x4, vec![1, 2, 3, 4]),
        TraceOp::read(0x0, 8).after(100),
    ];
    let mut system = System::new(&config(4, 1, 16), trace).unwrap();

    let summary = system.run().unwrap();

    assert_eq!(
        summary,
        RunSummary {
            end_tick: 8000,
            completed: 2,
            pending: 0
        }
    );
    let done = system.requesters()[0].completed();
    assert_eq!(done[0].completed, 6000);
    assert_eq!(done[1].issued, 6100);
    assert_eq!(done[1].completed, 8000);
    assert_eq!(done[1].data, vec![0, 0, 0, 0, 1, 2, 3, 4]);

    assert_eq!(
        system.memory().accepted(),
        vec![record(1000, MemCmd::ReadReq, 0, 64)]
    );
    assert_eq!(system.cache().stats().hits, 1);
    assert_eq!(system.cache().stats().misses, 1);
    assert!(system.cache().is_drained());
}

/// Two ports issuing at the same tick are served one at a time.
#[test]
fn contending_ports_are_serialized() {
    let trace = vec![
        TraceOp::read(0x0, 4),
        TraceOp::read(0x1000, 4).on_port(1),
    ];
    let mut system = System::new(&config(4, 2, 16), trace).unwrap();

    let summary = system.run().unwrap();

    assert_eq!(summary.completed, 2);
    let first = &system.requesters()[0].completed()[0];
    let second = &system.requesters()[1].completed()[0];
    assert_eq!(first.completed, 6000);
    assert_eq!(second.issued, 0);
    assert_eq!(second.completed, 12_000);
    assert_eq!(second.index, 1);
}

/// A full memory queue refuses the fetch; it is resent when the writeback's slot frees.
#[test]
fn memory_backpressure_delays_fetch_until_retry() {
    let trace = vec![
        TraceOp::read(0x00, 4),
        TraceOp::read(0x40, 4),
        TraceOp::read(0x80, 4),
    ];
    let mut system = System::new(&config(1, 1, 1), trace).unwrap();

    let summary = system.run().unwrap();

    assert_eq!(summary.completed, 3);
    assert_eq!(summary.end_tick, 22_000);
    assert_eq!(
        system.memory().accepted(),
        vec![
            record(1000, MemCmd::ReadReq, 0x00, 64),
            record(7000, MemCmd::ReadReq, 0x40, 64),
            record(12_000, MemCmd::WritebackDirty, 0x00, 64),
            record(17_000, MemCmd::ReadReq, 0x80, 64),
            record(22_000, MemCmd::WritebackDirty, 0x40, 64),
        ]
    );
}

/// Data written in the cache reaches memory when its block is evicted.
#[test]
fn evicted_writes_reach_memory() {
    let trace = vec![
        TraceOp::write(0x10, vec![9; 4]),
        TraceOp::read(0x40, 4),
    ];
    let mut system = System::new(&config(1, 1, 16), trace).unwrap();

    let _ = system.run().unwrap();

    assert_eq!(system.memory().peek(0x10, 4), vec![9; 4]);
    assert!(system.cache().store().contains(0x40));
}

#[test]
fn functional_read_after_run_sees_cached_write() {
    let trace = vec![TraceOp::write(0x20, vec![5, 6])];
    let mut system = System::new(&config(4, 1, 16), trace).unwrap();
    let _ = system.run().unwrap();

    let resp = system
        .cache_mut()
        .recv_functional(Request::read(0x20, 2))
        .unwrap();

    assert_eq!(resp.data(), &[5, 6]);
    assert_eq!(system.memory().peek(0x20, 2), vec![0, 0]);
}

#[test]
fn max_tick_stops_early() {
    let mut cfg = config(4, 1, 16);
    cfg.sim.max_tick = Some(3000);
    let mut system = System::new(&cfg, vec![TraceOp::read(0, 4)]).unwrap();

    let summary = system.run().unwrap();

    assert_eq!(summary.completed, 0);
    assert_eq!(summary.pending, 1);
    assert!(summary.end_tick <= 3000);
}

#[test]
fn op_on_missing_port_is_rejected() {
    let err = System::new(&config(4, 1, 16), vec![TraceOp::read(0, 4).on_port(2)]).unwrap_err();
    assert!(matches!(err, SimError::Trace { index: 0, .. }), "{err}");
}

#[test]
fn protocol_violation_stops_the_run() {
    let mut system = System::new(&config(4, 1, 16), vec![TraceOp::read(0x3e, 4)]).unwrap();

    let err = system.run().unwrap_err();

    assert!(matches!(
        err,
        SimError::Protocol(ProtocolError::SpansBlocks { addr: 0x3e, .. })
    ));
}

#[test]
fn op_at_top_of_address_space_is_rejected() {
    let err = System::new(
        &Config::default(),
        vec![TraceOp::read(0xFFFF_FFFF_FFFF_FFF0, 4)],
    )
    .unwrap_err();

    assert!(matches!(
        err,
        SimError::Protocol(ProtocolError::OutOfRange {
            addr: 0xFFFF_FFFF_FFFF_FFF0,
            size: 4
        })
    ));
}

#[test]
fn op_beyond_memory_is_rejected() {
    let trace = vec![
        TraceOp::write(0x4000_0000_0000, vec![7; 4]),
        TraceOp::read(0x4000_0000_0000, 4),
    ];

    let err = System::new(&Config::default(), trace).unwrap_err();

    assert!(matches!(
        err,
        SimError::Protocol(ProtocolError::OutOfRange {
            addr: 0x4000_0000_0000,
            size: 4
        })
    ));
}

#[test]
fn op_straddling_memory_end_is_rejected() {
    // Memory is 1 MiB; the last four bytes start 2 bytes before its end.
    let err = System::new(&config(4, 1, 16), vec![TraceOp::read((1 << 20) - 2, 4)]).unwrap_err();
    assert!(matches!(
        err,
        SimError::Protocol(ProtocolError::OutOfRange { .. })
    ));
}

#[test]
fn functional_access_beyond_memory_is_an_error() {
    let mut system = System::new(&config(4, 1, 16), Vec::new()).unwrap();

    let err = system
        .cache_mut()
        .recv_functional(Request::read(0x4000_0000_0000, 4))
        .unwrap_err();

    assert_eq!(
        err,
        ProtocolError::OutOfRange {
            addr: 0x4000_0000_0000,
            size: 4
        }
    );
}

#[test]
fn empty_trace_runs_to_tick_zero() {
    let mut system = System::new(&config(4, 1, 16), Vec::new()).unwrap();
    let summary = system.run().unwrap();
    assert_eq!(summary.end_tick, 0);
    assert_eq!(summary.completed, 0);
}

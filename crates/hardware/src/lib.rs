//! Blocking cache simulator library.
//!
//! This crate models a single blocking write-back cache between trace-driven
//! requesters and a fixed-latency memory, with the following:
//! 1. **Cache:** Single-flight controller with access latency, sub-block upgrades,
//!    random replacement, and dirty writebacks.
//! 2. **Ports:** Flow-controlled endpoints with one blocked packet and retry handshakes.
//! 3. **Memory:** Sparse backing store with a bounded request queue.
//! 4. **Simulation:** Event queue, clocking, trace loading, configuration, and statistics.

/// Blocking cache controller, block storage, and replacement policies.
pub mod cache;
/// Common types (addresses, ranges, errors).
pub mod common;
/// Simulator configuration (defaults and JSON structures).
pub mod config;
/// Event queue, requesters, trace loader, and the assembled system.
pub mod sim;
/// Packets, ports, peer traits, and the backing memory.
pub mod soc;
/// Cache statistics collection and reporting.
pub mod stats;

/// Root configuration type; use `Config::default()` or load from JSON.
pub use crate::config::Config;
/// The cache controller; construct with `SimpleCache::new`.
pub use crate::cache::SimpleCache;
/// Top-level system (queue, requesters, cache, memory); construct with `System::new`.
pub use crate::sim::System;

//! Blocking Write-Back Cache.
//!
//! This module implements a single-block-granularity cache that sits between any
//! number of requesters and one backing memory. It models:
//! 1. **Access latency:** Every accepted request waits `access_latency` cycles before
//!    it resolves as hit or miss.
//! 2. **Blocking:** One request is in flight at a time; others are refused and
//!    retried once the cache frees up.
//! 3. **Upgrades:** Misses that are not whole-block accesses fetch the whole block
//!    and replay the original access against it.
//! 4. **Eviction:** A full cache evicts a victim chosen by the replacement policy and
//!    writes it back before inserting the refill.
//!
//! Storage is fully associative: blocks are keyed by aligned address with no set
//! structure.

/// Replacement policies.
pub mod policies;

/// Resident block storage.
pub mod store;

use std::fmt;
use std::fmt::Write as _;
use std::rc::Rc;

use tracing::{debug, trace, warn};

use self::policies::ReplacementPolicy;
use self::store::{BlockStore, CacheLine};
use crate::common::addr::{Addr, AddrRange, block_align};
use crate::common::error::{ConfigError, ProtocolError};
use crate::config::CacheConfig;
use crate::sim::event::{ClockDomain, Scheduler, Tick};
use crate::soc::packet::{MemCmd, Request, Response};
use crate::soc::port::{CpuSidePort, MemSidePort};
use crate::soc::traits::{RequestPeer, ResponsePeer};
use crate::stats::CacheStats;

/// Deferred work the cache schedules for itself.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum CacheEvent {
    /// Resolve the request accepted on `port` once the access latency elapsed.
    Access {
        /// CPU-side port that delivered the request.
        port: usize,
        /// The accepted request.
        req: Request,
    },
}

/// Controller state.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Default)]
pub enum CacheState {
    /// Ready to accept a request.
    #[default]
    Idle,
    /// A request was accepted and its access is scheduled.
    AccessPending,
    /// A miss was sent to memory and the refill has not arrived.
    MissWait,
}

/// Memory-side and CPU-side connections of a cache.
pub struct CachePeers {
    /// Backing memory.
    pub mem_side: Box<dyn RequestPeer>,
    /// One requester per CPU-side port.
    pub cpu_side: Vec<Box<dyn ResponsePeer>>,
}

impl fmt::Debug for CachePeers {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CachePeers")
            .field("cpu_side", &self.cpu_side.len())
            .finish_non_exhaustive()
    }
}

/// Blocking cache controller.
pub struct SimpleCache {
    name: String,
    clock: ClockDomain,
    latency: u64,
    block_size: usize,
    store: BlockStore,
    policy: Box<dyn ReplacementPolicy>,
    scheduler: Rc<dyn Scheduler<CacheEvent>>,
    cpu_ports: Vec<CpuSidePort>,
    mem_port: MemSidePort,
    state: CacheState,
    waiting_port: Option<usize>,
    /// Request held aside while its block-sized fetch is outstanding.
    original: Option<Request>,
    miss_start: Tick,
    stats: CacheStats,
}

impl SimpleCache {
    /// Creates a cache.
    ///
    /// # Arguments
    ///
    /// * `name` - Instance name used for port names and log lines.
    /// * `config` - Geometry and timing.
    /// * `scheduler` - Host clock and event queue.
    /// * `policy` - Victim selection for evictions.
    /// * `peers` - Memory-side peer and one peer per CPU-side port.
    ///
    /// # Errors
    ///
    /// Any `CacheConfig::validate` failure, or `PortCountMismatch` if the number of
    /// CPU-side peers differs from `config.cpu_side_ports`.
    pub fn new(
        name: impl Into<String>,
        config: &CacheConfig,
        scheduler: Rc<dyn Scheduler<CacheEvent>>,
        policy: Box<dyn ReplacementPolicy>,
        peers: CachePeers,
    ) -> Result<Self, ConfigError> {
        config.validate()?;
        if peers.cpu_side.len() != config.cpu_side_ports {
            return Err(ConfigError::PortCountMismatch {
                expected: config.cpu_side_ports,
                connected: peers.cpu_side.len(),
            });
        }

        let name = name.into();
        let cpu_ports = peers
            .cpu_side
            .into_iter()
            .enumerate()
            .map(|(id, peer)| CpuSidePort::new(&name, id, peer))
            .collect();
        let mem_port = MemSidePort::new(&name, peers.mem_side);

        Ok(Self {
            clock: ClockDomain::new(config.clock_period),
            latency: config.access_latency,
            block_size: config.block_size,
            store: BlockStore::new(config.capacity(), config.block_size),
            policy,
            scheduler,
            cpu_ports,
            mem_port,
            state: CacheState::Idle,
            waiting_port: None,
            original: None,
            miss_start: 0,
            stats: CacheStats::default(),
            name,
        })
    }

    /// Instance name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Current controller state.
    pub const fn state(&self) -> CacheState {
        self.state
    }

    /// Returns `true` while a request is in flight.
    pub fn is_busy(&self) -> bool {
        self.state != CacheState::Idle
    }

    /// Returns `true` when idle with no packet parked on any port.
    pub fn is_drained(&self) -> bool {
        !self.is_busy()
            && !self.mem_port.is_blocked()
            && self.cpu_ports.iter().all(|p| !p.is_blocked())
    }

    /// Bytes per block.
    pub const fn block_size(&self) -> usize {
        self.block_size
    }

    /// Resident blocks.
    pub const fn store(&self) -> &BlockStore {
        &self.store
    }

    /// Hit, miss, and miss-latency statistics.
    pub const fn stats(&self) -> &CacheStats {
        &self.stats
    }

    /// CPU-side port `index`.
    pub fn cpu_port(&self, index: usize) -> Option<&CpuSidePort> {
        self.cpu_ports.get(index)
    }

    /// Number of CPU-side ports.
    pub fn cpu_port_count(&self) -> usize {
        self.cpu_ports.len()
    }

    /// Memory-side port.
    pub const fn mem_port(&self) -> &MemSidePort {
        &self.mem_port
    }

    /// Offers a timing request on CPU-side port `port`.
    ///
    /// Accepting schedules the access `access_latency` cycles out. A refused
    /// request is handed back and the port owes its requester a retry.
    pub fn recv_timing_req(&mut self, port: usize, req: Request) -> Result<(), Request> {
        let Some(cpu_port) = self.cpu_ports.get_mut(port) else {
            warn!(cache = %self.name, port, "request on unknown port");
            return Err(req);
        };

        debug!(cache = %self.name, port = cpu_port.name(), %req, "got request");
        if cpu_port.should_reject() {
            return Err(req);
        }
        if self.state != CacheState::Idle {
            debug!(cache = %self.name, "request failed, cache busy");
            cpu_port.mark_need_retry();
            return Err(req);
        }

        debug_assert!(self.waiting_port.is_none());
        self.state = CacheState::AccessPending;
        self.waiting_port = Some(port);

        let when = self
            .clock
            .clock_edge(self.scheduler.cur_tick(), self.latency);
        self.scheduler.schedule(when, CacheEvent::Access { port, req });
        Ok(())
    }

    /// Runs a scheduled cache event.
    ///
    /// # Errors
    ///
    /// Any protocol violation detected while performing the access.
    pub fn process(&mut self, event: CacheEvent) -> Result<(), ProtocolError> {
        match event {
            CacheEvent::Access { port, req } => {
                debug_assert_eq!(self.waiting_port, Some(port));
                self.access_timing(req)
            }
        }
    }

    /// Resolves an accepted request: serve a hit, or send a miss to memory.
    fn access_timing(&mut self, mut req: Request) -> Result<(), ProtocolError> {
        if !req.needs_response() {
            return Err(ProtocolError::UnexpectedCommand { cmd: req.cmd() });
        }

        let hit = self.access_functional(&mut req)?;
        debug!(cache = %self.name, %req, "{}", if hit { "hit" } else { "miss" });

        if hit {
            self.stats.hits += 1;
            trace!(cache = %self.name, data = %hex(req.data()), "hit data");
            let resp = req.complete()?;
            return self.send_response(resp);
        }

        self.stats.misses += 1;
        self.miss_start = self.scheduler.cur_tick();
        self.state = CacheState::MissWait;

        if req.is_block_access(self.block_size) {
            debug!(cache = %self.name, "forwarding packet");
            return self.mem_port.send_packet(req);
        }

        if !req.fits_in_block(self.block_size) {
            return Err(ProtocolError::SpansBlocks {
                addr: req.addr(),
                size: req.size(),
                block_size: self.block_size,
            });
        }

        debug!(cache = %self.name, "upgrading packet to block size");
        let fetch = Request::read(req.block_addr(self.block_size), self.block_size);
        self.original = Some(req);
        self.mem_port.send_packet(fetch)
    }

    /// Performs `req` against its block if resident.
    ///
    /// # Returns
    ///
    /// `true` on a hit; the request has been read into or written from the line.
    fn access_functional(&mut self, req: &mut Request) -> Result<bool, ProtocolError> {
        let block_addr = req.block_addr(self.block_size);
        let Some(line) = self.store.get_mut(block_addr) else {
            return Ok(false);
        };
        req.access_block(line.bytes_mut())?;
        self.policy.touch(block_addr);
        Ok(true)
    }

    /// Accepts the refill for the outstanding miss.
    ///
    /// Inserts the block (evicting if full), records the miss latency, and
    /// completes the waiting request.
    ///
    /// # Errors
    ///
    /// `UnexpectedResponse` if no miss is outstanding or the response is not a
    /// whole aligned block, `DuplicateBlock` if the block is already resident,
    /// or any error from the eviction writeback or the reply.
    pub fn recv_timing_resp(&mut self, resp: Response) -> Result<(), ProtocolError> {
        if self.state != CacheState::MissWait
            || resp.addr() != block_align(resp.addr(), self.block_size)
            || resp.size() != self.block_size
        {
            return Err(ProtocolError::UnexpectedResponse { addr: resp.addr() });
        }
        debug!(cache = %self.name, addr = %format_args!("{:#x}", resp.addr()), "got response");

        self.insert(resp.addr(), resp.data())?;

        let latency = self.scheduler.cur_tick() - self.miss_start;
        self.stats.miss_latency.sample(latency);

        let reply = match self.original.take() {
            Some(mut original) => {
                debug!(cache = %self.name, "copying data from new packet to old");
                if !self.access_functional(&mut original)? {
                    return Err(ProtocolError::MissingBlock { addr: resp.addr() });
                }
                original.complete()?
            }
            None => resp,
        };

        self.send_response(reply)
    }

    /// Installs a block, first evicting and writing back a victim if full.
    fn insert(&mut self, addr: Addr, data: &[u8]) -> Result<(), ProtocolError> {
        if self.store.contains(addr) {
            return Err(ProtocolError::DuplicateBlock { addr });
        }

        if self.store.is_full() {
            let victim = self
                .policy
                .victim(&self.store)
                .ok_or(ProtocolError::NoVictim)?;
            let line = self.store.remove(victim).ok_or(ProtocolError::NoVictim)?;
            debug!(cache = %self.name, victim = %format_args!("{victim:#x}"), "removing addr");

            let writeback = Request::writeback(victim, line.into_vec());
            debug!(cache = %self.name, %writeback, "writing packet back");
            self.mem_port.send_packet(writeback)?;
        }

        debug!(cache = %self.name, addr = %format_args!("{addr:#x}"), "inserting");
        trace!(cache = %self.name, data = %hex(data), "inserted data");
        self.store.insert(addr, CacheLine::from_bytes(data))
    }

    /// Replies on the waiting port, goes idle, and offers retries on every port.
    fn send_response(&mut self, resp: Response) -> Result<(), ProtocolError> {
        let port = self
            .waiting_port
            .take()
            .ok_or(ProtocolError::UnexpectedResponse { addr: resp.addr() })?;
        debug!(cache = %self.name, port, %resp, "sending response");

        self.state = CacheState::Idle;

        self.cpu_ports
            .get_mut(port)
            .ok_or(ProtocolError::NoSuchPort { index: port })?
            .send_packet(resp)?;

        for cpu_port in &mut self.cpu_ports {
            cpu_port.try_send_retry();
        }
        Ok(())
    }

    /// Memory can accept the request parked on the memory-side port.
    ///
    /// # Errors
    ///
    /// `RetryWithoutBlocked` if nothing is parked.
    pub fn recv_req_retry(&mut self) -> Result<(), ProtocolError> {
        self.mem_port.recv_req_retry()
    }

    /// The requester on `port` can accept its parked response.
    ///
    /// # Errors
    ///
    /// `NoSuchPort`, or `RetryWithoutBlocked` if nothing is parked.
    pub fn recv_resp_retry(&mut self, port: usize) -> Result<(), ProtocolError> {
        self.cpu_ports
            .get_mut(port)
            .ok_or(ProtocolError::NoSuchPort { index: port })?
            .recv_resp_retry()
    }

    /// Services a request immediately: from a resident block if present,
    /// otherwise from memory. Never touches timing state or statistics.
    ///
    /// # Errors
    ///
    /// Any violation raised by the access itself or by memory.
    pub fn recv_functional(&mut self, mut req: Request) -> Result<Response, ProtocolError> {
        if req.cmd() == MemCmd::WritebackDirty {
            return Err(ProtocolError::UnexpectedCommand { cmd: req.cmd() });
        }
        if self.access_functional(&mut req)? {
            req.complete()
        } else {
            self.mem_port.send_functional(req)
        }
    }

    /// Address ranges served through this cache (those of the memory behind it).
    pub fn addr_ranges(&self) -> Vec<AddrRange> {
        debug!(cache = %self.name, "sending new ranges");
        self.mem_port.addr_ranges()
    }

    /// Memory's ranges changed; tell every requester.
    pub fn recv_range_change(&mut self) {
        for cpu_port in &mut self.cpu_ports {
            cpu_port.send_range_change();
        }
    }
}

impl fmt::Debug for SimpleCache {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SimpleCache")
            .field("name", &self.name)
            .field("state", &self.state)
            .field("waiting_port", &self.waiting_port)
            .field("resident", &self.store.len())
            .field("capacity", &self.store.capacity())
            .field("stats", &self.stats)
            .finish_non_exhaustive()
    }
}

/// Formats bytes as space-separated hex pairs for trace output.
fn hex(bytes: &[u8]) -> String {
    let mut out = String::with_capacity(bytes.len() * 3);
    for (i, b) in bytes.iter().enumerate() {
        if i > 0 {
            out.push(' ');
        }
        let _ = write!(out, "{b:02x}");
    }
    out
}

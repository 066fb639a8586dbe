//! Simulated System.
//!
//! Owns the host event queue and everything connected to it: the requesters,
//! the cache, and the backing memory. The cache holds its peers behind its ports;
//! the system keeps a second handle to the memory and owns the requesters, and
//! routes each popped event to the component it belongs to.

use std::rc::Rc;

use serde::Serialize;
use tracing::{debug, info, warn};

use crate::cache::policies::RandomPolicy;
use crate::cache::{CacheEvent, CachePeers, SimpleCache};
use crate::common::error::{ProtocolError, SimError};
use crate::config::Config;
use crate::sim::event::{EventQueue, Tick};
use crate::sim::requester::{CpuEvent, CpuLink, TraceOp, TraceRequester};
use crate::soc::memory::{MemoryEvent, SimpleMemory};
use crate::soc::packet::Request;
use crate::soc::traits::ResponsePeer;

/// Every event the host queue carries.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum SimEvent {
    /// Cache-internal work.
    Cache(CacheEvent),
    /// Memory responses and retries.
    Memory(MemoryEvent),
    /// Requester work.
    Cpu(CpuEvent),
}

impl From<CacheEvent> for SimEvent {
    fn from(event: CacheEvent) -> Self {
        Self::Cache(event)
    }
}

impl From<MemoryEvent> for SimEvent {
    fn from(event: MemoryEvent) -> Self {
        Self::Memory(event)
    }
}

impl From<CpuEvent> for SimEvent {
    fn from(event: CpuEvent) -> Self {
        Self::Cpu(event)
    }
}

/// Outcome of a run.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
pub struct RunSummary {
    /// Tick of the last event dispatched.
    pub end_tick: Tick,
    /// Trace ops that received a response.
    pub completed: usize,
    /// Trace ops still unanswered (non-zero only when stopped by `max_tick`).
    pub pending: usize,
}

/// Requesters, cache, and memory wired to one event queue.
#[derive(Debug)]
pub struct System {
    queue: Rc<EventQueue<SimEvent>>,
    cache: SimpleCache,
    memory: SimpleMemory,
    requesters: Vec<TraceRequester>,
    max_tick: Option<Tick>,
}

impl System {
    /// Builds the system and schedules each requester's first op.
    ///
    /// # Errors
    ///
    /// `Config` for an invalid configuration, `Trace` for an op that names a
    /// port the cache does not have or carries no bytes, `Protocol(OutOfRange)`
    /// for an op that reaches past the memory's address range.
    pub fn new(config: &Config, trace: Vec<TraceOp>) -> Result<Self, SimError> {
        config.validate()?;

        let ports = config.cache.cpu_side_ports;
        let range = config.memory.range();
        let mut per_port: Vec<Vec<(usize, TraceOp)>> = vec![Vec::new(); ports];
        for (index, op) in trace.into_iter().enumerate() {
            op.validate(index)?;
            if !range.contains_span(op.addr, op.access_size()) {
                warn!(index, addr = op.addr, %range, "trace op outside memory range");
                return Err(ProtocolError::OutOfRange {
                    addr: op.addr,
                    size: op.access_size(),
                }
                .into());
            }
            let Some(ops) = per_port.get_mut(op.port) else {
                return Err(SimError::Trace {
                    index,
                    reason: format!("port {} out of range (cache has {ports})", op.port),
                });
            };
            ops.push((index, op));
        }

        let queue: Rc<EventQueue<SimEvent>> = Rc::new(EventQueue::new());
        let memory = SimpleMemory::new(&config.memory, queue.clone());
        let cpu_side = (0..ports)
            .map(|port| Box::new(CpuLink::new(port, queue.clone())) as Box<dyn ResponsePeer>)
            .collect();
        let cache = SimpleCache::new(
            "system.cache",
            &config.cache,
            queue.clone(),
            Box::new(RandomPolicy::seeded(config.sim.seed)),
            CachePeers {
                mem_side: Box::new(memory.clone()),
                cpu_side,
            },
        )?;

        let requesters: Vec<_> = per_port
            .into_iter()
            .enumerate()
            .map(|(port, ops)| TraceRequester::new(port, ops))
            .collect();
        for requester in &requesters {
            if let Some(when) = requester.first_issue() {
                queue.push(
                    when,
                    SimEvent::Cpu(CpuEvent::Issue {
                        port: requester.port(),
                    }),
                );
            }
        }

        info!(
            ranges = ?cache.addr_ranges(),
            capacity = cache.store().capacity(),
            ports,
            "system built"
        );

        Ok(Self {
            queue,
            cache,
            memory,
            requesters,
            max_tick: config.sim.max_tick,
        })
    }

    /// Current simulation time.
    pub fn now(&self) -> Tick {
        self.queue.now()
    }

    /// The cache.
    pub const fn cache(&self) -> &SimpleCache {
        &self.cache
    }

    /// The cache, for functional accesses between runs.
    pub const fn cache_mut(&mut self) -> &mut SimpleCache {
        &mut self.cache
    }

    /// Handle to the backing memory.
    pub const fn memory(&self) -> &SimpleMemory {
        &self.memory
    }

    /// One requester per CPU-side port.
    pub fn requesters(&self) -> &[TraceRequester] {
        &self.requesters
    }

    /// Dispatches events until the queue drains or `max_tick` passes.
    ///
    /// # Errors
    ///
    /// The first protocol violation raised by any component.
    pub fn run(&mut self) -> Result<RunSummary, SimError> {
        while let Some(next) = self.queue.next_tick() {
            if self.max_tick.is_some_and(|max| next > max) {
                warn!(next, max_tick = ?self.max_tick, "stopping at tick limit");
                break;
            }
            let Some((tick, event)) = self.queue.pop() else {
                break;
            };
            debug!(tick, ?event, "dispatch");
            self.dispatch(event)?;
            if let Some(fault) = self.memory.take_fault() {
                return Err(fault.into());
            }
        }

        let completed = self.requesters.iter().map(|r| r.completed().len()).sum();
        let total: usize = self.requesters.iter().map(TraceRequester::len).sum();
        let summary = RunSummary {
            end_tick: self.queue.now(),
            completed,
            pending: total - completed,
        };
        info!(?summary, drained = self.cache.is_drained(), "run finished");
        Ok(summary)
    }

    fn dispatch(&mut self, event: SimEvent) -> Result<(), SimError> {
        match event {
            SimEvent::Cache(event) => self.cache.process(event)?,
            SimEvent::Memory(MemoryEvent::Response(resp)) => self.cache.recv_timing_resp(resp)?,
            SimEvent::Memory(MemoryEvent::Retry) => {
                if self.memory.retry_fired() {
                    self.cache.recv_req_retry()?;
                }
            }
            SimEvent::Cpu(CpuEvent::Issue { port }) => {
                let now = self.queue.now();
                if let Some(req) = self.requester(port)?.issue(now) {
                    self.offer(port, req)?;
                }
            }
            SimEvent::Cpu(CpuEvent::Retry { port }) => {
                if let Some(req) = self.requester(port)?.take_refused() {
                    self.offer(port, req)?;
                }
            }
            SimEvent::Cpu(CpuEvent::Response { port, resp }) => {
                let now = self.queue.now();
                if let Some(when) = self.requester(port)?.complete(resp, now)? {
                    self.queue.push(when, CpuEvent::Issue { port }.into());
                }
            }
        }
        Ok(())
    }

    fn requester(&mut self, port: usize) -> Result<&mut TraceRequester, ProtocolError> {
        self.requesters
            .get_mut(port)
            .ok_or(ProtocolError::NoSuchPort { index: port })
    }

    /// Offers `req` to the cache on `port`; a refusal parks it in the requester.
    fn offer(&mut self, port: usize, req: Request) -> Result<(), ProtocolError> {
        if let Err(req) = self.cache.recv_timing_req(port, req) {
            self.requester(port)?.refused(req);
        }
        Ok(())
    }
}

//! Backing Memory.
//!
//! This module implements the memory behind the cache. It provides:
//! 1. **Buffer:** Sparse backing storage for memory contents.
//! 2. **Controller:** Latency modeling for timing accesses.
//! 3. **Memory:** A `RequestPeer` that answers timing requests after the controller's
//!    latency, refuses new ones while its queue is full, and sends a retry once a
//!    slot frees.
//!
//! `SimpleMemory` is a cheap handle: clones share the same contents and queue, so
//! the host can inspect memory while the cache owns the connected clone.

/// Sparse byte storage.
pub mod buffer;

/// Memory controller implementations for access latency modeling.
pub mod controller;

use std::cell::RefCell;
use std::fmt;
use std::rc::Rc;

use tracing::{debug, warn};

use self::buffer::SparseBuffer;
use self::controller::{MemoryController, SimpleController};
use crate::common::addr::{Addr, AddrRange};
use crate::common::error::ProtocolError;
use crate::config::MemoryConfig;
use crate::sim::event::{Scheduler, Tick};
use crate::soc::packet::{MemCmd, Request, Response};
use crate::soc::traits::RequestPeer;

/// Deferred work the memory schedules on the host queue.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum MemoryEvent {
    /// Deliver a response to the cache.
    Response(Response),
    /// Tell the cache it may resend its refused request.
    Retry,
}

/// A timing request the memory accepted.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct AccessRecord {
    /// Tick the request was accepted.
    pub tick: Tick,
    /// Request command.
    pub cmd: MemCmd,
    /// Start address.
    pub addr: Addr,
    /// Size in bytes.
    pub size: usize,
}

struct MemoryState {
    range: AddrRange,
    buffer: SparseBuffer,
    controller: Box<dyn MemoryController>,
    queue_depth: usize,
    /// Completion ticks of accepted requests still occupying a slot.
    in_flight: Vec<Tick>,
    need_retry: bool,
    retry_scheduled: bool,
    accepted: Vec<AccessRecord>,
    /// First out-of-range timing access, held until the host collects it.
    fault: Option<ProtocolError>,
}

impl MemoryState {
    /// Applies a request to the contents.
    ///
    /// # Errors
    ///
    /// `OutOfRange` if any byte of the access lies outside the memory's range;
    /// the contents are left untouched.
    fn apply(&mut self, req: &mut Request) -> Result<(), ProtocolError> {
        if !self.range.contains_span(req.addr(), req.size()) {
            warn!(%req, range = %self.range, "access outside memory range");
            return Err(ProtocolError::OutOfRange {
                addr: req.addr(),
                size: req.size(),
            });
        }
        if req.is_write() {
            self.buffer.write_slice(req.addr(), req.data());
        } else {
            let addr = req.addr();
            self.buffer.read_slice(addr, req.data_mut());
        }
        Ok(())
    }
}

/// Fixed-latency memory with a bounded request queue.
#[derive(Clone)]
pub struct SimpleMemory {
    state: Rc<RefCell<MemoryState>>,
    scheduler: Rc<dyn Scheduler<MemoryEvent>>,
}

impl SimpleMemory {
    /// Creates a memory from its configuration with a fixed-latency controller.
    pub fn new(config: &MemoryConfig, scheduler: Rc<dyn Scheduler<MemoryEvent>>) -> Self {
        Self::with_controller(
            config,
            Box::new(SimpleController::new(config.latency)),
            scheduler,
        )
    }

    /// Creates a memory whose latency comes from `controller`.
    pub fn with_controller(
        config: &MemoryConfig,
        controller: Box<dyn MemoryController>,
        scheduler: Rc<dyn Scheduler<MemoryEvent>>,
    ) -> Self {
        let state = MemoryState {
            range: config.range(),
            buffer: SparseBuffer::new(),
            controller,
            queue_depth: config.queue_depth.max(1),
            in_flight: Vec::new(),
            need_retry: false,
            retry_scheduled: false,
            accepted: Vec::new(),
            fault: None,
        };
        Self {
            state: Rc::new(RefCell::new(state)),
            scheduler,
        }
    }

    /// Reads `len` bytes at `addr` without timing.
    pub fn peek(&self, addr: Addr, len: usize) -> Vec<u8> {
        let mut out = vec![0; len];
        self.state.borrow().buffer.read_slice(addr, &mut out);
        out
    }

    /// Writes `data` at `addr` without timing.
    pub fn poke(&self, addr: Addr, data: &[u8]) {
        self.state.borrow_mut().buffer.write_slice(addr, data);
    }

    /// Timing requests accepted so far, in acceptance order.
    pub fn accepted(&self) -> Vec<AccessRecord> {
        self.state.borrow().accepted.clone()
    }

    /// Number of requests currently occupying a queue slot.
    pub fn outstanding(&self) -> usize {
        let now = self.scheduler.cur_tick();
        self.state
            .borrow()
            .in_flight
            .iter()
            .filter(|&&t| t > now)
            .count()
    }

    /// Takes the violation raised by an out-of-range timing access, if any.
    ///
    /// A timing request cannot be refused with an error, so the memory accepts it,
    /// drops it, and holds the violation for the host to surface.
    pub fn take_fault(&self) -> Option<ProtocolError> {
        self.state.borrow_mut().fault.take()
    }

    /// Called by the host when a scheduled `MemoryEvent::Retry` fires.
    ///
    /// # Returns
    ///
    /// `true` if the retry should be delivered to the sender.
    pub fn retry_fired(&self) -> bool {
        let mut state = self.state.borrow_mut();
        state.retry_scheduled = false;
        std::mem::take(&mut state.need_retry)
    }
}

impl RequestPeer for SimpleMemory {
    fn recv_timing_req(&mut self, mut req: Request) -> Result<(), Request> {
        let now = self.scheduler.cur_tick();
        let mut state = self.state.borrow_mut();
        state.in_flight.retain(|&t| t > now);

        if state.in_flight.len() >= state.queue_depth {
            debug!(%req, "memory queue full, refusing");
            state.need_retry = true;
            if !state.retry_scheduled {
                state.retry_scheduled = true;
                let free_at = state.in_flight.iter().copied().min().unwrap_or(now);
                self.scheduler.schedule(free_at, MemoryEvent::Retry);
            }
            return Err(req);
        }

        if let Err(e) = state.apply(&mut req) {
            if state.fault.is_none() {
                state.fault = Some(e);
            }
            return Ok(());
        }
        state.accepted.push(AccessRecord {
            tick: now,
            cmd: req.cmd(),
            addr: req.addr(),
            size: req.size(),
        });
        let done = now + state.controller.access_latency(req.addr());
        state.in_flight.push(done);
        drop(state);

        debug!(%req, done, "memory accepted request");
        // Writebacks complete silently.
        if let Ok(resp) = req.complete() {
            self.scheduler.schedule(done, MemoryEvent::Response(resp));
        }
        Ok(())
    }

    fn recv_functional(&mut self, mut req: Request) -> Result<Response, ProtocolError> {
        if req.cmd() == MemCmd::WritebackDirty {
            return Err(ProtocolError::UnexpectedCommand { cmd: req.cmd() });
        }
        self.state.borrow_mut().apply(&mut req)?;
        req.complete()
    }

    fn addr_ranges(&self) -> Vec<AddrRange> {
        vec![self.state.borrow().range]
    }
}

impl fmt::Debug for SimpleMemory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let state = self.state.borrow();
        f.debug_struct("SimpleMemory")
            .field("range", &state.range)
            .field("buffer", &state.buffer)
            .field("in_flight", &state.in_flight.len())
            .field("need_retry", &state.need_retry)
            .finish_non_exhaustive()
    }
}

//! Trace-Driven Requesters.
//!
//! This module provides the traffic sources that sit on the cache's CPU side:
//! 1. **Trace ops:** The JSON-described accesses a requester issues.
//! 2. **Requester:** Issues its ops in order, one outstanding at a time, and keeps
//!    the refused request until the cache's retry arrives.
//! 3. **Link:** The `ResponsePeer` installed in each CPU-side port; it turns the
//!    cache's responses and retries into host events.

use std::rc::Rc;

use serde::{Deserialize, Serialize};
use tracing::{debug, trace};

use crate::common::addr::Addr;
use crate::common::error::{ProtocolError, SimError};
use crate::sim::event::{Scheduler, Tick};
use crate::soc::packet::{Request, RespCmd, Response};
use crate::soc::traits::ResponsePeer;

/// Access kind named in a trace.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Deserialize, Serialize)]
pub enum TraceCmd {
    /// Read `size` bytes.
    Read,
    /// Write `data`.
    Write,
}

/// One access in a trace.
#[derive(Clone, Debug, PartialEq, Eq, Deserialize, Serialize)]
pub struct TraceOp {
    /// CPU-side port that issues the access
    #[serde(default)]
    pub port: usize,
    /// Read or write
    pub cmd: TraceCmd,
    /// Start address
    pub addr: Addr,
    /// Bytes to read (ignored for writes)
    #[serde(default)]
    pub size: usize,
    /// Bytes to write (ignored for reads)
    #[serde(default)]
    pub data: Vec<u8>,
    /// Ticks to wait after the previous completion on the same port
    #[serde(default)]
    pub delay: Tick,
}

impl TraceOp {
    /// Creates a read op on port 0 with no delay.
    pub const fn read(addr: Addr, size: usize) -> Self {
        Self {
            port: 0,
            cmd: TraceCmd::Read,
            addr,
            size,
            data: Vec::new(),
            delay: 0,
        }
    }

    /// Creates a write op on port 0 with no delay.
    pub fn write(addr: Addr, data: impl Into<Vec<u8>>) -> Self {
        Self {
            port: 0,
            cmd: TraceCmd::Write,
            addr,
            size: 0,
            data: data.into(),
            delay: 0,
        }
    }

    /// Returns the op issued from `port`.
    #[must_use]
    pub const fn on_port(mut self, port: usize) -> Self {
        self.port = port;
        self
    }

    /// Returns the op issued `delay` ticks after the previous completion.
    #[must_use]
    pub const fn after(mut self, delay: Tick) -> Self {
        self.delay = delay;
        self
    }

    /// Bytes the access touches.
    pub fn access_size(&self) -> usize {
        match self.cmd {
            TraceCmd::Read => self.size,
            TraceCmd::Write => self.data.len(),
        }
    }

    /// Checks the op describes a non-empty access.
    ///
    /// # Errors
    ///
    /// `Trace` naming `index` if the access would carry no bytes.
    pub fn validate(&self, index: usize) -> Result<(), SimError> {
        if self.access_size() == 0 {
            return Err(SimError::Trace {
                index,
                reason: format!("{:?} of zero bytes at {:#x}", self.cmd, self.addr),
            });
        }
        Ok(())
    }

    /// Builds the request this op issues.
    pub fn to_request(&self) -> Request {
        match self.cmd {
            TraceCmd::Read => Request::read(self.addr, self.size),
            TraceCmd::Write => Request::write(self.addr, self.data.clone()),
        }
    }
}

/// A trace op that received its response.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Completion {
    /// Position of the op in the full trace.
    pub index: usize,
    /// Response command.
    pub cmd: RespCmd,
    /// Start address.
    pub addr: Addr,
    /// Data read, or the bytes written.
    pub data: Vec<u8>,
    /// Tick the request was first offered to the cache.
    pub issued: Tick,
    /// Tick the response arrived.
    pub completed: Tick,
}

impl Completion {
    /// Ticks from first offer to response.
    pub const fn latency(&self) -> Tick {
        self.completed - self.issued
    }
}

/// Where a requester is in its current op.
#[derive(Clone, Debug, PartialEq, Eq, Default)]
enum Outstanding {
    /// Nothing sent.
    #[default]
    None,
    /// The cache refused this request; waiting for its retry.
    Refused(Request),
    /// Accepted; waiting for the response.
    Accepted,
}

/// Issues one port's share of a trace.
#[derive(Debug)]
pub struct TraceRequester {
    port: usize,
    /// Ops for this port paired with their position in the full trace.
    ops: Vec<(usize, TraceOp)>,
    next: usize,
    outstanding: Outstanding,
    issued_at: Tick,
    completed: Vec<Completion>,
}

impl TraceRequester {
    /// Creates a requester for `port` issuing `ops` in order.
    pub const fn new(port: usize, ops: Vec<(usize, TraceOp)>) -> Self {
        Self {
            port,
            ops,
            next: 0,
            outstanding: Outstanding::None,
            issued_at: 0,
            completed: Vec::new(),
        }
    }

    /// CPU-side port this requester drives.
    pub const fn port(&self) -> usize {
        self.port
    }

    /// Number of ops assigned to this requester.
    pub fn len(&self) -> usize {
        self.ops.len()
    }

    /// Returns `true` if no ops were assigned.
    pub fn is_empty(&self) -> bool {
        self.ops.is_empty()
    }

    /// Returns `true` once every op has completed.
    pub fn is_done(&self) -> bool {
        self.next >= self.ops.len()
    }

    /// Responses received so far, in completion order.
    pub fn completed(&self) -> &[Completion] {
        &self.completed
    }

    /// Tick of the first issue, if there is anything to issue.
    pub fn first_issue(&self) -> Option<Tick> {
        self.ops.first().map(|(_, op)| op.delay)
    }

    /// Builds the next request to offer the cache.
    ///
    /// Returns `None` if every op has been issued or one is still outstanding.
    pub fn issue(&mut self, now: Tick) -> Option<Request> {
        if self.outstanding != Outstanding::None {
            return None;
        }
        let (index, op) = self.ops.get(self.next)?;
        let req = op.to_request();
        debug!(port = self.port, index, %req, "issuing");
        self.issued_at = now;
        self.outstanding = Outstanding::Accepted;
        Some(req)
    }

    /// The cache refused `req`; hold it until the retry.
    pub fn refused(&mut self, req: Request) {
        trace!(port = self.port, %req, "refused, waiting for retry");
        self.outstanding = Outstanding::Refused(req);
    }

    /// Takes the refused request to resend after a retry.
    pub fn take_refused(&mut self) -> Option<Request> {
        match std::mem::take(&mut self.outstanding) {
            Outstanding::Refused(req) => {
                self.outstanding = Outstanding::Accepted;
                Some(req)
            }
            other => {
                self.outstanding = other;
                None
            }
        }
    }

    /// Records the response to the outstanding op.
    ///
    /// # Returns
    ///
    /// Tick at which the following op should be issued, if there is one.
    ///
    /// # Errors
    ///
    /// `UnexpectedResponse` if nothing was outstanding.
    pub fn complete(&mut self, resp: Response, now: Tick) -> Result<Option<Tick>, ProtocolError> {
        let Some((index, _)) = self
            .ops
            .get(self.next)
            .filter(|_| self.outstanding == Outstanding::Accepted)
        else {
            return Err(ProtocolError::UnexpectedResponse { addr: resp.addr() });
        };

        debug!(port = self.port, index, %resp, latency = now - self.issued_at, "completed");
        self.completed.push(Completion {
            index: *index,
            cmd: resp.cmd(),
            addr: resp.addr(),
            data: resp.into_data(),
            issued: self.issued_at,
            completed: now,
        });
        self.outstanding = Outstanding::None;
        self.next += 1;

        Ok(self.ops.get(self.next).map(|(_, op)| now + op.delay))
    }
}

/// Events the requesters react to.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum CpuEvent {
    /// Offer the next op on `port`.
    Issue {
        /// Requester port.
        port: usize,
    },
    /// The cache responded on `port`.
    Response {
        /// Requester port.
        port: usize,
        /// The response.
        resp: Response,
    },
    /// The cache can take the request refused on `port`.
    Retry {
        /// Requester port.
        port: usize,
    },
}

/// Upstream peer of one CPU-side port.
///
/// Always accepts responses and defers them to the host queue at the current
/// tick, so the requester runs outside the cache's call.
pub struct CpuLink {
    port: usize,
    scheduler: Rc<dyn Scheduler<CpuEvent>>,
}

impl CpuLink {
    /// Creates the link for `port`.
    pub fn new(port: usize, scheduler: Rc<dyn Scheduler<CpuEvent>>) -> Self {
        Self { port, scheduler }
    }
}

impl ResponsePeer for CpuLink {
    fn recv_timing_resp(&mut self, resp: Response) -> Result<(), Response> {
        let now = self.scheduler.cur_tick();
        self.scheduler.schedule(
            now,
            CpuEvent::Response {
                port: self.port,
                resp,
            },
        );
        Ok(())
    }

    fn recv_req_retry(&mut self) {
        let now = self.scheduler.cur_tick();
        self.scheduler
            .schedule(now, CpuEvent::Retry { port: self.port });
    }

    fn recv_range_change(&mut self) {
        debug!(port = self.port, "address ranges changed");
    }
}

impl std::fmt::Debug for CpuLink {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CpuLink")
            .field("port", &self.port)
            .finish_non_exhaustive()
    }
}

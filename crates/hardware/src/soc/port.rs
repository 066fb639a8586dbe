//! Flow-controlled endpoints owned by the cache.
//!
//! Both port kinds hold at most one blocked outbound packet. A send that the
//! peer refuses parks the packet in that slot until the peer's retry arrives;
//! sending again before then is a protocol violation.
//!
//! The CPU-side port also remembers whether it refused an incoming request
//! (`need_retry`), so it can tell the requester when to try again.

use std::fmt;

use tracing::debug;

use crate::common::addr::AddrRange;
use crate::common::error::ProtocolError;
use crate::soc::packet::{Request, Response};
use crate::soc::traits::{RequestPeer, ResponsePeer};

/// Response-direction endpoint facing a requester.
pub struct CpuSidePort {
    id: usize,
    name: String,
    peer: Box<dyn ResponsePeer>,
    blocked: Option<Response>,
    need_retry: bool,
}

impl CpuSidePort {
    /// Creates port `id` of the component called `owner`.
    pub fn new(owner: &str, id: usize, peer: Box<dyn ResponsePeer>) -> Self {
        Self {
            id,
            name: format!("{owner}.cpu_side[{id}]"),
            peer,
            blocked: None,
            need_retry: false,
        }
    }

    /// Port index.
    pub const fn id(&self) -> usize {
        self.id
    }

    /// Hierarchical port name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Returns `true` while a response is waiting for the requester's retry.
    pub const fn is_blocked(&self) -> bool {
        self.blocked.is_some()
    }

    /// Returns `true` if the requester is owed a retry.
    pub const fn needs_retry(&self) -> bool {
        self.need_retry
    }

    /// Gate for an incoming request.
    ///
    /// Refuses while a response is blocked or while a retry is already owed,
    /// recording that the requester must be told when to try again.
    pub fn should_reject(&mut self) -> bool {
        if self.blocked.is_some() || self.need_retry {
            debug!(port = %self.name, "request blocked");
            self.need_retry = true;
            return true;
        }
        false
    }

    /// Records that a request was refused for a reason outside the port.
    pub fn mark_need_retry(&mut self) {
        self.need_retry = true;
    }

    /// Sends a response to the requester, parking it if refused.
    ///
    /// # Errors
    ///
    /// `SendWhileBlocked` if a previous response is still parked.
    pub fn send_packet(&mut self, resp: Response) -> Result<(), ProtocolError> {
        if self.blocked.is_some() {
            return Err(ProtocolError::SendWhileBlocked {
                port: self.name.clone(),
            });
        }

        debug!(port = %self.name, %resp, "sending response");
        if let Err(resp) = self.peer.recv_timing_resp(resp) {
            debug!(port = %self.name, "response refused");
            self.blocked = Some(resp);
        }
        Ok(())
    }

    /// Tells the requester to retry if it is owed one and nothing is parked here.
    pub fn try_send_retry(&mut self) {
        if self.need_retry && self.blocked.is_none() {
            self.need_retry = false;
            debug!(port = %self.name, "sending retry");
            self.peer.recv_req_retry();
        }
    }

    /// The requester can accept the parked response now.
    ///
    /// # Errors
    ///
    /// `RetryWithoutBlocked` if nothing is parked, or any error from resending.
    pub fn recv_resp_retry(&mut self) -> Result<(), ProtocolError> {
        let resp = self
            .blocked
            .take()
            .ok_or_else(|| ProtocolError::RetryWithoutBlocked {
                port: self.name.clone(),
            })?;

        debug!(port = %self.name, %resp, "retrying response");
        self.send_packet(resp)?;
        self.try_send_retry();
        Ok(())
    }

    /// Forwards an address range change to the requester.
    pub fn send_range_change(&mut self) {
        self.peer.recv_range_change();
    }
}

impl fmt::Debug for CpuSidePort {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CpuSidePort")
            .field("name", &self.name)
            .field("blocked", &self.blocked)
            .field("need_retry", &self.need_retry)
            .finish_non_exhaustive()
    }
}

/// Request-direction endpoint facing the backing memory.
pub struct MemSidePort {
    name: String,
    peer: Box<dyn RequestPeer>,
    blocked: Option<Request>,
}

impl MemSidePort {
    /// Creates the memory-side port of the component called `owner`.
    pub fn new(owner: &str, peer: Box<dyn RequestPeer>) -> Self {
        Self {
            name: format!("{owner}.mem_side"),
            peer,
            blocked: None,
        }
    }

    /// Hierarchical port name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Returns `true` while a request is waiting for the memory's retry.
    pub const fn is_blocked(&self) -> bool {
        self.blocked.is_some()
    }

    /// Sends a request to memory, parking it if refused.
    ///
    /// # Errors
    ///
    /// `SendWhileBlocked` if a previous request is still parked.
    pub fn send_packet(&mut self, req: Request) -> Result<(), ProtocolError> {
        if self.blocked.is_some() {
            return Err(ProtocolError::SendWhileBlocked {
                port: self.name.clone(),
            });
        }

        debug!(port = %self.name, %req, "sending request");
        if let Err(req) = self.peer.recv_timing_req(req) {
            debug!(port = %self.name, "request refused");
            self.blocked = Some(req);
        }
        Ok(())
    }

    /// Memory can accept the parked request now.
    ///
    /// # Errors
    ///
    /// `RetryWithoutBlocked` if nothing is parked.
    pub fn recv_req_retry(&mut self) -> Result<(), ProtocolError> {
        let req = self
            .blocked
            .take()
            .ok_or_else(|| ProtocolError::RetryWithoutBlocked {
                port: self.name.clone(),
            })?;
        self.send_packet(req)
    }

    /// Services a request at memory immediately.
    pub fn send_functional(&mut self, req: Request) -> Result<Response, ProtocolError> {
        self.peer.recv_functional(req)
    }

    /// Address ranges served by memory.
    pub fn addr_ranges(&self) -> Vec<AddrRange> {
        self.peer.addr_ranges()
    }
}

impl fmt::Debug for MemSidePort {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MemSidePort")
            .field("name", &self.name)
            .field("blocked", &self.blocked)
            .finish_non_exhaustive()
    }
}

//! Peer traits for port-to-port communication.
//!
//! Each port owned by the cache talks to the component on the other side of
//! the link through one of two capability sets:
//! 1. **`RequestPeer`:** something that accepts requests (the backing memory).
//! 2. **`ResponsePeer`:** something that accepts responses (a requester).
//!
//! A refused timing packet is handed back by value; the peer promises a retry
//! notification once it can accept again.

use crate::common::addr::AddrRange;
use crate::common::error::ProtocolError;
use crate::soc::packet::{Request, Response};

/// Downstream side of a link: accepts requests.
#[cfg_attr(test, mockall::automock)]
pub trait RequestPeer {
    /// Offers a timing request. `Err` returns the request when the peer is busy;
    /// the peer must later deliver a request retry to the sender.
    fn recv_timing_req(&mut self, req: Request) -> Result<(), Request>;

    /// Services a request immediately, bypassing timing.
    fn recv_functional(&mut self, req: Request) -> Result<Response, ProtocolError>;

    /// Address ranges this peer responds to.
    fn addr_ranges(&self) -> Vec<AddrRange>;
}

/// Upstream side of a link: accepts responses.
#[cfg_attr(test, mockall::automock)]
pub trait ResponsePeer {
    /// Offers a timing response. `Err` returns the response when the peer is busy;
    /// the peer must later deliver a response retry to the sender.
    fn recv_timing_resp(&mut self, resp: Response) -> Result<(), Response>;

    /// The sender is ready to accept a previously refused request.
    fn recv_req_retry(&mut self);

    /// The address ranges behind the sender changed.
    fn recv_range_change(&mut self) {}
}

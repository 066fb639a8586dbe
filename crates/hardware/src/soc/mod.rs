//! Memory-System Plumbing.
//!
//! This module organizes the pieces that move packets between the requesters,
//! the cache, and the backing memory:
//! 1. **Packets:** Requests and responses with their commands.
//! 2. **Traits:** The peer interfaces a port talks to.
//! 3. **Ports:** Flow-controlled endpoints holding at most one blocked packet.
//! 4. **Memory:** The fixed-latency backing store.

/// Backing memory, its storage, and its latency model.
pub mod memory;

/// Request and response packets.
pub mod packet;

/// Flow-controlled CPU-side and memory-side ports.
pub mod port;

/// Peer trait definitions for port connections.
pub mod traits;

pub use memory::{MemoryEvent, SimpleMemory};
pub use packet::{MemCmd, Request, RespCmd, Response};
pub use port::{CpuSidePort, MemSidePort};
pub use traits::{RequestPeer, ResponsePeer};

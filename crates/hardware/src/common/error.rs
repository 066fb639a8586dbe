//! Error definitions.
//!
//! This module defines the error handling for the simulator. It provides:
//! 1. **Protocol errors:** Misuse of the cache by its surroundings (sending while blocked,
//!    duplicate insertion, block-spanning accesses). These are unrecoverable: the host
//!    loop stops on the first one.
//! 2. **Configuration errors:** Rejected or unreadable configuration.
//! 3. **Simulation errors:** The union of the above plus unreadable or malformed traces.
//!
//! Backpressure is never an error; it travels through the retry protocol instead.

use thiserror::Error;

use super::addr::Addr;
use crate::soc::packet::MemCmd;

/// A violation of the port or cache protocol.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ProtocolError {
    /// A port tried to send while it already held a blocked packet.
    #[error("port {port} tried to send while a packet is still blocked")]
    SendWhileBlocked {
        /// Name of the offending port.
        port: String,
    },

    /// A block was inserted at an address that is already resident.
    #[error("block {addr:#x} is already resident")]
    DuplicateBlock {
        /// Aligned block address.
        addr: Addr,
    },

    /// An access does not fit inside a single block.
    #[error("access of {size} bytes at {addr:#x} spans more than one {block_size}-byte block")]
    SpansBlocks {
        /// Start address of the access.
        addr: Addr,
        /// Size of the access in bytes.
        size: usize,
        /// Configured block size.
        block_size: usize,
    },

    /// A packet kind the receiver cannot handle.
    #[error("unexpected command {cmd}")]
    UnexpectedCommand {
        /// The offending command.
        cmd: MemCmd,
    },

    /// Eviction was required but no victim could be chosen.
    #[error("no victim available for eviction")]
    NoVictim,

    /// A response arrived while no miss was outstanding.
    #[error("unexpected response for {addr:#x} while no miss is outstanding")]
    UnexpectedResponse {
        /// Address carried by the response.
        addr: Addr,
    },

    /// A retry arrived for a port that has nothing blocked.
    #[error("retry received on {port} with no blocked packet")]
    RetryWithoutBlocked {
        /// Name of the port.
        port: String,
    },

    /// A block expected to be resident was not found.
    #[error("block {addr:#x} missing right after insertion")]
    MissingBlock {
        /// Aligned block address.
        addr: Addr,
    },

    /// An access falls outside every address range the receiver serves.
    #[error("access of {size} bytes at {addr:#x} is outside the memory range")]
    OutOfRange {
        /// Start address of the access.
        addr: Addr,
        /// Size of the access in bytes.
        size: usize,
    },

    /// A request referenced a port index the cache does not have.
    #[error("no CPU-side port {index}")]
    NoSuchPort {
        /// Requested port index.
        index: usize,
    },
}

/// A rejected or unreadable configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// Block size is zero or not a power of two.
    #[error("block size {0} is not a power of two")]
    BlockSizeNotPowerOfTwo(usize),

    /// Cache size is not a whole number of blocks.
    #[error("cache size {size} is not a multiple of the block size {block_size}")]
    SizeNotMultiple {
        /// Configured size in bytes.
        size: usize,
        /// Configured block size in bytes.
        block_size: usize,
    },

    /// The cache would hold no blocks.
    #[error("cache capacity is zero blocks")]
    ZeroCapacity,

    /// No CPU-side ports were requested.
    #[error("at least one CPU-side port is required")]
    NoCpuSidePorts,

    /// The number of attached requesters differs from the configured port count.
    #[error("configured {expected} CPU-side ports but {connected} requesters were connected")]
    PortCountMismatch {
        /// Configured port count.
        expected: usize,
        /// Requesters supplied.
        connected: usize,
    },

    /// The clock period is zero ticks.
    #[error("clock period must be at least one tick")]
    ZeroClockPeriod,

    /// The memory range is empty.
    #[error("memory size must be non-zero")]
    EmptyMemory,

    /// The memory accepts no outstanding requests.
    #[error("memory queue depth must be non-zero")]
    ZeroQueueDepth,

    /// Malformed JSON.
    #[error("parse error: {0}")]
    Parse(#[from] serde_json::Error),

    /// The configuration file could not be read.
    #[error("i/o error: {0}")]
    Io(#[from] std::io::Error),
}

/// Any error that stops a simulation run.
#[derive(Debug, Error)]
pub enum SimError {
    /// Protocol violation inside the memory system.
    #[error("protocol violation: {0}")]
    Protocol(#[from] ProtocolError),

    /// Invalid configuration.
    #[error("configuration error: {0}")]
    Config(#[from] ConfigError),

    /// The trace file is not valid JSON or has the wrong shape.
    #[error("trace parse error: {0}")]
    TraceParse(#[from] serde_json::Error),

    /// The trace file could not be read.
    #[error("i/o error: {0}")]
    Io(#[from] std::io::Error),

    /// A trace entry the requester cannot issue.
    #[error("invalid trace entry {index}: {reason}")]
    Trace {
        /// Position of the entry in the trace.
        index: usize,
        /// Why it was rejected.
        reason: String,
    },
}

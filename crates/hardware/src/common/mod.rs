//! Common types shared across the simulator.
//!
//! This module provides the fundamental building blocks used by every component:
//! 1. **Addresses:** The address type, block alignment helpers, and address ranges.
//! 2. **Error Handling:** Protocol, configuration, and simulation errors.

/// Address type definitions and block alignment helpers.
pub mod addr;

/// Error types.
pub mod error;

pub use addr::{Addr, AddrRange, block_align, block_offset};
pub use error::{ConfigError, ProtocolError, SimError};

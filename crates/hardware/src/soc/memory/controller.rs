//! Memory controller latency models.
//!
//! A controller decides how many ticks an access to the backing memory takes.
//! The memory asks it once per accepted timing request.

use crate::common::addr::Addr;
use crate::sim::event::Tick;

/// Trait for memory controller implementations that report access latency in ticks.
pub trait MemoryController {
    /// Returns the number of ticks required for an access to the given address.
    ///
    /// # Arguments
    ///
    /// * `addr` - Address being accessed.
    fn access_latency(&mut self, addr: Addr) -> Tick;
}

/// Fixed-latency memory controller; every access takes the same number of ticks.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct SimpleController {
    latency: Tick,
}

impl SimpleController {
    /// Creates a simple controller with the given fixed latency in ticks.
    pub const fn new(latency: Tick) -> Self {
        Self { latency }
    }
}

impl MemoryController for SimpleController {
    fn access_latency(&mut self, _addr: Addr) -> Tick {
        self.latency
    }
}

//! Simulation host.
//!
//! The discrete-event machinery and the components that drive the cache:
//! 1. **Event:** Time, clock domains, and the host event queue.
//! 2. **Requester:** Trace-driven traffic sources on the CPU side.
//! 3. **Loader:** JSON trace parsing.
//! 4. **System:** Wires everything to one queue and runs it.

/// Ticks, clock domains, and the event queue.
pub mod event;

/// JSON trace loading.
pub mod loader;

/// Trace-driven requesters and their port links.
pub mod requester;

/// The assembled system and its run loop.
pub mod system;

pub use event::{ClockDomain, EventQueue, Scheduler, Tick};
pub use requester::{Completion, TraceCmd, TraceOp, TraceRequester};
pub use system::{RunSummary, SimEvent, System};

//! Trace Loading.
//!
//! Reads an access trace from JSON. A trace is a list of ops:
//!
//! ```json
//! [
//!   { "cmd": "Write", "addr": 4, "data": [1, 2, 3, 4] },
//!   { "cmd": "Read", "addr": 0, "size": 64, "delay": 2000 },
//!   { "port": 1, "cmd": "Read", "addr": 4096, "size": 8 }
//! ]
//! ```
//!
//! `port` and `delay` default to 0. Every op is validated before it is returned.

use std::fs;
use std::path::Path;

use crate::common::error::SimError;
use crate::sim::requester::TraceOp;

/// Parses and validates a JSON trace.
///
/// # Errors
///
/// `TraceParse` for malformed JSON, `Trace` for an op that carries no bytes.
pub fn parse_trace(json: &str) -> Result<Vec<TraceOp>, SimError> {
    let ops: Vec<TraceOp> = serde_json::from_str(json)?;
    for (index, op) in ops.iter().enumerate() {
        op.validate(index)?;
    }
    Ok(ops)
}

/// Reads, parses, and validates a JSON trace file.
///
/// # Errors
///
/// `Io` if the file cannot be read, otherwise as `parse_trace`.
pub fn load_trace(path: impl AsRef<Path>) -> Result<Vec<TraceOp>, SimError> {
    let text = fs::read_to_string(path)?;
    parse_trace(&text)
}

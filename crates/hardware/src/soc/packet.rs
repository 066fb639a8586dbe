//! Memory Packets.
//!
//! Requests and responses exchanged between the requester, the cache, and the
//! backing memory. A packet is an owned value: it moves from endpoint to endpoint
//! and a rejected send hands it back to the sender. Resolving a request into a
//! response is an explicit conversion (`Request::complete`).

use std::fmt;

use crate::common::addr::{Addr, block_align, block_offset};
use crate::common::error::ProtocolError;

/// Request command.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum MemCmd {
    /// Read `size` bytes; expects a `ReadResp` carrying the data.
    ReadReq,
    /// Write the carried bytes; expects a `WriteResp`.
    WriteReq,
    /// Evicted block written back to the next level; no response.
    WritebackDirty,
}

impl fmt::Display for MemCmd {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::ReadReq => "ReadReq",
            Self::WriteReq => "WriteReq",
            Self::WritebackDirty => "WritebackDirty",
        };
        f.write_str(name)
    }
}

/// Response command.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum RespCmd {
    /// Completion of a `ReadReq`.
    ReadResp,
    /// Completion of a `WriteReq`.
    WriteResp,
}

impl fmt::Display for RespCmd {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::ReadResp => "ReadResp",
            Self::WriteResp => "WriteResp",
        };
        f.write_str(name)
    }
}

/// A memory request travelling away from the requester.
///
/// The payload length is the access size. Reads carry a zeroed buffer that the
/// responder fills in place.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Request {
    cmd: MemCmd,
    addr: Addr,
    data: Vec<u8>,
}

impl Request {
    /// Creates a read of `size` bytes at `addr`.
    pub fn read(addr: Addr, size: usize) -> Self {
        Self {
            cmd: MemCmd::ReadReq,
            addr,
            data: vec![0; size],
        }
    }

    /// Creates a write of `data` at `addr`.
    pub fn write(addr: Addr, data: impl Into<Vec<u8>>) -> Self {
        Self {
            cmd: MemCmd::WriteReq,
            addr,
            data: data.into(),
        }
    }

    /// Creates a writeback of an evicted block.
    pub fn writeback(addr: Addr, data: impl Into<Vec<u8>>) -> Self {
        Self {
            cmd: MemCmd::WritebackDirty,
            addr,
            data: data.into(),
        }
    }

    /// Request command.
    pub const fn cmd(&self) -> MemCmd {
        self.cmd
    }

    /// Start address of the access.
    pub const fn addr(&self) -> Addr {
        self.addr
    }

    /// Access size in bytes.
    pub fn size(&self) -> usize {
        self.data.len()
    }

    /// Payload bytes (write data, or the read buffer).
    pub fn data(&self) -> &[u8] {
        &self.data
    }

    /// Mutable payload, for responders that fill a read buffer directly.
    pub fn data_mut(&mut self) -> &mut [u8] {
        &mut self.data
    }

    /// Address of the block containing the start of the access.
    pub const fn block_addr(&self, block_size: usize) -> Addr {
        block_align(self.addr, block_size)
    }

    /// Offset of the access start within its block.
    pub const fn block_offset(&self, block_size: usize) -> usize {
        block_offset(self.addr, block_size)
    }

    /// Returns `true` for reads.
    pub fn is_read(&self) -> bool {
        self.cmd == MemCmd::ReadReq
    }

    /// Returns `true` for writes and writebacks.
    pub fn is_write(&self) -> bool {
        matches!(self.cmd, MemCmd::WriteReq | MemCmd::WritebackDirty)
    }

    /// Returns `true` if the receiver owes the sender a response.
    pub fn needs_response(&self) -> bool {
        matches!(self.cmd, MemCmd::ReadReq | MemCmd::WriteReq)
    }

    /// Returns `true` if the access covers exactly one whole aligned block.
    pub fn is_block_access(&self, block_size: usize) -> bool {
        self.addr == self.block_addr(block_size) && self.size() == block_size
    }

    /// Returns `true` if the access lies within a single block.
    pub fn fits_in_block(&self, block_size: usize) -> bool {
        block_offset(self.addr, block_size) + self.size() <= block_size
    }

    /// Checks the access fits in `line` and returns its offset within it.
    fn line_offset(&self, line: &[u8]) -> Result<usize, ProtocolError> {
        if self.fits_in_block(line.len()) {
            Ok(block_offset(self.addr, line.len()))
        } else {
            Err(ProtocolError::SpansBlocks {
                addr: self.addr,
                size: self.size(),
                block_size: line.len(),
            })
        }
    }

    /// Copies the accessed bytes out of `line` into this request's buffer.
    pub fn set_data_from_block(&mut self, line: &[u8]) -> Result<(), ProtocolError> {
        let offset = self.line_offset(line)?;
        let size = self.size();
        self.data.copy_from_slice(&line[offset..offset + size]);
        Ok(())
    }

    /// Copies this request's payload into `line` at the accessed offset.
    pub fn write_data_to_block(&self, line: &mut [u8]) -> Result<(), ProtocolError> {
        let offset = self.line_offset(line)?;
        line[offset..offset + self.size()].copy_from_slice(&self.data);
        Ok(())
    }

    /// Performs the access against a resident line: reads fill the request,
    /// writes update the line.
    ///
    /// # Errors
    ///
    /// `UnexpectedCommand` for writebacks, `SpansBlocks` if the access does not fit.
    pub fn access_block(&mut self, line: &mut [u8]) -> Result<(), ProtocolError> {
        match self.cmd {
            MemCmd::ReadReq => self.set_data_from_block(line),
            MemCmd::WriteReq => self.write_data_to_block(line),
            MemCmd::WritebackDirty => Err(ProtocolError::UnexpectedCommand { cmd: self.cmd }),
        }
    }

    /// Turns a serviced request into its response.
    ///
    /// # Errors
    ///
    /// `UnexpectedCommand` for commands that have no response.
    pub fn complete(self) -> Result<Response, ProtocolError> {
        let cmd = match self.cmd {
            MemCmd::ReadReq => RespCmd::ReadResp,
            MemCmd::WriteReq => RespCmd::WriteResp,
            MemCmd::WritebackDirty => {
                return Err(ProtocolError::UnexpectedCommand { cmd: self.cmd });
            }
        };
        Ok(Response {
            cmd,
            addr: self.addr,
            data: self.data,
        })
    }
}

impl fmt::Display for Request {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} [{:#x}:{:#x}]",
            self.cmd,
            self.addr,
            self.addr + self.data.len() as u64
        )
    }
}

/// A completed access travelling back towards the requester.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Response {
    cmd: RespCmd,
    addr: Addr,
    data: Vec<u8>,
}

impl Response {
    /// Response command.
    pub const fn cmd(&self) -> RespCmd {
        self.cmd
    }

    /// Start address of the original access.
    pub const fn addr(&self) -> Addr {
        self.addr
    }

    /// Access size in bytes.
    pub fn size(&self) -> usize {
        self.data.len()
    }

    /// Read data, or the bytes that were written.
    pub fn data(&self) -> &[u8] {
        &self.data
    }

    /// Consumes the response and returns its payload.
    pub fn into_data(self) -> Vec<u8> {
        self.data
    }
}

impl fmt::Display for Response {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} [{:#x}:{:#x}]",
            self.cmd,
            self.addr,
            self.addr + self.data.len() as u64
        )
    }
}

//! Core identifier, access and status types shared with the transport

use std::fmt;

use bitflags::bitflags;
use serde::{Deserialize, Serialize};

/// Identifier of a handle object as seen by the transport's handle table
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct HandleId(pub u64);

impl HandleId {
    /// Value reported for "no handle"
    pub const NULL: HandleId = HandleId(0);

    /// Get the raw value
    pub fn value(&self) -> u64 {
        self.0
    }

    pub fn is_null(&self) -> bool {
        self.0 == 0
    }
}

impl fmt::Display for HandleId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Handle({:#x})", self.0)
    }
}

/// Key of an attached client's process record
///
/// Handed to the transport in the connection information and returned on
/// every later message from that process, including disconnect.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ProcessKey(pub u64);

impl ProcessKey {
    /// Get the raw value
    pub fn value(&self) -> u64 {
        self.0
    }
}

impl fmt::Display for ProcessKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Process({})", self.0)
    }
}

bitflags! {
    /// Desired access mask of a create request
    ///
    /// Only the generic read/write bits are interpreted; any other bits the
    /// client passes are retained untouched.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
    pub struct Access: u32 {
        const GENERIC_READ = 0x8000_0000;
        const GENERIC_WRITE = 0x4000_0000;
    }
}

impl Access {
    /// Read and write access, as granted to a client's connection handles
    pub fn read_write() -> Self {
        Self::GENERIC_READ | Self::GENERIC_WRITE
    }

    /// Only the generic read/write bits of this mask
    pub fn generic(&self) -> Self {
        *self & Self::read_write()
    }
}

bitflags! {
    /// Share mode of a create request
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
    pub struct ShareMode: u32 {
        const READ = 0x0000_0001;
        const WRITE = 0x0000_0002;
    }
}

/// Completion status reported to the transport layer
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum StatusCode {
    Success,
    InvalidParameter,
    NotFound,
    SharingViolation,
    ResourceAllocationFailure,
    TransportFailure,
    HandoffFailure,
    /// Failure outside the request taxonomy (configuration, internal state)
    Unsuccessful,
}

impl StatusCode {
    pub fn is_success(&self) -> bool {
        matches!(self, StatusCode::Success)
    }
}

impl fmt::Display for StatusCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            StatusCode::Success => "success",
            StatusCode::InvalidParameter => "invalid parameter",
            StatusCode::NotFound => "not found",
            StatusCode::SharingViolation => "sharing violation",
            StatusCode::ResourceAllocationFailure => "resource allocation failure",
            StatusCode::TransportFailure => "transport failure",
            StatusCode::HandoffFailure => "handoff failure",
            StatusCode::Unsuccessful => "unsuccessful",
        };
        f.write_str(name)
    }
}

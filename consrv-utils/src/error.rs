//! Error types for consrv
//!
//! Provides a unified error type used across all consrv crates, and the
//! mapping from errors to the status codes carried in transport replies.

use std::path::PathBuf;

use consrv_protocol::{CodecError, ProtocolError, StatusCode};

/// Main error type for consrv operations
#[derive(Debug, thiserror::Error)]
pub enum ConsoleError {
    // === Request Errors ===

    #[error("Invalid parameter: {0}")]
    InvalidParameter(String),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Sharing violation: {0}")]
    SharingViolation(String),

    // === Resource Errors ===

    #[error("Resource allocation failed: {0}")]
    ResourceAllocation(String),

    // === Transport Errors ===

    #[error("Transport failure: {0}")]
    Transport(String),

    // === Handoff Errors ===

    #[error("Handoff failed: {0}")]
    Handoff(String),

    // === IO Errors ===

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Failed to read file {path}: {source}")]
    FileRead {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("Failed to write file {path}: {source}")]
    FileWrite {
        path: PathBuf,
        source: std::io::Error,
    },

    // === Protocol Errors ===

    #[error("Protocol error: {0}")]
    Protocol(#[from] ProtocolError),

    #[error("Codec error: {0}")]
    Codec(#[from] CodecError),

    // === Configuration Errors ===

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Invalid configuration at {path}: {message}")]
    ConfigInvalid { path: PathBuf, message: String },

    // === Internal Errors ===

    #[error("Internal error: {0}")]
    Internal(String),
}

impl ConsoleError {
    /// Create an invalid parameter error
    pub fn invalid_parameter(msg: impl Into<String>) -> Self {
        Self::InvalidParameter(msg.into())
    }

    /// Create a not found error
    pub fn not_found(msg: impl Into<String>) -> Self {
        Self::NotFound(msg.into())
    }

    /// Create a sharing violation error
    pub fn sharing_violation(msg: impl Into<String>) -> Self {
        Self::SharingViolation(msg.into())
    }

    /// Create a resource allocation error
    pub fn resource_allocation(msg: impl Into<String>) -> Self {
        Self::ResourceAllocation(msg.into())
    }

    /// Create a transport error
    pub fn transport(msg: impl Into<String>) -> Self {
        Self::Transport(msg.into())
    }

    /// Create a handoff error
    pub fn handoff(msg: impl Into<String>) -> Self {
        Self::Handoff(msg.into())
    }

    /// Create a config error
    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config(msg.into())
    }

    /// Create an internal error
    pub fn internal(msg: impl Into<String>) -> Self {
        Self::Internal(msg.into())
    }

    /// Status code reported to the transport for this error
    pub fn status(&self) -> StatusCode {
        match self {
            Self::InvalidParameter(_) | Self::Protocol(_) | Self::Codec(_) => {
                StatusCode::InvalidParameter
            }
            Self::NotFound(_) => StatusCode::NotFound,
            Self::SharingViolation(_) => StatusCode::SharingViolation,
            Self::ResourceAllocation(_) => StatusCode::ResourceAllocationFailure,
            Self::Transport(_) | Self::Io(_) => StatusCode::TransportFailure,
            Self::Handoff(_) => StatusCode::HandoffFailure,
            Self::FileRead { .. }
            | Self::FileWrite { .. }
            | Self::Config(_)
            | Self::ConfigInvalid { .. }
            | Self::Internal(_) => StatusCode::Unsuccessful,
        }
    }
}

/// Result type alias using ConsoleError
pub type Result<T> = std::result::Result<T, ConsoleError>;

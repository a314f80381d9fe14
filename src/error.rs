//! # Error Types
//!
//! Error handling for the segmented message protocol.
//!
//! Every decode and reassembly path returns one of these variants instead of
//! panicking, so a malformed or hostile frame only ever costs the caller the
//! frame itself.
//!
//! ## Error Categories
//! - **Wire Errors**: Truncated or inconsistent frames
//! - **Session Errors**: Out-of-range indices, finalized or incomplete sessions
//! - **Fragmentation Errors**: Invalid frame size, messages too large to index
//! - **Transport Errors**: Socket failures, oversized packets, closed streams
//! - **Configuration Errors**: Unparseable or invalid settings
//!
//! ## Example Usage
//! ```rust
//! use segment_protocol::core::frame::Frame;
//! use segment_protocol::error::ProtocolError;
//! use tracing::warn;
//!
//! match Frame::from_bytes(&[0x01, 0x07]) {
//!     Ok(frame) => println!("session {}", frame.session_id),
//!     Err(ProtocolError::MalformedFrame(reason)) => warn!(reason, "Dropping frame"),
//!     Err(e) => warn!(error = %e, "Unexpected error"),
//! }
//! ```

use serde::Serialize;
use std::io;
use thiserror::Error;

/// Error message constants to reduce allocations in error paths.
pub mod constants {
    /// Frame decoding errors
    pub const ERR_FRAME_TOO_SHORT: &str = "frame shorter than fixed prefix";
    pub const ERR_START_FRAME_TOO_SHORT: &str = "START frame missing header length field";
    pub const ERR_UNKNOWN_TYPE_BITS: &str = "unknown message type bits";
    pub const ERR_START_NOT_FIRST: &str = "START flag on non-zero frame index";
    pub const ERR_FIRST_NOT_START: &str = "frame index 0 without START flag";
    pub const ERR_HEADER_LENGTH_OVERFLOW: &str = "header length exceeds reassembled stream";

    /// Session table errors
    pub const ERR_SESSION_TABLE_LOCK: &str = "Failed to acquire lock on session table";
}

/// ProtocolError is the primary error type for all protocol operations
#[derive(Error, Debug, Serialize)]
pub enum ProtocolError {
    #[error("I/O error: {0}")]
    #[serde(skip_serializing)]
    Io(#[from] io::Error),

    #[error("Malformed frame: {0}")]
    MalformedFrame(&'static str),

    #[error("Frame index {index} out of range (max {max})")]
    FrameIndexOutOfRange { index: u16, max: u16 },

    #[error("Session already complete")]
    SessionAlreadyComplete,

    #[error("Session incomplete")]
    IncompleteSession,

    #[error("Invalid frame size: {0}")]
    InvalidFrameSize(usize),

    #[error("Message too large to fragment: {0} bytes")]
    MessageTooLarge(usize),

    #[error("Packet too large: {0} bytes")]
    OversizedPacket(usize),

    #[error("Synchronization primitive poisoned")]
    LockPoisoned,

    #[error("Connection closed")]
    ConnectionClosed,

    #[error("Transport error: {0}")]
    TransportError(String),

    #[error("Configuration error: {0}")]
    ConfigError(String),
}

/// Type alias for Results using ProtocolError
pub type Result<T> = std::result::Result<T, ProtocolError>;

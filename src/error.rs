//! # Error Types
//!
//! Error handling for the Levin protocol.
//!
//! Every failure in the codec and framing layers is terminal for the current
//! encode/decode call and is returned to the caller. Nothing is retried or
//! swallowed inside the core.
//!
//! ## Error Categories
//! - **Framing Errors**: bad bucket signature, oversized payloads, unknown commands
//! - **Storage Errors**: bad portable-storage header, unknown type tags, malformed arrays
//! - **Value Errors**: out-of-range primitives, VarInt overflow
//! - **Stream Errors**: truncated input, I/O failures, timeouts
//!
//! ## Example Usage
//! ```rust
//! use levin_protocol::error::{ProtocolError, Result};
//! use levin_protocol::core::storage::decode_section;
//! use tracing::{error, info};
//!
//! fn inspect(bytes: &[u8]) -> Result<usize> {
//!     let section = decode_section(bytes)?;
//!     Ok(section.len())
//! }
//!
//! match inspect(&[0x01, 0x11]) {
//!     Ok(entries) => info!(entries, "Decoded section"),
//!     Err(ProtocolError::TruncatedInput { .. }) => error!("Payload was cut short"),
//!     Err(e) => error!(error = %e, "Decode failed"),
//! }
//! ```

use serde::{Deserialize, Serialize};
use std::io;
use thiserror::Error;

/// Error message constants to reduce allocations in error paths.
pub mod constants {
    /// Dispatcher-related error messages
    pub const ERR_DISPATCHER_WRITE_LOCK: &str = "Failed to acquire write lock on dispatcher";
    pub const ERR_DISPATCHER_READ_LOCK: &str = "Failed to acquire read lock on dispatcher";

    /// Array decoding errors
    pub const ERR_NESTED_ARRAY: &str = "array of arrays is not representable";
    pub const ERR_MIXED_ARRAY: &str = "array elements do not share one type";
}

/// ProtocolError is the primary error type for all protocol operations
#[derive(Error, Debug, Serialize, Deserialize)]
pub enum ProtocolError {
    #[error("I/O error: {0}")]
    #[serde(skip_serializing, skip_deserializing)]
    Io(#[from] io::Error),

    #[error("Bad signature: expected {expected:#x}, found {found:#x}")]
    BadSignature { expected: u64, found: u64 },

    #[error("Unsupported portable storage version: {0}")]
    UnsupportedVersion(u8),

    #[error("Packet too large: {size} bytes (limit {limit})")]
    PacketTooLarge { size: u64, limit: u64 },

    #[error("Truncated input: needed {needed} bytes, {available} available")]
    TruncatedInput { needed: usize, available: usize },

    #[error("VarInt overflow: {0} does not fit in 62 bits")]
    VarIntOverflow(u64),

    #[error("Value out of range: {0}")]
    ValueOutOfRange(String),

    #[error("Unknown type tag: {0:#04x}")]
    UnknownType(u8),

    #[error("Malformed array: {0}")]
    MalformedArray(String),

    #[error("Unknown command: {0}")]
    UnknownCommand(u32),

    #[error("Section nesting exceeds depth limit of {0}")]
    DepthLimitExceeded(usize),

    #[error("Connection closed")]
    ConnectionClosed,

    #[error("Timeout occurred")]
    Timeout,

    #[error("Unexpected message: {0}")]
    UnexpectedMessage(String),

    #[error("Configuration error: {0}")]
    ConfigError(String),

    #[error("Custom error: {0}")]
    Custom(String),
}

impl ProtocolError {
    /// Shorthand for a short read of `needed` bytes with `available` left.
    pub fn truncated(needed: usize, available: usize) -> Self {
        ProtocolError::TruncatedInput { needed, available }
    }
}

/// Type alias for Results using ProtocolError
pub type Result<T> = std::result::Result<T, ProtocolError>;

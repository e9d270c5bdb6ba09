//! # Levin Protocol
//!
//! Wire codec and async client for the Levin P2P protocol: the
//! portable-storage binary serialization format and the bucket framing that
//! carries it between nodes.
//!
//! ## Layers
//! - [`core`]: value model, portable-storage reader/writer, bucket framing
//! - [`protocol`]: command registry, message builders, request dispatch
//! - [`transport`]: TCP client over a Tokio codec
//! - [`utils`]: logging, metrics, timeouts
//!
//! ## Example
//! ```
//! use levin_protocol::{decode_section, encode_section, Section};
//!
//! let section = Section::new().with("height", 42u64).with("name", "node");
//! let bytes = encode_section(&section)?;
//! assert_eq!(decode_section(&bytes)?, section);
//! # Ok::<(), levin_protocol::ProtocolError>(())
//! ```

#![cfg_attr(not(test), deny(clippy::unwrap_used, clippy::expect_used))]

pub mod config;
pub mod core;
pub mod error;
pub mod protocol;
pub mod transport;
pub mod utils;

pub use crate::core::bucket::{pack_bucket, read_bucket, Bucket, BucketHeader};
pub use crate::core::codec::BucketCodec;
pub use crate::core::primitive::Primitive;
pub use crate::core::section::Section;
pub use crate::core::storage::{decode_section, encode_section};
pub use crate::core::value::{Array, ByteString, Entry, TypeTag};
pub use config::{FramerLimits, NetworkConfig};
pub use error::{ProtocolError, Result};
pub use protocol::{Command, Dispatcher};
pub use transport::LevinClient;

//! # Core Protocol Components
//!
//! Value model, portable-storage codec and bucket framing.
//!
//! ## Components
//! - **Primitive**: fixed-width integers, booleans and doubles
//! - **VarInt**: size-tagged variable-length counts and lengths
//! - **Value / Section**: the in-memory value tree
//! - **Storage**: portable-storage reader and writer
//! - **Bucket**: Levin header, packing and the blocking receive loop
//! - **Codec**: Tokio codec for framing buckets over async streams
//!
//! ## Data Flow
//! ```text
//! send:    Section -> storage::encode_section -> Bucket -> bytes
//! receive: bytes -> bucket::read_bucket / BucketCodec -> storage::decode_section -> Section
//! ```
//!
//! Everything here is synchronous and owns its own cursor; independent
//! streams can be decoded on independent threads without locking.

pub mod bucket;
pub mod codec;
pub mod primitive;
pub mod section;
pub mod storage;
pub mod value;
pub mod varint;

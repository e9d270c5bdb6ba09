//! # Transport Layer
//!
//! Async TCP client speaking Levin buckets.

pub mod tcp;

pub use tcp::LevinClient;

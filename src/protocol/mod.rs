//! # P2P Protocol Layer
//!
//! Command registry, message builders and request dispatch on top of the
//! core codec.

pub mod command;
pub mod dispatcher;
pub mod message;

pub use command::Command;
pub use dispatcher::Dispatcher;
pub use message::{peer_list, HandshakeRequest, PeerEntry};

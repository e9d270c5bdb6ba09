//! Levin P2P command registry.
//!
//! The registry is an immutable table; a bucket whose command is not listed
//! here is rejected by the framer with [`ProtocolError::UnknownCommand`].

use crate::error::{ProtocolError, Result};
use std::fmt;

/// Base of the P2P command pool
pub const P2P_COMMANDS_POOL_BASE: u32 = 1000;

/// Known P2P commands.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u32)]
pub enum Command {
    Handshake = P2P_COMMANDS_POOL_BASE + 1,
    TimedSync = P2P_COMMANDS_POOL_BASE + 2,
    Ping = P2P_COMMANDS_POOL_BASE + 3,
    RequestStatInfo = P2P_COMMANDS_POOL_BASE + 4,
    RequestNetworkState = P2P_COMMANDS_POOL_BASE + 5,
    RequestPeerId = P2P_COMMANDS_POOL_BASE + 6,
    RequestSupportFlags = P2P_COMMANDS_POOL_BASE + 7,
}

/// Command table: command and display name. Wire codes come from the
/// discriminants.
static COMMAND_TABLE: [(Command, &str); 7] = [
    (Command::Handshake, "handshake"),
    (Command::TimedSync, "timed_sync"),
    (Command::Ping, "ping"),
    (Command::RequestStatInfo, "stat_info"),
    (Command::RequestNetworkState, "network_state"),
    (Command::RequestPeerId, "peer_id"),
    (Command::RequestSupportFlags, "support_flags"),
];

impl Command {
    /// Wire code
    pub const fn code(self) -> u32 {
        self as u32
    }

    /// Look a code up in the registry
    pub fn from_code(code: u32) -> Option<Self> {
        COMMAND_TABLE
            .iter()
            .find(|(command, _)| command.code() == code)
            .map(|(command, _)| *command)
    }

    /// Human-readable name used in logs
    pub fn name(self) -> &'static str {
        COMMAND_TABLE
            .iter()
            .find(|(command, _)| *command == self)
            .map(|(_, name)| *name)
            .unwrap_or("unknown")
    }

    /// Every registered command
    pub fn all() -> impl Iterator<Item = Command> {
        COMMAND_TABLE.iter().map(|(command, _)| *command)
    }
}

impl TryFrom<u32> for Command {
    type Error = ProtocolError;

    fn try_from(code: u32) -> Result<Self> {
        Command::from_code(code).ok_or(ProtocolError::UnknownCommand(code))
    }
}

impl fmt::Display for Command {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({})", self.name(), self.code())
    }
}

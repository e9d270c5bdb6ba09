//! P2P message payloads built on top of [`Section`].
//!
//! Builders for the requests this client sends and extraction of the peer
//! list a node returns in its handshake response.

use crate::config::{MAINNET_GENESIS_HASH, MAINNET_NETWORK_ID, P2P_SUPPORT_FLAGS};
use crate::core::primitive::{decode_int, encode_int, IntFormat};
use crate::core::section::Section;
use crate::core::value::ByteString;
use crate::error::{ProtocolError, Result};
use std::net::Ipv4Addr;
use std::time::{SystemTime, UNIX_EPOCH};

/// Contents of a handshake request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HandshakeRequest {
    pub local_time: u64,
    pub my_port: u32,
    pub network_id: [u8; 16],
    pub peer_id: u64,
    pub cumulative_difficulty: u64,
    pub current_height: u64,
    pub top_id: [u8; 32],
    pub top_version: u8,
}

impl Default for HandshakeRequest {
    fn default() -> Self {
        Self {
            local_time: unix_time(),
            my_port: 0,
            network_id: MAINNET_NETWORK_ID,
            peer_id: rand::random(),
            cumulative_difficulty: 1,
            current_height: 1,
            top_id: MAINNET_GENESIS_HASH,
            top_version: 1,
        }
    }
}

impl HandshakeRequest {
    /// `{node_data: {...}, payload_data: {...}}` in wire order
    pub fn to_section(&self) -> Section {
        let node_data = Section::new()
            .with("local_time", self.local_time)
            .with("my_port", self.my_port)
            .with("network_id", ByteString::from(self.network_id))
            .with("peer_id", self.peer_id);

        let payload_data = Section::new()
            .with("cumulative_difficulty", self.cumulative_difficulty)
            .with("current_height", self.current_height)
            .with("top_id", ByteString::from(self.top_id))
            .with("top_version", self.top_version);

        Section::new()
            .with("node_data", node_data)
            .with("payload_data", payload_data)
    }
}

/// Stat-info request carrying an unsigned proof of trust.
pub fn stat_info_request(peer_id: u64) -> Section {
    let proof_of_trust = Section::new()
        .with("peer_id", peer_id)
        .with("time", unix_time())
        .with("sign", ByteString::from([0u8; 64]));
    Section::new().with("proof_of_trust", proof_of_trust)
}

/// Answer to a support-flags request.
pub fn support_flags_response() -> Section {
    Section::new().with("support_flags", P2P_SUPPORT_FLAGS)
}

/// One entry of a node's advertised peer list.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PeerEntry {
    pub ip: Ipv4Addr,
    pub port: u16,
    pub last_seen: Option<i64>,
}

/// Extract `local_peerlist_new` from a handshake or timed-sync response.
///
/// Entries without an IPv4 address and port are skipped. The result is
/// ordered by `last_seen`, newest first, entries without it last.
pub fn peer_list(section: &Section) -> Result<Vec<PeerEntry>> {
    let Some(list) = section.get("local_peerlist_new") else {
        return Ok(Vec::new());
    };
    let array = list.as_array().ok_or_else(|| {
        ProtocolError::UnexpectedMessage("local_peerlist_new is not an array".to_string())
    })?;

    let mut peers = Vec::with_capacity(array.len());
    for peer in array.sections() {
        let ip = peer
            .get_path(&["adr", "addr", "m_ip"])
            .and_then(|e| e.as_u64())
            .and_then(|v| u32::try_from(v).ok());
        let port = peer
            .get_path(&["adr", "addr", "m_port"])
            .and_then(|e| e.as_u64())
            .and_then(|v| u16::try_from(v).ok());
        let (Some(ip), Some(port)) = (ip, port) else {
            continue;
        };

        peers.push(PeerEntry {
            ip: network_order_ipv4(ip)?,
            port,
            last_seen: peer.get("last_seen").and_then(|e| e.as_i64()),
        });
    }

    peers.sort_by(|a, b| b.last_seen.cmp(&a.last_seen));
    Ok(peers)
}

/// `m_ip` holds the address in network byte order inside a little-endian
/// field; reading its wire bytes big-endian yields the dotted-quad value.
fn network_order_ipv4(m_ip: u32) -> Result<Ipv4Addr> {
    let mut wire = Vec::with_capacity(4);
    encode_int(m_ip.into(), IntFormat::U32, &mut wire)?;
    let value = decode_int(&mut &wire[..], IntFormat::U32.big_endian())?;
    let value = u32::try_from(value)
        .map_err(|_| ProtocolError::ValueOutOfRange(format!("{value} is not an IPv4 address")))?;
    Ok(Ipv4Addr::from(value))
}

fn unix_time() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs())
        .unwrap_or_default()
}

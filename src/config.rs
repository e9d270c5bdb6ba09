//! # Configuration Management
//!
//! Wire constants and runtime configuration for Levin clients.
//!
//! The constants in this module must match the reference network exactly;
//! changing any of them breaks interoperability. The [`NetworkConfig`] tree
//! covers everything a deployment may tune: where to connect, how long to
//! wait, how large a bucket may be and how to log.
//!
//! ## Configuration Sources
//! - TOML files via `from_file()`
//! - Direct instantiation with defaults
//! - Environment overrides via `from_env()` (`LEVIN_*` variables)

use crate::error::{ProtocolError, Result};
use crate::utils::timeout;
use serde::{Deserialize, Serialize};
use std::fs::File;
use std::io::Read;
use std::path::Path;
use std::time::Duration;
use tracing::Level;

/// Bucket signature ("Bender's nightmare"), little-endian on the wire.
pub const LEVIN_SIGNATURE: u64 = 0x0101_0101_0101_2101;

/// Bucket protocol version carried in every header.
pub const LEVIN_PROTOCOL_VERSION: u32 = 1;

/// `flags` value marking a request bucket.
pub const LEVIN_PACKET_REQUEST: u32 = 0x0000_0001;

/// `flags` value marking a response bucket.
pub const LEVIN_PACKET_RESPONSE: u32 = 0x0000_0002;

/// `return_code` of a successful response.
pub const LEVIN_OK: i32 = 0;

/// Default ceiling for a bucket payload (100 MB).
pub const MAX_PAYLOAD_SIZE: u64 = 100_000_000;

/// Upper bound of a single read while accumulating a payload.
pub const READ_CHUNK_SIZE: usize = 2048;

/// Support flag advertising fluffy block relay.
pub const P2P_SUPPORT_FLAG_FLUFFY_BLOCKS: u8 = 0x01;

/// All support flags this client advertises.
pub const P2P_SUPPORT_FLAGS: u8 = P2P_SUPPORT_FLAG_FLUFFY_BLOCKS;

/// Mainnet network id.
pub const MAINNET_NETWORK_ID: [u8; 16] = [
    0x12, 0x30, 0xf1, 0x71, 0x61, 0x04, 0x41, 0x61, 0x17, 0x31, 0x00, 0x82, 0x16, 0xa1, 0xa1, 0x10,
];

/// Mainnet genesis block hash, as sent in `payload_data.top_id`.
pub const MAINNET_GENESIS_HASH: [u8; 32] = [
    0x41, 0x80, 0x15, 0xbb, 0x9a, 0xe9, 0x82, 0xa1, 0x97, 0x5d, 0xa7, 0xd7, 0x92, 0x77, 0xc2, 0x70,
    0x57, 0x27, 0xa5, 0x68, 0x94, 0xba, 0x0f, 0xb2, 0x46, 0xad, 0xaa, 0xbb, 0x1f, 0x46, 0x32, 0xe3,
];

/// Default P2P port of mainnet nodes.
pub const MAINNET_P2P_PORT: u16 = 18080;

/// Limits applied by the bucket framer while receiving.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FramerLimits {
    /// Largest payload accepted from a peer
    pub max_payload_size: u64,
    /// Largest single read issued while accumulating a payload
    pub read_chunk_size: usize,
}

impl Default for FramerLimits {
    fn default() -> Self {
        Self {
            max_payload_size: MAX_PAYLOAD_SIZE,
            read_chunk_size: READ_CHUNK_SIZE,
        }
    }
}

/// Main configuration structure that contains all configurable settings
#[derive(Debug, Clone, Deserialize, Serialize, Default)]
pub struct NetworkConfig {
    /// Client-specific configuration
    #[serde(default)]
    pub client: ClientConfig,

    /// Transport configuration
    #[serde(default)]
    pub transport: TransportConfig,

    /// Identity this node presents in handshakes
    #[serde(default)]
    pub node: NodeConfig,

    /// Logging configuration
    #[serde(default)]
    pub logging: LoggingConfig,
}

impl NetworkConfig {
    /// Load configuration from a TOML file
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let mut file = File::open(path)
            .map_err(|e| ProtocolError::ConfigError(format!("Failed to open config file: {e}")))?;

        let mut contents = String::new();
        file.read_to_string(&mut contents)
            .map_err(|e| ProtocolError::ConfigError(format!("Failed to read config file: {e}")))?;

        Self::from_toml(&contents)
    }

    /// Load configuration from TOML string
    pub fn from_toml(content: &str) -> Result<Self> {
        toml::from_str::<Self>(content)
            .map_err(|e| ProtocolError::ConfigError(format!("Failed to parse TOML: {e}")))
    }

    /// Load configuration from environment variables
    pub fn from_env() -> Result<Self> {
        let mut config = Self::default();

        if let Ok(addr) = std::env::var("LEVIN_ADDRESS") {
            config.client.address = addr;
        }

        if let Ok(timeout) = std::env::var("LEVIN_CONNECTION_TIMEOUT_MS") {
            if let Ok(val) = timeout.parse::<u64>() {
                config.client.connection_timeout = Duration::from_millis(val);
            }
        }

        if let Ok(timeout) = std::env::var("LEVIN_RESPONSE_TIMEOUT_MS") {
            if let Ok(val) = timeout.parse::<u64>() {
                config.client.response_timeout = Duration::from_millis(val);
            }
        }

        if let Ok(size) = std::env::var("LEVIN_MAX_PAYLOAD_SIZE") {
            if let Ok(val) = size.parse::<u64>() {
                config.transport.max_payload_size = val;
            }
        }

        if let Ok(id) = std::env::var("LEVIN_NETWORK_ID") {
            config.node.network_id = id;
        }

        Ok(config)
    }

    /// Apply overrides to the default configuration
    pub fn default_with_overrides<F>(mutator: F) -> Self
    where
        F: FnOnce(&mut Self),
    {
        let mut config = Self::default();
        mutator(&mut config);
        config
    }

    /// Generate example configuration file content
    pub fn example_config() -> String {
        toml::to_string_pretty(&Self::default())
            .unwrap_or_else(|_| String::from("# Failed to generate example config"))
    }

    /// Save configuration to a file
    pub fn save_to_file<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let content = toml::to_string_pretty(self)
            .map_err(|e| ProtocolError::ConfigError(format!("Failed to serialize config: {e}")))?;

        std::fs::write(path, content)
            .map_err(|e| ProtocolError::ConfigError(format!("Failed to write config file: {e}")))?;

        Ok(())
    }

    /// Validate the configuration for common issues and misconfigurations
    ///
    /// Returns a list of validation errors. Empty list means configuration is valid.
    pub fn validate(&self) -> Vec<String> {
        let mut errors = Vec::new();
        errors.extend(self.client.validate());
        errors.extend(self.transport.validate());
        errors.extend(self.node.validate());
        errors.extend(self.logging.validate());
        errors
    }

    /// Validate and return Result - convenience method
    pub fn validate_strict(&self) -> Result<()> {
        let errors = self.validate();
        if errors.is_empty() {
            Ok(())
        } else {
            Err(ProtocolError::ConfigError(format!(
                "Configuration validation failed:\n  - {}",
                errors.join("\n  - ")
            )))
        }
    }
}

/// Client-specific configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ClientConfig {
    /// Target node address (e.g., "127.0.0.1:18080")
    pub address: String,

    /// Timeout for connection attempts
    #[serde(with = "duration_serde")]
    pub connection_timeout: Duration,

    /// Timeout for waiting on a single bucket from the peer
    #[serde(with = "duration_serde")]
    pub response_timeout: Duration,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            address: format!("127.0.0.1:{MAINNET_P2P_PORT}"),
            connection_timeout: timeout::DEFAULT_TIMEOUT,
            response_timeout: timeout::RESPONSE_TIMEOUT,
        }
    }
}

impl ClientConfig {
    /// Validate client configuration
    pub fn validate(&self) -> Vec<String> {
        let mut errors = Vec::new();

        if self.address.is_empty() {
            errors.push("Client address cannot be empty".to_string());
        } else if !self.address.contains(':') {
            errors.push(format!(
                "Invalid client address format: '{}' (expected format: 'host:18080')",
                self.address
            ));
        }

        if self.connection_timeout.as_millis() < 100 {
            errors.push("Connection timeout too short (minimum: 100ms)".to_string());
        } else if self.connection_timeout.as_secs() > 300 {
            errors.push("Connection timeout too long (maximum: 300s)".to_string());
        }

        if self.response_timeout.as_millis() < 100 {
            errors.push("Response timeout too short (minimum: 100ms)".to_string());
        }

        errors
    }
}

/// Transport configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct TransportConfig {
    /// Maximum allowed payload size in bytes
    pub max_payload_size: u64,

    /// Maximum bytes requested per read while accumulating a payload
    pub read_chunk_size: usize,
}

impl Default for TransportConfig {
    fn default() -> Self {
        Self {
            max_payload_size: MAX_PAYLOAD_SIZE,
            read_chunk_size: READ_CHUNK_SIZE,
        }
    }
}

impl TransportConfig {
    /// Framer limits derived from this configuration
    pub fn limits(&self) -> FramerLimits {
        FramerLimits {
            max_payload_size: self.max_payload_size,
            read_chunk_size: self.read_chunk_size,
        }
    }

    /// Validate transport configuration
    pub fn validate(&self) -> Vec<String> {
        let mut errors = Vec::new();

        if self.max_payload_size == 0 {
            errors.push("Max payload size cannot be 0".to_string());
        } else if self.max_payload_size > MAX_PAYLOAD_SIZE {
            errors.push(format!(
                "Max payload size too large: {} bytes (maximum: {MAX_PAYLOAD_SIZE})",
                self.max_payload_size
            ));
        }

        if self.read_chunk_size == 0 {
            errors.push("Read chunk size cannot be 0".to_string());
        } else if self.read_chunk_size > 1024 * 1024 {
            errors.push(format!(
                "Read chunk size too large: {} bytes (maximum: 1 MB)",
                self.read_chunk_size
            ));
        }

        errors
    }
}

/// Node identity presented to peers
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct NodeConfig {
    /// Port advertised in `node_data.my_port` (0 = not accepting connections)
    pub my_port: u32,

    /// Hex-encoded 16-byte network id
    pub network_id: String,

    /// Fixed peer id; a random one is drawn per handshake when absent
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub peer_id: Option<u64>,
}

impl Default for NodeConfig {
    fn default() -> Self {
        Self {
            my_port: 0,
            network_id: hex::encode(MAINNET_NETWORK_ID),
            peer_id: None,
        }
    }
}

impl NodeConfig {
    /// Decode the configured network id
    pub fn network_id_bytes(&self) -> Result<[u8; 16]> {
        let raw = hex::decode(&self.network_id)
            .map_err(|e| ProtocolError::ConfigError(format!("Invalid network id hex: {e}")))?;
        raw.try_into().map_err(|raw: Vec<u8>| {
            ProtocolError::ConfigError(format!(
                "Network id must be 16 bytes, got {}",
                raw.len()
            ))
        })
    }

    /// Validate node configuration
    pub fn validate(&self) -> Vec<String> {
        let mut errors = Vec::new();

        if let Err(e) = self.network_id_bytes() {
            errors.push(e.to_string());
        }

        if self.my_port > u16::MAX as u32 {
            errors.push(format!("Advertised port out of range: {}", self.my_port));
        }

        errors
    }
}

/// Logging configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Application name for logs
    pub app_name: String,

    /// Log level
    #[serde(with = "log_level_serde")]
    pub log_level: Level,

    /// Whether to use JSON formatting for logs
    pub json_format: bool,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            app_name: String::from("levin-protocol"),
            log_level: Level::INFO,
            json_format: false,
        }
    }
}

impl LoggingConfig {
    /// Validate logging configuration
    pub fn validate(&self) -> Vec<String> {
        let mut errors = Vec::new();

        if self.app_name.is_empty() {
            errors.push("Application name cannot be empty".to_string());
        } else if self.app_name.len() > 64 {
            errors.push(format!(
                "Application name too long: {} characters (maximum: 64)",
                self.app_name.len()
            ));
        }

        errors
    }
}

/// Helper module for Duration serialization/deserialization
mod duration_serde {
    use serde::{Deserialize, Deserializer, Serialize, Serializer};
    use std::time::Duration;

    pub fn serialize<S>(duration: &Duration, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        let millis = duration.as_millis() as u64;
        millis.serialize(serializer)
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<Duration, D::Error>
    where
        D: Deserializer<'de>,
    {
        let millis = u64::deserialize(deserializer)?;
        Ok(Duration::from_millis(millis))
    }
}

/// Helper module for tracing::Level serialization/deserialization
mod log_level_serde {
    use serde::{Deserialize, Deserializer, Serialize, Serializer};
    use std::str::FromStr;
    use tracing::Level;

    pub fn serialize<S>(level: &Level, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        let level_str = match *level {
            Level::TRACE => "trace",
            Level::DEBUG => "debug",
            Level::INFO => "info",
            Level::WARN => "warn",
            Level::ERROR => "error",
        };
        level_str.serialize(serializer)
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<Level, D::Error>
    where
        D: Deserializer<'de>,
    {
        let level_str = String::deserialize(deserializer)?;
        Level::from_str(&level_str)
            .map_err(|_| serde::de::Error::custom(format!("Invalid log level: {level_str}")))
    }
}

//! Handshake a node and print the peers it advertises.

use clap::Parser;
use levin_protocol::config::NetworkConfig;
use levin_protocol::protocol::{peer_list, Command, Dispatcher, HandshakeRequest};
use levin_protocol::utils::logging::init_logging;
use levin_protocol::utils::metrics::global_metrics;
use levin_protocol::{LevinClient, Result};
use std::path::PathBuf;
use std::process::ExitCode;
use std::time::Duration;
use tracing::{error, info};

#[derive(Debug, Parser)]
#[command(name = "levin-peers", version, about = "List the peers a Levin node advertises")]
struct Cli {
    /// Node host name or IP address
    host: String,

    /// Node P2P port
    port: u16,

    /// TOML configuration file; LEVIN_* environment variables apply otherwise
    #[arg(long)]
    config: Option<PathBuf>,

    /// Network id as 32 hex characters
    #[arg(long)]
    network_id: Option<String>,

    /// Port to advertise in the handshake
    #[arg(long)]
    my_port: Option<u32>,

    /// Connect and response timeout in milliseconds
    #[arg(long)]
    timeout_ms: Option<u64>,

    /// Emit logs as JSON
    #[arg(long)]
    json_logs: bool,
}

impl Cli {
    fn load_config(&self) -> Result<NetworkConfig> {
        let mut config = match &self.config {
            Some(path) => NetworkConfig::from_file(path)?,
            None => NetworkConfig::from_env()?,
        };

        config.client.address = format!("{}:{}", self.host, self.port);
        if let Some(id) = &self.network_id {
            config.node.network_id = id.clone();
        }
        if let Some(port) = self.my_port {
            config.node.my_port = port;
        }
        if let Some(ms) = self.timeout_ms {
            config.client.connection_timeout = Duration::from_millis(ms);
            config.client.response_timeout = Duration::from_millis(ms);
        }
        config.logging.json_format |= self.json_logs;

        config.validate_strict()?;
        Ok(config)
    }
}

async fn run(config: NetworkConfig) -> Result<()> {
    let mut handshake = HandshakeRequest {
        my_port: config.node.my_port,
        network_id: config.node.network_id_bytes()?,
        ..HandshakeRequest::default()
    };
    if let Some(peer_id) = config.node.peer_id {
        handshake.peer_id = peer_id;
    }

    let mut client = LevinClient::from_config(&config)
        .await?
        .with_dispatcher(Dispatcher::with_defaults()?);

    info!(address = %config.client.address, "sending handshake");
    let response = client
        .request(Command::Handshake, &handshake.to_section())
        .await?;

    let peers = peer_list(&response)?;
    info!(count = peers.len(), "handshake complete");
    for peer in peers {
        println!("{}:{}", peer.ip, peer.port);
    }
    Ok(())
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();
    let config = match cli.load_config() {
        Ok(config) => config,
        Err(e) => {
            eprintln!("levin-peers: {e}");
            return ExitCode::FAILURE;
        }
    };
    init_logging(&config.logging);

    let outcome = run(config).await;
    global_metrics().log_metrics();
    match outcome {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            error!(error = %e, "levin-peers failed");
            eprintln!("levin-peers: {e}");
            ExitCode::FAILURE
        }
    }
}

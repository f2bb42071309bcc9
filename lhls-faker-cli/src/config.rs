//! Server configuration.

use std::net::SocketAddr;
use std::path::PathBuf;

use lhls_engine::LiveConfig;

use crate::cli::Args;
use crate::error::{AppError, Result};

/// HTTP server configuration.
#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// Playlist to simulate
    pub playlist: PathBuf,
    /// Server bind address
    pub bind_address: String,
    /// Server port
    pub port: u16,
    /// Optional directory for rolling log files
    pub log_dir: Option<PathBuf>,
    /// Debug-level logging for the application crates
    pub verbose: bool,
    /// Live window and pacing tunables
    pub live: LiveConfig,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            playlist: PathBuf::from("index.m3u8"),
            bind_address: "0.0.0.0".to_string(),
            port: 8080,
            log_dir: None,
            verbose: false,
            live: LiveConfig::default(),
        }
    }
}

impl From<Args> for ServerConfig {
    fn from(args: Args) -> Self {
        Self {
            playlist: args.playlist,
            bind_address: args.bind,
            port: args.port,
            log_dir: args.log_dir,
            verbose: args.verbose,
            live: LiveConfig::default().with_future_horizon(args.future_horizon),
        }
    }
}

impl ServerConfig {
    pub fn socket_addr(&self) -> Result<SocketAddr> {
        format!("{}:{}", self.bind_address, self.port)
            .parse()
            .map_err(|e| AppError::InvalidAddress(format!("{}:{}: {e}", self.bind_address, self.port)))
    }
}

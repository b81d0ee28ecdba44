//! Server configuration from the environment.

use crate::error::ServerError;
use sphereboard_core::storage::FileStorage;
use std::net::SocketAddr;
use std::path::PathBuf;

pub const ADDR_VAR: &str = "SPHEREBOARD_ADDR";
pub const DATA_DIR_VAR: &str = "SPHEREBOARD_DATA_DIR";
pub const DEFAULT_ADDR: &str = "0.0.0.0:3030";

/// Server configuration
#[derive(Debug, Clone, PartialEq)]
pub struct ServerConfig {
    pub addr: SocketAddr,
    /// Directory holding one JSON file per board
    pub data_dir: PathBuf,
}

impl ServerConfig {
    pub fn from_env() -> Result<Self, ServerError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build from an arbitrary variable lookup.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ServerError> {
        let addr_str = lookup(ADDR_VAR).unwrap_or_else(|| DEFAULT_ADDR.to_string());
        let addr = addr_str
            .parse()
            .map_err(|e| ServerError::Config(format!("{}={}: {}", ADDR_VAR, addr_str, e)))?;

        let data_dir = match lookup(DATA_DIR_VAR) {
            Some(dir) if !dir.trim().is_empty() => PathBuf::from(dir),
            _ => FileStorage::default_path()?,
        };

        Ok(Self { addr, data_dir })
    }
}

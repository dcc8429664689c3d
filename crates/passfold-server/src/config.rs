//! Server configuration for Passfold.
//!
//! Loads configuration from environment variables with sensible defaults.
//! All settings can be overridden via `PASSFOLD_*` environment variables.

use std::net::SocketAddr;

/// Development fallback key, byte-compatible with historical deployments
/// that never set one. Never use in production.
const DEFAULT_DEV_KEY: &str = "12345678901234567890123456789012";

/// Server configuration.
#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// Address to bind the HTTP listener to.
    pub bind_addr: SocketAddr,
    /// Storage backend type.
    pub storage_backend: StorageBackendType,
    /// Log level filter (e.g., `info`, `debug`, `warn`).
    pub log_level: String,
    /// Encryption key in its configuration form (raw 32 bytes or 64 hex
    /// chars). Validated at startup — a wrong length is fatal.
    pub encryption_key: String,
    /// Whether to skip `mlock` (for development without root/`CAP_IPC_LOCK`).
    pub disable_mlock: bool,
}

/// Supported storage backend types.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StorageBackendType {
    /// In-memory (development only, data lost on restart).
    Memory,
    /// redb persistent storage.
    Redb { path: String },
}

impl ServerConfig {
    /// Load configuration from environment variables.
    ///
    /// Environment variables:
    /// - `PORT` — port to bind on (Railway convention, binds to `0.0.0.0`)
    /// - `PASSFOLD_BIND_ADDR` — full bind address (overrides `PORT`, default: `127.0.0.1:3001`)
    /// - `PASSFOLD_STORAGE` — `memory` or `redb` (default: `memory`)
    /// - `PASSFOLD_STORAGE_PATH` — path for the redb backend (default: `./data/passfold.redb`)
    /// - `PASSFOLD_LOG_LEVEL` — log filter (default: `info`)
    /// - `PASSFOLD_ENCRYPTION_KEY` — secret codec key (default: a well-known dev key)
    /// - `PASSFOLD_DISABLE_MLOCK` — skip `mlockall` for dev environments (default: `false`)
    #[must_use]
    pub fn from_env() -> Self {
        // Priority: PASSFOLD_BIND_ADDR > PORT (Railway) > default 127.0.0.1:3001
        let bind_addr = if let Ok(addr) = std::env::var("PASSFOLD_BIND_ADDR") {
            addr.parse()
                .unwrap_or_else(|_| SocketAddr::from(([127, 0, 0, 1], 3001)))
        } else if let Ok(port_str) = std::env::var("PORT") {
            let port: u16 = port_str.parse().unwrap_or(3001);
            SocketAddr::from(([0, 0, 0, 0], port))
        } else {
            SocketAddr::from(([127, 0, 0, 1], 3001))
        };

        let storage_path = std::env::var("PASSFOLD_STORAGE_PATH")
            .unwrap_or_else(|_| "./data/passfold.redb".to_owned());

        let storage_backend = match std::env::var("PASSFOLD_STORAGE")
            .unwrap_or_else(|_| "memory".to_owned())
            .to_lowercase()
            .as_str()
        {
            "redb" => StorageBackendType::Redb { path: storage_path },
            _ => StorageBackendType::Memory,
        };

        let log_level =
            std::env::var("PASSFOLD_LOG_LEVEL").unwrap_or_else(|_| "info".to_owned());

        let encryption_key = std::env::var("PASSFOLD_ENCRYPTION_KEY")
            .unwrap_or_else(|_| DEFAULT_DEV_KEY.to_owned());

        let disable_mlock = std::env::var("PASSFOLD_DISABLE_MLOCK")
            .map(|v| v == "true" || v == "1")
            .unwrap_or(false);

        Self {
            bind_addr,
            storage_backend,
            log_level,
            encryption_key,
            disable_mlock,
        }
    }

    /// Whether the encryption key is still the well-known development
    /// fallback. The server logs a loud warning when this is true.
    #[must_use]
    pub fn uses_default_key(&self) -> bool {
        self.encryption_key == DEFAULT_DEV_KEY
    }
}

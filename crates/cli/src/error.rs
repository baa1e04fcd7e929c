//! Error types for CLI operations.

use std::net::SocketAddr;

use thiserror::Error;

/// CLI-specific error types
#[derive(Error, Debug)]
pub enum CliError {
    /// Configuration file not found
    #[error("Configuration file not found: {path}")]
    ConfigNotFound { path: String },

    /// HTTP listener could not be bound
    #[error("Failed to bind HTTP listener on {addr}: {source}")]
    ServerBind {
        addr: SocketAddr,
        #[source]
        source: std::io::Error,
    },

    /// HTTP server stopped with an error
    #[error("HTTP server failed: {0}")]
    Server(#[source] std::io::Error),
}

impl CliError {
    pub fn config_not_found(path: impl Into<String>) -> Self {
        Self::ConfigNotFound { path: path.into() }
    }

    pub fn server_bind(addr: SocketAddr, source: std::io::Error) -> Self {
        Self::ServerBind { addr, source }
    }
}

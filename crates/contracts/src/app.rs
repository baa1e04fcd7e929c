//! AppConfig - process configuration
//!
//! Where to log, where the fanout parameters live and which port to serve.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Process-level configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AppConfig {
    #[serde(default)]
    pub log: LogConfig,

    #[serde(default)]
    pub urlrepo: UrlRepoConfig,

    #[serde(default)]
    pub api: ApiConfig,
}

/// Log output settings
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct LogConfig {
    /// Append logs to this file (stdout when unset)
    #[serde(default)]
    pub file: Option<PathBuf>,
}

/// Location of the fanout parameters
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UrlRepoConfig {
    #[serde(default = "default_params_path")]
    pub path: PathBuf,
}

impl Default for UrlRepoConfig {
    fn default() -> Self {
        Self {
            path: default_params_path(),
        }
    }
}

fn default_params_path() -> PathBuf {
    PathBuf::from("params.json")
}

/// HTTP listener settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApiConfig {
    #[serde(default = "default_http_port")]
    pub http_port: u16,
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            http_port: default_http_port(),
        }
    }
}

fn default_http_port() -> u16 {
    8080
}

//! # Config Loader
//!
//! Configuration loading and parsing module.
//!
//! Responsibilities:
//! - Parse JSON/TOML fanout parameters and process configuration
//! - Validate the fanout topology
//! - Provide `ParamRepository` implementations
//!
//! # Example
//!
//! ```no_run
//! use config_loader::ConfigLoader;
//! use std::path::Path;
//!
//! let topology = ConfigLoader::load_topology_from_path(Path::new("params.json")).unwrap();
//! println!("destinations: {}", topology.urls.len());
//! ```

mod parser;
mod repository;
mod validator;

pub use contracts::{AppConfig, FanoutTopology};
pub use parser::ConfigFormat;
pub use repository::{FileParamRepo, MemoryParamRepo};
pub use validator::collect_warnings;

use contracts::ContractError;
use std::path::Path;

/// Configuration loader
///
/// Provides static methods to load configuration from files or strings.
pub struct ConfigLoader;

impl ConfigLoader {
    /// Load fanout parameters from a file path
    ///
    /// Format is detected from the extension (.json / .toml).
    ///
    /// # Errors
    /// - File read failure
    /// - Unsupported format
    /// - Parse failure
    /// - Validation failure
    pub fn load_topology_from_path(path: &Path) -> Result<FanoutTopology, ContractError> {
        let format = Self::detect_format(path)?;
        let content = Self::read_file(path)?;
        Self::load_topology_from_str(&content, format)
    }

    /// Load fanout parameters from a string
    pub fn load_topology_from_str(
        content: &str,
        format: ConfigFormat,
    ) -> Result<FanoutTopology, ContractError> {
        let topology: FanoutTopology = parser::parse(content, format)?;
        validator::validate(&topology)?;
        Ok(topology)
    }

    /// Load process configuration from a file path
    pub fn load_app_config(path: &Path) -> Result<AppConfig, ContractError> {
        let format = Self::detect_format(path)?;
        let content = Self::read_file(path)?;
        parser::parse(&content, format)
    }

    /// Serialize a topology to pretty JSON
    pub fn to_json(topology: &FanoutTopology) -> Result<String, ContractError> {
        serde_json::to_string_pretty(topology)
            .map_err(|e| ContractError::config_parse(format!("JSON serialize error: {e}")))
    }

    /// Serialize a topology to TOML
    pub fn to_toml(topology: &FanoutTopology) -> Result<String, ContractError> {
        toml::to_string_pretty(topology)
            .map_err(|e| ContractError::config_parse(format!("TOML serialize error: {e}")))
    }
}

impl ConfigLoader {
    fn detect_format(path: &Path) -> Result<ConfigFormat, ContractError> {
        let ext = path.extension().and_then(|e| e.to_str()).ok_or_else(|| {
            ContractError::config_parse("cannot determine file format from extension")
        })?;

        ConfigFormat::from_extension(ext).ok_or_else(|| {
            ContractError::config_parse(format!("unsupported config format: .{ext}"))
        })
    }

    fn read_file(path: &Path) -> Result<String, ContractError> {
        Ok(std::fs::read_to_string(path)?)
    }
}

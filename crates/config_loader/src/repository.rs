//! ParamRepository implementations

use std::path::{Path, PathBuf};

use contracts::{
    ContractError, DestinationSpec, FanoutTopology, FeedBinding, FeedLimit, ParamRepository,
    SenderKind,
};
use tracing::{debug, instrument};

use crate::ConfigLoader;

/// Loads the topology from a JSON/TOML file on every `load` call
#[derive(Debug, Clone)]
pub struct FileParamRepo {
    path: PathBuf,
}

impl FileParamRepo {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl ParamRepository for FileParamRepo {
    #[instrument(name = "file_param_repo_load", skip(self), fields(path = %self.path.display()))]
    fn load(&self) -> Result<FanoutTopology, ContractError> {
        let topology = ConfigLoader::load_topology_from_path(&self.path)?;
        debug!(
            destinations = topology.urls.len(),
            bindings = topology.binding_count(),
            "fanout parameters loaded"
        );
        Ok(topology)
    }
}

/// Serves a topology held in memory (tests, embedding)
#[derive(Debug, Clone)]
pub struct MemoryParamRepo {
    topology: FanoutTopology,
}

impl MemoryParamRepo {
    pub fn new(topology: FanoutTopology) -> Self {
        Self { topology }
    }

    /// One http destination per address, each bound to the same feed
    ///
    /// Uses a 10s timeout and 5 workers per destination.
    pub fn single_feed<S: AsRef<str>>(addresses: &[S], feed_id: &str, limit: u32) -> Self {
        let urls = addresses
            .iter()
            .enumerate()
            .map(|(idx, address)| DestinationSpec {
                id: idx.to_string(),
                value: address.as_ref().to_string(),
                sender: SenderKind::Http,
                feeds: vec![FeedBinding {
                    id: feed_id.into(),
                    limit: FeedLimit::new(limit),
                }],
            })
            .collect();

        Self::new(FanoutTopology {
            timeout: 10,
            poolsize: 5,
            urls,
        })
    }
}

impl ParamRepository for MemoryParamRepo {
    fn load(&self) -> Result<FanoutTopology, ContractError> {
        crate::validator::validate(&self.topology)?;
        Ok(self.topology.clone())
    }
}

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;
use thiserror::Error;

use crate::client::{
    ClientBuilder, RadioGardenClient, DEFAULT_CATALOG_ROOT, DEFAULT_CONNECT_TIMEOUT_SECS,
    DEFAULT_REDIRECT_LIMIT, DEFAULT_REQUEST_TIMEOUT_SECS, DEFAULT_USER_AGENT,
};
use crate::harvest::PlaceSelection;
use crate::traits::FetchError;

/// Place served by the bare `/page` passthrough endpoint.
pub const DEFAULT_PLACE_ID: &str = "T1pGvdXZ";

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Failed to read config file '{}': {source}", path.display())]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("Invalid config file '{}': {source}", path.display())]
    Parse {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },
    #[error("`limit` and `sample` are mutually exclusive")]
    ConflictingSelection,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct HarvestConfig {
    /// Base URL of the catalog API
    pub catalog_root: String,

    /// Maximum number of places harvested concurrently
    pub concurrency: usize,

    pub request_timeout_secs: u64,

    pub connect_timeout_secs: u64,

    /// Maximum redirects followed when resolving a stream
    pub redirect_limit: usize,

    pub user_agent: String,

    /// Directory receiving output.csv, output.json and places.json
    pub output_dir: PathBuf,

    /// Harvest only the first N places
    pub limit: Option<usize>,

    /// Harvest N randomly chosen places
    pub sample: Option<usize>,

    /// Cancel the run after this many seconds
    pub deadline_secs: Option<u64>,

    /// Listen address of the passthrough server
    pub server_addr: String,

    pub default_place_id: String,
}

impl Default for HarvestConfig {
    fn default() -> Self {
        Self {
            catalog_root: DEFAULT_CATALOG_ROOT.to_string(),
            concurrency: 20,
            request_timeout_secs: DEFAULT_REQUEST_TIMEOUT_SECS,
            connect_timeout_secs: DEFAULT_CONNECT_TIMEOUT_SECS,
            redirect_limit: DEFAULT_REDIRECT_LIMIT,
            user_agent: DEFAULT_USER_AGENT.to_string(),
            output_dir: PathBuf::from("out"),
            limit: None,
            sample: None,
            deadline_secs: None,
            server_addr: "0.0.0.0:8080".to_string(),
            default_place_id: DEFAULT_PLACE_ID.to_string(),
        }
    }
}

impl HarvestConfig {
    /// Loads the config from `path`, or the defaults when no path is given.
    pub fn load(path: Option<&Path>) -> Result<Self, ConfigError> {
        match path {
            Some(path) => {
                let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
                    path: path.to_path_buf(),
                    source,
                })?;
                Self::from_toml(&content).map_err(|source| ConfigError::Parse {
                    path: path.to_path_buf(),
                    source,
                })
            }
            None => Ok(Self::default()),
        }
    }

    pub fn from_toml(content: &str) -> Result<Self, toml::de::Error> {
        toml::from_str(content)
    }

    pub fn selection(&self) -> Result<PlaceSelection, ConfigError> {
        match (self.limit, self.sample) {
            (Some(_), Some(_)) => Err(ConfigError::ConflictingSelection),
            (Some(n), None) => Ok(PlaceSelection::First(n)),
            (None, Some(n)) => Ok(PlaceSelection::Sample(n)),
            (None, None) => Ok(PlaceSelection::All),
        }
    }

    pub fn deadline(&self) -> Option<Duration> {
        self.deadline_secs.map(Duration::from_secs)
    }

    pub fn client_builder(&self) -> ClientBuilder {
        RadioGardenClient::builder()
            .catalog_root(&self.catalog_root)
            .request_timeout(Duration::from_secs(self.request_timeout_secs))
            .connect_timeout(Duration::from_secs(self.connect_timeout_secs))
            .redirect_limit(self.redirect_limit)
            .user_agent(&self.user_agent)
    }

    pub fn build_client(&self) -> Result<RadioGardenClient, FetchError> {
        self.client_builder().build()
    }
}

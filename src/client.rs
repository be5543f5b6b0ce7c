//! HTTP client for the radio catalog API.
//!
//! [`RadioGardenClient`] is the production [`CatalogSource`]. It wraps a
//! pooled `reqwest::Client` and holds no other state, so clones are cheap and
//! concurrent calls never share request or response state.

use async_trait::async_trait;
use reqwest::{redirect, Client};
use serde::de::DeserializeOwned;
use std::time::Duration;
use tracing::debug;

use crate::api::{ChannelsResponse, PlacesResponse};
use crate::model::{Channel, Place};
use crate::traits::{CatalogSource, FetchError};

/// Default catalog root
pub const DEFAULT_CATALOG_ROOT: &str = "https://radio.garden/api/ara/content";

/// Default timeout for HTTP requests (30 seconds)
pub const DEFAULT_REQUEST_TIMEOUT_SECS: u64 = 30;

pub const DEFAULT_CONNECT_TIMEOUT_SECS: u64 = 10;

/// Maximum redirect hops followed when resolving a stream
pub const DEFAULT_REDIRECT_LIMIT: usize = 10;

pub const DEFAULT_USER_AGENT: &str = concat!("radio-harvester/", env!("CARGO_PKG_VERSION"));

#[derive(Debug, Clone)]
pub struct RadioGardenClient {
    client: Client,
    catalog_root: String,
}

impl RadioGardenClient {
    /// Create a new client with default settings
    pub fn new() -> Result<Self, FetchError> {
        Self::builder().build()
    }

    pub fn builder() -> ClientBuilder {
        ClientBuilder::default()
    }

    /// Create a client around an existing `reqwest::Client`, e.g. to share a pool.
    pub fn with_client(client: Client, catalog_root: impl Into<String>) -> Self {
        Self {
            client,
            catalog_root: catalog_root.into(),
        }
    }

    fn endpoint(&self, path: &str) -> String {
        format!(
            "{}/{}",
            self.catalog_root.trim_end_matches('/'),
            path.trim_start_matches('/')
        )
    }

    async fn get_json<T: DeserializeOwned>(&self, path: &str) -> Result<T, FetchError> {
        let url = self.endpoint(path);
        debug!(%url, "GET");

        let response = self.client.get(&url).send().await?;
        let status = response.status();
        if !status.is_success() {
            return Err(FetchError::HttpStatus {
                status: status.as_u16(),
                url,
            });
        }

        let body = response.bytes().await?;
        serde_json::from_slice(&body).map_err(|e| FetchError::Decode(format!("{url}: {e}")))
    }

    /// Raw place list payload, unmodified.
    pub async fn places_raw(&self) -> Result<serde_json::Value, FetchError> {
        self.get_json("places").await
    }

    /// Raw page payload of one place, unmodified.
    pub async fn place_page_raw(&self, place_id: &str) -> Result<serde_json::Value, FetchError> {
        self.get_json(&format!("page/{place_id}")).await
    }
}

#[async_trait]
impl CatalogSource for RadioGardenClient {
    async fn list_places(&self) -> Result<Vec<Place>, FetchError> {
        let response: PlacesResponse = self.get_json("places").await?;
        Ok(response.data.list.into_iter().map(Place::from).collect())
    }

    async fn list_channels(&self, place_id: &str) -> Result<Vec<Channel>, FetchError> {
        let response: ChannelsResponse = self
            .get_json(&format!("page/{place_id}/channels"))
            .await?;
        response.into_channels(place_id)
    }

    async fn resolve_stream_url(&self, channel_id: &str) -> Result<String, FetchError> {
        let url = self.endpoint(&format!("listen/{channel_id}/channel.mp3"));

        // The body is a live audio stream: only the headers of the final hop
        // are awaited, the response is dropped unread.
        let response = self.client.get(&url).send().await?;
        let status = response.status();
        if !status.is_success() {
            return Err(FetchError::HttpStatus {
                status: status.as_u16(),
                url,
            });
        }
        Ok(response.url().to_string())
    }
}

/// Builder for [`RadioGardenClient`]
#[derive(Debug, Clone)]
pub struct ClientBuilder {
    catalog_root: String,
    request_timeout: Duration,
    connect_timeout: Duration,
    user_agent: String,
    redirect_limit: usize,
}

impl Default for ClientBuilder {
    fn default() -> Self {
        Self {
            catalog_root: DEFAULT_CATALOG_ROOT.to_string(),
            request_timeout: Duration::from_secs(DEFAULT_REQUEST_TIMEOUT_SECS),
            connect_timeout: Duration::from_secs(DEFAULT_CONNECT_TIMEOUT_SECS),
            user_agent: DEFAULT_USER_AGENT.to_string(),
            redirect_limit: DEFAULT_REDIRECT_LIMIT,
        }
    }
}

impl ClientBuilder {
    pub fn catalog_root(mut self, root: impl Into<String>) -> Self {
        self.catalog_root = root.into();
        self
    }

    pub fn request_timeout(mut self, timeout: Duration) -> Self {
        self.request_timeout = timeout;
        self
    }

    pub fn connect_timeout(mut self, timeout: Duration) -> Self {
        self.connect_timeout = timeout;
        self
    }

    pub fn user_agent(mut self, user_agent: impl Into<String>) -> Self {
        self.user_agent = user_agent.into();
        self
    }

    pub fn redirect_limit(mut self, limit: usize) -> Self {
        self.redirect_limit = limit;
        self
    }

    pub fn build(self) -> Result<RadioGardenClient, FetchError> {
        let client = Client::builder()
            .user_agent(self.user_agent)
            .timeout(self.request_timeout)
            .connect_timeout(self.connect_timeout)
            .redirect(redirect::Policy::limited(self.redirect_limit))
            .build()?;

        Ok(RadioGardenClient::with_client(client, self.catalog_root))
    }
}

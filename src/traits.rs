use crate::model::{Channel, Place};
use async_trait::async_trait;
use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum FetchError {
    #[error("Request failed: {0}")]
    Transport(String),
    #[error("Request timed out: {0}")]
    Timeout(String),
    #[error("API error: {status} from {url}")]
    HttpStatus { status: u16, url: String },
    #[error("Failed to decode response: {0}")]
    Decode(String),
    #[error("Channel page for place {place_id} has no content section")]
    MissingSection { place_id: String },
    #[error("operation cancelled")]
    Cancelled,
}

impl From<reqwest::Error> for FetchError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            FetchError::Timeout(err.to_string())
        } else if err.is_decode() {
            FetchError::Decode(err.to_string())
        } else if let Some(status) = err.status() {
            FetchError::HttpStatus {
                status: status.as_u16(),
                url: err.url().map(|u| u.to_string()).unwrap_or_default(),
            }
        } else {
            FetchError::Transport(err.to_string())
        }
    }
}

/// Read access to the remote place catalog.
///
/// Implementations hold no mutable state shared across calls, so every method
/// may be invoked concurrently from independent tasks.
#[async_trait]
pub trait CatalogSource: Send + Sync {
    /// Lists every place in the catalog.
    async fn list_places(&self) -> Result<Vec<Place>, FetchError>;

    /// Lists the channels of one place, in catalog order.
    ///
    /// Only the first content section of the place page carries channels; a
    /// page without one is an error, an empty section is zero channels.
    async fn list_channels(&self, place_id: &str) -> Result<Vec<Channel>, FetchError>;

    /// Returns the final URL reached after following the channel's stream redirects.
    async fn resolve_stream_url(&self, channel_id: &str) -> Result<String, FetchError>;
}

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::traits::FetchError;

/// A geographic node of the catalog.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Place {
    pub id: String,
    pub title: String,
    pub country: String,
    pub size: i64,
    pub boost: bool,
    pub geo: GeoPoint,
    /// Catalog path of the place page, e.g. "/visit/berlin/xyz"
    #[serde(default)]
    pub url: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct GeoPoint {
    pub lat: f64,
    pub lon: f64,
}

/// A streamable source listed under a place.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Channel {
    pub title: String,
    /// Catalog path, e.g. "/listen/radio-name/ID". The channel id is its last segment.
    pub url: String,
    pub stream: Option<String>,
    pub secure: Option<bool>,
}

/// Final, redirect-terminal stream location for a channel.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedStream {
    pub channel_id: String,
    pub url: String,
    pub secure: bool,
}

impl ResolvedStream {
    pub fn new(channel_id: impl Into<String>, url: impl Into<String>) -> Self {
        let url = url.into();
        let secure = url::Url::parse(&url)
            .map(|parsed| parsed.scheme() == "https")
            .unwrap_or(false);
        Self {
            channel_id: channel_id.into(),
            url,
            secure,
        }
    }
}

/// One flattened (place, channel) record. Field order is the column order of
/// the exported table.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OutputRow {
    pub place_id: String,
    pub channel_id: String,
    pub channel_url: String,
    pub place_name: String,
    pub channel_name: String,
    pub channel_stream: String,
    pub channel_secure: bool,
    pub place_size: i64,
    pub boost: bool,
    pub country: String,
    pub geo_lat: f64,
    pub geo_lon: f64,
    pub channel_resolved_url: Option<String>,
}

impl OutputRow {
    pub const COLUMNS: [&'static str; 13] = [
        "place_id",
        "channel_id",
        "channel_url",
        "place_name",
        "channel_name",
        "channel_stream",
        "channel_secure",
        "place_size",
        "boost",
        "country",
        "geo_lat",
        "geo_lon",
        "channel_resolved_url",
    ];

    /// Identity key of a row.
    pub fn key(&self) -> (&str, &str) {
        (&self.place_id, &self.channel_id)
    }
}

/// Why a place unit produced no rows.
#[derive(Error, Debug)]
pub enum UnitFailure {
    #[error(transparent)]
    Fetch(#[from] FetchError),

    #[error("worker panicked: {0}")]
    Panicked(String),
}

impl UnitFailure {
    pub fn is_cancelled(&self) -> bool {
        matches!(self, UnitFailure::Fetch(FetchError::Cancelled))
    }
}

/// A recorded, non-fatal failure to list channels for one place.
#[derive(Error, Debug)]
#[error("[{index}] {title}, {country}: {cause}")]
pub struct HarvestError {
    /// Position of the place in the harvested place list
    pub index: usize,
    pub title: String,
    pub country: String,
    #[source]
    pub cause: UnitFailure,
}

impl HarvestError {
    pub fn new(index: usize, place: &Place, cause: impl Into<UnitFailure>) -> Self {
        Self {
            index,
            title: place.title.clone(),
            country: place.country.clone(),
            cause: cause.into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_resolved_stream_secure_flag() {
        assert!(ResolvedStream::new("a", "https://cdn.example/live.mp3").secure);
        assert!(!ResolvedStream::new("a", "http://cdn.example/live.mp3").secure);
        assert!(!ResolvedStream::new("a", "not a url").secure);
    }

    #[test]
    fn test_harvest_error_display() {
        let place = Place {
            id: "p1".to_string(),
            title: "Berlin".to_string(),
            country: "Germany".to_string(),
            size: 3,
            boost: false,
            geo: GeoPoint {
                lat: 52.5,
                lon: 13.4,
            },
            url: String::new(),
        };
        let err = HarvestError::new(4, &place, FetchError::Cancelled);
        assert_eq!(err.to_string(), "[4] Berlin, Germany: operation cancelled");
        assert!(err.cause.is_cancelled());
    }
}

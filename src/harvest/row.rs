//! Flattening of a (place, channel, stream) triple into one [`OutputRow`].

use thiserror::Error;

use crate::model::{Channel, OutputRow, Place, ResolvedStream};

/// Non-empty path segments a channel URL must carry: `listen/{slug}/{id}`.
pub const MIN_CHANNEL_PATH_SEGMENTS: usize = 3;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum RowError {
    #[error("Malformed channel URL '{url}': expected at least {expected} path segments, found {found}")]
    MalformedChannelUrl {
        url: String,
        expected: usize,
        found: usize,
    },

    /// The resolved stream belongs to another channel
    #[error("Stream resolved for channel '{found}' cannot be attached to channel '{expected}'")]
    StreamMismatch { expected: String, found: String },
}

/// Extracts the channel id, the last non-empty segment of the channel URL path.
///
/// # Errors
///
/// Returns [`RowError::MalformedChannelUrl`] if the path has fewer than
/// [`MIN_CHANNEL_PATH_SEGMENTS`] non-empty segments.
pub fn channel_id_from_url(url: &str) -> Result<&str, RowError> {
    let segments: Vec<&str> = url.split('/').filter(|s| !s.is_empty()).collect();
    match segments.last() {
        Some(&id) if segments.len() >= MIN_CHANNEL_PATH_SEGMENTS => Ok(id),
        _ => Err(RowError::MalformedChannelUrl {
            url: url.to_string(),
            expected: MIN_CHANNEL_PATH_SEGMENTS,
            found: segments.len(),
        }),
    }
}

/// Builds the output row for one channel of one place.
///
/// `channel_id` is the id [`channel_id_from_url`] extracted from
/// `channel.url`. `channel_secure` prefers the flag reported by the catalog
/// and falls back to the scheme of the resolved stream.
///
/// # Errors
///
/// Returns [`RowError::StreamMismatch`] if `resolved` was resolved for a
/// different channel id.
pub fn build_row(
    place: &Place,
    channel: &Channel,
    channel_id: &str,
    resolved: Option<&ResolvedStream>,
) -> Result<OutputRow, RowError> {
    if let Some(stream) = resolved.filter(|r| r.channel_id != channel_id) {
        return Err(RowError::StreamMismatch {
            expected: channel_id.to_string(),
            found: stream.channel_id.clone(),
        });
    }

    let channel_secure = channel
        .secure
        .or_else(|| resolved.map(|r| r.secure))
        .unwrap_or(false);

    Ok(OutputRow {
        place_id: place.id.clone(),
        channel_id: channel_id.to_string(),
        channel_url: channel.url.clone(),
        place_name: place.title.clone(),
        channel_name: channel.title.clone(),
        channel_stream: channel.stream.clone().unwrap_or_default(),
        channel_secure,
        place_size: place.size,
        boost: place.boost,
        country: place.country.clone(),
        geo_lat: place.geo.lat,
        geo_lon: place.geo.lon,
        channel_resolved_url: resolved.map(|r| r.url.clone()),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::GeoPoint;

    fn place() -> Place {
        Place {
            id: "pl1".to_string(),
            title: "Lisbon".to_string(),
            country: "Portugal".to_string(),
            size: 7,
            boost: true,
            geo: GeoPoint {
                lat: 38.7,
                lon: -9.1,
            },
            url: "/visit/lisbon/pl1".to_string(),
        }
    }

    fn channel(url: &str) -> Channel {
        Channel {
            title: "Radio Lisboa".to_string(),
            url: url.to_string(),
            stream: None,
            secure: None,
        }
    }

    #[test]
    fn test_channel_id_is_last_segment() {
        assert_eq!(channel_id_from_url("/listen/radio-lisboa/AbC123").unwrap(), "AbC123");
        assert_eq!(channel_id_from_url("listen/radio-lisboa/AbC123/").unwrap(), "AbC123");
    }

    #[test]
    fn test_channel_id_rejects_short_paths() {
        for url in ["", "/", "/listen", "/listen/AbC123", "//listen//"] {
            let err = channel_id_from_url(url).unwrap_err();
            assert!(matches!(err, RowError::MalformedChannelUrl { .. }), "{url}");
        }
    }

    #[test]
    fn test_build_row_with_resolved_stream() {
        let resolved = ResolvedStream::new("AbC123", "https://stream.example/lisboa");
        let ch = channel("/listen/radio-lisboa/AbC123");
        let id = channel_id_from_url(&ch.url).unwrap();
        let row = build_row(&place(), &ch, id, Some(&resolved)).unwrap();

        assert_eq!(row.place_id, "pl1");
        assert_eq!(row.channel_id, "AbC123");
        assert_eq!(row.place_name, "Lisbon");
        assert_eq!(row.channel_name, "Radio Lisboa");
        assert_eq!(row.geo_lat, 38.7);
        assert_eq!(row.geo_lon, -9.1);
        assert!(row.channel_secure);
        assert_eq!(
            row.channel_resolved_url.as_deref(),
            Some("https://stream.example/lisboa")
        );
    }

    #[test]
    fn test_build_row_without_stream_leaves_field_empty() {
        let row = build_row(&place(), &channel("/listen/radio-lisboa/AbC123"), "AbC123", None)
            .unwrap();
        assert_eq!(row.channel_resolved_url, None);
        assert!(!row.channel_secure);
        assert_eq!(row.channel_stream, "");
    }

    #[test]
    fn test_catalog_secure_flag_wins() {
        let mut ch = channel("/listen/radio-lisboa/AbC123");
        ch.secure = Some(false);
        let resolved = ResolvedStream::new("AbC123", "https://stream.example/lisboa");
        let row = build_row(&place(), &ch, "AbC123", Some(&resolved)).unwrap();
        assert!(!row.channel_secure);
    }

    #[test]
    fn test_malformed_url_reports_segment_count() {
        let err = channel_id_from_url("/AbC123").unwrap_err();
        assert_eq!(
            err,
            RowError::MalformedChannelUrl {
                url: "/AbC123".to_string(),
                expected: 3,
                found: 1,
            }
        );
    }

    #[test]
    fn test_stream_of_another_channel_is_rejected() {
        let resolved = ResolvedStream::new("Other9", "https://stream.example/other");
        let err = build_row(
            &place(),
            &channel("/listen/radio-lisboa/AbC123"),
            "AbC123",
            Some(&resolved),
        )
        .unwrap_err();
        assert_eq!(
            err,
            RowError::StreamMismatch {
                expected: "AbC123".to_string(),
                found: "Other9".to_string(),
            }
        );
    }
}

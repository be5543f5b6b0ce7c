//! Wire shapes of the catalog API.
//!
//! Only the fields the harvester reads are declared; everything else in the
//! payload is ignored by serde.

use serde::Deserialize;

use crate::model::{Channel, GeoPoint, Place};
use crate::traits::FetchError;

#[derive(Debug, Deserialize)]
pub(crate) struct PlacesResponse {
    pub data: PlacesData,
}

#[derive(Debug, Deserialize)]
pub(crate) struct PlacesData {
    pub list: Vec<ApiPlace>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct ApiPlace {
    pub id: String,
    pub title: String,
    #[serde(default)]
    pub country: String,
    #[serde(default)]
    pub size: i64,
    #[serde(default)]
    pub boost: bool,
    /// `[lon, lat]`
    pub geo: [f64; 2],
    #[serde(default)]
    pub url: String,
}

impl From<ApiPlace> for Place {
    fn from(p: ApiPlace) -> Self {
        Place {
            id: p.id,
            title: p.title,
            country: p.country,
            size: p.size,
            boost: p.boost,
            geo: GeoPoint {
                lat: p.geo[1],
                lon: p.geo[0],
            },
            url: p.url,
        }
    }
}

#[derive(Debug, Deserialize)]
pub(crate) struct ChannelsResponse {
    pub data: ChannelsData,
}

#[derive(Debug, Deserialize)]
pub(crate) struct ChannelsData {
    #[serde(default)]
    pub content: Vec<ContentSection>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct ContentSection {
    #[serde(default)]
    pub items: Vec<ChannelItem>,
}

/// Either the legacy `{href, title}` item or the current `{page: {...}}` one.
#[derive(Debug, Deserialize)]
pub(crate) struct ChannelItem {
    pub href: Option<String>,
    pub title: Option<String>,
    pub page: Option<ChannelPage>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct ChannelPage {
    pub url: String,
    pub title: String,
    pub stream: Option<String>,
    pub secure: Option<bool>,
}

impl TryFrom<ChannelItem> for Channel {
    type Error = FetchError;

    fn try_from(item: ChannelItem) -> Result<Self, Self::Error> {
        if let Some(page) = item.page {
            return Ok(Channel {
                title: page.title,
                url: page.url,
                stream: page.stream.filter(|s| !s.is_empty()),
                secure: page.secure,
            });
        }
        match item.href {
            Some(href) => Ok(Channel {
                title: item.title.unwrap_or_default(),
                url: href,
                stream: None,
                secure: None,
            }),
            None => Err(FetchError::Decode(
                "channel item has neither `page` nor `href`".to_string(),
            )),
        }
    }
}

impl ChannelsResponse {
    /// Channels of the first content section, in listing order.
    pub fn into_channels(self, place_id: &str) -> Result<Vec<Channel>, FetchError> {
        let section = self
            .data
            .content
            .into_iter()
            .next()
            .ok_or_else(|| FetchError::MissingSection {
                place_id: place_id.to_string(),
            })?;
        section.items.into_iter().map(Channel::try_from).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_place_geo_is_lon_lat() {
        let json = r#"{"data":{"list":[{"id":"p1","title":"Accra","country":"Ghana",
            "size":12,"boost":true,"geo":[-0.19,5.6],"url":"/visit/accra/p1"}],"version":"x"}}"#;
        let resp: PlacesResponse = serde_json::from_str(json).unwrap();
        let place = Place::from(resp.data.list.into_iter().next().unwrap());
        assert_eq!(place.geo.lat, 5.6);
        assert_eq!(place.geo.lon, -0.19);
        assert!(place.boost);
        assert_eq!(place.size, 12);
    }

    #[test]
    fn test_only_first_section_is_used() {
        let json = r#"{"apiVersion":1,"data":{"content":[
            {"itemsType":"channel","items":[{"href":"/listen/one/AAA","title":"One"}]},
            {"items":[{"href":"/listen/two/BBB","title":"Two"}]}]}}"#;
        let resp: ChannelsResponse = serde_json::from_str(json).unwrap();
        let channels = resp.into_channels("p1").unwrap();
        assert_eq!(channels.len(), 1);
        assert_eq!(channels[0].title, "One");
    }

    #[test]
    fn test_page_item_shape() {
        let json = r#"{"data":{"content":[{"items":[{"page":{"url":"/listen/x/CCC",
            "title":"X","stream":"","secure":true}}]}]}}"#;
        let resp: ChannelsResponse = serde_json::from_str(json).unwrap();
        let channels = resp.into_channels("p1").unwrap();
        assert_eq!(channels[0].url, "/listen/x/CCC");
        assert_eq!(channels[0].stream, None);
        assert_eq!(channels[0].secure, Some(true));
    }

    #[test]
    fn test_missing_section_is_an_error() {
        let json = r#"{"data":{"content":[]}}"#;
        let resp: ChannelsResponse = serde_json::from_str(json).unwrap();
        assert_eq!(
            resp.into_channels("p9").unwrap_err(),
            FetchError::MissingSection {
                place_id: "p9".to_string()
            }
        );
    }

    #[test]
    fn test_item_without_url_is_rejected() {
        let json = r#"{"data":{"content":[{"items":[{"title":"nothing"}]}]}}"#;
        let resp: ChannelsResponse = serde_json::from_str(json).unwrap();
        assert!(matches!(
            resp.into_channels("p1"),
            Err(FetchError::Decode(_))
        ));
    }
}

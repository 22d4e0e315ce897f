//! Catalog entities rendered by the list view.

use serde::{Deserialize, Serialize};

use super::Source;

/// A single entry of the search catalog (album, artist, track).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CatalogEntity {
    /// Kind of record, e.g. `collection`.
    pub wrapper_type: String,
    /// 100x100 artwork URL.
    #[serde(default, rename = "artworkUrl100")]
    pub artwork_url_100: Option<String>,
    /// Artist display name.
    #[serde(default)]
    pub artist_name: Option<String>,
    /// Collection (album) display name.
    #[serde(default)]
    pub collection_name: Option<String>,
}

impl CatalogEntity {
    /// Returns the artwork source, if any.
    #[must_use]
    pub fn artwork_source(&self) -> Option<Source> {
        self.artwork_url_100
            .as_deref()
            .filter(|url| !url.trim().is_empty())
            .map(Source::new)
    }

    /// Returns the title shown in a row.
    #[must_use]
    pub fn title(&self) -> &str {
        self.collection_name.as_deref().unwrap_or_default()
    }

    /// Returns the subtitle shown in a row.
    #[must_use]
    pub fn subtitle(&self) -> &str {
        self.artist_name.as_deref().unwrap_or_default()
    }
}

/// Envelope returned by the search endpoint.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CatalogResponse {
    /// Matched entities.
    #[serde(default)]
    pub results: Vec<CatalogEntity>,
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE: &str = r#"{
        "resultCount": 2,
        "results": [
            {
                "wrapperType": "collection",
                "artistName": "The Rolling Stones",
                "collectionName": "Sticky Fingers",
                "artworkUrl100": "https://example.com/sticky/100x100bb.jpg"
            },
            {
                "wrapperType": "artist",
                "artistName": "The Rolling Stones"
            }
        ]
    }"#;

    #[test]
    fn test_parse_response() {
        let response: CatalogResponse = serde_json::from_str(SAMPLE).unwrap();
        assert_eq!(response.results.len(), 2);

        let album = &response.results[0];
        assert_eq!(album.title(), "Sticky Fingers");
        assert_eq!(album.subtitle(), "The Rolling Stones");
        assert_eq!(
            album.artwork_source(),
            Some(Source::new("https://example.com/sticky/100x100bb.jpg"))
        );

        let artist = &response.results[1];
        assert_eq!(artist.title(), "");
        assert!(artist.artwork_source().is_none());
    }

    #[test]
    fn test_blank_artwork_is_ignored() {
        let entity = CatalogEntity {
            wrapper_type: "collection".to_string(),
            artwork_url_100: Some("  ".to_string()),
            artist_name: None,
            collection_name: None,
        };
        assert!(entity.artwork_source().is_none());
    }
}

//! Driver portrait lookup through the Wikipedia page summary REST API.

use std::sync::Arc;

use serde::Deserialize;

use super::http::{HttpClient, get_json};
use crate::{driver::ImageSource, errors::PaddockError};

pub const DEFAULT_WIKIPEDIA_SUMMARY_URL: &str = "https://en.wikipedia.org/api/rest_v1/page/summary";

#[derive(Deserialize, Debug)]
struct PageSummary {
    thumbnail: Option<ImageRef>,
    originalimage: Option<ImageRef>,
}

#[derive(Deserialize, Debug)]
struct ImageRef {
    source: String,
}

/// Turns a display name into a page title ("Max Verstappen" -> "Max_Verstappen").
pub(crate) fn canonical_title(name: &str) -> String {
    name.split_whitespace().collect::<Vec<_>>().join("_")
}

pub struct WikipediaImageLookup {
    client: Arc<dyn HttpClient>,
    base_url: String,
}

impl WikipediaImageLookup {
    pub fn new(client: Arc<dyn HttpClient>, base_url: impl Into<String>) -> Self {
        Self {
            client,
            base_url: base_url.into().trim_end_matches('/').to_string(),
        }
    }
}

impl ImageSource for WikipediaImageLookup {
    fn name(&self) -> &'static str {
        "wikipedia"
    }

    fn image_for(&self, driver_name: &str) -> Result<Option<String>, PaddockError> {
        let url = format!("{}/{}", self.base_url, canonical_title(driver_name));
        let summary: PageSummary =
            get_json(self.client.as_ref(), &url).map_err(|e| PaddockError::MetadataUnavailable {
                source_name: self.name().to_string(),
                reason: e.to_string(),
            })?;

        Ok(summary
            .thumbnail
            .or(summary.originalimage)
            .map(|image| image.source))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::provider::http::tests::MockHttpClient;

    const BASE: &str = "http://wiki.test/summary";

    #[test]
    fn test_canonical_title() {
        assert_eq!(canonical_title("Max Verstappen"), "Max_Verstappen");
        assert_eq!(canonical_title("  Carlos  Sainz Jr. "), "Carlos_Sainz_Jr.");
    }

    #[test]
    fn test_thumbnail_preferred() {
        let client = MockHttpClient::default().with_json(
            &format!("{BASE}/Lando_Norris"),
            r#"{"title":"Lando Norris","thumbnail":{"source":"http://img.test/thumb.jpg","width":320},"originalimage":{"source":"http://img.test/full.jpg"}}"#,
        );
        let lookup = WikipediaImageLookup::new(Arc::new(client), BASE);

        assert_eq!(
            lookup.image_for("Lando Norris").unwrap().as_deref(),
            Some("http://img.test/thumb.jpg")
        );
    }

    #[test]
    fn test_page_without_image() {
        let client = MockHttpClient::default()
            .with_json(&format!("{BASE}/Someone_Else"), r#"{"title":"Someone Else"}"#);
        let lookup = WikipediaImageLookup::new(Arc::new(client), BASE);

        assert_eq!(lookup.image_for("Someone Else").unwrap(), None);
    }

    #[test]
    fn test_missing_page_is_metadata_unavailable() {
        let lookup = WikipediaImageLookup::new(Arc::new(MockHttpClient::default()), BASE);
        assert!(lookup.image_for("Nobody").is_err());
    }
}

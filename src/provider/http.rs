//! HTTP client abstraction so providers can be exercised against canned payloads.

use std::time::Duration;

use log::debug;
use serde::de::DeserializeOwned;

use crate::errors::ProviderError;

/// Blocking HTTP GET.
///
/// Every remote source in the crate goes through this trait, which lets tests
/// substitute a client that serves fixed responses.
pub trait HttpClient: Send + Sync {
    /// Performs an HTTP GET request and returns the response body.
    fn get(&self, url: &str) -> Result<Vec<u8>, ProviderError>;
}

/// Fetches `url` and decodes the body as JSON.
pub fn get_json<T: DeserializeOwned>(
    client: &dyn HttpClient,
    url: &str,
) -> Result<T, ProviderError> {
    let body = client.get(url)?;
    serde_json::from_slice(&body).map_err(|e| ProviderError::Decode {
        url: url.to_string(),
        reason: e.to_string(),
    })
}

/// Real HTTP client implementation using reqwest.
pub struct ReqwestClient {
    client: reqwest::blocking::Client,
}

impl ReqwestClient {
    /// Creates a client whose requests are bounded by `timeout`.
    pub fn with_timeout(timeout: Duration, user_agent: &str) -> Result<Self, ProviderError> {
        let client = reqwest::blocking::Client::builder()
            .timeout(timeout)
            .user_agent(user_agent.to_string())
            .build()
            .map_err(|e| ProviderError::Http {
                url: String::new(),
                reason: format!("Failed to create HTTP client: {}", e),
            })?;

        Ok(Self { client })
    }
}

impl HttpClient for ReqwestClient {
    fn get(&self, url: &str) -> Result<Vec<u8>, ProviderError> {
        debug!("GET {}", url);
        let response = self.client.get(url).send().map_err(|e| ProviderError::Http {
            url: url.to_string(),
            reason: e.to_string(),
        })?;

        if !response.status().is_success() {
            return Err(ProviderError::HttpStatus {
                url: url.to_string(),
                status: response.status().as_u16(),
            });
        }

        response
            .bytes()
            .map(|b| b.to_vec())
            .map_err(|e| ProviderError::Http {
                url: url.to_string(),
                reason: format!("Failed to read response: {}", e),
            })
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use std::collections::HashMap;
    use std::sync::Mutex;

    /// Serves canned bodies keyed by exact URL. Unknown URLs answer 404.
    #[derive(Default)]
    pub(crate) struct MockHttpClient {
        pub(crate) responses: HashMap<String, Result<Vec<u8>, ProviderError>>,
        pub(crate) requested: Mutex<Vec<String>>,
    }

    impl MockHttpClient {
        pub(crate) fn with_json(mut self, url: &str, body: &str) -> Self {
            self.responses
                .insert(url.to_string(), Ok(body.as_bytes().to_vec()));
            self
        }

        pub(crate) fn with_error(mut self, url: &str, error: ProviderError) -> Self {
            self.responses.insert(url.to_string(), Err(error));
            self
        }

        pub(crate) fn requests(&self) -> Vec<String> {
            self.requested.lock().unwrap().clone()
        }
    }

    impl HttpClient for MockHttpClient {
        fn get(&self, url: &str) -> Result<Vec<u8>, ProviderError> {
            self.requested.lock().unwrap().push(url.to_string());
            self.responses
                .get(url)
                .cloned()
                .unwrap_or_else(|| {
                    Err(ProviderError::HttpStatus {
                        url: url.to_string(),
                        status: 404,
                    })
                })
        }
    }

    #[derive(serde::Deserialize)]
    struct Payload {
        value: u32,
    }

    #[test]
    fn test_get_json_decodes_body() {
        let client = MockHttpClient::default().with_json("http://example.com", r#"{"value": 7}"#);

        let payload: Payload = get_json(&client, "http://example.com").unwrap();
        assert_eq!(payload.value, 7);
    }

    #[test]
    fn test_get_json_reports_decode_errors() {
        let client = MockHttpClient::default().with_json("http://example.com", "not json");

        let result: Result<Payload, _> = get_json(&client, "http://example.com");
        assert!(matches!(result, Err(ProviderError::Decode { .. })));
    }

    #[test]
    fn test_mock_client_unknown_url() {
        let client = MockHttpClient::default();
        let result = client.get("http://example.com/missing");
        assert_eq!(
            result,
            Err(ProviderError::HttpStatus {
                url: "http://example.com/missing".to_string(),
                status: 404
            })
        );
    }
}

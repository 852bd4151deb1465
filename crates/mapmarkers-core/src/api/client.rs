//! HTTP client for the map marker REST API.
//!
//! Public listing lives under `{base}/mapmarkers`; everything that changes
//! data or shows disabled markers lives under `{base}/admin/mapmarkers`.

use std::time::Duration;

use anyhow::{Context, Result};
use async_trait::async_trait;
use reqwest::{header, Client, Method, StatusCode, Url};
use serde::{de::DeserializeOwned, Serialize};
use tracing::{debug, warn};

use crate::config::Config;
use crate::models::{Marker, MarkerId, MarkerUpdate, NewMarker};

use super::{ApiError, MarkerActions};

// ============================================================================
// Constants
// ============================================================================

/// Path segment of the marker collection
const MARKERS_PATH: &str = "mapmarkers";

/// Path segment prefixing privileged endpoints
const ADMIN_PATH: &str = "admin";

/// Maximum number of retries for rate-limited (429) requests.
const MAX_RATE_LIMIT_RETRIES: u32 = 3;

/// Initial backoff delay in milliseconds for rate limiting.
const INITIAL_BACKOFF_MS: u64 = 1000;

/// API client for the marker service.
/// Clone is cheap - reqwest::Client uses Arc internally for connection pooling.
#[derive(Clone)]
pub struct ApiClient {
    client: Client,
    base_url: Url,
    token: Option<String>,
}

impl ApiClient {
    /// Create a new API client for the service rooted at `base_url`
    pub fn new(base_url: &str, timeout: Duration) -> Result<Self> {
        let base_url = Url::parse(base_url)
            .with_context(|| format!("Invalid API base URL: {}", base_url))?;
        if base_url.cannot_be_a_base() {
            anyhow::bail!("API base URL cannot carry a path: {}", base_url);
        }

        let client = Client::builder()
            .timeout(timeout)
            .build()
            .context("Failed to build HTTP client")?;

        Ok(Self {
            client,
            base_url,
            token: None,
        })
    }

    /// Create a client from the loaded configuration, including its token
    pub fn from_config(config: &Config) -> Result<Self> {
        let mut client = Self::new(
            &config.api_base_url,
            Duration::from_secs(config.request_timeout_secs),
        )?;
        if let Some(ref token) = config.token {
            client.set_token(token.clone());
        }
        Ok(client)
    }

    /// Set the bearer token for authenticated requests
    pub fn set_token(&mut self, token: String) {
        self.token = Some(token);
    }

    fn endpoint(&self, segments: &[&str]) -> Url {
        let mut url = self.base_url.clone();
        // new() rejects cannot-be-a-base URLs, so this always succeeds
        if let Ok(mut path) = url.path_segments_mut() {
            path.pop_if_empty().extend(segments);
        }
        url
    }

    fn public_markers_url(&self) -> Url {
        self.endpoint(&[MARKERS_PATH])
    }

    fn admin_markers_url(&self) -> Url {
        self.endpoint(&[ADMIN_PATH, MARKERS_PATH])
    }

    fn admin_marker_url(&self, id: &MarkerId) -> Url {
        self.endpoint(&[ADMIN_PATH, MARKERS_PATH, id.as_str()])
    }

    /// Send a request and return the body of a successful response.
    /// 429 responses are retried with exponential backoff.
    async fn execute<B: Serialize + ?Sized>(
        &self,
        method: Method,
        url: Url,
        body: Option<&B>,
    ) -> Result<String, ApiError> {
        let mut retries = 0;

        loop {
            let mut request = self
                .client
                .request(method.clone(), url.clone())
                .header(header::ACCEPT, "application/json");
            if let Some(ref token) = self.token {
                request = request.bearer_auth(token);
            }
            if let Some(body) = body {
                request = request.json(body);
            }

            let response = request.send().await?;
            let status = response.status();

            if status.is_success() {
                debug!(%method, %url, %status, "Request succeeded");
                return Ok(response.text().await?);
            }

            if status == StatusCode::TOO_MANY_REQUESTS {
                retries += 1;
                let Some(backoff) = rate_limit_backoff(retries) else {
                    return Err(ApiError::RateLimited);
                };
                warn!(%url, retry = retries, backoff_ms = backoff.as_millis() as u64, "Rate limited, backing off");
                tokio::time::sleep(backoff).await;
                continue;
            }

            let body = response.text().await.unwrap_or_default();
            return Err(ApiError::from_status(status, &body));
        }
    }
}

/// Delay before the given (1-based) retry of a rate-limited request, doubling
/// from `INITIAL_BACKOFF_MS`. `None` once the retries are used up.
fn rate_limit_backoff(retry: u32) -> Option<Duration> {
    if retry == 0 || retry > MAX_RATE_LIMIT_RETRIES {
        return None;
    }
    Some(Duration::from_millis(INITIAL_BACKOFF_MS << (retry - 1)))
}

/// Pull the message out of an `{"error": ...}` payload, if that is what `value` is.
/// Falsy values (`null`, `false`, `""`, `0`) mean no error.
fn remote_error(value: &serde_json::Value) -> Option<String> {
    use serde_json::Value;

    match value.get("error")? {
        Value::Null | Value::Bool(false) => None,
        Value::String(message) if message.is_empty() => None,
        Value::Number(n) if n.as_f64() == Some(0.0) => None,
        Value::String(message) => Some(message.clone()),
        other => Some(other.to_string()),
    }
}

/// Decode the body of a successful response as either `T` or the service's error payload.
fn parse_action<T: DeserializeOwned>(body: &str) -> Result<T, ApiError> {
    let value: serde_json::Value = serde_json::from_str(body)
        .map_err(|e| ApiError::InvalidResponse(format!("Malformed JSON: {}", e)))?;

    if let Some(message) = remote_error(&value) {
        return Err(ApiError::Remote(message));
    }

    serde_json::from_value(value)
        .map_err(|e| ApiError::InvalidResponse(format!("Unexpected response shape: {}", e)))
}

/// A delete answers with `{}` or an empty body; only the error payload matters.
fn parse_delete(body: &str) -> Result<(), ApiError> {
    if body.trim().is_empty() {
        return Ok(());
    }
    parse_action::<serde_json::Value>(body).map(|_| ())
}

#[async_trait]
impl MarkerActions for ApiClient {
    async fn create(&self, marker: &NewMarker) -> Result<Marker, ApiError> {
        let body = self
            .execute(Method::POST, self.admin_markers_url(), Some(marker))
            .await?;
        parse_action(&body)
    }

    async fn update(&self, update: &MarkerUpdate) -> Result<Marker, ApiError> {
        let body = self
            .execute(Method::PUT, self.admin_marker_url(&update.id), Some(update))
            .await?;
        parse_action(&body)
    }

    async fn delete(&self, id: &MarkerId) -> Result<(), ApiError> {
        let body = self
            .execute::<()>(Method::DELETE, self.admin_marker_url(id), None)
            .await?;
        parse_delete(&body)
    }

    async fn list(&self) -> Result<Vec<Marker>, ApiError> {
        let body = self
            .execute::<()>(Method::GET, self.public_markers_url(), None)
            .await?;
        parse_action(&body)
    }

    async fn admin_list(&self) -> Result<Vec<Marker>, ApiError> {
        let body = self
            .execute::<()>(Method::GET, self.admin_markers_url(), None)
            .await?;
        parse_action(&body)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn client(base: &str) -> ApiClient {
        ApiClient::new(base, Duration::from_secs(5)).expect("Failed to build test client")
    }

    #[test]
    fn test_endpoint_urls() {
        let api = client("http://localhost:3000/api");
        assert_eq!(api.public_markers_url().as_str(), "http://localhost:3000/api/mapmarkers");
        assert_eq!(
            api.admin_markers_url().as_str(),
            "http://localhost:3000/api/admin/mapmarkers"
        );
        assert_eq!(
            api.admin_marker_url(&MarkerId::from("m1")).as_str(),
            "http://localhost:3000/api/admin/mapmarkers/m1"
        );
    }

    #[test]
    fn test_endpoint_urls_with_trailing_slash_and_odd_ids() {
        let api = client("https://markers.example.org/v1/");
        assert_eq!(
            api.admin_marker_url(&MarkerId::from("a b/c")).as_str(),
            "https://markers.example.org/v1/admin/mapmarkers/a%20b%2Fc"
        );
    }

    #[test]
    fn test_new_rejects_invalid_base_url() {
        assert!(ApiClient::new("not a url", Duration::from_secs(5)).is_err());
        assert!(ApiClient::new("mailto:admin@example.org", Duration::from_secs(5)).is_err());
    }

    #[test]
    fn test_parse_marker_response() {
        let json = r#"{"id":"m1","title":"Cafe","position":{"lat":1,"lng":2},"full_address":"1 Main St"}"#;
        let marker: Marker = parse_action(json).expect("Failed to parse marker response");
        assert_eq!(marker.id, MarkerId::from("m1"));
        assert_eq!(marker.full_address.as_deref(), Some("1 Main St"));
    }

    #[test]
    fn test_parse_list_response() {
        let json = r#"[
            {"id":"m1","title":"Cafe","position":{"lat":1,"lng":2}},
            {"id":"m2","title":"Bakery","position":{"lat":3,"lng":4},"enabled":false}
        ]"#;
        let markers: Vec<Marker> = parse_action(json).expect("Failed to parse list response");
        assert_eq!(markers.len(), 2);
        assert_eq!(markers[1].id.as_str(), "m2");
        assert!(!markers[1].is_enabled());
    }

    #[test]
    fn test_parse_error_payload() {
        let result: Result<Marker, ApiError> = parse_action(r#"{"error":"title already taken"}"#);
        assert!(matches!(result, Err(ApiError::Remote(ref m)) if m == "title already taken"));

        let result: Result<Vec<Marker>, ApiError> =
            parse_action(r#"{"error":{"code":403,"reason":"not admin"}}"#);
        assert!(matches!(result, Err(ApiError::Remote(ref m)) if m.contains("not admin")));
    }

    #[test]
    fn test_parse_null_error_is_not_an_error() {
        let json = r#"{"id":"m1","title":"Cafe","position":{"lat":1,"lng":2},"error":null}"#;
        let marker: Marker = parse_action(json).expect("null error field should be ignored");
        assert_eq!(marker.title, "Cafe");
    }

    #[test]
    fn test_parse_falsy_error_is_not_an_error() {
        for error in ["false", r#""""#, "0", "0.0"] {
            let json = format!(
                r#"{{"id":"m1","title":"Cafe","position":{{"lat":1,"lng":2}},"error":{}}}"#,
                error
            );
            let marker: Marker = parse_action(&json)
                .unwrap_or_else(|e| panic!("error {} should be ignored, got {}", error, e));
            assert_eq!(marker.id.as_str(), "m1");
        }

        assert!(parse_delete(r#"{"error":false}"#).is_ok());
        assert!(matches!(
            parse_delete(r#"{"error":true}"#),
            Err(ApiError::Remote(ref m)) if m == "true"
        ));
    }

    #[test]
    fn test_rate_limit_backoff_schedule() {
        assert_eq!(rate_limit_backoff(1), Some(Duration::from_millis(1000)));
        assert_eq!(rate_limit_backoff(2), Some(Duration::from_millis(2000)));
        assert_eq!(rate_limit_backoff(3), Some(Duration::from_millis(4000)));
        assert_eq!(rate_limit_backoff(MAX_RATE_LIMIT_RETRIES + 1), None);
        assert_eq!(rate_limit_backoff(0), None);
    }

    #[test]
    fn test_parse_unexpected_shape() {
        let result: Result<Marker, ApiError> = parse_action(r#"{"id":"m1"}"#);
        assert!(matches!(result, Err(ApiError::InvalidResponse(_))));

        let result: Result<Vec<Marker>, ApiError> = parse_action("<html>oops</html>");
        assert!(matches!(result, Err(ApiError::InvalidResponse(_))));
    }

    #[test]
    fn test_parse_delete_response() {
        assert!(parse_delete("").is_ok());
        assert!(parse_delete("{}").is_ok());
        assert!(matches!(
            parse_delete(r#"{"error":"marker is locked"}"#),
            Err(ApiError::Remote(_))
        ));
    }
}

//! HTTP client for end-to-end tests
//!
//! This module provides a high-level HTTP client that wraps reqwest
//! and provides methods for all discovery-server endpoints.
//!
//! When API routes or request formats change, update only this file.

use super::constants::*;
use reqwest::Response;
use serde_json::{json, Value};
use std::time::Duration;

/// A server-sent event as received by the browser.
#[derive(Debug, Clone)]
pub struct SseEvent {
    pub event: String,
    pub data: Value,
}

/// HTTP test client with cookie-based session management
pub struct TestClient {
    /// The underlying reqwest client (public for custom requests in tests)
    pub client: reqwest::Client,
    /// The base URL of the test server
    pub base_url: String,
}

impl TestClient {
    /// Creates a client with an empty cookie jar, i.e. a new browser.
    pub fn new(base_url: String) -> Self {
        let client = reqwest::Client::builder()
            .cookie_store(true) // Automatically handle session cookies
            .timeout(Duration::from_secs(REQUEST_TIMEOUT_SECS))
            .build()
            .expect("Failed to build reqwest client");

        Self { client, base_url }
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    // ========================================================================
    // Page & Status
    // ========================================================================

    /// GET /
    pub async fn get_home(&self) -> Response {
        self.client
            .get(self.url("/"))
            .send()
            .await
            .expect("Home request failed")
    }

    /// GET /v1/status
    pub async fn get_status(&self) -> Response {
        self.client
            .get(self.url("/v1/status"))
            .send()
            .await
            .expect("Status request failed")
    }

    // ========================================================================
    // Session
    // ========================================================================

    /// GET /v1/session
    pub async fn get_session(&self) -> Response {
        self.client
            .get(self.url("/v1/session"))
            .send()
            .await
            .expect("Session request failed")
    }

    /// PUT /v1/session/credentials
    pub async fn put_credentials(
        &self,
        openai_api_key: Option<&str>,
        spotify_client_id: Option<&str>,
        spotify_client_secret: Option<&str>,
    ) -> Response {
        self.client
            .put(self.url("/v1/session/credentials"))
            .json(&json!({
                "openai_api_key": openai_api_key,
                "spotify_client_id": spotify_client_id,
                "spotify_client_secret": spotify_client_secret,
            }))
            .send()
            .await
            .expect("Credentials request failed")
    }

    /// POST /v1/session/verify-catalog
    pub async fn verify_catalog(&self) -> Response {
        self.client
            .post(self.url("/v1/session/verify-catalog"))
            .send()
            .await
            .expect("Verify catalog request failed")
    }

    /// POST /v1/session/verify-model
    pub async fn verify_model(&self) -> Response {
        self.client
            .post(self.url("/v1/session/verify-model"))
            .send()
            .await
            .expect("Verify model request failed")
    }

    /// DELETE /v1/session/result
    pub async fn new_search(&self) -> Response {
        self.client
            .delete(self.url("/v1/session/result"))
            .send()
            .await
            .expect("New search request failed")
    }

    // ========================================================================
    // Discovery
    // ========================================================================

    /// POST /v1/discover
    pub async fn discover(&self, artist_name: &str) -> Response {
        self.client
            .post(self.url("/v1/discover"))
            .json(&json!({ "artist_name": artist_name }))
            .send()
            .await
            .expect("Discover request failed")
    }

    /// GET /v1/discover/stream
    pub async fn discover_stream(&self, artist_name: &str) -> Response {
        self.client
            .get(self.url("/v1/discover/stream"))
            .query(&[("artist_name", artist_name)])
            .send()
            .await
            .expect("Discover stream request failed")
    }

    /// Reads a whole event stream. The server closes it after the final
    /// `result` or `error` event.
    pub async fn collect_events(response: Response) -> Vec<SseEvent> {
        let body = response.text().await.expect("Failed to read event stream");
        parse_sse(&body)
    }
}

/// Parses `text/event-stream` content, skipping keep-alive comments.
pub fn parse_sse(body: &str) -> Vec<SseEvent> {
    body.split("\n\n")
        .filter_map(|block| {
            let mut event = String::from("message");
            let mut data = Vec::new();
            for line in block.lines() {
                if let Some(name) = line.strip_prefix("event:") {
                    event = name.trim().to_string();
                } else if let Some(value) = line.strip_prefix("data:") {
                    data.push(value.strip_prefix(' ').unwrap_or(value).to_string());
                }
            }
            if data.is_empty() {
                return None;
            }
            let data = serde_json::from_str(&data.join("\n")).unwrap_or(Value::Null);
            Some(SseEvent { event, data })
        })
        .collect()
}

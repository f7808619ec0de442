//! Fake Spotify Web API and OpenAI-compatible API.
//!
//! Lets tests drive the real HTTP clients against a local server.

use super::constants::*;
use super::fixtures::{find_by_id, find_by_name, model_answer};
use axum::{
    body::Body,
    extract::{Path, Query, State},
    http::{HeaderMap, Request, StatusCode},
    middleware::{self, Next},
    response::{IntoResponse, Response},
    routing::{get, post},
    Form, Json, Router,
};
use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine;
use serde_json::{json, Value};
use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use tokio::net::TcpListener;

/// How the fake upstream behaves.
#[derive(Clone)]
pub struct UpstreamOptions {
    /// Related artists answer 404, as for artists the API has no data for.
    pub related_declined: bool,
    /// Searches answer 429 with a Retry-After header.
    pub rate_limit_search: bool,
    /// Access tokens expire this many seconds after being issued.
    pub token_expires_in: u64,
    pub model_answer: String,
}

impl Default for UpstreamOptions {
    fn default() -> Self {
        Self {
            related_declined: false,
            rate_limit_search: false,
            token_expires_in: 3600,
            model_answer: model_answer(),
        }
    }
}

pub struct UpstreamState {
    options: UpstreamOptions,
    pub token_requests: AtomicUsize,
    /// Path and query of every catalog API call.
    pub api_requests: Mutex<Vec<String>>,
    /// Bodies of every chat completion request.
    pub chat_requests: Mutex<Vec<Value>>,
}

pub struct FakeUpstream {
    pub base_url: String,
    pub state: Arc<UpstreamState>,
    _shutdown_tx: Option<tokio::sync::oneshot::Sender<()>>,
}

impl FakeUpstream {
    pub async fn spawn() -> Self {
        Self::spawn_with(UpstreamOptions::default()).await
    }

    pub async fn spawn_with(options: UpstreamOptions) -> Self {
        let state = Arc::new(UpstreamState {
            options,
            token_requests: AtomicUsize::new(0),
            api_requests: Mutex::new(Vec::new()),
            chat_requests: Mutex::new(Vec::new()),
        });

        let spotify_api = Router::new()
            .route("/search", get(search))
            .route("/artists/{id}", get(artist))
            .route("/artists/{id}/top-tracks", get(top_tracks))
            .route("/artists/{id}/related-artists", get(related_artists))
            .route("/artists/{id}/albums", get(albums))
            .layer(middleware::from_fn_with_state(state.clone(), require_token));

        let openai_api = Router::new()
            .route("/chat/completions", post(chat_completions))
            .route("/models", get(models));

        let app = Router::new()
            .route("/api/token", post(token))
            .nest("/v1", spotify_api)
            .nest("/openai", openai_api)
            .with_state(state.clone());

        let listener = TcpListener::bind("127.0.0.1:0")
            .await
            .expect("Failed to bind fake upstream");
        let port = listener
            .local_addr()
            .expect("Failed to get local address")
            .port();
        let (shutdown_tx, shutdown_rx) = tokio::sync::oneshot::channel::<()>();

        tokio::spawn(async move {
            axum::serve(listener, app)
                .with_graceful_shutdown(async {
                    shutdown_rx.await.ok();
                })
                .await
                .expect("Fake upstream failed");
        });

        Self {
            base_url: format!("http://127.0.0.1:{}", port),
            state,
            _shutdown_tx: Some(shutdown_tx),
        }
    }

    pub fn spotify_api_url(&self) -> String {
        format!("{}/v1", self.base_url)
    }

    pub fn accounts_url(&self) -> String {
        self.base_url.clone()
    }

    pub fn openai_url(&self) -> String {
        format!("{}/openai", self.base_url)
    }

    pub fn token_requests(&self) -> usize {
        self.state.token_requests.load(Ordering::SeqCst)
    }

    pub fn api_requests(&self) -> Vec<String> {
        self.state.api_requests.lock().unwrap().clone()
    }

    pub fn chat_requests(&self) -> Vec<Value> {
        self.state.chat_requests.lock().unwrap().clone()
    }
}

impl Drop for FakeUpstream {
    fn drop(&mut self) {
        if let Some(tx) = self._shutdown_tx.take() {
            let _ = tx.send(());
        }
    }
}

fn spotify_error(status: StatusCode, message: &str) -> Response {
    (
        status,
        Json(json!({ "error": { "status": status.as_u16(), "message": message } })),
    )
        .into_response()
}

async fn require_token(
    State(state): State<Arc<UpstreamState>>,
    request: Request<Body>,
    next: Next,
) -> Response {
    state
        .api_requests
        .lock()
        .unwrap()
        .push(request.uri().to_string());

    let expected = format!("Bearer {}", UPSTREAM_ACCESS_TOKEN);
    let authorized = request
        .headers()
        .get("authorization")
        .and_then(|v| v.to_str().ok())
        .map(|v| v == expected)
        .unwrap_or(false);
    if !authorized {
        return spotify_error(StatusCode::UNAUTHORIZED, "Invalid access token");
    }
    next.run(request).await
}

async fn token(
    State(state): State<Arc<UpstreamState>>,
    headers: HeaderMap,
    Form(form): Form<HashMap<String, String>>,
) -> Response {
    state.token_requests.fetch_add(1, Ordering::SeqCst);

    let expected = format!(
        "Basic {}",
        BASE64.encode(format!("{}:{}", SPOTIFY_CLIENT_ID, SPOTIFY_CLIENT_SECRET))
    );
    let authorized = headers
        .get("authorization")
        .and_then(|v| v.to_str().ok())
        .map(|v| v == expected)
        .unwrap_or(false);
    if !authorized {
        return (
            StatusCode::BAD_REQUEST,
            Json(json!({ "error": "invalid_client", "error_description": "Invalid client" })),
        )
            .into_response();
    }
    if form.get("grant_type").map(String::as_str) != Some("client_credentials") {
        return (
            StatusCode::BAD_REQUEST,
            Json(json!({ "error": "unsupported_grant_type" })),
        )
            .into_response();
    }

    Json(json!({
        "access_token": UPSTREAM_ACCESS_TOKEN,
        "token_type": "Bearer",
        "expires_in": state.options.token_expires_in,
    }))
    .into_response()
}

async fn search(
    State(state): State<Arc<UpstreamState>>,
    Query(query): Query<HashMap<String, String>>,
) -> Response {
    if state.options.rate_limit_search {
        return (StatusCode::TOO_MANY_REQUESTS, [("retry-after", "7")], "slow down").into_response();
    }
    let q = query.get("q").cloned().unwrap_or_default();
    let items: Vec<Value> = find_by_name(&q)
        .map(|a| vec![a.spotify_json()])
        .unwrap_or_default();
    Json(json!({ "artists": { "items": items, "total": items.len() } })).into_response()
}

async fn artist(Path(id): Path<String>) -> Response {
    match find_by_id(&id) {
        Some(a) => Json(a.spotify_json()).into_response(),
        None => spotify_error(StatusCode::NOT_FOUND, "Resource not found"),
    }
}

async fn top_tracks(
    Path(id): Path<String>,
    Query(query): Query<HashMap<String, String>>,
) -> Response {
    if !query.contains_key("market") {
        return spotify_error(StatusCode::BAD_REQUEST, "Missing market parameter");
    }
    match find_by_id(&id) {
        Some(a) => {
            let tracks: Vec<Value> = a
                .top_tracks
                .iter()
                .map(|(name, album)| {
                    json!({
                        "name": name,
                        "album": { "name": album },
                        "external_urls": { "spotify": format!("https://open.spotify.test/track/{}", name) },
                    })
                })
                .collect();
            Json(json!({ "tracks": tracks })).into_response()
        }
        None => spotify_error(StatusCode::NOT_FOUND, "Resource not found"),
    }
}

async fn related_artists(
    State(state): State<Arc<UpstreamState>>,
    Path(id): Path<String>,
) -> Response {
    if state.options.related_declined {
        return spotify_error(StatusCode::NOT_FOUND, "Resource not found");
    }
    match find_by_id(&id) {
        Some(a) => {
            let artists: Vec<Value> = a
                .related
                .iter()
                .filter_map(|id| find_by_id(id))
                .map(|r| r.spotify_json())
                .collect();
            Json(json!({ "artists": artists })).into_response()
        }
        None => spotify_error(StatusCode::NOT_FOUND, "Resource not found"),
    }
}

async fn albums(
    Path(id): Path<String>,
    Query(query): Query<HashMap<String, String>>,
) -> Response {
    let limit: usize = query
        .get("limit")
        .and_then(|l| l.parse().ok())
        .unwrap_or(20);
    match find_by_id(&id) {
        Some(a) => {
            let items: Vec<Value> = a
                .release_dates
                .iter()
                .enumerate()
                .take(limit)
                .map(|(i, date)| {
                    let precision = match date.len() {
                        4 => "year",
                        7 => "month",
                        _ => "day",
                    };
                    json!({
                        "id": format!("{}-album-{}", a.id, i),
                        "name": format!("{} Album {}", a.name, i + 1),
                        "album_type": "album",
                        "release_date": date,
                        "release_date_precision": precision,
                    })
                })
                .collect();
            Json(json!({ "items": items })).into_response()
        }
        None => spotify_error(StatusCode::NOT_FOUND, "Resource not found"),
    }
}

fn openai_authorized(headers: &HeaderMap) -> bool {
    let expected = format!("Bearer {}", OPENAI_API_KEY);
    headers
        .get("authorization")
        .and_then(|v| v.to_str().ok())
        .map(|v| v == expected)
        .unwrap_or(false)
}

async fn chat_completions(
    State(state): State<Arc<UpstreamState>>,
    headers: HeaderMap,
    Json(body): Json<Value>,
) -> Response {
    if !openai_authorized(&headers) {
        return (
            StatusCode::UNAUTHORIZED,
            Json(json!({ "error": { "message": "Incorrect API key provided", "type": "invalid_request_error" } })),
        )
            .into_response();
    }
    state.chat_requests.lock().unwrap().push(body);

    Json(json!({
        "id": "chatcmpl-test",
        "object": "chat.completion",
        "choices": [{
            "index": 0,
            "message": { "role": "assistant", "content": state.options.model_answer },
            "finish_reason": "stop",
        }],
        "usage": { "prompt_tokens": 420, "completion_tokens": 310, "total_tokens": 730 },
    }))
    .into_response()
}

async fn models(headers: HeaderMap) -> Response {
    if !openai_authorized(&headers) {
        return StatusCode::UNAUTHORIZED.into_response();
    }
    Json(json!({ "object": "list", "data": [] })).into_response()
}

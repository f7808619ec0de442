use anyhow::{Context, Result};
use std::time::Duration;

use tracing::{debug, info};

use crate::discovery::{
    CredentialOverrides, CredentialStatus, DiscoveryContext, DiscoveryError, DiscoveryEvent,
    DiscoveryResult, DiscoveryServices,
};
use tower_http::services::ServeDir;

use axum::{
    extract::{
        rejection::{JsonRejection, QueryRejection},
        Query, State,
    },
    http::StatusCode,
    middleware,
    response::{
        sse::{Event, KeepAlive, Sse},
        Html, IntoResponse, Response,
    },
    routing::{delete, get, post, put},
    Json, Router,
};
use axum_extra::extract::cookie::CookieJar;
use futures::{Stream, StreamExt};
use serde::{Deserialize, Serialize};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;

use super::session::{BrowserSession, UserSession};
use super::{log_requests, state::*, ServerConfig};

const INDEX_HTML: &str = include_str!("assets/index.html");

#[derive(Serialize)]
struct ServerStats {
    pub uptime: String,
    pub hash: String,
    pub catalog_configured: bool,
    pub llm_configured: bool,
    pub active_sessions: usize,
}

fn format_uptime(duration: Duration) -> String {
    let total_seconds = duration.as_secs();

    let days = total_seconds / 86_400;
    let hours = (total_seconds % 86_400) / 3600;
    let minutes = (total_seconds % 3600) / 60;
    let seconds = total_seconds % 60;

    format!("{}d {:02}:{:02}:{:02}", days, hours, minutes, seconds)
}

#[derive(Deserialize, Debug)]
struct DiscoverBody {
    pub artist_name: String,
}

#[derive(Deserialize, Debug)]
struct DiscoverQuery {
    pub artist_name: String,
}

#[derive(Serialize)]
struct SessionView {
    pub credentials: CredentialStatus,
    pub last_result: Option<DiscoveryResult>,
}

#[derive(Serialize)]
struct ErrorBody {
    pub error: &'static str,
    pub message: String,
}

/// JSON error response: `{"error": <kind>, "message": ...}`.
#[derive(Debug)]
pub struct ApiError {
    status: StatusCode,
    kind: &'static str,
    message: String,
}

impl ApiError {
    fn invalid_request(message: impl Into<String>) -> Self {
        Self {
            status: StatusCode::BAD_REQUEST,
            kind: "invalid_request",
            message: message.into(),
        }
    }
}

impl From<DiscoveryError> for ApiError {
    fn from(err: DiscoveryError) -> Self {
        let status = match &err {
            DiscoveryError::Credentials(_) => StatusCode::UNAUTHORIZED,
            DiscoveryError::NotFound(_) => StatusCode::NOT_FOUND,
            DiscoveryError::ModelResponse(_) | DiscoveryError::Transient(_) => {
                StatusCode::BAD_GATEWAY
            }
        };
        Self {
            status,
            kind: err.kind(),
            message: err.to_string(),
        }
    }
}

impl From<JsonRejection> for ApiError {
    fn from(rejection: JsonRejection) -> Self {
        Self::invalid_request(rejection.body_text())
    }
}

impl From<QueryRejection> for ApiError {
    fn from(rejection: QueryRejection) -> Self {
        Self::invalid_request(rejection.body_text())
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let body = ErrorBody {
            error: self.kind,
            message: self.message,
        };
        (self.status, Json(body)).into_response()
    }
}

fn validated_artist_name(raw: &str) -> Result<String, ApiError> {
    let name = raw.trim();
    if name.is_empty() {
        return Err(ApiError::invalid_request("An artist name is required"));
    }
    Ok(name.to_string())
}

async fn home() -> Html<&'static str> {
    Html(INDEX_HTML)
}

async fn get_status(State(state): State<ServerState>) -> impl IntoResponse {
    let defaults = state.services.status(&CredentialOverrides::default());
    Json(ServerStats {
        uptime: format_uptime(state.start_time.elapsed()),
        hash: state.hash.clone(),
        catalog_configured: defaults.catalog_configured,
        llm_configured: defaults.llm_configured,
        active_sessions: state.sessions.len(),
    })
}

async fn get_session(session: BrowserSession, State(state): State<ServerState>) -> Response {
    let UserSession {
        credentials,
        last_result,
    } = state.sessions.get(&session.id).unwrap_or_default();
    let view = SessionView {
        credentials: state.services.status(&credentials),
        last_result,
    };
    (session.jar, Json(view)).into_response()
}

async fn put_credentials(
    session: BrowserSession,
    State(state): State<ServerState>,
    body: Result<Json<CredentialOverrides>, JsonRejection>,
) -> Response {
    let Json(body) = match body {
        Ok(body) => body,
        Err(rejection) => return (session.jar, ApiError::from(rejection)).into_response(),
    };
    debug!("put_credentials() called with {:?}", body);
    let credentials = body.normalized();
    let status = state.services.status(&credentials);
    state.sessions.set_credentials(&session.id, credentials);
    (session.jar, Json(status)).into_response()
}

async fn check_catalog(
    services: &DiscoveryServices,
    credentials: &CredentialOverrides,
) -> Result<(), DiscoveryError> {
    let catalog = services.catalog(credentials)?;
    catalog.verify_credentials().await?;
    Ok(())
}

async fn check_model(
    services: &DiscoveryServices,
    credentials: &CredentialOverrides,
) -> Result<(), DiscoveryError> {
    let llm = services.llm(credentials)?;
    llm.health_check().await?;
    Ok(())
}

fn verification_response(jar: CookieJar, outcome: Result<(), DiscoveryError>) -> Response {
    match outcome {
        Ok(()) => (jar, Json(serde_json::json!({ "ok": true }))).into_response(),
        Err(err) => (jar, ApiError::from(err)).into_response(),
    }
}

async fn verify_catalog(session: BrowserSession, State(state): State<ServerState>) -> Response {
    let credentials = state.sessions.credentials(&session.id);
    let outcome = check_catalog(&state.services, &credentials).await;
    info!("Catalog connection check, ok: {}", outcome.is_ok());
    verification_response(session.jar, outcome)
}

async fn verify_model(session: BrowserSession, State(state): State<ServerState>) -> Response {
    let credentials = state.sessions.credentials(&session.id);
    let outcome = check_model(&state.services, &credentials).await;
    info!("Model API connection check, ok: {}", outcome.is_ok());
    verification_response(session.jar, outcome)
}

async fn discover(
    session: BrowserSession,
    State(state): State<ServerState>,
    body: Result<Json<DiscoverBody>, JsonRejection>,
) -> Response {
    let artist_name = match body
        .map_err(ApiError::from)
        .and_then(|Json(body)| validated_artist_name(&body.artist_name))
    {
        Ok(name) => name,
        Err(err) => return (session.jar, err).into_response(),
    };

    let credentials = state.sessions.credentials(&session.id);
    let pipeline = match state.services.pipeline(&credentials) {
        Ok(pipeline) => pipeline,
        Err(err) => return (session.jar, ApiError::from(err)).into_response(),
    };

    let mut ctx = DiscoveryContext::new(artist_name);
    match pipeline.run(&mut ctx).await {
        Ok(result) => {
            state.sessions.store_result(&session.id, result.clone());
            (session.jar, Json(result)).into_response()
        }
        Err(err) => (session.jar, ApiError::from(err)).into_response(),
    }
}

/// Aborts the query task once the progress stream is dropped.
struct AbortOnDrop(JoinHandle<()>);

impl Drop for AbortOnDrop {
    fn drop(&mut self) {
        self.0.abort();
    }
}

fn sse_event(event: &DiscoveryEvent) -> Result<Event, axum::Error> {
    match event {
        DiscoveryEvent::Stage { .. } => Event::default().event("stage").json_data(event),
        DiscoveryEvent::Warning { .. } => Event::default().event("warning").json_data(event),
        DiscoveryEvent::Completed { result } => {
            Event::default().event("result").json_data(result.as_ref())
        }
        DiscoveryEvent::Failed { kind, message } => Event::default().event("error").json_data(
            serde_json::json!({ "error": kind, "message": message }),
        ),
    }
}

fn progress_stream(
    rx: mpsc::UnboundedReceiver<DiscoveryEvent>,
    task: JoinHandle<()>,
) -> impl Stream<Item = Result<Event, axum::Error>> {
    futures::stream::unfold((rx, AbortOnDrop(task)), |(mut rx, guard)| async move {
        rx.recv().await.map(|event| (event, (rx, guard)))
    })
    .map(|event| sse_event(&event))
}

async fn discover_stream(
    session: BrowserSession,
    State(state): State<ServerState>,
    query: Result<Query<DiscoverQuery>, QueryRejection>,
) -> Response {
    let artist_name = match query
        .map_err(ApiError::from)
        .and_then(|Query(query)| validated_artist_name(&query.artist_name))
    {
        Ok(name) => name,
        Err(err) => return (session.jar, err).into_response(),
    };

    let credentials = state.sessions.credentials(&session.id);
    let pipeline = match state.services.pipeline(&credentials) {
        Ok(pipeline) => pipeline,
        Err(err) => return (session.jar, ApiError::from(err)).into_response(),
    };

    let (tx, rx) = mpsc::unbounded_channel();
    let sessions = state.sessions.clone();
    let session_id = session.id.clone();
    let task = tokio::spawn(async move {
        let mut ctx = DiscoveryContext::new(artist_name).with_events(tx);
        if let Ok(result) = pipeline.run(&mut ctx).await {
            sessions.store_result(&session_id, result);
        }
    });

    let sse = Sse::new(progress_stream(rx, task)).keep_alive(KeepAlive::default());
    (session.jar, sse).into_response()
}

async fn delete_result(session: BrowserSession, State(state): State<ServerState>) -> Response {
    let cleared = state.sessions.clear_result(&session.id);
    debug!("New search requested, previous result cleared: {}", cleared);
    (session.jar, StatusCode::NO_CONTENT).into_response()
}

async fn not_found() -> ApiError {
    ApiError {
        status: StatusCode::NOT_FOUND,
        kind: "not_found",
        message: "No such endpoint".to_string(),
    }
}

pub fn make_app(config: ServerConfig, services: DiscoveryServices) -> Router {
    let state = ServerState::new(config.clone(), services);

    let api_routes: Router = Router::new()
        .route("/status", get(get_status))
        .route("/session", get(get_session))
        .route("/session/credentials", put(put_credentials))
        .route("/session/verify-catalog", post(verify_catalog))
        .route("/session/verify-model", post(verify_model))
        .route("/session/result", delete(delete_result))
        .route("/discover", post(discover))
        .route("/discover/stream", get(discover_stream))
        .fallback(not_found)
        .with_state(state.clone());

    let home_router: Router = match config.frontend_dir_path {
        Some(frontend_path) => {
            let static_files_service =
                ServeDir::new(frontend_path).append_index_html_on_directories(true);
            Router::new().fallback_service(static_files_service)
        }
        None => Router::new().route("/", get(home)),
    };

    home_router
        .nest("/v1", api_routes)
        .layer(middleware::from_fn_with_state(state, log_requests))
}

pub async fn run_server(config: ServerConfig, services: DiscoveryServices) -> Result<()> {
    let address = format!("{}:{}", config.bind_address, config.port);
    let app = make_app(config, services);

    let listener = tokio::net::TcpListener::bind(&address)
        .await
        .with_context(|| format!("Failed to bind {}", address))?;
    info!("Listening on http://{}", address);

    Ok(axum::serve(listener, app).await?)
}

//! # HTTP surface.
//!
//! | Route                    | Response                                            |
//! |--------------------------|-----------------------------------------------------|
//! | `GET /health`            | `{"status":"healthy","timestamp":..,"service":..}`  |
//! | `GET /`                  | HTML documentation page                             |
//! | `POST /publish/{channel}`| publishes the raw body; `{"channel","delivered"}`   |
//!
//! Every route runs behind the same middleware stack, outermost first:
//! request id (`x-request-id`, generated when absent), request tracing,
//! request id propagation onto the response, panic recovery (500), CORS and a
//! 60 second request timeout (408).

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use axum::{
    Json, Router,
    extract::{Path, State},
    http::{HeaderName, Method, StatusCode, header},
    response::Html,
    routing::{get, post},
};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tokio::net::TcpListener;
use tower_http::{
    catch_panic::CatchPanicLayer,
    cors::{Any, CorsLayer},
    request_id::{MakeRequestUuid, PropagateRequestIdLayer, SetRequestIdLayer},
    timeout::TimeoutLayer,
    trace::TraceLayer,
};
use tracing::{info, warn};

use crate::{TransportError, TransportRef};

/// Shared state of the routes.
#[derive(Clone)]
pub struct AppState {
    service: Arc<str>,
    transport: TransportRef,
}

impl AppState {
    pub fn new(service: impl Into<Arc<str>>, transport: TransportRef) -> Self {
        Self {
            service: service.into(),
            transport,
        }
    }
}

/// Body of `GET /health`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HealthResponse {
    pub status: String,
    pub timestamp: DateTime<Utc>,
    pub service: String,
}

/// Body of a successful `POST /publish/{channel}`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PublishResponse {
    pub channel: String,
    pub delivered: usize,
}

/// Error body.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorBody {
    pub error: String,
}

type ApiError = (StatusCode, Json<ErrorBody>);

/// Upper bound on the handling of a single request.
pub const REQUEST_TIMEOUT: Duration = Duration::from_secs(60);

/// Builds the router with its middleware stack.
pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/", get(documentation))
        .route("/health", get(health))
        .route("/publish/{channel}", post(publish))
        .layer(TimeoutLayer::new(REQUEST_TIMEOUT))
        .layer(cors())
        .layer(CatchPanicLayer::new())
        .layer(PropagateRequestIdLayer::x_request_id())
        .layer(TraceLayer::new_for_http())
        .layer(SetRequestIdLayer::x_request_id(MakeRequestUuid))
        .with_state(state)
}

fn cors() -> CorsLayer {
    CorsLayer::new()
        .allow_origin(Any)
        .allow_methods([
            Method::GET,
            Method::POST,
            Method::PUT,
            Method::DELETE,
            Method::OPTIONS,
        ])
        .allow_headers([
            header::ACCEPT,
            header::AUTHORIZATION,
            header::CONTENT_TYPE,
            HeaderName::from_static("x-csrf-token"),
        ])
}

/// Serves `app` until `shutdown` resolves, then drains open connections.
pub async fn serve<F>(listener: TcpListener, app: Router, shutdown: F) -> std::io::Result<()>
where
    F: Future<Output = ()> + Send + 'static,
{
    if let Ok(addr) = listener.local_addr() {
        info!(%addr, "starting HTTP server");
    }
    axum::serve(listener, app).with_graceful_shutdown(shutdown).await
}

async fn health(State(state): State<AppState>) -> Json<HealthResponse> {
    info!("health check requested");
    Json(HealthResponse {
        status: "healthy".to_string(),
        timestamp: Utc::now(),
        service: state.service.to_string(),
    })
}

async fn documentation() -> Html<&'static str> {
    Html(DOCUMENTATION)
}

async fn publish(
    State(state): State<AppState>,
    Path(channel): Path<String>,
    body: String,
) -> Result<Json<PublishResponse>, ApiError> {
    let delivered = state
        .transport
        .publish(&channel, &body)
        .await
        .map_err(|e| {
            warn!(channel = %channel, error = %e, "publish rejected");
            api_error(&e)
        })?;

    info!(channel = %channel, delivered, "message published");
    Ok(Json(PublishResponse { channel, delivered }))
}

fn api_error(e: &TransportError) -> ApiError {
    let status = match e {
        TransportError::Closed => StatusCode::SERVICE_UNAVAILABLE,
        TransportError::Rejected { .. } => StatusCode::BAD_REQUEST,
        _ => StatusCode::INTERNAL_SERVER_ERROR,
    };
    (status, Json(ErrorBody { error: e.to_string() }))
}

const DOCUMENTATION: &str = r#"<!DOCTYPE html>
<html>
<head>
    <title>Game Result Microservice API</title>
    <style>
        body { font-family: Arial, sans-serif; margin: 40px; }
        .endpoint {
            margin: 20px 0; padding: 15px;
            border-left: 4px solid #007acc; background-color: #f5f5f5;
        }
        .method { font-weight: bold; color: #007acc; }
        .path { font-family: monospace; background-color: #e8e8e8; padding: 2px 4px; }
        pre { background-color: #f0f0f0; padding: 10px; overflow-x: auto; }
    </style>
</head>
<body>
    <h1>Game Result Microservice API</h1>
    <p>This microservice handles game results, player actions, and chat messages
       via pub/sub channels.</p>

    <h2>Endpoints</h2>

    <div class="endpoint">
        <div><span class="method">GET</span> <span class="path">/health</span></div>
        <p>Health check endpoint: returns service status and timestamp</p>
        <h4>Response:</h4>
        <pre>{
  "status": "healthy",
  "timestamp": "2025-06-27T10:00:00Z",
  "service": "game-result-microservice"
}</pre>
    </div>

    <div class="endpoint">
        <div><span class="method">POST</span> <span class="path">/publish/{channel}</span></div>
        <p>Publishes the raw request body to a channel of the configured broker</p>
        <h4>Response:</h4>
        <pre>{
  "channel": "game-results",
  "delivered": 1
}</pre>
    </div>

    <h2>Channels</h2>
    <p><code>game-results</code>, <code>player-actions</code>, <code>chat-messages</code></p>
</body>
</html>"#;

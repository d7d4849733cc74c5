//! HTTP gateway for rentwise.
//!
//! Exposes the chat engine over a small JSON API:
//! - `POST /api/v1/chat`: one conversational turn
//! - `GET /api/v1/sessions/{id}`: current state of a session
//! - `GET /health` and `GET /`: liveness probe

use axum::body::Bytes;
use axum::extract::{DefaultBodyLimit, Path};
use axum::{
    Router,
    extract::State,
    http::StatusCode,
    response::Json,
    routing::{get, post},
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info, warn};

use rentwise_agent::{ChatEngine, SessionManager, SessionSnapshot, TurnRequest};
use rentwise_core::SessionId;

/// Request bodies above this are rejected before reaching a handler.
const BODY_LIMIT_BYTES: usize = 1024 * 1024;

/// Shared application state for the gateway.
#[derive(Clone)]
pub struct GatewayState {
    pub engine: Arc<ChatEngine>,
}

impl GatewayState {
    pub fn new(engine: ChatEngine) -> Self {
        Self {
            engine: Arc::new(engine),
        }
    }
}

/// Build the gateway router.
pub fn build_router(state: GatewayState) -> Router {
    Router::new()
        .route("/", get(health_handler))
        .route("/health", get(health_handler))
        .route("/api/v1/chat", post(chat_handler))
        .route("/api/v1/sessions/{id}", get(session_handler))
        .layer(DefaultBodyLimit::max(BODY_LIMIT_BYTES))
        .layer(tower_http::trace::TraceLayer::new_for_http())
        .with_state(state)
}

/// Start the gateway HTTP server.
///
/// Builds the extraction provider, the rental backend client and the chat
/// engine once, then serves until the process is stopped.
pub async fn start(config: rentwise_config::AppConfig) -> Result<(), Box<dyn std::error::Error>> {
    let addr = format!("{}:{}", config.gateway.host, config.gateway.port);
    let engine = build_engine(&config)?;

    let state = GatewayState::new(engine);
    if let Some(ttl_secs) = config.session.idle_ttl_secs {
        spawn_session_sweeper(
            state.engine.sessions().clone(),
            ttl_secs,
            config.session.sweep_interval_secs,
        );
    }

    let app = build_router(state);
    info!(address = %addr, "Gateway starting");

    let listener = tokio::net::TcpListener::bind(&addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}

/// Wire the chat engine to the configured model service and rental backend.
pub fn build_engine(
    config: &rentwise_config::AppConfig,
) -> Result<ChatEngine, Box<dyn std::error::Error>> {
    let provider = rentwise_providers::build_from_config(&config.llm)?;
    let client = Arc::new(rentwise_listings::HttpRentalClient::new(&config.rental_api)?);
    let engine = ChatEngine::new(config, provider, client.clone(), client)?;

    if !config.has_user_id() {
        warn!("No user id configured; house lookups and actions will be refused");
    }
    info!(extractor = engine.extractor_name(), "Chat engine ready");
    Ok(engine)
}

/// Periodically drop sessions idle for longer than `ttl_secs`.
pub fn spawn_session_sweeper(
    sessions: Arc<SessionManager>,
    ttl_secs: u64,
    interval_secs: u64,
) -> tokio::task::JoinHandle<()> {
    let ttl = i64::try_from(ttl_secs)
        .ok()
        .and_then(chrono::TimeDelta::try_seconds)
        .unwrap_or(chrono::TimeDelta::MAX);
    let period = Duration::from_secs(interval_secs.max(1));
    info!(ttl_secs, interval_secs = period.as_secs(), "Session sweeper enabled");

    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(period);
        // The first tick completes immediately.
        ticker.tick().await;
        loop {
            ticker.tick().await;
            let swept = sessions.sweep_idle(ttl);
            debug!(swept, remaining = sessions.len(), "Session sweep finished");
        }
    })
}

// ── Handlers ──────────────────────────────────────────────────────────────

#[derive(Debug, Serialize)]
struct HealthResponse {
    status: &'static str,
    service: &'static str,
    version: &'static str,
}

async fn health_handler() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok",
        service: "rentwise",
        version: env!("CARGO_PKG_VERSION"),
    })
}

#[derive(Debug, Default, Deserialize)]
struct ChatRequest {
    #[serde(default)]
    model_ip: Option<String>,
    #[serde(default)]
    session_id: Option<String>,
    #[serde(default, alias = "text")]
    message: String,
}

impl ChatRequest {
    /// Lenient parse: anything that is not a JSON chat object counts as an
    /// empty message.
    fn parse(body: &[u8]) -> Self {
        match serde_json::from_slice(body) {
            Ok(request) => request,
            Err(e) => {
                if !body.is_empty() {
                    debug!(error = %e, "Unreadable chat body; treating as empty message");
                }
                Self::default()
            }
        }
    }
}

#[derive(Debug, Serialize)]
struct ChatResponse {
    reply: String,
    session_id: String,
}

async fn chat_handler(State(state): State<GatewayState>, body: Bytes) -> Json<ChatResponse> {
    let request = ChatRequest::parse(&body);
    let session_id = request
        .session_id
        .map(|id| id.trim().to_string())
        .filter(|id| !id.is_empty());
    let model_ip = request
        .model_ip
        .map(|ip| ip.trim().to_string())
        .filter(|ip| !ip.is_empty());

    let turn = state
        .engine
        .handle_turn(TurnRequest {
            session_id,
            message: request.message,
            model_ip,
        })
        .await;

    Json(ChatResponse {
        reply: turn.reply,
        session_id: turn.session_id.to_string(),
    })
}

#[derive(Debug, Serialize)]
struct ErrorResponse {
    error: String,
}

async fn session_handler(
    State(state): State<GatewayState>,
    Path(id): Path<String>,
) -> Result<Json<SessionSnapshot>, (StatusCode, Json<ErrorResponse>)> {
    match state.engine.sessions().snapshot(&SessionId::from(id.as_str())).await {
        Some(snapshot) => Ok(Json(snapshot)),
        None => Err((
            StatusCode::NOT_FOUND,
            Json(ErrorResponse {
                error: format!("Session '{id}' not found"),
            }),
        )),
    }
}

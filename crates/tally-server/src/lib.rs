//! Tally Web Server
//!
//! Axum-based REST API for the Tally expense tracker.
//!
//! - Expenses are scoped to the caller's `X-User-ID` header
//! - Restrictive CORS policy (configured origins only)
//! - Security headers on every response
//! - Sanitized error responses

use std::sync::Arc;

use axum::{
    http::{header, HeaderMap, HeaderValue, Method, StatusCode},
    response::{IntoResponse, Response},
    routing::get,
    Json, Router,
};
use tower_http::{cors::CorsLayer, set_header::SetResponseHeaderLayer, trace::TraceLayer};
use tracing::{error, info, warn};

use tally_core::ai::LlmBackend;
use tally_core::{Database, LlmClient};

mod handlers;

/// Header carrying the caller's user id
pub const USER_ID_HEADER: &str = "x-user-id";

/// User id applied when the request carries none
pub const DEFAULT_USER_ID: i64 = 12345;

/// Maximum page size for expense listings
pub const MAX_PAGE_SIZE: usize = 100;

/// Server configuration
#[derive(Clone, Debug)]
pub struct ServerConfig {
    /// Fallback for requests without a valid `X-User-ID`
    pub default_user_id: i64,
    /// Allowed CORS origins (empty = same-origin only)
    pub allowed_origins: Vec<String>,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            default_user_id: DEFAULT_USER_ID,
            allowed_origins: vec!["http://localhost:8501".to_string()],
        }
    }
}

impl ServerConfig {
    /// Read `DEFAULT_USER_ID` and `CORS_ORIGINS` (comma separated)
    pub fn from_env() -> Self {
        let mut config = Self::default();

        if let Ok(raw) = std::env::var("DEFAULT_USER_ID") {
            match raw.trim().parse() {
                Ok(id) => config.default_user_id = id,
                Err(_) => warn!("Ignoring invalid DEFAULT_USER_ID '{}'", raw),
            }
        }

        if let Ok(raw) = std::env::var("CORS_ORIGINS") {
            config.allowed_origins = parse_origins(&raw);
        }

        config
    }
}

fn parse_origins(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(|o| o.trim())
        .filter(|o| !o.is_empty())
        .map(String::from)
        .collect()
}

/// Shared application state
pub struct AppState {
    pub db: Database,
    pub config: ServerConfig,
    /// None when no LLM provider could be configured; classification then fails
    pub llm: Option<LlmClient>,
}

/// Resolve the requesting user from the `X-User-ID` header
pub fn user_id(headers: &HeaderMap, config: &ServerConfig) -> i64 {
    headers
        .get(USER_ID_HEADER)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.trim().parse().ok())
        .unwrap_or(config.default_user_id)
}

/// Create the router
pub fn create_router(db: Database, config: ServerConfig, llm: Option<LlmClient>) -> Router {
    match &llm {
        Some(client) => info!(
            "LLM backend configured: {} (model: {})",
            client.provider(),
            client.model()
        ),
        None => info!(
            "ℹ️  LLM backend not configured (set LLM_PROVIDER / OPENAI_API_KEY to enable classification)"
        ),
    }

    let cors = cors_layer(&config);

    let state = Arc::new(AppState { db, config, llm });

    // Both slash variants are routed; clients differ on which they send
    let api_routes = Router::new()
        // Expenses
        .route("/expenses", get(handlers::list_expenses))
        .route("/expenses/", get(handlers::list_expenses))
        .route(
            "/expenses/classify",
            axum::routing::post(handlers::classify_expense),
        )
        .route(
            "/expenses/:id",
            get(handlers::get_expense).delete(handlers::delete_expense),
        )
        // Categories
        .route("/categories", get(handlers::list_categories))
        .route("/categories/", get(handlers::list_categories))
        // Analytics
        .route("/analytics/summary", get(handlers::get_summary));

    Router::new()
        .route("/", get(handlers::root))
        .route("/health", get(handlers::health))
        .nest("/api/v1", api_routes)
        .with_state(state)
        .layer(TraceLayer::new_for_http())
        .layer(cors)
        // Security headers
        .layer(SetResponseHeaderLayer::overriding(
            header::X_CONTENT_TYPE_OPTIONS,
            HeaderValue::from_static("nosniff"),
        ))
        .layer(SetResponseHeaderLayer::overriding(
            header::X_FRAME_OPTIONS,
            HeaderValue::from_static("DENY"),
        ))
}

fn cors_layer(config: &ServerConfig) -> CorsLayer {
    let methods = [Method::GET, Method::POST, Method::DELETE, Method::OPTIONS];
    let headers = [
        header::CONTENT_TYPE,
        header::AUTHORIZATION,
        header::HeaderName::from_static(USER_ID_HEADER),
    ];

    if config.allowed_origins.is_empty() {
        // Restrictive default: only allow same-origin
        CorsLayer::new().allow_methods(methods).allow_headers(headers)
    } else {
        let origins: Vec<HeaderValue> = config
            .allowed_origins
            .iter()
            .filter_map(|o| o.parse().ok())
            .collect();
        CorsLayer::new()
            .allow_origin(origins)
            .allow_methods(methods)
            .allow_headers(headers)
    }
}

/// Start the server with configuration read from the environment
pub async fn serve(db: Database, host: &str, port: u16) -> anyhow::Result<()> {
    let llm = match LlmClient::from_env() {
        Ok(client) => Some(client),
        Err(e) => {
            warn!("⚠️  {} - /expenses/classify will return errors", e);
            None
        }
    };
    serve_with_config(db, host, port, ServerConfig::from_env(), llm).await
}

/// Start the server with custom configuration
pub async fn serve_with_config(
    db: Database,
    host: &str,
    port: u16,
    config: ServerConfig,
    llm: Option<LlmClient>,
) -> anyhow::Result<()> {
    match db.seed_categories() {
        Ok(count) if count > 0 => info!("Seeded {} default categories", count),
        Ok(_) => {}
        Err(e) => warn!("Failed to seed default categories: {}", e),
    }

    let app = create_router(db, config, llm);
    let addr = format!("{}:{}", host, port);

    info!("Starting server at http://{}", addr);

    let listener = tokio::net::TcpListener::bind(&addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}

// ============================================================================
// Error Handling
// ============================================================================

/// Application error type with proper HTTP status codes
#[derive(Debug)]
pub struct AppError {
    status: StatusCode,
    message: String,
    errors: Vec<String>,
    internal: Option<anyhow::Error>,
}

impl AppError {
    pub fn not_found(msg: &str) -> Self {
        Self::with_status(StatusCode::NOT_FOUND, msg)
    }

    pub fn internal(msg: &str) -> Self {
        Self::with_status(StatusCode::INTERNAL_SERVER_ERROR, msg)
    }

    /// 400 carrying the individual validation messages
    pub fn validation(errors: Vec<String>) -> Self {
        Self {
            errors,
            ..Self::with_status(StatusCode::BAD_REQUEST, "Invalid input")
        }
    }

    fn with_status(status: StatusCode, msg: &str) -> Self {
        Self {
            status,
            message: msg.to_string(),
            errors: Vec::new(),
            internal: None,
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        // Log the full internal error if present
        if let Some(err) = &self.internal {
            error!(error = %err, "Internal error");
        }

        let body = if self.errors.is_empty() {
            serde_json::json!({ "error": self.message })
        } else {
            serde_json::json!({ "error": self.message, "errors": self.errors })
        };

        (self.status, Json(body)).into_response()
    }
}

impl<E> From<E> for AppError
where
    E: Into<anyhow::Error>,
{
    fn from(err: E) -> Self {
        let err = err.into();
        Self {
            status: StatusCode::INTERNAL_SERVER_ERROR,
            // Return generic message to client
            message: "An internal error occurred".to_string(),
            errors: Vec::new(),
            // Keep full error for logging
            internal: Some(err),
        }
    }
}

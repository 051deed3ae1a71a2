//! HTTP API server.
//!
//! # Endpoints
//!
//! | Method | Path | Description |
//! |--------|------|-------------|
//! | `GET` | `/api/v1/hello` | Greeting, `?name=` defaults to `World` |
//! | `GET` | `/healthz` | Liveness probe |
//! | `GET` | `/readyz` | Readiness probe |
//! | `GET` | `/version` | Configured app version and commit |
//! | `GET` | `/api/v1/generate-ideas` | `?count=1..12` placeholder ideas |
//! | `GET` | `/api/v1/ideas` | Stored ideas (shape depends on the backend) |
//! | `GET` | `/api/v1/ideas/random` | `?count=1..100` random content ideas |
//! | `GET` | `/openapi.json` | OpenAPI document |
//! | `GET` | `/docs` | Swagger UI over `/openapi.json` |
//!
//! # Error Contract
//!
//! Error responses carry a single message:
//!
//! ```json
//! { "error": "Invalid 'count'. Must be an integer between 1 and 12." }
//! ```
//!
//! Malformed query strings are `400`s with the same shape. Anything
//! unexpected becomes a `500` with a generic message; the cause is logged,
//! not returned.
//!
//! # Ideas backends
//!
//! With `IDEAS_BACKEND=records` (default) each `/api/v1/ideas` request opens
//! the record store on `DB_FILE_PATH`, lists it, and closes it again. With
//! `IDEAS_BACKEND=content` one content-store pool on `DB_PATH` is opened at
//! startup and shared by all requests.

use axum::{
    extract::{rejection::QueryRejection, Query, State},
    http::StatusCode,
    response::{Html, IntoResponse, Response},
    routing::get,
    Json, Router,
};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::sync::Arc;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;
use tracing::{error, info};
use utoipa::{IntoParams, ToSchema};

use crate::config::{Backend, Config};
use crate::content_store::ContentStore;
use crate::generator::{create_generator, IdeaGenerator, MAX_COUNT, MIN_COUNT};
use crate::models::{ContentIdea, Idea, Page};
use crate::openapi;
use crate::store::{IdeaStore, IdeaStoreOptions};

/// Message returned for any out-of-range or non-integer `count`.
pub const INVALID_COUNT_MESSAGE: &str = "Invalid 'count'. Must be an integer between 1 and 12.";

const DEFAULT_PAGE_LIMIT: i64 = 20;
const DEFAULT_RANDOM_COUNT: i64 = 10;

/// Shared application state passed to all route handlers via Axum's `State` extractor.
#[derive(Clone)]
pub struct AppState {
    app_version: Arc<str>,
    git_commit: Arc<str>,
    generator: Arc<dyn IdeaGenerator>,
    ideas: IdeasBackend,
    openapi: Arc<utoipa::openapi::OpenApi>,
}

/// Storage behind the `/api/v1/ideas` routes.
#[derive(Clone)]
pub enum IdeasBackend {
    /// Record store opened per request. `None` lists an empty in-memory store.
    Records { storage_path: Option<PathBuf> },
    /// Content store shared across requests.
    Content(ContentStore),
}

impl AppState {
    pub fn new(
        app_version: &str,
        git_commit: &str,
        generator: Arc<dyn IdeaGenerator>,
        ideas: IdeasBackend,
    ) -> Self {
        Self {
            app_version: Arc::from(app_version),
            git_commit: Arc::from(git_commit),
            generator,
            ideas,
            openapi: Arc::new(openapi::api_doc(app_version)),
        }
    }

    /// Build state from configuration, opening the content store if selected.
    pub async fn from_config(config: &Config) -> anyhow::Result<Self> {
        let generator: Arc<dyn IdeaGenerator> = Arc::from(create_generator(&config.ai.provider));

        let ideas = match config.db.backend {
            Backend::Records => IdeasBackend::Records {
                storage_path: config.db.file_path.clone(),
            },
            Backend::Content => {
                let path = config.db.content_db_path();
                info!(db = %path.display(), "Opening content store");
                IdeasBackend::Content(ContentStore::open(&path).await?)
            }
        };

        Ok(Self::new(
            &config.server.app_version,
            &config.server.git_commit,
            generator,
            ideas,
        ))
    }
}

/// Assemble the router with CORS and request tracing.
pub fn build_router(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        .route("/api/v1/hello", get(hello))
        .route("/healthz", get(healthz))
        .route("/readyz", get(readyz))
        .route("/version", get(version))
        .route("/api/v1/generate-ideas", get(generate_ideas))
        .route("/api/v1/ideas", get(list_ideas))
        .route("/api/v1/ideas/random", get(random_ideas))
        .route("/openapi.json", get(openapi_json))
        .route("/docs", get(docs))
        .route("/docs/", get(docs))
        .layer(TraceLayer::new_for_http())
        .layer(cors)
        .with_state(state)
}

/// Start the HTTP server on `0.0.0.0:<port>` and run until Ctrl-C.
pub async fn run_server(config: &Config) -> anyhow::Result<()> {
    let state = AppState::from_config(config).await?;
    let content_store = match &state.ideas {
        IdeasBackend::Content(store) => Some(store.clone()),
        IdeasBackend::Records { .. } => None,
    };

    let app = build_router(state);
    let bind_addr = format!("0.0.0.0:{}", config.server.port);
    let listener = tokio::net::TcpListener::bind(&bind_addr).await?;

    info!(
        addr = %bind_addr,
        version = %config.server.app_version,
        backend = ?config.db.backend,
        "Server started"
    );

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    if let Some(store) = content_store {
        store.close().await;
    }
    info!("Server stopped");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        error!("Failed to listen for shutdown signal: {}", e);
    }
}

// ============ Error response ============

/// JSON error response body.
#[derive(Serialize, ToSchema)]
pub struct ErrorBody {
    pub error: String,
}

/// Internal error type that converts into an Axum HTTP response.
#[derive(Debug)]
pub struct AppError {
    status: StatusCode,
    message: String,
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        (
            self.status,
            Json(ErrorBody {
                error: self.message,
            }),
        )
            .into_response()
    }
}

impl<E: Into<anyhow::Error>> From<E> for AppError {
    fn from(err: E) -> Self {
        let err = err.into();
        error!("Request failed: {:#}", err);
        AppError {
            status: StatusCode::INTERNAL_SERVER_ERROR,
            message: "Internal server error".to_string(),
        }
    }
}

/// Constructs a 400 Bad Request error.
fn bad_request(message: impl Into<String>) -> AppError {
    AppError {
        status: StatusCode::BAD_REQUEST,
        message: message.into(),
    }
}

/// Unwrap a query extractor, reporting a malformed query string as a JSON 400.
fn query_or_bad_request<T>(query: Result<Query<T>, QueryRejection>) -> Result<T, AppError> {
    query
        .map(|Query(q)| q)
        .map_err(|rejection| bad_request(rejection.body_text()))
}

/// Constructs a 404 Not Found error.
fn not_found(message: impl Into<String>) -> AppError {
    AppError {
        status: StatusCode::NOT_FOUND,
        message: message.into(),
    }
}

// ============ GET /api/v1/hello ============

#[derive(Deserialize, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct HelloQuery {
    /// Name to greet. Defaults to `World`.
    name: Option<String>,
}

#[derive(Serialize, ToSchema)]
pub struct HelloResponse {
    pub message: String,
}

/// Hello world
///
/// Greets the provided name. Defaults to "World".
#[utoipa::path(
    get,
    path = "/api/v1/hello",
    tag = "hello",
    params(HelloQuery),
    responses((status = 200, description = "Greeting", body = HelloResponse))
)]
pub async fn hello(
    query: Result<Query<HelloQuery>, QueryRejection>,
) -> Result<Json<HelloResponse>, AppError> {
    let query = query_or_bad_request(query)?;
    let name = query.name.as_deref().unwrap_or("World");
    Ok(Json(HelloResponse {
        message: format!("Hello, {}!", name),
    }))
}

// ============ Probes ============

#[derive(Serialize, ToSchema)]
pub struct StatusResponse {
    pub status: String,
}

/// Liveness probe
#[utoipa::path(
    get,
    path = "/healthz",
    tag = "ops",
    responses((status = 200, description = "Process is alive", body = StatusResponse))
)]
pub async fn healthz() -> Json<StatusResponse> {
    Json(StatusResponse {
        status: "ok".to_string(),
    })
}

/// Readiness probe
#[utoipa::path(
    get,
    path = "/readyz",
    tag = "ops",
    responses((status = 200, description = "Ready to serve", body = StatusResponse))
)]
pub async fn readyz() -> Json<StatusResponse> {
    Json(StatusResponse {
        status: "ready".to_string(),
    })
}

#[derive(Serialize, ToSchema)]
pub struct VersionResponse {
    pub version: String,
    pub commit: String,
}

/// App version and commit
#[utoipa::path(
    get,
    path = "/version",
    tag = "ops",
    responses((status = 200, description = "Build information", body = VersionResponse))
)]
pub async fn version(State(state): State<AppState>) -> Json<VersionResponse> {
    Json(VersionResponse {
        version: state.app_version.to_string(),
        commit: state.git_commit.to_string(),
    })
}

// ============ GET /api/v1/generate-ideas ============

#[derive(Deserialize, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct GenerateQuery {
    /// Number of ideas to generate, an integer in 1..=12 (default 1).
    #[param(value_type = Option<u32>)]
    count: Option<String>,
}

/// Parse the raw `count` value: absent means 1, anything else must be a
/// decimal number with an integral value within `MIN_COUNT..=MAX_COUNT`
/// (so `3`, `3.0` and `3e0` are all 3).
fn parse_count(raw: Option<&str>) -> Result<u32, AppError> {
    let Some(raw) = raw else {
        return Ok(MIN_COUNT);
    };
    let range = f64::from(MIN_COUNT)..=f64::from(MAX_COUNT);
    match raw.trim().parse::<f64>() {
        Ok(n) if n.is_finite() && n.fract() == 0.0 && range.contains(&n) => Ok(n as u32),
        _ => Err(bad_request(INVALID_COUNT_MESSAGE)),
    }
}

/// Generate dummy ideas
///
/// Returns N dummy ideas. All ideas are identical except for unique ids.
#[utoipa::path(
    get,
    path = "/api/v1/generate-ideas",
    tag = "ideas",
    params(GenerateQuery),
    responses(
        (status = 200, description = "Generated ideas", body = [Idea]),
        (status = 400, description = "Invalid count", body = ErrorBody)
    )
)]
pub async fn generate_ideas(
    State(state): State<AppState>,
    query: Result<Query<GenerateQuery>, QueryRejection>,
) -> Result<Json<Vec<Idea>>, AppError> {
    // A query that does not even deserialize (e.g. `count` given twice) is a bad count too.
    let Ok(Query(query)) = query else {
        return Err(bad_request(INVALID_COUNT_MESSAGE));
    };
    let count = parse_count(query.count.as_deref())?;
    let ideas = state.generator.generate(count).await?;
    Ok(Json(ideas))
}

// ============ GET /api/v1/ideas ============

#[derive(Deserialize, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct PageQuery {
    /// Page size, clamped to 1..=100 (content backend only).
    limit: Option<i64>,
    /// Rows to skip, clamped to >= 0 (content backend only).
    offset: Option<i64>,
}

/// List ideas
///
/// Records backend: every stored idea as an array. Content backend: one
/// page as `{items,total,limit,offset,hasMore,nextOffset?}`.
#[utoipa::path(
    get,
    path = "/api/v1/ideas",
    tag = "ideas",
    params(PageQuery),
    responses((status = 200, description = "Stored ideas", body = [Idea]))
)]
pub async fn list_ideas(
    State(state): State<AppState>,
    query: Result<Query<PageQuery>, QueryRejection>,
) -> Result<Response, AppError> {
    let query = query_or_bad_request(query)?;
    match &state.ideas {
        IdeasBackend::Records { storage_path } => {
            let store = IdeaStore::open(IdeaStoreOptions {
                storage_path: storage_path.clone(),
                auto_persist: Some(false),
            })
            .await?;
            let listed = store.list().await;
            store.close().await;
            Ok(Json(listed?).into_response())
        }
        IdeasBackend::Content(store) => {
            let page: Page = store
                .list_page(
                    query.limit.unwrap_or(DEFAULT_PAGE_LIMIT),
                    query.offset.unwrap_or(0),
                )
                .await?;
            Ok(Json(page).into_response())
        }
    }
}

// ============ GET /api/v1/ideas/random ============

#[derive(Deserialize, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct RandomQuery {
    /// Sample size, clamped to 1..=100 (default 10).
    count: Option<i64>,
}

#[derive(Serialize, ToSchema)]
pub struct RandomIdeasResponse {
    pub ideas: Vec<ContentIdea>,
}

/// Random ideas
///
/// A random sample of stored content ideas.
#[utoipa::path(
    get,
    path = "/api/v1/ideas/random",
    tag = "ideas",
    params(RandomQuery),
    responses(
        (status = 200, description = "Random sample", body = RandomIdeasResponse),
        (status = 404, description = "Records backend has no random sampling", body = ErrorBody)
    )
)]
pub async fn random_ideas(
    State(state): State<AppState>,
    query: Result<Query<RandomQuery>, QueryRejection>,
) -> Result<Json<RandomIdeasResponse>, AppError> {
    let query = query_or_bad_request(query)?;
    match &state.ideas {
        IdeasBackend::Content(store) => {
            let ideas = store
                .random_sample(query.count.unwrap_or(DEFAULT_RANDOM_COUNT))
                .await?;
            Ok(Json(RandomIdeasResponse { ideas }))
        }
        IdeasBackend::Records { .. } => Err(not_found(
            "Random sampling requires IDEAS_BACKEND=content",
        )),
    }
}

// ============ GET /openapi.json ============

/// OpenAPI 3.0 document
#[utoipa::path(
    get,
    path = "/openapi.json",
    tag = "meta",
    responses((status = 200, description = "OpenAPI document"))
)]
pub async fn openapi_json(State(state): State<AppState>) -> Json<utoipa::openapi::OpenApi> {
    Json(state.openapi.as_ref().clone())
}

// ============ GET /docs ============

async fn docs() -> Html<String> {
    Html(openapi::swagger_html("/openapi.json"))
}

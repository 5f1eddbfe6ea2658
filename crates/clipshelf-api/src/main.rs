//! clipshelf API server: video catalog listing, creation, and tags.

use std::net::SocketAddr;
use std::num::NonZeroU32;
use std::sync::Arc;

use axum::{
    extract::{Query, State},
    http::{header, HeaderValue, Method, StatusCode},
    response::IntoResponse,
    routing::get,
    Json, Router,
};
use governor::{Quota, RateLimiter};
use serde::{Deserialize, Serialize};
use tower_http::{
    cors::{AllowOrigin, CorsLayer},
    limit::RequestBodyLimitLayer,
    request_id::{MakeRequestId, PropagateRequestIdLayer, RequestId, SetRequestIdLayer},
    trace::TraceLayer,
};
use tracing::{error, info};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;
use uuid::Uuid;

use clipshelf_api::query::ListVideosQuery;
use clipshelf_api::services::ListCache;
use clipshelf_core::{
    defaults, ListVideosResponse, RawVideoInput, Tag, ValidationErrors, Video, VideoRepository,
};
use clipshelf_db::{Database, TagRepository};

/// Sets `x-request-id` to a time-ordered UUIDv7 per request.
#[derive(Clone, Copy)]
struct MakeRequestUuidV7;

impl MakeRequestId for MakeRequestUuidV7 {
    fn make_request_id<B>(&mut self, _request: &axum::http::Request<B>) -> Option<RequestId> {
        let id = Uuid::now_v7().to_string().parse().ok()?;
        Some(RequestId::new(id))
    }
}

type GlobalRateLimiter = RateLimiter<
    governor::state::NotKeyed,
    governor::state::InMemoryState,
    governor::clock::DefaultClock,
>;

/// Application state shared across handlers.
#[derive(Clone)]
struct AppState {
    db: Database,
    /// In-process cache for list results (reduces store round-trips
    /// for repeated criteria).
    list_cache: ListCache,
    /// Global rate limiter (None if rate limiting is disabled).
    rate_limiter: Option<Arc<GlobalRateLimiter>>,
}

/// OpenAPI documentation metadata for the Swagger UI at `/docs`.
#[derive(OpenApi)]
#[openapi(
    info(
        title = "Clipshelf API",
        description = "Video-library catalog: browse, filter, sort, and add video records"
    ),
    components(schemas(
        Video,
        Tag,
        ListVideosResponse,
        RawVideoInput,
        clipshelf_core::NumericInput,
        clipshelf_core::FieldError,
        ValidationErrors,
        clipshelf_core::SortOrder,
        clipshelf_core::ListCriteria,
    )),
    tags(
        (name = "Videos", description = "Video listing and creation"),
        (name = "Tags", description = "Tag listing"),
        (name = "System", description = "Health checks and system info")
    )
)]
struct ApiDoc;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load environment variables
    dotenvy::dotenv().ok();

    // Initialize tracing with configurable output
    //
    // Environment variables:
    //   LOG_FORMAT  - "json" or "text" (default: "text")
    //   LOG_FILE    - path to log file (optional, enables file logging)
    //   LOG_ANSI    - "true"/"false" override ANSI colors (auto-detected by default)
    //   RUST_LOG    - standard env filter (default: "clipshelf_api=debug,tower_http=debug")
    let log_format = std::env::var("LOG_FORMAT").unwrap_or_else(|_| "text".to_string());
    let log_file = std::env::var("LOG_FILE").ok();
    let log_ansi = std::env::var("LOG_ANSI")
        .ok()
        .map(|v| v == "true" || v == "1");

    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| "clipshelf_api=debug,tower_http=debug".into());

    let registry = tracing_subscriber::registry().with(env_filter);

    // Optionally create a file appender with daily rotation
    let _file_guard = if let Some(ref path) = log_file {
        let file_dir = std::path::Path::new(path)
            .parent()
            .unwrap_or(std::path::Path::new("."));
        let file_name = std::path::Path::new(path)
            .file_name()
            .and_then(|f| f.to_str())
            .unwrap_or("clipshelf-api.log");
        let file_appender = tracing_appender::rolling::daily(file_dir, file_name);
        let (non_blocking, guard) = tracing_appender::non_blocking(file_appender);

        if log_format == "json" {
            registry
                .with(
                    tracing_subscriber::fmt::layer()
                        .json()
                        .with_writer(non_blocking),
                )
                .init();
        } else {
            let mut layer = tracing_subscriber::fmt::layer().with_writer(non_blocking);
            if let Some(ansi) = log_ansi {
                layer = layer.with_ansi(ansi);
            } else {
                layer = layer.with_ansi(false); // no ANSI in files
            }
            registry.with(layer).init();
        }
        Some(guard)
    } else {
        // Console-only output
        if log_format == "json" {
            registry
                .with(tracing_subscriber::fmt::layer().json())
                .init();
        } else {
            let mut layer = tracing_subscriber::fmt::layer();
            if let Some(ansi) = log_ansi {
                layer = layer.with_ansi(ansi);
            }
            registry.with(layer).init();
        }
        None
    };

    info!(
        log_format = %log_format,
        log_file = log_file.as_deref().unwrap_or("(stdout)"),
        "Logging initialized"
    );

    // Get configuration from environment
    let database_url =
        std::env::var("DATABASE_URL").unwrap_or_else(|_| defaults::DATABASE_URL.to_string());
    let host = std::env::var("HOST").unwrap_or_else(|_| defaults::HOST.to_string());
    let port: u16 = std::env::var("PORT")
        .unwrap_or_else(|_| defaults::PORT.to_string())
        .parse()?;

    let rate_limit_requests: u64 = std::env::var("RATE_LIMIT_REQUESTS")
        .unwrap_or_else(|_| "300".to_string())
        .parse()?;
    let rate_limit_period_secs: u64 = std::env::var("RATE_LIMIT_PERIOD_SECS")
        .unwrap_or_else(|_| "60".to_string())
        .parse()?;
    let rate_limit_enabled: bool = std::env::var("RATE_LIMIT_ENABLED")
        .map(|v| v != "false" && v != "0")
        .unwrap_or(true);

    // Connect and migrate
    let db = Database::connect(&database_url).await?;
    db.migrate().await?;

    // Create rate limiter if enabled
    let rate_limiter = if rate_limit_enabled {
        let quota = Quota::with_period(std::time::Duration::from_secs(rate_limit_period_secs))
            .ok_or_else(|| anyhow::anyhow!("Rate limit period must be non-zero"))?
            .allow_burst(
                NonZeroU32::new(rate_limit_requests as u32)
                    .ok_or_else(|| anyhow::anyhow!("Rate limit must be non-zero"))?,
            );
        Some(Arc::new(RateLimiter::direct(quota)))
    } else {
        None
    };

    let state = AppState {
        db,
        list_cache: ListCache::new(),
        rate_limiter,
    };

    let app = build_router(state);

    // Start server
    let addr: SocketAddr = format!("{}:{}", host, port).parse()?;
    info!("Starting server on {}", addr);
    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}

/// Build the application router with all routes and middleware.
fn build_router(state: AppState) -> Router {
    Router::new()
        // Health check
        .route("/health", get(health_check))
        // Swagger UI
        .merge(SwaggerUi::new("/docs").url("/api-docs/openapi.json", ApiDoc::openapi()))
        // Videos
        .route("/api/v1/videos", get(list_videos).post(create_video))
        // Tags
        .route("/api/v1/tags", get(list_tags))
        // Rate limiting status endpoint
        .route("/api/v1/rate-limit/status", get(rate_limit_status))
        // Middleware
        .layer(axum::middleware::from_fn_with_state(
            state.clone(),
            rate_limit_middleware,
        ))
        .layer(TraceLayer::new_for_http())
        .layer(PropagateRequestIdLayer::x_request_id())
        .layer(SetRequestIdLayer::x_request_id(MakeRequestUuidV7))
        .layer({
            let allowed_origins = parse_allowed_origins();

            CorsLayer::new()
                .allow_origin(AllowOrigin::list(allowed_origins))
                .allow_methods([Method::GET, Method::POST, Method::OPTIONS])
                .allow_headers([header::CONTENT_TYPE, header::ACCEPT])
                .max_age(std::time::Duration::from_secs(3600))
        })
        // JSON bodies only; 1 MB is plenty for metadata records
        .layer(RequestBodyLimitLayer::new(1024 * 1024))
        .with_state(state)
}

/// Parse the CORS origin whitelist from `ALLOWED_ORIGINS`.
///
/// Comma-separated list; defaults to the local dev frontend when
/// unset or empty.
fn parse_allowed_origins() -> Vec<HeaderValue> {
    let origins_str = std::env::var("ALLOWED_ORIGINS")
        .unwrap_or_else(|_| "http://localhost:3000".to_string());

    if origins_str.trim().is_empty() {
        return vec![HeaderValue::from_static("http://localhost:3000")];
    }

    origins_str
        .split(',')
        .filter_map(|s| {
            let trimmed = s.trim();
            if trimmed.is_empty() {
                return None;
            }
            match trimmed.parse::<HeaderValue>() {
                Ok(v) => Some(v),
                Err(e) => {
                    tracing::warn!("Invalid CORS origin '{}': {}", trimmed, e);
                    None
                }
            }
        })
        .collect()
}

// =============================================================================
// RATE LIMITING MIDDLEWARE
// =============================================================================

async fn rate_limit_middleware(
    State(state): State<AppState>,
    request: axum::extract::Request,
    next: axum::middleware::Next,
) -> Result<impl IntoResponse, (StatusCode, Json<serde_json::Value>)> {
    // If rate limiting is disabled, pass through
    if let Some(limiter) = &state.rate_limiter {
        if limiter.check().is_err() {
            tracing::warn!("Rate limit exceeded");
            return Err((
                StatusCode::TOO_MANY_REQUESTS,
                Json(serde_json::json!({
                    "error": "rate_limit_exceeded",
                    "error_description": "Too many requests. Please wait before retrying."
                })),
            ));
        }
    }
    Ok(next.run(request).await)
}

/// Get rate limiting status.
async fn rate_limit_status(State(state): State<AppState>) -> impl IntoResponse {
    if state.rate_limiter.is_some() {
        Json(serde_json::json!({
            "enabled": true,
            "message": "Rate limiting is active"
        }))
    } else {
        Json(serde_json::json!({
            "enabled": false,
            "message": "Rate limiting is disabled"
        }))
    }
}

// =============================================================================
// HEALTH CHECK
// =============================================================================

async fn health_check() -> impl IntoResponse {
    Json(serde_json::json!({
        "status": "healthy",
        "version": env!("CARGO_PKG_VERSION"),
    }))
}

// =============================================================================
// VIDEO HANDLERS
// =============================================================================

async fn list_videos(
    State(state): State<AppState>,
    Query(query): Query<ListVideosQuery>,
) -> Result<impl IntoResponse, ApiError> {
    let criteria = query.into_criteria();
    let key = criteria.cache_key();

    let db = state.db.clone();
    let videos = state
        .list_cache
        .get_or_fetch(&key, || async move { db.videos.list(criteria).await })
        .await?;

    Ok(Json(ListVideosResponse {
        total: videos.len() as i64,
        videos: (*videos).clone(),
    }))
}

async fn create_video(
    State(state): State<AppState>,
    Json(body): Json<RawVideoInput>,
) -> Result<impl IntoResponse, ApiError> {
    // Field-scoped validation; a failure here reports every offending
    // field and nothing is written.
    let req = body.validate()?;

    let video = match state.db.videos.create(req).await {
        Ok(video) => video,
        Err(err) => {
            // Constraint conflicts and field errors keep their shape;
            // anything else is a store-side failure, reported with the
            // generic creation message since input already passed
            // local validation.
            let api = ApiError::from(err);
            return Err(match api {
                api @ (ApiError::Conflict(_) | ApiError::Validation(_)) => api,
                other => {
                    error!(error = %other.message(), "Video creation failed");
                    ApiError::CreationFailed
                }
            });
        }
    };

    // A new record may affect any filter combination.
    state.list_cache.invalidate_all().await;

    Ok((StatusCode::CREATED, Json(video)))
}

// =============================================================================
// TAG HANDLERS
// =============================================================================

#[derive(Debug, Serialize, Deserialize)]
struct ListTagsResponse {
    tags: Vec<Tag>,
}

async fn list_tags(State(state): State<AppState>) -> Result<impl IntoResponse, ApiError> {
    let tags = state.db.tags.list().await?;
    Ok(Json(ListTagsResponse { tags }))
}

// =============================================================================
// ERROR MAPPING
// =============================================================================

enum ApiError {
    Database(clipshelf_core::Error),
    Validation(ValidationErrors),
    NotFound(String),
    BadRequest(String),
    Conflict(String),
    CreationFailed,
}

impl ApiError {
    fn message(&self) -> String {
        match self {
            ApiError::Database(err) => err.to_string(),
            ApiError::Validation(errors) => errors.to_string(),
            ApiError::NotFound(msg) | ApiError::BadRequest(msg) | ApiError::Conflict(msg) => {
                msg.clone()
            }
            ApiError::CreationFailed => CREATION_FAILED_MESSAGE.to_string(),
        }
    }
}

/// Store-side creation failures get a generic message: by this point
/// the input already passed validation, so the problem is not the
/// caller's field values.
const CREATION_FAILED_MESSAGE: &str =
    "Could not create the video. Check that required fields are filled in correctly.";

impl From<clipshelf_core::Error> for ApiError {
    fn from(err: clipshelf_core::Error) -> Self {
        match err {
            clipshelf_core::Error::Validation(errors) => ApiError::Validation(errors),
            clipshelf_core::Error::NotFound(msg) => ApiError::NotFound(msg),
            clipshelf_core::Error::VideoNotFound(id) => {
                ApiError::NotFound(format!("Video {} not found", id))
            }
            clipshelf_core::Error::Database(sqlx_err) => {
                let msg = sqlx_err.to_string();
                if msg.contains("duplicate key") || msg.contains("unique constraint") {
                    return ApiError::Conflict(msg);
                }
                if msg.contains("foreign key") || msg.contains("violates check constraint") {
                    return ApiError::BadRequest(msg);
                }
                ApiError::Database(clipshelf_core::Error::Database(sqlx_err))
            }
            other => ApiError::Database(other),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> axum::response::Response {
        let (status, body) = match self {
            ApiError::Database(err) => (
                StatusCode::INTERNAL_SERVER_ERROR,
                serde_json::json!({ "error": err.to_string() }),
            ),
            ApiError::Validation(errors) => (
                StatusCode::BAD_REQUEST,
                serde_json::json!({
                    "error": "Invalid input",
                    "fields": errors.fields,
                }),
            ),
            ApiError::NotFound(msg) => (StatusCode::NOT_FOUND, serde_json::json!({ "error": msg })),
            ApiError::BadRequest(msg) => {
                (StatusCode::BAD_REQUEST, serde_json::json!({ "error": msg }))
            }
            ApiError::Conflict(msg) => (StatusCode::CONFLICT, serde_json::json!({ "error": msg })),
            ApiError::CreationFailed => (
                StatusCode::INTERNAL_SERVER_ERROR,
                serde_json::json!({ "error": CREATION_FAILED_MESSAGE }),
            ),
        };

        (status, Json(body)).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::Body;
    use axum::http::Request;
    use tower::ServiceExt;

    /// State with a lazy pool: handlers that never touch the store
    /// can be exercised without a database.
    fn test_state() -> AppState {
        let pool = sqlx::postgres::PgPoolOptions::new()
            .connect_lazy("postgres://localhost/clipshelf_test")
            .expect("lazy pool");
        AppState {
            db: Database::new(pool),
            list_cache: ListCache::new(),
            rate_limiter: None,
        }
    }

    async fn body_json(response: axum::response::Response) -> serde_json::Value {
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        serde_json::from_slice(&bytes).unwrap()
    }

    #[tokio::test]
    async fn test_health_endpoint() {
        let app = build_router(test_state());

        let response = app
            .oneshot(Request::get("/health").body(Body::empty()).unwrap())
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        let json = body_json(response).await;
        assert_eq!(json["status"], "healthy");
    }

    #[tokio::test]
    async fn test_create_rejects_invalid_input_listing_every_field() {
        let app = build_router(test_state());

        let body = serde_json::json!({
            "title": "",
            "thumbnail_url": "",
            "duration": 0,
            "views": -1,
            "tags": []
        });

        let response = app
            .oneshot(
                Request::post("/api/v1/videos")
                    .header(header::CONTENT_TYPE, "application/json")
                    .body(Body::from(body.to_string()))
                    .unwrap(),
            )
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::BAD_REQUEST);

        let json = body_json(response).await;
        let fields: Vec<&str> = json["fields"]
            .as_array()
            .unwrap()
            .iter()
            .map(|f| f["field"].as_str().unwrap())
            .collect();

        assert!(fields.contains(&"title"));
        assert!(fields.contains(&"thumbnail_url"));
        assert!(fields.contains(&"duration"));
        assert!(fields.contains(&"views"));
    }

    #[tokio::test]
    async fn test_unknown_route_is_not_found() {
        let app = build_router(test_state());

        let response = app
            .oneshot(Request::get("/api/v1/nope").body(Body::empty()).unwrap())
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::NOT_FOUND);
    }

    #[test]
    fn test_duplicate_key_maps_to_conflict() {
        let err = clipshelf_core::Error::Database(sqlx::Error::Protocol(
            "duplicate key value violates unique constraint \"tag_pkey\"".to_string(),
        ));
        match ApiError::from(err) {
            ApiError::Conflict(_) => {}
            _ => panic!("Expected conflict mapping"),
        }
    }

    #[test]
    fn test_validation_error_maps_to_validation() {
        let mut errors = ValidationErrors::new();
        errors.push("title", "required");
        match ApiError::from(clipshelf_core::Error::Validation(errors)) {
            ApiError::Validation(v) => assert!(v.has("title")),
            _ => panic!("Expected validation mapping"),
        }
    }
}

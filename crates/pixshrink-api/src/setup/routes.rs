//! Route configuration and setup

use std::sync::Arc;
use std::time::Duration;

use axum::{
    extract::DefaultBodyLimit,
    http::{header, HeaderValue, Method, StatusCode},
    response::IntoResponse,
    routing::{delete, get, post},
    Json, Router,
};
use pixshrink_core::Config;
use pixshrink_infra::{
    request_id_middleware, security_headers_middleware, ErrorResponse, RateLimiter,
    SecurityHeaders,
};
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

use crate::auth::{auth_middleware, AuthState};
use crate::handlers;
use crate::middleware::{rate_limit_middleware, RateLimitState};
use crate::state::AppState;

const RATE_LIMIT_CLEANUP_INTERVAL: Duration = Duration::from_secs(300);

/// Setup all application routes
pub fn setup_routes(config: &Config, state: Arc<AppState>) -> Result<Router<()>, anyhow::Error> {
    let cors = setup_cors(config)?;
    let auth_state = Arc::new(AuthState::new(config.jwt_secret()));
    let rate_limit_state = setup_rate_limiter(config);
    let security_headers = SecurityHeaders {
        hsts: config.is_production(),
    };

    let app = public_routes()
        .merge(protected_routes(auth_state))
        .fallback(route_not_found)
        // Caps the whole body. Extractors report overflows, so they render
        // as JSON errors like every other failure.
        .layer(DefaultBodyLimit::max(config.max_request_body_bytes()))
        .layer(axum::middleware::from_fn_with_state(
            rate_limit_state,
            rate_limit_middleware,
        ))
        .layer(axum::middleware::from_fn_with_state(
            security_headers,
            security_headers_middleware,
        ))
        .layer(TraceLayer::new_for_http())
        .layer(axum::middleware::from_fn(request_id_middleware))
        .layer(cors)
        .with_state(state);

    Ok(app)
}

/// Setup CORS configuration
fn setup_cors(config: &Config) -> Result<CorsLayer, anyhow::Error> {
    let methods = [Method::GET, Method::POST, Method::DELETE, Method::OPTIONS];

    if config.cors_origins().iter().any(|o| o == "*") {
        tracing::warn!("CORS configured to allow all origins - not recommended for production");
        return Ok(CorsLayer::new()
            .allow_origin(Any)
            .allow_methods(methods)
            .allow_headers(Any)
            .expose_headers([header::CONTENT_DISPOSITION]));
    }

    let origins = config
        .cors_origins()
        .iter()
        .map(|o| o.parse::<HeaderValue>())
        .collect::<Result<Vec<_>, _>>()
        .map_err(|e| anyhow::anyhow!("Invalid CORS origin: {}", e))?;

    // Credentials rule out wildcards, so headers are listed explicitly.
    Ok(CorsLayer::new()
        .allow_origin(origins)
        .allow_methods(methods)
        .allow_headers([header::AUTHORIZATION, header::CONTENT_TYPE, header::ACCEPT])
        .expose_headers([header::CONTENT_DISPOSITION])
        .allow_credentials(true))
}

/// Setup rate limiter with periodic cleanup task
fn setup_rate_limiter(config: &Config) -> RateLimitState {
    let trusted_proxy_count = std::env::var("TRUSTED_PROXY_COUNT")
        .ok()
        .and_then(|s| s.parse::<usize>().ok())
        .unwrap_or(0);

    let limiter = Arc::new(RateLimiter::new(
        config.rate_limit_max_requests(),
        Duration::from_secs(config.rate_limit_window_secs()),
    ));

    let limiter_for_cleanup = limiter.clone();
    tokio::spawn(async move {
        let mut interval = tokio::time::interval(RATE_LIMIT_CLEANUP_INTERVAL);
        loop {
            interval.tick().await;
            limiter_for_cleanup.cleanup_expired().await;
        }
    });

    tracing::info!(
        max_requests = config.rate_limit_max_requests(),
        window_secs = config.rate_limit_window_secs(),
        trusted_proxy_count,
        "HTTP rate limiting enabled"
    );

    RateLimitState {
        limiter,
        trusted_proxy_count,
    }
}

/// Public routes (no authentication required)
fn public_routes() -> Router<Arc<AppState>> {
    Router::new()
        .route("/api/health", get(handlers::health::health_check))
        .route(
            "/api/images/capabilities",
            get(handlers::capabilities::get_capabilities),
        )
        .route(
            "/api/openapi.json",
            get(|| async { Json(crate::api_doc::get_openapi_spec()) }),
        )
}

/// Protected routes (require a valid bearer token)
fn protected_routes(auth_state: Arc<AuthState>) -> Router<Arc<AppState>> {
    Router::new()
        .route(
            "/api/images/process",
            post(handlers::process::process_images),
        )
        .route(
            "/api/images/download/{filename}",
            get(handlers::download::download_image),
        )
        .route(
            "/api/images/download-zip",
            post(handlers::download_zip::download_zip),
        )
        .route("/api/images/delete", delete(handlers::delete::delete_files))
        // route_layer: unknown paths stay 404 instead of 401
        .route_layer(axum::middleware::from_fn_with_state(
            auth_state,
            auth_middleware,
        ))
}

async fn route_not_found() -> impl IntoResponse {
    (
        StatusCode::NOT_FOUND,
        Json(ErrorResponse::new("Route not found")),
    )
}

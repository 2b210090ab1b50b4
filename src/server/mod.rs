//! HTTP collaborator: an axum router in front of [`ConversionService`].
//!
//! | Method | Path                  | Purpose                                  |
//! |--------|-----------------------|------------------------------------------|
//! | POST   | `/api/convert`        | multipart `image` + `format` → `{ url }` |
//! | POST   | `/convert`            | same handler, legacy path                |
//! | GET    | `<public_prefix>/*`   | published artifacts, from `output_dir`   |
//! | GET    | `/api/health`         | liveness check, returns `ok`             |
//!
//! Path segments starting with `.` under the artifact prefix answer 404, so
//! the publisher's staging directory is never reachable.

pub mod error;
pub mod handlers;
pub mod state;

pub use error::{ErrorResponse, HttpError};
pub use state::AppState;

use crate::config::ServerConfig;
use crate::convert::ConversionService;
use axum::extract::{DefaultBodyLimit, Request};
use axum::http::StatusCode;
use axum::middleware::{self, Next};
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::Router;
use std::future::Future;
use tower_http::services::ServeDir;
use tower_http::trace::TraceLayer;
use tracing::{error, info};

/// Build the application router.
pub fn build_router(state: AppState) -> Router {
    let config = state.service.config();
    let body_limit = usize::try_from(config.max_request_bytes).unwrap_or(usize::MAX);
    let prefix = config.public_prefix.trim_end_matches('/').to_string();
    let artifacts = Router::new()
        .fallback_service(ServeDir::new(&config.output_dir))
        .layer(middleware::from_fn(hide_dot_files));

    let router = Router::new()
        .route("/api/convert", post(handlers::convert_image))
        .route("/convert", post(handlers::convert_image))
        .route("/api/health", get(handlers::health));

    let router = if prefix.is_empty() {
        router.fallback_service(artifacts)
    } else {
        router.nest_service(&prefix, artifacts)
    };

    router
        .layer(DefaultBodyLimit::max(body_limit))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// Bind `server` and serve until Ctrl-C.
pub async fn serve(server: &ServerConfig, service: ConversionService) -> std::io::Result<()> {
    let listener = tokio::net::TcpListener::bind(server.bind_addr()).await?;
    info!("Server running at http://{}", listener.local_addr()?);

    axum::serve(listener, build_router(AppState::new(service)))
        .with_graceful_shutdown(shutdown_signal())
        .await
}

/// 404 for any hidden segment, literal or percent-encoded.
async fn hide_dot_files(request: Request, next: Next) -> Response {
    let hidden = request.uri().path().split('/').any(|segment| {
        segment.starts_with('.')
            || segment
                .get(..3)
                .is_some_and(|head| head.eq_ignore_ascii_case("%2e"))
    });
    if hidden {
        return StatusCode::NOT_FOUND.into_response();
    }
    next.run(request).await
}

async fn shutdown_signal() {
    shutdown_on(tokio::signal::ctrl_c()).await
}

/// Resolves once `signal` fires. If the listener itself fails the server
/// keeps running instead of shutting down at once.
async fn shutdown_on(signal: impl Future<Output = std::io::Result<()>>) {
    match signal.await {
        Ok(()) => info!("Shutdown signal received"),
        Err(e) => {
            error!("Failed to listen for Ctrl-C, graceful shutdown disabled: {}", e);
            std::future::pending::<()>().await;
        }
    }
}

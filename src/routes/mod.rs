//! Router assembly.
//!
//! SYSTEM CONTEXT
//! ==============
//! This module binds the JSON API under `/api` plus a health probe. When a
//! static directory is configured the single-page frontend is served from it
//! as the fallback, with `index.html` for unknown paths so client-side
//! routing works.

pub mod auth;
pub mod dashboard;
pub mod survey;

use std::path::Path;

use axum::Router;
use axum::http::StatusCode;
use axum::routing::{get, post, put};
use tower_http::compression::CompressionLayer;
use tower_http::cors::{Any, CorsLayer};
use tower_http::services::{ServeDir, ServeFile};
use tower_http::trace::TraceLayer;

use crate::state::AppState;

fn api_routes(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        .route("/api/auth/me", get(auth::me))
        .route("/api/auth/logout", post(auth::logout))
        .route("/api/survey", get(survey::show))
        .route("/api/survey/ratings/{question}", put(survey::set_rating))
        .route("/api/survey/comment", put(survey::set_comment))
        .route("/api/survey/submit", post(survey::submit))
        .route("/api/dashboard", get(dashboard::summary))
        .route("/healthz", get(healthz))
        .layer(cors)
        .with_state(state)
}

/// Full application router: API, optional frontend assets, request tracing.
pub fn app(state: AppState, static_dir: Option<&Path>) -> Router {
    let mut router = api_routes(state);

    if let Some(dir) = static_dir {
        let index = ServeFile::new(dir.join("index.html"));
        router = router.fallback_service(ServeDir::new(dir).append_index_html_on_directories(true).fallback(index));
    }

    router.layer(CompressionLayer::new()).layer(TraceLayer::new_for_http())
}

async fn healthz() -> StatusCode {
    StatusCode::OK
}

#[cfg(test)]
#[path = "mod_test.rs"]
mod tests;

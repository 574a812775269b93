//! Route configuration and setup

use std::sync::Arc;

use axum::{
    middleware::{from_fn, from_fn_with_state},
    routing::{get, post},
    Router,
};
use blogd_core::constants::{MAX_ATTACHMENT_SIZE_BYTES, MAX_IMAGE_SIZE_BYTES};
use blogd_infra::middleware::{
    csrf_middleware, injection_scan_middleware, issue_csrf_token, request_id_middleware,
    security_headers_middleware, CsrfProtect,
};
use tower::limit::ConcurrencyLimitLayer;
use tower_http::limit::RequestBodyLimitLayer;
use tower_http::trace::TraceLayer;

use crate::auth::middleware::session_middleware;
use crate::handlers;
use crate::state::AppState;

const API_PREFIX: &str = "/api/v0";

/// Server-level concurrency cap against resource exhaustion under load.
const HTTP_CONCURRENCY_LIMIT: usize = 1_000;

/// Room for the largest attachment plus form fields and multipart framing.
const BODY_LIMIT_SLACK: usize = 1024 * 1024;

/// Setup all application routes
pub fn setup_routes(state: Arc<AppState>) -> Router {
    let csrf = CsrfProtect::new(state.config.session_secret(), state.config.is_production());

    let body_limit =
        MAX_IMAGE_SIZE_BYTES.max(MAX_ATTACHMENT_SIZE_BYTES) as usize + BODY_LIMIT_SLACK;

    let public = public_routes(csrf.clone());
    let api = api_routes();

    public
        .merge(api)
        .layer(ConcurrencyLimitLayer::new(HTTP_CONCURRENCY_LIMIT))
        .layer(RequestBodyLimitLayer::new(body_limit))
        .layer(TraceLayer::new_for_http())
        .layer(from_fn(request_id_middleware))
        .layer(from_fn(security_headers_middleware))
        .layer(from_fn(injection_scan_middleware))
        .layer(from_fn_with_state(csrf, csrf_middleware))
        .layer(from_fn_with_state(state.clone(), session_middleware))
        .with_state(state)
}

fn public_routes(csrf: CsrfProtect) -> Router<Arc<AppState>> {
    Router::new()
        .route("/health", get(handlers::health::health))
        .route("/download", get(handlers::download::download))
        .route(
            &format!("{}/csrf-token", API_PREFIX),
            get(issue_csrf_token).with_state(csrf),
        )
}

fn api_routes() -> Router<Arc<AppState>> {
    Router::new()
        .route(
            &format!("{}/auth/register", API_PREFIX),
            post(crate::auth::handlers::register),
        )
        .route(
            &format!("{}/auth/login", API_PREFIX),
            post(crate::auth::handlers::login),
        )
        .route(
            &format!("{}/auth/logout", API_PREFIX),
            post(crate::auth::handlers::logout),
        )
        .route(
            &format!("{}/flash", API_PREFIX),
            get(crate::auth::handlers::take_flash),
        )
        .route(
            &format!("{}/posts", API_PREFIX),
            get(handlers::posts::list_posts).post(handlers::posts::create_post),
        )
        .route(
            &format!("{}/posts/{{id}}", API_PREFIX),
            get(handlers::posts::get_post)
                .put(handlers::posts::update_post)
                .delete(handlers::posts::delete_post),
        )
}

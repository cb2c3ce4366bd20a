//! # bazaar_api
//!
//! HTTP API library for Bazaar.

pub mod config;
pub mod error;
pub mod handlers;
pub mod middleware;
pub mod models;
pub mod routes;

use std::sync::Arc;

use axum::Router;
use axum::http::HeaderValue;
use axum::routing::{get, patch, post};
use bazaar_core::auth::TokenAuthority;
use tower_http::cors::{AllowOrigin, Any, CorsLayer};
use tracing::warn;

use crate::config::ApiConfig;
use crate::handlers::{auth, health, users};

/// Shared application state passed to all handlers.
#[derive(Clone)]
pub struct AppState {
    /// Session/token authority.
    pub authority: Arc<TokenAuthority>,
    /// API configuration.
    pub config: ApiConfig,
}

/// Builds the Axum router with all routes and shared state.
pub fn router(state: AppState) -> Router {
    let cors = cors_layer(state.config.cors_origin.as_deref());

    // Public routes (no auth required)
    let public = Router::new()
        .route(routes::GET_HEALTHZ, get(health::healthz))
        .route(routes::POST_AUTH_REGISTER, post(auth::register_handler))
        .route(routes::POST_AUTH_LOGIN, post(auth::login_handler))
        .route(routes::POST_AUTH_REFRESH, post(auth::refresh_handler));

    // Bearer token optional; required only for all-devices logout
    let optional = Router::new()
        .route(routes::POST_AUTH_LOGOUT, post(auth::logout_handler))
        .layer(axum::middleware::from_fn_with_state(
            state.clone(),
            middleware::auth::optional_auth,
        ));

    // Protected routes (require auth)
    let protected = Router::new()
        .route(
            routes::USERS_ME,
            get(users::get_me_handler).put(users::update_me_handler),
        )
        .route(
            routes::PATCH_USERS_ME_PASSWORD,
            patch(users::change_password_handler),
        )
        .layer(axum::middleware::from_fn_with_state(
            state.clone(),
            middleware::auth::require_auth,
        ));

    Router::new()
        .merge(public)
        .merge(optional)
        .merge(protected)
        .layer(cors)
        .with_state(state)
}

fn cors_layer(origin: Option<&str>) -> CorsLayer {
    let layer = CorsLayer::new().allow_methods(Any).allow_headers(Any);
    match origin.map(HeaderValue::from_str) {
        None => layer.allow_origin(Any),
        Some(Ok(value)) => layer.allow_origin(AllowOrigin::exact(value)),
        Some(Err(e)) => {
            warn!(error = %e, "invalid CORS origin, allowing any");
            layer.allow_origin(Any)
        }
    }
}

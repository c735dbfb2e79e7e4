use axum::{
    extract::DefaultBodyLimit,
    http::{header, HeaderValue, Method},
    middleware,
    routing::{get, post},
    Router,
};
use std::sync::Arc;
use tower::ServiceBuilder;
use tower_http::{
    cors::{AllowOrigin, Any, CorsLayer},
    trace::TraceLayer,
};
use tracing::warn;

use super::handlers::{
    create_account, get_profile, get_user, health_check, list_profiles, login, search_handle,
    update_profile, upload_image,
};
use super::rate_limit::rate_limit_middleware;
use super::views::{my_views, register_view};
use super::AppState;
use crate::config::CorsConfig;

/// Multipart framing on top of the raw image bytes
const MULTIPART_OVERHEAD: usize = 64 * 1024;

pub fn create_api_router(state: Arc<AppState>) -> Router {
    let upload_limit = state.config.media.max_upload_bytes + MULTIPART_OVERHEAD;

    let account_routes = Router::new()
        .route("/auth/register", post(create_account))
        .route("/auth/login", post(login))
        .route("/user", get(get_user).patch(update_profile))
        .route(
            "/user/image",
            post(upload_image).layer(DefaultBodyLimit::max(upload_limit)),
        )
        .route("/user/views", get(my_views))
        .route("/profiles", get(list_profiles))
        .route("/search", post(search_handle));

    let profile_routes = Router::new()
        .route("/{handle}", get(get_profile))
        .route("/{handle}/view", post(register_view));

    Router::new()
        .merge(account_routes)
        .merge(profile_routes)
        .layer(middleware::from_fn_with_state(
            Arc::clone(&state),
            rate_limit_middleware,
        ))
        .route("/health", get(health_check))
        .layer(
            ServiceBuilder::new()
                .layer(TraceLayer::new_for_http())
                .layer(cors_layer(&state.config.cors)),
        )
        .with_state(state)
}

fn cors_layer(config: &CorsConfig) -> CorsLayer {
    let cors = CorsLayer::new()
        .allow_methods([Method::GET, Method::POST, Method::PATCH, Method::OPTIONS])
        .allow_headers([header::AUTHORIZATION, header::CONTENT_TYPE]);

    if config.allowed_origins.is_empty() {
        return cors.allow_origin(Any);
    }

    let origins: Vec<HeaderValue> = config
        .allowed_origins
        .iter()
        .filter_map(|origin| match origin.parse::<HeaderValue>() {
            Ok(value) => Some(value),
            Err(_) => {
                warn!("Ignoring invalid CORS origin '{origin}'");
                None
            }
        })
        .collect();
    cors.allow_origin(AllowOrigin::list(origins))
}

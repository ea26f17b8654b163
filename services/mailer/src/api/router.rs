use std::sync::Arc;
use std::time::Duration;

use axum::{
    routing::{get, post},
    Router,
};
use tower::ServiceBuilder;
use tower_http::services::{ServeDir, ServeFile};
use tower_http::timeout::TimeoutLayer;
use tower_http::trace::TraceLayer;
use tracing::{info, warn};

use super::handlers;
use super::ApiState;

pub const LOGIN_PAGE: &str = "login.html";

pub fn create_router(state: Arc<ApiState>) -> Router {
    let middleware = ServiceBuilder::new()
        .layer(TraceLayer::new_for_http())
        .layer(TimeoutLayer::new(Duration::from_secs(
            state.config.request_timeout_secs,
        )));

    let static_dir = state.config.static_dir.clone();

    let router = Router::new()
        .route("/send", post(handlers::send_mail))
        .route("/api/quota/:identity", get(handlers::get_quota))
        .route("/health", get(handlers::health_check));

    let router = if static_dir.is_dir() {
        info!(static_dir = %static_dir.display(), "serving static files");
        router
            .route_service("/", ServeFile::new(static_dir.join(LOGIN_PAGE)))
            .fallback_service(ServeDir::new(&static_dir))
    } else {
        warn!(
            static_dir = %static_dir.display(),
            "static directory not found, login page disabled"
        );
        router
    };

    router.with_state(state).layer(middleware)
}

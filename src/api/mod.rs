pub mod auth;
mod error;
mod reservations;
mod rooms;
mod validation;

pub use error::ApiError;

use axum::{
    http::{HeaderValue, Method},
    middleware,
    routing::{delete, get, post, put},
    Router,
};
use std::sync::Arc;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

use crate::AppState;

pub fn create_router(state: Arc<AppState>) -> Router {
    // Auth routes (public)
    let auth_routes = Router::new()
        .route("/login", post(auth::login))
        .route("/validate", get(auth::validate))
        .route("/setup-status", get(auth::setup_status))
        .route("/setup", post(auth::setup));

    // Public API: room browsing and guest booking
    let public_routes = Router::new()
        .route("/rooms", get(rooms::list_rooms))
        .route("/rooms/:id", get(rooms::get_room))
        .route("/reservations", post(reservations::create_reservation))
        .route("/reservations/occupied-dates", get(reservations::occupied_dates));

    // Admin API, behind the auth middleware
    let admin_routes = Router::new()
        .route("/rooms", post(rooms::create_room))
        .route("/rooms/:id", put(rooms::update_room))
        .route("/rooms/:id", delete(rooms::delete_room))
        .route("/rooms/:id/images", post(rooms::upload_room_images))
        .route("/rooms/:id/images/:image_id", delete(rooms::delete_room_image))
        .route("/reservations", get(reservations::list_reservations))
        .route("/reservations/:id", delete(reservations::delete_reservation))
        .layer(middleware::from_fn_with_state(
            state.clone(),
            auth::auth_middleware,
        ));

    Router::new()
        .route("/health", get(health_check))
        .nest("/api/auth", auth_routes)
        .nest("/api", public_routes)
        .nest("/api/admin", admin_routes)
        .layer(cors_layer(&state))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

fn cors_layer(state: &Arc<AppState>) -> CorsLayer {
    let origins: Vec<HeaderValue> = state
        .config
        .server
        .allowed_origins
        .iter()
        .filter_map(|o| o.parse().ok())
        .collect();

    let layer = CorsLayer::new()
        .allow_methods([Method::GET, Method::POST, Method::PUT, Method::DELETE])
        .allow_headers(Any);

    if origins.is_empty() {
        layer.allow_origin(Any)
    } else {
        layer.allow_origin(origins)
    }
}

async fn health_check() -> &'static str {
    "OK"
}

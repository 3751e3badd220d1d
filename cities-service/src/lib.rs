pub mod api_client;
pub mod auth;
pub mod cache;
pub mod config;
pub mod handlers;
pub mod middleware;
pub mod openapi;
pub mod search;
pub mod store;

use axum::{Router, middleware as axum_middleware, routing::get};
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

pub fn create_router(state: handlers::AppState) -> Router {
    // Public routes (no auth required)
    let public_routes = Router::new().route("/health", get(handlers::health));

    // City routes (require a valid caller token)
    let city_routes = Router::new()
        .route("/api/cities/search", get(handlers::search_cities))
        .route("/api/cities/{id}/weather", get(handlers::city_weather))
        .layer(axum_middleware::from_fn_with_state(
            state.clone(),
            middleware::auth_middleware,
        ));

    public_routes
        .merge(city_routes)
        .merge(openapi::swagger_ui())
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(state)
}

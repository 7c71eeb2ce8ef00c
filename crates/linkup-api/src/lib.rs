use axum::{
    http::Method,
    routing::{get, post},
    Json, Router,
};
use linkup_core::AppState;
use serde_json::json;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

pub mod error;
pub mod middleware;
pub mod routes;

pub fn build_router() -> Router<AppState> {
    let cors = CorsLayer::new()
        .allow_methods([Method::GET, Method::POST])
        .allow_headers(Any)
        .allow_origin(Any);

    Router::new()
        // Health
        .route("/health", get(health))
        .route("/api/v1/health", get(health))
        // Messaging
        .route(
            "/api/v1/messages/send/{user_id}",
            post(routes::messages::send_message),
        )
        .route(
            "/api/v1/messages/send-media/{user_id}",
            post(routes::messages::send_media_message),
        )
        .route(
            "/api/v1/messages/conversation/{user_id}",
            get(routes::messages::get_conversation),
        )
        // Conversation list
        .route("/api/v1/threads", get(routes::threads::list_threads))
        .layer(TraceLayer::new_for_http())
        .layer(cors)
}

async fn health() -> Json<serde_json::Value> {
    Json(json!({ "status": "ok" }))
}

use axum::{routing::get, routing::post, Json, Router};
use serde_json::json;
use std::sync::Arc;
use tokio::sync::Mutex;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

use crate::feed::Synchronizer;

use super::api::feed as feed_handlers;
use super::api::probe as probe_handlers;
use super::api_doc::ApiDoc;
use super::config::Config;

#[derive(Clone)]
pub struct AppState {
    pub sync: Arc<Mutex<Synchronizer>>,
}

pub async fn run_server(config: &Config, sync: Arc<Mutex<Synchronizer>>) -> std::io::Result<()> {
    let bind_addr = config.web.bind.clone();
    let state = AppState { sync };

    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    let app = Router::new()
        .route("/", get(home))
        // Read-only feed endpoints
        .route("/api/snapshot", get(feed_handlers::snapshot))
        .route("/api/validation", get(feed_handlers::validation))
        .route("/api/stats", get(feed_handlers::stats))
        .route("/api/feed/status", get(feed_handlers::status))
        // Ad-hoc classification
        .route("/api/probe", post(probe_handlers::probe))
        // OpenAPI / Swagger
        .merge(SwaggerUi::new("/swagger-ui").url("/api-doc/openapi.json", ApiDoc::openapi()))
        // Middleware
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .with_state(state);

    log::info!("Starting server on {}", bind_addr);

    let listener = tokio::net::TcpListener::bind(&bind_addr).await?;
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
}

async fn shutdown_signal() {
    let _ = tokio::signal::ctrl_c().await;
    log::info!("shutdown signal received");
}

async fn home() -> Json<serde_json::Value> {
    Json(json!({
        "service": "drone-sentry",
        "message": "airspace watch API",
        "docs": "/swagger-ui",
    }))
}

use axum::{routing::get, Json, Router};
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;
use utoipa::OpenApi;

use crate::aggregator::Aggregator;

use super::api::mission as mission_handlers;
use super::api::telemetry as telemetry_handlers;
use super::api_doc::ApiDoc;

#[derive(Clone)]
pub struct AppState {
    pub aggregator: Aggregator,
}

pub fn router(aggregator: Aggregator) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        .route("/telemetry", get(telemetry_handlers::list_telemetry))
        .route("/mission-time", get(mission_handlers::mission_time))
        .route("/health", get(mission_handlers::health))
        .route("/api-doc/openapi.json", get(|| async { Json(ApiDoc::openapi()) }))
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .with_state(AppState { aggregator })
}

pub async fn run_server(aggregator: Aggregator, bind_addr: &str) -> std::io::Result<()> {
    let app = router(aggregator);

    log::info!("Starting server on {}", bind_addr);

    let listener = tokio::net::TcpListener::bind(bind_addr).await?;
    axum::serve(listener, app).await
}

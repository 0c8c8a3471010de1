use axum::{extract::State, Json};

use crate::aggregator::MissionTimeView;
use crate::web::server::AppState;

/// The response is the latest `MissionClockSnapshot` with its fields at the
/// top level and all mission metadata under `metadata`. Before the first
/// broadcast only `metadata` is present.
#[utoipa::path(
    get,
    path = "/mission-time",
    responses(
        (status = 200, description = "Latest mission clock snapshot fields with mission metadata under `metadata`")
    ),
    tag = "mission"
)]
pub async fn mission_time(State(state): State<AppState>) -> Json<MissionTimeView> {
    Json(state.aggregator.mission_time())
}

#[utoipa::path(
    get,
    path = "/health",
    responses(
        (status = 200, description = "Service is up", body = String)
    ),
    tag = "mission"
)]
pub async fn health() -> &'static str {
    "ok"
}

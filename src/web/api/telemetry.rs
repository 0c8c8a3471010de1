use axum::{extract::State, Json};

use crate::agent::TelemetryRecord;
use crate::web::server::AppState;

#[utoipa::path(
    get,
    path = "/telemetry",
    responses(
        (status = 200, description = "Latest record of every satellite heard from recently, ordered by sat_id", body = Vec<TelemetryRecord>)
    ),
    tag = "telemetry"
)]
pub async fn list_telemetry(State(state): State<AppState>) -> Json<Vec<TelemetryRecord>> {
    Json(state.aggregator.snapshot())
}

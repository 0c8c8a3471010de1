use utoipa::OpenApi;

use crate::agent::{
    AttitudeMode, ElementsReport, Health, SatelliteMode, SatelliteStatus, TelemetryRecord,
};
use crate::clock::MissionClockSnapshot;

#[derive(OpenApi)]
#[openapi(
    paths(
        super::api::telemetry::list_telemetry,
        super::api::mission::mission_time,
        super::api::mission::health,
    ),
    components(
        schemas(
            TelemetryRecord,
            SatelliteStatus,
            ElementsReport,
            SatelliteMode,
            AttitudeMode,
            Health,
            MissionClockSnapshot,
        )
    ),
    info(
        title = "Mission Sim Telemetry API",
        description = "Read-only view of the latest satellite telemetry and mission clock",
        version = "0.1.0"
    ),
    tags(
        (name = "telemetry", description = "Latest satellite state"),
        (name = "mission", description = "Mission clock and metadata")
    )
)]
pub struct ApiDoc;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn document_lists_every_route() {
        let doc = ApiDoc::openapi();
        for path in ["/telemetry", "/mission-time", "/health"] {
            assert!(doc.paths.paths.contains_key(path), "missing {}", path);
        }
    }
}

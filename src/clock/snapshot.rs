use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

/// One broadcast of the mission clock. Receivers keep only the latest one.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct MissionClockSnapshot {
    pub mission_name: String,
    pub epoch: DateTime<Utc>,
    pub mission_time: DateTime<Utc>,
    pub elapsed_seconds: f64,
    pub time_scale: f64,
    pub mission_complete: bool,
    pub wall_time: DateTime<Utc>,
}

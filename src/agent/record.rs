use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use super::status::SatelliteStatus;
use crate::propagator::OrbitalElements;

/// The satellite's attitude is not simulated; every record reports identity.
pub const IDENTITY_QUATERNION: [f64; 4] = [1.0, 0.0, 0.0, 0.0];

/// Orbital elements echoed in telemetry, with the true anomaly advanced to
/// the record's mission time.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct ElementsReport {
    pub alt_km: f64,
    pub inc_deg: f64,
    pub true_anom_deg: f64,
    pub raan_deg: f64,
    pub argp_deg: f64,
}

impl ElementsReport {
    pub fn new(elements: &OrbitalElements, true_anom_deg: f64) -> Self {
        Self {
            alt_km: elements.alt_km,
            inc_deg: elements.inc_deg,
            true_anom_deg,
            raan_deg: elements.raan_deg,
            argp_deg: elements.argp_deg,
        }
    }
}

/// One telemetry sample as published on `satellite/<sat_id>/telemetry`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct TelemetryRecord {
    pub sat_id: String,
    pub name: String,
    pub mission_time: DateTime<Utc>,
    pub mission_elapsed_seconds: f64,
    pub wall_timestamp: DateTime<Utc>,
    #[schema(value_type = Vec<f64>)]
    pub position_km: [f64; 3],
    #[schema(value_type = Vec<f64>)]
    pub velocity_km_s: [f64; 3],
    pub battery_pct: f64,
    #[schema(value_type = Vec<f64>)]
    pub attitude_q: [f64; 4],
    pub satellite_status: SatelliteStatus,
    pub orbital_elements: ElementsReport,
}

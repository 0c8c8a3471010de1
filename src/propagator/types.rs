use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

/// Circular-orbit elements, fixed for the lifetime of a satellite.
#[derive(Debug, Clone, Copy, PartialEq, Deserialize, Serialize, ToSchema)]
pub struct OrbitalElements {
    #[serde(default = "default_alt_km")]
    pub alt_km: f64,
    #[serde(default)]
    pub inc_deg: f64,
    #[serde(default)]
    pub raan_deg: f64,
    #[serde(default)]
    pub argp_deg: f64,
    #[serde(default, rename = "true_anom_deg")]
    pub true_anom_deg_at_epoch: f64,
}

fn default_alt_km() -> f64 {
    500.0
}

impl Default for OrbitalElements {
    fn default() -> Self {
        Self {
            alt_km: default_alt_km(),
            inc_deg: 0.0,
            raan_deg: 0.0,
            argp_deg: 0.0,
            true_anom_deg_at_epoch: 0.0,
        }
    }
}

/// Inertial state of a satellite at one mission-elapsed instant.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct SatelliteKinematics {
    #[schema(value_type = Vec<f64>)]
    pub position_km: [f64; 3],
    #[schema(value_type = Vec<f64>)]
    pub velocity_km_s: [f64; 3],
    pub true_anom_deg: f64,
}

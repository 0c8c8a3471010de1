use serde::{Deserialize, Serialize};
use strum_macros::Display;
use utoipa::ToSchema;

use super::fault::FaultTable;

pub const INITIAL_BATTERY_PCT: f64 = 95.0;
/// Percentage points lost per mission second.
pub const BATTERY_DECAY: f64 = 0.0001;

const LOW_BATTERY_PCT: f64 = 20.0;
const DETUMBLE_UNTIL_S: f64 = 300.0;
const SOLAR_POINTING_UNTIL_S: f64 = 600.0;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Display, ToSchema)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum SatelliteMode {
    Nominal,
    Fail,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Display, ToSchema)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum AttitudeMode {
    Detumbling,
    SolarPointing,
    NadirPointing,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Display, ToSchema)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum Health {
    Nominal,
    Degraded,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct SatelliteStatus {
    pub mode: SatelliteMode,
    pub attitude_mode: AttitudeMode,
    pub uptime_seconds: f64,
    pub health: Health,
}

pub fn battery_pct(elapsed_seconds: f64) -> f64 {
    (INITIAL_BATTERY_PCT - elapsed_seconds * BATTERY_DECAY).max(0.0)
}

impl SatelliteStatus {
    /// Rules are checked in order; a matching fault rule overrides them all.
    pub fn derive(
        battery_pct: f64,
        elapsed_seconds: f64,
        sat_id: &str,
        faults: &FaultTable,
    ) -> Self {
        let (mode, attitude_mode) = if faults.is_faulted(sat_id, elapsed_seconds) {
            (SatelliteMode::Fail, AttitudeMode::Detumbling)
        } else if battery_pct < LOW_BATTERY_PCT {
            (SatelliteMode::Fail, AttitudeMode::Detumbling)
        } else if elapsed_seconds < DETUMBLE_UNTIL_S {
            (SatelliteMode::Nominal, AttitudeMode::Detumbling)
        } else if elapsed_seconds < SOLAR_POINTING_UNTIL_S {
            (SatelliteMode::Nominal, AttitudeMode::SolarPointing)
        } else {
            (SatelliteMode::Nominal, AttitudeMode::NadirPointing)
        };

        let health = match mode {
            SatelliteMode::Nominal => Health::Nominal,
            SatelliteMode::Fail => Health::Degraded,
        };

        Self {
            mode,
            attitude_mode,
            uptime_seconds: elapsed_seconds,
            health,
        }
    }
}

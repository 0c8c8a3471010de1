use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize};
use std::collections::HashSet;
use std::time::Duration;

use super::error::ConfigError;
use crate::agent::{FaultRule, FaultTable};
use crate::bus::is_valid_segment;
use crate::clock::MissionClock;
use crate::propagator::{OrbitalElements, EARTH_RADIUS_KM};

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct MissionConfig {
    pub mission: MissionInfo,
    pub satellites: Vec<SatelliteConfig>,
    #[serde(default = "default_faults")]
    pub faults: Vec<FaultRule>,
    #[serde(default)]
    pub rates: RateConfig,
    #[serde(default)]
    pub aggregator: AggregatorConfig,
    #[serde(default)]
    pub sync: SyncConfig,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct MissionInfo {
    #[serde(default = "default_mission_name")]
    pub name: String,
    pub epoch: DateTime<Utc>,
    pub time_scale: f64,
    pub duration_hours: f64,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct SatelliteConfig {
    #[serde(deserialize_with = "deserialize_sat_id")]
    pub sat_id: String,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub initial: OrbitalElements,
}

/// Replacements for one satellite's elements, given per process.
#[derive(Debug, Clone, Copy, Default)]
pub struct ElementOverrides {
    pub alt_km: Option<f64>,
    pub inc_deg: Option<f64>,
}

impl SatelliteConfig {
    pub fn display_name(&self) -> String {
        self.name
            .clone()
            .unwrap_or_else(|| format!("SAT-{}", self.sat_id))
    }
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct RateConfig {
    #[serde(default = "default_clock_hz")]
    pub clock_hz: f64,
    #[serde(default = "default_telemetry_hz")]
    pub telemetry_hz: f64,
    #[serde(default = "default_metadata_period_s")]
    pub metadata_period_s: u64,
}

impl Default for RateConfig {
    fn default() -> Self {
        Self {
            clock_hz: default_clock_hz(),
            telemetry_hz: default_telemetry_hz(),
            metadata_period_s: default_metadata_period_s(),
        }
    }
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct AggregatorConfig {
    #[serde(default = "default_stale_timeout_s")]
    pub stale_timeout_s: f64,
    #[serde(default = "default_bind")]
    pub bind: String,
}

impl Default for AggregatorConfig {
    fn default() -> Self {
        Self {
            stale_timeout_s: default_stale_timeout_s(),
            bind: default_bind(),
        }
    }
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct SyncConfig {
    /// Upper bound on a single wait for the first clock snapshot.
    #[serde(default = "default_sync_timeout_s")]
    pub timeout_s: f64,
}

impl Default for SyncConfig {
    fn default() -> Self {
        Self {
            timeout_s: default_sync_timeout_s(),
        }
    }
}

fn default_mission_name() -> String {
    "Unknown Mission".to_string()
}

fn default_faults() -> Vec<FaultRule> {
    vec![FaultRule {
        sat_id: "2".to_string(),
        after_seconds: 1200.0,
    }]
}

fn default_clock_hz() -> f64 {
    10.0
}

fn default_telemetry_hz() -> f64 {
    1.0
}

fn default_metadata_period_s() -> u64 {
    10
}

fn default_stale_timeout_s() -> f64 {
    10.0
}

fn default_bind() -> String {
    "0.0.0.0:5000".to_string()
}

fn default_sync_timeout_s() -> f64 {
    30.0
}

/// Accepts identifiers written either as strings or bare integers.
pub(crate) fn deserialize_sat_id<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum RawId {
        Text(String),
        Number(u64),
    }

    Ok(match RawId::deserialize(deserializer)? {
        RawId::Text(s) => s,
        RawId::Number(n) => n.to_string(),
    })
}

impl MissionConfig {
    pub fn from_file(path: &str) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path)?;
        Self::from_yaml(&content)
    }

    pub fn from_yaml(yaml: &str) -> Result<Self, ConfigError> {
        let config: MissionConfig = serde_yaml::from_str(yaml)?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        let invalid = |msg: String| -> Result<(), ConfigError> { Err(ConfigError::Invalid(msg)) };

        if self.mission.name.trim().is_empty() {
            return invalid("mission name is empty".into());
        }
        if !positive(self.mission.time_scale) {
            return invalid(format!(
                "time_scale must be a positive number, got {}",
                self.mission.time_scale
            ));
        }
        if !self.mission.duration_hours.is_finite() || self.mission.duration_hours < 0.0 {
            return invalid(format!(
                "duration_hours must be a non-negative number, got {}",
                self.mission.duration_hours
            ));
        }
        if MissionClock::new(&self.mission).end_time().is_none() {
            return invalid(format!(
                "mission end ({} h after {}) is outside the supported date range",
                self.mission.duration_hours, self.mission.epoch
            ));
        }
        if !positive(self.rates.clock_hz) || !positive(self.rates.telemetry_hz) {
            return invalid("publish rates must be positive".into());
        }
        if self.rates.metadata_period_s == 0 {
            return invalid("metadata_period_s must be at least 1".into());
        }
        if !positive(self.aggregator.stale_timeout_s) {
            return invalid("stale_timeout_s must be positive".into());
        }
        if !positive(self.sync.timeout_s) {
            return invalid("sync timeout_s must be positive".into());
        }
        // The period accessors below convert without checking.
        for (label, seconds) in [
            ("clock period", 1.0 / self.rates.clock_hz),
            ("telemetry period", 1.0 / self.rates.telemetry_hz),
            ("stale_timeout_s", self.aggregator.stale_timeout_s),
            ("sync timeout_s", self.sync.timeout_s),
        ] {
            match Duration::try_from_secs_f64(seconds) {
                Ok(d) if !d.is_zero() => {}
                _ => return invalid(format!("{} of {} s is out of range", label, seconds)),
            }
        }

        let mut seen = HashSet::new();
        for sat in &self.satellites {
            if !is_valid_segment(&sat.sat_id) {
                return invalid(format!("sat_id {:?} is not a valid topic segment", sat.sat_id));
            }
            if !seen.insert(sat.sat_id.as_str()) {
                return invalid(format!("duplicate sat_id {}", sat.sat_id));
            }
            check_elements(&sat.sat_id, &sat.initial)?;
        }

        for rule in &self.faults {
            if !rule.after_seconds.is_finite() {
                return invalid(format!("fault threshold for sat {} is not finite", rule.sat_id));
            }
        }

        Ok(())
    }

    /// Applies the overrides and validates the result again.
    pub fn override_elements(
        &mut self,
        sat_id: &str,
        overrides: ElementOverrides,
    ) -> Result<(), ConfigError> {
        let Some(sat) = self.satellites.iter_mut().find(|s| s.sat_id == sat_id) else {
            return Err(ConfigError::Invalid(format!(
                "sat_id {} is not in the mission",
                sat_id
            )));
        };
        if let Some(alt_km) = overrides.alt_km {
            sat.initial.alt_km = alt_km;
        }
        if let Some(inc_deg) = overrides.inc_deg {
            sat.initial.inc_deg = inc_deg;
        }
        self.validate()
    }

    pub fn satellite(&self, sat_id: &str) -> Option<&SatelliteConfig> {
        self.satellites.iter().find(|s| s.sat_id == sat_id)
    }

    pub fn fault_table(&self) -> FaultTable {
        FaultTable::new(self.faults.clone())
    }

    pub fn clock_period(&self) -> Duration {
        Duration::from_secs_f64(1.0 / self.rates.clock_hz)
    }

    pub fn telemetry_period(&self) -> Duration {
        Duration::from_secs_f64(1.0 / self.rates.telemetry_hz)
    }

    pub fn stale_timeout(&self) -> Duration {
        Duration::from_secs_f64(self.aggregator.stale_timeout_s)
    }

    pub fn sync_timeout(&self) -> Duration {
        Duration::from_secs_f64(self.sync.timeout_s)
    }
}

fn positive(value: f64) -> bool {
    value.is_finite() && value > 0.0
}

fn check_elements(sat_id: &str, elements: &OrbitalElements) -> Result<(), ConfigError> {
    let values = [
        elements.alt_km,
        elements.inc_deg,
        elements.raan_deg,
        elements.argp_deg,
        elements.true_anom_deg_at_epoch,
    ];
    if values.iter().any(|v| !v.is_finite()) {
        return Err(ConfigError::Invalid(format!(
            "sat {}: orbital elements must be finite",
            sat_id
        )));
    }
    if elements.alt_km <= -EARTH_RADIUS_KM {
        return Err(ConfigError::Invalid(format!(
            "sat {}: altitude {} km is below the Earth's centre",
            sat_id, elements.alt_km
        )));
    }
    Ok(())
}

use chrono::{DateTime, Utc};
use serde::Serialize;
use std::time::Duration;
use tokio::time::{sleep_until, Instant};

use super::snapshot::MissionClockSnapshot;
use crate::bus::{Bus, Topic};
use crate::config::{MissionConfig, MissionInfo, SatelliteConfig};

/// Maps wall-clock time since start onto mission time.
#[derive(Debug, Clone)]
pub struct MissionClock {
    name: String,
    epoch: DateTime<Utc>,
    time_scale: f64,
    duration_hours: f64,
}

impl MissionClock {
    pub fn new(info: &MissionInfo) -> Self {
        Self {
            name: info.name.clone(),
            epoch: info.epoch,
            time_scale: info.time_scale,
            duration_hours: info.duration_hours,
        }
    }

    pub fn elapsed_seconds(&self, wall_elapsed: Duration) -> f64 {
        wall_elapsed.as_secs_f64() * self.time_scale
    }

    pub fn is_complete(&self, elapsed_seconds: f64) -> bool {
        elapsed_seconds > self.duration_hours * 3600.0
    }

    /// Pinned to the last representable instant once elapsed runs past it.
    pub fn mission_time(&self, elapsed_seconds: f64) -> DateTime<Utc> {
        self.checked_mission_time(elapsed_seconds).unwrap_or(DateTime::<Utc>::MAX_UTC)
    }

    /// Mission time at the end of the configured duration.
    pub fn end_time(&self) -> Option<DateTime<Utc>> {
        self.checked_mission_time(self.duration_hours * 3600.0)
    }

    fn checked_mission_time(&self, elapsed_seconds: f64) -> Option<DateTime<Utc>> {
        let offset = Duration::try_from_secs_f64(elapsed_seconds).ok()?;
        let offset = chrono::Duration::from_std(offset).ok()?;
        self.epoch.checked_add_signed(offset)
    }

    pub fn snapshot(
        &self,
        wall_elapsed: Duration,
        wall_time: DateTime<Utc>,
    ) -> MissionClockSnapshot {
        let elapsed_seconds = self.elapsed_seconds(wall_elapsed);
        MissionClockSnapshot {
            mission_name: self.name.clone(),
            epoch: self.epoch,
            mission_time: self.mission_time(elapsed_seconds),
            elapsed_seconds,
            time_scale: self.time_scale,
            mission_complete: self.is_complete(elapsed_seconds),
            wall_time,
        }
    }
}

/// Static roster broadcast on `mission/metadata`.
#[derive(Debug, Clone, Serialize)]
pub struct MissionMetadata {
    pub mission: MissionInfo,
    pub satellites: Vec<SatelliteConfig>,
}

/// Metadata goes out on every tick whose whole wall second is a multiple of
/// the period.
pub fn metadata_due(wall_elapsed: Duration, period_s: u64) -> bool {
    period_s > 0 && wall_elapsed.as_secs() % period_s == 0
}

/// The single source of mission time. Running two authorities for the same
/// mission is not detected; receivers take whichever snapshot arrived last.
pub struct ClockAuthority {
    clock: MissionClock,
    metadata: MissionMetadata,
    period: Duration,
    metadata_period_s: u64,
    bus: Bus,
}

impl ClockAuthority {
    pub fn new(config: &MissionConfig, bus: Bus) -> Self {
        Self {
            clock: MissionClock::new(&config.mission),
            metadata: MissionMetadata {
                mission: config.mission.clone(),
                satellites: config.satellites.clone(),
            },
            period: config.clock_period(),
            metadata_period_s: config.rates.metadata_period_s,
            bus,
        }
    }

    pub async fn run(self) {
        log::info!(
            "Mission clock starting for {} (epoch {}, scale {}x, duration {} h)",
            self.metadata.mission.name,
            self.metadata.mission.epoch,
            self.clock.time_scale,
            self.clock.duration_hours
        );

        let start = Instant::now();
        let mut completion_logged = false;

        loop {
            let loop_start = Instant::now();
            let wall_elapsed = loop_start.duration_since(start);
            let snapshot = self.clock.snapshot(wall_elapsed, Utc::now());

            if snapshot.mission_complete && !completion_logged {
                log::info!(
                    "Mission {} complete at T+{:.0}s",
                    snapshot.mission_name,
                    snapshot.elapsed_seconds
                );
                completion_logged = true;
            }

            if let Err(e) = self.bus.publish(&Topic::MissionTime, &snapshot).await {
                log::warn!("Failed to broadcast mission time: {}", e);
            }

            if metadata_due(wall_elapsed, self.metadata_period_s) {
                if let Err(e) = self.bus.publish(&Topic::MissionMetadata, &self.metadata).await {
                    log::warn!("Failed to broadcast mission metadata: {}", e);
                }
            }

            // Overruns fire the next tick immediately without catching up.
            sleep_until(loop_start + self.period).await;
        }
    }
}

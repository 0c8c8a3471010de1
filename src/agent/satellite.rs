use chrono::{DateTime, Utc};
use std::time::Duration;
use tokio::sync::watch;
use tokio::time::{sleep_until, timeout, Instant};

use super::error::AgentError;
use super::fault::FaultTable;
use super::record::{ElementsReport, TelemetryRecord, IDENTITY_QUATERNION};
use super::status::{battery_pct, SatelliteStatus};
use crate::bus::{Bus, Subscription, Topic, TopicFilter};
use crate::clock::MissionClockSnapshot;
use crate::config::{ConfigError, MissionConfig};
use crate::propagator::{propagate, OrbitalElements, PropagateError};

type ClockFeed = watch::Receiver<Option<MissionClockSnapshot>>;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AgentState {
    AwaitingSync,
    Streaming,
}

/// Publishes telemetry for one satellite, paced by its own wall clock and
/// stamped with the latest mission time it has heard.
pub struct SatelliteAgent {
    sat_id: String,
    name: String,
    elements: OrbitalElements,
    faults: FaultTable,
    period: Duration,
    sync_timeout: Duration,
    topic: Topic,
    bus: Bus,
    state: AgentState,
}

impl SatelliteAgent {
    pub fn new(config: &MissionConfig, sat_id: &str, bus: Bus) -> Result<Self, ConfigError> {
        let satellite = config.satellite(sat_id).ok_or_else(|| {
            ConfigError::Invalid(format!("sat_id {} is not in the mission", sat_id))
        })?;

        Ok(Self {
            sat_id: satellite.sat_id.clone(),
            name: satellite.display_name(),
            elements: satellite.initial,
            faults: config.fault_table(),
            period: config.telemetry_period(),
            sync_timeout: config.sync_timeout(),
            topic: Topic::Telemetry(satellite.sat_id.clone()),
            bus,
            state: AgentState::AwaitingSync,
        })
    }

    pub fn with_sync_timeout(mut self, sync_timeout: Duration) -> Self {
        self.sync_timeout = sync_timeout;
        self
    }

    pub fn build_record(
        &self,
        clock: &MissionClockSnapshot,
        wall_timestamp: DateTime<Utc>,
    ) -> Result<TelemetryRecord, PropagateError> {
        let elapsed = clock.elapsed_seconds;
        let kinematics = propagate(&self.elements, elapsed)?;
        let battery = battery_pct(elapsed);

        Ok(TelemetryRecord {
            sat_id: self.sat_id.clone(),
            name: self.name.clone(),
            mission_time: clock.mission_time,
            mission_elapsed_seconds: elapsed,
            wall_timestamp,
            position_km: kinematics.position_km,
            velocity_km_s: kinematics.velocity_km_s,
            battery_pct: battery,
            attitude_q: IDENTITY_QUATERNION,
            satellite_status: SatelliteStatus::derive(battery, elapsed, &self.sat_id, &self.faults),
            orbital_elements: ElementsReport::new(&self.elements, kinematics.true_anom_deg),
        })
    }

    /// Emits one record. Refused until the agent has seen a clock broadcast.
    pub async fn publish(
        &self,
        clock: &MissionClockSnapshot,
    ) -> Result<TelemetryRecord, AgentError> {
        if self.state != AgentState::Streaming {
            return Err(AgentError::NotSynchronized);
        }
        let record = self.build_record(clock, Utc::now())?;
        self.bus.publish(&self.topic, &record).await?;
        Ok(record)
    }

    /// Runs until the process exits. Returns early only if the bus refuses the
    /// subscription or the clock feed closes before the first broadcast.
    pub async fn run(mut self) -> Result<(), AgentError> {
        let subscription = self
            .bus
            .subscribe(&[TopicFilter::from(&Topic::MissionTime)])
            .await?;
        let (tx, mut clock) = watch::channel(None);
        tokio::spawn(listen_for_clock(subscription, tx));

        log::info!("Satellite {} ({}) waiting for mission clock", self.sat_id, self.name);
        let mut snapshot = loop {
            match await_sync(&mut clock, self.sync_timeout).await {
                Ok(snapshot) => break snapshot,
                Err(AgentError::SyncTimeout(waited)) => {
                    log::warn!(
                        "Satellite {} still waiting for mission clock after {:?}",
                        self.sat_id,
                        waited
                    );
                }
                Err(e) => return Err(e),
            }
        };

        self.state = AgentState::Streaming;
        log::info!(
            "Satellite {} synchronized at T+{:.1}s",
            self.sat_id,
            snapshot.elapsed_seconds
        );

        loop {
            let tick_start = Instant::now();

            match self.publish(&snapshot).await {
                Ok(record) => log::debug!(
                    "Satellite {} published T+{:.1}s ({}, battery {:.2}%)",
                    self.sat_id,
                    record.mission_elapsed_seconds,
                    record.satellite_status.mode,
                    record.battery_pct
                ),
                Err(AgentError::Propagate(e)) => {
                    log::error!("Satellite {} skipped a tick: {}", self.sat_id, e)
                }
                Err(e) => log::warn!("Satellite {} failed to publish: {}", self.sat_id, e),
            }

            // Overruns fire the next tick immediately without catching up.
            sleep_until(tick_start + self.period).await;

            match fresh_snapshot(&mut clock) {
                Some(latest) => snapshot = latest,
                None => log::warn!(
                    "Satellite {} lost sync, reusing T+{:.1}s",
                    self.sat_id,
                    snapshot.elapsed_seconds
                ),
            }
        }
    }
}

/// Waits for the first clock snapshot, giving up after `limit`. A timeout
/// leaves the feed untouched so the caller can wait again.
pub async fn await_sync(
    clock: &mut ClockFeed,
    limit: Duration,
) -> Result<MissionClockSnapshot, AgentError> {
    let received = timeout(limit, clock.wait_for(Option::is_some))
        .await
        .map_err(|_| AgentError::SyncTimeout(limit))?;
    let snapshot = received.map_err(|_| AgentError::ClockClosed)?;
    (*snapshot).clone().ok_or(AgentError::ClockClosed)
}

/// The snapshot received since the last call, if any.
fn fresh_snapshot(clock: &mut ClockFeed) -> Option<MissionClockSnapshot> {
    if !clock.has_changed().unwrap_or(false) {
        return None;
    }
    clock.borrow_and_update().clone()
}

async fn listen_for_clock(
    mut subscription: Subscription,
    tx: watch::Sender<Option<MissionClockSnapshot>>,
) {
    while let Some(envelope) = subscription.recv().await {
        match envelope.decode::<MissionClockSnapshot>() {
            Ok(snapshot) => {
                if tx.send(Some(snapshot)).is_err() {
                    break;
                }
            }
            Err(e) => log::warn!("Dropping message: {}", e),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::agent::{AttitudeMode, SatelliteMode};
    use crate::clock::MissionClock;
    use crate::propagator::{mean_motion_rad_s, semi_major_axis_km};

    const MISSION: &str = r#"
mission:
  name: Demo
  epoch: "2025-01-01T00:00:00Z"
  time_scale: 60
  duration_hours: 1
satellites:
  - sat_id: "1"
    initial:
      alt_km: 500
      inc_deg: 0
  - sat_id: "2"
"#;

    fn config() -> MissionConfig {
        MissionConfig::from_yaml(MISSION).unwrap()
    }

    fn snapshot_at(config: &MissionConfig, wall: Duration) -> MissionClockSnapshot {
        MissionClock::new(&config.mission).snapshot(wall, Utc::now())
    }

    #[test]
    fn unknown_satellite_is_a_config_error() {
        let result = SatelliteAgent::new(&config(), "9", Bus::memory(4));
        assert!(matches!(result, Err(ConfigError::Invalid(_))));
    }

    #[test]
    fn record_matches_circular_orbit_after_one_minute() {
        let config = config();
        let agent = SatelliteAgent::new(&config, "1", Bus::memory(4)).unwrap();
        let clock = snapshot_at(&config, Duration::from_secs(1));
        let record = agent.build_record(&clock, Utc::now()).unwrap();

        let a = semi_major_axis_km(500.0);
        let n = mean_motion_rad_s(a);
        let theta = n * 60.0;
        assert!((a - 6878.137).abs() < 1e-9);
        assert!((n - 0.0011067).abs() < 1e-6);
        assert!((theta - 0.0664).abs() < 1e-3);
        assert!((record.position_km[0] - a * theta.cos()).abs() < 1e-6);
        assert!((record.position_km[1] - a * theta.sin()).abs() < 1e-6);
        assert!(record.position_km[2].abs() < 1e-9);

        assert_eq!(record.sat_id, "1");
        assert_eq!(record.name, "SAT-1");
        assert_eq!(record.mission_elapsed_seconds, 60.0);
        assert_eq!(record.mission_time, clock.mission_time);
        assert_eq!(record.attitude_q, IDENTITY_QUATERNION);
        assert_eq!(record.satellite_status.mode, SatelliteMode::Nominal);
        assert_eq!(record.satellite_status.attitude_mode, AttitudeMode::Detumbling);
        assert!((record.orbital_elements.true_anom_deg - theta.to_degrees()).abs() < 1e-9);
    }

    #[test]
    fn default_fault_table_fails_satellite_two() {
        let config = config();
        let agent = SatelliteAgent::new(&config, "2", Bus::memory(4)).unwrap();
        // 21 wall seconds at 60x is T+1260s.
        let clock = snapshot_at(&config, Duration::from_secs(21));
        let record = agent.build_record(&clock, Utc::now()).unwrap();
        assert_eq!(record.satellite_status.mode, SatelliteMode::Fail);
    }

    #[tokio::test]
    async fn publishing_before_sync_is_refused() {
        let config = config();
        let bus = Bus::memory(16);
        let mut telemetry = bus.subscribe(&[TopicFilter::all_telemetry()]).await.unwrap();
        let agent = SatelliteAgent::new(&config, "1", bus).unwrap();

        let clock = snapshot_at(&config, Duration::from_secs(1));
        assert!(matches!(
            agent.publish(&clock).await,
            Err(AgentError::NotSynchronized)
        ));
        tokio::task::yield_now().await;
        assert!(telemetry.try_recv().is_none());
        assert_eq!(agent.state, AgentState::AwaitingSync);
    }

    #[tokio::test(start_paused = true)]
    async fn await_sync_times_out_then_succeeds() {
        let config = config();
        let (tx, mut rx) = watch::channel(None);

        let first = await_sync(&mut rx, Duration::from_secs(5)).await;
        assert!(matches!(first, Err(AgentError::SyncTimeout(_))));

        tx.send(Some(snapshot_at(&config, Duration::from_secs(1)))).unwrap();
        let snapshot = await_sync(&mut rx, Duration::from_secs(5)).await.unwrap();
        assert_eq!(snapshot.elapsed_seconds, 60.0);
    }

    #[tokio::test]
    async fn closed_feed_is_reported() {
        let (tx, mut rx) = watch::channel::<Option<MissionClockSnapshot>>(None);
        drop(tx);
        assert!(matches!(
            await_sync(&mut rx, Duration::from_secs(1)).await,
            Err(AgentError::ClockClosed)
        ));
    }

    #[test]
    fn fresh_snapshot_only_reports_new_broadcasts() {
        let config = config();
        let (tx, mut rx) = watch::channel(None);
        assert!(fresh_snapshot(&mut rx).is_none());

        tx.send(Some(snapshot_at(&config, Duration::from_secs(2)))).unwrap();
        let latest = fresh_snapshot(&mut rx).unwrap();
        assert_eq!(latest.elapsed_seconds, 120.0);
        assert!(fresh_snapshot(&mut rx).is_none());
    }

    #[tokio::test(start_paused = true)]
    async fn agent_is_silent_until_the_first_clock_broadcast() {
        let config = config();
        let bus = Bus::memory(64);
        let mut telemetry = bus.subscribe(&[TopicFilter::all_telemetry()]).await.unwrap();

        let agent = SatelliteAgent::new(&config, "1", bus.clone())
            .unwrap()
            .with_sync_timeout(Duration::from_secs(5));
        let handle = tokio::spawn(agent.run());

        tokio::time::sleep(Duration::from_secs(12)).await;
        assert!(telemetry.try_recv().is_none());

        let clock = snapshot_at(&config, Duration::from_secs(1));
        bus.publish(&Topic::MissionTime, &clock).await.unwrap();
        tokio::time::sleep(Duration::from_millis(10)).await;

        let first: TelemetryRecord = telemetry.try_recv().unwrap().decode().unwrap();
        assert_eq!(first.mission_elapsed_seconds, 60.0);

        // No further broadcasts: later ticks reuse the last snapshot.
        tokio::time::sleep(Duration::from_millis(2_500)).await;
        let mut later = Vec::new();
        while let Some(envelope) = telemetry.try_recv() {
            later.push(envelope.decode::<TelemetryRecord>().unwrap());
        }
        assert_eq!(later.len(), 2);
        assert!(later.iter().all(|r| r.mission_elapsed_seconds == 60.0));

        handle.abort();
    }
}

use std::time::Duration;
use tokio::task::JoinHandle;

use crate::agent::SatelliteAgent;
use crate::aggregator::Aggregator;
use crate::bus::{Bus, BusError};
use crate::clock::ClockAuthority;
use crate::config::{ConfigError, MissionConfig};

/// Subscribes before returning, so nothing published afterwards is missed.
pub async fn spawn_aggregator(config: &MissionConfig, bus: &Bus) -> Result<Aggregator, BusError> {
    let aggregator = Aggregator::new(config.stale_timeout());
    let subscription = bus.subscribe(&Aggregator::filters()).await?;
    tokio::spawn(aggregator.clone().run_receiver(subscription));
    Ok(aggregator)
}

pub fn spawn_clock(config: &MissionConfig, bus: &Bus) -> JoinHandle<()> {
    tokio::spawn(ClockAuthority::new(config, bus.clone()).run())
}

pub fn spawn_agent(
    config: &MissionConfig,
    sat_id: &str,
    bus: &Bus,
    sync_timeout: Option<Duration>,
) -> Result<JoinHandle<()>, ConfigError> {
    let mut agent = SatelliteAgent::new(config, sat_id, bus.clone())?;
    if let Some(timeout) = sync_timeout {
        agent = agent.with_sync_timeout(timeout);
    }
    let sat_id = sat_id.to_string();
    Ok(tokio::spawn(async move {
        if let Err(e) = agent.run().await {
            log::error!("Satellite {} stopped: {}", sat_id, e);
        }
    }))
}

/// One agent per satellite in the mission file.
pub fn spawn_agents(
    config: &MissionConfig,
    bus: &Bus,
    sync_timeout: Option<Duration>,
) -> Result<Vec<JoinHandle<()>>, ConfigError> {
    config
        .satellites
        .iter()
        .map(|sat| spawn_agent(config, &sat.sat_id, bus, sync_timeout))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::agent::TelemetryRecord;
    use crate::bus::TopicFilter;
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
"#;

    #[tokio::test(start_paused = true)]
    async fn one_satellite_end_to_end() {
        let config = MissionConfig::from_yaml(MISSION).unwrap();
        let bus = Bus::memory(1024);
        let mut sent = bus.subscribe(&[TopicFilter::all_telemetry()]).await.unwrap();

        let aggregator = spawn_aggregator(&config, &bus).await.unwrap();
        let agents = spawn_agents(&config, &bus, None).unwrap();
        let clock = spawn_clock(&config, &bus);

        tokio::time::sleep(Duration::from_millis(1_050)).await;

        let view = aggregator.mission_time();
        let snapshot = view.clock.unwrap();
        assert!((snapshot.elapsed_seconds - 60.0).abs() <= 1.0);
        assert_eq!(view.metadata["mission"]["name"], "Demo");

        let mut last_sent = None;
        while let Some(envelope) = sent.try_recv() {
            last_sent = Some(envelope.decode::<TelemetryRecord>().unwrap());
        }
        let last_sent = last_sent.unwrap();

        let records = aggregator.snapshot();
        assert_eq!(records, vec![last_sent.clone()]);

        let a = semi_major_axis_km(500.0);
        let theta = mean_motion_rad_s(a) * last_sent.mission_elapsed_seconds;
        assert!((last_sent.position_km[0] - a * theta.cos()).abs() < 1e-6);
        assert!((last_sent.position_km[1] - a * theta.sin()).abs() < 1e-6);
        assert_eq!(last_sent.position_km[2], 0.0);

        for agent in agents {
            agent.abort();
        }
        clock.abort();

        tokio::time::sleep(Duration::from_millis(10_500)).await;
        assert!(aggregator.snapshot().is_empty());
    }
}

use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;
use tokio::time::Instant;

use super::cache::{MissionTimeView, TelemetryCache};
use crate::agent::TelemetryRecord;
use crate::bus::{Envelope, MessageError, Subscription, Topic, TopicFilter};

/// Shared handle to the telemetry cache. The bus receiver writes through one
/// clone while HTTP handlers read through others; every call holds the lock
/// for exactly one operation.
#[derive(Clone)]
pub struct Aggregator {
    cache: Arc<Mutex<TelemetryCache>>,
}

impl Aggregator {
    pub fn new(stale_timeout: Duration) -> Self {
        Self {
            cache: Arc::new(Mutex::new(TelemetryCache::new(stale_timeout))),
        }
    }

    pub fn filters() -> Vec<TopicFilter> {
        vec![
            TopicFilter::all_telemetry(),
            TopicFilter::from(&Topic::MissionTime),
            TopicFilter::from(&Topic::MissionMetadata),
        ]
    }

    /// Decodes and stores one message. The payload is decoded before the lock
    /// is taken.
    pub fn handle(&self, envelope: &Envelope) -> Result<(), MessageError> {
        let topic = Topic::parse(&envelope.topic)
            .ok_or_else(|| MessageError::UnknownTopic(envelope.topic.clone()))?;

        match topic {
            Topic::Telemetry(sat_id) => {
                let record: TelemetryRecord = envelope.decode()?;
                if record.sat_id != sat_id {
                    return Err(MessageError::TopicMismatch {
                        topic: envelope.topic.clone(),
                        sat_id: record.sat_id,
                    });
                }
                self.lock().ingest_telemetry(record, Instant::now());
            }
            Topic::MissionTime => {
                let snapshot = envelope.decode()?;
                self.lock().ingest_clock(snapshot);
            }
            Topic::MissionMetadata => {
                let metadata = envelope.decode()?;
                self.lock().ingest_metadata(metadata);
            }
        }
        Ok(())
    }

    pub fn snapshot(&self) -> Vec<TelemetryRecord> {
        self.lock().snapshot(Instant::now())
    }

    pub fn mission_time(&self) -> MissionTimeView {
        self.lock().mission_time()
    }

    /// Drains the subscription until the bus goes away. Bad messages are
    /// logged and dropped one at a time.
    pub async fn run_receiver(self, mut subscription: Subscription) {
        while let Some(envelope) = subscription.recv().await {
            if let Err(e) = self.handle(&envelope) {
                log::warn!("Dropping message on {}: {}", envelope.topic, e);
            }
        }
        log::warn!("Aggregator subscription closed");
    }

    fn lock(&self) -> MutexGuard<'_, TelemetryCache> {
        self.cache.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

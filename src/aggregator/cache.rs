use serde::Serialize;
use serde_json::{Map, Value};
use std::collections::HashMap;
use std::time::Duration;
use tokio::time::Instant;

use crate::agent::TelemetryRecord;
use crate::clock::MissionClockSnapshot;

#[derive(Debug, Clone)]
pub struct AggregatorEntry {
    pub latest: TelemetryRecord,
    pub last_seen: Instant,
}

/// Latest clock snapshot with every metadata broadcast merged underneath.
#[derive(Debug, Clone, Default, Serialize)]
pub struct MissionTimeView {
    #[serde(flatten)]
    pub clock: Option<MissionClockSnapshot>,
    pub metadata: Map<String, Value>,
}

/// Latest known state per satellite. Entries expire lazily: each snapshot
/// drops whatever has been silent for longer than the stale timeout.
#[derive(Debug)]
pub struct TelemetryCache {
    entries: HashMap<String, AggregatorEntry>,
    clock: Option<MissionClockSnapshot>,
    metadata: Map<String, Value>,
    stale_timeout: Duration,
}

impl TelemetryCache {
    pub fn new(stale_timeout: Duration) -> Self {
        Self {
            entries: HashMap::new(),
            clock: None,
            metadata: Map::new(),
            stale_timeout,
        }
    }

    /// Last write wins, even if an older sample arrives late.
    pub fn ingest_telemetry(&mut self, record: TelemetryRecord, now: Instant) {
        self.entries.insert(
            record.sat_id.clone(),
            AggregatorEntry {
                latest: record,
                last_seen: now,
            },
        );
    }

    pub fn ingest_clock(&mut self, snapshot: MissionClockSnapshot) {
        self.clock = Some(snapshot);
    }

    pub fn ingest_metadata(&mut self, metadata: Map<String, Value>) {
        merge(&mut self.metadata, metadata);
    }

    pub fn snapshot(&mut self, now: Instant) -> Vec<TelemetryRecord> {
        self.evict_stale(now);
        let mut records: Vec<TelemetryRecord> =
            self.entries.values().map(|e| e.latest.clone()).collect();
        records.sort_by(|a, b| a.sat_id.cmp(&b.sat_id));
        records
    }

    pub fn mission_time(&self) -> MissionTimeView {
        MissionTimeView {
            clock: self.clock.clone(),
            metadata: self.metadata.clone(),
        }
    }

    fn evict_stale(&mut self, now: Instant) {
        let timeout = self.stale_timeout;
        self.entries.retain(|sat_id, entry| {
            let fresh = now.saturating_duration_since(entry.last_seen) <= timeout;
            if !fresh {
                log::info!("Removing stale satellite {}", sat_id);
            }
            fresh
        });
    }
}

/// Objects merge key by key; anything else replaces what was there.
fn merge(target: &mut Map<String, Value>, incoming: Map<String, Value>) {
    for (key, value) in incoming {
        match (target.get_mut(&key), value) {
            (Some(Value::Object(existing)), Value::Object(update)) => merge(existing, update),
            (_, value) => {
                target.insert(key, value);
            }
        }
    }
}

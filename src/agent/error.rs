use std::time::Duration;
use thiserror::Error;

use crate::bus::BusError;
use crate::propagator::PropagateError;

#[derive(Debug, Error)]
pub enum AgentError {
    #[error("no mission clock broadcast within {0:?}")]
    SyncTimeout(Duration),
    #[error("mission clock feed closed")]
    ClockClosed,
    #[error("telemetry refused before the first mission clock broadcast")]
    NotSynchronized,
    #[error("propagation failed: {0}")]
    Propagate(#[from] PropagateError),
    #[error("bus error: {0}")]
    Bus(#[from] BusError),
}

mod error;
mod fault;
mod record;
mod satellite;
mod status;

pub use error::AgentError;
pub use fault::{FaultRule, FaultTable};
pub use record::{ElementsReport, TelemetryRecord};
pub use satellite::SatelliteAgent;
pub use status::{AttitudeMode, Health, SatelliteMode, SatelliteStatus};

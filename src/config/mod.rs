mod error;
mod mission;

pub use error::ConfigError;
pub(crate) use mission::deserialize_sat_id;
pub use mission::{ElementOverrides, MissionConfig, MissionInfo, SatelliteConfig};

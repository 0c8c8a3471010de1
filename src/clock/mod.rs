mod authority;
mod snapshot;

pub use authority::{metadata_due, ClockAuthority, MissionClock, MissionMetadata};
pub use snapshot::MissionClockSnapshot;

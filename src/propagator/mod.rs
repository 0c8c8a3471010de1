mod error;
mod propagation;
mod types;

pub use error::PropagateError;
pub use propagation::{mean_motion_rad_s, propagate, semi_major_axis_km};
pub use types::{OrbitalElements, SatelliteKinematics};

pub const EARTH_RADIUS_KM: f64 = 6378.137;
pub const EARTH_MU_KM3_S2: f64 = 398_600.4418;

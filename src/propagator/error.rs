use thiserror::Error;

#[derive(Debug, Error, PartialEq)]
pub enum PropagateError {
    #[error("invalid orbit: altitude {alt_km} km is at or below the Earth's centre")]
    InvalidOrbit { alt_km: f64 },
    #[error("invalid orbit: {0} is not finite")]
    NonFinite(&'static str),
}

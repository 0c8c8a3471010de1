use serde::{Deserialize, Serialize};

/// Forces a satellite into `fail` once mission time passes `after_seconds`.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct FaultRule {
    #[serde(deserialize_with = "crate::config::deserialize_sat_id")]
    pub sat_id: String,
    pub after_seconds: f64,
}

#[derive(Debug, Clone, Default)]
pub struct FaultTable {
    rules: Vec<FaultRule>,
}

impl FaultTable {
    pub fn new(rules: Vec<FaultRule>) -> Self {
        Self { rules }
    }

    /// Strictly after the threshold; at exactly `after_seconds` the satellite
    /// is still healthy.
    pub fn is_faulted(&self, sat_id: &str, elapsed_seconds: f64) -> bool {
        self.rules
            .iter()
            .any(|rule| rule.sat_id == sat_id && elapsed_seconds > rule.after_seconds)
    }

    pub fn rules(&self) -> &[FaultRule] {
        &self.rules
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn table() -> FaultTable {
        FaultTable::new(vec![
            FaultRule {
                sat_id: "2".into(),
                after_seconds: 1200.0,
            },
            FaultRule {
                sat_id: "7".into(),
                after_seconds: 0.0,
            },
        ])
    }

    #[test]
    fn threshold_is_exclusive() {
        let faults = table();
        assert!(!faults.is_faulted("2", 1200.0));
        assert!(faults.is_faulted("2", 1200.001));
    }

    #[test]
    fn rules_apply_only_to_their_satellite() {
        let faults = table();
        assert!(!faults.is_faulted("1", 1_000_000.0));
        assert!(faults.is_faulted("7", 0.5));
        assert_eq!(faults.rules().len(), 2);
    }

    #[test]
    fn empty_table_never_faults() {
        assert!(!FaultTable::default().is_faulted("2", 5000.0));
    }
}

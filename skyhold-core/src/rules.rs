use chrono::Duration;
use serde::Deserialize;

use crate::denied_boarding::CompensationType;
use crate::waitlist::CascadePolicy;
use crate::CabinClass;

/// Tunables for the inventory engine, loaded from the `engine` config section.
#[derive(Debug, Deserialize, Clone)]
pub struct EngineRules {
    #[serde(default = "default_hold_ttl")]
    pub hold_ttl_seconds: i64,
    #[serde(default = "default_offer_ttl")]
    pub offer_ttl_hours: i64,
    #[serde(default = "default_batch_size")]
    pub waitlist_batch_size: usize,
    #[serde(default)]
    pub cascade_policy: CascadePolicy,
    #[serde(default = "default_waitlist_depth")]
    pub max_waitlist_depth: i64,
    #[serde(default = "default_hold_sweep")]
    pub hold_sweep_interval_secs: u64,
    #[serde(default = "default_offer_sweep")]
    pub offer_sweep_interval_secs: u64,
    #[serde(default = "default_history_window")]
    pub history_window: usize,
    #[serde(default = "default_max_alternatives")]
    pub max_alternatives: usize,
    /// Minor currency units.
    #[serde(default = "default_economy_compensation")]
    pub economy_compensation: i64,
    #[serde(default = "default_business_compensation")]
    pub business_compensation: i64,
    #[serde(default = "default_compensation_type")]
    pub compensation_type: CompensationType,
}

fn default_hold_ttl() -> i64 { 900 }
fn default_offer_ttl() -> i64 { 24 }
fn default_batch_size() -> usize { 10 }
fn default_waitlist_depth() -> i64 { 50 }
fn default_hold_sweep() -> u64 { 60 }
fn default_offer_sweep() -> u64 { 300 }
fn default_history_window() -> usize { 50 }
fn default_max_alternatives() -> usize { 5 }
fn default_economy_compensation() -> i64 { 40_000 }
fn default_business_compensation() -> i64 { 80_000 }
fn default_compensation_type() -> CompensationType { CompensationType::Cash }

impl Default for EngineRules {
    fn default() -> Self {
        Self {
            hold_ttl_seconds: default_hold_ttl(),
            offer_ttl_hours: default_offer_ttl(),
            waitlist_batch_size: default_batch_size(),
            cascade_policy: CascadePolicy::default(),
            max_waitlist_depth: default_waitlist_depth(),
            hold_sweep_interval_secs: default_hold_sweep(),
            offer_sweep_interval_secs: default_offer_sweep(),
            history_window: default_history_window(),
            max_alternatives: default_max_alternatives(),
            economy_compensation: default_economy_compensation(),
            business_compensation: default_business_compensation(),
            compensation_type: default_compensation_type(),
        }
    }
}

impl EngineRules {
    pub fn hold_ttl(&self) -> Duration {
        Duration::seconds(self.hold_ttl_seconds)
    }

    pub fn offer_ttl(&self) -> Duration {
        Duration::hours(self.offer_ttl_hours)
    }

    pub fn compensation_for(&self, cabin: CabinClass) -> i64 {
        match cabin {
            CabinClass::Economy => self.economy_compensation,
            CabinClass::Business => self.business_compensation,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_fill_missing_fields() {
        let rules: EngineRules = serde_json::from_str(r#"{ "hold_ttl_seconds": 600 }"#).unwrap();
        assert_eq!(rules.hold_ttl(), Duration::minutes(10));
        assert_eq!(rules.offer_ttl(), Duration::hours(24));
        assert_eq!(rules.waitlist_batch_size, 10);
        assert_eq!(rules.cascade_policy, CascadePolicy::StrictFifo);
        assert!(rules.compensation_for(CabinClass::Business) > rules.compensation_for(CabinClass::Economy));
    }
}

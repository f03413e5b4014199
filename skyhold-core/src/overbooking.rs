use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::CabinClass;

pub const DEFAULT_ECONOMY_RATE: f64 = 0.05;
pub const DEFAULT_BUSINESS_RATE: f64 = 0.02;
pub const DEFAULT_MAX_OVERBOOKING: i32 = 10;
pub const DEFAULT_NO_SHOW_RATE: f64 = 0.08;

/// Overbooking rule scoped to an airline, a route, or both.
/// Rows are immutable: replace by inserting a new one and deactivating the old.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OverbookingConfig {
    pub id: Uuid,
    pub airline_id: Option<String>,
    pub origin_id: Option<String>,
    pub destination_id: Option<String>,
    pub economy_rate: f64,
    pub business_rate: f64,
    pub max_overbooking: i32,
    pub historical_no_show_rate: f64,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
}

impl OverbookingConfig {
    pub fn rate_for(&self, cabin: CabinClass) -> f64 {
        match cabin {
            CabinClass::Economy => self.economy_rate,
            CabinClass::Business => self.business_rate,
        }
    }

    pub fn is_route_scoped(&self) -> bool {
        self.origin_id.is_some() && self.destination_id.is_some()
    }
}

/// Admin input for a new config.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewOverbookingConfig {
    pub airline_id: Option<String>,
    pub origin_id: Option<String>,
    pub destination_id: Option<String>,
    pub economy_rate: f64,
    pub business_rate: f64,
    pub max_overbooking: i32,
    pub historical_no_show_rate: f64,
}

impl NewOverbookingConfig {
    pub fn validate(&self) -> Result<(), crate::InventoryError> {
        let rates = [self.economy_rate, self.business_rate, self.historical_no_show_rate];
        if rates.iter().any(|r| !(0.0..=1.0).contains(r)) {
            return Err(crate::InventoryError::Validation(
                "rates must be fractions between 0 and 1".to_string(),
            ));
        }
        if self.max_overbooking < 0 {
            return Err(crate::InventoryError::Validation(
                "max_overbooking must not be negative".to_string(),
            ));
        }
        if self.origin_id.is_some() != self.destination_id.is_some() {
            return Err(crate::InventoryError::Validation(
                "route scope needs both origin_id and destination_id".to_string(),
            ));
        }
        Ok(())
    }

    pub fn into_config(self, now: DateTime<Utc>) -> OverbookingConfig {
        OverbookingConfig {
            id: Uuid::new_v4(),
            airline_id: self.airline_id,
            origin_id: self.origin_id,
            destination_id: self.destination_id,
            economy_rate: self.economy_rate,
            business_rate: self.business_rate,
            max_overbooking: self.max_overbooking,
            historical_no_show_rate: self.historical_no_show_rate,
            is_active: true,
            created_at: now,
        }
    }
}

/// Where the effective parameters came from.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum ConfigScope {
    Route,
    Airline,
    Default,
}

/// Parameters resolved for one flight and cabin.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
pub struct OverbookingParams {
    pub rate: f64,
    pub max_overbooking: i32,
    pub no_show_rate: f64,
    pub scope: ConfigScope,
}

impl OverbookingParams {
    pub fn system_default(cabin: CabinClass) -> Self {
        let rate = match cabin {
            CabinClass::Economy => DEFAULT_ECONOMY_RATE,
            CabinClass::Business => DEFAULT_BUSINESS_RATE,
        };
        Self {
            rate,
            max_overbooking: DEFAULT_MAX_OVERBOOKING,
            no_show_rate: DEFAULT_NO_SHOW_RATE,
            scope: ConfigScope::Default,
        }
    }

    /// `floor(total_seats * rate)` capped at `max_overbooking`.
    pub fn limit_for(&self, total_seats: i32) -> i32 {
        let raw = (total_seats.max(0) as f64 * self.rate).floor() as i32;
        raw.min(self.max_overbooking).max(0)
    }
}

/// Operator-facing suggestion based on observed no-shows. Never used for admission.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct OverbookingRecommendation {
    pub flight_id: Uuid,
    pub cabin_class: CabinClass,
    pub historical_no_show_rate: f64,
    pub sample_size: usize,
    pub configured_limit: i32,
    pub recommended_limit: i32,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_limit_floors_and_caps() {
        let params = OverbookingParams::system_default(CabinClass::Economy);
        assert_eq!(params.limit_for(100), 5);
        assert_eq!(params.limit_for(39), 1);
        // 0.05 * 400 = 20, capped at 10
        assert_eq!(params.limit_for(400), 10);

        let business = OverbookingParams::system_default(CabinClass::Business);
        assert_eq!(business.limit_for(24), 0);
    }

    #[test]
    fn test_new_config_validation() {
        let mut cfg = NewOverbookingConfig {
            airline_id: Some("SK".into()),
            origin_id: Some("CPH".into()),
            destination_id: None,
            economy_rate: 0.1,
            business_rate: 0.02,
            max_overbooking: 8,
            historical_no_show_rate: 0.07,
        };
        assert!(cfg.validate().is_err());

        cfg.destination_id = Some("OSL".into());
        assert!(cfg.validate().is_ok());

        cfg.economy_rate = 1.5;
        assert!(cfg.validate().is_err());
    }
}

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

/// One day of projected demand for a flight.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ForecastPoint {
    pub date: NaiveDate,
    pub days_before_departure: i64,
    pub projected_sold_seats: i32,
    pub projected_occupancy_rate: f64,
    pub confidence: f64,
}

use std::sync::Arc;
use uuid::Uuid;

use skyhold_core::clock::Clock;
use skyhold_core::flight::CompletedFlightStats;
use skyhold_core::forecast::ForecastPoint;
use skyhold_core::repository::*;
use skyhold_core::{CabinClass, InventoryResult};

use crate::status::InventoryStatusService;

/// Final load factor assumed for a route with no history.
pub const DEFAULT_TARGET_LOAD: f64 = 0.85;

/// Deterministic demand projection.
///
/// Remaining demand (route's historical final load minus today's load) is assumed to
/// arrive on a quadratic curve that steepens toward departure. Confidence grows with
/// the number of historical flights and shrinks with distance from today.
pub struct DemandForecaster {
    store: Arc<dyn InventoryStore>,
    status: Arc<InventoryStatusService>,
    clock: Arc<dyn Clock>,
    history_window: usize,
}

impl DemandForecaster {
    pub fn new(
        store: Arc<dyn InventoryStore>,
        status: Arc<InventoryStatusService>,
        clock: Arc<dyn Clock>,
        history_window: usize,
    ) -> Self {
        Self { store, status, clock, history_window }
    }

    pub async fn forecast(&self, flight_id: Uuid, days_ahead: u32) -> InventoryResult<Vec<ForecastPoint>> {
        let flight = self.status.load_flight(flight_id).await?;
        let now = self.clock.now();
        let today = now.date_naive();
        let days_to_departure = (flight.departure_time.date_naive() - today).num_days();
        if days_ahead == 0 || days_to_departure <= 0 || !flight.is_open_for_sale(now) {
            return Ok(Vec::new());
        }

        let mut total = 0;
        let mut occupied = 0;
        for cabin in CabinClass::ALL {
            let status = self.status.status_for(&flight, cabin).await?;
            total += status.total_seats;
            occupied += status.sold_seats + status.held_seats;
        }
        if total <= 0 {
            return Ok(Vec::new());
        }

        let history = self
            .store
            .completed_flights(&flight.origin_id, &flight.destination_id, self.history_window)
            .await?;
        let target = target_load(&history);
        let current = occupied as f64 / total as f64;

        let horizon = (days_ahead as i64).min(days_to_departure);
        let points = (1..=horizon)
            .map(|day| {
                let load = projected_load(current, target, day, days_to_departure);
                ForecastPoint {
                    date: today + chrono::Duration::days(day),
                    days_before_departure: days_to_departure - day,
                    projected_sold_seats: (load * total as f64).round() as i32,
                    projected_occupancy_rate: round2(load),
                    confidence: confidence(history.len(), day, days_to_departure),
                }
            })
            .collect();

        Ok(points)
    }
}

fn target_load(history: &[CompletedFlightStats]) -> f64 {
    let loads: Vec<f64> = history
        .iter()
        .filter(|s| s.total_seats > 0)
        .map(|s| s.total_bookings as f64 / s.total_seats as f64)
        .collect();
    if loads.is_empty() {
        return DEFAULT_TARGET_LOAD;
    }
    (loads.iter().sum::<f64>() / loads.len() as f64).clamp(0.0, 1.0)
}

fn projected_load(current: f64, target: f64, day: i64, days_to_departure: i64) -> f64 {
    let remaining = (target - current).max(0.0);
    let left = (days_to_departure - day) as f64 / days_to_departure as f64;
    let share = 1.0 - left * left;
    (current + remaining * share).min(1.0)
}

fn confidence(samples: usize, day: i64, days_to_departure: i64) -> f64 {
    let evidence = 0.3 + 0.7 * (samples as f64 / 10.0).min(1.0);
    let distance = 1.0 - day as f64 / (days_to_departure + 1) as f64;
    round2(evidence * distance)
}

fn round2(v: f64) -> f64 {
    (v * 100.0).round() / 100.0
}

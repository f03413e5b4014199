use std::sync::Arc;

use skyhold_core::flight::{CompletedFlightStats, Flight};
use skyhold_core::overbooking::{ConfigScope, OverbookingConfig, OverbookingParams, OverbookingRecommendation};
use skyhold_core::repository::*;
use skyhold_core::{CabinClass, InventoryResult};

/// Works out how far past physical capacity a cabin may be sold.
pub struct OverbookingPolicy {
    store: Arc<dyn InventoryStore>,
    history_window: usize,
}

impl OverbookingPolicy {
    pub fn new(store: Arc<dyn InventoryStore>, history_window: usize) -> Self {
        Self { store, history_window }
    }

    pub async fn resolve(&self, flight: &Flight, cabin: CabinClass) -> InventoryResult<OverbookingParams> {
        let configs = self.store.active_configs().await?;
        Ok(resolve_params(&configs, flight, cabin))
    }

    pub async fn limit(&self, flight: &Flight, cabin: CabinClass) -> InventoryResult<i32> {
        let params = self.resolve(flight, cabin).await?;
        Ok(params.limit_for(flight.seats_for(cabin)))
    }

    /// No-show rate observed on the route, with the number of flights it is based on.
    /// Falls back to the configured rate when there is nothing to learn from.
    pub async fn historical_no_show_rate(
        &self,
        flight: &Flight,
        cabin: CabinClass,
    ) -> InventoryResult<(f64, usize)> {
        let history = self
            .store
            .completed_flights(&flight.origin_id, &flight.destination_id, self.history_window)
            .await?;

        match observed_no_show_rate(&history) {
            Some(rate) => Ok((rate, history.len())),
            None => {
                let params = self.resolve(flight, cabin).await?;
                Ok((params.no_show_rate, history.len()))
            }
        }
    }

    pub async fn recommend(&self, flight: &Flight, cabin: CabinClass) -> InventoryResult<OverbookingRecommendation> {
        let params = self.resolve(flight, cabin).await?;
        let (rate, sample_size) = self.historical_no_show_rate(flight, cabin).await?;
        let total = flight.seats_for(cabin);

        let recommended = OverbookingParams { rate, ..params }.limit_for(total);

        Ok(OverbookingRecommendation {
            flight_id: flight.id,
            cabin_class: cabin,
            historical_no_show_rate: rate,
            sample_size,
            configured_limit: params.limit_for(total),
            recommended_limit: recommended,
        })
    }
}

/// Route config beats airline config beats the system default. Within a level the
/// newest config wins.
pub fn resolve_params(configs: &[OverbookingConfig], flight: &Flight, cabin: CabinClass) -> OverbookingParams {
    let route = configs
        .iter()
        .filter(|c| c.is_active && c.is_route_scoped())
        .filter(|c| {
            c.origin_id.as_deref() == Some(flight.origin_id.as_str())
                && c.destination_id.as_deref() == Some(flight.destination_id.as_str())
        })
        .filter(|c| c.airline_id.as_deref().map_or(true, |a| a == flight.airline_id))
        .max_by_key(|c| c.created_at);

    if let Some(config) = route {
        return params_from(config, cabin, ConfigScope::Route);
    }

    let airline = configs
        .iter()
        .filter(|c| c.is_active && c.origin_id.is_none() && c.destination_id.is_none())
        .filter(|c| c.airline_id.as_deref() == Some(flight.airline_id.as_str()))
        .max_by_key(|c| c.created_at);

    match airline {
        Some(config) => params_from(config, cabin, ConfigScope::Airline),
        None => OverbookingParams::system_default(cabin),
    }
}

fn params_from(config: &OverbookingConfig, cabin: CabinClass, scope: ConfigScope) -> OverbookingParams {
    OverbookingParams {
        rate: config.rate_for(cabin),
        max_overbooking: config.max_overbooking,
        no_show_rate: config.historical_no_show_rate,
        scope,
    }
}

fn observed_no_show_rate(history: &[CompletedFlightStats]) -> Option<f64> {
    let bookings: i64 = history.iter().map(|s| s.total_bookings as i64).sum();
    let no_shows: i64 = history.iter().map(|s| s.no_shows as i64).sum();
    if history.is_empty() || bookings <= 0 {
        return None;
    }
    Some(no_shows as f64 / bookings as f64)
}

use std::sync::Arc;
use uuid::Uuid;

use skyhold_core::clock::Clock;
use skyhold_core::flight::Flight;
use skyhold_core::repository::*;
use skyhold_core::status::InventoryStatus;
use skyhold_core::{CabinClass, InventoryError, InventoryResult, PartitionKey};

use crate::policy::OverbookingPolicy;

/// The only place availability is derived. Everything else asks here.
pub struct InventoryStatusService {
    store: Arc<dyn InventoryStore>,
    policy: Arc<OverbookingPolicy>,
    clock: Arc<dyn Clock>,
}

impl InventoryStatusService {
    pub fn new(store: Arc<dyn InventoryStore>, policy: Arc<OverbookingPolicy>, clock: Arc<dyn Clock>) -> Self {
        Self { store, policy, clock }
    }

    pub async fn get_status(&self, flight_id: Uuid, cabin: CabinClass) -> InventoryResult<InventoryStatus> {
        let flight = self.load_flight(flight_id).await?;
        self.status_for(&flight, cabin).await
    }

    pub async fn status_for(&self, flight: &Flight, cabin: CabinClass) -> InventoryResult<InventoryStatus> {
        let key = PartitionKey::new(flight.id, cabin);
        let now = self.clock.now();

        // Ledger before holds: a conversion moves seats from held to sold in one write,
        // so this order can under-count but never double-count converted seats.
        let sold = self.store.sold_seats(key).await?;
        let held = self.store.live_held_seats(key, now).await?;
        let offered = self.store.live_offered_seats(key, now).await?;
        let waiting = self.store.count_waiting(key).await?;
        let limit = self.policy.limit(flight, cabin).await?;

        Ok(InventoryStatus::compute(
            flight.id,
            cabin,
            flight.seats_for(cabin),
            sold,
            held,
            offered,
            waiting,
            limit,
        ))
    }

    pub async fn load_flight(&self, flight_id: Uuid) -> InventoryResult<Flight> {
        self.store
            .get_flight(flight_id)
            .await?
            .ok_or_else(|| InventoryError::NotFound(format!("flight {}", flight_id)))
    }
}

use std::sync::Arc;
use tracing::info;
use uuid::Uuid;

use skyhold_core::clock::Clock;
use skyhold_core::denied_boarding::{
    AlternativeFlight, DeniedBoardingRecord, DeniedBoardingStatus, NewDeniedBoarding, Resolution,
};
use skyhold_core::flight::FlightStatus;
use skyhold_core::repository::*;
use skyhold_core::rules::EngineRules;
use skyhold_core::{CabinClass, InventoryError, InventoryResult};
use skyhold_shared::models::events::DeniedBoardingRecordedEvent;
use skyhold_shared::InventoryEvent;

use crate::status::InventoryStatusService;

/// Compensation offers and rebooking options for oversold departures.
pub struct DeniedBoardingResolver {
    store: Arc<dyn InventoryStore>,
    status: Arc<InventoryStatusService>,
    clock: Arc<dyn Clock>,
    rules: EngineRules,
}

impl DeniedBoardingResolver {
    pub fn new(
        store: Arc<dyn InventoryStore>,
        status: Arc<InventoryStatusService>,
        clock: Arc<dyn Clock>,
        rules: EngineRules,
    ) -> Self {
        Self { store, status, clock, rules }
    }

    /// Advisory only: reads inventory, writes nothing.
    pub async fn resolve(&self, flight_id: Uuid, cabin: CabinClass, seats_needed: i32) -> InventoryResult<Resolution> {
        if seats_needed < 1 {
            return Err(InventoryError::Validation("seats_needed must be at least 1".to_string()));
        }
        let flight = self.status.load_flight(flight_id).await?;

        let mut candidates = self
            .store
            .find_route_flights(&flight.origin_id, &flight.destination_id, flight.departure_time)
            .await?;
        candidates.retain(|f| f.id != flight.id && f.status == FlightStatus::Scheduled);
        candidates.sort_by_key(|f| f.departure_time);

        let mut alternatives = Vec::new();
        for candidate in candidates {
            if alternatives.len() >= self.rules.max_alternatives {
                break;
            }
            let status = self.status.status_for(&candidate, cabin).await?;
            if status.available_seats >= seats_needed {
                alternatives.push(AlternativeFlight {
                    flight_id: candidate.id,
                    flight_number: candidate.flight_number.clone(),
                    departure_time: candidate.departure_time,
                    available_seats: status.available_seats,
                });
            }
        }

        Ok(Resolution {
            flight_id,
            cabin_class: cabin,
            seats_needed,
            compensation_amount: self.rules.compensation_for(cabin),
            compensation_type: self.rules.compensation_type,
            alternatives,
        })
    }

    pub async fn record(
        &self,
        input: NewDeniedBoarding,
        events: &mut Vec<InventoryEvent>,
    ) -> InventoryResult<DeniedBoardingRecord> {
        if input.compensation_amount < 0 {
            return Err(InventoryError::Validation("compensation_amount must not be negative".to_string()));
        }
        // Both flights must exist; the record is useless otherwise.
        self.status.load_flight(input.flight_id).await?;
        if let Some(alt) = input.alternative_flight_id {
            self.status.load_flight(alt).await?;
        }

        let now = self.clock.now();
        let record = DeniedBoardingRecord {
            id: Uuid::new_v4(),
            flight_id: input.flight_id,
            booking_id: input.booking_id,
            user_id: input.user_id,
            boarding_type: input.boarding_type,
            compensation_amount: input.compensation_amount,
            compensation_type: input.compensation_type,
            alternative_flight_id: input.alternative_flight_id,
            status: DeniedBoardingStatus::Pending,
            created_at: now,
            updated_at: now,
        };
        self.store.insert_denied_boarding(&record).await?;

        info!("Denied boarding {} recorded for booking {} on flight {}", record.id, record.booking_id, record.flight_id);
        events.push(InventoryEvent::DeniedBoardingRecorded(DeniedBoardingRecordedEvent {
            record_id: record.id,
            flight_id: record.flight_id,
            booking_id: record.booking_id,
            user_id: record.user_id.clone(),
            compensation_amount: record.compensation_amount,
            compensation_type: record.compensation_type.to_string(),
            timestamp: now.timestamp(),
        }));
        Ok(record)
    }

    pub async fn update_status(&self, id: Uuid, status: DeniedBoardingStatus) -> InventoryResult<DeniedBoardingRecord> {
        let mut record = self
            .store
            .get_denied_boarding(id)
            .await?
            .ok_or_else(|| InventoryError::NotFound(format!("denied boarding record {}", id)))?;

        record.transition(status, self.clock.now())?;
        self.store.update_denied_boarding(&record).await?;
        info!("Denied boarding {} moved to {}", id, status);
        Ok(record)
    }

    pub async fn list(&self, flight_id: Uuid) -> InventoryResult<Vec<DeniedBoardingRecord>> {
        Ok(self.store.list_denied_boardings(flight_id).await?)
    }
}

use futures_util::future::join_all;
use std::collections::HashMap;
use std::sync::Arc;
use tracing::{debug, error, info, warn};
use uuid::Uuid;

use skyhold_core::clock::Clock;
use skyhold_core::denied_boarding::{DeniedBoardingRecord, DeniedBoardingStatus, NewDeniedBoarding, Resolution};
use skyhold_core::events::EventPublisher;
use skyhold_core::flight::{Flight, FlightCabinCapacity};
use skyhold_core::forecast::ForecastPoint;
use skyhold_core::hold::{AllocationRequest, HoldResult, SeatHold};
use skyhold_core::overbooking::{NewOverbookingConfig, OverbookingConfig, OverbookingParams, OverbookingRecommendation};
use skyhold_core::repository::*;
use skyhold_core::rules::EngineRules;
use skyhold_core::status::InventoryStatus;
use skyhold_core::waitlist::{RemovalReason, WaitlistEntry};
use skyhold_core::{CabinClass, InventoryError, InventoryResult, PartitionKey};
use skyhold_shared::InventoryEvent;

use crate::denied::DeniedBoardingResolver;
use crate::forecast::DemandForecaster;
use crate::holds::{Conversion, HoldManager};
use crate::locks::PartitionLocks;
use crate::policy::OverbookingPolicy;
use crate::status::InventoryStatusService;
use crate::waitlist::{WaitlistManager, WaitlistPlacement};

/// The seat inventory service. Build one at start-up and share it behind an `Arc`.
///
/// All mutations of a (flight, cabin) partition run under that partition's lock;
/// events are published only after the lock is dropped.
pub struct InventoryEngine {
    store: Arc<dyn InventoryStore>,
    clock: Arc<dyn Clock>,
    publisher: Arc<dyn EventPublisher>,
    rules: EngineRules,
    locks: PartitionLocks,
    policy: Arc<OverbookingPolicy>,
    status: Arc<InventoryStatusService>,
    waitlist: Arc<WaitlistManager>,
    holds: HoldManager,
    denied: DeniedBoardingResolver,
    forecaster: DemandForecaster,
}

impl InventoryEngine {
    pub fn new(
        store: Arc<dyn InventoryStore>,
        publisher: Arc<dyn EventPublisher>,
        clock: Arc<dyn Clock>,
        rules: EngineRules,
    ) -> Self {
        let policy = Arc::new(OverbookingPolicy::new(store.clone(), rules.history_window));
        let status = Arc::new(InventoryStatusService::new(store.clone(), policy.clone(), clock.clone()));
        let waitlist = Arc::new(WaitlistManager::new(
            store.clone(),
            status.clone(),
            clock.clone(),
            rules.clone(),
        ));
        let holds = HoldManager::new(
            store.clone(),
            status.clone(),
            waitlist.clone(),
            clock.clone(),
            rules.clone(),
        );
        let denied = DeniedBoardingResolver::new(store.clone(), status.clone(), clock.clone(), rules.clone());
        let forecaster = DemandForecaster::new(store.clone(), status.clone(), clock.clone(), rules.history_window);

        Self {
            store,
            clock,
            publisher,
            rules,
            locks: PartitionLocks::new(),
            policy,
            status,
            waitlist,
            holds,
            denied,
            forecaster,
        }
    }

    pub fn rules(&self) -> &EngineRules {
        &self.rules
    }

    // ------------------------------------------------------------------
    // Reads
    // ------------------------------------------------------------------

    pub async fn get_inventory_status(&self, flight_id: Uuid, cabin: CabinClass) -> InventoryResult<InventoryStatus> {
        self.status.get_status(flight_id, cabin).await
    }

    /// Ledger view of one cabin.
    pub async fn get_capacity(&self, flight_id: Uuid, cabin: CabinClass) -> InventoryResult<FlightCabinCapacity> {
        let flight = self.status.load_flight(flight_id).await?;
        let sold = self.store.sold_seats(PartitionKey::new(flight_id, cabin)).await?;
        Ok(FlightCabinCapacity {
            flight_id,
            cabin_class: cabin,
            total_seats: flight.seats_for(cabin),
            sold_seats: sold,
        })
    }

    pub async fn get_hold(&self, id: Uuid) -> InventoryResult<SeatHold> {
        self.holds.find(id).await
    }

    pub async fn get_waitlist_entry(&self, id: Uuid) -> InventoryResult<WaitlistEntry> {
        self.waitlist.find(id).await
    }

    pub async fn get_overbooking_params(
        &self,
        flight_id: Uuid,
        cabin: CabinClass,
    ) -> InventoryResult<(OverbookingParams, i32)> {
        let flight = self.status.load_flight(flight_id).await?;
        let params = self.policy.resolve(&flight, cabin).await?;
        Ok((params, params.limit_for(flight.seats_for(cabin))))
    }

    pub async fn get_overbooking_limit(&self, flight_id: Uuid, cabin: CabinClass) -> InventoryResult<i32> {
        Ok(self.get_overbooking_params(flight_id, cabin).await?.1)
    }

    pub async fn recommend_overbooking(
        &self,
        flight_id: Uuid,
        cabin: CabinClass,
    ) -> InventoryResult<OverbookingRecommendation> {
        let flight = self.status.load_flight(flight_id).await?;
        self.policy.recommend(&flight, cabin).await
    }

    pub async fn forecast_demand(&self, flight_id: Uuid, days_ahead: u32) -> InventoryResult<Vec<ForecastPoint>> {
        self.forecaster.forecast(flight_id, days_ahead).await
    }

    // ------------------------------------------------------------------
    // Holds
    // ------------------------------------------------------------------

    pub async fn allocate_seats(&self, req: AllocationRequest) -> InventoryResult<HoldResult> {
        if req.seats < 1 {
            return Err(InventoryError::Validation("seats must be at least 1".to_string()));
        }
        let flight = self.status.load_flight(req.flight_id).await?;
        self.check_party_size(&flight, req.cabin_class, req.seats).await?;
        let key = PartitionKey::new(flight.id, req.cabin_class);

        let mut events = Vec::new();
        let result = {
            let _guard = self.locks.acquire(key).await;
            self.holds.allocate(&flight, &req, &mut events).await
        };

        self.publish_all(events).await;
        result
    }

    /// Release a hold and offer its seats to the waitlist before anyone else can
    /// allocate them. Releasing an already released hold only re-runs the cascade,
    /// so a retry after a failed cascade still serves the queue.
    pub async fn release_hold(&self, id: Uuid) -> InventoryResult<SeatHold> {
        let hold = self.holds.find(id).await?;
        let flight = self.status.load_flight(hold.flight_id).await?;
        let key = hold.partition();

        let mut events = Vec::new();
        let result: InventoryResult<()> = async {
            let _guard = self.locks.acquire(key).await;
            self.holds.release(id, &mut events).await?;
            self.waitlist.process(&flight, key.cabin_class, &mut events).await?;
            Ok(())
        }
        .await;

        self.publish_all(events).await;
        result?;
        self.holds.find(id).await
    }

    /// Called once per paid hold by the booking-confirmation collaborator.
    pub async fn convert_hold(&self, id: Uuid, booking_id: Uuid) -> InventoryResult<SeatHold> {
        let hold = self.holds.find(id).await?;
        let flight = self.status.load_flight(hold.flight_id).await?;
        let key = hold.partition();

        let mut events = Vec::new();
        let result: InventoryResult<SeatHold> = async {
            let _guard = self.locks.acquire(key).await;
            match self.holds.convert(id, booking_id, &mut events).await? {
                Conversion::Converted(hold) => Ok(hold),
                Conversion::Lapsed(hold) => {
                    warn!("Hold {} is {}; booking {} cannot convert it", id, hold.status, booking_id);
                    self.waitlist.process(&flight, key.cabin_class, &mut events).await?;
                    Err(InventoryError::InvalidStateTransition {
                        from: hold.status.to_string(),
                        to: "converted".to_string(),
                    })
                }
            }
        }
        .await;

        self.publish_all(events).await;
        result
    }

    /// A confirmed booking was cancelled upstream: give the seats back and cascade.
    ///
    /// An error means the ledger was not touched, so the call can be retried. Once the
    /// seats are back a failed cascade is only logged; the next allocation on the
    /// partition runs it again.
    pub async fn record_cancellation(&self, flight_id: Uuid, cabin: CabinClass, seats: i32) -> InventoryResult<i32> {
        if seats < 1 {
            return Err(InventoryError::Validation("seats must be at least 1".to_string()));
        }
        let flight = self.status.load_flight(flight_id).await?;
        let key = PartitionKey::new(flight_id, cabin);

        let mut events = Vec::new();
        let result: InventoryResult<i32> = async {
            let _guard = self.locks.acquire(key).await;
            let sold = self.store.adjust_sold_seats(key, -seats).await?;
            info!("Cancellation returned {} seat(s) on {}; {} sold", seats, key, sold);
            if let Err(e) = self.waitlist.process(&flight, cabin, &mut events).await {
                error!("Cascade after cancellation on {} failed: {}", key, e);
            }
            Ok(sold)
        }
        .await;

        self.publish_all(events).await;
        result
    }

    // ------------------------------------------------------------------
    // Waitlist
    // ------------------------------------------------------------------

    pub async fn add_to_waitlist(
        &self,
        flight_id: Uuid,
        cabin: CabinClass,
        seats: i32,
        owner_id: &str,
    ) -> InventoryResult<WaitlistPlacement> {
        if seats < 1 {
            return Err(InventoryError::Validation("seats must be at least 1".to_string()));
        }
        let flight = self.status.load_flight(flight_id).await?;
        self.check_party_size(&flight, cabin, seats).await?;
        let key = PartitionKey::new(flight_id, cabin);

        let mut events = Vec::new();
        let result: InventoryResult<WaitlistPlacement> = async {
            let _guard = self.locks.acquire(key).await;
            if !self.waitlist.accepts_entries(&flight, cabin).await? {
                return Err(InventoryError::InventoryExhausted(key));
            }
            self.waitlist.enqueue(key, owner_id, seats, &mut events).await
        }
        .await;

        self.publish_all(events).await;
        result
    }

    /// Terminal removal, idempotent. Cancelling a live offer returns its seats and
    /// cascades them to the next in line.
    pub async fn remove_from_waitlist(&self, id: Uuid, reason: RemovalReason) -> InventoryResult<WaitlistEntry> {
        let entry = self.waitlist.find(id).await?;
        let key = entry.partition();

        let mut events = Vec::new();
        let result: InventoryResult<WaitlistEntry> = async {
            let _guard = self.locks.acquire(key).await;
            let removal = self.waitlist.remove(id, reason).await?;
            if removal.freed_offer && reason != RemovalReason::Confirmed {
                let flight = self.status.load_flight(key.flight_id).await?;
                self.waitlist.process(&flight, key.cabin_class, &mut events).await?;
            }
            Ok(removal.entry)
        }
        .await;

        self.publish_all(events).await;
        result
    }

    /// Turn a live waitlist offer into a hold for the offered seats.
    pub async fn claim_offer(&self, id: Uuid, session_id: &str) -> InventoryResult<HoldResult> {
        let entry = self.waitlist.find(id).await?;
        let key = entry.partition();

        let mut events = Vec::new();
        let result: InventoryResult<HoldResult> = async {
            let _guard = self.locks.acquire(key).await;
            let entry = self.waitlist.take_offer(id).await?;
            let hold = self
                .holds
                .create_hold(key, entry.seats, &entry.owner_id, session_id, &mut events)
                .await?;
            Ok(HoldResult {
                allocated: hold.seats,
                hold_id: Some(hold.id),
                expires_at: Some(hold.expires_at),
                waitlist_id: Some(entry.id),
                waitlist_position: None,
            })
        }
        .await;

        self.publish_all(events).await;
        result
    }

    /// Run a cascade on demand.
    pub async fn process_waitlist(&self, flight_id: Uuid, cabin: CabinClass) -> InventoryResult<i32> {
        let flight = self.status.load_flight(flight_id).await?;
        let key = PartitionKey::new(flight_id, cabin);

        let mut events = Vec::new();
        let result = {
            let _guard = self.locks.acquire(key).await;
            self.waitlist.process(&flight, cabin, &mut events).await
        };

        self.publish_all(events).await;
        result
    }

    // ------------------------------------------------------------------
    // Sweeps
    // ------------------------------------------------------------------

    /// Expire overdue holds. One cascade per affected partition, each partition under
    /// its own lock and independent of the others.
    pub async fn expire_old_holds(&self) -> InventoryResult<usize> {
        let pruned = self.locks.prune();
        if pruned > 0 {
            debug!("Dropped {} idle partition lock(s)", pruned);
        }

        let overdue = self.store.overdue_holds(self.clock.now()).await?;
        if overdue.is_empty() {
            return Ok(0);
        }

        let mut by_partition: HashMap<PartitionKey, Vec<Uuid>> = HashMap::new();
        for hold in overdue {
            by_partition.entry(hold.partition()).or_default().push(hold.id);
        }

        let results = join_all(
            by_partition
                .into_iter()
                .map(|(key, ids)| self.expire_partition_holds(key, ids)),
        )
        .await;

        let expired: usize = results.into_iter().sum();
        if expired > 0 {
            info!("Hold sweep expired {} hold(s)", expired);
        }
        Ok(expired)
    }

    async fn expire_partition_holds(&self, key: PartitionKey, ids: Vec<Uuid>) -> usize {
        let mut events = Vec::new();
        let result: InventoryResult<usize> = async {
            let _guard = self.locks.acquire(key).await;
            let mut expired = 0;
            for id in ids {
                if self.holds.expire(id, &mut events).await? {
                    expired += 1;
                }
            }
            if expired > 0 {
                let flight = self.status.load_flight(key.flight_id).await?;
                self.waitlist.process(&flight, key.cabin_class, &mut events).await?;
            }
            Ok(expired)
        }
        .await;

        // Count what actually changed, even if the cascade failed afterwards.
        let changed = events
            .iter()
            .filter(|e| matches!(e, InventoryEvent::HoldExpired(_)))
            .count();
        self.publish_all(events).await;

        match result {
            Ok(n) => n,
            Err(e) => {
                error!("Hold expiry on {} failed: {}", key, e);
                changed
            }
        }
    }

    /// Expire lapsed waitlist offers. No cascade: the seats rejoin the pool and are
    /// picked up by the next natural trigger.
    pub async fn expire_waitlist_offers(&self) -> InventoryResult<usize> {
        let lapsed = self.store.lapsed_offers(self.clock.now()).await?;
        if lapsed.is_empty() {
            return Ok(0);
        }

        let mut by_partition: HashMap<PartitionKey, Vec<Uuid>> = HashMap::new();
        for entry in lapsed {
            by_partition.entry(entry.partition()).or_default().push(entry.id);
        }

        let mut expired = 0;
        for (key, ids) in by_partition {
            let mut events = Vec::new();
            let result: InventoryResult<()> = async {
                let _guard = self.locks.acquire(key).await;
                for id in ids {
                    self.waitlist.expire_offer(id, &mut events).await?;
                }
                Ok(())
            }
            .await;

            expired += events.len();
            self.publish_all(events).await;
            if let Err(e) = result {
                error!("Offer expiry on {} failed: {}", key, e);
            }
        }

        if expired > 0 {
            info!("Offer sweep expired {} offer(s)", expired);
        }
        Ok(expired)
    }

    // ------------------------------------------------------------------
    // Denied boarding
    // ------------------------------------------------------------------

    pub async fn handle_denied_boarding(
        &self,
        flight_id: Uuid,
        cabin: CabinClass,
        seats_needed: i32,
    ) -> InventoryResult<Resolution> {
        self.denied.resolve(flight_id, cabin, seats_needed).await
    }

    pub async fn record_denied_boarding(&self, input: NewDeniedBoarding) -> InventoryResult<DeniedBoardingRecord> {
        let mut events = Vec::new();
        let result = self.denied.record(input, &mut events).await;
        self.publish_all(events).await;
        result
    }

    pub async fn update_denied_boarding_status(
        &self,
        id: Uuid,
        status: DeniedBoardingStatus,
    ) -> InventoryResult<DeniedBoardingRecord> {
        self.denied.update_status(id, status).await
    }

    pub async fn list_denied_boardings(&self, flight_id: Uuid) -> InventoryResult<Vec<DeniedBoardingRecord>> {
        self.denied.list(flight_id).await
    }

    // ------------------------------------------------------------------
    // Overbooking administration
    // ------------------------------------------------------------------

    pub async fn create_overbooking_config(&self, input: NewOverbookingConfig) -> InventoryResult<OverbookingConfig> {
        input.validate()?;
        let config = input.into_config(self.clock.now());
        self.store.insert_config(&config).await?;
        info!("Overbooking config {} created", config.id);
        Ok(config)
    }

    pub async fn deactivate_overbooking_config(&self, id: Uuid) -> InventoryResult<()> {
        if !self.store.deactivate_config(id).await? {
            return Err(InventoryError::NotFound(format!("active overbooking config {}", id)));
        }
        info!("Overbooking config {} deactivated", id);
        Ok(())
    }

    /// Mirror a flight scheduled upstream into the store.
    pub async fn upsert_flight(&self, flight: Flight) -> InventoryResult<Flight> {
        if flight.economy_seats < 0 || flight.business_seats < 0 {
            return Err(InventoryError::Validation("seat counts must not be negative".to_string()));
        }
        self.store.upsert_flight(&flight).await?;
        info!("Flight {} ({}) upserted", flight.id, flight.flight_number);
        Ok(flight)
    }

    /// A party larger than the cabin plus its overbooking allowance can never be
    /// seated, so it is refused outright instead of waiting forever.
    async fn check_party_size(&self, flight: &Flight, cabin: CabinClass, seats: i32) -> InventoryResult<()> {
        let total = flight.seats_for(cabin);
        let params = self.policy.resolve(flight, cabin).await?;
        let ceiling = total.saturating_add(params.limit_for(total));
        if seats > ceiling {
            return Err(InventoryError::Validation(format!(
                "{} seat(s) requested but {} {} holds at most {}",
                seats, flight.flight_number, cabin, ceiling
            )));
        }
        Ok(())
    }

    async fn publish_all(&self, events: Vec<InventoryEvent>) {
        for event in events {
            if let Err(e) = self.publisher.publish(&event).await {
                warn!("Dropping {} event for flight {}: {}", event.topic(), event.flight_id(), e);
            }
        }
    }
}

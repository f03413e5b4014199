use async_trait::async_trait;
use chrono::{DateTime, Duration, TimeZone, Utc};
use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use uuid::Uuid;

use skyhold_core::clock::ManualClock;
use skyhold_core::denied_boarding::DeniedBoardingRecord;
use skyhold_core::flight::{CompletedFlightStats, Flight, FlightStatus};
use skyhold_core::hold::{AllocationRequest, HoldStatus, SeatHold};
use skyhold_core::overbooking::OverbookingConfig;
use skyhold_core::repository::*;
use skyhold_core::rules::EngineRules;
use skyhold_core::waitlist::{WaitlistEntry, WaitlistStatus};
use skyhold_core::{CabinClass, InventoryError, PartitionKey};
use skyhold_inventory::{BroadcastPublisher, InventoryEngine, MemoryStore};

/// Memory store that fails chosen operations a set number of times.
struct FlakyStore {
    inner: MemoryStore,
    armed: Mutex<HashMap<&'static str, usize>>,
}

impl FlakyStore {
    fn new() -> Self {
        Self {
            inner: MemoryStore::new(),
            armed: Mutex::new(HashMap::new()),
        }
    }

    fn fail_once(&self, op: &'static str) {
        *self.armed.lock().unwrap().entry(op).or_insert(0) += 1;
    }

    fn trip(&self, op: &'static str) -> StoreResult<()> {
        let mut armed = self.armed.lock().unwrap();
        match armed.get_mut(op) {
            Some(left) if *left > 0 => {
                *left -= 1;
                Err(StoreError::Unavailable(format!("{} failed", op)))
            }
            _ => Ok(()),
        }
    }
}

#[async_trait]
impl FlightRepository for FlakyStore {
    async fn get_flight(&self, id: Uuid) -> StoreResult<Option<Flight>> {
        self.trip("get_flight")?;
        self.inner.get_flight(id).await
    }

    async fn find_route_flights(
        &self,
        origin_id: &str,
        destination_id: &str,
        departing_from: DateTime<Utc>,
    ) -> StoreResult<Vec<Flight>> {
        self.trip("find_route_flights")?;
        self.inner.find_route_flights(origin_id, destination_id, departing_from).await
    }

    async fn upsert_flight(&self, flight: &Flight) -> StoreResult<()> {
        self.trip("upsert_flight")?;
        self.inner.upsert_flight(flight).await
    }
}

#[async_trait]
impl LedgerRepository for FlakyStore {
    async fn sold_seats(&self, key: PartitionKey) -> StoreResult<i32> {
        self.trip("sold_seats")?;
        self.inner.sold_seats(key).await
    }

    async fn adjust_sold_seats(&self, key: PartitionKey, delta: i32) -> StoreResult<i32> {
        self.trip("adjust_sold_seats")?;
        self.inner.adjust_sold_seats(key, delta).await
    }

    async fn commit_conversion(&self, hold: &SeatHold) -> StoreResult<Option<i32>> {
        self.trip("commit_conversion")?;
        self.inner.commit_conversion(hold).await
    }
}

#[async_trait]
impl HoldRepository for FlakyStore {
    async fn insert_hold(&self, hold: &SeatHold) -> StoreResult<()> {
        self.trip("insert_hold")?;
        self.inner.insert_hold(hold).await
    }

    async fn get_hold(&self, id: Uuid) -> StoreResult<Option<SeatHold>> {
        self.trip("get_hold")?;
        self.inner.get_hold(id).await
    }

    async fn update_hold(&self, hold: &SeatHold) -> StoreResult<()> {
        self.trip("update_hold")?;
        self.inner.update_hold(hold).await
    }

    async fn live_held_seats(&self, key: PartitionKey, now: DateTime<Utc>) -> StoreResult<i32> {
        self.trip("live_held_seats")?;
        self.inner.live_held_seats(key, now).await
    }

    async fn overdue_holds(&self, now: DateTime<Utc>) -> StoreResult<Vec<SeatHold>> {
        self.trip("overdue_holds")?;
        self.inner.overdue_holds(now).await
    }
}

#[async_trait]
impl WaitlistRepository for FlakyStore {
    async fn insert_entry(&self, entry: &WaitlistEntry) -> StoreResult<()> {
        self.trip("insert_entry")?;
        self.inner.insert_entry(entry).await
    }

    async fn get_entry(&self, id: Uuid) -> StoreResult<Option<WaitlistEntry>> {
        self.trip("get_entry")?;
        self.inner.get_entry(id).await
    }

    async fn update_entry(&self, entry: &WaitlistEntry) -> StoreResult<()> {
        self.trip("update_entry")?;
        self.inner.update_entry(entry).await
    }

    async fn max_priority(&self, key: PartitionKey) -> StoreResult<i64> {
        self.trip("max_priority")?;
        self.inner.max_priority(key).await
    }

    async fn waiting_entries(&self, key: PartitionKey, limit: usize) -> StoreResult<Vec<WaitlistEntry>> {
        self.trip("waiting_entries")?;
        self.inner.waiting_entries(key, limit).await
    }

    async fn count_waiting(&self, key: PartitionKey) -> StoreResult<i64> {
        self.trip("count_waiting")?;
        self.inner.count_waiting(key).await
    }

    async fn waiting_position(&self, key: PartitionKey, priority: i64) -> StoreResult<i64> {
        self.trip("waiting_position")?;
        self.inner.waiting_position(key, priority).await
    }

    async fn live_offered_seats(&self, key: PartitionKey, now: DateTime<Utc>) -> StoreResult<i32> {
        self.trip("live_offered_seats")?;
        self.inner.live_offered_seats(key, now).await
    }

    async fn lapsed_offers(&self, now: DateTime<Utc>) -> StoreResult<Vec<WaitlistEntry>> {
        self.trip("lapsed_offers")?;
        self.inner.lapsed_offers(now).await
    }
}

#[async_trait]
impl OverbookingRepository for FlakyStore {
    async fn active_configs(&self) -> StoreResult<Vec<OverbookingConfig>> {
        self.trip("active_configs")?;
        self.inner.active_configs().await
    }

    async fn insert_config(&self, config: &OverbookingConfig) -> StoreResult<()> {
        self.trip("insert_config")?;
        self.inner.insert_config(config).await
    }

    async fn deactivate_config(&self, id: Uuid) -> StoreResult<bool> {
        self.trip("deactivate_config")?;
        self.inner.deactivate_config(id).await
    }
}

#[async_trait]
impl HistoryRepository for FlakyStore {
    async fn completed_flights(
        &self,
        origin_id: &str,
        destination_id: &str,
        limit: usize,
    ) -> StoreResult<Vec<CompletedFlightStats>> {
        self.trip("completed_flights")?;
        self.inner.completed_flights(origin_id, destination_id, limit).await
    }
}

#[async_trait]
impl DeniedBoardingRepository for FlakyStore {
    async fn insert_denied_boarding(&self, record: &DeniedBoardingRecord) -> StoreResult<()> {
        self.trip("insert_denied_boarding")?;
        self.inner.insert_denied_boarding(record).await
    }

    async fn get_denied_boarding(&self, id: Uuid) -> StoreResult<Option<DeniedBoardingRecord>> {
        self.trip("get_denied_boarding")?;
        self.inner.get_denied_boarding(id).await
    }

    async fn update_denied_boarding(&self, record: &DeniedBoardingRecord) -> StoreResult<()> {
        self.trip("update_denied_boarding")?;
        self.inner.update_denied_boarding(record).await
    }

    async fn list_denied_boardings(&self, flight_id: Uuid) -> StoreResult<Vec<DeniedBoardingRecord>> {
        self.trip("list_denied_boardings")?;
        self.inner.list_denied_boardings(flight_id).await
    }
}

struct Harness {
    engine: InventoryEngine,
    store: Arc<FlakyStore>,
    flight: Flight,
}

async fn two_seat_flight() -> Harness {
    let start = Utc.with_ymd_and_hms(2026, 3, 1, 12, 0, 0).unwrap();
    let store = Arc::new(FlakyStore::new());
    let engine = InventoryEngine::new(
        store.clone(),
        Arc::new(BroadcastPublisher::new(64)),
        Arc::new(ManualClock::new(start)),
        EngineRules::default(),
    );
    let flight = Flight {
        id: Uuid::new_v4(),
        flight_number: "SK402".to_string(),
        airline_id: "SK".to_string(),
        origin_id: "CPH".to_string(),
        destination_id: "OSL".to_string(),
        departure_time: start + Duration::days(30),
        status: FlightStatus::Scheduled,
        economy_seats: 2,
        business_seats: 0,
    };
    store.upsert_flight(&flight).await.unwrap();
    Harness { engine, store, flight }
}

impl Harness {
    async fn allocate(&self, seats: i32, owner: &str) -> skyhold_core::hold::HoldResult {
        self.engine
            .allocate_seats(AllocationRequest {
                flight_id: self.flight.id,
                cabin_class: CabinClass::Economy,
                seats,
                owner_id: owner.to_string(),
                session_id: format!("session-{}", owner),
            })
            .await
            .unwrap()
    }

    async fn entry_status(&self, id: Uuid) -> WaitlistStatus {
        self.engine.get_waitlist_entry(id).await.unwrap().status
    }
}

#[tokio::test]
async fn test_failed_conversion_leaves_hold_active_for_retry() {
    let h = two_seat_flight().await;
    let hold_id = h.allocate(2, "user-a").await.hold_id.unwrap();
    let booking = Uuid::new_v4();

    h.store.fail_once("commit_conversion");
    let first = h.engine.convert_hold(hold_id, booking).await;
    assert!(matches!(first, Err(InventoryError::PersistenceUnavailable(_))));
    assert_eq!(h.engine.get_hold(hold_id).await.unwrap().status, HoldStatus::Active);

    let retry = h.engine.convert_hold(hold_id, booking).await.unwrap();
    assert_eq!(retry.status, HoldStatus::Converted);

    let status = h.engine.get_inventory_status(h.flight.id, CabinClass::Economy).await.unwrap();
    assert_eq!(status.sold_seats, 2);
    assert_eq!(status.held_seats, 0);

    let late = h.allocate(2, "user-b").await;
    assert_eq!(late.allocated, 0);
    assert!(late.waitlist_id.is_some());
}

#[tokio::test]
async fn test_release_retry_runs_the_missed_cascade() {
    let h = two_seat_flight().await;
    let hold_id = h.allocate(2, "user-a").await.hold_id.unwrap();
    let waiter = h.allocate(2, "user-b").await.waitlist_id.unwrap();

    h.store.fail_once("update_entry");
    let first = h.engine.release_hold(hold_id).await;
    assert!(matches!(first, Err(InventoryError::PersistenceUnavailable(_))));
    assert_eq!(h.engine.get_hold(hold_id).await.unwrap().status, HoldStatus::Released);
    assert_eq!(h.entry_status(waiter).await, WaitlistStatus::Waiting);

    let retry = h.engine.release_hold(hold_id).await.unwrap();
    assert_eq!(retry.status, HoldStatus::Released);
    assert_eq!(h.entry_status(waiter).await, WaitlistStatus::Offered);

    let cold = h.allocate(2, "user-c").await;
    assert_eq!(cold.allocated, 0);
}

#[tokio::test]
async fn test_new_allocation_serves_queue_after_failed_cascade() {
    let h = two_seat_flight().await;
    let hold_id = h.allocate(2, "user-a").await.hold_id.unwrap();
    let waiter = h.allocate(2, "user-b").await.waitlist_id.unwrap();

    h.store.fail_once("update_entry");
    assert!(h.engine.release_hold(hold_id).await.is_err());

    let cold = h.allocate(2, "user-c").await;
    assert_eq!(cold.allocated, 0);
    assert_eq!(h.entry_status(waiter).await, WaitlistStatus::Offered);
    assert_eq!(cold.waitlist_position, Some(1));
}

#[tokio::test]
async fn test_cancellation_with_failed_cascade_is_not_counted_twice() {
    let h = two_seat_flight().await;
    let key = PartitionKey::new(h.flight.id, CabinClass::Economy);
    h.store.inner.set_sold_seats(key, 2).await;
    let waiter = h.allocate(1, "user-w").await.waitlist_id.unwrap();

    h.store.fail_once("waiting_entries");
    let sold = h
        .engine
        .record_cancellation(h.flight.id, CabinClass::Economy, 1)
        .await
        .unwrap();
    assert_eq!(sold, 1);
    assert_eq!(h.entry_status(waiter).await, WaitlistStatus::Waiting);

    let cold = h.allocate(1, "user-c").await;
    assert_eq!(cold.allocated, 0);
    assert_eq!(h.entry_status(waiter).await, WaitlistStatus::Offered);

    let status = h.engine.get_inventory_status(h.flight.id, CabinClass::Economy).await.unwrap();
    assert_eq!(status.sold_seats, 1);
    assert_eq!(status.offered_seats, 1);
    assert_eq!(status.effective_available, 0);
}

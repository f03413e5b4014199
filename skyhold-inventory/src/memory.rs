use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use tokio::sync::RwLock;
use uuid::Uuid;

use skyhold_core::denied_boarding::DeniedBoardingRecord;
use skyhold_core::flight::{CompletedFlightStats, Flight};
use skyhold_core::hold::{HoldStatus, SeatHold};
use skyhold_core::overbooking::OverbookingConfig;
use skyhold_core::repository::*;
use skyhold_core::waitlist::{WaitlistEntry, WaitlistStatus};
use skyhold_core::PartitionKey;

#[derive(Default)]
struct MemoryState {
    flights: HashMap<Uuid, Flight>,
    sold: HashMap<PartitionKey, i32>,
    holds: HashMap<Uuid, SeatHold>,
    waitlist: HashMap<Uuid, WaitlistEntry>,
    configs: HashMap<Uuid, OverbookingConfig>,
    history: Vec<CompletedFlightStats>,
    denied: HashMap<Uuid, DeniedBoardingRecord>,
}

/// In-memory store for tests and single-node deployments
pub struct MemoryStore {
    state: RwLock<MemoryState>,
    online: AtomicBool,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self {
            state: RwLock::new(MemoryState::default()),
            online: AtomicBool::new(true),
        }
    }

    /// Simulate the backend going away; every call fails until switched back.
    pub fn set_online(&self, online: bool) {
        self.online.store(online, Ordering::SeqCst);
    }

    pub async fn record_completed_flight(&self, stats: CompletedFlightStats) {
        self.state.write().await.history.push(stats);
    }

    /// Seed the ledger directly, bypassing conversion. Test setup only.
    pub async fn set_sold_seats(&self, key: PartitionKey, sold: i32) {
        self.state.write().await.sold.insert(key, sold.max(0));
    }

    pub async fn holds_for(&self, key: PartitionKey) -> Vec<SeatHold> {
        let state = self.state.read().await;
        state.holds.values().filter(|h| h.partition() == key).cloned().collect()
    }

    fn check(&self) -> StoreResult<()> {
        if self.online.load(Ordering::SeqCst) {
            Ok(())
        } else {
            Err(StoreError::Unavailable("memory store offline".to_string()))
        }
    }
}

impl Default for MemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl FlightRepository for MemoryStore {
    async fn get_flight(&self, id: Uuid) -> StoreResult<Option<Flight>> {
        self.check()?;
        Ok(self.state.read().await.flights.get(&id).cloned())
    }

    async fn find_route_flights(
        &self,
        origin_id: &str,
        destination_id: &str,
        departing_from: DateTime<Utc>,
    ) -> StoreResult<Vec<Flight>> {
        self.check()?;
        let state = self.state.read().await;
        let mut flights: Vec<Flight> = state
            .flights
            .values()
            .filter(|f| {
                f.origin_id == origin_id
                    && f.destination_id == destination_id
                    && f.departure_time >= departing_from
            })
            .cloned()
            .collect();
        flights.sort_by_key(|f| f.departure_time);
        Ok(flights)
    }

    async fn upsert_flight(&self, flight: &Flight) -> StoreResult<()> {
        self.check()?;
        self.state.write().await.flights.insert(flight.id, flight.clone());
        Ok(())
    }
}

#[async_trait]
impl LedgerRepository for MemoryStore {
    async fn sold_seats(&self, key: PartitionKey) -> StoreResult<i32> {
        self.check()?;
        Ok(self.state.read().await.sold.get(&key).copied().unwrap_or(0))
    }

    async fn adjust_sold_seats(&self, key: PartitionKey, delta: i32) -> StoreResult<i32> {
        self.check()?;
        let mut state = self.state.write().await;
        let sold = state.sold.entry(key).or_insert(0);
        *sold = (*sold + delta).max(0);
        Ok(*sold)
    }

    async fn commit_conversion(&self, hold: &SeatHold) -> StoreResult<Option<i32>> {
        self.check()?;
        let mut state = self.state.write().await;
        match state.holds.get(&hold.id) {
            Some(stored) if stored.status == HoldStatus::Active => {}
            _ => return Ok(None),
        }

        state.holds.insert(hold.id, hold.clone());
        let sold = state.sold.entry(hold.partition()).or_insert(0);
        *sold = (*sold + hold.seats).max(0);
        Ok(Some(*sold))
    }
}

#[async_trait]
impl HoldRepository for MemoryStore {
    async fn insert_hold(&self, hold: &SeatHold) -> StoreResult<()> {
        self.check()?;
        self.state.write().await.holds.insert(hold.id, hold.clone());
        Ok(())
    }

    async fn get_hold(&self, id: Uuid) -> StoreResult<Option<SeatHold>> {
        self.check()?;
        Ok(self.state.read().await.holds.get(&id).cloned())
    }

    async fn update_hold(&self, hold: &SeatHold) -> StoreResult<()> {
        self.check()?;
        let mut state = self.state.write().await;
        if let Some(stored) = state.holds.get_mut(&hold.id) {
            if stored.status == HoldStatus::Active {
                *stored = hold.clone();
            }
        }
        Ok(())
    }

    async fn live_held_seats(&self, key: PartitionKey, now: DateTime<Utc>) -> StoreResult<i32> {
        self.check()?;
        let state = self.state.read().await;
        Ok(state
            .holds
            .values()
            .filter(|h| h.partition() == key && h.is_live(now))
            .map(|h| h.seats)
            .sum())
    }

    async fn overdue_holds(&self, now: DateTime<Utc>) -> StoreResult<Vec<SeatHold>> {
        self.check()?;
        let state = self.state.read().await;
        Ok(state
            .holds
            .values()
            .filter(|h| h.status == HoldStatus::Active && h.expires_at < now)
            .cloned()
            .collect())
    }
}

#[async_trait]
impl WaitlistRepository for MemoryStore {
    async fn insert_entry(&self, entry: &WaitlistEntry) -> StoreResult<()> {
        self.check()?;
        self.state.write().await.waitlist.insert(entry.id, entry.clone());
        Ok(())
    }

    async fn get_entry(&self, id: Uuid) -> StoreResult<Option<WaitlistEntry>> {
        self.check()?;
        Ok(self.state.read().await.waitlist.get(&id).cloned())
    }

    async fn update_entry(&self, entry: &WaitlistEntry) -> StoreResult<()> {
        self.check()?;
        self.state.write().await.waitlist.insert(entry.id, entry.clone());
        Ok(())
    }

    async fn max_priority(&self, key: PartitionKey) -> StoreResult<i64> {
        self.check()?;
        let state = self.state.read().await;
        Ok(state
            .waitlist
            .values()
            .filter(|e| e.partition() == key)
            .map(|e| e.priority)
            .max()
            .unwrap_or(0))
    }

    async fn waiting_entries(&self, key: PartitionKey, limit: usize) -> StoreResult<Vec<WaitlistEntry>> {
        self.check()?;
        let state = self.state.read().await;
        let mut entries: Vec<WaitlistEntry> = state
            .waitlist
            .values()
            .filter(|e| e.partition() == key && e.status == WaitlistStatus::Waiting)
            .cloned()
            .collect();
        entries.sort_by_key(|e| e.priority);
        entries.truncate(limit);
        Ok(entries)
    }

    async fn count_waiting(&self, key: PartitionKey) -> StoreResult<i64> {
        self.check()?;
        let state = self.state.read().await;
        Ok(state
            .waitlist
            .values()
            .filter(|e| e.partition() == key && e.status == WaitlistStatus::Waiting)
            .count() as i64)
    }

    async fn waiting_position(&self, key: PartitionKey, priority: i64) -> StoreResult<i64> {
        self.check()?;
        let state = self.state.read().await;
        Ok(state
            .waitlist
            .values()
            .filter(|e| {
                e.partition() == key && e.status == WaitlistStatus::Waiting && e.priority <= priority
            })
            .count() as i64)
    }

    async fn live_offered_seats(&self, key: PartitionKey, now: DateTime<Utc>) -> StoreResult<i32> {
        self.check()?;
        let state = self.state.read().await;
        Ok(state
            .waitlist
            .values()
            .filter(|e| e.partition() == key && e.has_live_offer(now))
            .map(|e| e.seats)
            .sum())
    }

    async fn lapsed_offers(&self, now: DateTime<Utc>) -> StoreResult<Vec<WaitlistEntry>> {
        self.check()?;
        let state = self.state.read().await;
        Ok(state
            .waitlist
            .values()
            .filter(|e| {
                e.status == WaitlistStatus::Offered
                    && e.offer_expires_at.map(|at| at < now).unwrap_or(true)
            })
            .cloned()
            .collect())
    }
}

#[async_trait]
impl OverbookingRepository for MemoryStore {
    async fn active_configs(&self) -> StoreResult<Vec<OverbookingConfig>> {
        self.check()?;
        let state = self.state.read().await;
        Ok(state.configs.values().filter(|c| c.is_active).cloned().collect())
    }

    async fn insert_config(&self, config: &OverbookingConfig) -> StoreResult<()> {
        self.check()?;
        self.state.write().await.configs.insert(config.id, config.clone());
        Ok(())
    }

    async fn deactivate_config(&self, id: Uuid) -> StoreResult<bool> {
        self.check()?;
        let mut state = self.state.write().await;
        match state.configs.get_mut(&id) {
            Some(config) if config.is_active => {
                config.is_active = false;
                Ok(true)
            }
            _ => Ok(false),
        }
    }
}

#[async_trait]
impl HistoryRepository for MemoryStore {
    async fn completed_flights(
        &self,
        origin_id: &str,
        destination_id: &str,
        limit: usize,
    ) -> StoreResult<Vec<CompletedFlightStats>> {
        self.check()?;
        let state = self.state.read().await;
        let mut rows: Vec<CompletedFlightStats> = state
            .history
            .iter()
            .filter(|s| s.origin_id == origin_id && s.destination_id == destination_id)
            .cloned()
            .collect();
        rows.sort_by(|a, b| b.departure_time.cmp(&a.departure_time));
        rows.truncate(limit);
        Ok(rows)
    }
}

#[async_trait]
impl DeniedBoardingRepository for MemoryStore {
    async fn insert_denied_boarding(&self, record: &DeniedBoardingRecord) -> StoreResult<()> {
        self.check()?;
        self.state.write().await.denied.insert(record.id, record.clone());
        Ok(())
    }

    async fn get_denied_boarding(&self, id: Uuid) -> StoreResult<Option<DeniedBoardingRecord>> {
        self.check()?;
        Ok(self.state.read().await.denied.get(&id).cloned())
    }

    async fn update_denied_boarding(&self, record: &DeniedBoardingRecord) -> StoreResult<()> {
        self.check()?;
        self.state.write().await.denied.insert(record.id, record.clone());
        Ok(())
    }

    async fn list_denied_boardings(&self, flight_id: Uuid) -> StoreResult<Vec<DeniedBoardingRecord>> {
        self.check()?;
        let state = self.state.read().await;
        let mut records: Vec<DeniedBoardingRecord> = state
            .denied
            .values()
            .filter(|r| r.flight_id == flight_id)
            .cloned()
            .collect();
        records.sort_by_key(|r| r.created_at);
        Ok(records)
    }
}

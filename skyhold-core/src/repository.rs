use async_trait::async_trait;
use chrono::{DateTime, Utc};
use uuid::Uuid;

use crate::denied_boarding::DeniedBoardingRecord;
use crate::flight::{CompletedFlightStats, Flight};
use crate::hold::SeatHold;
use crate::overbooking::OverbookingConfig;
use crate::waitlist::WaitlistEntry;
use crate::PartitionKey;

/// Failure of the persistence collaborator. The engine never retries these.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("Storage backend unavailable: {0}")]
    Unavailable(String),
    #[error("Stored data could not be decoded: {0}")]
    Corrupt(String),
}

pub type StoreResult<T> = Result<T, StoreError>;

/// Repository trait for flight data access
#[async_trait]
pub trait FlightRepository: Send + Sync {
    async fn get_flight(&self, id: Uuid) -> StoreResult<Option<Flight>>;

    /// Flights on the route departing at or after `departing_from`, earliest first.
    async fn find_route_flights(
        &self,
        origin_id: &str,
        destination_id: &str,
        departing_from: DateTime<Utc>,
    ) -> StoreResult<Vec<Flight>>;

    async fn upsert_flight(&self, flight: &Flight) -> StoreResult<()>;
}

/// Sold-seat counters. Mutated only by conversion and external cancellation.
#[async_trait]
pub trait LedgerRepository: Send + Sync {
    async fn sold_seats(&self, key: PartitionKey) -> StoreResult<i32>;

    /// Applies `delta` and returns the new count, never going below zero.
    async fn adjust_sold_seats(&self, key: PartitionKey, delta: i32) -> StoreResult<i32>;

    /// Stores `hold` (already marked converted) and adds its seats to the sold count
    /// in one atomic write. `None` when the stored hold was no longer active, in
    /// which case nothing changed.
    async fn commit_conversion(&self, hold: &SeatHold) -> StoreResult<Option<i32>>;
}

#[async_trait]
pub trait HoldRepository: Send + Sync {
    async fn insert_hold(&self, hold: &SeatHold) -> StoreResult<()>;

    async fn get_hold(&self, id: Uuid) -> StoreResult<Option<SeatHold>>;

    /// Writes a transition out of `active`. A stored hold that is no longer active
    /// is left as it is.
    async fn update_hold(&self, hold: &SeatHold) -> StoreResult<()>;

    /// Seats in active holds with `expires_at > now`.
    async fn live_held_seats(&self, key: PartitionKey, now: DateTime<Utc>) -> StoreResult<i32>;

    /// Active holds whose `expires_at` is before `now`, across all partitions.
    async fn overdue_holds(&self, now: DateTime<Utc>) -> StoreResult<Vec<SeatHold>>;
}

#[async_trait]
pub trait WaitlistRepository: Send + Sync {
    async fn insert_entry(&self, entry: &WaitlistEntry) -> StoreResult<()>;

    async fn get_entry(&self, id: Uuid) -> StoreResult<Option<WaitlistEntry>>;

    async fn update_entry(&self, entry: &WaitlistEntry) -> StoreResult<()>;

    /// Highest priority ever issued in the partition, 0 when none.
    async fn max_priority(&self, key: PartitionKey) -> StoreResult<i64>;

    /// Waiting entries in ascending priority.
    async fn waiting_entries(&self, key: PartitionKey, limit: usize) -> StoreResult<Vec<WaitlistEntry>>;

    async fn count_waiting(&self, key: PartitionKey) -> StoreResult<i64>;

    /// Waiting entries with priority at or below `priority` (1-based queue position).
    async fn waiting_position(&self, key: PartitionKey, priority: i64) -> StoreResult<i64>;

    /// Seats in offered entries whose window is still open.
    async fn live_offered_seats(&self, key: PartitionKey, now: DateTime<Utc>) -> StoreResult<i32>;

    /// Offered entries whose window closed before `now`.
    async fn lapsed_offers(&self, now: DateTime<Utc>) -> StoreResult<Vec<WaitlistEntry>>;
}

#[async_trait]
pub trait OverbookingRepository: Send + Sync {
    async fn active_configs(&self) -> StoreResult<Vec<OverbookingConfig>>;

    async fn insert_config(&self, config: &OverbookingConfig) -> StoreResult<()>;

    /// Returns false when no active config has this id.
    async fn deactivate_config(&self, id: Uuid) -> StoreResult<bool>;
}

/// History of operated flights, read-only.
#[async_trait]
pub trait HistoryRepository: Send + Sync {
    /// Most recent first, at most `limit` rows.
    async fn completed_flights(
        &self,
        origin_id: &str,
        destination_id: &str,
        limit: usize,
    ) -> StoreResult<Vec<CompletedFlightStats>>;
}

#[async_trait]
pub trait DeniedBoardingRepository: Send + Sync {
    async fn insert_denied_boarding(&self, record: &DeniedBoardingRecord) -> StoreResult<()>;

    async fn get_denied_boarding(&self, id: Uuid) -> StoreResult<Option<DeniedBoardingRecord>>;

    async fn update_denied_boarding(&self, record: &DeniedBoardingRecord) -> StoreResult<()>;

    async fn list_denied_boardings(&self, flight_id: Uuid) -> StoreResult<Vec<DeniedBoardingRecord>>;
}

/// Everything the engine needs from storage.
pub trait InventoryStore:
    FlightRepository
    + LedgerRepository
    + HoldRepository
    + WaitlistRepository
    + OverbookingRepository
    + HistoryRepository
    + DeniedBoardingRepository
{
}

impl<T> InventoryStore for T where
    T: FlightRepository
        + LedgerRepository
        + HoldRepository
        + WaitlistRepository
        + OverbookingRepository
        + HistoryRepository
        + DeniedBoardingRepository
{
}

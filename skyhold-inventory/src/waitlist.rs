use std::sync::Arc;
use tracing::{debug, info};
use uuid::Uuid;

use skyhold_core::clock::Clock;
use skyhold_core::flight::Flight;
use skyhold_core::repository::*;
use skyhold_core::rules::EngineRules;
use skyhold_core::waitlist::{CascadePolicy, RemovalReason, WaitlistEntry, WaitlistStatus};
use skyhold_core::{CabinClass, InventoryError, InventoryResult, PartitionKey};
use skyhold_shared::models::events::{WaitlistJoinedEvent, WaitlistOfferExpiredEvent, WaitlistOfferedEvent};
use skyhold_shared::InventoryEvent;

use crate::status::InventoryStatusService;

/// An entry together with its current place in the queue.
#[derive(Debug, Clone, serde::Serialize)]
pub struct WaitlistPlacement {
    pub entry: WaitlistEntry,
    pub position: i64,
}

/// Outcome of a removal request.
#[derive(Debug, Clone)]
pub struct Removal {
    pub entry: WaitlistEntry,
    /// The entry was holding a live offer, so its seats went back to the pool.
    pub freed_offer: bool,
}

/// Priority queue of unsatisfied requests per partition.
///
/// Methods that change an entry's status expect the caller to hold the partition lock.
pub struct WaitlistManager {
    store: Arc<dyn InventoryStore>,
    status: Arc<InventoryStatusService>,
    clock: Arc<dyn Clock>,
    rules: EngineRules,
}

impl WaitlistManager {
    pub fn new(
        store: Arc<dyn InventoryStore>,
        status: Arc<InventoryStatusService>,
        clock: Arc<dyn Clock>,
        rules: EngineRules,
    ) -> Self {
        Self { store, status, clock, rules }
    }

    pub async fn find(&self, id: Uuid) -> InventoryResult<WaitlistEntry> {
        self.store
            .get_entry(id)
            .await?
            .ok_or_else(|| InventoryError::NotFound(format!("waitlist entry {}", id)))
    }

    /// A partition takes new entries while the flight is on sale and the queue is
    /// below its depth limit.
    pub async fn accepts_entries(&self, flight: &Flight, cabin: CabinClass) -> InventoryResult<bool> {
        if !flight.is_open_for_sale(self.clock.now()) {
            return Ok(false);
        }
        let waiting = self.store.count_waiting(PartitionKey::new(flight.id, cabin)).await?;
        Ok(waiting < self.rules.max_waitlist_depth)
    }

    pub async fn enqueue(
        &self,
        key: PartitionKey,
        owner_id: &str,
        seats: i32,
        events: &mut Vec<InventoryEvent>,
    ) -> InventoryResult<WaitlistPlacement> {
        let priority = self.store.max_priority(key).await? + 1;
        let entry = WaitlistEntry::new(key, owner_id.to_string(), seats, priority, self.clock.now());
        self.store.insert_entry(&entry).await?;
        let position = self.store.waiting_position(key, priority).await?;

        info!("Waitlisted {} seat(s) on {} for {} at position {}", seats, key, owner_id, position);
        events.push(InventoryEvent::WaitlistJoined(WaitlistJoinedEvent {
            entry_id: entry.id,
            flight_id: key.flight_id,
            cabin_class: key.cabin_class,
            owner_id: entry.owner_id.clone(),
            seats,
            priority,
            position,
        }));

        Ok(WaitlistPlacement { entry, position })
    }

    /// Turn freed capacity into offers, head of the queue first. Returns seats offered.
    pub async fn process(
        &self,
        flight: &Flight,
        cabin: CabinClass,
        events: &mut Vec<InventoryEvent>,
    ) -> InventoryResult<i32> {
        let key = PartitionKey::new(flight.id, cabin);
        let status = self.status.status_for(flight, cabin).await?;
        let available = status.effective_available;
        if available <= 0 {
            return Ok(0);
        }

        let mut entries = self.store.waiting_entries(key, self.rules.waitlist_batch_size).await?;
        let picks = plan_offers(&entries, available, self.rules.cascade_policy);

        let now = self.clock.now();
        let ttl = self.rules.offer_ttl();
        let mut offered = 0;
        for idx in picks {
            let entry = &mut entries[idx];
            entry.offer(now, ttl)?;
            self.store.update_entry(entry).await?;
            offered += entry.seats;

            events.push(InventoryEvent::WaitlistOffered(WaitlistOfferedEvent {
                entry_id: entry.id,
                flight_id: entry.flight_id,
                cabin_class: entry.cabin_class,
                owner_id: entry.owner_id.clone(),
                seats: entry.seats,
                offer_expires_at: (now + ttl).timestamp(),
            }));
        }

        if offered > 0 {
            info!("Cascade on {} offered {} of {} free seat(s)", key, offered, available);
        }
        Ok(offered)
    }

    /// Terminal removal. Removing an already-terminal entry is a no-op.
    pub async fn remove(&self, id: Uuid, reason: RemovalReason) -> InventoryResult<Removal> {
        let mut entry = self.find(id).await?;
        if entry.status.is_terminal() {
            debug!("Waitlist entry {} already {}, ignoring {}", id, entry.status, reason);
            return Ok(Removal { entry, freed_offer: false });
        }

        let freed_offer = entry.has_live_offer(self.clock.now());
        entry.status = WaitlistStatus::from(reason);
        self.store.update_entry(&entry).await?;
        info!("Waitlist entry {} removed as {}", id, reason);

        Ok(Removal { entry, freed_offer })
    }

    /// Offered → confirmed. The offer's seats become the caller's hold.
    pub async fn take_offer(&self, id: Uuid) -> InventoryResult<WaitlistEntry> {
        let mut entry = self.find(id).await?;
        if !entry.has_live_offer(self.clock.now()) {
            let from = if entry.status == WaitlistStatus::Offered {
                WaitlistStatus::Expired
            } else {
                entry.status
            };
            return Err(InventoryError::InvalidStateTransition {
                from: from.to_string(),
                to: WaitlistStatus::Confirmed.to_string(),
            });
        }

        entry.status = WaitlistStatus::Confirmed;
        self.store.update_entry(&entry).await?;
        Ok(entry)
    }

    /// Expire one lapsed offer. False when the entry moved on since it was listed.
    pub async fn expire_offer(&self, id: Uuid, events: &mut Vec<InventoryEvent>) -> InventoryResult<bool> {
        let mut entry = self.find(id).await?;
        let now = self.clock.now();
        let lapsed = entry.status == WaitlistStatus::Offered
            && entry.offer_expires_at.map(|at| at < now).unwrap_or(true);
        if !lapsed {
            return Ok(false);
        }

        entry.status = WaitlistStatus::Expired;
        self.store.update_entry(&entry).await?;
        events.push(InventoryEvent::WaitlistOfferExpired(WaitlistOfferExpiredEvent {
            entry_id: entry.id,
            flight_id: entry.flight_id,
            cabin_class: entry.cabin_class,
            owner_id: entry.owner_id.clone(),
            seats: entry.seats,
            timestamp: now.timestamp(),
        }));
        Ok(true)
    }
}

/// Indices of `entries` (already in priority order) that receive an offer.
pub fn plan_offers(entries: &[WaitlistEntry], available: i32, policy: CascadePolicy) -> Vec<usize> {
    let mut picks = Vec::new();
    // Widened so an oversized stored entry cannot overflow the running total.
    let mut offered: i64 = 0;

    for (idx, entry) in entries.iter().enumerate() {
        if offered + i64::from(entry.seats) <= i64::from(available) {
            offered += i64::from(entry.seats);
            picks.push(idx);
        } else if policy == CascadePolicy::StrictFifo {
            break;
        }
    }

    picks
}

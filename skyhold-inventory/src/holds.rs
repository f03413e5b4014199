use std::sync::Arc;
use tracing::{debug, info};
use uuid::Uuid;

use skyhold_core::clock::Clock;
use skyhold_core::flight::Flight;
use skyhold_core::hold::{AllocationRequest, HoldResult, HoldStatus, SeatHold};
use skyhold_core::repository::*;
use skyhold_core::rules::EngineRules;
use skyhold_core::{InventoryError, InventoryResult, PartitionKey};
use skyhold_shared::models::events::{HoldClosedEvent, HoldConvertedEvent, HoldCreatedEvent};
use skyhold_shared::InventoryEvent;

use crate::status::InventoryStatusService;
use crate::waitlist::WaitlistManager;

/// What `convert` found.
#[derive(Debug)]
pub enum Conversion {
    Converted(SeatHold),
    /// The hold is no longer live: it was past its deadline and has been expired
    /// now, or it was expired or released earlier.
    Lapsed(SeatHold),
}

/// Seat holds against the capacity ledger.
///
/// Every method except `find` must run under the hold's partition lock.
pub struct HoldManager {
    store: Arc<dyn InventoryStore>,
    status: Arc<InventoryStatusService>,
    waitlist: Arc<WaitlistManager>,
    clock: Arc<dyn Clock>,
    rules: EngineRules,
}

impl HoldManager {
    pub fn new(
        store: Arc<dyn InventoryStore>,
        status: Arc<InventoryStatusService>,
        waitlist: Arc<WaitlistManager>,
        clock: Arc<dyn Clock>,
        rules: EngineRules,
    ) -> Self {
        Self { store, status, waitlist, clock, rules }
    }

    pub async fn find(&self, id: Uuid) -> InventoryResult<SeatHold> {
        self.store
            .get_hold(id)
            .await?
            .ok_or_else(|| InventoryError::NotFound(format!("hold {}", id)))
    }

    /// Check-then-act admission. The availability read and the hold write happen
    /// under the same partition lock.
    pub async fn allocate(
        &self,
        flight: &Flight,
        req: &AllocationRequest,
        events: &mut Vec<InventoryEvent>,
    ) -> InventoryResult<HoldResult> {
        let key = PartitionKey::new(flight.id, req.cabin_class);
        if !flight.is_open_for_sale(self.clock.now()) {
            return Err(InventoryError::InventoryExhausted(key));
        }

        // Seats left over by a cascade that failed part way go to the queue first.
        self.waitlist.process(flight, req.cabin_class, events).await?;

        let status = self.status.status_for(flight, req.cabin_class).await?;
        let effective = status.effective_available;

        if effective >= req.seats {
            let hold = self.create_hold(key, req.seats, &req.owner_id, &req.session_id, events).await?;
            return Ok(HoldResult {
                allocated: hold.seats,
                hold_id: Some(hold.id),
                expires_at: Some(hold.expires_at),
                waitlist_id: None,
                waitlist_position: None,
            });
        }

        if effective > 0 {
            let hold = self.create_hold(key, effective, &req.owner_id, &req.session_id, events).await?;
            let mut result = HoldResult {
                allocated: effective,
                hold_id: Some(hold.id),
                expires_at: Some(hold.expires_at),
                waitlist_id: None,
                waitlist_position: None,
            };
            if self.waitlist.accepts_entries(flight, req.cabin_class).await? {
                let shortfall = req.seats - effective;
                let placement = self.waitlist.enqueue(key, &req.owner_id, shortfall, events).await?;
                result.waitlist_id = Some(placement.entry.id);
                result.waitlist_position = Some(placement.position);
            }
            return Ok(result);
        }

        if self.waitlist.accepts_entries(flight, req.cabin_class).await? {
            let placement = self.waitlist.enqueue(key, &req.owner_id, req.seats, events).await?;
            return Ok(HoldResult {
                allocated: 0,
                hold_id: None,
                expires_at: None,
                waitlist_id: Some(placement.entry.id),
                waitlist_position: Some(placement.position),
            });
        }

        info!("Allocation of {} seat(s) on {} refused: inventory exhausted", req.seats, key);
        Err(InventoryError::InventoryExhausted(key))
    }

    /// Write a hold without checking availability. Used by `allocate` after its own
    /// check, and for waitlist offers whose seats were reserved when offered.
    pub async fn create_hold(
        &self,
        key: PartitionKey,
        seats: i32,
        owner_id: &str,
        session_id: &str,
        events: &mut Vec<InventoryEvent>,
    ) -> InventoryResult<SeatHold> {
        let hold = SeatHold::new(
            key,
            seats,
            owner_id.to_string(),
            session_id.to_string(),
            self.clock.now(),
            self.rules.hold_ttl(),
        );
        self.store.insert_hold(&hold).await?;

        info!("Hold {} created: {} seat(s) on {} for {}", hold.id, seats, key, owner_id);
        events.push(InventoryEvent::HoldCreated(HoldCreatedEvent {
            hold_id: hold.id,
            flight_id: hold.flight_id,
            cabin_class: hold.cabin_class,
            seats,
            owner_id: hold.owner_id.clone(),
            expires_at: hold.expires_at.timestamp(),
        }));
        Ok(hold)
    }

    /// Releasing an already released hold changes nothing.
    pub async fn release(&self, id: Uuid, events: &mut Vec<InventoryEvent>) -> InventoryResult<()> {
        let mut hold = self.find(id).await?;
        if hold.status == HoldStatus::Released {
            debug!("Hold {} already released", id);
            return Ok(());
        }

        hold.transition(HoldStatus::Released)?;
        self.store.update_hold(&hold).await?;

        info!("Hold {} released ({} seat(s))", id, hold.seats);
        events.push(closed_event(&hold, "released", self.clock.now().timestamp()));
        Ok(())
    }

    pub async fn convert(
        &self,
        id: Uuid,
        booking_id: Uuid,
        events: &mut Vec<InventoryEvent>,
    ) -> InventoryResult<Conversion> {
        let mut hold = self.find(id).await?;
        let now = self.clock.now();

        match hold.status {
            HoldStatus::Active if hold.expires_at <= now => {
                hold.transition(HoldStatus::Expired)?;
                self.store.update_hold(&hold).await?;
                events.push(closed_event(&hold, "expired", now.timestamp()));
                return Ok(Conversion::Lapsed(hold));
            }
            HoldStatus::Expired | HoldStatus::Released => return Ok(Conversion::Lapsed(hold)),
            _ => {}
        }

        hold.transition(HoldStatus::Converted)?;
        hold.booking_id = Some(booking_id);
        // Status and ledger move together or not at all.
        let Some(sold) = self.store.commit_conversion(&hold).await? else {
            let current = self.find(id).await?;
            return Err(InventoryError::InvalidStateTransition {
                from: current.status.to_string(),
                to: HoldStatus::Converted.to_string(),
            });
        };

        info!("Hold {} converted to booking {}; {} sold on {}", id, booking_id, sold, hold.partition());
        events.push(InventoryEvent::HoldConverted(HoldConvertedEvent {
            hold_id: hold.id,
            booking_id,
            flight_id: hold.flight_id,
            cabin_class: hold.cabin_class,
            seats: hold.seats,
            timestamp: now.timestamp(),
        }));
        Ok(Conversion::Converted(hold))
    }

    /// Expire one overdue hold. False when it moved on since it was listed.
    pub async fn expire(&self, id: Uuid, events: &mut Vec<InventoryEvent>) -> InventoryResult<bool> {
        let mut hold = self.find(id).await?;
        let now = self.clock.now();
        if hold.status != HoldStatus::Active || hold.expires_at >= now {
            return Ok(false);
        }

        hold.transition(HoldStatus::Expired)?;
        self.store.update_hold(&hold).await?;
        events.push(closed_event(&hold, "expired", now.timestamp()));
        Ok(true)
    }
}

fn closed_event(hold: &SeatHold, reason: &str, timestamp: i64) -> InventoryEvent {
    let event = HoldClosedEvent {
        hold_id: hold.id,
        flight_id: hold.flight_id,
        cabin_class: hold.cabin_class,
        seats: hold.seats,
        reason: reason.to_string(),
        timestamp,
    };
    match hold.status {
        HoldStatus::Expired => InventoryEvent::HoldExpired(event),
        _ => InventoryEvent::HoldReleased(event),
    }
}

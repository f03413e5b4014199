use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::cabin::CabinClass;

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct HoldCreatedEvent {
    pub hold_id: Uuid,
    pub flight_id: Uuid,
    pub cabin_class: CabinClass,
    pub seats: i32,
    pub owner_id: String,
    pub expires_at: i64,
}

/// Emitted for released and expired holds alike; `reason` tells them apart.
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct HoldClosedEvent {
    pub hold_id: Uuid,
    pub flight_id: Uuid,
    pub cabin_class: CabinClass,
    pub seats: i32,
    pub reason: String,
    pub timestamp: i64,
}

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct HoldConvertedEvent {
    pub hold_id: Uuid,
    pub booking_id: Uuid,
    pub flight_id: Uuid,
    pub cabin_class: CabinClass,
    pub seats: i32,
    pub timestamp: i64,
}

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct WaitlistJoinedEvent {
    pub entry_id: Uuid,
    pub flight_id: Uuid,
    pub cabin_class: CabinClass,
    pub owner_id: String,
    pub seats: i32,
    pub priority: i64,
    pub position: i64,
}

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct WaitlistOfferedEvent {
    pub entry_id: Uuid,
    pub flight_id: Uuid,
    pub cabin_class: CabinClass,
    pub owner_id: String,
    pub seats: i32,
    pub offer_expires_at: i64,
}

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct WaitlistOfferExpiredEvent {
    pub entry_id: Uuid,
    pub flight_id: Uuid,
    pub cabin_class: CabinClass,
    pub owner_id: String,
    pub seats: i32,
    pub timestamp: i64,
}

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct DeniedBoardingRecordedEvent {
    pub record_id: Uuid,
    pub flight_id: Uuid,
    pub booking_id: Uuid,
    pub user_id: String,
    pub compensation_amount: i64,
    pub compensation_type: String,
    pub timestamp: i64,
}

/// Everything the engine tells the outside world. Notification delivery and
/// pricing subscribe to these; the engine never waits on them.
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
#[serde(tag = "type", content = "data", rename_all = "snake_case")]
pub enum InventoryEvent {
    HoldCreated(HoldCreatedEvent),
    HoldReleased(HoldClosedEvent),
    HoldExpired(HoldClosedEvent),
    HoldConverted(HoldConvertedEvent),
    WaitlistJoined(WaitlistJoinedEvent),
    WaitlistOffered(WaitlistOfferedEvent),
    WaitlistOfferExpired(WaitlistOfferExpiredEvent),
    DeniedBoardingRecorded(DeniedBoardingRecordedEvent),
}

impl InventoryEvent {
    pub fn topic(&self) -> &'static str {
        match self {
            InventoryEvent::HoldCreated(_) => "holds.created",
            InventoryEvent::HoldReleased(_) => "holds.released",
            InventoryEvent::HoldExpired(_) => "holds.expired",
            InventoryEvent::HoldConverted(_) => "holds.converted",
            InventoryEvent::WaitlistJoined(_) => "waitlist.joined",
            InventoryEvent::WaitlistOffered(_) => "waitlist.offered",
            InventoryEvent::WaitlistOfferExpired(_) => "waitlist.offer_expired",
            InventoryEvent::DeniedBoardingRecorded(_) => "denied_boarding.recorded",
        }
    }

    pub fn flight_id(&self) -> Uuid {
        match self {
            InventoryEvent::HoldCreated(e) => e.flight_id,
            InventoryEvent::HoldReleased(e) | InventoryEvent::HoldExpired(e) => e.flight_id,
            InventoryEvent::HoldConverted(e) => e.flight_id,
            InventoryEvent::WaitlistJoined(e) => e.flight_id,
            InventoryEvent::WaitlistOffered(e) => e.flight_id,
            InventoryEvent::WaitlistOfferExpired(e) => e.flight_id,
            InventoryEvent::DeniedBoardingRecorded(e) => e.flight_id,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_event_envelope() {
        let flight_id = Uuid::new_v4();
        let event = InventoryEvent::WaitlistOffered(WaitlistOfferedEvent {
            entry_id: Uuid::new_v4(),
            flight_id,
            cabin_class: CabinClass::Economy,
            owner_id: "user-1".to_string(),
            seats: 2,
            offer_expires_at: 1_700_000_000,
        });

        assert_eq!(event.topic(), "waitlist.offered");
        assert_eq!(event.flight_id(), flight_id);

        let json = serde_json::to_value(&event).unwrap();
        assert_eq!(json["type"], "waitlist_offered");
        assert_eq!(json["data"]["cabin_class"], "economy");
    }
}

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::{CabinClass, InventoryError, PartitionKey};

/// Hold lifecycle. `Active` is the only non-terminal state.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum HoldStatus {
    Active,
    Converted,
    Expired,
    Released,
}

crate::string_enum!(HoldStatus {
    Active => "active",
    Converted => "converted",
    Expired => "expired",
    Released => "released",
});

impl HoldStatus {
    pub fn is_terminal(&self) -> bool {
        !matches!(self, HoldStatus::Active)
    }
}

/// Seats set aside for one shopper while they pay.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SeatHold {
    pub id: Uuid,
    pub flight_id: Uuid,
    pub cabin_class: CabinClass,
    pub seats: i32,
    pub owner_id: String,
    pub session_id: String,
    pub status: HoldStatus,
    pub created_at: DateTime<Utc>,
    pub expires_at: DateTime<Utc>,
    pub booking_id: Option<Uuid>,
}

impl SeatHold {
    pub fn new(
        key: PartitionKey,
        seats: i32,
        owner_id: String,
        session_id: String,
        now: DateTime<Utc>,
        ttl: Duration,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            flight_id: key.flight_id,
            cabin_class: key.cabin_class,
            seats,
            owner_id,
            session_id,
            status: HoldStatus::Active,
            created_at: now,
            expires_at: now + ttl,
            booking_id: None,
        }
    }

    pub fn partition(&self) -> PartitionKey {
        PartitionKey::new(self.flight_id, self.cabin_class)
    }

    /// Active and not past its deadline.
    pub fn is_live(&self, now: DateTime<Utc>) -> bool {
        self.status == HoldStatus::Active && self.expires_at > now
    }

    /// Move to a terminal state. Only `Active` may transition.
    pub fn transition(&mut self, to: HoldStatus) -> Result<(), InventoryError> {
        if self.status.is_terminal() || to == HoldStatus::Active {
            return Err(InventoryError::InvalidStateTransition {
                from: self.status.to_string(),
                to: to.to_string(),
            });
        }
        self.status = to;
        Ok(())
    }
}

/// A shopper asking for seats in one cabin.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AllocationRequest {
    pub flight_id: Uuid,
    pub cabin_class: CabinClass,
    pub seats: i32,
    pub owner_id: String,
    pub session_id: String,
}

/// Outcome of an allocation: a hold, a waitlist spot, or both.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct HoldResult {
    pub allocated: i32,
    pub hold_id: Option<Uuid>,
    pub expires_at: Option<DateTime<Utc>>,
    pub waitlist_id: Option<Uuid>,
    pub waitlist_position: Option<i64>,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn hold() -> SeatHold {
        let key = PartitionKey::new(Uuid::new_v4(), CabinClass::Economy);
        SeatHold::new(key, 2, "user-1".into(), "sess-1".into(), Utc::now(), Duration::minutes(15))
    }

    #[test]
    fn test_hold_transitions_once() {
        let mut h = hold();
        h.transition(HoldStatus::Converted).unwrap();
        assert_eq!(h.status, HoldStatus::Converted);

        let err = h.transition(HoldStatus::Released).unwrap_err();
        assert!(matches!(err, InventoryError::InvalidStateTransition { .. }));
        assert_eq!(h.status, HoldStatus::Converted);
    }

    #[test]
    fn test_hold_liveness() {
        let h = hold();
        assert!(h.is_live(h.created_at));
        assert!(!h.is_live(h.expires_at));
    }
}

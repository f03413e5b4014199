use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::{CabinClass, InventoryError, PartitionKey};

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum WaitlistStatus {
    Waiting,
    Offered,
    Confirmed,
    Expired,
    Cancelled,
}

crate::string_enum!(WaitlistStatus {
    Waiting => "waiting",
    Offered => "offered",
    Confirmed => "confirmed",
    Expired => "expired",
    Cancelled => "cancelled",
});

impl WaitlistStatus {
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            WaitlistStatus::Confirmed | WaitlistStatus::Expired | WaitlistStatus::Cancelled
        )
    }
}

/// Why an entry leaves the waitlist.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum RemovalReason {
    Confirmed,
    Cancelled,
    Expired,
}

crate::string_enum!(RemovalReason {
    Confirmed => "confirmed",
    Cancelled => "cancelled",
    Expired => "expired",
});

impl From<RemovalReason> for WaitlistStatus {
    fn from(reason: RemovalReason) -> Self {
        match reason {
            RemovalReason::Confirmed => WaitlistStatus::Confirmed,
            RemovalReason::Cancelled => WaitlistStatus::Cancelled,
            RemovalReason::Expired => WaitlistStatus::Expired,
        }
    }
}

/// How a cascade treats an entry that does not fit the freed capacity.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum CascadePolicy {
    /// Stop at the first entry that does not fit. A later, smaller party never
    /// jumps an earlier, larger one.
    #[default]
    StrictFifo,
    /// Pass over entries that do not fit and keep walking in priority order.
    /// With parties of 5, 2 and 3 queued and 4 seats freed, the party of 2 gets
    /// its offer while the other two keep waiting.
    SkipUnfit,
}

/// A party waiting for seats. Rows are never deleted; terminal status is the audit trail.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WaitlistEntry {
    pub id: Uuid,
    pub flight_id: Uuid,
    pub cabin_class: CabinClass,
    pub owner_id: String,
    pub seats: i32,
    /// Lower is served first. Unique and increasing within a partition.
    pub priority: i64,
    pub status: WaitlistStatus,
    pub created_at: DateTime<Utc>,
    pub offered_at: Option<DateTime<Utc>>,
    pub offer_expires_at: Option<DateTime<Utc>>,
}

impl WaitlistEntry {
    pub fn new(key: PartitionKey, owner_id: String, seats: i32, priority: i64, now: DateTime<Utc>) -> Self {
        Self {
            id: Uuid::new_v4(),
            flight_id: key.flight_id,
            cabin_class: key.cabin_class,
            owner_id,
            seats,
            priority,
            status: WaitlistStatus::Waiting,
            created_at: now,
            offered_at: None,
            offer_expires_at: None,
        }
    }

    pub fn partition(&self) -> PartitionKey {
        PartitionKey::new(self.flight_id, self.cabin_class)
    }

    /// Waiting → Offered with a deadline of `now + ttl`.
    pub fn offer(&mut self, now: DateTime<Utc>, ttl: Duration) -> Result<(), InventoryError> {
        if self.status != WaitlistStatus::Waiting {
            return Err(InventoryError::InvalidStateTransition {
                from: self.status.to_string(),
                to: WaitlistStatus::Offered.to_string(),
            });
        }
        self.status = WaitlistStatus::Offered;
        self.offered_at = Some(now);
        self.offer_expires_at = Some(now + ttl);
        Ok(())
    }

    /// Offered and still inside its claim window.
    pub fn has_live_offer(&self, now: DateTime<Utc>) -> bool {
        self.status == WaitlistStatus::Offered
            && self.offer_expires_at.map(|at| at > now).unwrap_or(false)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_offer_sets_window() {
        let now = Utc::now();
        let key = PartitionKey::new(Uuid::new_v4(), CabinClass::Business);
        let mut entry = WaitlistEntry::new(key, "user-2".into(), 1, 1, now);

        entry.offer(now, Duration::hours(24)).unwrap();
        assert_eq!(entry.status, WaitlistStatus::Offered);
        assert_eq!(entry.offer_expires_at, Some(now + Duration::hours(24)));
        assert!(entry.has_live_offer(now + Duration::hours(23)));
        assert!(!entry.has_live_offer(now + Duration::hours(25)));

        // A second offer is a state error
        assert!(entry.offer(now, Duration::hours(24)).is_err());
    }

    #[test]
    fn test_removal_reason_maps_to_terminal_status() {
        for reason in [RemovalReason::Confirmed, RemovalReason::Cancelled, RemovalReason::Expired] {
            assert!(WaitlistStatus::from(reason).is_terminal());
        }
        assert!(!WaitlistStatus::Offered.is_terminal());
    }
}

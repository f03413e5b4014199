use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::{CabinClass, InventoryError};

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum DeniedBoardingType {
    Voluntary,
    Involuntary,
}

crate::string_enum!(DeniedBoardingType {
    Voluntary => "voluntary",
    Involuntary => "involuntary",
});

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum CompensationType {
    Cash,
    Voucher,
    Miles,
}

crate::string_enum!(CompensationType {
    Cash => "cash",
    Voucher => "voucher",
    Miles => "miles",
});

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum DeniedBoardingStatus {
    Pending,
    Accepted,
    Rejected,
    Completed,
}

crate::string_enum!(DeniedBoardingStatus {
    Pending => "pending",
    Accepted => "accepted",
    Rejected => "rejected",
    Completed => "completed",
});

impl DeniedBoardingStatus {
    /// pending → accepted | rejected → completed.
    pub fn can_transition_to(&self, next: DeniedBoardingStatus) -> bool {
        use DeniedBoardingStatus::*;
        matches!(
            (self, next),
            (Pending, Accepted) | (Pending, Rejected) | (Accepted, Completed) | (Rejected, Completed)
        )
    }
}

/// Audit record of a passenger bumped from a flight.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DeniedBoardingRecord {
    pub id: Uuid,
    pub flight_id: Uuid,
    pub booking_id: Uuid,
    pub user_id: String,
    pub boarding_type: DeniedBoardingType,
    pub compensation_amount: i64,
    pub compensation_type: CompensationType,
    pub alternative_flight_id: Option<Uuid>,
    pub status: DeniedBoardingStatus,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl DeniedBoardingRecord {
    pub fn transition(&mut self, next: DeniedBoardingStatus, now: DateTime<Utc>) -> Result<(), InventoryError> {
        if !self.status.can_transition_to(next) {
            return Err(InventoryError::InvalidStateTransition {
                from: self.status.to_string(),
                to: next.to_string(),
            });
        }
        self.status = next;
        self.updated_at = now;
        Ok(())
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewDeniedBoarding {
    pub flight_id: Uuid,
    pub booking_id: Uuid,
    pub user_id: String,
    pub boarding_type: DeniedBoardingType,
    pub compensation_amount: i64,
    pub compensation_type: CompensationType,
    pub alternative_flight_id: Option<Uuid>,
}

/// A flight on the same route with room for the displaced party.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct AlternativeFlight {
    pub flight_id: Uuid,
    pub flight_number: String,
    pub departure_time: DateTime<Utc>,
    pub available_seats: i32,
}

/// Advisory answer to an oversold departure. Nothing is mutated to produce it.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Resolution {
    pub flight_id: Uuid,
    pub cabin_class: CabinClass,
    pub seats_needed: i32,
    pub compensation_amount: i64,
    pub compensation_type: CompensationType,
    pub alternatives: Vec<AlternativeFlight>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use DeniedBoardingStatus::*;

    #[test]
    fn test_status_transitions() {
        assert!(Pending.can_transition_to(Accepted));
        assert!(Pending.can_transition_to(Rejected));
        assert!(Accepted.can_transition_to(Completed));
        assert!(!Pending.can_transition_to(Completed));
        assert!(!Completed.can_transition_to(Pending));
        assert!(!Accepted.can_transition_to(Rejected));
    }
}

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::CabinClass;

pub const WAITLIST_ONLY_OCCUPANCY: f64 = 0.98;
pub const LIMITED_OCCUPANCY: f64 = 0.85;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum AvailabilityStatus {
    Available,
    Limited,
    WaitlistOnly,
    Closed,
}

crate::string_enum!(AvailabilityStatus {
    Available => "available",
    Limited => "limited",
    WaitlistOnly => "waitlist_only",
    Closed => "closed",
});

impl AvailabilityStatus {
    /// First match wins. An exhausted partition with people already queued reports
    /// `WaitlistOnly`, never `Closed`.
    pub fn derive(effective_available: i32, waitlist_count: i64, occupancy_rate: f64) -> Self {
        if effective_available <= 0 && waitlist_count > 0 {
            AvailabilityStatus::WaitlistOnly
        } else if effective_available <= 0 {
            AvailabilityStatus::Closed
        } else if occupancy_rate >= WAITLIST_ONLY_OCCUPANCY {
            AvailabilityStatus::WaitlistOnly
        } else if occupancy_rate >= LIMITED_OCCUPANCY {
            AvailabilityStatus::Limited
        } else {
            AvailabilityStatus::Available
        }
    }
}

/// Read-side snapshot of one partition.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct InventoryStatus {
    pub flight_id: Uuid,
    pub cabin_class: CabinClass,
    pub total_seats: i32,
    pub sold_seats: i32,
    pub held_seats: i32,
    /// Seats promised to waitlist parties whose offer is still open.
    pub offered_seats: i32,
    pub available_seats: i32,
    pub waitlist_count: i64,
    pub overbooking_limit: i32,
    pub effective_available: i32,
    pub occupancy_rate: f64,
    pub status: AvailabilityStatus,
}

impl InventoryStatus {
    #[allow(clippy::too_many_arguments)]
    pub fn compute(
        flight_id: Uuid,
        cabin_class: CabinClass,
        total_seats: i32,
        sold_seats: i32,
        held_seats: i32,
        offered_seats: i32,
        waitlist_count: i64,
        overbooking_limit: i32,
    ) -> Self {
        let available_seats = total_seats - sold_seats - held_seats - offered_seats;
        let effective_available = (available_seats + overbooking_limit).max(0);
        let occupancy_rate = if total_seats > 0 {
            (sold_seats + held_seats) as f64 / total_seats as f64
        } else {
            0.0
        };
        let status = AvailabilityStatus::derive(effective_available, waitlist_count, occupancy_rate);

        Self {
            flight_id,
            cabin_class,
            total_seats,
            sold_seats,
            held_seats,
            offered_seats,
            available_seats,
            waitlist_count,
            overbooking_limit,
            effective_available,
            occupancy_rate,
            status,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use AvailabilityStatus::*;

    #[test]
    fn test_status_ordering() {
        assert_eq!(AvailabilityStatus::derive(0, 3, 1.0), WaitlistOnly);
        assert_eq!(AvailabilityStatus::derive(0, 0, 1.0), Closed);
        assert_eq!(AvailabilityStatus::derive(4, 0, 0.99), WaitlistOnly);
        assert_eq!(AvailabilityStatus::derive(10, 0, 0.90), Limited);
        assert_eq!(AvailabilityStatus::derive(10, 0, 0.50), Available);
    }

    #[test]
    fn test_compute_uses_overbooking_allowance() {
        let s = InventoryStatus::compute(Uuid::new_v4(), CabinClass::Economy, 100, 95, 5, 0, 0, 5);
        assert_eq!(s.available_seats, 0);
        assert_eq!(s.effective_available, 5);
        assert_eq!(s.occupancy_rate, 1.0);
        assert_eq!(s.status, WaitlistOnly);

        // Allowance partly consumed
        let s = InventoryStatus::compute(Uuid::new_v4(), CabinClass::Economy, 100, 103, 0, 0, 0, 5);
        assert_eq!(s.available_seats, -3);
        assert_eq!(s.effective_available, 2);
    }

    #[test]
    fn test_compute_empty_cabin() {
        let s = InventoryStatus::compute(Uuid::new_v4(), CabinClass::Business, 0, 0, 0, 0, 0, 0);
        assert_eq!(s.occupancy_rate, 0.0);
        assert_eq!(s.status, Closed);
    }
}

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::CabinClass;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum FlightStatus {
    Scheduled,
    Departed,
    Cancelled,
    Completed,
}

crate::string_enum!(FlightStatus {
    Scheduled => "scheduled",
    Departed => "departed",
    Cancelled => "cancelled",
    Completed => "completed",
});

/// A flight as seen by the inventory engine. Created and scheduled elsewhere;
/// only the seat configuration and route matter here.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Flight {
    pub id: Uuid,
    pub flight_number: String,
    pub airline_id: String,
    pub origin_id: String,
    pub destination_id: String,
    pub departure_time: DateTime<Utc>,
    pub status: FlightStatus,
    pub economy_seats: i32,
    pub business_seats: i32,
}

impl Flight {
    pub fn seats_for(&self, cabin: CabinClass) -> i32 {
        match cabin {
            CabinClass::Economy => self.economy_seats,
            CabinClass::Business => self.business_seats,
        }
    }

    pub fn total_seats(&self) -> i32 {
        self.economy_seats + self.business_seats
    }

    /// Still sellable: scheduled and not yet departed.
    pub fn is_open_for_sale(&self, now: DateTime<Utc>) -> bool {
        self.status == FlightStatus::Scheduled && self.departure_time > now
    }
}

/// Ledger row for one cabin of one flight.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct FlightCabinCapacity {
    pub flight_id: Uuid,
    pub cabin_class: CabinClass,
    pub total_seats: i32,
    pub sold_seats: i32,
}

impl FlightCabinCapacity {
    /// Passengers beyond physical capacity; non-zero only when overbooking was used.
    pub fn oversold_seats(&self) -> i32 {
        (self.sold_seats - self.total_seats).max(0)
    }
}

/// Booking outcome of a flight that has already operated.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CompletedFlightStats {
    pub flight_id: Uuid,
    pub origin_id: String,
    pub destination_id: String,
    pub departure_time: DateTime<Utc>,
    pub total_seats: i32,
    pub total_bookings: i32,
    pub no_shows: i32,
}

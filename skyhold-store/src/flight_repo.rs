use async_trait::async_trait;
use chrono::{DateTime, Utc};
use uuid::Uuid;

use skyhold_core::flight::{CompletedFlightStats, Flight};
use skyhold_core::hold::SeatHold;
use skyhold_core::repository::{FlightRepository, HistoryRepository, LedgerRepository, StoreResult};
use skyhold_core::PartitionKey;

use crate::database::{db_err, parse_column, PgStore};

#[derive(sqlx::FromRow)]
struct FlightRow {
    id: Uuid,
    flight_number: String,
    airline_id: String,
    origin_id: String,
    destination_id: String,
    departure_time: DateTime<Utc>,
    status: String,
    economy_seats: i32,
    business_seats: i32,
}

impl FlightRow {
    fn into_flight(self) -> StoreResult<Flight> {
        Ok(Flight {
            id: self.id,
            flight_number: self.flight_number,
            airline_id: self.airline_id,
            origin_id: self.origin_id,
            destination_id: self.destination_id,
            departure_time: self.departure_time,
            status: parse_column("flights.status", &self.status)?,
            economy_seats: self.economy_seats,
            business_seats: self.business_seats,
        })
    }
}

#[derive(sqlx::FromRow)]
struct CompletedRow {
    flight_id: Uuid,
    origin_id: String,
    destination_id: String,
    departure_time: DateTime<Utc>,
    total_seats: i32,
    total_bookings: i32,
    no_shows: i32,
}

const FLIGHT_COLUMNS: &str = "id, flight_number, airline_id, origin_id, destination_id, departure_time, \
                              status, economy_seats, business_seats";

#[async_trait]
impl FlightRepository for PgStore {
    async fn get_flight(&self, id: Uuid) -> StoreResult<Option<Flight>> {
        let row = sqlx::query_as::<_, FlightRow>(&format!("SELECT {} FROM flights WHERE id = $1", FLIGHT_COLUMNS))
            .bind(id)
            .fetch_optional(&self.pool)
            .await
            .map_err(db_err)?;

        row.map(FlightRow::into_flight).transpose()
    }

    async fn find_route_flights(
        &self,
        origin_id: &str,
        destination_id: &str,
        departing_from: DateTime<Utc>,
    ) -> StoreResult<Vec<Flight>> {
        let rows = sqlx::query_as::<_, FlightRow>(&format!(
            r#"
            SELECT {}
            FROM flights
            WHERE origin_id = $1 AND destination_id = $2 AND departure_time >= $3
            ORDER BY departure_time ASC
            "#,
            FLIGHT_COLUMNS
        ))
        .bind(origin_id)
        .bind(destination_id)
        .bind(departing_from)
        .fetch_all(&self.pool)
        .await
        .map_err(db_err)?;

        rows.into_iter().map(FlightRow::into_flight).collect()
    }

    async fn upsert_flight(&self, flight: &Flight) -> StoreResult<()> {
        sqlx::query(
            r#"
            INSERT INTO flights (id, flight_number, airline_id, origin_id, destination_id, departure_time, status, economy_seats, business_seats)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9)
            ON CONFLICT (id) DO UPDATE SET
                flight_number = EXCLUDED.flight_number,
                airline_id = EXCLUDED.airline_id,
                origin_id = EXCLUDED.origin_id,
                destination_id = EXCLUDED.destination_id,
                departure_time = EXCLUDED.departure_time,
                status = EXCLUDED.status,
                economy_seats = EXCLUDED.economy_seats,
                business_seats = EXCLUDED.business_seats
            "#,
        )
        .bind(flight.id)
        .bind(&flight.flight_number)
        .bind(&flight.airline_id)
        .bind(&flight.origin_id)
        .bind(&flight.destination_id)
        .bind(flight.departure_time)
        .bind(flight.status.as_str())
        .bind(flight.economy_seats)
        .bind(flight.business_seats)
        .execute(&self.pool)
        .await
        .map_err(db_err)?;

        Ok(())
    }
}

#[async_trait]
impl LedgerRepository for PgStore {
    async fn sold_seats(&self, key: PartitionKey) -> StoreResult<i32> {
        let sold = sqlx::query_scalar::<_, i32>(
            "SELECT sold_seats FROM flight_inventory WHERE flight_id = $1 AND cabin_class = $2",
        )
        .bind(key.flight_id)
        .bind(key.cabin_class.as_str())
        .fetch_optional(&self.pool)
        .await
        .map_err(db_err)?;

        Ok(sold.unwrap_or(0))
    }

    async fn adjust_sold_seats(&self, key: PartitionKey, delta: i32) -> StoreResult<i32> {
        sqlx::query_scalar::<_, i32>(ADJUST_SOLD_SEATS)
            .bind(key.flight_id)
            .bind(key.cabin_class.as_str())
            .bind(delta)
            .fetch_one(&self.pool)
            .await
            .map_err(db_err)
    }

    async fn commit_conversion(&self, hold: &SeatHold) -> StoreResult<Option<i32>> {
        let mut tx = self.pool.begin().await.map_err(db_err)?;

        let updated = sqlx::query(
            "UPDATE seat_holds SET status = $2, booking_id = $3 WHERE id = $1 AND status = 'active'",
        )
        .bind(hold.id)
        .bind(hold.status.as_str())
        .bind(hold.booking_id)
        .execute(&mut *tx)
        .await
        .map_err(db_err)?;

        if updated.rows_affected() == 0 {
            tx.rollback().await.map_err(db_err)?;
            return Ok(None);
        }

        let sold = sqlx::query_scalar::<_, i32>(ADJUST_SOLD_SEATS)
            .bind(hold.flight_id)
            .bind(hold.cabin_class.as_str())
            .bind(hold.seats)
            .fetch_one(&mut *tx)
            .await
            .map_err(db_err)?;

        tx.commit().await.map_err(db_err)?;
        Ok(Some(sold))
    }
}

const ADJUST_SOLD_SEATS: &str = r#"
    INSERT INTO flight_inventory (flight_id, cabin_class, sold_seats)
    VALUES ($1, $2, GREATEST($3, 0))
    ON CONFLICT (flight_id, cabin_class)
    DO UPDATE SET sold_seats = GREATEST(flight_inventory.sold_seats + $3, 0)
    RETURNING sold_seats
"#;

#[async_trait]
impl HistoryRepository for PgStore {
    async fn completed_flights(
        &self,
        origin_id: &str,
        destination_id: &str,
        limit: usize,
    ) -> StoreResult<Vec<CompletedFlightStats>> {
        let rows = sqlx::query_as::<_, CompletedRow>(
            r#"
            SELECT flight_id, origin_id, destination_id, departure_time, total_seats, total_bookings, no_shows
            FROM completed_flight_stats
            WHERE origin_id = $1 AND destination_id = $2
            ORDER BY departure_time DESC
            LIMIT $3
            "#,
        )
        .bind(origin_id)
        .bind(destination_id)
        .bind(limit as i64)
        .fetch_all(&self.pool)
        .await
        .map_err(db_err)?;

        Ok(rows
            .into_iter()
            .map(|row| CompletedFlightStats {
                flight_id: row.flight_id,
                origin_id: row.origin_id,
                destination_id: row.destination_id,
                departure_time: row.departure_time,
                total_seats: row.total_seats,
                total_bookings: row.total_bookings,
                no_shows: row.no_shows,
            })
            .collect())
    }
}

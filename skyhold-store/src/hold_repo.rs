use async_trait::async_trait;
use chrono::{DateTime, Utc};
use uuid::Uuid;

use skyhold_core::hold::SeatHold;
use skyhold_core::repository::{HoldRepository, StoreResult};
use skyhold_core::PartitionKey;

use crate::database::{db_err, parse_column, PgStore};

#[derive(sqlx::FromRow)]
struct HoldRow {
    id: Uuid,
    flight_id: Uuid,
    cabin_class: String,
    seats: i32,
    owner_id: String,
    session_id: String,
    status: String,
    created_at: DateTime<Utc>,
    expires_at: DateTime<Utc>,
    booking_id: Option<Uuid>,
}

impl HoldRow {
    fn into_hold(self) -> StoreResult<SeatHold> {
        Ok(SeatHold {
            id: self.id,
            flight_id: self.flight_id,
            cabin_class: parse_column("seat_holds.cabin_class", &self.cabin_class)?,
            seats: self.seats,
            owner_id: self.owner_id,
            session_id: self.session_id,
            status: parse_column("seat_holds.status", &self.status)?,
            created_at: self.created_at,
            expires_at: self.expires_at,
            booking_id: self.booking_id,
        })
    }
}

const HOLD_COLUMNS: &str =
    "id, flight_id, cabin_class, seats, owner_id, session_id, status, created_at, expires_at, booking_id";

#[async_trait]
impl HoldRepository for PgStore {
    async fn insert_hold(&self, hold: &SeatHold) -> StoreResult<()> {
        sqlx::query(
            r#"
            INSERT INTO seat_holds (id, flight_id, cabin_class, seats, owner_id, session_id, status, created_at, expires_at, booking_id)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10)
            "#,
        )
        .bind(hold.id)
        .bind(hold.flight_id)
        .bind(hold.cabin_class.as_str())
        .bind(hold.seats)
        .bind(&hold.owner_id)
        .bind(&hold.session_id)
        .bind(hold.status.as_str())
        .bind(hold.created_at)
        .bind(hold.expires_at)
        .bind(hold.booking_id)
        .execute(&self.pool)
        .await
        .map_err(db_err)?;

        Ok(())
    }

    async fn get_hold(&self, id: Uuid) -> StoreResult<Option<SeatHold>> {
        let row = sqlx::query_as::<_, HoldRow>(&format!("SELECT {} FROM seat_holds WHERE id = $1", HOLD_COLUMNS))
            .bind(id)
            .fetch_optional(&self.pool)
            .await
            .map_err(db_err)?;

        row.map(HoldRow::into_hold).transpose()
    }

    async fn update_hold(&self, hold: &SeatHold) -> StoreResult<()> {
        sqlx::query("UPDATE seat_holds SET status = $2, booking_id = $3 WHERE id = $1 AND status = 'active'")
            .bind(hold.id)
            .bind(hold.status.as_str())
            .bind(hold.booking_id)
            .execute(&self.pool)
            .await
            .map_err(db_err)?;

        Ok(())
    }

    async fn live_held_seats(&self, key: PartitionKey, now: DateTime<Utc>) -> StoreResult<i32> {
        sqlx::query_scalar::<_, i32>(
            r#"
            SELECT COALESCE(SUM(seats), 0)::INT
            FROM seat_holds
            WHERE flight_id = $1 AND cabin_class = $2 AND status = 'active' AND expires_at > $3
            "#,
        )
        .bind(key.flight_id)
        .bind(key.cabin_class.as_str())
        .bind(now)
        .fetch_one(&self.pool)
        .await
        .map_err(db_err)
    }

    async fn overdue_holds(&self, now: DateTime<Utc>) -> StoreResult<Vec<SeatHold>> {
        let rows = sqlx::query_as::<_, HoldRow>(&format!(
            "SELECT {} FROM seat_holds WHERE status = 'active' AND expires_at < $1 ORDER BY expires_at",
            HOLD_COLUMNS
        ))
        .bind(now)
        .fetch_all(&self.pool)
        .await
        .map_err(db_err)?;

        rows.into_iter().map(HoldRow::into_hold).collect()
    }
}

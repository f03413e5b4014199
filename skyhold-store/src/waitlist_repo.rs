use async_trait::async_trait;
use chrono::{DateTime, Utc};
use uuid::Uuid;

use skyhold_core::repository::{StoreResult, WaitlistRepository};
use skyhold_core::waitlist::WaitlistEntry;
use skyhold_core::PartitionKey;

use crate::database::{db_err, parse_column, PgStore};

#[derive(sqlx::FromRow)]
struct EntryRow {
    id: Uuid,
    flight_id: Uuid,
    cabin_class: String,
    owner_id: String,
    seats: i32,
    priority: i64,
    status: String,
    created_at: DateTime<Utc>,
    offered_at: Option<DateTime<Utc>>,
    offer_expires_at: Option<DateTime<Utc>>,
}

impl EntryRow {
    fn into_entry(self) -> StoreResult<WaitlistEntry> {
        Ok(WaitlistEntry {
            id: self.id,
            flight_id: self.flight_id,
            cabin_class: parse_column("waitlist_entries.cabin_class", &self.cabin_class)?,
            owner_id: self.owner_id,
            seats: self.seats,
            priority: self.priority,
            status: parse_column("waitlist_entries.status", &self.status)?,
            created_at: self.created_at,
            offered_at: self.offered_at,
            offer_expires_at: self.offer_expires_at,
        })
    }
}

const ENTRY_COLUMNS: &str =
    "id, flight_id, cabin_class, owner_id, seats, priority, status, created_at, offered_at, offer_expires_at";

#[async_trait]
impl WaitlistRepository for PgStore {
    async fn insert_entry(&self, entry: &WaitlistEntry) -> StoreResult<()> {
        sqlx::query(
            r#"
            INSERT INTO waitlist_entries (id, flight_id, cabin_class, owner_id, seats, priority, status, created_at, offered_at, offer_expires_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10)
            "#,
        )
        .bind(entry.id)
        .bind(entry.flight_id)
        .bind(entry.cabin_class.as_str())
        .bind(&entry.owner_id)
        .bind(entry.seats)
        .bind(entry.priority)
        .bind(entry.status.as_str())
        .bind(entry.created_at)
        .bind(entry.offered_at)
        .bind(entry.offer_expires_at)
        .execute(&self.pool)
        .await
        .map_err(db_err)?;

        Ok(())
    }

    async fn get_entry(&self, id: Uuid) -> StoreResult<Option<WaitlistEntry>> {
        let row = sqlx::query_as::<_, EntryRow>(&format!(
            "SELECT {} FROM waitlist_entries WHERE id = $1",
            ENTRY_COLUMNS
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await
        .map_err(db_err)?;

        row.map(EntryRow::into_entry).transpose()
    }

    async fn update_entry(&self, entry: &WaitlistEntry) -> StoreResult<()> {
        sqlx::query(
            "UPDATE waitlist_entries SET status = $2, offered_at = $3, offer_expires_at = $4 WHERE id = $1",
        )
        .bind(entry.id)
        .bind(entry.status.as_str())
        .bind(entry.offered_at)
        .bind(entry.offer_expires_at)
        .execute(&self.pool)
        .await
        .map_err(db_err)?;

        Ok(())
    }

    async fn max_priority(&self, key: PartitionKey) -> StoreResult<i64> {
        sqlx::query_scalar::<_, i64>(
            "SELECT COALESCE(MAX(priority), 0) FROM waitlist_entries WHERE flight_id = $1 AND cabin_class = $2",
        )
        .bind(key.flight_id)
        .bind(key.cabin_class.as_str())
        .fetch_one(&self.pool)
        .await
        .map_err(db_err)
    }

    async fn waiting_entries(&self, key: PartitionKey, limit: usize) -> StoreResult<Vec<WaitlistEntry>> {
        let rows = sqlx::query_as::<_, EntryRow>(&format!(
            r#"
            SELECT {}
            FROM waitlist_entries
            WHERE flight_id = $1 AND cabin_class = $2 AND status = 'waiting'
            ORDER BY priority ASC
            LIMIT $3
            "#,
            ENTRY_COLUMNS
        ))
        .bind(key.flight_id)
        .bind(key.cabin_class.as_str())
        .bind(limit as i64)
        .fetch_all(&self.pool)
        .await
        .map_err(db_err)?;

        rows.into_iter().map(EntryRow::into_entry).collect()
    }

    async fn count_waiting(&self, key: PartitionKey) -> StoreResult<i64> {
        sqlx::query_scalar::<_, i64>(
            "SELECT COUNT(*) FROM waitlist_entries WHERE flight_id = $1 AND cabin_class = $2 AND status = 'waiting'",
        )
        .bind(key.flight_id)
        .bind(key.cabin_class.as_str())
        .fetch_one(&self.pool)
        .await
        .map_err(db_err)
    }

    async fn waiting_position(&self, key: PartitionKey, priority: i64) -> StoreResult<i64> {
        sqlx::query_scalar::<_, i64>(
            r#"
            SELECT COUNT(*)
            FROM waitlist_entries
            WHERE flight_id = $1 AND cabin_class = $2 AND status = 'waiting' AND priority <= $3
            "#,
        )
        .bind(key.flight_id)
        .bind(key.cabin_class.as_str())
        .bind(priority)
        .fetch_one(&self.pool)
        .await
        .map_err(db_err)
    }

    async fn live_offered_seats(&self, key: PartitionKey, now: DateTime<Utc>) -> StoreResult<i32> {
        sqlx::query_scalar::<_, i32>(
            r#"
            SELECT COALESCE(SUM(seats), 0)::INT
            FROM waitlist_entries
            WHERE flight_id = $1 AND cabin_class = $2 AND status = 'offered' AND offer_expires_at > $3
            "#,
        )
        .bind(key.flight_id)
        .bind(key.cabin_class.as_str())
        .bind(now)
        .fetch_one(&self.pool)
        .await
        .map_err(db_err)
    }

    async fn lapsed_offers(&self, now: DateTime<Utc>) -> StoreResult<Vec<WaitlistEntry>> {
        let rows = sqlx::query_as::<_, EntryRow>(&format!(
            r#"
            SELECT {}
            FROM waitlist_entries
            WHERE status = 'offered' AND (offer_expires_at IS NULL OR offer_expires_at < $1)
            "#,
            ENTRY_COLUMNS
        ))
        .bind(now)
        .fetch_all(&self.pool)
        .await
        .map_err(db_err)?;

        rows.into_iter().map(EntryRow::into_entry).collect()
    }
}

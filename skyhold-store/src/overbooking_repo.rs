use async_trait::async_trait;
use chrono::{DateTime, Utc};
use uuid::Uuid;

use skyhold_core::denied_boarding::DeniedBoardingRecord;
use skyhold_core::overbooking::OverbookingConfig;
use skyhold_core::repository::{DeniedBoardingRepository, OverbookingRepository, StoreResult};

use crate::database::{db_err, parse_column, PgStore};

#[derive(sqlx::FromRow)]
struct ConfigRow {
    id: Uuid,
    airline_id: Option<String>,
    origin_id: Option<String>,
    destination_id: Option<String>,
    economy_rate: f64,
    business_rate: f64,
    max_overbooking: i32,
    historical_no_show_rate: f64,
    is_active: bool,
    created_at: DateTime<Utc>,
}

impl From<ConfigRow> for OverbookingConfig {
    fn from(row: ConfigRow) -> Self {
        OverbookingConfig {
            id: row.id,
            airline_id: row.airline_id,
            origin_id: row.origin_id,
            destination_id: row.destination_id,
            economy_rate: row.economy_rate,
            business_rate: row.business_rate,
            max_overbooking: row.max_overbooking,
            historical_no_show_rate: row.historical_no_show_rate,
            is_active: row.is_active,
            created_at: row.created_at,
        }
    }
}

#[derive(sqlx::FromRow)]
struct DeniedRow {
    id: Uuid,
    flight_id: Uuid,
    booking_id: Uuid,
    user_id: String,
    boarding_type: String,
    compensation_amount: i64,
    compensation_type: String,
    alternative_flight_id: Option<Uuid>,
    status: String,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl DeniedRow {
    fn into_record(self) -> StoreResult<DeniedBoardingRecord> {
        Ok(DeniedBoardingRecord {
            id: self.id,
            flight_id: self.flight_id,
            booking_id: self.booking_id,
            user_id: self.user_id,
            boarding_type: parse_column("denied_boardings.boarding_type", &self.boarding_type)?,
            compensation_amount: self.compensation_amount,
            compensation_type: parse_column("denied_boardings.compensation_type", &self.compensation_type)?,
            alternative_flight_id: self.alternative_flight_id,
            status: parse_column("denied_boardings.status", &self.status)?,
            created_at: self.created_at,
            updated_at: self.updated_at,
        })
    }
}

const DENIED_COLUMNS: &str = "id, flight_id, booking_id, user_id, boarding_type, compensation_amount, \
                              compensation_type, alternative_flight_id, status, created_at, updated_at";

#[async_trait]
impl OverbookingRepository for PgStore {
    async fn active_configs(&self) -> StoreResult<Vec<OverbookingConfig>> {
        let rows = sqlx::query_as::<_, ConfigRow>(
            r#"
            SELECT id, airline_id, origin_id, destination_id, economy_rate, business_rate,
                   max_overbooking, historical_no_show_rate, is_active, created_at
            FROM overbooking_configs
            WHERE is_active = TRUE
            "#,
        )
        .fetch_all(&self.pool)
        .await
        .map_err(db_err)?;

        Ok(rows.into_iter().map(OverbookingConfig::from).collect())
    }

    async fn insert_config(&self, config: &OverbookingConfig) -> StoreResult<()> {
        sqlx::query(
            r#"
            INSERT INTO overbooking_configs (id, airline_id, origin_id, destination_id, economy_rate, business_rate,
                                             max_overbooking, historical_no_show_rate, is_active, created_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10)
            "#,
        )
        .bind(config.id)
        .bind(&config.airline_id)
        .bind(&config.origin_id)
        .bind(&config.destination_id)
        .bind(config.economy_rate)
        .bind(config.business_rate)
        .bind(config.max_overbooking)
        .bind(config.historical_no_show_rate)
        .bind(config.is_active)
        .bind(config.created_at)
        .execute(&self.pool)
        .await
        .map_err(db_err)?;

        Ok(())
    }

    async fn deactivate_config(&self, id: Uuid) -> StoreResult<bool> {
        let result = sqlx::query("UPDATE overbooking_configs SET is_active = FALSE WHERE id = $1 AND is_active = TRUE")
            .bind(id)
            .execute(&self.pool)
            .await
            .map_err(db_err)?;

        Ok(result.rows_affected() > 0)
    }
}

#[async_trait]
impl DeniedBoardingRepository for PgStore {
    async fn insert_denied_boarding(&self, record: &DeniedBoardingRecord) -> StoreResult<()> {
        sqlx::query(
            r#"
            INSERT INTO denied_boardings (id, flight_id, booking_id, user_id, boarding_type, compensation_amount,
                                          compensation_type, alternative_flight_id, status, created_at, updated_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11)
            "#,
        )
        .bind(record.id)
        .bind(record.flight_id)
        .bind(record.booking_id)
        .bind(&record.user_id)
        .bind(record.boarding_type.as_str())
        .bind(record.compensation_amount)
        .bind(record.compensation_type.as_str())
        .bind(record.alternative_flight_id)
        .bind(record.status.as_str())
        .bind(record.created_at)
        .bind(record.updated_at)
        .execute(&self.pool)
        .await
        .map_err(db_err)?;

        Ok(())
    }

    async fn get_denied_boarding(&self, id: Uuid) -> StoreResult<Option<DeniedBoardingRecord>> {
        let row = sqlx::query_as::<_, DeniedRow>(&format!(
            "SELECT {} FROM denied_boardings WHERE id = $1",
            DENIED_COLUMNS
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await
        .map_err(db_err)?;

        row.map(DeniedRow::into_record).transpose()
    }

    async fn update_denied_boarding(&self, record: &DeniedBoardingRecord) -> StoreResult<()> {
        sqlx::query("UPDATE denied_boardings SET status = $2, updated_at = $3 WHERE id = $1")
            .bind(record.id)
            .bind(record.status.as_str())
            .bind(record.updated_at)
            .execute(&self.pool)
            .await
            .map_err(db_err)?;

        Ok(())
    }

    async fn list_denied_boardings(&self, flight_id: Uuid) -> StoreResult<Vec<DeniedBoardingRecord>> {
        let rows = sqlx::query_as::<_, DeniedRow>(&format!(
            "SELECT {} FROM denied_boardings WHERE flight_id = $1 ORDER BY created_at ASC",
            DENIED_COLUMNS
        ))
        .bind(flight_id)
        .fetch_all(&self.pool)
        .await
        .map_err(db_err)?;

        rows.into_iter().map(DeniedRow::into_record).collect()
    }
}

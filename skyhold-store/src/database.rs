use sqlx::postgres::PgPoolOptions;
use sqlx::PgPool;
use std::fmt::Display;
use std::str::FromStr;
use std::time::Duration;
use tracing::info;

use skyhold_core::repository::{StoreError, StoreResult};

/// Postgres-backed implementation of every inventory repository.
#[derive(Clone)]
pub struct PgStore {
    pub pool: PgPool,
}

impl PgStore {
    pub async fn connect(connection_string: &str, max_connections: u32) -> Result<Self, sqlx::Error> {
        let pool = PgPoolOptions::new()
            .max_connections(max_connections)
            .acquire_timeout(Duration::from_secs(3))
            .connect(connection_string)
            .await?;

        Ok(Self { pool })
    }

    pub fn from_pool(pool: PgPool) -> Self {
        Self { pool }
    }

    pub async fn migrate(&self) -> Result<(), sqlx::migrate::MigrateError> {
        info!("Running database migrations...");
        sqlx::migrate!("../migrations").run(&self.pool).await?;
        info!("Migrations completed successfully.");
        Ok(())
    }
}

pub(crate) fn db_err(err: sqlx::Error) -> StoreError {
    match err {
        sqlx::Error::ColumnDecode { .. } | sqlx::Error::Decode(_) | sqlx::Error::ColumnNotFound(_) => {
            StoreError::Corrupt(err.to_string())
        }
        other => StoreError::Unavailable(other.to_string()),
    }
}

/// Parse a text column into one of the domain enums.
pub(crate) fn parse_column<T>(column: &str, value: &str) -> StoreResult<T>
where
    T: FromStr,
    T::Err: Display,
{
    value
        .parse()
        .map_err(|e: T::Err| StoreError::Corrupt(format!("{}: {}", column, e)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use skyhold_core::hold::HoldStatus;
    use skyhold_core::CabinClass;

    #[test]
    fn test_parse_column() {
        let status: HoldStatus = parse_column("seat_holds.status", "converted").unwrap();
        assert_eq!(status, HoldStatus::Converted);
        let cabin: CabinClass = parse_column("seat_holds.cabin_class", "business").unwrap();
        assert_eq!(cabin, CabinClass::Business);

        let bad = parse_column::<HoldStatus>("seat_holds.status", "on_fire");
        assert!(matches!(bad, Err(StoreError::Corrupt(msg)) if msg.starts_with("seat_holds.status")));
    }

    #[test]
    fn test_connection_errors_are_unavailable() {
        assert!(matches!(db_err(sqlx::Error::PoolTimedOut), StoreError::Unavailable(_)));
        assert!(matches!(db_err(sqlx::Error::ColumnNotFound("x".into())), StoreError::Corrupt(_)));
    }
}

//! Postgres-backed record stores.
//!
//! `replace_all` runs `DELETE` plus chunked multi-row `INSERT`s inside a single
//! transaction, so a failure at any point rolls back to the previous set and
//! concurrent readers never see an empty or partially-written table.
//!
//! ## Error Mapping
//!
//! | SQLx Error | PostgreSQL Error Code | StorageError |
//! |------------|----------------------|--------------|
//! | Database (unique violation) | `23505` | `DuplicateKey` |
//! | Database (other) | any | `Backend` |
//! | PoolClosed / PoolTimedOut / Io | N/A | `Unavailable` |
//! | Other | N/A | `Backend` |
//!
//! ## Sync bridge
//!
//! [`RecordStore`] is synchronous. The trait impls block on the async methods
//! through the current tokio runtime handle, so they must be called from a
//! blocking context inside a runtime (e.g. `tokio::task::spawn_blocking`).

use std::future::Future;
use std::sync::Arc;

use sqlx::postgres::PgRow;
use sqlx::{PgPool, Postgres, QueryBuilder, Row};
use tracing::{Span, instrument};

use ridership_core::{ForecastRecord, PassengerRecord, TransportType};

use super::{INSERT_CHUNK_SIZE, RecordStore, StorageError, ensure_unique_keys};

const SCHEMA: &[&str] = &[
    r#"
    CREATE TABLE IF NOT EXISTS transport_data (
        year            INTEGER          NOT NULL,
        transport_type  TEXT             NOT NULL,
        passengers      DOUBLE PRECISION NOT NULL CHECK (passengers >= 0),
        PRIMARY KEY (year, transport_type)
    )
    "#,
    r#"
    CREATE TABLE IF NOT EXISTS predictions (
        transport_type        TEXT             NOT NULL,
        prediction_year       INTEGER          NOT NULL,
        predicted_passengers  DOUBLE PRECISION NOT NULL CHECK (predicted_passengers >= 0),
        confidence_level      DOUBLE PRECISION NOT NULL CHECK (confidence_level BETWEEN 0 AND 1),
        PRIMARY KEY (transport_type, prediction_year)
    )
    "#,
    r#"
    CREATE TABLE IF NOT EXISTS company_analysis (
        transport_type  TEXT        PRIMARY KEY,
        company_name    TEXT        NOT NULL,
        analysis_data   JSONB       NOT NULL,
        updated_at      TIMESTAMPTZ NOT NULL
    )
    "#,
];

/// Create the tables used by the Postgres stores if they do not exist.
pub async fn ensure_schema(pool: &PgPool) -> Result<(), StorageError> {
    for statement in SCHEMA {
        sqlx::query(statement)
            .execute(pool)
            .await
            .map_err(|e| map_sqlx_error("ensure_schema", e))?;
    }
    Ok(())
}

/// Store for long-format passenger records (`transport_data` table).
#[derive(Debug, Clone)]
pub struct PostgresPassengerStore {
    pool: Arc<PgPool>,
}

impl PostgresPassengerStore {
    pub fn new(pool: PgPool) -> Self {
        Self {
            pool: Arc::new(pool),
        }
    }

    #[instrument(
        skip(self, records),
        fields(records = records.len(), committed = tracing::field::Empty),
        err
    )]
    pub async fn replace_all_async(&self, records: Vec<PassengerRecord>) -> Result<usize, StorageError> {
        ensure_unique_keys(&records)?;

        let mut tx = self
            .pool
            .begin()
            .await
            .map_err(|e| map_sqlx_error("begin_transaction", e))?;

        sqlx::query("DELETE FROM transport_data")
            .execute(&mut *tx)
            .await
            .map_err(|e| map_sqlx_error("delete_transport_data", e))?;

        for chunk in records.chunks(INSERT_CHUNK_SIZE) {
            let mut qb: QueryBuilder<Postgres> =
                QueryBuilder::new("INSERT INTO transport_data (year, transport_type, passengers) ");
            qb.push_values(chunk, |mut b, r| {
                b.push_bind(r.year)
                    .push_bind(r.transport_type.to_string())
                    .push_bind(r.passengers);
            });
            qb.build()
                .execute(&mut *tx)
                .await
                .map_err(|e| map_sqlx_error("insert_transport_data", e))?;
        }

        tx.commit()
            .await
            .map_err(|e| map_sqlx_error("commit_transaction", e))?;

        Span::current().record("committed", records.len());
        Ok(records.len())
    }

    #[instrument(skip(self), err)]
    pub async fn read_all_async(&self) -> Result<Vec<PassengerRecord>, StorageError> {
        let rows = sqlx::query(
            r#"
            SELECT year, transport_type, passengers
            FROM transport_data
            ORDER BY year ASC, transport_type COLLATE "C" ASC
            "#,
        )
        .fetch_all(&*self.pool)
        .await
        .map_err(|e| map_sqlx_error("read_transport_data", e))?;

        rows.iter().map(passenger_from_row).collect()
    }
}

impl RecordStore<PassengerRecord> for PostgresPassengerStore {
    fn replace_all(&self, records: Vec<PassengerRecord>) -> Result<usize, StorageError> {
        block_on(self.replace_all_async(records))?
    }

    fn read_all(&self) -> Result<Vec<PassengerRecord>, StorageError> {
        block_on(self.read_all_async())?
    }
}

/// Store for forecast records (`predictions` table).
#[derive(Debug, Clone)]
pub struct PostgresForecastStore {
    pool: Arc<PgPool>,
}

impl PostgresForecastStore {
    pub fn new(pool: PgPool) -> Self {
        Self {
            pool: Arc::new(pool),
        }
    }

    #[instrument(skip(self, records), fields(records = records.len()), err)]
    pub async fn replace_all_async(&self, records: Vec<ForecastRecord>) -> Result<usize, StorageError> {
        ensure_unique_keys(&records)?;

        let mut tx = self
            .pool
            .begin()
            .await
            .map_err(|e| map_sqlx_error("begin_transaction", e))?;

        sqlx::query("DELETE FROM predictions")
            .execute(&mut *tx)
            .await
            .map_err(|e| map_sqlx_error("delete_predictions", e))?;

        for chunk in records.chunks(INSERT_CHUNK_SIZE) {
            let mut qb: QueryBuilder<Postgres> = QueryBuilder::new(
                "INSERT INTO predictions (transport_type, prediction_year, predicted_passengers, confidence_level) ",
            );
            qb.push_values(chunk, |mut b, r| {
                b.push_bind(r.transport_type.to_string())
                    .push_bind(r.prediction_year)
                    .push_bind(r.predicted_passengers)
                    .push_bind(r.confidence_level);
            });
            qb.build()
                .execute(&mut *tx)
                .await
                .map_err(|e| map_sqlx_error("insert_predictions", e))?;
        }

        tx.commit()
            .await
            .map_err(|e| map_sqlx_error("commit_transaction", e))?;

        Ok(records.len())
    }

    #[instrument(skip(self), err)]
    pub async fn read_all_async(&self) -> Result<Vec<ForecastRecord>, StorageError> {
        let rows = sqlx::query(
            r#"
            SELECT transport_type, prediction_year, predicted_passengers, confidence_level
            FROM predictions
            ORDER BY transport_type COLLATE "C" ASC, prediction_year ASC
            "#,
        )
        .fetch_all(&*self.pool)
        .await
        .map_err(|e| map_sqlx_error("read_predictions", e))?;

        rows.iter().map(forecast_from_row).collect()
    }
}

impl RecordStore<ForecastRecord> for PostgresForecastStore {
    fn replace_all(&self, records: Vec<ForecastRecord>) -> Result<usize, StorageError> {
        block_on(self.replace_all_async(records))?
    }

    fn read_all(&self) -> Result<Vec<ForecastRecord>, StorageError> {
        block_on(self.read_all_async())?
    }
}

fn passenger_from_row(row: &PgRow) -> Result<PassengerRecord, StorageError> {
    let year: i32 = row.try_get("year").map_err(|e| map_sqlx_error("decode_year", e))?;
    let code: String = row
        .try_get("transport_type")
        .map_err(|e| map_sqlx_error("decode_transport_type", e))?;
    let passengers: f64 = row
        .try_get("passengers")
        .map_err(|e| map_sqlx_error("decode_passengers", e))?;

    let transport_type = TransportType::new(&code).map_err(corrupt_row)?;
    PassengerRecord::new(year, transport_type, passengers).map_err(corrupt_row)
}

fn forecast_from_row(row: &PgRow) -> Result<ForecastRecord, StorageError> {
    let code: String = row
        .try_get("transport_type")
        .map_err(|e| map_sqlx_error("decode_transport_type", e))?;
    let year: i32 = row
        .try_get("prediction_year")
        .map_err(|e| map_sqlx_error("decode_prediction_year", e))?;
    let predicted: f64 = row
        .try_get("predicted_passengers")
        .map_err(|e| map_sqlx_error("decode_predicted_passengers", e))?;
    let confidence: f64 = row
        .try_get("confidence_level")
        .map_err(|e| map_sqlx_error("decode_confidence_level", e))?;

    let transport_type = TransportType::new(&code).map_err(corrupt_row)?;
    ForecastRecord::new(transport_type, year, predicted, confidence).map_err(corrupt_row)
}

fn corrupt_row(err: ridership_core::DomainError) -> StorageError {
    StorageError::Backend(format!("stored row violates record invariants: {err}"))
}

/// Run an async store operation from synchronous code.
pub(crate) fn block_on<F: Future>(fut: F) -> Result<F::Output, StorageError> {
    let handle = tokio::runtime::Handle::try_current().map_err(|_| {
        StorageError::Unavailable(
            "postgres stores require a tokio runtime; call them from spawn_blocking".to_string(),
        )
    })?;
    Ok(handle.block_on(fut))
}

pub(crate) fn map_sqlx_error(operation: &str, err: sqlx::Error) -> StorageError {
    match err {
        sqlx::Error::Database(db_err) => {
            let msg = format!("database error in {}: {}", operation, db_err.message());
            match db_err.code() {
                Some(code) if code.as_ref() == "23505" => StorageError::DuplicateKey(msg),
                _ => StorageError::Backend(msg),
            }
        }
        sqlx::Error::PoolClosed | sqlx::Error::PoolTimedOut => {
            StorageError::Unavailable(format!("connection pool unavailable in {operation}"))
        }
        sqlx::Error::Io(e) => StorageError::Unavailable(format!("io error in {operation}: {e}")),
        _ => StorageError::Backend(format!("sqlx error in {operation}: {err}")),
    }
}

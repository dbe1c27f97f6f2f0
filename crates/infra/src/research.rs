//! Storage for per-type company research.
//!
//! The research text itself is produced elsewhere (typically by an LLM prompt
//! outside this workspace). Here it is only structured and stored, one entry
//! per transport type, last write wins.

use std::collections::BTreeMap;
use std::sync::{Arc, RwLock};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Value as JsonValue, json};
use sqlx::PgPool;
use sqlx::Row;
use sqlx::types::Json;
use tracing::instrument;

use ridership_core::TransportType;

use crate::store::StorageError;
use crate::store::postgres::{block_on, map_sqlx_error};

pub const DEFAULT_COMPANY_NAME: &str = "Multiple Companies";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CompanyAnalysis {
    pub transport_type: TransportType,
    pub company_name: String,
    pub analysis_data: JsonValue,
    pub updated_at: DateTime<Utc>,
}

/// Pull the outermost `{...}` object out of free text.
///
/// Falls back to `{"raw_analysis": text, "companies": []}` when the text holds
/// no parseable object.
pub fn structure_analysis(text: &str) -> JsonValue {
    let embedded = match (text.find('{'), text.rfind('}')) {
        (Some(start), Some(end)) if start < end => {
            serde_json::from_str::<JsonValue>(&text[start..=end]).ok()
        }
        _ => None,
    };

    match embedded {
        Some(value @ JsonValue::Object(_)) => value,
        _ => json!({ "raw_analysis": text, "companies": [] }),
    }
}

pub trait CompanyAnalysisStore: Send + Sync {
    /// Insert or replace the entry for `analysis.transport_type`.
    fn upsert(&self, analysis: CompanyAnalysis) -> Result<(), StorageError>;

    fn get(&self, transport_type: &TransportType) -> Result<Option<CompanyAnalysis>, StorageError>;

    /// All entries, ordered by transport type.
    fn list(&self) -> Result<Vec<CompanyAnalysis>, StorageError>;
}

impl<S> CompanyAnalysisStore for Arc<S>
where
    S: CompanyAnalysisStore + ?Sized,
{
    fn upsert(&self, analysis: CompanyAnalysis) -> Result<(), StorageError> {
        (**self).upsert(analysis)
    }

    fn get(&self, transport_type: &TransportType) -> Result<Option<CompanyAnalysis>, StorageError> {
        (**self).get(transport_type)
    }

    fn list(&self) -> Result<Vec<CompanyAnalysis>, StorageError> {
        (**self).list()
    }
}

/// Structure `text` and store it for `transport_type`.
pub fn record_analysis<S: CompanyAnalysisStore + ?Sized>(
    store: &S,
    transport_type: TransportType,
    text: &str,
    now: DateTime<Utc>,
) -> Result<CompanyAnalysis, StorageError> {
    let analysis = CompanyAnalysis {
        transport_type,
        company_name: DEFAULT_COMPANY_NAME.to_string(),
        analysis_data: structure_analysis(text),
        updated_at: now,
    };
    store.upsert(analysis.clone())?;
    Ok(analysis)
}

/// In-memory store for tests/dev.
#[derive(Debug, Default)]
pub struct InMemoryCompanyAnalysisStore {
    inner: RwLock<BTreeMap<TransportType, CompanyAnalysis>>,
}

impl InMemoryCompanyAnalysisStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl CompanyAnalysisStore for InMemoryCompanyAnalysisStore {
    fn upsert(&self, analysis: CompanyAnalysis) -> Result<(), StorageError> {
        let mut map = self.inner.write().map_err(|_| StorageError::Poisoned)?;
        map.insert(analysis.transport_type.clone(), analysis);
        Ok(())
    }

    fn get(&self, transport_type: &TransportType) -> Result<Option<CompanyAnalysis>, StorageError> {
        let map = self.inner.read().map_err(|_| StorageError::Poisoned)?;
        Ok(map.get(transport_type).cloned())
    }

    fn list(&self) -> Result<Vec<CompanyAnalysis>, StorageError> {
        let map = self.inner.read().map_err(|_| StorageError::Poisoned)?;
        Ok(map.values().cloned().collect())
    }
}

/// Postgres-backed store (`company_analysis` table).
#[derive(Debug, Clone)]
pub struct PostgresCompanyAnalysisStore {
    pool: Arc<PgPool>,
}

impl PostgresCompanyAnalysisStore {
    pub fn new(pool: PgPool) -> Self {
        Self {
            pool: Arc::new(pool),
        }
    }

    #[instrument(skip(self, analysis), fields(transport_type = %analysis.transport_type), err)]
    pub async fn upsert_async(&self, analysis: CompanyAnalysis) -> Result<(), StorageError> {
        sqlx::query(
            r#"
            INSERT INTO company_analysis (transport_type, company_name, analysis_data, updated_at)
            VALUES ($1, $2, $3, $4)
            ON CONFLICT (transport_type)
            DO UPDATE SET
                company_name = EXCLUDED.company_name,
                analysis_data = EXCLUDED.analysis_data,
                updated_at = EXCLUDED.updated_at
            "#,
        )
        .bind(analysis.transport_type.to_string())
        .bind(&analysis.company_name)
        .bind(Json(&analysis.analysis_data))
        .bind(analysis.updated_at)
        .execute(&*self.pool)
        .await
        .map_err(|e| map_sqlx_error("upsert_company_analysis", e))?;

        Ok(())
    }

    #[instrument(skip(self), err)]
    pub async fn get_async(
        &self,
        transport_type: &TransportType,
    ) -> Result<Option<CompanyAnalysis>, StorageError> {
        let row = sqlx::query(
            r#"
            SELECT transport_type, company_name, analysis_data, updated_at
            FROM company_analysis
            WHERE transport_type = $1
            "#,
        )
        .bind(transport_type.to_string())
        .fetch_optional(&*self.pool)
        .await
        .map_err(|e| map_sqlx_error("get_company_analysis", e))?;

        row.as_ref().map(analysis_from_row).transpose()
    }

    #[instrument(skip(self), err)]
    pub async fn list_async(&self) -> Result<Vec<CompanyAnalysis>, StorageError> {
        let rows = sqlx::query(
            r#"
            SELECT transport_type, company_name, analysis_data, updated_at
            FROM company_analysis
            ORDER BY transport_type COLLATE "C" ASC
            "#,
        )
        .fetch_all(&*self.pool)
        .await
        .map_err(|e| map_sqlx_error("list_company_analysis", e))?;

        rows.iter().map(analysis_from_row).collect()
    }
}

impl CompanyAnalysisStore for PostgresCompanyAnalysisStore {
    fn upsert(&self, analysis: CompanyAnalysis) -> Result<(), StorageError> {
        block_on(self.upsert_async(analysis))?
    }

    fn get(&self, transport_type: &TransportType) -> Result<Option<CompanyAnalysis>, StorageError> {
        block_on(self.get_async(transport_type))?
    }

    fn list(&self) -> Result<Vec<CompanyAnalysis>, StorageError> {
        block_on(self.list_async())?
    }
}

fn analysis_from_row(row: &sqlx::postgres::PgRow) -> Result<CompanyAnalysis, StorageError> {
    let code: String = row
        .try_get("transport_type")
        .map_err(|e| map_sqlx_error("decode_transport_type", e))?;
    let company_name: String = row
        .try_get("company_name")
        .map_err(|e| map_sqlx_error("decode_company_name", e))?;
    let Json(analysis_data): Json<JsonValue> = row
        .try_get("analysis_data")
        .map_err(|e| map_sqlx_error("decode_analysis_data", e))?;
    let updated_at: DateTime<Utc> = row
        .try_get("updated_at")
        .map_err(|e| map_sqlx_error("decode_updated_at", e))?;

    let transport_type = TransportType::new(&code)
        .map_err(|e| StorageError::Backend(format!("stored row violates record invariants: {e}")))?;

    Ok(CompanyAnalysis {
        transport_type,
        company_name,
        analysis_data,
        updated_at,
    })
}

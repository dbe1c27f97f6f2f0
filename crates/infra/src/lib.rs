//! Infrastructure layer: record stores (in-memory, Postgres), pipeline
//! orchestration, company-research storage and configuration.

pub mod config;
pub mod pipeline;
pub mod research;
pub mod store;

pub use config::{Config, ConfigError};
pub use pipeline::{ForecastSummary, IngestError, IngestSummary, Pipeline};
pub use research::{
    CompanyAnalysis, CompanyAnalysisStore, InMemoryCompanyAnalysisStore, PostgresCompanyAnalysisStore,
    record_analysis, structure_analysis,
};
pub use store::{InMemoryRecordStore, RecordStore, StorageError};

use std::sync::Arc;

use anyhow::Context;
use sqlx::PgPool;

use ridership_core::{ForecastRecord, PassengerRecord};
use ridership_infra::research::{
    CompanyAnalysisStore, InMemoryCompanyAnalysisStore, PostgresCompanyAnalysisStore,
};
use ridership_infra::store::{
    InMemoryRecordStore, PostgresForecastStore, PostgresPassengerStore, RecordStore, ensure_schema,
};
use ridership_infra::{Config, Pipeline};

pub type DynPassengerStore = Arc<dyn RecordStore<PassengerRecord>>;
pub type DynForecastStore = Arc<dyn RecordStore<ForecastRecord>>;
pub type AppPipeline = Pipeline<DynPassengerStore, DynForecastStore>;

/// Everything the handlers need, shared behind an `Arc`.
pub struct AppServices {
    pub config: Config,
    pub pipeline: AppPipeline,
    pub companies: Arc<dyn CompanyAnalysisStore>,
}

impl AppServices {
    pub fn new(
        config: Config,
        series: DynPassengerStore,
        predictions: DynForecastStore,
        companies: Arc<dyn CompanyAnalysisStore>,
    ) -> Self {
        let pipeline = Pipeline::new(series, predictions).with_parser(config.parser());
        Self {
            config,
            pipeline,
            companies,
        }
    }

    /// Run synchronous pipeline/store work off the async executor.
    ///
    /// The Postgres stores block on the runtime handle, which is only allowed
    /// from a blocking thread.
    pub async fn blocking<T, F>(self: &Arc<Self>, f: F) -> Result<T, tokio::task::JoinError>
    where
        F: FnOnce(&AppServices) -> T + Send + 'static,
        T: Send + 'static,
    {
        let services = Arc::clone(self);
        tokio::task::spawn_blocking(move || f(&services)).await
    }
}

/// Wire stores according to `config`: Postgres when `DATABASE_URL` is set,
/// in-memory otherwise.
pub async fn build_services(config: Config) -> anyhow::Result<AppServices> {
    match config.database_url.clone() {
        Some(url) => build_persistent_services(config, &url).await,
        None => {
            tracing::info!("DATABASE_URL not set; using in-memory stores");
            Ok(build_in_memory_services(config))
        }
    }
}

pub fn build_in_memory_services(config: Config) -> AppServices {
    let series: DynPassengerStore = Arc::new(InMemoryRecordStore::<PassengerRecord>::new());
    let predictions: DynForecastStore = Arc::new(InMemoryRecordStore::<ForecastRecord>::new());
    let companies: Arc<dyn CompanyAnalysisStore> = Arc::new(InMemoryCompanyAnalysisStore::new());

    AppServices::new(config, series, predictions, companies)
}

async fn build_persistent_services(config: Config, database_url: &str) -> anyhow::Result<AppServices> {
    let pool = PgPool::connect(database_url)
        .await
        .context("failed to connect to Postgres")?;

    ensure_schema(&pool)
        .await
        .context("failed to create ridership tables")?;

    let series: DynPassengerStore = Arc::new(PostgresPassengerStore::new(pool.clone()));
    let predictions: DynForecastStore = Arc::new(PostgresForecastStore::new(pool.clone()));
    let companies: Arc<dyn CompanyAnalysisStore> = Arc::new(PostgresCompanyAnalysisStore::new(pool));

    tracing::info!("using Postgres stores");
    Ok(AppServices::new(config, series, predictions, companies))
}

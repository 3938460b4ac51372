use std::sync::Arc;

use larder_infra::config::StoreConfig;
use larder_infra::store::{
    InMemoryItemStore, InMemoryRecordStore, ItemStore, PostgresItemStore, PostgresRecordStore, RecordStore, connect,
};
use larder_infra::{LedgerService, LedgerSettings};

/// Which storage backend the service runs on.
#[derive(Debug, Copy, Clone, PartialEq, Eq, serde::Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Backend {
    InMemory,
    Postgres,
}

/// Shared state handed to every handler.
#[derive(Clone)]
pub struct AppServices {
    pub ledger: LedgerService,
    pub backend: Backend,
}

impl AppServices {
    pub fn in_memory(settings: LedgerSettings) -> Self {
        let items: Arc<dyn ItemStore> = Arc::new(InMemoryItemStore::new());
        let records: Arc<dyn RecordStore> = Arc::new(InMemoryRecordStore::new());
        Self {
            ledger: LedgerService::new(items, records, settings),
            backend: Backend::InMemory,
        }
    }
}

pub async fn build_services(store: &StoreConfig, settings: LedgerSettings) -> anyhow::Result<AppServices> {
    match store {
        StoreConfig::InMemory => {
            tracing::info!("using in-memory stores");
            Ok(AppServices::in_memory(settings))
        }
        StoreConfig::Postgres {
            database_url,
            max_connections,
        } => {
            let pool = connect(database_url, *max_connections).await?;
            let items: Arc<dyn ItemStore> = Arc::new(PostgresItemStore::new(pool.clone()));
            let records: Arc<dyn RecordStore> = Arc::new(PostgresRecordStore::new(pool));
            Ok(AppServices {
                ledger: LedgerService::new(items, records, settings),
                backend: Backend::Postgres,
            })
        }
    }
}

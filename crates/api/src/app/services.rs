//! Service wiring: one ledger store shared by every service.

use std::sync::Arc;

use shopledger_core::SettingsMap;
use shopledger_core::settings::{
    CURRENCY, DEFAULT_CURRENCY, DEFAULT_EXPIRY_ALERT_DAYS, EXPIRY_ALERT_DAYS, LOW_STOCK_ALERT, TAX_RATE,
};
use shopledger_infra::{
    AlertDeriver, AppConfig, Catalog, Dashboard, FinancialAggregator, InMemoryLedgerStore, InventoryAllocator,
    LedgerStore, PostgresLedgerStore, SaleCommitter, SettingsService, StaffRoster, StoreBackend, StoreError,
};

pub type SharedStore = Arc<dyn LedgerStore>;

#[derive(Clone)]
pub struct AppServices {
    pub catalog: Catalog<SharedStore>,
    pub allocator: InventoryAllocator<SharedStore>,
    pub committer: SaleCommitter<SharedStore>,
    pub alerts: AlertDeriver<SharedStore>,
    pub finance: FinancialAggregator<SharedStore>,
    pub dashboard: Dashboard<SharedStore>,
    pub settings: SettingsService<SharedStore>,
    pub staff: StaffRoster<SharedStore>,
}

impl AppServices {
    pub fn new(store: SharedStore) -> Self {
        Self {
            catalog: Catalog::new(store.clone()),
            allocator: InventoryAllocator::new(store.clone()),
            committer: SaleCommitter::new(store.clone()),
            alerts: AlertDeriver::new(store.clone()),
            finance: FinancialAggregator::new(store.clone()),
            dashboard: Dashboard::new(store.clone()),
            settings: SettingsService::new(store.clone()),
            staff: StaffRoster::new(store),
        }
    }

    /// In-memory wiring (dev/test), seeded with the default settings rows.
    pub fn in_memory() -> Self {
        Self::new(Arc::new(InMemoryLedgerStore::with_settings(default_settings())))
    }
}

/// The rows a fresh install starts with.
pub fn default_settings() -> SettingsMap {
    [
        (EXPIRY_ALERT_DAYS, DEFAULT_EXPIRY_ALERT_DAYS.to_string()),
        (TAX_RATE, "0".to_string()),
        (LOW_STOCK_ALERT, "true".to_string()),
        (CURRENCY, DEFAULT_CURRENCY.to_string()),
    ]
    .into_iter()
    .map(|(k, v)| (k.to_string(), v))
    .collect()
}

pub async fn build_services(config: &AppConfig) -> Result<AppServices, StoreError> {
    match &config.store {
        StoreBackend::InMemory => {
            tracing::info!("using in-memory ledger store");
            Ok(AppServices::in_memory())
        }
        StoreBackend::Postgres { database_url } => {
            let store = PostgresLedgerStore::connect(database_url).await?;
            store.migrate().await?;
            tracing::info!("using postgres ledger store");
            Ok(AppServices::new(Arc::new(store)))
        }
    }
}

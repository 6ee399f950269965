//! Infrastructure layer: ledger storage, the services that orchestrate the
//! domain crates over it, and process configuration.

pub mod alert_deriver;
pub mod allocator;
pub mod catalog;
pub mod config;
pub mod dashboard;
pub mod error;
pub mod finance;
pub mod sale_committer;
pub mod settings;
pub mod staff;
pub mod store;

pub use alert_deriver::{AlertCounts, AlertDeriver};
pub use allocator::InventoryAllocator;
pub use catalog::Catalog;
pub use config::{AppConfig, ConfigError, StoreBackend};
pub use dashboard::{Dashboard, DashboardSnapshot, Metric, RankedProduct};
pub use error::{ServiceError, StoreError, StoreResult};
pub use finance::FinancialAggregator;
pub use sale_committer::SaleCommitter;
pub use settings::SettingsService;
pub use staff::StaffRoster;
pub use store::{InMemoryLedgerStore, LedgerStore, PostgresLedgerStore};

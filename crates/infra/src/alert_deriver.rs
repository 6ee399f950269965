//! Read-only stock projections: alerts, stock levels and the POS list.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use tracing::instrument;

use shopledger_core::Settings;
use shopledger_inventory::{
    Alert, AlertPolicy, Lot, Product, StockLevel, count_alerted_products, count_new_alerts, derive_alerts,
    stock_levels,
};

use crate::error::ServiceError;
use crate::store::LedgerStore;

/// Alert totals shown on the dashboard.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct AlertCounts {
    /// Distinct products with at least one alert.
    pub products: usize,
    pub new_today: usize,
}

struct Snapshot {
    products: Vec<Product>,
    lots: Vec<Lot>,
    policy: AlertPolicy,
}

#[derive(Debug, Clone)]
pub struct AlertDeriver<S> {
    store: S,
}

impl<S: LedgerStore> AlertDeriver<S> {
    pub fn new(store: S) -> Self {
        Self { store }
    }

    async fn snapshot(&self) -> Result<Snapshot, ServiceError> {
        let settings = Settings::from_map(&self.store.load_settings().await?);
        Ok(Snapshot {
            products: self.store.list_products().await?,
            lots: self.store.list_lots().await?,
            policy: AlertPolicy::from(&settings),
        })
    }

    #[instrument(skip(self), err)]
    pub async fn derive_alerts(&self, today: NaiveDate) -> Result<Vec<Alert>, ServiceError> {
        let s = self.snapshot().await?;
        Ok(derive_alerts(&s.products, &s.lots, &s.policy, today))
    }

    #[instrument(skip(self), err)]
    pub async fn alert_counts(&self, today: NaiveDate) -> Result<AlertCounts, ServiceError> {
        let s = self.snapshot().await?;
        let alerts = derive_alerts(&s.products, &s.lots, &s.policy, today);
        Ok(AlertCounts {
            products: count_alerted_products(&alerts),
            new_today: count_new_alerts(&s.products, &s.lots, &s.policy, today),
        })
    }

    #[instrument(skip(self), err)]
    pub async fn stock_levels(&self, today: NaiveDate) -> Result<Vec<StockLevel>, ServiceError> {
        let s = self.snapshot().await?;
        Ok(stock_levels(&s.products, &s.lots, &s.policy, today))
    }

    /// Products that can be sold right now (total stock > 0).
    #[instrument(skip(self), err)]
    pub async fn available_products(&self, today: NaiveDate) -> Result<Vec<StockLevel>, ServiceError> {
        let mut levels = self.stock_levels(today).await?;
        levels.retain(StockLevel::in_stock);
        Ok(levels)
    }
}

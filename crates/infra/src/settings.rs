//! Store settings (key/value rows).

use tracing::{info, instrument};

use shopledger_core::{Settings, SettingsMap};

use crate::error::ServiceError;
use crate::store::LedgerStore;

#[derive(Debug, Clone)]
pub struct SettingsService<S> {
    store: S,
}

impl<S: LedgerStore> SettingsService<S> {
    pub fn new(store: S) -> Self {
        Self { store }
    }

    pub async fn all(&self) -> Result<SettingsMap, ServiceError> {
        Ok(self.store.load_settings().await?)
    }

    /// Typed view with defaults for missing or malformed rows.
    pub async fn effective(&self) -> Result<Settings, ServiceError> {
        Ok(Settings::from_map(&self.all().await?))
    }

    /// Validate and store one setting; returns the full map afterwards.
    #[instrument(skip(self, value), err)]
    pub async fn update(&self, key: &str, value: &str) -> Result<SettingsMap, ServiceError> {
        let key = key.trim();
        Settings::validate_entry(key, value)?;
        self.store.upsert_setting(key, value.trim()).await?;
        info!(key, "setting updated");
        self.all().await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    use crate::store::InMemoryLedgerStore;

    #[tokio::test]
    async fn recognised_keys_are_validated() {
        let settings = SettingsService::new(Arc::new(InMemoryLedgerStore::new()));

        assert!(matches!(
            settings.update("tax_rate", "dieciseis").await,
            Err(ServiceError::Validation(_))
        ));
        assert!(settings.update("expiry_alert_days", "-3").await.is_err());

        let all = settings.update("tax_rate", " 8.25 ").await.unwrap();
        assert_eq!(all.get("tax_rate").map(String::as_str), Some("8.25"));
        assert_eq!(settings.effective().await.unwrap().tax_rate_bps, 825);

        settings.update("store_name", "Abarrotes Lupita").await.unwrap();
        assert_eq!(settings.all().await.unwrap().len(), 2);
    }
}

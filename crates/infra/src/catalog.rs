//! Product catalog and stock intake.

use chrono::{DateTime, Utc};
use tracing::{info, instrument};

use shopledger_core::{LotId, ProductId};
use shopledger_inventory::{Lot, LotAdjustment, NewProduct, Product, ProductUpdate, ReceiveLot};

use crate::error::ServiceError;
use crate::store::LedgerStore;

#[derive(Debug, Clone)]
pub struct Catalog<S> {
    store: S,
}

impl<S: LedgerStore> Catalog<S> {
    pub fn new(store: S) -> Self {
        Self { store }
    }

    #[instrument(skip(self, new), fields(name = %new.name), err)]
    pub async fn create_product(&self, new: NewProduct, now: DateTime<Utc>) -> Result<Product, ServiceError> {
        let product = new.into_product(ProductId::new(), now)?;
        self.store.insert_product(&product).await?;
        info!(product_id = %product.id, "product created");
        Ok(product)
    }

    pub async fn product(&self, product_id: ProductId) -> Result<Product, ServiceError> {
        self.store
            .get_product(product_id)
            .await?
            .ok_or_else(|| ServiceError::NotFound(format!("product {product_id}")))
    }

    pub async fn products(&self) -> Result<Vec<Product>, ServiceError> {
        Ok(self.store.list_products().await?)
    }

    /// Change the given fields of a product; the rest stay as stored.
    #[instrument(skip(self, update), fields(product_id = %product_id), err)]
    pub async fn update_product(
        &self,
        product_id: ProductId,
        update: ProductUpdate,
    ) -> Result<Product, ServiceError> {
        if update.is_empty() {
            return Err(ServiceError::Validation("no fields to update".to_string()));
        }
        let mut product = self.product(product_id).await?;
        product.apply(update)?;
        self.store.update_product(&product).await?;
        info!("product updated");
        Ok(product)
    }

    /// Record an incoming lot. The product must exist.
    #[instrument(skip(self, receipt), fields(product_id = %receipt.product_id), err)]
    pub async fn receive_lot(&self, receipt: ReceiveLot, now: DateTime<Utc>) -> Result<Lot, ServiceError> {
        let lot = receipt.into_lot(LotId::new(), now)?;
        self.store.insert_lot(&lot).await?;
        info!(lot_id = %lot.id, quantity = lot.quantity, "lot received");
        Ok(lot)
    }

    /// Correct a lot's count by `delta` (shrinkage, recount, returns).
    #[instrument(skip(self, adjustment), fields(lot_id = %lot_id, delta = adjustment.delta), err)]
    pub async fn adjust_lot(
        &self,
        lot_id: LotId,
        adjustment: LotAdjustment,
        now: DateTime<Utc>,
    ) -> Result<Lot, ServiceError> {
        if adjustment.delta == 0 {
            return Err(ServiceError::Validation("adjustment cannot be zero".to_string()));
        }
        let lot = self.store.adjust_lot(lot_id, adjustment.delta, now).await?;
        info!(
            quantity = lot.quantity,
            reason = adjustment.reason.as_deref().unwrap_or(""),
            "lot adjusted"
        );
        Ok(lot)
    }

    /// Lots of one product in FEFO order.
    pub async fn lots_of(&self, product_id: ProductId) -> Result<Vec<Lot>, ServiceError> {
        self.product(product_id).await?;
        Ok(self.store.find_lots_by_product(product_id).await?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    use chrono::NaiveDate;
    use shopledger_core::Money;
    use shopledger_inventory::{Category, Unit};

    use crate::store::InMemoryLedgerStore;

    fn tomato() -> NewProduct {
        NewProduct {
            name: "Jitomate".to_string(),
            description: None,
            category: Category::Vegetables,
            barcode: None,
            unit: Unit::Kg,
            price: Money::from_cents(3200),
            cost: Some(Money::from_cents(2100)),
            min_stock: None,
            is_perishable: true,
        }
    }

    fn receipt(product_id: ProductId, quantity: i64, expiry: Option<NaiveDate>) -> ReceiveLot {
        ReceiveLot {
            product_id,
            quantity,
            expiry_date: expiry,
            batch_number: None,
            location: None,
        }
    }

    #[tokio::test]
    async fn created_product_gets_default_min_stock() {
        let catalog = Catalog::new(Arc::new(InMemoryLedgerStore::new()));
        let product = catalog.create_product(tomato(), Utc::now()).await.unwrap();
        assert_eq!(product.min_stock, shopledger_inventory::product::DEFAULT_MIN_STOCK);
        assert_eq!(catalog.product(product.id).await.unwrap(), product);
    }

    #[tokio::test]
    async fn lots_are_listed_in_fefo_order() {
        let catalog = Catalog::new(Arc::new(InMemoryLedgerStore::new()));
        let product = catalog.create_product(tomato(), Utc::now()).await.unwrap();

        let undated = catalog.receive_lot(receipt(product.id, 5, None), Utc::now()).await.unwrap();
        let late = catalog
            .receive_lot(receipt(product.id, 5, NaiveDate::from_ymd_opt(2024, 7, 1)), Utc::now())
            .await
            .unwrap();
        let early = catalog
            .receive_lot(receipt(product.id, 5, NaiveDate::from_ymd_opt(2024, 6, 1)), Utc::now())
            .await
            .unwrap();

        let ids: Vec<LotId> = catalog.lots_of(product.id).await.unwrap().iter().map(|l| l.id).collect();
        assert_eq!(ids, vec![early.id, late.id, undated.id]);
    }

    #[tokio::test]
    async fn lot_for_unknown_product_is_not_found() {
        let catalog = Catalog::new(Arc::new(InMemoryLedgerStore::new()));
        let err = catalog
            .receive_lot(receipt(ProductId::new(), 1, None), Utc::now())
            .await
            .unwrap_err();
        assert!(matches!(err, ServiceError::NotFound(_)));
    }

    #[tokio::test]
    async fn update_changes_given_fields_and_rejects_bad_ones() {
        let catalog = Catalog::new(Arc::new(InMemoryLedgerStore::new()));
        let product = catalog.create_product(tomato(), Utc::now()).await.unwrap();

        let updated = catalog
            .update_product(
                product.id,
                ProductUpdate {
                    price: Some(Money::from_cents(3500)),
                    min_stock: Some(4),
                    ..ProductUpdate::default()
                },
            )
            .await
            .unwrap();
        assert_eq!(updated.price.cents(), 3500);
        assert_eq!(updated.min_stock, 4);
        assert_eq!(updated.name, "Jitomate");
        assert_eq!(catalog.product(product.id).await.unwrap(), updated);

        let err = catalog
            .update_product(
                product.id,
                ProductUpdate {
                    name: Some(" ".to_string()),
                    price: Some(Money::from_cents(1)),
                    ..ProductUpdate::default()
                },
            )
            .await
            .unwrap_err();
        assert!(matches!(err, ServiceError::Validation(_)));
        assert_eq!(catalog.product(product.id).await.unwrap().price.cents(), 3500);

        let err = catalog
            .update_product(product.id, ProductUpdate::default())
            .await
            .unwrap_err();
        assert!(matches!(err, ServiceError::Validation(_)));
        let err = catalog
            .update_product(ProductId::new(), ProductUpdate { min_stock: Some(1), ..ProductUpdate::default() })
            .await
            .unwrap_err();
        assert!(matches!(err, ServiceError::NotFound(_)));
    }

    #[tokio::test]
    async fn adjustment_cannot_take_a_lot_below_zero() {
        let catalog = Catalog::new(Arc::new(InMemoryLedgerStore::new()));
        let product = catalog.create_product(tomato(), Utc::now()).await.unwrap();
        let lot = catalog.receive_lot(receipt(product.id, 6, None), Utc::now()).await.unwrap();

        let shrink = LotAdjustment { delta: -2, reason: Some("merma".to_string()) };
        assert_eq!(catalog.adjust_lot(lot.id, shrink, Utc::now()).await.unwrap().quantity, 4);

        let err = catalog
            .adjust_lot(lot.id, LotAdjustment { delta: -5, reason: None }, Utc::now())
            .await
            .unwrap_err();
        assert!(matches!(err, ServiceError::Validation(_)));
        let err = catalog
            .adjust_lot(lot.id, LotAdjustment { delta: 0, reason: None }, Utc::now())
            .await
            .unwrap_err();
        assert!(matches!(err, ServiceError::Validation(_)));
        let err = catalog
            .adjust_lot(LotId::new(), LotAdjustment { delta: 1, reason: None }, Utc::now())
            .await
            .unwrap_err();
        assert!(matches!(err, ServiceError::NotFound(_)));

        assert_eq!(catalog.lots_of(product.id).await.unwrap()[0].quantity, 4);
    }
}

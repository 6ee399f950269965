//! Sale commit pipeline.
//!
//! ```text
//! SaleDraft
//!   ↓
//! 1. Validating: price the draft (tax from settings), check every product exists
//!   ↓
//! 2. Allocating: FEFO plan for all lines against the current lots
//!   ↓
//! 3. Persisted: sale + items + lot debits in one store call
//! ```
//!
//! Any failure moves the commit to `Aborted`. The store re-checks each debit
//! inside its atomic unit, so a plan made stale by a concurrent sale fails
//! with a conflict instead of driving a lot negative.

use std::collections::BTreeSet;

use chrono::{DateTime, Utc};
use tracing::{debug, info, instrument, warn};

use shopledger_core::{ProductId, SaleId, Settings};
use shopledger_inventory::{merge_debits, plan_allocations};
use shopledger_sales::{CommitStage, SaleDraft, SaleWithItems, price_sale};

use crate::error::ServiceError;
use crate::store::LedgerStore;

/// Stage tracker for one commit; logs every transition.
#[derive(Debug)]
struct CommitRun {
    sale_id: SaleId,
    stage: CommitStage,
}

impl CommitRun {
    fn new(sale_id: SaleId) -> Self {
        Self {
            sale_id,
            stage: CommitStage::default(),
        }
    }

    fn advance(&mut self, to: CommitStage) {
        debug_assert!(self.stage.can_transition_to(to), "{} -> {}", self.stage, to);
        debug!(sale_id = %self.sale_id, from = %self.stage, to = %to, "sale commit stage");
        self.stage = to;
    }

    fn abort(&mut self, err: &ServiceError) {
        warn!(
            sale_id = %self.sale_id,
            stage = %self.stage,
            error = %err,
            "sale commit aborted"
        );
        self.stage = CommitStage::Aborted;
    }
}

#[derive(Debug, Clone)]
pub struct SaleCommitter<S> {
    store: S,
}

impl<S: LedgerStore> SaleCommitter<S> {
    pub fn new(store: S) -> Self {
        Self { store }
    }

    /// Validate, allocate and persist a sale. `now` stamps the debited lots.
    #[instrument(
        skip(self, draft),
        fields(user_id = %draft.user_id, line_count = draft.lines.len()),
        err
    )]
    pub async fn commit_sale(&self, draft: SaleDraft, now: DateTime<Utc>) -> Result<SaleWithItems, ServiceError> {
        let mut run = CommitRun::new(SaleId::new());
        match self.run(&mut run, draft, now).await {
            Ok(committed) => {
                info!(
                    sale_id = %committed.sale.id,
                    invoice_number = %committed.sale.invoice_number,
                    total = %committed.sale.total,
                    "sale committed"
                );
                Ok(committed)
            }
            Err(err) => {
                run.abort(&err);
                Err(err)
            }
        }
    }

    async fn run(&self, run: &mut CommitRun, draft: SaleDraft, now: DateTime<Utc>) -> Result<SaleWithItems, ServiceError> {
        run.advance(CommitStage::Validating);
        let settings = Settings::from_map(&self.store.load_settings().await?);
        let priced = price_sale(&draft, settings.tax_rate_bps)?;

        let products: BTreeSet<ProductId> = priced.lines.iter().map(|l| l.product_id).collect();
        for product_id in &products {
            if self.store.get_product(*product_id).await?.is_none() {
                return Err(ServiceError::NotFound(format!("product {product_id}")));
            }
        }

        run.advance(CommitStage::Allocating);
        let mut lots = Vec::new();
        for product_id in &products {
            lots.extend(self.store.find_lots_by_product(*product_id).await?);
        }
        let plans = plan_allocations(&lots, &priced.demand())?;
        let debits = merge_debits(&plans);

        let committed = priced.assemble(draft, run.sale_id);
        self.store
            .insert_sale_with_items(&committed.sale, &committed.items, &debits, now)
            .await?;
        run.advance(CommitStage::Persisted);

        Ok(committed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    use chrono::{NaiveDate, TimeZone};
    use shopledger_core::{LotId, Money, UserId};
    use shopledger_inventory::{Category, Lot, Product, Unit};
    use shopledger_sales::{LineDraft, PaymentMethod, SaleStatus};

    use crate::store::InMemoryLedgerStore;

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 5, 10, 15, 30, 0).unwrap()
    }

    async fn product(store: &InMemoryLedgerStore, price: i64) -> Product {
        let product = Product {
            id: ProductId::new(),
            name: format!("Producto {price}"),
            description: None,
            category: Category::Groceries,
            barcode: None,
            unit: Unit::Unit,
            price: Money::from_cents(price),
            cost: None,
            min_stock: 10,
            is_perishable: false,
            created_at: now(),
        };
        store.insert_product(&product).await.unwrap();
        product
    }

    async fn lot(store: &InMemoryLedgerStore, product_id: ProductId, quantity: i64, expiry: Option<NaiveDate>) -> LotId {
        let lot = Lot {
            id: LotId::new(),
            product_id,
            quantity,
            expiry_date: expiry,
            batch_number: None,
            location: None,
            last_updated: Utc.with_ymd_and_hms(2024, 5, 1, 9, 0, 0).unwrap(),
        };
        store.insert_lot(&lot).await.unwrap();
        lot.id
    }

    fn line(product_id: ProductId, quantity: i64, unit_price: i64) -> LineDraft {
        LineDraft {
            product_id,
            quantity,
            unit_price: Money::from_cents(unit_price),
            discount: Money::ZERO,
        }
    }

    fn draft(lines: Vec<LineDraft>) -> SaleDraft {
        SaleDraft {
            invoice_number: None,
            customer_id: None,
            user_id: UserId::new(),
            sold_at: now(),
            subtotal: None,
            tax: None,
            discount: Money::ZERO,
            total: None,
            payment_method: PaymentMethod::Cash,
            status: SaleStatus::Paid,
            notes: None,
            lines,
        }
    }

    async fn quantities(store: &InMemoryLedgerStore, product_id: ProductId) -> Vec<i64> {
        store
            .find_lots_by_product(product_id)
            .await
            .unwrap()
            .iter()
            .map(|l| l.quantity)
            .collect()
    }

    #[tokio::test]
    async fn combined_demand_over_stock_rolls_back_everything() {
        let store = Arc::new(InMemoryLedgerStore::new());
        let p = product(&store, 1000).await;
        lot(&store, p.id, 10, None).await;
        let committer = SaleCommitter::new(store.clone());

        let err = committer
            .commit_sale(draft(vec![line(p.id, 4, 1000), line(p.id, 8, 1000)]), now())
            .await
            .unwrap_err();

        assert_eq!(
            err,
            ServiceError::InsufficientStock {
                product_id: p.id,
                requested: 12,
                available: 10
            }
        );
        assert_eq!(quantities(&store, p.id).await, vec![10]);
        assert!(store.list_recent_sales(10).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn committed_sale_round_trips_with_fefo_debits() {
        let store = Arc::new(InMemoryLedgerStore::new());
        store.upsert_setting("tax_rate", "16").await.unwrap();
        let p = product(&store, 2500).await;
        let q = product(&store, 1999).await;
        lot(&store, p.id, 2, NaiveDate::from_ymd_opt(2024, 5, 12)).await;
        lot(&store, p.id, 10, NaiveDate::from_ymd_opt(2024, 6, 1)).await;
        lot(&store, q.id, 1, None).await;
        let committer = SaleCommitter::new(store.clone());

        let committed = committer
            .commit_sale(draft(vec![line(p.id, 3, 2500), line(q.id, 1, 1999)]), now())
            .await
            .unwrap();

        assert_eq!(committed.sale.subtotal, Money::from_cents(9499));
        assert_eq!(committed.sale.tax, Money::from_cents(1520));
        assert_eq!(committed.sale.total, Money::from_cents(11019));
        assert!(committed.sale.invoice_number.starts_with("INV-20240510-"));

        let stored = store.get_sale(committed.sale.id).await.unwrap().unwrap();
        assert_eq!(stored.sale, committed.sale);
        let items_subtotal: Money = stored.items.iter().map(|i| i.subtotal).sum();
        assert_eq!(items_subtotal, stored.sale.subtotal);

        assert_eq!(quantities(&store, p.id).await, vec![0, 9]);
        assert_eq!(quantities(&store, q.id).await, vec![0]);
        let stamped = store.find_lots_by_product(q.id).await.unwrap();
        assert_eq!(stamped[0].last_updated, now());
    }

    #[tokio::test]
    async fn mismatched_total_and_unknown_product_are_rejected() {
        let store = Arc::new(InMemoryLedgerStore::new());
        let p = product(&store, 1000).await;
        lot(&store, p.id, 5, None).await;
        let committer = SaleCommitter::new(store.clone());

        let mut wrong_total = draft(vec![line(p.id, 1, 1000)]);
        wrong_total.total = Some(Money::from_cents(1005));
        assert!(matches!(
            committer.commit_sale(wrong_total, now()).await,
            Err(ServiceError::Validation(_))
        ));

        let mut off_by_one = draft(vec![line(p.id, 1, 1000)]);
        off_by_one.total = Some(Money::from_cents(1001));
        assert!(committer.commit_sale(off_by_one, now()).await.is_ok());

        assert!(matches!(
            committer.commit_sale(draft(vec![line(ProductId::new(), 1, 10)]), now()).await,
            Err(ServiceError::NotFound(_))
        ));
        assert!(matches!(
            committer.commit_sale(draft(vec![]), now()).await,
            Err(ServiceError::Validation(_))
        ));
    }

    #[tokio::test]
    async fn duplicate_invoice_number_is_a_conflict() {
        let store = Arc::new(InMemoryLedgerStore::new());
        let p = product(&store, 1000).await;
        lot(&store, p.id, 5, None).await;
        let committer = SaleCommitter::new(store.clone());

        let mut first = draft(vec![line(p.id, 1, 1000)]);
        first.invoice_number = Some("F-0001".to_string());
        committer.commit_sale(first.clone(), now()).await.unwrap();

        assert!(matches!(
            committer.commit_sale(first, now()).await,
            Err(ServiceError::Conflict(_))
        ));
        assert_eq!(quantities(&store, p.id).await, vec![4]);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn concurrent_commits_never_oversell() {
        let store = Arc::new(InMemoryLedgerStore::new());
        let p = product(&store, 500).await;
        lot(&store, p.id, 10, None).await;
        let committer = SaleCommitter::new(store.clone());

        let mut handles = Vec::new();
        for _ in 0..8 {
            let committer = committer.clone();
            let product_id = p.id;
            handles.push(tokio::spawn(async move {
                committer.commit_sale(draft(vec![line(product_id, 3, 500)]), now()).await
            }));
        }

        let mut committed = 0;
        for handle in handles {
            match handle.await.unwrap() {
                Ok(_) => committed += 1,
                Err(ServiceError::InsufficientStock { .. } | ServiceError::Conflict(_)) => {}
                Err(other) => panic!("unexpected error: {other}"),
            }
        }

        assert_eq!(committed, 3);
        assert_eq!(quantities(&store, p.id).await, vec![1]);
        assert_eq!(store.list_recent_sales(100).await.unwrap().len(), 3);
    }
}

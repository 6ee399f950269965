//! Dashboard figures: today against yesterday, best sellers and the invoice
//! listing.

use chrono::{DateTime, Days, NaiveDate, NaiveTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::instrument;

use shopledger_accounting::{Change, DailyAmount, Period, TransactionType, count_pct_change, pct_change, profit_pct_change};
use shopledger_core::{Money, SaleId};
use shopledger_sales::{
    RecentSale, SaleWithItems, TopProduct, distinct_customers_on, recent_sales, sales_total_on, top_products,
};

use crate::alert_deriver::{AlertCounts, AlertDeriver};
use crate::error::ServiceError;
use crate::finance::FinancialAggregator;
use crate::store::LedgerStore;

/// Days looked back when ranking best sellers (inclusive of today).
pub const TOP_PRODUCTS_WINDOW_DAYS: u64 = 30;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Metric<T> {
    pub value: T,
    pub previous: T,
    pub change: Change,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DashboardSnapshot {
    pub date: NaiveDate,
    pub sales: Metric<Money>,
    pub customers: Metric<i64>,
    pub profit: Metric<Money>,
    pub alerts: AlertCounts,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RankedProduct {
    pub name: String,
    #[serde(flatten)]
    pub stats: TopProduct,
}

fn start_of(day: NaiveDate) -> DateTime<Utc> {
    day.and_time(NaiveTime::MIN).and_utc()
}

fn day_after(day: NaiveDate) -> NaiveDate {
    day.checked_add_days(Days::new(1)).unwrap_or(NaiveDate::MAX)
}

#[derive(Debug, Clone)]
pub struct Dashboard<S> {
    store: S,
    alerts: AlertDeriver<S>,
    finance: FinancialAggregator<S>,
}

impl<S: LedgerStore + Clone> Dashboard<S> {
    pub fn new(store: S) -> Self {
        Self {
            alerts: AlertDeriver::new(store.clone()),
            finance: FinancialAggregator::new(store.clone()),
            store,
        }
    }

    #[instrument(skip(self), err)]
    pub async fn snapshot(&self, today: NaiveDate) -> Result<DashboardSnapshot, ServiceError> {
        let yesterday = today.pred_opt().unwrap_or(NaiveDate::MIN);
        let sales = self
            .store
            .list_sales_between(start_of(yesterday), start_of(day_after(today)))
            .await?;

        let sales_today = sales_total_on(&sales, today);
        let sales_yesterday = sales_total_on(&sales, yesterday);
        let customers_today = distinct_customers_on(&sales, today) as i64;
        let customers_yesterday = distinct_customers_on(&sales, yesterday) as i64;

        let finances = self.finance.summarize_period(Period::single_day(today)).await?;

        Ok(DashboardSnapshot {
            date: today,
            sales: Metric {
                value: sales_today,
                previous: sales_yesterday,
                change: pct_change(sales_today, sales_yesterday).into(),
            },
            customers: Metric {
                value: customers_today,
                previous: customers_yesterday,
                change: count_pct_change(customers_today, customers_yesterday).into(),
            },
            profit: Metric {
                value: finances.net_profit,
                previous: finances.previous.net_profit,
                change: profit_pct_change(finances.net_profit, finances.previous.net_profit).into(),
            },
            alerts: self.alerts.alert_counts(today).await?,
        })
    }

    /// Best sellers by quantity over the last [`TOP_PRODUCTS_WINDOW_DAYS`] days.
    #[instrument(skip(self), err)]
    pub async fn top_products(&self, today: NaiveDate, limit: usize) -> Result<Vec<RankedProduct>, ServiceError> {
        let start = today
            .checked_sub_days(Days::new(TOP_PRODUCTS_WINDOW_DAYS))
            .unwrap_or(NaiveDate::MIN);
        let sales = self
            .store
            .list_sales_between(start_of(start), start_of(day_after(today)))
            .await?;
        let ids: Vec<SaleId> = sales.iter().map(|s| s.id).collect();
        let items = self.store.list_sale_items(&ids).await?;

        let mut ranked = Vec::new();
        for stats in top_products(&sales, &items, start, today, limit) {
            let name = self
                .store
                .get_product(stats.product_id)
                .await?
                .map(|p| p.name)
                .unwrap_or_default();
            ranked.push(RankedProduct { name, stats });
        }
        Ok(ranked)
    }

    /// Newest sales with their line counts.
    #[instrument(skip(self), err)]
    pub async fn recent_sales(&self, limit: usize) -> Result<Vec<RecentSale>, ServiceError> {
        let sales = self.store.list_recent_sales(limit).await?;
        let ids: Vec<SaleId> = sales.iter().map(|s| s.id).collect();
        let items = self.store.list_sale_items(&ids).await?;
        Ok(recent_sales(&sales, &items, limit))
    }

    pub async fn sale(&self, sale_id: SaleId) -> Result<SaleWithItems, ServiceError> {
        self.store
            .get_sale(sale_id)
            .await?
            .ok_or_else(|| ServiceError::NotFound(format!("sale {sale_id}")))
    }

    /// Daily income for the sales chart.
    pub async fn sales_chart(&self, period: Period) -> Result<Vec<DailyAmount>, ServiceError> {
        self.finance.daily_series(TransactionType::Income, period).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    use chrono::TimeZone;
    use shopledger_accounting::{ChangeDirection, NewTransaction};
    use shopledger_core::{CustomerId, LotId, ProductId, UserId};
    use shopledger_inventory::{Category, Lot, Product, Unit};
    use shopledger_sales::{LineDraft, PaymentMethod, SaleDraft, SaleStatus};

    use crate::sale_committer::SaleCommitter;
    use crate::store::InMemoryLedgerStore;

    fn today() -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 5, 10).unwrap()
    }

    async fn stocked_product(store: &InMemoryLedgerStore, name: &str) -> ProductId {
        let product = Product {
            id: ProductId::new(),
            name: name.to_string(),
            description: None,
            category: Category::Beverages,
            barcode: None,
            unit: Unit::Unit,
            price: Money::from_cents(1500),
            cost: None,
            min_stock: 1,
            is_perishable: false,
            created_at: Utc::now(),
        };
        store.insert_product(&product).await.unwrap();
        store
            .insert_lot(&Lot {
                id: LotId::new(),
                product_id: product.id,
                quantity: 100,
                expiry_date: None,
                batch_number: None,
                location: None,
                last_updated: Utc.with_ymd_and_hms(2024, 4, 1, 0, 0, 0).unwrap(),
            })
            .await
            .unwrap();
        product.id
    }

    fn sale(day: u32, customer: Option<CustomerId>, lines: Vec<(ProductId, i64)>) -> SaleDraft {
        SaleDraft {
            invoice_number: None,
            customer_id: customer,
            user_id: UserId::new(),
            sold_at: Utc.with_ymd_and_hms(2024, 5, day, 11, 0, 0).unwrap(),
            subtotal: None,
            tax: None,
            discount: Money::ZERO,
            total: None,
            payment_method: PaymentMethod::Card,
            status: SaleStatus::Paid,
            notes: None,
            lines: lines
                .into_iter()
                .map(|(product_id, quantity)| LineDraft {
                    product_id,
                    quantity,
                    unit_price: Money::from_cents(1500),
                    discount: Money::ZERO,
                })
                .collect(),
        }
    }

    #[tokio::test]
    async fn today_against_yesterday() {
        let store = Arc::new(InMemoryLedgerStore::new());
        let cola = stocked_product(&store, "Refresco").await;
        let committer = SaleCommitter::new(store.clone());
        let (a, b) = (CustomerId::new(), CustomerId::new());

        committer.commit_sale(sale(9, Some(a), vec![(cola, 2)]), Utc::now()).await.unwrap();
        committer.commit_sale(sale(10, Some(a), vec![(cola, 2)]), Utc::now()).await.unwrap();
        committer.commit_sale(sale(10, Some(b), vec![(cola, 1)]), Utc::now()).await.unwrap();
        committer.commit_sale(sale(10, None, vec![(cola, 1)]), Utc::now()).await.unwrap();

        let finance = FinancialAggregator::new(store.clone());
        finance
            .record_transaction(
                NewTransaction {
                    description: "Ventas del dia".to_string(),
                    amount: Money::from_cents(9000),
                    occurred_at: Utc.with_ymd_and_hms(2024, 5, 10, 20, 0, 0).unwrap(),
                    category: "Ventas".to_string(),
                    kind: TransactionType::Income,
                    reference: None,
                    notes: None,
                },
                UserId::new(),
            )
            .await
            .unwrap();

        let dashboard = Dashboard::new(store.clone());
        let snap = dashboard.snapshot(today()).await.unwrap();

        assert_eq!(snap.sales.value, Money::from_cents(6000));
        assert_eq!(snap.sales.previous, Money::from_cents(3000));
        assert_eq!(snap.sales.change.pct, 100);
        assert_eq!(snap.customers.value, 2);
        assert_eq!(snap.customers.change.pct, 100);
        assert_eq!(snap.profit.value, Money::from_cents(9000));
        assert_eq!(snap.profit.change.direction, ChangeDirection::Neutral);
    }

    #[tokio::test]
    async fn best_sellers_and_invoice_listing() {
        let store = Arc::new(InMemoryLedgerStore::new());
        let cola = stocked_product(&store, "Refresco").await;
        let water = stocked_product(&store, "Agua").await;
        let committer = SaleCommitter::new(store.clone());

        committer.commit_sale(sale(2, None, vec![(cola, 1), (water, 6)]), Utc::now()).await.unwrap();
        committer.commit_sale(sale(8, None, vec![(cola, 3)]), Utc::now()).await.unwrap();
        committer.commit_sale(sale(10, None, vec![(cola, 1)]), Utc::now()).await.unwrap();

        let dashboard = Dashboard::new(store.clone());
        let top = dashboard.top_products(today(), 5).await.unwrap();
        assert_eq!(top[0].name, "Agua");
        assert_eq!(top[0].stats.total_quantity, 6);
        assert_eq!(top[0].stats.share_pct, 33);
        assert_eq!(top[1].name, "Refresco");
        assert_eq!(top[1].stats.share_pct, 100);

        let recent = dashboard.recent_sales(2).await.unwrap();
        assert_eq!(recent.len(), 2);
        assert!(recent[0].sold_at > recent[1].sold_at);
        assert_eq!(recent[1].item_count, 1);

        let full = dashboard.sale(recent[0].id).await.unwrap();
        assert_eq!(full.items.len(), 1);
        assert!(matches!(
            dashboard.sale(SaleId::new()).await,
            Err(ServiceError::NotFound(_))
        ));
    }
}

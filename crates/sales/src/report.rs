//! Read-side sales figures for the dashboard and the invoice listing.
//!
//! Days are UTC calendar days of `sold_at`. Canceled sales are listed but
//! never counted as revenue.

use std::collections::{BTreeMap, BTreeSet, HashMap};

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

use shopledger_core::{CustomerId, Money, ProductId, SaleId};

use crate::sale::{Sale, SaleItem, SaleStatus};

fn counted_on(sale: &Sale, day: NaiveDate) -> bool {
    sale.status.counts_as_revenue() && sale.sold_at.date_naive() == day
}

/// Sum of sale totals on `day`.
pub fn sales_total_on(sales: &[Sale], day: NaiveDate) -> Money {
    sales.iter().filter(|s| counted_on(s, day)).map(|s| s.total).sum()
}

/// Distinct identified customers who bought on `day`. Anonymous sales do not count.
pub fn distinct_customers_on(sales: &[Sale], day: NaiveDate) -> usize {
    sales
        .iter()
        .filter(|s| counted_on(s, day))
        .filter_map(|s| s.customer_id)
        .collect::<BTreeSet<CustomerId>>()
        .len()
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TopProduct {
    pub product_id: ProductId,
    pub total_quantity: i64,
    /// Sales in the window containing the product.
    pub sale_count: usize,
    /// `sale_count` as a rounded share of all sales in the window.
    pub share_pct: i64,
}

/// Best sellers by quantity over `[start, end]`, ties by product id.
pub fn top_products(sales: &[Sale], items: &[SaleItem], start: NaiveDate, end: NaiveDate, limit: usize) -> Vec<TopProduct> {
    let in_window: BTreeSet<SaleId> = sales
        .iter()
        .filter(|s| s.status.counts_as_revenue())
        .filter(|s| (start..=end).contains(&s.sold_at.date_naive()))
        .map(|s| s.id)
        .collect();
    if in_window.is_empty() {
        return Vec::new();
    }

    let mut per_product: BTreeMap<ProductId, (i64, BTreeSet<SaleId>)> = BTreeMap::new();
    for item in items.iter().filter(|i| in_window.contains(&i.sale_id)) {
        let entry = per_product.entry(item.product_id).or_default();
        entry.0 += item.quantity;
        entry.1.insert(item.sale_id);
    }

    let window_sales = in_window.len() as i64;
    let mut ranked: Vec<TopProduct> = per_product
        .into_iter()
        .map(|(product_id, (total_quantity, sale_ids))| {
            let sale_count = sale_ids.len();
            TopProduct {
                product_id,
                total_quantity,
                sale_count,
                share_pct: (sale_count as i64 * 200 + window_sales) / (2 * window_sales),
            }
        })
        .collect();

    ranked.sort_by(|a, b| {
        b.total_quantity
            .cmp(&a.total_quantity)
            .then(a.product_id.cmp(&b.product_id))
    });
    ranked.truncate(limit);
    ranked
}

/// Invoice listing row.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RecentSale {
    pub id: SaleId,
    pub invoice_number: String,
    pub customer_id: Option<CustomerId>,
    pub sold_at: DateTime<Utc>,
    pub total: Money,
    pub status: SaleStatus,
    pub item_count: usize,
}

/// Newest sales first, with their line counts.
pub fn recent_sales(sales: &[Sale], items: &[SaleItem], limit: usize) -> Vec<RecentSale> {
    let mut counts: HashMap<SaleId, usize> = HashMap::new();
    for item in items {
        *counts.entry(item.sale_id).or_default() += 1;
    }

    let mut ordered: Vec<&Sale> = sales.iter().collect();
    ordered.sort_by(|a, b| b.sold_at.cmp(&a.sold_at).then(b.id.cmp(&a.id)));

    ordered
        .into_iter()
        .take(limit)
        .map(|s| RecentSale {
            id: s.id,
            invoice_number: s.invoice_number.clone(),
            customer_id: s.customer_id,
            sold_at: s.sold_at,
            total: s.total,
            status: s.status,
            item_count: counts.get(&s.id).copied().unwrap_or(0),
        })
        .collect()
}

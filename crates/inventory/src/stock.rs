use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use shopledger_core::{Money, ProductId};

use crate::alerts::{AlertPolicy, lots_by_product};
use crate::lot::Lot;
use crate::product::{Category, Product, Unit};

/// Per-product stock overview backing the inventory listing and the POS
/// product picker.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StockLevel {
    pub product_id: ProductId,
    pub name: String,
    pub category: Category,
    pub unit: Unit,
    pub price: Money,
    pub min_stock: i64,
    pub total_quantity: i64,
    pub lot_count: usize,
    /// Earliest expiry among lots that still hold stock.
    pub closest_expiry: Option<NaiveDate>,
    pub low_stock: bool,
    pub expiring: bool,
}

impl StockLevel {
    pub fn in_stock(&self) -> bool {
        self.total_quantity > 0
    }
}

/// One entry per product, in catalog order, including products without lots.
pub fn stock_levels(products: &[Product], lots: &[Lot], policy: &AlertPolicy, today: NaiveDate) -> Vec<StockLevel> {
    let grouped = lots_by_product(lots);

    products
        .iter()
        .map(|product| {
            let own = grouped.get(&product.id).map(Vec::as_slice).unwrap_or_default();
            let total_quantity = own.iter().fold(0i64, |acc, l| acc.saturating_add(l.quantity));
            let closest_expiry = own
                .iter()
                .filter(|l| l.is_available())
                .filter_map(|l| l.expiry_date)
                .min();
            let expiring = own
                .iter()
                .any(|l| l.is_available() && l.expires_within(today, policy.expiry_window_days));

            StockLevel {
                product_id: product.id,
                name: product.name.clone(),
                category: product.category,
                unit: product.unit,
                price: product.price,
                min_stock: product.min_stock,
                total_quantity,
                lot_count: own.len(),
                closest_expiry,
                low_stock: !own.is_empty() && total_quantity <= product.min_stock,
                expiring,
            }
        })
        .collect()
}

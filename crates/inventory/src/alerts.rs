//! Stock and expiry alerts derived from products and their lots.
//!
//! Derivation is read-only and deterministic for a given `today`. Output is
//! ordered by product id, then [`AlertKind`], then expiry date, then lot id.

use std::collections::{BTreeMap, BTreeSet};

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

use shopledger_core::{LotId, ProductId, Settings};

use crate::lot::Lot;
use crate::product::Product;

/// Alert category. Declaration order is the sort order within one product.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AlertKind {
    OutOfStock,
    LowStock,
    Expiring,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Alert {
    /// Every lot of the product is empty. `since` is the last time any of
    /// them changed, i.e. when stock reached zero.
    OutOfStock {
        product_id: ProductId,
        since: DateTime<Utc>,
    },
    LowStock {
        product_id: ProductId,
        quantity: i64,
        min_stock: i64,
    },
    Expiring {
        product_id: ProductId,
        lot_id: LotId,
        quantity: i64,
        expiry_date: NaiveDate,
        days_until_expiry: i64,
    },
}

impl Alert {
    pub fn kind(&self) -> AlertKind {
        match self {
            Alert::OutOfStock { .. } => AlertKind::OutOfStock,
            Alert::LowStock { .. } => AlertKind::LowStock,
            Alert::Expiring { .. } => AlertKind::Expiring,
        }
    }

    pub fn product_id(&self) -> ProductId {
        match self {
            Alert::OutOfStock { product_id, .. }
            | Alert::LowStock { product_id, .. }
            | Alert::Expiring { product_id, .. } => *product_id,
        }
    }

    fn sort_key(&self) -> (ProductId, AlertKind, Option<NaiveDate>, Option<LotId>) {
        match self {
            Alert::Expiring {
                lot_id, expiry_date, ..
            } => (self.product_id(), self.kind(), Some(*expiry_date), Some(*lot_id)),
            _ => (self.product_id(), self.kind(), None, None),
        }
    }
}

/// Thresholds that shape alert derivation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AlertPolicy {
    pub expiry_window_days: u32,
    pub low_stock_enabled: bool,
}

impl Default for AlertPolicy {
    fn default() -> Self {
        Self::from(&Settings::default())
    }
}

impl From<&Settings> for AlertPolicy {
    fn from(settings: &Settings) -> Self {
        Self {
            expiry_window_days: settings.expiry_alert_days,
            low_stock_enabled: settings.low_stock_alert,
        }
    }
}

pub(crate) fn lots_by_product(lots: &[Lot]) -> BTreeMap<ProductId, Vec<&Lot>> {
    let mut grouped: BTreeMap<ProductId, Vec<&Lot>> = BTreeMap::new();
    for lot in lots {
        grouped.entry(lot.product_id).or_default().push(lot);
    }
    grouped
}

/// Stock-level alert for one product, if any. Products without lots are silent.
fn stock_alert(product: &Product, lots: &[&Lot], policy: &AlertPolicy) -> Option<Alert> {
    let since = lots.iter().map(|l| l.last_updated).max()?;
    let total = lots.iter().fold(0i64, |acc, l| acc.saturating_add(l.quantity));

    if total == 0 {
        Some(Alert::OutOfStock {
            product_id: product.id,
            since,
        })
    } else if policy.low_stock_enabled && total <= product.min_stock {
        Some(Alert::LowStock {
            product_id: product.id,
            quantity: total,
            min_stock: product.min_stock,
        })
    } else {
        None
    }
}

fn expiring_alert(lot: &Lot, today: NaiveDate, policy: &AlertPolicy) -> Option<Alert> {
    if !lot.is_available() || !lot.expires_within(today, policy.expiry_window_days) {
        return None;
    }
    let expiry_date = lot.expiry_date?;
    Some(Alert::Expiring {
        product_id: lot.product_id,
        lot_id: lot.id,
        quantity: lot.quantity,
        expiry_date,
        days_until_expiry: (expiry_date - today).num_days(),
    })
}

/// Derive all alerts for the catalog as of `today`.
///
/// Lots whose product is not in `products` are ignored.
pub fn derive_alerts(products: &[Product], lots: &[Lot], policy: &AlertPolicy, today: NaiveDate) -> Vec<Alert> {
    let grouped = lots_by_product(lots);
    let mut alerts = Vec::new();

    for product in products {
        let Some(own) = grouped.get(&product.id) else {
            continue;
        };
        alerts.extend(stock_alert(product, own, policy));
        alerts.extend(own.iter().filter_map(|l| expiring_alert(l, today, policy)));
    }

    alerts.sort_by_key(Alert::sort_key);
    alerts
}

/// Number of distinct products with at least one alert.
pub fn count_alerted_products(alerts: &[Alert]) -> usize {
    alerts.iter().map(Alert::product_id).collect::<BTreeSet<_>>().len()
}

/// Products whose alert condition started `today`.
///
/// A stock alert is new when one of the product's lots changed today; an
/// expiry alert is new when a lot's expiry just entered the window.
pub fn count_new_alerts(products: &[Product], lots: &[Lot], policy: &AlertPolicy, today: NaiveDate) -> usize {
    let grouped = lots_by_product(lots);
    let window_edge = today
        .checked_add_days(chrono::Days::new(u64::from(policy.expiry_window_days)))
        .unwrap_or(NaiveDate::MAX);
    let mut fresh = BTreeSet::new();

    for product in products {
        let Some(own) = grouped.get(&product.id) else {
            continue;
        };
        let touched_today = own.iter().any(|l| l.last_updated.date_naive() == today);
        if touched_today && stock_alert(product, own, policy).is_some() {
            fresh.insert(product.id);
        }
        if own
            .iter()
            .any(|l| l.is_available() && l.expiry_date == Some(window_edge))
        {
            fresh.insert(product.id);
        }
    }

    fresh.len()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::product::{Category, Unit};
    use chrono::TimeZone;
    use shopledger_core::Money;

    fn today() -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 5, 10).unwrap()
    }

    fn product(min_stock: i64) -> Product {
        Product {
            id: ProductId::new(),
            name: "Leche entera".to_string(),
            description: None,
            category: Category::Dairy,
            barcode: None,
            unit: Unit::L,
            price: Money::from_cents(2800),
            cost: None,
            min_stock,
            is_perishable: true,
            created_at: Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap(),
        }
    }

    fn lot(product: &Product, quantity: i64, expiry_in_days: Option<u64>) -> Lot {
        Lot {
            id: LotId::new(),
            product_id: product.id,
            quantity,
            expiry_date: expiry_in_days.map(|d| today() + chrono::Days::new(d)),
            batch_number: None,
            location: None,
            last_updated: Utc.with_ymd_and_hms(2024, 5, 1, 9, 0, 0).unwrap(),
        }
    }

    #[test]
    fn single_small_lot_raises_low_stock() {
        let p = product(10);
        let lots = vec![lot(&p, 4, None)];
        let alerts = derive_alerts(&[p.clone()], &lots, &AlertPolicy::default(), today());
        assert_eq!(
            alerts,
            vec![Alert::LowStock {
                product_id: p.id,
                quantity: 4,
                min_stock: 10
            }]
        );
    }

    #[test]
    fn lot_expiring_inside_window_raises_expiring() {
        let q = product(0);
        let l = lot(&q, 5, Some(3));
        let alerts = derive_alerts(&[q.clone()], &[l.clone()], &AlertPolicy::default(), today());
        let expiring: Vec<_> = alerts.iter().filter(|a| a.kind() == AlertKind::Expiring).collect();
        assert_eq!(expiring.len(), 1);
        assert_eq!(
            expiring[0],
            &Alert::Expiring {
                product_id: q.id,
                lot_id: l.id,
                quantity: 5,
                expiry_date: today() + chrono::Days::new(3),
                days_until_expiry: 3,
            }
        );
    }

    #[test]
    fn threshold_is_inclusive() {
        let p = product(10);
        let lots = vec![lot(&p, 6, None), lot(&p, 4, None)];
        let alerts = derive_alerts(&[p.clone()], &lots, &AlertPolicy::default(), today());
        assert_eq!(alerts.len(), 1);
        assert_eq!(alerts[0].kind(), AlertKind::LowStock);

        let plenty = vec![lot(&p, 11, None)];
        assert!(derive_alerts(&[p], &plenty, &AlertPolicy::default(), today()).is_empty());
    }

    #[test]
    fn empty_product_is_out_of_stock_not_low_stock() {
        let p = product(10);
        let mut drained = lot(&p, 0, Some(2));
        drained.last_updated = Utc.with_ymd_and_hms(2024, 5, 7, 18, 30, 0).unwrap();
        let older = lot(&p, 0, None);

        let alerts = derive_alerts(&[p.clone()], &[older, drained.clone()], &AlertPolicy::default(), today());
        // Empty lots never raise expiry alerts either.
        assert_eq!(
            alerts,
            vec![Alert::OutOfStock {
                product_id: p.id,
                since: drained.last_updated
            }]
        );
    }

    #[test]
    fn product_without_lots_is_silent() {
        let p = product(10);
        assert!(derive_alerts(&[p], &[], &AlertPolicy::default(), today()).is_empty());
    }

    #[test]
    fn disabled_low_stock_still_reports_out_of_stock() {
        let policy = AlertPolicy {
            expiry_window_days: 7,
            low_stock_enabled: false,
        };
        let low = product(10);
        let empty = product(10);
        let lots = vec![lot(&low, 2, None), lot(&empty, 0, None)];
        let alerts = derive_alerts(&[low, empty.clone()], &lots, &policy, today());
        assert_eq!(alerts.len(), 1);
        assert_eq!(alerts[0].product_id(), empty.id);
        assert_eq!(alerts[0].kind(), AlertKind::OutOfStock);
    }

    #[test]
    fn expired_and_far_lots_are_ignored() {
        let p = product(0);
        let mut expired = lot(&p, 3, None);
        expired.expiry_date = Some(today() - chrono::Days::new(1));
        let far = lot(&p, 3, Some(8));
        let edge = lot(&p, 3, Some(7));
        let alerts = derive_alerts(&[p], &[expired, far, edge.clone()], &AlertPolicy::default(), today());
        assert_eq!(alerts.len(), 1);
        assert!(matches!(alerts[0], Alert::Expiring { lot_id, .. } if lot_id == edge.id));
    }

    #[test]
    fn output_is_ordered_by_product_kind_and_expiry() {
        let a = product(100);
        let b = product(100);
        let lots = vec![
            lot(&b, 5, Some(5)),
            lot(&a, 5, Some(6)),
            lot(&a, 5, Some(1)),
            lot(&b, 5, Some(2)),
        ];
        let alerts = derive_alerts(&[b.clone(), a.clone()], &lots, &AlertPolicy::default(), today());

        let keys: Vec<_> = alerts.iter().map(Alert::sort_key).collect();
        let mut sorted = keys.clone();
        sorted.sort();
        assert_eq!(keys, sorted);
        assert_eq!(alerts.len(), 6);
        assert_eq!(alerts[0].kind(), AlertKind::LowStock);
        assert_eq!(count_alerted_products(&alerts), 2);
    }

    #[test]
    fn new_alerts_count_products_touched_today_or_entering_window() {
        let policy = AlertPolicy::default();
        let touched = product(10);
        let mut touched_lot = lot(&touched, 3, None);
        touched_lot.last_updated = Utc.with_ymd_and_hms(2024, 5, 10, 12, 0, 0).unwrap();

        let entering = product(0);
        let entering_lot = lot(&entering, 3, Some(7));

        let stale = product(10);
        let stale_lot = lot(&stale, 3, None);

        let count = count_new_alerts(
            &[touched, entering, stale],
            &[touched_lot, entering_lot, stale_lot],
            &policy,
            today(),
        );
        assert_eq!(count, 2);
    }

    #[test]
    fn widest_window_near_the_calendar_end_does_not_overflow() {
        let policy = AlertPolicy {
            expiry_window_days: u32::MAX,
            low_stock_enabled: true,
        };
        let p = product(10);
        let lots = vec![lot(&p, 4, Some(30))];
        let late_today = NaiveDate::MAX.pred_opt().unwrap();

        assert_eq!(count_new_alerts(&[p.clone()], &lots, &policy, late_today), 0);
        assert_eq!(count_new_alerts(&[p.clone()], &lots, &policy, today()), 0);
        assert!(derive_alerts(&[p], &lots, &policy, today())
            .iter()
            .any(|a| a.kind() == AlertKind::Expiring));
    }

    #[test]
    fn huge_lot_totals_saturate_instead_of_wrapping() {
        let p = product(10);
        let lots = vec![lot(&p, i64::MAX, None), lot(&p, i64::MAX, None)];
        assert!(derive_alerts(&[p], &lots, &AlertPolicy::default(), today()).is_empty());
    }
}

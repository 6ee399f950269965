//! FEFO (first-expire-first-out) allocation planning.
//!
//! Given the current lots of a product, decide which lots to debit and by how
//! much. Planning never mutates stored lots; the sale commit applies the plan.
//!
//! Selection order: lots with quantity > 0, earliest expiry first, lots
//! without an expiry last, lot id as the final tie-break.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use shopledger_core::{DomainError, DomainResult, LotId, ProductId};

use crate::lot::{Lot, LotDebit};

/// Debits chosen to satisfy one request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AllocationPlan {
    pub product_id: ProductId,
    pub requested: i64,
    pub debits: Vec<LotDebit>,
}

impl AllocationPlan {
    pub fn total(&self) -> i64 {
        self.debits.iter().map(|d| d.amount).sum()
    }
}

fn fefo_key(lot: &Lot) -> (bool, Option<chrono::NaiveDate>, LotId) {
    (lot.expiry_date.is_none(), lot.expiry_date, lot.id)
}

/// Working copy of lot quantities used while planning a multi-line sale.
///
/// Each successful [`allocate`](Self::allocate) reserves quantity in the
/// workspace so later lines of the same sale see what earlier lines left.
/// A failed allocation leaves the workspace untouched.
#[derive(Debug, Clone, Default)]
pub struct StockWorkspace {
    lots: BTreeMap<ProductId, Vec<Lot>>,
}

impl StockWorkspace {
    pub fn new(lots: impl IntoIterator<Item = Lot>) -> Self {
        let mut by_product: BTreeMap<ProductId, Vec<Lot>> = BTreeMap::new();
        for lot in lots {
            by_product.entry(lot.product_id).or_default().push(lot);
        }
        for lots in by_product.values_mut() {
            lots.sort_by_key(fefo_key);
        }
        Self { lots: by_product }
    }

    /// Quantity still available for a product in this workspace.
    pub fn available(&self, product_id: ProductId) -> i64 {
        self.lots
            .get(&product_id)
            .map(|lots| {
                lots.iter()
                    .filter(|l| l.is_available())
                    .fold(0i64, |acc, l| acc.saturating_add(l.quantity))
            })
            .unwrap_or(0)
    }

    pub fn allocate(&mut self, product_id: ProductId, requested: i64) -> DomainResult<AllocationPlan> {
        if requested <= 0 {
            return Err(DomainError::validation("requested quantity must be positive"));
        }

        let available = self.available(product_id);
        if available < requested {
            return Err(DomainError::insufficient_stock(product_id, requested, available));
        }

        let mut remaining = requested;
        let mut debits = Vec::new();
        if let Some(lots) = self.lots.get_mut(&product_id) {
            for lot in lots.iter_mut().filter(|l| l.is_available()) {
                if remaining == 0 {
                    break;
                }
                let take = remaining.min(lot.quantity);
                lot.quantity -= take;
                remaining -= take;
                debits.push(LotDebit {
                    lot_id: lot.id,
                    product_id,
                    amount: take,
                });
            }
        }

        Ok(AllocationPlan {
            product_id,
            requested,
            debits,
        })
    }
}

/// Plan a single request against a product's lots.
///
/// Lots belonging to other products are ignored.
pub fn plan_allocation(product_id: ProductId, lots: &[Lot], requested: i64) -> DomainResult<AllocationPlan> {
    let own = lots.iter().filter(|l| l.product_id == product_id).cloned();
    StockWorkspace::new(own).allocate(product_id, requested)
}

/// Plan every `(product, quantity)` line of a sale against one workspace.
///
/// Lines for the same product draw from the same running stock. Demand is
/// totalled per product first, so a shortfall reports the combined request
/// against the product's full stock. Products are checked in first-seen order
/// and the first short one aborts the whole plan.
pub fn plan_allocations(lots: &[Lot], lines: &[(ProductId, i64)]) -> DomainResult<Vec<AllocationPlan>> {
    if lines.iter().any(|&(_, quantity)| quantity <= 0) {
        return Err(DomainError::validation("requested quantity must be positive"));
    }

    let mut workspace = StockWorkspace::new(lots.iter().cloned());

    let mut demand: Vec<(ProductId, i64)> = Vec::new();
    for &(product_id, quantity) in lines {
        match demand.iter_mut().find(|(p, _)| *p == product_id) {
            Some((_, total)) => *total = total.saturating_add(quantity),
            None => demand.push((product_id, quantity)),
        }
    }
    for (product_id, requested) in demand {
        let available = workspace.available(product_id);
        if available < requested {
            return Err(DomainError::insufficient_stock(product_id, requested, available));
        }
    }

    lines
        .iter()
        .map(|&(product_id, quantity)| workspace.allocate(product_id, quantity))
        .collect()
}

/// Collapse several plans into one debit per lot, in first-seen order.
pub fn merge_debits<'a>(plans: impl IntoIterator<Item = &'a AllocationPlan>) -> Vec<LotDebit> {
    let mut merged: Vec<LotDebit> = Vec::new();
    for debit in plans.into_iter().flat_map(|p| p.debits.iter()) {
        match merged.iter_mut().find(|d| d.lot_id == debit.lot_id) {
            Some(existing) => existing.amount += debit.amount,
            None => merged.push(*debit),
        }
    }
    merged
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{NaiveDate, Utc};
    use proptest::prelude::*;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    fn lot(product_id: ProductId, quantity: i64, expiry: Option<NaiveDate>) -> Lot {
        Lot {
            id: LotId::new(),
            product_id,
            quantity,
            expiry_date: expiry,
            batch_number: None,
            location: None,
            last_updated: Utc::now(),
        }
    }

    #[test]
    fn small_request_only_touches_earliest_expiring_lot() {
        let p = ProductId::new();
        let no_expiry = lot(p, 10, None);
        let late = lot(p, 10, Some(date(2024, 6, 1)));
        let early = lot(p, 10, Some(date(2024, 5, 1)));
        let lots = vec![no_expiry, late, early.clone()];

        let plan = plan_allocation(p, &lots, 4).unwrap();
        assert_eq!(
            plan.debits,
            vec![LotDebit { lot_id: early.id, product_id: p, amount: 4 }]
        );
    }

    #[test]
    fn large_request_spills_in_expiry_order_with_undated_lot_last() {
        let p = ProductId::new();
        let no_expiry = lot(p, 10, None);
        let late = lot(p, 5, Some(date(2024, 6, 1)));
        let early = lot(p, 3, Some(date(2024, 5, 1)));
        let lots = vec![no_expiry.clone(), late.clone(), early.clone()];

        let plan = plan_allocation(p, &lots, 12).unwrap();
        let order: Vec<(LotId, i64)> = plan.debits.iter().map(|d| (d.lot_id, d.amount)).collect();
        assert_eq!(order, vec![(early.id, 3), (late.id, 5), (no_expiry.id, 4)]);
        assert_eq!(plan.total(), 12);
    }

    #[test]
    fn empty_lots_are_skipped() {
        let p = ProductId::new();
        let drained = lot(p, 0, Some(date(2024, 1, 1)));
        let fresh = lot(p, 2, Some(date(2024, 2, 1)));
        let plan = plan_allocation(p, &[drained, fresh.clone()], 2).unwrap();
        assert_eq!(plan.debits.len(), 1);
        assert_eq!(plan.debits[0].lot_id, fresh.id);
    }

    #[test]
    fn shortfall_fails_without_touching_the_workspace() {
        let p = ProductId::new();
        let mut ws = StockWorkspace::new(vec![lot(p, 3, None), lot(p, 4, None)]);
        let err = ws.allocate(p, 8).unwrap_err();
        assert_eq!(err, DomainError::insufficient_stock(p, 8, 7));
        assert_eq!(ws.available(p), 7);
    }

    #[test]
    fn workspace_carries_earlier_lines_into_later_ones() {
        let p = ProductId::new();
        let single = lot(p, 10, None);
        let mut ws = StockWorkspace::new(vec![single]);
        ws.allocate(p, 4).unwrap();
        let err = ws.allocate(p, 8).unwrap_err();
        assert_eq!(err, DomainError::insufficient_stock(p, 8, 6));
    }

    #[test]
    fn unknown_product_has_nothing_available() {
        let err = plan_allocation(ProductId::new(), &[], 1).unwrap_err();
        assert!(matches!(err, DomainError::InsufficientStock { available: 0, .. }));
    }

    #[test]
    fn non_positive_request_is_a_validation_error() {
        let p = ProductId::new();
        assert!(matches!(
            plan_allocation(p, &[lot(p, 5, None)], 0),
            Err(DomainError::Validation(_))
        ));
    }

    #[test]
    fn two_lines_for_one_product_are_checked_against_combined_demand() {
        // 10 in stock, lines of 4 and 8: reported as 12 wanted, 10 held.
        let p = ProductId::new();
        let lots = vec![lot(p, 10, Some(date(2024, 5, 1)))];
        let err = plan_allocations(&lots, &[(p, 4), (p, 8)]).unwrap_err();
        assert_eq!(err, DomainError::insufficient_stock(p, 12, 10));

        let plans = plan_allocations(&lots, &[(p, 4), (p, 6)]).unwrap();
        assert_eq!(merge_debits(&plans)[0].amount, 10);
    }

    #[test]
    fn first_short_product_is_reported_with_its_own_figures() {
        let (a, b) = (ProductId::new(), ProductId::new());
        let lots = vec![lot(a, 5, None), lot(b, 2, None), lot(b, 1, Some(date(2024, 5, 1)))];
        let err = plan_allocations(&lots, &[(a, 1), (b, 2), (a, 1), (b, 2)]).unwrap_err();
        assert_eq!(err, DomainError::insufficient_stock(b, 4, 3));

        assert!(matches!(
            plan_allocations(&lots, &[(a, 1), (b, 0)]),
            Err(DomainError::Validation(_))
        ));
    }

    #[test]
    fn merge_sums_debits_per_lot() {
        let p = ProductId::new();
        let mut ws = StockWorkspace::new(vec![lot(p, 10, None)]);
        let a = ws.allocate(p, 4).unwrap();
        let b = ws.allocate(p, 5).unwrap();
        let merged = merge_debits([&a, &b]);
        assert_eq!(merged.len(), 1);
        assert_eq!(merged[0].amount, 9);
    }

    proptest! {
        #![proptest_config(ProptestConfig {
            cases: 256,
            ..ProptestConfig::default()
        })]

        /// Applying any successful plan leaves every lot non-negative and the
        /// debits sum to the request; a failed plan means stock was short.
        #[test]
        fn plans_are_exact_or_rejected(
            quantities in prop::collection::vec((0i64..50, prop::option::of(0u32..60)), 0..8),
            requested in 1i64..200,
        ) {
            let p = ProductId::new();
            let base = date(2024, 1, 1);
            let lots: Vec<Lot> = quantities
                .iter()
                .map(|(q, offset)| lot(p, *q, offset.map(|o| base + chrono::Days::new(u64::from(o)))))
                .collect();
            let available: i64 = lots.iter().map(|l| l.quantity).sum();

            match plan_allocation(p, &lots, requested) {
                Ok(plan) => {
                    prop_assert!(available >= requested);
                    prop_assert_eq!(plan.total(), requested);
                    for debit in &plan.debits {
                        let l = lots.iter().find(|l| l.id == debit.lot_id).unwrap();
                        prop_assert!(debit.amount > 0);
                        prop_assert!(l.quantity - debit.amount >= 0);
                    }
                }
                Err(DomainError::InsufficientStock { available: reported, .. }) => {
                    prop_assert!(available < requested);
                    prop_assert_eq!(reported, available);
                }
                Err(other) => prop_assert!(false, "unexpected error {:?}", other),
            }
        }

        /// Every lot fully consumed by a plan expires no later than any lot it
        /// left untouched (undated lots count as latest).
        #[test]
        fn consumption_follows_expiry_order(
            offsets in prop::collection::vec(prop::option::of(0u32..30), 1..8),
            requested in 1i64..20,
        ) {
            let p = ProductId::new();
            let base = date(2024, 1, 1);
            let lots: Vec<Lot> = offsets
                .iter()
                .map(|o| lot(p, 3, o.map(|o| base + chrono::Days::new(u64::from(o)))))
                .collect();

            if let Ok(plan) = plan_allocation(p, &lots, requested) {
                let touched: Vec<&Lot> = plan
                    .debits
                    .iter()
                    .map(|d| lots.iter().find(|l| l.id == d.lot_id).unwrap())
                    .collect();
                let untouched = lots.iter().filter(|l| !touched.iter().any(|t| t.id == l.id));
                let latest_touched = touched.iter().map(|l| fefo_key(l)).max().unwrap();
                for l in untouched {
                    prop_assert!(fefo_key(l) > latest_touched);
                }
            }
        }
    }
}

//! Sale draft validation and price computation.
//!
//! Figures are always recomputed from the lines. Caller-supplied header
//! figures are only checked against the recomputation; the stored sale
//! carries the computed values.

use serde::{Deserialize, Serialize};

use shopledger_core::{DomainError, DomainResult, Money, ProductId, SaleId, SaleItemId};

use crate::sale::{Sale, SaleDraft, SaleItem, SaleWithItems, generate_invoice_number};

/// Largest accepted gap, in cents, between a supplied and a computed figure.
pub const TOTALS_TOLERANCE: u64 = 1;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PricedLine {
    pub product_id: ProductId,
    pub quantity: i64,
    pub unit_price: Money,
    pub discount: Money,
    pub subtotal: Money,
}

/// Validated figures of a sale draft.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PricedSale {
    pub lines: Vec<PricedLine>,
    pub subtotal: Money,
    pub discount: Money,
    pub tax: Money,
    pub total: Money,
}

impl PricedSale {
    /// Quantity demanded per line, in line order.
    pub fn demand(&self) -> Vec<(ProductId, i64)> {
        self.lines.iter().map(|l| (l.product_id, l.quantity)).collect()
    }

    /// Build the sale header and items. A blank invoice number is replaced by
    /// a generated one.
    pub fn assemble(self, draft: SaleDraft, sale_id: SaleId) -> SaleWithItems {
        let invoice_number = draft
            .invoice_number
            .map(|n| n.trim().to_string())
            .filter(|n| !n.is_empty())
            .unwrap_or_else(|| generate_invoice_number(draft.sold_at, sale_id));

        let items = self
            .lines
            .into_iter()
            .map(|line| SaleItem {
                id: SaleItemId::new(),
                sale_id,
                product_id: line.product_id,
                quantity: line.quantity,
                unit_price: line.unit_price,
                discount: line.discount,
                subtotal: line.subtotal,
            })
            .collect();

        SaleWithItems {
            sale: Sale {
                id: sale_id,
                invoice_number,
                customer_id: draft.customer_id,
                user_id: draft.user_id,
                sold_at: draft.sold_at,
                subtotal: self.subtotal,
                tax: self.tax,
                discount: self.discount,
                total: self.total,
                payment_method: draft.payment_method,
                status: draft.status,
                notes: draft.notes,
            },
            items,
        }
    }
}

fn overflow() -> DomainError {
    DomainError::validation("sale amount out of range")
}

fn check_supplied(field: &str, supplied: Option<Money>, computed: Money) -> DomainResult<()> {
    match supplied {
        Some(value) if value.distance(computed) > TOTALS_TOLERANCE => Err(DomainError::validation(format!(
            "{field} {value} does not match computed {computed}"
        ))),
        _ => Ok(()),
    }
}

/// Validate a draft and compute its figures.
///
/// `tax = round_half_up((subtotal - discount) * tax_rate)`,
/// `total = subtotal - discount + tax`.
pub fn price_sale(draft: &SaleDraft, tax_rate_bps: u32) -> DomainResult<PricedSale> {
    if draft.lines.is_empty() {
        return Err(DomainError::validation("a sale needs at least one line"));
    }

    let mut lines = Vec::with_capacity(draft.lines.len());
    let mut subtotal = Money::ZERO;

    for (index, line) in draft.lines.iter().enumerate() {
        let n = index + 1;
        if line.quantity <= 0 {
            return Err(DomainError::validation(format!("line {n}: quantity must be positive")));
        }
        if line.unit_price.is_negative() {
            return Err(DomainError::validation(format!("line {n}: unit price cannot be negative")));
        }
        if line.discount.is_negative() {
            return Err(DomainError::validation(format!("line {n}: discount cannot be negative")));
        }
        let gross = line.unit_price.checked_times(line.quantity).ok_or_else(overflow)?;
        if line.discount > gross {
            return Err(DomainError::validation(format!("line {n}: discount exceeds line amount")));
        }
        let line_subtotal = gross - line.discount;
        subtotal = subtotal.checked_add(line_subtotal).ok_or_else(overflow)?;

        lines.push(PricedLine {
            product_id: line.product_id,
            quantity: line.quantity,
            unit_price: line.unit_price,
            discount: line.discount,
            subtotal: line_subtotal,
        });
    }

    let discount = draft.discount;
    if discount.is_negative() {
        return Err(DomainError::validation("discount cannot be negative"));
    }
    if discount > subtotal {
        return Err(DomainError::validation("discount exceeds subtotal"));
    }

    let taxable = subtotal - discount;
    let tax = taxable.apply_basis_points(tax_rate_bps);
    let total = taxable.checked_add(tax).ok_or_else(overflow)?;

    check_supplied("subtotal", draft.subtotal, subtotal)?;
    check_supplied("tax", draft.tax, tax)?;
    check_supplied("total", draft.total, total)?;

    Ok(PricedSale {
        lines,
        subtotal,
        discount,
        tax,
        total,
    })
}

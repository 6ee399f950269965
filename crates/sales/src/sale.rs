use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use shopledger_core::{CustomerId, DomainError, Entity, Money, ProductId, SaleId, SaleItemId, UserId};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PaymentMethod {
    Cash,
    Card,
    Transfer,
    Credit,
}

impl PaymentMethod {
    pub fn as_str(self) -> &'static str {
        match self {
            PaymentMethod::Cash => "cash",
            PaymentMethod::Card => "card",
            PaymentMethod::Transfer => "transfer",
            PaymentMethod::Credit => "credit",
        }
    }
}

impl core::str::FromStr for PaymentMethod {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "cash" => Ok(PaymentMethod::Cash),
            "card" => Ok(PaymentMethod::Card),
            "transfer" => Ok(PaymentMethod::Transfer),
            "credit" => Ok(PaymentMethod::Credit),
            other => Err(DomainError::validation(format!("unknown payment method '{other}'"))),
        }
    }
}

/// Sale status lifecycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SaleStatus {
    #[default]
    Paid,
    Pending,
    Canceled,
}

impl SaleStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            SaleStatus::Paid => "paid",
            SaleStatus::Pending => "pending",
            SaleStatus::Canceled => "canceled",
        }
    }

    /// Canceled sales stay on record but do not count as revenue.
    pub fn counts_as_revenue(self) -> bool {
        !matches!(self, SaleStatus::Canceled)
    }
}

impl core::str::FromStr for SaleStatus {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "paid" => Ok(SaleStatus::Paid),
            "pending" => Ok(SaleStatus::Pending),
            "canceled" => Ok(SaleStatus::Canceled),
            other => Err(DomainError::validation(format!("unknown sale status '{other}'"))),
        }
    }
}

/// A committed sale header.
///
/// Invariant: `total == subtotal - discount + tax`, and `subtotal` equals the
/// sum of its items' subtotals.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Sale {
    pub id: SaleId,
    pub invoice_number: String,
    pub customer_id: Option<CustomerId>,
    pub user_id: UserId,
    pub sold_at: DateTime<Utc>,
    pub subtotal: Money,
    pub tax: Money,
    pub discount: Money,
    pub total: Money,
    pub payment_method: PaymentMethod,
    pub status: SaleStatus,
    pub notes: Option<String>,
}

impl Entity for Sale {
    type Id = SaleId;

    fn id(&self) -> Self::Id {
        self.id
    }
}

/// Immutable line of a committed sale.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SaleItem {
    pub id: SaleItemId,
    pub sale_id: SaleId,
    pub product_id: ProductId,
    pub quantity: i64,
    pub unit_price: Money,
    pub discount: Money,
    /// `quantity * unit_price - discount`.
    pub subtotal: Money,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SaleWithItems {
    pub sale: Sale,
    pub items: Vec<SaleItem>,
}

/// A sale as submitted by the point of sale, before validation.
///
/// The monetary header fields are optional: when present they are checked
/// against the recomputed figures, when absent the computed ones are used.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SaleDraft {
    #[serde(default)]
    pub invoice_number: Option<String>,
    #[serde(default)]
    pub customer_id: Option<CustomerId>,
    pub user_id: UserId,
    pub sold_at: DateTime<Utc>,
    #[serde(default)]
    pub subtotal: Option<Money>,
    #[serde(default)]
    pub tax: Option<Money>,
    /// Sale-level discount, applied after line discounts and before tax.
    #[serde(default)]
    pub discount: Money,
    #[serde(default)]
    pub total: Option<Money>,
    pub payment_method: PaymentMethod,
    #[serde(default)]
    pub status: SaleStatus,
    #[serde(default)]
    pub notes: Option<String>,
    pub lines: Vec<LineDraft>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LineDraft {
    pub product_id: ProductId,
    pub quantity: i64,
    pub unit_price: Money,
    #[serde(default)]
    pub discount: Money,
}

/// `INV-YYYYMMDD-XXXXXXXX`, the suffix taken from the random tail of the sale id.
pub fn generate_invoice_number(sold_at: DateTime<Utc>, sale_id: SaleId) -> String {
    let hex: String = sale_id.to_string().chars().filter(|c| *c != '-').collect();
    let suffix = &hex[hex.len().saturating_sub(8)..];
    format!("INV-{}-{}", sold_at.format("%Y%m%d"), suffix.to_ascii_uppercase())
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn invoice_number_carries_date_and_id_suffix() {
        let at = Utc.with_ymd_and_hms(2024, 3, 9, 15, 4, 0).unwrap();
        let id = SaleId::new();
        let number = generate_invoice_number(at, id);

        assert!(number.starts_with("INV-20240309-"));
        assert_eq!(number.len(), "INV-20240309-".len() + 8);
        let tail = id.to_string().replace('-', "").to_ascii_uppercase();
        assert!(tail.ends_with(&number["INV-20240309-".len()..]));
    }

    #[test]
    fn status_and_payment_parse_from_wire_names() {
        assert_eq!("canceled".parse::<SaleStatus>().unwrap(), SaleStatus::Canceled);
        assert!(!SaleStatus::Canceled.counts_as_revenue());
        assert_eq!("transfer".parse::<PaymentMethod>().unwrap(), PaymentMethod::Transfer);
        assert!("cheque".parse::<PaymentMethod>().is_err());
    }

    #[test]
    fn draft_defaults_optional_fields() {
        let json = format!(
            r#"{{"user_id":"{}","sold_at":"2024-03-09T10:00:00Z","payment_method":"cash",
                "lines":[{{"product_id":"{}","quantity":2,"unit_price":1500}}]}}"#,
            UserId::new(),
            ProductId::new()
        );
        let draft: SaleDraft = serde_json::from_str(&json).unwrap();
        assert_eq!(draft.status, SaleStatus::Paid);
        assert_eq!(draft.discount, Money::ZERO);
        assert!(draft.subtotal.is_none());
        assert_eq!(draft.lines[0].discount, Money::ZERO);
    }
}

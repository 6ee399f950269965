use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

use shopledger_core::{DomainError, DomainResult, Entity, LotId, ProductId};

/// One stock row of a product (e.g. a delivery batch with its own expiry).
///
/// A product may have zero, one or many lots. `quantity` is never negative
/// after a committed operation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Lot {
    pub id: LotId,
    pub product_id: ProductId,
    pub quantity: i64,
    pub expiry_date: Option<NaiveDate>,
    pub batch_number: Option<String>,
    pub location: Option<String>,
    pub last_updated: DateTime<Utc>,
}

impl Entity for Lot {
    type Id = LotId;

    fn id(&self) -> Self::Id {
        self.id
    }
}

impl Lot {
    pub fn is_available(&self) -> bool {
        self.quantity > 0
    }

    /// Whole days from `today` until expiry (negative once expired).
    pub fn days_until_expiry(&self, today: NaiveDate) -> Option<i64> {
        self.expiry_date.map(|d| (d - today).num_days())
    }

    /// Expiry falls in `[today, today + window_days]`.
    pub fn expires_within(&self, today: NaiveDate, window_days: u32) -> bool {
        self.days_until_expiry(today)
            .is_some_and(|days| (0..=i64::from(window_days)).contains(&days))
    }

    /// Add `delta` (negative to remove) after a count, breakage or return.
    ///
    /// The result must stay within `0..=MAX_LOT_QUANTITY`.
    pub fn adjust(&mut self, delta: i64, at: DateTime<Utc>) -> DomainResult<()> {
        if delta == 0 {
            return Err(DomainError::validation("adjustment cannot be zero"));
        }
        let adjusted = self
            .quantity
            .checked_add(delta)
            .filter(|q| (0..=MAX_LOT_QUANTITY).contains(q))
            .ok_or_else(|| {
                DomainError::validation(format!(
                    "lot {} holds {}; adjusting by {delta} leaves it outside 0..={MAX_LOT_QUANTITY}",
                    self.id, self.quantity
                ))
            })?;
        self.quantity = adjusted;
        self.last_updated = at;
        Ok(())
    }

    /// Apply a debit, refusing to drive the quantity below zero.
    ///
    /// A refusal means the plan was computed against stale quantities, so it
    /// surfaces as a conflict rather than a stock shortfall.
    pub fn debit(&mut self, amount: i64, at: DateTime<Utc>) -> DomainResult<()> {
        if amount <= 0 {
            return Err(DomainError::validation("debit amount must be positive"));
        }
        let remaining = self.quantity - amount;
        if remaining < 0 {
            return Err(DomainError::conflict(format!(
                "lot {} holds {} but {} was requested",
                self.id, self.quantity, amount
            )));
        }
        self.quantity = remaining;
        self.last_updated = at;
        Ok(())
    }
}

/// Largest quantity a single lot may be received with.
pub const MAX_LOT_QUANTITY: i64 = 1_000_000_000;

/// Input for receiving stock into a new lot.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReceiveLot {
    pub product_id: ProductId,
    pub quantity: i64,
    #[serde(default)]
    pub expiry_date: Option<NaiveDate>,
    #[serde(default)]
    pub batch_number: Option<String>,
    #[serde(default)]
    pub location: Option<String>,
}

impl ReceiveLot {
    pub fn into_lot(self, id: LotId, received_at: DateTime<Utc>) -> DomainResult<Lot> {
        if self.quantity < 0 {
            return Err(DomainError::validation("quantity cannot be negative"));
        }
        if self.quantity > MAX_LOT_QUANTITY {
            return Err(DomainError::validation(format!(
                "quantity cannot exceed {MAX_LOT_QUANTITY}"
            )));
        }
        Ok(Lot {
            id,
            product_id: self.product_id,
            quantity: self.quantity,
            expiry_date: self.expiry_date,
            batch_number: self.batch_number,
            location: self.location,
            last_updated: received_at,
        })
    }
}

/// Planned decrement of one lot.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct LotDebit {
    pub lot_id: LotId,
    pub product_id: ProductId,
    pub amount: i64,
}

/// Manual stock correction of one lot.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LotAdjustment {
    pub delta: i64,
    /// Free-form note for the log ("conteo", "merma", ...).
    #[serde(default)]
    pub reason: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn lot(quantity: i64, expiry: Option<NaiveDate>) -> Lot {
        Lot {
            id: LotId::new(),
            product_id: ProductId::new(),
            quantity,
            expiry_date: expiry,
            batch_number: None,
            location: None,
            last_updated: Utc::now(),
        }
    }

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn debit_never_goes_negative() {
        let mut l = lot(5, None);
        let before = l.clone();
        let err = l.debit(6, Utc::now()).unwrap_err();
        assert!(matches!(err, DomainError::Conflict(_)));
        assert_eq!(l, before);

        l.debit(5, Utc::now()).unwrap();
        assert_eq!(l.quantity, 0);
    }

    #[test]
    fn adjustment_stays_within_bounds() {
        let mut l = lot(5, None);
        let stamped = Utc::now();

        assert!(l.adjust(-6, stamped).is_err());
        assert!(l.adjust(0, stamped).is_err());
        assert!(l.adjust(i64::MAX, stamped).is_err());
        assert_eq!(l.quantity, 5);

        l.adjust(-2, stamped).unwrap();
        l.adjust(10, stamped).unwrap();
        assert_eq!(l.quantity, 13);
        assert_eq!(l.last_updated, stamped);
    }

    #[test]
    fn expiry_window_is_inclusive_on_both_ends() {
        let today = date(2024, 5, 10);
        assert!(lot(1, Some(today)).expires_within(today, 7));
        assert!(lot(1, Some(date(2024, 5, 17))).expires_within(today, 7));
        assert!(!lot(1, Some(date(2024, 5, 18))).expires_within(today, 7));
        assert!(!lot(1, Some(date(2024, 5, 9))).expires_within(today, 7));
        assert!(!lot(1, None).expires_within(today, 7));
    }

    #[test]
    fn receive_rejects_out_of_range_quantity() {
        let input = |quantity| ReceiveLot {
            product_id: ProductId::new(),
            quantity,
            expiry_date: None,
            batch_number: None,
            location: None,
        };
        assert!(input(-3).into_lot(LotId::new(), Utc::now()).is_err());
        assert!(input(MAX_LOT_QUANTITY + 1).into_lot(LotId::new(), Utc::now()).is_err());
        assert_eq!(input(MAX_LOT_QUANTITY).into_lot(LotId::new(), Utc::now()).unwrap().quantity, MAX_LOT_QUANTITY);
    }
}

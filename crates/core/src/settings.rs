//! Typed view over the key/value settings table.
//!
//! Stored values are plain strings. Writes of recognised keys are validated
//! with [`Settings::validate_entry`]; reads fall back to defaults so that a
//! bad row can never make alert derivation or pricing fail.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::error::{DomainError, DomainResult};

/// Raw settings rows keyed by setting name.
pub type SettingsMap = BTreeMap<String, String>;

pub const EXPIRY_ALERT_DAYS: &str = "expiry_alert_days";
pub const TAX_RATE: &str = "tax_rate";
pub const LOW_STOCK_ALERT: &str = "low_stock_alert";
pub const CURRENCY: &str = "currency";

pub const DEFAULT_EXPIRY_ALERT_DAYS: u32 = 7;
/// Longest accepted expiry window (ten years).
pub const MAX_EXPIRY_ALERT_DAYS: u32 = 3650;
pub const DEFAULT_CURRENCY: &str = "MXN";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Settings {
    /// Days ahead of today (inclusive) in which a lot counts as expiring.
    pub expiry_alert_days: u32,
    /// Sales tax in basis points (`"16"` percent → 1600).
    pub tax_rate_bps: u32,
    /// When false, low-stock alerts are suppressed (out-of-stock still reported).
    pub low_stock_alert: bool,
    pub currency: String,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            expiry_alert_days: DEFAULT_EXPIRY_ALERT_DAYS,
            tax_rate_bps: 0,
            low_stock_alert: true,
            currency: DEFAULT_CURRENCY.to_string(),
        }
    }
}

impl Settings {
    /// Build the typed view; unknown keys are ignored, malformed values use defaults.
    pub fn from_map(map: &SettingsMap) -> Self {
        let defaults = Self::default();
        Self {
            expiry_alert_days: map
                .get(EXPIRY_ALERT_DAYS)
                .and_then(|v| parse_days(v).ok())
                .unwrap_or(defaults.expiry_alert_days),
            tax_rate_bps: map
                .get(TAX_RATE)
                .and_then(|v| parse_percent_bps(v).ok())
                .unwrap_or(defaults.tax_rate_bps),
            low_stock_alert: map
                .get(LOW_STOCK_ALERT)
                .and_then(|v| parse_flag(v).ok())
                .unwrap_or(defaults.low_stock_alert),
            currency: map
                .get(CURRENCY)
                .map(|v| v.trim().to_string())
                .filter(|v| !v.is_empty())
                .unwrap_or(defaults.currency),
        }
    }

    /// Reject malformed values for recognised keys before they are stored.
    pub fn validate_entry(key: &str, value: &str) -> DomainResult<()> {
        if key.trim().is_empty() {
            return Err(DomainError::validation("setting key cannot be empty"));
        }
        match key {
            EXPIRY_ALERT_DAYS => parse_days(value).map(|_| ()),
            TAX_RATE => parse_percent_bps(value).map(|_| ()),
            LOW_STOCK_ALERT => parse_flag(value).map(|_| ()),
            CURRENCY if value.trim().is_empty() => {
                Err(DomainError::validation("currency cannot be empty"))
            }
            _ => Ok(()),
        }
    }
}

fn parse_days(value: &str) -> DomainResult<u32> {
    let invalid = || {
        DomainError::validation(format!(
            "{EXPIRY_ALERT_DAYS} must be a whole number of days up to {MAX_EXPIRY_ALERT_DAYS}"
        ))
    };
    let days = value.trim().parse::<u32>().map_err(|_| invalid())?;
    if days > MAX_EXPIRY_ALERT_DAYS {
        return Err(invalid());
    }
    Ok(days)
}

fn parse_flag(value: &str) -> DomainResult<bool> {
    match value.trim().to_ascii_lowercase().as_str() {
        "true" | "1" | "yes" => Ok(true),
        "false" | "0" | "no" => Ok(false),
        _ => Err(DomainError::validation(format!("{LOW_STOCK_ALERT} must be true or false"))),
    }
}

/// Parse a percentage with at most two decimals into basis points.
fn parse_percent_bps(value: &str) -> DomainResult<u32> {
    let invalid = || DomainError::validation(format!("{TAX_RATE} must be a percentage between 0 and 100"));

    let value = value.trim();
    let (whole, frac) = match value.split_once('.') {
        Some((w, f)) => (w, f),
        None => (value, ""),
    };
    if whole.is_empty() || frac.len() > 2 || !frac.chars().all(|c| c.is_ascii_digit()) {
        return Err(invalid());
    }
    let whole: u32 = whole.parse().map_err(|_| invalid())?;
    let frac: u32 = if frac.is_empty() {
        0
    } else {
        // "5" means 50 hundredths.
        format!("{frac:0<2}").parse().map_err(|_| invalid())?
    };
    let bps = whole
        .checked_mul(100)
        .and_then(|w| w.checked_add(frac))
        .ok_or_else(invalid)?;
    if bps > 10_000 {
        return Err(invalid());
    }
    Ok(bps)
}

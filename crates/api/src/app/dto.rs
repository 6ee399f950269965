use chrono::{DateTime, Datelike, NaiveDate, Utc, Weekday};
use serde::Deserialize;
use serde_json::{Map, Value, json};

use shopledger_accounting::{DailyAmount, NewTransaction, TransactionType};
use shopledger_core::{CustomerId, Money, SettingsMap, UserId};
use shopledger_inventory::{Alert, Product};
use shopledger_sales::{LineDraft, PaymentMethod, SaleDraft, SaleStatus};

// -------------------------
// Request DTOs
// -------------------------

#[derive(Debug, Deserialize)]
pub struct CreateSaleRequest {
    #[serde(default)]
    pub invoice_number: Option<String>,
    #[serde(default)]
    pub customer_id: Option<CustomerId>,
    /// Defaults to the time the request is handled.
    #[serde(default)]
    pub sold_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub subtotal: Option<Money>,
    #[serde(default)]
    pub tax: Option<Money>,
    #[serde(default)]
    pub discount: Money,
    #[serde(default)]
    pub total: Option<Money>,
    pub payment_method: PaymentMethod,
    #[serde(default)]
    pub status: SaleStatus,
    #[serde(default)]
    pub notes: Option<String>,
    pub items: Vec<LineDraft>,
}

impl CreateSaleRequest {
    pub fn into_draft(self, user_id: UserId, now: DateTime<Utc>) -> SaleDraft {
        SaleDraft {
            invoice_number: self.invoice_number,
            customer_id: self.customer_id,
            user_id,
            sold_at: self.sold_at.unwrap_or(now),
            subtotal: self.subtotal,
            tax: self.tax,
            discount: self.discount,
            total: self.total,
            payment_method: self.payment_method,
            status: self.status,
            notes: self.notes,
            lines: self.items,
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct CreateTransactionRequest {
    pub description: String,
    pub amount: Money,
    #[serde(default)]
    pub date: Option<DateTime<Utc>>,
    pub category: String,
    #[serde(rename = "type")]
    pub kind: TransactionType,
    #[serde(default)]
    pub reference: Option<String>,
    #[serde(default)]
    pub notes: Option<String>,
}

impl CreateTransactionRequest {
    pub fn into_new(self, now: DateTime<Utc>) -> NewTransaction {
        NewTransaction {
            description: self.description,
            amount: self.amount,
            occurred_at: self.date.unwrap_or(now),
            category: self.category,
            kind: self.kind,
            reference: self.reference,
            notes: self.notes,
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct UpdateSettingRequest {
    pub value: String,
}

#[derive(Debug, Default, Deserialize)]
pub struct DateQuery {
    pub date: Option<NaiveDate>,
}

#[derive(Debug, Default, Deserialize)]
pub struct LimitQuery {
    pub limit: Option<usize>,
}

#[derive(Debug, Default, Deserialize)]
pub struct RangeQuery {
    pub range: Option<String>,
    pub date: Option<NaiveDate>,
}

#[derive(Debug, Default, Deserialize)]
pub struct SummaryQuery {
    pub period: Option<String>,
    pub start: Option<NaiveDate>,
    pub end: Option<NaiveDate>,
    pub date: Option<NaiveDate>,
}

#[derive(Debug, Deserialize)]
pub struct AllocationQuery {
    pub quantity: i64,
}

// -------------------------
// Response mapping
// -------------------------

/// Alert with the display text shown in the alerts panel.
pub fn alert_to_json(alert: &Alert, product: Option<&Product>, today: NaiveDate) -> Value {
    let name = product.map(|p| p.name.as_str()).unwrap_or("?");
    let unit = product.map(|p| p.unit.as_str()).unwrap_or("");

    match alert {
        Alert::OutOfStock { product_id, since } => {
            let days = (today - since.date_naive()).num_days().max(0);
            json!({
                "id": product_id,
                "type": "out_of_stock",
                "product": name,
                "since": since,
                "days_out_of_stock": days,
                "details": format!("Agotado hace {days} días"),
            })
        }
        Alert::LowStock {
            product_id,
            quantity,
            min_stock,
        } => json!({
            "id": product_id,
            "type": "low_stock",
            "product": name,
            "quantity": quantity,
            "min_stock": min_stock,
            "details": format!("Quedan {quantity}{unit} - Mínimo recomendado: {min_stock}{unit}"),
        }),
        Alert::Expiring {
            product_id,
            lot_id,
            quantity,
            expiry_date,
            days_until_expiry,
        } => json!({
            "id": product_id,
            "type": "expiring",
            "product": name,
            "lot_id": lot_id,
            "quantity": quantity,
            "expiry_date": expiry_date,
            "days_until_expiry": days_until_expiry,
            "details": format!("Vence en {days_until_expiry} días - {quantity}{unit}"),
        }),
    }
}

/// Short Spanish weekday label used by the sales chart.
pub fn weekday_label(date: NaiveDate) -> &'static str {
    match date.weekday() {
        Weekday::Mon => "lun",
        Weekday::Tue => "mar",
        Weekday::Wed => "mié",
        Weekday::Thu => "jue",
        Weekday::Fri => "vie",
        Weekday::Sat => "sáb",
        Weekday::Sun => "dom",
    }
}

pub fn sales_chart_to_json(range: &str, points: &[DailyAmount]) -> Value {
    json!({
        "range": range,
        "data": points
            .iter()
            .map(|p| json!({
                "date": p.date,
                "name": weekday_label(p.date),
                "sales": p.amount,
            }))
            .collect::<Vec<_>>(),
    })
}

/// Settings as a nested object: dotted keys become nesting, values that
/// parse as JSON are returned parsed.
pub fn settings_to_json(settings: &SettingsMap) -> Value {
    let mut root = Map::new();
    for (key, raw) in settings {
        let value = serde_json::from_str::<Value>(raw).unwrap_or_else(|_| Value::String(raw.clone()));
        let path: Vec<&str> = key.split('.').collect();
        insert_path(&mut root, &path, value);
    }
    Value::Object(root)
}

fn insert_path(node: &mut Map<String, Value>, path: &[&str], value: Value) {
    match path {
        [] => {}
        [leaf] => {
            node.insert(leaf.to_string(), value);
        }
        [head, rest @ ..] => {
            let entry = node
                .entry(head.to_string())
                .or_insert_with(|| Value::Object(Map::new()));
            if let Value::Object(child) = entry {
                insert_path(child, rest, value);
            } else {
                // A scalar key shadowed by a dotted one; the nested form wins.
                let mut child = Map::new();
                insert_path(&mut child, rest, value);
                *entry = Value::Object(child);
            }
        }
    }
}

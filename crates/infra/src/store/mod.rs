//! Ledger store boundary.
//!
//! The store owns every persisted row: products, lots, sales and their items,
//! transactions, settings, employees and attendance. Services talk to it through explicit methods;
//! no query language crosses this boundary.

use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, Utc};

use shopledger_accounting::{Transaction, TransactionFilter};
use shopledger_core::{EmployeeId, LotId, ProductId, SaleId, SettingsMap};
use shopledger_inventory::{Lot, LotDebit, Product};
use shopledger_sales::{Sale, SaleItem, SaleWithItems};
use shopledger_staff::{AttendanceEntry, AttendanceRecord, Employee};

use crate::error::StoreResult;

pub mod in_memory;
pub mod postgres;

pub use in_memory::InMemoryLedgerStore;
pub use postgres::PostgresLedgerStore;

/// Persistent state of the shop ledger.
///
/// ## Atomic sale commit
///
/// [`insert_sale_with_items`](LedgerStore::insert_sale_with_items) writes the
/// sale header, its items and every lot debit as one unit. Inside that unit
/// each debit is re-checked against the lot's current quantity; if any lot
/// would go negative the whole unit fails with `StoreError::Concurrency` and
/// nothing is applied. Debits against the same lot are serialised.
///
/// ## Ordering
///
/// - `list_products`: by name, then id
/// - `find_lots_by_product` / `list_lots`: by product, expiry (undated last), lot id
/// - `list_sales_between` / `list_recent_sales`: newest first
/// - `list_transactions`: newest first
/// - `list_employees`: by name, then id
/// - `list_attendance`: newest day first, then employee name
#[async_trait]
pub trait LedgerStore: Send + Sync {
    async fn insert_product(&self, product: &Product) -> StoreResult<()>;

    async fn get_product(&self, product_id: ProductId) -> StoreResult<Option<Product>>;

    async fn list_products(&self) -> StoreResult<Vec<Product>>;

    /// Overwrite an existing product. `NotFound` when it does not exist.
    async fn update_product(&self, product: &Product) -> StoreResult<()>;

    /// Fails with `NotFound` when the lot's product does not exist.
    async fn insert_lot(&self, lot: &Lot) -> StoreResult<()>;

    async fn find_lots_by_product(&self, product_id: ProductId) -> StoreResult<Vec<Lot>>;

    async fn list_lots(&self) -> StoreResult<Vec<Lot>>;

    /// Add `delta` to a lot's quantity and stamp it with `at`, atomically.
    /// A result outside `0..=MAX_LOT_QUANTITY` is a `Constraint` error and
    /// leaves the lot untouched.
    async fn adjust_lot(&self, lot_id: LotId, delta: i64, at: DateTime<Utc>) -> StoreResult<Lot>;

    /// Persist a sale with its items and apply `debits`, stamping debited
    /// lots with `at`. A duplicate invoice number is a `Concurrency` error.
    async fn insert_sale_with_items(
        &self,
        sale: &Sale,
        items: &[SaleItem],
        debits: &[LotDebit],
        at: DateTime<Utc>,
    ) -> StoreResult<()>;

    async fn get_sale(&self, sale_id: SaleId) -> StoreResult<Option<SaleWithItems>>;

    /// Sales with `from <= sold_at < to`.
    async fn list_sales_between(&self, from: DateTime<Utc>, to: DateTime<Utc>) -> StoreResult<Vec<Sale>>;

    async fn list_recent_sales(&self, limit: usize) -> StoreResult<Vec<Sale>>;

    async fn list_sale_items(&self, sale_ids: &[SaleId]) -> StoreResult<Vec<SaleItem>>;

    async fn insert_transaction(&self, transaction: &Transaction) -> StoreResult<()>;

    async fn list_transactions(&self, filter: &TransactionFilter) -> StoreResult<Vec<Transaction>>;

    async fn load_settings(&self) -> StoreResult<SettingsMap>;

    async fn upsert_setting(&self, key: &str, value: &str) -> StoreResult<()>;

    async fn insert_employee(&self, employee: &Employee) -> StoreResult<()>;

    async fn get_employee(&self, employee_id: EmployeeId) -> StoreResult<Option<Employee>>;

    async fn list_employees(&self) -> StoreResult<Vec<Employee>>;

    /// `NotFound` for an unknown employee; a second record for the same
    /// employee and day is a `Concurrency` error.
    async fn insert_attendance(&self, record: &AttendanceRecord) -> StoreResult<()>;

    /// Every record, or only those of `date`.
    async fn list_attendance(&self, date: Option<NaiveDate>) -> StoreResult<Vec<AttendanceEntry>>;
}

#[async_trait]
impl<S> LedgerStore for Arc<S>
where
    S: LedgerStore + ?Sized,
{
    async fn insert_product(&self, product: &Product) -> StoreResult<()> {
        (**self).insert_product(product).await
    }

    async fn get_product(&self, product_id: ProductId) -> StoreResult<Option<Product>> {
        (**self).get_product(product_id).await
    }

    async fn list_products(&self) -> StoreResult<Vec<Product>> {
        (**self).list_products().await
    }

    async fn update_product(&self, product: &Product) -> StoreResult<()> {
        (**self).update_product(product).await
    }

    async fn insert_lot(&self, lot: &Lot) -> StoreResult<()> {
        (**self).insert_lot(lot).await
    }

    async fn find_lots_by_product(&self, product_id: ProductId) -> StoreResult<Vec<Lot>> {
        (**self).find_lots_by_product(product_id).await
    }

    async fn list_lots(&self) -> StoreResult<Vec<Lot>> {
        (**self).list_lots().await
    }

    async fn adjust_lot(&self, lot_id: LotId, delta: i64, at: DateTime<Utc>) -> StoreResult<Lot> {
        (**self).adjust_lot(lot_id, delta, at).await
    }

    async fn insert_sale_with_items(
        &self,
        sale: &Sale,
        items: &[SaleItem],
        debits: &[LotDebit],
        at: DateTime<Utc>,
    ) -> StoreResult<()> {
        (**self).insert_sale_with_items(sale, items, debits, at).await
    }

    async fn get_sale(&self, sale_id: SaleId) -> StoreResult<Option<SaleWithItems>> {
        (**self).get_sale(sale_id).await
    }

    async fn list_sales_between(&self, from: DateTime<Utc>, to: DateTime<Utc>) -> StoreResult<Vec<Sale>> {
        (**self).list_sales_between(from, to).await
    }

    async fn list_recent_sales(&self, limit: usize) -> StoreResult<Vec<Sale>> {
        (**self).list_recent_sales(limit).await
    }

    async fn list_sale_items(&self, sale_ids: &[SaleId]) -> StoreResult<Vec<SaleItem>> {
        (**self).list_sale_items(sale_ids).await
    }

    async fn insert_transaction(&self, transaction: &Transaction) -> StoreResult<()> {
        (**self).insert_transaction(transaction).await
    }

    async fn list_transactions(&self, filter: &TransactionFilter) -> StoreResult<Vec<Transaction>> {
        (**self).list_transactions(filter).await
    }

    async fn load_settings(&self) -> StoreResult<SettingsMap> {
        (**self).load_settings().await
    }

    async fn upsert_setting(&self, key: &str, value: &str) -> StoreResult<()> {
        (**self).upsert_setting(key, value).await
    }

    async fn insert_employee(&self, employee: &Employee) -> StoreResult<()> {
        (**self).insert_employee(employee).await
    }

    async fn get_employee(&self, employee_id: EmployeeId) -> StoreResult<Option<Employee>> {
        (**self).get_employee(employee_id).await
    }

    async fn list_employees(&self) -> StoreResult<Vec<Employee>> {
        (**self).list_employees().await
    }

    async fn insert_attendance(&self, record: &AttendanceRecord) -> StoreResult<()> {
        (**self).insert_attendance(record).await
    }

    async fn list_attendance(&self, date: Option<NaiveDate>) -> StoreResult<Vec<AttendanceEntry>> {
        (**self).list_attendance(date).await
    }
}

/// Lot ordering shared by every store: product, expiry (undated last), lot id.
pub(crate) fn sort_lots(lots: &mut [Lot]) {
    lots.sort_by_key(|l| (l.product_id, l.expiry_date.is_none(), l.expiry_date, l.id));
}

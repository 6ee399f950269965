//! Postgres-backed ledger store.
//!
//! ## Error Mapping
//!
//! SQLx errors are mapped to `StoreError` as follows:
//!
//! | SQLx Error | PostgreSQL Error Code | StoreError | Scenario |
//! |------------|----------------------|------------|----------|
//! | Database (unique violation) | `23505` | `Concurrency` | Duplicate invoice number, id or attendance day |
//! | Database (foreign key violation) | `23503` | `Constraint` | Sale item or lot referencing a missing product |
//! | Database (check constraint violation) | `23514` | `Constraint` | Negative lot quantity, non-positive amount, totals identity |
//! | Database (other) | Any other | `Backend` | Other database errors |
//! | PoolClosed | N/A | `Backend` | Connection pool was closed |
//! | Other | N/A | `Backend` | Network errors, decoding failures, etc. |
//!
//! ## Sale commit
//!
//! `insert_sale_with_items` runs in one transaction. Debited lots are locked
//! with `SELECT ... FOR UPDATE` in lot-id order, so two commits touching the
//! same lots serialise instead of deadlocking. Each decrement is conditional
//! (`WHERE quantity >= $amount`); a lot drained by a competing commit aborts
//! the whole transaction with `Concurrency`.

use std::collections::BTreeMap;
use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, NaiveTime, Utc};
use sqlx::postgres::{PgPoolOptions, PgRow};
use sqlx::{FromRow, PgPool, Postgres, Row, Transaction};
use tracing::{Span, instrument};

use shopledger_accounting::{Transaction as LedgerTransaction, TransactionFilter};
use shopledger_core::{
    AttendanceId, CustomerId, DomainError, EmployeeId, LotId, Money, ProductId, SaleId, SaleItemId, SettingsMap,
    TransactionId, UserId,
};
use shopledger_inventory::{Lot, LotDebit, MAX_LOT_QUANTITY, Product};
use shopledger_sales::{Sale, SaleItem, SaleWithItems};
use shopledger_staff::{AttendanceEntry, AttendanceRecord, Employee};

use super::LedgerStore;
use crate::error::{StoreError, StoreResult};

const SCHEMA: &str = include_str!("schema.sql");

/// Postgres-backed ledger store.
///
/// `Send + Sync`; the pool handles connection sharing, so clones are cheap.
#[derive(Debug, Clone)]
pub struct PostgresLedgerStore {
    pool: Arc<PgPool>,
}

impl PostgresLedgerStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool: Arc::new(pool) }
    }

    /// Connect a pool to `database_url`.
    #[instrument(skip(database_url), err)]
    pub async fn connect(database_url: &str) -> StoreResult<Self> {
        let pool = PgPoolOptions::new()
            .max_connections(10)
            .connect(database_url)
            .await
            .map_err(|e| map_sqlx_error("connect", e))?;
        Ok(Self::new(pool))
    }

    /// Apply the bundled schema. Idempotent.
    #[instrument(skip(self), err)]
    pub async fn migrate(&self) -> StoreResult<()> {
        sqlx::raw_sql(SCHEMA)
            .execute(&*self.pool)
            .await
            .map_err(|e| map_sqlx_error("migrate", e))?;
        Ok(())
    }

    pub fn pool(&self) -> &PgPool {
        &self.pool
    }
}

#[async_trait]
impl LedgerStore for PostgresLedgerStore {
    #[instrument(skip(self, product), fields(product_id = %product.id), err)]
    async fn insert_product(&self, product: &Product) -> StoreResult<()> {
        sqlx::query(
            r#"
            INSERT INTO products (
                id, name, description, category, barcode, unit,
                price, cost, min_stock, is_perishable, created_at
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11)
            "#,
        )
        .bind(product.id.as_uuid())
        .bind(&product.name)
        .bind(&product.description)
        .bind(product.category.as_str())
        .bind(&product.barcode)
        .bind(product.unit.as_str())
        .bind(product.price.cents())
        .bind(product.cost.map(Money::cents))
        .bind(product.min_stock)
        .bind(product.is_perishable)
        .bind(product.created_at)
        .execute(&*self.pool)
        .await
        .map_err(|e| map_sqlx_error("insert_product", e))?;
        Ok(())
    }

    #[instrument(skip(self), fields(product_id = %product_id), err)]
    async fn get_product(&self, product_id: ProductId) -> StoreResult<Option<Product>> {
        let row = sqlx::query(&format!("SELECT {PRODUCT_COLUMNS} FROM products WHERE id = $1"))
            .bind(product_id.as_uuid())
            .fetch_optional(&*self.pool)
            .await
            .map_err(|e| map_sqlx_error("get_product", e))?;
        row.map(|r| decode::<ProductRow>(&r).map(Product::from)).transpose()
    }

    #[instrument(skip(self), fields(product_count), err)]
    async fn list_products(&self) -> StoreResult<Vec<Product>> {
        let rows = sqlx::query(&format!(
            r#"SELECT {PRODUCT_COLUMNS} FROM products ORDER BY name COLLATE "C", id"#
        ))
        .fetch_all(&*self.pool)
        .await
        .map_err(|e| map_sqlx_error("list_products", e))?;

        let products = rows
            .iter()
            .map(|r| decode::<ProductRow>(r).map(Product::from))
            .collect::<StoreResult<Vec<_>>>()?;
        Span::current().record("product_count", products.len());
        Ok(products)
    }

    #[instrument(skip(self, product), fields(product_id = %product.id), err)]
    async fn update_product(&self, product: &Product) -> StoreResult<()> {
        let updated = sqlx::query(
            r#"
            UPDATE products
            SET name = $2, description = $3, category = $4, barcode = $5,
                price = $6, cost = $7, min_stock = $8, is_perishable = $9
            WHERE id = $1
            "#,
        )
        .bind(product.id.as_uuid())
        .bind(&product.name)
        .bind(&product.description)
        .bind(product.category.as_str())
        .bind(&product.barcode)
        .bind(product.price.cents())
        .bind(product.cost.map(Money::cents))
        .bind(product.min_stock)
        .bind(product.is_perishable)
        .execute(&*self.pool)
        .await
        .map_err(|e| map_sqlx_error("update_product", e))?;

        if updated.rows_affected() == 0 {
            return Err(StoreError::NotFound(format!("product {}", product.id)));
        }
        Ok(())
    }

    #[instrument(skip(self, lot), fields(lot_id = %lot.id, product_id = %lot.product_id), err)]
    async fn insert_lot(&self, lot: &Lot) -> StoreResult<()> {
        sqlx::query(
            r#"
            INSERT INTO lots (id, product_id, quantity, expiry_date, batch_number, location, last_updated)
            VALUES ($1, $2, $3, $4, $5, $6, $7)
            "#,
        )
        .bind(lot.id.as_uuid())
        .bind(lot.product_id.as_uuid())
        .bind(lot.quantity)
        .bind(lot.expiry_date)
        .bind(&lot.batch_number)
        .bind(&lot.location)
        .bind(lot.last_updated)
        .execute(&*self.pool)
        .await
        .map_err(|e| {
            if is_foreign_key_violation(&e) {
                StoreError::NotFound(format!("product {}", lot.product_id))
            } else {
                map_sqlx_error("insert_lot", e)
            }
        })?;
        Ok(())
    }

    #[instrument(skip(self), fields(product_id = %product_id), err)]
    async fn find_lots_by_product(&self, product_id: ProductId) -> StoreResult<Vec<Lot>> {
        let rows = sqlx::query(&format!(
            "SELECT {LOT_COLUMNS} FROM lots WHERE product_id = $1 {LOT_ORDER}"
        ))
        .bind(product_id.as_uuid())
        .fetch_all(&*self.pool)
        .await
        .map_err(|e| map_sqlx_error("find_lots_by_product", e))?;
        rows.iter().map(|r| decode::<LotRow>(r).map(Lot::from)).collect()
    }

    #[instrument(skip(self), err)]
    async fn list_lots(&self) -> StoreResult<Vec<Lot>> {
        let rows = sqlx::query(&format!("SELECT {LOT_COLUMNS} FROM lots {LOT_ORDER}"))
            .fetch_all(&*self.pool)
            .await
            .map_err(|e| map_sqlx_error("list_lots", e))?;
        rows.iter().map(|r| decode::<LotRow>(r).map(Lot::from)).collect()
    }

    #[instrument(skip(self), fields(lot_id = %lot_id, delta), err)]
    async fn adjust_lot(&self, lot_id: LotId, delta: i64, at: DateTime<Utc>) -> StoreResult<Lot> {
        if delta == 0 {
            return Err(StoreError::Constraint("adjustment cannot be zero".to_string()));
        }
        // The bound check and the write are one statement, so no lock is needed.
        let row = sqlx::query(&format!(
            r#"
            UPDATE lots
            SET quantity = quantity + $2, last_updated = $3
            WHERE id = $1 AND quantity + $2 BETWEEN 0 AND $4
            RETURNING {LOT_COLUMNS}
            "#
        ))
        .bind(lot_id.as_uuid())
        .bind(delta)
        .bind(at)
        .bind(MAX_LOT_QUANTITY)
        .fetch_optional(&*self.pool)
        .await
        .map_err(|e| map_sqlx_error("adjust_lot", e))?;

        if let Some(row) = row {
            return decode::<LotRow>(&row).map(Lot::from);
        }
        let exists: Option<i64> = sqlx::query_scalar("SELECT quantity FROM lots WHERE id = $1")
            .bind(lot_id.as_uuid())
            .fetch_optional(&*self.pool)
            .await
            .map_err(|e| map_sqlx_error("adjust_lot", e))?;
        match exists {
            None => Err(StoreError::NotFound(format!("lot {lot_id}"))),
            Some(quantity) => Err(StoreError::Constraint(format!(
                "lot {lot_id} holds {quantity}; adjusting by {delta} leaves it outside 0..={MAX_LOT_QUANTITY}"
            ))),
        }
    }

    #[instrument(
        skip(self, sale, items, debits),
        fields(
            sale_id = %sale.id,
            invoice_number = %sale.invoice_number,
            item_count = items.len(),
            debit_count = debits.len()
        ),
        err
    )]
    async fn insert_sale_with_items(
        &self,
        sale: &Sale,
        items: &[SaleItem],
        debits: &[LotDebit],
        at: DateTime<Utc>,
    ) -> StoreResult<()> {
        let mut tx = self
            .pool
            .begin()
            .await
            .map_err(|e| map_sqlx_error("begin_transaction", e))?;

        sqlx::query(
            r#"
            INSERT INTO sales (
                id, invoice_number, customer_id, user_id, sold_at,
                subtotal, tax, discount, total, payment_method, status, notes
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12)
            "#,
        )
        .bind(sale.id.as_uuid())
        .bind(&sale.invoice_number)
        .bind(sale.customer_id.map(|c| *c.as_uuid()))
        .bind(sale.user_id.as_uuid())
        .bind(sale.sold_at)
        .bind(sale.subtotal.cents())
        .bind(sale.tax.cents())
        .bind(sale.discount.cents())
        .bind(sale.total.cents())
        .bind(sale.payment_method.as_str())
        .bind(sale.status.as_str())
        .bind(&sale.notes)
        .execute(&mut *tx)
        .await
        .map_err(|e| {
            if is_unique_violation(&e) {
                StoreError::Concurrency(format!("invoice number {} already used", sale.invoice_number))
            } else {
                map_sqlx_error("insert_sale", e)
            }
        })?;

        for item in items {
            sqlx::query(
                r#"
                INSERT INTO sale_items (id, sale_id, product_id, quantity, unit_price, discount, subtotal)
                VALUES ($1, $2, $3, $4, $5, $6, $7)
                "#,
            )
            .bind(item.id.as_uuid())
            .bind(item.sale_id.as_uuid())
            .bind(item.product_id.as_uuid())
            .bind(item.quantity)
            .bind(item.unit_price.cents())
            .bind(item.discount.cents())
            .bind(item.subtotal.cents())
            .execute(&mut *tx)
            .await
            .map_err(|e| map_sqlx_error("insert_sale_item", e))?;
        }

        // BTreeMap gives a stable lock order across concurrent commits.
        let mut per_lot: BTreeMap<LotId, i64> = BTreeMap::new();
        for debit in debits {
            let total = per_lot.entry(debit.lot_id).or_default();
            *total = total.saturating_add(debit.amount);
        }

        for (lot_id, amount) in per_lot {
            if let Err(err) = debit_lot(&mut tx, lot_id, amount, at).await {
                tx.rollback()
                    .await
                    .map_err(|e| map_sqlx_error("rollback", e))?;
                return Err(err);
            }
        }

        tx.commit()
            .await
            .map_err(|e| map_sqlx_error("commit_transaction", e))?;
        Ok(())
    }

    #[instrument(skip(self), fields(sale_id = %sale_id), err)]
    async fn get_sale(&self, sale_id: SaleId) -> StoreResult<Option<SaleWithItems>> {
        let row = sqlx::query(&format!("SELECT {SALE_COLUMNS} FROM sales WHERE id = $1"))
            .bind(sale_id.as_uuid())
            .fetch_optional(&*self.pool)
            .await
            .map_err(|e| map_sqlx_error("get_sale", e))?;
        let Some(row) = row else {
            return Ok(None);
        };
        let sale = Sale::try_from(decode::<SaleRow>(&row)?)?;
        let items = self.list_sale_items(&[sale_id]).await?;
        Ok(Some(SaleWithItems { sale, items }))
    }

    #[instrument(skip(self), err)]
    async fn list_sales_between(&self, from: DateTime<Utc>, to: DateTime<Utc>) -> StoreResult<Vec<Sale>> {
        let rows = sqlx::query(&format!(
            "SELECT {SALE_COLUMNS} FROM sales WHERE sold_at >= $1 AND sold_at < $2 ORDER BY sold_at DESC, id DESC"
        ))
        .bind(from)
        .bind(to)
        .fetch_all(&*self.pool)
        .await
        .map_err(|e| map_sqlx_error("list_sales_between", e))?;
        rows.iter().map(|r| Sale::try_from(decode::<SaleRow>(r)?)).collect()
    }

    #[instrument(skip(self), err)]
    async fn list_recent_sales(&self, limit: usize) -> StoreResult<Vec<Sale>> {
        let rows = sqlx::query(&format!(
            "SELECT {SALE_COLUMNS} FROM sales ORDER BY sold_at DESC, id DESC LIMIT $1"
        ))
        .bind(i64::try_from(limit).unwrap_or(i64::MAX))
        .fetch_all(&*self.pool)
        .await
        .map_err(|e| map_sqlx_error("list_recent_sales", e))?;
        rows.iter().map(|r| Sale::try_from(decode::<SaleRow>(r)?)).collect()
    }

    #[instrument(skip(self, sale_ids), fields(sale_count = sale_ids.len()), err)]
    async fn list_sale_items(&self, sale_ids: &[SaleId]) -> StoreResult<Vec<SaleItem>> {
        if sale_ids.is_empty() {
            return Ok(Vec::new());
        }
        let ids: Vec<uuid::Uuid> = sale_ids.iter().map(|id| *id.as_uuid()).collect();
        let rows = sqlx::query(
            r#"
            SELECT id, sale_id, product_id, quantity, unit_price, discount, subtotal
            FROM sale_items
            WHERE sale_id = ANY($1)
            ORDER BY sale_id, id
            "#,
        )
        .bind(ids)
        .fetch_all(&*self.pool)
        .await
        .map_err(|e| map_sqlx_error("list_sale_items", e))?;
        rows.iter().map(|r| decode::<SaleItemRow>(r).map(SaleItem::from)).collect()
    }

    #[instrument(skip(self, transaction), fields(transaction_id = %transaction.id), err)]
    async fn insert_transaction(&self, transaction: &LedgerTransaction) -> StoreResult<()> {
        sqlx::query(
            r#"
            INSERT INTO transactions (
                id, description, amount, occurred_at, category, type, user_id, reference, notes
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9)
            "#,
        )
        .bind(transaction.id.as_uuid())
        .bind(&transaction.description)
        .bind(transaction.amount.cents())
        .bind(transaction.occurred_at)
        .bind(&transaction.category)
        .bind(transaction.kind.as_str())
        .bind(transaction.user_id.as_uuid())
        .bind(&transaction.reference)
        .bind(&transaction.notes)
        .execute(&*self.pool)
        .await
        .map_err(|e| map_sqlx_error("insert_transaction", e))?;
        Ok(())
    }

    #[instrument(skip(self), err)]
    async fn list_transactions(&self, filter: &TransactionFilter) -> StoreResult<Vec<LedgerTransaction>> {
        let rows = sqlx::query(
            r#"
            SELECT id, description, amount, occurred_at, category, type, user_id, reference, notes
            FROM transactions
            WHERE ($1::text IS NULL OR type = $1)
              AND ($2::date IS NULL OR (occurred_at AT TIME ZONE 'UTC')::date >= $2)
              AND ($3::date IS NULL OR (occurred_at AT TIME ZONE 'UTC')::date <= $3)
            ORDER BY occurred_at DESC, id DESC
            "#,
        )
        .bind(filter.kind.map(|k| k.as_str()))
        .bind(filter.start)
        .bind(filter.end)
        .fetch_all(&*self.pool)
        .await
        .map_err(|e| map_sqlx_error("list_transactions", e))?;
        rows.iter()
            .map(|r| LedgerTransaction::try_from(decode::<TransactionRow>(r)?))
            .collect()
    }

    #[instrument(skip(self), err)]
    async fn load_settings(&self) -> StoreResult<SettingsMap> {
        let rows = sqlx::query("SELECT key, value FROM settings")
            .fetch_all(&*self.pool)
            .await
            .map_err(|e| map_sqlx_error("load_settings", e))?;

        let mut settings = SettingsMap::new();
        for row in rows {
            let key: String = row.try_get("key").map_err(|e| map_sqlx_error("load_settings", e))?;
            let value: String = row.try_get("value").map_err(|e| map_sqlx_error("load_settings", e))?;
            settings.insert(key, value);
        }
        Ok(settings)
    }

    #[instrument(skip(self, value), err)]
    async fn upsert_setting(&self, key: &str, value: &str) -> StoreResult<()> {
        sqlx::query(
            r#"
            INSERT INTO settings (key, value) VALUES ($1, $2)
            ON CONFLICT (key) DO UPDATE SET value = EXCLUDED.value
            "#,
        )
        .bind(key)
        .bind(value)
        .execute(&*self.pool)
        .await
        .map_err(|e| map_sqlx_error("upsert_setting", e))?;
        Ok(())
    }

    #[instrument(skip(self, employee), fields(employee_id = %employee.id), err)]
    async fn insert_employee(&self, employee: &Employee) -> StoreResult<()> {
        sqlx::query(
            r#"
            INSERT INTO employees (
                id, user_id, name, position, email, phone, address, join_date, salary, status
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10)
            "#,
        )
        .bind(employee.id.as_uuid())
        .bind(employee.user_id.map(|u| *u.as_uuid()))
        .bind(&employee.name)
        .bind(&employee.position)
        .bind(&employee.email)
        .bind(&employee.phone)
        .bind(&employee.address)
        .bind(employee.join_date)
        .bind(employee.salary.map(Money::cents))
        .bind(employee.status.as_str())
        .execute(&*self.pool)
        .await
        .map_err(|e| map_sqlx_error("insert_employee", e))?;
        Ok(())
    }

    #[instrument(skip(self), fields(employee_id = %employee_id), err)]
    async fn get_employee(&self, employee_id: EmployeeId) -> StoreResult<Option<Employee>> {
        let row = sqlx::query(&format!("SELECT {EMPLOYEE_COLUMNS} FROM employees WHERE id = $1"))
            .bind(employee_id.as_uuid())
            .fetch_optional(&*self.pool)
            .await
            .map_err(|e| map_sqlx_error("get_employee", e))?;
        row.map(|r| decode::<EmployeeRow>(&r).map(Employee::from)).transpose()
    }

    #[instrument(skip(self), err)]
    async fn list_employees(&self) -> StoreResult<Vec<Employee>> {
        let rows = sqlx::query(&format!(
            r#"SELECT {EMPLOYEE_COLUMNS} FROM employees ORDER BY name COLLATE "C", id"#
        ))
        .fetch_all(&*self.pool)
        .await
        .map_err(|e| map_sqlx_error("list_employees", e))?;
        rows.iter().map(|r| decode::<EmployeeRow>(r).map(Employee::from)).collect()
    }

    #[instrument(
        skip(self, record),
        fields(employee_id = %record.employee_id, date = %record.date),
        err
    )]
    async fn insert_attendance(&self, record: &AttendanceRecord) -> StoreResult<()> {
        sqlx::query(
            r#"
            INSERT INTO attendance (
                id, employee_id, date, check_in, check_out, worked_minutes, status, notes
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
            "#,
        )
        .bind(record.id.as_uuid())
        .bind(record.employee_id.as_uuid())
        .bind(record.date)
        .bind(record.check_in)
        .bind(record.check_out)
        .bind(record.worked_minutes)
        .bind(record.status.as_str())
        .bind(&record.notes)
        .execute(&*self.pool)
        .await
        .map_err(|e| {
            if is_foreign_key_violation(&e) {
                StoreError::NotFound(format!("employee {}", record.employee_id))
            } else if is_unique_violation(&e) {
                StoreError::Concurrency(format!(
                    "attendance for employee {} on {} already recorded",
                    record.employee_id, record.date
                ))
            } else {
                map_sqlx_error("insert_attendance", e)
            }
        })?;
        Ok(())
    }

    #[instrument(skip(self), err)]
    async fn list_attendance(&self, date: Option<NaiveDate>) -> StoreResult<Vec<AttendanceEntry>> {
        let rows = sqlx::query(
            r#"
            SELECT a.id, a.employee_id, a.date, a.check_in, a.check_out, a.worked_minutes,
                   a.status, a.notes, e.name AS employee_name
            FROM attendance a
            JOIN employees e ON e.id = a.employee_id
            WHERE ($1::date IS NULL OR a.date = $1)
            ORDER BY a.date DESC, e.name COLLATE "C", a.id
            "#,
        )
        .bind(date)
        .fetch_all(&*self.pool)
        .await
        .map_err(|e| map_sqlx_error("list_attendance", e))?;
        rows.iter().map(|r| decode::<AttendanceRow>(r).map(AttendanceEntry::from)).collect()
    }
}

/// Lock one lot and take `amount` from it.
async fn debit_lot(
    tx: &mut Transaction<'_, Postgres>,
    lot_id: LotId,
    amount: i64,
    at: DateTime<Utc>,
) -> StoreResult<()> {
    let current: Option<i64> = sqlx::query_scalar("SELECT quantity FROM lots WHERE id = $1 FOR UPDATE")
        .bind(lot_id.as_uuid())
        .fetch_optional(&mut **tx)
        .await
        .map_err(|e| map_sqlx_error("lock_lot", e))?;

    match current {
        None => return Err(StoreError::Concurrency(format!("lot {lot_id} no longer exists"))),
        Some(quantity) if quantity < amount => {
            return Err(StoreError::Concurrency(format!(
                "lot {lot_id} holds {quantity} but {amount} was planned"
            )));
        }
        Some(_) => {}
    }

    let updated = sqlx::query(
        r#"
        UPDATE lots
        SET quantity = quantity - $2, last_updated = $3
        WHERE id = $1 AND quantity >= $2
        "#,
    )
    .bind(lot_id.as_uuid())
    .bind(amount)
    .bind(at)
    .execute(&mut **tx)
    .await
    .map_err(|e| map_sqlx_error("debit_lot", e))?;

    if updated.rows_affected() == 0 {
        return Err(StoreError::Concurrency(format!("lot {lot_id} drained concurrently")));
    }
    Ok(())
}

/// Map SQLx errors to `StoreError` (see the module docs).
fn map_sqlx_error(operation: &str, err: sqlx::Error) -> StoreError {
    match err {
        sqlx::Error::Database(db_err) => {
            let msg = format!("database error in {}: {}", operation, db_err.message());
            match db_err.code().as_deref() {
                Some("23505") => StoreError::Concurrency(msg),
                Some("23503") | Some("23514") => StoreError::Constraint(msg),
                _ => StoreError::Backend(msg),
            }
        }
        sqlx::Error::PoolClosed => StoreError::Backend(format!("connection pool closed in {}", operation)),
        _ => StoreError::Backend(format!("sqlx error in {}: {}", operation, err)),
    }
}

fn sqlstate_is(err: &sqlx::Error, code: &str) -> bool {
    if let sqlx::Error::Database(db_err) = err {
        if let Some(actual) = db_err.code() {
            return actual.as_ref() == code;
        }
    }
    false
}

fn is_unique_violation(err: &sqlx::Error) -> bool {
    sqlstate_is(err, "23505")
}

fn is_foreign_key_violation(err: &sqlx::Error) -> bool {
    sqlstate_is(err, "23503")
}

fn decode<'r, T: FromRow<'r, PgRow>>(row: &'r PgRow) -> StoreResult<T> {
    T::from_row(row).map_err(|e| StoreError::Backend(format!("failed to decode row: {e}")))
}

fn decode_enum<T>(row: &PgRow, column: &str) -> Result<T, sqlx::Error>
where
    T: core::str::FromStr<Err = DomainError>,
{
    let raw: String = row.try_get(column)?;
    raw.parse().map_err(|e: DomainError| sqlx::Error::ColumnDecode {
        index: column.to_string(),
        source: Box::new(e),
    })
}

// SQLx row types

const PRODUCT_COLUMNS: &str =
    "id, name, description, category, barcode, unit, price, cost, min_stock, is_perishable, created_at";

const LOT_COLUMNS: &str = "id, product_id, quantity, expiry_date, batch_number, location, last_updated";

const LOT_ORDER: &str = "ORDER BY product_id, expiry_date ASC NULLS LAST, id";

const SALE_COLUMNS: &str = "id, invoice_number, customer_id, user_id, sold_at, subtotal, tax, discount, total, payment_method, status, notes";

struct ProductRow(Product);

impl<'r> FromRow<'r, PgRow> for ProductRow {
    fn from_row(row: &'r PgRow) -> Result<Self, sqlx::Error> {
        let id: uuid::Uuid = row.try_get("id")?;
        let cost: Option<i64> = row.try_get("cost")?;
        Ok(ProductRow(Product {
            id: ProductId::from_uuid(id),
            name: row.try_get("name")?,
            description: row.try_get("description")?,
            category: decode_enum(row, "category")?,
            barcode: row.try_get("barcode")?,
            unit: decode_enum(row, "unit")?,
            price: Money::from_cents(row.try_get("price")?),
            cost: cost.map(Money::from_cents),
            min_stock: row.try_get("min_stock")?,
            is_perishable: row.try_get("is_perishable")?,
            created_at: row.try_get("created_at")?,
        }))
    }
}

impl From<ProductRow> for Product {
    fn from(row: ProductRow) -> Self {
        row.0
    }
}

#[derive(Debug)]
struct LotRow {
    id: uuid::Uuid,
    product_id: uuid::Uuid,
    quantity: i64,
    expiry_date: Option<NaiveDate>,
    batch_number: Option<String>,
    location: Option<String>,
    last_updated: DateTime<Utc>,
}

impl<'r> FromRow<'r, PgRow> for LotRow {
    fn from_row(row: &'r PgRow) -> Result<Self, sqlx::Error> {
        Ok(LotRow {
            id: row.try_get("id")?,
            product_id: row.try_get("product_id")?,
            quantity: row.try_get("quantity")?,
            expiry_date: row.try_get("expiry_date")?,
            batch_number: row.try_get("batch_number")?,
            location: row.try_get("location")?,
            last_updated: row.try_get("last_updated")?,
        })
    }
}

impl From<LotRow> for Lot {
    fn from(row: LotRow) -> Self {
        Lot {
            id: LotId::from_uuid(row.id),
            product_id: ProductId::from_uuid(row.product_id),
            quantity: row.quantity,
            expiry_date: row.expiry_date,
            batch_number: row.batch_number,
            location: row.location,
            last_updated: row.last_updated,
        }
    }
}

#[derive(Debug)]
struct SaleRow {
    id: uuid::Uuid,
    invoice_number: String,
    customer_id: Option<uuid::Uuid>,
    user_id: uuid::Uuid,
    sold_at: DateTime<Utc>,
    subtotal: i64,
    tax: i64,
    discount: i64,
    total: i64,
    payment_method: String,
    status: String,
    notes: Option<String>,
}

impl<'r> FromRow<'r, PgRow> for SaleRow {
    fn from_row(row: &'r PgRow) -> Result<Self, sqlx::Error> {
        Ok(SaleRow {
            id: row.try_get("id")?,
            invoice_number: row.try_get("invoice_number")?,
            customer_id: row.try_get("customer_id")?,
            user_id: row.try_get("user_id")?,
            sold_at: row.try_get("sold_at")?,
            subtotal: row.try_get("subtotal")?,
            tax: row.try_get("tax")?,
            discount: row.try_get("discount")?,
            total: row.try_get("total")?,
            payment_method: row.try_get("payment_method")?,
            status: row.try_get("status")?,
            notes: row.try_get("notes")?,
        })
    }
}

impl TryFrom<SaleRow> for Sale {
    type Error = StoreError;

    fn try_from(row: SaleRow) -> Result<Self, Self::Error> {
        let bad = |e: DomainError| StoreError::Backend(format!("sale {}: {e}", row.id));
        Ok(Sale {
            id: SaleId::from_uuid(row.id),
            invoice_number: row.invoice_number.clone(),
            customer_id: row.customer_id.map(CustomerId::from_uuid),
            user_id: UserId::from_uuid(row.user_id),
            sold_at: row.sold_at,
            subtotal: Money::from_cents(row.subtotal),
            tax: Money::from_cents(row.tax),
            discount: Money::from_cents(row.discount),
            total: Money::from_cents(row.total),
            payment_method: row.payment_method.parse().map_err(bad)?,
            status: row.status.parse().map_err(bad)?,
            notes: row.notes.clone(),
        })
    }
}

#[derive(Debug)]
struct SaleItemRow {
    id: uuid::Uuid,
    sale_id: uuid::Uuid,
    product_id: uuid::Uuid,
    quantity: i64,
    unit_price: i64,
    discount: i64,
    subtotal: i64,
}

impl<'r> FromRow<'r, PgRow> for SaleItemRow {
    fn from_row(row: &'r PgRow) -> Result<Self, sqlx::Error> {
        Ok(SaleItemRow {
            id: row.try_get("id")?,
            sale_id: row.try_get("sale_id")?,
            product_id: row.try_get("product_id")?,
            quantity: row.try_get("quantity")?,
            unit_price: row.try_get("unit_price")?,
            discount: row.try_get("discount")?,
            subtotal: row.try_get("subtotal")?,
        })
    }
}

impl From<SaleItemRow> for SaleItem {
    fn from(row: SaleItemRow) -> Self {
        SaleItem {
            id: SaleItemId::from_uuid(row.id),
            sale_id: SaleId::from_uuid(row.sale_id),
            product_id: ProductId::from_uuid(row.product_id),
            quantity: row.quantity,
            unit_price: Money::from_cents(row.unit_price),
            discount: Money::from_cents(row.discount),
            subtotal: Money::from_cents(row.subtotal),
        }
    }
}

#[derive(Debug)]
struct TransactionRow {
    id: uuid::Uuid,
    description: String,
    amount: i64,
    occurred_at: DateTime<Utc>,
    category: String,
    kind: String,
    user_id: uuid::Uuid,
    reference: Option<String>,
    notes: Option<String>,
}

impl<'r> FromRow<'r, PgRow> for TransactionRow {
    fn from_row(row: &'r PgRow) -> Result<Self, sqlx::Error> {
        Ok(TransactionRow {
            id: row.try_get("id")?,
            description: row.try_get("description")?,
            amount: row.try_get("amount")?,
            occurred_at: row.try_get("occurred_at")?,
            category: row.try_get("category")?,
            kind: row.try_get("type")?,
            user_id: row.try_get("user_id")?,
            reference: row.try_get("reference")?,
            notes: row.try_get("notes")?,
        })
    }
}

impl TryFrom<TransactionRow> for LedgerTransaction {
    type Error = StoreError;

    fn try_from(row: TransactionRow) -> Result<Self, Self::Error> {
        let kind = row
            .kind
            .parse()
            .map_err(|e: DomainError| StoreError::Backend(format!("transaction {}: {e}", row.id)))?;
        Ok(LedgerTransaction {
            id: TransactionId::from_uuid(row.id),
            description: row.description,
            amount: Money::from_cents(row.amount),
            occurred_at: row.occurred_at,
            category: row.category,
            kind,
            user_id: UserId::from_uuid(row.user_id),
            reference: row.reference,
            notes: row.notes,
        })
    }
}

const EMPLOYEE_COLUMNS: &str = "id, user_id, name, position, email, phone, address, join_date, salary, status";

struct EmployeeRow(Employee);

impl<'r> FromRow<'r, PgRow> for EmployeeRow {
    fn from_row(row: &'r PgRow) -> Result<Self, sqlx::Error> {
        let id: uuid::Uuid = row.try_get("id")?;
        let user_id: Option<uuid::Uuid> = row.try_get("user_id")?;
        let salary: Option<i64> = row.try_get("salary")?;
        Ok(EmployeeRow(Employee {
            id: EmployeeId::from_uuid(id),
            user_id: user_id.map(UserId::from_uuid),
            name: row.try_get("name")?,
            position: row.try_get("position")?,
            email: row.try_get("email")?,
            phone: row.try_get("phone")?,
            address: row.try_get("address")?,
            join_date: row.try_get("join_date")?,
            salary: salary.map(Money::from_cents),
            status: decode_enum(row, "status")?,
        }))
    }
}

impl From<EmployeeRow> for Employee {
    fn from(row: EmployeeRow) -> Self {
        row.0
    }
}

struct AttendanceRow(AttendanceEntry);

impl<'r> FromRow<'r, PgRow> for AttendanceRow {
    fn from_row(row: &'r PgRow) -> Result<Self, sqlx::Error> {
        let id: uuid::Uuid = row.try_get("id")?;
        let employee_id: uuid::Uuid = row.try_get("employee_id")?;
        let check_in: Option<NaiveTime> = row.try_get("check_in")?;
        let check_out: Option<NaiveTime> = row.try_get("check_out")?;
        Ok(AttendanceRow(AttendanceEntry {
            record: AttendanceRecord {
                id: AttendanceId::from_uuid(id),
                employee_id: EmployeeId::from_uuid(employee_id),
                date: row.try_get("date")?,
                check_in,
                check_out,
                worked_minutes: row.try_get("worked_minutes")?,
                status: decode_enum(row, "status")?,
                notes: row.try_get("notes")?,
            },
            employee_name: row.try_get("employee_name")?,
        }))
    }
}

impl From<AttendanceRow> for AttendanceEntry {
    fn from(row: AttendanceRow) -> Self {
        row.0
    }
}

use std::collections::{BTreeMap, HashMap, HashSet};
use std::sync::{RwLock, RwLockReadGuard, RwLockWriteGuard};

use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, Utc};

use shopledger_accounting::{Transaction, TransactionFilter};
use shopledger_core::{EmployeeId, LotId, ProductId, SaleId, SettingsMap};
use shopledger_inventory::{Lot, LotDebit, Product};
use shopledger_sales::{Sale, SaleItem, SaleWithItems};
use shopledger_staff::{AttendanceEntry, AttendanceRecord, Employee};

use super::{LedgerStore, sort_lots};
use crate::error::{StoreError, StoreResult};

#[derive(Debug, Default)]
struct Tables {
    products: HashMap<ProductId, Product>,
    lots: HashMap<LotId, Lot>,
    sales: HashMap<SaleId, Sale>,
    sale_items: Vec<SaleItem>,
    transactions: Vec<Transaction>,
    settings: SettingsMap,
    employees: HashMap<EmployeeId, Employee>,
    attendance: Vec<AttendanceRecord>,
}

/// In-memory ledger store.
///
/// Intended for tests/dev. One lock guards every table, so a sale commit
/// (check and apply) is atomic with respect to all other operations.
#[derive(Debug, Default)]
pub struct InMemoryLedgerStore {
    tables: RwLock<Tables>,
}

impl InMemoryLedgerStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Seed settings, e.g. the store defaults of a fresh install.
    pub fn with_settings(settings: SettingsMap) -> Self {
        Self {
            tables: RwLock::new(Tables {
                settings,
                ..Tables::default()
            }),
        }
    }

    fn read(&self) -> StoreResult<RwLockReadGuard<'_, Tables>> {
        self.tables
            .read()
            .map_err(|_| StoreError::Backend("lock poisoned".to_string()))
    }

    fn write(&self) -> StoreResult<RwLockWriteGuard<'_, Tables>> {
        self.tables
            .write()
            .map_err(|_| StoreError::Backend("lock poisoned".to_string()))
    }
}

fn newest_first(sales: &mut [Sale]) {
    sales.sort_by(|a, b| b.sold_at.cmp(&a.sold_at).then(b.id.cmp(&a.id)));
}

#[async_trait]
impl LedgerStore for InMemoryLedgerStore {
    async fn insert_product(&self, product: &Product) -> StoreResult<()> {
        let mut tables = self.write()?;
        if tables.products.contains_key(&product.id) {
            return Err(StoreError::Concurrency(format!("product {} already exists", product.id)));
        }
        tables.products.insert(product.id, product.clone());
        Ok(())
    }

    async fn get_product(&self, product_id: ProductId) -> StoreResult<Option<Product>> {
        Ok(self.read()?.products.get(&product_id).cloned())
    }

    async fn list_products(&self) -> StoreResult<Vec<Product>> {
        let mut products: Vec<Product> = self.read()?.products.values().cloned().collect();
        products.sort_by(|a, b| a.name.cmp(&b.name).then(a.id.cmp(&b.id)));
        Ok(products)
    }

    async fn update_product(&self, product: &Product) -> StoreResult<()> {
        let mut tables = self.write()?;
        let Some(stored) = tables.products.get_mut(&product.id) else {
            return Err(StoreError::NotFound(format!("product {}", product.id)));
        };
        *stored = product.clone();
        Ok(())
    }

    async fn insert_lot(&self, lot: &Lot) -> StoreResult<()> {
        if lot.quantity < 0 {
            return Err(StoreError::Constraint("lot quantity cannot be negative".to_string()));
        }
        let mut tables = self.write()?;
        if !tables.products.contains_key(&lot.product_id) {
            return Err(StoreError::NotFound(format!("product {}", lot.product_id)));
        }
        if tables.lots.contains_key(&lot.id) {
            return Err(StoreError::Concurrency(format!("lot {} already exists", lot.id)));
        }
        tables.lots.insert(lot.id, lot.clone());
        Ok(())
    }

    async fn find_lots_by_product(&self, product_id: ProductId) -> StoreResult<Vec<Lot>> {
        let mut lots: Vec<Lot> = self
            .read()?
            .lots
            .values()
            .filter(|l| l.product_id == product_id)
            .cloned()
            .collect();
        sort_lots(&mut lots);
        Ok(lots)
    }

    async fn list_lots(&self) -> StoreResult<Vec<Lot>> {
        let mut lots: Vec<Lot> = self.read()?.lots.values().cloned().collect();
        sort_lots(&mut lots);
        Ok(lots)
    }

    async fn adjust_lot(&self, lot_id: LotId, delta: i64, at: DateTime<Utc>) -> StoreResult<Lot> {
        let mut tables = self.write()?;
        let Some(lot) = tables.lots.get_mut(&lot_id) else {
            return Err(StoreError::NotFound(format!("lot {lot_id}")));
        };
        lot.adjust(delta, at)
            .map_err(|e| StoreError::Constraint(e.to_string()))?;
        Ok(lot.clone())
    }

    async fn insert_sale_with_items(
        &self,
        sale: &Sale,
        items: &[SaleItem],
        debits: &[LotDebit],
        at: DateTime<Utc>,
    ) -> StoreResult<()> {
        let mut tables = self.write()?;

        if tables.sales.contains_key(&sale.id) {
            return Err(StoreError::Concurrency(format!("sale {} already exists", sale.id)));
        }
        if tables.sales.values().any(|s| s.invoice_number == sale.invoice_number) {
            return Err(StoreError::Concurrency(format!(
                "invoice number {} already used",
                sale.invoice_number
            )));
        }
        for item in items {
            if !tables.products.contains_key(&item.product_id) {
                return Err(StoreError::NotFound(format!("product {}", item.product_id)));
            }
        }

        // Check every debit before touching anything.
        let mut demand: BTreeMap<LotId, i64> = BTreeMap::new();
        for debit in debits {
            let total = demand.entry(debit.lot_id).or_default();
            *total = total.saturating_add(debit.amount);
        }
        for (lot_id, amount) in &demand {
            if *amount <= 0 {
                return Err(StoreError::Constraint(format!("debit against lot {lot_id} must be positive")));
            }
            let lot = tables
                .lots
                .get(lot_id)
                .ok_or_else(|| StoreError::Concurrency(format!("lot {lot_id} no longer exists")))?;
            if lot.quantity < *amount {
                return Err(StoreError::Concurrency(format!(
                    "lot {lot_id} holds {} but {amount} was planned",
                    lot.quantity
                )));
            }
        }

        for (lot_id, amount) in demand {
            if let Some(lot) = tables.lots.get_mut(&lot_id) {
                lot.debit(amount, at)
                    .map_err(|e| StoreError::Concurrency(e.to_string()))?;
            }
        }
        tables.sales.insert(sale.id, sale.clone());
        tables.sale_items.extend(items.iter().cloned());
        Ok(())
    }

    async fn get_sale(&self, sale_id: SaleId) -> StoreResult<Option<SaleWithItems>> {
        let tables = self.read()?;
        Ok(tables.sales.get(&sale_id).map(|sale| SaleWithItems {
            sale: sale.clone(),
            items: tables
                .sale_items
                .iter()
                .filter(|i| i.sale_id == sale_id)
                .cloned()
                .collect(),
        }))
    }

    async fn list_sales_between(&self, from: DateTime<Utc>, to: DateTime<Utc>) -> StoreResult<Vec<Sale>> {
        let mut sales: Vec<Sale> = self
            .read()?
            .sales
            .values()
            .filter(|s| s.sold_at >= from && s.sold_at < to)
            .cloned()
            .collect();
        newest_first(&mut sales);
        Ok(sales)
    }

    async fn list_recent_sales(&self, limit: usize) -> StoreResult<Vec<Sale>> {
        let mut sales: Vec<Sale> = self.read()?.sales.values().cloned().collect();
        newest_first(&mut sales);
        sales.truncate(limit);
        Ok(sales)
    }

    async fn list_sale_items(&self, sale_ids: &[SaleId]) -> StoreResult<Vec<SaleItem>> {
        let wanted: HashSet<&SaleId> = sale_ids.iter().collect();
        Ok(self
            .read()?
            .sale_items
            .iter()
            .filter(|i| wanted.contains(&i.sale_id))
            .cloned()
            .collect())
    }

    async fn insert_transaction(&self, transaction: &Transaction) -> StoreResult<()> {
        if transaction.amount.cents() <= 0 {
            return Err(StoreError::Constraint("transaction amount must be positive".to_string()));
        }
        let mut tables = self.write()?;
        if tables.transactions.iter().any(|t| t.id == transaction.id) {
            return Err(StoreError::Concurrency(format!(
                "transaction {} already exists",
                transaction.id
            )));
        }
        tables.transactions.push(transaction.clone());
        Ok(())
    }

    async fn list_transactions(&self, filter: &TransactionFilter) -> StoreResult<Vec<Transaction>> {
        let tables = self.read()?;
        Ok(filter.apply(tables.transactions.iter().cloned()))
    }

    async fn load_settings(&self) -> StoreResult<SettingsMap> {
        Ok(self.read()?.settings.clone())
    }

    async fn upsert_setting(&self, key: &str, value: &str) -> StoreResult<()> {
        self.write()?.settings.insert(key.to_string(), value.to_string());
        Ok(())
    }

    async fn insert_employee(&self, employee: &Employee) -> StoreResult<()> {
        let mut tables = self.write()?;
        if tables.employees.contains_key(&employee.id) {
            return Err(StoreError::Concurrency(format!("employee {} already exists", employee.id)));
        }
        tables.employees.insert(employee.id, employee.clone());
        Ok(())
    }

    async fn get_employee(&self, employee_id: EmployeeId) -> StoreResult<Option<Employee>> {
        Ok(self.read()?.employees.get(&employee_id).cloned())
    }

    async fn list_employees(&self) -> StoreResult<Vec<Employee>> {
        let mut employees: Vec<Employee> = self.read()?.employees.values().cloned().collect();
        employees.sort_by(|a, b| a.name.cmp(&b.name).then(a.id.cmp(&b.id)));
        Ok(employees)
    }

    async fn insert_attendance(&self, record: &AttendanceRecord) -> StoreResult<()> {
        let mut tables = self.write()?;
        if !tables.employees.contains_key(&record.employee_id) {
            return Err(StoreError::NotFound(format!("employee {}", record.employee_id)));
        }
        if tables
            .attendance
            .iter()
            .any(|r| r.id == record.id || (r.employee_id == record.employee_id && r.date == record.date))
        {
            return Err(StoreError::Concurrency(format!(
                "attendance for employee {} on {} already recorded",
                record.employee_id, record.date
            )));
        }
        tables.attendance.push(record.clone());
        Ok(())
    }

    async fn list_attendance(&self, date: Option<NaiveDate>) -> StoreResult<Vec<AttendanceEntry>> {
        let tables = self.read()?;
        let mut entries: Vec<AttendanceEntry> = tables
            .attendance
            .iter()
            .filter(|r| date.is_none_or(|d| r.date == d))
            .map(|r| AttendanceEntry {
                record: r.clone(),
                employee_name: tables
                    .employees
                    .get(&r.employee_id)
                    .map(|e| e.name.clone())
                    .unwrap_or_default(),
            })
            .collect();
        entries.sort_by(|a, b| {
            b.record
                .date
                .cmp(&a.record.date)
                .then_with(|| a.employee_name.cmp(&b.employee_name))
                .then(a.record.id.cmp(&b.record.id))
        });
        Ok(entries)
    }
}

//! Inventory domain module.
//!
//! Catalog products, stock lots, FEFO allocation planning and the alert /
//! stock-level projections. Everything here is deterministic domain logic
//! (no IO, no HTTP, no storage); callers pass in the rows and "today".

pub mod alerts;
pub mod allocator;
pub mod lot;
pub mod product;
pub mod stock;

pub use alerts::{Alert, AlertKind, AlertPolicy, count_alerted_products, count_new_alerts, derive_alerts};
pub use allocator::{AllocationPlan, StockWorkspace, merge_debits, plan_allocation, plan_allocations};
pub use lot::{Lot, LotAdjustment, LotDebit, MAX_LOT_QUANTITY, ReceiveLot};
pub use product::{Category, NewProduct, Product, ProductUpdate, Unit};
pub use stock::{StockLevel, stock_levels};

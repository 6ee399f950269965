//! Sales domain module.
//!
//! Sale records, pricing and validation of sale drafts, the commit stage
//! lifecycle and sales reporting. Pure domain logic (no IO, no HTTP, no
//! storage); stock allocation lives in `shopledger-inventory`.

pub mod pricing;
pub mod report;
pub mod sale;
pub mod stage;

pub use pricing::{PricedLine, PricedSale, TOTALS_TOLERANCE, price_sale};
pub use report::{RecentSale, TopProduct, distinct_customers_on, recent_sales, sales_total_on, top_products};
pub use sale::{
    LineDraft, PaymentMethod, Sale, SaleDraft, SaleItem, SaleStatus, SaleWithItems, generate_invoice_number,
};
pub use stage::CommitStage;

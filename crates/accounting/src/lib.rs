//! Accounting module (income / expense ledger and financial summaries).
//!
//! Pure domain logic only: no IO, no HTTP, no persistence concerns.

pub mod summary;
pub mod transaction;

pub use summary::{
    CategoryTotal, Change, ChangeDirection, DailyAmount, FinancialSummary, MAX_PERIOD_DAYS, Period, PeriodPreset,
    PeriodTotals, count_pct_change, daily_series, pct_change, profit_pct_change, summarize,
};
pub use transaction::{NewTransaction, Transaction, TransactionFilter, TransactionType};

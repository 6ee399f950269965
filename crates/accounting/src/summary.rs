//! Financial summaries over inclusive calendar-day periods.

use std::collections::BTreeMap;

use chrono::{Days, NaiveDate};
use serde::{Deserialize, Serialize};

use shopledger_core::{DomainError, DomainResult, Money};

use crate::transaction::{Transaction, TransactionType};

/// Longest range a caller may ask a summary for: a leap year.
pub const MAX_PERIOD_DAYS: i64 = 366;

/// Inclusive range of calendar days, `start <= end`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Period {
    start: NaiveDate,
    end: NaiveDate,
}

impl Period {
    pub fn new(start: NaiveDate, end: NaiveDate) -> DomainResult<Self> {
        if start > end {
            return Err(DomainError::validation(format!(
                "period start {start} is after end {end}"
            )));
        }
        Ok(Self { start, end })
    }

    /// Like [`Period::new`], but at most [`MAX_PERIOD_DAYS`] long. Use for
    /// ranges that come from outside.
    pub fn bounded(start: NaiveDate, end: NaiveDate) -> DomainResult<Self> {
        let period = Self::new(start, end)?;
        if period.days() > MAX_PERIOD_DAYS {
            return Err(DomainError::validation(format!(
                "period {start}..{end} spans {} days; at most {MAX_PERIOD_DAYS} are allowed",
                period.days()
            )));
        }
        Ok(period)
    }

    pub fn single_day(day: NaiveDate) -> Self {
        Self { start: day, end: day }
    }

    /// The `days` days ending on `today` (inclusive). `days` is at least 1.
    pub fn last_days(today: NaiveDate, days: u32) -> Self {
        let back = u64::from(days.max(1) - 1);
        Self {
            start: today.checked_sub_days(Days::new(back)).unwrap_or(NaiveDate::MIN),
            end: today,
        }
    }

    pub fn start(&self) -> NaiveDate {
        self.start
    }

    pub fn end(&self) -> NaiveDate {
        self.end
    }

    /// Number of days covered, counting both ends.
    pub fn days(&self) -> i64 {
        (self.end - self.start).num_days() + 1
    }

    pub fn contains(&self, day: NaiveDate) -> bool {
        (self.start..=self.end).contains(&day)
    }

    /// The equally long window that ends the day before `start`.
    pub fn previous(&self) -> Self {
        let len = Days::new(self.days() as u64);
        Self {
            start: self.start.checked_sub_days(len).unwrap_or(NaiveDate::MIN),
            end: self.start.pred_opt().unwrap_or(NaiveDate::MIN),
        }
    }

    /// Every day in the period, in order.
    pub fn iter_days(&self) -> impl Iterator<Item = NaiveDate> + use<> {
        let end = self.end;
        self.start.iter_days().take_while(move |d| *d <= end)
    }
}

/// Named windows offered by the dashboard and finance screens.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum PeriodPreset {
    Week,
    /// The seven days before the current week.
    LastWeek,
    Month,
    Year,
}

impl PeriodPreset {
    pub fn resolve(self, today: NaiveDate) -> Period {
        match self {
            PeriodPreset::Week => Period::last_days(today, 7),
            PeriodPreset::LastWeek => Period::last_days(today, 7).previous(),
            PeriodPreset::Month => Period::last_days(today, 30),
            PeriodPreset::Year => Period::last_days(today, 365),
        }
    }
}

impl core::str::FromStr for PeriodPreset {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "week" => Ok(PeriodPreset::Week),
            "lastWeek" => Ok(PeriodPreset::LastWeek),
            "month" => Ok(PeriodPreset::Month),
            "year" => Ok(PeriodPreset::Year),
            other => Err(DomainError::validation(format!("unknown period '{other}'"))),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CategoryTotal {
    pub category: String,
    pub amount: Money,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct DailyAmount {
    pub date: NaiveDate,
    pub amount: Money,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PeriodTotals {
    pub income: Money,
    pub expenses: Money,
    pub net_profit: Money,
}

impl PeriodTotals {
    fn collect<'a>(transactions: impl Iterator<Item = &'a Transaction>) -> Self {
        let mut totals = Self::default();
        for tx in transactions {
            match tx.kind {
                TransactionType::Income => totals.income += tx.amount,
                TransactionType::Expense => totals.expenses += tx.amount,
            }
        }
        totals.net_profit = totals.income - totals.expenses;
        totals
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ChangeDirection {
    Up,
    Down,
    Neutral,
}

/// Rounded percentage change with its direction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Change {
    pub pct: i64,
    pub direction: ChangeDirection,
}

impl From<i64> for Change {
    fn from(pct: i64) -> Self {
        let direction = match pct.signum() {
            1 => ChangeDirection::Up,
            -1 => ChangeDirection::Down,
            _ => ChangeDirection::Neutral,
        };
        Self { pct, direction }
    }
}

/// `round((n / d) * 100)` with halves rounded toward positive infinity; `d > 0`.
fn rounded_percent(n: i128, d: i128) -> i64 {
    let scaled = n * 100;
    ((2 * scaled + d).div_euclid(2 * d)) as i64
}

/// Percentage change from `previous` to `current`; 0 when `previous <= 0`.
pub fn pct_change(current: Money, previous: Money) -> i64 {
    if previous <= Money::ZERO {
        return 0;
    }
    rounded_percent(
        i128::from(current.cents()) - i128::from(previous.cents()),
        i128::from(previous.cents()),
    )
}

/// [`pct_change`] for plain counts (customers, sales).
pub fn count_pct_change(current: i64, previous: i64) -> i64 {
    if previous <= 0 {
        return 0;
    }
    rounded_percent(i128::from(current) - i128::from(previous), i128::from(previous))
}

/// Like [`pct_change`] but against `|previous|`, so a recovering loss reads
/// as an increase. 0 when `previous == 0`.
pub fn profit_pct_change(current: Money, previous: Money) -> i64 {
    if previous.is_zero() {
        return 0;
    }
    rounded_percent(
        i128::from(current.cents()) - i128::from(previous.cents()),
        i128::from(previous.cents()).abs(),
    )
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FinancialSummary {
    pub period: Period,
    pub income: Money,
    pub expenses: Money,
    pub net_profit: Money,
    /// Expenses per category, sorted by category name.
    pub expense_breakdown: Vec<CategoryTotal>,
    /// One entry per day of the period, zero-filled.
    pub income_by_day: Vec<DailyAmount>,
    pub previous: PeriodTotals,
    pub income_change: i64,
    pub expenses_change: i64,
    pub profit_change: i64,
}

/// Summarise `transactions` over `period` and compare with the previous
/// window of the same length. Transactions outside both windows are ignored.
pub fn summarize(transactions: &[Transaction], period: Period) -> FinancialSummary {
    let previous_period = period.previous();
    let current_txs = || transactions.iter().filter(|t| period.contains(t.date()));

    let current = PeriodTotals::collect(current_txs());
    let previous = PeriodTotals::collect(transactions.iter().filter(|t| previous_period.contains(t.date())));

    let mut by_category: BTreeMap<&str, Money> = BTreeMap::new();
    for tx in current_txs().filter(|t| t.kind == TransactionType::Expense) {
        *by_category.entry(tx.category.as_str()).or_default() += tx.amount;
    }

    FinancialSummary {
        period,
        income: current.income,
        expenses: current.expenses,
        net_profit: current.net_profit,
        expense_breakdown: by_category
            .into_iter()
            .map(|(category, amount)| CategoryTotal {
                category: category.to_string(),
                amount,
            })
            .collect(),
        income_by_day: daily_series(transactions, TransactionType::Income, period),
        previous,
        income_change: pct_change(current.income, previous.income),
        expenses_change: pct_change(current.expenses, previous.expenses),
        profit_change: profit_pct_change(current.net_profit, previous.net_profit),
    }
}

/// Per-day totals of one transaction type over `period`, zero-filled.
pub fn daily_series(transactions: &[Transaction], kind: TransactionType, period: Period) -> Vec<DailyAmount> {
    let mut per_day: BTreeMap<NaiveDate, Money> = period.iter_days().map(|d| (d, Money::ZERO)).collect();
    for tx in transactions.iter().filter(|t| t.kind == kind) {
        if let Some(slot) = per_day.get_mut(&tx.date()) {
            *slot += tx.amount;
        }
    }
    per_day
        .into_iter()
        .map(|(date, amount)| DailyAmount { date, amount })
        .collect()
}

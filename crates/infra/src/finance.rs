//! Financial aggregation over the transaction ledger.

use chrono::NaiveDate;
use tracing::{info, instrument};

use shopledger_accounting::{
    DailyAmount, FinancialSummary, NewTransaction, Period, Transaction, TransactionFilter, TransactionType,
    daily_series, summarize,
};
use shopledger_core::{TransactionId, UserId};

use crate::error::ServiceError;
use crate::store::LedgerStore;

#[derive(Debug, Clone)]
pub struct FinancialAggregator<S> {
    store: S,
}

impl<S: LedgerStore> FinancialAggregator<S> {
    pub fn new(store: S) -> Self {
        Self { store }
    }

    /// Transactions dated inside `period`, newest first.
    async fn load(&self, kind: Option<TransactionType>, period: Period) -> Result<Vec<Transaction>, ServiceError> {
        let filter = TransactionFilter {
            kind,
            start: Some(period.start()),
            end: Some(period.end()),
        };
        Ok(self.store.list_transactions(&filter).await?)
    }

    /// Summary of `[start, end]` (inclusive) compared with the preceding
    /// window of equal length. The range is capped at `MAX_PERIOD_DAYS`.
    #[instrument(skip(self), err)]
    pub async fn summarize(&self, start: NaiveDate, end: NaiveDate) -> Result<FinancialSummary, ServiceError> {
        let period = Period::bounded(start, end)?;
        self.summarize_period(period).await
    }

    #[instrument(skip(self), err)]
    pub async fn summarize_period(&self, period: Period) -> Result<FinancialSummary, ServiceError> {
        let both = Period::new(period.previous().start(), period.end())?;
        let transactions = self.load(None, both).await?;
        Ok(summarize(&transactions, period))
    }

    #[instrument(skip(self), err)]
    pub async fn daily_series(&self, kind: TransactionType, period: Period) -> Result<Vec<DailyAmount>, ServiceError> {
        let transactions = self.load(Some(kind), period).await?;
        Ok(daily_series(&transactions, kind, period))
    }

    #[instrument(skip(self, new), fields(user_id = %user_id), err)]
    pub async fn record_transaction(&self, new: NewTransaction, user_id: UserId) -> Result<Transaction, ServiceError> {
        let transaction = new.into_transaction(TransactionId::new(), user_id)?;
        self.store.insert_transaction(&transaction).await?;
        info!(
            transaction_id = %transaction.id,
            kind = transaction.kind.as_str(),
            amount = %transaction.amount,
            "transaction recorded"
        );
        Ok(transaction)
    }

    #[instrument(skip(self), err)]
    pub async fn list_transactions(&self, filter: TransactionFilter) -> Result<Vec<Transaction>, ServiceError> {
        if let (Some(start), Some(end)) = (filter.start, filter.end) {
            Period::new(start, end)?;
        }
        Ok(self.store.list_transactions(&filter).await?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    use chrono::{TimeZone, Utc};
    use shopledger_core::Money;

    use crate::store::InMemoryLedgerStore;

    fn date(d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 3, d).unwrap()
    }

    fn new_tx(kind: TransactionType, amount: i64, d: u32, category: &str) -> NewTransaction {
        NewTransaction {
            description: format!("{category} {d}"),
            amount: Money::from_cents(amount),
            occurred_at: Utc.with_ymd_and_hms(2024, 3, d, 12, 0, 0).unwrap(),
            category: category.to_string(),
            kind,
            reference: None,
            notes: None,
        }
    }

    #[tokio::test]
    async fn single_day_summary_against_previous_day() {
        let store = Arc::new(InMemoryLedgerStore::new());
        let finance = FinancialAggregator::new(store);
        let user = UserId::new();

        finance
            .record_transaction(new_tx(TransactionType::Income, 100, 2, "Ventas"), user)
            .await
            .unwrap();
        finance
            .record_transaction(new_tx(TransactionType::Expense, 40, 2, "Insumos"), user)
            .await
            .unwrap();
        finance
            .record_transaction(new_tx(TransactionType::Income, 50, 1, "Ventas"), user)
            .await
            .unwrap();

        let summary = finance.summarize(date(2), date(2)).await.unwrap();
        assert_eq!(summary.income, Money::from_cents(100));
        assert_eq!(summary.expenses, Money::from_cents(40));
        assert_eq!(summary.net_profit, Money::from_cents(60));
        assert_eq!(summary.income_change, 100);
        assert_eq!(summary.expenses_change, 0);
        assert_eq!(summary.profit_change, 20);
    }

    #[tokio::test]
    async fn inverted_range_is_rejected() {
        let finance = FinancialAggregator::new(Arc::new(InMemoryLedgerStore::new()));
        assert!(matches!(
            finance.summarize(date(5), date(4)).await,
            Err(ServiceError::Validation(_))
        ));
        let filter = TransactionFilter {
            kind: None,
            start: Some(date(5)),
            end: Some(date(4)),
        };
        assert!(finance.list_transactions(filter).await.is_err());
    }

    #[tokio::test]
    async fn summary_range_is_capped_but_the_year_preset_is_not() {
        let finance = FinancialAggregator::new(Arc::new(InMemoryLedgerStore::new()));
        let far_past = NaiveDate::from_ymd_opt(2000, 1, 1).unwrap();
        assert!(matches!(
            finance.summarize(far_past, date(1)).await,
            Err(ServiceError::Validation(_))
        ));
        assert!(matches!(
            finance.summarize(NaiveDate::MIN, NaiveDate::MAX).await,
            Err(ServiceError::Validation(_))
        ));

        let year = shopledger_accounting::PeriodPreset::Year.resolve(date(1));
        let summary = finance.summarize_period(year).await.unwrap();
        assert_eq!(summary.income_by_day.len(), 365);
    }

    #[tokio::test]
    async fn daily_series_is_zero_filled() {
        let finance = FinancialAggregator::new(Arc::new(InMemoryLedgerStore::new()));
        let user = UserId::new();
        finance
            .record_transaction(new_tx(TransactionType::Income, 300, 3, "Ventas"), user)
            .await
            .unwrap();

        let series = finance
            .daily_series(TransactionType::Income, Period::new(date(1), date(4)).unwrap())
            .await
            .unwrap();
        let amounts: Vec<i64> = series.iter().map(|d| d.amount.cents()).collect();
        assert_eq!(amounts, vec![0, 0, 300, 0]);
    }

    #[tokio::test]
    async fn non_positive_amount_is_rejected() {
        let finance = FinancialAggregator::new(Arc::new(InMemoryLedgerStore::new()));
        let err = finance
            .record_transaction(new_tx(TransactionType::Expense, 0, 1, "Renta"), UserId::new())
            .await
            .unwrap_err();
        assert!(matches!(err, ServiceError::Validation(_)));
    }
}

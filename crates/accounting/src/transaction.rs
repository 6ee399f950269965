use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

use shopledger_core::{DomainError, DomainResult, Entity, Money, TransactionId, UserId};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TransactionType {
    Income,
    Expense,
}

impl TransactionType {
    pub fn as_str(self) -> &'static str {
        match self {
            TransactionType::Income => "income",
            TransactionType::Expense => "expense",
        }
    }
}

impl core::str::FromStr for TransactionType {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "income" => Ok(TransactionType::Income),
            "expense" => Ok(TransactionType::Expense),
            other => Err(DomainError::validation(format!("unknown transaction type '{other}'"))),
        }
    }
}

/// Ledger entry. `amount` is always positive; the type carries the sign.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Transaction {
    pub id: TransactionId,
    pub description: String,
    pub amount: Money,
    pub occurred_at: DateTime<Utc>,
    pub category: String,
    #[serde(rename = "type")]
    pub kind: TransactionType,
    pub user_id: UserId,
    pub reference: Option<String>,
    pub notes: Option<String>,
}

impl Entity for Transaction {
    type Id = TransactionId;

    fn id(&self) -> Self::Id {
        self.id
    }
}

impl Transaction {
    pub fn date(&self) -> NaiveDate {
        self.occurred_at.date_naive()
    }

    /// Amount with the sign of its effect on profit.
    pub fn signed_amount(&self) -> Money {
        match self.kind {
            TransactionType::Income => self.amount,
            TransactionType::Expense => -self.amount,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewTransaction {
    pub description: String,
    pub amount: Money,
    pub occurred_at: DateTime<Utc>,
    pub category: String,
    #[serde(rename = "type")]
    pub kind: TransactionType,
    #[serde(default)]
    pub reference: Option<String>,
    #[serde(default)]
    pub notes: Option<String>,
}

impl NewTransaction {
    pub fn validate(&self) -> DomainResult<()> {
        if self.description.trim().is_empty() {
            return Err(DomainError::validation("description cannot be empty"));
        }
        if self.category.trim().is_empty() {
            return Err(DomainError::validation("category cannot be empty"));
        }
        if self.amount <= Money::ZERO {
            return Err(DomainError::validation("amount must be positive"));
        }
        Ok(())
    }

    pub fn into_transaction(self, id: TransactionId, user_id: UserId) -> DomainResult<Transaction> {
        self.validate()?;
        Ok(Transaction {
            id,
            description: self.description.trim().to_string(),
            amount: self.amount,
            occurred_at: self.occurred_at,
            category: self.category.trim().to_string(),
            kind: self.kind,
            user_id,
            reference: self.reference,
            notes: self.notes,
        })
    }
}

/// Listing filter. Date bounds are inclusive calendar days.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TransactionFilter {
    #[serde(default, rename = "type")]
    pub kind: Option<TransactionType>,
    #[serde(default)]
    pub start: Option<NaiveDate>,
    #[serde(default)]
    pub end: Option<NaiveDate>,
}

impl TransactionFilter {
    pub fn matches(&self, tx: &Transaction) -> bool {
        let date = tx.date();
        self.kind.is_none_or(|k| k == tx.kind)
            && self.start.is_none_or(|s| date >= s)
            && self.end.is_none_or(|e| date <= e)
    }

    /// Matching transactions, newest first.
    pub fn apply(&self, transactions: impl IntoIterator<Item = Transaction>) -> Vec<Transaction> {
        let mut out: Vec<Transaction> = transactions.into_iter().filter(|t| self.matches(t)).collect();
        out.sort_by(|a, b| b.occurred_at.cmp(&a.occurred_at).then(b.id.cmp(&a.id)));
        out
    }
}

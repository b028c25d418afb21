use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;

/// The kind of a live (not deleted) operation.
#[derive(Debug, Clone, Copy, Eq, PartialEq, Ord, PartialOrd, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OpType {
    Income,
    Expense,
    Transfer,
    Adjustment,
}

serde_plain::derive_display_from_serialize!(OpType);
serde_plain::derive_fromstr_from_deserialize!(OpType);

impl OpType {
    pub const ALL: [OpType; 4] = [
        OpType::Income,
        OpType::Expense,
        OpType::Transfer,
        OpType::Adjustment,
    ];

    /// Rank used by the canonical order: income < transfer < expense < adjustment.
    pub fn rank(self) -> u8 {
        match self {
            OpType::Income => 0,
            OpType::Transfer => 1,
            OpType::Expense => 2,
            OpType::Adjustment => 3,
        }
    }
}

/// An amount posted to an account, in that account's currency.
#[derive(Debug, Clone, Eq, PartialEq, Serialize, Deserialize)]
pub struct AccountAmount {
    pub id: String,
    pub amount: Decimal,
}

/// A share of an income or expense attributed to a category, in the operation's currency.
#[derive(Debug, Clone, Eq, PartialEq, Serialize, Deserialize)]
pub struct CategoryAmount {
    pub id: String,
    pub amount: Decimal,
}

/// The fields shared by every live operation.
///
/// `amount` is in `currency`; `account.amount` is in the account's own currency. Both are signed:
/// expenses are negative, incomes positive, and a transfer posts `-amount` at the source.
#[derive(Debug, Clone, Eq, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Entry {
    pub id: String,
    pub last_modified: DateTime<Utc>,
    pub date: NaiveDate,
    pub currency: String,
    pub amount: Decimal,
    pub account: AccountAmount,
    #[serde(default)]
    pub tags: Vec<String>,
    #[serde(default)]
    pub comment: Option<String>,
}

/// An income or expense. An empty `categories` list means "uncategorized".
#[derive(Debug, Clone, Eq, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Categorized {
    #[serde(flatten)]
    pub entry: Entry,
    #[serde(default)]
    pub categories: Vec<CategoryAmount>,
}

#[derive(Debug, Clone, Eq, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Transfer {
    #[serde(flatten)]
    pub entry: Entry,
    pub to_account: AccountAmount,
}

/// What remains of an operation after it has been deleted.
#[derive(Debug, Clone, Eq, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Tombstone {
    pub id: String,
    pub last_modified: DateTime<Utc>,
}

/// A dated money operation, or the tombstone of one.
#[derive(Debug, Clone, Eq, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Operation {
    Deleted(Tombstone),
    Adjustment(Entry),
    Income(Categorized),
    Expense(Categorized),
    Transfer(Transfer),
}

impl Operation {
    pub fn id(&self) -> &str {
        match self {
            Operation::Deleted(t) => &t.id,
            _ => self.entry().map(|e| e.id.as_str()).unwrap_or_default(),
        }
    }

    pub fn last_modified(&self) -> DateTime<Utc> {
        match self {
            Operation::Deleted(t) => t.last_modified,
            Operation::Adjustment(e) => e.last_modified,
            Operation::Income(c) | Operation::Expense(c) => c.entry.last_modified,
            Operation::Transfer(t) => t.entry.last_modified,
        }
    }

    pub fn is_deleted(&self) -> bool {
        matches!(self, Operation::Deleted(_))
    }

    /// The common fields, or `None` for a tombstone.
    pub fn entry(&self) -> Option<&Entry> {
        match self {
            Operation::Deleted(_) => None,
            Operation::Adjustment(e) => Some(e),
            Operation::Income(c) | Operation::Expense(c) => Some(&c.entry),
            Operation::Transfer(t) => Some(&t.entry),
        }
    }

    pub fn op_type(&self) -> Option<OpType> {
        match self {
            Operation::Deleted(_) => None,
            Operation::Adjustment(_) => Some(OpType::Adjustment),
            Operation::Income(_) => Some(OpType::Income),
            Operation::Expense(_) => Some(OpType::Expense),
            Operation::Transfer(_) => Some(OpType::Transfer),
        }
    }

    pub fn date(&self) -> Option<NaiveDate> {
        self.entry().map(|e| e.date)
    }

    /// Category shares for incomes and expenses, `None` for every other type.
    pub fn categories(&self) -> Option<&[CategoryAmount]> {
        match self {
            Operation::Income(c) | Operation::Expense(c) => Some(&c.categories),
            _ => None,
        }
    }

    pub fn to_account(&self) -> Option<&AccountAmount> {
        match self {
            Operation::Transfer(t) => Some(&t.to_account),
            _ => None,
        }
    }

    /// The signed amount this operation posts to `account_id`, in the account's currency. A
    /// transfer between two sides of the same account nets out.
    pub fn amount_for_account(&self, account_id: &str) -> Option<Decimal> {
        let entry = self.entry()?;
        let mut posted = None;
        if entry.account.id == account_id {
            posted = Some(entry.account.amount);
        }
        if let Some(to) = self.to_account().filter(|to| to.id == account_id) {
            posted = Some(posted.unwrap_or_default() + to.amount);
        }
        posted
    }

    /// Returns the tombstone that replaces this operation when it is deleted.
    pub fn tombstone(&self, now: DateTime<Utc>) -> Operation {
        Operation::Deleted(Tombstone {
            id: self.id().to_string(),
            last_modified: now,
        })
    }
}

/// The canonical total order over operations.
///
/// Tombstones come first, ordered by id. Live operations follow, ordered by date, type rank,
/// currency, absolute amount and finally by id descending, so that two distinct operations never
/// compare equal.
pub fn canonical_cmp(a: &Operation, b: &Operation) -> Ordering {
    match (a.entry(), b.entry()) {
        (None, None) => a.id().cmp(b.id()),
        (None, Some(_)) => Ordering::Less,
        (Some(_), None) => Ordering::Greater,
        (Some(x), Some(y)) => x
            .date
            .cmp(&y.date)
            .then_with(|| rank(a).cmp(&rank(b)))
            .then_with(|| x.currency.cmp(&y.currency))
            .then_with(|| x.amount.abs().cmp(&y.amount.abs()))
            .then_with(|| y.id.cmp(&x.id)),
    }
}

fn rank(op: &Operation) -> u8 {
    op.op_type().map(OpType::rank).unwrap_or_default()
}

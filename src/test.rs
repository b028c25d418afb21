//! Shared test utilities: entity builders, a seeded snapshot and a fake rate source.
//!
//! This module is only compiled when running tests (`#[cfg(test)]`).

use crate::model::{
    Account, AccountAmount, Categorized, Category, CategoryAmount, Entry, OpType, Operation,
    Snapshot, Transfer,
};
use crate::rates::RateSource;
use chrono::{DateTime, NaiveDate, TimeZone, Utc};
use rust_decimal::Decimal;
use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;

/// A fixed timestamp used for `last_modified` fields.
pub(crate) fn ts() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2024, 6, 1, 12, 0, 0).unwrap()
}

/// Parses a `YYYY-MM-DD` string.
pub(crate) fn date(s: &str) -> NaiveDate {
    NaiveDate::parse_from_str(s, "%Y-%m-%d").unwrap()
}

pub(crate) fn account(id: &str, name: &str, currency: &str) -> Account {
    Account::new(id, name, currency, ts())
}

pub(crate) fn category(id: &str, name: &str) -> Category {
    Category::new(id, name, ts())
}

/// Builds operations with sensible defaults: account `wallet`, currency `USD`, no categories.
pub(crate) struct OpBuilder {
    kind: OpType,
    entry: Entry,
    categories: Vec<CategoryAmount>,
    to_account: Option<AccountAmount>,
}

impl OpBuilder {
    pub(crate) fn new(kind: OpType, id: &str, day: &str, amount: i64) -> Self {
        let amount = Decimal::from(amount);
        Self {
            kind,
            entry: Entry {
                id: id.to_string(),
                last_modified: ts(),
                date: date(day),
                currency: "USD".to_string(),
                amount,
                account: AccountAmount {
                    id: "wallet".to_string(),
                    amount,
                },
                tags: Vec::new(),
                comment: None,
            },
            categories: Vec::new(),
            to_account: None,
        }
    }

    /// Attributes the whole amount to category `id`.
    pub(crate) fn category(mut self, id: &str) -> Self {
        self.categories.push(CategoryAmount {
            id: id.to_string(),
            amount: self.entry.amount,
        });
        self
    }

    pub(crate) fn tag(mut self, tag: &str) -> Self {
        self.entry.tags.push(tag.to_string());
        self
    }

    pub(crate) fn comment(mut self, comment: &str) -> Self {
        self.entry.comment = Some(comment.to_string());
        self
    }

    pub(crate) fn currency(mut self, currency: &str) -> Self {
        self.entry.currency = currency.to_string();
        self
    }

    /// Posts to account `id` with `amount` in that account's currency.
    pub(crate) fn account(mut self, id: &str, amount: i64) -> Self {
        self.entry.account = AccountAmount {
            id: id.to_string(),
            amount: Decimal::from(amount),
        };
        self
    }

    pub(crate) fn to(mut self, id: &str, amount: i64) -> Self {
        self.to_account = Some(AccountAmount {
            id: id.to_string(),
            amount: Decimal::from(amount),
        });
        self
    }

    pub(crate) fn build(self) -> Operation {
        let entry = self.entry;
        match self.kind {
            OpType::Adjustment => Operation::Adjustment(entry),
            OpType::Income => Operation::Income(Categorized {
                entry,
                categories: self.categories,
            }),
            OpType::Expense => Operation::Expense(Categorized {
                entry,
                categories: self.categories,
            }),
            OpType::Transfer => {
                let to_account = self.to_account.unwrap_or_else(|| AccountAmount {
                    id: "bank".to_string(),
                    amount: -entry.amount,
                });
                Operation::Transfer(Transfer { entry, to_account })
            }
        }
    }
}

pub(crate) fn expense(id: &str, day: &str, amount: i64) -> Operation {
    OpBuilder::new(OpType::Expense, id, day, amount).build()
}

pub(crate) fn income(id: &str, day: &str, amount: i64) -> Operation {
    OpBuilder::new(OpType::Income, id, day, amount).build()
}

pub(crate) fn adjustment(id: &str, day: &str, amount: i64) -> Operation {
    OpBuilder::new(OpType::Adjustment, id, day, amount).build()
}

/// A transfer of `amount` (positive) from account `from` to account `to`, same currency.
pub(crate) fn transfer(id: &str, day: &str, amount: i64, from: &str, to: &str) -> Operation {
    OpBuilder::new(OpType::Transfer, id, day, -amount)
        .account(from, -amount)
        .to(to, amount)
        .build()
}

/// A small but varied data set: two accounts in different currencies, two categories, one
/// watch-free month of operations and one tombstone.
pub(crate) fn snapshot() -> Snapshot {
    let operations = vec![
        OpBuilder::new(OpType::Expense, "op-1", "2024-01-05", -10)
            .category("food")
            .tag("lunch")
            .build(),
        income("op-2", "2024-01-05", 50),
        OpBuilder::new(OpType::Expense, "op-3", "2024-01-20", -700)
            .category("rent")
            .comment("January Rent")
            .build(),
        transfer("op-4", "2024-01-10", 100, "wallet", "bank"),
        OpBuilder::new(OpType::Income, "op-5", "2024-01-12", 5)
            .category("food")
            .comment("refund")
            .build(),
        adjustment("op-6", "2024-01-31", 3),
        expense("op-7", "2024-01-15", -1).tombstone(ts()),
    ];
    Snapshot {
        accounts: vec![
            account("wallet", "Wallet", "USD"),
            account("bank", "Bank", "EUR"),
        ],
        categories: vec![category("food", "Food"), category("rent", "Rent")],
        operations,
        watches: Vec::new(),
    }
}

/// A `RateSource` that serves tables from memory and counts how often it is asked.
#[derive(Default)]
pub(crate) struct FakeRateSource {
    tables: Mutex<HashMap<(i32, u32, String), Vec<f64>>>,
    calls: AtomicUsize,
}

impl FakeRateSource {
    pub(crate) fn with(self, year: i32, month: u32, currency: &str, rates: Vec<f64>) -> Self {
        self.set(year, month, currency, rates);
        self
    }

    pub(crate) fn set(&self, year: i32, month: u32, currency: &str, rates: Vec<f64>) {
        self.tables
            .lock()
            .unwrap()
            .insert((year, month, currency.to_string()), rates);
    }

    pub(crate) fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait::async_trait]
impl RateSource for FakeRateSource {
    async fn fetch(&self, year: i32, month: u32, currency: &str) -> anyhow::Result<Option<Vec<f64>>> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        // Yield so that concurrent callers genuinely interleave.
        tokio::task::yield_now().await;
        Ok(self
            .tables
            .lock()
            .unwrap()
            .get(&(year, month, currency.to_string()))
            .cloned())
    }
}

//! A small boolean filter language over operations and its compiler.
//!
//! A `Predicate` is a tree of leaf tests (`Type`, `Cat`, `Tag`, ...) and combinators (`And`,
//! `Or`, `Not`). `Predicate::compile` resolves name references against the store and turns the
//! tree into a `CompiledPredicate`, a plain closure that can be evaluated against many operations
//! without walking the tree again.

mod compile;
mod filter;

pub use compile::CompiledPredicate;

use crate::model::OpType;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;

/// Comparison used by `Predicate::Amount`.
#[derive(Debug, Clone, Copy, Eq, PartialEq, Hash, Serialize, Deserialize)]
pub enum Comparison {
    #[serde(rename = "<")]
    Lt,
    #[serde(rename = ">")]
    Gt,
    #[serde(rename = "=")]
    Eq,
    #[serde(rename = "<=")]
    Le,
    #[serde(rename = ">=")]
    Ge,
    #[serde(rename = "!=")]
    Ne,
}

serde_plain::derive_display_from_serialize!(Comparison);
serde_plain::derive_fromstr_from_deserialize!(Comparison);

impl Comparison {
    pub fn holds(self, ordering: Ordering) -> bool {
        match self {
            Comparison::Lt => ordering == Ordering::Less,
            Comparison::Gt => ordering == Ordering::Greater,
            Comparison::Eq => ordering == Ordering::Equal,
            Comparison::Le => ordering != Ordering::Greater,
            Comparison::Ge => ordering != Ordering::Less,
            Comparison::Ne => ordering != Ordering::Equal,
        }
    }
}

/// A filter expression over live operations.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Predicate {
    /// Matches everything.
    Any,
    Type(OpType),
    /// Income or expense attributed (at least partly) to the category id.
    Cat(String),
    /// Like `Cat`, by category name. Resolved at compile time.
    CatName(String),
    /// Income or expense without any category.
    Uncategorized,
    /// The primary account, or the destination account of a transfer.
    Account(String),
    /// Like `Account`, by account name. Resolved at compile time.
    AccountName(String),
    Tag(String),
    Currency(String),
    /// Case-insensitive substring of the comment.
    Comment(String),
    /// Compares the absolute amount of the operation with the value.
    Amount(Comparison, Decimal),
    And(Vec<Predicate>),
    Or(Vec<Predicate>),
    Not(Box<Predicate>),
}

impl Predicate {
    pub fn any() -> Self {
        Predicate::Any
    }

    pub fn op_type(op_type: OpType) -> Self {
        Predicate::Type(op_type)
    }

    pub fn cat(id: impl Into<String>) -> Self {
        Predicate::Cat(id.into())
    }

    pub fn cat_name(name: impl Into<String>) -> Self {
        Predicate::CatName(name.into())
    }

    pub fn uncategorized() -> Self {
        Predicate::Uncategorized
    }

    pub fn account(id: impl Into<String>) -> Self {
        Predicate::Account(id.into())
    }

    pub fn account_name(name: impl Into<String>) -> Self {
        Predicate::AccountName(name.into())
    }

    pub fn tag(value: impl Into<String>) -> Self {
        Predicate::Tag(value.into())
    }

    pub fn currency(code: impl Into<String>) -> Self {
        Predicate::Currency(code.into())
    }

    pub fn comment(substring: impl Into<String>) -> Self {
        Predicate::Comment(substring.into())
    }

    pub fn amount(comparison: Comparison, value: Decimal) -> Self {
        Predicate::Amount(comparison, value)
    }

    pub fn and(preds: impl IntoIterator<Item = Predicate>) -> Self {
        Predicate::And(preds.into_iter().collect())
    }

    pub fn or(preds: impl IntoIterator<Item = Predicate>) -> Self {
        Predicate::Or(preds.into_iter().collect())
    }

    #[allow(clippy::should_implement_trait)]
    pub fn not(pred: Predicate) -> Self {
        Predicate::Not(Box::new(pred))
    }

    /// Spending: expenses, plus incomes booked against a category (refunds and returns).
    pub fn expense() -> Self {
        Predicate::or([
            Predicate::op_type(OpType::Expense),
            Predicate::and([
                Predicate::op_type(OpType::Income),
                Predicate::not(Predicate::uncategorized()),
            ]),
        ])
    }

    /// Earnings: incomes that are not attributed to any category.
    pub fn income() -> Self {
        Predicate::and([
            Predicate::op_type(OpType::Income),
            Predicate::uncategorized(),
        ])
    }
}

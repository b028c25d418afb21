//! Types that represent the core data model: operations, accounts, categories and watches.
mod account;
mod category;
mod operation;

pub use account::Account;
pub use category::{Category, Filter, FilterMode, Money, Selection, Watch};
pub use operation::{
    canonical_cmp, AccountAmount, Categorized, CategoryAmount, Entry, OpType, Operation,
    Tombstone, Transfer,
};
use serde::{Deserialize, Serialize};

/// Everything the store holds, as loaded from or saved to durable storage.
#[derive(Default, Debug, Clone, Eq, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Snapshot {
    #[serde(default)]
    pub accounts: Vec<Account>,
    #[serde(default)]
    pub categories: Vec<Category>,
    #[serde(default)]
    pub operations: Vec<Operation>,
    #[serde(default)]
    pub watches: Vec<Watch>,
}

/// A single entity of any kind, as written by `push*` and handed to persistence.
#[derive(Debug, Clone, Eq, PartialEq, Serialize, Deserialize)]
#[serde(tag = "entity", content = "value", rename_all = "snake_case")]
pub enum Entity {
    Account(Account),
    Category(Category),
    Operation(Operation),
    Watch(Watch),
}

impl Entity {
    pub fn id(&self) -> &str {
        match self {
            Entity::Account(a) => &a.id,
            Entity::Category(c) => &c.id,
            Entity::Operation(o) => o.id(),
            Entity::Watch(w) => &w.id,
        }
    }
}

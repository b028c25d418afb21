use crate::model::Entity;
use serde::{Deserialize, Serialize};

/// A mutation of the store, as published to subscribers.
#[derive(Debug, Clone, Eq, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Change {
    /// An entity was inserted or replaced (tombstones included).
    Put(Entity),
    /// The store was wiped.
    Cleared,
}

/// Identifies a listener registered with `Store::subscribe`.
#[derive(Debug, Clone, Copy, Eq, PartialEq, Hash)]
pub struct SubscriptionId(pub(super) u64);

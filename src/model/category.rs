use super::OpType;
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// An amount in a specific currency.
#[derive(Debug, Clone, Eq, PartialEq, Serialize, Deserialize)]
pub struct Money {
    pub currency: String,
    pub amount: Decimal,
}

impl Money {
    pub fn new(currency: impl Into<String>, amount: Decimal) -> Self {
        Self {
            currency: currency.into(),
            amount,
        }
    }
}

#[derive(Debug, Clone, Eq, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Category {
    pub id: String,
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub per_day_goal: Option<Money>,
    #[serde(default)]
    pub deleted: bool,
    pub last_modified: DateTime<Utc>,
}

impl Category {
    pub fn new(id: impl Into<String>, name: impl Into<String>, last_modified: DateTime<Utc>) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            per_day_goal: None,
            deleted: false,
            last_modified,
        }
    }

    pub fn tombstone(&self, now: DateTime<Utc>) -> Self {
        Self {
            deleted: true,
            last_modified: now,
            ..self.clone()
        }
    }
}

/// A saved expense goal: a category-like entity whose spending is defined by a `Filter` instead of
/// by category membership.
#[derive(Debug, Clone, Eq, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Watch {
    pub id: String,
    pub name: String,
    pub per_day_goal: Money,
    pub filter: Filter,
    #[serde(default)]
    pub deleted: bool,
    pub last_modified: DateTime<Utc>,
}

impl Watch {
    pub fn tombstone(&self, now: DateTime<Utc>) -> Self {
        Self {
            deleted: true,
            last_modified: now,
            ..self.clone()
        }
    }
}

/// How a filter dimension treats its selection.
#[derive(Debug, Default, Clone, Copy, Eq, PartialEq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FilterMode {
    /// The dimension does not restrict anything.
    #[default]
    All,
    /// Only the selected values pass.
    Selected,
    /// Everything except the selected values passes.
    Exclude,
}

serde_plain::derive_display_from_serialize!(FilterMode);
serde_plain::derive_fromstr_from_deserialize!(FilterMode);

/// One dimension of a `Filter`.
#[derive(Debug, Clone, Eq, PartialEq, Serialize, Deserialize)]
pub struct Selection<T> {
    #[serde(default)]
    pub mode: FilterMode,
    #[serde(default = "Vec::new")]
    pub selected: Vec<T>,
}

impl<T> Default for Selection<T> {
    fn default() -> Self {
        Self {
            mode: FilterMode::All,
            selected: Vec::new(),
        }
    }
}

impl<T> Selection<T> {
    pub fn selected(selected: Vec<T>) -> Self {
        Self {
            mode: FilterMode::Selected,
            selected,
        }
    }

    pub fn exclude(selected: Vec<T>) -> Self {
        Self {
            mode: FilterMode::Exclude,
            selected,
        }
    }

    /// A dimension restricts operations only when its mode is not `All` and something is selected.
    pub fn is_active(&self) -> bool {
        self.mode != FilterMode::All && !self.selected.is_empty()
    }
}

/// The user-facing filter behind analytics screens and watches.
///
/// In `categories`, the empty string stands for "uncategorized".
#[derive(Debug, Default, Clone, Eq, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Filter {
    #[serde(default)]
    pub search: String,
    #[serde(default)]
    pub op_type: Selection<OpType>,
    #[serde(default)]
    pub categories: Selection<String>,
    #[serde(default)]
    pub accounts: Selection<String>,
    #[serde(default)]
    pub tags: Selection<String>,
}

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A place money lives in, denominated in a single currency.
#[derive(Debug, Clone, Eq, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Account {
    pub id: String,
    pub name: String,
    pub currency: String,
    #[serde(default)]
    pub hidden: bool,
    #[serde(default)]
    pub deleted: bool,
    pub last_modified: DateTime<Utc>,
}

impl Account {
    pub fn new(
        id: impl Into<String>,
        name: impl Into<String>,
        currency: impl Into<String>,
        last_modified: DateTime<Utc>,
    ) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            currency: currency.into(),
            hidden: false,
            deleted: false,
            last_modified,
        }
    }

    /// Returns a tombstoned copy of this account.
    pub fn tombstone(&self, now: DateTime<Utc>) -> Self {
        Self {
            deleted: true,
            last_modified: now,
            ..self.clone()
        }
    }
}

use crate::interval::days_in_month;
use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

/// The cache key of the table for one currency in one month, e.g. `2024-03-EUR`.
pub fn table_key(year: i32, month: u32, currency: &str) -> String {
    format!("{year}-{month:02}-{currency}")
}

/// Daily USD -> `currency` rates for one calendar month.
///
/// `rates[0]` is the rate for the first of the month. A table with fewer entries than the month
/// has days is partial: the rates for the rest of the month have not been published yet.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RateTable {
    pub key: String,
    pub year: i32,
    pub month: u32,
    pub currency: String,
    pub rates: Vec<f64>,
    pub load_date: DateTime<Utc>,
}

impl RateTable {
    pub fn new(
        year: i32,
        month: u32,
        currency: impl Into<String>,
        rates: Vec<f64>,
        load_date: DateTime<Utc>,
    ) -> Self {
        let currency = currency.into();
        Self {
            key: table_key(year, month, &currency),
            year,
            month,
            currency,
            rates,
            load_date,
        }
    }

    pub fn days_in_month(&self) -> u32 {
        days_in_month(self.year, self.month)
    }

    pub fn is_partial(&self) -> bool {
        self.rates.len() < self.days_in_month() as usize
    }

    /// Whether the table was loaded more than `max_age` before `now`.
    pub fn is_stale(&self, now: DateTime<Utc>, max_age: Duration) -> bool {
        now - self.load_date > max_age
    }

    /// The rate for day-of-month `day` (1-based). Days past the end of a partial table get the
    /// last published rate. `None` only for an empty table.
    pub fn rate_for_day(&self, day: u32) -> Option<f64> {
        let ix = day.saturating_sub(1) as usize;
        self.rates.get(ix).or_else(|| self.rates.last()).copied()
    }
}

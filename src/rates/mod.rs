//! Exchange rates, cached per currency and month.
//!
//! Every rate goes through USD: tables hold USD -> currency rates for each day of a month, and
//! a rate between two other currencies is the product of two lookups. Tables are kept in memory,
//! in a local `RateStore`, and are fetched from a `RateSource` when neither has a usable copy.
//! A lookup never fails: when no table can be found for a month, the last day of the previous
//! month is tried instead.

mod clock;
mod lock;
mod source;
mod store;
mod table;

pub use clock::{Clock, FixedClock, SystemClock};
pub use lock::{KeyGuard, KeyedLocks};
pub use source::{HttpRateSource, RateSource};
pub use store::{JsonRateStore, MemoryRateStore, RateStore};
pub use table::{table_key, RateTable};

use crate::interval::{days_in_month, previous_month_end};
use chrono::{DateTime, Datelike, Duration, NaiveDate, Utc};
use rust_decimal::prelude::FromPrimitive;
use rust_decimal::Decimal;
use std::collections::HashMap;
use std::sync::{Arc, Mutex, PoisonError};
use tracing::{debug, trace, warn};

/// The currency every rate table is expressed against.
pub const PIVOT: &str = "USD";

/// How long a partial table is trusted before it is refreshed.
pub const DEFAULT_STALE_AFTER_HOURS: i64 = 6;

/// How many months back a lookup falls back before giving up.
const MAX_FALLBACK_MONTHS: usize = 24;

/// The rate cache. Construct one per session and share it with `Arc`.
pub struct RateCache {
    source: Arc<dyn RateSource>,
    store: Arc<dyn RateStore>,
    clock: Arc<dyn Clock>,
    stale_after: Duration,
    tables: Mutex<HashMap<String, Arc<RateTable>>>,
    /// When a load last found nothing for a key. Such keys are not retried until `stale_after`.
    misses: Mutex<HashMap<String, DateTime<Utc>>>,
    locks: KeyedLocks,
}

impl std::fmt::Debug for RateCache {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RateCache")
            .field("stale_after", &self.stale_after)
            .field("tables", &self.cached_tables())
            .finish()
    }
}

impl RateCache {
    pub fn new(
        source: Arc<dyn RateSource>,
        store: Arc<dyn RateStore>,
        clock: Arc<dyn Clock>,
    ) -> Self {
        Self {
            source,
            store,
            clock,
            stale_after: Duration::hours(DEFAULT_STALE_AFTER_HOURS),
            tables: Mutex::new(HashMap::new()),
            misses: Mutex::new(HashMap::new()),
            locks: KeyedLocks::new(),
        }
    }

    /// Overrides how long a partial table is trusted.
    pub fn with_stale_after(mut self, stale_after: Duration) -> Self {
        self.stale_after = stale_after;
        self
    }

    pub fn clock(&self) -> &dyn Clock {
        self.clock.as_ref()
    }

    /// The number of tables held in memory.
    pub fn cached_tables(&self) -> usize {
        self.tables
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    /// The multiplier that turns an amount in `from` into an amount in `to` on `date`.
    pub async fn get_rate(&self, date: NaiveDate, from: &str, to: &str) -> f64 {
        if from == to {
            return 1.0;
        }
        let from_usd = self.get_from_usd_rate(date, from).await;
        let to_usd = self.get_from_usd_rate(date, to).await;
        (1.0 / from_usd) * to_usd
    }

    /// Converts `amount` from one currency to another at the rate of `date`.
    pub async fn convert(&self, date: NaiveDate, amount: Decimal, from: &str, to: &str) -> Decimal {
        if from == to {
            return amount;
        }
        scale(amount, self.get_rate(date, from, to).await)
    }

    /// The USD -> `currency` rate on `date`. Dates in the future are clamped to today.
    pub async fn get_from_usd_rate(&self, date: NaiveDate, currency: &str) -> f64 {
        if currency == PIVOT {
            return 1.0;
        }
        let today = self.clock.today();
        let mut date = date.min(today);
        for _ in 0..MAX_FALLBACK_MONTHS {
            if let Some(rate) = self
                .table(date.year(), date.month(), currency)
                .await
                .and_then(|table| table.rate_for_day(date.day()))
            {
                return rate;
            }
            match previous_month_end(date) {
                Some(previous) => {
                    debug!("No {currency} rates for {date}, falling back to {previous}");
                    date = previous;
                }
                None => break,
            }
        }
        warn!("No {currency} rates found within {MAX_FALLBACK_MONTHS} months, using 1");
        1.0
    }

    /// Returns the table for a month, loading it if it is not in memory or if it is partial and
    /// stale. Concurrent callers asking for the same table wait for a single load. A month that
    /// could not be found anywhere is remembered as missing for `stale_after`.
    async fn table(&self, year: i32, month: u32, currency: &str) -> Option<Arc<RateTable>> {
        let key = table_key(year, month, currency);
        let _guard = self.locks.lock(&key).await;

        let cached = self
            .tables
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .get(&key)
            .cloned();
        let now = self.clock.now();
        if let Some(table) = &cached {
            if !(table.is_partial() && table.is_stale(now, self.stale_after)) {
                trace!("Rate table {key} served from memory");
                return cached;
            }
            debug!("Rate table {key} is partial and stale, reloading");
        } else if self.recently_missed(&key, now) {
            trace!("Rate table {key} was recently missing, not retrying yet");
            return None;
        }

        match self.load(&key, year, month, currency, now).await {
            Some(table) => {
                self.misses
                    .lock()
                    .unwrap_or_else(PoisonError::into_inner)
                    .remove(&key);
                let table = Arc::new(table);
                self.tables
                    .lock()
                    .unwrap_or_else(PoisonError::into_inner)
                    .insert(key, table.clone());
                Some(table)
            }
            None if cached.is_none() => {
                self.misses
                    .lock()
                    .unwrap_or_else(PoisonError::into_inner)
                    .insert(key, now);
                None
            }
            // Keep serving what we had rather than nothing.
            None => cached,
        }
    }

    fn recently_missed(&self, key: &str, now: DateTime<Utc>) -> bool {
        self.misses
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .get(key)
            .is_some_and(|missed_at| now - *missed_at < self.stale_after)
    }

    /// Reads the local copy of a table and refreshes it from the source when it is missing,
    /// partial and stale, or for the month in progress.
    async fn load(
        &self,
        key: &str,
        year: i32,
        month: u32,
        currency: &str,
        now: DateTime<Utc>,
    ) -> Option<RateTable> {
        let local = match self.store.get(key).await {
            Ok(local) => local,
            Err(e) => {
                warn!("Unable to read local rate table {key}: {e:#}");
                None
            }
        };
        let today = self.clock.today();
        let in_progress = (year, month) == (today.year(), today.month());
        let refresh = match &local {
            None => true,
            Some(table) => {
                in_progress || (table.is_partial() && table.is_stale(now, self.stale_after))
            }
        };
        if !refresh {
            trace!("Rate table {key} served from the local store");
            return local;
        }

        match self.fetch(year, month, currency, now).await {
            Some(table) => {
                if let Err(e) = self.store.put(&table).await {
                    warn!("Unable to save rate table {key} locally: {e:#}");
                }
                Some(table)
            }
            None => local,
        }
    }

    async fn fetch(
        &self,
        year: i32,
        month: u32,
        currency: &str,
        now: DateTime<Utc>,
    ) -> Option<RateTable> {
        debug!("Fetching {currency} rates for {year}-{month:02}");
        let mut rates = match self.source.fetch(year, month, currency).await {
            Ok(Some(rates)) => rates,
            Ok(None) => {
                debug!("No {currency} rates published for {year}-{month:02}");
                return None;
            }
            Err(e) => {
                warn!("Unable to fetch {currency} rates for {year}-{month:02}: {e:#}");
                return None;
            }
        };
        if rates.is_empty() {
            debug!("Empty {currency} rate table for {year}-{month:02}");
            return None;
        }
        if rates.iter().any(|r| !r.is_finite() || *r <= 0.0) {
            warn!("Discarding {currency} rate table for {year}-{month:02}: invalid rates");
            return None;
        }
        let days = days_in_month(year, month) as usize;
        if rates.len() > days {
            warn!(
                "{currency} rate table for {year}-{month:02} has {} entries, keeping {days}",
                rates.len()
            );
            rates.truncate(days);
        }
        Some(RateTable::new(year, month, currency, rates, now))
    }
}

/// Multiplies a decimal amount by a floating point rate.
pub fn scale(amount: Decimal, rate: f64) -> Decimal {
    match Decimal::from_f64(rate) {
        Some(rate) => amount * rate,
        None => {
            warn!("Rate {rate} cannot be represented as a decimal, leaving {amount} unscaled");
            amount
        }
    }
}

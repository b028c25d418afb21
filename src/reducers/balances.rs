use super::{Point, Series};
use crate::interval::{Granularity, Intervals};
use crate::model::{Account, Operation};
use crate::rates::{scale, RateCache};
use crate::walker::Reducer;
use chrono::NaiveDate;
use rust_decimal::Decimal;
use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;
use tracing::debug;

/// The balance series of one account.
#[derive(Debug, Clone)]
pub struct AccountBalance {
    pub id: String,
    pub currency: String,
    /// In the account's own currency.
    pub local: Series,
    /// In the master currency, filled in when the run is done.
    pub converted: Series,
}

/// Per-account balances plus their sum in a master currency.
///
/// Balances are tracked in each account's currency while walking. Once the walk is done, every
/// point of every account is re-expressed in the master currency at the rate of the point's date
/// and the results are added up into `total`.
#[derive(Debug)]
pub struct AccountBalances {
    rates: Arc<RateCache>,
    master: String,
    accounts: BTreeMap<String, AccountBalance>,
    total: Series,
}

impl AccountBalances {
    pub fn new<'a>(
        rates: Arc<RateCache>,
        master: impl Into<String>,
        accounts: impl IntoIterator<Item = &'a Account>,
    ) -> Self {
        let accounts = accounts
            .into_iter()
            .map(|account| {
                let balance = AccountBalance {
                    id: account.id.clone(),
                    currency: account.currency.clone(),
                    local: Series::default(),
                    converted: Series::default(),
                };
                (account.id.clone(), balance)
            })
            .collect();
        Self {
            rates,
            master: master.into(),
            accounts,
            total: Series::default(),
        }
    }

    /// Opens every account at its balance from the operations dated before `start`, so a run
    /// starting at `start` reports whole balances instead of changes since `start`.
    pub fn with_history(mut self, operations: &[Operation], start: NaiveDate) -> Self {
        for balance in self.accounts.values_mut() {
            let opening: Decimal = operations
                .iter()
                .filter(|op| op.date().is_some_and(|date| date < start))
                .filter_map(|op| op.amount_for_account(&balance.id))
                .sum();
            balance.local = Series::with_opening(opening);
        }
        self
    }

    pub fn master(&self) -> &str {
        &self.master
    }

    pub fn account(&self, id: &str) -> Option<&AccountBalance> {
        self.accounts.get(id)
    }

    /// Accounts in id order.
    pub fn accounts(&self) -> impl Iterator<Item = &AccountBalance> {
        self.accounts.values()
    }

    /// The sum of all converted account series.
    pub fn total(&self) -> &Series {
        &self.total
    }
}

/// Looks up a rate into `master`, remembering it for the rest of the call.
async fn cached_rate(
    rates: &RateCache,
    cache: &mut HashMap<(NaiveDate, String), f64>,
    date: NaiveDate,
    from: &str,
    master: &str,
) -> f64 {
    let key = (date, from.to_string());
    if let Some(rate) = cache.get(&key) {
        return *rate;
    }
    let rate = rates.get_rate(date, from, master).await;
    cache.insert(key, rate);
    rate
}

#[async_trait::async_trait]
impl Reducer for AccountBalances {
    async fn new_day(&mut self, intervals: &Intervals, first: bool) {
        for balance in self.accounts.values_mut() {
            balance.local.new_day(intervals, first);
        }
    }

    async fn process(&mut self, op: &Operation) {
        let Some(entry) = op.entry() else {
            return;
        };
        let mut ids = vec![entry.account.id.as_str()];
        if let Some(to) = op.to_account().filter(|to| to.id != entry.account.id) {
            ids.push(to.id.as_str());
        }
        for id in ids {
            let (Some(balance), Some(amount)) =
                (self.accounts.get_mut(id), op.amount_for_account(id))
            else {
                continue;
            };
            balance.local.add(amount);
        }
    }

    async fn done(&mut self) {
        let mut cache = HashMap::new();
        let mut total = Series::default();
        let today = self.rates.clock().today();

        for balance in self.accounts.values_mut() {
            let mut converted = Series::default();
            for g in Granularity::ALL {
                for point in balance.local.get(g) {
                    let rate = cached_rate(
                        &self.rates,
                        &mut cache,
                        point.date,
                        &balance.currency,
                        &self.master,
                    )
                    .await;
                    converted.buckets[g.index()].push(Point {
                        date: point.date,
                        total: scale(point.total, rate),
                        change: scale(point.change, rate),
                    });
                }
            }
            converted.total = converted
                .get(Granularity::Day)
                .last()
                .map(|p| p.total)
                .unwrap_or_default();
            if !balance.local.today().is_zero() {
                let rate = cached_rate(
                    &self.rates,
                    &mut cache,
                    today,
                    &balance.currency,
                    &self.master,
                )
                .await;
                converted.today = scale(balance.local.today(), rate);
            }
            total.absorb(&converted);
            balance.converted = converted;
        }

        debug!(
            "Converted {} account balances into {} with {} distinct rate lookups",
            self.accounts.len(),
            self.master,
            cache.len()
        );
        self.total = total;
    }
}

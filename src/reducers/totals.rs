use super::Series;
use crate::interval::Intervals;
use crate::model::{Account, Operation};
use crate::rates::RateCache;
use crate::walker::Reducer;
use rust_decimal::Decimal;
use std::sync::Arc;

/// Which amount of an operation a `Totals` reducer folds in.
#[derive(Debug, Clone, Eq, PartialEq)]
pub enum AmountSource {
    /// The operation's own amount, in the operation's currency.
    Operation,
    /// Whatever the operation posts to one account, in that account's currency.
    Account { id: String, currency: String },
}

/// A running total with per-bucket changes, expressed in a single currency.
#[derive(Debug)]
pub struct Totals {
    rates: Arc<RateCache>,
    currency: String,
    source: AmountSource,
    series: Series,
}

impl Totals {
    /// Totals of operation amounts converted into `currency`.
    pub fn new(rates: Arc<RateCache>, currency: impl Into<String>) -> Self {
        Self {
            rates,
            currency: currency.into(),
            source: AmountSource::Operation,
            series: Series::default(),
        }
    }

    /// Totals of what operations post to `account`, converted into `currency`.
    pub fn for_account(rates: Arc<RateCache>, currency: impl Into<String>, account: &Account) -> Self {
        Self {
            source: AmountSource::Account {
                id: account.id.clone(),
                currency: account.currency.clone(),
            },
            ..Self::new(rates, currency)
        }
    }

    pub fn currency(&self) -> &str {
        &self.currency
    }

    pub fn series(&self) -> &Series {
        &self.series
    }

    async fn amount(&self, op: &Operation) -> Option<Decimal> {
        let entry = op.entry()?;
        let (amount, from) = match &self.source {
            AmountSource::Operation => (entry.amount, entry.currency.as_str()),
            AmountSource::Account { id, currency } => {
                (op.amount_for_account(id)?, currency.as_str())
            }
        };
        Some(self.rates.convert(entry.date, amount, from, &self.currency).await)
    }
}

#[async_trait::async_trait]
impl Reducer for Totals {
    async fn new_day(&mut self, intervals: &Intervals, first: bool) {
        self.series.new_day(intervals, first);
    }

    async fn process(&mut self, op: &Operation) {
        if let Some(amount) = self.amount(op).await {
            self.series.add(amount);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::interval::{Granularity, Span};
    use crate::model::{OpType, Snapshot};
    use crate::predicate::Predicate;
    use crate::rates::{FixedClock, MemoryRateStore};
    use crate::store::Store;
    use crate::test::{account, date, expense, snapshot, FakeRateSource, OpBuilder};
    use crate::walker::calculate;

    fn rates(source: FakeRateSource, today: &str) -> Arc<RateCache> {
        let now = date(today).and_hms_opt(12, 0, 0).unwrap().and_utc();
        Arc::new(RateCache::new(
            Arc::new(source),
            Arc::new(MemoryRateStore::new()),
            Arc::new(FixedClock::new(now)),
        ))
    }

    fn store(snapshot: Snapshot) -> Store {
        let mut store = Store::new();
        store.init(snapshot);
        store
    }

    #[tokio::test]
    async fn expense_totals_by_week_and_month() {
        let store = store(snapshot());
        let predicate = Predicate::expense().compile(&store).unwrap();
        let mut totals = Totals::new(rates(FakeRateSource::default(), "2024-06-01"), "USD");
        calculate(
            store.operations().unwrap(),
            Span::month_of(date("2024-01-01")),
            &predicate,
            date("2024-06-01"),
            &mut [&mut totals],
        )
        .await;

        // Food -10, rent -700 and the +5 food refund.
        let series = totals.series();
        assert_eq!(series.total(), Decimal::from(-705));
        let months = series.get(Granularity::Month);
        assert_eq!(months.len(), 1);
        assert_eq!(months[0].change, Decimal::from(-705));

        // Monday weeks: Jan 1-7 has the -10, Jan 8-14 the refund, Jan 15-21 the rent.
        let weeks = series.get(Granularity::WeekMonday);
        assert_eq!(weeks.len(), 5);
        let changes: Vec<_> = weeks.iter().map(|p| p.change).collect();
        assert_eq!(changes, [-10, 5, -700, 0, 0].map(Decimal::from).to_vec());
        assert_eq!(weeks[2].total, Decimal::from(-705));
        assert_eq!(series.get(Granularity::Day).len(), 31);
        assert_eq!(series.today(), Decimal::ZERO);
    }

    #[tokio::test]
    async fn converts_into_the_target_currency() {
        let store = store(Snapshot {
            operations: vec![
                OpBuilder::new(OpType::Expense, "a", "2024-01-03", -20)
                    .currency("EUR")
                    .build(),
                expense("b", "2024-01-04", -10),
            ],
            ..Snapshot::default()
        });
        let source = FakeRateSource::default().with(2024, 1, "EUR", vec![0.5; 31]);
        let mut totals = Totals::new(rates(source, "2024-02-15"), "USD");
        let predicate = Predicate::any().compile(&store).unwrap();
        calculate(
            store.operations().unwrap(),
            Span::new(date("2024-01-01"), date("2024-01-31")),
            &predicate,
            date("2024-02-15"),
            &mut [&mut totals],
        )
        .await;
        // 20 EUR at 0.5 EUR per USD is 40 USD.
        assert_eq!(totals.series().total(), Decimal::from(-50));
        assert_eq!(totals.currency(), "USD");
    }

    #[tokio::test]
    async fn account_totals_follow_both_sides_of_transfers() {
        let store = store(snapshot());
        let bank = account("bank", "Bank", "EUR");
        let source = FakeRateSource::default().with(2024, 1, "EUR", vec![0.5; 31]);
        let rates = rates(source, "2024-01-20");
        let wallet_account = account("wallet", "Wallet", "USD");
        let mut wallet = Totals::for_account(rates.clone(), "USD", &wallet_account);
        let mut eur = Totals::for_account(rates, "USD", &bank);
        let predicate = Predicate::any().compile(&store).unwrap();
        calculate(
            store.operations().unwrap(),
            Span::month_of(date("2024-01-01")),
            &predicate,
            date("2024-01-20"),
            &mut [&mut wallet, &mut eur],
        )
        .await;
        // -10 + 50 - 700 - 100 + 5 + 3
        assert_eq!(wallet.series().total(), Decimal::from(-752));
        // Rent is paid on the 20th, which is today.
        assert_eq!(wallet.series().today(), Decimal::from(-700));
        // 100 EUR arriving in the bank is 200 USD.
        assert_eq!(eur.series().total(), Decimal::from(200));
    }
}

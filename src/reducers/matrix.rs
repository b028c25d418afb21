use crate::interval::Intervals;
use crate::model::Operation;
use crate::rates::RateCache;
use crate::walker::Reducer;
use chrono::Datelike;
use rust_decimal::Decimal;
use std::sync::Arc;

/// Sums amounts into a `[month][year]` grid in a single currency. A new year column is opened on
/// the first day of each year and on the first day of the run.
#[derive(Debug)]
pub struct YearMonthMatrix {
    rates: Arc<RateCache>,
    currency: String,
    years: Vec<i32>,
    cells: [Vec<Decimal>; 12],
}

impl YearMonthMatrix {
    pub fn new(rates: Arc<RateCache>, currency: impl Into<String>) -> Self {
        Self {
            rates,
            currency: currency.into(),
            years: Vec::new(),
            cells: Default::default(),
        }
    }

    /// The years with a column, oldest first.
    pub fn years(&self) -> &[i32] {
        &self.years
    }

    /// The amount for `month` (1 to 12) of `year`, `None` when the run did not cover that year.
    pub fn get(&self, month: u32, year: i32) -> Option<Decimal> {
        let column = self.years.iter().position(|y| *y == year)?;
        let row = self.cells.get(month.checked_sub(1)? as usize)?;
        row.get(column).copied()
    }

    /// One row per month, one value per year.
    pub fn rows(&self) -> impl Iterator<Item = (u32, &[Decimal])> {
        (1u32..).zip(self.cells.iter().map(Vec::as_slice))
    }
}

#[async_trait::async_trait]
impl Reducer for YearMonthMatrix {
    async fn new_day(&mut self, intervals: &Intervals, first: bool) {
        if first || intervals.year.is_first_day {
            self.years.push(intervals.date.year());
            for row in &mut self.cells {
                row.push(Decimal::ZERO);
            }
        }
    }

    async fn process(&mut self, op: &Operation) {
        let Some(entry) = op.entry() else {
            return;
        };
        let amount = self
            .rates
            .convert(entry.date, entry.amount, &entry.currency, &self.currency)
            .await;
        if let Some(cell) = self.cells[entry.date.month0() as usize].last_mut() {
            *cell += amount;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::interval::Span;
    use crate::model::Snapshot;
    use crate::predicate::Predicate;
    use crate::rates::{FixedClock, MemoryRateStore};
    use crate::store::Store;
    use crate::test::{date, expense, income, ts, FakeRateSource};
    use crate::walker::calculate;

    #[tokio::test]
    async fn spans_a_year_boundary() {
        let mut store = Store::new();
        store.init(Snapshot {
            operations: vec![
                expense("a", "2023-11-20", -30),
                expense("b", "2023-11-21", -12),
                expense("c", "2023-12-31", -1),
                expense("d", "2024-01-01", -100),
                income("e", "2024-01-15", 999),
                expense("f", "2024-02-10", -7),
            ],
            ..Snapshot::default()
        });
        let rates = Arc::new(RateCache::new(
            Arc::new(FakeRateSource::default()),
            Arc::new(MemoryRateStore::new()),
            Arc::new(FixedClock::new(ts())),
        ));
        let mut matrix = YearMonthMatrix::new(rates, "USD");
        let predicate = Predicate::expense().compile(&store).unwrap();
        calculate(
            store.operations().unwrap(),
            Span::new(date("2023-11-15"), date("2024-02-10")),
            &predicate,
            date("2024-06-01"),
            &mut [&mut matrix],
        )
        .await;

        assert_eq!(matrix.years(), &[2023, 2024]);
        assert_eq!(matrix.get(11, 2023), Some(Decimal::from(-42)));
        assert_eq!(matrix.get(12, 2023), Some(Decimal::from(-1)));
        assert_eq!(matrix.get(1, 2024), Some(Decimal::from(-100)));
        assert_eq!(matrix.get(2, 2024), Some(Decimal::from(-7)));
        assert_eq!(matrix.get(3, 2024), Some(Decimal::ZERO));
        assert_eq!(matrix.get(1, 2022), None);
        assert_eq!(matrix.get(0, 2024), None);
        assert_eq!(matrix.get(13, 2024), None);
        assert_eq!(matrix.rows().count(), 12);
        assert_eq!(matrix.rows().last().map(|(m, _)| m), Some(12));
    }
}

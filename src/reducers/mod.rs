//! Reducers for the walker.
//!
//! `Series` is the shared bookkeeping: a running total plus a per-bucket change at every
//! granularity, opened whenever the walker reports the first day of an interval.

mod balances;
mod counter;
mod matrix;
mod totals;

pub use balances::{AccountBalance, AccountBalances};
pub use counter::OperationCounter;
pub use matrix::YearMonthMatrix;
pub use totals::{AmountSource, Totals};

use crate::interval::{Granularity, Intervals};
use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::Serialize;

/// One bucket of a series.
#[derive(Debug, Clone, Copy, Eq, PartialEq, Serialize)]
pub struct Point {
    /// The day the bucket was opened.
    pub date: NaiveDate,
    /// The running total at the end of the bucket (so far).
    pub total: Decimal,
    /// How much the total moved within the bucket.
    pub change: Decimal,
}

/// A running total tracked at every granularity at once, plus the change on today's date.
#[derive(Debug, Clone, Default, Eq, PartialEq)]
pub struct Series {
    buckets: [Vec<Point>; 5],
    total: Decimal,
    today: Decimal,
    on_today: bool,
}

impl Series {
    /// A series whose total starts from `opening` instead of zero.
    pub fn with_opening(opening: Decimal) -> Self {
        Self {
            total: opening,
            ..Self::default()
        }
    }

    /// Opens a bucket for every interval starting on this day. On the first day of a run every
    /// granularity gets a bucket, so the series never starts without one.
    pub fn new_day(&mut self, intervals: &Intervals, first: bool) {
        for g in Granularity::ALL {
            if first || intervals.get(g).is_first_day {
                self.buckets[g.index()].push(Point {
                    date: intervals.date,
                    total: self.total,
                    change: Decimal::ZERO,
                });
            }
        }
        self.on_today = intervals.day.is_now();
    }

    /// Folds `amount` into the total and into the open bucket of every granularity.
    pub fn add(&mut self, amount: Decimal) {
        self.total += amount;
        for bucket in &mut self.buckets {
            if let Some(point) = bucket.last_mut() {
                point.total = self.total;
                point.change += amount;
            }
        }
        if self.on_today {
            self.today += amount;
        }
    }

    pub fn get(&self, granularity: Granularity) -> &[Point] {
        &self.buckets[granularity.index()]
    }

    pub fn total(&self) -> Decimal {
        self.total
    }

    /// The change recorded on today's date, zero when today is outside the run.
    pub fn today(&self) -> Decimal {
        self.today
    }

    /// Adds another series with the same bucket layout into this one, point by point.
    fn absorb(&mut self, other: &Series) {
        for g in Granularity::ALL {
            let mine = &mut self.buckets[g.index()];
            let theirs = other.get(g);
            if mine.is_empty() {
                mine.extend_from_slice(theirs);
                continue;
            }
            debug_assert_eq!(mine.len(), theirs.len(), "series must share bucket layout");
            for (a, b) in mine.iter_mut().zip(theirs) {
                a.total += b.total;
                a.change += b.change;
            }
        }
        self.total += other.total;
        self.today += other.today;
    }
}

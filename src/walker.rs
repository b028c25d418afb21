//! The aggregation engine.
//!
//! `calculate` walks a span one calendar day at a time and, in a single forward sweep over the
//! canonically ordered operations, feeds every matching operation to a set of reducers. For each
//! day the reducers first see `new_day` with that day's intervals, then `process` for each of the
//! day's matching operations. `done` runs once at the end.

use crate::interval::{Intervals, Span};
use crate::model::Operation;
use crate::predicate::CompiledPredicate;
use chrono::NaiveDate;
use futures::future::join_all;
use tracing::debug;

/// An accumulator driven by `calculate`. Every method defaults to doing nothing.
#[async_trait::async_trait]
pub trait Reducer: Send {
    /// Called at the start of every day of the run. `first` is true only for the first day of the
    /// span, whether or not it is the natural start of any interval.
    async fn new_day(&mut self, _intervals: &Intervals, _first: bool) {}

    /// Called for each matching operation dated on the current day.
    async fn process(&mut self, _op: &Operation) {}

    /// Called once after the last day.
    async fn done(&mut self) {}
}

/// What a run did, for logging and tests.
#[derive(Debug, Default, Clone, Copy, Eq, PartialEq)]
pub struct RunStats {
    pub days: usize,
    pub processed: usize,
}

/// Runs `reducers` over the operations in `span` that `predicate` accepts.
///
/// `operations` must be in canonical order, as returned by `Store::operations`. Calls to the
/// reducers for the same event run concurrently; events themselves are strictly sequential.
pub async fn calculate(
    operations: &[Operation],
    span: Span,
    predicate: &CompiledPredicate,
    today: NaiveDate,
    reducers: &mut [&mut dyn Reducer],
) -> RunStats {
    let mut stats = RunStats::default();
    let mut cursor = 0;

    for (ix, day) in span.dates().enumerate() {
        let intervals = Intervals::new(day, today);
        join_all(
            reducers
                .iter_mut()
                .map(|reducer| reducer.new_day(&intervals, ix == 0)),
        )
        .await;
        stats.days += 1;

        while let Some(op) = operations.get(cursor) {
            let Some(date) = op.date() else {
                cursor += 1;
                continue;
            };
            if date > day {
                break;
            }
            cursor += 1;
            if date < span.start || !predicate.matches(op) {
                continue;
            }
            debug_assert_eq!(date, day, "operations must be in canonical order");
            join_all(reducers.iter_mut().map(|reducer| reducer.process(op))).await;
            stats.processed += 1;
        }
    }

    join_all(reducers.iter_mut().map(|reducer| reducer.done())).await;
    debug!(
        "Walked {} days from {} to {}, {} operations processed",
        stats.days, span.start, span.end, stats.processed
    );
    stats
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::interval::Granularity;
    use crate::model::{OpType, Snapshot};
    use crate::predicate::Predicate;
    use crate::store::Store;
    use crate::test::{date, expense, income, snapshot, transfer};
    use std::sync::{Arc, Mutex};

    /// Records everything it is told.
    #[derive(Default)]
    struct Recorder {
        first_days: Vec<(Granularity, NaiveDate)>,
        firsts: usize,
        processed: Vec<(NaiveDate, String)>,
        current: Option<NaiveDate>,
        done: usize,
    }

    #[async_trait::async_trait]
    impl Reducer for Recorder {
        async fn new_day(&mut self, intervals: &Intervals, first: bool) {
            for g in Granularity::ALL {
                if intervals.get(g).is_first_day {
                    self.first_days.push((g, intervals.date));
                }
            }
            if first {
                self.firsts += 1;
            }
            self.current = Some(intervals.date);
        }

        async fn process(&mut self, op: &Operation) {
            assert_eq!(op.date(), self.current, "processed on the wrong day");
            self.processed
                .push((op.date().unwrap(), op.id().to_string()));
        }

        async fn done(&mut self) {
            self.done += 1;
        }
    }

    /// Implements nothing, relying on the defaults.
    struct Silent;

    impl Reducer for Silent {}

    type Log = Arc<Mutex<Vec<(&'static str, NaiveDate)>>>;

    /// Suspends around every call and logs what it saw to a log shared with other reducers.
    struct Yielding {
        log: Log,
        day: Option<NaiveDate>,
    }

    impl Yielding {
        async fn record(&self, event: &'static str, date: NaiveDate) {
            tokio::task::yield_now().await;
            self.log.lock().unwrap().push((event, date));
            tokio::task::yield_now().await;
        }
    }

    #[async_trait::async_trait]
    impl Reducer for Yielding {
        async fn new_day(&mut self, intervals: &Intervals, _first: bool) {
            self.day = Some(intervals.date);
            self.record("new_day", intervals.date).await;
        }

        async fn process(&mut self, op: &Operation) {
            self.record("process", op.date().unwrap()).await;
        }

        async fn done(&mut self) {
            self.record("done", self.day.unwrap()).await;
        }
    }

    fn count(recorder: &Recorder, g: Granularity) -> usize {
        recorder.first_days.iter().filter(|(x, _)| *x == g).count()
    }

    fn store(snapshot: Snapshot) -> Store {
        let mut store = Store::new();
        store.init(snapshot);
        store
    }

    #[tokio::test]
    async fn one_month_span() {
        let store = store(snapshot());
        let predicate = Predicate::any().compile(&store).unwrap();
        let mut recorder = Recorder::default();
        let mut silent = Silent;
        let stats = calculate(
            store.operations().unwrap(),
            Span::month_of(date("2024-01-01")),
            &predicate,
            date("2024-06-01"),
            &mut [&mut recorder, &mut silent],
        )
        .await;

        assert_eq!(stats.days, 31);
        assert_eq!(count(&recorder, Granularity::Month), 1);
        assert_eq!(count(&recorder, Granularity::Day), 31);
        assert_eq!(count(&recorder, Granularity::Year), 1);
        // Sundays in January 2024: 7, 14, 21, 28. Mondays: 1, 8, 15, 22, 29.
        assert_eq!(count(&recorder, Granularity::WeekSunday), 4);
        assert_eq!(count(&recorder, Granularity::WeekMonday), 5);
        assert_eq!(recorder.firsts, 1);
        assert_eq!(recorder.done, 1);

        // Every live operation exactly once, tombstone excluded.
        let live = store.live_operations().unwrap().count();
        assert_eq!(stats.processed, live);
        assert_eq!(recorder.processed.len(), live);
        let mut ids: Vec<_> = recorder.processed.iter().map(|(_, id)| id.clone()).collect();
        ids.sort();
        ids.dedup();
        assert_eq!(ids.len(), live);
    }

    #[tokio::test]
    async fn respects_span_and_predicate() {
        let store = store(Snapshot {
            operations: vec![
                expense("before", "2023-12-31", -1),
                expense("in-1", "2024-01-02", -2),
                income("in-income", "2024-01-02", 20),
                transfer("in-transfer", "2024-01-03", 5, "wallet", "bank"),
                expense("in-2", "2024-01-03", -3),
                expense("after", "2024-01-04", -4),
            ],
            ..Snapshot::default()
        });
        let predicate = Predicate::op_type(OpType::Expense)
            .compile(&store)
            .unwrap();
        let mut recorder = Recorder::default();
        let stats = calculate(
            store.operations().unwrap(),
            Span::new(date("2024-01-02"), date("2024-01-03")),
            &predicate,
            date("2024-01-03"),
            &mut [&mut recorder],
        )
        .await;
        assert_eq!(stats.days, 2);
        assert_eq!(
            recorder.processed,
            vec![
                (date("2024-01-02"), "in-1".to_string()),
                (date("2024-01-03"), "in-2".to_string()),
            ]
        );
    }

    #[tokio::test]
    async fn days_settle_before_the_next_one_starts() {
        let store = store(Snapshot {
            operations: vec![
                expense("a", "2024-01-02", -1),
                income("b", "2024-01-02", 5),
                expense("c", "2024-01-04", -2),
            ],
            ..Snapshot::default()
        });
        let predicate = Predicate::any().compile(&store).unwrap();
        let log = Log::default();
        let mut first = Yielding {
            log: log.clone(),
            day: None,
        };
        let mut second = Yielding {
            log: log.clone(),
            day: None,
        };
        let stats = calculate(
            store.operations().unwrap(),
            Span::new(date("2024-01-01"), date("2024-01-05")),
            &predicate,
            date("2024-06-01"),
            &mut [&mut first, &mut second],
        )
        .await;
        assert_eq!(stats, RunStats { days: 5, processed: 3 });

        let log = log.lock().unwrap().clone();
        let count = |event| log.iter().filter(|(e, _)| *e == event).count();
        assert_eq!(count("new_day"), 10);
        assert_eq!(count("process"), 6);
        assert_eq!(count("done"), 2);

        for (i, (event, day)) in log.iter().enumerate() {
            let earlier = &log[..i];
            match *event {
                "new_day" => assert!(
                    earlier.iter().all(|(e, d)| d < day || (d == day && *e == "new_day")),
                    "new_day {day} started before the previous day settled: {log:?}"
                ),
                "process" => assert!(
                    earlier.iter().all(|(e, d)| d <= day && *e != "done")
                        && log[i..].iter().all(|(e, d)| !(*e == "new_day" && d <= day)),
                    "process {day} ran outside its day: {log:?}"
                ),
                _ => assert!(
                    log[i..].iter().all(|(e, _)| *e == "done"),
                    "done ran before the walk finished: {log:?}"
                ),
            }
        }
    }

    #[tokio::test]
    async fn first_day_is_flagged_even_mid_interval() {
        let store = store(Snapshot::default());
        let predicate = Predicate::any().compile(&store).unwrap();
        let mut recorder = Recorder::default();
        calculate(
            store.operations().unwrap(),
            Span::new(date("2024-02-14"), date("2024-02-16")),
            &predicate,
            date("2024-02-15"),
            &mut [&mut recorder],
        )
        .await;
        assert_eq!(recorder.firsts, 1);
        assert_eq!(count(&recorder, Granularity::Month), 0);
        assert_eq!(recorder.done, 1);
    }

    #[tokio::test]
    async fn empty_span_still_finishes() {
        let store = store(snapshot());
        let predicate = Predicate::any().compile(&store).unwrap();
        let mut recorder = Recorder::default();
        let stats = calculate(
            store.operations().unwrap(),
            Span::new(date("2024-02-01"), date("2024-01-01")),
            &predicate,
            date("2024-02-15"),
            &mut [&mut recorder],
        )
        .await;
        assert_eq!(stats, RunStats::default());
        assert_eq!(recorder.done, 1);
    }
}

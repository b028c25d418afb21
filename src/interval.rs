//! Calendar spans and the interval descriptors the walker hands to reducers for every day.

use chrono::{Datelike, Days, NaiveDate, Weekday};
use serde::{Deserialize, Serialize};
use std::iter::FusedIterator;

/// An inclusive range of calendar days.
#[derive(Debug, Clone, Copy, Eq, PartialEq, Hash, Serialize, Deserialize)]
pub struct Span {
    pub start: NaiveDate,
    pub end: NaiveDate,
}

impl Span {
    /// A span from `start` to `end`, both inclusive. A span whose end precedes its start is empty.
    pub fn new(start: NaiveDate, end: NaiveDate) -> Self {
        Self { start, end }
    }

    /// The calendar month containing `date`.
    pub fn month_of(date: NaiveDate) -> Self {
        Self::new(month_start(date), month_end(date))
    }

    pub fn contains(&self, date: NaiveDate) -> bool {
        self.start <= date && date <= self.end
    }

    /// The number of days in the span.
    pub fn len(&self) -> usize {
        if self.end < self.start {
            0
        } else {
            // Inclusive of both ends.
            (self.end - self.start).num_days() as usize + 1
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Iterates every day of the span in order. Each call starts over from `start`.
    pub fn dates(&self) -> Dates {
        Dates {
            next: Some(self.start).filter(|_| !self.is_empty()),
            end: self.end,
        }
    }
}

/// The days of a `Span`, produced on demand.
#[derive(Debug, Clone)]
pub struct Dates {
    next: Option<NaiveDate>,
    end: NaiveDate,
}

impl Iterator for Dates {
    type Item = NaiveDate;

    fn next(&mut self) -> Option<Self::Item> {
        let current = self.next?;
        self.next = current.succ_opt().filter(|d| *d <= self.end);
        Some(current)
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        let n = self.next.map(|d| Span::new(d, self.end).len()).unwrap_or(0);
        (n, Some(n))
    }
}

impl ExactSizeIterator for Dates {}
impl FusedIterator for Dates {}

/// The calendar granularities a day belongs to.
#[derive(Debug, Clone, Copy, Eq, PartialEq, Ord, PartialOrd, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Granularity {
    Day,
    WeekSunday,
    WeekMonday,
    Month,
    Year,
}

serde_plain::derive_display_from_serialize!(Granularity);
serde_plain::derive_fromstr_from_deserialize!(Granularity);

impl Granularity {
    pub const ALL: [Granularity; 5] = [
        Granularity::Day,
        Granularity::WeekSunday,
        Granularity::WeekMonday,
        Granularity::Month,
        Granularity::Year,
    ];

    /// Position in `ALL`.
    pub fn index(self) -> usize {
        self as usize
    }
}

/// Where an interval lies relative to today.
#[derive(Debug, Clone, Copy, Eq, PartialEq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Timing {
    Past,
    Now,
    Future,
}

/// One interval a day belongs to.
#[derive(Debug, Clone, Copy, Eq, PartialEq, Serialize, Deserialize)]
pub struct IntervalInfo {
    pub start: NaiveDate,
    pub end: NaiveDate,
    /// Whether the day being described is the first day of this interval.
    pub is_first_day: bool,
    pub timing: Timing,
}

impl IntervalInfo {
    fn new(date: NaiveDate, start: NaiveDate, end: NaiveDate, today: NaiveDate) -> Self {
        let timing = if end < today {
            Timing::Past
        } else if start <= today {
            Timing::Now
        } else {
            Timing::Future
        };
        Self {
            start,
            end,
            is_first_day: date == start,
            timing,
        }
    }

    pub fn is_past(&self) -> bool {
        self.timing == Timing::Past
    }

    pub fn is_now(&self) -> bool {
        self.timing == Timing::Now
    }

    pub fn is_future(&self) -> bool {
        self.timing == Timing::Future
    }
}

/// Every interval that a single day belongs to.
#[derive(Debug, Clone, Copy, Eq, PartialEq, Serialize, Deserialize)]
pub struct Intervals {
    pub date: NaiveDate,
    pub day: IntervalInfo,
    pub week_sunday: IntervalInfo,
    pub week_monday: IntervalInfo,
    pub month: IntervalInfo,
    pub year: IntervalInfo,
}

impl Intervals {
    pub fn new(date: NaiveDate, today: NaiveDate) -> Self {
        let week_sunday = date.week(Weekday::Sun);
        let week_monday = date.week(Weekday::Mon);
        Self {
            date,
            day: IntervalInfo::new(date, date, date, today),
            week_sunday: IntervalInfo::new(
                date,
                week_sunday.first_day(),
                week_sunday.last_day(),
                today,
            ),
            week_monday: IntervalInfo::new(
                date,
                week_monday.first_day(),
                week_monday.last_day(),
                today,
            ),
            month: IntervalInfo::new(date, month_start(date), month_end(date), today),
            year: IntervalInfo::new(date, year_start(date), year_end(date), today),
        }
    }

    pub fn get(&self, granularity: Granularity) -> &IntervalInfo {
        match granularity {
            Granularity::Day => &self.day,
            Granularity::WeekSunday => &self.week_sunday,
            Granularity::WeekMonday => &self.week_monday,
            Granularity::Month => &self.month,
            Granularity::Year => &self.year,
        }
    }
}

pub fn month_start(date: NaiveDate) -> NaiveDate {
    date - Days::new(u64::from(date.day0()))
}

pub fn month_end(date: NaiveDate) -> NaiveDate {
    let start = month_start(date);
    let next = if start.month() == 12 {
        NaiveDate::from_ymd_opt(start.year() + 1, 1, 1)
    } else {
        NaiveDate::from_ymd_opt(start.year(), start.month() + 1, 1)
    };
    next.and_then(|d| d.pred_opt()).unwrap_or(NaiveDate::MAX)
}

pub fn days_in_month(year: i32, month: u32) -> u32 {
    NaiveDate::from_ymd_opt(year, month, 1)
        .map(|d| month_end(d).day())
        .unwrap_or(31)
}

/// The last day of the month before the one containing `date`.
pub fn previous_month_end(date: NaiveDate) -> Option<NaiveDate> {
    month_start(date).pred_opt()
}

fn year_start(date: NaiveDate) -> NaiveDate {
    date - Days::new(u64::from(date.ordinal0()))
}

fn year_end(date: NaiveDate) -> NaiveDate {
    NaiveDate::from_ymd_opt(date.year(), 12, 31).unwrap_or(NaiveDate::MAX)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test::date;

    #[test]
    fn dates_are_inclusive_and_restartable() {
        let span = Span::new(date("2024-02-27"), date("2024-03-01"));
        let days: Vec<_> = span.dates().map(|d| d.to_string()).collect();
        assert_eq!(
            days,
            vec!["2024-02-27", "2024-02-28", "2024-02-29", "2024-03-01"]
        );
        assert_eq!(span.dates().len(), 4);
        assert_eq!(span.dates().count(), span.len());
        assert_eq!(span.dates().next(), Some(date("2024-02-27")));
    }

    #[test]
    fn inverted_span_is_empty() {
        let span = Span::new(date("2024-03-01"), date("2024-02-01"));
        assert!(span.is_empty());
        assert_eq!(span.dates().next(), None);
    }

    #[test]
    fn month_helpers() {
        assert_eq!(month_start(date("2024-02-17")), date("2024-02-01"));
        assert_eq!(month_end(date("2024-02-17")), date("2024-02-29"));
        assert_eq!(month_end(date("2023-12-05")), date("2023-12-31"));
        assert_eq!(days_in_month(2023, 2), 28);
        assert_eq!(days_in_month(2024, 4), 30);
        assert_eq!(
            previous_month_end(date("2024-01-15")),
            Some(date("2023-12-31"))
        );
        let span = Span::month_of(date("2024-04-10"));
        assert_eq!(span.len(), 30);
    }

    #[test]
    fn week_conventions_differ() {
        // 2024-01-07 is a Sunday.
        let sunday = Intervals::new(date("2024-01-07"), date("2024-06-01"));
        assert!(sunday.week_sunday.is_first_day);
        assert!(!sunday.week_monday.is_first_day);
        assert_eq!(sunday.week_monday.start, date("2024-01-01"));
        assert_eq!(sunday.week_monday.end, date("2024-01-07"));

        let monday = Intervals::new(date("2024-01-08"), date("2024-06-01"));
        assert!(monday.week_monday.is_first_day);
        assert!(!monday.week_sunday.is_first_day);
        assert_eq!(monday.week_sunday.start, date("2024-01-07"));
    }

    #[test]
    fn first_days_of_month_and_year() {
        let i = Intervals::new(date("2024-01-01"), date("2024-06-01"));
        assert!(i.day.is_first_day);
        assert!(i.month.is_first_day);
        assert!(i.year.is_first_day);
        assert_eq!(i.year.end, date("2024-12-31"));

        let j = Intervals::new(date("2024-03-02"), date("2024-06-01"));
        assert!(j.day.is_first_day);
        assert!(!j.month.is_first_day);
        assert!(!j.year.is_first_day);
        assert_eq!(j.get(Granularity::Month).start, date("2024-03-01"));
    }

    #[test]
    fn timing_is_relative_to_today() {
        let today = date("2024-05-15");
        let i = Intervals::new(date("2024-05-02"), today);
        assert!(i.day.is_past());
        assert!(i.month.is_now());
        assert!(i.year.is_now());
        assert!(i.week_monday.is_past());

        let t = Intervals::new(today, today);
        assert!(t.day.is_now());
        assert!(t.week_sunday.is_now());

        let f = Intervals::new(date("2024-06-01"), today);
        assert!(f.day.is_future());
        assert!(f.month.is_future());
        assert!(f.year.is_now());
    }

    #[test]
    fn granularity_names() {
        assert_eq!(Granularity::WeekSunday.to_string(), "week-sunday");
        assert_eq!("month".parse::<Granularity>().unwrap(), Granularity::Month);
    }
}

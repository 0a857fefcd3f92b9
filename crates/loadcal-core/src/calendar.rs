//! Calendar-day arithmetic.
//!
//! Every date in the system is a UTC calendar day with no time component.
//! Ranges are inclusive of both endpoints and are walked by calendar-day
//! stepping, so month lengths, leap days and DST never come into play.

use chrono::{Months, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

use crate::{Error, Result};

/// Wire format for dates in requests, paths and storage.
pub const DATE_FORMAT: &str = "%Y-%m-%d";

/// The current UTC calendar day.
pub fn today_utc() -> NaiveDate { Utc::now().date_naive() }

/// Parse a `YYYY-MM-DD` string, reporting a validation failure otherwise.
pub fn parse_date(s: &str) -> Result<NaiveDate> {
  NaiveDate::parse_from_str(s.trim(), DATE_FORMAT)
    .map_err(|_| Error::InvalidDate(s.to_owned()))
}

// ─── DateRange ───────────────────────────────────────────────────────────────

/// An inclusive span of calendar days, `start..=end`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct DateRange {
  start: NaiveDate,
  end:   NaiveDate,
}

impl DateRange {
  /// Build a range; fails if `end` precedes `start`.
  pub fn new(start: NaiveDate, end: NaiveDate) -> Result<Self> {
    if end < start {
      return Err(Error::Validation(format!(
        "date range end {end} is before start {start}"
      )));
    }
    Ok(Self { start, end })
  }

  /// A range covering exactly one day.
  pub fn single(day: NaiveDate) -> Self { Self { start: day, end: day } }

  /// The heatmap window around `today`: one calendar month back through six
  /// calendar months ahead. Month arithmetic clamps to the last valid day
  /// (e.g. 31 March minus one month is 28 or 29 February).
  pub fn heatmap_window(today: NaiveDate) -> Result<Self> {
    let start = today
      .checked_sub_months(Months::new(1))
      .ok_or_else(|| Error::Validation(format!("{today} is out of range")))?;
    let end = today
      .checked_add_months(Months::new(6))
      .ok_or_else(|| Error::Validation(format!("{today} is out of range")))?;
    Self::new(start, end)
  }

  pub fn start(&self) -> NaiveDate { self.start }

  pub fn end(&self) -> NaiveDate { self.end }

  /// Number of days in the range; never zero.
  pub fn len(&self) -> usize {
    (self.end - self.start).num_days() as usize + 1
  }

  pub fn is_empty(&self) -> bool { false }

  pub fn contains(&self, date: NaiveDate) -> bool {
    self.start <= date && date <= self.end
  }

  /// Zero-based position of `date` within the range.
  pub fn offset_of(&self, date: NaiveDate) -> Option<usize> {
    self
      .contains(date)
      .then(|| (date - self.start).num_days() as usize)
  }

  /// Every day in the range, in order.
  pub fn days(&self) -> impl Iterator<Item = NaiveDate> + use<> {
    self.start.iter_days().take(self.len())
  }
}

// ─── DaySeries ───────────────────────────────────────────────────────────────

/// A dense, ordered per-day table over a [`DateRange`], indexed by day offset
/// from the range start.
#[derive(Debug, Clone, PartialEq)]
pub struct DaySeries<T> {
  range:  DateRange,
  values: Vec<T>,
}

impl<T: Clone> DaySeries<T> {
  /// A series with every day set to `value`.
  pub fn filled(range: DateRange, value: T) -> Self {
    Self { range, values: vec![value; range.len()] }
  }

  /// A series starting at `default` with the given `(date, value)` pairs
  /// written over it. Pairs outside the range are ignored.
  pub fn from_sparse<I>(range: DateRange, default: T, entries: I) -> Self
  where
    I: IntoIterator<Item = (NaiveDate, T)>,
  {
    let mut series = Self::filled(range, default);
    for (date, value) in entries {
      series.set(date, value);
    }
    series
  }
}

impl<T> DaySeries<T> {
  pub fn range(&self) -> DateRange { self.range }

  pub fn len(&self) -> usize { self.values.len() }

  pub fn is_empty(&self) -> bool { self.values.is_empty() }

  pub fn get(&self, date: NaiveDate) -> Option<&T> {
    self.range.offset_of(date).map(|i| &self.values[i])
  }

  /// Overwrite the value for `date`; returns `false` if it lies outside the
  /// range.
  pub fn set(&mut self, date: NaiveDate, value: T) -> bool {
    match self.range.offset_of(date) {
      Some(i) => {
        self.values[i] = value;
        true
      }
      None => false,
    }
  }

  pub fn iter(&self) -> impl Iterator<Item = (NaiveDate, &T)> + '_ {
    self.range.days().zip(self.values.iter())
  }

  pub fn values(&self) -> &[T] { &self.values }
}

#[cfg(test)]
mod tests {
  use super::*;

  fn d(s: &str) -> NaiveDate { parse_date(s).unwrap() }

  #[test]
  fn parse_date_accepts_iso_days() {
    assert_eq!(d("2026-01-20"), NaiveDate::from_ymd_opt(2026, 1, 20).unwrap());
  }

  #[test]
  fn parse_date_rejects_garbage() {
    for bad in ["", "2026-13-01", "20-01-2026", "2026-02-30", "tomorrow"] {
      assert!(
        matches!(parse_date(bad), Err(Error::InvalidDate(_))),
        "{bad:?} should be rejected"
      );
    }
  }

  #[test]
  fn range_rejects_reversed_endpoints() {
    assert!(DateRange::new(d("2026-02-02"), d("2026-02-01")).is_err());
  }

  #[test]
  fn range_is_inclusive_and_gapless_across_year_end() {
    let range = DateRange::new(d("2025-12-30"), d("2026-01-02")).unwrap();
    let days: Vec<_> = range.days().collect();
    assert_eq!(days, vec![
      d("2025-12-30"),
      d("2025-12-31"),
      d("2026-01-01"),
      d("2026-01-02"),
    ]);
    assert_eq!(range.len(), 4);
  }

  #[test]
  fn range_covers_leap_day() {
    let range = DateRange::new(d("2028-02-27"), d("2028-03-01")).unwrap();
    assert_eq!(range.len(), 4);
    assert!(range.days().any(|day| day == d("2028-02-29")));
  }

  #[test]
  fn single_day_range() {
    let range = DateRange::single(d("2026-03-08"));
    assert_eq!(range.len(), 1);
    assert_eq!(range.days().collect::<Vec<_>>(), vec![d("2026-03-08")]);
  }

  #[test]
  fn heatmap_window_spans_one_month_back_six_forward() {
    let window = DateRange::heatmap_window(d("2026-01-15")).unwrap();
    assert_eq!(window.start(), d("2025-12-15"));
    assert_eq!(window.end(), d("2026-07-15"));
    assert_eq!(window.len(), 213);
  }

  #[test]
  fn heatmap_window_clamps_month_ends() {
    let window = DateRange::heatmap_window(d("2026-03-31")).unwrap();
    assert_eq!(window.start(), d("2026-02-28"));
    assert_eq!(window.end(), d("2026-09-30"));
  }

  #[test]
  fn offset_of_outside_range_is_none() {
    let range = DateRange::new(d("2026-01-01"), d("2026-01-31")).unwrap();
    assert_eq!(range.offset_of(d("2026-01-01")), Some(0));
    assert_eq!(range.offset_of(d("2026-01-31")), Some(30));
    assert_eq!(range.offset_of(d("2026-02-01")), None);
    assert_eq!(range.offset_of(d("2025-12-31")), None);
  }

  #[test]
  fn series_from_sparse_overlays_and_ignores_strays() {
    let range = DateRange::new(d("2026-01-30"), d("2026-02-02")).unwrap();
    let series = DaySeries::from_sparse(range, 5.0, [
      (d("2026-01-31"), 3.0),
      (d("2026-03-01"), 9.0),
    ]);
    assert_eq!(series.values(), &[5.0, 3.0, 5.0, 5.0]);
    assert_eq!(series.get(d("2026-01-31")), Some(&3.0));
    assert_eq!(series.get(d("2026-03-01")), None);
  }

  #[test]
  fn series_iter_pairs_dates_in_order() {
    let range = DateRange::new(d("2026-02-27"), d("2026-03-01")).unwrap();
    let series = DaySeries::filled(range, 0u8);
    let dates: Vec<_> = series.iter().map(|(day, _)| day).collect();
    assert_eq!(dates, vec![d("2026-02-27"), d("2026-02-28"), d("2026-03-01")]);
  }
}

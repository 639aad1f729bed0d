//! Deterministic weekly analysis over normalized workout records
//!
//! Everything here is a pure function of its inputs: records in, weekly
//! rows out. Nothing is cached between calls.

use chrono::NaiveDate;
use std::collections::{BTreeMap, HashMap};

use crate::models::{
  iso_week, CalendarWeek, CombinedRow, Person, PersonStats, PersonWeek, WeekMetrics,
  WeeklyAggregate, WinTally, Winner, WinnerLookup, WorkoutRecord,
};

/// Minimum weekly minutes to qualify for a win
pub const QUALIFYING_MINUTES: i64 = 90;

/// Minimum weekly workouts to qualify for a win
pub const QUALIFYING_WORKOUTS: i64 = 3;

/// ---------------------------------------------------------------------------
/// Per-Person Aggregation
/// ---------------------------------------------------------------------------

#[derive(Default)]
struct WeekTotals {
  minutes: i64,
  distance: f64,
  workouts: i64,
}

/// Group one person's records by (week, week start).
///
/// Every week the person has any record for gets a row, including weeks
/// that only hold zero-minute placeholders. Output is ascending by week start.
pub fn aggregate_person(records: &[WorkoutRecord], person: Person) -> Vec<WeeklyAggregate> {
  // Keyed (week_start, week) so iteration order is by date
  let mut groups: BTreeMap<(NaiveDate, u32), WeekTotals> = BTreeMap::new();

  for record in records.iter().filter(|r| r.person == person) {
    let totals = groups.entry((record.week_start, record.week)).or_default();
    totals.minutes = totals.minutes.saturating_add(record.minutes);
    totals.distance += record.distance;
    if record.is_workout() {
      totals.workouts += 1;
    }
  }

  groups
    .into_iter()
    .map(|((week_start, week), totals)| WeeklyAggregate {
      week,
      week_start,
      minutes: totals.minutes,
      workouts: totals.workouts,
      distance: totals.distance,
      points: totals.minutes.saturating_mul(totals.workouts),
    })
    .collect()
}

/// ---------------------------------------------------------------------------
/// Week Calendar
/// ---------------------------------------------------------------------------

/// Every 7th day from `first` through `last` inclusive, tagged with its ISO week.
/// Empty when `last` is before `first`.
pub fn week_calendar(first: NaiveDate, last: NaiveDate) -> Vec<CalendarWeek> {
  first
    .iter_weeks()
    .take_while(|d| *d <= last)
    .map(|week_start| CalendarWeek {
      week: iso_week(week_start),
      week_start,
    })
    .collect()
}

/// ---------------------------------------------------------------------------
/// Combiner
/// ---------------------------------------------------------------------------

/// Join the calendar with both aggregates and pick each week's winner.
///
/// Exactly one row per calendar week. Weeks missing from an aggregate get a
/// zeroed side.
pub fn combine(
  calendar: &[CalendarWeek],
  person_a: &[WeeklyAggregate],
  person_b: &[WeeklyAggregate],
) -> Vec<CombinedRow> {
  let index = |aggregate: &[WeeklyAggregate]| -> HashMap<(u32, NaiveDate), PersonWeek> {
    aggregate
      .iter()
      .map(|agg| ((agg.week, agg.week_start), PersonWeek::from(agg)))
      .collect()
  };
  let a_by_week = index(person_a);
  let b_by_week = index(person_b);

  let mut rows: Vec<CombinedRow> = calendar
    .iter()
    .map(|cal| {
      let key = (cal.week, cal.week_start);
      let a = a_by_week.get(&key).cloned().unwrap_or_default();
      let b = b_by_week.get(&key).cloned().unwrap_or_default();
      let winner = decide_winner(&a, &b);

      CombinedRow {
        week: cal.week,
        week_start: cal.week_start,
        person_a: a,
        person_b: b,
        winner,
      }
    })
    .collect();

  rows.sort_by_key(|r| r.week_start);
  rows
}

/// Weekly winner rule.
///
/// "None" when both fall short on minutes, or both fall short on workouts.
/// Otherwise the higher minutes × workouts wins.
///
/// Note: the stated house rule is "at least 90 minutes AND 3 workouts" per
/// person, which this does not enforce. A person with 200 minutes over 2
/// workouts can still win if the other person logged 3 workouts. Kept as is
/// to match the existing results history.
pub fn decide_winner(a: &PersonWeek, b: &PersonWeek) -> Winner {
  let minutes_short = a.minutes < QUALIFYING_MINUTES && b.minutes < QUALIFYING_MINUTES;
  let workouts_short = a.workouts < QUALIFYING_WORKOUTS && b.workouts < QUALIFYING_WORKOUTS;

  if minutes_short || workouts_short {
    return Winner::None;
  }

  let a_points = a.minutes * a.workouts;
  let b_points = b.minutes * b.workouts;

  match a_points.cmp(&b_points) {
    std::cmp::Ordering::Greater => Winner::A,
    std::cmp::Ordering::Less => Winner::B,
    std::cmp::Ordering::Equal => Winner::Tie,
  }
}

/// ---------------------------------------------------------------------------
/// Lookups
/// ---------------------------------------------------------------------------

/// Metrics for the week starting `week_start`; all zero when there is no row
pub fn weekly_metrics(aggregate: &[WeeklyAggregate], week_start: NaiveDate) -> WeekMetrics {
  aggregate
    .iter()
    .filter(|agg| agg.week_start == week_start)
    .fold(WeekMetrics::default(), |acc, agg| WeekMetrics {
      minutes: acc.minutes.saturating_add(agg.minutes),
      workouts: acc.workouts + agg.workouts,
      points: acc.points.saturating_add(agg.points),
    })
}

pub fn winner_for_week(combined: &[CombinedRow], week_start: NaiveDate) -> WinnerLookup {
  combined
    .iter()
    .find(|row| row.week_start == week_start)
    .map(|row| WinnerLookup::Decided(row.winner))
    .unwrap_or(WinnerLookup::NoData)
}

/// ---------------------------------------------------------------------------
/// Summary Statistics
/// ---------------------------------------------------------------------------

pub fn person_stats(aggregate: &[WeeklyAggregate]) -> PersonStats {
  if aggregate.is_empty() {
    return PersonStats::default();
  }

  let minutes: Vec<f64> = aggregate.iter().map(|a| a.minutes as f64).collect();
  let workouts: Vec<f64> = aggregate.iter().map(|a| a.workouts as f64).collect();
  let points: Vec<f64> = aggregate.iter().map(|a| a.points as f64).collect();

  PersonStats {
    avg_minutes: round1(mean(&minutes)),
    median_minutes: median(&minutes),
    avg_workouts: round1(mean(&workouts)),
    median_workouts: median(&workouts),
    avg_points: round1(mean(&points)),
    total_minutes: aggregate.iter().map(|a| a.minutes).sum(),
  }
}

pub fn win_tally(combined: &[CombinedRow]) -> WinTally {
  let mut tally = WinTally::default();
  for row in combined {
    tally.record(row.winner);
  }
  tally
}

fn mean(values: &[f64]) -> f64 {
  if values.is_empty() {
    return 0.0;
  }
  values.iter().sum::<f64>() / values.len() as f64
}

fn median(values: &[f64]) -> f64 {
  if values.is_empty() {
    return 0.0;
  }
  let mut sorted = values.to_vec();
  sorted.sort_by(f64::total_cmp);
  let mid = sorted.len() / 2;
  if sorted.len() % 2 == 0 {
    (sorted[mid - 1] + sorted[mid]) / 2.0
  } else {
    sorted[mid]
  }
}

fn round1(value: f64) -> f64 {
  (value * 10.0).round() / 10.0
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::test_utils::{date, mock_record};

  fn side(minutes: i64, workouts: i64) -> PersonWeek {
    PersonWeek {
      minutes,
      workouts,
      distance: 0.0,
      points: minutes * workouts,
    }
  }

  fn aggregate(week_start: &str, minutes: i64, workouts: i64) -> WeeklyAggregate {
    let week_start = date(week_start);
    WeeklyAggregate {
      week: iso_week(week_start),
      week_start,
      minutes,
      workouts,
      distance: 0.0,
      points: minutes * workouts,
    }
  }

  /// ---------------------------------------------------------------------------
  /// Aggregation
  /// ---------------------------------------------------------------------------

  #[test]
  fn test_zero_minute_records_are_not_workouts() {
    let records = vec![
      mock_record("2022-05-02", Person::A, 0, 0.0),
      mock_record("2022-05-03", Person::A, 30, 2.0),
      mock_record("2022-05-05", Person::A, 45, 1.5),
    ];

    let weekly = aggregate_person(&records, Person::A);

    assert_eq!(weekly.len(), 1);
    assert_eq!(weekly[0].minutes, 75);
    assert_eq!(weekly[0].workouts, 2);
    assert_eq!(weekly[0].distance, 3.5);
    assert_eq!(weekly[0].points, 150);
  }

  #[test]
  fn test_placeholder_only_week_materializes() {
    let records = vec![mock_record("2022-05-10", Person::B, 0, 0.0)];

    let weekly = aggregate_person(&records, Person::B);

    assert_eq!(weekly.len(), 1);
    assert_eq!(weekly[0].week_start, date("2022-05-09"));
    assert_eq!(weekly[0].workouts, 0);
    assert_eq!(weekly[0].points, 0);
  }

  #[test]
  fn test_aggregate_filters_person_and_orders_weeks() {
    let records = vec![
      mock_record("2022-05-16", Person::A, 20, 0.0),
      mock_record("2022-05-02", Person::A, 40, 0.0),
      mock_record("2022-05-03", Person::B, 90, 0.0),
    ];

    let weekly = aggregate_person(&records, Person::A);

    let starts: Vec<_> = weekly.iter().map(|w| w.week_start).collect();
    assert_eq!(starts, vec![date("2022-05-02"), date("2022-05-16")]);
    assert_eq!(weekly.iter().map(|w| w.minutes).sum::<i64>(), 60);
  }

  /// ---------------------------------------------------------------------------
  /// Calendar
  /// ---------------------------------------------------------------------------

  #[test]
  fn test_aggregate_saturates_instead_of_overflowing() {
    let records = vec![
      mock_record("2022-05-02", Person::A, i64::MAX - 1, 0.0),
      mock_record("2022-05-03", Person::A, 10, 0.0),
    ];

    let weekly = aggregate_person(&records, Person::A);

    assert_eq!(weekly[0].minutes, i64::MAX);
    assert_eq!(weekly[0].points, i64::MAX);
  }

  #[test]
  fn test_week_calendar_steps_by_seven_days() {
    let calendar = week_calendar(date("2022-05-02"), date("2022-05-16"));

    assert_eq!(
      calendar,
      vec![
        CalendarWeek { week: 18, week_start: date("2022-05-02") },
        CalendarWeek { week: 19, week_start: date("2022-05-09") },
        CalendarWeek { week: 20, week_start: date("2022-05-16") },
      ]
    );
  }

  #[test]
  fn test_week_calendar_single_and_empty() {
    assert_eq!(week_calendar(date("2022-05-02"), date("2022-05-02")).len(), 1);
    assert!(week_calendar(date("2022-05-09"), date("2022-05-02")).is_empty());
  }

  #[test]
  fn test_week_calendar_crosses_year_boundary() {
    let calendar = week_calendar(date("2021-12-20"), date("2022-01-10"));
    let weeks: Vec<_> = calendar.iter().map(|c| c.week).collect();
    assert_eq!(weeks, vec![51, 52, 1, 2]);
  }

  /// ---------------------------------------------------------------------------
  /// Winner
  /// ---------------------------------------------------------------------------

  #[test]
  fn test_winner_rule() {
    assert_eq!(decide_winner(&side(0, 0), &side(0, 0)), Winner::None);
    assert_eq!(decide_winner(&side(90, 3), &side(0, 0)), Winner::A);
    assert_eq!(decide_winner(&side(0, 0), &side(90, 3)), Winner::B);
    assert_eq!(decide_winner(&side(90, 3), &side(90, 3)), Winner::Tie);
    // Minutes short for both even though A has enough workouts
    assert_eq!(decide_winner(&side(89, 5), &side(0, 0)), Winner::None);
  }

  #[test]
  fn test_winner_qualification_is_per_axis() {
    // A alone clears minutes, B alone clears workouts: neither axis fails for both
    assert_eq!(decide_winner(&side(200, 2), &side(30, 3)), Winner::A);
    // Both clear minutes but neither has 3 workouts
    assert_eq!(decide_winner(&side(200, 2), &side(150, 2)), Winner::None);
  }

  /// ---------------------------------------------------------------------------
  /// Combiner
  /// ---------------------------------------------------------------------------

  #[test]
  fn test_combine_one_row_per_calendar_week() {
    let calendar = week_calendar(date("2022-05-02"), date("2022-05-23"));
    let a = vec![aggregate("2022-05-02", 120, 4), aggregate("2022-05-16", 30, 1)];
    let b = vec![aggregate("2022-05-02", 100, 3)];

    let combined = combine(&calendar, &a, &b);

    assert_eq!(combined.len(), 4);
    assert_eq!(combined[0].winner, Winner::A);
    assert_eq!(combined[0].person_b.points, 300);

    // Nobody logged in week 19
    assert_eq!(combined[1].person_a, PersonWeek::default());
    assert_eq!(combined[1].person_b, PersonWeek::default());
    assert_eq!(combined[1].winner, Winner::None);

    assert_eq!(combined[2].person_a.minutes, 30);
    assert_eq!(combined[2].person_b.minutes, 0);
    assert_eq!(combined[3].winner, Winner::None);
  }

  #[test]
  fn test_combine_ignores_weeks_outside_calendar() {
    let calendar = week_calendar(date("2022-05-09"), date("2022-05-09"));
    let a = vec![aggregate("2022-05-02", 120, 4), aggregate("2022-05-09", 100, 3)];

    let combined = combine(&calendar, &a, &[]);

    assert_eq!(combined.len(), 1);
    assert_eq!(combined[0].person_a.minutes, 100);
  }

  #[test]
  fn test_combine_is_idempotent() {
    let records = vec![
      mock_record("2022-05-02", Person::A, 50, 0.0),
      mock_record("2022-05-03", Person::A, 50, 0.0),
      mock_record("2022-05-04", Person::B, 95, 0.0),
    ];
    let calendar = week_calendar(date("2022-05-02"), date("2022-05-09"));
    let a = aggregate_person(&records, Person::A);
    let b = aggregate_person(&records, Person::B);

    assert_eq!(combine(&calendar, &a, &b), combine(&calendar, &a, &b));
  }

  /// ---------------------------------------------------------------------------
  /// Lookups and Stats
  /// ---------------------------------------------------------------------------

  #[test]
  fn test_weekly_metrics_hit_and_miss() {
    let weekly = vec![aggregate("2022-05-02", 75, 2)];

    assert_eq!(
      weekly_metrics(&weekly, date("2022-05-02")),
      WeekMetrics { minutes: 75, workouts: 2, points: 150 }
    );
    assert_eq!(weekly_metrics(&weekly, date("2022-05-30")), WeekMetrics::default());
    assert_eq!(weekly_metrics(&[], date("2022-05-02")), WeekMetrics::default());
  }

  #[test]
  fn test_winner_for_missing_week_is_no_data() {
    let calendar = week_calendar(date("2022-05-02"), date("2022-05-02"));
    let combined = combine(&calendar, &[], &[]);

    assert_eq!(winner_for_week(&combined, date("2022-05-02")), WinnerLookup::Decided(Winner::None));
    assert_eq!(winner_for_week(&combined, date("2022-04-25")), WinnerLookup::NoData);
    assert_eq!(winner_for_week(&[], date("2022-04-25")), WinnerLookup::NoData);
  }

  #[test]
  fn test_person_stats() {
    let weekly = vec![
      aggregate("2022-05-02", 100, 3),
      aggregate("2022-05-09", 50, 1),
      aggregate("2022-05-16", 0, 0),
      aggregate("2022-05-23", 95, 4),
    ];

    let stats = person_stats(&weekly);

    assert_eq!(stats.avg_minutes, 61.3);
    assert_eq!(stats.median_minutes, 72.5);
    assert_eq!(stats.avg_workouts, 2.0);
    assert_eq!(stats.median_workouts, 2.0);
    // (300 + 50 + 0 + 380) / 4
    assert_eq!(stats.avg_points, 182.5);
    assert_eq!(stats.total_minutes, 245);
  }

  #[test]
  fn test_person_stats_empty() {
    assert_eq!(person_stats(&[]), PersonStats::default());
  }

  #[test]
  fn test_win_tally() {
    let calendar = week_calendar(date("2022-05-02"), date("2022-05-16"));
    let a = vec![aggregate("2022-05-02", 120, 4), aggregate("2022-05-09", 100, 3)];
    let b = vec![aggregate("2022-05-09", 100, 3)];

    let tally = win_tally(&combine(&calendar, &a, &b));

    assert_eq!(tally, WinTally { none: 1, a: 1, b: 0, tie: 1 });
    assert_eq!(tally.total(), 3);
  }
}

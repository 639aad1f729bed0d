//! Everything the dashboard page shows, computed in one pass from records

use chrono::{Duration, NaiveDate};
use serde::Serialize;

use crate::analysis::{
  aggregate_person, combine, person_stats, week_calendar, weekly_metrics, win_tally,
  winner_for_week,
};
use crate::models::{
  week_start_of, CombinedRow, Person, PersonStats, Roster, WeekMetrics, WeeklyAggregate, WinTally,
  WinnerLookup, WorkoutRecord,
};
use crate::normalize::RowError;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PersonSummary {
  pub name: String,
  pub weekly: Vec<WeeklyAggregate>,
  pub this_week: WeekMetrics,
  pub last_week: WeekMetrics,
  pub stats: PersonStats,
}

impl PersonSummary {
  fn build(
    records: &[WorkoutRecord],
    person: Person,
    roster: &Roster,
    this_week: Option<NaiveDate>,
    last_week: Option<NaiveDate>,
  ) -> Self {
    let weekly = aggregate_person(records, person);
    let metrics_for = |week: Option<NaiveDate>| {
      week
        .map(|w| weekly_metrics(&weekly, w))
        .unwrap_or_default()
    };

    Self {
      name: roster.name(person).to_string(),
      this_week: metrics_for(this_week),
      last_week: metrics_for(last_week),
      stats: person_stats(&weekly),
      weekly,
    }
  }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Dashboard {
  pub today: NaiveDate,
  /// Latest week on the calendar; None before anything is logged
  pub this_week: Option<NaiveDate>,
  pub last_week: Option<NaiveDate>,
  pub last_week_winner: WinnerLookup,
  pub person_a: PersonSummary,
  pub person_b: PersonSummary,
  pub combined: Vec<CombinedRow>,
  pub wins: WinTally,
  #[serde(skip_serializing_if = "Vec::is_empty")]
  pub skipped_rows: Vec<RowError>,
}

impl Dashboard {
  /// The calendar runs from the first logged week through the current week
  /// (or the latest logged week, if that is later).
  pub fn build(records: &[WorkoutRecord], roster: &Roster, today: NaiveDate) -> Self {
    let first = records.iter().map(|r| r.week_start).min();
    let latest = records.iter().map(|r| r.week_start).max();

    let calendar = match (first, latest) {
      (Some(first), Some(latest)) => week_calendar(first, latest.max(week_start_of(today))),
      _ => vec![],
    };

    let this_week = calendar.last().map(|c| c.week_start);
    let last_week = this_week.map(|w| w - Duration::days(7));

    let person_a = PersonSummary::build(records, Person::A, roster, this_week, last_week);
    let person_b = PersonSummary::build(records, Person::B, roster, this_week, last_week);

    let combined = combine(&calendar, &person_a.weekly, &person_b.weekly);
    let last_week_winner = last_week
      .map(|w| winner_for_week(&combined, w))
      .unwrap_or(WinnerLookup::NoData);
    let wins = win_tally(&combined);

    tracing::debug!(
      weeks = combined.len(),
      records = records.len(),
      "Built dashboard"
    );

    Self {
      today,
      this_week,
      last_week,
      last_week_winner,
      person_a,
      person_b,
      combined,
      wins,
      skipped_rows: vec![],
    }
  }

  pub fn with_skipped_rows(mut self, errors: Vec<RowError>) -> Self {
    self.skipped_rows = errors;
    self
  }

  pub fn person(&self, person: Person) -> &PersonSummary {
    match person {
      Person::A => &self.person_a,
      Person::B => &self.person_b,
    }
  }
}

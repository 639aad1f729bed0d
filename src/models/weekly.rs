use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use super::workout::Person;

/// One person's totals for a single week. Derived on every read, never stored.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WeeklyAggregate {
  pub week: u32,
  pub week_start: NaiveDate,
  pub minutes: i64,
  /// Records with minutes > 0
  pub workouts: i64,
  pub distance: f64,
  /// minutes * workouts
  pub points: i64,
}

/// An entry of the week calendar
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct CalendarWeek {
  pub week: u32,
  pub week_start: NaiveDate,
}

/// One side of a combined row. Zeroed when the person has nothing that week.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PersonWeek {
  pub minutes: i64,
  pub workouts: i64,
  pub distance: f64,
  pub points: i64,
}

impl From<&WeeklyAggregate> for PersonWeek {
  fn from(agg: &WeeklyAggregate) -> Self {
    Self {
      minutes: agg.minutes,
      workouts: agg.workouts,
      distance: agg.distance,
      points: agg.points,
    }
  }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Winner {
  /// Nobody qualified
  None,
  A,
  B,
  Tie,
}

impl Winner {
  pub fn as_str(&self) -> &'static str {
    match self {
      Winner::None => "None",
      Winner::A => "A",
      Winner::B => "B",
      Winner::Tie => "Tie",
    }
  }
}

/// A calendar week joined with both people's aggregates
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CombinedRow {
  pub week: u32,
  pub week_start: NaiveDate,
  pub person_a: PersonWeek,
  pub person_b: PersonWeek,
  pub winner: Winner,
}

impl CombinedRow {
  pub fn side(&self, person: Person) -> &PersonWeek {
    match person {
      Person::A => &self.person_a,
      Person::B => &self.person_b,
    }
  }
}

/// Minutes / workouts / points for a single week
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct WeekMetrics {
  pub minutes: i64,
  pub workouts: i64,
  pub points: i64,
}

/// Result of asking who won a given week
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "status", content = "winner")]
pub enum WinnerLookup {
  Decided(Winner),
  /// The week is not on the calendar (e.g. nothing logged yet)
  NoData,
}

/// Averages and medians over a person's weekly aggregates
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PersonStats {
  pub avg_minutes: f64,
  pub median_minutes: f64,
  pub avg_workouts: f64,
  pub median_workouts: f64,
  pub avg_points: f64,
  pub total_minutes: i64,
}

/// Number of weeks per winner label
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct WinTally {
  pub none: usize,
  pub a: usize,
  pub b: usize,
  pub tie: usize,
}

impl WinTally {
  pub fn record(&mut self, winner: Winner) {
    match winner {
      Winner::None => self.none += 1,
      Winner::A => self.a += 1,
      Winner::B => self.b += 1,
      Winner::Tie => self.tie += 1,
    }
  }

  pub fn total(&self) -> usize {
    self.none + self.a + self.b + self.tie
  }
}

use chrono::{Datelike, Duration, NaiveDate};
use serde::{Deserialize, Serialize};

/// One of the two competitors
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Person {
  A,
  B,
}

impl Person {
  pub const ALL: [Person; 2] = [Person::A, Person::B];

  pub fn as_str(&self) -> &'static str {
    match self {
      Person::A => "A",
      Person::B => "B",
    }
  }
}

/// Display names of the two competitors, as written in the sheet's `Name` column
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Roster {
  pub a: String,
  pub b: String,
}

impl Default for Roster {
  fn default() -> Self {
    Self {
      a: "Lauren".to_string(),
      b: "Tara".to_string(),
    }
  }
}

impl Roster {
  pub fn new(a: impl Into<String>, b: impl Into<String>) -> Self {
    Self {
      a: a.into(),
      b: b.into(),
    }
  }

  pub fn name(&self, person: Person) -> &str {
    match person {
      Person::A => &self.a,
      Person::B => &self.b,
    }
  }

  /// Resolve a sheet name to a competitor (trimmed, case-insensitive)
  pub fn person(&self, name: &str) -> Option<Person> {
    let name = name.trim();
    Person::ALL
      .into_iter()
      .find(|p| self.name(*p).trim().eq_ignore_ascii_case(name))
  }
}

/// A single normalized log entry.
///
/// Built once at the normalization boundary; everything downstream works on
/// these instead of raw sheet rows.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WorkoutRecord {
  pub day: NaiveDate,
  /// ISO week number
  pub week: u32,
  /// Monday of the ISO week
  pub week_start: NaiveDate,
  pub person: Person,
  pub activity: String,
  pub minutes: i64,
  pub distance: f64,
}

impl WorkoutRecord {
  /// Build a record for `day`, deriving the week number and week start
  pub fn new(day: NaiveDate, person: Person, activity: &str, minutes: i64, distance: f64) -> Self {
    Self {
      day,
      week: iso_week(day),
      week_start: week_start_of(day),
      person,
      activity: activity.trim().to_lowercase(),
      minutes,
      distance,
    }
  }

  /// Zero-minute rows are placeholders, not workouts
  pub fn is_workout(&self) -> bool {
    self.minutes > 0
  }
}

pub fn iso_week(date: NaiveDate) -> u32 {
  date.iso_week().week()
}

/// Monday of the ISO week containing `date`
pub fn week_start_of(date: NaiveDate) -> NaiveDate {
  date - Duration::days(date.weekday().num_days_from_monday() as i64)
}

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use super::workout::Person;

/// Upper bound of the minutes field on the log form
pub const MAX_MINUTES: i64 = 100;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Activity {
  Bike,
  Climb,
  Elliptical,
  Hike,
  Stretching,
  Yoga,
  Walk,
  Weights,
  Other,
}

impl Activity {
  pub const ALL: [Activity; 9] = [
    Activity::Bike,
    Activity::Climb,
    Activity::Elliptical,
    Activity::Hike,
    Activity::Stretching,
    Activity::Yoga,
    Activity::Walk,
    Activity::Weights,
    Activity::Other,
  ];

  /// Lowercase form stored in the sheet
  pub fn as_str(&self) -> &'static str {
    match self {
      Activity::Bike => "bike",
      Activity::Climb => "climb",
      Activity::Elliptical => "elliptical",
      Activity::Hike => "hike",
      Activity::Stretching => "stretching",
      Activity::Yoga => "yoga",
      Activity::Walk => "walk",
      Activity::Weights => "weights",
      Activity::Other => "other",
    }
  }
}

impl fmt::Display for Activity {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.write_str(self.as_str())
  }
}

impl FromStr for Activity {
  type Err = String;

  fn from_str(s: &str) -> Result<Self, Self::Err> {
    let wanted = s.trim().to_lowercase();
    Activity::ALL
      .into_iter()
      .find(|a| a.as_str() == wanted)
      .ok_or_else(|| {
        let options: Vec<_> = Activity::ALL.iter().map(|a| a.as_str()).collect();
        format!("unknown activity '{}' (expected one of: {})", s, options.join(", "))
      })
  }
}

#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum SubmissionError {
  #[error("Name field is required")]
  NoPerson,

  #[error("Minutes must be more than 0 (got {0})")]
  MinutesTooLow(i64),

  #[error("Minutes must be at most {max} (got {0})", max = MAX_MINUTES)]
  MinutesTooHigh(i64),

  #[error("Distance must be a non-negative number (got {0})")]
  InvalidDistance(f64),
}

impl Serialize for SubmissionError {
  fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
  where
    S: serde::Serializer,
  {
    serializer.serialize_str(&self.to_string())
  }
}

/// A workout entered by one or both people
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Submission {
  pub people: Vec<Person>,
  pub day: NaiveDate,
  pub activity: Activity,
  pub minutes: i64,
  pub distance: f64,
  pub notes: String,
}

impl Submission {
  /// Nothing is written unless this passes
  pub fn validate(&self) -> Result<(), SubmissionError> {
    if self.people.is_empty() {
      return Err(SubmissionError::NoPerson);
    }
    if self.minutes < 1 {
      return Err(SubmissionError::MinutesTooLow(self.minutes));
    }
    if self.minutes > MAX_MINUTES {
      return Err(SubmissionError::MinutesTooHigh(self.minutes));
    }
    if !self.distance.is_finite() || self.distance < 0.0 {
      return Err(SubmissionError::InvalidDistance(self.distance));
    }
    Ok(())
  }

  /// Selected people, in roster order and without repeats
  pub fn unique_people(&self) -> Vec<Person> {
    Person::ALL
      .into_iter()
      .filter(|p| self.people.contains(p))
      .collect()
  }
}

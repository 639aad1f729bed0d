//! Row normalization: raw sheet rows in, typed `WorkoutRecord`s out.
//!
//! Bad rows never abort a read. Each one is skipped and reported as a
//! `RowError` so the dashboard can still render from what parsed.

use chrono::NaiveDate;
use serde::Serialize;
use std::collections::HashSet;

use crate::models::{iso_week, week_start_of, Person, Roster, WorkoutRecord};

pub const DATE_FORMAT: &str = "%Y-%m-%d";

/// Minutes in a day; anything above is a typo in a hand-edited cell
const MAX_ROW_MINUTES: i64 = 24 * 60;

/// ---------------------------------------------------------------------------
/// Errors
/// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, thiserror::Error, Serialize)]
pub enum DataError {
  #[error("expected {expected} fields, found {found}")]
  LengthMismatch { expected: usize, found: usize },

  #[error("missing required column '{0}'")]
  MissingColumn(String),

  #[error("invalid date '{0}'")]
  InvalidDate(String),

  #[error("invalid number '{value}' in column {column}")]
  InvalidNumber { column: String, value: String },

  #[error("negative value '{value}' in column {column}")]
  Negative { column: String, value: String },

  #[error("unknown person '{0}'")]
  UnknownPerson(String),
}

/// A skipped row. `row` is the 1-based sheet row (the header is row 1).
#[derive(Debug, Clone, PartialEq, thiserror::Error, Serialize)]
#[error("{range} row {row}: {kind}")]
pub struct RowError {
  pub range: String,
  pub row: usize,
  pub kind: DataError,
}

/// ---------------------------------------------------------------------------
/// Input / Output
/// ---------------------------------------------------------------------------

/// Rows read from one sheet range, header first
#[derive(Debug, Clone, Default)]
pub struct RawRows {
  pub range: String,
  pub rows: Vec<Vec<String>>,
}

impl RawRows {
  pub fn new(range: impl Into<String>, rows: Vec<Vec<String>>) -> Self {
    Self {
      range: range.into(),
      rows,
    }
  }
}

#[derive(Debug, Clone, Default)]
pub struct Normalized {
  /// Deduplicated, ascending by day
  pub records: Vec<WorkoutRecord>,
  pub errors: Vec<RowError>,
}

/// ---------------------------------------------------------------------------
/// Header Mapping
/// ---------------------------------------------------------------------------

/// Column positions resolved from a header row
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Columns {
  pub day: usize,
  pub week: Option<usize>,
  pub week_start: Option<usize>,
  pub name: usize,
  pub activity: Option<usize>,
  pub minutes: usize,
  pub distance: Option<usize>,
}

impl Columns {
  pub fn from_header(header: &[String]) -> Result<Self, DataError> {
    let find = |wanted: &str| {
      header
        .iter()
        .position(|h| h.trim().eq_ignore_ascii_case(wanted))
    };
    let require = |wanted: &str| find(wanted).ok_or_else(|| DataError::MissingColumn(wanted.to_string()));

    Ok(Self {
      day: require("Day")?,
      week: find("Week"),
      week_start: find("Week Date"),
      name: require("Name")?,
      activity: find("Activity"),
      minutes: require("Minutes")?,
      distance: find("Distance"),
    })
  }
}

/// ---------------------------------------------------------------------------
/// Normalizer
/// ---------------------------------------------------------------------------

pub struct Normalizer<'a> {
  roster: &'a Roster,
}

impl<'a> Normalizer<'a> {
  pub fn new(roster: &'a Roster) -> Self {
    Self { roster }
  }

  /// Parse every source, then dedupe and sort the combined records
  pub fn normalize(&self, sources: &[RawRows]) -> Normalized {
    let mut records = Vec::new();
    let mut errors = Vec::new();

    for source in sources {
      let (mut parsed, mut failed) = self.parse_source(source);
      records.append(&mut parsed);
      errors.append(&mut failed);
    }

    for error in &errors {
      tracing::warn!("Skipping row: {}", error);
    }

    let records = dedupe_and_sort(records);
    tracing::debug!(records = records.len(), skipped = errors.len(), "Normalized sheet rows");

    Normalized { records, errors }
  }

  pub fn parse_source(&self, source: &RawRows) -> (Vec<WorkoutRecord>, Vec<RowError>) {
    let Some((header, body)) = source.rows.split_first() else {
      return (vec![], vec![]);
    };

    let row_error = |row: usize, kind: DataError| RowError {
      range: source.range.clone(),
      row,
      kind,
    };

    let columns = match Columns::from_header(header) {
      Ok(c) => c,
      Err(kind) => return (vec![], vec![row_error(1, kind)]),
    };

    let mut records = Vec::with_capacity(body.len());
    let mut errors = Vec::new();

    for (i, row) in body.iter().enumerate() {
      // Header is sheet row 1
      let sheet_row = i + 2;

      // Sheets drops trailing empty cells, so short rows read as blank-padded
      if row.len() > header.len() {
        errors.push(row_error(
          sheet_row,
          DataError::LengthMismatch {
            expected: header.len(),
            found: row.len(),
          },
        ));
        continue;
      }

      match self.parse_row(row, &columns) {
        Ok(record) => records.push(record),
        Err(kind) => errors.push(row_error(sheet_row, kind)),
      }
    }

    (records, errors)
  }

  fn parse_row(&self, row: &[String], columns: &Columns) -> Result<WorkoutRecord, DataError> {
    let cell = |idx: Option<usize>| idx.and_then(|i| row.get(i)).map(|s| s.trim()).unwrap_or("");

    let day = parse_date(cell(Some(columns.day))).ok_or_else(|| {
      DataError::InvalidDate(cell(Some(columns.day)).to_string())
    })?;

    let name = cell(Some(columns.name));
    let person = self
      .roster
      .person(name)
      .ok_or_else(|| DataError::UnknownPerson(name.to_string()))?;

    let minutes = parse_minutes(cell(Some(columns.minutes)))?;
    let distance = parse_distance(cell(columns.distance))?;

    // Week fields come from the sheet when present, otherwise from the day
    let week = cell(columns.week)
      .parse::<u32>()
      .ok()
      .filter(|w| (1..=53).contains(w))
      .unwrap_or_else(|| iso_week(day));
    let week_start = parse_date(cell(columns.week_start)).unwrap_or_else(|| week_start_of(day));

    Ok(WorkoutRecord {
      day,
      week,
      week_start,
      person,
      activity: cell(columns.activity).to_lowercase(),
      minutes,
      distance,
    })
  }
}

pub fn parse_date(value: &str) -> Option<NaiveDate> {
  NaiveDate::parse_from_str(value.trim(), DATE_FORMAT).ok()
}

fn parse_minutes(value: &str) -> Result<i64, DataError> {
  if value.is_empty() {
    return Ok(0);
  }
  let minutes = value
    .parse::<i64>()
    .ok()
    .filter(|m| *m <= MAX_ROW_MINUTES)
    .ok_or_else(|| DataError::InvalidNumber {
      column: "Minutes".to_string(),
      value: value.to_string(),
    })?;
  if minutes < 0 {
    return Err(DataError::Negative {
      column: "Minutes".to_string(),
      value: value.to_string(),
    });
  }
  Ok(minutes)
}

fn parse_distance(value: &str) -> Result<f64, DataError> {
  if value.is_empty() {
    return Ok(0.0);
  }
  let distance = value
    .parse::<f64>()
    .ok()
    .filter(|d| d.is_finite())
    .ok_or_else(|| DataError::InvalidNumber {
      column: "Distance".to_string(),
      value: value.to_string(),
    })?;
  if distance < 0.0 {
    return Err(DataError::Negative {
      column: "Distance".to_string(),
      value: value.to_string(),
    });
  }
  // Folds -0.0 into 0.0 so both dedupe as the same value
  Ok(distance.abs())
}

/// Drop exact duplicates (first occurrence wins), then stable-sort by day
pub fn dedupe_and_sort(records: Vec<WorkoutRecord>) -> Vec<WorkoutRecord> {
  type Key = (NaiveDate, u32, NaiveDate, Person, String, i64, u64);

  let mut seen: HashSet<Key> = HashSet::with_capacity(records.len());
  let mut unique: Vec<WorkoutRecord> = records
    .into_iter()
    .filter(|r| {
      seen.insert((
        r.day,
        r.week,
        r.week_start,
        r.person,
        r.activity.clone(),
        r.minutes,
        r.distance.to_bits(),
      ))
    })
    .collect();

  unique.sort_by_key(|r| r.day);
  unique
}

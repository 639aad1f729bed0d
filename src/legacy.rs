//! Import of the old wide tracker sheet.
//!
//! That sheet has one row per day and a minutes/activity column pair per
//! person: `Day, <A>, l_activity, <B>, t_activity`. The importer turns it into
//! the long row layout used everywhere else.

use std::collections::HashSet;

use crate::models::{iso_week, week_start_of, Person, Roster};
use crate::normalize::{parse_date, DataError, RowError, DATE_FORMAT};

/// Header written to the historic range
pub const HISTORIC_HEADER: [&str; 7] = ["Day", "Week", "Week Date", "Name", "Activity", "Minutes", "Distance"];

const ACTIVITY_COLUMNS: [(Person, &str); 2] = [(Person::A, "l_activity"), (Person::B, "t_activity")];

#[derive(Debug, Clone, Default)]
pub struct Melted {
  /// Long-format rows, no header, ascending by day
  pub rows: Vec<Vec<String>>,
  pub errors: Vec<RowError>,
}

/// Convert wide rows (header first) into one long row per person per day
pub fn melt_tracker_rows(range: &str, rows: &[Vec<String>], roster: &Roster) -> Melted {
  let Some((header, body)) = rows.split_first() else {
    return Melted::default();
  };

  let row_error = |row: usize, kind: DataError| RowError {
    range: range.to_string(),
    row,
    kind,
  };

  let find = |wanted: &str| header.iter().position(|h| h.trim().eq_ignore_ascii_case(wanted.trim()));

  let Some(day_col) = find("Day") else {
    return Melted {
      rows: vec![],
      errors: vec![row_error(1, DataError::MissingColumn("Day".into()))],
    };
  };

  let mut person_cols = Vec::with_capacity(2);
  for (person, activity_name) in ACTIVITY_COLUMNS {
    let name = roster.name(person);
    match (find(name), find(activity_name)) {
      (Some(minutes), Some(activity)) => person_cols.push((person, minutes, activity)),
      (None, _) => {
        return Melted {
          rows: vec![],
          errors: vec![row_error(1, DataError::MissingColumn(name.to_string()))],
        }
      }
      (_, None) => {
        return Melted {
          rows: vec![],
          errors: vec![row_error(1, DataError::MissingColumn(activity_name.to_string()))],
        }
      }
    }
  }

  let mut parsed = Vec::new();
  let mut errors = Vec::new();

  for (i, row) in body.iter().enumerate() {
    let sheet_row = i + 2;
    let cell = |idx: usize| row.get(idx).map(|s| s.trim()).unwrap_or("");

    let Some(day) = parse_date(cell(day_col)) else {
      errors.push(row_error(sheet_row, DataError::InvalidDate(cell(day_col).to_string())));
      continue;
    };

    for &(person, minutes_col, activity_col) in &person_cols {
      let minutes = match cell(minutes_col) {
        "" => "0",
        m => m,
      };
      parsed.push((
        day,
        vec![
          day.format(DATE_FORMAT).to_string(),
          iso_week(day).to_string(),
          week_start_of(day).format(DATE_FORMAT).to_string(),
          roster.name(person).to_string(),
          cell(activity_col).to_string(),
          minutes.to_string(),
          "0".to_string(),
        ],
      ));
    }
  }

  parsed.sort_by_key(|(day, _)| *day);

  let mut seen = HashSet::new();
  let rows = parsed
    .into_iter()
    .map(|(_, row)| row)
    .filter(|row| seen.insert(row.clone()))
    .collect();

  Melted { rows, errors }
}

use chrono::NaiveDate;
use std::collections::HashSet;

use crate::config::TrackerConfig;
use crate::models::{iso_week, week_start_of, Person, Roster, Submission, SubmissionError};
use crate::normalize::{parse_date, Columns, DATE_FORMAT};
use crate::sheets::SheetsError;
use crate::store::{AppendAck, RowStore};

/// Header of the new-data range
pub const NEW_DATA_HEADER: [&str; 8] = [
  "Day", "Week", "Week Date", "Name", "Activity", "Minutes", "Distance", "Notes",
];

pub const PLACEHOLDER_NOTE: &str = "placeholder for aggregation";

#[derive(Debug, thiserror::Error)]
pub enum LogError {
  #[error(transparent)]
  Invalid(#[from] SubmissionError),

  #[error("Failed to save workout: {0}")]
  Storage(#[from] SheetsError),
}

/// Week starts each person already has rows for in the new-data range
fn recorded_weeks(rows: &[Vec<String>], roster: &Roster) -> HashSet<(Person, NaiveDate)> {
  let Some((header, body)) = rows.split_first() else {
    return HashSet::new();
  };
  let Ok(columns) = Columns::from_header(header) else {
    return HashSet::new();
  };

  body
    .iter()
    .filter_map(|row| {
      let person = roster.person(row.get(columns.name)?)?;
      let week_start = match columns.week_start.and_then(|i| row.get(i)).and_then(|v| parse_date(v)) {
        Some(ws) => ws,
        None => week_start_of(parse_date(row.get(columns.day)?)?),
      };
      Some((person, week_start))
    })
    .collect()
}

fn sheet_row(
  day: NaiveDate,
  name: &str,
  activity: &str,
  minutes: i64,
  distance: f64,
  notes: &str,
) -> Vec<String> {
  vec![
    day.format(DATE_FORMAT).to_string(),
    iso_week(day).to_string(),
    week_start_of(day).format(DATE_FORMAT).to_string(),
    name.to_string(),
    activity.to_string(),
    minutes.to_string(),
    distance.to_string(),
    notes.to_string(),
  ]
}

/// Zero-minute rows for every person (selected or not) who has nothing
/// recorded yet for the submission's week
pub fn placeholder_rows(existing: &[Vec<String>], submission: &Submission, roster: &Roster) -> Vec<Vec<String>> {
  let recorded = recorded_weeks(existing, roster);
  let week_start = week_start_of(submission.day);

  Person::ALL
    .into_iter()
    .filter(|p| !recorded.contains(&(*p, week_start)))
    .map(|p| sheet_row(submission.day, roster.name(p), "", 0, 0.0, PLACEHOLDER_NOTE))
    .collect()
}

/// One row per selected person
pub fn entry_rows(submission: &Submission, roster: &Roster) -> Vec<Vec<String>> {
  submission
    .unique_people()
    .into_iter()
    .map(|p| {
      sheet_row(
        submission.day,
        roster.name(p),
        submission.activity.as_str(),
        submission.minutes,
        submission.distance,
        &submission.notes,
      )
    })
    .collect()
}

/// Validate and append a submission. Nothing is written if validation fails;
/// a failed write is returned, never assumed to have succeeded.
pub async fn log_workout<S>(
  store: &S,
  config: &TrackerConfig,
  submission: &Submission,
) -> Result<AppendAck, LogError>
where
  S: RowStore + ?Sized,
{
  submission.validate()?;

  let existing = store.read_rows(&config.new_data_range).await?;

  let mut rows = Vec::new();
  if existing.is_empty() {
    rows.push(NEW_DATA_HEADER.iter().map(|h| h.to_string()).collect());
  }
  rows.extend(placeholder_rows(&existing, submission, &config.roster));
  rows.extend(entry_rows(submission, &config.roster));

  let ack = store.append_rows(&config.new_data_range, rows).await.map_err(|e| {
    tracing::error!("Failed to append workout rows: {}", e);
    e
  })?;

  tracing::info!(
    day = %submission.day,
    people = submission.people.len(),
    minutes = submission.minutes,
    "Logged workout"
  );
  Ok(ack)
}

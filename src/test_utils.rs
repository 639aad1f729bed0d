//! Test utilities and helpers for unit testing
//!
//! This module provides common test infrastructure including:
//! - Database setup/teardown
//! - Mock data factories
//! - Raw sheet row builders

use crate::commands::log::NEW_DATA_HEADER;
use crate::models::{Activity, Person, Submission, WorkoutRecord};
use crate::normalize::DATE_FORMAT;
use crate::sheets::SheetsTokens;
use chrono::{Duration, NaiveDate, Utc};
use sqlx::SqlitePool;

/// ---------------------------------------------------------------------------
/// Database Test Utilities
/// ---------------------------------------------------------------------------

/// Create an in-memory SQLite database for testing
///
/// Uses max_connections(1) to prevent multiple pool connections from creating
/// isolated in-memory databases, which would cause intermittent test failures
pub async fn setup_test_db() -> SqlitePool {
  let pool = sqlx::sqlite::SqlitePoolOptions::new()
    .max_connections(1)
    .connect("sqlite::memory:")
    .await
    .expect("Failed to create in-memory database");

  sqlx::migrate!("./migrations")
    .run(&pool)
    .await
    .expect("Failed to run migrations");

  pool
}

pub async fn teardown_test_db(pool: SqlitePool) {
  pool.close().await;
}

/// ---------------------------------------------------------------------------
/// Mock Data Factories
/// ---------------------------------------------------------------------------

pub fn date(value: &str) -> NaiveDate {
  NaiveDate::parse_from_str(value, DATE_FORMAT).expect("test date must be YYYY-MM-DD")
}

pub fn mock_record(day: &str, person: Person, minutes: i64, distance: f64) -> WorkoutRecord {
  let activity = if minutes > 0 { "walk" } else { "" };
  WorkoutRecord::new(date(day), person, activity, minutes, distance)
}

pub fn mock_submission(people: Vec<Person>, day: &str, minutes: i64) -> Submission {
  Submission {
    people,
    day: date(day),
    activity: Activity::Hike,
    minutes,
    distance: 2.5,
    notes: "trail loop".to_string(),
  }
}

/// Tokens that expire in `minutes` from now
pub fn mock_tokens(minutes: i64) -> SheetsTokens {
  SheetsTokens {
    access_token: "access-123".to_string(),
    refresh_token: "refresh-456".to_string(),
    expires_at: Utc::now() + Duration::minutes(minutes),
  }
}

/// ---------------------------------------------------------------------------
/// Raw Sheet Rows
/// ---------------------------------------------------------------------------

pub fn row(cells: &[&str]) -> Vec<String> {
  cells.iter().map(|c| c.to_string()).collect()
}

/// Header of the new-data range
pub fn header() -> Vec<String> {
  row(&NEW_DATA_HEADER)
}

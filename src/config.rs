//! Runtime configuration, read from the environment (and `.env` via dotenvy)

use std::env;
use std::path::PathBuf;

use crate::models::Roster;
use crate::sheets::SHEETS_API_BASE;

const DEFAULT_HISTORIC_RANGE: &str = "data!A:G";
const DEFAULT_NEW_DATA_RANGE: &str = "new_data!A:H";
const DEFAULT_LEGACY_RANGE: &str = "tracker!A:E";
const DEFAULT_DB_PATH: &str = "fitness-tracker.db";

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
  #[error("Missing configuration: {0}")]
  MissingConfig(String),

  #[error("Invalid configuration for {key}: {reason}")]
  Invalid { key: String, reason: String },
}

#[derive(Debug, Clone)]
pub struct TrackerConfig {
  pub spreadsheet_id: String,
  /// Rows migrated from the old tracker sheet
  pub historic_range: String,
  /// Rows appended by `log`
  pub new_data_range: String,
  /// Old wide-format sheet, read by `import-legacy`
  pub legacy_range: String,
  pub roster: Roster,
  pub db_path: PathBuf,
  pub sheets_api_base: String,
}

impl TrackerConfig {
  pub fn from_env() -> Result<Self, ConfigError> {
    let spreadsheet_id = env::var("TRACKER_SPREADSHEET_ID")
      .map_err(|_| ConfigError::MissingConfig("TRACKER_SPREADSHEET_ID".into()))?;

    let defaults = Roster::default();
    let roster = Roster::new(
      var_or("TRACKER_PERSON_A", &defaults.a),
      var_or("TRACKER_PERSON_B", &defaults.b),
    );
    if roster.a.trim().eq_ignore_ascii_case(roster.b.trim()) {
      return Err(ConfigError::Invalid {
        key: "TRACKER_PERSON_B".into(),
        reason: format!("both people are named '{}'", roster.a),
      });
    }

    Ok(Self {
      spreadsheet_id,
      historic_range: var_or("TRACKER_HISTORIC_RANGE", DEFAULT_HISTORIC_RANGE),
      new_data_range: var_or("TRACKER_NEW_DATA_RANGE", DEFAULT_NEW_DATA_RANGE),
      legacy_range: var_or("TRACKER_LEGACY_RANGE", DEFAULT_LEGACY_RANGE),
      roster,
      db_path: PathBuf::from(var_or("TRACKER_DB_PATH", DEFAULT_DB_PATH)),
      sheets_api_base: var_or("TRACKER_SHEETS_API_BASE", SHEETS_API_BASE),
    })
  }
}

/// Env var value, or `default` when unset or blank
fn var_or(key: &str, default: &str) -> String {
  env::var(key)
    .ok()
    .filter(|v| !v.trim().is_empty())
    .unwrap_or_else(|| default.to_string())
}

//! Row storage seam. The analysis core never talks to storage; commands
//! receive a `RowStore` explicitly.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::Mutex;

use crate::sheets::SheetsError;

/// Acknowledgement of a successful append
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AppendAck {
  pub updated_range: String,
  pub updated_rows: usize,
}

/// Tabular storage addressed by A1-style range names.
///
/// Writes are append-only. Rows are never rewritten in place, so two people
/// logging at the same time cannot clobber each other.
#[async_trait]
pub trait RowStore: Send + Sync {
  /// All rows in `range`, header first. Empty when the range has no data.
  async fn read_rows(&self, range: &str) -> Result<Vec<Vec<String>>, SheetsError>;

  async fn append_rows(&self, range: &str, rows: Vec<Vec<String>>) -> Result<AppendAck, SheetsError>;
}

/// In-memory store for tests and offline runs
#[derive(Debug, Default)]
pub struct MemoryStore {
  ranges: Mutex<HashMap<String, Vec<Vec<String>>>>,
  fail_appends: bool,
}

impl MemoryStore {
  pub fn new() -> Self {
    Self::default()
  }

  pub fn with_rows(self, range: &str, rows: Vec<Vec<String>>) -> Self {
    if let Ok(mut ranges) = self.ranges.lock() {
      ranges.insert(range.to_string(), rows);
    }
    self
  }

  /// Every append fails with an API error
  pub fn failing_appends(mut self) -> Self {
    self.fail_appends = true;
    self
  }

  pub fn rows(&self, range: &str) -> Vec<Vec<String>> {
    self
      .ranges
      .lock()
      .map(|ranges| ranges.get(range).cloned().unwrap_or_default())
      .unwrap_or_default()
  }
}

#[async_trait]
impl RowStore for MemoryStore {
  /// Trailing empty cells are dropped, as `values.get` does
  async fn read_rows(&self, range: &str) -> Result<Vec<Vec<String>>, SheetsError> {
    Ok(
      self
        .rows(range)
        .into_iter()
        .map(|mut row| {
          while row.last().is_some_and(|c| c.is_empty()) {
            row.pop();
          }
          row
        })
        .collect(),
    )
  }

  async fn append_rows(&self, range: &str, rows: Vec<Vec<String>>) -> Result<AppendAck, SheetsError> {
    if self.fail_appends {
      return Err(SheetsError::Api {
        status: 503,
        message: "memory store rejected the write".to_string(),
      });
    }

    let mut ranges = self
      .ranges
      .lock()
      .map_err(|e| SheetsError::Database(e.to_string()))?;
    let existing = ranges.entry(range.to_string()).or_default();
    let first_row = existing.len() + 1;
    let updated_rows = rows.len();
    existing.extend(rows);

    Ok(AppendAck {
      updated_range: format!("{}#{}-{}", range, first_row, first_row + updated_rows.saturating_sub(1)),
      updated_rows,
    })
  }
}

use serde::Serialize;
use std::collections::HashSet;

use crate::config::TrackerConfig;
use crate::legacy::{melt_tracker_rows, HISTORIC_HEADER};
use crate::normalize::RowError;
use crate::sheets::SheetsError;
use crate::store::RowStore;

#[derive(Debug, Clone, Serialize)]
pub struct ImportReport {
  pub imported_rows: usize,
  /// Rows already present in the historic range
  pub already_present: usize,
  #[serde(skip_serializing_if = "Vec::is_empty")]
  pub skipped_rows: Vec<RowError>,
}

/// Melt the legacy wide sheet and append whatever the historic range is
/// missing. Running it twice appends nothing the second time.
pub async fn import_legacy<S>(store: &S, config: &TrackerConfig) -> Result<ImportReport, SheetsError>
where
  S: RowStore + ?Sized,
{
  let legacy = store.read_rows(&config.legacy_range).await?;
  let melted = melt_tracker_rows(&config.legacy_range, &legacy, &config.roster);

  let historic = store.read_rows(&config.historic_range).await?;
  let existing: HashSet<&[String]> = historic.iter().skip(1).map(|r| r.as_slice()).collect();

  let total = melted.rows.len();
  let new_rows: Vec<Vec<String>> = melted
    .rows
    .into_iter()
    .filter(|row| !existing.contains(row.as_slice()))
    .collect();
  let imported_rows = new_rows.len();

  if imported_rows > 0 {
    let mut rows = Vec::with_capacity(imported_rows + 1);
    if historic.is_empty() {
      rows.push(HISTORIC_HEADER.iter().map(|h| h.to_string()).collect());
    }
    rows.extend(new_rows);
    store.append_rows(&config.historic_range, rows).await?;
  }

  tracing::info!(
    imported = imported_rows,
    skipped = melted.errors.len(),
    "Imported legacy tracker rows"
  );

  Ok(ImportReport {
    imported_rows,
    already_present: total - imported_rows,
    skipped_rows: melted.errors,
  })
}

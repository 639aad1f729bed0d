use chrono::NaiveDate;
use std::fmt::Write as _;

use crate::config::TrackerConfig;
use crate::dashboard::Dashboard;
use crate::models::{Person, Winner, WinnerLookup};
use crate::normalize::{Normalized, Normalizer, RawRows};
use crate::sheets::SheetsError;
use crate::store::RowStore;

/// Read the historic and new-data ranges and normalize them together
pub async fn load_records<S>(store: &S, config: &TrackerConfig) -> Result<Normalized, SheetsError>
where
  S: RowStore + ?Sized,
{
  let historic = store.read_rows(&config.historic_range).await?;
  let new_data = store.read_rows(&config.new_data_range).await?;

  tracing::info!(
    historic = historic.len().saturating_sub(1),
    new_data = new_data.len().saturating_sub(1),
    "Loaded sheet rows"
  );

  let sources = [
    RawRows::new(&config.historic_range, historic),
    RawRows::new(&config.new_data_range, new_data),
  ];
  Ok(Normalizer::new(&config.roster).normalize(&sources))
}

pub async fn build_dashboard<S>(
  store: &S,
  config: &TrackerConfig,
  today: NaiveDate,
) -> Result<Dashboard, SheetsError>
where
  S: RowStore + ?Sized,
{
  let normalized = load_records(store, config).await?;
  Ok(Dashboard::build(&normalized.records, &config.roster, today).with_skipped_rows(normalized.errors))
}

/// ---------------------------------------------------------------------------
/// Text Output
/// ---------------------------------------------------------------------------

fn winner_label(dashboard: &Dashboard, winner: Winner) -> String {
  match winner {
    Winner::A => dashboard.person_a.name.clone(),
    Winner::B => dashboard.person_b.name.clone(),
    other => other.as_str().to_string(),
  }
}

pub fn render_table(dashboard: &Dashboard) -> String {
  let mut out = String::new();
  let a = &dashboard.person_a.name;
  let b = &dashboard.person_b.name;

  let last_winner = match dashboard.last_week_winner {
    WinnerLookup::Decided(w) => winner_label(dashboard, w),
    WinnerLookup::NoData => "no data yet".to_string(),
  };
  let _ = writeln!(out, "Last week's winner: {}", last_winner);
  let _ = writeln!(out);

  for person in Person::ALL {
    let summary = dashboard.person(person);
    let _ = writeln!(
      out,
      "{:<10} this week: {:>4} min {:>2} workouts {:>6} pts ({:+} min vs last week) | avg {:.1} min, median {} min | total {} min",
      summary.name,
      summary.this_week.minutes,
      summary.this_week.workouts,
      summary.this_week.points,
      summary.this_week.minutes - summary.last_week.minutes,
      summary.stats.avg_minutes,
      summary.stats.median_minutes,
      summary.stats.total_minutes,
    );
  }
  let _ = writeln!(
    out,
    "Wins: {} {}, {} {}, ties {}, none {}",
    a, dashboard.wins.a, b, dashboard.wins.b, dashboard.wins.tie, dashboard.wins.none
  );
  let _ = writeln!(out);

  if dashboard.combined.is_empty() {
    let _ = writeln!(out, "No workouts logged yet.");
    return out;
  }

  let _ = writeln!(
    out,
    "{:<4} {:<10} {:>8} {:>6} {:>8} {:>8} {:>6} {:>8}  {}",
    "Week", "Week Date", "Min (A)", "WO (A)", "Pts (A)", "Min (B)", "WO (B)", "Pts (B)", "Winner"
  );
  let _ = writeln!(out, "{}", "-".repeat(80));

  for row in &dashboard.combined {
    let mut line = format!("{:<4} {:<10}", row.week, row.week_start);
    for person in Person::ALL {
      let side = row.side(person);
      let _ = write!(line, " {:>8} {:>6} {:>8}", side.minutes, side.workouts, side.points);
    }
    let _ = writeln!(out, "{}  {}", line, winner_label(dashboard, row.winner));
  }

  if !dashboard.skipped_rows.is_empty() {
    let _ = writeln!(out, "\n{} row(s) skipped:", dashboard.skipped_rows.len());
    for error in &dashboard.skipped_rows {
      let _ = writeln!(out, "  {}", error);
    }
  }

  out
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::models::Roster;
  use crate::store::MemoryStore;
  use crate::test_utils::{date, header, row};
  use std::path::PathBuf;

  fn config() -> TrackerConfig {
    TrackerConfig {
      spreadsheet_id: "sheet-1".into(),
      historic_range: "data!A:G".into(),
      new_data_range: "new_data!A:H".into(),
      legacy_range: "tracker!A:E".into(),
      roster: Roster::default(),
      db_path: PathBuf::from(":memory:"),
      sheets_api_base: "http://localhost".into(),
    }
  }

  fn store() -> MemoryStore {
    MemoryStore::new()
      .with_rows(
        "data!A:G",
        vec![
          row(&["Day", "Week", "Week Date", "Name", "Activity", "Minutes", "Distance"]),
          row(&["2022-05-02", "18", "2022-05-02", "Lauren", "bike", "50", "10"]),
          row(&["2022-05-03", "18", "2022-05-02", "Lauren", "bike", "50", "10"]),
          row(&["2022-05-04", "18", "2022-05-02", "Lauren", "walk", "50", "2"]),
        ],
      )
      .with_rows(
        "new_data!A:H",
        vec![
          header(),
          // Same entry as the historic sheet
          row(&["2022-05-04", "18", "2022-05-02", "Lauren", "walk", "50", "2", ""]),
          row(&["2022-05-05", "18", "2022-05-02", "Tara", "yoga", "30", "0", ""]),
          row(&["2022-05-09", "19", "2022-05-09", "Tara", "", "0", "0", "placeholder for aggregation"]),
          row(&["bad-date", "19", "2022-05-09", "Tara", "yoga", "30", "0", ""]),
        ],
      )
  }

  #[tokio::test]
  async fn test_load_records_merges_and_dedupes() {
    let normalized = load_records(&store(), &config()).await.unwrap();

    assert_eq!(normalized.records.len(), 5);
    assert_eq!(normalized.errors.len(), 1);
    assert_eq!(normalized.errors[0].range, "new_data!A:H");
    assert_eq!(normalized.errors[0].row, 5);
  }

  #[tokio::test]
  async fn test_build_dashboard_from_store() {
    let dashboard = build_dashboard(&store(), &config(), date("2022-05-11")).await.unwrap();

    assert_eq!(dashboard.combined.len(), 2);
    assert_eq!(dashboard.combined[0].person_a.points, 450);
    assert_eq!(dashboard.combined[0].winner, Winner::A);
    assert_eq!(dashboard.last_week_winner, WinnerLookup::Decided(Winner::A));
    assert_eq!(dashboard.skipped_rows.len(), 1);
  }

  #[tokio::test]
  async fn test_render_table() {
    let dashboard = build_dashboard(&store(), &config(), date("2022-05-11")).await.unwrap();
    let table = render_table(&dashboard);

    assert!(table.starts_with("Last week's winner: Lauren"));

    let week_line = table
      .lines()
      .find(|l| l.starts_with("18   2022-05-02"))
      .unwrap();
    let cells: Vec<_> = week_line.split_whitespace().collect();
    assert_eq!(cells, vec!["18", "2022-05-02", "150", "3", "450", "30", "1", "30", "Lauren"]);
    assert!(table.contains("1 row(s) skipped"));
  }

  #[tokio::test]
  async fn test_render_empty_dashboard() {
    let dashboard = build_dashboard(&MemoryStore::new(), &config(), date("2022-05-11")).await.unwrap();
    let table = render_table(&dashboard);

    assert!(table.contains("no data yet"));
    assert!(table.contains("No workouts logged yet."));
  }
}

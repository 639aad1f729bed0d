use chrono::{Local, NaiveDate};
use clap::{Parser, Subcommand};
use serde::Serialize;
use std::error::Error;

use fitness_tracker_lib::commands::{auth, dashboard, import, log};
use fitness_tracker_lib::config::TrackerConfig;
use fitness_tracker_lib::db::{self, DbPool};
use fitness_tracker_lib::logger::init_logging;
use fitness_tracker_lib::models::{Activity, Person, Roster, Submission};
use fitness_tracker_lib::sheets::{GoogleOAuthConfig, SheetsClient};

type CliResult = Result<(), Box<dyn Error>>;

#[derive(Parser)]
#[command(name = "fitness-tracker")]
#[command(author, version, about = "Weekly workout competition between two people", long_about = None)]
struct Cli {
  #[command(subcommand)]
  command: Commands,

  /// Output format
  #[arg(short, long, global = true, default_value = "table")]
  format: OutputFormat,
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, clap::ValueEnum)]
enum OutputFormat {
  #[default]
  Table,
  Json,
}

#[derive(Subcommand)]
enum Commands {
  /// Google Sheets authentication
  Auth {
    #[command(subcommand)]
    command: AuthCommands,
  },
  /// Weekly totals, winners and stats
  Dashboard {
    /// Treat this date (YYYY-MM-DD) as today
    #[arg(long)]
    today: Option<NaiveDate>,
  },
  /// Log a workout for one or both people
  Log {
    /// Who worked out; repeat for both
    #[arg(short, long = "name", required = true)]
    names: Vec<String>,
    /// Day of the workout (YYYY-MM-DD), defaults to today
    #[arg(short, long)]
    date: Option<NaiveDate>,
    #[arg(short, long, default_value = "bike")]
    activity: Activity,
    #[arg(short, long, default_value_t = 30)]
    minutes: i64,
    /// Distance in miles
    #[arg(long, default_value_t = 0.0)]
    distance: f64,
    #[arg(long, default_value = "")]
    notes: String,
  },
  /// Copy the old wide tracker sheet into the historic range
  ImportLegacy,
}

#[derive(Subcommand)]
enum AuthCommands {
  /// Authorize access to the spreadsheet in a browser
  Login,
  /// Show stored token status
  Status,
  /// Forget stored tokens
  Logout,
}

#[tokio::main]
async fn main() {
  dotenvy::dotenv().ok();
  init_logging();

  let cli = Cli::parse();
  if let Err(e) = run(cli).await {
    eprintln!("Error: {}", e);
    std::process::exit(1);
  }
}

async fn run(cli: Cli) -> CliResult {
  let config = TrackerConfig::from_env()?;
  let pool = db::initialize_db(&config.db_path).await?;
  let format = cli.format;

  match cli.command {
    Commands::Auth { command } => match command {
      AuthCommands::Login => {
        let oauth = GoogleOAuthConfig::from_env()?;
        auth::login(&pool, &oauth, |url| {
          println!("Open this URL in your browser to authorize access:\n\n  {}\n", url);
        })
        .await?;
        println!("Logged in.");
      }
      AuthCommands::Status => {
        let status = auth::status(&pool).await?;
        if format == OutputFormat::Json {
          print_json(&status)?;
        } else if status.is_authenticated {
          println!(
            "Authenticated (expires {}{})",
            status.expires_at.as_deref().unwrap_or("unknown"),
            if status.needs_refresh { ", refresh pending" } else { "" }
          );
        } else {
          println!("Not authenticated. Run `fitness-tracker auth login`.");
        }
      }
      AuthCommands::Logout => {
        auth::logout(&pool).await?;
        println!("Logged out.");
      }
    },
    Commands::Dashboard { today } => {
      let store = open_store(&pool, &config).await?;
      let today = today.unwrap_or_else(|| Local::now().date_naive());
      let board = dashboard::build_dashboard(&store, &config, today).await?;
      auth::touch_last_sync(&pool).await?;

      match format {
        OutputFormat::Json => print_json(&board)?,
        OutputFormat::Table => print!("{}", dashboard::render_table(&board)),
      }
    }
    Commands::Log {
      names,
      date,
      activity,
      minutes,
      distance,
      notes,
    } => {
      let submission = Submission {
        people: resolve_people(&config.roster, &names)?,
        day: date.unwrap_or_else(|| Local::now().date_naive()),
        activity,
        minutes,
        distance,
        notes,
      };
      // Reject bad input before asking for a token
      submission.validate()?;

      let store = open_store(&pool, &config).await?;
      let ack = log::log_workout(&store, &config, &submission).await?;
      auth::touch_last_sync(&pool).await?;

      match format {
        OutputFormat::Json => print_json(&ack)?,
        OutputFormat::Table => println!("Saved {} row(s) to {}", ack.updated_rows, ack.updated_range),
      }
    }
    Commands::ImportLegacy => {
      let store = open_store(&pool, &config).await?;
      let report = import::import_legacy(&store, &config).await?;
      auth::touch_last_sync(&pool).await?;

      match format {
        OutputFormat::Json => print_json(&report)?,
        OutputFormat::Table => {
          println!(
            "Imported {} row(s), {} already present",
            report.imported_rows, report.already_present
          );
          for error in &report.skipped_rows {
            println!("  skipped {}", error);
          }
        }
      }
    }
  }

  pool.close().await;
  Ok(())
}

async fn open_store(pool: &DbPool, config: &TrackerConfig) -> Result<SheetsClient, Box<dyn Error>> {
  let token = auth::get_valid_access_token(pool, GoogleOAuthConfig::from_env).await?;
  Ok(SheetsClient::new(
    config.sheets_api_base.as_str(),
    config.spreadsheet_id.as_str(),
    token,
  ))
}

fn resolve_people(roster: &Roster, names: &[String]) -> Result<Vec<Person>, String> {
  names
    .iter()
    .map(|name| {
      roster
        .person(name)
        .ok_or_else(|| format!("unknown person '{}' (expected {} or {})", name, roster.a, roster.b))
    })
    .collect()
}

fn print_json<T: Serialize>(value: &T) -> Result<(), serde_json::Error> {
  println!("{}", serde_json::to_string_pretty(value)?);
  Ok(())
}

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Stored OAuth state for an external source
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct SyncState {
  pub id: i64,
  pub source: String,
  pub last_sync_at: Option<DateTime<Utc>>,
  pub access_token: Option<String>,
  pub refresh_token: Option<String>,
  pub token_expires_at: Option<DateTime<Utc>>,
}

use crate::db::DbPool;
use crate::models::SyncState;
use crate::sheets::{
  build_auth_url, exchange_code_for_tokens, refresh_tokens, wait_for_callback, GoogleOAuthConfig,
  SheetsError, SheetsTokens,
};
use chrono::Utc;
use serde::Serialize;

const SOURCE: &str = "google_sheets";
const CALLBACK_TIMEOUT_SECONDS: u64 = 120;

/// ---------------------------------------------------------------------------
/// Login
/// ---------------------------------------------------------------------------

/// Runs the browser OAuth flow and stores the resulting tokens.
/// `on_auth_url` receives the URL the user must open.
pub async fn login<F>(
  db: &DbPool,
  config: &GoogleOAuthConfig,
  on_auth_url: F,
) -> Result<(), SheetsError>
where
  F: FnOnce(&str),
{
  let auth_url = build_auth_url(config)?;
  on_auth_url(&auth_url);

  let callback = tokio::task::spawn_blocking(|| wait_for_callback(CALLBACK_TIMEOUT_SECONDS))
    .await
    .map_err(|e| SheetsError::Server(e.to_string()))??;

  let tokens = exchange_code_for_tokens(config, &callback.code).await?;
  save_tokens(db, &tokens).await?;

  tracing::info!("Google Sheets OAuth completed successfully");
  Ok(())
}

/// ---------------------------------------------------------------------------
/// Status / Logout
/// ---------------------------------------------------------------------------

#[derive(Debug, Serialize)]
pub struct AuthStatus {
  pub is_authenticated: bool,
  pub expires_at: Option<String>,
  pub needs_refresh: bool,
  pub last_sync_at: Option<String>,
}

pub async fn status(db: &DbPool) -> Result<AuthStatus, SheetsError> {
  let state = load_state(db).await?;
  let last_sync_at = state
    .as_ref()
    .and_then(|s| s.last_sync_at)
    .map(|t| t.to_rfc3339());

  match state.and_then(tokens_from_state) {
    Some(tokens) => Ok(AuthStatus {
      is_authenticated: true,
      expires_at: Some(tokens.expires_at.to_rfc3339()),
      needs_refresh: tokens.needs_refresh(),
      last_sync_at,
    }),
    None => Ok(AuthStatus {
      is_authenticated: false,
      expires_at: None,
      needs_refresh: false,
      last_sync_at,
    }),
  }
}

pub async fn logout(db: &DbPool) -> Result<(), SheetsError> {
  sqlx::query(
    "UPDATE sync_state SET access_token = NULL, refresh_token = NULL,
         token_expires_at = NULL WHERE source = ?1",
  )
  .bind(SOURCE)
  .execute(db)
  .await
  .map_err(|e| SheetsError::Database(e.to_string()))?;

  tracing::info!("Google Sheets disconnected");
  Ok(())
}

/// ---------------------------------------------------------------------------
/// Get Valid Access Token (with auto-refresh)
/// ---------------------------------------------------------------------------

/// Stored access token, refreshed first when it is about to expire.
/// `config` is only needed for the refresh, so it is loaded lazily.
pub async fn get_valid_access_token<F>(db: &DbPool, config: F) -> Result<String, SheetsError>
where
  F: FnOnce() -> Result<GoogleOAuthConfig, SheetsError>,
{
  let mut tokens = load_tokens(db).await?.ok_or(SheetsError::NotAuthenticated)?;

  if tokens.needs_refresh() {
    let config = config()?;
    tokens = refresh_tokens(&config, &tokens.refresh_token).await?;
    save_tokens(db, &tokens).await?;
    tracing::info!("Google Sheets tokens auto-refreshed");
  }

  Ok(tokens.access_token)
}

/// Record a successful read or write against the sheet
pub async fn touch_last_sync(db: &DbPool) -> Result<(), SheetsError> {
  sqlx::query("UPDATE sync_state SET last_sync_at = ?1 WHERE source = ?2")
    .bind(Utc::now())
    .bind(SOURCE)
    .execute(db)
    .await
    .map_err(|e| SheetsError::Database(e.to_string()))?;

  Ok(())
}

/// ---------------------------------------------------------------------------
/// Database Helpers
/// ---------------------------------------------------------------------------

pub async fn save_tokens(db: &DbPool, tokens: &SheetsTokens) -> Result<(), SheetsError> {
  sqlx::query(
    r#"
        INSERT INTO sync_state (source, access_token, refresh_token, token_expires_at)
        VALUES (?1, ?2, ?3, ?4)
        ON CONFLICT(source) DO UPDATE SET
            access_token = excluded.access_token,
            refresh_token = excluded.refresh_token,
            token_expires_at = excluded.token_expires_at
        "#,
  )
  .bind(SOURCE)
  .bind(&tokens.access_token)
  .bind(&tokens.refresh_token)
  .bind(tokens.expires_at)
  .execute(db)
  .await
  .map_err(|e| SheetsError::Database(e.to_string()))?;

  Ok(())
}

pub async fn load_tokens(db: &DbPool) -> Result<Option<SheetsTokens>, SheetsError> {
  Ok(load_state(db).await?.and_then(tokens_from_state))
}

async fn load_state(db: &DbPool) -> Result<Option<SyncState>, SheetsError> {
  sqlx::query_as::<_, SyncState>("SELECT * FROM sync_state WHERE source = ?1")
    .bind(SOURCE)
    .fetch_optional(db)
    .await
    .map_err(|e| SheetsError::Database(e.to_string()))
}

fn tokens_from_state(state: SyncState) -> Option<SheetsTokens> {
  match (state.access_token, state.refresh_token, state.token_expires_at) {
    (Some(access), Some(refresh), Some(expires)) => Some(SheetsTokens {
      access_token: access,
      refresh_token: refresh,
      expires_at: expires,
    }),
    _ => None,
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::test_utils::{mock_tokens, setup_test_db, teardown_test_db};

  fn no_config() -> Result<GoogleOAuthConfig, SheetsError> {
    Err(SheetsError::MissingConfig("GOOGLE_CLIENT_ID".into()))
  }

  #[tokio::test]
  async fn test_save_and_load_tokens() {
    let pool = setup_test_db().await;

    assert!(load_tokens(&pool).await.unwrap().is_none());

    save_tokens(&pool, &mock_tokens(60)).await.unwrap();
    let loaded = load_tokens(&pool).await.unwrap().unwrap();
    assert_eq!(loaded.access_token, "access-123");
    assert_eq!(loaded.refresh_token, "refresh-456");

    // Saving again updates in place
    let mut newer = mock_tokens(60);
    newer.access_token = "access-789".to_string();
    save_tokens(&pool, &newer).await.unwrap();
    assert_eq!(load_tokens(&pool).await.unwrap().unwrap().access_token, "access-789");

    teardown_test_db(pool).await;
  }

  #[tokio::test]
  async fn test_status_and_logout() {
    let pool = setup_test_db().await;

    assert!(!status(&pool).await.unwrap().is_authenticated);

    save_tokens(&pool, &mock_tokens(60)).await.unwrap();
    touch_last_sync(&pool).await.unwrap();
    let current = status(&pool).await.unwrap();
    assert!(current.is_authenticated);
    assert!(!current.needs_refresh);
    assert!(current.last_sync_at.is_some());

    logout(&pool).await.unwrap();
    let after = status(&pool).await.unwrap();
    assert!(!after.is_authenticated);
    assert!(after.last_sync_at.is_some());

    teardown_test_db(pool).await;
  }

  #[tokio::test]
  async fn test_valid_token_skips_refresh() {
    let pool = setup_test_db().await;
    save_tokens(&pool, &mock_tokens(60)).await.unwrap();

    // Config is never touched when the token is still good
    let token = get_valid_access_token(&pool, no_config).await.unwrap();
    assert_eq!(token, "access-123");

    teardown_test_db(pool).await;
  }

  #[tokio::test]
  async fn test_missing_tokens_not_authenticated() {
    let pool = setup_test_db().await;

    let err = get_valid_access_token(&pool, no_config).await.unwrap_err();
    assert!(matches!(err, SheetsError::NotAuthenticated));

    teardown_test_db(pool).await;
  }

  #[tokio::test]
  async fn test_expiring_token_is_refreshed() {
    let pool = setup_test_db().await;
    save_tokens(&pool, &mock_tokens(1)).await.unwrap();

    let mut server = mockito::Server::new_async().await;
    server
      .mock("POST", "/token")
      .with_status(200)
      .with_header("content-type", "application/json")
      .with_body(r#"{"access_token":"renewed","expires_in":3599,"token_type":"Bearer"}"#)
      .create_async()
      .await;
    let token_url = format!("{}/token", server.url());

    let token = get_valid_access_token(&pool, || {
      Ok(GoogleOAuthConfig {
        client_id: "id".into(),
        client_secret: "secret".into(),
        redirect_uri: "http://localhost:8765/callback".into(),
        token_url,
      })
    })
    .await
    .unwrap();

    assert_eq!(token, "renewed");
    let stored = load_tokens(&pool).await.unwrap().unwrap();
    assert_eq!(stored.access_token, "renewed");
    assert_eq!(stored.refresh_token, "refresh-456");

    teardown_test_db(pool).await;
  }
}

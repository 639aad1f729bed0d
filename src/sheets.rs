//! Google Sheets storage: OAuth installed-app flow plus the two `values`
//! endpoints the tracker needs (read a range, append rows).

use async_trait::async_trait;
use chrono::{DateTime, Duration, Utc};
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::env;
use std::io::{ErrorKind, Read, Write};
use std::net::TcpListener;
use std::time::{Duration as StdDuration, Instant};
use url::Url;

use crate::store::{AppendAck, RowStore};

/// ---------------------------------------------------------------------------
/// Configuration Constants
/// ---------------------------------------------------------------------------

const GOOGLE_AUTH_URL: &str = "https://accounts.google.com/o/oauth2/v2/auth";
const GOOGLE_TOKEN_URL: &str = "https://oauth2.googleapis.com/token";
pub const SHEETS_API_BASE: &str = "https://sheets.googleapis.com/v4";
const SHEETS_SCOPE: &str = "https://www.googleapis.com/auth/spreadsheets";
const REDIRECT_PORT: u16 = 8765;
const TOKEN_REFRESH_BUFFER_MINUTES: i64 = 5;
const CALLBACK_POLL_INTERVAL: StdDuration = StdDuration::from_millis(100);

/// ---------------------------------------------------------------------------
/// OAuth Data Structures
/// ---------------------------------------------------------------------------

#[derive(Debug, Clone)]
pub struct GoogleOAuthConfig {
  pub client_id: String,
  pub client_secret: String,
  pub redirect_uri: String,
  pub token_url: String,
}

impl GoogleOAuthConfig {
  pub fn from_env() -> Result<Self, SheetsError> {
    Ok(Self {
      client_id: env::var("GOOGLE_CLIENT_ID")
        .map_err(|_| SheetsError::MissingConfig("GOOGLE_CLIENT_ID".into()))?,
      client_secret: env::var("GOOGLE_CLIENT_SECRET")
        .map_err(|_| SheetsError::MissingConfig("GOOGLE_CLIENT_SECRET".into()))?,
      redirect_uri: format!("http://localhost:{}/callback", REDIRECT_PORT),
      token_url: GOOGLE_TOKEN_URL.to_string(),
    })
  }
}

/// Response from the Google token endpoint
#[allow(dead_code)]
#[derive(Debug, Deserialize)]
pub struct TokenResponse {
  pub access_token: String,
  /// Only sent on the first exchange, not on refresh
  #[serde(default)]
  pub refresh_token: Option<String>,
  pub expires_in: i64,
  pub token_type: String,
  #[serde(default)]
  pub scope: Option<String>,
}

/// Stored token state
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SheetsTokens {
  pub access_token: String,
  pub refresh_token: String,
  pub expires_at: DateTime<Utc>,
}

impl SheetsTokens {
  /// `previous_refresh` is kept when the response carries no new refresh token
  pub fn from_response(
    resp: TokenResponse,
    previous_refresh: Option<&str>,
  ) -> Result<Self, SheetsError> {
    let refresh_token = resp
      .refresh_token
      .or_else(|| previous_refresh.map(String::from))
      .ok_or_else(|| SheetsError::OAuth("Token response did not include a refresh token".into()))?;

    Ok(Self {
      access_token: resp.access_token,
      refresh_token,
      expires_at: Utc::now() + Duration::seconds(resp.expires_in),
    })
  }

  pub fn needs_refresh(&self) -> bool {
    let buffer = Duration::minutes(TOKEN_REFRESH_BUFFER_MINUTES);
    Utc::now() + buffer >= self.expires_at
  }
}

/// ---------------------------------------------------------------------------
/// Error Handling
/// ---------------------------------------------------------------------------

#[derive(Debug, thiserror::Error)]
pub enum SheetsError {
  #[error("Missing configuration: {0}")]
  MissingConfig(String),

  #[error("HTTP request failed: {0}")]
  Request(#[from] reqwest::Error),

  #[error("OAuth error: {0}")]
  OAuth(String),

  #[error("Callback server error: {0}")]
  Server(String),

  #[error("Database error: {0}")]
  Database(String),

  #[error("Sheets API error ({status}): {message}")]
  Api { status: u16, message: String },

  #[error("Unexpected Sheets response: {0}")]
  InvalidResponse(String),

  #[error("Not authenticated with Google Sheets")]
  NotAuthenticated,
}

impl Serialize for SheetsError {
  fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
  where
    S: serde::Serializer,
  {
    serializer.serialize_str(&self.to_string())
  }
}

/// ---------------------------------------------------------------------------
/// OAuth URL Generation
/// ---------------------------------------------------------------------------

pub fn build_auth_url(config: &GoogleOAuthConfig) -> Result<String, SheetsError> {
  let mut url = Url::parse(GOOGLE_AUTH_URL).map_err(|e| SheetsError::OAuth(e.to_string()))?;

  url
    .query_pairs_mut()
    .append_pair("client_id", &config.client_id)
    .append_pair("redirect_uri", &config.redirect_uri)
    .append_pair("response_type", "code")
    .append_pair("scope", SHEETS_SCOPE)
    // offline + consent so Google hands back a refresh token every time
    .append_pair("access_type", "offline")
    .append_pair("prompt", "consent");

  Ok(url.to_string())
}

/// ---------------------------------------------------------------------------
/// Token Exchange and Refresh
/// ---------------------------------------------------------------------------

pub async fn exchange_code_for_tokens(
  config: &GoogleOAuthConfig,
  code: &str,
) -> Result<SheetsTokens, SheetsError> {
  let client = Client::new();

  let response = client
    .post(&config.token_url)
    .form(&[
      ("client_id", config.client_id.as_str()),
      ("client_secret", config.client_secret.as_str()),
      ("code", code),
      ("grant_type", "authorization_code"),
      ("redirect_uri", config.redirect_uri.as_str()),
    ])
    .send()
    .await?;

  if !response.status().is_success() {
    let error_text = response.text().await.unwrap_or_default();
    return Err(SheetsError::OAuth(format!(
      "Token exchange failed: {}",
      error_text
    )));
  }

  let token_response: TokenResponse = response.json().await?;
  SheetsTokens::from_response(token_response, None)
}

pub async fn refresh_tokens(
  config: &GoogleOAuthConfig,
  refresh_token: &str,
) -> Result<SheetsTokens, SheetsError> {
  let client = Client::new();

  let response = client
    .post(&config.token_url)
    .form(&[
      ("client_id", config.client_id.as_str()),
      ("client_secret", config.client_secret.as_str()),
      ("refresh_token", refresh_token),
      ("grant_type", "refresh_token"),
    ])
    .send()
    .await?;

  if !response.status().is_success() {
    let error_text = response.text().await.unwrap_or_default();
    return Err(SheetsError::OAuth(format!(
      "Token refresh failed: {}",
      error_text
    )));
  }

  let token_response: TokenResponse = response.json().await?;
  SheetsTokens::from_response(token_response, Some(refresh_token))
}

/// ---------------------------------------------------------------------------
/// OAuth Callback Server
/// ---------------------------------------------------------------------------

#[derive(Debug)]
pub struct CallbackResult {
  pub code: String,
}

/// Listen on the redirect port until Google sends the browser back
pub fn wait_for_callback(timeout_seconds: u64) -> Result<CallbackResult, SheetsError> {
  let listener = TcpListener::bind(("127.0.0.1", REDIRECT_PORT))
    .map_err(|e| SheetsError::Server(format!("Failed to bind port {}: {}", REDIRECT_PORT, e)))?;

  accept_callback(&listener, Instant::now() + StdDuration::from_secs(timeout_seconds))
}

/// Accept connections until one carries `code` or `error`. Anything else
/// (favicon requests, stray probes) is dropped.
fn accept_callback(listener: &TcpListener, deadline: Instant) -> Result<CallbackResult, SheetsError> {
  listener
    .set_nonblocking(true)
    .map_err(|e| SheetsError::Server(e.to_string()))?;

  while Instant::now() < deadline {
    let mut stream = match listener.accept() {
      Ok((stream, _)) => stream,
      Err(e) if e.kind() == ErrorKind::WouldBlock => {
        std::thread::sleep(CALLBACK_POLL_INTERVAL);
        continue;
      }
      Err(e) => return Err(SheetsError::Server(e.to_string())),
    };

    // Accepted sockets inherit non-blocking mode on some platforms
    let _ = stream.set_nonblocking(false);
    let _ = stream.set_read_timeout(Some(StdDuration::from_secs(5)));
    let mut buffer = [0; 4096];
    let read = stream.read(&mut buffer).unwrap_or(0);
    let request = String::from_utf8_lossy(&buffer[..read]);

    let (reply, result) = match parse_callback(&request) {
      Some(CallbackParams::Code(code)) => (
        plain_response("200 OK", "Signed in to Google Sheets. You can close this tab."),
        Ok(CallbackResult { code }),
      ),
      Some(CallbackParams::Error(error)) => (
        plain_response("400 Bad Request", &format!("Sign-in failed: {}", error)),
        Err(SheetsError::OAuth(error)),
      ),
      None => continue,
    };

    let _ = stream.write_all(reply.as_bytes());
    return result;
  }

  Err(SheetsError::Server("Timed out waiting for the OAuth callback".into()))
}

#[derive(Debug, PartialEq)]
enum CallbackParams {
  Code(String),
  Error(String),
}

/// Pull `code` or `error` out of a raw `GET /callback?...` request.
/// Google codes contain `/`, so the query is percent-decoded.
fn parse_callback(request: &str) -> Option<CallbackParams> {
  let first_line = request.lines().next()?;
  let path = first_line.split_whitespace().nth(1)?;

  if !path.starts_with("/callback") {
    return None;
  }

  let url = Url::parse(&format!("http://localhost{}", path)).ok()?;
  let mut code = None;
  let mut error = None;
  for (key, value) in url.query_pairs() {
    match key.as_ref() {
      "code" => code = Some(value.into_owned()),
      "error" => error = Some(value.into_owned()),
      _ => {}
    }
  }

  match (code, error) {
    (Some(code), _) => Some(CallbackParams::Code(code)),
    (None, Some(error)) => Some(CallbackParams::Error(error)),
    (None, None) => None,
  }
}

fn plain_response(status: &str, message: &str) -> String {
  format!(
    "HTTP/1.1 {}\r\nContent-Type: text/plain; charset=utf-8\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{}",
    status,
    message.len(),
    message
  )
}

/// ---------------------------------------------------------------------------
/// Sheets API - Values
/// ---------------------------------------------------------------------------

/// `spreadsheets.values.get` response
#[allow(dead_code)]
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ValueRange {
  range: Option<String>,
  major_dimension: Option<String>,
  /// Omitted entirely when the range is empty
  #[serde(default)]
  values: Vec<Vec<serde_json::Value>>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct AppendBody<'a> {
  range: &'a str,
  major_dimension: &'static str,
  values: &'a [Vec<String>],
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct AppendResponse {
  updates: Option<UpdateSummary>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct UpdateSummary {
  updated_range: Option<String>,
  #[serde(default)]
  updated_rows: usize,
}

/// Sheets client for one spreadsheet. Passed explicitly to whatever needs storage.
#[derive(Debug, Clone)]
pub struct SheetsClient {
  http: Client,
  api_base: String,
  spreadsheet_id: String,
  access_token: String,
}

impl SheetsClient {
  pub fn new(
    api_base: impl Into<String>,
    spreadsheet_id: impl Into<String>,
    access_token: impl Into<String>,
  ) -> Self {
    Self {
      http: Client::new(),
      api_base: api_base.into(),
      spreadsheet_id: spreadsheet_id.into(),
      access_token: access_token.into(),
    }
  }

  /// `{base}/spreadsheets/{id}/values/{range}{suffix}` with the range percent-encoded
  fn values_url(&self, range: &str, suffix: &str) -> Result<Url, SheetsError> {
    let mut url =
      Url::parse(&self.api_base).map_err(|e| SheetsError::MissingConfig(format!("Sheets API base: {}", e)))?;

    url
      .path_segments_mut()
      .map_err(|_| SheetsError::MissingConfig(format!("Sheets API base: {}", self.api_base)))?
      .pop_if_empty()
      .extend(["spreadsheets", self.spreadsheet_id.as_str(), "values"])
      .push(&format!("{}{}", range, suffix));

    Ok(url)
  }

  async fn check_status(response: reqwest::Response) -> Result<reqwest::Response, SheetsError> {
    let status = response.status();

    if status == reqwest::StatusCode::UNAUTHORIZED {
      return Err(SheetsError::NotAuthenticated);
    }

    if !status.is_success() {
      let message = response.text().await.unwrap_or_default();
      return Err(SheetsError::Api {
        status: status.as_u16(),
        message,
      });
    }

    Ok(response)
  }
}

#[async_trait]
impl RowStore for SheetsClient {
  async fn read_rows(&self, range: &str) -> Result<Vec<Vec<String>>, SheetsError> {
    let mut url = self.values_url(range, "")?;
    url.query_pairs_mut().append_pair("majorDimension", "ROWS");

    let response = self
      .http
      .get(url)
      .bearer_auth(&self.access_token)
      .send()
      .await?;
    let response = Self::check_status(response).await?;

    let response_text = response.text().await?;
    let value_range: ValueRange = serde_json::from_str(&response_text).map_err(|e| {
      tracing::error!(
        "Failed to parse values response (first 500 chars): {}",
        &response_text[..response_text.len().min(500)]
      );
      SheetsError::InvalidResponse(e.to_string())
    })?;

    let rows: Vec<Vec<String>> = value_range
      .values
      .into_iter()
      .map(|row| row.into_iter().map(cell_to_string).collect())
      .collect();

    tracing::debug!(range, rows = rows.len(), "Read sheet range");
    Ok(rows)
  }

  async fn append_rows(&self, range: &str, rows: Vec<Vec<String>>) -> Result<AppendAck, SheetsError> {
    let mut url = self.values_url(range, ":append")?;
    url
      .query_pairs_mut()
      .append_pair("valueInputOption", "USER_ENTERED")
      .append_pair("insertDataOption", "INSERT_ROWS");

    let body = AppendBody {
      range,
      major_dimension: "ROWS",
      values: &rows,
    };

    let response = self
      .http
      .post(url)
      .bearer_auth(&self.access_token)
      .json(&body)
      .send()
      .await?;
    let response = Self::check_status(response).await?;

    let append: AppendResponse = response
      .json()
      .await
      .map_err(|e| SheetsError::InvalidResponse(e.to_string()))?;

    let ack = match append.updates {
      Some(updates) => AppendAck {
        updated_range: updates.updated_range.unwrap_or_else(|| range.to_string()),
        updated_rows: updates.updated_rows,
      },
      None => {
        return Err(SheetsError::InvalidResponse(
          "append response carried no update summary".into(),
        ))
      }
    };

    tracing::info!(range = %ack.updated_range, rows = ack.updated_rows, "Appended rows");
    Ok(ack)
  }
}

/// Formatted values arrive as strings; anything else is stringified
fn cell_to_string(value: serde_json::Value) -> String {
  match value {
    serde_json::Value::String(s) => s,
    serde_json::Value::Null => String::new(),
    other => other.to_string(),
  }
}

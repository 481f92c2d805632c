//! Password sign-in against the hosted auth endpoint, with the session kept
//! in a JSON file so later runs start signed in.

use chrono::{DateTime, Duration, Utc};
use color_eyre::{eyre::eyre, Result};
use reqwest::header::{HeaderMap, HeaderValue, AUTHORIZATION};
use serde::{Deserialize, Serialize};
use serde_json::{json, Map, Value};
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};
use url::Url;

use crate::cache::ProjectCache;
use crate::error::AppError;

/// Refresh a little before the token actually runs out.
const EXPIRY_MARGIN_SECS: i64 = 30;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct User {
  pub id: String,
  pub email: String,
  #[serde(default)]
  pub display_name: Option<String>,
}

impl User {
  pub fn label(&self) -> &str {
    self.display_name.as_deref().unwrap_or(&self.email)
  }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Session {
  pub access_token: String,
  pub refresh_token: String,
  pub expires_at: DateTime<Utc>,
  pub user: User,
}

impl Session {
  pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
    now + Duration::seconds(EXPIRY_MARGIN_SECS) >= self.expires_at
  }
}

#[derive(Debug, Deserialize)]
struct TokenResponse {
  access_token: String,
  refresh_token: String,
  expires_in: i64,
  user: ApiUser,
}

#[derive(Debug, Deserialize)]
struct ApiUser {
  id: String,
  #[serde(default)]
  email: Option<String>,
  #[serde(default)]
  user_metadata: Map<String, Value>,
}

impl ApiUser {
  fn into_user(self) -> User {
    let display_name = ["full_name", "name"]
      .iter()
      .find_map(|k| self.user_metadata.get(*k).and_then(Value::as_str))
      .map(str::to_string);

    User {
      id: self.id,
      email: self.email.unwrap_or_default(),
      display_name,
    }
  }
}

impl TokenResponse {
  fn into_session(self, now: DateTime<Utc>) -> Session {
    Session {
      access_token: self.access_token,
      refresh_token: self.refresh_token,
      expires_at: now + Duration::seconds(self.expires_in),
      user: self.user.into_user(),
    }
  }
}

/// The auth endpoint reports failures under several keys.
#[derive(Debug, Default, Deserialize)]
struct AuthErrorBody {
  error_description: Option<String>,
  msg: Option<String>,
  message: Option<String>,
  error: Option<String>,
}

impl AuthErrorBody {
  fn into_message(self, status: reqwest::StatusCode) -> String {
    self
      .error_description
      .or(self.msg)
      .or(self.message)
      .or(self.error)
      .unwrap_or_else(|| format!("Authentication failed ({})", status))
  }
}

/// HTTP client for the `/auth/v1` endpoints.
#[derive(Clone)]
pub struct AuthClient {
  http: reqwest::Client,
  base: Url,
}

impl AuthClient {
  pub fn new(base_url: &str, api_key: &str) -> Result<Self> {
    let base = Url::parse(&format!("{}/auth/v1/", base_url.trim_end_matches('/')))
      .map_err(|e| eyre!("Invalid backend url {}: {}", base_url, e))?;

    let mut headers = HeaderMap::new();
    headers.insert(
      "apikey",
      HeaderValue::from_str(api_key).map_err(|e| eyre!("Invalid api key: {}", e))?,
    );

    let http = reqwest::Client::builder()
      .default_headers(headers)
      .build()
      .map_err(|e| eyre!("Failed to create HTTP client: {}", e))?;

    Ok(Self { http, base })
  }

  fn endpoint(&self, path: &str) -> Result<Url, AppError> {
    self
      .base
      .join(path)
      .map_err(|e| AppError::Remote(format!("Invalid auth url: {}", e)))
  }

  async fn token(&self, grant_type: &str, body: Value) -> Result<Session, AppError> {
    let mut url = self.endpoint("token")?;
    url.query_pairs_mut().append_pair("grant_type", grant_type);

    let response = self
      .http
      .post(url)
      .json(&body)
      .send()
      .await
      .map_err(|e| AppError::Remote(format!("Failed to reach auth server: {}", e)))?;

    let status = response.status();
    if !status.is_success() {
      let body: AuthErrorBody = response.json().await.unwrap_or_default();
      return Err(AppError::Remote(body.into_message(status)));
    }

    let token: TokenResponse = response
      .json()
      .await
      .map_err(|e| AppError::Remote(format!("Failed to parse auth response: {}", e)))?;
    Ok(token.into_session(Utc::now()))
  }

  pub async fn sign_in(&self, email: &str, password: &str) -> Result<Session, AppError> {
    if email.trim().is_empty() {
      return Err(AppError::validation("Please enter your email"));
    }
    if password.is_empty() {
      return Err(AppError::validation("Please enter your password"));
    }
    self
      .token("password", json!({"email": email.trim(), "password": password}))
      .await
  }

  pub async fn refresh(&self, refresh_token: &str) -> Result<Session, AppError> {
    self
      .token("refresh_token", json!({"refresh_token": refresh_token}))
      .await
  }

  pub async fn sign_out(&self, access_token: &str) -> Result<(), AppError> {
    let response = self
      .http
      .post(self.endpoint("logout")?)
      .header(AUTHORIZATION, format!("Bearer {}", access_token))
      .send()
      .await
      .map_err(|e| AppError::Remote(format!("Failed to reach auth server: {}", e)))?;

    let status = response.status();
    if !status.is_success() {
      let body: AuthErrorBody = response.json().await.unwrap_or_default();
      return Err(AppError::Remote(body.into_message(status)));
    }
    Ok(())
  }
}

/// Session file on disk.
pub struct SessionStore {
  path: PathBuf,
}

impl SessionStore {
  pub fn new(path: impl Into<PathBuf>) -> Self {
    Self { path: path.into() }
  }

  pub fn path(&self) -> &Path {
    &self.path
  }

  /// The stored session; an unreadable file is removed and reported as none.
  pub fn load(&self) -> Option<Session> {
    let contents = std::fs::read_to_string(&self.path).ok()?;
    match serde_json::from_str(&contents) {
      Ok(session) => Some(session),
      Err(e) => {
        warn!("discarding unreadable session file: {}", e);
        self.clear();
        None
      }
    }
  }

  pub fn save(&self, session: &Session) -> Result<()> {
    if let Some(parent) = self.path.parent() {
      std::fs::create_dir_all(parent)
        .map_err(|e| eyre!("Failed to create session directory: {}", e))?;
    }
    let contents =
      serde_json::to_string_pretty(session).map_err(|e| eyre!("Failed to encode session: {}", e))?;
    std::fs::write(&self.path, contents)
      .map_err(|e| eyre!("Failed to write session file {}: {}", self.path.display(), e))
  }

  pub fn clear(&self) {
    if let Err(e) = std::fs::remove_file(&self.path) {
      if e.kind() != std::io::ErrorKind::NotFound {
        warn!("failed to remove session file: {}", e);
      }
    }
  }
}

/// Authentication provider: sign-in state plus the cache it owns on logout.
pub struct Auth {
  client: AuthClient,
  sessions: SessionStore,
  cache: ProjectCache,
}

impl Auth {
  pub fn new(client: AuthClient, sessions: SessionStore, cache: ProjectCache) -> Self {
    Self {
      client,
      sessions,
      cache,
    }
  }

  pub async fn sign_in(&self, email: &str, password: &str) -> Result<Session, AppError> {
    let session = self.client.sign_in(email, password).await?;
    if let Err(e) = self.sessions.save(&session) {
      warn!("{}", e);
    }
    info!(user = %session.user.id, "signed in");
    Ok(session)
  }

  /// The persisted session, refreshed when expired. `None` means signed out.
  pub async fn restore(&self) -> Option<Session> {
    let session = self.sessions.load()?;
    if !session.is_expired(Utc::now()) {
      return Some(session);
    }

    debug!(user = %session.user.id, "session expired, refreshing");
    match self.client.refresh(&session.refresh_token).await {
      Ok(fresh) => {
        if let Err(e) = self.sessions.save(&fresh) {
          warn!("{}", e);
        }
        Some(fresh)
      }
      Err(e) => {
        warn!("failed to refresh session: {}", e);
        self.sessions.clear();
        None
      }
    }
  }

  /// Forget the session locally and drop every cached project list.
  pub async fn sign_out(&self) {
    if let Some(session) = self.sessions.load() {
      if let Err(e) = self.client.sign_out(&session.access_token).await {
        warn!("remote sign-out failed: {}", e);
      }
      info!(user = %session.user.id, "signed out");
    }
    self.sessions.clear();
    self.cache.clear();
  }
}

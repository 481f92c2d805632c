use color_eyre::{eyre::eyre, Result};
use serde::Deserialize;
use sha2::{Digest, Sha256};
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::projects::{CACHE_DURATION, MIN_LOADING_TIME};

#[derive(Debug, Clone, Deserialize)]
pub struct Config {
  pub backend: BackendConfig,
  /// Custom title for header (defaults to the backend host if not set)
  pub title: Option<String>,
  #[serde(default)]
  pub cache: CacheConfig,
}

#[derive(Debug, Clone, Deserialize)]
pub struct BackendConfig {
  pub url: String,
}

#[derive(Debug, Clone, Deserialize, PartialEq, Eq)]
pub struct CacheConfig {
  /// Lifetime of a cached project list
  #[serde(default = "default_duration_secs")]
  pub duration_secs: u64,
  /// Minimum visible loading time on first or forced fetches
  #[serde(default = "default_min_loading_ms")]
  pub min_loading_ms: u64,
  /// Keep the project cache on disk between runs
  #[serde(default = "default_persist")]
  pub persist: bool,
}

fn default_duration_secs() -> u64 {
  CACHE_DURATION.as_secs()
}

fn default_min_loading_ms() -> u64 {
  MIN_LOADING_TIME.as_millis() as u64
}

fn default_persist() -> bool {
  true
}

impl Default for CacheConfig {
  fn default() -> Self {
    Self {
      duration_secs: default_duration_secs(),
      min_loading_ms: default_min_loading_ms(),
      persist: default_persist(),
    }
  }
}

impl CacheConfig {
  pub fn duration(&self) -> chrono::Duration {
    chrono::Duration::seconds(self.duration_secs as i64)
  }

  pub fn min_loading(&self) -> Duration {
    Duration::from_millis(self.min_loading_ms)
  }
}

impl Config {
  /// Load configuration from file.
  ///
  /// Search order:
  /// 1. Explicit path if provided
  /// 2. ./chatdeck.yaml (current directory)
  /// 3. $XDG_CONFIG_HOME/chatdeck/config.yaml
  pub fn load(explicit_path: Option<&Path>) -> Result<Self> {
    let path = if let Some(p) = explicit_path {
      if p.exists() {
        Some(p.to_path_buf())
      } else {
        return Err(eyre!("Config file not found: {}", p.display()));
      }
    } else {
      Self::find_config_file()
    };

    match path {
      Some(p) => Self::load_from_path(&p),
      None => Err(eyre!(
        "No configuration file found. Create one at ~/.config/chatdeck/config.yaml\n\
                 with at least:\n\n  backend:\n    url: https://<project>.supabase.co"
      )),
    }
  }

  fn find_config_file() -> Option<PathBuf> {
    let local = PathBuf::from("chatdeck.yaml");
    if local.exists() {
      return Some(local);
    }

    if let Some(config_dir) = dirs::config_dir() {
      let xdg_path = config_dir.join("chatdeck").join("config.yaml");
      if xdg_path.exists() {
        return Some(xdg_path);
      }
    }

    None
  }

  fn load_from_path(path: &Path) -> Result<Self> {
    let contents = std::fs::read_to_string(path)
      .map_err(|e| eyre!("Failed to read config file {}: {}", path.display(), e))?;

    Self::parse(&contents).map_err(|e| eyre!("Failed to parse config file {}: {}", path.display(), e))
  }

  pub fn parse(contents: &str) -> Result<Self> {
    let config: Config = serde_yaml::from_str(contents).map_err(|e| eyre!("{}", e))?;
    url::Url::parse(&config.backend.url)
      .map_err(|e| eyre!("Invalid backend url {}: {}", config.backend.url, e))?;
    Ok(config)
  }

  /// Header title: the configured one, else the backend host.
  pub fn display_title(&self) -> String {
    if let Some(title) = &self.title {
      return title.clone();
    }
    url::Url::parse(&self.backend.url)
      .ok()
      .and_then(|u| u.host_str().map(str::to_string))
      .unwrap_or_else(|| self.backend.url.clone())
  }

  /// Short digest of the backend url, used to keep per-backend files apart.
  pub fn backend_namespace(&self) -> String {
    let digest = Sha256::digest(self.backend.url.trim_end_matches('/').as_bytes());
    hex::encode(digest)[..16].to_string()
  }

  /// Root of chatdeck's local state.
  pub fn data_dir() -> Result<PathBuf> {
    let data_dir = dirs::data_dir()
      .or_else(|| dirs::home_dir().map(|p| p.join(".local/share")))
      .ok_or_else(|| eyre!("Could not determine data directory"))?;

    Ok(data_dir.join("chatdeck"))
  }

  pub fn cache_db_path(&self) -> Result<PathBuf> {
    Ok(Self::data_dir()?.join(format!("cache-{}.db", self.backend_namespace())))
  }

  pub fn session_path(&self) -> Result<PathBuf> {
    Ok(Self::data_dir()?.join(format!("session-{}.json", self.backend_namespace())))
  }

  pub fn log_dir() -> Result<PathBuf> {
    Ok(Self::data_dir()?.join("logs"))
  }

  /// Get the backend's public api key from environment variables.
  ///
  /// Checks CHATDECK_ANON_KEY first, then SUPABASE_ANON_KEY as fallback.
  pub fn get_api_key() -> Result<String> {
    std::env::var("CHATDECK_ANON_KEY")
      .or_else(|_| std::env::var("SUPABASE_ANON_KEY"))
      .map_err(|_| {
        eyre!("Backend api key not found. Set CHATDECK_ANON_KEY or SUPABASE_ANON_KEY environment variable.")
      })
  }

  /// Get the login password from environment variables.
  ///
  /// Checks CHATDECK_PASSWORD.
  pub fn get_password() -> Result<String> {
    std::env::var("CHATDECK_PASSWORD")
      .map_err(|_| eyre!("Password not found. Set CHATDECK_PASSWORD environment variable."))
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn test_minimal_config_uses_cache_defaults() {
    let config = Config::parse("backend:\n  url: https://abc.supabase.co\n").unwrap();
    assert_eq!(config.cache, CacheConfig::default());
    assert_eq!(config.cache.duration(), chrono::Duration::minutes(10));
    assert_eq!(config.cache.min_loading(), Duration::from_millis(600));
    assert!(config.cache.persist);
    assert_eq!(config.display_title(), "abc.supabase.co");
  }

  #[test]
  fn test_cache_overrides() {
    let yaml = r#"
backend:
  url: https://abc.supabase.co
title: My bots
cache:
  duration_secs: 60
  persist: false
"#;
    let config = Config::parse(yaml).unwrap();
    assert_eq!(config.cache.duration_secs, 60);
    assert_eq!(config.cache.min_loading_ms, 600);
    assert!(!config.cache.persist);
    assert_eq!(config.display_title(), "My bots");
  }

  #[test]
  fn test_invalid_url_is_rejected() {
    assert!(Config::parse("backend:\n  url: not a url\n").is_err());
  }

  #[test]
  fn test_namespace_ignores_trailing_slash() {
    let a = Config::parse("backend:\n  url: https://abc.supabase.co\n").unwrap();
    let b = Config::parse("backend:\n  url: https://abc.supabase.co/\n").unwrap();
    let c = Config::parse("backend:\n  url: https://xyz.supabase.co\n").unwrap();

    assert_eq!(a.backend_namespace(), b.backend_namespace());
    assert_ne!(a.backend_namespace(), c.backend_namespace());
    assert_eq!(a.backend_namespace().len(), 16);
  }
}

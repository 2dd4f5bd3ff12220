//! Wiring for the inbox server binary: configuration, store opening and the
//! top-level router.

use std::{
  path::{Path, PathBuf},
  sync::Arc,
};

use axum::Router;
use inbox_core::{inbox::Inbox, store::MessageStore};
use inbox_store_sqlite::SqliteStore;
use serde::Deserialize;
use tower_http::trace::TraceLayer;

/// `database_path` value that selects a throwaway in-memory store.
pub const IN_MEMORY: &str = ":memory:";

// ─── Configuration ────────────────────────────────────────────────────────────

/// Runtime server configuration, deserialised from `config.toml` and
/// `INBOX_*` environment variables.
#[derive(Debug, Deserialize, Clone, PartialEq, Eq)]
pub struct ServerConfig {
  #[serde(default = "default_host")]
  pub host:          String,
  #[serde(default = "default_port")]
  pub port:          u16,
  /// SQLite file, or `:memory:`.
  #[serde(default = "default_database_path")]
  pub database_path: PathBuf,
}

fn default_host() -> String { "0.0.0.0".to_string() }

fn default_port() -> u16 { 8080 }

fn default_database_path() -> PathBuf { PathBuf::from("messages.db") }

impl Default for ServerConfig {
  fn default() -> Self {
    Self {
      host:          default_host(),
      port:          default_port(),
      database_path: default_database_path(),
    }
  }
}

impl ServerConfig {
  /// Layer the optional TOML file at `path` under `INBOX_*` environment
  /// variables. Missing keys fall back to defaults.
  pub fn load(path: &Path) -> Result<Self, config::ConfigError> {
    config::Config::builder()
      .add_source(config::File::from(path).required(false))
      .add_source(config::Environment::with_prefix("INBOX").try_parsing(true))
      .build()?
      .try_deserialize()
  }

  pub fn address(&self) -> String { format!("{}:{}", self.host, self.port) }

  pub fn is_in_memory(&self) -> bool {
    self.database_path.as_os_str() == IN_MEMORY
  }
}

// ─── Store & router ───────────────────────────────────────────────────────────

/// Open the store named by `cfg`, creating the schema if needed.
pub async fn open_store(cfg: &ServerConfig) -> inbox_store_sqlite::Result<SqliteStore> {
  if cfg.is_in_memory() {
    SqliteStore::open_in_memory().await
  } else {
    SqliteStore::open(&cfg.database_path).await
  }
}

/// The full application router: the JSON API with per-request tracing.
pub fn router<S>(inbox: Arc<Inbox<S>>) -> Router
where
  S: MessageStore + 'static,
{
  inbox_api::api_router(inbox).layer(TraceLayer::new_for_http())
}

#[cfg(test)]
mod tests {
  use super::*;

  use axum::{
    body::Body,
    http::{Request, StatusCode},
  };
  use tower::ServiceExt as _;

  #[test]
  fn defaults_when_file_is_missing() {
    let cfg = ServerConfig::load(Path::new("/nonexistent/inbox-config.toml")).unwrap();
    assert_eq!(cfg.port, 8080);
    assert_eq!(cfg.database_path, PathBuf::from("messages.db"));
    assert!(!cfg.is_in_memory());
  }

  #[test]
  fn file_values_override_defaults() {
    let path = std::env::temp_dir()
      .join(format!("inbox-server-test-{}.toml", std::process::id()));
    std::fs::write(&path, "port = 9999\ndatabase_path = \":memory:\"\n").unwrap();

    let cfg = ServerConfig::load(&path).unwrap();
    std::fs::remove_file(&path).ok();

    assert_eq!(cfg.port, 9999);
    assert_eq!(cfg.address(), "0.0.0.0:9999");
    assert!(cfg.is_in_memory());
  }

  #[tokio::test]
  async fn in_memory_store_serves_router() {
    let cfg = ServerConfig {
      database_path: PathBuf::from(IN_MEMORY),
      ..ServerConfig::default()
    };
    let store = open_store(&cfg).await.unwrap();
    let app = router(Arc::new(Inbox::new(Arc::new(store))));

    let req = Request::builder()
      .method("POST")
      .uri("/users/norbert/messages")
      .body(Body::from(r#"{"user_id":"albert","text":"hi"}"#))
      .unwrap();
    let resp = app.clone().oneshot(req).await.unwrap();
    assert_eq!(resp.status(), StatusCode::CREATED);

    let req = Request::builder()
      .uri("/users/norbert/messages")
      .body(Body::empty())
      .unwrap();
    let resp = app.oneshot(req).await.unwrap();
    assert_eq!(resp.status(), StatusCode::OK);
    let bytes = axum::body::to_bytes(resp.into_body(), usize::MAX)
      .await
      .unwrap();
    let messages: serde_json::Value = serde_json::from_slice(&bytes).unwrap();
    assert_eq!(messages[0]["text"], "hi");
  }
}

//! Handlers for `GET /healthcheck` and `GET /environment`.

use std::sync::Arc;

use axum::{
  Json,
  extract::State,
  http::StatusCode,
  response::{IntoResponse, Response},
};
use inbox_core::{inbox::Inbox, store::MessageStore};
use serde_json::json;

/// `GET /healthcheck` — 200 if the store answers, 503 otherwise.
pub async fn healthcheck<S>(State(inbox): State<Arc<Inbox<S>>>) -> Response
where
  S: MessageStore,
{
  match inbox.store().ping().await {
    Ok(()) => (StatusCode::OK, Json(json!({ "status": "success" }))).into_response(),
    Err(e) => {
      tracing::warn!(error = %e, "health check failed");
      (
        StatusCode::SERVICE_UNAVAILABLE,
        Json(json!({ "status": "failure", "error": e.to_string() })),
      )
        .into_response()
    }
  }
}

/// `GET /environment` — build and platform information. Never exposes
/// environment variables.
pub async fn environment() -> Json<serde_json::Value> {
  Json(json!({
    "service": "inbox",
    "version": env!("CARGO_PKG_VERSION"),
    "os":      std::env::consts::OS,
    "arch":    std::env::consts::ARCH,
  }))
}

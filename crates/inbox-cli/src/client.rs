//! Async HTTP client wrapping the inbox JSON API.

use std::time::Duration;

use anyhow::{Context, Result, anyhow};
use inbox_core::message::{Message, MessageId};
use reqwest::{Client, Response, Url};
use serde::Deserialize;
use serde_json::json;

/// Which slice of a user's inbox to fetch.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReadMode {
  /// Only messages that arrived since the last read.
  New,
  /// The full history.
  All,
  /// One page of the full history.
  Page { page: Option<u32>, page_size: Option<u32> },
}

impl ReadMode {
  /// Query-string pairs for `GET /users/:user_id/messages`.
  pub fn query_pairs(&self) -> Vec<(&'static str, String)> {
    match *self {
      ReadMode::New => Vec::new(),
      ReadMode::All => vec![("get_old_messages", "true".to_string())],
      ReadMode::Page { page, page_size } => {
        let mut pairs = vec![("get_old_messages", "true".to_string())];
        if let Some(page) = page {
          pairs.push(("page", page.to_string()));
        }
        if let Some(size) = page_size {
          pairs.push(("page_size", size.to_string()));
        }
        pairs
      }
    }
  }
}

#[derive(Deserialize)]
struct Deleted {
  deleted_count: u64,
}

/// Async HTTP client for the inbox JSON REST API.
///
/// Cheap to clone — the inner [`reqwest::Client`] is `Arc`-based.
#[derive(Clone)]
pub struct ApiClient {
  client:   Client,
  base_url: String,
}

impl ApiClient {
  pub fn new(base_url: impl Into<String>) -> Result<Self> {
    let client = Client::builder()
      .timeout(Duration::from_secs(30))
      .build()
      .context("failed to build HTTP client")?;
    Ok(Self { client, base_url: base_url.into() })
  }

  /// `{base}/users/{user_id}/messages[/{extra}]`, with every segment
  /// percent-encoded.
  fn messages_url(&self, user_id: &str, extra: Option<&str>) -> Result<Url> {
    let mut url = Url::parse(&self.base_url)
      .with_context(|| format!("invalid base URL {:?}", self.base_url))?;
    {
      let mut segments = url
        .path_segments_mut()
        .map_err(|()| anyhow!("base URL {:?} cannot have a path", self.base_url))?;
      segments.pop_if_empty().extend(["users", user_id, "messages"]);
      if let Some(extra) = extra {
        segments.push(extra);
      }
    }
    Ok(url)
  }

  /// `POST /users/:target/messages`
  pub async fn send(&self, sender: &str, target: &str, text: &str) -> Result<Message> {
    let resp = self
      .client
      .post(self.messages_url(target, None)?)
      .json(&json!({ "user_id": sender, "text": text }))
      .send()
      .await
      .context("POST /messages failed")?;

    check(resp, "POST /messages")
      .await?
      .json()
      .await
      .context("deserialising message")
  }

  /// `GET /users/:user_id/messages`
  pub async fn read(&self, user_id: &str, mode: ReadMode) -> Result<Vec<Message>> {
    let resp = self
      .client
      .get(self.messages_url(user_id, None)?)
      .query(&mode.query_pairs())
      .send()
      .await
      .context("GET /messages failed")?;

    check(resp, "GET /messages")
      .await?
      .json()
      .await
      .context("deserialising messages")
  }

  /// `DELETE /users/:user_id/messages[/:id]` — uses the single-message route
  /// when exactly one id is given.
  pub async fn delete(&self, user_id: &str, ids: &[MessageId]) -> Result<u64> {
    let req = match ids {
      [id] => self
        .client
        .delete(self.messages_url(user_id, Some(&id.to_string()))?),
      _ => self.client.delete(self.messages_url(user_id, None)?).json(ids),
    };
    let resp = req.send().await.context("DELETE /messages failed")?;

    let deleted: Deleted = check(resp, "DELETE /messages")
      .await?
      .json()
      .await
      .context("deserialising delete result")?;
    Ok(deleted.deleted_count)
  }
}

/// Turn a non-2xx response into an error carrying the server's message.
async fn check(resp: Response, what: &str) -> Result<Response> {
  let status = resp.status();
  if status.is_success() {
    return Ok(resp);
  }
  let body: serde_json::Value = resp.json().await.unwrap_or_default();
  match body.get("error").and_then(serde_json::Value::as_str) {
    Some(message) => Err(anyhow!("{what} → {status}: {message}")),
    None => Err(anyhow!("{what} → {status}")),
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn new_mode_sends_no_params() {
    assert!(ReadMode::New.query_pairs().is_empty());
  }

  #[test]
  fn page_mode_implies_history() {
    let pairs = ReadMode::Page { page: Some(2), page_size: None }.query_pairs();
    assert_eq!(
      pairs,
      vec![
        ("get_old_messages", "true".to_string()),
        ("page", "2".to_string()),
      ]
    );
  }

  #[test]
  fn messages_url_trims_trailing_slash() {
    let client = ApiClient::new("http://localhost:8080/").unwrap();
    assert_eq!(
      client.messages_url("norbert", None).unwrap().as_str(),
      "http://localhost:8080/users/norbert/messages"
    );
  }

  #[test]
  fn messages_url_encodes_segments() {
    let client = ApiClient::new("http://localhost:8080/api").unwrap();
    assert_eq!(
      client.messages_url("a b/c", Some("7")).unwrap().as_str(),
      "http://localhost:8080/api/users/a%20b%2Fc/messages/7"
    );
  }
}

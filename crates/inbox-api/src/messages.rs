//! Handlers for `/users/:user_id/messages` endpoints.
//!
//! | Method   | Path | Notes |
//! |----------|------|-------|
//! | `GET`    | `/users/:user_id/messages` | Optional `get_old_messages`, `page`, `page_size` |
//! | `POST`   | `/users/:user_id/messages` | Body: `{"user_id":"<sender>","text":"..."}`; returns 201 + stored message |
//! | `DELETE` | `/users/:user_id/messages` | Body: JSON array of message ids |
//! | `DELETE` | `/users/:user_id/messages/:message_id` | Single message |
//!
//! Request bodies are parsed as JSON regardless of `Content-Type`.

use std::sync::Arc;

use axum::{
  Json,
  body::Bytes,
  extract::{Path, Query, State},
  http::StatusCode,
  response::IntoResponse,
};
use inbox_core::{
  inbox::{Inbox, InboxQuery},
  message::{Message, NewMessage},
  store::{DEFAULT_PAGE_SIZE, MessageStore},
};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::ApiError;

// ─── List ─────────────────────────────────────────────────────────────────────

/// Raw query parameters; validated by hand so every failure gets a
/// descriptive 400 rather than a generic rejection.
#[derive(Debug, Default)]
pub struct ListParams {
  /// `true` for the full history, `false` (default) for new messages only.
  pub get_old_messages: Option<String>,
  /// Zero-based page; only valid with `get_old_messages=true`.
  pub page:             Option<String>,
  /// Defaults to 10 when `page` is given.
  pub page_size:        Option<String>,
}

impl ListParams {
  /// Collect the known keys from decoded query pairs. A repeated key keeps
  /// its first value; unknown keys are ignored.
  pub fn from_pairs(pairs: Vec<(String, String)>) -> Self {
    let mut params = Self::default();
    for (key, value) in pairs {
      let slot = match key.as_str() {
        "get_old_messages" => &mut params.get_old_messages,
        "page" => &mut params.page,
        "page_size" => &mut params.page_size,
        _ => continue,
      };
      if slot.is_none() {
        *slot = Some(value);
      }
    }
    params
  }

  fn into_query(self, user_id: String) -> Result<InboxQuery, ApiError> {
    let get_old_messages = match self.get_old_messages.as_deref() {
      None | Some("false") => false,
      Some("true") => true,
      Some(_) => {
        return Err(ApiError::bad_request(
          "'get_old_messages' must be [true|false]",
        ));
      }
    };

    let query = InboxQuery::new(user_id);
    let query = if get_old_messages { query.all() } else { query };

    if self.page.is_none() && self.page_size.is_none() {
      return Ok(query);
    }
    if !get_old_messages {
      return Err(ApiError::bad_request(
        "Pagination parameters [page|page_size] can only be used when \
         'get_old_messages=true'",
      ));
    }

    let page = parse_page_param(self.page.as_deref(), 0)?;
    let page_size = parse_page_param(self.page_size.as_deref(), DEFAULT_PAGE_SIZE)?;
    Ok(query.paged(page, page_size))
  }
}

/// An empty value (`page=`) still engages pagination, with `default`.
fn parse_page_param(raw: Option<&str>, default: u32) -> Result<Option<u32>, ApiError> {
  raw
    .map(str::trim)
    .map(|s| if s.is_empty() { Ok(default) } else { s.parse::<u32>() })
    .transpose()
    .map_err(|_| ApiError::bad_request("'page' and 'page_size' must be integers"))
}

/// `GET /users/:user_id/messages[?get_old_messages=true][&page=N][&page_size=N]`
pub async fn list<S>(
  State(inbox): State<Arc<Inbox<S>>>,
  Path(user_id): Path<String>,
  Query(pairs): Query<Vec<(String, String)>>,
) -> Result<Json<Vec<Message>>, ApiError>
where
  S: MessageStore,
{
  let query = ListParams::from_pairs(pairs).into_query(user_id)?;
  let messages = inbox.query(&query).await.map_err(ApiError::store)?;
  Ok(Json(messages))
}

// ─── Create ───────────────────────────────────────────────────────────────────

/// `POST /users/:user_id/messages` — the path names the recipient, the body
/// names the sender.
pub async fn create<S>(
  State(inbox): State<Arc<Inbox<S>>>,
  Path(target): Path<String>,
  body: Bytes,
) -> Result<impl IntoResponse, ApiError>
where
  S: MessageStore,
{
  let body: Value = serde_json::from_slice(&body)
    .map_err(|_| ApiError::bad_request("JSON data must be an object"))?;
  let Value::Object(fields) = body else {
    return Err(ApiError::bad_request("JSON data must be an object"));
  };

  let sender = required_str(&fields, "user_id")?;
  let text = required_str(&fields, "text")?;

  let message = NewMessage::new(sender, target, text)?;
  let stored = inbox.add(message).await.map_err(ApiError::store)?;
  Ok((StatusCode::CREATED, Json(stored)))
}

/// A present, non-empty string field. `null` and `""` count as missing.
fn required_str<'a>(
  fields: &'a serde_json::Map<String, Value>,
  key: &str,
) -> Result<&'a str, ApiError> {
  let missing = || ApiError::bad_request(format!("Missing \"{key}\""));
  match fields.get(key) {
    None | Some(Value::Null) => Err(missing()),
    Some(Value::String(s)) if s.is_empty() => Err(missing()),
    Some(Value::String(s)) => Ok(s.as_str()),
    Some(_) => Err(ApiError::bad_request(format!("\"{key}\" must be a string"))),
  }
}

// ─── Delete ───────────────────────────────────────────────────────────────────

#[derive(Debug, Serialize, Deserialize, PartialEq, Eq)]
pub struct Deleted {
  pub deleted_count: u64,
}

/// `DELETE /users/:user_id/messages` — body: `[1, "2", ...]`.
///
/// Ids that do not belong to `user_id`, do not exist, or are not integers
/// are ignored; the response reports how many messages were removed.
pub async fn delete_many<S>(
  State(inbox): State<Arc<Inbox<S>>>,
  Path(user_id): Path<String>,
  body: Bytes,
) -> Result<Json<Deleted>, ApiError>
where
  S: MessageStore,
{
  let not_an_array =
    || ApiError::bad_request("JSON data must be an array with \"message_id\"");
  let body: Value = serde_json::from_slice(&body).map_err(|_| not_an_array())?;
  let Value::Array(ids) = body else {
    return Err(not_an_array());
  };

  let deleted_count = inbox
    .delete(&user_id, &ids)
    .await
    .map_err(ApiError::store)?;
  Ok(Json(Deleted { deleted_count }))
}

/// `DELETE /users/:user_id/messages/:message_id`
pub async fn delete_one<S>(
  State(inbox): State<Arc<Inbox<S>>>,
  Path((user_id, message_id)): Path<(String, String)>,
) -> Result<Json<Deleted>, ApiError>
where
  S: MessageStore,
{
  let deleted_count = inbox
    .delete_one(&user_id, &message_id)
    .await
    .map_err(ApiError::store)?;
  Ok(Json(Deleted { deleted_count }))
}

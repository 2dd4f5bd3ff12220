//! Message — the immutable unit stored in the ledger.
//!
//! A message is written once by [`MessageStore::append`] and is never
//! updated afterwards; the only mutation the ledger knows is a hard delete.
//!
//! [`MessageStore::append`]: crate::store::MessageStore::append

use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::{Error, Result};

/// Maximum length, in characters, of a sender or target identifier.
pub const MAX_USER_ID_LEN: usize = 100;

// ─── Identifier ──────────────────────────────────────────────────────────────

/// Ledger-assigned message identifier. Monotonically increasing.
#[derive(
  Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
#[serde(transparent)]
pub struct MessageId(pub i64);

impl MessageId {
  /// Parse an id from a path segment or JSON string.
  ///
  /// Surrounding whitespace is ignored. Anything that is not an integer
  /// yields `None`.
  pub fn parse(s: &str) -> Option<Self> { s.trim().parse().ok().map(Self) }

  /// Normalise an id-like JSON value into a [`MessageId`].
  ///
  /// Integers and strings holding an integer are accepted; every other value
  /// (floats, booleans, objects, `null`) cannot name a message and yields
  /// `None`.
  pub fn normalize(value: &serde_json::Value) -> Option<Self> {
    match value {
      serde_json::Value::Number(n) => n.as_i64().map(Self),
      serde_json::Value::String(s) => Self::parse(s),
      _ => None,
    }
  }
}

impl fmt::Display for MessageId {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result { self.0.fmt(f) }
}

// ─── Stored record ───────────────────────────────────────────────────────────

/// A message as persisted in the ledger.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Message {
  pub id:        MessageId,
  /// The authoring user.
  pub sender:    String,
  /// The recipient; decides who can see and delete this message.
  pub target:    String,
  pub text:      String,
  /// Assigned by the ledger at write time, never client-supplied.
  pub sent_time: DateTime<Utc>,
}

// ─── Input ───────────────────────────────────────────────────────────────────

/// A validated message waiting to be appended to the ledger.
///
/// Fields are private so that every instance has passed
/// [`NewMessage::new`]'s checks.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewMessage {
  sender: String,
  target: String,
  text:   String,
}

impl NewMessage {
  /// Validate and build a new message.
  ///
  /// `sender` and `target` must be non-empty and at most
  /// [`MAX_USER_ID_LEN`] characters; `text` must be non-empty.
  pub fn new(
    sender: impl Into<String>,
    target: impl Into<String>,
    text: impl Into<String>,
  ) -> Result<Self> {
    let sender = sender.into();
    let target = target.into();
    let text = text.into();

    check_user_id("sender", &sender)?;
    check_user_id("target", &target)?;
    if text.is_empty() {
      return Err(Error::EmptyField("text"));
    }

    Ok(Self { sender, target, text })
  }

  pub fn sender(&self) -> &str { &self.sender }

  pub fn target(&self) -> &str { &self.target }

  pub fn text(&self) -> &str { &self.text }

  /// Split into `(sender, target, text)`.
  pub fn into_parts(self) -> (String, String, String) {
    (self.sender, self.target, self.text)
  }
}

fn check_user_id(field: &'static str, value: &str) -> Result<()> {
  if value.is_empty() {
    return Err(Error::EmptyField(field));
  }
  if value.chars().count() > MAX_USER_ID_LEN {
    return Err(Error::FieldTooLong { field, max: MAX_USER_ID_LEN });
  }
  Ok(())
}

#[cfg(test)]
mod tests {
  use serde_json::json;

  use super::*;

  #[test]
  fn new_message_accepts_valid_input() {
    let msg = NewMessage::new("albert", "norbert", "hi").unwrap();
    assert_eq!(msg.sender(), "albert");
    assert_eq!(msg.target(), "norbert");
    assert_eq!(msg.text(), "hi");
  }

  #[test]
  fn new_message_rejects_empty_fields() {
    assert_eq!(
      NewMessage::new("", "norbert", "hi"),
      Err(Error::EmptyField("sender"))
    );
    assert_eq!(
      NewMessage::new("albert", "", "hi"),
      Err(Error::EmptyField("target"))
    );
    assert_eq!(
      NewMessage::new("albert", "norbert", ""),
      Err(Error::EmptyField("text"))
    );
  }

  #[test]
  fn new_message_rejects_long_identifiers() {
    let long = "x".repeat(MAX_USER_ID_LEN + 1);
    assert_eq!(
      NewMessage::new(long.as_str(), "norbert", "hi"),
      Err(Error::FieldTooLong { field: "sender", max: MAX_USER_ID_LEN })
    );

    // Exactly at the limit is fine, and the limit counts chars, not bytes.
    let at_limit = "é".repeat(MAX_USER_ID_LEN);
    assert!(NewMessage::new("albert", at_limit, "hi").is_ok());
  }

  #[test]
  fn message_id_normalize() {
    assert_eq!(MessageId::normalize(&json!(7)), Some(MessageId(7)));
    assert_eq!(MessageId::normalize(&json!("7")), Some(MessageId(7)));
    assert_eq!(MessageId::normalize(&json!(" 42 ")), Some(MessageId(42)));
    assert_eq!(MessageId::normalize(&json!("abc")), None);
    assert_eq!(MessageId::normalize(&json!(1.5)), None);
    assert_eq!(MessageId::normalize(&json!(null)), None);
    assert_eq!(MessageId::normalize(&json!([1])), None);
  }

  #[test]
  fn message_serializes_with_flat_id() {
    let msg = Message {
      id:        MessageId(3),
      sender:    "albert".into(),
      target:    "norbert".into(),
      text:      "hi".into(),
      sent_time: DateTime::parse_from_rfc3339("2024-01-02T03:04:05Z")
        .unwrap()
        .with_timezone(&Utc),
    };
    let value = serde_json::to_value(&msg).unwrap();
    assert_eq!(value["id"], json!(3));
    assert_eq!(value["sent_time"], json!("2024-01-02T03:04:05Z"));
  }
}

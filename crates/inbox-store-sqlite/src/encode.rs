//! Encoding and decoding helpers between Rust domain types and the plain-text
//! representations stored in SQLite columns.
//!
//! Timestamps are stored as RFC 3339 UTC strings with a fixed microsecond
//! width, so that comparing and ordering the text matches comparing and
//! ordering the instants.

use chrono::{DateTime, SecondsFormat, Utc};
use inbox_core::{
  cursor::ReadCursor,
  message::{Message, MessageId},
};

use crate::{Error, Result};

// ─── DateTime<Utc> ───────────────────────────────────────────────────────────

pub fn encode_dt(dt: DateTime<Utc>) -> String {
  dt.to_rfc3339_opts(SecondsFormat::Micros, true)
}

pub fn decode_dt(s: &str) -> Result<DateTime<Utc>> {
  DateTime::parse_from_rfc3339(s)
    .map(|dt| dt.with_timezone(&Utc))
    .map_err(|e| Error::DateParse(e.to_string()))
}

// ─── Row types ───────────────────────────────────────────────────────────────

/// Raw values read directly from a `messages` row.
pub struct RawMessage {
  pub id:        i64,
  pub sender:    String,
  pub target:    String,
  pub text:      String,
  pub sent_time: String,
}

impl RawMessage {
  pub fn from_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<Self> {
    Ok(Self {
      id:        row.get(0)?,
      sender:    row.get(1)?,
      target:    row.get(2)?,
      text:      row.get(3)?,
      sent_time: row.get(4)?,
    })
  }

  pub fn into_message(self) -> Result<Message> {
    Ok(Message {
      id:        MessageId(self.id),
      sender:    self.sender,
      target:    self.target,
      text:      self.text,
      sent_time: decode_dt(&self.sent_time)?,
    })
  }
}

/// Raw values read directly from a `read_cursors` row.
pub struct RawCursor {
  pub user_id:             String,
  pub last_read_timestamp: Option<String>,
}

impl RawCursor {
  pub fn into_cursor(self) -> Result<ReadCursor> {
    Ok(ReadCursor {
      user_id:             self.user_id,
      last_read_timestamp: self
        .last_read_timestamp
        .as_deref()
        .map(decode_dt)
        .transpose()?,
    })
  }
}

//! [`SqliteStore`] — the SQLite implementation of [`MessageStore`].

use std::path::Path;

use chrono::{DateTime, Duration, SubsecRound as _, Utc};
use rusqlite::{OptionalExtension as _, ToSql};

use inbox_core::{
  cursor::ReadCursor,
  message::{Message, MessageId, NewMessage},
  store::{MessageScan, MessageStore},
};

use crate::{
  encode::{decode_dt, encode_dt, RawCursor, RawMessage},
  schema::SCHEMA,
  Result,
};

/// Ids bound per `DELETE` statement; keeps well under SQLite's host
/// parameter limit.
const DELETE_CHUNK: usize = 500;

// ─── Store ───────────────────────────────────────────────────────────────────

/// An inbox store backed by a single SQLite file.
///
/// Cloning is cheap — the inner connection is reference-counted.
#[derive(Clone)]
pub struct SqliteStore {
  conn: tokio_rusqlite::Connection,
}

impl SqliteStore {
  /// Open (or create) a store at `path` and run schema initialisation.
  pub async fn open(path: impl AsRef<Path>) -> Result<Self> {
    let conn = tokio_rusqlite::Connection::open(path).await?;
    let store = Self { conn };
    store.init_schema().await?;
    Ok(store)
  }

  /// Open an in-memory store — useful for testing.
  pub async fn open_in_memory() -> Result<Self> {
    let conn = tokio_rusqlite::Connection::open_in_memory().await?;
    let store = Self { conn };
    store.init_schema().await?;
    Ok(store)
  }

  async fn init_schema(&self) -> Result<()> {
    self
      .conn
      .call(|conn| {
        conn.execute_batch(SCHEMA)?;
        Ok(())
      })
      .await?;
    Ok(())
  }
}

/// Pick a `sent_time` for a new message: the current instant, or one
/// microsecond past the newest stored message if the clock has not moved
/// beyond it. Keeps ledger order and time order identical.
fn next_sent_time(
  now: DateTime<Utc>,
  newest: Option<DateTime<Utc>>,
) -> DateTime<Utc> {
  match newest {
    Some(newest) if newest >= now => newest + Duration::microseconds(1),
    _ => now,
  }
}

// ─── MessageStore impl ───────────────────────────────────────────────────────

impl MessageStore for SqliteStore {
  type Error = crate::Error;

  // ── Ledger ────────────────────────────────────────────────────────────────

  async fn append(&self, message: NewMessage) -> Result<Message> {
    let now = Utc::now().trunc_subsecs(6);
    let (sender, target, text) = message.into_parts();
    let (sender_c, target_c, text_c) = (sender.clone(), target.clone(), text.clone());

    let (id, sent_time_str): (i64, String) = self
      .conn
      .call(move |conn| {
        let tx = conn.transaction()?;

        let newest: Option<String> =
          tx.query_row("SELECT MAX(sent_time) FROM messages", [], |r| r.get(0))?;
        let newest = newest
          .as_deref()
          .map(decode_dt)
          .transpose()
          .map_err(|e| tokio_rusqlite::Error::Other(Box::new(e)))?;
        let sent_time_str = encode_dt(next_sent_time(now, newest));

        tx.execute(
          "INSERT INTO messages (sender, target, text, sent_time)
           VALUES (?1, ?2, ?3, ?4)",
          rusqlite::params![sender_c, target_c, text_c, sent_time_str],
        )?;
        let id = tx.last_insert_rowid();
        tx.commit()?;

        Ok((id, sent_time_str))
      })
      .await?;

    Ok(Message {
      id: MessageId(id),
      sender,
      target,
      text,
      sent_time: decode_dt(&sent_time_str)?,
    })
  }

  async fn scan<'a>(&'a self, scan: &'a MessageScan) -> Result<Vec<Message>> {
    let target = scan.target.clone();
    let sent_after = scan.sent_after.map(encode_dt);
    // SQLite treats a negative LIMIT as "no limit".
    let (limit, offset) = match scan.window {
      Some(w) => (
        i64::try_from(w.limit()).unwrap_or(i64::MAX),
        i64::try_from(w.offset()).unwrap_or(i64::MAX),
      ),
      None => (-1, 0),
    };

    let raws: Vec<RawMessage> = self
      .conn
      .call(move |conn| {
        let mut stmt = conn.prepare(
          "SELECT id, sender, target, text, sent_time
           FROM messages
           WHERE target = ?1
             AND (?2 IS NULL OR sent_time > ?2)
           ORDER BY sent_time ASC, id ASC
           LIMIT ?3 OFFSET ?4",
        )?;
        let rows = stmt
          .query_map(
            rusqlite::params![target, sent_after, limit, offset],
            RawMessage::from_row,
          )?
          .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(rows)
      })
      .await?;

    raws.into_iter().map(RawMessage::into_message).collect()
  }

  async fn delete_by_ids<'a>(
    &'a self,
    target: &'a str,
    ids: &'a [MessageId],
  ) -> Result<u64> {
    if ids.is_empty() {
      return Ok(0);
    }
    let target = target.to_owned();
    let ids: Vec<i64> = ids.iter().map(|id| id.0).collect();

    let deleted: usize = self
      .conn
      .call(move |conn| {
        let tx = conn.transaction()?;
        let mut deleted = 0;
        for chunk in ids.chunks(DELETE_CHUNK) {
          let placeholders = vec!["?"; chunk.len()].join(", ");
          let sql = format!(
            "DELETE FROM messages WHERE target = ? AND id IN ({placeholders})"
          );
          let mut params: Vec<&dyn ToSql> = Vec::with_capacity(chunk.len() + 1);
          params.push(&target);
          params.extend(chunk.iter().map(|id| id as &dyn ToSql));
          deleted += tx.execute(&sql, params.as_slice())?;
        }
        tx.commit()?;
        Ok(deleted)
      })
      .await?;

    Ok(deleted as u64)
  }

  // ── Read cursors ──────────────────────────────────────────────────────────

  async fn get_cursor<'a>(&'a self, user_id: &'a str) -> Result<Option<ReadCursor>> {
    let user_id = user_id.to_owned();

    let raw: Option<RawCursor> = self
      .conn
      .call(move |conn| {
        Ok(conn
          .query_row(
            "SELECT user_id, last_message_read_timestamp
             FROM read_cursors WHERE user_id = ?1",
            rusqlite::params![user_id],
            |row| {
              Ok(RawCursor {
                user_id:             row.get(0)?,
                last_read_timestamp: row.get(1)?,
              })
            },
          )
          .optional()?)
      })
      .await?;

    raw.map(RawCursor::into_cursor).transpose()
  }

  async fn advance_cursor<'a>(
    &'a self,
    user_id: &'a str,
    timestamp: DateTime<Utc>,
  ) -> Result<ReadCursor> {
    let cursor = ReadCursor {
      user_id:             user_id.to_owned(),
      last_read_timestamp: Some(timestamp),
    };

    let user_id = cursor.user_id.clone();
    let at_str = encode_dt(timestamp);

    self
      .conn
      .call(move |conn| {
        conn.execute(
          "INSERT INTO read_cursors (user_id, last_message_read_timestamp)
           VALUES (?1, ?2)
           ON CONFLICT (user_id)
           DO UPDATE SET last_message_read_timestamp = excluded.last_message_read_timestamp",
          rusqlite::params![user_id, at_str],
        )?;
        Ok(())
      })
      .await?;

    Ok(cursor)
  }

  // ── Health ────────────────────────────────────────────────────────────────

  async fn ping(&self) -> Result<()> {
    self
      .conn
      .call(|conn| {
        conn.query_row("SELECT 1", [], |r| r.get::<_, i64>(0))?;
        Ok(())
      })
      .await?;
    Ok(())
  }
}

#[cfg(test)]
mod tests {
  use chrono::TimeZone as _;

  use super::*;

  #[test]
  fn next_sent_time_uses_clock_when_ahead() {
    let now = Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 1).unwrap();
    let newest = Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap();
    assert_eq!(next_sent_time(now, Some(newest)), now);
    assert_eq!(next_sent_time(now, None), now);
  }

  #[test]
  fn next_sent_time_steps_past_newest() {
    let now = Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap();
    assert_eq!(
      next_sent_time(now, Some(now)),
      now + Duration::microseconds(1)
    );

    let ahead = now + Duration::seconds(5);
    assert_eq!(
      next_sent_time(now, Some(ahead)),
      ahead + Duration::microseconds(1)
    );
  }
}

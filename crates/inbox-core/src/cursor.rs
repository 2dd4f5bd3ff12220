//! Read cursors — the per-user delivery watermark.
//!
//! A cursor records the `sent_time` of the newest message handed to a
//! recipient. Default-mode queries only return messages strictly newer than
//! it. Cursors are created lazily by the first query that returns anything
//! and are never deleted.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReadCursor {
  pub user_id:             String,
  /// Nullable in storage; `None` reads the same as having no cursor.
  pub last_read_timestamp: Option<DateTime<Utc>>,
}

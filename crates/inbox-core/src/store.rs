//! The `MessageStore` trait and supporting query types.
//!
//! The trait is implemented by storage backends (e.g. `inbox-store-sqlite`).
//! It covers two independent tables that share the user-id namespace: the
//! message ledger and the read-cursor tracker. Retrieval policy lives one
//! level up, in [`Inbox`](crate::inbox::Inbox).

use std::future::Future;

use chrono::{DateTime, Utc};

use crate::{
  cursor::ReadCursor,
  message::{Message, MessageId, NewMessage},
};

/// Page size used when a caller asks for a page without saying how big.
pub const DEFAULT_PAGE_SIZE: u32 = 10;

// ─── Query types ─────────────────────────────────────────────────────────────

/// A window over a target's ordered history.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Pagination {
  /// Zero-based page number.
  pub page:      u32,
  pub page_size: u32,
}

impl Pagination {
  /// Engage pagination if either part was supplied, filling in the other
  /// with its default (page `0`, size [`DEFAULT_PAGE_SIZE`]).
  pub fn from_parts(page: Option<u32>, page_size: Option<u32>) -> Option<Self> {
    if page.is_none() && page_size.is_none() {
      return None;
    }
    Some(Self {
      page:      page.unwrap_or(0),
      page_size: page_size.unwrap_or(DEFAULT_PAGE_SIZE),
    })
  }

  pub fn offset(&self) -> u64 { u64::from(self.page) * u64::from(self.page_size) }

  pub fn limit(&self) -> u64 { u64::from(self.page_size) }
}

/// Parameters for [`MessageStore::scan`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MessageScan {
  /// Only messages addressed to this user are returned.
  pub target:     String,
  /// Keep only messages with `sent_time` strictly after this instant.
  pub sent_after: Option<DateTime<Utc>>,
  /// Applied after ordering and after `sent_after`.
  pub window:     Option<Pagination>,
}

impl MessageScan {
  /// The full history of `target`, oldest first.
  pub fn history(target: impl Into<String>) -> Self {
    Self { target: target.into(), sent_after: None, window: None }
  }
}

// ─── Trait ───────────────────────────────────────────────────────────────────

/// Abstraction over an inbox storage backend.
///
/// Messages are immutable once appended. Deletion is always scoped to a
/// target, so knowing an id is not enough to remove somebody else's message.
///
/// All methods return `Send` futures so the trait can be used in
/// multi-threaded async runtimes (e.g. tokio with `axum`).
pub trait MessageStore: Send + Sync {
  type Error: std::error::Error + Send + Sync + 'static;

  // ── Ledger ────────────────────────────────────────────────────────────

  /// Persist a new message. The store assigns `id` and `sent_time`.
  fn append(
    &self,
    message: NewMessage,
  ) -> impl Future<Output = Result<Message, Self::Error>> + Send + '_;

  /// Return the messages matching `scan`, ordered by ascending `sent_time`
  /// (ties broken by id).
  fn scan<'a>(
    &'a self,
    scan: &'a MessageScan,
  ) -> impl Future<Output = Result<Vec<Message>, Self::Error>> + Send + 'a;

  /// Delete the messages in `ids` that are addressed to `target`.
  ///
  /// Returns how many rows were removed. Unknown ids and ids addressed to
  /// someone else are ignored, not reported as errors.
  fn delete_by_ids<'a>(
    &'a self,
    target: &'a str,
    ids: &'a [MessageId],
  ) -> impl Future<Output = Result<u64, Self::Error>> + Send + 'a;

  // ── Read cursors ──────────────────────────────────────────────────────

  /// Retrieve the cursor for `user_id`. Returns `None` if none exists yet.
  fn get_cursor<'a>(
    &'a self,
    user_id: &'a str,
  ) -> impl Future<Output = Result<Option<ReadCursor>, Self::Error>> + Send + 'a;

  /// Create or overwrite the cursor for `user_id`.
  ///
  /// The new timestamp is stored as given, even if it is earlier than the
  /// current one.
  fn advance_cursor<'a>(
    &'a self,
    user_id: &'a str,
    timestamp: DateTime<Utc>,
  ) -> impl Future<Output = Result<ReadCursor, Self::Error>> + Send + 'a;

  // ── Health ────────────────────────────────────────────────────────────

  /// Round-trip to the backend without touching any data.
  fn ping(&self) -> impl Future<Output = Result<(), Self::Error>> + Send + '_;
}

//! The inbox query engine.
//!
//! [`Inbox`] composes the ledger and the cursor tracker of a
//! [`MessageStore`] into the three operations callers see: add, query and
//! delete.
//!
//! Every query that returns at least one message moves the recipient's
//! cursor to the newest `sent_time` it returned. That holds for full-history
//! and paginated queries too, which means reading an old page can move the
//! cursor backwards and make already-delivered messages "new" again.

use std::{
  collections::{BTreeSet, HashMap},
  sync::{Arc, Mutex, PoisonError},
};

use tokio::sync::{Mutex as AsyncMutex, OwnedMutexGuard};

use crate::{
  message::{Message, MessageId, NewMessage},
  store::{MessageScan, MessageStore, Pagination},
};

// ─── Query type ──────────────────────────────────────────────────────────────

/// Parameters for [`Inbox::query`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InboxQuery {
  pub user_id:          String,
  /// Return the full history instead of only what arrived since the last
  /// delivery.
  pub get_old_messages: bool,
  pub page:             Option<u32>,
  pub page_size:        Option<u32>,
}

impl InboxQuery {
  /// A default-mode query: only new messages, no pagination.
  pub fn new(user_id: impl Into<String>) -> Self {
    Self {
      user_id:          user_id.into(),
      get_old_messages: false,
      page:             None,
      page_size:        None,
    }
  }

  /// Ask for the full history.
  pub fn all(mut self) -> Self {
    self.get_old_messages = true;
    self
  }

  /// Ask for one page of the full history.
  pub fn paged(mut self, page: Option<u32>, page_size: Option<u32>) -> Self {
    self.get_old_messages = true;
    self.page = page;
    self.page_size = page_size;
    self
  }

  pub fn pagination(&self) -> Option<Pagination> {
    Pagination::from_parts(self.page, self.page_size)
  }

  /// Whether the read cursor restricts the result. Only default-mode
  /// queries are filtered; asking for a page counts as asking for history
  /// even if `get_old_messages` was left unset.
  pub fn applies_cursor_filter(&self) -> bool {
    !self.get_old_messages && self.pagination().is_none()
  }
}

// ─── Engine ──────────────────────────────────────────────────────────────────

/// The inbox retrieval policy over a [`MessageStore`].
///
/// Queries for the same user are serialised so that two concurrent polls
/// cannot both read the same stale cursor and deliver the same messages
/// twice. Queries for different users never wait on each other.
pub struct Inbox<S> {
  store:       Arc<S>,
  query_locks: Mutex<HashMap<String, Arc<AsyncMutex<()>>>>,
}

impl<S: MessageStore> Inbox<S> {
  pub fn new(store: Arc<S>) -> Self {
    Self { store, query_locks: Mutex::new(HashMap::new()) }
  }

  /// The underlying store.
  pub fn store(&self) -> &Arc<S> { &self.store }

  /// Append a message to `message.target()`'s inbox.
  pub async fn add(&self, message: NewMessage) -> Result<Message, S::Error> {
    let stored = self.store.append(message).await?;
    tracing::debug!(
      id = %stored.id,
      sender = %stored.sender,
      target = %stored.target,
      "message appended"
    );
    Ok(stored)
  }

  /// Retrieve messages addressed to `query.user_id`.
  ///
  /// Messages come back oldest first. A non-empty result advances the
  /// user's cursor to the newest returned `sent_time`.
  pub async fn query(&self, query: &InboxQuery) -> Result<Vec<Message>, S::Error> {
    let _guard = self.lock_user(&query.user_id).await;

    let sent_after = if query.applies_cursor_filter() {
      self
        .store
        .get_cursor(&query.user_id)
        .await?
        .and_then(|cursor| cursor.last_read_timestamp)
    } else {
      None
    };

    let scan = MessageScan {
      target: query.user_id.clone(),
      sent_after,
      window: query.pagination(),
    };
    let messages = self.store.scan(&scan).await?;

    if let Some(latest) = messages.iter().map(|m| m.sent_time).max() {
      self.store.advance_cursor(&query.user_id, latest).await?;
      tracing::debug!(
        user_id = %query.user_id,
        delivered = messages.len(),
        cursor = %latest,
        "read cursor advanced"
      );
    }

    Ok(messages)
  }

  /// Delete messages addressed to `user_id` whose ids appear in `ids`.
  ///
  /// Ids are normalised with [`MessageId::normalize`]; values that cannot
  /// name a message are skipped. Returns the number of messages removed.
  pub async fn delete<'v>(
    &self,
    user_id: &str,
    ids: impl IntoIterator<Item = &'v serde_json::Value>,
  ) -> Result<u64, S::Error> {
    let ids: BTreeSet<MessageId> =
      ids.into_iter().filter_map(MessageId::normalize).collect();
    self.delete_normalized(user_id, ids).await
  }

  /// Delete a single message named by a path segment.
  pub async fn delete_one(&self, user_id: &str, id: &str) -> Result<u64, S::Error> {
    self
      .delete_normalized(user_id, MessageId::parse(id).into_iter().collect())
      .await
  }

  async fn delete_normalized(
    &self,
    user_id: &str,
    ids: BTreeSet<MessageId>,
  ) -> Result<u64, S::Error> {
    if ids.is_empty() {
      return Ok(0);
    }
    let ids: Vec<MessageId> = ids.into_iter().collect();
    let deleted = self.store.delete_by_ids(user_id, &ids).await?;
    tracing::debug!(
      user_id = %user_id,
      requested = ids.len(),
      deleted,
      "messages deleted"
    );
    Ok(deleted)
  }

  async fn lock_user(&self, user_id: &str) -> OwnedMutexGuard<()> {
    let lock = {
      let mut locks =
        self.query_locks.lock().unwrap_or_else(PoisonError::into_inner);
      // Drop locks nobody else holds or waits on.
      locks.retain(|_, lock| Arc::strong_count(lock) > 1);
      Arc::clone(locks.entry(user_id.to_owned()).or_default())
    };
    lock.lock_owned().await
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn default_query_applies_cursor_filter() {
    let q = InboxQuery::new("norbert");
    assert!(q.applies_cursor_filter());
    assert_eq!(q.pagination(), None);
  }

  #[test]
  fn history_query_skips_cursor_filter() {
    assert!(!InboxQuery::new("norbert").all().applies_cursor_filter());
  }

  #[test]
  fn pagination_alone_switches_to_history() {
    let q = InboxQuery {
      page_size: Some(3),
      ..InboxQuery::new("norbert")
    };
    assert!(!q.get_old_messages);
    assert!(!q.applies_cursor_filter());
    assert_eq!(q.pagination(), Some(Pagination { page: 0, page_size: 3 }));
  }

  #[test]
  fn paged_sets_history_mode() {
    let q = InboxQuery::new("norbert").paged(Some(1), None);
    assert!(q.get_old_messages);
    assert_eq!(q.pagination().map(|p| p.offset()), Some(10));
  }
}

//! JSON REST API for the inbox service.
//!
//! Exposes an axum [`Router`] backed by an [`Inbox`] over any
//! [`MessageStore`]. User ids are taken from the path as asserted by the
//! caller; authentication, TLS and transport concerns are the caller's
//! responsibility.
//!
//! # Mounting
//!
//! ```rust,ignore
//! let app = inbox_api::api_router(Arc::new(Inbox::new(store)));
//! ```

pub mod error;
pub mod health;
pub mod messages;

use std::sync::Arc;

use axum::{
  Router,
  routing::{delete, get},
};
use inbox_core::{inbox::Inbox, store::MessageStore};

pub use error::ApiError;

/// Build a fully-materialised API router for `inbox`.
///
/// The returned `Router<()>` can be nested or layered by the caller
/// regardless of its own state type.
pub fn api_router<S>(inbox: Arc<Inbox<S>>) -> Router<()>
where
  S: MessageStore + 'static,
{
  Router::new()
    .route(
      "/users/{user_id}/messages",
      get(messages::list::<S>)
        .post(messages::create::<S>)
        .delete(messages::delete_many::<S>),
    )
    .route(
      "/users/{user_id}/messages/{message_id}",
      delete(messages::delete_one::<S>),
    )
    .route("/healthcheck", get(health::healthcheck::<S>))
    .route("/environment", get(health::environment))
    .with_state(inbox)
}

// ─── Integration tests ────────────────────────────────────────────────────────

//! Core types and trait definitions for the inbox service.
//!
//! This crate is deliberately free of HTTP and database dependencies.
//! All other crates depend on it; storage backends implement
//! [`store::MessageStore`] and every surface goes through [`inbox::Inbox`].

pub mod cursor;
pub mod error;
pub mod inbox;
pub mod message;
pub mod store;

pub use error::{Error, Result};

//! Error types for `inbox-core`.

use thiserror::Error;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum Error {
  #[error("{0} must not be empty")]
  EmptyField(&'static str),

  #[error("{field} must be at most {max} characters")]
  FieldTooLong { field: &'static str, max: usize },
}

pub type Result<T, E = Error> = std::result::Result<T, E>;

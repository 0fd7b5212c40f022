//! Error types for `padron-core`.
//!
//! [`Error`] carries the *kind* of failure so the HTTP layer can choose a
//! status code without inspecting message text.

use thiserror::Error;
use uuid::Uuid;

/// A field-level validation failure. The message is shown to end users.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
  #[error("first name must contain only letters and be at most 30 characters")]
  FirstName,

  #[error("middle name must contain only letters and be at most 30 characters")]
  MiddleName,

  #[error("surnames must contain only letters and be at most 60 characters")]
  LastName,

  #[error("document number must be 1 to 10 digits")]
  DocumentNumber,

  #[error("unknown document type: {0:?}")]
  DocumentType(String),

  #[error("gender must be one of: Masculino, Femenino, No binario, Prefiero no reportar")]
  Gender,

  #[error("invalid email address format")]
  Email,

  #[error("phone number must have 10 digits, optionally prefixed with +country code")]
  Phone,

  #[error("invalid birth date: {0:?}")]
  BirthDate(String),

  #[error("birth date cannot be in the future")]
  BirthDateInFuture,

  #[error("the person must be at least 1 year old")]
  TooYoung,
}

#[derive(Debug, Error)]
pub enum Error {
  #[error("persona not found: {0}")]
  NotFound(Uuid),

  #[error(transparent)]
  Validation(#[from] ValidationError),

  #[error("a persona with document number {0} already exists")]
  DuplicateDocument(String),

  #[error("storage error: {0}")]
  Storage(#[source] Box<dyn std::error::Error + Send + Sync>),
}

impl Error {
  /// Wrap any backend failure as [`Error::Storage`].
  pub fn storage(e: impl std::error::Error + Send + Sync + 'static) -> Self {
    Self::Storage(Box::new(e))
  }
}

pub type Result<T, E = Error> = std::result::Result<T, E>;

//! The `PersonaStore` and `LogStore` traits and supporting query types.
//!
//! The traits are implemented by storage backends (`padron-store-sqlite`,
//! and the in-memory [`crate::memory::MemoryStore`]). Validation and
//! uniqueness rules live in [`crate::service`]; stores only persist.

use std::future::Future;

use chrono::{DateTime, Utc};
use uuid::Uuid;

use crate::{
  log::{LogEntry, LogQuery, LogStats},
  persona::{Gender, Persona},
};

// ─── Query type ──────────────────────────────────────────────────────────────

/// Parameters for [`PersonaStore::search_personas`]. All filters combine
/// with AND; an empty query matches everything.
#[derive(Debug, Clone, Default)]
pub struct PersonaQuery {
  /// Exact document number.
  pub document_number: Option<String>,
  pub gender:          Option<Gender>,
  /// Substring of the surname(s), ignoring case and Spanish accents.
  pub last_name:       Option<String>,
}

impl PersonaQuery {
  pub fn is_empty(&self) -> bool {
    self.document_number.is_none()
      && self.gender.is_none()
      && self.last_name.is_none()
  }

  pub fn matches(&self, persona: &Persona) -> bool {
    if let Some(doc) = &self.document_number
      && persona.document_number != *doc
    {
      return false;
    }
    if let Some(g) = self.gender
      && persona.gender != g
    {
      return false;
    }
    if let Some(ln) = &self.last_name
      && !fold(&persona.last_name).contains(&fold(ln))
    {
      return false;
    }
    true
  }
}

/// Lowercase and strip the accents used in Spanish names.
fn fold(text: &str) -> String {
  text
    .chars()
    .flat_map(char::to_lowercase)
    .map(|c| match c {
      'á' | 'à' | 'ä' | 'â' => 'a',
      'é' | 'è' | 'ë' | 'ê' => 'e',
      'í' | 'ì' | 'ï' | 'î' => 'i',
      'ó' | 'ò' | 'ö' | 'ô' => 'o',
      'ú' | 'ù' | 'ü' | 'û' => 'u',
      other => other,
    })
    .collect()
}

// ─── Persona store ───────────────────────────────────────────────────────────

/// Abstraction over the primary persona store.
///
/// All methods return `Send` futures so the trait can be used in
/// multi-threaded async runtimes (e.g. tokio with `axum`).
pub trait PersonaStore: Send + Sync {
  /// Backend errors convert into the core [`crate::Error`] so callers can
  /// branch on the error kind.
  type Error: std::error::Error + Into<crate::Error> + Send + Sync + 'static;

  /// Persist a new persona. Fails with [`crate::Error::DuplicateDocument`]
  /// if the backend enforces document uniqueness and the number is taken.
  fn insert_persona(
    &self,
    persona: Persona,
  ) -> impl Future<Output = Result<Persona, Self::Error>> + Send + '_;

  /// Retrieve a persona by id. Returns `None` if not found.
  fn get_persona(
    &self,
    id: Uuid,
  ) -> impl Future<Output = Result<Option<Persona>, Self::Error>> + Send + '_;

  /// Look up the persona holding `number`, if any.
  fn find_by_document<'a>(
    &'a self,
    number: &'a str,
  ) -> impl Future<Output = Result<Option<Persona>, Self::Error>> + Send + 'a;

  /// All personas, most recently created first.
  fn list_personas(
    &self,
  ) -> impl Future<Output = Result<Vec<Persona>, Self::Error>> + Send + '_;

  /// Personas matching `query`, most recently created first.
  fn search_personas<'a>(
    &'a self,
    query: &'a PersonaQuery,
  ) -> impl Future<Output = Result<Vec<Persona>, Self::Error>> + Send + 'a;

  /// Overwrite the stored persona with the same id. Returns `false` if no
  /// such persona exists.
  fn replace_persona(
    &self,
    persona: Persona,
  ) -> impl Future<Output = Result<bool, Self::Error>> + Send + '_;

  /// Remove a persona. Returns `false` if no such persona exists.
  fn delete_persona(
    &self,
    id: Uuid,
  ) -> impl Future<Output = Result<bool, Self::Error>> + Send + '_;
}

// ─── Log store ───────────────────────────────────────────────────────────────

/// Abstraction over an append-only journal of [`LogEntry`] records.
pub trait LogStore: Send + Sync {
  type Error: std::error::Error + Send + Sync + 'static;

  /// Cheap health probe. `Ok` means the store can currently serve requests.
  fn ping(&self) -> impl Future<Output = Result<(), Self::Error>> + Send + '_;

  /// Append one entry exactly as given.
  fn append_log(
    &self,
    entry: LogEntry,
  ) -> impl Future<Output = Result<(), Self::Error>> + Send + '_;

  /// Entries matching `query` (see [`LogQuery::matches`]), newest first,
  /// truncated to `query.limit`.
  fn query_logs<'a>(
    &'a self,
    query: &'a LogQuery,
  ) -> impl Future<Output = Result<Vec<LogEntry>, Self::Error>> + Send + 'a;

  /// Totals over the whole journal; `since` bounds the `since` counter.
  fn log_stats(
    &self,
    since: DateTime<Utc>,
  ) -> impl Future<Output = Result<LogStats, Self::Error>> + Send + '_;
}

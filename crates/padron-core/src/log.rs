//! Audit journal types.
//!
//! A [`LogEntry`] records one mutating or query operation. Entries are
//! append-only: nothing in the application updates or deletes them.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

// ─── Labels ──────────────────────────────────────────────────────────────────

/// The operation a log entry describes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum LogAction {
  #[serde(rename = "Crear Persona")]
  CreatePersona,
  #[serde(rename = "Consultar Persona")]
  ReadPersona,
  #[serde(rename = "Consultar Personas")]
  ListPersonas,
  #[serde(rename = "Buscar Personas")]
  SearchPersonas,
  #[serde(rename = "Actualizar Persona")]
  UpdatePersona,
  #[serde(rename = "Eliminar Persona")]
  DeletePersona,
  #[serde(rename = "Consulta Natural")]
  NaturalQuery,
  #[serde(rename = "Consulta Natural - Éxito")]
  NaturalQuerySuccess,
  #[serde(rename = "Consulta Natural - Fallback")]
  NaturalQueryFallback,
  #[serde(rename = "Consulta Natural - Error")]
  NaturalQueryError,
  #[serde(rename = "Sistema")]
  System,
}

impl LogAction {
  pub const ALL: [Self; 11] = [
    Self::CreatePersona,
    Self::ReadPersona,
    Self::ListPersonas,
    Self::SearchPersonas,
    Self::UpdatePersona,
    Self::DeletePersona,
    Self::NaturalQuery,
    Self::NaturalQuerySuccess,
    Self::NaturalQueryFallback,
    Self::NaturalQueryError,
    Self::System,
  ];

  /// Must match the serde renames above.
  pub fn label(self) -> &'static str {
    match self {
      Self::CreatePersona => "Crear Persona",
      Self::ReadPersona => "Consultar Persona",
      Self::ListPersonas => "Consultar Personas",
      Self::SearchPersonas => "Buscar Personas",
      Self::UpdatePersona => "Actualizar Persona",
      Self::DeletePersona => "Eliminar Persona",
      Self::NaturalQuery => "Consulta Natural",
      Self::NaturalQuerySuccess => "Consulta Natural - Éxito",
      Self::NaturalQueryFallback => "Consulta Natural - Fallback",
      Self::NaturalQueryError => "Consulta Natural - Error",
      Self::System => "Sistema",
    }
  }

  pub fn from_label(s: &str) -> Option<Self> {
    Self::ALL.into_iter().find(|a| a.label() == s)
  }
}

#[derive(
  Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize,
)]
pub enum LogCategory {
  #[default]
  #[serde(rename = "sistema")]
  System,
  #[serde(rename = "usuario")]
  User,
  #[serde(rename = "consulta")]
  Query,
}

impl LogCategory {
  pub const ALL: [Self; 3] = [Self::System, Self::User, Self::Query];

  pub fn label(self) -> &'static str {
    match self {
      Self::System => "sistema",
      Self::User => "usuario",
      Self::Query => "consulta",
    }
  }

  pub fn from_label(s: &str) -> Option<Self> {
    Self::ALL.into_iter().find(|c| c.label() == s)
  }
}

/// Which physical store a copy of an entry was written to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Provenance {
  #[serde(rename = "secundario")]
  Secondary,
  #[serde(rename = "primario")]
  Primary,
}

impl Provenance {
  pub fn label(self) -> &'static str {
    match self {
      Self::Secondary => "secundario",
      Self::Primary => "primario",
    }
  }

  pub fn from_label(s: &str) -> Option<Self> {
    match s {
      "secundario" => Some(Self::Secondary),
      "primario" => Some(Self::Primary),
      _ => None,
    }
  }
}

// ─── Entry ───────────────────────────────────────────────────────────────────

/// One journalled event. The same `id` is written to every store that
/// accepts the entry.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LogEntry {
  pub id:                     Uuid,
  #[serde(rename = "accion")]
  pub action:                 LogAction,
  #[serde(rename = "detalles")]
  pub details:                String,
  #[serde(rename = "categoria")]
  pub category:               LogCategory,
  pub timestamp:              DateTime<Utc>,
  #[serde(rename = "fuente")]
  pub provenance:             Provenance,
  /// On primary copies: whether the secondary store accepted the same entry.
  /// Always `true` on secondary copies.
  #[serde(rename = "confirmadoSecundario")]
  pub secondary_acknowledged: bool,
}

// ─── Query ───────────────────────────────────────────────────────────────────

/// Filters for [`crate::store::LogStore::query_logs`].
#[derive(Debug, Clone, Default)]
pub struct LogQuery {
  /// Case-insensitive substring of the action label.
  pub action:              Option<String>,
  /// Case-insensitive substring of the details text (e.g. a document number).
  pub details:             Option<String>,
  /// Inclusive lower bound on `timestamp`.
  pub from:                Option<DateTime<Utc>>,
  /// Inclusive upper bound on `timestamp`.
  pub until:               Option<DateTime<Utc>>,
  /// Only entries the secondary store never acknowledged.
  pub unacknowledged_only: bool,
  /// Maximum rows returned; `None` means no limit.
  pub limit:               Option<usize>,
}

impl LogQuery {
  /// The single definition of filter semantics shared by every backend.
  pub fn matches(&self, entry: &LogEntry) -> bool {
    if let Some(action) = &self.action
      && !contains_ignore_case(entry.action.label(), action)
    {
      return false;
    }
    if let Some(details) = &self.details
      && !contains_ignore_case(&entry.details, details)
    {
      return false;
    }
    if self.from.is_some_and(|from| entry.timestamp < from) {
      return false;
    }
    if self.until.is_some_and(|until| entry.timestamp > until) {
      return false;
    }
    if self.unacknowledged_only && entry.secondary_acknowledged {
      return false;
    }
    true
  }

  /// Copy of this query with a different row limit.
  pub fn with_limit(&self, limit: Option<usize>) -> Self {
    Self { limit, ..self.clone() }
  }
}

fn contains_ignore_case(haystack: &str, needle: &str) -> bool {
  haystack.to_lowercase().contains(&needle.to_lowercase())
}

// ─── Statistics ──────────────────────────────────────────────────────────────

/// Aggregate counts over one store's journal.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct LogStats {
  #[serde(rename = "totalLogs")]
  pub total:       u64,
  /// Entries at or after the `since` instant passed to the store.
  #[serde(rename = "logsHoy")]
  pub since:       u64,
  #[serde(rename = "logsPorCategoria")]
  pub by_category: BTreeMap<String, u64>,
}

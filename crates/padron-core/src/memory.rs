//! [`MemoryStore`] — a non-durable store for running without a database.
//!
//! Used when no primary store path is configured, and by tests. Both
//! traits are implemented so it can stand in for either side of the
//! [`crate::journal::HybridLog`]. [`MemoryStore::set_online`] simulates an
//! outage.

use std::sync::{
  Arc, PoisonError, RwLock,
  atomic::{AtomicBool, Ordering},
};

use chrono::{DateTime, Utc};
use thiserror::Error;
use uuid::Uuid;

use crate::{
  Error, Result,
  log::{LogEntry, LogQuery, LogStats},
  persona::Persona,
  store::{LogStore, PersonaQuery, PersonaStore},
};

/// Returned by every operation while the store is offline.
#[derive(Debug, Error)]
#[error("in-memory store is offline")]
pub struct Offline;

struct Inner {
  online:   AtomicBool,
  personas: RwLock<Vec<Persona>>,
  logs:     RwLock<Vec<LogEntry>>,
}

/// Cloning is cheap — clones share the same data.
#[derive(Clone)]
pub struct MemoryStore {
  inner: Arc<Inner>,
}

impl Default for MemoryStore {
  fn default() -> Self { Self::new() }
}

impl MemoryStore {
  pub fn new() -> Self {
    Self {
      inner: Arc::new(Inner {
        online:   AtomicBool::new(true),
        personas: RwLock::new(Vec::new()),
        logs:     RwLock::new(Vec::new()),
      }),
    }
  }

  pub fn set_online(&self, online: bool) {
    self.inner.online.store(online, Ordering::SeqCst);
  }

  fn check(&self) -> Result<()> {
    if self.inner.online.load(Ordering::SeqCst) {
      Ok(())
    } else {
      Err(Error::storage(Offline))
    }
  }

  fn newest_first(&self, query: Option<&PersonaQuery>) -> Vec<Persona> {
    let personas = self
      .inner
      .personas
      .read()
      .unwrap_or_else(PoisonError::into_inner);
    let mut out: Vec<Persona> = personas
      .iter()
      .rev()
      .filter(|p| query.is_none_or(|q| q.matches(p)))
      .cloned()
      .collect();
    out.sort_by(|a, b| b.created_at.cmp(&a.created_at));
    out
  }
}

// ─── PersonaStore impl ───────────────────────────────────────────────────────

impl PersonaStore for MemoryStore {
  type Error = Error;

  async fn insert_persona(&self, persona: Persona) -> Result<Persona> {
    self.check()?;
    let mut personas = self
      .inner
      .personas
      .write()
      .unwrap_or_else(PoisonError::into_inner);
    if personas
      .iter()
      .any(|p| p.document_number == persona.document_number)
    {
      return Err(Error::DuplicateDocument(persona.document_number));
    }
    personas.push(persona.clone());
    Ok(persona)
  }

  async fn get_persona(&self, id: Uuid) -> Result<Option<Persona>> {
    self.check()?;
    let personas = self
      .inner
      .personas
      .read()
      .unwrap_or_else(PoisonError::into_inner);
    Ok(personas.iter().find(|p| p.id == id).cloned())
  }

  async fn find_by_document(&self, number: &str) -> Result<Option<Persona>> {
    self.check()?;
    let personas = self
      .inner
      .personas
      .read()
      .unwrap_or_else(PoisonError::into_inner);
    Ok(personas.iter().find(|p| p.document_number == number).cloned())
  }

  async fn list_personas(&self) -> Result<Vec<Persona>> {
    self.check()?;
    Ok(self.newest_first(None))
  }

  async fn search_personas(&self, query: &PersonaQuery) -> Result<Vec<Persona>> {
    self.check()?;
    Ok(self.newest_first(Some(query)))
  }

  async fn replace_persona(&self, persona: Persona) -> Result<bool> {
    self.check()?;
    let mut personas = self
      .inner
      .personas
      .write()
      .unwrap_or_else(PoisonError::into_inner);
    if personas.iter().any(|p| {
      p.id != persona.id && p.document_number == persona.document_number
    }) {
      return Err(Error::DuplicateDocument(persona.document_number));
    }
    match personas.iter_mut().find(|p| p.id == persona.id) {
      Some(slot) => {
        *slot = persona;
        Ok(true)
      }
      None => Ok(false),
    }
  }

  async fn delete_persona(&self, id: Uuid) -> Result<bool> {
    self.check()?;
    let mut personas = self
      .inner
      .personas
      .write()
      .unwrap_or_else(PoisonError::into_inner);
    let before = personas.len();
    personas.retain(|p| p.id != id);
    Ok(personas.len() != before)
  }
}

// ─── LogStore impl ───────────────────────────────────────────────────────────

impl LogStore for MemoryStore {
  type Error = Error;

  async fn ping(&self) -> Result<()> { self.check() }

  async fn append_log(&self, entry: LogEntry) -> Result<()> {
    self.check()?;
    self
      .inner
      .logs
      .write()
      .unwrap_or_else(PoisonError::into_inner)
      .push(entry);
    Ok(())
  }

  async fn query_logs(&self, query: &LogQuery) -> Result<Vec<LogEntry>> {
    self.check()?;
    let logs = self.inner.logs.read().unwrap_or_else(PoisonError::into_inner);
    let mut out: Vec<LogEntry> =
      logs.iter().filter(|e| query.matches(e)).cloned().collect();
    out.sort_by(|a, b| b.timestamp.cmp(&a.timestamp));
    if let Some(limit) = query.limit {
      out.truncate(limit);
    }
    Ok(out)
  }

  async fn log_stats(&self, since: DateTime<Utc>) -> Result<LogStats> {
    self.check()?;
    let logs = self.inner.logs.read().unwrap_or_else(PoisonError::into_inner);
    let mut stats = LogStats {
      total: logs.len() as u64,
      ..Default::default()
    };
    for e in logs.iter() {
      if e.timestamp >= since {
        stats.since += 1;
      }
      *stats
        .by_category
        .entry(e.category.label().to_owned())
        .or_default() += 1;
    }
    Ok(stats)
  }
}

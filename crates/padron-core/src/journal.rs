//! The hybrid audit journal: one writer and one reader over two stores.
//!
//! The **secondary** store is the dedicated log store. It is probed before
//! every use and may be absent altogether. The **primary** store (the
//! persona store) keeps a copy of every entry, flagged with whether the
//! secondary acknowledged it.
//!
//! Writes are best-effort and at most once per store. Reads prefer the
//! secondary and fill gaps from the primary: entries the secondary never
//! acknowledged are always merged in, and when the secondary is down or
//! returns nothing the primary's matching entries are used in full.

use std::{collections::HashSet, sync::Arc};

use chrono::{DateTime, Utc};
use serde::Serialize;
use uuid::Uuid;

use crate::{
  log::{LogAction, LogCategory, LogEntry, LogQuery, LogStats, Provenance},
  store::LogStore,
};

/// Default per-store row limit for reads.
pub const DEFAULT_ROW_LIMIT: usize = 500;
/// Default hard cap on merged read results.
pub const DEFAULT_QUERY_CAP: usize = 1000;

// ─── Results ─────────────────────────────────────────────────────────────────

/// What happened to one [`HybridLog::record`] call.
#[derive(Debug, Clone, Serialize)]
pub struct LogReceipt {
  #[serde(rename = "registro")]
  pub entry:     LogEntry,
  /// The secondary store accepted the entry.
  #[serde(rename = "secundario")]
  pub secondary: bool,
  /// The primary store accepted its copy.
  #[serde(rename = "primario")]
  pub primary:   bool,
}

impl LogReceipt {
  /// `false` means the entry only reached the emergency trace.
  pub fn retained(&self) -> bool { self.secondary || self.primary }
}

/// Which stores are configured and currently reachable.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct StoreStatus {
  #[serde(rename = "secundario")]
  pub secondary: bool,
  #[serde(rename = "primario")]
  pub primary:   bool,
}

/// Output of [`HybridLog::stats`].
#[derive(Debug, Clone, Serialize)]
pub struct JournalStats {
  #[serde(flatten)]
  pub counts: Option<LogStats>,
  /// The store the counts were taken from.
  #[serde(rename = "fuente")]
  pub source: Option<Provenance>,
  #[serde(rename = "sistemaActivo")]
  pub active: StoreStatus,
}

// ─── HybridLog ───────────────────────────────────────────────────────────────

/// Writer and reader over an optional primary and an optional secondary
/// [`LogStore`].
pub struct HybridLog<P, S> {
  primary:   Option<Arc<P>>,
  secondary: Option<Arc<S>>,
  row_limit: usize,
  cap:       usize,
}

impl<P, S> Clone for HybridLog<P, S> {
  fn clone(&self) -> Self {
    Self {
      primary:   self.primary.clone(),
      secondary: self.secondary.clone(),
      row_limit: self.row_limit,
      cap:       self.cap,
    }
  }
}

impl<P: LogStore, S: LogStore> HybridLog<P, S> {
  pub fn new(primary: Option<Arc<P>>, secondary: Option<Arc<S>>) -> Self {
    Self {
      primary,
      secondary,
      row_limit: DEFAULT_ROW_LIMIT,
      cap: DEFAULT_QUERY_CAP,
    }
  }

  /// Override the per-store row limit and the merged-result cap.
  pub fn with_limits(mut self, row_limit: usize, cap: usize) -> Self {
    self.row_limit = row_limit;
    self.cap = cap;
    self
  }

  pub fn cap(&self) -> usize { self.cap }

  pub fn row_limit(&self) -> usize { self.row_limit }

  pub fn has_primary(&self) -> bool { self.primary.is_some() }

  pub fn has_secondary(&self) -> bool { self.secondary.is_some() }

  /// Probe the secondary store. `false` if it is absent or failing.
  pub async fn secondary_healthy(&self) -> bool {
    let Some(secondary) = &self.secondary else {
      return false;
    };
    match secondary.ping().await {
      Ok(()) => true,
      Err(e) => {
        tracing::warn!(error = %e, "secondary log store health check failed");
        false
      }
    }
  }

  /// Probe the primary store. `false` if it is absent or failing.
  pub async fn primary_healthy(&self) -> bool {
    match &self.primary {
      Some(primary) => primary.ping().await.is_ok(),
      None => false,
    }
  }

  pub async fn status(&self) -> StoreStatus {
    StoreStatus {
      secondary: self.secondary_healthy().await,
      primary:   self.primary_healthy().await,
    }
  }

  // ── Write path ────────────────────────────────────────────────────────────

  /// Journal one event.
  ///
  /// The secondary store is written only if its health probe passes. The
  /// primary copy is always attempted when a primary store is configured
  /// and records whether the secondary accepted the entry. If neither store
  /// keeps the entry it is emitted on the `padron::emergency` trace target.
  pub async fn record(
    &self,
    action: LogAction,
    details: impl Into<String>,
    category: LogCategory,
  ) -> LogReceipt {
    let mut entry = LogEntry {
      id: Uuid::new_v4(),
      action,
      details: details.into(),
      category,
      timestamp: Utc::now(),
      provenance: Provenance::Secondary,
      secondary_acknowledged: true,
    };

    let mut secondary_ok = false;
    if let Some(secondary) = &self.secondary
      && self.secondary_healthy().await
    {
      match secondary.append_log(entry.clone()).await {
        Ok(()) => {
          secondary_ok = true;
          tracing::debug!(action = action.label(), "journal entry written to secondary store");
        }
        Err(e) => {
          tracing::warn!(error = %e, "secondary log store write failed");
        }
      }
    }

    entry.provenance = Provenance::Primary;
    entry.secondary_acknowledged = secondary_ok;

    let mut primary_ok = false;
    if let Some(primary) = &self.primary {
      match primary.append_log(entry.clone()).await {
        Ok(()) => {
          primary_ok = true;
          if !secondary_ok {
            tracing::info!(
              action = action.label(),
              "journal entry written to primary store only"
            );
          }
        }
        Err(e) => {
          tracing::error!(error = %e, "primary log store write failed");
        }
      }
    }

    if !secondary_ok && !primary_ok {
      tracing::error!(
        target: "padron::emergency",
        id = %entry.id,
        timestamp = %entry.timestamp.to_rfc3339(),
        action = action.label(),
        category = category.label(),
        details = %entry.details,
        "journal entry not retained by any store"
      );
    }

    LogReceipt { entry, secondary: secondary_ok, primary: primary_ok }
  }

  // ── Read path ─────────────────────────────────────────────────────────────

  /// Read entries matching `query`, newest first, never more than
  /// [`HybridLog::cap`]. Store failures degrade to fewer results and are
  /// traced; they are never returned to the caller.
  pub async fn query(&self, query: &LogQuery) -> Vec<LogEntry> {
    let limit = Some(query.limit.map_or(self.row_limit, |l| l.min(self.row_limit)));

    let mut from_secondary: Option<Vec<LogEntry>> = None;
    if let Some(secondary) = &self.secondary
      && self.secondary_healthy().await
    {
      match secondary.query_logs(&query.with_limit(limit)).await {
        Ok(rows) => {
          tracing::debug!(rows = rows.len(), "journal rows from secondary store");
          from_secondary = Some(rows);
        }
        Err(e) => tracing::warn!(error = %e, "secondary log store query failed"),
      }
    }

    let mut from_primary: Vec<LogEntry> = Vec::new();
    if let Some(primary) = &self.primary {
      // With live secondary results only the entries it never saw are
      // missing; otherwise the primary copy is all there is.
      let gap_only = from_secondary.as_ref().is_some_and(|rows| !rows.is_empty());
      let mut primary_query = query.with_limit(limit);
      primary_query.unacknowledged_only = query.unacknowledged_only || gap_only;

      match primary.query_logs(&primary_query).await {
        Ok(rows) => {
          tracing::debug!(rows = rows.len(), gap_only, "journal rows from primary store");
          from_primary = rows;
        }
        Err(e) => tracing::error!(error = %e, "primary log store query failed"),
      }
    }

    merge(from_secondary.unwrap_or_default(), from_primary, self.cap)
  }

  /// Journal statistics from the secondary when healthy, else the primary.
  /// Statistics use local-midnight UTC as the start of "today".
  pub async fn stats(&self) -> JournalStats {
    let active = self.status().await;
    let since = start_of_today();

    let mut counts = None;
    let mut source = None;

    if active.secondary
      && let Some(secondary) = &self.secondary
    {
      match secondary.log_stats(since).await {
        Ok(s) => {
          counts = Some(s);
          source = Some(Provenance::Secondary);
        }
        Err(e) => tracing::warn!(error = %e, "secondary log store stats failed"),
      }
    }

    if counts.is_none()
      && active.primary
      && let Some(primary) = &self.primary
    {
      match primary.log_stats(since).await {
        Ok(s) => {
          counts = Some(s);
          source = Some(Provenance::Primary);
        }
        Err(e) => tracing::error!(error = %e, "primary log store stats failed"),
      }
    }

    JournalStats { counts, source, active }
  }
}

fn start_of_today() -> DateTime<Utc> {
  let now = Utc::now();
  now
    .date_naive()
    .and_hms_opt(0, 0, 0)
    .map(|dt| dt.and_utc())
    .unwrap_or(now)
}

/// Secondary rows first so their copy wins on duplicate ids; then sort
/// newest first and truncate.
fn merge(
  secondary: Vec<LogEntry>,
  primary: Vec<LogEntry>,
  cap: usize,
) -> Vec<LogEntry> {
  let mut seen = HashSet::new();
  let mut out: Vec<LogEntry> = secondary
    .into_iter()
    .chain(primary)
    .filter(|e| seen.insert(e.id))
    .collect();
  out.sort_by(|a, b| b.timestamp.cmp(&a.timestamp));
  out.truncate(cap);
  out
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::memory::MemoryStore;

  fn journal(
    primary: Option<&MemoryStore>,
    secondary: Option<&MemoryStore>,
  ) -> HybridLog<MemoryStore, MemoryStore> {
    HybridLog::new(
      primary.map(|s| Arc::new(s.clone())),
      secondary.map(|s| Arc::new(s.clone())),
    )
  }

  #[tokio::test]
  async fn healthy_secondary_acknowledges_and_primary_keeps_copy() {
    let (p, s) = (MemoryStore::new(), MemoryStore::new());
    let j = journal(Some(&p), Some(&s));

    let r = j.record(LogAction::CreatePersona, "alta", LogCategory::User).await;
    assert!(r.secondary && r.primary);

    let q = LogQuery::default();
    let in_s = s.query_logs(&q).await.unwrap();
    let in_p = p.query_logs(&q).await.unwrap();
    assert_eq!(in_s[0].provenance, Provenance::Secondary);
    assert_eq!(in_p[0].provenance, Provenance::Primary);
    assert!(in_p[0].secondary_acknowledged);
    assert_eq!(in_s[0].id, in_p[0].id);
  }

  #[tokio::test]
  async fn unhealthy_secondary_is_skipped() {
    let (p, s) = (MemoryStore::new(), MemoryStore::new());
    s.set_online(false);
    let j = journal(Some(&p), Some(&s));

    let r = j.record(LogAction::System, "x", LogCategory::System).await;
    assert!(!r.secondary);
    assert!(r.primary);
    let in_p = p.query_logs(&LogQuery::default()).await.unwrap();
    assert!(!in_p[0].secondary_acknowledged);
  }

  #[tokio::test]
  async fn nothing_retained_when_both_fail() {
    let (p, s) = (MemoryStore::new(), MemoryStore::new());
    p.set_online(false);
    s.set_online(false);
    let j = journal(Some(&p), Some(&s));

    let r = j.record(LogAction::System, "lost", LogCategory::System).await;
    assert!(!r.retained());
  }

  #[tokio::test]
  async fn secondary_only_without_primary() {
    let s = MemoryStore::new();
    let j = journal(None, Some(&s));
    let r = j.record(LogAction::System, "x", LogCategory::System).await;
    assert!(r.secondary && !r.primary);
  }

  #[tokio::test]
  async fn reader_falls_back_to_primary_when_secondary_down() {
    let (p, s) = (MemoryStore::new(), MemoryStore::new());
    let j = journal(Some(&p), Some(&s));
    j.record(LogAction::CreatePersona, "uno", LogCategory::User).await;
    j.record(LogAction::DeletePersona, "dos", LogCategory::User).await;

    s.set_online(false);
    let rows = j.query(&LogQuery::default()).await;
    assert_eq!(rows.len(), 2);
    assert!(rows.iter().all(|e| e.provenance == Provenance::Primary));
    assert!(rows[0].timestamp >= rows[1].timestamp);
  }

  #[tokio::test]
  async fn entries_written_during_outage_are_visible_after_recovery() {
    let (p, s) = (MemoryStore::new(), MemoryStore::new());
    let j = journal(Some(&p), Some(&s));

    j.record(LogAction::CreatePersona, "before", LogCategory::User).await;
    s.set_online(false);
    j.record(LogAction::CreatePersona, "during", LogCategory::User).await;
    s.set_online(true);
    j.record(LogAction::CreatePersona, "after", LogCategory::User).await;

    let rows = j.query(&LogQuery::default()).await;
    let details: Vec<&str> = rows.iter().map(|e| e.details.as_str()).collect();
    assert_eq!(rows.len(), 3, "{details:?}");
    assert!(details.contains(&"during"));
    let during = rows.iter().find(|e| e.details == "during").unwrap();
    assert_eq!(during.provenance, Provenance::Primary);
    assert_eq!(
      rows.iter().filter(|e| e.provenance == Provenance::Secondary).count(),
      2
    );
  }

  #[tokio::test]
  async fn empty_secondary_falls_back_to_all_primary_rows() {
    let (p, s) = (MemoryStore::new(), MemoryStore::new());
    // Entries acknowledged by a secondary whose data has since gone.
    let j_old = journal(Some(&p), Some(&MemoryStore::new()));
    j_old.record(LogAction::System, "old", LogCategory::System).await;

    let j = journal(Some(&p), Some(&s));
    let rows = j.query(&LogQuery::default()).await;
    assert_eq!(rows.len(), 1);
    assert_eq!(rows[0].details, "old");
  }

  #[tokio::test]
  async fn reader_never_exceeds_cap() {
    let (p, s) = (MemoryStore::new(), MemoryStore::new());
    let j = journal(Some(&p), Some(&s)).with_limits(4, 3);
    for i in 0..6 {
      j.record(LogAction::System, format!("e{i}"), LogCategory::System).await;
    }
    s.set_online(false);
    for i in 0..6 {
      j.record(LogAction::System, format!("o{i}"), LogCategory::System).await;
    }
    s.set_online(true);

    let rows = j.query(&LogQuery::default()).await;
    assert_eq!(rows.len(), 3);
  }

  #[tokio::test]
  async fn filters_apply_to_both_stores() {
    let (p, s) = (MemoryStore::new(), MemoryStore::new());
    let j = journal(Some(&p), Some(&s));
    j.record(LogAction::CreatePersona, "documento 123456", LogCategory::User).await;
    j.record(LogAction::DeletePersona, "documento 999999", LogCategory::User).await;

    let q = LogQuery { details: Some("123456".into()), ..Default::default() };
    assert_eq!(j.query(&q).await.len(), 1);

    s.set_online(false);
    let q = LogQuery { action: Some("eliminar".into()), ..Default::default() };
    let rows = j.query(&q).await;
    assert_eq!(rows.len(), 1);
    assert_eq!(rows[0].action, LogAction::DeletePersona);
  }

  #[tokio::test]
  async fn stats_prefer_secondary() {
    let (p, s) = (MemoryStore::new(), MemoryStore::new());
    let j = journal(Some(&p), Some(&s));
    j.record(LogAction::NaturalQuery, "q", LogCategory::Query).await;

    let stats = j.stats().await;
    assert_eq!(stats.source, Some(Provenance::Secondary));
    assert_eq!(stats.counts.as_ref().unwrap().total, 1);
    assert!(stats.active.secondary && stats.active.primary);

    s.set_online(false);
    let stats = j.stats().await;
    assert_eq!(stats.source, Some(Provenance::Primary));
    assert!(!stats.active.secondary);
  }
}

//! [`SqliteStore`] — the SQLite implementation of [`PersonaStore`] and
//! [`LogStore`].

use std::{path::Path, time::Duration};

use chrono::{DateTime, Utc};
use rusqlite::OptionalExtension as _;
use uuid::Uuid;

use padron_core::{
  log::{LogEntry, LogQuery, LogStats},
  persona::Persona,
  store::{LogStore, PersonaQuery, PersonaStore},
};

use crate::{
  Error, Result,
  encode::{LOG_COLUMNS, PERSONA_COLUMNS, RawLogEntry, RawPersona, encode_dt, encode_uuid},
  schema::SCHEMA,
};

/// `true` for a violated `UNIQUE` index, i.e. a taken document number.
fn is_unique_violation(e: &tokio_rusqlite::Error) -> bool {
  matches!(
    e,
    tokio_rusqlite::Error::Rusqlite(rusqlite::Error::SqliteFailure(f, _))
      if f.extended_code == rusqlite::ffi::SQLITE_CONSTRAINT_UNIQUE
  )
}

// ─── Store ───────────────────────────────────────────────────────────────────

/// A Padron store backed by a single SQLite file.
///
/// Cloning is cheap — the inner connection is reference-counted.
#[derive(Clone)]
pub struct SqliteStore {
  conn: tokio_rusqlite::Connection,
}

impl SqliteStore {
  /// Open (or create) a store at `path` and run schema initialisation.
  pub async fn open(path: impl AsRef<Path>) -> Result<Self> {
    let conn = tokio_rusqlite::Connection::open(path).await?;
    let store = Self { conn };
    store.init_schema().await?;
    Ok(store)
  }

  /// Open an in-memory store — useful for testing.
  pub async fn open_in_memory() -> Result<Self> {
    let conn = tokio_rusqlite::Connection::open_in_memory().await?;
    let store = Self { conn };
    store.init_schema().await?;
    Ok(store)
  }

  /// [`SqliteStore::open`], retried up to `attempts` times with `delay`
  /// between tries. Returns the last error if every attempt fails.
  pub async fn connect_with_retry(
    path: impl AsRef<Path>,
    attempts: u32,
    delay: Duration,
  ) -> Result<Self> {
    let path = path.as_ref();
    let attempts = attempts.max(1);
    let mut attempt = 1;
    loop {
      match Self::open(path).await {
        Ok(store) => {
          tracing::info!(path = %path.display(), attempt, "connected to sqlite store");
          return Ok(store);
        }
        Err(e) if attempt < attempts => {
          tracing::warn!(
            path = %path.display(),
            attempt,
            attempts,
            error = %e,
            "sqlite store connection failed; retrying"
          );
          tokio::time::sleep(delay).await;
          attempt += 1;
        }
        Err(e) => return Err(e),
      }
    }
  }

  async fn init_schema(&self) -> Result<()> {
    self
      .conn
      .call(|conn| {
        conn.execute_batch(SCHEMA)?;
        Ok(())
      })
      .await?;
    Ok(())
  }
}

// ─── PersonaStore impl ───────────────────────────────────────────────────────

impl PersonaStore for SqliteStore {
  type Error = Error;

  async fn insert_persona(&self, persona: Persona) -> Result<Persona> {
    let raw = RawPersona::from_persona(&persona);

    let inserted = self
      .conn
      .call(move |conn| {
        conn.execute(
          &format!(
            "INSERT INTO personas ({PERSONA_COLUMNS})
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12)"
          ),
          rusqlite::params![
            raw.id,
            raw.document_type,
            raw.document_number,
            raw.first_name,
            raw.middle_name,
            raw.last_name,
            raw.birth_date,
            raw.gender,
            raw.email,
            raw.phone,
            raw.created_at,
            raw.updated_at,
          ],
        )?;
        Ok(())
      })
      .await;

    match inserted {
      Ok(()) => Ok(persona),
      Err(e) if is_unique_violation(&e) => Err(Error::Core(
        padron_core::Error::DuplicateDocument(persona.document_number),
      )),
      Err(e) => Err(e.into()),
    }
  }

  async fn get_persona(&self, id: Uuid) -> Result<Option<Persona>> {
    let id_str = encode_uuid(id);

    let raw: Option<RawPersona> = self
      .conn
      .call(move |conn| {
        Ok(
          conn
            .query_row(
              &format!("SELECT {PERSONA_COLUMNS} FROM personas WHERE id = ?1"),
              rusqlite::params![id_str],
              RawPersona::from_row,
            )
            .optional()?,
        )
      })
      .await?;

    raw.map(RawPersona::into_persona).transpose()
  }

  async fn find_by_document(&self, number: &str) -> Result<Option<Persona>> {
    let number = number.to_owned();

    let raw: Option<RawPersona> = self
      .conn
      .call(move |conn| {
        Ok(
          conn
            .query_row(
              &format!(
                "SELECT {PERSONA_COLUMNS} FROM personas WHERE document_number = ?1"
              ),
              rusqlite::params![number],
              RawPersona::from_row,
            )
            .optional()?,
        )
      })
      .await?;

    raw.map(RawPersona::into_persona).transpose()
  }

  async fn list_personas(&self) -> Result<Vec<Persona>> {
    self.search_personas(&PersonaQuery::default()).await
  }

  async fn search_personas(&self, query: &PersonaQuery) -> Result<Vec<Persona>> {
    // Exact filters run in SQL; the surname substring is matched in Rust so
    // case folding covers accented letters.
    let document = query.document_number.clone();
    let gender = query.gender.map(|g| g.label().to_owned());

    let raws: Vec<RawPersona> = self
      .conn
      .call(move |conn| {
        let mut stmt = conn.prepare(&format!(
          "SELECT {PERSONA_COLUMNS} FROM personas
           WHERE (?1 IS NULL OR document_number = ?1)
             AND (?2 IS NULL OR gender = ?2)
           ORDER BY created_at DESC"
        ))?;
        let rows = stmt
          .query_map(rusqlite::params![document, gender], RawPersona::from_row)?
          .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(rows)
      })
      .await?;

    let mut personas = raws
      .into_iter()
      .map(RawPersona::into_persona)
      .collect::<Result<Vec<_>>>()?;
    personas.retain(|p| query.matches(p));
    Ok(personas)
  }

  async fn replace_persona(&self, persona: Persona) -> Result<bool> {
    let raw = RawPersona::from_persona(&persona);

    let updated = self
      .conn
      .call(move |conn| {
        let n = conn.execute(
          "UPDATE personas SET
             document_type = ?2, document_number = ?3, first_name = ?4,
             middle_name = ?5, last_name = ?6, birth_date = ?7, gender = ?8,
             email = ?9, phone = ?10, updated_at = ?11
           WHERE id = ?1",
          rusqlite::params![
            raw.id,
            raw.document_type,
            raw.document_number,
            raw.first_name,
            raw.middle_name,
            raw.last_name,
            raw.birth_date,
            raw.gender,
            raw.email,
            raw.phone,
            raw.updated_at,
          ],
        )?;
        Ok(n > 0)
      })
      .await;

    match updated {
      Ok(found) => Ok(found),
      Err(e) if is_unique_violation(&e) => Err(Error::Core(
        padron_core::Error::DuplicateDocument(persona.document_number),
      )),
      Err(e) => Err(e.into()),
    }
  }

  async fn delete_persona(&self, id: Uuid) -> Result<bool> {
    let id_str = encode_uuid(id);

    let removed = self
      .conn
      .call(move |conn| {
        let n =
          conn.execute("DELETE FROM personas WHERE id = ?1", rusqlite::params![id_str])?;
        Ok(n > 0)
      })
      .await?;
    Ok(removed)
  }
}

// ─── LogStore impl ───────────────────────────────────────────────────────────

impl LogStore for SqliteStore {
  type Error = Error;

  async fn ping(&self) -> Result<()> {
    self
      .conn
      .call(|conn| {
        conn.query_row("SELECT 1", [], |_| Ok(()))?;
        Ok(())
      })
      .await?;
    Ok(())
  }

  async fn append_log(&self, entry: LogEntry) -> Result<()> {
    let raw = RawLogEntry::from_entry(&entry);

    self
      .conn
      .call(move |conn| {
        conn.execute(
          &format!("INSERT INTO logs ({LOG_COLUMNS}) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)"),
          rusqlite::params![
            raw.id,
            raw.action,
            raw.details,
            raw.category,
            raw.timestamp,
            raw.provenance,
            raw.secondary_acknowledged,
          ],
        )?;
        Ok(())
      })
      .await?;
    Ok(())
  }

  async fn query_logs(&self, query: &LogQuery) -> Result<Vec<LogEntry>> {
    // Date bounds and the acknowledgment flag narrow the scan in SQL. Text
    // filters run on decoded rows while the cursor advances, so reading
    // stops as soon as `limit` rows have matched.
    let query = query.clone();
    let from = query.from.map(encode_dt);
    let until = query.until.map(encode_dt);
    let unacknowledged_only = query.unacknowledged_only;
    // Negative means "no limit" to SQLite; only usable without text filters.
    let sql_limit = match query.limit {
      Some(l) if query.action.is_none() && query.details.is_none() => {
        i64::try_from(l).unwrap_or(i64::MAX)
      }
      _ => -1,
    };

    let entries: Result<Vec<LogEntry>> = self
      .conn
      .call(move |conn| {
        let mut stmt = conn.prepare(&format!(
          "SELECT {LOG_COLUMNS} FROM logs
           WHERE (?1 IS NULL OR timestamp >= ?1)
             AND (?2 IS NULL OR timestamp <= ?2)
             AND (?3 = 0 OR secondary_acknowledged = 0)
           ORDER BY timestamp DESC
           LIMIT ?4"
        ))?;
        let rows = stmt.query_map(
          rusqlite::params![from, until, unacknowledged_only, sql_limit],
          RawLogEntry::from_row,
        )?;

        let mut entries = Vec::new();
        for raw in rows {
          let entry = match raw?.into_entry() {
            Ok(entry) => entry,
            Err(e) => return Ok(Err(e)),
          };
          if query.matches(&entry) {
            entries.push(entry);
            if query.limit.is_some_and(|l| entries.len() >= l) {
              break;
            }
          }
        }
        Ok(Ok(entries))
      })
      .await?;

    entries
  }

  async fn log_stats(&self, since: DateTime<Utc>) -> Result<LogStats> {
    let since_str = encode_dt(since);

    let (total, today, by_category) = self
      .conn
      .call(move |conn| {
        let (total, today): (i64, i64) = conn.query_row(
          "SELECT COUNT(*), COALESCE(SUM(timestamp >= ?1), 0) FROM logs",
          rusqlite::params![since_str],
          |r| Ok((r.get(0)?, r.get(1)?)),
        )?;

        let mut stmt =
          conn.prepare("SELECT category, COUNT(*) FROM logs GROUP BY category")?;
        let by_category = stmt
          .query_map([], |r| Ok((r.get::<_, String>(0)?, r.get::<_, i64>(1)?)))?
          .collect::<rusqlite::Result<Vec<_>>>()?;

        Ok((total, today, by_category))
      })
      .await?;

    Ok(LogStats {
      total:       total.max(0) as u64,
      since:       today.max(0) as u64,
      by_category: by_category
        .into_iter()
        .map(|(c, n)| (c, n.max(0) as u64))
        .collect(),
    })
  }
}

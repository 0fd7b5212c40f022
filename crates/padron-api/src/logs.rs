//! Handlers for `/logs` endpoints.
//!
//! | Method | Path | Notes |
//! |--------|------|-------|
//! | `GET`  | `/logs` | Optional `accion`, `documento`, `desde`, `hasta` |
//! | `POST` | `/logs` | Body: `{"accion", "detalles", "categoria"?}`; 201 + receipt |
//! | `GET`  | `/logs/estadisticas` | Journal statistics |

use axum::{
  Json,
  extract::{
    Query, State,
    rejection::{JsonRejection, QueryRejection},
  },
  http::StatusCode,
  response::IntoResponse,
};
use chrono::{DateTime, NaiveDate, NaiveTime, Utc};
use padron_core::{
  journal::{JournalStats, LogReceipt},
  log::{LogAction, LogCategory, LogEntry, LogQuery},
  store::LogStore,
};
use serde::{Deserialize, Serialize};

use crate::{AppState, PrimaryStore, error::ApiError};

// ─── List ────────────────────────────────────────────────────────────────────

#[derive(Debug, Default, Deserialize)]
pub struct ListParams {
  /// Substring of the action label.
  pub accion:    Option<String>,
  /// Substring of the details text, typically a document number.
  pub documento: Option<String>,
  /// RFC 3339 instant or `YYYY-MM-DD` (start of day).
  pub desde:     Option<String>,
  /// RFC 3339 instant or `YYYY-MM-DD` (end of day).
  pub hasta:     Option<String>,
}

/// A journal entry as returned to clients, with a display timestamp.
#[derive(Debug, Serialize)]
pub struct LogView {
  #[serde(flatten)]
  pub entry: LogEntry,
  pub fecha: String,
}

impl From<LogEntry> for LogView {
  fn from(entry: LogEntry) -> Self {
    let fecha = entry.timestamp.format("%d/%m/%Y, %H:%M:%S").to_string();
    Self { entry, fecha }
  }
}

/// Parse a date filter. A bare date means the start of that day, or its
/// last instant when `end_of_day` is set.
fn parse_bound(
  name: &str,
  raw: &str,
  end_of_day: bool,
) -> Result<DateTime<Utc>, ApiError> {
  let raw = raw.trim();
  if let Ok(dt) = DateTime::parse_from_rfc3339(raw) {
    return Ok(dt.with_timezone(&Utc));
  }
  let date = NaiveDate::parse_from_str(raw, "%Y-%m-%d")
    .map_err(|_| ApiError::BadRequest(format!("invalid {name} date: {raw:?}")))?;
  let time = if end_of_day {
    NaiveTime::from_hms_nano_opt(23, 59, 59, 999_999_999)
  } else {
    NaiveTime::from_hms_opt(0, 0, 0)
  }
  .unwrap_or(NaiveTime::MIN);
  Ok(date.and_time(time).and_utc())
}

fn nonblank(v: Option<String>) -> Option<String> {
  v.filter(|s| !s.trim().is_empty())
}

impl ListParams {
  fn into_query(self) -> Result<LogQuery, ApiError> {
    let from = nonblank(self.desde)
      .map(|s| parse_bound("desde", &s, false))
      .transpose()?;
    let until = nonblank(self.hasta)
      .map(|s| parse_bound("hasta", &s, true))
      .transpose()?;
    Ok(LogQuery {
      action: nonblank(self.accion),
      details: nonblank(self.documento),
      from,
      until,
      ..Default::default()
    })
  }
}

/// `GET /logs[?accion=...][&documento=...][&desde=...][&hasta=...]`
pub async fn list<S, L>(
  State(state): State<AppState<S, L>>,
  params: Result<Query<ListParams>, QueryRejection>,
) -> Result<Json<Vec<LogView>>, ApiError>
where
  S: PrimaryStore,
  L: LogStore + 'static,
{
  let Query(params) = params?;
  let query = params.into_query()?;
  let entries = state.journal.query(&query).await;
  Ok(Json(entries.into_iter().map(LogView::from).collect()))
}

// ─── Create ──────────────────────────────────────────────────────────────────

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct CreateBody {
  pub accion:    String,
  pub detalles:  String,
  pub categoria: Option<String>,
}

/// `POST /logs` — journal an event reported by a client.
pub async fn create<S, L>(
  State(state): State<AppState<S, L>>,
  body: Result<Json<CreateBody>, JsonRejection>,
) -> Result<impl IntoResponse, ApiError>
where
  S: PrimaryStore,
  L: LogStore + 'static,
{
  let Json(body) = body?;
  let action = LogAction::from_label(body.accion.trim())
    .ok_or_else(|| ApiError::BadRequest(format!("unknown action: {:?}", body.accion)))?;
  let category = match nonblank(body.categoria) {
    Some(c) => LogCategory::from_label(c.trim())
      .ok_or_else(|| ApiError::BadRequest(format!("unknown category: {c:?}")))?,
    None => LogCategory::default(),
  };

  let receipt: LogReceipt = state.journal.record(action, body.detalles, category).await;
  Ok((StatusCode::CREATED, Json(receipt)))
}

// ─── Statistics ──────────────────────────────────────────────────────────────

/// `GET /logs/estadisticas`
pub async fn stats<S, L>(State(state): State<AppState<S, L>>) -> Json<JournalStats>
where
  S: PrimaryStore,
  L: LogStore + 'static,
{
  Json(state.journal.stats().await)
}

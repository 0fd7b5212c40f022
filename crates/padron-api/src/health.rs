//! Handlers for `/health` endpoints.
//!
//! | Method | Path | Notes |
//! |--------|------|-------|
//! | `GET`  | `/health` | Liveness of this service |
//! | `GET`  | `/health/rag` | Relays the RAG service's health; always 200 |
//! | `GET`  | `/health/log-store` | 503 when the secondary log store is configured but down |
//! | `GET`  | `/health/debug` | Store wiring, health and limits |

use axum::{Json, extract::State, http::StatusCode};
use chrono::{SecondsFormat, Utc};
use padron_core::{service, store::LogStore};
use serde_json::{Value, json};

use crate::{AppState, PrimaryStore};

fn now() -> String { Utc::now().to_rfc3339_opts(SecondsFormat::Millis, true) }

/// `GET /health`
pub async fn backend() -> Json<Value> {
  Json(json!({
    "status": "ok",
    "service": "backend",
    "timestamp": now(),
  }))
}

/// `GET /health/rag`
pub async fn rag<S, L>(State(state): State<AppState<S, L>>) -> Json<Value>
where
  S: PrimaryStore,
  L: LogStore + 'static,
{
  match state.rag.health().await {
    Ok(h) => Json(json!({
      "status": h.status.unwrap_or_else(|| "ok".to_owned()),
      "service": "rag",
      "mongodb": h.mongodb.unwrap_or_else(|| "unknown".to_owned()),
      "llm_model": h.llm_model.unwrap_or_else(|| "unknown".to_owned()),
      "timestamp": now(),
    })),
    Err(e) => {
      tracing::warn!(error = %e, "rag health check failed");
      Json(json!({
        "status": "error",
        "service": "rag",
        "message": "No se pudo conectar con el servicio RAG",
        "error": e.to_string(),
        "timestamp": now(),
      }))
    }
  }
}

/// `GET /health/log-store`
pub async fn log_store<S, L>(
  State(state): State<AppState<S, L>>,
) -> (StatusCode, Json<Value>)
where
  S: PrimaryStore,
  L: LogStore + 'static,
{
  if !state.journal.has_secondary() {
    return (
      StatusCode::OK,
      Json(json!({
        "status": "disabled",
        "service": "log-store",
        "configured": false,
        "timestamp": now(),
      })),
    );
  }

  if state.journal.secondary_healthy().await {
    (
      StatusCode::OK,
      Json(json!({
        "status": "ok",
        "service": "log-store",
        "configured": true,
        "timestamp": now(),
      })),
    )
  } else {
    (
      StatusCode::SERVICE_UNAVAILABLE,
      Json(json!({
        "status": "error",
        "service": "log-store",
        "configured": true,
        "error": "log store is not responding",
        "timestamp": now(),
      })),
    )
  }
}

/// `GET /health/debug`
pub async fn debug<S, L>(State(state): State<AppState<S, L>>) -> Json<Value>
where
  S: PrimaryStore,
  L: LogStore + 'static,
{
  let status = state.journal.status().await;
  let persona_count = match service::list(state.store.as_ref()).await {
    Ok(personas) => Some(personas.len()),
    Err(e) => {
      tracing::warn!(error = %e, "debug endpoint cannot count personas");
      None
    }
  };

  Json(json!({
    "status": "ok",
    "primaryStore": {
      "kind": state.store_kind,
      "healthy": status.primary,
    },
    "logStore": {
      "configured": state.journal.has_secondary(),
      "healthy": status.secondary,
    },
    "ragUrl": state.rag.base_url(),
    "personaCount": persona_count,
    "logRowLimit": state.journal.row_limit(),
    "logQueryCap": state.journal.cap(),
    "timestamp": now(),
  }))
}

//! Handler for `POST /consulta-natural`.
//!
//! The question goes to the RAG service first. Any failure there (transport
//! error, timeout, non-2xx status, a body without an answer) is answered
//! locally from the stored personas instead.

use axum::{
  Json,
  extract::{State, rejection::JsonRejection},
};
use chrono::Utc;
use padron_core::{
  answer::{STORE_UNAVAILABLE_ANSWER, local_answer},
  log::{LogAction, LogCategory},
  service,
  store::LogStore,
};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::{AppState, PrimaryStore, error::ApiError};

/// Questions and answers are journalled up to this many characters.
const PREVIEW_CHARS: usize = 100;

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct ConsultaBody {
  /// Kept untyped so a non-string value is reported like a missing one.
  pub consulta: Option<Value>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum AnswerSource {
  Rag,
  Local,
}

#[derive(Debug, Serialize)]
pub struct ConsultaResponse {
  pub answer: String,
  pub fuente: AnswerSource,
}

fn preview(text: &str) -> String {
  let mut chars = text.chars();
  let head: String = chars.by_ref().take(PREVIEW_CHARS).collect();
  if chars.next().is_some() { format!("{head}...") } else { head }
}

/// `POST /consulta-natural` — body: `{"consulta": "..."}`
pub async fn handler<S, L>(
  State(state): State<AppState<S, L>>,
  body: Result<Json<ConsultaBody>, JsonRejection>,
) -> Result<Json<ConsultaResponse>, ApiError>
where
  S: PrimaryStore,
  L: LogStore + 'static,
{
  let question = body
    .ok()
    .and_then(|Json(b)| b.consulta)
    .and_then(|v| v.as_str().map(str::to_owned))
    .filter(|q| !q.trim().is_empty());

  let Some(question) = question else {
    state
      .journal
      .record(
        LogAction::NaturalQueryError,
        "Consulta vacía o inválida recibida",
        LogCategory::Query,
      )
      .await;
    return Err(ApiError::BadRequest(
      "the question is required and must be text".to_owned(),
    ));
  };

  state
    .journal
    .record(
      LogAction::NaturalQuery,
      format!("Consulta recibida: \"{}\"", preview(&question)),
      LogCategory::Query,
    )
    .await;

  match state.rag.ask(&question).await {
    Ok(answer) => {
      state
        .journal
        .record(
          LogAction::NaturalQuerySuccess,
          format!("Respuesta RAG: \"{}\"", preview(&answer)),
          LogCategory::Query,
        )
        .await;
      Ok(Json(ConsultaResponse { answer, fuente: AnswerSource::Rag }))
    }
    Err(e) => {
      tracing::warn!(error = %e, "rag service unavailable; answering locally");

      let answer = match service::list(state.store.as_ref()).await {
        Ok(personas) => local_answer(&question, &personas, Utc::now()),
        Err(e) => {
          tracing::error!(error = %e, "cannot load personas for local answer");
          STORE_UNAVAILABLE_ANSWER.to_owned()
        }
      };

      state
        .journal
        .record(
          LogAction::NaturalQueryFallback,
          format!(
            "Servicio RAG no disponible. Respuesta local: \"{}\"",
            preview(&answer)
          ),
          LogCategory::Query,
        )
        .await;
      Ok(Json(ConsultaResponse { answer, fuente: AnswerSource::Local }))
    }
  }
}

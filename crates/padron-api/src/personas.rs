//! Handlers for `/personas` endpoints.
//!
//! | Method   | Path | Notes |
//! |----------|------|-------|
//! | `POST`   | `/personas` | Body: [`NewPersona`]; returns 201 + stored persona |
//! | `GET`    | `/personas` | Optional `?nroDocumento`, `?genero`, `?apellidos` |
//! | `GET`    | `/personas/{id}` | 404 if not found |
//! | `PUT`    | `/personas/{id}` | Body: [`PersonaPatch`]; only supplied fields change |
//! | `DELETE` | `/personas/{id}` | `{"id": ..., "eliminado": true}` |
//!
//! Every successful operation is journalled.

use axum::{
  Json,
  extract::{
    Path, Query, State,
    rejection::{JsonRejection, QueryRejection},
  },
  http::StatusCode,
  response::IntoResponse,
};
use padron_core::{
  log::{LogAction, LogCategory},
  persona::{Gender, NewPersona, Persona, PersonaPatch},
  service,
  store::{LogStore, PersonaQuery},
};
use serde::Deserialize;
use serde_json::{Value, json};
use uuid::Uuid;

use crate::{AppState, PrimaryStore, error::ApiError};

/// Path ids that are not UUIDs cannot name a stored persona.
fn parse_id(raw: &str) -> Result<Uuid, ApiError> {
  Uuid::parse_str(raw).map_err(|_| ApiError::NotFound(format!("persona not found: {raw}")))
}

// ─── Create ──────────────────────────────────────────────────────────────────

/// `POST /personas`
pub async fn create<S, L>(
  State(state): State<AppState<S, L>>,
  body: Result<Json<NewPersona>, JsonRejection>,
) -> Result<impl IntoResponse, ApiError>
where
  S: PrimaryStore,
  L: LogStore + 'static,
{
  let Json(input) = body?;
  let persona = service::create(state.store.as_ref(), input).await?;

  state
    .journal
    .record(
      LogAction::CreatePersona,
      format!(
        "Persona creada: {} (documento {})",
        persona.full_name(),
        persona.document_number
      ),
      LogCategory::User,
    )
    .await;

  Ok((StatusCode::CREATED, Json(persona)))
}

// ─── List / search ───────────────────────────────────────────────────────────

#[derive(Debug, Default, Deserialize)]
pub struct ListParams {
  #[serde(rename = "nroDocumento")]
  pub document_number: Option<String>,
  #[serde(rename = "genero")]
  pub gender:          Option<String>,
  #[serde(rename = "apellidos")]
  pub last_name:       Option<String>,
}

impl ListParams {
  /// Blank parameters are ignored, as the browser form sends them empty.
  fn into_query(self) -> Result<PersonaQuery, ApiError> {
    let nonblank = |v: Option<String>| {
      v.map(|s| s.trim().to_owned()).filter(|s| !s.is_empty())
    };
    let gender = nonblank(self.gender)
      .map(|g| {
        Gender::from_label(&g)
          .ok_or_else(|| ApiError::BadRequest(format!("unknown gender: {g:?}")))
      })
      .transpose()?;
    Ok(PersonaQuery {
      document_number: nonblank(self.document_number),
      gender,
      last_name: nonblank(self.last_name),
    })
  }
}

/// `GET /personas[?nroDocumento=...][&genero=...][&apellidos=...]`
pub async fn list<S, L>(
  State(state): State<AppState<S, L>>,
  params: Result<Query<ListParams>, QueryRejection>,
) -> Result<Json<Vec<Persona>>, ApiError>
where
  S: PrimaryStore,
  L: LogStore + 'static,
{
  let Query(params) = params?;
  let query = params.into_query()?;
  let personas = service::search(state.store.as_ref(), &query).await?;

  let (action, details) = if query.is_empty() {
    (
      LogAction::ListPersonas,
      format!("Consulta de todas las personas: {} resultados", personas.len()),
    )
  } else {
    (
      LogAction::SearchPersonas,
      format!("Búsqueda {}: {} resultados", describe(&query), personas.len()),
    )
  };
  state.journal.record(action, details, LogCategory::User).await;

  Ok(Json(personas))
}

fn describe(query: &PersonaQuery) -> String {
  let mut parts = Vec::new();
  if let Some(d) = &query.document_number {
    parts.push(format!("documento {d}"));
  }
  if let Some(g) = query.gender {
    parts.push(format!("género {}", g.label()));
  }
  if let Some(a) = &query.last_name {
    parts.push(format!("apellidos \"{a}\""));
  }
  parts.join(", ")
}

// ─── Get one ─────────────────────────────────────────────────────────────────

/// `GET /personas/{id}`
pub async fn get_one<S, L>(
  State(state): State<AppState<S, L>>,
  Path(id): Path<String>,
) -> Result<Json<Persona>, ApiError>
where
  S: PrimaryStore,
  L: LogStore + 'static,
{
  let id = parse_id(&id)?;
  let persona = service::get(state.store.as_ref(), id).await?;

  state
    .journal
    .record(
      LogAction::ReadPersona,
      format!("Consulta de persona {id} (documento {})", persona.document_number),
      LogCategory::User,
    )
    .await;

  Ok(Json(persona))
}

// ─── Update ──────────────────────────────────────────────────────────────────

/// `PUT /personas/{id}`
pub async fn update_one<S, L>(
  State(state): State<AppState<S, L>>,
  Path(id): Path<String>,
  body: Result<Json<PersonaPatch>, JsonRejection>,
) -> Result<Json<Persona>, ApiError>
where
  S: PrimaryStore,
  L: LogStore + 'static,
{
  let id = parse_id(&id)?;
  let Json(patch) = body?;
  let persona = service::update(state.store.as_ref(), id, patch).await?;

  state
    .journal
    .record(
      LogAction::UpdatePersona,
      format!(
        "Persona actualizada: {} (documento {})",
        persona.full_name(),
        persona.document_number
      ),
      LogCategory::User,
    )
    .await;

  Ok(Json(persona))
}

// ─── Delete ──────────────────────────────────────────────────────────────────

/// `DELETE /personas/{id}`
pub async fn delete_one<S, L>(
  State(state): State<AppState<S, L>>,
  Path(id): Path<String>,
) -> Result<Json<Value>, ApiError>
where
  S: PrimaryStore,
  L: LogStore + 'static,
{
  let id = parse_id(&id)?;
  let persona = service::get(state.store.as_ref(), id).await?;
  service::delete(state.store.as_ref(), id).await?;

  state
    .journal
    .record(
      LogAction::DeletePersona,
      format!(
        "Persona eliminada: {} (documento {})",
        persona.full_name(),
        persona.document_number
      ),
      LogCategory::User,
    )
    .await;

  Ok(Json(json!({ "id": id, "eliminado": true })))
}

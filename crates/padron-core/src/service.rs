//! Persona operations: validation, uniqueness and persistence.
//!
//! These functions are the only write path to a [`PersonaStore`]. They are
//! generic over the backend so the HTTP layer and tests share one
//! implementation.

use chrono::Utc;
use uuid::Uuid;

use crate::{
  Error, Result,
  persona::{NewPersona, Persona, PersonaPatch},
  store::{PersonaQuery, PersonaStore},
};

fn store_err<E: Into<Error>>(e: E) -> Error { e.into() }

/// Validate, normalise, check document uniqueness and persist.
///
/// The uniqueness check is a read-then-write; backends that enforce a
/// unique index report a lost race as the same
/// [`Error::DuplicateDocument`].
pub async fn create<S: PersonaStore>(store: &S, input: NewPersona) -> Result<Persona> {
  let fields = input.validate(Utc::now().date_naive())?;

  if store
    .find_by_document(&fields.document_number)
    .await
    .map_err(store_err)?
    .is_some()
  {
    return Err(Error::DuplicateDocument(fields.document_number));
  }

  let persona = Persona::new(Uuid::new_v4(), fields, Utc::now());
  let stored = store.insert_persona(persona).await.map_err(store_err)?;
  tracing::debug!(id = %stored.id, "persona created");
  Ok(stored)
}

/// Fetch one persona; [`Error::NotFound`] if absent.
pub async fn get<S: PersonaStore>(store: &S, id: Uuid) -> Result<Persona> {
  store
    .get_persona(id)
    .await
    .map_err(store_err)?
    .ok_or(Error::NotFound(id))
}

/// All personas, newest first.
pub async fn list<S: PersonaStore>(store: &S) -> Result<Vec<Persona>> {
  store.list_personas().await.map_err(store_err)
}

/// Personas matching `query`; an empty query lists everything.
pub async fn search<S: PersonaStore>(
  store: &S,
  query: &PersonaQuery,
) -> Result<Vec<Persona>> {
  if query.is_empty() {
    return list(store).await;
  }
  store.search_personas(query).await.map_err(store_err)
}

/// Validate the supplied fields and merge them into the stored persona.
///
/// Document uniqueness is re-checked only when the number changes.
pub async fn update<S: PersonaStore>(
  store: &S,
  id: Uuid,
  patch: PersonaPatch,
) -> Result<Persona> {
  let mut persona = get(store, id).await?;
  let changes = patch.validate(Utc::now().date_naive())?;

  if let Some(number) = &changes.document_number
    && *number != persona.document_number
    && let Some(holder) =
      store.find_by_document(number).await.map_err(store_err)?
    && holder.id != id
  {
    return Err(Error::DuplicateDocument(number.clone()));
  }

  changes.apply_to(&mut persona);
  persona.updated_at = Some(Utc::now());

  if !store
    .replace_persona(persona.clone())
    .await
    .map_err(store_err)?
  {
    return Err(Error::NotFound(id));
  }
  tracing::debug!(%id, "persona updated");
  Ok(persona)
}

/// Remove a persona; [`Error::NotFound`] if absent.
pub async fn delete<S: PersonaStore>(store: &S, id: Uuid) -> Result<()> {
  if !store.delete_persona(id).await.map_err(store_err)? {
    return Err(Error::NotFound(id));
  }
  tracing::debug!(%id, "persona deleted");
  Ok(())
}

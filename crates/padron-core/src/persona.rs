//! Persona — the identity record managed by the registry.
//!
//! Wire keys follow the camelCase Spanish names the browser frontend sends
//! and expects (`primerNombre`, `nroDocumento`, ...).

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

// ─── Enumerations ────────────────────────────────────────────────────────────

/// The kind of identity document a persona is registered with.
#[derive(
  Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize,
)]
pub enum DocumentType {
  #[default]
  #[serde(rename = "Cédula")]
  Cedula,
  #[serde(rename = "Tarjeta de identidad")]
  IdentityCard,
}

impl DocumentType {
  pub const ALL: [Self; 2] = [Self::Cedula, Self::IdentityCard];

  /// The label used on the wire and in storage.
  pub fn label(self) -> &'static str {
    match self {
      Self::Cedula => "Cédula",
      Self::IdentityCard => "Tarjeta de identidad",
    }
  }

  pub fn from_label(s: &str) -> Option<Self> {
    Self::ALL.into_iter().find(|d| d.label() == s)
  }
}

/// Closed set of gender options offered by the registration form.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Gender {
  #[serde(rename = "Masculino")]
  Male,
  #[serde(rename = "Femenino")]
  Female,
  #[serde(rename = "No binario")]
  NonBinary,
  #[serde(rename = "Prefiero no reportar")]
  Undisclosed,
}

impl Gender {
  pub const ALL: [Self; 4] =
    [Self::Male, Self::Female, Self::NonBinary, Self::Undisclosed];

  pub fn label(self) -> &'static str {
    match self {
      Self::Male => "Masculino",
      Self::Female => "Femenino",
      Self::NonBinary => "No binario",
      Self::Undisclosed => "Prefiero no reportar",
    }
  }

  pub fn from_label(s: &str) -> Option<Self> {
    Self::ALL.into_iter().find(|g| g.label() == s)
  }
}

// ─── Persona ─────────────────────────────────────────────────────────────────

/// A stored, validated identity record.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Persona {
  pub id:              Uuid,
  #[serde(rename = "tipoDocumento")]
  pub document_type:   DocumentType,
  /// Digits only, at most ten; unique within the primary store.
  #[serde(rename = "nroDocumento")]
  pub document_number: String,
  #[serde(rename = "primerNombre")]
  pub first_name:      String,
  /// Empty when the persona has no middle name.
  #[serde(rename = "segundoNombre")]
  pub middle_name:     String,
  #[serde(rename = "apellidos")]
  pub last_name:       String,
  #[serde(rename = "fechaNacimiento")]
  pub birth_date:      NaiveDate,
  #[serde(rename = "genero")]
  pub gender:          Gender,
  /// Trimmed and lowercased.
  #[serde(rename = "correo")]
  pub email:           String,
  /// Separators stripped; optional `+` country prefix followed by 10 digits.
  #[serde(rename = "celular")]
  pub phone:           String,
  #[serde(rename = "createdAt")]
  pub created_at:      DateTime<Utc>,
  #[serde(rename = "updatedAt")]
  pub updated_at:      Option<DateTime<Utc>>,
}

impl Persona {
  /// Build a persona from validated fields. `updated_at` starts empty.
  pub fn new(id: Uuid, fields: PersonaFields, created_at: DateTime<Utc>) -> Self {
    Self {
      id,
      document_type: fields.document_type,
      document_number: fields.document_number,
      first_name: fields.first_name,
      middle_name: fields.middle_name,
      last_name: fields.last_name,
      birth_date: fields.birth_date,
      gender: fields.gender,
      email: fields.email,
      phone: fields.phone,
      created_at,
      updated_at: None,
    }
  }

  /// "First Middle Last", skipping an empty middle name.
  pub fn full_name(&self) -> String {
    [&self.first_name, &self.middle_name, &self.last_name]
      .into_iter()
      .filter(|s| !s.is_empty())
      .map(String::as_str)
      .collect::<Vec<_>>()
      .join(" ")
  }

  /// Completed years of age on `today`; `None` if born after `today`.
  pub fn age_on(&self, today: NaiveDate) -> Option<u32> {
    today.years_since(self.birth_date)
  }
}

/// Validated and normalised persona data, prior to persistence.
#[derive(Debug, Clone, PartialEq)]
pub struct PersonaFields {
  pub document_type:   DocumentType,
  pub document_number: String,
  pub first_name:      String,
  pub middle_name:     String,
  pub last_name:       String,
  pub birth_date:      NaiveDate,
  pub gender:          Gender,
  pub email:           String,
  pub phone:           String,
}

// ─── Inputs ──────────────────────────────────────────────────────────────────

/// Raw creation payload. Every field is kept as text so a malformed value
/// surfaces as a [`crate::ValidationError`] instead of a decoding failure.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct NewPersona {
  #[serde(rename = "tipoDocumento")]
  pub document_type:   Option<String>,
  #[serde(rename = "nroDocumento")]
  pub document_number: String,
  #[serde(rename = "primerNombre")]
  pub first_name:      String,
  #[serde(rename = "segundoNombre")]
  pub middle_name:     Option<String>,
  #[serde(rename = "apellidos")]
  pub last_name:       String,
  #[serde(rename = "fechaNacimiento")]
  pub birth_date:      String,
  #[serde(rename = "genero")]
  pub gender:          String,
  #[serde(rename = "correo")]
  pub email:           String,
  #[serde(rename = "celular")]
  pub phone:           String,
}

/// Partial update payload; only supplied fields are validated and merged.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct PersonaPatch {
  #[serde(rename = "tipoDocumento")]
  pub document_type:   Option<String>,
  #[serde(rename = "nroDocumento")]
  pub document_number: Option<String>,
  #[serde(rename = "primerNombre")]
  pub first_name:      Option<String>,
  /// `Some("")` clears the middle name.
  #[serde(rename = "segundoNombre")]
  pub middle_name:     Option<String>,
  #[serde(rename = "apellidos")]
  pub last_name:       Option<String>,
  #[serde(rename = "fechaNacimiento")]
  pub birth_date:      Option<String>,
  #[serde(rename = "genero")]
  pub gender:          Option<String>,
  #[serde(rename = "correo")]
  pub email:           Option<String>,
  #[serde(rename = "celular")]
  pub phone:           Option<String>,
}

/// A validated [`PersonaPatch`].
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PersonaChanges {
  pub document_type:   Option<DocumentType>,
  pub document_number: Option<String>,
  pub first_name:      Option<String>,
  pub middle_name:     Option<String>,
  pub last_name:       Option<String>,
  pub birth_date:      Option<NaiveDate>,
  pub gender:          Option<Gender>,
  pub email:           Option<String>,
  pub phone:           Option<String>,
}

impl PersonaChanges {
  /// Merge the supplied fields into `persona`. Timestamps are left alone.
  pub fn apply_to(self, persona: &mut Persona) {
    if let Some(v) = self.document_type {
      persona.document_type = v;
    }
    if let Some(v) = self.document_number {
      persona.document_number = v;
    }
    if let Some(v) = self.first_name {
      persona.first_name = v;
    }
    if let Some(v) = self.middle_name {
      persona.middle_name = v;
    }
    if let Some(v) = self.last_name {
      persona.last_name = v;
    }
    if let Some(v) = self.birth_date {
      persona.birth_date = v;
    }
    if let Some(v) = self.gender {
      persona.gender = v;
    }
    if let Some(v) = self.email {
      persona.email = v;
    }
    if let Some(v) = self.phone {
      persona.phone = v;
    }
  }
}

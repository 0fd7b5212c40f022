//! Encoding and decoding helpers between domain types and the plain-text
//! representations stored in SQLite columns.
//!
//! Timestamps are RFC 3339 UTC with fixed nanosecond precision so that
//! string comparison in SQL orders them correctly. Enums are stored as
//! their wire labels. UUIDs are hyphenated lowercase strings.

use chrono::{DateTime, NaiveDate, SecondsFormat, Utc};
use padron_core::{
  log::{LogAction, LogCategory, LogEntry, Provenance},
  persona::{DocumentType, Gender, Persona},
};
use uuid::Uuid;

use crate::{Error, Result};

// ─── Scalars ─────────────────────────────────────────────────────────────────

pub fn encode_uuid(id: Uuid) -> String { id.hyphenated().to_string() }

pub fn decode_uuid(s: &str) -> Result<Uuid> { Ok(Uuid::parse_str(s)?) }

pub fn encode_dt(dt: DateTime<Utc>) -> String {
  dt.to_rfc3339_opts(SecondsFormat::Nanos, true)
}

pub fn decode_dt(s: &str) -> Result<DateTime<Utc>> {
  DateTime::parse_from_rfc3339(s)
    .map(|dt| dt.with_timezone(&Utc))
    .map_err(|e| Error::DateParse(e.to_string()))
}

pub fn encode_date(d: NaiveDate) -> String { d.format("%Y-%m-%d").to_string() }

pub fn decode_date(s: &str) -> Result<NaiveDate> {
  NaiveDate::parse_from_str(s, "%Y-%m-%d").map_err(|e| Error::DateParse(e.to_string()))
}

fn label<T>(
  kind: &'static str,
  value: String,
  parse: impl Fn(&str) -> Option<T>,
) -> Result<T> {
  parse(&value).ok_or(Error::UnknownLabel { kind, value })
}

// ─── Row types ───────────────────────────────────────────────────────────────

pub const PERSONA_COLUMNS: &str = "id, document_type, document_number, \
  first_name, middle_name, last_name, birth_date, gender, email, phone, \
  created_at, updated_at";

/// Raw strings read directly from a `personas` row.
pub struct RawPersona {
  pub id:              String,
  pub document_type:   String,
  pub document_number: String,
  pub first_name:      String,
  pub middle_name:     String,
  pub last_name:       String,
  pub birth_date:      String,
  pub gender:          String,
  pub email:           String,
  pub phone:           String,
  pub created_at:      String,
  pub updated_at:      Option<String>,
}

impl RawPersona {
  /// Map a row selected with [`PERSONA_COLUMNS`].
  pub fn from_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<Self> {
    Ok(Self {
      id:              row.get(0)?,
      document_type:   row.get(1)?,
      document_number: row.get(2)?,
      first_name:      row.get(3)?,
      middle_name:     row.get(4)?,
      last_name:       row.get(5)?,
      birth_date:      row.get(6)?,
      gender:          row.get(7)?,
      email:           row.get(8)?,
      phone:           row.get(9)?,
      created_at:      row.get(10)?,
      updated_at:      row.get(11)?,
    })
  }

  /// The same columns, in [`PERSONA_COLUMNS`] order, for an insert.
  pub fn from_persona(p: &Persona) -> Self {
    Self {
      id:              encode_uuid(p.id),
      document_type:   p.document_type.label().to_owned(),
      document_number: p.document_number.clone(),
      first_name:      p.first_name.clone(),
      middle_name:     p.middle_name.clone(),
      last_name:       p.last_name.clone(),
      birth_date:      encode_date(p.birth_date),
      gender:          p.gender.label().to_owned(),
      email:           p.email.clone(),
      phone:           p.phone.clone(),
      created_at:      encode_dt(p.created_at),
      updated_at:      p.updated_at.map(encode_dt),
    }
  }

  pub fn into_persona(self) -> Result<Persona> {
    Ok(Persona {
      id:              decode_uuid(&self.id)?,
      document_type:   label("document type", self.document_type, DocumentType::from_label)?,
      document_number: self.document_number,
      first_name:      self.first_name,
      middle_name:     self.middle_name,
      last_name:       self.last_name,
      birth_date:      decode_date(&self.birth_date)?,
      gender:          label("gender", self.gender, Gender::from_label)?,
      email:           self.email,
      phone:           self.phone,
      created_at:      decode_dt(&self.created_at)?,
      updated_at:      self.updated_at.as_deref().map(decode_dt).transpose()?,
    })
  }
}

pub const LOG_COLUMNS: &str =
  "id, action, details, category, timestamp, provenance, secondary_acknowledged";

/// Raw values read directly from a `logs` row.
pub struct RawLogEntry {
  pub id:                     String,
  pub action:                 String,
  pub details:                String,
  pub category:               String,
  pub timestamp:              String,
  pub provenance:             String,
  pub secondary_acknowledged: bool,
}

impl RawLogEntry {
  /// Map a row selected with [`LOG_COLUMNS`].
  pub fn from_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<Self> {
    Ok(Self {
      id:                     row.get(0)?,
      action:                 row.get(1)?,
      details:                row.get(2)?,
      category:               row.get(3)?,
      timestamp:              row.get(4)?,
      provenance:             row.get(5)?,
      secondary_acknowledged: row.get(6)?,
    })
  }

  pub fn from_entry(e: &LogEntry) -> Self {
    Self {
      id:                     encode_uuid(e.id),
      action:                 e.action.label().to_owned(),
      details:                e.details.clone(),
      category:               e.category.label().to_owned(),
      timestamp:              encode_dt(e.timestamp),
      provenance:             e.provenance.label().to_owned(),
      secondary_acknowledged: e.secondary_acknowledged,
    }
  }

  pub fn into_entry(self) -> Result<LogEntry> {
    Ok(LogEntry {
      id:                     decode_uuid(&self.id)?,
      action:                 label("log action", self.action, LogAction::from_label)?,
      details:                self.details,
      category:               label("log category", self.category, LogCategory::from_label)?,
      timestamp:              decode_dt(&self.timestamp)?,
      provenance:             label("provenance", self.provenance, Provenance::from_label)?,
      secondary_acknowledged: self.secondary_acknowledged,
    })
  }
}

//! Field validation and normalisation for persona data.
//!
//! Each function takes the raw text supplied by a client and returns the
//! normalised value that is persisted, or the [`ValidationError`] for that
//! field. Date rules take `today` explicitly so they are testable.

use chrono::{DateTime, Months, NaiveDate};
use once_cell::sync::Lazy;
use regex::Regex;

use crate::{
  ValidationError,
  persona::{
    DocumentType, Gender, NewPersona, PersonaChanges, PersonaFields,
    PersonaPatch,
  },
};

pub const MAX_NAME_CHARS: usize = 30;
pub const MAX_LAST_NAME_CHARS: usize = 60;

static NAME_RE: Lazy<Regex> = Lazy::new(|| {
  Regex::new(r"^[A-Za-zÁáÉéÍíÓóÚúÜüÑñ\s']+$").expect("valid name regex")
});
static LAST_NAME_RE: Lazy<Regex> = Lazy::new(|| {
  Regex::new(r"^[A-Za-zÁáÉéÍíÓóÚúÜüÑñ\s'-]+$").expect("valid surname regex")
});
static DOCUMENT_RE: Lazy<Regex> =
  Lazy::new(|| Regex::new(r"^[0-9]{1,10}$").expect("valid document regex"));
static EMAIL_RE: Lazy<Regex> = Lazy::new(|| {
  Regex::new(r"^[^\s@]+@[^\s@]+\.[^\s@]+$").expect("valid email regex")
});
static PHONE_RE: Lazy<Regex> =
  Lazy::new(|| Regex::new(r"^(\+[0-9]{1,3})?[0-9]{10}$").expect("valid phone regex"));

// ─── Single fields ───────────────────────────────────────────────────────────

fn name_like(
  raw: &str,
  re: &Regex,
  max: usize,
  err: ValidationError,
) -> Result<String, ValidationError> {
  let trimmed = raw.trim();
  if trimmed.is_empty() || trimmed.chars().count() > max || !re.is_match(trimmed)
  {
    return Err(err);
  }
  Ok(trimmed.to_owned())
}

pub fn first_name(raw: &str) -> Result<String, ValidationError> {
  name_like(raw, &NAME_RE, MAX_NAME_CHARS, ValidationError::FirstName)
}

/// An empty or blank middle name is accepted and stored as `""`.
pub fn middle_name(raw: &str) -> Result<String, ValidationError> {
  if raw.trim().is_empty() {
    return Ok(String::new());
  }
  name_like(raw, &NAME_RE, MAX_NAME_CHARS, ValidationError::MiddleName)
}

pub fn last_name(raw: &str) -> Result<String, ValidationError> {
  name_like(raw, &LAST_NAME_RE, MAX_LAST_NAME_CHARS, ValidationError::LastName)
}

pub fn document_number(raw: &str) -> Result<String, ValidationError> {
  let trimmed = raw.trim();
  if !DOCUMENT_RE.is_match(trimmed) {
    return Err(ValidationError::DocumentNumber);
  }
  Ok(trimmed.to_owned())
}

/// `None` selects the default document type.
pub fn document_type(raw: Option<&str>) -> Result<DocumentType, ValidationError> {
  match raw.map(str::trim) {
    None | Some("") => Ok(DocumentType::default()),
    Some(s) => DocumentType::from_label(s)
      .ok_or_else(|| ValidationError::DocumentType(s.to_owned())),
  }
}

pub fn gender(raw: &str) -> Result<Gender, ValidationError> {
  Gender::from_label(raw.trim()).ok_or(ValidationError::Gender)
}

pub fn email(raw: &str) -> Result<String, ValidationError> {
  let normalised = raw.trim().to_lowercase();
  if !EMAIL_RE.is_match(&normalised) {
    return Err(ValidationError::Email);
  }
  Ok(normalised)
}

/// Strips spaces and hyphens before matching.
pub fn phone(raw: &str) -> Result<String, ValidationError> {
  let stripped: String = raw
    .chars()
    .filter(|c| !c.is_whitespace() && *c != '-')
    .collect();
  if !PHONE_RE.is_match(&stripped) {
    return Err(ValidationError::Phone);
  }
  Ok(stripped)
}

/// Accepts `YYYY-MM-DD` or a full RFC 3339 timestamp (its date part is
/// kept). The date must not be in the future and must be at least one year
/// before `today`.
pub fn birth_date(raw: &str, today: NaiveDate) -> Result<NaiveDate, ValidationError> {
  let trimmed = raw.trim();
  let date = NaiveDate::parse_from_str(trimmed, "%Y-%m-%d")
    .ok()
    .or_else(|| {
      DateTime::parse_from_rfc3339(trimmed)
        .ok()
        .map(|dt| dt.date_naive())
    })
    .ok_or_else(|| ValidationError::BirthDate(trimmed.to_owned()))?;

  if date > today {
    return Err(ValidationError::BirthDateInFuture);
  }

  let one_year_ago = today
    .checked_sub_months(Months::new(12))
    .ok_or_else(|| ValidationError::BirthDate(trimmed.to_owned()))?;
  if date > one_year_ago {
    return Err(ValidationError::TooYoung);
  }

  Ok(date)
}

// ─── Whole payloads ──────────────────────────────────────────────────────────

impl NewPersona {
  /// Validate every field, in form order, returning the first failure.
  pub fn validate(&self, today: NaiveDate) -> Result<PersonaFields, ValidationError> {
    Ok(PersonaFields {
      first_name:      first_name(&self.first_name)?,
      middle_name:     middle_name(self.middle_name.as_deref().unwrap_or(""))?,
      last_name:       last_name(&self.last_name)?,
      document_type:   document_type(self.document_type.as_deref())?,
      document_number: document_number(&self.document_number)?,
      gender:          gender(&self.gender)?,
      email:           email(&self.email)?,
      phone:           phone(&self.phone)?,
      birth_date:      birth_date(&self.birth_date, today)?,
    })
  }
}

impl PersonaPatch {
  /// Validate only the fields that were supplied.
  pub fn validate(&self, today: NaiveDate) -> Result<PersonaChanges, ValidationError> {
    Ok(PersonaChanges {
      first_name:      self.first_name.as_deref().map(first_name).transpose()?,
      middle_name:     self.middle_name.as_deref().map(middle_name).transpose()?,
      last_name:       self.last_name.as_deref().map(last_name).transpose()?,
      document_type:   self
        .document_type
        .as_deref()
        .map(|s| document_type(Some(s)))
        .transpose()?,
      document_number: self
        .document_number
        .as_deref()
        .map(document_number)
        .transpose()?,
      gender:          self.gender.as_deref().map(gender).transpose()?,
      email:           self.email.as_deref().map(email).transpose()?,
      phone:           self.phone.as_deref().map(phone).transpose()?,
      birth_date:      self
        .birth_date
        .as_deref()
        .map(|s| birth_date(s, today))
        .transpose()?,
    })
  }
}

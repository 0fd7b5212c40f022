//! Local answers to natural-language questions, used when the RAG service
//! is unreachable.
//!
//! The question is lowercased and matched against keyword groups in a
//! fixed order; the first group that matches decides the answer. Answers
//! are Spanish sentences computed from the full persona list.

use chrono::{DateTime, NaiveDate, Utc};
use once_cell::sync::Lazy;
use regex::Regex;

use crate::persona::{Gender, Persona};

/// Returned when the persona store cannot be read.
pub const STORE_UNAVAILABLE_ANSWER: &str = "No se pudo conectar con la base de datos para procesar tu consulta. Por favor, intenta más tarde.";

/// Maximum number of personas listed by a name search.
const NAME_MATCHES_SHOWN: usize = 5;

static DOCUMENT_RE: Lazy<Regex> =
  Lazy::new(|| Regex::new(r"\b[0-9]{6,10}\b").expect("valid regex"));

static NAME_RE: Lazy<Regex> = Lazy::new(|| {
  Regex::new(r"(?:buscar|llamada?|llamado|nombre)\s+(\w+)").expect("valid regex")
});

/// Answer `question` from `personas` as of `now`.
pub fn local_answer(question: &str, personas: &[Persona], now: DateTime<Utc>) -> String {
  let q = question.to_lowercase();
  let today = now.date_naive();
  let has = |words: &[&str]| words.iter().any(|w| q.contains(w));

  if personas.is_empty() {
    return "No hay personas registradas en el sistema actualmente.".into();
  }
  let total = personas.len();

  if has(&["total", "cuántas", "cuantas", "cantidad"]) {
    return format!(
      "En el sistema hay registradas {total} {} en total.",
      personas_word(total)
    );
  }

  if has(&["género", "genero"]) {
    return gender_answer(&q, personas);
  }

  if has(&["edad", "promedio", "media"]) {
    return age_statistics(personas, today);
  }

  if has(&["joven", "menor", "edad mínima"]) {
    return match extreme_age(personas, today, |age, best| age < best) {
      Some((p, age)) => format!(
        "La persona más joven registrada es {} {} con {age} años.",
        p.first_name, p.last_name
      ),
      None => "No se puede determinar la persona más joven porque no hay fechas de nacimiento válidas.".into(),
    };
  }

  if has(&["mayor", "viejo", "edad máxima"]) {
    return match extreme_age(personas, today, |age, best| age > best) {
      Some((p, age)) => format!(
        "La persona mayor registrada es {} {} con {age} años.",
        p.first_name, p.last_name
      ),
      None => "No se puede determinar la persona mayor porque no hay fechas de nacimiento válidas.".into(),
    };
  }

  if has(&["última", "ultima", "reciente", "último registro"]) {
    return match personas.iter().max_by_key(|p| p.created_at) {
      Some(p) => format!(
        "La última persona registrada fue {} {} el {}.",
        p.first_name,
        p.last_name,
        p.created_at.format("%d/%m/%Y, %H:%M")
      ),
      None => "No se puede determinar la última persona registrada.".into(),
    };
  }

  if let Some(m) = DOCUMENT_RE.find(&q)
    && has(&["documento", "cedula", "cédula"])
  {
    let number = m.as_str();
    return match personas.iter().find(|p| p.document_number == number) {
      Some(p) => format!(
        "Se encontró a {} con documento {number}. Género: {}, Correo: {}.",
        p.full_name(),
        p.gender.label(),
        p.email
      ),
      None => format!(
        "No se encontró ninguna persona con el número de documento {number}."
      ),
    };
  }

  if let Some(caps) = NAME_RE.captures(&q) {
    return name_search(&caps[1], personas);
  }

  summary(personas)
}

fn personas_word(n: usize) -> &'static str {
  if n == 1 { "persona" } else { "personas" }
}

fn percent(count: usize, total: usize) -> String {
  format!("{:.1}", count as f64 * 100.0 / total as f64)
}

/// Counts per gender in declaration order, omitting genders nobody has.
fn gender_counts(personas: &[Persona]) -> Vec<(Gender, usize)> {
  Gender::ALL
    .into_iter()
    .map(|g| (g, personas.iter().filter(|p| p.gender == g).count()))
    .filter(|(_, n)| *n > 0)
    .collect()
}

fn gender_answer(q: &str, personas: &[Persona]) -> String {
  let total = personas.len();
  let count = |g: Gender| personas.iter().filter(|p| p.gender == g).count();

  if ["femenino", "mujer"].iter().any(|w| q.contains(w)) {
    let n = count(Gender::Female);
    return format!(
      "Hay {n} {} de género femenino registradas ({}% del total).",
      personas_word(n),
      percent(n, total)
    );
  }
  if ["masculino", "hombre"].iter().any(|w| q.contains(w)) {
    let n = count(Gender::Male);
    return format!(
      "Hay {n} {} de género masculino registradas ({}% del total).",
      personas_word(n),
      percent(n, total)
    );
  }
  if q.contains("no binario") {
    let n = count(Gender::NonBinary);
    return format!("Hay {n} {} registradas como no binario.", personas_word(n));
  }

  let mut out = String::from("La distribución por género es:");
  for (g, n) in gender_counts(personas) {
    out.push_str(&format!(
      "\n• {}: {n} {} ({}%)",
      g.label(),
      personas_word(n),
      percent(n, total)
    ));
  }
  out
}

fn age_statistics(personas: &[Persona], today: NaiveDate) -> String {
  let ages: Vec<u32> = personas.iter().filter_map(|p| p.age_on(today)).collect();
  let (Some(min), Some(max)) = (ages.iter().min(), ages.iter().max()) else {
    return "No se pueden calcular estadísticas de edad porque no hay fechas de nacimiento válidas.".into();
  };
  let avg = ages.iter().map(|&a| f64::from(a)).sum::<f64>() / ages.len() as f64;
  format!(
    "Estadísticas de edad basadas en {} registros:\n• Promedio: {avg:.1} años\n• Edad mínima: {min} años\n• Edad máxima: {max} años",
    ages.len()
  )
}

/// The first persona whose age beats every earlier one under `better`.
fn extreme_age(
  personas: &[Persona],
  today: NaiveDate,
  better: impl Fn(u32, u32) -> bool,
) -> Option<(&Persona, u32)> {
  let mut best: Option<(&Persona, u32)> = None;
  for p in personas {
    let Some(age) = p.age_on(today) else { continue };
    if best.is_none_or(|(_, b)| better(age, b)) {
      best = Some((p, age));
    }
  }
  best
}

fn name_search(name: &str, personas: &[Persona]) -> String {
  let matches: Vec<&Persona> = personas
    .iter()
    .filter(|p| {
      [&p.first_name, &p.middle_name, &p.last_name]
        .iter()
        .any(|part| part.to_lowercase().contains(name))
    })
    .collect();

  match matches.as_slice() {
    [] => format!("No se encontraron personas con el nombre \"{name}\"."),
    [p] => format!("Se encontró a {} (Doc: {}).", p.full_name(), p.document_number),
    _ => {
      let mut out = format!(
        "Se encontraron {} personas con el nombre \"{name}\":",
        matches.len()
      );
      for p in matches.iter().take(NAME_MATCHES_SHOWN) {
        out.push_str(&format!("\n• {} (Doc: {})", p.full_name(), p.document_number));
      }
      if matches.len() > NAME_MATCHES_SHOWN {
        out.push_str(&format!("\n... y {} más.", matches.len() - NAME_MATCHES_SHOWN));
      }
      out
    }
  }
}

fn summary(personas: &[Persona]) -> String {
  let mut out = format!(
    "Resumen del sistema:\n• Total de personas registradas: {}\n• Distribución por género:",
    personas.len()
  );
  for (g, n) in gender_counts(personas) {
    out.push_str(&format!("\n  - {}: {n}", g.label()));
  }
  out.push_str(
    "\n\nPuedes preguntar por estadísticas específicas, búsquedas por nombre o documento, edades, etc.",
  );
  out
}

#[cfg(test)]
mod tests {
  use chrono::TimeZone;
  use uuid::Uuid;

  use super::*;
  use crate::persona::DocumentType;

  fn now() -> DateTime<Utc> { Utc.with_ymd_and_hms(2025, 6, 15, 12, 0, 0).unwrap() }

  fn persona(
    doc: &str,
    first: &str,
    last: &str,
    born: (i32, u32, u32),
    gender: Gender,
    created_day: u32,
  ) -> Persona {
    Persona {
      id: Uuid::new_v4(),
      document_type: DocumentType::Cedula,
      document_number: doc.into(),
      first_name: first.into(),
      middle_name: String::new(),
      last_name: last.into(),
      birth_date: NaiveDate::from_ymd_opt(born.0, born.1, born.2).unwrap(),
      gender,
      email: format!("{}@example.com", first.to_lowercase()),
      phone: "3001234567".into(),
      created_at: Utc.with_ymd_and_hms(2025, 6, created_day, 9, 30, 0).unwrap(),
      updated_at: None,
    }
  }

  fn sample() -> Vec<Persona> {
    vec![
      persona("1010101010", "Ana", "Rojas", (1990, 1, 1), Gender::Female, 1),
      persona("2020202020", "Luis", "Pérez", (1980, 6, 16), Gender::Male, 3),
      persona("3030303030", "Sara", "Rojas Mora", (2005, 3, 3), Gender::Female, 2),
    ]
  }

  #[test]
  fn empty_store() {
    let a = local_answer("cuántas personas hay", &[], now());
    assert_eq!(a, "No hay personas registradas en el sistema actualmente.");
  }

  #[test]
  fn total_count() {
    let a = local_answer("¿Cuántas personas hay?", &sample(), now());
    assert_eq!(a, "En el sistema hay registradas 3 personas en total.");
    let one = &sample()[..1];
    assert!(local_answer("total", one, now()).contains("1 persona en total"));
  }

  #[test]
  fn gender_branches() {
    let ps = sample();
    assert_eq!(
      local_answer("género femenino", &ps, now()),
      "Hay 2 personas de género femenino registradas (66.7% del total)."
    );
    assert!(local_answer("genero hombre", &ps, now()).starts_with("Hay 1 persona de género masculino"));
    assert!(local_answer("genero no binario", &ps, now()).starts_with("Hay 0 personas"));

    let dist = local_answer("distribución por genero", &ps, now());
    assert!(dist.starts_with("La distribución por género es:"));
    let masc = dist.find("Masculino").unwrap();
    let fem = dist.find("Femenino").unwrap();
    assert!(masc < fem);
    assert!(!dist.contains("No binario"));
  }

  #[test]
  fn age_statistics_branch() {
    let a = local_answer("edad promedio", &sample(), now());
    // Ages on 2025-06-15: 35, 44 (birthday tomorrow), 20.
    assert!(a.contains("basadas en 3 registros"), "{a}");
    assert!(a.contains("Promedio: 33.0 años"), "{a}");
    assert!(a.contains("Edad mínima: 20 años"));
    assert!(a.contains("Edad máxima: 44 años"));
  }

  #[test]
  fn youngest_and_oldest() {
    let ps = sample();
    assert_eq!(
      local_answer("la más joven", &ps, now()),
      "La persona más joven registrada es Sara Rojas Mora con 20 años."
    );
    assert_eq!(
      local_answer("el más viejo", &ps, now()),
      "La persona mayor registrada es Luis Pérez con 44 años."
    );
  }

  #[test]
  fn most_recent_registration() {
    let a = local_answer("última persona", &sample(), now());
    assert_eq!(a, "La última persona registrada fue Luis Pérez el 03/06/2025, 09:30.");
  }

  #[test]
  fn document_lookup_needs_keyword() {
    let ps = sample();
    let a = local_answer("cédula 2020202020", &ps, now());
    assert!(a.starts_with("Se encontró a Luis Pérez con documento 2020202020."));
    assert!(a.contains("Género: Masculino"));

    let miss = local_answer("documento 999999", &ps, now());
    assert!(miss.contains("ningún") || miss.contains("ninguna"));

    // No keyword: falls through to the summary.
    assert!(local_answer("2020202020", &ps, now()).starts_with("Resumen del sistema"));
  }

  #[test]
  fn name_search_lists_matches() {
    let ps = sample();
    assert_eq!(
      local_answer("buscar luis", &ps, now()),
      "Se encontró a Luis Pérez (Doc: 2020202020)."
    );
    let many = local_answer("nombre rojas", &ps, now());
    assert!(many.starts_with("Se encontraron 2 personas con el nombre \"rojas\":"));
    assert!(local_answer("llamado pedro", &ps, now()).starts_with("No se encontraron"));
  }

  #[test]
  fn name_search_truncates_after_five() {
    let ps: Vec<Persona> = (0..7)
      .map(|i| {
        persona(&format!("10000000{i}"), "Ana", "Gil", (1990, 1, 1), Gender::Female, 1)
      })
      .collect();
    let a = local_answer("buscar ana", &ps, now());
    assert_eq!(a.lines().filter(|l| l.starts_with('•')).count(), 5);
    assert!(a.ends_with("... y 2 más."));
  }

  #[test]
  fn summary_is_default() {
    let a = local_answer("hola", &sample(), now());
    assert!(a.starts_with("Resumen del sistema:"));
    assert!(a.contains("Total de personas registradas: 3"));
    assert!(a.contains("  - Femenino: 2"));
  }
}

//! JSON REST API for Padron.
//!
//! Exposes an axum [`Router`] backed by any primary store implementing both
//! [`PersonaStore`] and [`LogStore`], plus an optional secondary
//! [`LogStore`] for the audit journal.
//!
//! # Mounting
//!
//! ```rust,ignore
//! let app = padron_api::app(state);
//! axum::serve(listener, app).await?;
//! ```

pub mod consulta;
pub mod error;
pub mod health;
pub mod logs;
pub mod personas;
pub mod rag;

use std::sync::Arc;

use axum::{
  Router,
  routing::{get, post},
};
use padron_core::{
  journal::HybridLog,
  store::{LogStore, PersonaStore},
};
use tower_http::{cors::CorsLayer, trace::TraceLayer};

pub use error::ApiError;
pub use rag::RagClient;

/// A store that holds personas and keeps the primary copy of the journal.
pub trait PrimaryStore: PersonaStore + LogStore + 'static {}

impl<T: PersonaStore + LogStore + 'static> PrimaryStore for T {}

// ─── Application state ───────────────────────────────────────────────────────

/// Shared state threaded through all handlers.
pub struct AppState<S, L> {
  pub store:      Arc<S>,
  pub journal:    HybridLog<S, L>,
  pub rag:        RagClient,
  /// Short name of the primary backend, reported by `/health/debug`.
  pub store_kind: &'static str,
}

impl<S, L> Clone for AppState<S, L> {
  fn clone(&self) -> Self {
    Self {
      store:      self.store.clone(),
      journal:    self.journal.clone(),
      rag:        self.rag.clone(),
      store_kind: self.store_kind,
    }
  }
}

impl<S: PrimaryStore, L: LogStore + 'static> AppState<S, L> {
  /// `store` serves personas and is the primary journal store; `secondary`
  /// is the dedicated log store, if any.
  pub fn new(
    store: Arc<S>,
    secondary: Option<Arc<L>>,
    rag: RagClient,
    store_kind: &'static str,
  ) -> Self {
    Self {
      journal: HybridLog::new(Some(store.clone()), secondary),
      store,
      rag,
      store_kind,
    }
  }

  pub fn with_log_limits(mut self, row_limit: usize, cap: usize) -> Self {
    self.journal = self.journal.with_limits(row_limit, cap);
    self
  }
}

// ─── Router ──────────────────────────────────────────────────────────────────

/// Build the `/api` routes for `state`.
///
/// The returned `Router<()>` can be nested into any parent router regardless
/// of its own state type.
pub fn api_router<S, L>(state: AppState<S, L>) -> Router<()>
where
  S: PrimaryStore,
  L: LogStore + 'static,
{
  Router::new()
    // Personas
    .route(
      "/personas",
      get(personas::list::<S, L>).post(personas::create::<S, L>),
    )
    .route(
      "/personas/{id}",
      get(personas::get_one::<S, L>)
        .put(personas::update_one::<S, L>)
        .delete(personas::delete_one::<S, L>),
    )
    // Journal
    .route("/logs", get(logs::list::<S, L>).post(logs::create::<S, L>))
    .route("/logs/estadisticas", get(logs::stats::<S, L>))
    // Natural-language queries
    .route("/consulta-natural", post(consulta::handler::<S, L>))
    // Health
    .route("/health", get(health::backend))
    .route("/health/rag", get(health::rag::<S, L>))
    .route("/health/log-store", get(health::log_store::<S, L>))
    .route("/health/debug", get(health::debug::<S, L>))
    .with_state(state)
}

/// The complete application: `/api` routes with request tracing and
/// permissive CORS for the browser frontend.
pub fn app<S, L>(state: AppState<S, L>) -> Router<()>
where
  S: PrimaryStore,
  L: LogStore + 'static,
{
  Router::new()
    .nest("/api", api_router(state))
    .layer(TraceLayer::new_for_http())
    .layer(CorsLayer::permissive())
}

#[cfg(test)]
mod tests {
  use std::time::Duration;

  use axum::{
    Json,
    body::Body,
    http::{Request, StatusCode},
  };
  use padron_core::{log::LogQuery, memory::MemoryStore};
  use serde_json::{Value, json};
  use tokio::net::TcpListener;
  use tower::ServiceExt as _;

  use super::*;

  /// Nothing listens on the discard port.
  const DEAD_RAG: &str = "http://127.0.0.1:9";

  struct Harness {
    app:       Router,
    primary:   MemoryStore,
    secondary: MemoryStore,
  }

  fn harness(rag_url: &str) -> Harness {
    let primary = MemoryStore::new();
    let secondary = MemoryStore::new();
    let rag =
      RagClient::new(rag_url, Duration::from_secs(2), Duration::from_secs(1)).unwrap();
    let state = AppState::new(
      Arc::new(primary.clone()),
      Some(Arc::new(secondary.clone())),
      rag,
      "memory",
    );
    Harness { app: app(state), primary, secondary }
  }

  /// Start a stand-in RAG service. `answer: None` makes `/query` fail.
  async fn fake_rag(answer: Option<&'static str>) -> String {
    let router = Router::new()
      .route(
        "/query",
        post(move || async move {
          match answer {
            Some(a) => (StatusCode::OK, Json(json!({ "answer": a }))),
            None => (
              StatusCode::INTERNAL_SERVER_ERROR,
              Json(json!({ "detail": "model not loaded" })),
            ),
          }
        }),
      )
      .route(
        "/health",
        get(|| async {
          Json(json!({ "status": "ok", "mongodb": "connected", "llm_model": "llama3" }))
        }),
      );
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
      axum::serve(listener, router).await.unwrap();
    });
    format!("http://{addr}")
  }

  async fn send(
    app: &Router,
    method: &str,
    uri: &str,
    body: Option<Value>,
  ) -> (StatusCode, Value) {
    let mut builder = Request::builder().method(method).uri(uri);
    let body = match body {
      Some(v) => {
        builder = builder.header("content-type", "application/json");
        Body::from(v.to_string())
      }
      None => Body::empty(),
    };
    let resp = app.clone().oneshot(builder.body(body).unwrap()).await.unwrap();
    let status = resp.status();
    let bytes = axum::body::to_bytes(resp.into_body(), usize::MAX).await.unwrap();
    let json = if bytes.is_empty() {
      Value::Null
    } else {
      serde_json::from_slice(&bytes).unwrap()
    };
    (status, json)
  }

  fn persona_body(doc: &str, first: &str, last: &str) -> Value {
    json!({
      "nroDocumento": doc,
      "primerNombre": first,
      "apellidos": last,
      "fechaNacimiento": "1992-08-14",
      "genero": "Femenino",
      "correo": format!("{}@Example.com", first.to_lowercase()),
      "celular": "+57 300-123-4567",
    })
  }

  // ── Personas ──────────────────────────────────────────────────────────────

  #[tokio::test]
  async fn create_get_update_delete() {
    let h = harness(DEAD_RAG);

    let (status, created) =
      send(&h.app, "POST", "/api/personas", Some(persona_body("1020304050", "Laura", "Gómez"))).await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(created["tipoDocumento"], "Cédula");
    assert_eq!(created["correo"], "laura@example.com");
    assert_eq!(created["celular"], "+573001234567");
    assert_eq!(created["updatedAt"], Value::Null);
    let id = created["id"].as_str().unwrap().to_owned();

    let (status, fetched) = send(&h.app, "GET", &format!("/api/personas/{id}"), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(fetched, created);

    let (status, updated) = send(
      &h.app,
      "PUT",
      &format!("/api/personas/{id}"),
      Some(json!({ "segundoNombre": "Isabel" })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(updated["segundoNombre"], "Isabel");
    assert_eq!(updated["primerNombre"], "Laura");
    assert!(updated["updatedAt"].is_string());

    let (status, deleted) = send(&h.app, "DELETE", &format!("/api/personas/{id}"), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(deleted, json!({ "id": id, "eliminado": true }));

    let (status, body) = send(&h.app, "GET", &format!("/api/personas/{id}"), None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert!(body["error"].is_string());
  }

  #[tokio::test]
  async fn error_kinds_map_to_status_codes() {
    let h = harness(DEAD_RAG);
    send(&h.app, "POST", "/api/personas", Some(persona_body("123456", "Ana", "Rojas"))).await;

    let (status, body) =
      send(&h.app, "POST", "/api/personas", Some(persona_body("123456", "Eva", "Mora"))).await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert!(body["error"].as_str().unwrap().contains("123456"));

    let mut bad = persona_body("654321", "Eva", "Mora");
    bad["celular"] = json!("12345");
    let (status, body) = send(&h.app, "POST", "/api/personas", Some(bad)).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body["error"].as_str().unwrap().contains("phone"));

    let (status, _) = send(&h.app, "DELETE", "/api/personas/no-such-id", None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let (status, _) =
      send(&h.app, "DELETE", &format!("/api/personas/{}", uuid::Uuid::new_v4()), None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
  }

  #[tokio::test]
  async fn malformed_json_is_a_bad_request_with_error_body() {
    let h = harness(DEAD_RAG);
    let req = Request::builder()
      .method("POST")
      .uri("/api/personas")
      .header("content-type", "application/json")
      .body(Body::from("{not json"))
      .unwrap();
    let resp = h.app.clone().oneshot(req).await.unwrap();
    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
    let bytes = axum::body::to_bytes(resp.into_body(), usize::MAX).await.unwrap();
    let body: Value = serde_json::from_slice(&bytes).unwrap();
    assert!(body["error"].is_string());
  }

  #[tokio::test]
  async fn undecodable_query_strings_get_json_errors() {
    let h = harness(DEAD_RAG);
    for uri in [
      "/api/personas?genero=Femenino&genero=Masculino",
      "/api/logs?accion=a&accion=b",
    ] {
      let req = Request::builder().uri(uri).body(Body::empty()).unwrap();
      let resp = h.app.clone().oneshot(req).await.unwrap();
      assert_eq!(resp.status(), StatusCode::BAD_REQUEST, "{uri}");
      let content_type = resp.headers()["content-type"].to_str().unwrap().to_owned();
      assert!(content_type.starts_with("application/json"), "{uri}: {content_type}");
      let bytes = axum::body::to_bytes(resp.into_body(), usize::MAX).await.unwrap();
      let body: Value = serde_json::from_slice(&bytes).unwrap();
      assert!(body["error"].as_str().unwrap().contains("duplicate field"), "{uri}");
    }
  }

  #[tokio::test]
  async fn list_filters_and_journals_searches() {
    let h = harness(DEAD_RAG);
    send(&h.app, "POST", "/api/personas", Some(persona_body("111111", "Ana", "Rojas Díaz"))).await;
    send(&h.app, "POST", "/api/personas", Some(persona_body("222222", "Eva", "Mora"))).await;

    let (_, all) = send(&h.app, "GET", "/api/personas", None).await;
    assert_eq!(all.as_array().unwrap().len(), 2);
    assert_eq!(all[0]["primerNombre"], "Eva");

    let (_, found) = send(&h.app, "GET", "/api/personas?apellidos=d%C3%ADaz&genero=", None).await;
    assert_eq!(found.as_array().unwrap().len(), 1);

    let (_, unaccented) = send(&h.app, "GET", "/api/personas?apellidos=DIAZ", None).await;
    assert_eq!(unaccented.as_array().unwrap().len(), 1);

    let (status, _) = send(&h.app, "GET", "/api/personas?genero=Otro", None).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (_, logs) = send(&h.app, "GET", "/api/logs?accion=buscar", None).await;
    assert_eq!(logs.as_array().unwrap().len(), 2);
  }

  // ── Journal ───────────────────────────────────────────────────────────────

  #[tokio::test]
  async fn mutations_are_journalled_in_both_stores() {
    let h = harness(DEAD_RAG);
    send(&h.app, "POST", "/api/personas", Some(persona_body("1020304050", "Laura", "Gómez"))).await;

    let (status, logs) = send(&h.app, "GET", "/api/logs?documento=1020304050", None).await;
    assert_eq!(status, StatusCode::OK);
    let logs = logs.as_array().unwrap();
    assert_eq!(logs.len(), 1);
    assert_eq!(logs[0]["accion"], "Crear Persona");
    assert_eq!(logs[0]["categoria"], "usuario");
    assert_eq!(logs[0]["fuente"], "secundario");
    assert!(logs[0]["fecha"].is_string());

    let primary_copy = h.primary.query_logs(&LogQuery::default()).await.unwrap();
    assert_eq!(primary_copy.len(), 1);
    assert!(primary_copy[0].secondary_acknowledged);
  }

  #[tokio::test]
  async fn logs_survive_secondary_outage() {
    let h = harness(DEAD_RAG);
    h.secondary.set_online(false);
    send(&h.app, "POST", "/api/personas", Some(persona_body("123456", "Ana", "Rojas"))).await;
    h.secondary.set_online(true);
    send(&h.app, "POST", "/api/personas", Some(persona_body("654321", "Eva", "Mora"))).await;

    let (_, logs) = send(&h.app, "GET", "/api/logs?accion=crear", None).await;
    let logs = logs.as_array().unwrap();
    assert_eq!(logs.len(), 2);
    assert!(logs.iter().any(|l| l["fuente"] == "primario"));
  }

  #[tokio::test]
  async fn log_date_filters() {
    let h = harness(DEAD_RAG);
    send(&h.app, "POST", "/api/logs", Some(json!({ "accion": "Sistema", "detalles": "arranque" }))).await;

    let today = chrono::Utc::now().format("%Y-%m-%d").to_string();
    let (_, logs) = send(&h.app, "GET", &format!("/api/logs?desde={today}&hasta={today}"), None).await;
    assert_eq!(logs.as_array().unwrap().len(), 1);

    let (_, logs) = send(&h.app, "GET", "/api/logs?hasta=2000-01-01", None).await;
    assert!(logs.as_array().unwrap().is_empty());

    let (status, _) = send(&h.app, "GET", "/api/logs?desde=ayer", None).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
  }

  #[tokio::test]
  async fn post_log_returns_receipt() {
    let h = harness(DEAD_RAG);
    let (status, receipt) = send(
      &h.app,
      "POST",
      "/api/logs",
      Some(json!({ "accion": "Sistema", "detalles": "frontend cargado", "categoria": "usuario" })),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(receipt["secundario"], true);
    assert_eq!(receipt["primario"], true);
    assert_eq!(receipt["registro"]["categoria"], "usuario");

    let (status, _) =
      send(&h.app, "POST", "/api/logs", Some(json!({ "accion": "Borrar Todo" }))).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
  }

  #[tokio::test]
  async fn statistics_report_source_and_counts() {
    let h = harness(DEAD_RAG);
    send(&h.app, "POST", "/api/logs", Some(json!({ "accion": "Sistema", "detalles": "x" }))).await;

    let (status, stats) = send(&h.app, "GET", "/api/logs/estadisticas", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(stats["totalLogs"], 1);
    assert_eq!(stats["logsHoy"], 1);
    assert_eq!(stats["logsPorCategoria"]["sistema"], 1);
    assert_eq!(stats["fuente"], "secundario");
    assert_eq!(stats["sistemaActivo"]["secundario"], true);
  }

  // ── Natural-language queries ──────────────────────────────────────────────

  #[tokio::test]
  async fn blank_question_is_rejected_and_journalled() {
    let h = harness(DEAD_RAG);
    let (status, body) =
      send(&h.app, "POST", "/api/consulta-natural", Some(json!({ "consulta": "   " }))).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body["error"].is_string());

    let (status, _) =
      send(&h.app, "POST", "/api/consulta-natural", Some(json!({ "consulta": 42 }))).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let errors = h
      .primary
      .query_logs(&LogQuery { action: Some("error".into()), ..Default::default() })
      .await
      .unwrap();
    assert_eq!(errors.len(), 2);
  }

  #[tokio::test]
  async fn rag_answer_is_relayed() {
    let url = fake_rag(Some("Hay 3 personas.")).await;
    let h = harness(&url);
    let (status, body) =
      send(&h.app, "POST", "/api/consulta-natural", Some(json!({ "consulta": "¿cuántas?" }))).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, json!({ "answer": "Hay 3 personas.", "fuente": "rag" }));

    let (_, logs) = send(&h.app, "GET", "/api/logs?accion=%C3%A9xito", None).await;
    assert_eq!(logs.as_array().unwrap().len(), 1);
  }

  #[tokio::test]
  async fn rag_failure_falls_back_to_local_answer() {
    let url = fake_rag(None).await;
    let h = harness(&url);
    send(&h.app, "POST", "/api/personas", Some(persona_body("123456", "Ana", "Rojas"))).await;

    let (status, body) = send(
      &h.app,
      "POST",
      "/api/consulta-natural",
      Some(json!({ "consulta": "¿Cuántas personas hay en total?" })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["fuente"], "local");
    assert_eq!(body["answer"], "En el sistema hay registradas 1 persona en total.");

    let (_, logs) = send(&h.app, "GET", "/api/logs?accion=fallback", None).await;
    assert_eq!(logs.as_array().unwrap().len(), 1);
  }

  #[tokio::test]
  async fn unreachable_rag_falls_back_to_local_answer() {
    let h = harness(DEAD_RAG);
    let (_, body) =
      send(&h.app, "POST", "/api/consulta-natural", Some(json!({ "consulta": "hola" }))).await;
    assert_eq!(body["fuente"], "local");
    assert_eq!(body["answer"], "No hay personas registradas en el sistema actualmente.");
  }

  #[tokio::test]
  async fn store_outage_gives_canned_local_answer() {
    let h = harness(DEAD_RAG);
    h.primary.set_online(false);
    let (status, body) =
      send(&h.app, "POST", "/api/consulta-natural", Some(json!({ "consulta": "hola" }))).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["answer"], padron_core::answer::STORE_UNAVAILABLE_ANSWER);
  }

  // ── Health ────────────────────────────────────────────────────────────────

  #[tokio::test]
  async fn backend_health() {
    let h = harness(DEAD_RAG);
    let (status, body) = send(&h.app, "GET", "/api/health", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "ok");
    assert_eq!(body["service"], "backend");
  }

  #[tokio::test]
  async fn rag_health_relays_or_reports_error() {
    let url = fake_rag(Some("x")).await;
    let (status, body) = send(&harness(&url).app, "GET", "/api/health/rag", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "ok");
    assert_eq!(body["llm_model"], "llama3");

    let (status, body) = send(&harness(DEAD_RAG).app, "GET", "/api/health/rag", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "error");
    assert!(body["error"].is_string());
  }

  #[tokio::test]
  async fn log_store_health_follows_secondary() {
    let h = harness(DEAD_RAG);
    let (status, body) = send(&h.app, "GET", "/api/health/log-store", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "ok");

    h.secondary.set_online(false);
    let (status, _) = send(&h.app, "GET", "/api/health/log-store", None).await;
    assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);

    let rag = RagClient::new(DEAD_RAG, Duration::from_secs(1), Duration::from_secs(1)).unwrap();
    let state: AppState<MemoryStore, MemoryStore> =
      AppState::new(Arc::new(MemoryStore::new()), None, rag, "memory");
    let (status, body) = send(&app(state), "GET", "/api/health/log-store", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["configured"], false);
  }

  #[tokio::test]
  async fn debug_reports_wiring() {
    let h = harness(DEAD_RAG);
    send(&h.app, "POST", "/api/personas", Some(persona_body("123456", "Ana", "Rojas"))).await;
    let (_, body) = send(&h.app, "GET", "/api/health/debug", None).await;
    assert_eq!(body["primaryStore"]["kind"], "memory");
    assert_eq!(body["logStore"]["configured"], true);
    assert_eq!(body["personaCount"], 1);
    assert_eq!(body["logQueryCap"], 1000);
    assert_eq!(body["ragUrl"], DEAD_RAG);
  }
}

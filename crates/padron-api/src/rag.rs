//! Async HTTP client for the external RAG (retrieval-augmented generation)
//! service.

use std::time::Duration;

use reqwest::{Client, StatusCode};
use serde::Deserialize;
use serde_json::json;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum RagError {
  #[error("rag request failed: {0}")]
  Transport(#[from] reqwest::Error),

  #[error("rag service returned {0}")]
  Status(StatusCode),

  #[error("rag response has no answer")]
  MissingAnswer,
}

/// Fields relayed from the service's `/health` response.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct RagHealth {
  pub status:    Option<String>,
  pub mongodb:   Option<String>,
  pub llm_model: Option<String>,
}

#[derive(Deserialize)]
struct QueryResponse {
  answer: Option<String>,
}

/// Client for the RAG service's `/query` and `/health` endpoints.
///
/// Cheap to clone — the inner [`reqwest::Client`] is `Arc`-based.
#[derive(Clone)]
pub struct RagClient {
  client:         Client,
  base_url:       String,
  query_timeout:  Duration,
  health_timeout: Duration,
}

impl RagClient {
  pub fn new(
    base_url: impl Into<String>,
    query_timeout: Duration,
    health_timeout: Duration,
  ) -> Result<Self, RagError> {
    let client = Client::builder().build()?;
    Ok(Self {
      client,
      base_url: base_url.into().trim_end_matches('/').to_owned(),
      query_timeout,
      health_timeout,
    })
  }

  pub fn base_url(&self) -> &str { &self.base_url }

  fn url(&self, path: &str) -> String { format!("{}{path}", self.base_url) }

  /// `POST {base}/query` with `{"query": question}`.
  pub async fn ask(&self, question: &str) -> Result<String, RagError> {
    let resp = self
      .client
      .post(self.url("/query"))
      .timeout(self.query_timeout)
      .json(&json!({ "query": question }))
      .send()
      .await?;

    if !resp.status().is_success() {
      return Err(RagError::Status(resp.status()));
    }
    let body: QueryResponse = resp.json().await?;
    body.answer.ok_or(RagError::MissingAnswer)
  }

  /// `GET {base}/health`.
  pub async fn health(&self) -> Result<RagHealth, RagError> {
    let resp = self
      .client
      .get(self.url("/health"))
      .timeout(self.health_timeout)
      .send()
      .await?;

    if !resp.status().is_success() {
      return Err(RagError::Status(resp.status()));
    }
    Ok(resp.json().await?)
  }
}

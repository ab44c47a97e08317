//! HTTP client for the Alchemyst context API (`/api/v1/context/{search,add}`).

use ctx_types::{
    AddRequest, AddResponse, ContextError, ContextStore, SearchOptions, SearchRequest,
    SearchResponse,
};
use std::fmt;

pub const DEFAULT_BASE_URL: &str = "https://platform-backend.getalchemystai.com";
pub const API_KEY_VAR: &str = "ALCHEMYST_AI_API_KEY";
pub const BASE_URL_VAR: &str = "ALCHEMYST_AI_BASE_URL";

/// Credential and endpoint the client is bound to.
#[derive(Clone)]
pub struct ClientConfig {
    pub api_key: String,
    pub base_url: String,
}

impl ClientConfig {
    pub fn new(api_key: impl Into<String>, base_url: Option<String>) -> Self {
        let base_url = base_url.unwrap_or_else(|| DEFAULT_BASE_URL.to_string());
        Self {
            api_key: api_key.into(),
            base_url: base_url.trim_end_matches('/').to_string(),
        }
    }

    /// Read `ALCHEMYST_AI_API_KEY` (required) and `ALCHEMYST_AI_BASE_URL` from the process environment.
    pub fn from_env() -> Result<Self, ContextError> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Same as [`ClientConfig::from_env`] with a custom variable source. Blank values count as unset.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ContextError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let non_blank = |name: &str| lookup(name).filter(|v| !v.trim().is_empty());
        let api_key = non_blank(API_KEY_VAR).ok_or(ContextError::MissingApiKey(API_KEY_VAR))?;
        Ok(Self::new(api_key.trim(), non_blank(BASE_URL_VAR)))
    }
}

impl fmt::Debug for ClientConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ClientConfig")
            .field("api_key", &"<redacted>")
            .field("base_url", &self.base_url)
            .finish()
    }
}

/// Context store backed by the hosted service. One `reqwest::Client` per instance, no retries.
pub struct AlchemystClient {
    client: reqwest::Client,
    config: ClientConfig,
}

impl AlchemystClient {
    pub fn new(config: ClientConfig) -> Self {
        Self {
            client: reqwest::Client::new(),
            config,
        }
    }

    pub fn from_env() -> Result<Self, ContextError> {
        Ok(Self::new(ClientConfig::from_env()?))
    }

    pub fn config(&self) -> &ClientConfig {
        &self.config
    }

    fn endpoint(&self, op: &str) -> String {
        format!("{}/api/v1/context/{}", self.config.base_url, op)
    }

    /// Send with bearer auth; non-2xx statuses become `ContextError::Api`.
    async fn execute(&self, req: reqwest::RequestBuilder, op: &str) -> Result<String, ContextError> {
        let res = req
            .bearer_auth(&self.config.api_key)
            .send()
            .await
            .map_err(|e| ContextError::Http(e.to_string()))?;
        let status = res.status();
        let body = res
            .text()
            .await
            .map_err(|e| ContextError::Http(e.to_string()))?;
        if !status.is_success() {
            tracing::warn!(op, status = status.as_u16(), "context API returned an error status");
            return Err(ContextError::Api {
                status: status.as_u16(),
                body,
            });
        }
        Ok(body)
    }
}

impl fmt::Debug for AlchemystClient {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AlchemystClient")
            .field("base_url", &self.config.base_url)
            .finish()
    }
}

#[async_trait::async_trait]
impl ContextStore for AlchemystClient {
    async fn search(
        &self,
        req: &SearchRequest,
        opts: &SearchOptions,
    ) -> Result<SearchResponse, ContextError> {
        let url = self.endpoint("search");
        tracing::debug!(url = %url, mode = ?opts.mode, scope = %req.scope, "context search");
        let body = self
            .execute(self.client.post(&url).query(opts).json(req), "search")
            .await?;
        serde_json::from_str(&body).map_err(|e| ContextError::Decode(e.to_string()))
    }

    async fn add(&self, req: &AddRequest) -> Result<AddResponse, ContextError> {
        let url = self.endpoint("add");
        tracing::debug!(url = %url, documents = req.documents.len(), "context add");
        let body = self.execute(self.client.post(&url).json(req), "add").await?;
        if body.trim().is_empty() {
            return Ok(serde_json::Value::Null);
        }
        serde_json::from_str(&body).map_err(|e| ContextError::Decode(e.to_string()))
    }
}

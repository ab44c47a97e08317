//! OpenAI-compatible chat completion client used by the QnA agent.

use async_trait::async_trait;
use ctx_types::{ChatError, ChatModel, Message};
use serde::{Deserialize, Serialize};
use std::fmt;

const DEFAULT_API_URL: &str = "https://api.openai.com/v1/chat/completions";
const DEFAULT_MODEL: &str = "gpt-4o-mini";
const API_KEY_VAR: &str = "OPENAI_API_KEY";

#[derive(Debug, Serialize)]
struct ChatCompletionRequest<'a> {
    model: &'a str,
    messages: &'a [Message],
    max_tokens: Option<u32>,
    temperature: Option<f32>,
}

#[derive(Debug, Deserialize)]
struct ChatCompletionResponse {
    #[serde(default)]
    choices: Vec<Choice>,
}

#[derive(Debug, Deserialize)]
struct Choice {
    message: ResponseMessage,
}

#[derive(Debug, Deserialize)]
struct ResponseMessage {
    #[serde(default)]
    content: Option<String>,
}

pub struct OpenAiChatModel {
    client: reqwest::Client,
    api_url: String,
    api_key: String,
    model: String,
    temperature: f32,
    max_tokens: u32,
}

impl OpenAiChatModel {
    pub fn new(
        api_url: impl Into<String>,
        api_key: impl Into<String>,
        model: impl Into<String>,
    ) -> Self {
        Self {
            client: reqwest::Client::new(),
            api_url: api_url.into(),
            api_key: api_key.into(),
            model: model.into(),
            temperature: 0.7,
            max_tokens: 500,
        }
    }

    /// Reads `OPENAI_API_KEY` (required), `LLM_API_URL` and `LLM_MODEL`.
    pub fn from_env() -> Result<Self, ChatError> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Same as [`OpenAiChatModel::from_env`] with a custom variable source. Blank values count as unset.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ChatError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let non_blank = |name: &str| lookup(name).filter(|v| !v.trim().is_empty());
        let api_key = non_blank(API_KEY_VAR).ok_or(ChatError::MissingApiKey(API_KEY_VAR))?;
        let api_url = non_blank("LLM_API_URL").unwrap_or_else(|| DEFAULT_API_URL.to_string());
        let model = non_blank("LLM_MODEL").unwrap_or_else(|| DEFAULT_MODEL.to_string());
        Ok(Self::new(api_url, api_key.trim(), model))
    }
}

impl fmt::Debug for OpenAiChatModel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("OpenAiChatModel")
            .field("api_url", &self.api_url)
            .field("model", &self.model)
            .finish()
    }
}

#[async_trait]
impl ChatModel for OpenAiChatModel {
    async fn complete(&self, messages: &[Message]) -> Result<String, ChatError> {
        let request = ChatCompletionRequest {
            model: &self.model,
            messages,
            max_tokens: Some(self.max_tokens),
            temperature: Some(self.temperature),
        };

        let response = self
            .client
            .post(&self.api_url)
            .bearer_auth(&self.api_key)
            .json(&request)
            .send()
            .await
            .map_err(|e| ChatError::Http(e.to_string()))?;

        if !response.status().is_success() {
            let status = response.status().as_u16();
            let body = response.text().await.unwrap_or_default();
            return Err(ChatError::Api { status, body });
        }

        let completion: ChatCompletionResponse = response
            .json()
            .await
            .map_err(|e| ChatError::Decode(e.to_string()))?;

        completion
            .choices
            .into_iter()
            .next()
            .and_then(|c| c.message.content)
            .ok_or(ChatError::EmptyResponse)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn vars(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |name| map.get(name).cloned()
    }

    #[test]
    fn missing_openai_key_is_rejected() {
        let err = OpenAiChatModel::from_lookup(vars(&[("LLM_MODEL", "gpt-4o")])).unwrap_err();
        assert!(matches!(err, ChatError::MissingApiKey("OPENAI_API_KEY")));
    }

    #[test]
    fn blank_openai_key_counts_as_missing() {
        let err = OpenAiChatModel::from_lookup(vars(&[("OPENAI_API_KEY", "  ")])).unwrap_err();
        assert!(matches!(err, ChatError::MissingApiKey(_)));
    }

    #[test]
    fn defaults_apply_when_only_key_is_set() {
        let model = OpenAiChatModel::from_lookup(vars(&[("OPENAI_API_KEY", "sk-test")])).unwrap();
        assert_eq!(model.api_url, DEFAULT_API_URL);
        assert_eq!(model.model, DEFAULT_MODEL);
        assert_eq!(model.temperature, 0.7);
        assert_eq!(model.max_tokens, 500);
        assert!(!format!("{model:?}").contains("sk-test"));
    }

    #[test]
    fn url_and_model_overrides() {
        let model = OpenAiChatModel::from_lookup(vars(&[
            ("OPENAI_API_KEY", "sk-test"),
            ("LLM_API_URL", "http://localhost:9000/v1/chat/completions"),
            ("LLM_MODEL", "local-model"),
        ]))
        .unwrap();
        assert_eq!(model.api_url, "http://localhost:9000/v1/chat/completions");
        assert_eq!(model.model, "local-model");
    }
}

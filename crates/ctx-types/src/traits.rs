//! Traits for context stores and chat models.

use crate::{AddRequest, AddResponse, Message, SearchOptions, SearchRequest, SearchResponse};
use async_trait::async_trait;
use std::sync::Arc;

/// Context store abstraction: search and add contexts.
#[async_trait]
pub trait ContextStore: Send + Sync {
    /// Search contexts; `opts` travel outside the request body.
    async fn search(
        &self,
        req: &SearchRequest,
        opts: &SearchOptions,
    ) -> Result<SearchResponse, ContextError>;

    /// Add documents as new contexts.
    async fn add(&self, req: &AddRequest) -> Result<AddResponse, ContextError>;
}

#[async_trait]
impl<T: ContextStore + ?Sized> ContextStore for Arc<T> {
    async fn search(
        &self,
        req: &SearchRequest,
        opts: &SearchOptions,
    ) -> Result<SearchResponse, ContextError> {
        (**self).search(req, opts).await
    }

    async fn add(&self, req: &AddRequest) -> Result<AddResponse, ContextError> {
        (**self).add(req).await
    }
}

/// Chat model: conversation messages -> assistant reply.
#[async_trait]
pub trait ChatModel: Send + Sync {
    async fn complete(&self, messages: &[Message]) -> Result<String, ChatError>;
}

#[async_trait]
impl<T: ChatModel + ?Sized> ChatModel for Arc<T> {
    async fn complete(&self, messages: &[Message]) -> Result<String, ChatError> {
        (**self).complete(messages).await
    }
}

#[derive(Debug, thiserror::Error)]
pub enum ContextError {
    #[error("missing required environment variable: {0}")]
    MissingApiKey(&'static str),
    #[error("transport error: {0}")]
    Http(String),
    #[error("context API error {status}: {body}")]
    Api { status: u16, body: String },
    #[error("invalid response: {0}")]
    Decode(String),
}

#[derive(Debug, thiserror::Error)]
pub enum ChatError {
    #[error("missing required environment variable: {0}")]
    MissingApiKey(&'static str),
    #[error("transport error: {0}")]
    Http(String),
    #[error("chat API error {status}: {body}")]
    Api { status: u16, body: String },
    #[error("invalid response: {0}")]
    Decode(String),
    #[error("no choices returned")]
    EmptyResponse,
}

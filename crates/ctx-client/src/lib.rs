//! HTTP clients for the Alchemyst context API and an OpenAI-compatible chat endpoint.

mod alchemyst;
#[cfg(any(test, feature = "test-util"))]
pub mod mock;
mod openai_chat;

pub use alchemyst::{AlchemystClient, ClientConfig, API_KEY_VAR, BASE_URL_VAR, DEFAULT_BASE_URL};
pub use ctx_types::{ChatError, ChatModel, ContextError, ContextStore};
pub use openai_chat::OpenAiChatModel;

#[cfg(any(test, feature = "test-util"))]
pub use mock::{MockChatModel, MockContextStore};

//! QnA agent: answers with a chat model and keeps every turn in the context store.

use chrono::{DateTime, Local, TimeZone, Utc};
use ctx_types::{
    AddMetadata, AddRequest, ChatModel, ContextError, ContextRecord, ContextStore, ContextType,
    Document, Message, Scope, SearchOptions, SearchRequest,
};
use std::fmt::Display;

pub const CONTEXT_GROUP: &str = "qna_agent";
/// Request-level group attached to every saved turn.
pub const TURN_GROUP: &str = "test_group";
const SYSTEM_PROMPT: &str = "You are a helpful AI assistant with memory. ";
/// History messages sent with each question, after the system prompt.
const HISTORY_WINDOW: usize = 10;
const CONTEXT_LIMIT: usize = 3;
/// Records listed by the `search` command.
pub const MEMORY_SEARCH_LIMIT: usize = 5;

/// `session_YYYYmmdd_HHMMSS` for the given instant.
pub fn session_id_at<Tz: TimeZone>(t: &DateTime<Tz>) -> String
where
    Tz::Offset: Display,
{
    format!("session_{}", t.format("%Y%m%d_%H%M%S"))
}

pub struct QnaAgent<S, M> {
    store: S,
    chat: M,
    session_id: String,
    history: Vec<Message>,
}

impl<S, M> QnaAgent<S, M>
where
    S: ContextStore,
    M: ChatModel,
{
    pub fn new(store: S, chat: M) -> Self {
        Self::with_session_id(store, chat, session_id_at(&Local::now()))
    }

    pub fn with_session_id(store: S, chat: M, session_id: impl Into<String>) -> Self {
        let session_id = session_id.into();
        tracing::info!(session_id = %session_id, "QnA agent initialized");
        Self {
            store,
            chat,
            session_id,
            history: Vec::new(),
        }
    }

    pub fn session_id(&self) -> &str {
        &self.session_id
    }

    pub fn history(&self) -> &[Message] {
        &self.history
    }

    /// Top `limit` memories for `query` as a numbered list; empty when nothing matches or the search fails.
    pub async fn relevant_context(&self, query: &str, limit: usize) -> String {
        let req = SearchRequest::new(query, 0.6, 0.2).with_scope(Scope::Internal);
        match self.store.search(&req, &SearchOptions::default()).await {
            Ok(res) => {
                tracing::debug!(hits = res.contexts.len(), "retrieved memory context");
                res.contexts
                    .iter()
                    .take(limit)
                    .enumerate()
                    .map(|(i, c)| format!("{}. {}", i + 1, c.content_or_empty()))
                    .collect::<Vec<_>>()
                    .join("\n")
            }
            Err(e) => {
                tracing::warn!(error = %e, "failed to retrieve context");
                String::new()
            }
        }
    }

    /// Answer `question` using memory context and recent history.
    ///
    /// Chat failures come back as `"Error: ..."` and leave memory untouched.
    pub async fn ask(&mut self, question: &str) -> String {
        let context = self.relevant_context(question, CONTEXT_LIMIT).await;
        let mut system = SYSTEM_PROMPT.to_string();
        if !context.is_empty() {
            system.push_str(&format!(
                "\n\nRelevant context from previous conversations:\n{context}"
            ));
        }

        self.history.push(Message::user(question));
        let start = self.history.len().saturating_sub(HISTORY_WINDOW);
        let mut messages = Vec::with_capacity(HISTORY_WINDOW + 1);
        messages.push(Message::system(system));
        messages.extend_from_slice(&self.history[start..]);

        match self.chat.complete(&messages).await {
            Ok(answer) => {
                self.history.push(Message::assistant(answer.clone()));
                self.save_to_memory("user", question).await;
                self.save_to_memory("assistant", &answer).await;
                answer
            }
            Err(e) => {
                tracing::warn!(error = %e, "chat completion failed");
                format!("Error: {e}")
            }
        }
    }

    /// Store one conversation turn. Failures are logged only.
    pub async fn save_to_memory(&self, role: &str, content: &str) {
        let file_name = format!("{}_{}", self.session_id, self.history.len());
        let mut doc_meta = serde_json::Map::new();
        doc_meta.insert("filename".into(), file_name.clone().into());
        doc_meta.insert("filetype".into(), "txt".into());
        doc_meta.insert(
            "groupName".into(),
            serde_json::json!([CONTEXT_GROUP, self.session_id]),
        );

        let req = AddRequest {
            documents: vec![Document {
                content: format!("{role}: {content}"),
                metadata: Some(doc_meta),
            }],
            context_type: ContextType::Conversation,
            source: "conversation".to_string(),
            scope: Scope::Internal,
            metadata: Some(AddMetadata {
                file_name: Some(file_name),
                file_type: Some("ai/conversation".to_string()),
                last_modified: Some(Utc::now().to_rfc3339()),
                file_size: Some(content.len() as u64),
                group_name: Some(vec![TURN_GROUP.to_string()]),
            }),
        };
        if let Err(e) = self.store.add(&req).await {
            tracing::warn!(error = %e, role, "failed to save to memory");
        }
    }

    /// Search all saved memories. Every hit is returned; callers list at most [`MEMORY_SEARCH_LIMIT`].
    pub async fn search_memory(&self, query: &str) -> Result<Vec<ContextRecord>, ContextError> {
        let req = SearchRequest::new(query, 0.5, 0.2).with_scope(Scope::Internal);
        let res = self.store.search(&req, &SearchOptions::default()).await?;
        Ok(res.contexts)
    }
}

/// Render history as `[n] You: ...` / `[n] Agent: ...` lines.
pub fn render_history(history: &[Message]) -> String {
    history
        .iter()
        .enumerate()
        .map(|(i, m)| {
            let who = if m.role == "user" { "You" } else { "Agent" };
            format!("[{}] {}: {}", i + 1, who, m.content)
        })
        .collect::<Vec<_>>()
        .join("\n")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn session_id_format() {
        let t = Utc.with_ymd_and_hms(2025, 9, 12, 10, 20, 30).unwrap();
        assert_eq!(session_id_at(&t), "session_20250912_102030");
    }

    #[test]
    fn history_rendering() {
        let h = vec![Message::user("hi"), Message::assistant("hello")];
        assert_eq!(render_history(&h), "[1] You: hi\n[2] Agent: hello");
    }
}

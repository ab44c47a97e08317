//! In-memory context store and scripted chat model for tests: no network.

use async_trait::async_trait;
use ctx_types::{
    AddRequest, AddResponse, ChatError, ChatModel, ContextError, ContextRecord, ContextStore,
    Message, Scope, SearchOptions, SearchRequest, SearchResponse,
};
use std::collections::{HashSet, VecDeque};
use tokio::sync::{Mutex, RwLock};
use uuid::Uuid;

#[derive(Debug, Clone)]
struct StoredContext {
    id: String,
    content: String,
    scope: Scope,
    file_name: Option<String>,
    file_type: Option<String>,
    groups: Vec<String>,
}

/// Context store keeping everything in memory. Scores are the share of query
/// words found in a context.
///
/// Hits at or above `similarity_threshold` are returned when there are any;
/// otherwise hits at or above `minimum_similarity_threshold`. `body_metadata`
/// filters by file name, file type and group overlap, and `size` caps the result count.
#[derive(Default)]
pub struct MockContextStore {
    contexts: RwLock<Vec<StoredContext>>,
    searches: Mutex<Vec<(SearchRequest, SearchOptions)>>,
    adds: Mutex<Vec<AddRequest>>,
    failing: RwLock<bool>,
}

impl MockContextStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make every following call fail with a 503 API error (or succeed again).
    pub async fn set_failing(&self, failing: bool) {
        *self.failing.write().await = failing;
    }

    /// Search requests received so far, in order.
    pub async fn searches(&self) -> Vec<(SearchRequest, SearchOptions)> {
        self.searches.lock().await.clone()
    }

    /// Add requests received so far, in order.
    pub async fn adds(&self) -> Vec<AddRequest> {
        self.adds.lock().await.clone()
    }

    /// Number of stored contexts.
    pub async fn len(&self) -> usize {
        self.contexts.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.len().await == 0
    }

    async fn check_failing(&self) -> Result<(), ContextError> {
        if *self.failing.read().await {
            return Err(ContextError::Api {
                status: 503,
                body: "mock context store is failing".to_string(),
            });
        }
        Ok(())
    }
}

fn words(text: &str) -> HashSet<String> {
    text.split(|c: char| !c.is_alphanumeric())
        .filter(|w| !w.is_empty())
        .map(|w| w.to_lowercase())
        .collect()
}

fn overlap_score(query: &HashSet<String>, content: &str) -> f64 {
    if query.is_empty() {
        return 0.0;
    }
    let content = words(content);
    let hits = query.iter().filter(|w| content.contains(*w)).count();
    hits as f64 / query.len() as f64
}

fn string_list(value: Option<&serde_json::Value>) -> Vec<String> {
    value
        .and_then(|v| v.as_array())
        .map(|a| {
            a.iter()
                .filter_map(|v| v.as_str().map(String::from))
                .collect()
        })
        .unwrap_or_default()
}

#[async_trait]
impl ContextStore for MockContextStore {
    async fn search(
        &self,
        req: &SearchRequest,
        opts: &SearchOptions,
    ) -> Result<SearchResponse, ContextError> {
        self.searches.lock().await.push((req.clone(), *opts));
        self.check_failing().await?;

        let query = words(&req.query);
        let filter = req.body_metadata.as_ref();
        let guard = self.contexts.read().await;
        let mut candidates: Vec<(&StoredContext, f64)> = guard
            .iter()
            .filter(|c| c.scope == req.scope)
            .filter(|c| {
                let Some(f) = filter else { return true };
                if f.file_name.is_some() && f.file_name != c.file_name {
                    return false;
                }
                if f.file_type.is_some() && f.file_type != c.file_type {
                    return false;
                }
                match &f.group_name {
                    Some(groups) if !groups.is_empty() => {
                        groups.iter().any(|g| c.groups.contains(g))
                    }
                    _ => true,
                }
            })
            .map(|c| (c, overlap_score(&query, &c.content)))
            .filter(|(_, score)| *score > 0.0 && *score >= req.minimum_similarity_threshold)
            .collect();
        candidates.sort_by(|a, b| b.1.partial_cmp(&a.1).unwrap_or(std::cmp::Ordering::Equal));

        if candidates
            .iter()
            .any(|(_, score)| *score >= req.similarity_threshold)
        {
            candidates.retain(|(_, score)| *score >= req.similarity_threshold);
        }
        if let Some(size) = filter.and_then(|f| f.size) {
            candidates.truncate(size as usize);
        }

        let contexts = candidates
            .into_iter()
            .map(|(c, score)| {
                let mut extra = serde_json::Map::new();
                extra.insert("id".to_string(), serde_json::Value::String(c.id.clone()));
                ContextRecord {
                    content: Some(c.content.clone()),
                    score: Some(score),
                    metadata: Some(serde_json::json!({
                        "fileName": c.file_name,
                        "fileType": c.file_type,
                        "groupName": c.groups,
                    })),
                    extra,
                }
            })
            .collect();
        Ok(SearchResponse { contexts })
    }

    async fn add(&self, req: &AddRequest) -> Result<AddResponse, ContextError> {
        self.adds.lock().await.push(req.clone());
        self.check_failing().await?;

        let meta = req.metadata.as_ref();
        let mut ids = Vec::with_capacity(req.documents.len());
        let mut guard = self.contexts.write().await;
        for doc in &req.documents {
            let mut groups = string_list(doc.metadata.as_ref().and_then(|m| m.get("groupName")));
            for g in meta.and_then(|m| m.group_name.as_ref()).into_iter().flatten() {
                if !groups.contains(g) {
                    groups.push(g.clone());
                }
            }
            let id = Uuid::new_v4().to_string();
            guard.push(StoredContext {
                id: id.clone(),
                content: doc.content.clone(),
                scope: req.scope,
                file_name: meta.and_then(|m| m.file_name.clone()),
                file_type: meta.and_then(|m| m.file_type.clone()),
                groups,
            });
            ids.push(id);
        }
        Ok(serde_json::json!({ "success": true, "context_ids": ids }))
    }
}

/// Chat model that replies from a script and records every conversation it was sent.
#[derive(Default)]
pub struct MockChatModel {
    replies: Mutex<VecDeque<Result<String, String>>>,
    received: Mutex<Vec<Vec<Message>>>,
}

impl MockChatModel {
    pub fn new<I, S>(replies: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            replies: Mutex::new(replies.into_iter().map(|r| Ok(r.into())).collect()),
            received: Mutex::new(Vec::new()),
        }
    }

    /// Queue a failing reply.
    pub async fn push_failure(&self, body: impl Into<String>) {
        self.replies.lock().await.push_back(Err(body.into()));
    }

    /// Message lists passed to `complete`, one entry per call.
    pub async fn received(&self) -> Vec<Vec<Message>> {
        self.received.lock().await.clone()
    }
}

#[async_trait]
impl ChatModel for MockChatModel {
    async fn complete(&self, messages: &[Message]) -> Result<String, ChatError> {
        self.received.lock().await.push(messages.to_vec());
        match self.replies.lock().await.pop_front() {
            Some(Ok(reply)) => Ok(reply),
            Some(Err(body)) => Err(ChatError::Api { status: 500, body }),
            None => Err(ChatError::EmptyResponse),
        }
    }
}

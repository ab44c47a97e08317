//! Command runners. Each writes its report to `out`; errors from the store propagate.

use crate::agent::{render_history, QnaAgent, MEMORY_SEARCH_LIMIT};
use crate::cli::{AddArgs, SearchArgs};
use crate::timing::{millis, timed};
use anyhow::Context;
use chrono::Utc;
use ctx_types::{
    AddMetadata, AddRequest, AddResponse, ChatModel, ContextStore, ContextType, Document, Scope,
    SearchOptions, SearchRequest, SearchResponse,
};
use std::io::Write;
use std::time::Duration;
use tokio::io::{AsyncBufRead, AsyncBufReadExt};

pub const RECALL_FACT: &str = "Google LLC is an American multinational technology company. \
It was founded in September 1998 by Larry Page and Sergey Brin while they were PhD students at Stanford University.";
pub const RECALL_QUERY: &str = "founders of Google";
const RECALL_FILE: &str = "memory_google_info";
const RECALL_GROUP: &str = "test_group";

pub async fn run_search<S: ContextStore>(
    store: &S,
    args: &SearchArgs,
    out: &mut dyn Write,
) -> anyhow::Result<SearchResponse> {
    let (req, opts) = args.to_request();
    let (res, elapsed) = timed(store.search(&req, &opts)).await;
    let res = res?;
    tracing::info!(elapsed_ms = millis(elapsed), hits = res.contexts.len(), "context search finished");
    writeln!(out, "Time taken to search context: {:.3} ms", millis(elapsed))?;
    writeln!(out, "Found {} contexts", res.contexts.len())?;
    for (i, c) in res.contexts.iter().enumerate() {
        writeln!(out, "[{}] {}", i + 1, c.content_or_empty())?;
    }
    Ok(res)
}

pub async fn run_add<S: ContextStore>(
    store: &S,
    args: &AddArgs,
    out: &mut dyn Write,
) -> anyhow::Result<AddResponse> {
    let req = args.to_request(Utc::now());
    let (res, elapsed) = timed(store.add(&req)).await;
    let res = res?;
    tracing::info!(elapsed_ms = millis(elapsed), "context add finished");
    writeln!(out, "Time taken to add context: {:.3} ms", millis(elapsed))?;
    Ok(res)
}

#[derive(Debug, Clone)]
pub struct RecallReport {
    pub add_latency: Duration,
    pub search_latency: Duration,
    pub results: usize,
}

fn recall_add_request() -> AddRequest {
    let mut doc_meta = serde_json::Map::new();
    doc_meta.insert("filename".into(), RECALL_FILE.into());
    doc_meta.insert("filetype".into(), "text/plain".into());
    doc_meta.insert("groupName".into(), serde_json::json!([RECALL_GROUP]));
    AddRequest {
        documents: vec![Document {
            content: RECALL_FACT.to_string(),
            metadata: Some(doc_meta),
        }],
        context_type: ContextType::Resource,
        source: "manual_entry".to_string(),
        scope: Scope::Internal,
        metadata: Some(AddMetadata {
            file_name: Some(RECALL_FILE.to_string()),
            file_type: Some("ai/conversation".to_string()),
            last_modified: Some(Utc::now().to_rfc3339()),
            file_size: Some(RECALL_FACT.len() as u64),
            group_name: Some(vec![RECALL_GROUP.to_string()]),
        }),
    }
}

/// Add a known fact, then search for it, timing both calls.
pub async fn run_recall<S: ContextStore>(store: &S, out: &mut dyn Write) -> anyhow::Result<RecallReport> {
    let (added, add_latency) = timed(store.add(&recall_add_request())).await;
    added.context("failed to add recall data")?;
    writeln!(
        out,
        "Added Google info to Alchemyst AI (latency: {:.3}s)",
        add_latency.as_secs_f64()
    )?;

    let req = SearchRequest::new(RECALL_QUERY, 0.5, 0.2).with_scope(Scope::Internal);
    let (found, search_latency) = timed(store.search(&req, &SearchOptions::default())).await;
    let found = found.context("failed to search recall data")?;
    writeln!(
        out,
        "Searched for '{}' (latency: {:.3}s)",
        RECALL_QUERY,
        search_latency.as_secs_f64()
    )?;
    if found.contexts.is_empty() {
        writeln!(out, "No relevant results found.")?;
    } else {
        writeln!(out, "Search results:")?;
        for (i, c) in found.contexts.iter().enumerate() {
            writeln!(out, "[{}] {}", i + 1, c.content_or_empty())?;
        }
    }
    Ok(RecallReport {
        add_latency,
        search_latency,
        results: found.contexts.len(),
    })
}

/// Interactive loop: `history`, `search <query>`, `exit`/`quit`/`q`, anything else is a question.
pub async fn run_chat<S, M, R>(
    agent: &mut QnaAgent<S, M>,
    input: R,
    out: &mut dyn Write,
) -> anyhow::Result<()>
where
    S: ContextStore,
    M: ChatModel,
    R: AsyncBufRead + Unpin,
{
    writeln!(out, "QnA agent with memory (session {})", agent.session_id())?;
    writeln!(out, "Commands: history | search <query> | exit")?;
    let mut lines = input.lines();
    loop {
        write!(out, "\nYou: ")?;
        out.flush()?;
        let Some(line) = lines.next_line().await? else {
            break;
        };
        let line = line.trim();
        if line.is_empty() {
            continue;
        }
        let lower = line.to_lowercase();
        if matches!(lower.as_str(), "exit" | "quit" | "q") {
            writeln!(out, "\nGoodbye! Your conversation has been saved to memory.")?;
            break;
        }
        if lower == "history" {
            if agent.history().is_empty() {
                writeln!(out, "\nNo conversation history yet.")?;
            } else {
                writeln!(out, "\n{}", render_history(agent.history()))?;
            }
            continue;
        }
        // A bare `search` falls through and is asked as a question.
        if lower.starts_with("search ") {
            let query = line.get(7..).unwrap_or("").trim();
            match agent.search_memory(query).await {
                Ok(found) if found.is_empty() => writeln!(out, "\nNo relevant memories found.")?,
                Ok(found) => {
                    writeln!(out, "\nFound {} relevant memories:", found.len())?;
                    for (i, c) in found.iter().take(MEMORY_SEARCH_LIMIT).enumerate() {
                        writeln!(out, "[{}] {}", i + 1, c.content_or_empty())?;
                    }
                }
                Err(e) => writeln!(out, "\nError searching memory: {e}")?,
            }
            continue;
        }
        let answer = agent.ask(line).await;
        writeln!(out, "\nAgent: {answer}")?;
    }
    Ok(())
}

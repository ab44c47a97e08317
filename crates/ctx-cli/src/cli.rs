//! Command line definition. Every search flag defaults to the fixed demo payload.

use chrono::{DateTime, Utc};
use clap::{Args, Parser, Subcommand};
use ctx_types::{
    AddMetadata, AddRequest, BodyMetadata, ContextType, Document, QueryMode, Scope, SearchOptions,
    SearchRequest,
};

pub const DEMO_QUERY: &str = "Your search query here";
pub const DEMO_SIMILARITY_THRESHOLD: f64 = 0.8;
pub const DEMO_MINIMUM_SIMILARITY_THRESHOLD: f64 = 0.5;
pub const DEMO_SIZE: u64 = 100;
pub const DEMO_FILE_TYPE: &str = "ai/conversation";
pub const DEMO_FILE_NAME: &str = "chatgpt-convo-1";
pub const DEMO_GROUP: &str = "project-name";

#[derive(Debug, Parser)]
#[command(name = "ctx-cli", version, about = "Timed calls against the Alchemyst context API")]
pub struct Cli {
    /// Defaults to `search` with the demo payload.
    #[command(subcommand)]
    pub command: Option<Command>,
}

#[derive(Debug, Clone, Subcommand)]
pub enum Command {
    /// Search contexts and print the call latency.
    Search(SearchArgs),
    /// Add one document and print the call latency.
    Add(AddArgs),
    /// Add a known fact, then search for it; prints both latencies.
    Recall,
    /// Interactive QnA agent with context memory.
    Chat,
}

impl Default for Command {
    fn default() -> Self {
        Command::Search(SearchArgs::default())
    }
}

#[derive(Debug, Clone, Args)]
pub struct SearchArgs {
    #[arg(long, default_value = DEMO_QUERY)]
    pub query: String,
    #[arg(long, default_value_t = DEMO_SIMILARITY_THRESHOLD)]
    pub similarity_threshold: f64,
    #[arg(long, default_value_t = DEMO_MINIMUM_SIMILARITY_THRESHOLD)]
    pub minimum_similarity_threshold: f64,
    #[arg(long, default_value_t = Scope::Internal)]
    pub scope: Scope,
    #[arg(long, default_value_t = QueryMode::Fast)]
    pub mode: QueryMode,
    /// Send the search without `body_metadata`.
    #[arg(long)]
    pub no_metadata: bool,
    #[arg(long, default_value_t = DEMO_SIZE)]
    pub size: u64,
    #[arg(long, default_value = DEMO_FILE_TYPE)]
    pub file_type: String,
    #[arg(long, default_value = DEMO_FILE_NAME)]
    pub file_name: String,
    #[arg(long = "group", default_values_t = [DEMO_GROUP.to_string()])]
    pub groups: Vec<String>,
}

impl Default for SearchArgs {
    fn default() -> Self {
        Self {
            query: DEMO_QUERY.to_string(),
            similarity_threshold: DEMO_SIMILARITY_THRESHOLD,
            minimum_similarity_threshold: DEMO_MINIMUM_SIMILARITY_THRESHOLD,
            scope: Scope::Internal,
            mode: QueryMode::Fast,
            no_metadata: false,
            size: DEMO_SIZE,
            file_type: DEMO_FILE_TYPE.to_string(),
            file_name: DEMO_FILE_NAME.to_string(),
            groups: vec![DEMO_GROUP.to_string()],
        }
    }
}

impl SearchArgs {
    pub fn to_request(&self) -> (SearchRequest, SearchOptions) {
        let mut req = SearchRequest::new(
            self.query.clone(),
            self.similarity_threshold,
            self.minimum_similarity_threshold,
        )
        .with_scope(self.scope);
        if !self.no_metadata {
            req = req.with_body_metadata(BodyMetadata {
                size: Some(self.size),
                file_type: Some(self.file_type.clone()),
                file_name: Some(self.file_name.clone()),
                group_name: Some(self.groups.clone()),
            });
        }
        (req, SearchOptions::with_mode(self.mode))
    }
}

#[derive(Debug, Clone, Args)]
pub struct AddArgs {
    #[arg(long)]
    pub content: String,
    #[arg(long, default_value = "web-upload")]
    pub source: String,
    #[arg(long, default_value = "resource")]
    pub context_type: ContextType,
    #[arg(long, default_value_t = Scope::Internal)]
    pub scope: Scope,
    #[arg(long, default_value = "notes.txt")]
    pub file_name: String,
    #[arg(long, default_value = "text/plain")]
    pub file_type: String,
    #[arg(long = "group")]
    pub groups: Vec<String>,
}

impl AddArgs {
    /// Build the add request; `lastModified` is `now` and `fileSize` the content length in bytes.
    pub fn to_request(&self, now: DateTime<Utc>) -> AddRequest {
        AddRequest {
            documents: vec![Document::new(self.content.clone())],
            context_type: self.context_type,
            source: self.source.clone(),
            scope: self.scope,
            metadata: Some(AddMetadata {
                file_name: Some(self.file_name.clone()),
                file_type: Some(self.file_type.clone()),
                last_modified: Some(now.to_rfc3339()),
                file_size: Some(self.content.len() as u64),
                group_name: (!self.groups.is_empty()).then(|| self.groups.clone()),
            }),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn no_subcommand_means_demo_search() {
        let cli = Cli::parse_from(["ctx-cli"]);
        assert!(cli.command.is_none());
        let Command::Search(args) = cli.command.unwrap_or_default() else {
            panic!("expected search");
        };
        let (req, opts) = args.to_request();
        assert_eq!(req.query, DEMO_QUERY);
        assert_eq!(req.similarity_threshold, 0.8);
        assert_eq!(req.minimum_similarity_threshold, 0.5);
        assert_eq!(req.scope, Scope::Internal);
        assert_eq!(opts.mode, Some(QueryMode::Fast));
        let meta = req.body_metadata.unwrap();
        assert_eq!(meta.size, Some(100));
        assert_eq!(meta.group_name, Some(vec!["project-name".to_string()]));
    }

    #[test]
    fn search_flag_defaults_match_demo_payload() {
        let Some(Command::Search(parsed)) = Cli::parse_from(["ctx-cli", "search"]).command else {
            panic!("expected search");
        };
        assert_eq!(parsed.to_request(), SearchArgs::default().to_request());
    }

    #[test]
    fn search_flags_override_payload() {
        let cli = Cli::parse_from([
            "ctx-cli",
            "search",
            "--query",
            "founders of Google",
            "--similarity-threshold",
            "0.5",
            "--scope",
            "external",
            "--mode",
            "standard",
            "--no-metadata",
        ]);
        let Some(Command::Search(args)) = cli.command else {
            panic!("expected search");
        };
        let (req, opts) = args.to_request();
        assert_eq!(req.query, "founders of Google");
        assert_eq!(req.similarity_threshold, 0.5);
        assert_eq!(req.scope, Scope::External);
        assert!(req.body_metadata.is_none());
        assert_eq!(opts.mode, Some(QueryMode::Standard));
    }

    #[test]
    fn add_request_carries_size_and_timestamp() {
        let cli = Cli::parse_from([
            "ctx-cli",
            "add",
            "--content",
            "hello",
            "--context-type",
            "conversation",
            "--group",
            "g1",
            "--group",
            "g2",
        ]);
        let Some(Command::Add(args)) = cli.command else {
            panic!("expected add");
        };
        let now = DateTime::parse_from_rfc3339("2025-03-01T12:00:00Z")
            .unwrap()
            .with_timezone(&Utc);
        let req = args.to_request(now);
        assert_eq!(req.context_type, ContextType::Conversation);
        assert_eq!(req.source, "web-upload");
        let meta = req.metadata.unwrap();
        assert_eq!(meta.file_size, Some(5));
        assert_eq!(meta.last_modified.as_deref(), Some("2025-03-01T12:00:00+00:00"));
        assert_eq!(meta.group_name, Some(vec!["g1".to_string(), "g2".to_string()]));
    }
}

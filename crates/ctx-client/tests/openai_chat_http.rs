//! Chat model tests against a local axum stub of a chat-completions endpoint.

use axum::extract::State;
use axum::http::{HeaderMap, StatusCode};
use axum::response::IntoResponse;
use axum::routing::post;
use axum::{Json, Router};
use ctx_client::{ChatError, ChatModel, OpenAiChatModel};
use ctx_types::Message;
use serde_json::{json, Value};
use std::sync::Arc;
use tokio::sync::Mutex;

#[derive(Debug, Clone)]
struct Seen {
    auth: Option<String>,
    body: Value,
}

#[derive(Clone)]
struct Stub {
    status: StatusCode,
    reply: Value,
    log: Arc<Mutex<Vec<Seen>>>,
}

async fn handle_completion(
    State(stub): State<Stub>,
    headers: HeaderMap,
    Json(body): Json<Value>,
) -> impl IntoResponse {
    stub.log.lock().await.push(Seen {
        auth: headers
            .get("authorization")
            .and_then(|v| v.to_str().ok())
            .map(String::from),
        body,
    });
    (stub.status, Json(stub.reply.clone()))
}

/// Serve `reply` with `status`; returns the endpoint URL and the request log.
async fn spawn_stub(status: StatusCode, reply: Value) -> (String, Arc<Mutex<Vec<Seen>>>) {
    let log = Arc::new(Mutex::new(Vec::new()));
    let stub = Stub {
        status,
        reply,
        log: Arc::clone(&log),
    };
    let app = Router::new()
        .route("/v1/chat/completions", post(handle_completion))
        .with_state(stub);
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });
    (format!("http://{}/v1/chat/completions", addr), log)
}

fn answer(content: Value) -> Value {
    json!({ "choices": [ { "message": { "role": "assistant", "content": content } } ] })
}

fn conversation() -> Vec<Message> {
    vec![
        Message::system("You are a helpful AI assistant with memory. "),
        Message::user("who founded Google?"),
    ]
}

#[tokio::test]
async fn completion_sends_model_sampling_and_bearer_auth() {
    let (url, log) = spawn_stub(StatusCode::OK, answer(json!("Larry Page and Sergey Brin"))).await;
    let model = OpenAiChatModel::new(url, "sk-test", "gpt-4o-mini");

    let reply = model.complete(&conversation()).await.unwrap();
    assert_eq!(reply, "Larry Page and Sergey Brin");

    let seen = log.lock().await.clone();
    assert_eq!(seen.len(), 1);
    assert_eq!(seen[0].auth.as_deref(), Some("Bearer sk-test"));
    let body = &seen[0].body;
    assert_eq!(body["model"], "gpt-4o-mini");
    assert_eq!(body["max_tokens"], 500);
    let temperature = body["temperature"].as_f64().unwrap();
    assert!((temperature - 0.7).abs() < 1e-6);
    assert_eq!(body["messages"][0]["role"], "system");
    assert_eq!(body["messages"][1]["role"], "user");
    assert_eq!(body["messages"][1]["content"], "who founded Google?");
}

#[tokio::test]
async fn error_status_becomes_api_error() {
    let (url, _log) = spawn_stub(
        StatusCode::TOO_MANY_REQUESTS,
        json!({ "error": { "message": "rate limited" } }),
    )
    .await;
    let model = OpenAiChatModel::new(url, "sk-test", "gpt-4o-mini");

    match model.complete(&conversation()).await.unwrap_err() {
        ChatError::Api { status, body } => {
            assert_eq!(status, 429);
            assert!(body.contains("rate limited"));
        }
        other => panic!("unexpected error: {other}"),
    }
}

#[tokio::test]
async fn empty_choices_is_an_empty_response() {
    let (url, _log) = spawn_stub(StatusCode::OK, json!({ "choices": [] })).await;
    let model = OpenAiChatModel::new(url, "sk-test", "gpt-4o-mini");
    let err = model.complete(&conversation()).await.unwrap_err();
    assert!(matches!(err, ChatError::EmptyResponse));
}

#[tokio::test]
async fn null_content_is_an_empty_response() {
    let (url, _log) = spawn_stub(StatusCode::OK, answer(Value::Null)).await;
    let model = OpenAiChatModel::new(url, "sk-test", "gpt-4o-mini");
    let err = model.complete(&conversation()).await.unwrap_err();
    assert!(matches!(err, ChatError::EmptyResponse));
}

#[test]
fn missing_key_fails_before_any_request() {
    let err = OpenAiChatModel::from_lookup(|_| None).unwrap_err();
    assert!(matches!(err, ChatError::MissingApiKey("OPENAI_API_KEY")));
}

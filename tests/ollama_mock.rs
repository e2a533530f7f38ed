//! HTTP clients against a local stand-in for the Ollama API.

use axum::{
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::post,
    Json, Router,
};
use memchat::completion::{CompletionClient, OllamaChat};
use memchat::config::{CompletionConfig, Config, EmbeddingConfig};
use memchat::embedding::OllamaEmbedder;
use memchat::progress::NoProgress;
use memchat::session::{start_session, Outcome};
use memchat_core::embedding::Embedder;
use memchat_core::models::Message;
use memchat_core::persona::Persona;
use memchat_core::ChatError;
use serde_json::{json, Value};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use tempfile::TempDir;

#[derive(Default)]
struct MockOllama {
    /// Respond to this many embed calls with `embed_status` before succeeding.
    embed_failures: AtomicUsize,
    embed_status: Mutex<Option<StatusCode>>,
    embed_calls: AtomicUsize,
    chat_requests: Mutex<Vec<Value>>,
}

async fn handle_embed(State(mock): State<Arc<MockOllama>>, Json(body): Json<Value>) -> Response {
    mock.embed_calls.fetch_add(1, Ordering::SeqCst);

    let status = *mock.embed_status.lock().unwrap();
    if let Some(status) = status {
        let remaining = mock.embed_failures.load(Ordering::SeqCst);
        if remaining > 0 {
            mock.embed_failures.fetch_sub(1, Ordering::SeqCst);
            return (status, "model is loading").into_response();
        }
    }

    let text = body["input"][0].as_str().unwrap_or_default();
    let vector = if text.contains("pricing") {
        json!([1.0, 0.0])
    } else {
        json!([0.0, 1.0])
    };
    Json(json!({ "model": body["model"], "embeddings": [vector] })).into_response()
}

async fn handle_chat(State(mock): State<Arc<MockOllama>>, Json(body): Json<Value>) -> Response {
    let last = body["messages"]
        .as_array()
        .and_then(|m| m.last())
        .and_then(|m| m["content"].as_str())
        .unwrap_or_default()
        .to_string();
    mock.chat_requests.lock().unwrap().push(body);
    Json(json!({
        "model": "mistral",
        "message": { "role": "assistant", "content": format!("echo: {}", last) },
        "done": true
    }))
    .into_response()
}

async fn spawn_mock(mock: Arc<MockOllama>) -> String {
    let app = Router::new()
        .route("/api/embed", post(handle_embed))
        .route("/api/chat", post(handle_chat))
        .with_state(mock);
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });
    format!("http://{}", addr)
}

fn embedding_config(url: &str, max_retries: u32) -> EmbeddingConfig {
    EmbeddingConfig {
        url: url.to_string(),
        dims: 2,
        max_retries,
        timeout_secs: 5,
        ..Default::default()
    }
}

#[tokio::test]
async fn embed_returns_first_vector() {
    let mock = Arc::new(MockOllama::default());
    let url = spawn_mock(mock.clone()).await;

    let embedder = OllamaEmbedder::new(&embedding_config(&url, 0)).unwrap();
    assert_eq!(embedder.embed("pricing tiers").await.unwrap(), vec![1.0, 0.0]);
    assert_eq!(embedder.embed("hiring").await.unwrap(), vec![0.0, 1.0]);
    assert_eq!(mock.embed_calls.load(Ordering::SeqCst), 2);
}

#[tokio::test]
async fn embed_retries_server_errors() {
    let mock = Arc::new(MockOllama::default());
    mock.embed_failures.store(1, Ordering::SeqCst);
    *mock.embed_status.lock().unwrap() = Some(StatusCode::INTERNAL_SERVER_ERROR);
    let url = spawn_mock(mock.clone()).await;

    let embedder = OllamaEmbedder::new(&embedding_config(&url, 2)).unwrap();
    assert_eq!(embedder.embed("pricing").await.unwrap(), vec![1.0, 0.0]);
    assert_eq!(mock.embed_calls.load(Ordering::SeqCst), 2);
}

#[tokio::test]
async fn embed_client_errors_fail_fast() {
    let mock = Arc::new(MockOllama::default());
    mock.embed_failures.store(10, Ordering::SeqCst);
    *mock.embed_status.lock().unwrap() = Some(StatusCode::BAD_REQUEST);
    let url = spawn_mock(mock.clone()).await;

    let embedder = OllamaEmbedder::new(&embedding_config(&url, 3)).unwrap();
    let err = embedder.embed("pricing").await.unwrap_err();
    assert!(matches!(err, ChatError::EmbeddingUnavailable(ref m) if m.contains("400")));
    assert_eq!(mock.embed_calls.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn chat_sends_roles_and_reads_reply() {
    let mock = Arc::new(MockOllama::default());
    let url = spawn_mock(mock.clone()).await;

    let chat = OllamaChat::new(&CompletionConfig {
        url,
        ..Default::default()
    })
    .unwrap();
    let reply = chat
        .complete(
            "mistral",
            &[Message::system("be brief"), Message::user("hola")],
        )
        .await
        .unwrap();
    assert_eq!(reply, "echo: hola");

    let requests = mock.chat_requests.lock().unwrap();
    assert_eq!(requests[0]["model"], "mistral");
    assert_eq!(requests[0]["stream"], false);
    assert_eq!(requests[0]["messages"][0]["role"], "system");
    assert_eq!(requests[0]["messages"][1]["role"], "user");
}

#[tokio::test]
async fn gtm_session_answers_with_sources() {
    let mock = Arc::new(MockOllama::default());
    let url = spawn_mock(mock.clone()).await;

    let tmp = TempDir::new().unwrap();
    let mut config = Config::default();
    config.memory.root = tmp.path().join("memory");
    config.embedding = embedding_config(&url, 0);
    config.completion.url = url.clone();
    config.retrieval.k = 1;

    let articles = config.memory.articles_dir();
    std::fs::create_dir_all(&articles).unwrap();
    std::fs::write(articles.join("pricing.md"), "pricing: prefer annual plans").unwrap();
    std::fs::write(articles.join("hiring.md"), "hire two account executives").unwrap();

    let client = Arc::new(OllamaChat::new(&config.completion).unwrap());
    let embedder = Arc::new(OllamaEmbedder::new(&config.embedding).unwrap());
    let mut session = start_session(&config, Persona::Gtm, client, embedder, &NoProgress)
        .await
        .unwrap();

    let out = session.handle_line("what about pricing?").await;
    assert_eq!(
        out,
        Outcome::Reply("echo: what about pricing?\n\nSources: [pricing.md]".into())
    );
    assert!(config.memory.index_path().exists());

    let requests = mock.chat_requests.lock().unwrap();
    let messages = requests[0]["messages"].as_array().unwrap();
    let context = messages
        .iter()
        .find(|m| {
            m["content"]
                .as_str()
                .is_some_and(|c| c.contains("relevant context from the GTM documents"))
        })
        .unwrap();
    assert!(context["content"]
        .as_str()
        .unwrap()
        .contains("From pricing.md:\npricing: prefer annual plans"));
}

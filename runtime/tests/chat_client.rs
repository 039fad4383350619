use std::net::SocketAddr;

use axum::{
    Json, Router,
    http::StatusCode,
    routing::{get, post},
};
use rfp_extract::{
    ai::chat::{ChatCompletionsClient, ChatModel, ChatRequest},
    config::LlmConfig,
};
use serde_json::{Value, json};
use tokio::net::TcpListener;

async fn spawn_endpoint(app: Router) -> SocketAddr {
    let listener = TcpListener::bind("127.0.0.1:0").await.expect("bind test listener");
    let addr = listener.local_addr().expect("listener addr");
    tokio::spawn(async move {
        axum::serve(listener, app).await.expect("serve test endpoint");
    });
    addr
}

fn config_for(addr: SocketAddr) -> LlmConfig {
    LlmConfig {
        base_url: format!("http://{addr}/"),
        ..LlmConfig::default()
    }
}

async fn echo_completion(Json(body): Json<Value>) -> Json<Value> {
    let model = body["model"].as_str().unwrap_or_default();
    let user = body["messages"][1]["content"].as_str().unwrap_or_default();
    Json(json!({
        "choices": [
            {"message": {"role": "assistant", "content": format!("model={model} user={user}")}}
        ]
    }))
}

#[tokio::test]
async fn completion_returns_first_choice_content() {
    let app = Router::new().route("/v1/chat/completions", post(echo_completion));
    let addr = spawn_endpoint(app).await;
    let llm = config_for(addr);
    let client = ChatCompletionsClient::new(&llm).expect("client");

    assert_eq!(
        client.chat_completions_url(),
        format!("http://{addr}/v1/chat/completions")
    );
    let request = ChatRequest::new("qwen2.5-vl-7b-instruct", &llm, "sys".into(), "hello".into());
    let content = client.complete(&request).await.expect("completion");
    assert_eq!(content, "model=qwen2.5-vl-7b-instruct user=hello");
}

#[tokio::test]
async fn non_success_status_is_an_error() {
    let app = Router::new().route(
        "/v1/chat/completions",
        post(|| async { (StatusCode::SERVICE_UNAVAILABLE, "model is loading") }),
    );
    let addr = spawn_endpoint(app).await;
    let llm = config_for(addr);
    let client = ChatCompletionsClient::new(&llm).expect("client");

    let err = client
        .complete(&ChatRequest::new("m", &llm, "s".into(), "u".into()))
        .await
        .unwrap_err();
    assert!(err.to_string().contains("503"));
    assert!(err.to_string().contains("model is loading"));
}

#[tokio::test]
async fn models_are_listed_and_deduplicated() {
    let app = Router::new().route(
        "/v1/models",
        get(|| async {
            Json(json!({"data": [{"id": "qwen2.5-vl-7b-instruct"}, {"id": "llama-3"}, {"id": "llama-3"}]}))
        }),
    );
    let addr = spawn_endpoint(app).await;
    let client = ChatCompletionsClient::new(&config_for(addr)).expect("client");

    assert_eq!(
        client.list_models().await,
        vec!["qwen2.5-vl-7b-instruct".to_string(), "llama-3".to_string()]
    );
}

#[tokio::test]
async fn unreachable_endpoint_lists_no_models() {
    let listener = TcpListener::bind("127.0.0.1:0").await.expect("bind");
    let addr = listener.local_addr().expect("addr");
    drop(listener);

    let client = ChatCompletionsClient::new(&config_for(addr)).expect("client");
    assert!(client.list_models().await.is_empty());
}

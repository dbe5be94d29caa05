use crate::support::message;
use heartflow::MessageOutcome;
use heartflow::config::{Config, ProviderEndpointConfig};
use heartflow::conversation::InMemoryConversations;
use heartflow::llm::{CompatibleProvider, Provider, ProviderMessage};
use heartflow::transport::QueuePipeline;
use heartflow::Heartflow;
use serde_json::json;
use std::sync::Arc;
use wiremock::matchers::{header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn completion(content: &str) -> serde_json::Value {
    json!({
        "id": "chatcmpl-1",
        "object": "chat.completion",
        "choices": [
            {"index": 0, "message": {"role": "assistant", "content": content}, "finish_reason": "stop"}
        ]
    })
}

fn endpoint(server: &MockServer) -> ProviderEndpointConfig {
    ProviderEndpointConfig {
        base_url: format!("{}/v1", server.uri()),
        api_key: Some("sk-test".into()),
        model: "qwen2.5-0.5b".into(),
        timeout_secs: 5,
    }
}

#[tokio::test]
async fn chat_posts_history_then_prompt() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/v1/chat/completions"))
        .and(header("authorization", "Bearer sk-test"))
        .respond_with(ResponseTemplate::new(200).set_body_json(completion("{\"relevance\": 7}")))
        .expect(1)
        .mount(&server)
        .await;

    let provider = CompatibleProvider::new("tiny", &endpoint(&server));
    let history = vec![
        ProviderMessage::user("alice: morning"),
        ProviderMessage::assistant("good morning!"),
    ];
    let reply = provider
        .chat_with_history("score this", &history, "", 0.1)
        .await
        .unwrap();

    assert_eq!(reply, "{\"relevance\": 7}");

    let received = server.received_requests().await.unwrap();
    let body: serde_json::Value = serde_json::from_slice(&received[0].body).unwrap();
    assert_eq!(body["model"], "qwen2.5-0.5b");
    assert_eq!(body["stream"], false);
    let messages = body["messages"].as_array().unwrap();
    assert_eq!(messages.len(), 3);
    assert_eq!(messages[1]["role"], "assistant");
    assert_eq!(messages[2]["content"], "score this");
    server.verify().await;
}

#[tokio::test]
async fn server_error_is_reported_without_the_key() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/v1/chat/completions"))
        .respond_with(
            ResponseTemplate::new(500).set_body_string("upstream exploded for key sk-test123456"),
        )
        .mount(&server)
        .await;

    let provider = CompatibleProvider::new("tiny", &endpoint(&server));
    let err = provider.chat("score this", "", 0.1).await.unwrap_err();
    let text = err.to_string();

    assert!(text.contains("API error"));
    assert!(text.contains("500"));
    assert!(!text.contains("sk-test123456"));
}

#[tokio::test]
async fn heartflow_judges_through_configured_endpoint() {
    let server = MockServer::start().await;
    let scores = r#"```json
{"relevance": 8, "willingness": 9, "social": 7, "timing": 8, "continuity": 6}
```"#;
    Mock::given(method("POST"))
        .and(path("/v1/chat/completions"))
        .respond_with(ResponseTemplate::new(200).set_body_json(completion(scores)))
        .expect(1)
        .mount(&server)
        .await;

    let mut config = Config {
        enabled: true,
        ..Config::default()
    };
    config.judge.provider = Some("local".into());
    config.providers.insert("local".into(), endpoint(&server));
    let (pipeline, _rx) = QueuePipeline::channel(4);
    let hf = Heartflow::from_config(
        config,
        Arc::new(InMemoryConversations::new()),
        Arc::new(pipeline),
    );

    let outcome = hf.on_group_message(message("g1", "alice", "anyone seen the new trailer?")).await;

    match outcome {
        MessageOutcome::Deferred { score } => assert!(score > 0.6),
        other => panic!("unexpected outcome: {other:?}"),
    }
    assert!(hf.debounce().is_waiting("g1", "alice"));
    assert_eq!(hf.debounce().cancel_all(), 1);
    server.verify().await;
}

#[tokio::test]
async fn unreachable_endpoint_declines() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(503))
        .mount(&server)
        .await;

    let mut config = Config {
        enabled: true,
        ..Config::default()
    };
    config.judge.provider = Some("local".into());
    config.providers.insert("local".into(), endpoint(&server));
    let (pipeline, _rx) = QueuePipeline::channel(4);
    let hf = Heartflow::from_config(
        config,
        Arc::new(InMemoryConversations::new()),
        Arc::new(pipeline),
    );

    let outcome = hf.on_group_message(message("g1", "alice", "hello")).await;

    assert!(matches!(outcome, MessageOutcome::Declined { .. }));
    assert_eq!(server.received_requests().await.unwrap().len(), 1);
    assert_eq!(hf.energy().get_state("g1").total_messages, 1);
}

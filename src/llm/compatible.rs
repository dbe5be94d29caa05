use super::scrub::api_error;
use super::traits::Provider;
use super::types::ProviderMessage;
use crate::config::ProviderEndpointConfig;
use crate::error::LlmError;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::future::Future;
use std::pin::Pin;
use std::time::Duration;

#[derive(Debug, Serialize)]
struct ChatRequest {
    model: String,
    messages: Vec<Message>,
    temperature: f64,
    stream: bool,
}

#[derive(Debug, Serialize)]
struct Message {
    role: &'static str,
    content: String,
}

#[derive(Debug, Deserialize)]
struct ChatResponse {
    choices: Vec<Choice>,
}

#[derive(Debug, Deserialize)]
struct Choice {
    message: ResponseMessage,
}

#[derive(Debug, Deserialize)]
struct ResponseMessage {
    #[serde(default)]
    content: Option<String>,
}

/// Pooled client for one judge endpoint. Judge calls are short, so the
/// connect timeout never exceeds the request timeout.
fn build_client(timeout_secs: u64) -> Client {
    let timeout = Duration::from_secs(timeout_secs.max(1));
    Client::builder()
        .timeout(timeout)
        .connect_timeout(timeout.min(Duration::from_secs(10)))
        .pool_max_idle_per_host(4)
        .pool_idle_timeout(Duration::from_secs(90))
        .tcp_keepalive(Duration::from_secs(60))
        .build()
        .unwrap_or_else(|error| {
            tracing::warn!(%error, "falling back to a default HTTP client");
            Client::new()
        })
}

/// Client for any endpoint speaking the OpenAI chat-completions dialect
/// (llama.cpp server, vLLM, Ollama's `/v1`, hosted gateways).
pub struct CompatibleProvider {
    name: String,
    base_url: String,
    api_key: Option<String>,
    default_model: String,
    client: Client,
}

impl CompatibleProvider {
    pub fn new(name: impl Into<String>, endpoint: &ProviderEndpointConfig) -> Self {
        Self {
            name: name.into(),
            base_url: endpoint.base_url.trim_end_matches('/').to_string(),
            api_key: endpoint
                .api_key
                .as_deref()
                .map(str::trim)
                .filter(|k| !k.is_empty())
                .map(str::to_string),
            default_model: endpoint.model.clone(),
            client: build_client(endpoint.timeout_secs),
        }
    }

    fn build_request(
        &self,
        prompt: &str,
        history: &[ProviderMessage],
        model: &str,
        temperature: f64,
    ) -> ChatRequest {
        let mut messages = Vec::with_capacity(history.len() + 1);
        for turn in history {
            // Callers pre-filter, but tool turns must never reach the wire.
            if !turn.is_conversational() {
                continue;
            }
            if let Some(content) = turn.plain_text() {
                messages.push(Message {
                    role: turn.role.as_str(),
                    content,
                });
            }
        }
        messages.push(Message {
            role: "user",
            content: prompt.to_string(),
        });

        let model = if model.is_empty() {
            self.default_model.clone()
        } else {
            model.to_string()
        };

        ChatRequest {
            model,
            messages,
            temperature,
            stream: false,
        }
    }

    async fn call_api(
        &self,
        prompt: &str,
        history: &[ProviderMessage],
        model: &str,
        temperature: f64,
    ) -> anyhow::Result<String> {
        if self.base_url.is_empty() {
            return Err(LlmError::MissingBaseUrl {
                provider: self.name.clone(),
            }
            .into());
        }

        let request = self.build_request(prompt, history, model, temperature);
        let url = format!("{}/chat/completions", self.base_url);

        let mut builder = self.client.post(&url).json(&request);
        if let Some(key) = &self.api_key {
            builder = builder.bearer_auth(key);
        }
        let response = builder.send().await.map_err(|e| LlmError::Request {
            provider: self.name.clone(),
            message: e.to_string(),
        })?;

        if !response.status().is_success() {
            return Err(api_error(&self.name, response).await);
        }

        let body: ChatResponse = response.json().await.map_err(|e| LlmError::Request {
            provider: self.name.clone(),
            message: format!("invalid response body: {e}"),
        })?;

        body.choices
            .into_iter()
            .next()
            .and_then(|choice| choice.message.content)
            .ok_or_else(|| {
                LlmError::EmptyCompletion {
                    provider: self.name.clone(),
                }
                .into()
            })
    }
}

impl Provider for CompatibleProvider {
    fn name(&self) -> &str {
        &self.name
    }

    fn chat_with_history<'a>(
        &'a self,
        prompt: &'a str,
        history: &'a [ProviderMessage],
        model: &'a str,
        temperature: f64,
    ) -> Pin<Box<dyn Future<Output = anyhow::Result<String>> + Send + 'a>> {
        Box::pin(async move { self.call_api(prompt, history, model, temperature).await })
    }

    fn warmup(&self) -> Pin<Box<dyn Future<Output = anyhow::Result<()>> + Send + '_>> {
        Box::pin(async move {
            if self.base_url.is_empty() {
                return Ok(());
            }
            // Any response (even 404) proves the pool has a live connection.
            self.client.get(&self.base_url).send().await?;
            Ok(())
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::llm::types::{ContentBlock, MessageRole};

    fn endpoint(base_url: &str) -> ProviderEndpointConfig {
        ProviderEndpointConfig {
            base_url: base_url.into(),
            api_key: Some("  sk-test  ".into()),
            model: "tiny-1b".into(),
            timeout_secs: 5,
        }
    }

    #[test]
    fn base_url_trailing_slash_is_trimmed() {
        let p = CompatibleProvider::new("tiny", &endpoint("http://localhost:8080/v1/"));
        assert_eq!(p.base_url, "http://localhost:8080/v1");
        assert_eq!(p.api_key.as_deref(), Some("sk-test"));
    }

    #[test]
    fn request_appends_prompt_after_history() {
        let p = CompatibleProvider::new("tiny", &endpoint("http://x"));
        let history = vec![
            ProviderMessage::user("hello"),
            ProviderMessage::assistant("hi"),
        ];
        let req = p.build_request("judge this", &history, "", 0.2);
        assert_eq!(req.model, "tiny-1b");
        assert_eq!(req.messages.len(), 3);
        assert_eq!(req.messages[0].role, "user");
        assert_eq!(req.messages[1].role, "assistant");
        assert_eq!(req.messages[2].content, "judge this");
    }

    #[test]
    fn request_never_carries_tool_turns() {
        let p = CompatibleProvider::new("tiny", &endpoint("http://x"));
        let history = vec![
            ProviderMessage::tool_result("t1", "secret tool output", false),
            ProviderMessage {
                role: MessageRole::Assistant,
                content: vec![ContentBlock::ToolUse {
                    id: "t2".into(),
                    name: "lookup".into(),
                    input: serde_json::json!({}),
                }],
            },
        ];
        let req = p.build_request("judge", &history, "explicit", 0.2);
        assert_eq!(req.model, "explicit");
        assert_eq!(req.messages.len(), 1);
        let json = serde_json::to_string(&req).unwrap();
        assert!(!json.contains("secret tool output"));
        assert!(json.contains("\"stream\":false"));
    }

    #[tokio::test]
    async fn empty_base_url_is_an_error() {
        let p = CompatibleProvider::new("tiny", &endpoint(""));
        let err = p.chat("hi", "", 0.0).await.unwrap_err();
        assert!(err.to_string().contains("base url"));
    }
}

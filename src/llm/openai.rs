use std::sync::Arc;

use serde::{Deserialize, Serialize};
use serde_json::json;

use super::{BackendAdapter, HttpTransport, Instructions, RawPayload};
use crate::error::GenerationError;
use crate::settings::GenerationSettings;

/// Any server speaking the OpenAI chat-completions protocol (OpenAI,
/// vLLM, Ollama's `/v1` endpoint).
pub struct OpenAiCompatibleAdapter {
    transport: Arc<dyn HttpTransport>,
    api_key: String,
}

impl OpenAiCompatibleAdapter {
    pub fn new(transport: Arc<dyn HttpTransport>, api_key: &str) -> Self {
        Self {
            transport,
            api_key: api_key.to_string(),
        }
    }
}

#[derive(Serialize)]
struct ChatMessage<'a> {
    role: &'static str,
    content: &'a str,
}

#[derive(Deserialize)]
struct ChatCompletionResponse {
    #[serde(default)]
    choices: Vec<ChatChoice>,
}

#[derive(Deserialize)]
struct ChatChoice {
    message: Option<ChatChoiceMessage>,
}

#[derive(Deserialize)]
struct ChatChoiceMessage {
    content: Option<String>,
}

#[async_trait::async_trait]
impl BackendAdapter for OpenAiCompatibleAdapter {
    async fn invoke(
        &self,
        _prompt: &str,
        settings: &GenerationSettings,
        instructions: &Instructions,
    ) -> Result<RawPayload, GenerationError> {
        let base_url = settings.base_url().ok_or_else(|| {
            GenerationError::Configuration(
                "Base URL is required for the openai provider".to_string(),
            )
        })?;
        let url = format!("{}/chat/completions", base_url.trim_end_matches('/'));

        let messages = vec![
            ChatMessage {
                role: "system",
                content: &instructions.system,
            },
            ChatMessage {
                role: "user",
                content: &instructions.user,
            },
        ];
        let body = json!({
            "model": settings.model(),
            "messages": messages,
            "temperature": settings.temperature,
            "response_format": { "type": "json_object" },
        });
        let headers = [("authorization", format!("Bearer {}", self.api_key))];

        let response = self.transport.post_json(&url, &headers, &body).await?;
        let response_body = response.into_success_body()?;

        let completion: ChatCompletionResponse =
            serde_json::from_str(&response_body).map_err(|e| GenerationError::Parse {
                reason: format!("unexpected chat completion envelope: {e}"),
                raw: response_body.clone(),
            })?;

        let content = completion
            .choices
            .into_iter()
            .next()
            .and_then(|c| c.message)
            .and_then(|m| m.content)
            .unwrap_or_default();

        if content.trim().is_empty() {
            return Err(GenerationError::EmptyResponse(self.name().to_string()));
        }

        Ok(RawPayload::Text(content))
    }

    fn name(&self) -> &str {
        "openai"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorKind;
    use crate::llm::testing::MockTransport;
    use crate::pipeline::prompt;
    use crate::settings::Backend;

    fn settings(base_url: Option<&str>) -> GenerationSettings {
        GenerationSettings {
            provider: Backend::OpenAiCompatible,
            base_url: base_url.map(str::to_string),
            model_name: "llama3".to_string(),
            temperature: 0.7,
            ..Default::default()
        }
    }

    fn completion(content: serde_json::Value) -> String {
        json!({
            "id": "chatcmpl-1",
            "object": "chat.completion",
            "choices": [{ "index": 0, "message": { "role": "assistant", "content": content } }]
        })
        .to_string()
    }

    async fn invoke(
        transport: Arc<MockTransport>,
        settings: &GenerationSettings,
    ) -> Result<RawPayload, GenerationError> {
        let adapter = OpenAiCompatibleAdapter::new(transport, "sk-test");
        let instructions = prompt::build("a login button", settings);
        adapter
            .invoke("a login button", settings, &instructions)
            .await
    }

    #[tokio::test]
    async fn test_request_shape() {
        let transport = Arc::new(MockTransport::ok(completion(json!("{}"))));
        let s = settings(Some("http://localhost:11434/v1/"));
        tokio_test::assert_ok!(invoke(transport.clone(), &s).await);

        let call = transport.last_call();
        assert_eq!(call.url, "http://localhost:11434/v1/chat/completions");
        assert!(
            call.headers
                .contains(&("authorization".to_string(), "Bearer sk-test".to_string()))
        );
        assert_eq!(call.body["model"], "llama3");
        assert_eq!(call.body["messages"][0]["role"], "system");
        assert_eq!(call.body["messages"][1]["role"], "user");
        assert!(
            call.body["messages"][0]["content"]
                .as_str()
                .unwrap()
                .contains("\"jsCode\": string")
        );
        assert_eq!(call.body["response_format"]["type"], "json_object");
        assert_eq!(call.body["temperature"], json!(0.7));
        assert_eq!(call.body["temperature"].to_string(), "0.7");
    }

    #[tokio::test]
    async fn test_returns_message_text_verbatim() {
        let content = "```json\n{\"clxCode\":\"<a/>\",\"jsCode\":\"\"}\n```";
        let transport = Arc::new(MockTransport::ok(completion(json!(content))));
        let payload = invoke(transport, &settings(Some("http://x/v1"))).await.unwrap();
        assert_eq!(payload, RawPayload::Text(content.to_string()));
    }

    #[tokio::test]
    async fn test_missing_base_url_makes_no_call() {
        let transport = Arc::new(MockTransport::ok(completion(json!("{}"))));
        let err = invoke(transport.clone(), &settings(None)).await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Configuration);
        assert_eq!(transport.call_count(), 0);
    }

    #[tokio::test]
    async fn test_missing_content_is_empty_response() {
        for content in [json!(null), json!(""), json!("   ")] {
            let transport = Arc::new(MockTransport::ok(completion(content)));
            let err = invoke(transport, &settings(Some("http://x/v1")))
                .await
                .unwrap_err();
            assert_eq!(err.kind(), ErrorKind::EmptyResponse);
        }

        let transport = Arc::new(MockTransport::ok(r#"{"choices": []}"#));
        let err = invoke(transport, &settings(Some("http://x/v1")))
            .await
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::EmptyResponse);
    }

    #[tokio::test]
    async fn test_server_error_carries_status_and_body() {
        let transport = Arc::new(MockTransport::new(500, "server exploded"));
        let err = invoke(transport, &settings(Some("http://x/v1")))
            .await
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Transport);
        assert_eq!(err.to_string(), "Provider error (500): server exploded");
    }
}

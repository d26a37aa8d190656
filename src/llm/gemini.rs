use std::sync::Arc;

use serde::Deserialize;
use serde_json::{Value, json};

use super::{BackendAdapter, HttpTransport, Instructions, RawPayload};
use crate::error::GenerationError;
use crate::settings::GenerationSettings;

pub const DEFAULT_GEMINI_BASE_URL: &str = "https://generativelanguage.googleapis.com/v1beta";

pub struct GeminiAdapter {
    transport: Arc<dyn HttpTransport>,
    api_key: String,
    base_url: String,
}

impl GeminiAdapter {
    pub fn new(transport: Arc<dyn HttpTransport>, api_key: &str) -> Self {
        Self::with_base_url(transport, api_key, DEFAULT_GEMINI_BASE_URL)
    }

    pub fn with_base_url(transport: Arc<dyn HttpTransport>, api_key: &str, base_url: &str) -> Self {
        Self {
            transport,
            api_key: api_key.to_string(),
            base_url: base_url.trim_end_matches('/').to_string(),
        }
    }
}

#[derive(Deserialize)]
struct GenerateContentResponse {
    #[serde(default)]
    candidates: Vec<GeminiCandidate>,
}

#[derive(Deserialize)]
struct GeminiCandidate {
    content: Option<GeminiCandidateContent>,
}

#[derive(Deserialize)]
struct GeminiCandidateContent {
    #[serde(default)]
    parts: Vec<GeminiResponsePart>,
}

#[derive(Deserialize)]
struct GeminiResponsePart {
    text: Option<String>,
}

#[async_trait::async_trait]
impl BackendAdapter for GeminiAdapter {
    async fn invoke(
        &self,
        _prompt: &str,
        settings: &GenerationSettings,
        instructions: &Instructions,
    ) -> Result<RawPayload, GenerationError> {
        let mut generation_config = json!({
            "temperature": settings.temperature,
            "responseMimeType": "application/json",
        });
        if let Some(schema) = &instructions.response_schema {
            generation_config["responseSchema"] = schema.clone();
        }

        let body = json!({
            "systemInstruction": { "parts": [{ "text": instructions.system }] },
            "contents": [{ "role": "user", "parts": [{ "text": instructions.user }] }],
            "generationConfig": generation_config,
        });

        let url = format!("{}/models/{}:generateContent", self.base_url, settings.model());
        let headers = [("x-goog-api-key", self.api_key.clone())];

        let response = self.transport.post_json(&url, &headers, &body).await?;
        let response_body = response.into_success_body()?;

        let envelope: GenerateContentResponse =
            serde_json::from_str(&response_body).map_err(|e| GenerationError::Parse {
                reason: format!("unexpected Gemini envelope: {e}"),
                raw: response_body.clone(),
            })?;

        let text = envelope
            .candidates
            .into_iter()
            .next()
            .and_then(|c| c.content)
            .map(|content| {
                content
                    .parts
                    .into_iter()
                    .filter_map(|p| p.text)
                    .collect::<Vec<_>>()
                    .join("")
            })
            .unwrap_or_default();

        if text.trim().is_empty() {
            return Err(GenerationError::EmptyResponse(self.name().to_string()));
        }

        // Schema-constrained output is a bare JSON object.
        let value = serde_json::from_str::<Value>(&text).map_err(|e| GenerationError::Parse {
            reason: e.to_string(),
            raw: text.clone(),
        })?;

        Ok(RawPayload::Structured(value))
    }

    fn name(&self) -> &str {
        "gemini"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorKind;
    use crate::llm::testing::MockTransport;
    use crate::pipeline::prompt;

    fn envelope(text: &str) -> String {
        json!({
            "candidates": [{ "content": { "role": "model", "parts": [{ "text": text }] } }]
        })
        .to_string()
    }

    async fn invoke(transport: Arc<MockTransport>) -> Result<RawPayload, GenerationError> {
        let adapter = GeminiAdapter::with_base_url(transport, "test-key", "http://gemini.test/v1beta/");
        let settings = GenerationSettings::default();
        let instructions = prompt::build("a login button", &settings);
        adapter
            .invoke("a login button", &settings, &instructions)
            .await
    }

    #[tokio::test]
    async fn test_request_shape() {
        let transport = Arc::new(MockTransport::ok(envelope(r#"{"clxCode":"","jsCode":""}"#)));
        tokio_test::assert_ok!(invoke(transport.clone()).await);

        let call = transport.last_call();
        assert_eq!(
            call.url,
            "http://gemini.test/v1beta/models/gemini-3-pro-preview:generateContent"
        );
        assert!(
            call.headers
                .contains(&("x-goog-api-key".to_string(), "test-key".to_string()))
        );
        assert_eq!(call.body["contents"][0]["role"], "user");
        assert!(
            call.body["systemInstruction"]["parts"][0]["text"]
                .as_str()
                .unwrap()
                .contains("eXbuilder6")
        );
        assert_eq!(call.body["generationConfig"]["temperature"], json!(0.2));
        assert_eq!(call.body["generationConfig"]["temperature"].to_string(), "0.2");
        assert_eq!(
            call.body["generationConfig"]["responseMimeType"],
            "application/json"
        );
        assert_eq!(
            call.body["generationConfig"]["responseSchema"]["type"],
            "OBJECT"
        );
    }

    #[tokio::test]
    async fn test_joins_text_parts_into_structured_payload() {
        let body = json!({
            "candidates": [{ "content": { "parts": [
                { "text": "{\"clxCode\":\"<a/>\"," },
                { "text": "\"jsCode\":\"x\"}" }
            ] } }]
        })
        .to_string();
        let payload = invoke(Arc::new(MockTransport::ok(body))).await.unwrap();
        assert_eq!(
            payload,
            RawPayload::Structured(json!({"clxCode": "<a/>", "jsCode": "x"}))
        );
    }

    #[tokio::test]
    async fn test_empty_candidates_is_empty_response() {
        let err = invoke(Arc::new(MockTransport::ok(r#"{"candidates": []}"#)))
            .await
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::EmptyResponse);

        let err = invoke(Arc::new(MockTransport::ok(envelope("  "))))
            .await
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::EmptyResponse);
    }

    #[tokio::test]
    async fn test_http_error_is_provider_error() {
        let err = invoke(Arc::new(MockTransport::new(403, "API key not valid")))
            .await
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Transport);
        assert!(err.to_string().contains("403"));
        assert!(err.to_string().contains("API key not valid"));
    }

    #[tokio::test]
    async fn test_non_json_text_is_parse_error() {
        let err = invoke(Arc::new(MockTransport::ok(envelope("sorry, no"))))
            .await
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Parse);
        assert_eq!(err.raw_payload(), Some("sorry, no"));
    }
}

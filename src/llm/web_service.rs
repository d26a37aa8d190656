use std::sync::Arc;

use serde_json::{Value, json};

use super::{BackendAdapter, HttpTransport, Instructions, RawPayload};
use crate::error::GenerationError;
use crate::settings::GenerationSettings;

/// A trusted in-house service that takes the raw request and answers with
/// an already-shaped result. No auth header is sent.
pub struct WebServiceAdapter {
    transport: Arc<dyn HttpTransport>,
}

impl WebServiceAdapter {
    pub fn new(transport: Arc<dyn HttpTransport>) -> Self {
        Self { transport }
    }
}

fn has_string_field(value: &Value, field: &str) -> bool {
    value.get(field).is_some_and(Value::is_string)
}

#[async_trait::async_trait]
impl BackendAdapter for WebServiceAdapter {
    async fn invoke(
        &self,
        prompt: &str,
        settings: &GenerationSettings,
        _instructions: &Instructions,
    ) -> Result<RawPayload, GenerationError> {
        let url = settings.base_url().ok_or_else(|| {
            GenerationError::Configuration(
                "Base URL is required for the web-service provider".to_string(),
            )
        })?;

        let body = json!({
            "prompt": prompt,
            "settings": {
                "temperature": settings.temperature,
                "language": settings.language.as_str(),
                "includeComments": settings.include_comments,
                "basePackage": settings.namespace(),
                "modelName": settings.model_name,
            },
        });

        let response = self.transport.post_json(url, &[], &body).await?;
        let response_body = response.into_success_body()?;

        if response_body.trim().is_empty() {
            return Err(GenerationError::EmptyResponse(self.name().to_string()));
        }

        let value: Value =
            serde_json::from_str(&response_body).map_err(|e| GenerationError::Parse {
                reason: e.to_string(),
                raw: response_body.clone(),
            })?;

        // This backend is not chat-wrapped, so a missing pair means the
        // service speaks a different contract.
        if !has_string_field(&value, "clxCode") || !has_string_field(&value, "jsCode") {
            return Err(GenerationError::Validation(
                "web service response must contain clxCode and jsCode strings".to_string(),
            ));
        }

        Ok(RawPayload::Structured(value))
    }

    fn name(&self) -> &str {
        "web-service"
    }
}

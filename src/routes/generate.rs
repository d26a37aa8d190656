use axum::{Json, extract::State};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use uuid::Uuid;

use crate::AppState;
use crate::error::{AppError, AppResult};
use crate::result::GenerationResult;
use crate::settings::GenerationSettings;

#[derive(Debug, Deserialize)]
pub struct GenerateBody {
    pub prompt: String,
    /// Partial settings; fields left out fall back to the configured defaults.
    pub settings: Option<Value>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct GenerateResponse {
    pub id: Uuid,
    pub generated_at: DateTime<Utc>,
    pub result: GenerationResult,
}

pub async fn generate(
    State(state): State<AppState>,
    Json(body): Json<GenerateBody>,
) -> AppResult<Json<GenerateResponse>> {
    if body.prompt.trim().is_empty() {
        return Err(AppError::Validation("prompt must not be empty".into()));
    }

    let settings = match body.settings {
        Some(overrides) => state
            .config
            .merge_settings(overrides)
            .map_err(|e| AppError::Validation(format!("invalid settings: {e}")))?,
        None => state.config.default_settings(),
    };

    let result = state.generator.generate(&body.prompt, &settings).await?;

    Ok(Json(GenerateResponse {
        id: Uuid::new_v4(),
        generated_at: Utc::now(),
        result,
    }))
}

pub async fn default_settings(State(state): State<AppState>) -> Json<GenerationSettings> {
    Json(state.config.default_settings())
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use axum::http::StatusCode;
    use axum::response::IntoResponse;

    use super::*;
    use crate::config::Config;
    use crate::llm::testing::MockTransport;
    use crate::pipeline::CodeGenerator;

    fn state(transport: Arc<MockTransport>) -> AppState {
        let config = Config::from_lookup(|_| None).unwrap();
        let generator = CodeGenerator::new(transport, &config.credentials());
        AppState {
            config,
            generator: Arc::new(generator),
        }
    }

    #[test]
    fn test_generate_body_deserialize() {
        let body: GenerateBody = serde_json::from_str(
            r#"{"prompt": "a login button", "settings": {"provider": "web-service", "baseUrl": "http://x/gen"}}"#,
        )
        .unwrap();
        assert_eq!(body.prompt, "a login button");
        assert_eq!(body.settings.unwrap()["provider"], "web-service");

        let body: GenerateBody = serde_json::from_str(r#"{"prompt": "a grid"}"#).unwrap();
        assert!(body.settings.is_none());
    }

    #[tokio::test]
    async fn test_blank_prompt_is_bad_request() {
        let transport = Arc::new(MockTransport::ok("{}"));
        let err = generate(
            State(state(transport.clone())),
            Json(GenerateBody {
                prompt: "  ".to_string(),
                settings: None,
            }),
        )
        .await
        .unwrap_err();

        assert_eq!(err.into_response().status(), StatusCode::BAD_REQUEST);
        assert_eq!(transport.call_count(), 0);
    }

    #[tokio::test]
    async fn test_generate_with_web_service() {
        let transport = Arc::new(MockTransport::ok(
            r#"{"clxCode":"<b/>","jsCode":"f(){}","explanation":"ok"}"#,
        ));
        let settings = serde_json::json!({"provider": "web-service", "baseUrl": "http://x/gen"});

        let Json(response) = generate(
            State(state(transport)),
            Json(GenerateBody {
                prompt: "a login button".to_string(),
                settings: Some(settings),
            }),
        )
        .await
        .unwrap();

        assert_eq!(response.result.clx_code, "<b/>");
        let value = serde_json::to_value(&response).unwrap();
        assert_eq!(value["result"]["jsCode"], "f(){}");
        assert!(value.get("generatedAt").is_some());
    }

    #[tokio::test]
    async fn test_partial_settings_use_configured_defaults() {
        let transport = Arc::new(MockTransport::ok(r#"{"clxCode":"<b/>","jsCode":""}"#));
        let config = Config::from_lookup(|key| match key {
            "DEFAULT_LANGUAGE" => Some("en".to_string()),
            "DEFAULT_BASE_PACKAGE" => Some("kr.co.acme".to_string()),
            _ => None,
        })
        .unwrap();
        let state = AppState {
            generator: Arc::new(CodeGenerator::new(transport.clone(), &config.credentials())),
            config,
        };

        tokio_test::assert_ok!(
            generate(
                State(state),
                Json(GenerateBody {
                    prompt: "a login button".to_string(),
                    settings: Some(
                        serde_json::json!({"provider": "web-service", "baseUrl": "http://x/gen"})
                    ),
                }),
            )
            .await
        );

        let call = transport.last_call();
        assert_eq!(call.body["settings"]["language"], "en");
        assert_eq!(call.body["settings"]["basePackage"], "kr.co.acme");
    }

    #[tokio::test]
    async fn test_malformed_settings_are_bad_request() {
        let transport = Arc::new(MockTransport::ok("{}"));
        let err = generate(
            State(state(transport.clone())),
            Json(GenerateBody {
                prompt: "a login button".to_string(),
                settings: Some(serde_json::json!({"temperature": "hot"})),
            }),
        )
        .await
        .unwrap_err();

        assert_eq!(err.into_response().status(), StatusCode::BAD_REQUEST);
        assert_eq!(transport.call_count(), 0);
    }

    #[tokio::test]
    async fn test_provider_failure_is_bad_gateway() {
        let transport = Arc::new(MockTransport::new(500, "server exploded"));
        let err = generate(
            State(state(transport)),
            Json(GenerateBody {
                prompt: "a login button".to_string(),
                settings: None,
            }),
        )
        .await
        .unwrap_err();

        assert_eq!(err.to_string(), "Provider error (500): server exploded");
        assert_eq!(err.into_response().status(), StatusCode::BAD_GATEWAY);
    }
}

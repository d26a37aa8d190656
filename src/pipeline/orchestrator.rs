use std::sync::Arc;
use std::time::Instant;

use opentelemetry::KeyValue;
use tracing::Instrument;
use tracing_opentelemetry::OpenTelemetrySpanExt;
use uuid::Uuid;

use super::{normalize, prompt};
use crate::error::GenerationError;
use crate::llm::{
    BackendAdapter, Credentials, GeminiAdapter, HttpTransport, OpenAiCompatibleAdapter,
    WebServiceAdapter,
};
use crate::result::GenerationResult;
use crate::settings::{Backend, GenerationSettings};
use crate::telemetry::metrics::{
    CODEGEN_ARTIFACT_FILES, CODEGEN_REQUESTS, GEN_AI_ERROR_COUNT, GEN_AI_OPERATION_DURATION,
};

/// Entry point of the generation layer. Holds no per-call state, so one
/// instance can serve concurrent callers.
pub struct CodeGenerator {
    gemini: GeminiAdapter,
    openai: OpenAiCompatibleAdapter,
    web_service: WebServiceAdapter,
}

impl CodeGenerator {
    pub fn new(transport: Arc<dyn HttpTransport>, credentials: &Credentials) -> Self {
        Self {
            gemini: GeminiAdapter::with_base_url(
                transport.clone(),
                &credentials.gemini_api_key,
                &credentials.gemini_base_url,
            ),
            openai: OpenAiCompatibleAdapter::new(transport.clone(), &credentials.openai_api_key),
            web_service: WebServiceAdapter::new(transport),
        }
    }

    fn adapter(&self, backend: Backend) -> &dyn BackendAdapter {
        match backend {
            Backend::PrimaryProvider => &self.gemini,
            Backend::OpenAiCompatible => &self.openai,
            Backend::CustomWebService => &self.web_service,
        }
    }

    pub async fn generate(
        &self,
        prompt_text: &str,
        settings: &GenerationSettings,
    ) -> Result<GenerationResult, GenerationError> {
        let adapter = self.adapter(settings.provider);
        let generation_id = Uuid::new_v4();

        let span = tracing::info_span!(
            "gen_ai.generate",
            otel.name = %format!("gen_ai.generate {}", settings.model()),
            generation.id = %generation_id,
            gen_ai.provider.name = %adapter.name(),
            gen_ai.request.model = %settings.model(),
            gen_ai.request.temperature = settings.temperature,
            codegen.language = settings.language.as_str(),
            codegen.include_comments = settings.include_comments,
            codegen.java_files = tracing::field::Empty,
            codegen.logs = tracing::field::Empty,
            otel.status_code = tracing::field::Empty,
            error.type = tracing::field::Empty,
        );

        let start = Instant::now();
        let result = self
            .run(adapter, prompt_text, settings)
            .instrument(span.clone())
            .await;
        let duration = start.elapsed().as_secs_f64();

        let provider_kv = KeyValue::new("gen_ai.provider.name", adapter.name().to_string());
        let model_kv = KeyValue::new("gen_ai.request.model", settings.model().to_string());

        CODEGEN_REQUESTS.add(1, &[provider_kv.clone()]);
        GEN_AI_OPERATION_DURATION.record(duration, &[provider_kv.clone(), model_kv.clone()]);

        match &result {
            Ok(generated) => {
                span.record("codegen.java_files", generated.java_files.len() as i64);
                span.record("codegen.logs", generated.logs.len() as i64);
                CODEGEN_ARTIFACT_FILES.record(generated.java_files.len() as f64, &[provider_kv]);

                tracing::info!(
                    parent: &span,
                    java_files = generated.java_files.len(),
                    duration_s = duration,
                    "Component generated"
                );
            }
            Err(err) => {
                span.record("otel.status_code", "ERROR");
                span.record("error.type", err.kind().as_str());
                GEN_AI_ERROR_COUNT.add(
                    1,
                    &[
                        provider_kv,
                        model_kv,
                        KeyValue::new("error.type", err.kind().as_str()),
                    ],
                );

                if let Some(raw) = err.raw_payload() {
                    tracing::warn!(
                        parent: &span,
                        error = %err,
                        raw = %truncate(raw, 2000),
                        "Model output could not be parsed"
                    );
                } else {
                    tracing::warn!(parent: &span, error = %err, "Generation failed");
                }
            }
        }

        result
    }

    async fn run(
        &self,
        adapter: &dyn BackendAdapter,
        prompt_text: &str,
        settings: &GenerationSettings,
    ) -> Result<GenerationResult, GenerationError> {
        if prompt_text.trim().is_empty() {
            return Err(GenerationError::Configuration(
                "request text must not be empty".to_string(),
            ));
        }
        settings.validate()?;

        let instructions = prompt::build(prompt_text, settings);

        let span = tracing::Span::current();
        span.add_event(
            "gen_ai.user.message",
            vec![
                KeyValue::new("gen_ai.prompt", truncate(&instructions.user, 1000)),
                KeyValue::new(
                    "gen_ai.system_instructions",
                    truncate(&instructions.system, 500),
                ),
            ],
        );

        let payload = adapter.invoke(prompt_text, settings, &instructions).await?;
        normalize::normalize(payload)
    }
}

fn truncate(s: &str, max: usize) -> String {
    if s.len() <= max {
        s.to_string()
    } else {
        s.char_indices()
            .take_while(|&(i, c)| i + c.len_utf8() <= max)
            .map(|(_, c)| c)
            .collect()
    }
}

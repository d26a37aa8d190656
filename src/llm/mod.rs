pub mod gemini;
pub mod openai;
pub mod transport;
pub mod web_service;

use serde_json::Value;

use crate::error::GenerationError;
use crate::settings::GenerationSettings;

pub use gemini::GeminiAdapter;
pub use openai::OpenAiCompatibleAdapter;
pub use transport::{HttpResponse, HttpTransport, ReqwestTransport};
pub use web_service::WebServiceAdapter;

/// System and user instructions for one call, plus the response schema
/// for backends that take one natively.
#[derive(Debug, Clone)]
pub struct Instructions {
    pub system: String,
    pub user: String,
    pub response_schema: Option<Value>,
}

/// Secrets and endpoints sourced once at startup and injected into the
/// adapters, so nothing reads the environment per call.
#[derive(Debug, Clone)]
pub struct Credentials {
    pub gemini_api_key: String,
    pub gemini_base_url: String,
    pub openai_api_key: String,
}

/// What an adapter hands to the normalizer.
#[derive(Debug, Clone, PartialEq)]
pub enum RawPayload {
    /// Free-form model text that should contain a JSON object.
    Text(String),
    /// Already-decoded JSON; no text extraction needed.
    Structured(Value),
}

/// One backend family. Chat-style backends send only the built
/// `instructions`; the web-service adapter alone forwards the raw `prompt`.
#[async_trait::async_trait]
pub trait BackendAdapter: Send + Sync {
    async fn invoke(
        &self,
        prompt: &str,
        settings: &GenerationSettings,
        instructions: &Instructions,
    ) -> Result<RawPayload, GenerationError>;

    fn name(&self) -> &str;
}

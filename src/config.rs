use std::env;
use std::str::FromStr;
use std::time::Duration;

use anyhow::Context;
use serde_json::Value;

use crate::llm::Credentials;
use crate::llm::gemini::DEFAULT_GEMINI_BASE_URL;
use crate::settings::{Backend, DEFAULT_BASE_PACKAGE, GenerationSettings, Language};

#[derive(Debug, Clone)]
pub struct Config {
    pub port: u16,
    pub environment: String,
    pub gemini_api_key: Option<String>,
    pub gemini_base_url: String,
    pub openai_api_key: String,
    pub http_timeout: Duration,
    pub default_provider: String,
    pub default_model: String,
    pub default_temperature: f64,
    pub default_language: String,
    pub default_base_package: String,
    pub otel_service_name: String,
    pub otel_exporter_endpoint: String,
}

fn parse_var<T>(lookup: &impl Fn(&str) -> Option<String>, key: &str, default: &str) -> anyhow::Result<T>
where
    T: FromStr,
    T::Err: std::error::Error + Send + Sync + 'static,
{
    let raw = lookup(key).unwrap_or_else(|| default.to_string());
    raw.trim()
        .parse()
        .with_context(|| format!("{key} must be a number, got {raw:?}"))
}

impl Config {
    pub fn from_env() -> anyhow::Result<Self> {
        dotenvy::dotenv().ok();
        Self::from_lookup(|key| env::var(key).ok())
    }

    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> anyhow::Result<Self> {
        let var = |key: &str, default: &str| lookup(key).unwrap_or_else(|| default.to_string());

        Ok(Self {
            port: parse_var(&lookup, "APP_PORT", "8080")?,
            environment: var("APP_ENVIRONMENT", "development"),
            gemini_api_key: lookup("GEMINI_API_KEY")
                .or_else(|| lookup("API_KEY"))
                .filter(|key| !key.trim().is_empty()),
            gemini_base_url: var("GEMINI_BASE_URL", DEFAULT_GEMINI_BASE_URL),
            openai_api_key: var("OPENAI_API_KEY", "sk-dummy"),
            http_timeout: Duration::from_secs(parse_var(&lookup, "HTTP_TIMEOUT_SECS", "300")?),
            default_provider: var("DEFAULT_PROVIDER", "gemini"),
            default_model: var("DEFAULT_MODEL", ""),
            default_temperature: parse_var(&lookup, "DEFAULT_TEMPERATURE", "0.2")?,
            default_language: var("DEFAULT_LANGUAGE", "ko"),
            default_base_package: var("DEFAULT_BASE_PACKAGE", DEFAULT_BASE_PACKAGE),
            otel_service_name: var("OTEL_SERVICE_NAME", "clx-codegen"),
            otel_exporter_endpoint: var("OTEL_EXPORTER_OTLP_ENDPOINT", "http://localhost:4317"),
        })
    }

    pub fn is_production(&self) -> bool {
        self.environment == "production"
    }

    pub fn credentials(&self) -> Credentials {
        Credentials {
            gemini_api_key: self.gemini_api_key.clone().unwrap_or_default(),
            gemini_base_url: self.gemini_base_url.clone(),
            openai_api_key: self.openai_api_key.clone(),
        }
    }

    /// Settings applied when a request does not carry its own.
    pub fn default_settings(&self) -> GenerationSettings {
        let provider = Backend::from_tag(&self.default_provider);
        let model_name = if self.default_model.trim().is_empty() {
            provider.default_model().to_string()
        } else {
            self.default_model.clone()
        };

        GenerationSettings {
            provider,
            base_url: None,
            model_name,
            temperature: self.default_temperature,
            language: Language::from_tag(&self.default_language),
            include_comments: true,
            base_package: self.default_base_package.clone(),
        }
    }

    /// Layers the fields a request sent over the configured defaults. A
    /// request that switches provider without naming a model gets that
    /// provider's default model unless `DEFAULT_MODEL` is set.
    pub fn merge_settings(&self, overrides: Value) -> Result<GenerationSettings, serde_json::Error> {
        let Value::Object(overrides) = overrides else {
            return serde_json::from_value(overrides);
        };

        let mut base = self.default_settings();
        if self.default_model.trim().is_empty() {
            base.model_name.clear();
        }

        let mut merged = serde_json::to_value(&base)?;
        if let Value::Object(fields) = &mut merged {
            fields.extend(overrides);
        }
        serde_json::from_value(merged)
    }
}

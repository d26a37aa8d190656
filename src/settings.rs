use serde::{Deserialize, Serialize};

use crate::error::GenerationError;

pub const DEFAULT_BASE_PACKAGE: &str = "com.example";

/// Backend family a request is routed to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "String", into = "&'static str")]
pub enum Backend {
    PrimaryProvider,
    OpenAiCompatible,
    CustomWebService,
}

impl Backend {
    pub fn from_tag(tag: &str) -> Self {
        match tag.trim().to_ascii_lowercase().as_str() {
            "gemini" => Backend::PrimaryProvider,
            "openai" | "ollama" => Backend::OpenAiCompatible,
            "web-service" => Backend::CustomWebService,
            other => {
                tracing::warn!(
                    provider = other,
                    "Unrecognized provider tag, falling back to gemini"
                );
                Backend::PrimaryProvider
            }
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Backend::PrimaryProvider => "gemini",
            Backend::OpenAiCompatible => "openai",
            Backend::CustomWebService => "web-service",
        }
    }

    pub fn requires_base_url(&self) -> bool {
        !matches!(self, Backend::PrimaryProvider)
    }

    /// Whether the backend accepts a response schema natively instead of a
    /// JSON contract written into the system instruction.
    pub fn supports_native_schema(&self) -> bool {
        matches!(self, Backend::PrimaryProvider)
    }

    pub fn default_model(&self) -> &'static str {
        match self {
            Backend::PrimaryProvider => "gemini-3-pro-preview",
            Backend::OpenAiCompatible => "gpt-4o",
            Backend::CustomWebService => "",
        }
    }
}

impl From<String> for Backend {
    fn from(tag: String) -> Self {
        Backend::from_tag(&tag)
    }
}

impl From<Backend> for &'static str {
    fn from(backend: Backend) -> Self {
        backend.as_str()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Language {
    #[serde(rename = "ko")]
    Korean,
    #[serde(rename = "en")]
    English,
}

impl Language {
    pub fn from_tag(tag: &str) -> Self {
        if tag.trim().eq_ignore_ascii_case("en") {
            Language::English
        } else {
            Language::Korean
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Language::Korean => "ko",
            Language::English => "en",
        }
    }
}

/// Per-request generation settings, passed by value into every call.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct GenerationSettings {
    pub provider: Backend,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub base_url: Option<String>,
    pub model_name: String,
    pub temperature: f64,
    pub language: Language,
    pub include_comments: bool,
    pub base_package: String,
}

impl Default for GenerationSettings {
    fn default() -> Self {
        Self {
            provider: Backend::PrimaryProvider,
            base_url: None,
            model_name: Backend::PrimaryProvider.default_model().to_string(),
            temperature: 0.2,
            language: Language::Korean,
            include_comments: true,
            base_package: DEFAULT_BASE_PACKAGE.to_string(),
        }
    }
}

impl GenerationSettings {
    /// Rejects settings that can never produce a request: a missing base
    /// URL for backends that need one, or an out-of-range temperature.
    pub fn validate(&self) -> Result<(), GenerationError> {
        if self.provider.requires_base_url() && self.base_url().is_none() {
            return Err(GenerationError::Configuration(format!(
                "Base URL is required for the {} provider",
                self.provider.as_str()
            )));
        }

        if !self.temperature.is_finite() || !(0.0..=1.0).contains(&self.temperature) {
            return Err(GenerationError::Configuration(format!(
                "temperature must be between 0.0 and 1.0, got {}",
                self.temperature
            )));
        }

        Ok(())
    }

    pub fn base_url(&self) -> Option<&str> {
        self.base_url
            .as_deref()
            .map(str::trim)
            .filter(|url| !url.is_empty())
    }

    pub fn model(&self) -> &str {
        let model = self.model_name.trim();
        if model.is_empty() {
            self.provider.default_model()
        } else {
            model
        }
    }

    pub fn namespace(&self) -> &str {
        let namespace = self.base_package.trim();
        if namespace.is_empty() {
            DEFAULT_BASE_PACKAGE
        } else {
            namespace
        }
    }
}

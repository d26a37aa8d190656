use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ArtifactRole {
    Controller,
    Service,
    Model,
}

impl ArtifactRole {
    /// Guesses the role of a server file from its package path first
    /// (`...controller`, `...service`, `...model`), then its file name.
    pub fn infer(file_name: &str, package_path: &str) -> Option<Self> {
        let by_package = match package_path.rsplit('.').next() {
            Some("controller") => Some(ArtifactRole::Controller),
            Some("service") => Some(ArtifactRole::Service),
            Some("model") => Some(ArtifactRole::Model),
            _ => None,
        };
        if by_package.is_some() {
            return by_package;
        }

        let stem = file_name.strip_suffix(".java").unwrap_or(file_name);
        if stem.ends_with("Controller") {
            Some(ArtifactRole::Controller)
        } else if stem.ends_with("Service") || stem.ends_with("ServiceImpl") {
            Some(ArtifactRole::Service)
        } else {
            None
        }
    }
}

/// One generated server-side source file.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GeneratedArtifactFile {
    pub file_name: String,
    pub package_path: String,
    pub content: String,
    #[serde(rename = "type")]
    pub role: ArtifactRole,
}

/// The validated bundle handed back to callers. Built once per successful
/// call and never mutated afterwards.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GenerationResult {
    pub clx_code: String,
    pub js_code: String,
    pub java_files: Vec<GeneratedArtifactFile>,
    pub logs: Vec<String>,
    pub explanation: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub preview_mock: Option<String>,
}

/// `true` for a non-empty sequence of Java identifiers joined by dots.
pub fn is_dotted_identifier(path: &str) -> bool {
    !path.is_empty()
        && path.split('.').all(|segment| {
            let mut chars = segment.chars();
            match chars.next() {
                Some(first) if first.is_alphabetic() || first == '_' || first == '$' => chars
                    .all(|c| c.is_alphanumeric() || c == '_' || c == '$'),
                _ => false,
            }
        })
}

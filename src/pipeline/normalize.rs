use serde::Deserialize;
use serde_json::Value;

use crate::error::GenerationError;
use crate::llm::RawPayload;
use crate::result::{ArtifactRole, GeneratedArtifactFile, GenerationResult, is_dotted_identifier};

/// Removes markdown code fences a model may wrap its JSON in despite being
/// told not to. Unfenced input is returned trimmed and otherwise untouched;
/// a bare object is never searched for fences inside its string values.
pub fn strip_code_fences(content: &str) -> &str {
    let trimmed = content.trim();

    if let Some(rest) = trimmed.strip_prefix("```") {
        // Drop the info string (`json`, `JSON`, ...) on the opening line.
        let body = match rest.find('\n') {
            Some(newline) => &rest[newline + 1..],
            None => rest.trim_start_matches(|c: char| c.is_ascii_alphabetic()),
        };
        let body = body.trim_end();
        let body = body.strip_suffix("```").unwrap_or(body);
        return body.trim();
    }

    if !trimmed.starts_with('{')
        && let Some(start) = trimmed.find("```json")
        && let Some(end) = trimmed[start + 7..].find("```")
    {
        return trimmed[start + 7..start + 7 + end].trim();
    }

    trimmed
}

/// Finds the JSON object inside model text: fence-stripped, then narrowed
/// to the outermost braces if prose surrounds it.
pub(crate) fn extract_json(content: &str) -> &str {
    let body = strip_code_fences(content);
    if let Some(start) = body.find('{')
        && let Some(end) = body.rfind('}')
        && start < end
    {
        return &body[start..=end];
    }
    body
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct WireResult {
    clx_code: Option<String>,
    js_code: Option<String>,
    java_files: Option<Vec<WireArtifact>>,
    logs: Option<Vec<String>>,
    explanation: Option<String>,
    preview_mock: Option<String>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct WireArtifact {
    file_name: Option<String>,
    package_path: Option<String>,
    content: Option<String>,
    #[serde(rename = "type")]
    role: Option<ArtifactRole>,
}

impl WireArtifact {
    fn validate(self, index: usize) -> Result<GeneratedArtifactFile, GenerationError> {
        let file_name = self
            .file_name
            .map(|name| name.trim().to_string())
            .filter(|name| !name.is_empty())
            .ok_or_else(|| {
                GenerationError::Validation(format!("javaFiles[{index}] is missing fileName"))
            })?;

        let package_path = self.package_path.unwrap_or_default().trim().to_string();
        if !is_dotted_identifier(&package_path) {
            return Err(GenerationError::Validation(format!(
                "javaFiles[{index}] ({file_name}) has invalid packagePath {package_path:?}"
            )));
        }

        let role = match self.role {
            Some(role) => role,
            None => ArtifactRole::infer(&file_name, &package_path).ok_or_else(|| {
                GenerationError::Validation(format!(
                    "javaFiles[{index}] ({file_name}) has no type and none can be inferred"
                ))
            })?,
        };

        Ok(GeneratedArtifactFile {
            file_name,
            package_path,
            content: self.content.unwrap_or_default(),
            role,
        })
    }
}

/// Checks a decoded payload against the result contract. Only `clxCode`
/// and `jsCode` are mandatory; everything else defaults when absent.
pub fn validate(value: Value) -> Result<GenerationResult, GenerationError> {
    if !value.is_object() {
        return Err(GenerationError::Validation(
            "expected a JSON object at the top level".to_string(),
        ));
    }

    let wire: WireResult =
        serde_json::from_value(value).map_err(|e| GenerationError::Validation(e.to_string()))?;

    let clx_code = wire
        .clx_code
        .ok_or_else(|| GenerationError::Validation("missing required field clxCode".to_string()))?;
    let js_code = wire
        .js_code
        .ok_or_else(|| GenerationError::Validation("missing required field jsCode".to_string()))?;

    let java_files = wire
        .java_files
        .unwrap_or_default()
        .into_iter()
        .enumerate()
        .map(|(index, file)| file.validate(index))
        .collect::<Result<Vec<_>, _>>()?;

    Ok(GenerationResult {
        clx_code,
        js_code,
        java_files,
        logs: wire.logs.unwrap_or_default(),
        explanation: wire.explanation.unwrap_or_default(),
        preview_mock: wire.preview_mock.filter(|html| !html.trim().is_empty()),
    })
}

pub fn normalize(payload: RawPayload) -> Result<GenerationResult, GenerationError> {
    let value = match payload {
        RawPayload::Structured(value) => value,
        RawPayload::Text(text) => match serde_json::from_str::<Value>(text.trim()) {
            Ok(value) => value,
            Err(_) => serde_json::from_str::<Value>(extract_json(&text)).map_err(|e| {
                GenerationError::Parse {
                    reason: e.to_string(),
                    raw: text.clone(),
                }
            })?,
        },
    };

    validate(value)
}

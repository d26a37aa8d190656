use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use opentelemetry::trace::TraceContextExt;
use serde_json::json;
use thiserror::Error;
use tracing::Span;
use tracing_opentelemetry::OpenTelemetrySpanExt;

/// Failure of a single generation call. Nothing below the orchestrator
/// recovers from these; they reach the caller unchanged.
#[derive(Error, Debug)]
pub enum GenerationError {
    #[error("Configuration error: {0}")]
    Configuration(String),

    #[error("Provider error ({status}): {body}")]
    Provider { status: u16, body: String },

    #[error("Network error: {0}")]
    Network(String),

    #[error("Empty response from {0}")]
    EmptyResponse(String),

    #[error("Failed to parse JSON response from AI: {reason}")]
    Parse { reason: String, raw: String },

    #[error("Invalid response structure: {0}")]
    Validation(String),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    Configuration,
    Transport,
    EmptyResponse,
    Parse,
    Validation,
}

impl ErrorKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ErrorKind::Configuration => "configuration",
            ErrorKind::Transport => "transport",
            ErrorKind::EmptyResponse => "empty_response",
            ErrorKind::Parse => "parse",
            ErrorKind::Validation => "validation",
        }
    }
}

impl GenerationError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            GenerationError::Configuration(_) => ErrorKind::Configuration,
            GenerationError::Provider { .. } | GenerationError::Network(_) => ErrorKind::Transport,
            GenerationError::EmptyResponse(_) => ErrorKind::EmptyResponse,
            GenerationError::Parse { .. } => ErrorKind::Parse,
            GenerationError::Validation(_) => ErrorKind::Validation,
        }
    }

    /// Raw model output kept for diagnostics, if this is a parse failure.
    pub fn raw_payload(&self) -> Option<&str> {
        match self {
            GenerationError::Parse { raw, .. } => Some(raw),
            _ => None,
        }
    }
}

#[derive(Error, Debug)]
pub enum AppError {
    #[error("Validation error: {0}")]
    Validation(String),

    #[error(transparent)]
    Generation(#[from] GenerationError),
}

fn get_trace_id() -> Option<String> {
    let span = Span::current();
    let context = span.context();
    let span_ref = context.span();
    let span_context = span_ref.span_context();

    if span_context.is_valid() {
        Some(span_context.trace_id().to_string())
    } else {
        None
    }
}

impl AppError {
    fn status_and_kind(&self) -> (StatusCode, &'static str) {
        match self {
            AppError::Validation(_) => (StatusCode::BAD_REQUEST, "invalid_request"),
            AppError::Generation(err) => {
                let status = match err.kind() {
                    ErrorKind::Configuration => StatusCode::BAD_REQUEST,
                    ErrorKind::Transport
                    | ErrorKind::EmptyResponse
                    | ErrorKind::Parse
                    | ErrorKind::Validation => StatusCode::BAD_GATEWAY,
                };
                (status, err.kind().as_str())
            }
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, kind) = self.status_and_kind();

        if status.is_server_error() {
            tracing::error!(error = %self, error.type = kind, "Generation failed");
        }

        // The UI shows this message as-is.
        let error_message = self.to_string();

        let body = if let Some(trace_id) = get_trace_id() {
            json!({
                "error": error_message,
                "kind": kind,
                "status": status.as_u16(),
                "trace_id": trace_id,
            })
        } else {
            json!({
                "error": error_message,
                "kind": kind,
                "status": status.as_u16(),
            })
        };

        (status, Json(body)).into_response()
    }
}

pub type AppResult<T> = Result<T, AppError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_provider_error_message() {
        let error = GenerationError::Provider {
            status: 500,
            body: "server exploded".to_string(),
        };
        assert_eq!(error.to_string(), "Provider error (500): server exploded");
        assert_eq!(error.kind(), ErrorKind::Transport);
    }

    #[test]
    fn test_parse_error_keeps_raw_out_of_message() {
        let error = GenerationError::Parse {
            reason: "expected value at line 1 column 1".to_string(),
            raw: "not json at all".to_string(),
        };
        assert!(!error.to_string().contains("not json at all"));
        assert_eq!(error.raw_payload(), Some("not json at all"));
        assert_eq!(error.kind(), ErrorKind::Parse);
    }

    #[test]
    fn test_error_kinds_are_distinct() {
        let cases = vec![
            (GenerationError::Configuration("x".into()), "configuration"),
            (GenerationError::Network("x".into()), "transport"),
            (GenerationError::EmptyResponse("x".into()), "empty_response"),
            (
                GenerationError::Parse {
                    reason: "x".into(),
                    raw: String::new(),
                },
                "parse",
            ),
            (GenerationError::Validation("x".into()), "validation"),
        ];

        for (error, expected) in cases {
            assert_eq!(error.kind().as_str(), expected);
            assert_eq!(error.raw_payload().is_some(), expected == "parse");
        }
    }

    #[test]
    fn test_app_error_status_codes() {
        let test_cases = vec![
            (
                AppError::Validation("prompt must not be empty".into()),
                StatusCode::BAD_REQUEST,
            ),
            (
                AppError::from(GenerationError::Configuration("no base url".into())),
                StatusCode::BAD_REQUEST,
            ),
            (
                AppError::from(GenerationError::Provider {
                    status: 503,
                    body: "down".into(),
                }),
                StatusCode::BAD_GATEWAY,
            ),
            (
                AppError::from(GenerationError::Validation("jsCode missing".into())),
                StatusCode::BAD_GATEWAY,
            ),
        ];

        for (error, expected_status) in test_cases {
            assert_eq!(error.status_and_kind().0, expected_status);
            assert_eq!(error.into_response().status(), expected_status);
        }
    }

    #[test]
    fn test_app_error_message_is_verbatim() {
        let error = AppError::from(GenerationError::EmptyResponse("gemini".into()));
        assert_eq!(error.to_string(), "Empty response from gemini");
    }
}

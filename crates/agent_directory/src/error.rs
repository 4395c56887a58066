use reqwest::StatusCode;
use serde::Deserialize;
use serde_json::Value;
use thiserror::Error;

use chat_types::AgentId;

/// Failure of a directory operation. The local agent list is never modified
/// when one of these is returned.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DirectoryError {
    /// Rejected draft: blank name client-side, or a 4xx from the server on create.
    #[error("{detail}")]
    Validation { detail: String },

    #[error("agent {id} not found")]
    NotFound { id: AgentId },

    /// Network failure, server error, or an undecodable response.
    #[error("request failed: {message}")]
    Request { message: String },

    #[error("invalid base URL: {0}")]
    InvalidBaseUrl(String),
}

impl DirectoryError {
    pub fn validation(detail: impl Into<String>) -> Self {
        Self::Validation {
            detail: detail.into(),
        }
    }

    pub fn request(message: impl Into<String>) -> Self {
        Self::Request {
            message: message.into(),
        }
    }

    /// Human-readable text for inline display.
    pub fn user_message(&self) -> String {
        match self {
            Self::Validation { detail } => detail.clone(),
            other => other.to_string(),
        }
    }
}

impl From<reqwest::Error> for DirectoryError {
    fn from(error: reqwest::Error) -> Self {
        Self::request(error.to_string())
    }
}

#[derive(Debug, Deserialize)]
struct ErrorBody {
    #[serde(default)]
    detail: Option<Value>,
    #[serde(default)]
    message: Option<String>,
    #[serde(default)]
    error: Option<Value>,
}

/// Extracts the human-readable message from an error response body.
///
/// Looks at `detail` (a string, or a list of `{msg}` entries), then `message`,
/// then `error`; otherwise falls back to the raw body or the status reason.
pub fn parse_error_message(status: StatusCode, body: &str) -> String {
    let fallback = || {
        let trimmed = body.trim();
        if trimmed.is_empty() {
            status
                .canonical_reason()
                .unwrap_or("request failed")
                .to_string()
        } else {
            trimmed.to_string()
        }
    };

    let Ok(parsed) = serde_json::from_str::<ErrorBody>(body) else {
        return fallback();
    };

    parsed
        .detail
        .as_ref()
        .and_then(detail_text)
        .or_else(|| parsed.message.as_deref().and_then(non_empty).map(str::to_owned))
        .or_else(|| parsed.error.as_ref().and_then(detail_text))
        .unwrap_or_else(fallback)
}

fn detail_text(value: &Value) -> Option<String> {
    match value {
        Value::String(text) => non_empty(text).map(str::to_owned),
        Value::Array(entries) => {
            let messages: Vec<&str> = entries
                .iter()
                .filter_map(|entry| match entry {
                    Value::String(text) => non_empty(text),
                    other => other.get("msg").and_then(Value::as_str).and_then(non_empty),
                })
                .collect();
            (!messages.is_empty()).then(|| messages.join("; "))
        }
        Value::Object(fields) => fields
            .get("message")
            .or_else(|| fields.get("msg"))
            .and_then(Value::as_str)
            .and_then(non_empty)
            .map(str::to_owned),
        _ => None,
    }
}

fn non_empty(value: &str) -> Option<&str> {
    let value = value.trim();
    if value.is_empty() {
        None
    } else {
        Some(value)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn detail_string_wins() {
        assert_eq!(
            parse_error_message(
                StatusCode::UNPROCESSABLE_ENTITY,
                r#"{"detail":"name already taken","message":"ignored"}"#
            ),
            "name already taken"
        );
    }

    #[test]
    fn detail_list_joins_msgs() {
        let body = r#"{"detail":[{"loc":["body","name"],"msg":"field required"},{"msg":"model invalid"}]}"#;
        assert_eq!(
            parse_error_message(StatusCode::UNPROCESSABLE_ENTITY, body),
            "field required; model invalid"
        );
    }

    #[test]
    fn falls_back_to_message_then_error() {
        assert_eq!(
            parse_error_message(StatusCode::BAD_REQUEST, r#"{"message":"bad model"}"#),
            "bad model"
        );
        assert_eq!(
            parse_error_message(StatusCode::BAD_REQUEST, r#"{"error":{"message":"quota"}}"#),
            "quota"
        );
    }

    #[test]
    fn falls_back_to_body_or_reason() {
        assert_eq!(
            parse_error_message(StatusCode::BAD_GATEWAY, "upstream down"),
            "upstream down"
        );
        assert_eq!(
            parse_error_message(StatusCode::SERVICE_UNAVAILABLE, ""),
            "Service Unavailable"
        );
        assert_eq!(
            parse_error_message(StatusCode::BAD_REQUEST, r#"{"detail":""}"#),
            r#"{"detail":""}"#
        );
    }
}

use axum::{
    http::{ header, StatusCode },
    response::{ IntoResponse, Response },
    Json,
};
use lazy_static::lazy_static;
use regex::Regex;
use thiserror::Error;

use crate::llm::LlmError;
use crate::models::api::{ ErrorBody, RateLimitBody };

pub const DEFAULT_RETRY_AFTER_SECS: u64 = 60;

lazy_static! {
    static ref RETRY_DELAY: Regex = Regex::new(r#"retryDelay"\s*:\s*"(\d+)s""#).unwrap();
}

#[derive(Debug, Error)]
pub enum ChatError {
    #[error("Invalid request body: {0}")]
    InvalidRequest(String),
    #[error("No user message found")]
    NoUserMessage,
    #[error("Rate limit exceeded, retry after {retry_after}s")]
    RateLimited { retry_after: u64 },
    #[error("{0}")]
    Upstream(String),
    #[error("Timed out waiting for the model after {0}s")]
    DeadlineExceeded(u64),
}

/// Seconds from a `retryDelay":"<N>s` hint embedded in a provider message.
pub fn parse_retry_delay(message: &str) -> Option<u64> {
    RETRY_DELAY.captures(message)
        .and_then(|caps| caps.get(1))
        .and_then(|m| m.as_str().parse().ok())
}

impl From<LlmError> for ChatError {
    fn from(err: LlmError) -> Self {
        let message = err.to_string();
        if err.status() == Some(429) || message.contains("429") {
            let retry_after = parse_retry_delay(&message).unwrap_or(DEFAULT_RETRY_AFTER_SECS);
            ChatError::RateLimited { retry_after }
        } else {
            ChatError::Upstream(message)
        }
    }
}

impl IntoResponse for ChatError {
    fn into_response(self) -> Response {
        match self {
            ChatError::RateLimited { retry_after } =>
                (
                    StatusCode::TOO_MANY_REQUESTS,
                    [(header::RETRY_AFTER, retry_after.to_string())],
                    Json(RateLimitBody::new(retry_after)),
                ).into_response(),
            other => {
                let mut error = other.to_string();
                if error.trim().is_empty() {
                    error = "An error occurred while processing your request".to_string();
                }
                (StatusCode::INTERNAL_SERVER_ERROR, Json(ErrorBody { error })).into_response()
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn retry_delay_is_read_from_compact_and_pretty_json() {
        assert_eq!(parse_retry_delay(r#"[{"retryDelay":"17s"}]"#), Some(17));
        assert_eq!(parse_retry_delay("{\n  \"retryDelay\": \"42s\"\n}"), Some(42));
        assert_eq!(parse_retry_delay(r#""retryDelay":"1.5s""#), None);
        assert_eq!(parse_retry_delay("quota exceeded"), None);
    }

    #[test]
    fn status_429_without_hint_defaults_to_sixty_seconds() {
        let err = ChatError::from(LlmError::Status {
            status: 429,
            message: "Resource has been exhausted".to_string(),
        });
        assert!(matches!(err, ChatError::RateLimited { retry_after: 60 }));
    }

    #[test]
    fn message_mentioning_429_counts_as_rate_limit() {
        let err = ChatError::from(
            LlmError::Provider(r#"got 429 Too Many Requests [{"retryDelay":"17s"}]"#.to_string())
        );
        assert!(matches!(err, ChatError::RateLimited { retry_after: 17 }));
    }

    #[test]
    fn other_failures_keep_the_raw_message() {
        let err = ChatError::from(LlmError::Status {
            status: 403,
            message: "API key not valid".to_string(),
        });
        match err {
            ChatError::Upstream(message) => assert!(message.contains("API key not valid")),
            other => panic!("unexpected {:?}", other),
        }
    }

    #[test]
    fn rate_limit_response_sets_header_and_status() {
        let resp = ChatError::RateLimited { retry_after: 17 }.into_response();
        assert_eq!(resp.status(), StatusCode::TOO_MANY_REQUESTS);
        assert_eq!(resp.headers()[header::RETRY_AFTER], "17");
    }

    #[test]
    fn deadline_is_a_500_with_message() {
        let resp = ChatError::DeadlineExceeded(30).into_response();
        assert_eq!(resp.status(), StatusCode::INTERNAL_SERVER_ERROR);
    }

    #[test]
    fn missing_user_message_is_a_500() {
        let resp = ChatError::NoUserMessage.into_response();
        assert_eq!(resp.status(), StatusCode::INTERNAL_SERVER_ERROR);
    }
}

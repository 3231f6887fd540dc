//! Error type shared by every REST call.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum ApiError {
    #[error("request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("server returned {status}: {message}")]
    Status { status: u16, message: String },

    #[error("session expired, please sign in again")]
    Unauthorized,

    #[error("{0}")]
    Validation(String),

    #[error("could not decode response: {0}")]
    Decode(#[from] serde_json::Error),

    #[error("invalid url: {0}")]
    InvalidUrl(#[from] url::ParseError),

    #[error("not signed in")]
    NotAuthenticated,

    #[error("configuration error: {0}")]
    Config(#[from] config::ConfigError),
}

impl ApiError {
    pub(crate) fn validation(message: impl Into<String>) -> Self {
        ApiError::Validation(message.into())
    }

    /// Whether the error means the stored token is no longer usable.
    pub fn is_auth_failure(&self) -> bool {
        matches!(self, ApiError::Unauthorized | ApiError::NotAuthenticated)
    }

    /// Build an error from a non-success response body.
    ///
    /// The backend reports failures as `{"message": "..."}` or
    /// `{"error": "..."}`; anything else is passed through as text.
    pub(crate) fn from_status(status: u16, body: &str) -> Self {
        if status == 401 {
            return ApiError::Unauthorized;
        }
        let message = serde_json::from_str::<serde_json::Value>(body)
            .ok()
            .and_then(|value| {
                value
                    .get("message")
                    .or_else(|| value.get("error"))
                    .and_then(|m| m.as_str())
                    .map(str::to_string)
            })
            .unwrap_or_else(|| {
                let text = body.trim();
                if text.is_empty() {
                    "no details".to_string()
                } else {
                    text.to_string()
                }
            });
        ApiError::Status { status, message }
    }
}

use shared::error::ErrorCode;
use thiserror::Error;

/// Failure of a single call against the appeals backend.
#[derive(Debug, Error)]
pub enum ApiError {
    #[error("{method} {path} failed: {source}")]
    Transport {
        method: &'static str,
        path: String,
        #[source]
        source: reqwest::Error,
    },
    #[error("{method} {path} rejected with status {status}: {message}")]
    Rejected {
        method: &'static str,
        path: String,
        status: u16,
        code: ErrorCode,
        message: String,
    },
    #[error("{method} {path} returned an unexpected body: {source}")]
    Decode {
        method: &'static str,
        path: String,
        #[source]
        source: serde_json::Error,
    },
}

impl ApiError {
    pub fn rejected(
        method: &'static str,
        path: impl Into<String>,
        status: u16,
        message: impl Into<String>,
    ) -> Self {
        Self::Rejected {
            method,
            path: path.into(),
            status,
            code: ErrorCode::from_status(status),
            message: message.into(),
        }
    }

    pub fn code(&self) -> ErrorCode {
        match self {
            Self::Rejected { code, .. } => *code,
            Self::Transport { .. } | Self::Decode { .. } => ErrorCode::Unexpected,
        }
    }

    /// Server-provided message for rejected requests, for display next to a
    /// form.
    pub fn user_message(&self) -> Option<&str> {
        match self {
            Self::Rejected { message, .. } => Some(message),
            Self::Transport { .. } | Self::Decode { .. } => None,
        }
    }
}

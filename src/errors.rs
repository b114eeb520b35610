use serde::Deserialize;
use serde_json::Value;

use crate::services::overlap::OverlapConflict;

#[derive(Debug, thiserror::Error)]
pub enum AppError {
    /// The request was superseded or aborted. Never shown to the operator.
    #[error("request cancelled")]
    Cancelled,

    #[error("unauthorized")]
    Unauthorized { message: Option<String> },

    #[error("backend returned {status}")]
    Status {
        status: u16,
        message: Option<String>,
        details: Option<Value>,
    },

    #[error("network error: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("unexpected response: {0}")]
    Decode(String),

    #[error("invalid input: {0}")]
    Invalid(String),

    #[error("token storage error: {0}")]
    TokenStore(#[from] std::io::Error),
}

/// Error payload the backend attaches to non-2xx responses.
#[derive(Debug, Default, Deserialize)]
pub struct ErrorBody {
    #[serde(default)]
    pub message: Option<String>,
    #[serde(default)]
    pub error: Option<String>,
    #[serde(default)]
    pub details: Option<Value>,
}

impl ErrorBody {
    pub fn parse(bytes: &[u8]) -> Self {
        serde_json::from_slice(bytes).unwrap_or_default()
    }

    /// `message` wins over `error`; blank strings count as absent.
    pub fn best_message(&self) -> Option<String> {
        self.message
            .as_deref()
            .or(self.error.as_deref())
            .map(str::trim)
            .filter(|m| !m.is_empty())
            .map(str::to_string)
    }
}

impl AppError {
    pub fn from_status(status: u16, body: &[u8]) -> Self {
        let body = ErrorBody::parse(body);
        let message = body.best_message();
        if status == 401 {
            return AppError::Unauthorized { message };
        }
        AppError::Status {
            status,
            message,
            details: body.details,
        }
    }

    pub fn is_cancelled(&self) -> bool {
        matches!(self, AppError::Cancelled)
    }

    pub fn details(&self) -> Option<&Value> {
        match self {
            AppError::Status { details, .. } => details.as_ref(),
            _ => None,
        }
    }

    /// The scheduling conflict reported by the backend, if this is one.
    pub fn overlap(&self) -> Option<OverlapConflict> {
        self.details().and_then(OverlapConflict::from_details)
    }

    /// Message to show the operator. `None` means the error must be swallowed.
    pub fn user_message(&self, fallback: &str) -> Option<String> {
        let message = match self {
            AppError::Cancelled => return None,
            AppError::Unauthorized { message } | AppError::Status { message, .. } => {
                message.clone()
            }
            AppError::Transport(e) => Some(e.to_string()),
            AppError::Decode(msg) | AppError::Invalid(msg) => Some(msg.clone()),
            AppError::TokenStore(e) => Some(e.to_string()),
        };
        Some(message.unwrap_or_else(|| fallback.to_string()))
    }
}

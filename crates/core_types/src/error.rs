use std::time::Duration;

use thiserror::Error;

pub type ApiResult<T> = std::result::Result<T, RequestError>;

/// Failure of a single backend call.
#[derive(Debug, Error)]
pub enum RequestError {
    #[error("request timed out after {}s", .after.as_secs())]
    Timeout { after: Duration },

    #[error("server responded with {status}{}", detail_suffix(.detail))]
    Server { status: u16, detail: Option<String> },

    #[error("transport error: {0}")]
    Transport(#[source] Box<dyn std::error::Error + Send + Sync>),

    #[error("failed to decode response: {0}")]
    Decode(String),

    #[error("invalid request: {0}")]
    InvalidRequest(String),
}

fn detail_suffix(detail: &Option<String>) -> String {
    detail.as_deref().map(|d| format!(": {d}")).unwrap_or_default()
}

impl RequestError {
    pub fn transport(err: impl std::error::Error + Send + Sync + 'static) -> Self {
        Self::Transport(Box::new(err))
    }

    /// Server-supplied detail, if the backend sent one.
    pub fn detail(&self) -> Option<&str> {
        match self {
            Self::Server { detail, .. } => detail.as_deref(),
            _ => None,
        }
    }

    /// Text shown to the user: the server detail when present, otherwise the generic message.
    pub fn user_message(&self) -> String {
        self.detail()
            .map(str::to_string)
            .unwrap_or_else(|| self.to_string())
    }

    pub fn is_timeout(&self) -> bool {
        matches!(self, Self::Timeout { .. })
    }
}

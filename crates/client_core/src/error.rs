//! Failure taxonomy for backend calls and page access.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum ClientError {
    #[error("invalid backend url '{url}': {source}")]
    InvalidBaseUrl {
        url: String,
        #[source]
        source: url::ParseError,
    },
    #[error("request to {endpoint} failed: {source}")]
    Transport {
        endpoint: &'static str,
        #[source]
        source: reqwest::Error,
    },
    #[error("{endpoint} returned HTTP {status}: {message}")]
    Status {
        endpoint: &'static str,
        status: u16,
        message: String,
    },
    #[error("malformed response from {endpoint}: {reason}")]
    Malformed {
        endpoint: &'static str,
        reason: String,
    },
    #[error("page has no control with id '{0}'")]
    MissingControl(String),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ClientErrorKind {
    Transport,
    Status,
    Malformed,
    Page,
}

impl ClientError {
    pub fn kind(&self) -> ClientErrorKind {
        match self {
            ClientError::Transport { .. } => ClientErrorKind::Transport,
            ClientError::Status { .. } => ClientErrorKind::Status,
            ClientError::Malformed { .. } => ClientErrorKind::Malformed,
            ClientError::InvalidBaseUrl { .. } | ClientError::MissingControl(_) => {
                ClientErrorKind::Page
            }
        }
    }

    /// Text suitable for the page's status line.
    pub fn user_message(&self) -> String {
        match self {
            ClientError::Transport { source, .. } if source.is_timeout() => {
                "The simulation server timed out; please retry.".to_string()
            }
            ClientError::Transport { .. } => {
                "Simulation server unreachable; check the backend URL and retry.".to_string()
            }
            ClientError::Status {
                status, message, ..
            } => format!("Simulation failed (HTTP {status}): {message}"),
            ClientError::Malformed { .. } => {
                "The simulation server sent an unexpected response.".to_string()
            }
            ClientError::InvalidBaseUrl { url, .. } => format!("Invalid backend URL: {url}"),
            ClientError::MissingControl(id) => format!("Page is missing the '{id}' control."),
        }
    }
}

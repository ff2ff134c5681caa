//! Error surface shared by every backend call
//!
//! Non-2xx responses are normalized into [`ApiError::OperationFailed`] carrying
//! the backend's message when it sent one, or a fixed fallback string for the
//! logical operation otherwise.

use std::fmt;

use serde::Deserialize;

use super::token_store::TokenStoreError;

/// Logical backend operations, each with its own fallback message
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Operation {
    Login,
    Register,
    FetchMyself,
    RefreshToken,
    ChangePassword,
    ListJobs,
    JobDetail,
    CreateJob,
    ListSkills,
    ApplyForJob,
    ListApplications,
}

impl Operation {
    /// Message used when the backend gives no usable error body
    pub fn fallback_message(&self) -> &'static str {
        match self {
            Operation::Login => "Login failed",
            Operation::Register => "Registration failed",
            Operation::FetchMyself => "Failed to fetch user data",
            Operation::RefreshToken => "Failed to refresh session",
            Operation::ChangePassword => "Failed to change password",
            Operation::ListJobs => "Failed to fetch jobs",
            Operation::JobDetail => "Failed to fetch job details",
            Operation::CreateJob => "Failed to create job",
            Operation::ListSkills => "Failed to fetch skills",
            Operation::ApplyForJob => "Failed to apply for job.",
            Operation::ListApplications => "Failed to fetch applications",
        }
    }

    /// Short title for user-facing notifications
    pub fn title(&self) -> &'static str {
        match self {
            Operation::Login => "Login Failed",
            Operation::Register => "Registration Failed",
            Operation::FetchMyself => "Session Error",
            Operation::RefreshToken => "Session Expired",
            Operation::ChangePassword => "Change Password Failed",
            Operation::ListJobs | Operation::JobDetail => "Failed to Load Jobs",
            Operation::CreateJob => "Create Job Failed",
            Operation::ListSkills => "Failed to Load Skills",
            Operation::ApplyForJob => "Application Failed",
            Operation::ListApplications => "Failed to Load Applications",
        }
    }
}

impl fmt::Display for Operation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Operation::Login => "login",
            Operation::Register => "register",
            Operation::FetchMyself => "fetch myself",
            Operation::RefreshToken => "refresh token",
            Operation::ChangePassword => "change password",
            Operation::ListJobs => "list jobs",
            Operation::JobDetail => "job detail",
            Operation::CreateJob => "create job",
            Operation::ListSkills => "list skills",
            Operation::ApplyForJob => "apply for job",
            Operation::ListApplications => "list applications",
        };
        f.write_str(name)
    }
}

/// API error types
#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    /// 401 that could not be recovered by a refresh
    #[error("Authentication required")]
    Unauthenticated,

    #[error("{message}")]
    OperationFailed {
        operation: Operation,
        status: Option<u16>,
        message: String,
    },

    /// Refresh was impossible or rejected; the session has been cleared
    #[error("{0}")]
    RefreshFailed(String),

    #[error("Invalid request: {0}")]
    InvalidRequest(String),

    #[error("Token storage error: {0}")]
    Storage(#[from] TokenStoreError),

    #[error("Invalid URL: {0}")]
    Url(#[from] url::ParseError),

    #[error("Failed to encode request body: {0}")]
    Encode(#[from] serde_json::Error),

    #[error("Network error: {0}")]
    Transport(#[from] reqwest::Error),
}

/// Error body shapes the backend is known to send
#[derive(Debug, Deserialize)]
struct ErrorBody {
    #[serde(default)]
    message: Option<String>,
    #[serde(default)]
    error: Option<String>,
}

impl ApiError {
    /// Operation failure with the fallback message
    pub fn fallback(operation: Operation, status: Option<u16>) -> Self {
        ApiError::OperationFailed {
            operation,
            status,
            message: operation.fallback_message().to_string(),
        }
    }

    /// Build an error from a non-2xx response body
    pub fn from_body(operation: Operation, status: u16, body: &str) -> Self {
        let message = serde_json::from_str::<ErrorBody>(body)
            .ok()
            .and_then(|b| b.message.or(b.error))
            .filter(|m| !m.trim().is_empty())
            .unwrap_or_else(|| operation.fallback_message().to_string());

        ApiError::OperationFailed {
            operation,
            status: Some(status),
            message,
        }
    }

    /// Consume a non-2xx response into an error
    pub async fn from_response(operation: Operation, response: reqwest::Response) -> Self {
        let status = response.status().as_u16();
        let body = response.text().await.unwrap_or_default();
        Self::from_body(operation, status, &body)
    }

    /// Fold transport-level failures into the operation's fallback
    ///
    /// Auth, storage, and validation errors keep their own variants.
    pub fn within(self, operation: Operation) -> Self {
        match self {
            ApiError::Transport(e) => {
                tracing::warn!("{} failed at transport level: {}", operation, e);
                ApiError::fallback(operation, e.status().map(|s| s.as_u16()))
            }
            ApiError::Encode(e) => {
                tracing::warn!("{} failed to encode or decode payload: {}", operation, e);
                ApiError::fallback(operation, None)
            }
            other => other,
        }
    }

    /// HTTP status attached to the error, if any
    pub fn status(&self) -> Option<u16> {
        match self {
            ApiError::Unauthenticated => Some(401),
            ApiError::OperationFailed { status, .. } => *status,
            ApiError::Transport(e) => e.status().map(|s| s.as_u16()),
            _ => None,
        }
    }

    /// Whether the error ended the session
    ///
    /// A 401 on an already retried request is not one: tokens and user stay in place.
    pub fn is_session_expired(&self) -> bool {
        matches!(self, ApiError::RefreshFailed(_))
    }
}

//! User-facing notifications for operation outcomes

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::core::auth::error::ApiError;

/// Message shown whenever the session could not be kept alive
pub const SESSION_EXPIRED_MESSAGE: &str = "Your session has expired. Please log in again.";

/// Shown when a request is still rejected after a successful token refresh
pub const NOT_AUTHENTICATED_MESSAGE: &str =
    "Your request could not be authenticated. Please try again.";

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum NotificationKind {
    Success,
    Error,
    Warning,
    Info,
}

/// Toast-style notification
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Notification {
    pub kind: NotificationKind,
    pub title: String,
    pub message: String,
    pub auto_dismiss_ms: Option<u32>,
}

impl Notification {
    pub fn success(title: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            kind: NotificationKind::Success,
            title: title.into(),
            message: message.into(),
            auto_dismiss_ms: Some(3000),
        }
    }

    pub fn error(title: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            kind: NotificationKind::Error,
            title: title.into(),
            message: message.into(),
            auto_dismiss_ms: None, // dismissed manually
        }
    }

    pub fn warning(title: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            kind: NotificationKind::Warning,
            title: title.into(),
            message: message.into(),
            auto_dismiss_ms: Some(5000),
        }
    }

    pub fn info(title: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            kind: NotificationKind::Info,
            title: title.into(),
            message: message.into(),
            auto_dismiss_ms: Some(3000),
        }
    }

    /// Describe a failed operation
    pub fn from_error(error: &ApiError) -> Self {
        if error.is_session_expired() {
            return Self::error("Session Expired", SESSION_EXPIRED_MESSAGE);
        }

        match error {
            ApiError::Unauthenticated => {
                Self::error("Authentication Required", NOT_AUTHENTICATED_MESSAGE)
            }
            ApiError::OperationFailed {
                operation, message, ..
            } => Self::error(operation.title(), message.clone()),
            ApiError::InvalidRequest(message) => Self::warning("Invalid Input", message.clone()),
            ApiError::Storage(e) => Self::error("Storage Error", e.to_string()),
            other => Self::error("Request Failed", other.to_string()),
        }
    }

    pub fn login_success() -> Self {
        Self::success(
            "Login Successful",
            "Welcome back! You have been logged in successfully.",
        )
    }

    pub fn registration_success() -> Self {
        Self::success(
            "Registration Successful",
            "Welcome! Your account has been created successfully.",
        )
    }

    pub fn password_changed() -> Self {
        Self::success(
            "Password Changed",
            "Your password has been changed successfully.",
        )
    }

    pub fn job_created() -> Self {
        Self::success("Job Created", "Job created successfully!")
    }

    pub fn application_submitted() -> Self {
        Self::success("Application Sent", "Your application has been submitted.")
    }

    pub fn logged_out() -> Self {
        Self::info("Logged Out", "You have been logged out.")
    }
}

impl fmt::Display for Notification {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.title, self.message)
    }
}

//! gigboard - job marketplace client
//!
//! Session and role-authorization layer for the gigboard job marketplace:
//! persisted tokens, an HTTP client with silent token refresh, a session
//! manager and a role-based route guard, plus typed job endpoints.

pub mod core;

pub use crate::core::auth::{
    ApiError, AuthApi, GuardDecision, HttpClient, Navigation, RoleTag, Route, RouteAuthorization,
    Session, SessionManager, TokenStore, User,
};
pub use crate::core::jobs::JobsApi;
pub use crate::core::notifications::Notification;

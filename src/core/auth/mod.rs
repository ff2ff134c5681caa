//! Authentication module for gigboard
//!
//! This module provides the client side of authentication:
//! - Persisted access and refresh tokens
//! - An HTTP client that attaches bearer tokens and refreshes once on a 401
//! - The session manager owning the current user
//! - Role-based route guarding

pub mod api;
pub mod error;
pub mod guard;
pub mod http;
pub mod roles;
pub mod session;
pub mod token_store;

#[cfg(test)]
pub(crate) mod test_support;

pub use api::{AuthApi, RegisterRequest, RegisterResponse};
pub use error::{ApiError, Operation};
pub use guard::{
    Access, GuardDecision, Navigation, Route, RouteAuthorization, evaluate, landing_target,
    navigate, post_login_target,
};
pub use http::{ApiRequest, AuthEvent, FormPart, HttpClient, RequestBody};
pub use roles::{RoleTag, User, UserId};
pub use session::{Session, SessionManager};
#[cfg(feature = "browser")]
pub use token_store::LocalStorageTokenStore;
pub use token_store::{FileTokenStore, MemoryTokenStore, TokenPair, TokenStore, TokenStoreError};

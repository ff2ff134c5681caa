//! Session manager
//!
//! Owns the current user and is the only writer of session state. Readers
//! either query the manager directly or hold a [`watch::Receiver`] from
//! [`SessionManager::subscribe`].

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use tokio::sync::{Mutex, watch};

use super::api::{AuthApi, RegisterRequest};
use super::error::{ApiError, Operation};
use super::guard::{self, GuardDecision, Navigation, RouteAuthorization};
use super::http::HttpClient;
use super::roles::{RoleTag, User};
use super::token_store::TokenPair;

/// Snapshot of the session
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Session {
    pub user: Option<User>,
    /// True only while the initial bootstrap is in flight
    pub loading: bool,
}

impl Session {
    /// Initial state, before bootstrap resolves
    pub fn bootstrapping() -> Self {
        Self {
            user: None,
            loading: true,
        }
    }

    pub fn signed_out() -> Self {
        Self {
            user: None,
            loading: false,
        }
    }

    pub fn signed_in(user: User) -> Self {
        Self {
            user: Some(user),
            loading: false,
        }
    }

    pub fn is_authenticated(&self) -> bool {
        self.user.is_some()
    }
}

/// Session manager
pub struct SessionManager {
    api: AuthApi,
    state: Arc<watch::Sender<Session>>,
    /// Serializes bootstrap, login and register
    op_lock: Mutex<()>,
    bootstrapped: AtomicBool,
}

impl SessionManager {
    /// Create a manager in the bootstrapping state
    ///
    /// The user is cleared as soon as the client expires the session, whichever
    /// API issued the failing request.
    pub fn new(api: AuthApi) -> Self {
        let (state, _) = watch::channel(Session::bootstrapping());
        let state = Arc::new(state);

        let expired = Arc::downgrade(&state);
        api.client().on_session_expired(move || {
            let Some(state) = expired.upgrade() else {
                return;
            };
            if state.send_if_modified(|session| session.user.take().is_some()) {
                tracing::info!("Session expired, user signed out");
            }
        });

        Self {
            api,
            state,
            op_lock: Mutex::new(()),
            bootstrapped: AtomicBool::new(false),
        }
    }

    /// Create a manager and run bootstrap
    pub async fn start(api: AuthApi) -> Self {
        let manager = Self::new(api);
        manager.bootstrap().await;
        manager
    }

    pub fn api(&self) -> &AuthApi {
        &self.api
    }

    /// HTTP client shared with every other API built on this session
    pub fn client(&self) -> &HttpClient {
        self.api.client()
    }

    /// Resolve the initial session from the stored access token
    ///
    /// Runs once; later calls return immediately. A failed self-fetch clears
    /// both tokens and leaves the user absent.
    pub async fn bootstrap(&self) {
        let _op = self.op_lock.lock().await;
        if self.bootstrapped.swap(true, Ordering::SeqCst) {
            return;
        }

        let user = if self.client().tokens().access_token().is_some() {
            match self.api.fetch_myself().await {
                Ok(user) => {
                    tracing::info!("Session restored for {}", user.username);
                    Some(user)
                }
                Err(e) => {
                    tracing::warn!("Failed to load user data: {}", e);
                    if let Err(e) = self.client().update_tokens(|t| t.clear_all()).await {
                        tracing::error!("Failed to clear tokens: {}", e);
                    }
                    None
                }
            }
        } else {
            tracing::debug!("No stored access token, starting signed out");
            None
        };

        self.state.send_replace(Session {
            user,
            loading: false,
        });
    }

    /// Log in with email and password
    ///
    /// Tokens are persisted only after the user fetch with the new access
    /// token succeeds; on any failure the previous session and tokens are kept.
    pub async fn login(&self, email: &str, password: &str) -> Result<User, ApiError> {
        let _op = self.op_lock.lock().await;

        let pair = self.api.login(email, password).await.inspect_err(|e| {
            tracing::warn!("Login failed: {}", e);
        })?;
        let user = self
            .api
            .fetch_myself_with(&pair.access_token)
            .await
            .inspect_err(|e| tracing::warn!("Login succeeded but user fetch failed: {}", e))?;

        self.sign_in(&pair, user.clone()).await?;

        tracing::info!("User logged in: {}", user.username);
        Ok(user)
    }

    /// Create an account and sign in as it
    ///
    /// Failures are reported as a generic registration error; the cause is
    /// only logged.
    pub async fn register(
        &self,
        name: &str,
        email: &str,
        password: &str,
        role: RoleTag,
    ) -> Result<User, ApiError> {
        let _op = self.op_lock.lock().await;

        let request = RegisterRequest {
            username: name.to_string(),
            email: email.to_string(),
            password: password.to_string(),
            role,
        };

        let registered = match self.api.register(&request).await {
            Ok(registered) => registered,
            Err(e) => {
                tracing::warn!("Registration failed for {}: {}", email, e);
                return Err(ApiError::fallback(Operation::Register, e.status()));
            }
        };

        let pair: TokenPair = registered.tokens.into();
        let user = registered.user;
        if let Err(e) = self.sign_in(&pair, user.clone()).await {
            tracing::warn!("Registration succeeded but tokens were not stored: {}", e);
            return Err(ApiError::fallback(Operation::Register, None));
        }

        tracing::info!("User registered: {}", user.username);
        Ok(user)
    }

    /// Clear tokens and the user; no network call
    pub fn logout(&self) {
        if let Err(e) = self.client().tokens().clear_all() {
            tracing::error!("Failed to clear tokens on logout: {}", e);
        }

        let changed = self
            .state
            .send_if_modified(|session| session.user.take().is_some());
        if changed {
            tracing::info!("User logged out");
        }
    }

    /// Change the current user's password
    pub async fn change_password(
        &self,
        old_password: &str,
        new_password: &str,
    ) -> Result<(), ApiError> {
        self.api.change_password(old_password, new_password).await
    }

    /// Current session snapshot
    pub fn session(&self) -> Session {
        self.state.borrow().clone()
    }

    /// Observe session changes
    pub fn subscribe(&self) -> watch::Receiver<Session> {
        self.state.subscribe()
    }

    pub fn user(&self) -> Option<User> {
        self.session().user
    }

    pub fn is_authenticated(&self) -> bool {
        self.session().is_authenticated()
    }

    pub fn is_loading(&self) -> bool {
        self.state.borrow().loading
    }

    /// Guard a protected location against the current session
    pub fn authorize(&self, authorization: &RouteAuthorization, location: &str) -> GuardDecision {
        guard::evaluate(&self.session(), authorization, location)
    }

    /// Resolve a location against the route table
    pub fn navigate(&self, location: &str) -> Navigation {
        guard::navigate(&self.session(), location)
    }

    /// Store `pair` and publish `user`, after any in-flight refresh has settled
    async fn sign_in(&self, pair: &TokenPair, user: User) -> Result<(), ApiError> {
        self.client()
            .update_tokens(|tokens| -> Result<(), ApiError> {
                tokens.replace_pair(pair)?;
                self.bootstrapped.store(true, Ordering::SeqCst);
                self.state.send_replace(Session::signed_in(user));
                Ok(())
            })
            .await
    }
}

//! Request-issuing facade with bearer and refresh interceptors
//!
//! Every intercepted request:
//! - carries `Authorization: Bearer <token>` when an access token is stored
//! - on a 401, is retried at most once after exchanging the refresh token
//!
//! When the refresh is impossible or rejected, both tokens are cleared and an
//! [`AuthEvent::SessionExpired`] is broadcast so the application can navigate
//! to the login page.

use std::sync::{Arc, Mutex as StdMutex};

use reqwest::multipart::{Form, Part};
use reqwest::{Method, Response, StatusCode};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use tokio::sync::{Mutex, broadcast};
use url::Url;

use super::error::{ApiError, Operation};
use super::guard::Route;
use super::token_store::{TokenPair, TokenStore};

/// Refresh endpoint, relative to the API base URL
pub const REFRESH_TOKEN_PATH: &str = "api/v1/auth/refresh-token";

/// Capacity of the auth event channel
const EVENT_CAPACITY: usize = 16;

/// Callback run synchronously whenever the client expires the session
pub type ExpiryHook = Arc<dyn Fn() + Send + Sync>;

// ============================================================================
// Events
// ============================================================================

/// Session-level events raised by the client
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AuthEvent {
    /// A refresh succeeded and new tokens were stored
    TokensRefreshed,
    /// Tokens were cleared; the application should navigate to `redirect`
    SessionExpired { redirect: Route },
}

// ============================================================================
// Requests
// ============================================================================

/// A single multipart form field
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FormPart {
    Text {
        name: String,
        value: String,
    },
    File {
        name: String,
        file_name: String,
        mime: Option<String>,
        bytes: Vec<u8>,
    },
}

/// Request payload; kept as data so the request can be re-issued after a refresh
#[derive(Debug, Clone, PartialEq)]
pub enum RequestBody {
    Json(serde_json::Value),
    Multipart(Vec<FormPart>),
}

/// Outbound request with an explicit retry marker
#[derive(Debug, Clone, PartialEq)]
pub struct ApiRequest {
    method: Method,
    path: String,
    body: Option<RequestBody>,
    retried: bool,
}

impl ApiRequest {
    pub fn new(method: Method, path: impl Into<String>) -> Self {
        Self {
            method,
            path: path.into(),
            body: None,
            retried: false,
        }
    }

    pub fn get(path: impl Into<String>) -> Self {
        Self::new(Method::GET, path)
    }

    pub fn post(path: impl Into<String>) -> Self {
        Self::new(Method::POST, path)
    }

    /// Attach a JSON body
    pub fn json<T: Serialize + ?Sized>(mut self, body: &T) -> Result<Self, ApiError> {
        self.body = Some(RequestBody::Json(serde_json::to_value(body)?));
        Ok(self)
    }

    /// Attach a multipart body
    pub fn multipart(mut self, parts: Vec<FormPart>) -> Self {
        self.body = Some(RequestBody::Multipart(parts));
        self
    }

    pub fn method(&self) -> &Method {
        &self.method
    }

    pub fn path(&self) -> &str {
        &self.path
    }

    pub fn body(&self) -> Option<&RequestBody> {
        self.body.as_ref()
    }

    /// Whether this request already went through a refresh
    pub fn is_retried(&self) -> bool {
        self.retried
    }

    /// The same request, marked as retried
    pub fn into_retry(self) -> Self {
        Self {
            retried: true,
            ..self
        }
    }
}

fn build_form(parts: &[FormPart]) -> Result<Form, ApiError> {
    let mut form = Form::new();
    for part in parts {
        form = match part {
            FormPart::Text { name, value } => form.text(name.clone(), value.clone()),
            FormPart::File {
                name,
                file_name,
                mime,
                bytes,
            } => {
                let mut file = Part::bytes(bytes.clone()).file_name(file_name.clone());
                if let Some(mime) = mime {
                    file = file.mime_str(mime)?;
                }
                form.part(name.clone(), file)
            }
        };
    }
    Ok(form)
}

// ============================================================================
// Wire types
// ============================================================================

/// Token payload returned by login, register and refresh
///
/// Registration responses may name the access token `token`.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TokenPayload {
    #[serde(alias = "token")]
    pub access_token: String,
    #[serde(default)]
    pub refresh_token: Option<String>,
}

impl From<TokenPayload> for TokenPair {
    fn from(payload: TokenPayload) -> Self {
        TokenPair::new(payload.access_token, payload.refresh_token)
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct RefreshRequest<'a> {
    refresh_token: &'a str,
}

/// Return the response on 2xx, otherwise the normalized error
pub async fn ensure_success(
    operation: Operation,
    response: Response,
) -> Result<Response, ApiError> {
    if response.status().is_success() {
        return Ok(response);
    }
    Err(ApiError::from_response(operation, response).await)
}

// ============================================================================
// Client
// ============================================================================

/// HTTP client shared by every backend call
///
/// Cloning is cheap; clones share the token store, the event channel, the
/// expiry hooks and the refresh gate.
#[derive(Clone)]
pub struct HttpClient {
    http: reqwest::Client,
    base_url: Url,
    tokens: Arc<dyn TokenStore>,
    events: broadcast::Sender<AuthEvent>,
    expiry_hooks: Arc<StdMutex<Vec<ExpiryHook>>>,
    /// Held for every token write that races with a refresh
    refresh_gate: Arc<Mutex<()>>,
}

impl HttpClient {
    /// Create a client for the API at `base_url`
    pub fn new(base_url: Url, tokens: Arc<dyn TokenStore>) -> Self {
        let (events, _) = broadcast::channel(EVENT_CAPACITY);
        Self {
            http: reqwest::Client::new(),
            base_url,
            tokens,
            events,
            expiry_hooks: Arc::new(StdMutex::new(Vec::new())),
            refresh_gate: Arc::new(Mutex::new(())),
        }
    }

    /// Use a custom HTTP client (for connection pool reuse or testing)
    pub fn with_http_client(mut self, client: reqwest::Client) -> Self {
        self.http = client;
        self
    }

    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    pub fn tokens(&self) -> &Arc<dyn TokenStore> {
        &self.tokens
    }

    /// Subscribe to session events (expiry, refresh)
    pub fn subscribe(&self) -> broadcast::Receiver<AuthEvent> {
        self.events.subscribe()
    }

    /// Run `hook` every time tokens are cleared after a failed refresh
    ///
    /// Hooks run inside the refresh gate, before the failing request returns.
    pub fn on_session_expired(&self, hook: impl Fn() + Send + Sync + 'static) {
        self.expiry_hooks
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .push(Arc::new(hook));
    }

    /// Write tokens without interleaving with a refresh
    ///
    /// Waits for any in-flight refresh to settle, so its result can never
    /// overwrite what `update` stores.
    pub async fn update_tokens<R>(&self, update: impl FnOnce(&dyn TokenStore) -> R) -> R {
        let _gate = self.refresh_gate.lock().await;
        update(self.tokens.as_ref())
    }

    /// Resolve an API path against the base URL
    pub fn url(&self, path: &str) -> Result<Url, ApiError> {
        Ok(self.base_url.join(path.trim_start_matches('/'))?)
    }

    /// Send through both interceptors
    ///
    /// Non-401 responses are returned as-is, including other error statuses.
    pub async fn send(&self, request: ApiRequest) -> Result<Response, ApiError> {
        let mut request = request;
        loop {
            let token = self.tokens.access_token();
            let response = self.execute(&request, token.as_deref()).await?;

            if response.status() != StatusCode::UNAUTHORIZED {
                return Ok(response);
            }

            if request.is_retried() {
                tracing::warn!(
                    "{} {} rejected again after refresh",
                    request.method(),
                    request.path()
                );
                return Err(ApiError::Unauthenticated);
            }

            tracing::debug!(
                "{} {} returned 401, attempting token refresh",
                request.method(),
                request.path()
            );
            request = request.into_retry();
            self.recover_unauthorized(token.as_deref()).await?;
        }
    }

    /// Send without interceptors, optionally with an explicit bearer token
    pub async fn send_plain(
        &self,
        request: &ApiRequest,
        bearer: Option<&str>,
    ) -> Result<Response, ApiError> {
        self.execute(request, bearer).await
    }

    /// Intercepted request decoded as JSON
    pub async fn fetch_json<T: DeserializeOwned>(
        &self,
        operation: Operation,
        request: ApiRequest,
    ) -> Result<T, ApiError> {
        let response = self
            .send(request)
            .await
            .map_err(|e| e.within(operation))?;
        let response = ensure_success(operation, response).await?;
        response
            .json::<T>()
            .await
            .map_err(|e| ApiError::from(e).within(operation))
    }

    /// Intercepted request whose success body is ignored
    pub async fn fetch_empty(
        &self,
        operation: Operation,
        request: ApiRequest,
    ) -> Result<(), ApiError> {
        let response = self
            .send(request)
            .await
            .map_err(|e| e.within(operation))?;
        ensure_success(operation, response).await?;
        Ok(())
    }

    /// Exchange a refresh token for a new pair
    ///
    /// Plain call: a 401 here is a refresh failure, never another refresh.
    pub async fn refresh(&self, refresh_token: &str) -> Result<TokenPair, ApiError> {
        let operation = Operation::RefreshToken;
        let request = ApiRequest::post(REFRESH_TOKEN_PATH).json(&RefreshRequest { refresh_token })?;

        let response = self
            .send_plain(&request, None)
            .await
            .map_err(|e| e.within(operation))?;
        let response = ensure_success(operation, response).await?;
        let payload = response
            .json::<TokenPayload>()
            .await
            .map_err(|e| ApiError::from(e).within(operation))?;

        Ok(payload.into())
    }

    async fn execute(
        &self,
        request: &ApiRequest,
        bearer: Option<&str>,
    ) -> Result<Response, ApiError> {
        let mut builder = self
            .http
            .request(request.method.clone(), self.url(&request.path)?);

        if let Some(token) = bearer {
            builder = builder.bearer_auth(token);
        }

        builder = match &request.body {
            None => builder,
            Some(RequestBody::Json(value)) => builder.json(value),
            Some(RequestBody::Multipart(parts)) => builder.multipart(build_form(parts)?),
        };

        Ok(builder.send().await?)
    }

    /// Obtain a usable access token after `stale` was rejected
    ///
    /// Refreshes are serialized. A caller that finds the stored token already
    /// replaced by a concurrent refresh retries with it instead of refreshing.
    /// A refresh whose stale token was replaced while it was in flight (by a
    /// logout) is discarded.
    async fn recover_unauthorized(&self, stale: Option<&str>) -> Result<(), ApiError> {
        let _gate = self.refresh_gate.lock().await;

        let current = self.tokens.access_token();
        if current.is_some() && current.as_deref() != stale {
            tracing::debug!("Access token already refreshed by a concurrent request");
            return Ok(());
        }

        let Some(refresh_token) = self.tokens.refresh_token() else {
            tracing::info!("Access token rejected and no refresh token is stored");
            self.expire_session();
            return Err(ApiError::RefreshFailed(
                "Your session has expired. Please log in again.".to_string(),
            ));
        };

        let result = self.refresh(&refresh_token).await;

        if self.tokens.access_token().as_deref() != stale {
            tracing::debug!("Tokens changed during refresh, discarding its result");
            return Ok(());
        }

        match result {
            Ok(pair) => {
                self.tokens.store_pair(&pair)?;
                tracing::info!("Access token refreshed");
                let _ = self.events.send(AuthEvent::TokensRefreshed);
                Ok(())
            }
            Err(e) => {
                tracing::warn!("Token refresh failed: {}", e);
                self.expire_session();
                Err(ApiError::RefreshFailed(e.to_string()))
            }
        }
    }

    fn expire_session(&self) {
        if let Err(e) = self.tokens.clear_all() {
            tracing::error!("Failed to clear tokens: {}", e);
        }

        let hooks = self
            .expiry_hooks
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .clone();
        for hook in hooks {
            hook();
        }
        let _ = self.events.send(AuthEvent::SessionExpired {
            redirect: Route::Login,
        });
    }
}

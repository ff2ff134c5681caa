//! Auth API calls
//!
//! Typed wrappers over the backend's auth endpoints:
//! - POST api/v1/auth/login - Exchange credentials for tokens
//! - POST api/v1/auth/users - Register a new user
//! - GET api/v1/auth/myself - Current user from the bearer token
//! - POST api/v1/auth/change-password - Change the current user's password
//!
//! Login and register are plain calls; a 401 from either is a credential
//! error and never triggers a refresh.

use serde::{Deserialize, Serialize};

use super::error::{ApiError, Operation};
use super::http::{ApiRequest, HttpClient, TokenPayload, ensure_success};
use super::roles::{RoleTag, User};
use super::token_store::TokenPair;

pub const LOGIN_PATH: &str = "api/v1/auth/login";
pub const REGISTER_PATH: &str = "api/v1/auth/users";
pub const MYSELF_PATH: &str = "api/v1/auth/myself";
pub const CHANGE_PASSWORD_PATH: &str = "api/v1/auth/change-password";

/// Login request; the backend expects the email under `username`
#[derive(Debug, Serialize)]
struct LoginRequest<'a> {
    username: &'a str,
    password: &'a str,
}

/// Registration request
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RegisterRequest {
    pub username: String,
    pub email: String,
    pub password: String,
    /// Sent unprefixed, e.g. `"FREELANCER"`
    pub role: RoleTag,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct ChangePasswordRequest<'a> {
    old_password: &'a str,
    new_password: &'a str,
}

/// Login responses come either as a bare token or as a token pair
#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum LoginResponse {
    Bare(String),
    Pair(TokenPayload),
}

/// Registration response: tokens at the top level next to the user
#[derive(Debug, Deserialize)]
pub struct RegisterResponse {
    #[serde(flatten)]
    pub tokens: TokenPayload,
    pub user: User,
}

/// Parse a successful login body into a token pair
///
/// Accepts `"<token>"`, `{"accessToken": ..., "refreshToken": ...}` and a raw
/// text token.
pub fn parse_login_response(body: &str) -> Result<TokenPair, ApiError> {
    let trimmed = body.trim();
    if trimmed.is_empty() {
        return Err(invalid_login_response());
    }

    if let Ok(parsed) = serde_json::from_str::<LoginResponse>(trimmed) {
        let pair = match parsed {
            LoginResponse::Bare(token) => TokenPair::new(token, None),
            LoginResponse::Pair(payload) => payload.into(),
        };
        if pair.access_token.trim().is_empty() {
            return Err(invalid_login_response());
        }
        return Ok(pair);
    }

    let looks_like_json = trimmed.starts_with(['{', '[', '"']);
    if looks_like_json || trimmed.contains(char::is_whitespace) {
        return Err(invalid_login_response());
    }

    Ok(TokenPair::new(trimmed, None))
}

fn invalid_login_response() -> ApiError {
    ApiError::OperationFailed {
        operation: Operation::Login,
        status: None,
        message: "Invalid response from server".to_string(),
    }
}

/// Auth endpoint client
#[derive(Clone)]
pub struct AuthApi {
    client: HttpClient,
}

impl AuthApi {
    pub fn new(client: HttpClient) -> Self {
        Self { client }
    }

    pub fn client(&self) -> &HttpClient {
        &self.client
    }

    /// Exchange credentials for tokens; nothing is stored here
    pub async fn login(&self, email: &str, password: &str) -> Result<TokenPair, ApiError> {
        let operation = Operation::Login;
        let request = ApiRequest::post(LOGIN_PATH).json(&LoginRequest {
            username: email,
            password,
        })?;

        let response = self
            .client
            .send_plain(&request, None)
            .await
            .map_err(|e| e.within(operation))?;
        let response = ensure_success(operation, response).await?;
        let body = response
            .text()
            .await
            .map_err(|e| ApiError::from(e).within(operation))?;

        parse_login_response(&body)
    }

    /// Create an account; the response carries tokens and the new user
    pub async fn register(&self, request: &RegisterRequest) -> Result<RegisterResponse, ApiError> {
        let operation = Operation::Register;
        let request = ApiRequest::post(REGISTER_PATH).json(request)?;

        let response = self
            .client
            .send_plain(&request, None)
            .await
            .map_err(|e| e.within(operation))?;
        let response = ensure_success(operation, response).await?;
        response
            .json::<RegisterResponse>()
            .await
            .map_err(|e| ApiError::from(e).within(operation))
    }

    /// Current user, through the refresh interceptor
    pub async fn fetch_myself(&self) -> Result<User, ApiError> {
        self.client
            .fetch_json(Operation::FetchMyself, ApiRequest::get(MYSELF_PATH))
            .await
    }

    /// Current user for an access token that is not stored yet
    pub async fn fetch_myself_with(&self, access_token: &str) -> Result<User, ApiError> {
        let operation = Operation::FetchMyself;
        let request = ApiRequest::get(MYSELF_PATH);

        let response = self
            .client
            .send_plain(&request, Some(access_token))
            .await
            .map_err(|e| e.within(operation))?;
        let response = ensure_success(operation, response).await?;
        response
            .json::<User>()
            .await
            .map_err(|e| ApiError::from(e).within(operation))
    }

    /// Exchange a refresh token for a new pair
    pub async fn refresh(&self, refresh_token: &str) -> Result<TokenPair, ApiError> {
        self.client.refresh(refresh_token).await
    }

    pub async fn change_password(
        &self,
        old_password: &str,
        new_password: &str,
    ) -> Result<(), ApiError> {
        let request = ApiRequest::post(CHANGE_PASSWORD_PATH).json(&ChangePasswordRequest {
            old_password,
            new_password,
        })?;
        self.client
            .fetch_empty(Operation::ChangePassword, request)
            .await
    }
}

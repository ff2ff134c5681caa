//! In-process mock backend for exercising the client over real HTTP
//!
//! Serves the auth and job endpoints on an ephemeral port. Access and refresh
//! tokens are opaque strings tracked in sets; tests grant or revoke them to
//! simulate expiry.

use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicBool, AtomicU64, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use axum::{
    Json, Router,
    body::Bytes,
    extract::{Path, State},
    http::{HeaderMap, StatusCode, header},
    response::{IntoResponse, Response},
    routing::{get, post},
};
use serde_json::{Value, json};
use tokio::task::JoinHandle;
use url::Url;

use super::http::HttpClient;
use super::token_store::TokenStore;

/// Password the mock accepts for every account
pub(crate) const GOOD_PASSWORD: &str = "secret";

/// Shape of a successful login response
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum LoginShape {
    /// `{"accessToken": ..., "refreshToken": ...}`
    Pair,
    /// `"<token>"` as a JSON string
    BareJson,
    /// `<token>` as a text/plain body
    BareText,
}

/// Shape of a registration response
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum RegisterShape {
    /// `{"accessToken", "refreshToken", "user"}`
    Pair,
    /// `{"token", "user"}`
    Legacy,
    /// 409 with a backend message
    Conflict,
}

pub(crate) struct MockState {
    access_tokens: Mutex<HashSet<String>>,
    refresh_tokens: Mutex<HashSet<String>>,
    calls: Mutex<HashMap<&'static str, usize>>,
    last_apply: Mutex<Option<(String, String)>>,
    login_shape: Mutex<LoginShape>,
    register_shape: Mutex<RegisterShape>,
    user_roles: Mutex<Vec<String>>,
    reject_bearers: AtomicBool,
    refresh_delay_ms: AtomicU64,
    issued: AtomicUsize,
}

impl Default for MockState {
    fn default() -> Self {
        Self {
            access_tokens: Mutex::new(HashSet::new()),
            refresh_tokens: Mutex::new(HashSet::new()),
            calls: Mutex::new(HashMap::new()),
            last_apply: Mutex::new(None),
            login_shape: Mutex::new(LoginShape::Pair),
            register_shape: Mutex::new(RegisterShape::Pair),
            user_roles: Mutex::new(vec!["ROLE_FREELANCER".to_string()]),
            reject_bearers: AtomicBool::new(false),
            refresh_delay_ms: AtomicU64::new(0),
            issued: AtomicUsize::new(0),
        }
    }
}

impl MockState {
    /// Issue and register a new access token
    pub(crate) fn grant_access(&self) -> String {
        let token = format!("access-{}", self.issued.fetch_add(1, Ordering::SeqCst));
        self.access_tokens.lock().unwrap().insert(token.clone());
        token
    }

    /// Issue and register a new refresh token
    pub(crate) fn grant_refresh(&self) -> String {
        let token = format!("refresh-{}", self.issued.fetch_add(1, Ordering::SeqCst));
        self.refresh_tokens.lock().unwrap().insert(token.clone());
        token
    }

    /// Make an access token expire
    pub(crate) fn revoke_access(&self, token: &str) {
        self.access_tokens.lock().unwrap().remove(token);
    }

    pub(crate) fn is_valid_access(&self, token: &str) -> bool {
        !self.reject_bearers.load(Ordering::SeqCst)
            && self.access_tokens.lock().unwrap().contains(token)
    }

    /// Answer 401 to every bearer, valid or not
    pub(crate) fn reject_every_bearer(&self) {
        self.reject_bearers.store(true, Ordering::SeqCst);
    }

    pub(crate) fn set_refresh_delay_ms(&self, ms: u64) {
        self.refresh_delay_ms.store(ms, Ordering::SeqCst);
    }

    pub(crate) fn set_login_shape(&self, shape: LoginShape) {
        *self.login_shape.lock().unwrap() = shape;
    }

    pub(crate) fn set_register_shape(&self, shape: RegisterShape) {
        *self.register_shape.lock().unwrap() = shape;
    }

    pub(crate) fn set_user_roles(&self, roles: &[&str]) {
        *self.user_roles.lock().unwrap() = roles.iter().map(|r| r.to_string()).collect();
    }

    /// Number of requests an endpoint has received
    pub(crate) fn calls(&self, endpoint: &str) -> usize {
        self.calls
            .lock()
            .unwrap()
            .get(endpoint)
            .copied()
            .unwrap_or_default()
    }

    /// Content type and raw body of the last application submitted
    pub(crate) fn last_apply(&self) -> Option<(String, String)> {
        self.last_apply.lock().unwrap().clone()
    }

    fn hit(&self, endpoint: &'static str) {
        *self.calls.lock().unwrap().entry(endpoint).or_default() += 1;
    }

    fn authorized(&self, headers: &HeaderMap) -> bool {
        headers
            .get(header::AUTHORIZATION)
            .and_then(|v| v.to_str().ok())
            .and_then(|v| v.strip_prefix("Bearer "))
            .is_some_and(|token| self.is_valid_access(token))
    }

    fn user_json(&self, username: &str, email: &str, roles: Vec<String>) -> Value {
        json!({ "id": 1, "username": username, "email": email, "roles": roles })
    }

    fn current_user(&self) -> Value {
        let roles = self.user_roles.lock().unwrap().clone();
        self.user_json("ana", "ana@example.com", roles)
    }
}

type Shared = Arc<MockState>;

fn unauthorized(message: &str) -> Response {
    (StatusCode::UNAUTHORIZED, Json(json!({ "message": message }))).into_response()
}

async fn login(State(state): State<Shared>, Json(body): Json<Value>) -> Response {
    state.hit("login");
    if body["password"] != GOOD_PASSWORD || body["username"].as_str().is_none() {
        return unauthorized("Invalid username or password");
    }

    let access = state.grant_access();
    let shape = *state.login_shape.lock().unwrap();
    match shape {
        LoginShape::Pair => {
            let refresh = state.grant_refresh();
            Json(json!({ "accessToken": access, "refreshToken": refresh })).into_response()
        }
        LoginShape::BareJson => Json(Value::String(access)).into_response(),
        LoginShape::BareText => (StatusCode::OK, access).into_response(),
    }
}

async fn refresh_token(State(state): State<Shared>, Json(body): Json<Value>) -> Response {
    state.hit("refresh");
    let delay = state.refresh_delay_ms.load(Ordering::SeqCst);
    if delay > 0 {
        tokio::time::sleep(Duration::from_millis(delay)).await;
    }

    let presented = body["refreshToken"].as_str().unwrap_or_default().to_string();
    if !state.refresh_tokens.lock().unwrap().remove(&presented) {
        return unauthorized("Refresh token expired");
    }

    let access = state.grant_access();
    let refresh = state.grant_refresh();
    Json(json!({ "accessToken": access, "refreshToken": refresh })).into_response()
}

async fn register(State(state): State<Shared>, Json(body): Json<Value>) -> Response {
    state.hit("register");
    let username = body["username"].as_str().unwrap_or_default();
    let email = body["email"].as_str().unwrap_or_default();
    let role = format!("ROLE_{}", body["role"].as_str().unwrap_or_default());
    let user = state.user_json(username, email, vec![role]);

    let shape = *state.register_shape.lock().unwrap();
    match shape {
        RegisterShape::Pair => {
            let access = state.grant_access();
            let refresh = state.grant_refresh();
            Json(json!({ "accessToken": access, "refreshToken": refresh, "user": user }))
                .into_response()
        }
        RegisterShape::Legacy => {
            let access = state.grant_access();
            Json(json!({ "token": access, "user": user })).into_response()
        }
        RegisterShape::Conflict => (
            StatusCode::CONFLICT,
            Json(json!({ "message": "Email already registered" })),
        )
            .into_response(),
    }
}

async fn myself(State(state): State<Shared>, headers: HeaderMap) -> Response {
    state.hit("myself");
    if !state.authorized(&headers) {
        return unauthorized("Full authentication is required");
    }
    Json(state.current_user()).into_response()
}

async fn change_password(
    State(state): State<Shared>,
    headers: HeaderMap,
    Json(body): Json<Value>,
) -> Response {
    state.hit("change-password");
    if !state.authorized(&headers) {
        return unauthorized("Full authentication is required");
    }
    if body["oldPassword"] != GOOD_PASSWORD {
        return (
            StatusCode::BAD_REQUEST,
            Json(json!({ "message": "Old password is incorrect" })),
        )
            .into_response();
    }
    StatusCode::OK.into_response()
}

fn job_json(id: u64) -> Value {
    json!({
        "id": id,
        "title": "Rust backend engineer",
        "description": "<p>Build services</p>",
        "requirements": "3 years of Rust",
        "benefits": "Remote",
        "status": "OPEN",
        "budgetMin": 1000.0,
        "budgetMax": 2500.0,
        "skills": ["rust", "sql"],
        "createdAt": "2024-05-01T10:00:00",
        "location": "Remote",
        "clientName": "Acme",
        "jobApplications": [
            {
                "id": 9, "coverLetter": "Hello", "expectedFee": 1200,
                "estimatedTime": "2 weeks", "status": "PENDING"
            }
        ]
    })
}

async fn list_jobs(State(state): State<Shared>, headers: HeaderMap) -> Response {
    state.hit("jobs");
    if !state.authorized(&headers) {
        return unauthorized("Full authentication is required");
    }
    Json(json!([
        {
            "id": 1, "title": "Rust backend engineer", "status": "OPEN",
            "budgetMin": 1000.0, "budgetMax": 2500.0, "salary": "$1k - $2.5k",
            "skills": ["rust"], "company": "Acme", "location": "Remote"
        },
        { "id": 2, "title": "Frontend developer" }
    ]))
    .into_response()
}

async fn create_job(
    State(state): State<Shared>,
    headers: HeaderMap,
    Json(body): Json<Value>,
) -> Response {
    state.hit("create-job");
    if !state.authorized(&headers) {
        return unauthorized("Full authentication is required");
    }
    let mut job = job_json(3);
    job["title"] = body["title"].clone();
    job["skills"] = body["skills"].clone();
    (StatusCode::CREATED, Json(job)).into_response()
}

async fn job_detail(
    State(state): State<Shared>,
    headers: HeaderMap,
    Path(id): Path<u64>,
) -> Response {
    state.hit("job-detail");
    if !state.authorized(&headers) {
        return unauthorized("Full authentication is required");
    }
    match id {
        1 => Json(job_json(1)).into_response(),
        // Plain-text error body, no message field
        500 => (StatusCode::INTERNAL_SERVER_ERROR, "boom").into_response(),
        _ => (
            StatusCode::NOT_FOUND,
            Json(json!({ "message": "Job not found" })),
        )
            .into_response(),
    }
}

async fn list_skills(State(state): State<Shared>, headers: HeaderMap) -> Response {
    state.hit("skills");
    if !state.authorized(&headers) {
        return unauthorized("Full authentication is required");
    }
    Json(json!([
        { "publicId": "sk-rust", "name": "Rust" },
        { "publicId": "sk-sql", "name": "SQL" }
    ]))
    .into_response()
}

async fn apply_for_job(
    State(state): State<Shared>,
    headers: HeaderMap,
    Path(_id): Path<u64>,
    body: Bytes,
) -> Response {
    state.hit("apply");
    if !state.authorized(&headers) {
        return unauthorized("Full authentication is required");
    }
    let content_type = headers
        .get(header::CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .unwrap_or_default()
        .to_string();
    let body = String::from_utf8_lossy(&body).to_string();
    *state.last_apply.lock().unwrap() = Some((content_type, body));
    StatusCode::OK.into_response()
}

async fn list_applications(
    State(state): State<Shared>,
    headers: HeaderMap,
    Path(_id): Path<u64>,
) -> Response {
    state.hit("applications");
    if !state.authorized(&headers) {
        return unauthorized("Full authentication is required");
    }
    Json(json!([
        {
            "id": 9, "coverLetter": "Hello", "expectedFee": "1200", "estimatedTime": 14,
            "status": "PENDING", "freelancerName": "ana"
        },
        { "id": 10 }
    ]))
    .into_response()
}

/// Running mock backend; the server task stops when this is dropped
pub(crate) struct MockBackend {
    pub(crate) state: Shared,
    pub(crate) base_url: Url,
    task: JoinHandle<()>,
}

impl MockBackend {
    pub(crate) async fn spawn() -> Self {
        let state: Shared = Arc::new(MockState::default());

        let router = Router::new()
            .route("/api/v1/auth/login", post(login))
            .route("/api/v1/auth/refresh-token", post(refresh_token))
            .route("/api/v1/auth/users", post(register))
            .route("/api/v1/auth/myself", get(myself))
            .route("/api/v1/auth/change-password", post(change_password))
            .route("/api/v1/job", get(list_jobs).post(create_job))
            .route("/api/v1/job/skills", get(list_skills))
            .route("/api/v1/job/{id}", get(job_detail))
            .route("/api/v1/job/{id}/apply", post(apply_for_job))
            .route("/api/v1/job/{id}/applications", get(list_applications))
            .with_state(state.clone());

        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let task = tokio::spawn(async move {
            axum::serve(listener, router).await.unwrap();
        });

        Self {
            state,
            base_url: Url::parse(&format!("http://{}/", addr)).unwrap(),
            task,
        }
    }
}

impl Drop for MockBackend {
    fn drop(&mut self) {
        self.task.abort();
    }
}

/// Client pointed at the mock, bypassing any proxy settings
pub(crate) fn client_for(backend: &MockBackend, tokens: Arc<dyn TokenStore>) -> HttpClient {
    HttpClient::new(backend.base_url.clone(), tokens).with_http_client(
        reqwest::Client::builder()
            .no_proxy()
            .build()
            .unwrap(),
    )
}

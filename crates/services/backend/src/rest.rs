//! REST implementation of the backend contracts (Supabase dialect).

use std::sync::RwLock;

use async_trait::async_trait;
use reqwest::header::{AUTHORIZATION, CONTENT_TYPE};
use reqwest::{Client, Method, RequestBuilder, Response, StatusCode};
use serde_json::{json, Value};
use tracing::{debug, warn};

use common::{AppError, AppResult, BackendConfig};

use crate::api::{AuthApi, AuthUser, Filter, Session, SignOutScope, SignUpResponse, Table, TableApi};

const API_KEY_HEADER: &str = "apikey";
const PREFER_HEADER: &str = "Prefer";
const RETURN_REPRESENTATION: &str = "return=representation";

/// HTTP client for the hosted auth and table services.
pub struct RestBackend {
    client: Client,
    base_url: String,
    anon_key: String,
    access_token: RwLock<Option<String>>,
}

impl RestBackend {
    /// Create a client for the configured project.
    pub fn new(config: &BackendConfig) -> AppResult<Self> {
        if config.url.trim().is_empty() {
            return Err(AppError::config("Backend URL is empty"));
        }
        if config.anon_key.trim().is_empty() {
            return Err(AppError::config("Backend API key is empty"));
        }

        let client = Client::builder()
            .timeout(config.request_timeout())
            .build()
            .map_err(|e| AppError::config(e.to_string()))?;

        Ok(Self {
            client,
            base_url: config.url.trim_end_matches('/').to_string(),
            anon_key: config.anon_key.clone(),
            access_token: RwLock::new(None),
        })
    }

    fn auth_url(&self, path: &str) -> String {
        format!("{}/auth/v1/{}", self.base_url, path)
    }

    fn table_url(&self, table: Table) -> String {
        format!("{}/rest/v1/{}", self.base_url, table.name())
    }

    /// Bearer token for table requests: the session token, else the public key
    fn bearer(&self) -> String {
        self.access_token
            .read()
            .ok()
            .and_then(|guard| guard.clone())
            .unwrap_or_else(|| self.anon_key.clone())
    }

    fn request(&self, method: Method, url: String, bearer: &str) -> RequestBuilder {
        self.client
            .request(method, url)
            .header(API_KEY_HEADER, &self.anon_key)
            .header(AUTHORIZATION, format!("Bearer {}", bearer))
    }

    fn table_request(&self, method: Method, table: Table, filter: &Filter) -> RequestBuilder {
        let query: Vec<(String, String)> = filter
            .constraints()
            .iter()
            .map(|(column, value)| (column.clone(), format!("eq.{}", value)))
            .collect();

        self.request(method, self.table_url(table), &self.bearer())
            .query(&query)
    }

    async fn send_json(&self, builder: RequestBuilder) -> AppResult<Value> {
        let response = builder.send().await?;
        let response = check(response).await?;

        let text = response.text().await?;
        if text.trim().is_empty() {
            return Ok(Value::Null);
        }
        Ok(serde_json::from_str(&text)?)
    }

    async fn send_rows(&self, builder: RequestBuilder) -> AppResult<Vec<Value>> {
        match self.send_json(builder).await? {
            Value::Array(rows) => Ok(rows),
            Value::Null => Ok(Vec::new()),
            other => Ok(vec![other]),
        }
    }
}

/// Turn a non-success response into a normalized error.
async fn check(response: Response) -> AppResult<Response> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }

    let body = response.text().await.unwrap_or_default();
    let err = normalize_error(status, &body);
    warn!(status = status.as_u16(), code = err.code(), "Backend request failed");
    Err(err)
}

/// Map a remote error response onto the uniform error type.
pub fn normalize_error(status: StatusCode, body: &str) -> AppError {
    let parsed: Value = serde_json::from_str(body).unwrap_or(Value::Null);
    let message = ["message", "msg", "error_description", "error"]
        .iter()
        .find_map(|field| parsed.get(*field).and_then(Value::as_str))
        .map(str::to_string)
        .unwrap_or_else(|| {
            if body.trim().is_empty() {
                status.canonical_reason().unwrap_or("Unknown error").to_string()
            } else {
                body.trim().to_string()
            }
        });

    let error_code = parsed
        .get("error_code")
        .or_else(|| parsed.get("error"))
        .and_then(Value::as_str)
        .unwrap_or_default();

    match status {
        StatusCode::BAD_REQUEST
            if matches!(error_code, "refresh_token_not_found" | "refresh_token_already_used") =>
        {
            AppError::SessionExpired
        }
        StatusCode::BAD_REQUEST
            if matches!(error_code, "invalid_grant" | "invalid_credentials") =>
        {
            if message.to_lowercase().contains("refresh token") {
                AppError::SessionExpired
            } else {
                AppError::InvalidCredentials
            }
        }
        StatusCode::BAD_REQUEST => AppError::BadRequest(message),
        StatusCode::UNAUTHORIZED => {
            let lowered = message.to_lowercase();
            if lowered.contains("expired") || error_code == "session_expired" {
                AppError::SessionExpired
            } else {
                AppError::Unauthorized
            }
        }
        StatusCode::FORBIDDEN => AppError::Forbidden,
        StatusCode::NOT_FOUND => AppError::NotFound,
        StatusCode::CONFLICT => AppError::Conflict(message),
        StatusCode::UNPROCESSABLE_ENTITY => AppError::Validation(message),
        s if s.is_server_error() => AppError::ServiceUnavailable(message),
        s => AppError::remote(s.as_u16(), message),
    }
}

/// Parse a sign-up response: a session when confirmation is off, a bare user otherwise.
fn parse_sign_up(body: Value) -> AppResult<SignUpResponse> {
    if body.get("access_token").is_some() {
        let session: Session = serde_json::from_value(body)?;
        return Ok(SignUpResponse {
            user: session.user.clone(),
            session: Some(session),
        });
    }

    let user_value = body.get("user").cloned().unwrap_or(body);
    let user: AuthUser = serde_json::from_value(user_value)?;
    Ok(SignUpResponse { user, session: None })
}

// =============================================================================
// Auth Service
// =============================================================================

#[async_trait]
impl AuthApi for RestBackend {
    async fn sign_up(&self, email: &str, password: &str, metadata: Value) -> AppResult<SignUpResponse> {
        debug!("Signing up {}", email);
        let builder = self
            .request(Method::POST, self.auth_url("signup"), &self.anon_key)
            .header(CONTENT_TYPE, "application/json")
            .json(&json!({ "email": email, "password": password, "data": metadata }));

        parse_sign_up(self.send_json(builder).await?)
    }

    async fn sign_in_with_password(&self, email: &str, password: &str) -> AppResult<Session> {
        debug!("Signing in {}", email);
        let builder = self
            .request(Method::POST, self.auth_url("token"), &self.anon_key)
            .query(&[("grant_type", "password")])
            .json(&json!({ "email": email, "password": password }));

        Ok(serde_json::from_value(self.send_json(builder).await?)?)
    }

    async fn sign_out(&self, access_token: &str, scope: SignOutScope) -> AppResult<()> {
        let builder = self
            .request(Method::POST, self.auth_url("logout"), access_token)
            .query(&[("scope", scope.as_str())]);

        self.send_json(builder).await?;
        Ok(())
    }

    async fn get_user(&self, access_token: &str) -> AppResult<AuthUser> {
        let builder = self.request(Method::GET, self.auth_url("user"), access_token);
        Ok(serde_json::from_value(self.send_json(builder).await?)?)
    }

    async fn refresh_session(&self, refresh_token: &str) -> AppResult<Session> {
        let builder = self
            .request(Method::POST, self.auth_url("token"), &self.anon_key)
            .query(&[("grant_type", "refresh_token")])
            .json(&json!({ "refresh_token": refresh_token }));

        Ok(serde_json::from_value(self.send_json(builder).await?)?)
    }
}

// =============================================================================
// Table Service
// =============================================================================

#[async_trait]
impl TableApi for RestBackend {
    async fn select(&self, table: Table, filter: &Filter) -> AppResult<Vec<Value>> {
        debug!(table = table.name(), "select");
        let builder = self
            .table_request(Method::GET, table, filter)
            .query(&[("select", "*")]);

        self.send_rows(builder).await
    }

    async fn insert(&self, table: Table, row: Value) -> AppResult<Value> {
        debug!(table = table.name(), "insert");
        let builder = self
            .request(Method::POST, self.table_url(table), &self.bearer())
            .header(PREFER_HEADER, RETURN_REPRESENTATION)
            .json(&row);

        self.send_rows(builder)
            .await?
            .into_iter()
            .next()
            .ok_or_else(|| AppError::internal(format!("Insert into {} returned no row", table)))
    }

    async fn update(&self, table: Table, filter: &Filter, patch: Value) -> AppResult<Vec<Value>> {
        debug!(table = table.name(), "update");
        let builder = self
            .table_request(Method::PATCH, table, filter)
            .header(PREFER_HEADER, RETURN_REPRESENTATION)
            .json(&patch);

        self.send_rows(builder).await
    }

    async fn delete(&self, table: Table, filter: &Filter) -> AppResult<Vec<Value>> {
        debug!(table = table.name(), "delete");
        let builder = self
            .table_request(Method::DELETE, table, filter)
            .header(PREFER_HEADER, RETURN_REPRESENTATION);

        self.send_rows(builder).await
    }

    fn set_access_token(&self, token: Option<String>) {
        if let Ok(mut guard) = self.access_token.write() {
            *guard = token;
        }
    }
}

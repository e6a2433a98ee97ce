//! Session details, token refresh and global sign-out.

use axum::{
    extract::State,
    response::{Json, Response},
    routing::{get, post},
    Router,
};
use chrono::{DateTime, TimeZone, Utc};
use serde::Serialize;
use tracing::{info, warn};
use utoipa::ToSchema;

use backend_client::Session;
use common::{AppError, AppResult};

use crate::middleware::sign_in_redirect;
use crate::state::AppState;

#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct SessionInfo {
    pub user_id: String,
    pub email: Option<String>,
    pub token_type: String,
    pub expires_at: Option<DateTime<Utc>>,
    /// Seconds until the access token expires
    pub expires_in: Option<i64>,
    pub email_confirmed: bool,
}

impl SessionInfo {
    pub fn from_session(session: &Session, now: DateTime<Utc>) -> Self {
        let expires_at = session
            .expires_at
            .and_then(|secs| Utc.timestamp_opt(secs, 0).single());
        Self {
            user_id: session.user.id.clone(),
            email: session.user.email.clone(),
            token_type: session.token_type.clone(),
            expires_at,
            expires_in: expires_at.map(|at| (at - now).num_seconds().max(0)),
            email_confirmed: session.user.email_confirmed_at.is_some(),
        }
    }
}

#[derive(Debug, Serialize, ToSchema)]
pub struct SecurityView {
    pub session: SessionInfo,
    pub two_factor_enabled: bool,
}

/// Create security routes
pub fn security_routes() -> Router<AppState> {
    Router::new()
        .route("/", get(security))
        .route("/refresh", post(refresh))
        .route("/signout-everywhere", post(sign_out_everywhere))
}

fn current(state: &AppState) -> AppResult<Session> {
    state.session.current_session().ok_or(AppError::Unauthorized)
}

/// Current session details
#[utoipa::path(
    get,
    path = "/security",
    tag = "Security",
    responses(
        (status = 200, description = "Session details", body = SecurityView),
        (status = 303, description = "Not signed in")
    )
)]
pub async fn security(State(state): State<AppState>) -> AppResult<Json<SecurityView>> {
    let session = current(&state)?;
    Ok(Json(SecurityView {
        session: SessionInfo::from_session(&session, Utc::now()),
        two_factor_enabled: false,
    }))
}

/// Exchange the refresh token for a new session
#[utoipa::path(
    post,
    path = "/security/refresh",
    tag = "Security",
    responses(
        (status = 200, description = "Session refreshed", body = SessionInfo),
        (status = 401, description = "Session expired")
    )
)]
pub async fn refresh(State(state): State<AppState>) -> AppResult<Json<SessionInfo>> {
    let session = state.session.refresh().await?;
    info!(user_id = %session.user.id, "Session refreshed on request");
    state
        .toasts
        .success("Session refreshed", "Your sign-in was extended");
    Ok(Json(SessionInfo::from_session(&session, Utc::now())))
}

/// End the session and return to the sign-in page
#[utoipa::path(
    post,
    path = "/security/signout-everywhere",
    tag = "Security",
    responses((status = 303, description = "Signed out, redirected to sign-in"))
)]
pub async fn sign_out_everywhere(State(state): State<AppState>) -> Response {
    if let Err(err) = state.session.sign_out().await {
        warn!(code = err.code(), "Global sign-out failed; signed out locally");
        state
            .toasts
            .error("Could not sign out other devices", err.user_message());
    }
    sign_in_redirect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_session_info_converts_unix_expiry() {
        let session: Session = serde_json::from_value(json!({
            "access_token": "token",
            "expires_in": 3600,
            "expires_at": 1_700_003_600,
            "refresh_token": "refresh",
            "user": { "id": "admin-1", "email": "admin@market.test" }
        }))
        .unwrap();
        let now = Utc.timestamp_opt(1_700_000_000, 0).unwrap();

        let info = SessionInfo::from_session(&session, now);
        assert_eq!(info.expires_in, Some(3600));
        assert_eq!(info.token_type, "bearer");
        assert!(!info.email_confirmed);
    }
}

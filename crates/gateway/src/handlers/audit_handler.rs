//! Audit log and notification center.

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::Json,
    routing::{delete, get},
    Router,
};
use serde::{Deserialize, Serialize};
use utoipa::{IntoParams, ToSchema};

use common::{AppError, AppResult};
use workflow::{AuditEntity, AuditEntry, Toast, AUDIT_CAPACITY};

use crate::state::AppState;

const DEFAULT_LIMIT: usize = 50;

#[derive(Debug, Default, Deserialize, IntoParams)]
pub struct AuditQuery {
    /// Entries to return, newest first
    pub limit: Option<usize>,
    /// `seller`, `product`, `category` or `profile`
    pub entity: Option<AuditEntity>,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct AuditLogView {
    pub total: usize,
    pub entries: Vec<AuditEntry>,
}

/// Create audit log and notification routes
pub fn audit_routes() -> Router<AppState> {
    Router::new()
        .route("/audit-logs", get(audit_logs))
        .route("/notifications", get(notifications).delete(clear_notifications))
        .route("/notifications/:id", delete(dismiss_notification))
}

/// Admin actions, newest first
#[utoipa::path(
    get,
    path = "/audit-logs",
    tag = "Audit",
    params(AuditQuery),
    responses((status = 200, description = "Audit entries", body = AuditLogView))
)]
pub async fn audit_logs(
    State(state): State<AppState>,
    Query(query): Query<AuditQuery>,
) -> Json<AuditLogView> {
    let limit = query.limit.unwrap_or(DEFAULT_LIMIT).min(AUDIT_CAPACITY);
    let entries: Vec<AuditEntry> = state
        .audit
        .list(AUDIT_CAPACITY)
        .into_iter()
        .filter(|e| query.entity.map_or(true, |entity| e.entity == entity))
        .take(limit)
        .collect();

    Json(AuditLogView {
        total: state.audit.len(),
        entries,
    })
}

/// Pending notifications, newest first
#[utoipa::path(
    get,
    path = "/notifications",
    tag = "Audit",
    responses((status = 200, description = "Notifications", body = [Toast]))
)]
pub async fn notifications(State(state): State<AppState>) -> Json<Vec<Toast>> {
    Json(state.toasts.list())
}

/// Dismiss every notification
#[utoipa::path(
    delete,
    path = "/notifications",
    tag = "Audit",
    responses((status = 204, description = "Notifications cleared"))
)]
pub async fn clear_notifications(State(state): State<AppState>) -> StatusCode {
    state.toasts.clear();
    StatusCode::NO_CONTENT
}

/// Dismiss one notification
#[utoipa::path(
    delete,
    path = "/notifications/{id}",
    tag = "Audit",
    params(("id" = u64, Path, description = "Notification ID")),
    responses(
        (status = 204, description = "Notification dismissed"),
        (status = 404, description = "Already dismissed")
    )
)]
pub async fn dismiss_notification(
    State(state): State<AppState>,
    Path(id): Path<u64>,
) -> AppResult<StatusCode> {
    if state.toasts.dismiss(id) {
        Ok(StatusCode::NO_CONTENT)
    } else {
        Err(AppError::NotFound)
    }
}

//! Account overview and profile editing.

use axum::{
    extract::{Extension, State},
    response::Json,
    routing::get,
    Router,
};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::warn;
use utoipa::ToSchema;
use validator::Validate;

use common::{AppError, AppResult};
use data_access::keys;
use domain::{Profile, ProfileUpdate, UserRole};
use session::CurrentUser;
use workflow::{Actor, AuditEntity, AuditRecord};

use crate::extractors::ValidatedJson;
use crate::state::AppState;
use crate::view::{resolve, View};

const ROUTE_ACCOUNT: &str = "/account";
const ROUTE_PROFILE: &str = "/profile";

#[derive(Debug, Serialize, ToSchema)]
pub struct AccountView {
    pub user_id: String,
    pub email: Option<String>,
    pub display_name: String,
    pub role: UserRole,
    pub is_admin: bool,
    pub member_since: Option<DateTime<Utc>>,
    /// `None` when the profile row could not be read
    pub profile: Option<Profile>,
}

impl From<&CurrentUser> for AccountView {
    fn from(current: &CurrentUser) -> Self {
        Self {
            user_id: current.id().to_string(),
            email: current.user.email.clone(),
            display_name: current.display_name(),
            role: current
                .profile
                .as_ref()
                .map(|p| p.role)
                .unwrap_or_default(),
            is_admin: current.is_admin(),
            member_since: current.user.created_at,
            profile: current.profile.clone(),
        }
    }
}

/// Profile form; absent fields are left unchanged
#[derive(Debug, Deserialize, Validate, ToSchema)]
pub struct UpdateProfileRequest {
    #[validate(length(min = 3, max = 32, message = "Username must be 3 to 32 characters"))]
    pub username: Option<String>,
    #[validate(length(min = 1, max = 100, message = "Full name must be 1 to 100 characters"))]
    pub full_name: Option<String>,
    #[validate(url(message = "Avatar must be a valid URL"))]
    pub avatar_url: Option<String>,
    #[validate(length(max = 32, message = "Phone must be at most 32 characters"))]
    pub phone: Option<String>,
    #[validate(length(max = 500, message = "Bio must be at most 500 characters"))]
    pub bio: Option<String>,
    #[validate(length(max = 100, message = "Store name must be at most 100 characters"))]
    pub store_name: Option<String>,
}

impl From<UpdateProfileRequest> for ProfileUpdate {
    fn from(request: UpdateProfileRequest) -> Self {
        let trim = |value: Option<String>| value.map(|v| v.trim().to_string());
        Self {
            username: trim(request.username),
            full_name: trim(request.full_name),
            avatar_url: trim(request.avatar_url),
            phone: trim(request.phone),
            bio: trim(request.bio),
            store_name: trim(request.store_name),
        }
    }
}

/// Create account and profile routes
pub fn account_routes() -> Router<AppState> {
    Router::new()
        .route(ROUTE_ACCOUNT, get(account))
        .route(ROUTE_PROFILE, get(get_profile).put(update_profile))
}

/// Signed-in admin with profile
#[utoipa::path(
    get,
    path = "/account",
    tag = "Account",
    responses(
        (status = 200, description = "Current account", body = AccountView),
        (status = 303, description = "Not signed in")
    )
)]
pub async fn account(State(state): State<AppState>) -> View<AccountView> {
    let result = resolve(
        state.config.view_loading_timeout(),
        state.session.current_user_query(&state.cache),
    )
    .await
    .and_then(|current| {
        (*current)
            .as_ref()
            .map(AccountView::from)
            .ok_or_else(|| AppError::Unauthorized.into())
    });
    View::render(result, ROUTE_ACCOUNT, ROUTE_ACCOUNT)
}

/// Profile of the signed-in admin
#[utoipa::path(
    get,
    path = "/profile",
    tag = "Account",
    responses(
        (status = 200, description = "Profile", body = Profile),
        (status = 404, description = "No profile row")
    )
)]
pub async fn get_profile(
    State(state): State<AppState>,
    Extension(actor): Extension<Actor>,
) -> View<Profile> {
    let result = resolve(state.config.view_loading_timeout(), state.queries.profile(&actor.id))
        .await
        .map(|profile| (*profile).clone());
    View::render(result, ROUTE_PROFILE, ROUTE_ACCOUNT)
}

/// Update the signed-in admin's profile
#[utoipa::path(
    put,
    path = "/profile",
    tag = "Account",
    request_body = UpdateProfileRequest,
    responses(
        (status = 200, description = "Profile updated", body = Profile),
        (status = 400, description = "Invalid input")
    )
)]
pub async fn update_profile(
    State(state): State<AppState>,
    Extension(actor): Extension<Actor>,
    ValidatedJson(request): ValidatedJson<UpdateProfileRequest>,
) -> AppResult<Json<Profile>> {
    let changes = ProfileUpdate::from(request);
    let repo = state.queries.repositories().profiles.clone();
    let id = actor.id.clone();

    let result = state
        .cache
        .mutate(
            async move { repo.update(&id, changes).await },
            keys::profile_change(&actor.id),
        )
        .await;

    match result {
        Ok(profile) => {
            state
                .toasts
                .success("Profile updated", "Your changes have been saved");
            state.audit.record(
                &actor,
                AuditRecord {
                    entity: AuditEntity::Profile,
                    subject_id: profile.id.clone(),
                    subject_label: profile.display_name().to_string(),
                    action: "update".to_string(),
                    from_status: None,
                    to_status: None,
                    remarks: None,
                },
            );
            Ok(Json(profile))
        }
        Err(err) => {
            warn!(code = err.code(), "Profile update failed");
            state
                .toasts
                .error("Could not update profile", err.user_message());
            Err(err)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_request_fields_are_trimmed() {
        let request = UpdateProfileRequest {
            username: None,
            full_name: Some("  Demo Admin ".to_string()),
            avatar_url: None,
            phone: None,
            bio: None,
            store_name: None,
        };

        let changes = ProfileUpdate::from(request);
        assert_eq!(changes.full_name.as_deref(), Some("Demo Admin"));
        assert!(changes.username.is_none());
        assert!(!changes.is_empty());
    }

    #[test]
    fn test_short_username_rejected() {
        let request: UpdateProfileRequest =
            serde_json::from_value(serde_json::json!({ "username": "ab" })).unwrap();
        assert!(request.validate().is_err());
    }
}

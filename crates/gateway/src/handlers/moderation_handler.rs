//! Moderation dialog endpoints shared by the seller and product pages.
//!
//! | Method | Path | Step |
//! |---|---|---|
//! | POST | `/:id/actions` | open the dialog for an action |
//! | GET | `/dialog` | current dialog |
//! | PUT | `/dialog/reason` | edit the rejection reason |
//! | POST | `/dialog/confirm` | run the action |
//! | DELETE | `/dialog` | cancel |

use axum::{
    extract::{Path, State},
    response::Json,
    routing::{get, post, put},
    Router,
};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use common::AppResult;
use domain::{ModerationAction, WorkflowStatus};
use workflow::{
    DialogView, ModerationBackend, Origin, Outcome, ProductModeration, SellerModeration,
    VerificationController,
};

use crate::context::AppContext;
use crate::state::AppState;

/// A moderation backend with its controller in the application context
pub trait Moderated: ModerationBackend + Sized {
    fn controller(context: &AppContext) -> &VerificationController<Self>;
}

impl Moderated for SellerModeration {
    fn controller(context: &AppContext) -> &VerificationController<Self> {
        &context.sellers
    }
}

impl Moderated for ProductModeration {
    fn controller(context: &AppContext) -> &VerificationController<Self> {
        &context.products
    }
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct ActionRequest {
    /// `approve`, `reject`, `suspend` (or `flag`) or `delete`
    pub action: ModerationAction,
    /// Page the dialog was opened from
    #[serde(default)]
    pub origin: Origin,
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct ReasonRequest {
    pub reason: String,
}

/// Result of a confirmed action
#[derive(Debug, Serialize, ToSchema)]
pub struct ConfirmResponse {
    pub action: ModerationAction,
    pub subject_id: String,
    /// New status; absent after a delete
    pub status: Option<String>,
    pub message: String,
    pub navigate_to: Option<String>,
}

impl<S: WorkflowStatus> From<Outcome<S>> for ConfirmResponse {
    fn from(outcome: Outcome<S>) -> Self {
        Self {
            action: outcome.action,
            subject_id: outcome.subject_id,
            status: outcome.status.map(|s| s.as_str().to_string()),
            message: outcome.message,
            navigate_to: outcome.navigate_to,
        }
    }
}

/// Dialog routes for one moderated record type
pub fn moderation_routes<B: Moderated>() -> Router<AppState> {
    Router::new()
        .route("/:id/actions", post(open_dialog::<B>))
        .route("/dialog", get(current_dialog::<B>).delete(cancel_dialog::<B>))
        .route("/dialog/reason", put(set_reason::<B>))
        .route("/dialog/confirm", post(confirm::<B>))
}

pub async fn open_dialog<B: Moderated>(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Json(request): Json<ActionRequest>,
) -> AppResult<Json<DialogView>> {
    let controller = B::controller(&state);
    controller
        .request_by_id(&id, request.action, request.origin)
        .await?;
    Ok(Json(controller.dialog_view()))
}

pub async fn current_dialog<B: Moderated>(State(state): State<AppState>) -> Json<DialogView> {
    Json(B::controller(&state).dialog_view())
}

pub async fn set_reason<B: Moderated>(
    State(state): State<AppState>,
    Json(request): Json<ReasonRequest>,
) -> AppResult<Json<DialogView>> {
    let controller = B::controller(&state);
    controller.set_reason(&request.reason)?;
    Ok(Json(controller.dialog_view()))
}

pub async fn cancel_dialog<B: Moderated>(
    State(state): State<AppState>,
) -> AppResult<Json<DialogView>> {
    let controller = B::controller(&state);
    controller.cancel()?;
    Ok(Json(controller.dialog_view()))
}

pub async fn confirm<B: Moderated>(
    State(state): State<AppState>,
) -> AppResult<Json<ConfirmResponse>> {
    let outcome = B::controller(&state).confirm().await?;
    Ok(Json(outcome.into()))
}

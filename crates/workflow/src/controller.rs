//! Verification workflow controller.
//!
//! # Flow
//!
//! 1. [`request`](VerificationController::request) checks the action against
//!    the subject's status and opens a confirmation dialog, or a reason dialog
//!    for rejections.
//! 2. [`cancel`](VerificationController::cancel) closes it without a remote call.
//! 3. [`confirm`](VerificationController::confirm) runs the write exactly once,
//!    then notifies, invalidates the affected queries, records an audit entry
//!    and closes the dialog. On failure the dialog stays open for a retry and
//!    the cache is left alone.
//!
//! Only one submission runs at a time; a second confirm while one is in
//! flight fails with [`AppError::InFlight`] and makes no remote call.

use std::sync::{Arc, Mutex, MutexGuard};

use chrono::Utc;
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use common::{AppError, AppResult};
use domain::workflow::validate_reason;
use domain::{available_actions, plan, EntityKind, ModerationAction, Review, Transition, WorkflowStatus};
use query_cache::QueryCache;

use crate::actor::{Actor, ActorSource};
use crate::audit::{AuditRecord, AuditTrail};
use crate::moderation::ModerationBackend;
use crate::notify::ToastQueue;

/// Where the dialog was opened from
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "openapi", derive(utoipa::ToSchema))]
#[serde(rename_all = "lowercase")]
pub enum Origin {
    #[default]
    List,
    /// Detail views return to the list after a successful action
    Detail,
}

/// Open confirmation step
#[derive(Debug, Clone, PartialEq)]
pub enum Dialog<T> {
    Closed,
    Confirm {
        action: ModerationAction,
        subject: T,
        origin: Origin,
    },
    Reject {
        subject: T,
        reason: String,
        origin: Origin,
    },
}

/// Serializable description of the dialog
#[derive(Debug, Clone, PartialEq, Serialize)]
#[cfg_attr(feature = "openapi", derive(utoipa::ToSchema))]
pub struct DialogView {
    /// `closed`, `confirm` or `reject`
    pub kind: String,
    pub action: Option<ModerationAction>,
    pub title: Option<String>,
    pub message: Option<String>,
    pub confirm_label: Option<String>,
    pub subject_id: Option<String>,
    pub reason: Option<String>,
    pub can_confirm: bool,
    pub submitting: bool,
}

/// Result of a confirmed action
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Outcome<S> {
    pub action: ModerationAction,
    pub subject_id: String,
    /// New status; `None` after a delete
    pub status: Option<S>,
    pub message: String,
    /// Route to navigate to, set when the dialog came from a detail view
    pub navigate_to: Option<String>,
}

struct State<T> {
    dialog: Dialog<T>,
    submitting: bool,
}

struct Submission<B: ModerationBackend> {
    actor: Actor,
    subject: B::Subject,
    transition: Transition<B::Status>,
    review: Option<Review<B::Status>>,
    origin: Origin,
}

struct Inner<B: ModerationBackend> {
    backend: Arc<B>,
    cache: QueryCache,
    actors: Arc<dyn ActorSource>,
    toasts: ToastQueue,
    audit: AuditTrail,
    state: Mutex<State<B::Subject>>,
}

/// Moderation state machine for one record type.
pub struct VerificationController<B: ModerationBackend> {
    inner: Arc<Inner<B>>,
}

impl<B: ModerationBackend> Clone for VerificationController<B> {
    fn clone(&self) -> Self {
        Self {
            inner: self.inner.clone(),
        }
    }
}

fn kind_of<B: ModerationBackend>() -> EntityKind {
    <B::Status as WorkflowStatus>::KIND
}

impl<B: ModerationBackend> VerificationController<B> {
    /// Create new controller with a closed dialog
    pub fn new(
        backend: B,
        cache: QueryCache,
        actors: Arc<dyn ActorSource>,
        toasts: ToastQueue,
        audit: AuditTrail,
    ) -> Self {
        Self {
            inner: Arc::new(Inner {
                backend: Arc::new(backend),
                cache,
                actors,
                toasts,
                audit,
                state: Mutex::new(State {
                    dialog: Dialog::Closed,
                    submitting: false,
                }),
            }),
        }
    }

    fn state(&self) -> MutexGuard<'_, State<B::Subject>> {
        self.inner.state.lock().unwrap_or_else(|p| p.into_inner())
    }

    pub fn kind(&self) -> EntityKind {
        kind_of::<B>()
    }

    /// Actions offered for a subject in its current status
    pub fn available_actions(&self, subject: &B::Subject) -> Vec<ModerationAction> {
        available_actions(B::status_of(subject))
    }

    pub fn dialog(&self) -> Dialog<B::Subject> {
        self.state().dialog.clone()
    }

    pub fn is_submitting(&self) -> bool {
        self.state().submitting
    }

    /// Whether the confirm control is enabled
    pub fn can_confirm(&self) -> bool {
        let state = self.state();
        !state.submitting
            && match &state.dialog {
                Dialog::Closed => false,
                Dialog::Confirm { .. } => true,
                Dialog::Reject { reason, .. } => !reason.trim().is_empty(),
            }
    }

    pub fn dialog_view(&self) -> DialogView {
        let can_confirm = self.can_confirm();
        let state = self.state();
        let kind = self.kind();

        let closed = DialogView {
            kind: "closed".to_string(),
            action: None,
            title: None,
            message: None,
            confirm_label: None,
            subject_id: None,
            reason: None,
            can_confirm,
            submitting: state.submitting,
        };

        match &state.dialog {
            Dialog::Closed => closed,
            Dialog::Confirm { action, subject, .. } => {
                let label = B::label_of(subject);
                let message = if *action == ModerationAction::Delete {
                    format!("Delete {}? This cannot be undone.", label)
                } else {
                    format!("Are you sure you want to {} {}?", action.verb(kind), label)
                };
                DialogView {
                    kind: "confirm".to_string(),
                    action: Some(*action),
                    title: Some(format!("{} {}", action.label(kind), kind.noun())),
                    message: Some(message),
                    confirm_label: Some(action.label(kind).to_string()),
                    subject_id: Some(B::id_of(subject).to_string()),
                    ..closed
                }
            }
            Dialog::Reject { subject, reason, .. } => DialogView {
                kind: "reject".to_string(),
                action: Some(ModerationAction::Reject),
                title: Some(format!("Reject {}", kind.noun())),
                message: Some(format!("Give a reason for rejecting {}.", B::label_of(subject))),
                confirm_label: Some(ModerationAction::Reject.label(kind).to_string()),
                subject_id: Some(B::id_of(subject).to_string()),
                reason: Some(reason.clone()),
                ..closed
            },
        }
    }

    // =========================================================================
    // Dialog
    // =========================================================================

    /// Open the dialog for `action` on `subject`
    pub fn request(
        &self,
        action: ModerationAction,
        subject: B::Subject,
        origin: Origin,
    ) -> AppResult<Dialog<B::Subject>> {
        let mut state = self.state();
        if state.submitting {
            return Err(AppError::InFlight);
        }

        plan(B::status_of(&subject), action)?;

        state.dialog = if action.requires_reason() {
            Dialog::Reject {
                subject,
                reason: String::new(),
                origin,
            }
        } else {
            Dialog::Confirm {
                action,
                subject,
                origin,
            }
        };
        Ok(state.dialog.clone())
    }

    /// Load the subject by id, then open the dialog
    pub async fn request_by_id(
        &self,
        id: &str,
        action: ModerationAction,
        origin: Origin,
    ) -> AppResult<Dialog<B::Subject>> {
        if self.is_submitting() {
            return Err(AppError::InFlight);
        }
        let subject = self.inner.backend.load(id).await?;
        self.request(action, subject, origin)
    }

    /// Update the reason of an open rejection dialog
    pub fn set_reason(&self, reason: &str) -> AppResult<()> {
        let mut state = self.state();
        if state.submitting {
            return Err(AppError::InFlight);
        }
        match &mut state.dialog {
            Dialog::Reject { reason: current, .. } => {
                *current = reason.to_string();
                Ok(())
            }
            _ => Err(AppError::bad_request("No rejection dialog is open")),
        }
    }

    /// Close the dialog without any remote call
    pub fn cancel(&self) -> AppResult<()> {
        let mut state = self.state();
        if state.submitting {
            return Err(AppError::InFlight);
        }
        state.dialog = Dialog::Closed;
        Ok(())
    }

    // =========================================================================
    // Submission
    // =========================================================================

    /// Run the confirmed action.
    ///
    /// The submission runs on its own task: if the caller goes away the
    /// write still completes and its notification, invalidation and audit
    /// entry still apply.
    pub async fn confirm(&self) -> AppResult<Outcome<B::Status>> {
        let submission = self.prepare()?;

        let controller = self.clone();
        let handle = tokio::spawn(async move { controller.submit(submission).await });

        match handle.await {
            Ok(result) => result,
            Err(err) => {
                self.state().submitting = false;
                Err(AppError::internal(format!("Submission task failed: {}", err)))
            }
        }
    }

    /// Validate the open dialog and claim the in-flight slot
    fn prepare(&self) -> AppResult<Submission<B>> {
        let mut state = self.state();
        if state.submitting {
            return Err(AppError::InFlight);
        }

        let (action, subject, origin, reason) = match &state.dialog {
            Dialog::Closed => return Err(AppError::bad_request("No action is awaiting confirmation")),
            Dialog::Confirm {
                action,
                subject,
                origin,
            } => (*action, subject.clone(), *origin, None),
            Dialog::Reject {
                subject,
                reason,
                origin,
            } => (
                ModerationAction::Reject,
                subject.clone(),
                *origin,
                Some(validate_reason(reason)?),
            ),
        };

        let actor = self.inner.actors.current_admin().ok_or(AppError::Unauthorized)?;
        let transition = plan(B::status_of(&subject), action)?;
        let review = transition.review(&actor.id, Utc::now(), reason.as_deref())?;

        state.submitting = true;
        Ok(Submission {
            actor,
            subject,
            transition,
            review,
            origin,
        })
    }

    async fn submit(&self, submission: Submission<B>) -> AppResult<Outcome<B::Status>> {
        let Submission {
            actor,
            subject,
            transition,
            review,
            origin,
        } = submission;
        let kind = self.kind();
        let label = B::label_of(&subject);
        let id = B::id_of(&subject).to_string();
        let remarks = review.as_ref().and_then(|r| r.remarks.clone());

        let backend = self.inner.backend.clone();
        let target = subject.clone();
        let result = self
            .inner
            .cache
            .mutate(
                async move { backend.apply(&target, &transition, review).await },
                B::invalidation_keys(&subject, &transition),
            )
            .await;

        let mut state = self.state();
        state.submitting = false;

        let action = transition.action;
        match result {
            Ok(()) => {
                state.dialog = Dialog::Closed;
                drop(state);

                let message = match transition.to {
                    Some(to) => format!("{} is now {}", label, to.badge().label),
                    None => format!("{} was deleted", label),
                };
                self.inner.toasts.success(
                    format!("{} {}", kind.title(), action.past_tense(kind).to_lowercase()),
                    message.clone(),
                );
                self.inner.audit.record(
                    &actor,
                    AuditRecord {
                        entity: kind.into(),
                        subject_id: id.clone(),
                        subject_label: label,
                        action: action.verb(kind).to_string(),
                        from_status: Some(transition.from.as_str().to_string()),
                        to_status: transition.to.map(|s| s.as_str().to_string()),
                        remarks,
                    },
                );
                info!(
                    entity = %kind,
                    subject = %id,
                    action = %action,
                    actor = %actor.id,
                    "Moderation action applied"
                );

                Ok(Outcome {
                    action,
                    subject_id: id,
                    status: transition.to,
                    message,
                    navigate_to: (origin == Origin::Detail).then(|| B::list_route().to_string()),
                })
            }
            Err(err) => {
                drop(state);
                warn!(entity = %kind, subject = %id, action = %action, code = err.code(), "Moderation action failed");
                self.inner.toasts.error(
                    format!("Could not {} {}", action.verb(kind), kind.noun()),
                    err.user_message(),
                );
                self.inner.actors.report_error(&err);
                Err(err)
            }
        }
    }
}

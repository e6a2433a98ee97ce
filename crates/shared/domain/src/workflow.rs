//! Moderation transitions shared by the seller and product workflows.

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::{DomainError, DomainResult};
use crate::status::{EntityKind, WorkflowStatus};

/// Admin action on a seller or product.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[cfg_attr(feature = "openapi", derive(utoipa::ToSchema))]
#[serde(rename_all = "lowercase")]
pub enum ModerationAction {
    Approve,
    Reject,
    /// Moves the subject to its held status. Products call this flagging.
    #[serde(alias = "flag")]
    Suspend,
    Delete,
}

impl ModerationAction {
    pub const ALL: [ModerationAction; 4] = [
        ModerationAction::Approve,
        ModerationAction::Reject,
        ModerationAction::Suspend,
        ModerationAction::Delete,
    ];

    /// Wire value of the action
    pub fn as_str(&self) -> &'static str {
        match self {
            ModerationAction::Approve => "approve",
            ModerationAction::Reject => "reject",
            ModerationAction::Suspend => "suspend",
            ModerationAction::Delete => "delete",
        }
    }

    /// Lowercase verb as shown to the admin for an entity kind
    pub fn verb(&self, kind: EntityKind) -> &'static str {
        match (self, kind) {
            (ModerationAction::Suspend, EntityKind::Product) => "flag",
            _ => self.as_str(),
        }
    }

    /// Button label for an entity kind
    pub fn label(&self, kind: EntityKind) -> &'static str {
        match (self, kind) {
            (ModerationAction::Approve, _) => "Approve",
            (ModerationAction::Reject, _) => "Reject",
            (ModerationAction::Suspend, EntityKind::Seller) => "Suspend",
            (ModerationAction::Suspend, EntityKind::Product) => "Flag",
            (ModerationAction::Delete, _) => "Delete",
        }
    }

    /// Past-tense label used in notifications and the audit trail
    pub fn past_tense(&self, kind: EntityKind) -> &'static str {
        match (self, kind) {
            (ModerationAction::Approve, _) => "Approved",
            (ModerationAction::Reject, _) => "Rejected",
            (ModerationAction::Suspend, EntityKind::Seller) => "Suspended",
            (ModerationAction::Suspend, EntityKind::Product) => "Flagged",
            (ModerationAction::Delete, _) => "Deleted",
        }
    }

    /// Whether the action collects a free-text reason instead of a yes/no confirmation
    pub fn requires_reason(&self) -> bool {
        matches!(self, ModerationAction::Reject)
    }
}

impl fmt::Display for ModerationAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ModerationAction {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "approve" => Ok(ModerationAction::Approve),
            "reject" => Ok(ModerationAction::Reject),
            "suspend" | "flag" => Ok(ModerationAction::Suspend),
            "delete" => Ok(ModerationAction::Delete),
            other => Err(DomainError::validation(format!("Unknown action '{}'", other))),
        }
    }
}

/// A checked move from one status to another, or to removal.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Transition<S> {
    pub action: ModerationAction,
    pub from: S,
    /// `None` when the subject is deleted
    pub to: Option<S>,
}

/// Workflow fields written by a status change.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Review<S> {
    pub status: S,
    pub reviewed_by: Option<String>,
    pub reviewed_at: Option<DateTime<Utc>>,
    pub remarks: Option<String>,
}

/// Check an action against the subject's current status.
///
/// | From | Action | To |
/// |---|---|---|
/// | pending | approve | approved |
/// | pending | reject | rejected |
/// | anything but held | suspend | held |
/// | any | delete | removed |
pub fn plan<S: WorkflowStatus>(from: S, action: ModerationAction) -> DomainResult<Transition<S>> {
    let to = match action {
        ModerationAction::Approve if from == S::PENDING => Some(S::APPROVED),
        ModerationAction::Reject if from == S::PENDING => Some(S::REJECTED),
        ModerationAction::Suspend if from != S::SUSPENDED => Some(S::SUSPENDED),
        ModerationAction::Delete => None,
        _ => {
            return Err(DomainError::InvalidTransition {
                entity: S::KIND.noun(),
                action: action.verb(S::KIND),
                status: from.as_str(),
            })
        }
    };

    Ok(Transition { action, from, to })
}

/// Actions exposed for a subject in the given status.
pub fn available_actions<S: WorkflowStatus>(status: S) -> Vec<ModerationAction> {
    ModerationAction::ALL
        .into_iter()
        .filter(|action| plan(status, *action).is_ok())
        .collect()
}

/// Trim a rejection reason, refusing blank input.
pub fn validate_reason(reason: &str) -> DomainResult<String> {
    let trimmed = reason.trim();
    if trimmed.is_empty() {
        return Err(DomainError::validation("A rejection reason is required"));
    }
    Ok(trimmed.to_string())
}

impl<S: WorkflowStatus> Transition<S> {
    /// Whether the subject is removed instead of changing status
    pub fn is_removal(&self) -> bool {
        self.to.is_none()
    }

    /// Build the workflow fields to write.
    ///
    /// Reviewer and review date are stamped only for approved/rejected
    /// targets; the held status leaves them untouched. Returns `None` for
    /// removals.
    pub fn review(
        &self,
        reviewer: &str,
        at: DateTime<Utc>,
        reason: Option<&str>,
    ) -> DomainResult<Option<Review<S>>> {
        let Some(status) = self.to else {
            return Ok(None);
        };

        let remarks = if self.action.requires_reason() {
            Some(validate_reason(reason.unwrap_or_default())?)
        } else {
            None
        };

        let stamped = status.stamps_review();
        Ok(Some(Review {
            status,
            reviewed_by: stamped.then(|| reviewer.to_string()),
            reviewed_at: stamped.then_some(at),
            remarks,
        }))
    }
}

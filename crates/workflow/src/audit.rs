//! In-process record of admin actions, newest first.

use std::collections::VecDeque;
use std::sync::{Arc, Mutex, MutexGuard};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::info;
use uuid::Uuid;

use domain::EntityKind;

use crate::actor::Actor;

/// Entries kept before the oldest is dropped
pub const AUDIT_CAPACITY: usize = 500;

/// Record type an entry refers to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "openapi", derive(utoipa::ToSchema))]
#[serde(rename_all = "lowercase")]
pub enum AuditEntity {
    Seller,
    Product,
    Category,
    Profile,
}

impl From<EntityKind> for AuditEntity {
    fn from(kind: EntityKind) -> Self {
        match kind {
            EntityKind::Seller => AuditEntity::Seller,
            EntityKind::Product => AuditEntity::Product,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[cfg_attr(feature = "openapi", derive(utoipa::ToSchema))]
pub struct AuditEntry {
    pub id: String,
    pub actor: Actor,
    pub entity: AuditEntity,
    pub subject_id: String,
    pub subject_label: String,
    /// e.g. `approve`, `flag`, `create`
    pub action: String,
    pub from_status: Option<String>,
    pub to_status: Option<String>,
    pub remarks: Option<String>,
    pub at: DateTime<Utc>,
}

/// Input for a new entry
#[derive(Debug, Clone)]
pub struct AuditRecord {
    pub entity: AuditEntity,
    pub subject_id: String,
    pub subject_label: String,
    pub action: String,
    pub from_status: Option<String>,
    pub to_status: Option<String>,
    pub remarks: Option<String>,
}

/// Bounded audit trail. Cloning yields another handle to the same trail.
#[derive(Clone, Default)]
pub struct AuditTrail {
    entries: Arc<Mutex<VecDeque<AuditEntry>>>,
}

impl AuditTrail {
    pub fn new() -> Self {
        Self::default()
    }

    fn entries(&self) -> MutexGuard<'_, VecDeque<AuditEntry>> {
        self.entries.lock().unwrap_or_else(|p| p.into_inner())
    }

    pub fn record(&self, actor: &Actor, record: AuditRecord) -> AuditEntry {
        let entry = AuditEntry {
            id: Uuid::new_v4().to_string(),
            actor: actor.clone(),
            entity: record.entity,
            subject_id: record.subject_id,
            subject_label: record.subject_label,
            action: record.action,
            from_status: record.from_status,
            to_status: record.to_status,
            remarks: record.remarks,
            at: Utc::now(),
        };
        info!(
            actor = %entry.actor.id,
            entity = ?entry.entity,
            subject = %entry.subject_id,
            action = %entry.action,
            "Audit entry recorded"
        );

        let mut entries = self.entries();
        entries.push_front(entry.clone());
        entries.truncate(AUDIT_CAPACITY);
        entry
    }

    /// Up to `limit` entries, newest first
    pub fn list(&self, limit: usize) -> Vec<AuditEntry> {
        self.entries().iter().take(limit).cloned().collect()
    }

    /// History of one record, newest first
    pub fn for_subject(&self, entity: AuditEntity, subject_id: &str) -> Vec<AuditEntry> {
        self.entries()
            .iter()
            .filter(|e| e.entity == entity && e.subject_id == subject_id)
            .cloned()
            .collect()
    }

    pub fn len(&self) -> usize {
        self.entries().len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries().is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn actor() -> Actor {
        Actor {
            id: "admin-1".into(),
            email: Some("admin@market.test".into()),
        }
    }

    fn record(subject: &str, action: &str) -> AuditRecord {
        AuditRecord {
            entity: AuditEntity::Seller,
            subject_id: subject.into(),
            subject_label: "Gadget Heaven".into(),
            action: action.into(),
            from_status: Some("pending".into()),
            to_status: Some("verified".into()),
            remarks: None,
        }
    }

    #[test]
    fn test_newest_first_and_subject_history() {
        let trail = AuditTrail::new();
        trail.record(&actor(), record("5", "approve"));
        trail.record(&actor(), record("3", "suspend"));
        trail.record(&actor(), record("5", "suspend"));

        let all = trail.list(10);
        assert_eq!(all.len(), 3);
        assert_eq!(all[0].subject_id, "5");
        assert_eq!(all[0].action, "suspend");

        let history = trail.for_subject(AuditEntity::Seller, "5");
        assert_eq!(history.len(), 2);
        assert_eq!(history[1].action, "approve");
        assert!(trail.for_subject(AuditEntity::Product, "5").is_empty());
    }

    #[test]
    fn test_trail_is_bounded() {
        let trail = AuditTrail::new();
        for i in 0..(AUDIT_CAPACITY + 3) {
            trail.record(&actor(), record(&i.to_string(), "approve"));
        }
        assert_eq!(trail.len(), AUDIT_CAPACITY);
        assert_eq!(trail.list(1)[0].subject_id, (AUDIT_CAPACITY + 2).to_string());
    }
}

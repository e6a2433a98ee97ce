//! Dismissible notifications shown to the admin.

use std::collections::VecDeque;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};

use chrono::{DateTime, Utc};
use serde::Serialize;

/// Toasts kept before the oldest is dropped
pub const TOAST_CAPACITY: usize = 20;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[cfg_attr(feature = "openapi", derive(utoipa::ToSchema))]
#[serde(rename_all = "lowercase")]
pub enum ToastVariant {
    Default,
    Success,
    Destructive,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[cfg_attr(feature = "openapi", derive(utoipa::ToSchema))]
pub struct Toast {
    pub id: u64,
    pub variant: ToastVariant,
    pub title: String,
    pub description: Option<String>,
    pub created_at: DateTime<Utc>,
}

/// Newest-first notification queue. Cloning yields another handle to the same queue.
#[derive(Clone, Default)]
pub struct ToastQueue {
    toasts: Arc<Mutex<VecDeque<Toast>>>,
    next_id: Arc<AtomicU64>,
}

impl ToastQueue {
    pub fn new() -> Self {
        Self::default()
    }

    fn toasts(&self) -> MutexGuard<'_, VecDeque<Toast>> {
        self.toasts.lock().unwrap_or_else(|p| p.into_inner())
    }

    pub fn push(&self, variant: ToastVariant, title: impl Into<String>, description: Option<String>) -> u64 {
        let id = self.next_id.fetch_add(1, Ordering::Relaxed) + 1;
        let mut toasts = self.toasts();
        toasts.push_front(Toast {
            id,
            variant,
            title: title.into(),
            description,
            created_at: Utc::now(),
        });
        toasts.truncate(TOAST_CAPACITY);
        id
    }

    pub fn success(&self, title: impl Into<String>, description: impl Into<String>) -> u64 {
        self.push(ToastVariant::Success, title, Some(description.into()))
    }

    pub fn error(&self, title: impl Into<String>, description: impl Into<String>) -> u64 {
        self.push(ToastVariant::Destructive, title, Some(description.into()))
    }

    /// Current toasts, newest first
    pub fn list(&self) -> Vec<Toast> {
        self.toasts().iter().cloned().collect()
    }

    pub fn latest(&self) -> Option<Toast> {
        self.toasts().front().cloned()
    }

    /// Remove one toast; `false` if it was already gone
    pub fn dismiss(&self, id: u64) -> bool {
        let mut toasts = self.toasts();
        let before = toasts.len();
        toasts.retain(|t| t.id != id);
        toasts.len() != before
    }

    pub fn clear(&self) {
        self.toasts().clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_newest_first_and_dismiss() {
        let queue = ToastQueue::new();
        let first = queue.success("Seller approved", "Gadget Heaven can now sell");
        let second = queue.error("Action failed", "Permission denied");

        let toasts = queue.list();
        assert_eq!(toasts[0].id, second);
        assert_eq!(toasts[0].variant, ToastVariant::Destructive);

        assert!(queue.dismiss(first));
        assert!(!queue.dismiss(first));
        assert_eq!(queue.list().len(), 1);
    }

    #[test]
    fn test_queue_is_bounded() {
        let queue = ToastQueue::new();
        for i in 0..(TOAST_CAPACITY + 5) {
            queue.push(ToastVariant::Default, format!("toast {}", i), None);
        }
        assert_eq!(queue.list().len(), TOAST_CAPACITY);
        assert_eq!(queue.latest().unwrap().title, format!("toast {}", TOAST_CAPACITY + 4));
    }
}

//! # Workflow
//!
//! Admin actions on top of the cached data layer:
//! - `VerificationController`, the seller and product moderation state machine
//! - `CategoryEditor` for the category tree
//! - `ToastQueue` notifications and the `AuditTrail` of applied actions

pub mod actor;
pub mod audit;
pub mod category_editor;
pub mod controller;
pub mod moderation;
pub mod notify;

pub use actor::{Actor, ActorSource};
pub use audit::{AuditEntity, AuditEntry, AuditRecord, AuditTrail, AUDIT_CAPACITY};
pub use category_editor::CategoryEditor;
pub use controller::{Dialog, DialogView, Origin, Outcome, VerificationController};
pub use moderation::{ModerationBackend, ProductModeration, SellerModeration};
pub use notify::{Toast, ToastQueue, ToastVariant, TOAST_CAPACITY};

/// Seller verification controller
pub type SellerController = VerificationController<SellerModeration>;

/// Product moderation controller
pub type ProductController = VerificationController<ProductModeration>;

//! Domain layer - Marketplace records, moderation statuses and transition rules.
//!
//! This crate contains pure domain logic with no infrastructure dependencies.
//! Every other crate in the workspace builds on these types.

pub mod category;
pub mod constants;
pub mod error;
pub mod product;
pub mod profile;
pub mod seller;
pub mod status;
pub mod workflow;

pub use category::{slugify, CategoryUpdate, NewCategory, ProductCategory};
pub use constants::*;
pub use error::{DomainError, DomainResult};
pub use product::Product;
pub use profile::{Profile, ProfileUpdate, UserRole};
pub use seller::Seller;
pub use status::{
    status_badge, BadgeVariant, EntityKind, ProductStatus, SellerStatus, StatusBadge,
    StatusFilter, WorkflowStatus, STATUS_POLICY,
};
pub use workflow::{available_actions, plan, ModerationAction, Review, Transition};

//! Moderation statuses and the shared status-policy table.
//!
//! Every view that renders a status badge goes through [`status_badge`] (or
//! [`WorkflowStatus::badge`]); nothing else maps statuses to labels.

use std::fmt;
use std::str::FromStr;

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};

use crate::constants::{
    STATUS_APPROVED, STATUS_FILTER_ALL, STATUS_FLAGGED, STATUS_PENDING, STATUS_REJECTED,
    STATUS_SUSPENDED, STATUS_VERIFIED,
};
use crate::error::{DomainError, DomainResult};

/// Kind of record moving through a moderation workflow.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[cfg_attr(feature = "openapi", derive(utoipa::ToSchema))]
#[serde(rename_all = "lowercase")]
pub enum EntityKind {
    Seller,
    Product,
}

impl EntityKind {
    /// Lowercase noun used in messages
    pub fn noun(&self) -> &'static str {
        match self {
            EntityKind::Seller => "seller",
            EntityKind::Product => "product",
        }
    }

    /// Capitalized noun used in titles
    pub fn title(&self) -> &'static str {
        match self {
            EntityKind::Seller => "Seller",
            EntityKind::Product => "Product",
        }
    }
}

impl fmt::Display for EntityKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.noun())
    }
}

/// Visual variant of a status badge.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "openapi", derive(utoipa::ToSchema))]
#[serde(rename_all = "lowercase")]
pub enum BadgeVariant {
    Default,
    Success,
    Warning,
    Error,
    Info,
    Pending,
}

/// Label and variant rendered for a status value.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[cfg_attr(feature = "openapi", derive(utoipa::ToSchema))]
pub struct StatusBadge {
    pub label: &'static str,
    pub variant: BadgeVariant,
}

/// One row of the status-policy table.
#[derive(Debug, Clone, Copy)]
pub struct StatusPolicy {
    pub kind: EntityKind,
    pub value: &'static str,
    pub badge: StatusBadge,
}

const fn policy(kind: EntityKind, value: &'static str, label: &'static str, variant: BadgeVariant) -> StatusPolicy {
    StatusPolicy {
        kind,
        value,
        badge: StatusBadge { label, variant },
    }
}

/// Status-policy table keyed by entity kind and status value.
pub const STATUS_POLICY: &[StatusPolicy] = &[
    policy(EntityKind::Seller, STATUS_PENDING, "Pending", BadgeVariant::Pending),
    policy(EntityKind::Seller, STATUS_VERIFIED, "Verified", BadgeVariant::Success),
    policy(EntityKind::Seller, STATUS_SUSPENDED, "Suspended", BadgeVariant::Warning),
    policy(EntityKind::Seller, STATUS_REJECTED, "Rejected", BadgeVariant::Error),
    policy(EntityKind::Product, STATUS_PENDING, "Pending", BadgeVariant::Pending),
    policy(EntityKind::Product, STATUS_APPROVED, "Approved", BadgeVariant::Success),
    policy(EntityKind::Product, STATUS_REJECTED, "Rejected", BadgeVariant::Error),
    policy(EntityKind::Product, STATUS_FLAGGED, "Flagged", BadgeVariant::Warning),
];

/// Badge for an entity kind and raw status value, if the value is known.
pub fn status_badge(kind: EntityKind, value: &str) -> Option<StatusBadge> {
    STATUS_POLICY
        .iter()
        .find(|p| p.kind == kind && p.value == value)
        .map(|p| p.badge)
}

/// A status in one of the two structurally identical moderation workflows.
///
/// Both workflows share four roles: a pending state, an approved state
/// (`verified` for sellers), a rejected state and a held state
/// (`suspended` for sellers, `flagged` for products).
pub trait WorkflowStatus:
    Copy + Eq + fmt::Debug + fmt::Display + Serialize + DeserializeOwned + Send + Sync + 'static
{
    const KIND: EntityKind;
    const PENDING: Self;
    const APPROVED: Self;
    const REJECTED: Self;
    const SUSPENDED: Self;

    /// Every status of this workflow, in display order
    fn all() -> &'static [Self];

    /// Wire value of the status
    fn as_str(&self) -> &'static str;

    /// Parse a wire value
    fn parse(value: &str) -> Option<Self> {
        Self::all().iter().copied().find(|s| s.as_str() == value)
    }

    /// Badge from the shared status-policy table
    fn badge(&self) -> StatusBadge {
        status_badge(Self::KIND, self.as_str()).unwrap_or(StatusBadge {
            label: "Unknown",
            variant: BadgeVariant::Default,
        })
    }

    /// Whether reaching this status stamps reviewer and review date
    fn stamps_review(&self) -> bool {
        *self == Self::APPROVED || *self == Self::REJECTED
    }
}

/// Verification status of a seller application.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[cfg_attr(feature = "openapi", derive(utoipa::ToSchema))]
#[serde(rename_all = "lowercase")]
pub enum SellerStatus {
    Pending,
    Verified,
    Rejected,
    Suspended,
}

impl WorkflowStatus for SellerStatus {
    const KIND: EntityKind = EntityKind::Seller;
    const PENDING: Self = SellerStatus::Pending;
    const APPROVED: Self = SellerStatus::Verified;
    const REJECTED: Self = SellerStatus::Rejected;
    const SUSPENDED: Self = SellerStatus::Suspended;

    fn all() -> &'static [Self] {
        &[
            SellerStatus::Pending,
            SellerStatus::Verified,
            SellerStatus::Rejected,
            SellerStatus::Suspended,
        ]
    }

    fn as_str(&self) -> &'static str {
        match self {
            SellerStatus::Pending => STATUS_PENDING,
            SellerStatus::Verified => STATUS_VERIFIED,
            SellerStatus::Rejected => STATUS_REJECTED,
            SellerStatus::Suspended => STATUS_SUSPENDED,
        }
    }
}

/// Moderation status of a product listing.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[cfg_attr(feature = "openapi", derive(utoipa::ToSchema))]
#[serde(rename_all = "lowercase")]
pub enum ProductStatus {
    #[default]
    Pending,
    Approved,
    Rejected,
    Flagged,
}

impl WorkflowStatus for ProductStatus {
    const KIND: EntityKind = EntityKind::Product;
    const PENDING: Self = ProductStatus::Pending;
    const APPROVED: Self = ProductStatus::Approved;
    const REJECTED: Self = ProductStatus::Rejected;
    const SUSPENDED: Self = ProductStatus::Flagged;

    fn all() -> &'static [Self] {
        &[
            ProductStatus::Pending,
            ProductStatus::Approved,
            ProductStatus::Rejected,
            ProductStatus::Flagged,
        ]
    }

    fn as_str(&self) -> &'static str {
        match self {
            ProductStatus::Pending => STATUS_PENDING,
            ProductStatus::Approved => STATUS_APPROVED,
            ProductStatus::Rejected => STATUS_REJECTED,
            ProductStatus::Flagged => STATUS_FLAGGED,
        }
    }
}

macro_rules! status_text_impls {
    ($($status:ty),*) => {$(
        impl fmt::Display for $status {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(self.as_str())
            }
        }

        impl FromStr for $status {
            type Err = DomainError;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                <$status as WorkflowStatus>::parse(s).ok_or_else(|| {
                    DomainError::validation(format!(
                        "Unknown {} status '{}'",
                        <$status as WorkflowStatus>::KIND.noun(),
                        s
                    ))
                })
            }
        }
    )*};
}

status_text_impls!(SellerStatus, ProductStatus);

/// Status filter selected on a list view.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StatusFilter<S> {
    All,
    Only(S),
}

impl<S: WorkflowStatus> StatusFilter<S> {
    /// Parse an optional query value; missing or `all` selects everything.
    pub fn parse(value: Option<&str>) -> DomainResult<Self> {
        match value.map(str::trim) {
            None | Some("") | Some(STATUS_FILTER_ALL) => Ok(StatusFilter::All),
            Some(v) => S::parse(v).map(StatusFilter::Only).ok_or_else(|| {
                DomainError::validation(format!("Unknown {} status '{}'", S::KIND.noun(), v))
            }),
        }
    }

    /// Wire value of the filter
    pub fn as_str(&self) -> &'static str {
        match self {
            StatusFilter::All => STATUS_FILTER_ALL,
            StatusFilter::Only(s) => s.as_str(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_policy_covers_every_status() {
        for status in SellerStatus::all() {
            assert!(status_badge(EntityKind::Seller, status.as_str()).is_some());
        }
        for status in ProductStatus::all() {
            assert!(status_badge(EntityKind::Product, status.as_str()).is_some());
        }
        assert_eq!(STATUS_POLICY.len(), 8);
    }

    #[test]
    fn test_badges_follow_policy_table() {
        assert_eq!(SellerStatus::Verified.badge().label, "Verified");
        assert_eq!(SellerStatus::Verified.badge().variant, BadgeVariant::Success);
        assert_eq!(SellerStatus::Suspended.badge().variant, BadgeVariant::Warning);
        assert_eq!(ProductStatus::Flagged.badge().label, "Flagged");
        assert_eq!(ProductStatus::Pending.badge().variant, BadgeVariant::Pending);
        assert!(status_badge(EntityKind::Product, "verified").is_none());
    }

    #[test]
    fn test_status_parsing() {
        assert_eq!("pending".parse::<SellerStatus>().unwrap(), SellerStatus::Pending);
        assert!("approved".parse::<SellerStatus>().is_err());
        assert_eq!("flagged".parse::<ProductStatus>().unwrap(), ProductStatus::Flagged);
    }

    #[test]
    fn test_status_filter() {
        assert_eq!(StatusFilter::<SellerStatus>::parse(None).unwrap(), StatusFilter::All);
        assert_eq!(StatusFilter::<SellerStatus>::parse(Some("all")).unwrap(), StatusFilter::All);
        assert_eq!(
            StatusFilter::<SellerStatus>::parse(Some("verified")).unwrap(),
            StatusFilter::Only(SellerStatus::Verified)
        );
        assert!(StatusFilter::<ProductStatus>::parse(Some("verified")).is_err());
    }

    #[test]
    fn test_serde_wire_values() {
        let json = serde_json::to_string(&SellerStatus::Suspended).unwrap();
        assert_eq!(json, "\"suspended\"");
        let status: ProductStatus = serde_json::from_str("\"approved\"").unwrap();
        assert_eq!(status, ProductStatus::Approved);
    }
}

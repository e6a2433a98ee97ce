//! Seller verification record.

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

use crate::status::SellerStatus;

/// A seller application as stored in the `seller_verifications` table.
///
/// Sellers are created by the marketplace's sign-up flow; the console only
/// moves them through the verification workflow.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[cfg_attr(feature = "openapi", derive(utoipa::ToSchema))]
pub struct Seller {
    pub id: String,
    /// Owning marketplace account
    #[serde(default)]
    pub seller_id: Option<String>,

    // Business
    #[serde(default)]
    pub business_name: String,
    #[serde(default)]
    pub seller_type: Option<String>,
    #[serde(default)]
    pub registered_address: Option<String>,
    #[serde(default)]
    pub zip_code: Option<String>,
    #[serde(default)]
    pub tin_number: Option<String>,
    #[serde(default)]
    pub vat_status: Option<String>,

    // Personal
    #[serde(default)]
    pub first_name: Option<String>,
    #[serde(default)]
    pub middle_name: Option<String>,
    #[serde(default)]
    pub last_name: Option<String>,
    #[serde(default)]
    pub suffix: Option<String>,
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub phone: Option<String>,
    #[serde(default)]
    pub website: Option<String>,

    // Documents
    #[serde(default)]
    pub document_type: Option<String>,
    #[serde(default)]
    pub document_url: Option<String>,
    #[serde(default)]
    pub document_number: Option<String>,
    #[serde(default)]
    pub document_expiry_date: Option<NaiveDate>,
    /// Government ID type
    #[serde(default)]
    pub valid_id: Option<String>,
    #[serde(default)]
    pub valid_id_front: Option<String>,
    #[serde(default)]
    pub valid_id_back: Option<String>,

    // Workflow
    pub status: SellerStatus,
    #[serde(default)]
    pub remarks: Option<String>,
    #[serde(default)]
    pub verified_by: Option<String>,
    #[serde(default)]
    pub verification_date: Option<DateTime<Utc>>,
    #[serde(default)]
    pub verification_remarks: Option<String>,

    #[serde(default)]
    pub created_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub updated_at: Option<DateTime<Utc>>,
}

impl Seller {
    /// Full name assembled from the personal name parts
    pub fn full_name(&self) -> String {
        [
            self.first_name.as_deref(),
            self.middle_name.as_deref(),
            self.last_name.as_deref(),
            self.suffix.as_deref(),
        ]
        .into_iter()
        .flatten()
        .map(str::trim)
        .filter(|part| !part.is_empty())
        .collect::<Vec<_>>()
        .join(" ")
    }

    /// Check whether the submitted document has expired on the given day
    pub fn is_document_expired(&self, today: NaiveDate) -> bool {
        self.document_expiry_date
            .map(|expiry| expiry < today)
            .unwrap_or(false)
    }

    /// Check the review-stamp invariant: reviewer and review date are
    /// present for verified and rejected sellers.
    pub fn review_stamp_consistent(&self) -> bool {
        let stamped = self.verified_by.is_some() && self.verification_date.is_some();
        match self.status {
            SellerStatus::Verified | SellerStatus::Rejected => stamped,
            SellerStatus::Pending => self.verified_by.is_none() && self.verification_date.is_none(),
            SellerStatus::Suspended => true,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn row() -> serde_json::Value {
        json!({
            "id": "42",
            "business_name": "Gadget Heaven",
            "first_name": "Emily",
            "middle_name": "",
            "last_name": "Wilson",
            "status": "pending",
            "document_expiry_date": "2025-06-30",
            "created_at": "2023-04-16T15:10:00Z"
        })
    }

    #[test]
    fn test_decodes_sparse_row() {
        let seller: Seller = serde_json::from_value(row()).unwrap();
        assert_eq!(seller.status, SellerStatus::Pending);
        assert!(seller.verified_by.is_none());
        assert_eq!(seller.full_name(), "Emily Wilson");
        assert!(seller.review_stamp_consistent());
    }

    #[test]
    fn test_document_expiry() {
        let seller: Seller = serde_json::from_value(row()).unwrap();
        let before = NaiveDate::from_ymd_opt(2025, 6, 1).unwrap();
        let after = NaiveDate::from_ymd_opt(2025, 7, 1).unwrap();
        assert!(!seller.is_document_expired(before));
        assert!(seller.is_document_expired(after));
    }

    #[test]
    fn test_verified_without_stamp_is_inconsistent() {
        let mut seller: Seller = serde_json::from_value(row()).unwrap();
        seller.status = SellerStatus::Verified;
        assert!(!seller.review_stamp_consistent());
        seller.verified_by = Some("admin-1".to_string());
        seller.verification_date = Some(Utc::now());
        assert!(seller.review_stamp_consistent());
    }
}

//! Seller verification repository.

use std::sync::Arc;

use async_trait::async_trait;
use chrono::Utc;
use serde_json::{json, Value};
use tracing::{debug, warn};

use backend_client::{Filter, Table, TableApi};
use common::AppResult;
use domain::{Review, Seller, SellerStatus, WorkflowStatus};

use super::{decode_rows, first_row, guarded_row, non_blank, require_id};
use crate::Fetched;

#[cfg(any(test, feature = "test-utils"))]
use mockall::automock;

/// Seller repository trait for dependency injection.
///
/// List reads return [`Fetched`] so a failure still yields an empty list.
#[cfg_attr(any(test, feature = "test-utils"), automock)]
#[async_trait]
pub trait SellerRepository: Send + Sync {
    /// Every seller application
    async fn fetch_all(&self) -> Fetched<Vec<Seller>>;

    /// One seller, `NotFound` when no row matches
    async fn fetch_by_id(&self, id: &str) -> AppResult<Seller>;

    /// Sellers in one status
    async fn fetch_by_status(&self, status: SellerStatus) -> Fetched<Vec<Seller>>;

    /// Write a status change with its review stamp. Only applies while the
    /// row is still in `from`; otherwise `StaleRecord`.
    async fn update_review(
        &self,
        id: &str,
        from: SellerStatus,
        review: Review<SellerStatus>,
    ) -> AppResult<Seller>;

    /// Replace the admin notes; blank clears them
    async fn update_remarks(&self, id: &str, remarks: &str) -> AppResult<Seller>;

    /// Hard delete
    async fn delete(&self, id: &str) -> AppResult<()>;
}

/// Concrete implementation of SellerRepository over the `seller_verifications` table
pub struct SellerStore {
    tables: Arc<dyn TableApi>,
}

impl SellerStore {
    /// Create new repository instance
    pub fn new(tables: Arc<dyn TableApi>) -> Self {
        Self { tables }
    }

    async fn select(&self, filter: Filter) -> AppResult<Vec<Seller>> {
        let rows = self.tables.select(Table::SellerVerifications, &filter).await?;
        decode_rows(rows)
    }

    async fn patch(&self, id: &str, patch: Value) -> AppResult<Seller> {
        let id = require_id(id, "Seller")?;
        let rows = self
            .tables
            .update(Table::SellerVerifications, &Filter::by_id(id), patch)
            .await?;
        first_row(rows)
    }
}

/// Row patch for a review; reject reasons land in both remark columns
pub fn review_patch(review: &Review<SellerStatus>) -> Value {
    let mut patch = json!({
        "status": review.status.as_str(),
        "updated_at": Utc::now(),
    });
    if let Some(reviewer) = &review.reviewed_by {
        patch["verified_by"] = json!(reviewer);
    }
    if let Some(at) = review.reviewed_at {
        patch["verification_date"] = json!(at);
    }
    if let Some(remarks) = &review.remarks {
        patch["remarks"] = json!(remarks);
        patch["verification_remarks"] = json!(remarks);
    }
    patch
}

#[async_trait]
impl SellerRepository for SellerStore {
    async fn fetch_all(&self) -> Fetched<Vec<Seller>> {
        let result = self.select(Filter::new()).await;
        if let Err(err) = &result {
            warn!(code = err.code(), "Failed to fetch sellers");
        }
        result.into()
    }

    async fn fetch_by_id(&self, id: &str) -> AppResult<Seller> {
        let id = require_id(id, "Seller")?;
        let rows = self
            .tables
            .select(Table::SellerVerifications, &Filter::by_id(id))
            .await?;
        first_row(rows)
    }

    async fn fetch_by_status(&self, status: SellerStatus) -> Fetched<Vec<Seller>> {
        let result = self.select(Filter::new().eq("status", status.as_str())).await;
        if let Err(err) = &result {
            warn!(status = %status, code = err.code(), "Failed to fetch sellers by status");
        }
        result.into()
    }

    async fn update_review(
        &self,
        id: &str,
        from: SellerStatus,
        review: Review<SellerStatus>,
    ) -> AppResult<Seller> {
        let id = require_id(id, "Seller")?;
        debug!(seller_id = %id, from = %from, status = %review.status, "Updating seller review");
        let filter = Filter::by_id(id).eq("status", from.as_str());
        let rows = self
            .tables
            .update(Table::SellerVerifications, &filter, review_patch(&review))
            .await?;
        guarded_row(rows, "Seller", id)
    }

    async fn update_remarks(&self, id: &str, remarks: &str) -> AppResult<Seller> {
        self.patch(
            id,
            json!({ "remarks": non_blank(remarks), "updated_at": Utc::now() }),
        )
        .await
    }

    async fn delete(&self, id: &str) -> AppResult<()> {
        let id = require_id(id, "Seller")?;
        let removed = self
            .tables
            .delete(Table::SellerVerifications, &Filter::by_id(id))
            .await?;
        if removed.is_empty() {
            return Err(common::AppError::NotFound);
        }
        Ok(())
    }
}

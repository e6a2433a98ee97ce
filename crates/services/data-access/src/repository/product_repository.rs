//! Product moderation repository.

use std::sync::Arc;

use async_trait::async_trait;
use chrono::Utc;
use serde_json::json;
use tracing::{debug, warn};

use backend_client::{Filter, Table, TableApi};
use common::{AppError, AppResult};
use domain::{Product, ProductStatus, Review, WorkflowStatus};

use super::{decode_rows, first_row, guarded_row, require_id};
use crate::Fetched;

#[cfg(any(test, feature = "test-utils"))]
use mockall::automock;

/// Product repository trait for dependency injection.
#[cfg_attr(any(test, feature = "test-utils"), automock)]
#[async_trait]
pub trait ProductRepository: Send + Sync {
    async fn fetch_all(&self) -> Fetched<Vec<Product>>;

    async fn fetch_by_id(&self, id: &str) -> AppResult<Product>;

    async fn fetch_by_status(&self, status: ProductStatus) -> Fetched<Vec<Product>>;

    /// Products listed by one seller
    async fn fetch_by_seller(&self, seller_id: &str) -> Fetched<Vec<Product>>;

    /// Write a status change while the row is still in `from`. Products
    /// carry no review stamp, so only the status is stored.
    async fn update_review(
        &self,
        id: &str,
        from: ProductStatus,
        review: Review<ProductStatus>,
    ) -> AppResult<Product>;

    /// Hard delete
    async fn delete(&self, id: &str) -> AppResult<()>;
}

/// Concrete implementation of ProductRepository over the `products` table
pub struct ProductStore {
    tables: Arc<dyn TableApi>,
}

impl ProductStore {
    /// Create new repository instance
    pub fn new(tables: Arc<dyn TableApi>) -> Self {
        Self { tables }
    }

    async fn list(&self, filter: Filter) -> Fetched<Vec<Product>> {
        let result = match self.tables.select(Table::Products, &filter).await {
            Ok(rows) => decode_rows(rows),
            Err(err) => Err(err),
        };
        if let Err(err) = &result {
            warn!(code = err.code(), "Failed to fetch products");
        }
        result.into()
    }
}

#[async_trait]
impl ProductRepository for ProductStore {
    async fn fetch_all(&self) -> Fetched<Vec<Product>> {
        self.list(Filter::new()).await
    }

    async fn fetch_by_id(&self, id: &str) -> AppResult<Product> {
        let id = require_id(id, "Product")?;
        let rows = self.tables.select(Table::Products, &Filter::by_id(id)).await?;
        first_row(rows)
    }

    async fn fetch_by_status(&self, status: ProductStatus) -> Fetched<Vec<Product>> {
        self.list(Filter::new().eq("status", status.as_str())).await
    }

    async fn fetch_by_seller(&self, seller_id: &str) -> Fetched<Vec<Product>> {
        match require_id(seller_id, "Seller") {
            Ok(seller_id) => self.list(Filter::new().eq("seller_id", seller_id)).await,
            Err(err) => Fetched::failed(err),
        }
    }

    async fn update_review(
        &self,
        id: &str,
        from: ProductStatus,
        review: Review<ProductStatus>,
    ) -> AppResult<Product> {
        let id = require_id(id, "Product")?;
        debug!(product_id = %id, from = %from, status = %review.status, "Updating product status");
        let patch = json!({ "status": review.status.as_str(), "updated_at": Utc::now() });
        let filter = Filter::by_id(id).eq("status", from.as_str());
        let rows = self.tables.update(Table::Products, &filter, patch).await?;
        guarded_row(rows, "Product", id)
    }

    async fn delete(&self, id: &str) -> AppResult<()> {
        let id = require_id(id, "Product")?;
        let removed = self.tables.delete(Table::Products, &Filter::by_id(id)).await?;
        if removed.is_empty() {
            return Err(AppError::NotFound);
        }
        Ok(())
    }
}

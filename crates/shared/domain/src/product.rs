//! Product listing record.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::constants::LOW_STOCK_THRESHOLD;
use crate::status::ProductStatus;

/// A product as stored in the `products` table.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[cfg_attr(feature = "openapi", derive(utoipa::ToSchema))]
pub struct Product {
    pub id: String,
    #[serde(default)]
    pub seller_id: Option<String>,
    #[serde(default)]
    pub category_id: Option<String>,
    pub name: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub price: f64,
    #[serde(default)]
    pub sale_price: Option<f64>,
    #[serde(default, alias = "stock")]
    pub stock_quantity: i64,
    #[serde(default)]
    pub image_url: Option<String>,
    #[serde(default)]
    pub is_available: Option<bool>,
    #[serde(default)]
    pub is_featured: Option<bool>,
    #[serde(default)]
    pub is_active: Option<bool>,
    #[serde(default)]
    pub is_deleted: Option<bool>,
    #[serde(default)]
    pub rating: Option<f64>,
    #[serde(default)]
    pub review_count: Option<i64>,
    #[serde(default)]
    pub status: ProductStatus,
    #[serde(default)]
    pub created_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub updated_at: Option<DateTime<Utc>>,
}

impl Product {
    /// Listed and not soft-deleted
    pub fn is_live(&self) -> bool {
        self.is_active.unwrap_or(true) && !self.is_deleted.unwrap_or(false)
    }

    /// Counted as an active product on the dashboard
    pub fn is_active_listing(&self) -> bool {
        self.is_live() && self.status == ProductStatus::Approved
    }

    pub fn is_low_stock(&self) -> bool {
        self.stock_quantity < LOW_STOCK_THRESHOLD
    }

    /// Price the buyer pays
    pub fn effective_price(&self) -> f64 {
        self.sale_price
            .filter(|sale| *sale > 0.0 && *sale < self.price)
            .unwrap_or(self.price)
    }
}

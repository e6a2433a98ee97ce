//! Repository layer - one trait per remote table.
//!
//! Each operation performs exactly one remote call. Rows are decoded into
//! domain types here so nothing above this layer sees raw JSON.

pub mod category_repository;
pub mod product_repository;
pub mod profile_repository;
pub mod seller_repository;

pub use category_repository::{CategoryRepository, CategoryStore};
pub use product_repository::{ProductRepository, ProductStore};
pub use profile_repository::{ProfileRepository, ProfileStore};
pub use seller_repository::{SellerRepository, SellerStore};

#[cfg(any(test, feature = "test-utils"))]
pub use category_repository::MockCategoryRepository;
#[cfg(any(test, feature = "test-utils"))]
pub use product_repository::MockProductRepository;
#[cfg(any(test, feature = "test-utils"))]
pub use profile_repository::MockProfileRepository;
#[cfg(any(test, feature = "test-utils"))]
pub use seller_repository::MockSellerRepository;

use std::sync::Arc;

use serde::de::DeserializeOwned;
use serde_json::Value;

use backend_client::TableApi;
use common::{AppError, AppResult};

/// The four repositories over one table client
#[derive(Clone)]
pub struct Repositories {
    pub sellers: Arc<dyn SellerRepository>,
    pub products: Arc<dyn ProductRepository>,
    pub categories: Arc<dyn CategoryRepository>,
    pub profiles: Arc<dyn ProfileRepository>,
}

impl Repositories {
    /// Create new repositories backed by `tables`
    pub fn new(tables: Arc<dyn TableApi>) -> Self {
        Self {
            sellers: Arc::new(SellerStore::new(tables.clone())),
            products: Arc::new(ProductStore::new(tables.clone())),
            categories: Arc::new(CategoryStore::new(tables.clone())),
            profiles: Arc::new(ProfileStore::new(tables)),
        }
    }
}

/// Reject blank ids before any remote call
pub(crate) fn require_id<'a>(id: &'a str, entity: &str) -> AppResult<&'a str> {
    let id = id.trim();
    if id.is_empty() {
        return Err(AppError::validation(format!("{} id is required", entity)));
    }
    Ok(id)
}

pub(crate) fn decode_rows<T: DeserializeOwned>(rows: Vec<Value>) -> AppResult<Vec<T>> {
    rows.into_iter()
        .map(|row| serde_json::from_value(row).map_err(AppError::from))
        .collect()
}

/// First matching row, `NotFound` when none matched
pub(crate) fn first_row<T: DeserializeOwned>(rows: Vec<Value>) -> AppResult<T> {
    let row = rows.into_iter().next().ok_or(AppError::NotFound)?;
    Ok(serde_json::from_value(row)?)
}

/// Row written by a status-guarded update. No match means the row was
/// removed or left the expected status since it was read.
pub(crate) fn guarded_row<T: DeserializeOwned>(rows: Vec<Value>, entity: &str, id: &str) -> AppResult<T> {
    if rows.is_empty() {
        return Err(AppError::stale(format!("{} {}", entity, id)));
    }
    first_row(rows)
}

/// Blank text stored as null
pub(crate) fn non_blank(text: &str) -> Option<String> {
    let trimmed = text.trim();
    (!trimmed.is_empty()).then(|| trimmed.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_require_id_rejects_blank() {
        assert_eq!(require_id(" 42 ", "Seller"), Ok("42"));
        assert_eq!(
            require_id("  ", "Seller"),
            Err(AppError::Validation("Seller id is required".into()))
        );
    }

    #[test]
    fn test_first_row_not_found_on_empty() {
        let err = first_row::<domain::Seller>(vec![]).unwrap_err();
        assert_eq!(err, AppError::NotFound);

        let seller: domain::Seller = first_row(vec![json!({ "id": "42", "status": "pending" })]).unwrap();
        assert_eq!(seller.id, "42");
    }

    #[test]
    fn test_guarded_row_without_match_is_stale() {
        let err = guarded_row::<domain::Seller>(vec![], "Seller", "42").unwrap_err();
        assert_eq!(err, AppError::StaleRecord("Seller 42".into()));
    }

    #[test]
    fn test_malformed_row_is_internal() {
        let err = decode_rows::<domain::Seller>(vec![json!({ "id": 42 })]).unwrap_err();
        assert!(matches!(err, AppError::Internal(_)));
    }
}

//! Product category repository.
//!
//! Categories are the only records the console creates; slug and name rules
//! are applied here before the row is written.

use std::sync::Arc;

use async_trait::async_trait;
use chrono::Utc;
use serde_json::{json, Map, Value};
use tracing::{info, warn};

use backend_client::{Filter, Table, TableApi};
use common::{AppError, AppResult};
use domain::category::{resolve_new_slug, validate_category_name, validate_slug};
use domain::{CategoryUpdate, NewCategory, ProductCategory};

use super::{decode_rows, first_row, non_blank, require_id};
use crate::Fetched;

#[cfg(any(test, feature = "test-utils"))]
use mockall::automock;

/// Category repository trait for dependency injection.
#[cfg_attr(any(test, feature = "test-utils"), automock)]
#[async_trait]
pub trait CategoryRepository: Send + Sync {
    async fn fetch_all(&self) -> Fetched<Vec<ProductCategory>>;

    async fn fetch_by_id(&self, id: &str) -> AppResult<ProductCategory>;

    /// Insert a category; the slug is derived from the name unless given
    async fn create(&self, input: NewCategory) -> AppResult<ProductCategory>;

    /// Apply the present fields; the slug changes only when given explicitly
    async fn update(&self, id: &str, changes: CategoryUpdate) -> AppResult<ProductCategory>;

    /// Hard delete
    async fn delete(&self, id: &str) -> AppResult<()>;
}

/// Concrete implementation of CategoryRepository over the `categories` table
pub struct CategoryStore {
    tables: Arc<dyn TableApi>,
}

impl CategoryStore {
    /// Create new repository instance
    pub fn new(tables: Arc<dyn TableApi>) -> Self {
        Self { tables }
    }
}

/// Row for a new category
pub fn new_category_row(input: &NewCategory) -> AppResult<Value> {
    let name = validate_category_name(&input.name)?;
    let slug = resolve_new_slug(&name, input.slug.as_deref())?;

    Ok(json!({
        "name": name,
        "slug": slug,
        "description": input.description.as_deref().and_then(non_blank),
        "parent_id": input.parent_id.as_deref().and_then(non_blank),
        "product_count": 0,
        "is_active": true,
        "is_deleted": false,
    }))
}

/// Patch for a category edit
pub fn category_patch(changes: &CategoryUpdate) -> AppResult<Value> {
    if changes.is_empty() {
        return Err(AppError::validation("Nothing to update"));
    }

    let mut patch = Map::new();
    if let Some(name) = &changes.name {
        patch.insert("name".into(), json!(validate_category_name(name)?));
    }
    if let Some(slug) = &changes.slug {
        let slug = slug.trim();
        validate_slug(slug)?;
        patch.insert("slug".into(), json!(slug));
    }
    if let Some(description) = &changes.description {
        patch.insert("description".into(), json!(non_blank(description)));
    }
    if let Some(parent_id) = &changes.parent_id {
        patch.insert(
            "parent_id".into(),
            json!(parent_id.as_deref().and_then(non_blank)),
        );
    }
    patch.insert("updated_at".into(), json!(Utc::now()));

    Ok(Value::Object(patch))
}

#[async_trait]
impl CategoryRepository for CategoryStore {
    async fn fetch_all(&self) -> Fetched<Vec<ProductCategory>> {
        let result = match self.tables.select(Table::Categories, &Filter::new()).await {
            Ok(rows) => decode_rows(rows),
            Err(err) => Err(err),
        };
        if let Err(err) = &result {
            warn!(code = err.code(), "Failed to fetch categories");
        }
        result.into()
    }

    async fn fetch_by_id(&self, id: &str) -> AppResult<ProductCategory> {
        let id = require_id(id, "Category")?;
        let rows = self.tables.select(Table::Categories, &Filter::by_id(id)).await?;
        first_row(rows)
    }

    async fn create(&self, input: NewCategory) -> AppResult<ProductCategory> {
        let row = new_category_row(&input)?;
        let created = self.tables.insert(Table::Categories, row).await?;
        let category: ProductCategory = serde_json::from_value(created)?;
        info!(category_id = %category.id, slug = %category.slug, "Category created");
        Ok(category)
    }

    async fn update(&self, id: &str, changes: CategoryUpdate) -> AppResult<ProductCategory> {
        let id = require_id(id, "Category")?;
        let patch = category_patch(&changes)?;
        let rows = self.tables.update(Table::Categories, &Filter::by_id(id), patch).await?;
        first_row(rows)
    }

    async fn delete(&self, id: &str) -> AppResult<()> {
        let id = require_id(id, "Category")?;
        let removed = self.tables.delete(Table::Categories, &Filter::by_id(id)).await?;
        if removed.is_empty() {
            return Err(AppError::NotFound);
        }
        info!(category_id = %id, "Category deleted");
        Ok(())
    }
}

//! Category tree and category editing.

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::Json,
    routing::get,
    Router,
};
use serde::{Deserialize, Serialize};
use utoipa::{IntoParams, ToSchema};

use common::{AppResult, OptionExt};
use domain::{CategoryUpdate, NewCategory, ProductCategory};

use crate::state::AppState;
use crate::view::{resolve, View};

const ROUTE_CATEGORIES: &str = "/categories";

/// A top-level category with its subcategories
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct CategoryNode {
    pub category: ProductCategory,
    pub children: Vec<ProductCategory>,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct CategoryTreeView {
    pub total: usize,
    pub tree: Vec<CategoryNode>,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct CategoryDetailView {
    pub category: ProductCategory,
    pub parent: Option<ProductCategory>,
    pub children: Vec<ProductCategory>,
}

#[derive(Debug, Default, Deserialize, IntoParams)]
pub struct DeleteQuery {
    /// Must be `true`; deletion is irreversible
    #[serde(default)]
    pub confirm: bool,
}

/// Create category routes
pub fn category_routes() -> Router<AppState> {
    Router::new()
        .route("/", get(list_categories).post(create_category))
        .route(
            "/:id",
            get(get_category).put(update_category).delete(delete_category),
        )
}

/// Group categories under their parents.
///
/// Subcategories whose parent is missing are listed at the top level.
pub fn build_tree(categories: &[ProductCategory]) -> Vec<CategoryNode> {
    let is_root = |c: &ProductCategory| match &c.parent_id {
        None => true,
        Some(parent) => !categories.iter().any(|p| &p.id == parent),
    };

    categories
        .iter()
        .filter(|c| is_root(c))
        .map(|root| CategoryNode {
            category: root.clone(),
            children: categories
                .iter()
                .filter(|c| c.parent_id.as_deref() == Some(root.id.as_str()))
                .cloned()
                .collect(),
        })
        .collect()
}

/// Category tree
#[utoipa::path(
    get,
    path = "/categories",
    tag = "Categories",
    responses(
        (status = 200, description = "Categories grouped by parent", body = CategoryTreeView),
        (status = 202, description = "Still loading")
    )
)]
pub async fn list_categories(State(state): State<AppState>) -> View<CategoryTreeView> {
    let result = resolve(state.config.view_loading_timeout(), state.queries.categories())
        .await
        .map(|categories| CategoryTreeView {
            total: categories.len(),
            tree: build_tree(&categories),
        });
    View::render(result, ROUTE_CATEGORIES, ROUTE_CATEGORIES)
}

/// One category with its parent and children
#[utoipa::path(
    get,
    path = "/categories/{id}",
    tag = "Categories",
    params(("id" = String, Path, description = "Category ID")),
    responses(
        (status = 200, description = "Category detail", body = CategoryDetailView),
        (status = 404, description = "No such category")
    )
)]
pub async fn get_category(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> View<CategoryDetailView> {
    let timeout = state.config.view_loading_timeout();
    let result = resolve(timeout, state.queries.categories())
        .await
        .and_then(|categories| {
            let category = categories
                .iter()
                .find(|c| c.id == id)
                .cloned()
                .ok_or_not_found()?;
            Ok(CategoryDetailView {
                parent: category
                    .parent_id
                    .as_deref()
                    .and_then(|parent| categories.iter().find(|c| c.id == parent))
                    .cloned(),
                children: categories
                    .iter()
                    .filter(|c| c.parent_id.as_deref() == Some(id.as_str()))
                    .cloned()
                    .collect(),
                category,
            })
        });
    View::render(result, &format!("{}/{}", ROUTE_CATEGORIES, id), ROUTE_CATEGORIES)
}

/// Create a category
#[utoipa::path(
    post,
    path = "/categories",
    tag = "Categories",
    request_body = NewCategory,
    responses(
        (status = 201, description = "Category created", body = ProductCategory),
        (status = 400, description = "Invalid name, slug or parent")
    )
)]
pub async fn create_category(
    State(state): State<AppState>,
    Json(input): Json<NewCategory>,
) -> AppResult<(StatusCode, Json<ProductCategory>)> {
    let category = state.categories.create(input).await?;
    Ok((StatusCode::CREATED, Json(category)))
}

/// Rename, re-slug, describe or move a category
#[utoipa::path(
    put,
    path = "/categories/{id}",
    tag = "Categories",
    params(("id" = String, Path, description = "Category ID")),
    request_body = CategoryUpdate,
    responses(
        (status = 200, description = "Category updated", body = ProductCategory),
        (status = 400, description = "Invalid change"),
        (status = 404, description = "No such category")
    )
)]
pub async fn update_category(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Json(changes): Json<CategoryUpdate>,
) -> AppResult<Json<ProductCategory>> {
    Ok(Json(state.categories.update(&id, changes).await?))
}

/// Delete a category without subcategories
#[utoipa::path(
    delete,
    path = "/categories/{id}",
    tag = "Categories",
    params(("id" = String, Path, description = "Category ID"), DeleteQuery),
    responses(
        (status = 204, description = "Category deleted"),
        (status = 400, description = "Not confirmed or still has subcategories"),
        (status = 404, description = "No such category")
    )
)]
pub async fn delete_category(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Query(query): Query<DeleteQuery>,
) -> AppResult<StatusCode> {
    state.categories.delete(&id, query.confirm).await?;
    Ok(StatusCode::NO_CONTENT)
}

//! Product moderation pages.

use axum::{
    extract::{Path, Query, State},
    routing::get,
    Router,
};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::{IntoParams, ToSchema};

use common::AppResult;
use domain::{
    Product, ProductCategory, ProductStatus, StatusBadge, StatusFilter, WorkflowStatus,
    ROUTE_PRODUCTS,
};
use workflow::{AuditEntity, AuditEntry, DialogView, ProductModeration};

use crate::handlers::moderation_handler::moderation_routes;
use crate::handlers::seller_handler::{action_views, ActionView};
use crate::state::AppState;
use crate::view::{both, resolve, View};

#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct ProductRow {
    pub id: String,
    pub name: String,
    pub seller_id: Option<String>,
    pub category_id: Option<String>,
    pub price: f64,
    pub stock_quantity: i64,
    pub low_stock: bool,
    pub status: ProductStatus,
    pub badge: StatusBadge,
    pub created_at: Option<DateTime<Utc>>,
    pub actions: Vec<ActionView>,
}

pub fn product_row(product: &Product) -> ProductRow {
    ProductRow {
        id: product.id.clone(),
        name: product.name.clone(),
        seller_id: product.seller_id.clone(),
        category_id: product.category_id.clone(),
        price: product.effective_price(),
        stock_quantity: product.stock_quantity,
        low_stock: product.is_low_stock(),
        status: product.status,
        badge: product.status.badge(),
        created_at: product.created_at,
        actions: action_views(product.status),
    }
}

#[derive(Debug, Deserialize, IntoParams)]
pub struct ProductListQuery {
    /// `all`, `pending`, `approved`, `rejected` or `flagged`
    pub status: Option<String>,
    /// Category id; applied to the fetched list
    pub category: Option<String>,
}

/// Category filter option
#[derive(Debug, Serialize, ToSchema)]
pub struct CategoryOption {
    pub id: String,
    pub name: String,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct ProductListView {
    pub filter: String,
    pub category: Option<String>,
    pub categories: Vec<CategoryOption>,
    pub products: Vec<ProductRow>,
    pub dialog: DialogView,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct ProductDetailView {
    pub product: Product,
    pub badge: StatusBadge,
    pub actions: Vec<ActionView>,
    pub category: Option<ProductCategory>,
    pub history: Vec<AuditEntry>,
    pub dialog: DialogView,
}

/// Create product routes
pub fn product_routes() -> Router<AppState> {
    Router::new()
        .route("/", get(list_products))
        .route("/:id", get(get_product))
        .merge(moderation_routes::<ProductModeration>())
}

/// Keep only products in `category`
pub fn filter_by_category<'a>(
    products: &'a [Product],
    category: Option<&'a str>,
) -> impl Iterator<Item = &'a Product> + 'a {
    products
        .iter()
        .filter(move |p| category.map_or(true, |c| p.category_id.as_deref() == Some(c)))
}

/// Product list: status filtered on the backend, category filtered here
#[utoipa::path(
    get,
    path = "/products",
    tag = "Products",
    params(ProductListQuery),
    responses(
        (status = 200, description = "Products for the filters", body = ProductListView),
        (status = 202, description = "Still loading"),
        (status = 303, description = "Not signed in")
    )
)]
pub async fn list_products(
    State(state): State<AppState>,
    Query(query): Query<ProductListQuery>,
) -> AppResult<View<ProductListView>> {
    let filter = StatusFilter::<ProductStatus>::parse(query.status.as_deref())?;
    let category = query
        .category
        .as_deref()
        .map(str::trim)
        .filter(|c| !c.is_empty() && *c != "all");

    let mut path = format!("{}?status={}", ROUTE_PRODUCTS, filter.as_str());
    if let Some(category) = category {
        path.push_str(&format!("&category={}", category));
    }

    let timeout = state.config.view_loading_timeout();
    let (products, categories) = tokio::join!(
        resolve(timeout, state.queries.products(filter)),
        resolve(timeout, state.queries.categories()),
    );

    let result = both(products, categories).map(|(products, categories)| ProductListView {
        filter: filter.as_str().to_string(),
        category: category.map(String::from),
        categories: categories
            .iter()
            .map(|c| CategoryOption {
                id: c.id.clone(),
                name: c.name.clone(),
            })
            .collect(),
        products: filter_by_category(&products, category).map(product_row).collect(),
        dialog: state.products.dialog_view(),
    });
    Ok(View::render(result, &path, ROUTE_PRODUCTS))
}

/// Product detail with its category and moderation history
#[utoipa::path(
    get,
    path = "/products/{id}",
    tag = "Products",
    params(("id" = String, Path, description = "Product ID")),
    responses(
        (status = 200, description = "Product detail", body = ProductDetailView),
        (status = 404, description = "No such product")
    )
)]
pub async fn get_product(State(state): State<AppState>, Path(id): Path<String>) -> View<ProductDetailView> {
    let timeout = state.config.view_loading_timeout();
    let (product, categories) = tokio::join!(
        resolve(timeout, state.queries.product(&id)),
        resolve(timeout, state.queries.categories()),
    );

    let result = both(product, categories).map(|(product, categories)| ProductDetailView {
        badge: product.status.badge(),
        actions: action_views(product.status),
        category: categories
            .iter()
            .find(|c| product.category_id.as_deref() == Some(c.id.as_str()))
            .cloned(),
        history: state.audit.for_subject(AuditEntity::Product, &id),
        dialog: state.products.dialog_view(),
        product: (*product).clone(),
    });
    View::render(result, &format!("{}/{}", ROUTE_PRODUCTS, id), ROUTE_PRODUCTS)
}

#[cfg(test)]
mod tests {
    use super::*;
    use backend_client::fixtures;

    #[test]
    fn test_category_filter_is_local() {
        let products: Vec<Product> = fixtures::products()
            .into_iter()
            .map(|row| serde_json::from_value(row).unwrap())
            .collect();

        let in_c3: Vec<&str> = filter_by_category(&products, Some("c3"))
            .map(|p| p.id.as_str())
            .collect();
        assert_eq!(in_c3, vec!["p6", "p7"]);
        assert_eq!(filter_by_category(&products, None).count(), products.len());
    }
}

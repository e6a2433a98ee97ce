//! Dashboard totals and analytics.

use std::collections::BTreeMap;

use axum::{extract::State, routing::get, Router};
use serde::Serialize;
use utoipa::ToSchema;

use domain::{
    Product, ProductCategory, ProductStatus, Seller, SellerStatus, StatusFilter, WorkflowStatus,
    ROUTE_DASHBOARD, ROUTE_SELLERS,
};

use crate::handlers::seller_handler::{seller_row, SellerRow};
use crate::handlers::Link;
use crate::state::AppState;
use crate::view::{both, resolve, View};

const ROUTE_ANALYTICS: &str = "/analytics";
const RECENT_SELLERS: usize = 5;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, ToSchema)]
pub struct DashboardStats {
    pub total_sellers: usize,
    /// Live, approved products
    pub active_products: usize,
    /// Pending sellers plus pending products
    pub pending_approvals: usize,
    /// Flagged products
    pub flagged_items: usize,
}

impl DashboardStats {
    pub fn compute(sellers: &[Seller], products: &[Product]) -> Self {
        let pending_sellers = sellers
            .iter()
            .filter(|s| s.status == SellerStatus::Pending)
            .count();
        let pending_products = products
            .iter()
            .filter(|p| p.status == ProductStatus::Pending)
            .count();

        Self {
            total_sellers: sellers.len(),
            active_products: products.iter().filter(|p| p.is_active_listing()).count(),
            pending_approvals: pending_sellers + pending_products,
            flagged_items: products
                .iter()
                .filter(|p| p.status == ProductStatus::Flagged)
                .count(),
        }
    }
}

#[derive(Debug, Serialize, ToSchema)]
pub struct DashboardView {
    pub stats: DashboardStats,
    pub recent_sellers: Vec<SellerRow>,
    pub links: Vec<Link>,
}

/// Count for one status value
#[derive(Debug, Clone, PartialEq, Eq, Serialize, ToSchema)]
pub struct StatusCount {
    pub status: String,
    pub label: String,
    pub count: usize,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, ToSchema)]
pub struct CategoryCount {
    pub category_id: String,
    pub name: String,
    pub products: usize,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct AnalyticsView {
    pub sellers: Vec<StatusCount>,
    pub products: Vec<StatusCount>,
    pub categories: Vec<CategoryCount>,
    /// Products without a known category
    pub uncategorized: usize,
}

/// Create dashboard routes
pub fn dashboard_routes() -> Router<AppState> {
    Router::new()
        .route(ROUTE_DASHBOARD, get(dashboard))
        .route(ROUTE_ANALYTICS, get(analytics))
}

/// Counts of each status, every status listed even when zero
pub fn status_counts<S: WorkflowStatus>(statuses: impl Iterator<Item = S>) -> Vec<StatusCount> {
    let statuses: Vec<S> = statuses.collect();
    S::all()
        .iter()
        .map(|status| StatusCount {
            status: status.as_str().to_string(),
            label: status.badge().label.to_string(),
            count: statuses.iter().filter(|s| *s == status).count(),
        })
        .collect()
}

/// Products per category, in category order
pub fn category_counts(
    categories: &[ProductCategory],
    products: &[Product],
) -> (Vec<CategoryCount>, usize) {
    let mut per_category: BTreeMap<&str, usize> = BTreeMap::new();
    for product in products {
        if let Some(id) = product.category_id.as_deref() {
            *per_category.entry(id).or_default() += 1;
        }
    }

    let counts: Vec<CategoryCount> = categories
        .iter()
        .map(|c| CategoryCount {
            category_id: c.id.clone(),
            name: c.name.clone(),
            products: per_category.get(c.id.as_str()).copied().unwrap_or(0),
        })
        .collect();
    let counted: usize = counts.iter().map(|c| c.products).sum();
    (counts, products.len().saturating_sub(counted))
}

/// Totals and the newest seller applications
#[utoipa::path(
    get,
    path = "/dashboard",
    tag = "Dashboard",
    responses(
        (status = 200, description = "Dashboard totals", body = DashboardView),
        (status = 202, description = "Still loading"),
        (status = 303, description = "Not signed in")
    )
)]
pub async fn dashboard(State(state): State<AppState>) -> View<DashboardView> {
    let timeout = state.config.view_loading_timeout();
    let (sellers, products) = tokio::join!(
        resolve(timeout, state.queries.sellers(StatusFilter::All)),
        resolve(timeout, state.queries.products(StatusFilter::All)),
    );

    let result = both(sellers, products).map(|(sellers, products)| {
        let mut recent: Vec<&Seller> = sellers.iter().collect();
        recent.sort_by(|a, b| b.created_at.cmp(&a.created_at));

        DashboardView {
            stats: DashboardStats::compute(&sellers, &products),
            recent_sellers: recent
                .into_iter()
                .take(RECENT_SELLERS)
                .map(seller_row)
                .collect(),
            links: vec![
                Link::new("Review pending sellers", format!("{}?status=pending", ROUTE_SELLERS)),
                Link::new("Review flagged products", "/products?status=flagged"),
            ],
        }
    });
    View::render(result, ROUTE_DASHBOARD, ROUTE_DASHBOARD)
}

/// Counts per status and per category
#[utoipa::path(
    get,
    path = "/analytics",
    tag = "Dashboard",
    responses(
        (status = 200, description = "Marketplace breakdown", body = AnalyticsView),
        (status = 202, description = "Still loading")
    )
)]
pub async fn analytics(State(state): State<AppState>) -> View<AnalyticsView> {
    let timeout = state.config.view_loading_timeout();
    let (sellers, products, categories) = tokio::join!(
        resolve(timeout, state.queries.sellers(StatusFilter::All)),
        resolve(timeout, state.queries.products(StatusFilter::All)),
        resolve(timeout, state.queries.categories()),
    );

    let result = both(both(sellers, products), categories).map(|((sellers, products), categories)| {
        let (categories, uncategorized) = category_counts(&categories, &products);
        AnalyticsView {
            sellers: status_counts(sellers.iter().map(|s| s.status)),
            products: status_counts(products.iter().map(|p| p.status)),
            categories,
            uncategorized,
        }
    });
    View::render(result, ROUTE_ANALYTICS, ROUTE_DASHBOARD)
}

#[cfg(test)]
mod tests {
    use super::*;
    use backend_client::fixtures;
    use serde::de::DeserializeOwned;
    use serde_json::Value;

    fn parse<T: DeserializeOwned>(rows: Vec<Value>) -> Vec<T> {
        rows.into_iter()
            .map(|row| serde_json::from_value(row).unwrap())
            .collect()
    }

    #[test]
    fn test_dashboard_totals_from_demo_data() {
        let sellers: Vec<Seller> = parse(fixtures::sellers());
        let products: Vec<Product> = parse(fixtures::products());

        let stats = DashboardStats::compute(&sellers, &products);
        assert_eq!(stats.total_sellers, sellers.len());
        assert_eq!(stats.active_products, 4);
        // sellers 2 and 5, products p3 and p6
        assert_eq!(stats.pending_approvals, 4);
        assert_eq!(stats.flagged_items, 1);
    }

    #[test]
    fn test_status_counts_list_every_status() {
        let counts = status_counts([ProductStatus::Flagged, ProductStatus::Flagged].into_iter());
        assert_eq!(counts.len(), 4);
        assert_eq!(counts[0].count, 0);
        let flagged = counts.iter().find(|c| c.status == "flagged").unwrap();
        assert_eq!(flagged.count, 2);
    }

    #[test]
    fn test_category_counts() {
        let categories: Vec<ProductCategory> = parse(fixtures::categories());
        let mut products: Vec<Product> = parse(fixtures::products());
        products[0].category_id = None;

        let (counts, uncategorized) = category_counts(&categories, &products);
        assert_eq!(counts[0].products, 2);
        assert_eq!(counts[2].products, 2);
        assert_eq!(uncategorized, 1);
    }
}

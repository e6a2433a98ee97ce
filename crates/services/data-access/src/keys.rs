//! Query keys and the keys each mutation invalidates.
//!
//! Invalidation sets are matched as prefixes, so `["seller-products"]`
//! covers every seller's product list.

use domain::{ProductStatus, SellerStatus, StatusFilter, WorkflowStatus};
use query_cache::QueryKey;

pub const USER: &str = "user";
pub const PROFILE: &str = "profile";
pub const ALL_SELLERS: &str = "all-sellers";
pub const SELLERS_BY_STATUS: &str = "sellers-by-status";
pub const SELLER_DETAILS: &str = "seller-details";
pub const PRODUCTS: &str = "products";
pub const PRODUCTS_BY_STATUS: &str = "products-by-status";
pub const SELLER_PRODUCTS: &str = "seller-products";
pub const PRODUCT: &str = "product";
pub const PRODUCT_CATEGORIES: &str = "product-categories";
pub const PRODUCT_CATEGORY: &str = "product-category";

// =============================================================================
// Keys
// =============================================================================

pub fn user() -> QueryKey {
    QueryKey::from([USER])
}

pub fn profile(id: &str) -> QueryKey {
    QueryKey::from([PROFILE, id])
}

pub fn all_sellers() -> QueryKey {
    QueryKey::from([ALL_SELLERS])
}

pub fn sellers_by_status(status: SellerStatus) -> QueryKey {
    QueryKey::from([SELLERS_BY_STATUS, status.as_str()])
}

/// `all` reads the unfiltered list
pub fn sellers(filter: StatusFilter<SellerStatus>) -> QueryKey {
    match filter {
        StatusFilter::All => all_sellers(),
        StatusFilter::Only(status) => sellers_by_status(status),
    }
}

pub fn seller_details(id: &str) -> QueryKey {
    QueryKey::from([SELLER_DETAILS, id])
}

pub fn products() -> QueryKey {
    QueryKey::from([PRODUCTS])
}

pub fn products_by_status(status: ProductStatus) -> QueryKey {
    QueryKey::from([PRODUCTS_BY_STATUS, status.as_str()])
}

pub fn products_filtered(filter: StatusFilter<ProductStatus>) -> QueryKey {
    match filter {
        StatusFilter::All => products(),
        StatusFilter::Only(status) => products_by_status(status),
    }
}

pub fn seller_products(seller_id: &str) -> QueryKey {
    QueryKey::from([SELLER_PRODUCTS, seller_id])
}

pub fn product(id: &str) -> QueryKey {
    QueryKey::from([PRODUCT, id])
}

pub fn product_categories() -> QueryKey {
    QueryKey::from([PRODUCT_CATEGORIES])
}

pub fn product_category(id: &str) -> QueryKey {
    QueryKey::from([PRODUCT_CATEGORY, id])
}

// =============================================================================
// Invalidation sets
// =============================================================================

/// Keys a seller status change or removal can affect
pub fn seller_transition(id: &str, from: SellerStatus, to: Option<SellerStatus>) -> Vec<QueryKey> {
    let mut keys = vec![all_sellers(), sellers_by_status(from)];
    if let Some(to) = to.filter(|to| *to != from) {
        keys.push(sellers_by_status(to));
    }
    keys.push(seller_details(id));
    keys
}

/// Seller notes only touch the seller's own rows
pub fn seller_remarks(id: &str, status: SellerStatus) -> Vec<QueryKey> {
    vec![all_sellers(), sellers_by_status(status), seller_details(id)]
}

/// Keys a product status change or removal can affect
pub fn product_transition(
    id: &str,
    seller_id: Option<&str>,
    from: ProductStatus,
    to: Option<ProductStatus>,
) -> Vec<QueryKey> {
    let mut keys = vec![products(), products_by_status(from)];
    if let Some(to) = to.filter(|to| *to != from) {
        keys.push(products_by_status(to));
    }
    keys.push(product(id));
    keys.push(match seller_id {
        Some(seller_id) => seller_products(seller_id),
        None => QueryKey::from([SELLER_PRODUCTS]),
    });
    // Category listings show product counts
    keys.push(product_categories());
    keys
}

/// Keys a category create, edit or delete can affect
pub fn category_change(id: Option<&str>) -> Vec<QueryKey> {
    let mut keys = vec![product_categories()];
    if let Some(id) = id {
        keys.push(product_category(id));
    }
    keys
}

/// Keys a profile edit can affect
pub fn profile_change(id: &str) -> Vec<QueryKey> {
    vec![user(), profile(id)]
}

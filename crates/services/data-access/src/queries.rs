//! Typed cached reads.
//!
//! Every read goes through the query cache under its key from [`crate::keys`],
//! so views asking for the same data share one request and one result.

use std::sync::Arc;

use common::AppResult;
use domain::{Product, ProductCategory, ProductStatus, Profile, Seller, SellerStatus, StatusFilter};
use query_cache::{QueryCache, QueryState};

use crate::keys;
use crate::repository::Repositories;

/// Cached read access to every entity
#[derive(Clone)]
pub struct Queries {
    cache: QueryCache,
    repos: Repositories,
}

impl Queries {
    /// Create new query facade
    pub fn new(cache: QueryCache, repos: Repositories) -> Self {
        Self { cache, repos }
    }

    pub fn cache(&self) -> &QueryCache {
        &self.cache
    }

    pub fn repositories(&self) -> &Repositories {
        &self.repos
    }

    // =========================================================================
    // Sellers
    // =========================================================================

    /// Sellers for a status filter; `All` reads the unfiltered list
    pub async fn sellers(&self, filter: StatusFilter<SellerStatus>) -> QueryState<Vec<Seller>> {
        let repo = self.repos.sellers.clone();
        self.cache
            .fetch(keys::sellers(filter), move || {
                let repo = repo.clone();
                async move {
                    match filter {
                        StatusFilter::All => repo.fetch_all().await.into_result(),
                        StatusFilter::Only(status) => repo.fetch_by_status(status).await.into_result(),
                    }
                }
            })
            .await
    }

    pub async fn seller(&self, id: &str) -> QueryState<Seller> {
        let repo = self.repos.sellers.clone();
        let id = id.to_string();
        self.cache
            .fetch(keys::seller_details(&id), move || {
                let repo = repo.clone();
                let id = id.clone();
                async move { repo.fetch_by_id(&id).await }
            })
            .await
    }

    // =========================================================================
    // Products
    // =========================================================================

    pub async fn products(&self, filter: StatusFilter<ProductStatus>) -> QueryState<Vec<Product>> {
        let repo = self.repos.products.clone();
        self.cache
            .fetch(keys::products_filtered(filter), move || {
                let repo = repo.clone();
                async move {
                    match filter {
                        StatusFilter::All => repo.fetch_all().await.into_result(),
                        StatusFilter::Only(status) => repo.fetch_by_status(status).await.into_result(),
                    }
                }
            })
            .await
    }

    pub async fn seller_products(&self, seller_id: &str) -> QueryState<Vec<Product>> {
        let repo = self.repos.products.clone();
        let seller_id = seller_id.to_string();
        self.cache
            .fetch(keys::seller_products(&seller_id), move || {
                let repo = repo.clone();
                let seller_id = seller_id.clone();
                async move { repo.fetch_by_seller(&seller_id).await.into_result() }
            })
            .await
    }

    pub async fn product(&self, id: &str) -> QueryState<Product> {
        let repo = self.repos.products.clone();
        let id = id.to_string();
        self.cache
            .fetch(keys::product(&id), move || {
                let repo = repo.clone();
                let id = id.clone();
                async move { repo.fetch_by_id(&id).await }
            })
            .await
    }

    // =========================================================================
    // Categories and profiles
    // =========================================================================

    pub async fn categories(&self) -> QueryState<Vec<ProductCategory>> {
        let repo = self.repos.categories.clone();
        self.cache
            .fetch(keys::product_categories(), move || {
                let repo = repo.clone();
                async move { repo.fetch_all().await.into_result() }
            })
            .await
    }

    pub async fn category(&self, id: &str) -> QueryState<ProductCategory> {
        let repo = self.repos.categories.clone();
        let id = id.to_string();
        self.cache
            .fetch(keys::product_category(&id), move || {
                let repo = repo.clone();
                let id = id.clone();
                async move { repo.fetch_by_id(&id).await }
            })
            .await
    }

    pub async fn profile(&self, id: &str) -> QueryState<Profile> {
        let repo = self.repos.profiles.clone();
        let id = id.to_string();
        self.cache
            .fetch(keys::profile(&id), move || {
                let repo = repo.clone();
                let id = id.clone();
                async move { repo.fetch_by_id(&id).await }
            })
            .await
    }

    /// Categories fetched straight through the cache as a plain result
    pub async fn category_list(&self) -> AppResult<Arc<Vec<ProductCategory>>> {
        self.categories().await.result()
    }
}

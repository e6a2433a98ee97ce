//! Cached reads and write invalidation against the in-memory backend.

use std::sync::Arc;

use backend_client::fixtures;
use backend_client::{MemoryBackend, Operation, Table, TableApi};
use chrono::Utc;
use common::{AppError, QueryCacheConfig};
use data_access::{keys, Queries, Repositories};
use domain::{plan, ModerationAction, ProductStatus, SellerStatus, StatusFilter};
use query_cache::QueryCache;

fn create_test_queries() -> (Queries, Arc<MemoryBackend>) {
    let backend = Arc::new(fixtures::seeded_backend());
    let tables: Arc<dyn TableApi> = backend.clone();
    let cache = QueryCache::new(QueryCacheConfig::default());
    (Queries::new(cache, Repositories::new(tables)), backend)
}

#[tokio::test]
async fn test_same_key_is_fetched_once() {
    let (queries, backend) = create_test_queries();

    let (a, b) = tokio::join!(
        queries.sellers(StatusFilter::Only(SellerStatus::Pending)),
        queries.sellers(StatusFilter::Only(SellerStatus::Pending)),
    );
    let again = queries.sellers(StatusFilter::Only(SellerStatus::Pending)).await;

    assert_eq!(a.result().unwrap().len(), 2);
    assert_eq!(b.result().unwrap().len(), 2);
    assert_eq!(again.result().unwrap().len(), 2);
    assert_eq!(
        backend.table_call_count(Operation::Select, Table::SellerVerifications),
        1
    );
}

#[tokio::test]
async fn test_approval_is_visible_in_every_affected_list() {
    let (queries, _backend) = create_test_queries();

    let pending = queries.sellers(StatusFilter::Only(SellerStatus::Pending)).await;
    assert!(pending.result().unwrap().iter().any(|s| s.id == "5"));
    let verified_before = queries.sellers(StatusFilter::Only(SellerStatus::Verified)).await;
    let verified_count = verified_before.result().unwrap().len();
    queries.sellers(StatusFilter::All).await;

    let transition = plan(SellerStatus::Pending, ModerationAction::Approve).unwrap();
    let review = transition.review("admin-1", Utc::now(), None).unwrap().unwrap();
    let sellers = queries.repositories().sellers.clone();
    queries
        .cache()
        .mutate(
            async move { sellers.update_review("5", transition.from, review).await },
            keys::seller_transition("5", transition.from, transition.to),
        )
        .await
        .unwrap();

    let pending = queries.sellers(StatusFilter::Only(SellerStatus::Pending)).await;
    assert!(!pending.result().unwrap().iter().any(|s| s.id == "5"));

    let verified = queries.sellers(StatusFilter::Only(SellerStatus::Verified)).await;
    assert_eq!(verified.result().unwrap().len(), verified_count + 1);

    let all = queries.sellers(StatusFilter::All).await;
    let seller = all.result().unwrap().iter().find(|s| s.id == "5").cloned().unwrap();
    assert_eq!(seller.status, SellerStatus::Verified);
    assert_eq!(seller.verified_by.as_deref(), Some("admin-1"));
}

#[tokio::test]
async fn test_failed_write_leaves_cached_lists_untouched() {
    let (queries, backend) = create_test_queries();
    queries.products(StatusFilter::Only(ProductStatus::Pending)).await;
    let selects = backend.table_call_count(Operation::Select, Table::Products);

    backend.fail_next(Operation::Update, AppError::Forbidden);
    let transition = plan(ProductStatus::Pending, ModerationAction::Suspend).unwrap();
    let review = transition.review("admin-1", Utc::now(), None).unwrap().unwrap();
    let products = queries.repositories().products.clone();
    let result = queries
        .cache()
        .mutate(
            async move { products.update_review("p3", transition.from, review).await },
            keys::product_transition("p3", Some("1"), transition.from, transition.to),
        )
        .await;
    assert_eq!(result.unwrap_err(), AppError::Forbidden);

    queries.products(StatusFilter::Only(ProductStatus::Pending)).await;
    assert_eq!(
        backend.table_call_count(Operation::Select, Table::Products),
        selects
    );
}

#[tokio::test]
async fn test_missing_seller_surfaces_not_found() {
    let (queries, _backend) = create_test_queries();

    let state = queries.seller("does-not-exist").await;
    assert!(state.is_error());
    assert_eq!(state.error, Some(AppError::NotFound));
}

#[tokio::test]
async fn test_transient_list_failure_is_retried() {
    let (queries, backend) = create_test_queries();
    backend.fail_next(Operation::Select, AppError::network("connection reset"));

    let categories = queries.categories().await;
    assert_eq!(categories.result().unwrap().len(), 6);
    assert_eq!(backend.table_call_count(Operation::Select, Table::Categories), 2);
}

//! Moderation and category flows against the in-memory backend.

use std::sync::Arc;
use std::time::Duration;

use backend_client::fixtures::{self, DEMO_ADMIN_EMAIL, DEMO_ADMIN_PASSWORD};
use backend_client::{MemoryBackend, Operation, Table};
use common::{AppError, QueryCacheConfig};
use data_access::{Queries, Repositories};
use domain::{
    CategoryUpdate, ModerationAction, NewCategory, ProductStatus, SellerStatus, StatusFilter,
    ROUTE_SELLERS,
};
use query_cache::QueryCache;
use serde_json::{json, Value};
use session::{SessionStore, SignInCredentials};
use tokio_test::assert_ok;
use workflow::{
    ActorSource, AuditEntity, AuditTrail, CategoryEditor, Dialog, Origin, ProductController,
    ProductModeration, SellerController, SellerModeration, ToastQueue, ToastVariant,
};

struct Harness {
    backend: Arc<MemoryBackend>,
    queries: Queries,
    session: SessionStore,
    toasts: ToastQueue,
    audit: AuditTrail,
    sellers: SellerController,
    products: ProductController,
    categories: CategoryEditor,
}

fn create_test_harness(backend: MemoryBackend) -> Harness {
    let backend = Arc::new(backend);
    let repos = Repositories::new(backend.clone());
    let cache = QueryCache::new(QueryCacheConfig::default());
    let queries = Queries::new(cache.clone(), repos.clone());
    let session = SessionStore::new(backend.clone(), backend.clone(), repos.profiles.clone());
    let actors: Arc<dyn ActorSource> = Arc::new(session.clone());
    let toasts = ToastQueue::new();
    let audit = AuditTrail::new();

    Harness {
        sellers: SellerController::new(
            SellerModeration::new(repos.sellers.clone()),
            cache.clone(),
            actors.clone(),
            toasts.clone(),
            audit.clone(),
        ),
        products: ProductController::new(
            ProductModeration::new(repos.products.clone()),
            cache,
            actors.clone(),
            toasts.clone(),
            audit.clone(),
        ),
        categories: CategoryEditor::new(queries.clone(), actors, toasts.clone(), audit.clone()),
        backend,
        queries,
        session,
        toasts,
        audit,
    }
}

async fn signed_in(backend: MemoryBackend) -> Harness {
    let harness = create_test_harness(backend);
    harness
        .session
        .sign_in(SignInCredentials {
            email: DEMO_ADMIN_EMAIL.into(),
            password: DEMO_ADMIN_PASSWORD.into(),
        })
        .await
        .unwrap();
    harness.backend.reset_call_counts();
    harness
}

fn put_seller(backend: &MemoryBackend, row: Value) {
    let id = row["id"].clone();
    let mut rows = backend.rows(Table::SellerVerifications);
    rows.retain(|r| r["id"] != id);
    rows.push(row);
    backend.seed_table(Table::SellerVerifications, rows);
}

fn row(backend: &MemoryBackend, table: Table, id: &str) -> Option<Value> {
    backend.rows(table).into_iter().find(|r| r["id"] == id)
}

// =============================================================================
// Sellers
// =============================================================================

#[tokio::test]
async fn test_approving_pending_seller_stamps_review_and_leaves_pending_list() {
    let backend = fixtures::seeded_backend();
    put_seller(&backend, json!({ "id": "42", "business_name": "Corner Shop", "status": "pending" }));
    let h = signed_in(backend).await;
    let admin_id = h.session.current_user_id().unwrap();

    let pending = h.queries.sellers(StatusFilter::Only(SellerStatus::Pending)).await;
    assert!(pending.result().unwrap().iter().any(|s| s.id == "42"));

    let dialog = h
        .sellers
        .request_by_id("42", ModerationAction::Approve, Origin::List)
        .await
        .unwrap();
    assert!(matches!(dialog, Dialog::Confirm { action: ModerationAction::Approve, .. }));
    assert!(h.sellers.can_confirm());

    let outcome = assert_ok!(h.sellers.confirm().await);
    assert_eq!(outcome.status, Some(SellerStatus::Verified));
    assert_eq!(outcome.navigate_to, None);
    assert_eq!(h.backend.table_call_count(Operation::Update, Table::SellerVerifications), 1);

    let stored = row(&h.backend, Table::SellerVerifications, "42").unwrap();
    assert_eq!(stored["status"], "verified");
    assert_eq!(stored["verified_by"], json!(admin_id));
    assert!(!stored["verification_date"].is_null());

    let pending = h.queries.sellers(StatusFilter::Only(SellerStatus::Pending)).await;
    assert!(!pending.result().unwrap().iter().any(|s| s.id == "42"));
    let verified = h.queries.sellers(StatusFilter::Only(SellerStatus::Verified)).await;
    assert!(verified.result().unwrap().iter().any(|s| s.id == "42"));

    assert_eq!(h.sellers.dialog(), Dialog::Closed);
    let toast = h.toasts.latest().unwrap();
    assert_eq!(toast.variant, ToastVariant::Success);
    assert_eq!(toast.title, "Seller approved");

    let history = h.audit.for_subject(AuditEntity::Seller, "42");
    assert_eq!(history.len(), 1);
    assert_eq!(history[0].actor.id, admin_id);
    assert_eq!(history[0].to_status.as_deref(), Some("verified"));
}

#[tokio::test]
async fn test_approve_after_another_admin_rejected_is_refused() {
    let backend = fixtures::seeded_backend();
    put_seller(&backend, json!({ "id": "42", "business_name": "Corner Shop", "status": "pending" }));
    let h = signed_in(backend).await;
    h.queries.sellers(StatusFilter::Only(SellerStatus::Pending)).await;

    h.sellers
        .request_by_id("42", ModerationAction::Approve, Origin::List)
        .await
        .unwrap();
    put_seller(
        &h.backend,
        json!({ "id": "42", "business_name": "Corner Shop", "status": "rejected", "remarks": "fraud" }),
    );
    h.backend.reset_call_counts();

    let err = h.sellers.confirm().await.unwrap_err();
    assert_eq!(err, AppError::StaleRecord("Seller 42".into()));
    assert_eq!(h.backend.table_call_count(Operation::Update, Table::SellerVerifications), 1);

    let stored = row(&h.backend, Table::SellerVerifications, "42").unwrap();
    assert_eq!(stored["status"], "rejected");
    assert_eq!(stored["remarks"], "fraud");
    assert!(stored.get("verified_by").map_or(true, Value::is_null));

    assert_eq!(h.toasts.latest().unwrap().variant, ToastVariant::Destructive);
    assert!(matches!(
        h.sellers.dialog(),
        Dialog::Confirm { action: ModerationAction::Approve, .. }
    ));
    assert!(h.audit.is_empty());

    // Cached lists are not invalidated by the refused write
    h.queries.sellers(StatusFilter::Only(SellerStatus::Pending)).await;
    assert_eq!(h.backend.table_call_count(Operation::Select, Table::SellerVerifications), 0);
}

#[tokio::test]
async fn test_blank_rejection_reason_never_reaches_backend() {
    let backend = fixtures::seeded_backend();
    put_seller(&backend, json!({ "id": "7", "business_name": "Sports Unlimited", "status": "pending" }));
    let h = signed_in(backend).await;

    h.sellers
        .request_by_id("7", ModerationAction::Reject, Origin::List)
        .await
        .unwrap();
    assert!(!h.sellers.can_confirm());

    h.sellers.set_reason("   ").unwrap();
    assert!(!h.sellers.can_confirm());
    assert!(!h.sellers.dialog_view().can_confirm);

    let err = h.sellers.confirm().await.unwrap_err();
    assert!(matches!(err, AppError::Validation(_)));
    assert_eq!(h.backend.call_count(Operation::Update), 0);
    assert!(matches!(h.sellers.dialog(), Dialog::Reject { .. }));
}

#[tokio::test]
async fn test_rejection_stores_trimmed_reason() {
    let h = signed_in(fixtures::seeded_backend()).await;

    h.sellers
        .request_by_id("2", ModerationAction::Reject, Origin::List)
        .await
        .unwrap();
    h.sellers.set_reason("  Blurry business permit ").unwrap();
    assert!(h.sellers.can_confirm());

    let outcome = assert_ok!(h.sellers.confirm().await);
    assert_eq!(outcome.status, Some(SellerStatus::Rejected));

    let stored = row(&h.backend, Table::SellerVerifications, "2").unwrap();
    assert_eq!(stored["status"], "rejected");
    assert_eq!(stored["remarks"], "Blurry business permit");
    assert_eq!(stored["verification_remarks"], "Blurry business permit");
    assert_eq!(
        h.audit.list(1)[0].remarks.as_deref(),
        Some("Blurry business permit")
    );
}

#[tokio::test(start_paused = true)]
async fn test_second_confirm_while_in_flight_is_refused() {
    let h = signed_in(fixtures::seeded_backend()).await;
    h.sellers
        .request_by_id("5", ModerationAction::Approve, Origin::List)
        .await
        .unwrap();
    h.backend.set_latency(Some(Duration::from_millis(200)));

    let first = h.sellers.clone();
    let second = h.sellers.clone();
    let (a, b) = tokio::join!(first.confirm(), async {
        tokio::task::yield_now().await;
        assert!(second.is_submitting());
        assert_eq!(second.cancel().unwrap_err(), AppError::InFlight);
        second.confirm().await
    });

    assert_ok!(a);
    assert_eq!(b.unwrap_err(), AppError::InFlight);
    assert_eq!(h.backend.call_count(Operation::Update), 1);
    assert!(!h.sellers.is_submitting());
}

#[tokio::test]
async fn test_invalid_action_is_refused_and_cancel_is_local() {
    let h = signed_in(fixtures::seeded_backend()).await;

    let verified = h.queries.seller("1").await.result().unwrap();
    assert_eq!(
        h.sellers.available_actions(&verified),
        vec![ModerationAction::Suspend, ModerationAction::Delete]
    );
    let err = h
        .sellers
        .request(ModerationAction::Approve, (*verified).clone(), Origin::List)
        .unwrap_err();
    assert!(matches!(err, AppError::BadRequest(_)));
    assert_eq!(h.sellers.dialog(), Dialog::Closed);

    h.sellers
        .request_by_id("5", ModerationAction::Approve, Origin::List)
        .await
        .unwrap();
    h.backend.reset_call_counts();
    assert_ok!(h.sellers.cancel());
    assert_eq!(h.sellers.dialog(), Dialog::Closed);
    assert_eq!(h.backend.call_count(Operation::Update), 0);

    let err = h.sellers.confirm().await.unwrap_err();
    assert!(matches!(err, AppError::BadRequest(_)));
}

#[tokio::test]
async fn test_suspension_keeps_review_stamp() {
    let h = signed_in(fixtures::seeded_backend()).await;

    h.sellers
        .request_by_id("1", ModerationAction::Suspend, Origin::List)
        .await
        .unwrap();
    let outcome = assert_ok!(h.sellers.confirm().await);
    assert_eq!(outcome.status, Some(SellerStatus::Suspended));

    let stored = row(&h.backend, Table::SellerVerifications, "1").unwrap();
    assert_eq!(stored["status"], "suspended");
    assert_eq!(stored["verified_by"], "Admin User");
    assert_eq!(stored["verification_date"], "2023-04-15T14:25:00Z");

    let entry = &h.audit.for_subject(AuditEntity::Seller, "1")[0];
    assert_eq!(entry.action, "suspend");
    assert_eq!(entry.from_status.as_deref(), Some("verified"));
    assert_eq!(entry.to_status.as_deref(), Some("suspended"));
}

#[tokio::test]
async fn test_delete_from_detail_navigates_to_list() {
    let h = signed_in(fixtures::seeded_backend()).await;
    assert_ok!(h.queries.seller("8").await.result());

    h.sellers
        .request_by_id("8", ModerationAction::Delete, Origin::Detail)
        .await
        .unwrap();
    let outcome = assert_ok!(h.sellers.confirm().await);
    assert_eq!(outcome.status, None);
    assert_eq!(outcome.navigate_to.as_deref(), Some(ROUTE_SELLERS));

    assert!(row(&h.backend, Table::SellerVerifications, "8").is_none());
    assert_eq!(
        h.queries.seller("8").await.result().unwrap_err(),
        AppError::NotFound
    );
}

#[tokio::test]
async fn test_signed_out_admin_cannot_confirm() {
    let h = create_test_harness(fixtures::seeded_backend());

    h.sellers
        .request_by_id("5", ModerationAction::Approve, Origin::List)
        .await
        .unwrap();
    h.backend.reset_call_counts();

    assert_eq!(h.sellers.confirm().await.unwrap_err(), AppError::Unauthorized);
    assert_eq!(h.backend.call_count(Operation::Update), 0);
    assert!(!h.sellers.is_submitting());
}

// =============================================================================
// Products
// =============================================================================

#[tokio::test]
async fn test_failed_product_write_keeps_dialog_and_cache() {
    let h = signed_in(fixtures::seeded_backend()).await;
    let pending = h.queries.products(StatusFilter::Only(ProductStatus::Pending)).await;
    assert_eq!(pending.result().unwrap().len(), 2);

    h.products
        .request_by_id("p3", ModerationAction::Approve, Origin::List)
        .await
        .unwrap();
    h.backend.fail_next(Operation::Update, AppError::Forbidden);
    h.backend.reset_call_counts();

    assert_eq!(h.products.confirm().await.unwrap_err(), AppError::Forbidden);

    let toast = h.toasts.latest().unwrap();
    assert_eq!(toast.variant, ToastVariant::Destructive);
    assert_eq!(toast.title, "Could not approve product");
    assert!(matches!(
        h.products.dialog(),
        Dialog::Confirm { action: ModerationAction::Approve, .. }
    ));
    assert!(h.audit.is_empty());

    // Still fresh: served without another read
    let pending = h.queries.products(StatusFilter::Only(ProductStatus::Pending)).await;
    assert_eq!(pending.result().unwrap().len(), 2);
    assert_eq!(h.backend.table_call_count(Operation::Select, Table::Products), 0);

    // Retry from the same dialog
    let outcome = assert_ok!(h.products.confirm().await);
    assert_eq!(outcome.status, Some(ProductStatus::Approved));
}

#[tokio::test]
async fn test_flagging_product() {
    let h = signed_in(fixtures::seeded_backend()).await;

    h.products
        .request_by_id("p4", ModerationAction::Suspend, Origin::Detail)
        .await
        .unwrap();
    let view = h.products.dialog_view();
    assert_eq!(view.kind, "confirm");
    assert_eq!(view.title.as_deref(), Some("Flag product"));
    assert_eq!(view.confirm_label.as_deref(), Some("Flag"));

    let outcome = assert_ok!(h.products.confirm().await);
    assert_eq!(outcome.status, Some(ProductStatus::Flagged));
    assert_eq!(h.toasts.latest().unwrap().title, "Product flagged");

    let stored = row(&h.backend, Table::Products, "p4").unwrap();
    assert_eq!(stored["status"], "flagged");

    let flagged = h.queries.products(StatusFilter::Only(ProductStatus::Flagged)).await;
    let flagged: Vec<String> = flagged.result().unwrap().iter().map(|p| p.id.clone()).collect();
    assert_eq!(flagged, vec!["p4", "p5"]);
}

// =============================================================================
// Categories
// =============================================================================

#[tokio::test]
async fn test_category_create_rename_and_delete() {
    let backend = fixtures::seeded_backend();
    backend.seed_table(Table::Categories, Vec::new());
    let h = signed_in(backend).await;

    let parent = assert_ok!(
        h.categories
            .create(NewCategory {
                name: "Smart Devices".into(),
                ..Default::default()
            })
            .await
    );
    assert_eq!(parent.slug, "smart-devices");
    assert_eq!(h.toasts.latest().unwrap().title, "Category created");

    let renamed = assert_ok!(
        h.categories
            .update(
                &parent.id,
                CategoryUpdate {
                    name: Some("Smart Home Devices".into()),
                    ..Default::default()
                },
            )
            .await
    );
    assert_eq!(renamed.name, "Smart Home Devices");
    assert_eq!(renamed.slug, "smart-devices");

    let restored = assert_ok!(
        h.categories
            .update(
                &parent.id,
                CategoryUpdate {
                    name: Some("Smart Devices".into()),
                    ..Default::default()
                },
            )
            .await
    );
    assert_eq!(restored.name, "Smart Devices");
    assert_eq!(restored.slug, "smart-devices");
    assert_eq!(h.queries.category(&parent.id).await.result().unwrap().name, "Smart Devices");

    let child = assert_ok!(
        h.categories
            .create(NewCategory {
                name: "Speakers".into(),
                parent_id: Some(parent.id.clone()),
                ..Default::default()
            })
            .await
    );
    assert_eq!(child.parent_id.as_deref(), Some(parent.id.as_str()));

    let err = h
        .categories
        .create(NewCategory {
            name: "Tweeters".into(),
            parent_id: Some(child.id.clone()),
            ..Default::default()
        })
        .await
        .unwrap_err();
    assert!(matches!(err, AppError::Validation(_)));

    let err = h.categories.delete(&parent.id, true).await.unwrap_err();
    assert!(matches!(err, AppError::Validation(_)));
    assert_eq!(h.toasts.latest().unwrap().variant, ToastVariant::Destructive);

    let err = h.categories.delete(&child.id, false).await.unwrap_err();
    assert!(matches!(err, AppError::Validation(_)));

    assert_ok!(h.categories.delete(&child.id, true).await);
    assert_ok!(h.categories.delete(&parent.id, true).await);
    assert!(h.queries.categories().await.result().unwrap().is_empty());

    let actions: Vec<String> = h
        .audit
        .list(10)
        .into_iter()
        .filter(|e| e.entity == AuditEntity::Category)
        .map(|e| e.action)
        .collect();
    assert_eq!(actions, vec!["delete", "delete", "create", "update", "create"]);
}

#[tokio::test]
async fn test_bad_explicit_slug_is_refused() {
    let h = signed_in(fixtures::seeded_backend()).await;

    let err = h
        .categories
        .update(
            "c5",
            CategoryUpdate {
                slug: Some("Audio Gear".into()),
                ..Default::default()
            },
        )
        .await
        .unwrap_err();
    assert!(matches!(err, AppError::Validation(_)));
    assert_eq!(h.backend.call_count(Operation::Update), 0);
}

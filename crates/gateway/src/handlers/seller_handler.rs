//! Seller list and detail pages.

use axum::{
    extract::{Extension, Path, Query, State},
    response::Json,
    routing::{get, put},
    Router,
};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::{IntoParams, ToSchema};
use validator::Validate;

use common::AppResult;
use data_access::keys;
use domain::{
    ModerationAction, Seller, SellerStatus, StatusBadge, StatusFilter, WorkflowStatus,
    ROUTE_SELLERS,
};
use workflow::{Actor, AuditEntity, AuditEntry, AuditRecord, DialogView, SellerModeration};

use crate::extractors::ValidatedJson;
use crate::handlers::moderation_handler::moderation_routes;
use crate::handlers::product_handler::{product_row, ProductRow};
use crate::state::AppState;
use crate::view::{both, resolve, View};

/// Action button on a row or detail page
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct ActionView {
    pub action: ModerationAction,
    pub label: String,
}

pub fn action_views<S: WorkflowStatus>(status: S) -> Vec<ActionView> {
    domain::available_actions(status)
        .into_iter()
        .map(|action| ActionView {
            action,
            label: action.label(S::KIND).to_string(),
        })
        .collect()
}

#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct SellerRow {
    pub id: String,
    pub business_name: String,
    pub owner: String,
    pub email: Option<String>,
    pub document_type: Option<String>,
    pub status: SellerStatus,
    pub badge: StatusBadge,
    pub created_at: Option<DateTime<Utc>>,
    pub actions: Vec<ActionView>,
}

pub fn seller_row(seller: &Seller) -> SellerRow {
    SellerRow {
        id: seller.id.clone(),
        business_name: seller.business_name.clone(),
        owner: seller.full_name(),
        email: seller.email.clone(),
        document_type: seller.document_type.clone(),
        status: seller.status,
        badge: seller.status.badge(),
        created_at: seller.created_at,
        actions: action_views(seller.status),
    }
}

#[derive(Debug, Deserialize, IntoParams)]
pub struct SellerListQuery {
    /// `all`, `pending`, `verified`, `rejected` or `suspended`
    pub status: Option<String>,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct SellerListView {
    pub filter: String,
    pub sellers: Vec<SellerRow>,
    pub dialog: DialogView,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct SellerDetailView {
    pub seller: Seller,
    pub badge: StatusBadge,
    pub actions: Vec<ActionView>,
    pub document_expired: bool,
    pub products: Vec<ProductRow>,
    pub history: Vec<AuditEntry>,
    pub dialog: DialogView,
}

/// Admin notes on a seller
#[derive(Debug, Deserialize, Validate, ToSchema)]
pub struct RemarksRequest {
    #[validate(length(max = 2000, message = "Remarks must be at most 2000 characters"))]
    pub remarks: String,
}

/// Create seller routes
pub fn seller_routes() -> Router<AppState> {
    Router::new()
        .route("/", get(list_sellers))
        .route("/:id", get(get_seller))
        .route("/:id/remarks", put(update_remarks))
        .merge(moderation_routes::<SellerModeration>())
}

/// Seller list, filtered by status on the backend
#[utoipa::path(
    get,
    path = "/sellers",
    tag = "Sellers",
    params(SellerListQuery),
    responses(
        (status = 200, description = "Sellers for the filter", body = SellerListView),
        (status = 202, description = "Still loading"),
        (status = 303, description = "Not signed in")
    )
)]
pub async fn list_sellers(
    State(state): State<AppState>,
    Query(query): Query<SellerListQuery>,
) -> AppResult<View<SellerListView>> {
    let filter = StatusFilter::<SellerStatus>::parse(query.status.as_deref())?;
    let path = match filter {
        StatusFilter::All => ROUTE_SELLERS.to_string(),
        StatusFilter::Only(status) => format!("{}?status={}", ROUTE_SELLERS, status),
    };

    let result = resolve(state.config.view_loading_timeout(), state.queries.sellers(filter))
        .await
        .map(|sellers| SellerListView {
            filter: filter.as_str().to_string(),
            sellers: sellers.iter().map(seller_row).collect(),
            dialog: state.sellers.dialog_view(),
        });
    Ok(View::render(result, &path, ROUTE_SELLERS))
}

/// Seller detail with documents, products and review history
#[utoipa::path(
    get,
    path = "/sellers/{id}",
    tag = "Sellers",
    params(("id" = String, Path, description = "Seller ID")),
    responses(
        (status = 200, description = "Seller detail", body = SellerDetailView),
        (status = 404, description = "No such seller")
    )
)]
pub async fn get_seller(State(state): State<AppState>, Path(id): Path<String>) -> View<SellerDetailView> {
    let timeout = state.config.view_loading_timeout();
    let (seller, products) = tokio::join!(
        resolve(timeout, state.queries.seller(&id)),
        resolve(timeout, state.queries.seller_products(&id)),
    );

    let result = both(seller, products).map(|(seller, products)| SellerDetailView {
        badge: seller.status.badge(),
        actions: action_views(seller.status),
        document_expired: seller.is_document_expired(Utc::now().date_naive()),
        products: products.iter().map(product_row).collect(),
        history: state.audit.for_subject(AuditEntity::Seller, &id),
        dialog: state.sellers.dialog_view(),
        seller: (*seller).clone(),
    });
    View::render(result, &format!("{}/{}", ROUTE_SELLERS, id), ROUTE_SELLERS)
}

/// Save admin notes on a seller
#[utoipa::path(
    put,
    path = "/sellers/{id}/remarks",
    tag = "Sellers",
    params(("id" = String, Path, description = "Seller ID")),
    request_body = RemarksRequest,
    responses(
        (status = 200, description = "Updated seller", body = Seller),
        (status = 404, description = "No such seller")
    )
)]
pub async fn update_remarks(
    State(state): State<AppState>,
    Extension(actor): Extension<Actor>,
    Path(id): Path<String>,
    ValidatedJson(request): ValidatedJson<RemarksRequest>,
) -> AppResult<Json<Seller>> {
    let current = state.queries.seller(&id).await.result()?;
    let repo = state.queries.repositories().sellers.clone();
    let target = id.clone();
    let remarks = request.remarks.trim().to_string();
    let note = remarks.clone();

    let result = state
        .cache
        .mutate(
            async move { repo.update_remarks(&target, &note).await },
            keys::seller_remarks(&id, current.status),
        )
        .await;

    match result {
        Ok(seller) => {
            state
                .toasts
                .success("Remarks saved", format!("Notes on {} were updated", seller.business_name));
            state.audit.record(
                &actor,
                AuditRecord {
                    entity: AuditEntity::Seller,
                    subject_id: seller.id.clone(),
                    subject_label: seller.business_name.clone(),
                    action: "note".to_string(),
                    from_status: None,
                    to_status: None,
                    remarks: Some(remarks),
                },
            );
            Ok(Json(seller))
        }
        Err(err) => {
            state.toasts.error("Could not save remarks", err.user_message());
            Err(err)
        }
    }
}

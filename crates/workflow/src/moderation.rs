//! The two moderated record types behind one controller.

use std::sync::Arc;

use async_trait::async_trait;

use common::AppResult;
use data_access::{keys, ProductRepository, SellerRepository};
use domain::{
    Product, ProductStatus, Review, Seller, SellerStatus, Transition, WorkflowStatus, ROUTE_PRODUCTS,
    ROUTE_SELLERS,
};
use query_cache::QueryKey;

/// Loads and writes one kind of moderated record.
#[async_trait]
pub trait ModerationBackend: Send + Sync + 'static {
    type Status: WorkflowStatus;
    type Subject: Clone + Send + Sync + 'static;

    fn id_of(subject: &Self::Subject) -> &str;

    /// Name shown in dialogs and notifications
    fn label_of(subject: &Self::Subject) -> String;

    fn status_of(subject: &Self::Subject) -> Self::Status;

    /// List page the detail view returns to
    fn list_route() -> &'static str;

    async fn load(&self, id: &str) -> AppResult<Self::Subject>;

    /// Perform the transition: one status write, or one delete
    async fn apply(
        &self,
        subject: &Self::Subject,
        transition: &Transition<Self::Status>,
        review: Option<Review<Self::Status>>,
    ) -> AppResult<()>;

    /// Cache keys the transition can affect
    fn invalidation_keys(subject: &Self::Subject, transition: &Transition<Self::Status>) -> Vec<QueryKey>;
}

// =============================================================================
// Sellers
// =============================================================================

/// Seller verification workflow
pub struct SellerModeration {
    sellers: Arc<dyn SellerRepository>,
}

impl SellerModeration {
    pub fn new(sellers: Arc<dyn SellerRepository>) -> Self {
        Self { sellers }
    }
}

#[async_trait]
impl ModerationBackend for SellerModeration {
    type Status = SellerStatus;
    type Subject = Seller;

    fn id_of(subject: &Seller) -> &str {
        &subject.id
    }

    fn label_of(subject: &Seller) -> String {
        if subject.business_name.trim().is_empty() {
            subject.full_name()
        } else {
            subject.business_name.clone()
        }
    }

    fn status_of(subject: &Seller) -> SellerStatus {
        subject.status
    }

    fn list_route() -> &'static str {
        ROUTE_SELLERS
    }

    async fn load(&self, id: &str) -> AppResult<Seller> {
        self.sellers.fetch_by_id(id).await
    }

    async fn apply(
        &self,
        subject: &Seller,
        transition: &Transition<SellerStatus>,
        review: Option<Review<SellerStatus>>,
    ) -> AppResult<()> {
        match review {
            Some(review) => self
                .sellers
                .update_review(&subject.id, transition.from, review)
                .await
                .map(|_| ()),
            None if transition.is_removal() => self.sellers.delete(&subject.id).await,
            None => Ok(()),
        }
    }

    fn invalidation_keys(subject: &Seller, transition: &Transition<SellerStatus>) -> Vec<QueryKey> {
        keys::seller_transition(&subject.id, transition.from, transition.to)
    }
}

// =============================================================================
// Products
// =============================================================================

/// Product moderation workflow; the held status is "flagged"
pub struct ProductModeration {
    products: Arc<dyn ProductRepository>,
}

impl ProductModeration {
    pub fn new(products: Arc<dyn ProductRepository>) -> Self {
        Self { products }
    }
}

#[async_trait]
impl ModerationBackend for ProductModeration {
    type Status = ProductStatus;
    type Subject = Product;

    fn id_of(subject: &Product) -> &str {
        &subject.id
    }

    fn label_of(subject: &Product) -> String {
        subject.name.clone()
    }

    fn status_of(subject: &Product) -> ProductStatus {
        subject.status
    }

    fn list_route() -> &'static str {
        ROUTE_PRODUCTS
    }

    async fn load(&self, id: &str) -> AppResult<Product> {
        self.products.fetch_by_id(id).await
    }

    async fn apply(
        &self,
        subject: &Product,
        transition: &Transition<ProductStatus>,
        review: Option<Review<ProductStatus>>,
    ) -> AppResult<()> {
        match review {
            Some(review) => self
                .products
                .update_review(&subject.id, transition.from, review)
                .await
                .map(|_| ()),
            None if transition.is_removal() => self.products.delete(&subject.id).await,
            None => Ok(()),
        }
    }

    fn invalidation_keys(subject: &Product, transition: &Transition<ProductStatus>) -> Vec<QueryKey> {
        keys::product_transition(
            &subject.id,
            subject.seller_id.as_deref(),
            transition.from,
            transition.to,
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use data_access::MockSellerRepository;
    use domain::{plan, ModerationAction};

    fn create_test_seller(status: SellerStatus) -> Seller {
        serde_json::from_value(serde_json::json!({
            "id": "5",
            "business_name": "",
            "first_name": "Emily",
            "last_name": "Wilson",
            "status": status,
        }))
        .unwrap()
    }

    #[tokio::test]
    async fn test_delete_skips_status_write() {
        let mut repo = MockSellerRepository::new();
        repo.expect_delete()
            .withf(|id| id == "5")
            .times(1)
            .returning(|_| Ok(()));
        repo.expect_update_review().times(0);

        let backend = SellerModeration::new(Arc::new(repo));
        let seller = create_test_seller(SellerStatus::Pending);
        let transition = plan(seller.status, ModerationAction::Delete).unwrap();

        backend.apply(&seller, &transition, None).await.unwrap();
    }

    #[test]
    fn test_label_falls_back_to_owner_name() {
        let seller = create_test_seller(SellerStatus::Pending);
        assert_eq!(SellerModeration::label_of(&seller), "Emily Wilson");
    }
}

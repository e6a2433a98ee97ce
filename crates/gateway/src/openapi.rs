//! OpenAPI documentation.
//!
//! The moderation dialog endpoints under `/sellers` and `/products` are
//! generic over the record type and are not listed.

use utoipa::OpenApi;

use domain::{
    BadgeVariant, CategoryUpdate, ModerationAction, NewCategory, Product, ProductCategory,
    ProductStatus, Profile, Seller, SellerStatus, StatusBadge, UserRole,
};
use session::{SignInCredentials, SignUpCredentials};
use workflow::{Actor, AuditEntity, AuditEntry, DialogView, Origin, Toast, ToastVariant};

use crate::handlers::account_handler::{AccountView, UpdateProfileRequest};
use crate::handlers::audit_handler::AuditLogView;
use crate::handlers::auth_handler::{AuthResponse, FormView, LandingView, SignUpResponse};
use crate::handlers::category_handler::{CategoryDetailView, CategoryNode, CategoryTreeView};
use crate::handlers::dashboard_handler::{
    AnalyticsView, CategoryCount, DashboardStats, DashboardView, StatusCount,
};
use crate::handlers::health_handler::HealthResponse;
use crate::handlers::moderation_handler::{ActionRequest, ConfirmResponse, ReasonRequest};
use crate::handlers::product_handler::{
    CategoryOption, ProductDetailView, ProductListView, ProductRow,
};
use crate::handlers::security_handler::{SecurityView, SessionInfo};
use crate::handlers::seller_handler::{
    ActionView, RemarksRequest, SellerDetailView, SellerListView, SellerRow,
};
use crate::handlers::Link;
use crate::preferences::{NotificationPreferences, Preferences, Theme};

/// API documentation struct.
#[derive(OpenApi)]
#[openapi(
    paths(
        crate::handlers::health_handler::health_check,
        crate::handlers::auth_handler::landing,
        crate::handlers::auth_handler::sign_in,
        crate::handlers::auth_handler::sign_up,
        crate::handlers::auth_handler::sign_out,
        crate::handlers::dashboard_handler::dashboard,
        crate::handlers::dashboard_handler::analytics,
        crate::handlers::seller_handler::list_sellers,
        crate::handlers::seller_handler::get_seller,
        crate::handlers::seller_handler::update_remarks,
        crate::handlers::product_handler::list_products,
        crate::handlers::product_handler::get_product,
        crate::handlers::category_handler::list_categories,
        crate::handlers::category_handler::get_category,
        crate::handlers::category_handler::create_category,
        crate::handlers::category_handler::update_category,
        crate::handlers::category_handler::delete_category,
        crate::handlers::security_handler::security,
        crate::handlers::security_handler::refresh,
        crate::handlers::security_handler::sign_out_everywhere,
        crate::handlers::settings_handler::get_settings,
        crate::handlers::settings_handler::update_settings,
        crate::handlers::settings_handler::toggle_theme,
        crate::handlers::account_handler::account,
        crate::handlers::account_handler::get_profile,
        crate::handlers::account_handler::update_profile,
        crate::handlers::audit_handler::audit_logs,
        crate::handlers::audit_handler::notifications,
        crate::handlers::audit_handler::clear_notifications,
        crate::handlers::audit_handler::dismiss_notification,
    ),
    components(
        schemas(
            HealthResponse,
            Link,
            LandingView,
            FormView,
            AuthResponse,
            SignUpResponse,
            SignInCredentials,
            SignUpCredentials,
            DashboardStats,
            DashboardView,
            StatusCount,
            CategoryCount,
            AnalyticsView,
            Seller,
            SellerStatus,
            SellerRow,
            SellerListView,
            SellerDetailView,
            RemarksRequest,
            Product,
            ProductStatus,
            ProductRow,
            ProductListView,
            ProductDetailView,
            CategoryOption,
            ProductCategory,
            NewCategory,
            CategoryUpdate,
            CategoryNode,
            CategoryTreeView,
            CategoryDetailView,
            StatusBadge,
            BadgeVariant,
            ModerationAction,
            ActionView,
            ActionRequest,
            ReasonRequest,
            ConfirmResponse,
            DialogView,
            Origin,
            SecurityView,
            SessionInfo,
            Preferences,
            NotificationPreferences,
            Theme,
            Profile,
            UserRole,
            AccountView,
            UpdateProfileRequest,
            Actor,
            AuditEntity,
            AuditEntry,
            AuditLogView,
            Toast,
            ToastVariant,
        )
    ),
    tags(
        (name = "Health", description = "Liveness"),
        (name = "Authentication", description = "Landing, sign-in, sign-up and sign-out"),
        (name = "Dashboard", description = "Totals and analytics"),
        (name = "Sellers", description = "Seller verification"),
        (name = "Products", description = "Product moderation"),
        (name = "Categories", description = "Category tree management"),
        (name = "Security", description = "Session management"),
        (name = "Settings", description = "Console preferences"),
        (name = "Account", description = "Account and profile"),
        (name = "Audit", description = "Audit log and notifications"),
    )
)]
pub struct ApiDoc;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_document_lists_console_pages() {
        let doc = ApiDoc::openapi();
        for path in ["/sellers", "/products/{id}", "/categories/{id}", "/audit-logs"] {
            assert!(doc.paths.paths.contains_key(path), "missing {}", path);
        }
    }
}

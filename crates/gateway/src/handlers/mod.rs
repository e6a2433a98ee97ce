//! Route handlers, one module per page group.

pub mod account_handler;
pub mod audit_handler;
pub mod auth_handler;
pub mod category_handler;
pub mod dashboard_handler;
pub mod health_handler;
pub mod moderation_handler;
pub mod product_handler;
pub mod security_handler;
pub mod seller_handler;
pub mod settings_handler;

use axum::http::Uri;
use serde::Serialize;
use utoipa::ToSchema;

use common::AppError;
use domain::ROUTE_HOME;

use crate::view::View;

pub use account_handler::account_routes;
pub use audit_handler::audit_routes;
pub use auth_handler::auth_routes;
pub use category_handler::category_routes;
pub use dashboard_handler::dashboard_routes;
pub use health_handler::health_routes;
pub use product_handler::product_routes;
pub use security_handler::security_routes;
pub use seller_handler::seller_routes;
pub use settings_handler::settings_routes;

/// Navigation link rendered by a view
#[derive(Debug, Clone, PartialEq, Eq, Serialize, ToSchema)]
pub struct Link {
    pub label: String,
    pub href: String,
}

impl Link {
    pub fn new(label: impl Into<String>, href: impl Into<String>) -> Self {
        Self {
            label: label.into(),
            href: href.into(),
        }
    }
}

/// Catch-all for unknown paths
pub async fn not_found(uri: Uri) -> View<()> {
    View::render(Err(AppError::NotFound.into()), uri.path(), ROUTE_HOME)
}

//! Route configuration.

use axum::{middleware, Router};
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

use crate::handlers::{
    account_routes, audit_routes, auth_routes, category_routes, dashboard_routes, health_routes,
    not_found, product_routes, security_routes, seller_routes, settings_routes,
};
use crate::middleware::require_session;
use crate::openapi::ApiDoc;
use crate::state::AppState;

/// Create the main router with all routes.
pub fn create_router(state: AppState) -> Router {
    // Everything behind the private-route guard
    let protected = Router::new()
        .merge(dashboard_routes())
        .nest("/sellers", seller_routes())
        .nest("/products", product_routes())
        .nest("/categories", category_routes())
        .nest("/security", security_routes())
        .nest("/settings", settings_routes())
        .merge(account_routes())
        .merge(audit_routes())
        .route_layer(middleware::from_fn_with_state(state.clone(), require_session));

    Router::new()
        // Health check
        .nest("/health", health_routes())
        // Swagger UI
        .merge(SwaggerUi::new("/swagger-ui").url("/api-docs/openapi.json", ApiDoc::openapi()))
        // Landing and sign-in/up/out
        .merge(auth_routes())
        .merge(protected)
        .fallback(not_found)
        .with_state(state)
}

//! Domain-level constants.
//!
//! These constants define business rules and validation requirements.

// =============================================================================
// Profile Roles
// =============================================================================

/// Role of a regular marketplace account
pub const ROLE_USER: &str = "user";

/// Administrator role, assigned by default to accounts created from the console
pub const ROLE_ADMIN: &str = "admin";

/// All valid role values
pub const VALID_ROLES: &[&str] = &[ROLE_USER, ROLE_ADMIN];

/// Check if a role value is valid
pub fn is_valid_role(role: &str) -> bool {
    VALID_ROLES.contains(&role)
}

// =============================================================================
// Statuses
// =============================================================================

pub const STATUS_PENDING: &str = "pending";
pub const STATUS_VERIFIED: &str = "verified";
pub const STATUS_APPROVED: &str = "approved";
pub const STATUS_REJECTED: &str = "rejected";
pub const STATUS_SUSPENDED: &str = "suspended";
pub const STATUS_FLAGGED: &str = "flagged";

/// Filter value that selects every status
pub const STATUS_FILTER_ALL: &str = "all";

// =============================================================================
// Validation
// =============================================================================

/// Minimum password length accepted by the sign-in and sign-up forms
pub const MIN_PASSWORD_LENGTH: usize = 8;

/// Maximum length of a category name
pub const MAX_CATEGORY_NAME_LENGTH: usize = 80;

/// Products with fewer units than this are highlighted as low stock
pub const LOW_STOCK_THRESHOLD: i64 = 10;

// =============================================================================
// Routes
// =============================================================================

pub const ROUTE_HOME: &str = "/";
pub const ROUTE_SIGN_IN: &str = "/signin";
pub const ROUTE_SIGN_UP: &str = "/signup";
pub const ROUTE_DASHBOARD: &str = "/dashboard";
pub const ROUTE_SELLERS: &str = "/sellers";
pub const ROUTE_PRODUCTS: &str = "/products";

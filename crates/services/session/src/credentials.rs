//! Sign-in and sign-up input, checked before any remote call.

use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use validator::{Validate, ValidationErrors};

use common::{AppError, AppResult};
use domain::ROLE_ADMIN;

/// Email and password sign-in
#[derive(Debug, Clone, Deserialize, Validate)]
#[cfg_attr(feature = "openapi", derive(utoipa::ToSchema))]
pub struct SignInCredentials {
    #[validate(email(message = "Enter a valid email address"))]
    pub email: String,
    #[validate(length(min = 8, message = "Password must be at least 8 characters"))]
    pub password: String,
}

/// Admin account registration
#[derive(Debug, Clone, Deserialize, Validate)]
#[cfg_attr(feature = "openapi", derive(utoipa::ToSchema))]
pub struct SignUpCredentials {
    #[validate(email(message = "Enter a valid email address"))]
    pub email: String,
    #[validate(length(min = 8, message = "Password must be at least 8 characters"))]
    pub password: String,
    #[validate(length(min = 1, max = 120, message = "Full name is required"))]
    pub full_name: String,
    #[serde(default)]
    #[validate(length(max = 120, message = "Store name must be at most 120 characters"))]
    pub store_name: Option<String>,
}

impl SignUpCredentials {
    /// User metadata stored with the identity; new console accounts are admins
    pub fn metadata(&self) -> Value {
        json!({
            "full_name": self.full_name.trim(),
            "role": ROLE_ADMIN,
            "store_name": self.store_name.as_deref().map(str::trim),
        })
    }
}

/// Outcome of a sign-up
#[derive(Debug, Clone, PartialEq, Serialize)]
#[cfg_attr(feature = "openapi", derive(utoipa::ToSchema))]
pub struct SignUpOutcome {
    pub user_id: String,
    /// The account cannot sign in until its email is confirmed
    pub confirmation_required: bool,
}

/// First validation message, ordered by field name
pub fn validation_error(errors: &ValidationErrors) -> AppError {
    let field_errors = errors.field_errors();
    let mut fields: Vec<_> = field_errors.keys().collect();
    fields.sort();

    let message = fields
        .into_iter()
        .filter_map(|field| field_errors.get(field))
        .filter_map(|errors| errors.first())
        .find_map(|error| error.message.as_ref().map(|m| m.to_string()))
        .unwrap_or_else(|| "Validation failed".to_string());
    AppError::validation(message)
}

/// Run `validator` checks and map failures onto [`AppError::Validation`]
pub fn validate_input<T: Validate>(input: &T) -> AppResult<()> {
    input.validate().map_err(|e| validation_error(&e))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sign_in_validation() {
        let ok = SignInCredentials {
            email: "admin@market.test".into(),
            password: "admin-password".into(),
        };
        assert!(validate_input(&ok).is_ok());

        let bad_email = SignInCredentials {
            email: "not-an-email".into(),
            password: "admin-password".into(),
        };
        assert_eq!(
            validate_input(&bad_email),
            Err(AppError::Validation("Enter a valid email address".into()))
        );

        let short = SignInCredentials {
            email: "admin@market.test".into(),
            password: "short".into(),
        };
        assert_eq!(
            validate_input(&short),
            Err(AppError::Validation("Password must be at least 8 characters".into()))
        );
    }

    #[test]
    fn test_sign_up_metadata_defaults_to_admin() {
        let creds = SignUpCredentials {
            email: "ada@example.com".into(),
            password: "password123".into(),
            full_name: " Ada Lovelace ".into(),
            store_name: None,
        };
        assert!(validate_input(&creds).is_ok());

        let metadata = creds.metadata();
        assert_eq!(metadata["role"], "admin");
        assert_eq!(metadata["full_name"], "Ada Lovelace");
        assert!(metadata["store_name"].is_null());
    }
}

//! Product categories and slug rules.

use chrono::{DateTime, Utc};
use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::constants::MAX_CATEGORY_NAME_LENGTH;
use crate::error::{DomainError, DomainResult};

/// Lowercase alphanumeric words joined by single hyphens
static SLUG_RE: Lazy<Option<Regex>> = Lazy::new(|| Regex::new(r"^[a-z0-9]+(-[a-z0-9]+)*$").ok());

/// A product category as stored in the `categories` table.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[cfg_attr(feature = "openapi", derive(utoipa::ToSchema))]
pub struct ProductCategory {
    pub id: String,
    pub name: String,
    pub slug: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub image_url: Option<String>,
    #[serde(default)]
    pub parent_id: Option<String>,
    /// Denormalized count maintained by the backend
    #[serde(default)]
    pub product_count: i64,
    #[serde(default)]
    pub is_active: Option<bool>,
    #[serde(default)]
    pub is_deleted: Option<bool>,
    #[serde(default)]
    pub created_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub updated_at: Option<DateTime<Utc>>,
}

impl ProductCategory {
    pub fn is_top_level(&self) -> bool {
        self.parent_id.is_none()
    }
}

/// Category creation input
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[cfg_attr(feature = "openapi", derive(utoipa::ToSchema))]
pub struct NewCategory {
    pub name: String,
    /// Derived from the name when absent
    #[serde(default)]
    pub slug: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub parent_id: Option<String>,
}

/// Category update input; absent fields are left unchanged
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[cfg_attr(feature = "openapi", derive(utoipa::ToSchema))]
pub struct CategoryUpdate {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    /// Only an explicit slug changes the stored slug
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub slug: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    /// `Some(None)` detaches the category from its parent
    #[serde(default, skip_serializing_if = "Option::is_none", with = "double_option")]
    #[cfg_attr(feature = "openapi", schema(value_type = Option<String>))]
    pub parent_id: Option<Option<String>>,
}

impl CategoryUpdate {
    pub fn is_empty(&self) -> bool {
        self.name.is_none()
            && self.slug.is_none()
            && self.description.is_none()
            && self.parent_id.is_none()
    }
}

/// Derive a URL-safe slug from a display name.
///
/// "Smart Devices" becomes `smart-devices`, "Home & Kitchen" becomes
/// `home-kitchen`.
pub fn slugify(name: &str) -> String {
    let mut slug = String::with_capacity(name.len());
    let mut pending_hyphen = false;

    for ch in name.chars() {
        if ch.is_ascii_alphanumeric() {
            if pending_hyphen && !slug.is_empty() {
                slug.push('-');
            }
            pending_hyphen = false;
            slug.push(ch.to_ascii_lowercase());
        } else {
            pending_hyphen = true;
        }
    }

    slug
}

/// Check an explicitly supplied slug
pub fn validate_slug(slug: &str) -> DomainResult<()> {
    if SLUG_RE.as_ref().is_some_and(|re| re.is_match(slug)) {
        Ok(())
    } else {
        Err(DomainError::validation(format!(
            "Slug '{}' must contain only lowercase letters, digits and single hyphens",
            slug
        )))
    }
}

/// Trim a category name and enforce its length bounds
pub fn validate_category_name(name: &str) -> DomainResult<String> {
    let trimmed = name.trim();
    if trimmed.is_empty() {
        return Err(DomainError::validation("Category name is required"));
    }
    if trimmed.chars().count() > MAX_CATEGORY_NAME_LENGTH {
        return Err(DomainError::validation(format!(
            "Category name must be at most {} characters",
            MAX_CATEGORY_NAME_LENGTH
        )));
    }
    Ok(trimmed.to_string())
}

/// Resolve the slug to store for a new category.
pub fn resolve_new_slug(name: &str, explicit: Option<&str>) -> DomainResult<String> {
    match explicit.map(str::trim).filter(|s| !s.is_empty()) {
        Some(slug) => {
            validate_slug(slug)?;
            Ok(slug.to_string())
        }
        None => {
            let slug = slugify(name);
            if slug.is_empty() {
                return Err(DomainError::validation(
                    "Category name must contain at least one letter or digit",
                ));
            }
            Ok(slug)
        }
    }
}

/// Validate a parent reference for the shallow hierarchy.
///
/// The parent must exist, must not be the category itself and must be
/// top-level.
pub fn validate_parent(
    category_id: Option<&str>,
    parent_id: &str,
    categories: &[ProductCategory],
) -> DomainResult<()> {
    if category_id == Some(parent_id) {
        return Err(DomainError::validation("A category cannot be its own parent"));
    }

    let parent = categories
        .iter()
        .find(|c| c.id == parent_id)
        .ok_or_else(|| DomainError::validation(format!("Parent category '{}' does not exist", parent_id)))?;

    if !parent.is_top_level() {
        return Err(DomainError::validation(format!(
            "Parent category '{}' is itself a subcategory",
            parent.name
        )));
    }

    if let Some(id) = category_id {
        if categories.iter().any(|c| c.parent_id.as_deref() == Some(id)) {
            return Err(DomainError::validation(
                "A category with subcategories cannot be nested",
            ));
        }
    }

    Ok(())
}

mod double_option {
    use serde::{Deserialize, Deserializer, Serialize, Serializer};

    pub fn serialize<S, T>(value: &Option<Option<T>>, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
        T: Serialize,
    {
        match value {
            Some(inner) => inner.serialize(serializer),
            None => serializer.serialize_none(),
        }
    }

    pub fn deserialize<'de, D, T>(deserializer: D) -> Result<Option<Option<T>>, D::Error>
    where
        D: Deserializer<'de>,
        T: Deserialize<'de>,
    {
        Option::<T>::deserialize(deserializer).map(Some)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn category(id: &str, parent: Option<&str>) -> ProductCategory {
        ProductCategory {
            id: id.to_string(),
            name: id.to_uppercase(),
            slug: id.to_string(),
            description: None,
            image_url: None,
            parent_id: parent.map(str::to_string),
            product_count: 0,
            is_active: Some(true),
            is_deleted: Some(false),
            created_at: None,
            updated_at: None,
        }
    }

    #[test]
    fn test_slugify() {
        assert_eq!(slugify("Smart Devices"), "smart-devices");
        assert_eq!(slugify("Home & Kitchen"), "home-kitchen");
        assert_eq!(slugify("  Audio  "), "audio");
        assert_eq!(slugify("4K  TVs!"), "4k-tvs");
        assert_eq!(slugify("&&"), "");
    }

    #[test]
    fn test_validate_slug() {
        assert!(validate_slug("smart-devices").is_ok());
        assert!(validate_slug("Smart-Devices").is_err());
        assert!(validate_slug("smart--devices").is_err());
        assert!(validate_slug("-audio").is_err());
        assert!(validate_slug("").is_err());
    }

    #[test]
    fn test_resolve_new_slug() {
        assert_eq!(resolve_new_slug("Smart Devices", None).unwrap(), "smart-devices");
        assert_eq!(resolve_new_slug("Smart Devices", Some("  ")).unwrap(), "smart-devices");
        assert_eq!(resolve_new_slug("Smart Devices", Some("gadgets")).unwrap(), "gadgets");
        assert!(resolve_new_slug("Smart Devices", Some("Gadgets!")).is_err());
        assert!(resolve_new_slug("!!", None).is_err());
    }

    #[test]
    fn test_category_name_bounds() {
        assert_eq!(validate_category_name("  Audio ").unwrap(), "Audio");
        assert!(validate_category_name("   ").is_err());
        assert!(validate_category_name(&"x".repeat(MAX_CATEGORY_NAME_LENGTH + 1)).is_err());
    }

    #[test]
    fn test_shallow_hierarchy() {
        let categories = vec![
            category("c1", None),
            category("c2", None),
            category("c5", Some("c1")),
        ];

        assert!(validate_parent(None, "c1", &categories).is_ok());
        assert!(validate_parent(Some("c2"), "c1", &categories).is_ok());
        assert!(validate_parent(Some("c1"), "c1", &categories).is_err());
        assert!(validate_parent(None, "c5", &categories).is_err());
        assert!(validate_parent(None, "missing", &categories).is_err());
        // c1 already has children
        assert!(validate_parent(Some("c1"), "c2", &categories).is_err());
    }

    #[test]
    fn test_update_parent_tristate() {
        let untouched: CategoryUpdate = serde_json::from_str(r#"{"name":"Audio"}"#).unwrap();
        assert_eq!(untouched.parent_id, None);

        let detached: CategoryUpdate = serde_json::from_str(r#"{"parent_id":null}"#).unwrap();
        assert_eq!(detached.parent_id, Some(None));

        let moved: CategoryUpdate = serde_json::from_str(r#"{"parent_id":"c1"}"#).unwrap();
        assert_eq!(moved.parent_id, Some(Some("c1".to_string())));
    }
}

//! Demo data for the in-memory backend.
//!
//! Mirrors the mock sellers, products and categories the dashboard was
//! prototyped with. Only tests and `--demo` mode load these rows.

use serde_json::{json, Value};

use domain::ROLE_ADMIN;

use crate::api::Table;
use crate::memory::MemoryBackend;

/// Demo admin login
pub const DEMO_ADMIN_EMAIL: &str = "admin@market.test";
pub const DEMO_ADMIN_PASSWORD: &str = "admin-password";

/// Reviewer recorded on pre-verified demo sellers
const DEMO_REVIEWER: &str = "Admin User";

#[allow(clippy::too_many_arguments)]
fn seller(
    id: &str,
    business_name: &str,
    first_name: &str,
    last_name: &str,
    status: &str,
    document_type: &str,
    created_at: &str,
    review: Option<(&str, &str)>,
) -> Value {
    let (verified_by, verification_date) = match review {
        Some((by, at)) => (json!(by), json!(at)),
        None => (Value::Null, Value::Null),
    };
    let slug: String = business_name
        .chars()
        .filter(|c| c.is_ascii_alphanumeric())
        .collect::<String>()
        .to_lowercase();

    json!({
        "id": id,
        "seller_id": format!("account-{}", id),
        "business_name": business_name,
        "seller_type": "Individual",
        "registered_address": "123 Market Street",
        "zip_code": "1000",
        "tin_number": format!("000-000-00{}", id),
        "vat_status": "Non-VAT",
        "first_name": first_name,
        "last_name": last_name,
        "email": format!("{}@{}.test", first_name.to_lowercase(), slug),
        "phone": "+63 900 000 0000",
        "document_type": document_type,
        "document_url": format!("https://files.market.test/documents/{}.pdf", id),
        "document_number": format!("DOC-{:0>4}", id),
        "document_expiry_date": "2026-12-31",
        "valid_id": "Passport",
        "valid_id_front": format!("https://files.market.test/ids/{}-front.jpg", id),
        "valid_id_back": format!("https://files.market.test/ids/{}-back.jpg", id),
        "status": status,
        "verified_by": verified_by,
        "verification_date": verification_date,
        "created_at": created_at,
        "updated_at": created_at,
    })
}

/// Demo sellers covering every seller status
pub fn sellers() -> Vec<Value> {
    vec![
        seller("1", "Tech Solutions Inc", "John", "Doe", "verified", "Business Registration",
            "2023-04-12T10:30:00Z", Some((DEMO_REVIEWER, "2023-04-15T14:25:00Z"))),
        seller("2", "Artisan Crafts", "Jane", "Smith", "pending", "DTI Certificate",
            "2023-04-14T09:15:00Z", None),
        seller("3", "Fashion Forward", "Alice", "Brown", "suspended", "Business Permit",
            "2023-03-25T11:45:00Z", Some((DEMO_REVIEWER, "2023-03-28T16:30:00Z"))),
        seller("4", "Home Essentials", "Robert", "Johnson", "verified", "DTI Certificate",
            "2023-03-18T13:20:00Z", Some(("System Admin", "2023-03-20T10:15:00Z"))),
        seller("5", "Gadget Heaven", "Emily", "Wilson", "pending", "Business Registration",
            "2023-04-16T15:10:00Z", None),
        seller("6", "Organic Delights", "Michael", "Chen", "verified", "Business Permit",
            "2023-03-10T08:45:00Z", Some((DEMO_REVIEWER, "2023-03-12T11:30:00Z"))),
        seller("7", "Sports Unlimited", "David", "Lee", "rejected", "DTI Certificate",
            "2023-04-05T14:25:00Z", Some((DEMO_REVIEWER, "2023-04-07T09:00:00Z"))),
        seller("8", "Bookworm Paradise", "Sophie", "Taylor", "verified", "Business Registration",
            "2023-03-22T10:55:00Z", Some(("System Admin", "2023-03-24T09:40:00Z"))),
    ]
}

#[allow(clippy::too_many_arguments)]
fn product(
    id: &str,
    name: &str,
    seller_id: &str,
    category_id: &str,
    status: &str,
    price: f64,
    stock: i64,
    created_at: &str,
) -> Value {
    json!({
        "id": id,
        "seller_id": seller_id,
        "category_id": category_id,
        "name": name,
        "price": price,
        "stock_quantity": stock,
        "status": status,
        "is_available": stock > 0,
        "is_featured": false,
        "is_active": true,
        "is_deleted": false,
        "rating": Value::Null,
        "review_count": 0,
        "created_at": created_at,
        "updated_at": created_at,
    })
}

/// Demo products covering every product status
pub fn products() -> Vec<Value> {
    vec![
        product("p1", "Wireless Earbuds", "1", "c1", "approved", 89.99, 45, "2023-04-10T12:30:00Z"),
        product("p2", "Smart Watch", "1", "c1", "approved", 199.99, 23, "2023-04-11T10:15:00Z"),
        product("p3", "Bluetooth Speaker", "1", "c1", "pending", 79.99, 12, "2023-04-12T14:45:00Z"),
        product("p4", "Leather Wallet", "3", "c2", "approved", 49.99, 34, "2023-04-05T09:20:00Z"),
        product("p5", "Fake Designer Bag", "3", "c2", "flagged", 299.99, 5, "2023-04-08T16:10:00Z"),
        product("p6", "Handmade Ceramic Mug", "2", "c3", "pending", 24.99, 18, "2023-04-14T11:30:00Z"),
        product("p7", "Organic Scented Candle", "2", "c3", "rejected", 19.99, 0, "2023-04-13T15:25:00Z"),
        product("p8", "Ergonomic Office Chair", "4", "c4", "approved", 249.99, 8, "2023-04-07T13:40:00Z"),
    ]
}

fn category(id: &str, name: &str, slug: &str, parent_id: Option<&str>, product_count: i64) -> Value {
    json!({
        "id": id,
        "name": name,
        "slug": slug,
        "parent_id": parent_id,
        "product_count": product_count,
        "is_active": true,
        "is_deleted": false,
    })
}

/// Demo categories: four top-level, two under Electronics
pub fn categories() -> Vec<Value> {
    vec![
        category("c1", "Electronics", "electronics", None, 135),
        category("c2", "Accessories", "accessories", None, 89),
        category("c3", "Home & Kitchen", "home-kitchen", None, 112),
        category("c4", "Furniture", "furniture", None, 46),
        category("c5", "Audio", "audio", Some("c1"), 48),
        category("c6", "Smart Devices", "smart-devices", Some("c1"), 37),
    ]
}

/// Load every demo table and the demo admin account
pub fn seed(backend: &MemoryBackend) {
    backend.seed_table(Table::SellerVerifications, sellers());
    backend.seed_table(Table::Products, products());
    backend.seed_table(Table::Categories, categories());
    backend.seed_account(
        DEMO_ADMIN_EMAIL,
        DEMO_ADMIN_PASSWORD,
        json!({ "full_name": "Demo Admin", "role": ROLE_ADMIN, "store_name": "Market Admin" }),
    );
}

/// Backend seeded with the demo data
pub fn seeded_backend() -> MemoryBackend {
    let backend = MemoryBackend::new();
    seed(&backend);
    backend
}

#[cfg(test)]
mod tests {
    use super::*;
    use domain::{Product, ProductCategory, Seller};

    #[test]
    fn test_fixture_rows_decode() {
        let sellers: Vec<Seller> = sellers()
            .into_iter()
            .map(|row| serde_json::from_value(row).unwrap())
            .collect();
        assert_eq!(sellers.len(), 8);
        assert!(sellers.iter().all(Seller::review_stamp_consistent));

        let products: Vec<Product> = products()
            .into_iter()
            .map(|row| serde_json::from_value(row).unwrap())
            .collect();
        assert_eq!(products.len(), 8);

        let categories: Vec<ProductCategory> = categories()
            .into_iter()
            .map(|row| serde_json::from_value(row).unwrap())
            .collect();
        assert_eq!(categories.iter().filter(|c| c.is_top_level()).count(), 4);
    }

    #[test]
    fn test_seed_creates_demo_admin() {
        let backend = seeded_backend();
        let profiles = backend.rows(Table::Profiles);
        assert_eq!(profiles.len(), 1);
        assert_eq!(profiles[0]["email"], DEMO_ADMIN_EMAIL);
        assert_eq!(profiles[0]["role"], "admin");
    }
}

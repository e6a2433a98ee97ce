//! # Data Access
//!
//! Typed reads and writes against the hosted tables, the query keys they
//! are cached under, and the keys each write invalidates.

pub mod fetched;
pub mod keys;
pub mod queries;
pub mod repository;

pub use fetched::Fetched;
pub use queries::Queries;
pub use repository::{
    CategoryRepository, CategoryStore, ProductRepository, ProductStore, ProfileRepository,
    ProfileStore, Repositories, SellerRepository, SellerStore,
};

#[cfg(any(test, feature = "test-utils"))]
pub use repository::{
    MockCategoryRepository, MockProductRepository, MockProfileRepository, MockSellerRepository,
};

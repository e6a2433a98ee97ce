//! Hosted backend client.
//!
//! Provides:
//! - `AuthApi` / `TableApi` contracts of the hosted auth and table services
//! - `RestBackend`, the HTTP implementation
//! - `MemoryBackend`, an in-process implementation with demo fixtures
//!   (`demo` or `test-utils` feature)

pub mod api;
#[cfg(any(test, feature = "demo"))]
pub mod fixtures;
#[cfg(any(test, feature = "demo"))]
pub mod memory;
pub mod rest;

pub use api::{AuthApi, AuthUser, Filter, Session, SignOutScope, SignUpResponse, Table, TableApi};
#[cfg(any(test, feature = "demo"))]
pub use memory::{MemoryBackend, Operation};
pub use rest::RestBackend;

#[cfg(any(test, feature = "test-utils"))]
pub use api::{MockAuthApi, MockTableApi};

//! HTTP middleware.

pub mod auth;

pub use auth::{require_session, sign_in_redirect};

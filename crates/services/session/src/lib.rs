//! # Session
//!
//! Wraps the hosted auth service: current session, sign-in/up/out, token
//! refresh and the auth-event stream that keeps the cached current user fresh.

pub mod credentials;
pub mod store;

pub use credentials::{
    validate_input, validation_error, SignInCredentials, SignUpCredentials, SignUpOutcome,
};
pub use store::{AuthEvent, CurrentUser, SessionStore};

//! Common utilities shared across the console crates.
//!
//! This crate provides:
//! - Unified error handling (remote, validation, auth and workflow errors)
//! - Configuration structures

pub mod config;
pub mod error;

pub use config::*;
pub use error::{AppError, AppResult, OptionExt};

//! Common utilities shared across the identity services.
//!
//! This crate provides:
//! - Unified error handling above the domain layer
//! - Configuration structures loaded from the environment

pub mod config;
pub mod error;

pub use config::*;
pub use error::{AppError, AppResult, OptionExt};

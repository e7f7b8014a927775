//! # Social Hub Domain
//!
//! Business domain types and models for the Social Hub Meta connector.
//!
//! This crate contains:
//! - Account and publish job records with their lifecycle states
//! - Per-tenant Meta application configuration
//! - Domain error types and Result definitions
//! - Runtime configuration structures
//!
//! ## Architecture
//! - No dependencies on other Social Hub crates
//! - Only external dependencies allowed
//! - Pure domain models and data structures

pub mod config;
pub mod errors;
pub mod macros;
pub mod types;

// Re-export commonly used items
pub use config::*;
pub use errors::*;
pub use types::*;

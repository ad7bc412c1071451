//! # My500 Domain
//!
//! Business domain types and models for the My-500 sync engine.
//!
//! This crate contains:
//! - Domain data types (Contact, Organization, Activity, SyncHistory)
//! - Domain error types and Result definitions
//! - Configuration structures
//!
//! ## Architecture
//! - No dependencies on other My500 crates
//! - Only external dependencies allowed
//! - Pure domain models and data structures

pub mod config;
pub mod errors;
pub mod types;

pub use config::*;
pub use errors::*;
pub use types::*;

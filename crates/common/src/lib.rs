//! # My500 Common
//!
//! Reusable primitives shared across the workspace:
//!
//! - [`crypto`]: AES-256-GCM credential vault with legacy-format migration
//! - [`resilience`]: token-bucket rate limiting with a clock abstraction
//! - [`cache`]: bounded TTL cache used for remote search results
//!
//! This crate has no dependency on other workspace crates; callers convert
//! [`error::CommonError`] into their own error types at the boundary.

pub mod cache;
pub mod crypto;
pub mod error;
pub mod resilience;

pub use error::{CommonError, CommonResult};

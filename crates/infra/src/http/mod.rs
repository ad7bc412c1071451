//! Shared HTTP plumbing for remote API adapters.

mod client;

pub use client::{HttpClient, HttpClientBuilder};

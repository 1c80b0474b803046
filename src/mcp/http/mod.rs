//! HTTP client and API communication layer for BambooHR.
//!
//! This module handles all HTTP communication with the BambooHR REST API,
//! including authentication, caching, retries and error normalization.

mod cache;
mod client;
mod config;
mod normalize;
mod retry;
mod transport;

// Re-export client's public API
pub use client::{BambooHrClient, MAX_INLINE_IMAGE_BYTES, RequestOptions};
pub use config::ClientConfig;
pub use retry::is_retryable_network_message;

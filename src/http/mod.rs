//! HTTP client module
//!
//! Provides the HTTP transport used by the REST registry client.
//!
//! # Features
//!
//! - **Automatic Retries**: 429/5xx, timeouts and connection errors
//! - **Rate Limiting**: Optional token bucket rate limiter using governor
//! - **Backoff Strategies**: Constant, linear, and exponential backoff
//! - **Credentials**: Bearer token or HTTP basic auth on every request

mod client;
mod rate_limit;

pub use client::{Credentials, HttpClient, HttpClientConfig, HttpClientConfigBuilder, RequestConfig};
pub use rate_limit::{RateLimiter, RateLimiterConfig};

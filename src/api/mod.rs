//! API layer
//!
//! Client side of the Mastodon-compatible REST API:
//! - HTTP client bound to one instance
//! - `Link` header pagination metadata
//! - Response DTOs with boundary validation

mod client;
mod dto;
mod link;

pub use client::{ApiClient, ApiResponse};
pub use dto::*;
pub use link::{Link, LinkHeader};

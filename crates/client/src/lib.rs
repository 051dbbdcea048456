//! HTTP adapter for the remote contract comparison service.
//!
//! Stateless request/response and polling client wrapping the service's
//! REST API using [`reqwest`]. The client performs no retries of its
//! own; retry policy belongs to the orchestrator's caller.

pub mod api;
pub mod types;

pub use api::{CompareApiConfig, CompareApiError, RemoteCompareApi};
pub use types::{CompareResponse, RemoteProgress};

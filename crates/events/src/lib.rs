//! Progress fan-out for in-flight comparison tasks.
//!
//! This crate provides the publish/subscribe channel between the
//! progress poller and any number of live observers:
//!
//! - [`ProgressEvent`] — the ephemeral progress message.
//! - [`ProgressBroadcaster`] — in-process fan-out registry keyed by
//!   task id, backed by `tokio::sync::broadcast`.
//!
//! Events are never persisted; delivery is at-most-once per live
//! subscriber.

pub mod broadcaster;

pub use broadcaster::{ProgressBroadcaster, ProgressEvent};

//! Shared types for the contract comparison platform.
//!
//! Leaf crate with zero internal dependencies: every other crate in the
//! workspace may depend on `redline-core`, never the other way around.

pub mod error;
pub mod retry;
pub mod task;
pub mod types;

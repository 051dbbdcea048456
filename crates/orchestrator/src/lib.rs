//! Task orchestration core.
//!
//! [`Orchestrator::run`] drives one attempt of a comparison task from
//! `pending` (or a retried `failed`) to a terminal status: it durably
//! wins the transition into `processing`, runs the remote compare call
//! with a concurrent progress poller scoped strictly to the attempt,
//! and persists the terminal outcome before publishing the terminal
//! progress event.
//!
//! External collaborators are consumed through seams so the state
//! machine is testable in isolation:
//!
//! - [`TaskStore`] — durable task records ([`PgTaskStore`] for Postgres).
//! - [`UrlResolver`] — document locator to time-limited URL.
//! - [`CompareBackend`] — the remote comparison service.

pub mod backend;
pub mod error;
pub mod orchestrator;
pub mod poller;
pub mod resolver;
pub mod store;

pub use backend::{BackendFault, CompareBackend};
pub use error::OrchestratorError;
pub use orchestrator::Orchestrator;
pub use resolver::{PassthroughResolver, UrlResolver};
pub use store::{PgTaskStore, TaskStore};

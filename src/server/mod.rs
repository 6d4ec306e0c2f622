//! Inbound side of the engine: the request dispatcher and the executor
//! notification surface.
//!
//! The dispatcher is transport-agnostic; an HTTP layer binds request bodies to
//! [`RequestDispatcher::handle_json`] and writes the returned envelope back.

pub mod dispatcher;
pub mod executor;

pub use dispatcher::RequestDispatcher;
pub use executor::{CompletionHandle, Reply, TaskContext, TaskExecutor};

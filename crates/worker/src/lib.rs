//! The long-running worker loop that drives version lifecycle transitions
//! (spec §4.5): reserves messages from the operations queue, dispatches to a
//! handler keyed by action, and acknowledges on success.

#![warn(missing_docs)]

mod handlers;
mod worker;

pub use worker::{Worker, WorkerStopHandle, DEFAULT_POLL_INTERVAL};

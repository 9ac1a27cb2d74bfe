//! Scheduler error types.

use thiserror::Error;

/// Errors that abandon a single probe cycle.
#[derive(Debug, Error)]
pub enum SchedulerError {
    #[error("probe task for node {node} failed: {source}")]
    ProbeTask {
        node: String,
        #[source]
        source: tokio::task::JoinError,
    },
}

pub type SchedulerResult<T> = Result<T, SchedulerError>;

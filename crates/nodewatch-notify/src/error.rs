//! Notification and command error types.

use std::time::Duration;

use thiserror::Error;

use nodewatch_core::RecipientId;
use nodewatch_http::HttpError;

use crate::commands::{COMMAND_HELP, INTERVAL_USAGE};

/// Result type alias for deliveries.
pub type NotifyResult<T> = Result<T, NotifyError>;

/// Errors raised while delivering a message to one recipient.
#[derive(Debug, Error)]
pub enum NotifyError {
    #[error("invalid webhook URL {url:?}: {reason}")]
    InvalidUrl { url: String, reason: String },

    #[error("webhook request failed: {0}")]
    Http(#[from] HttpError),

    #[error("failed to build webhook request: {0}")]
    Request(#[from] http::Error),

    #[error("failed to encode payload: {0}")]
    Encode(#[from] serde_json::Error),

    #[error("webhook returned {0}")]
    Status(http::StatusCode),

    #[error("webhook timed out after {0:?}")]
    Timeout(Duration),

    #[error("delivery to {recipient} rejected: {reason}")]
    Rejected {
        recipient: RecipientId,
        reason: String,
    },
}

/// Errors raised while parsing operator command text.
///
/// The display text is what the originator gets back.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CommandError {
    #[error("{usage}", usage = INTERVAL_USAGE)]
    IntervalUsage,

    #[error("Unknown command {0:?}. {help}", help = COMMAND_HELP)]
    Unknown(String),

    #[error("Empty command. {help}", help = COMMAND_HELP)]
    Empty,
}

//! Error types for expresslane.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
    #[error("queue is already active")]
    AlreadyActive,

    #[error("queue must be started from within a tokio runtime")]
    NoRuntime,

    #[error("tick interval must be greater than zero")]
    InvalidTick,

    #[error("queue was dropped before item {0} was dispatched")]
    Closed(crate::model::ItemId),

    #[error("timed out waiting for item {0}")]
    Timeout(crate::model::ItemId),

    #[error("configuration error: {0}")]
    Config(String),

    #[error("{0}")]
    Other(String),
}

pub type Result<T> = std::result::Result<T, Error>;

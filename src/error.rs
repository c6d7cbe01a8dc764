//! Errors surfaced by the tracking and reward engine

use crate::domain::types::UserId;
use std::sync::Arc;
use thiserror::Error;

pub type Result<T, E = Error> = std::result::Result<T, E>;

#[derive(Debug, Error)]
pub enum Error {
    #[error("location lookup failed for user {user}: {source}")]
    Location {
        user: UserId,
        #[source]
        source: anyhow::Error,
    },

    #[error("attraction catalog unavailable: {0}")]
    Catalog(#[source] anyhow::Error),

    #[error("reward oracle failed for user {user} at {attraction}: {source}")]
    Oracle {
        user: UserId,
        attraction: String,
        #[source]
        source: anyhow::Error,
    },

    #[error("trip pricing failed for user {user}: {source}")]
    Pricing {
        user: UserId,
        #[source]
        source: anyhow::Error,
    },

    #[error("unknown user {0}")]
    UnknownUser(String),

    #[error("interrupted while waiting for outstanding tasks")]
    Interrupted,

    #[error("task panicked: {0}")]
    TaskPanicked(String),

    #[error("{} task(s) failed, first: {}", .0.len(), first_message(.0))]
    TasksFailed(Vec<Error>),

    #[error("worker pool {0} is closed")]
    PoolClosed(&'static str),

    /// A task failure reported to every caller waiting on that task
    #[error(transparent)]
    Shared(Arc<Error>),
}

fn first_message(errors: &[Error]) -> String {
    errors.first().map(ToString::to_string).unwrap_or_default()
}

impl Error {
    /// Number of underlying failures this error represents
    pub fn failure_count(&self) -> usize {
        match self {
            Error::TasksFailed(errors) => errors.iter().map(Error::failure_count).sum(),
            Error::Shared(inner) => inner.failure_count(),
            _ => 1,
        }
    }
}

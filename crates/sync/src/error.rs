//! Error types for the synchronizers.
//!
//! Record-level failures stay local to the record they hit; they become
//! run-fatal only when the run is configured to bail. The synchronizers
//! never touch the process lifecycle — errors propagate to `main`, which
//! decides the exit code.

use std::fmt;

use thiserror::Error;

use crate::upstream::UpstreamError;
use shared::convert::ConvertError;

/// The kind of upstream record a failure refers to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RecordKind {
    Stream,
    Reading,
}

impl fmt::Display for RecordKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RecordKind::Stream => f.write_str("stream"),
            RecordKind::Reading => f.write_str("reading"),
        }
    }
}

/// Failure mapping one upstream record into a domain model.
#[derive(Debug, Error, PartialEq)]
pub enum MapError {
    #[error(transparent)]
    Convert(#[from] ConvertError),

    #[error("record is missing required field `{0}`")]
    MissingField(&'static str),
}

/// Failure syncing a single record; subject to the bail policy.
#[derive(Debug, Error)]
pub enum RecordError {
    #[error(transparent)]
    Map(#[from] MapError),

    #[error("database error: {0}")]
    Store(#[from] sqlx::Error),
}

/// Run-fatal synchronizer errors.
#[derive(Debug, Error)]
pub enum SyncError {
    #[error("upstream request failed: {0}")]
    Upstream(#[from] UpstreamError),

    #[error("database error: {0}")]
    Store(#[from] sqlx::Error),

    #[error("bailed on {kind} {id}: {source}")]
    Bailed {
        kind: RecordKind,
        id: String,
        #[source]
        source: RecordError,
    },
}

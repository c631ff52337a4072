use std::{
    num::{ParseFloatError, ParseIntError},
    time::Duration,
};

use crate::{provider::ProviderError, queue::QueueError, storage::RepoError};

pub type Result<T, E = Error> = std::result::Result<T, E>;

#[derive(thiserror::Error, Debug)]
pub enum Error {
    #[error("{context}: {source}")]
    Provider {
        context: String,
        #[source]
        source: ProviderError,
    },
    #[error("{context}: {source}")]
    Repo {
        context: String,
        #[source]
        source: RepoError,
    },
    #[error("{context}: {source}")]
    Decode {
        context: String,
        #[source]
        source: DecodeError,
    },
    #[error("params not found at height {0}")]
    ParamsNotFound(u64),
    #[error(
        "incomplete transactions at height {height}: block declares {expected}, provider returned {got}"
    )]
    IncompleteTransactions { height: u64, expected: u64, got: u64 },
    #[error("sync of height {height} timed out after {after:?}")]
    Timeout { height: u64, after: Duration },
    #[error("task for height {height} did not complete: {reason}")]
    Task { height: u64, reason: String },
    #[error(transparent)]
    Queue(#[from] QueueError),
}

impl Error {
    /// Whether this error is a uniqueness violation raised by a repo that lost an insert race.
    pub fn is_duplicate_key(&self) -> bool {
        matches!(
            self,
            Error::Repo {
                source: RepoError::Duplicate { .. },
                ..
            }
        )
    }
}

/// Failures turning a raw provider payload into a typed record. These only ever abort the single
/// record being decoded.
#[derive(thiserror::Error, Debug)]
pub enum DecodeError {
    #[error("{field}: invalid integer {value:?}: {source}")]
    InvalidInteger {
        field: String,
        value: String,
        #[source]
        source: ParseIntError,
    },
    #[error("{field}: invalid number {value:?}: {source}")]
    InvalidFloat {
        field: String,
        value: String,
        #[source]
        source: ParseFloatError,
    },
    #[error("malformed {kind} message: {source}")]
    Malformed {
        kind: &'static str,
        #[source]
        source: serde_json::Error,
    },
    #[error("unknown message type {0:?}")]
    UnknownMessageType(String),
    #[error("param group {0} is empty")]
    EmptyParamGroup(&'static str),
    #[error("param {0:?} not found")]
    MissingParam(String),
}

/// Attaches the operation and key to a lower-level error.
pub(crate) trait ResultExt<T> {
    fn context<C: Into<String>>(self, context: C) -> Result<T>;
}

impl<T> ResultExt<T> for std::result::Result<T, ProviderError> {
    fn context<C: Into<String>>(self, context: C) -> Result<T> {
        self.map_err(|source| Error::Provider {
            context: context.into(),
            source,
        })
    }
}

impl<T> ResultExt<T> for std::result::Result<T, RepoError> {
    fn context<C: Into<String>>(self, context: C) -> Result<T> {
        self.map_err(|source| Error::Repo {
            context: context.into(),
            source,
        })
    }
}

impl<T> ResultExt<T> for std::result::Result<T, DecodeError> {
    fn context<C: Into<String>>(self, context: C) -> Result<T> {
        self.map_err(|source| Error::Decode {
            context: context.into(),
            source,
        })
    }
}

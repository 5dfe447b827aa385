use thiserror::Error;

use crate::source::SourceError;

/// Errors raised by clips and overlaps.
#[derive(Debug, Error)]
pub enum ClipError {
    /// Rejected construction or trim parameters.
    #[error("invalid argument: {0}")]
    InvalidArgument(String),

    /// A source reader operation failed; carries the reader's own message.
    #[error("source reader failed to {op}: {source}")]
    Reader {
        op: &'static str,
        #[source]
        source: SourceError,
    },
}

impl ClipError {
    pub(crate) fn invalid(message: impl Into<String>) -> Self {
        Self::InvalidArgument(message.into())
    }

    pub(crate) fn reader(op: &'static str) -> impl FnOnce(SourceError) -> Self {
        move |source| Self::Reader { op, source }
    }
}

pub type Result<T> = std::result::Result<T, ClipError>;

// Copyright (c) 2024-present, fjall-rs
// This source code is licensed under both the Apache 2.0 and MIT License
// (found in the LICENSE-* files in the repository)

use crate::coding::{DecodeError, EncodeError};

/// Represents errors that can occur in the word index
#[derive(Debug)]
pub enum Error {
    /// I/O error
    Io(std::io::Error),

    /// Encoding failed
    Encode(EncodeError),

    /// Decoding failed (bad signature, truncated block, malformed string)
    Decode(DecodeError),

    /// A caller or indexer broke an API contract
    ///
    /// This indicates a bug in the caller, not a runtime condition.
    ContractViolation(&'static str),

    /// The document path is neither in memory nor on disk
    DocumentNotFound(String),
}

impl Error {
    /// Returns `true` if the error means the index file is malformed.
    #[must_use]
    pub fn is_format_error(&self) -> bool {
        matches!(self, Self::Decode(e) if !matches!(e, DecodeError::Io(_)))
    }
}

impl std::fmt::Display for Error {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Io(e) => write!(f, "WordIndexError(Io: {e})"),
            Self::Encode(e) => write!(f, "WordIndexError({e})"),
            Self::Decode(e) => write!(f, "WordIndexError({e})"),
            Self::ContractViolation(msg) => write!(f, "WordIndexError(ContractViolation: {msg})"),
            Self::DocumentNotFound(path) => write!(f, "WordIndexError(DocumentNotFound: {path})"),
        }
    }
}

impl std::error::Error for Error {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::Io(e) => Some(e),
            Self::Encode(e) => Some(e),
            Self::Decode(e) => Some(e),
            Self::ContractViolation(_) | Self::DocumentNotFound(_) => None,
        }
    }
}

impl From<std::io::Error> for Error {
    fn from(value: std::io::Error) -> Self {
        Self::Io(value)
    }
}

impl From<EncodeError> for Error {
    fn from(value: EncodeError) -> Self {
        Self::Encode(value)
    }
}

impl From<DecodeError> for Error {
    fn from(value: DecodeError) -> Self {
        Self::Decode(value)
    }
}

impl From<tempfile::PersistError> for Error {
    fn from(value: tempfile::PersistError) -> Self {
        Self::Io(value.error)
    }
}

/// Word index result
pub type Result<T> = std::result::Result<T, Error>;

//! The unified error type returned by every contract method and orchestrator
//! operation.
//!
//! Every variant carries a `kind()` discriminator so the HTTP adapter can
//! dispatch to the right status code (spec §7) without re-deriving it from
//! the message text.

use thiserror::Error;

/// Result type alias used throughout the crate hierarchy.
pub type Result<T> = std::result::Result<T, Error>;

/// Machine-readable tag surfaced to API callers as the `error` context key.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// Schema failure, bad transition, version/dataset mismatch, wrong load state.
    Validation,
    /// Missing dataset, version, key, or table.
    NotFound,
    /// CAS failure on a metadata or queue record.
    Conflict,
    /// Backend signalled rate limiting.
    TooManyRequests,
    /// Uncategorized failure.
    Internal,
}

impl ErrorKind {
    /// The HTTP status the adapter maps this kind to (spec §7 table).
    pub fn http_status(self) -> u16 {
        match self {
            ErrorKind::Validation => 400,
            ErrorKind::NotFound => 404,
            ErrorKind::Conflict => 409,
            ErrorKind::TooManyRequests => 429,
            ErrorKind::Internal => 500,
        }
    }
}

/// Extra structured context a caller can surface alongside the error body.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ErrorDetail {
    /// A short machine tag naming the specific failure, e.g. `invalid-version-state`.
    pub tag: Option<String>,
    /// `(dataset, table)` pairs referenced by a load that don't exist.
    pub missing_tables: Vec<(String, String)>,
}

/// Unified error type for the versioned key-value store core.
#[derive(Debug, Error)]
pub enum Error {
    /// Schema failure, invalid state transition, or mismatched version/dataset.
    #[error("validation error: {message}")]
    Validation {
        /// Human-readable explanation.
        message: String,
        /// Structured detail for the HTTP layer.
        detail: ErrorDetail,
    },

    /// The referenced entity does not exist.
    #[error("not found: {message}")]
    NotFound {
        /// Human-readable explanation.
        message: String,
        /// Structured detail for the HTTP layer.
        detail: ErrorDetail,
    },

    /// Optimistic-concurrency (CAS) collision on a metadata or queue record.
    #[error("conflict: {message}")]
    Conflict {
        /// Human-readable explanation.
        message: String,
    },

    /// The backend signalled it is rate-limiting the caller.
    #[error("too many requests: {message}")]
    TooManyRequests {
        /// Human-readable explanation.
        message: String,
    },

    /// Anything uncategorized, including wrapped backend/transport failures.
    #[error("internal error: {message}")]
    Internal {
        /// Human-readable explanation.
        message: String,
    },
}

impl Error {
    /// Build a [`Error::Validation`] with a machine tag and no further detail.
    pub fn validation(tag: impl Into<String>, message: impl Into<String>) -> Self {
        Error::Validation {
            message: message.into(),
            detail: ErrorDetail {
                tag: Some(tag.into()),
                missing_tables: Vec::new(),
            },
        }
    }

    /// Build a [`Error::NotFound`] with a machine tag.
    pub fn not_found(tag: impl Into<String>, message: impl Into<String>) -> Self {
        Error::NotFound {
            message: message.into(),
            detail: ErrorDetail {
                tag: Some(tag.into()),
                missing_tables: Vec::new(),
            },
        }
    }

    /// Build the `tables-not-found` `NotFound` used by `load-entries` (spec §4.4).
    pub fn tables_not_found(missing: Vec<(String, String)>) -> Self {
        Error::NotFound {
            message: format!("{} table(s) not found", missing.len()),
            detail: ErrorDetail {
                tag: Some("tables-not-found".to_string()),
                missing_tables: missing,
            },
        }
    }

    /// Build a [`Error::Conflict`].
    pub fn conflict(message: impl Into<String>) -> Self {
        Error::Conflict {
            message: message.into(),
        }
    }

    /// Build a [`Error::TooManyRequests`].
    pub fn too_many_requests(message: impl Into<String>) -> Self {
        Error::TooManyRequests {
            message: message.into(),
        }
    }

    /// Build an [`Error::Internal`].
    pub fn internal(message: impl Into<String>) -> Self {
        Error::Internal {
            message: message.into(),
        }
    }

    /// The error kind, used by the HTTP adapter to pick a status code.
    pub fn kind(&self) -> ErrorKind {
        match self {
            Error::Validation { .. } => ErrorKind::Validation,
            Error::NotFound { .. } => ErrorKind::NotFound,
            Error::Conflict { .. } => ErrorKind::Conflict,
            Error::TooManyRequests { .. } => ErrorKind::TooManyRequests,
            Error::Internal { .. } => ErrorKind::Internal,
        }
    }

    /// Structured detail, if any (always empty for `Conflict`/`TooManyRequests`/`Internal`).
    pub fn detail(&self) -> ErrorDetail {
        match self {
            Error::Validation { detail, .. } | Error::NotFound { detail, .. } => detail.clone(),
            _ => ErrorDetail::default(),
        }
    }

    /// Whether the caller might reasonably retry this exact operation unmodified.
    ///
    /// Only `Conflict` (lost a CAS race) and `TooManyRequests` (backend asked
    /// for backoff) are retryable; the orchestrator itself never retries —
    /// per spec §4.1, that choice is left to the caller.
    pub fn is_retryable(&self) -> bool {
        matches!(self, Error::Conflict { .. } | Error::TooManyRequests { .. })
    }
}

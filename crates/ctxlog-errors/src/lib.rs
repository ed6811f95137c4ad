//! Error facility for ctxlog
//!
//! Two classes of failure exist:
//!
//! - **Configuration errors** ([`CtxLogError`]): a context source was never
//!   bound, was bound twice, or a configuration document is invalid. These
//!   are fatal and surface at startup.
//! - **Read anomalies** ([`ReadAnomaly`]): a context cell could not be read
//!   while an event was being enriched. These never propagate; the bridges
//!   substitute a safe default and carry on without logging.

use thiserror::Error;

/// Result type alias using CtxLogError
pub type Result<T> = std::result::Result<T, CtxLogError>;

/// Canonical error kind taxonomy with stable codes
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// A context source was read or wired before setup bound it
    NotBound,
    /// Setup was called more than once for the same context
    AlreadyBound,
    /// Configuration document could not be parsed or validated
    InvalidConfig,
    /// A context cell was unreadable at event time
    ReadAnomaly,
}

impl ErrorKind {
    /// Get the stable error code for this kind
    pub fn code(&self) -> &'static str {
        match self {
            ErrorKind::NotBound => "ERR_CONFIG_NOT_BOUND",
            ErrorKind::AlreadyBound => "ERR_CONFIG_ALREADY_BOUND",
            ErrorKind::InvalidConfig => "ERR_CONFIG_INVALID",
            ErrorKind::ReadAnomaly => "ERR_READ_ANOMALY",
        }
    }

    /// True for kinds that must abort startup
    pub fn is_configuration(&self) -> bool {
        !matches!(self, ErrorKind::ReadAnomaly)
    }
}

/// Which ambient context an error refers to
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ContextName {
    Correlation,
    ExtraFields,
}

impl std::fmt::Display for ContextName {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ContextName::Correlation => write!(f, "correlation"),
            ContextName::ExtraFields => write!(f, "extra-fields"),
        }
    }
}

/// Configuration error raised during setup
#[derive(Error, Debug, Clone, PartialEq)]
pub enum CtxLogError {
    /// Source was never bound via setup
    #[error("{context} context source is not bound; call setup during initialization")]
    NotBound { context: ContextName },

    /// Setup was called a second time
    #[error("{context} context source is already bound")]
    AlreadyBound { context: ContextName },

    /// Configuration could not be parsed or validated
    #[error("Invalid logging configuration: {reason}")]
    InvalidConfig { reason: String },
}

impl CtxLogError {
    /// Classify this error
    pub fn kind(&self) -> ErrorKind {
        match self {
            CtxLogError::NotBound { .. } => ErrorKind::NotBound,
            CtxLogError::AlreadyBound { .. } => ErrorKind::AlreadyBound,
            CtxLogError::InvalidConfig { .. } => ErrorKind::InvalidConfig,
        }
    }

    /// Get the stable error code
    pub fn code(&self) -> &'static str {
        self.kind().code()
    }

    pub fn invalid_config(reason: impl Into<String>) -> Self {
        CtxLogError::InvalidConfig {
            reason: reason.into(),
        }
    }
}

/// A context cell could not be read while enriching an event.
///
/// Never surfaced to callers of the logging API.
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReadAnomaly {
    /// The cell is being mutated on this thread (re-entrant read)
    #[error("context cell is borrowed for writing")]
    Busy,
    /// The thread-local storage has already been torn down
    #[error("context cell accessed during thread teardown")]
    Destroyed,
}

impl ReadAnomaly {
    pub fn kind(&self) -> ErrorKind {
        ErrorKind::ReadAnomaly
    }
}

//! Error types for resource pool allocation

use crate::allocator::Owner;
use thiserror::Error;

/// Result type for pool operations
pub type Result<T> = std::result::Result<T, Error>;

/// Resource pool errors
///
/// Two families share this enum: pool-definition errors returned by
/// constructors (an invalid definition must abort pool creation), and
/// operational failures returned by `get`/`reserve` that a caller can
/// inspect and recover from. Operational failures never mutate pool state.
#[derive(Debug, Clone, Error)]
pub enum Error {
    // Pool definition errors
    #[error("invalid integer range: start {start} must be smaller than end {end}")]
    InvalidRange { start: u64, end: u64 },

    #[error("invalid range expression '{0}'")]
    InvalidRangeExpr(String),

    #[error("invalid network definition: {0}")]
    InvalidNetwork(String),

    // Allocation errors
    #[error("pool {pool} is exhausted")]
    Exhausted { pool: String },

    #[error("{resource} is outside pool {pool}")]
    OutOfRange { resource: String, pool: String },

    #[error("{resource} is already held by {owner} (requested by {requested})")]
    Conflict {
        resource: String,
        owner: Owner,
        requested: Owner,
    },

    #[error("identifier '{identifier}' is already bound to {resource}")]
    IdentifierBound { identifier: String, resource: String },

    #[error("prefix length /{prefix_len} cannot be carved from {network}")]
    InvalidPrefixLen { prefix_len: u8, network: String },

    #[error("identifier '{identifier}' holds {existing}, not a /{requested} block")]
    PrefixSizeMismatch {
        identifier: String,
        existing: String,
        requested: u8,
    },

    #[error("{block} is not a free block of {pool}")]
    BlockUnavailable { block: String, pool: String },

    #[error("no resource recorded for identifier '{identifier}'")]
    NotFound { identifier: String },
}

impl Error {
    /// True for operational failures the caller may handle by retrying with
    /// different parameters, skipping, or escalating. Definition errors
    /// (invalid range, malformed network) are not recoverable: the pool was
    /// never created.
    pub fn is_recoverable(&self) -> bool {
        !matches!(
            self,
            Error::InvalidRange { .. } | Error::InvalidRangeExpr(_) | Error::InvalidNetwork(_)
        )
    }
}

impl From<ipnet::PrefixLenError> for Error {
    fn from(e: ipnet::PrefixLenError) -> Self {
        Error::InvalidNetwork(e.to_string())
    }
}

impl From<ipnet::AddrParseError> for Error {
    fn from(e: ipnet::AddrParseError) -> Self {
        Error::InvalidNetwork(e.to_string())
    }
}

impl From<std::net::AddrParseError> for Error {
    fn from(e: std::net::AddrParseError) -> Self {
        Error::InvalidNetwork(e.to_string())
    }
}

//! Error types for stm95-core
//!
//! This module provides a no_std compatible error type that can be used
//! throughout the crate.

use core::fmt;

/// Core error type - no_std compatible, Copy for efficiency
///
/// The engine deliberately does not say which transport step failed. After
/// a [`Error::Transfer`] from any write path the device state is
/// indeterminate and should be re-read before retrying.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Error {
    /// A transport step (chip-select, header, payload or status read) failed
    Transfer,
    /// The callback handle is missing one or more capabilities
    InvalidHandle,
    /// The write-in-progress bit did not clear within the poll bound
    Timeout,
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Transfer => write!(f, "transport transfer failed"),
            Self::InvalidHandle => write!(f, "transport handle is incomplete"),
            Self::Timeout => write!(f, "write did not complete within the poll limit"),
        }
    }
}

#[cfg(feature = "std")]
impl std::error::Error for Error {}

/// Result type alias using the core Error type
pub type Result<T> = core::result::Result<T, Error>;

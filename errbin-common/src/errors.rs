//! Errors raised while building the error hierarchy.
//!
//! Only registration can fail. Lookup and dispatch degrade to "no match" and
//! the fallback handler instead of returning errors.

use thiserror::Error;

/// Errors returned by registration.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RegisterError {
    /// A required argument was missing, e.g. no identities were supplied.
    #[error("invalid argument: {0}")]
    InvalidArgument(String),

    /// The identity is already present in the hierarchy.
    #[error("duplicate registration: {identity}")]
    DuplicateRegistration { identity: String },
}

impl RegisterError {
    /// Whether this error reports an identity that was already registered.
    pub fn is_duplicate(&self) -> bool {
        matches!(self, Self::DuplicateRegistration { .. })
    }
}

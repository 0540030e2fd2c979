// Copyright 2025 the Trellis Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! The engine's error taxonomy.
//!
//! Every public entry point validates its arguments synchronously and fails
//! with one of these variants; nothing is retried (all operations are local,
//! deterministic computations). Internal invariant violations are not errors:
//! they halt debug builds via `debug_assert!` and degrade to a logged warning
//! plus a skipped operation in release builds.

use alloc::string::String;
use core::fmt;

/// Convenience alias for engine results.
pub type Result<T> = core::result::Result<T, EngineError>;

/// An error surfaced synchronously from a public engine operation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EngineError {
    /// The call's parameters are malformed (a count below one, a padding
    /// combined with a destination that forbids it, a spacer index outside
    /// its allowed span).
    InvalidArgument(String),
    /// An index falls outside the current logical bounds.
    OutOfRange(String),
    /// The operation requires a precondition that does not currently hold
    /// (scrolling to a spacer that does not exist, asking for a row node
    /// that is not materialized).
    IllegalState(String),
}

impl EngineError {
    /// The human-readable message carried by the error.
    #[must_use]
    pub fn message(&self) -> &str {
        match self {
            Self::InvalidArgument(m) | Self::OutOfRange(m) | Self::IllegalState(m) => m,
        }
    }
}

impl fmt::Display for EngineError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::InvalidArgument(m) => write!(f, "invalid argument: {m}"),
            Self::OutOfRange(m) => write!(f, "out of range: {m}"),
            Self::IllegalState(m) => write!(f, "illegal state: {m}"),
        }
    }
}

impl core::error::Error for EngineError {}

#[cfg(test)]
mod tests {
    use super::*;
    use alloc::string::ToString;

    #[test]
    fn display_includes_category_and_message() {
        let e = EngineError::OutOfRange("row index 7 is beyond 5 rows".to_string());
        assert_eq!(e.to_string(), "out of range: row index 7 is beyond 5 rows");
        assert_eq!(e.message(), "row index 7 is beyond 5 rows");
    }
}

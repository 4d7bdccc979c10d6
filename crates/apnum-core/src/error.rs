//! Error taxonomy for the arithmetic kernel.
//!
//! Every fallible operation in the workspace surfaces one of these kinds;
//! there is no silent fallback and no panic-as-control-flow. The kinds map
//! one-to-one onto the failure classes of the numeric layer:
//!
//! - [`ApError::Domain`] — input outside the mathematical domain
//!   (even root of a negative, log of zero, division by zero, negative
//!   exponent in modular exponentiation).
//! - [`ApError::ZeroToZero`] — the indeterminate form 0⁰.
//! - [`ApError::Precision`] — a transcendental requested at infinite
//!   precision, or a complete loss of accurate digits.
//! - [`ApError::Overflow`] — result exponent not representable.
//! - [`ApError::LossOfAccuracy`] — target precision collapsed to zero.
//! - [`ApError::Resource`] — transform length over the element-type maximum,
//!   or a storage allocation failure.

use std::fmt;
use std::io;

/// Result alias used across the workspace.
pub type Result<T> = std::result::Result<T, ApError>;

/// Failure kinds for arbitrary-precision operations.
#[derive(Debug)]
pub enum ApError {
    /// Input outside the function's mathematical domain.
    Domain {
        /// Operation that rejected the input.
        op: &'static str,
        /// Human-readable reason.
        reason: String,
    },
    /// The indeterminate form 0⁰.
    ZeroToZero,
    /// Infinite-precision operand passed to an inexact function, or no
    /// accurate digits remain.
    Precision {
        /// Operation that cannot honor the request.
        op: &'static str,
    },
    /// Result exponent exceeds the representable range.
    Overflow {
        /// Operation that overflowed.
        op: &'static str,
    },
    /// Requested precision shrank to zero during argument reduction.
    LossOfAccuracy {
        /// Operation that lost all digits.
        op: &'static str,
    },
    /// Transform length or storage request beyond what the element type or
    /// the allocator supports.
    Resource {
        /// What was exhausted.
        reason: String,
        /// Underlying I/O failure, when disk-backed storage was involved.
        source: Option<io::Error>,
    },
}

impl ApError {
    /// Domain error with a static operation name and a formatted reason.
    #[must_use]
    pub fn domain(op: &'static str, reason: impl Into<String>) -> Self {
        Self::Domain {
            op,
            reason: reason.into(),
        }
    }

    /// Resource error unrelated to I/O.
    #[must_use]
    pub fn resource(reason: impl Into<String>) -> Self {
        Self::Resource {
            reason: reason.into(),
            source: None,
        }
    }
}

impl fmt::Display for ApError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Domain { op, reason } => write!(f, "{op}: domain error: {reason}"),
            Self::ZeroToZero => write!(f, "zero to the zeroth power"),
            Self::Precision { op } => {
                write!(f, "{op}: cannot compute an inexact value at infinite precision")
            }
            Self::Overflow { op } => write!(f, "{op}: overflow"),
            Self::LossOfAccuracy { op } => write!(f, "{op}: complete loss of accurate digits"),
            Self::Resource { reason, source } => match source {
                Some(e) => write!(f, "resource exhausted: {reason}: {e}"),
                None => write!(f, "resource exhausted: {reason}"),
            },
        }
    }
}

impl std::error::Error for ApError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::Resource {
                source: Some(e), ..
            } => Some(e),
            _ => None,
        }
    }
}

impl From<io::Error> for ApError {
    fn from(e: io::Error) -> Self {
        Self::Resource {
            reason: "scratch storage I/O".to_owned(),
            source: Some(e),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn display_names_the_operation() {
        let e = ApError::domain("root", "even root of a negative value");
        assert_eq!(e.to_string(), "root: domain error: even root of a negative value");
    }

    #[test]
    fn io_errors_become_resource_errors() {
        let e: ApError = io::Error::new(io::ErrorKind::Other, "disk full").into();
        assert!(matches!(e, ApError::Resource { source: Some(_), .. }));
    }
}

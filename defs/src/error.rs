// SPDX-License-Identifier: MIT OR Apache-2.0
//
// Copyright (c) 2026 VXD driver developers

use core::fmt;
use core::fmt::Display;

/// Error kinds shared by both sides of the trust boundary.  Every failure
/// in the transport, dispatch and comms layers is expressed as one of these
/// kinds; the numeric code is the only representation that crosses the
/// boundary, so the mapping in [`SecError::code`] and [`SecError::from_code`]
/// is part of the wire contract.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SecError {
    /// Bad or mismatched argument, caught at entry to an operation.
    InvalidParameters,
    /// Allocation failure.
    OutOfMemory,
    /// Transient: a ring buffer lacks space.  Retry-eligible only at the
    /// firmware-message-send layer.
    Busy,
    /// A register poll or MTX bus wait exceeded its iteration budget.
    Timeout,
    /// A protocol invariant was violated: corrupted ring metadata, an
    /// unknown message id, a stale handle.
    UnexpectedState,
    /// The cross-boundary transport itself failed.  Non-recoverable.
    Fatal,
    /// Internal consistency failure with no more specific kind, e.g. a
    /// message too large to ever fit its ring.
    GenericFailure,
}

impl SecError {
    /// The numeric result code used on the wire.
    pub const fn code(self) -> u32 {
        match self {
            SecError::InvalidParameters => 1,
            SecError::OutOfMemory => 2,
            SecError::Busy => 3,
            SecError::Timeout => 4,
            SecError::UnexpectedState => 5,
            SecError::Fatal => 6,
            SecError::GenericFailure => 7,
        }
    }

    /// Decodes a wire result code.  Zero means success and has no error
    /// kind; unknown codes collapse to `GenericFailure` rather than being
    /// trusted.
    pub const fn from_code(code: u32) -> Option<SecError> {
        match code {
            0 => None,
            1 => Some(SecError::InvalidParameters),
            2 => Some(SecError::OutOfMemory),
            3 => Some(SecError::Busy),
            4 => Some(SecError::Timeout),
            5 => Some(SecError::UnexpectedState),
            6 => Some(SecError::Fatal),
            _ => Some(SecError::GenericFailure),
        }
    }
}

impl Display for SecError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> Result<(), fmt::Error> {
        match self {
            SecError::InvalidParameters => {
                write!(f, "Invalid or mismatched parameters")
            }
            SecError::OutOfMemory => {
                write!(f, "Out of memory")
            }
            SecError::Busy => {
                write!(f, "Resource busy, retry may succeed")
            }
            SecError::Timeout => {
                write!(f, "Hardware wait exceeded its iteration budget")
            }
            SecError::UnexpectedState => {
                write!(f, "Protocol invariant violated")
            }
            SecError::Fatal => {
                write!(f, "Secure transport failure")
            }
            SecError::GenericFailure => {
                write!(f, "Internal consistency failure")
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn wire_codes_round_trip() {
        let kinds = [
            SecError::InvalidParameters,
            SecError::OutOfMemory,
            SecError::Busy,
            SecError::Timeout,
            SecError::UnexpectedState,
            SecError::Fatal,
            SecError::GenericFailure,
        ];
        for kind in kinds {
            assert_eq!(SecError::from_code(kind.code()), Some(kind));
        }
        assert_eq!(SecError::from_code(0), None);
        // Unknown codes must not decode to success.
        assert_eq!(SecError::from_code(0xdead), Some(SecError::GenericFailure));
    }
}

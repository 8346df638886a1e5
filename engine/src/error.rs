//! Error types for the snapshot engine.
//!
//! Every fallible engine operation returns a [`SnapshotError`]. All of them
//! are fatal to the export job that raised them: inputs are deterministic
//! reads of a fixed historical height, so a retry would only reproduce the
//! same failure. Whether one protocol's failure aborts the whole export or
//! just drops that protocol is decided by [`crate::export::FailurePolicy`].

use thiserror::Error;

use crate::amount::Amount;

/// Errors raised while building or verifying a snapshot.
#[derive(Debug, Error)]
pub enum SnapshotError {
    /// A ratio computation was asked to divide by a zero share supply.
    ///
    /// This means the pool state is malformed: outstanding shares with
    /// nothing minted against them.
    #[error("division by zero: total share supply is zero ({context})")]
    DivisionByZero {
        /// What was being split when the zero supply was observed.
        context: String,
    },

    /// A collaborator-supplied value could not be decoded.
    ///
    /// Never skipped. Dropping an undecodable balance would silently
    /// corrupt the audit sum.
    #[error("decode error in {context}: {reason}")]
    Decode {
        /// Where the value came from (token, key, query kind).
        context: String,
        /// Why decoding failed.
        reason: String,
    },

    /// Aggregated sum and observed reserve differ by more than the tolerance.
    #[error(
        "reconciliation mismatch for {denom}: observed {observed}, aggregated {aggregated}, delta {delta} > tolerance {tolerance}"
    )]
    ReconciliationMismatch {
        /// The denomination that failed to reconcile.
        denom: String,
        /// Ground-truth amount from an independent query.
        observed: Amount,
        /// Sum over the snapshot's entries for `denom`.
        aggregated: Amount,
        /// `|observed - aggregated|`.
        delta: Amount,
        /// The maximum delta that would have been accepted.
        tolerance: Amount,
    },

    /// A caller-defined structural check failed after snapshot construction.
    #[error("structural invariant violated: {description}")]
    StructuralInvariantViolation {
        /// The description attached to the failing check.
        description: String,
    },

    /// A holder already has an entry for this denomination.
    ///
    /// Sources of the same denomination must be merged before insertion.
    #[error("duplicate entry: holder {holder} already holds {denom}")]
    DuplicateEntry {
        /// The holder that already has an entry.
        holder: String,
        /// The denomination that was being inserted twice.
        denom: String,
    },

    /// An admin lookup was made against an address that is not a contract.
    #[error("not a contract: {0}")]
    NotAContract(String),

    /// A holder identity could not be normalized to its canonical form.
    #[error("invalid holder identity {raw}: {reason}")]
    InvalidHolder {
        /// The offending input, hex-encoded when it was raw bytes.
        raw: String,
        /// Why normalization failed.
        reason: String,
    },

    /// A query referenced a token the chain state knows nothing about.
    #[error("unknown token: {0}")]
    UnknownToken(String),

    /// The chain-state handle is pinned at a different height than the job.
    #[error("height mismatch: job expects {expected}, chain state is at {actual}")]
    HeightMismatch {
        /// Height requested by the export job.
        expected: u64,
        /// Height the chain-state handle was opened at.
        actual: u64,
    },

    /// A protocol export or audit failed. Carries the protocol name.
    #[error("protocol {protocol} failed: {source}")]
    Protocol {
        /// The protocol instance that failed.
        protocol: String,
        /// The underlying failure.
        #[source]
        source: Box<SnapshotError>,
    },
}

impl SnapshotError {
    /// Wraps `self` with the name of the protocol that produced it.
    pub fn in_protocol(self, protocol: impl Into<String>) -> Self {
        SnapshotError::Protocol {
            protocol: protocol.into(),
            source: Box::new(self),
        }
    }

    /// Shorthand for building a [`SnapshotError::Decode`].
    pub fn decode(context: impl Into<String>, reason: impl ToString) -> Self {
        SnapshotError::Decode {
            context: context.into(),
            reason: reason.to_string(),
        }
    }
}

/// Result type for snapshot engine operations.
pub type SnapshotResult<T> = Result<T, SnapshotError>;

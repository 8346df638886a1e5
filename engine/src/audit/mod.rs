//! # Snapshot Audit
//!
//! The last step of every export. The auditor takes a finished snapshot and
//! reserve totals observed through queries that are independent of the ones
//! used to build it, and checks two things:
//!
//! 1. **Reconciliation.** For each observed denomination,
//!    `|observed - sum_of_denomination| <= tolerance`. Because every split
//!    floors, a correct snapshot undershoots by at most one unit per holder,
//!    which is what the tolerance is sized for.
//! 2. **Structure.** Caller-supplied [`StructuralCheck`]s, e.g. "the treasury
//!    holds nothing after rekeying" and "the admin holds something".
//!
//! An audit never touches the snapshot. A failure aborts the export.

use std::collections::BTreeMap;
use std::fmt;

use serde::Serialize;
use tracing::{error, info};

use crate::amount::{abs_diff, Amount};
use crate::error::{SnapshotError, SnapshotResult};
use crate::holder::HolderId;
use crate::snapshot::{Denom, Snapshot};

// ---------------------------------------------------------------------------
// Structural checks
// ---------------------------------------------------------------------------

type Predicate = Box<dyn Fn(&Snapshot) -> bool + Send + Sync>;

/// A named predicate over a finished snapshot.
pub struct StructuralCheck {
    description: String,
    predicate: Predicate,
}

impl StructuralCheck {
    /// Arbitrary check. `description` is reported verbatim on failure.
    pub fn custom<F>(description: impl Into<String>, predicate: F) -> Self
    where
        F: Fn(&Snapshot) -> bool + Send + Sync + 'static,
    {
        Self {
            description: description.into(),
            predicate: Box::new(predicate),
        }
    }

    /// `holder` must have no entries at all.
    pub fn holder_absent(holder: HolderId) -> Self {
        let description = format!("{holder} must hold no entries");
        Self::custom(description, move |snap| !snap.holds_anything(&holder))
    }

    /// `holder` must have at least one entry.
    pub fn holder_present(holder: HolderId) -> Self {
        let description = format!("{holder} must hold at least one entry");
        Self::custom(description, move |snap| snap.holds_anything(&holder))
    }

    pub fn description(&self) -> &str {
        &self.description
    }

    pub fn passes(&self, snapshot: &Snapshot) -> bool {
        (self.predicate)(snapshot)
    }
}

impl fmt::Debug for StructuralCheck {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("StructuralCheck")
            .field("description", &self.description)
            .finish_non_exhaustive()
    }
}

// ---------------------------------------------------------------------------
// Report
// ---------------------------------------------------------------------------

/// One denomination that reconciled.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct Reconciliation {
    pub denom: Denom,
    #[serde(with = "crate::amount::decimal")]
    pub observed: Amount,
    #[serde(with = "crate::amount::decimal")]
    pub aggregated: Amount,
    #[serde(with = "crate::amount::decimal")]
    pub delta: Amount,
}

/// Diagnostics of a passing audit.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize)]
pub struct AuditReport {
    pub reconciled: Vec<Reconciliation>,
    pub checks_passed: Vec<String>,
}

impl AuditReport {
    /// Largest delta accepted during reconciliation.
    pub fn max_delta(&self) -> Amount {
        self.reconciled
            .iter()
            .map(|r| r.delta.clone())
            .max()
            .unwrap_or_default()
    }
}

// ---------------------------------------------------------------------------
// Auditor
// ---------------------------------------------------------------------------

/// Reconciliation tolerance plus the structural checks to run.
#[derive(Debug)]
pub struct Auditor {
    tolerance: Amount,
    checks: Vec<StructuralCheck>,
}

impl Auditor {
    pub fn new(tolerance: Amount) -> Self {
        Self {
            tolerance,
            checks: Vec::new(),
        }
    }

    /// Adds a structural check. Checks run in insertion order.
    pub fn with_check(mut self, check: StructuralCheck) -> Self {
        self.checks.push(check);
        self
    }

    pub fn tolerance(&self) -> &Amount {
        &self.tolerance
    }

    /// Audits `snapshot` against `observed` reserves.
    ///
    /// Reconciliation runs first, in denomination order, then the structural
    /// checks. The first failure is returned.
    ///
    /// # Errors
    ///
    /// [`SnapshotError::ReconciliationMismatch`] or
    /// [`SnapshotError::StructuralInvariantViolation`].
    pub fn audit(
        &self,
        snapshot: &Snapshot,
        observed: &BTreeMap<Denom, Amount>,
    ) -> SnapshotResult<AuditReport> {
        let mut report = AuditReport::default();

        for (denom, observed_amount) in observed {
            let aggregated = snapshot.sum_of_denomination(denom);
            let delta = almost_equal(denom, observed_amount, &aggregated, &self.tolerance)
                .map_err(|e| {
                    error!(%denom, "audit failed: {e}");
                    e
                })?;
            report.reconciled.push(Reconciliation {
                denom: denom.clone(),
                observed: observed_amount.clone(),
                aggregated,
                delta,
            });
        }

        for check in &self.checks {
            if !check.passes(snapshot) {
                error!(check = check.description(), "audit failed: structural check");
                return Err(SnapshotError::StructuralInvariantViolation {
                    description: check.description().to_string(),
                });
            }
            report.checks_passed.push(check.description().to_string());
        }

        info!(
            denoms = report.reconciled.len(),
            checks = report.checks_passed.len(),
            max_delta = %report.max_delta(),
            "audit passed"
        );
        Ok(report)
    }
}

/// Audits with no structural checks.
pub fn audit(
    snapshot: &Snapshot,
    observed: &BTreeMap<Denom, Amount>,
    tolerance: &Amount,
) -> SnapshotResult<AuditReport> {
    Auditor::new(tolerance.clone()).audit(snapshot, observed)
}

/// Checks `|expected - actual| <= tolerance`, returning the delta.
///
/// # Errors
///
/// [`SnapshotError::ReconciliationMismatch`] when the delta is too large.
pub fn almost_equal(
    denom: &Denom,
    expected: &Amount,
    actual: &Amount,
    tolerance: &Amount,
) -> SnapshotResult<Amount> {
    let delta = abs_diff(expected, actual);
    if &delta > tolerance {
        return Err(SnapshotError::ReconciliationMismatch {
            denom: denom.to_string(),
            observed: expected.clone(),
            aggregated: actual.clone(),
            delta,
            tolerance: tolerance.clone(),
        });
    }
    Ok(delta)
}

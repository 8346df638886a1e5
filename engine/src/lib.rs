// Copyright (c) 2026 ALAS Technology. MIT License.
// See LICENSE for details.

//! # Snapshot Engine
//!
//! Computes point-in-time holder balance snapshots for synthetic and
//! liquidity-pool tokens, and proves them against the chain.
//!
//! Pooled positions are the interesting part. A wallet holding LP tokens or
//! vault shares does not hold the pooled assets directly, so the engine
//! converts every share position into exact claims on the pool's reserves,
//! folds those claims together with direct holdings, attributes
//! contract-held positions to the people who control them, and finally
//! checks that what it handed out adds up to what the pools actually hold.
//!
//! ## Architecture
//!
//! Data only ever flows upward:
//!
//! - **balance** — [`BalanceMap`], the merger and the proportional splitter.
//! - **snapshot** — the per-holder, per-denomination aggregate.
//! - **audit** — reconciliation against observed reserves plus structural checks.
//! - **chain** — the read-only collaborator boundary and its typed queries.
//! - **protocols** — per-protocol exports built from the pieces above.
//! - **export** — job orchestration and failure policy.
//! - **config** — constants and the export configuration schema.
//!
//! ## Ground Rules
//!
//! 1. Amounts are arbitrary-precision integers. No floats, anywhere.
//! 2. Ratios multiply first and floor once. Rounding never over-allocates.
//! 3. Anything that fails to decode is an error, never a skipped row.
//! 4. Every error is fatal to its export job. Nothing is retried.

pub mod amount;
pub mod audit;
pub mod balance;
pub mod chain;
pub mod config;
pub mod error;
pub mod export;
pub mod holder;
pub mod protocols;
pub mod snapshot;

pub use amount::Amount;
pub use audit::{AuditReport, Auditor, StructuralCheck};
pub use balance::BalanceMap;
pub use error::{SnapshotError, SnapshotResult};
pub use holder::HolderId;
pub use snapshot::{Denom, Snapshot, SnapshotEntry};

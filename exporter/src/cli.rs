//! # CLI Interface
//!
//! Defines the command-line argument structure for `snapshot-exporter`
//! using `clap` derive. Supports three subcommands: `export`, `audit`, and
//! `version`.

use clap::{Parser, Subcommand};
use std::path::PathBuf;

use crate::logging::LogFormat;

/// Holder balance snapshot exporter.
///
/// Replays a chain-state dump at a fixed height, exports every configured
/// protocol's holders, audits the result, and writes a JSON snapshot
/// document.
#[derive(Parser, Debug)]
#[command(
    name = "snapshot-exporter",
    about = "Holder balance snapshot exporter",
    version,
    propagate_version = true
)]
pub struct SnapshotExporterCli {
    /// Subcommand to execute.
    #[command(subcommand)]
    pub command: Commands,
}

/// Top-level subcommands.
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Export and audit every configured protocol, then write the snapshot.
    Export(ExportArgs),
    /// Re-audit a previously written snapshot document.
    Audit(AuditArgs),
    /// Print version information and exit.
    Version,
}

/// Inputs shared by `export` and `audit`.
#[derive(Parser, Debug)]
pub struct SourceArgs {
    /// Chain-state dump (JSON) taken at the export height.
    #[arg(long, short = 's', env = "SNAPSHOT_STATE")]
    pub state: PathBuf,

    /// Export configuration (JSON).
    #[arg(long, short = 'c', env = "SNAPSHOT_CONFIG")]
    pub config: PathBuf,

    /// Log output format.
    #[arg(long, value_enum, env = "SNAPSHOT_LOG_FORMAT", default_value_t = LogFormat::Pretty)]
    pub log_format: LogFormat,
}

/// Arguments for the `export` subcommand.
#[derive(Parser, Debug)]
pub struct ExportArgs {
    #[command(flatten)]
    pub source: SourceArgs,

    /// Where to write the snapshot document. Stdout when omitted.
    #[arg(long, short = 'o')]
    pub out: Option<PathBuf>,
}

/// Arguments for the `audit` subcommand.
#[derive(Parser, Debug)]
pub struct AuditArgs {
    #[command(flatten)]
    pub source: SourceArgs,

    /// Snapshot document written by `export`.
    #[arg(long)]
    pub snapshot: PathBuf,
}

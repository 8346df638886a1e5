//! Log setup for the exporter.
//!
//! Events go to stderr. When `export` runs without `--out`, the snapshot
//! document is printed on stdout and has to stay parseable.
//!
//! `RUST_LOG` wins over [`DEFAULT_FILTER`] when set, e.g.
//! `RUST_LOG=snapshot_engine=debug` to see every split and denomination.

use clap::ValueEnum;
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

/// Filter used when `RUST_LOG` is unset.
pub const DEFAULT_FILTER: &str = "snapshot_exporter=info,snapshot_engine=info";

/// How log events are rendered on stderr.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, ValueEnum)]
pub enum LogFormat {
    /// Colored, with source locations. For running by hand.
    #[default]
    Pretty,
    /// One JSON object per event. For scheduled export jobs whose logs are
    /// collected elsewhere.
    Json,
}

fn env_filter(default_filter: &str) -> EnvFilter {
    EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_filter))
}

/// Installs the global subscriber. Panics if one is already installed.
pub fn init_logging(default_filter: &str, format: LogFormat) {
    let registry = tracing_subscriber::registry().with(env_filter(default_filter));

    match format {
        LogFormat::Pretty => registry
            .with(
                fmt::layer()
                    .with_writer(std::io::stderr)
                    .with_file(true)
                    .with_line_number(true),
            )
            .init(),
        LogFormat::Json => registry
            .with(
                fmt::layer()
                    .json()
                    .with_writer(std::io::stderr)
                    .with_current_span(false),
            )
            .init(),
    }

    tracing::debug!(?format, "logging ready");
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn formats_parse_case_insensitively() {
        assert_eq!(LogFormat::from_str("json", true).unwrap(), LogFormat::Json);
        assert_eq!(LogFormat::from_str("PRETTY", true).unwrap(), LogFormat::Pretty);
        assert!(LogFormat::from_str("xml", true).is_err());
    }
}

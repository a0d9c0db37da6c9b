use tracing_subscriber::EnvFilter;

/// All workspace crate targets that should receive log output.
const CRATE_TARGETS: &[&str] = &[
    "gridver",
    "gridver_accum",
    "gridver_metrics",
    "gridver_spatial",
    "gridver_temporal",
    "gridver_workflow",
];

/// Builds the default filter directive for a `-v` count.
///
/// 0 gives warn, 1 info, 2 debug and 3 or more trace.
fn default_directive(verbosity: u8) -> String {
    let level = match verbosity {
        0 => "warn",
        1 => "info",
        2 => "debug",
        _ => "trace",
    };
    CRATE_TARGETS
        .iter()
        .map(|t| format!("{t}={level}"))
        .collect::<Vec<_>>()
        .join(",")
}

/// Initialize tracing based on CLI verbosity level.
///
/// `RUST_LOG` env var overrides the CLI flag if set.
pub fn init(verbosity: u8) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(default_directive(verbosity)));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_directive_levels() {
        assert!(default_directive(0).starts_with("gridver=warn,"));
        assert!(default_directive(1).contains("gridver_workflow=info"));
        assert!(default_directive(2).contains("gridver_spatial=debug"));
        assert!(default_directive(7).ends_with("gridver_workflow=trace"));
        assert_eq!(default_directive(0).split(',').count(), CRATE_TARGETS.len());
    }
}

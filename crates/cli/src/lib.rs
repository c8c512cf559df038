pub mod commands;

use tracing_subscriber::EnvFilter;

/// Log filter for the CLI: `directives` (the `RUST_LOG` value) when they parse, otherwise
/// `debug` or `info` depending on `verbose`.
pub fn log_filter(verbose: bool, directives: Option<&str>) -> EnvFilter {
    directives
        .and_then(|d| EnvFilter::try_new(d).ok())
        .unwrap_or_else(|| EnvFilter::new(if verbose { "debug" } else { "info" }))
}

//! Logging initialization

use tracing_subscriber::EnvFilter;

/// Initialize logging on stderr
///
/// Silent unless `debug` is set. `RUST_LOG` overrides the filter when present.
pub fn init_logging(debug: bool) {
    let default = if debug { "swctl=debug,kube=info" } else { "off" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));

    let _ = tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(filter)
        .with_target(debug)
        .with_file(debug)
        .with_line_number(debug)
        .try_init();
}

//! Diagnostic logging setup for the `gpm` binary

use tracing_subscriber::{fmt, prelude::*, EnvFilter};

/// Install a stderr subscriber filtered by `RUST_LOG`
///
/// Without `RUST_LOG` only warnings are shown, or everything down to `debug`
/// when `verbose` is set. User-facing progress is printed separately, so the
/// log stream stays on stderr and never mixes with `--json` output.
pub fn init(verbose: bool) {
    let default_level = if verbose { "gpm=debug" } else { "warn" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));

    let fmt_layer = fmt::layer()
        .with_writer(std::io::stderr)
        .with_target(verbose)
        .without_time()
        .compact();

    let _ = tracing_subscriber::registry()
        .with(filter)
        .with(fmt_layer)
        .try_init();
}

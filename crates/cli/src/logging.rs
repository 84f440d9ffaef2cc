use tracing_subscriber::EnvFilter;

/// `--verbose` turns on engine-level detail; the `SIFT_LOG` env var
/// overrides both with a full filter expression. Diagnostics go to
/// stderr so stdout stays parseable.
pub fn init(verbose: bool) {
    let fallback = if verbose {
        "sift_core=debug,sift_cli=debug"
    } else {
        "warn"
    };
    let filter =
        EnvFilter::try_from_env("SIFT_LOG").unwrap_or_else(|_| EnvFilter::new(fallback));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

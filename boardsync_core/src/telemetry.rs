use tracing_subscriber::EnvFilter;

const DEFAULT_FILTER: &str = "boardsync_core=info,boardsync_cli=info";

/// Sends sync logs to stderr so they stay out of the terminal view.
/// `RUST_LOG` replaces the default filter. Only the first call installs
/// anything.
pub fn init_tracing() {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(DEFAULT_FILTER));
    let subscriber = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .finish();
    if tracing::subscriber::set_global_default(subscriber).is_err() {
        tracing::debug!("tracing subscriber already installed");
    }
}

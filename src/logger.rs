use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

const DEFAULT_LOG_DIRECTIVES: &str = "info,sqlx=warn";

/// Install the global subscriber. Logs go to stderr so `--format json`
/// output on stdout stays machine-readable. Calling it twice is harmless.
pub fn init_logging() {
  let env_filter = EnvFilter::try_from_default_env()
    .unwrap_or_else(|_| EnvFilter::new(DEFAULT_LOG_DIRECTIVES));

  let _ = tracing_subscriber::registry()
    .with(env_filter)
    .with(fmt::layer().with_target(false).with_writer(std::io::stderr))
    .try_init();
}

//! Tracing subscriber setup
//!
//! Log lines go to stderr so they never interleave with chat output on stdout.

use tracing::Subscriber;
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use crate::config::LoggingConfig;
use crate::error::Result;

/// Install the global subscriber
///
/// `RUST_LOG` takes precedence over `config.level`.
///
/// # Errors
///
/// Returns an error if the configured level is not a valid filter directive
/// or a global subscriber is already installed.
///
/// # Examples
///
/// ```
/// use parley::config::LoggingConfig;
/// use parley::logging::init_logging;
///
/// let config = LoggingConfig::default();
/// assert!(init_logging(&config).is_ok());
/// ```
pub fn init_logging(config: &LoggingConfig) -> Result<()> {
    let env_filter = EnvFilter::try_from_default_env().or_else(|_| build_filter(&config.level))?;
    let registry = tracing_subscriber::registry().with(env_filter);

    if config.json {
        let layer = fmt::layer()
            .json()
            .with_current_span(true)
            .with_span_list(true)
            .with_writer(std::io::stderr);
        registry.with(layer).try_init()?;
    } else {
        let layer = fmt::layer()
            .with_target(true)
            .with_level(true)
            .with_writer(std::io::stderr);
        registry.with(layer).try_init()?;
    }

    Ok(())
}

/// Filter used before the configuration has been read
const BOOTSTRAP_LEVEL: &str = "parley=info";

/// Run `f` under a temporary stderr subscriber
///
/// Configuration decides the real subscriber, so anything logged while the
/// configuration itself is loading would otherwise be dropped. The scoped
/// subscriber honors `RUST_LOG` and is removed once `f` returns.
pub fn with_bootstrap_logging<T>(f: impl FnOnce() -> T) -> T {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(BOOTSTRAP_LEVEL));
    tracing::subscriber::with_default(bootstrap_subscriber(filter, std::io::stderr), f)
}

fn bootstrap_subscriber<W>(filter: EnvFilter, writer: W) -> impl Subscriber + Send + Sync + 'static
where
    W: for<'a> fmt::MakeWriter<'a> + Send + Sync + 'static,
{
    tracing_subscriber::registry().with(filter).with(
        fmt::layer()
            .with_target(true)
            .with_level(true)
            .with_writer(writer),
    )
}

fn build_filter(level: &str) -> Result<EnvFilter> {
    Ok(EnvFilter::try_new(level)?)
}

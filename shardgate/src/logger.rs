//! Logging.

use std::io::IsTerminal;

use shardgate_config::{General, LogFormat};
use tracing::level_filters::LevelFilter;
use tracing::{debug, Subscriber};
use tracing_subscriber::registry::LookupSpan;
use tracing_subscriber::{fmt, prelude::*, EnvFilter, Layer, Registry};

fn format_layer<S>(format: LogFormat) -> Box<dyn Layer<S> + Send + Sync>
where
    S: Subscriber + for<'a> LookupSpan<'a>,
{
    match format {
        LogFormat::Text => fmt::layer()
            .with_ansi(std::io::stderr().is_terminal())
            .with_file(false)
            .boxed(),
        LogFormat::Json => fmt::layer().json().with_file(false).boxed(),
    }
}

fn filter(level: &str) -> EnvFilter {
    let level = level.parse::<LevelFilter>().unwrap_or(LevelFilter::INFO);

    EnvFilter::builder()
        .with_default_directive(level.into())
        .from_env_lossy()
}

/// Install the global logger.
///
/// Returns false if a logger was already installed.
pub fn init(general: &General) -> bool {
    let installed = tracing_subscriber::registry()
        .with(format_layer::<Registry>(general.log_format))
        .with(filter(&general.log_level))
        .try_init()
        .is_ok();

    if installed {
        debug!(
            "shardgate v{} logging at {} ({:?})",
            env!("CARGO_PKG_VERSION"),
            general.log_level,
            general.log_format
        );
    }

    installed
}

use eyre::Result;
use tracing_subscriber::filter::{LevelFilter, Targets};
use tracing_subscriber::layer::{Layer, Layered};
use tracing_subscriber::prelude::*;
use tracing_subscriber::Registry;

/// Logging level. A "higher level" means more will be logged.
#[derive(Default, Debug, Clone, Copy, serde::Deserialize, PartialOrd, Ord, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub enum Level {
    /// Off
    Off = 0,
    /// Error
    Error = 1,
    /// Warn
    Warn = 2,
    /// Debug
    Debug = 3,
    /// Trace
    Trace = 5,
    /// Trace + additional logs from dependencies
    DependencyTrace = 6,
    /// Info
    #[serde(other)]
    #[default]
    Info = 4,
}

impl From<Level> for LevelFilter {
    fn from(level: Level) -> LevelFilter {
        match level {
            Level::Off => LevelFilter::OFF,
            Level::Error => LevelFilter::ERROR,
            Level::Warn => LevelFilter::WARN,
            Level::Debug => LevelFilter::DEBUG,
            Level::Trace | Level::DependencyTrace => LevelFilter::TRACE,
            Level::Info => LevelFilter::INFO,
        }
    }
}

/// Stdout log line shape.
#[derive(Default, Debug, Clone, Copy, serde::Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum Style {
    /// Default human-oriented output.
    #[default]
    Full,
    /// Condensed single-line output.
    Compact,
    /// Multi-line, indented output for local debugging.
    Pretty,
    /// One JSON object per line, for log collectors.
    Json,
}

/// Configuration for the tracing subscriber used by gatehouse agents.
#[derive(Debug, Clone, Default, serde::Deserialize)]
#[serde(default)]
pub struct TracingConfig {
    /// Log line shape.
    pub fmt: Style,
    /// Log level.
    pub level: Level,
}

impl TracingConfig {
    /// Attempt to instantiate and register a tracing subscriber setup from
    /// settings.
    pub fn start_tracing(&self) -> Result<()> {
        let mut target_layer = Targets::new().with_default(self.level);

        if self.level < Level::DependencyTrace {
            // Reduce log noise from trusted libraries that we can reasonably assume are working correctly
            target_layer = target_layer
                .with_target("hyper", Level::Info)
                .with_target("reqwest", Level::Info)
                .with_target("tokio", Level::Debug)
                .with_target("tokio_util", Level::Debug);
        }

        if self.level < Level::Trace {
            // only show sqlx query logs at trace level
            target_layer = target_layer.with_target("sqlx::query", Level::Warn);
        }

        let fmt_layer: Box<dyn Layer<Layered<Targets, Registry>> + Send + Sync> = match self.fmt {
            Style::Full => tracing_subscriber::fmt::layer().boxed(),
            Style::Compact => tracing_subscriber::fmt::layer().compact().boxed(),
            Style::Pretty => tracing_subscriber::fmt::layer().pretty().boxed(),
            Style::Json => tracing_subscriber::fmt::layer().json().boxed(),
        };
        let err_layer = tracing_error::ErrorLayer::default();

        let subscriber = tracing_subscriber::registry()
            .with(target_layer)
            .with(fmt_layer)
            .with(err_layer);

        subscriber.try_init()?;
        Ok(())
    }
}

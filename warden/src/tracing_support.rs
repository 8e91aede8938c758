//! Tracing and logging support
//!
//! Structured logging for the `warden` binary using the `tracing` crate.
//! Library crates only emit events; the subscriber is installed here.

#[cfg(feature = "tracing")]
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

/// Tracing output format
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum TracingFormat {
    /// Human-readable, multi-line
    Pretty,

    /// Single-line, the default for a CLI
    #[default]
    Compact,

    /// JSON lines, for log shippers
    Json,
}

impl std::str::FromStr for TracingFormat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "pretty" => Ok(Self::Pretty),
            "compact" => Ok(Self::Compact),
            "json" => Ok(Self::Json),
            other => Err(format!("unknown log format: {}", other)),
        }
    }
}

/// Tracing configuration
#[derive(Debug, Clone)]
pub struct TracingConfig {
    /// Filter directive (e.g. `debug`, `warden_host=trace`)
    ///
    /// If None, uses RUST_LOG or defaults to "info".
    pub filter: Option<String>,

    pub format: TracingFormat,

    /// Include target module names in output.
    pub target: bool,
}

impl Default for TracingConfig {
    fn default() -> Self {
        Self {
            filter: None,
            format: TracingFormat::Compact,
            target: false,
        }
    }
}

/// Initialize the global subscriber
///
/// Logs go to stderr so command output on stdout stays machine-readable.
#[cfg(feature = "tracing")]
pub fn init_subscriber(config: &TracingConfig) {
    let filter = match &config.filter {
        Some(directive) => EnvFilter::new(directive),
        None => EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
    };

    let registry = tracing_subscriber::registry().with(filter);
    let layer = tracing_subscriber::fmt::layer()
        .with_writer(std::io::stderr)
        .with_target(config.target);

    match config.format {
        TracingFormat::Pretty => registry.with(layer.pretty()).init(),
        TracingFormat::Compact => registry.with(layer.compact()).init(),
        TracingFormat::Json => registry.with(layer.json()).init(),
    }
}

// Fallback when tracing feature is disabled
#[cfg(not(feature = "tracing"))]
pub fn init_subscriber(_config: &TracingConfig) {}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = TracingConfig::default();
        assert_eq!(config.format, TracingFormat::Compact);
        assert!(config.filter.is_none());
        assert!(!config.target);
    }

    #[test]
    fn test_parse_format() {
        assert_eq!("JSON".parse::<TracingFormat>().unwrap(), TracingFormat::Json);
        assert_eq!("pretty".parse::<TracingFormat>().unwrap(), TracingFormat::Pretty);
        assert!("xml".parse::<TracingFormat>().is_err());
    }
}

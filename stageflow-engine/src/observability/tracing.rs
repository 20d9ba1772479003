//! Tracing subscriber setup and span timing.

use serde::{Deserialize, Serialize};
use std::time::Instant;
use tracing_subscriber::{fmt, EnvFilter};

/// Log output format.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LogFormat {
    /// Human-readable lines.
    #[default]
    Pretty,
    /// One JSON object per line.
    Json,
}

/// Settings for [`init_tracing`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TracingConfig {
    /// `EnvFilter` directive used when `RUST_LOG` is unset.
    #[serde(default = "default_filter")]
    pub filter: String,
    /// Output format.
    #[serde(default)]
    pub format: LogFormat,
}

fn default_filter() -> String {
    "stageflow_engine=info".to_string()
}

impl Default for TracingConfig {
    fn default() -> Self {
        Self {
            filter: default_filter(),
            format: LogFormat::default(),
        }
    }
}

impl TracingConfig {
    /// Creates the default configuration.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the fallback filter directive.
    #[must_use]
    pub fn with_filter(mut self, filter: impl Into<String>) -> Self {
        self.filter = filter.into();
        self
    }

    /// Switches to JSON output.
    #[must_use]
    pub fn json(mut self) -> Self {
        self.format = LogFormat::Json;
        self
    }
}

/// Installs a global `tracing` subscriber.
///
/// `RUST_LOG` takes precedence over the configured filter. Returns `false`
/// if a global subscriber was already installed.
pub fn init_tracing(config: &TracingConfig) -> bool {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(&config.filter));
    let builder = fmt().with_env_filter(filter).with_target(true);
    match config.format {
        LogFormat::Pretty => builder.try_init().is_ok(),
        LogFormat::Json => builder.json().try_init().is_ok(),
    }
}

/// Measures the wall time of one named operation.
#[derive(Debug)]
pub struct SpanTimer {
    start: Instant,
    name: String,
}

impl SpanTimer {
    /// Starts a new span timer.
    #[must_use]
    pub fn start(name: impl Into<String>) -> Self {
        Self {
            start: Instant::now(),
            name: name.into(),
        }
    }

    /// Returns the elapsed time in milliseconds.
    #[must_use]
    pub fn elapsed_ms(&self) -> f64 {
        self.start.elapsed().as_secs_f64() * 1000.0
    }

    /// Returns the span name.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Finishes the span and returns the duration.
    #[must_use]
    pub fn finish(self) -> f64 {
        self.elapsed_ms()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_tracing_config_defaults() {
        let config = TracingConfig::default();
        assert_eq!(config.filter, "stageflow_engine=info");
        assert_eq!(config.format, LogFormat::Pretty);
    }

    #[test]
    fn test_tracing_config_from_json() {
        let config: TracingConfig = serde_json::from_str(r#"{"format": "json"}"#).unwrap();
        assert_eq!(config.format, LogFormat::Json);
        assert_eq!(config.filter, "stageflow_engine=info");
    }

    #[test]
    fn test_init_tracing_twice_is_harmless() {
        let config = TracingConfig::new().with_filter("stageflow_engine=debug");
        let _ = init_tracing(&config);
        assert!(!init_tracing(&config));
    }

    #[test]
    fn test_span_timer() {
        let timer = SpanTimer::start("commit");
        std::thread::sleep(std::time::Duration::from_millis(5));
        assert_eq!(timer.name(), "commit");
        assert!(timer.finish() >= 5.0);
    }
}

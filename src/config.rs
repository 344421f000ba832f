//! Metric construction and process settings
//!
//! `MetricConfig` is validated once when a `Metric` is built. `RollupSettings`
//! is the TOML document the `metric-rollup` binary reads:
//!
//! ```toml
//! period_lengths_ms = [60000, 3600000]
//!
//! [metric]
//! prefix = "requests"
//!
//! [log]
//! level = "debug"
//! format = "json"
//! ```

use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::{MetricError, Result};
use crate::period::PeriodLength;

/// Reserved for future per-metric options.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct MetricOptions {}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct MetricConfig {
    /// Namespace name of the metric under the store root. May be empty.
    pub prefix: String,
    pub options: MetricOptions,
}

impl MetricConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.prefix = prefix.into();
        self
    }

    pub fn with_options(mut self, options: MetricOptions) -> Self {
        self.options = options;
        self
    }

    pub fn validate(&self) -> Result<()> {
        if self.prefix.contains('!') {
            return Err(MetricError::configuration(format!(
                "metric prefix {:?} may not contain '!'",
                self.prefix
            )));
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    #[default]
    Text,
    Json,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct LogConfig {
    /// Default filter directive; `RUST_LOG` takes precedence when set.
    pub level: String,
    pub format: LogFormat,
}

impl Default for LogConfig {
    fn default() -> Self {
        LogConfig {
            level: "info".to_string(),
            format: LogFormat::Text,
        }
    }
}

impl LogConfig {
    pub fn with_level(mut self, level: impl Into<String>) -> Self {
        self.level = level.into();
        self
    }

    pub fn with_format(mut self, format: LogFormat) -> Self {
        self.format = format;
        self
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RollupSettings {
    pub metric: MetricConfig,
    pub log: LogConfig,
    pub period_lengths_ms: Vec<u64>,
}

impl Default for RollupSettings {
    fn default() -> Self {
        RollupSettings {
            metric: MetricConfig::default(),
            log: LogConfig::default(),
            period_lengths_ms: vec![
                PeriodLength::MINUTE.as_millis(),
                PeriodLength::HOUR.as_millis(),
            ],
        }
    }
}

impl RollupSettings {
    pub fn from_toml_str(source: &str) -> Result<Self> {
        let settings: RollupSettings = toml::from_str(source)
            .map_err(|e| MetricError::configuration(format!("invalid settings: {e}")))?;
        settings.metric.validate()?;
        settings.period_lengths()?;
        Ok(settings)
    }

    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let source = std::fs::read_to_string(path).map_err(|e| {
            MetricError::configuration(format!("cannot read {}: {e}", path.display()))
        })?;
        Self::from_toml_str(&source)
    }

    pub fn with_metric(mut self, metric: MetricConfig) -> Self {
        self.metric = metric;
        self
    }

    pub fn with_log(mut self, log: LogConfig) -> Self {
        self.log = log;
        self
    }

    pub fn with_period_lengths(mut self, lengths_ms: Vec<u64>) -> Self {
        self.period_lengths_ms = lengths_ms;
        self
    }

    pub fn period_lengths(&self) -> Result<Vec<PeriodLength>> {
        self.period_lengths_ms
            .iter()
            .map(|&ms| PeriodLength::new(ms))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let settings = RollupSettings::default();
        assert_eq!(settings.metric.prefix, "");
        assert_eq!(settings.log.level, "info");
        assert_eq!(settings.log.format, LogFormat::Text);
        assert_eq!(
            settings.period_lengths().unwrap(),
            [PeriodLength::MINUTE, PeriodLength::HOUR]
        );
    }

    #[test]
    fn test_from_toml() {
        let settings = RollupSettings::from_toml_str(
            r#"
            period_lengths_ms = [1000, 86400000]

            [metric]
            prefix = "requests"

            [log]
            level = "debug"
            format = "json"
            "#,
        )
        .unwrap();

        assert_eq!(settings.metric.prefix, "requests");
        assert_eq!(settings.log.format, LogFormat::Json);
        assert_eq!(settings.period_lengths_ms, [1000, 86_400_000]);
    }

    #[test]
    fn test_partial_toml_keeps_defaults() {
        let settings = RollupSettings::from_toml_str("[metric]\nprefix = \"cpu\"\n").unwrap();
        assert_eq!(settings.log, LogConfig::default());
        assert_eq!(settings.period_lengths_ms.len(), 2);
    }

    #[test]
    fn test_invalid_settings_are_configuration_errors() {
        let zero = RollupSettings::from_toml_str("period_lengths_ms = [0]").unwrap_err();
        assert!(zero.is_configuration());

        let bang = RollupSettings::from_toml_str("[metric]\nprefix = \"a!b\"\n").unwrap_err();
        assert!(bang.is_configuration());

        let syntax = RollupSettings::from_toml_str("period_lengths_ms = ").unwrap_err();
        assert!(syntax.is_configuration());

        let missing = RollupSettings::from_file("/nonexistent/metric-rollup.toml").unwrap_err();
        assert!(missing.is_configuration());
    }

    #[test]
    fn test_builders() {
        let settings = RollupSettings::default()
            .with_metric(MetricConfig::new().with_prefix("gc"))
            .with_log(LogConfig::default().with_level("trace").with_format(LogFormat::Json))
            .with_period_lengths(vec![5_000]);
        assert_eq!(settings.metric.prefix, "gc");
        assert_eq!(settings.log.level, "trace");
        assert_eq!(settings.period_lengths().unwrap()[0].as_millis(), 5_000);
    }
}

use serde::{Deserialize, Serialize};

use super::ConfigError;

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// Observability
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

/// Logging and trace export for `agentrelay serve`.
///
/// Logs go to stdout as JSON lines by default. An OTLP/gRPC exporter is
/// started only when `otlp_endpoint` holds a non-blank value.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ObservabilityConfig {
    /// OTLP gRPC collector, e.g. `http://localhost:4317`.
    #[serde(default)]
    pub otlp_endpoint: Option<String>,

    /// `service.name` reported to the collector.
    #[serde(default = "d_service_name")]
    pub service_name: String,

    /// Fraction of traces exported (`TraceIdRatioBased`).
    #[serde(default = "d_sample_rate")]
    pub sample_rate: f64,

    /// Server log line format.
    #[serde(default)]
    pub log_format: LogFormat,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LogFormat {
    /// One JSON object per line, for log shippers.
    #[default]
    Json,
    /// Human-readable single-line output, for local runs.
    Compact,
}

impl ObservabilityConfig {
    /// The collector to export to. A blank endpoint (as left behind by
    /// templated deployment files) counts as unset.
    pub fn exporter_endpoint(&self) -> Option<&str> {
        self.otlp_endpoint
            .as_deref()
            .map(str::trim)
            .filter(|e| !e.is_empty())
    }

    pub(super) fn validate_into(&self, errors: &mut Vec<ConfigError>) {
        if !(0.0..=1.0).contains(&self.sample_rate) {
            errors.push(ConfigError::error(
                "observability.sample_rate",
                "must be between 0.0 and 1.0",
            ));
        }
        if let Some(endpoint) = self.exporter_endpoint() {
            if !endpoint.starts_with("http://") && !endpoint.starts_with("https://") {
                errors.push(ConfigError::warning(
                    "observability.otlp_endpoint",
                    format!("{endpoint:?} has no http:// or https:// scheme"),
                ));
            }
        }
        if self.service_name.trim().is_empty() {
            errors.push(ConfigError::warning(
                "observability.service_name",
                "empty service name; traces will be hard to find in the collector",
            ));
        }
    }
}

impl Default for ObservabilityConfig {
    fn default() -> Self {
        Self {
            otlp_endpoint: None,
            service_name: d_service_name(),
            sample_rate: d_sample_rate(),
            log_format: LogFormat::default(),
        }
    }
}

fn d_service_name() -> String {
    "agentrelay".into()
}

fn d_sample_rate() -> f64 {
    1.0
}

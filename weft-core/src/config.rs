//! Runtime configuration.

use serde::{Deserialize, Serialize};

/// Default for [`RuntimeConfig::flush_warn_threshold`].
pub const DEFAULT_FLUSH_WARN_THRESHOLD: usize = 10_000;

/// Settings for a [`Runtime`](crate::reactive::Runtime).
///
/// Missing fields fall back to their defaults when deserializing, so an
/// embedding application can carry a partial section in its own config
/// file.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RuntimeConfig {
    /// Name attached to the runtime's tracing spans.
    pub label: String,

    /// Number of computations a single flush may run before a warning is
    /// logged.
    ///
    /// An effect that writes a signal it also reads is re-queued until the
    /// value settles. Two effects flipping each other's inputs never
    /// settle; the warning makes that visible. The flush is never stopped.
    pub flush_warn_threshold: usize,
}

impl Default for RuntimeConfig {
    fn default() -> Self {
        Self {
            label: "weft".to_string(),
            flush_warn_threshold: DEFAULT_FLUSH_WARN_THRESHOLD,
        }
    }
}

impl RuntimeConfig {
    /// Set the tracing label.
    pub fn with_label(mut self, label: impl Into<String>) -> Self {
        self.label = label.into();
        self
    }

    /// Set the flush warning threshold.
    pub fn with_flush_warn_threshold(mut self, threshold: usize) -> Self {
        self.flush_warn_threshold = threshold;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults() {
        let config = RuntimeConfig::default();
        assert_eq!(config.label, "weft");
        assert_eq!(config.flush_warn_threshold, DEFAULT_FLUSH_WARN_THRESHOLD);
    }

    #[test]
    fn builders_override_fields() {
        let config = RuntimeConfig::default()
            .with_label("editor")
            .with_flush_warn_threshold(8);
        assert_eq!(config.label, "editor");
        assert_eq!(config.flush_warn_threshold, 8);
    }

    #[test]
    fn partial_config_deserializes_with_defaults() {
        let config: RuntimeConfig = serde_json::from_str(r#"{ "label": "panel" }"#).unwrap();
        assert_eq!(config.label, "panel");
        assert_eq!(config.flush_warn_threshold, DEFAULT_FLUSH_WARN_THRESHOLD);
    }
}

//! Container configuration

use std::time::Duration;

use serde::Deserialize;

/// Runtime settings for a [`Container`](crate::Container).
///
/// Deserializable so hosts can keep it next to the rest of their settings;
/// missing fields fall back to [`ContainerConfig::default`].
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct ContainerConfig {
    /// Name attached to every tracing event emitted by the container
    pub label: String,
    /// How long `dispose` waits for side effect tasks before aborting them
    pub shutdown_timeout_ms: u64,
}

impl Default for ContainerConfig {
    fn default() -> Self {
        Self {
            label: "container".to_string(),
            shutdown_timeout_ms: 1_000,
        }
    }
}

impl ContainerConfig {
    /// Default config with a custom label
    pub fn labeled(label: impl Into<String>) -> Self {
        Self {
            label: label.into(),
            ..Self::default()
        }
    }

    /// Set the shutdown timeout
    pub fn with_shutdown_timeout(mut self, timeout: Duration) -> Self {
        self.shutdown_timeout_ms = timeout.as_millis().try_into().unwrap_or(u64::MAX);
        self
    }

    /// The shutdown timeout as a `Duration`
    pub fn shutdown_timeout(&self) -> Duration {
        Duration::from_millis(self.shutdown_timeout_ms)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = ContainerConfig::default();
        assert_eq!(config.label, "container");
        assert_eq!(config.shutdown_timeout(), Duration::from_secs(1));
    }

    #[test]
    fn test_partial_deserialize() {
        let config: ContainerConfig = serde_json::from_str(r#"{ "label": "wiki" }"#).unwrap();
        assert_eq!(config, ContainerConfig::labeled("wiki"));
    }

    #[test]
    fn test_builder_helpers() {
        let config = ContainerConfig::labeled("pages")
            .with_shutdown_timeout(Duration::from_millis(250));
        assert_eq!(config.label, "pages");
        assert_eq!(config.shutdown_timeout_ms, 250);
    }
}

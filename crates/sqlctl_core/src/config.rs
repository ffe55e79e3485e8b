use std::env;
use std::time::Duration;

/// Runtime configuration for the controller binary, adapted from the
/// teacher's `dbflux_core::app_config::AppConfig`/`AppConfigStore` (a
/// serde struct loaded from a JSON file in `dirs::config_dir()`). A cluster
/// controller has no per-user config directory, so this crate's
/// counterpart loads the same shape of settings from environment
/// variables instead, following the conventional way Kubernetes operators
/// take their runtime knobs.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RuntimeConfig {
    /// How often to re-poll objects that are already up to date.
    pub poll_interval: Duration,
    /// Maximum number of objects reconciled concurrently per kind.
    pub max_concurrency: u16,
    /// Optional override of the kubeconfig path; `None` means in-cluster
    /// config or the default `~/.kube/config` lookup.
    pub kubeconfig_path: Option<String>,
}

impl Default for RuntimeConfig {
    fn default() -> Self {
        Self {
            poll_interval: Duration::from_secs(600),
            max_concurrency: 5,
            kubeconfig_path: None,
        }
    }
}

impl RuntimeConfig {
    /// Load from environment variables, falling back to defaults for any
    /// that are absent or unparseable. Mirrors `AppConfigStore::load`'s
    /// permissive "never fail the process over config, use defaults"
    /// stance.
    pub fn from_env() -> Self {
        let mut config = Self::default();
        if let Ok(secs) = env::var("SQLCTL_POLL_INTERVAL_SECS") {
            if let Ok(secs) = secs.parse::<u64>() {
                config.poll_interval = Duration::from_secs(secs);
            }
        }
        if let Ok(n) = env::var("SQLCTL_MAX_CONCURRENCY") {
            if let Ok(n) = n.parse::<u16>() {
                config.max_concurrency = n;
            }
        }
        if let Ok(path) = env::var("KUBECONFIG") {
            config.kubeconfig_path = Some(path);
        }
        config
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_are_sane() {
        let config = RuntimeConfig::default();
        assert_eq!(config.poll_interval, Duration::from_secs(600));
        assert_eq!(config.max_concurrency, 5);
    }
}

// SPDX-License-Identifier: Apache-2.0
// Copyright Authors of bpfman

use std::{path::PathBuf, str::FromStr};

use serde::Deserialize;

/// Agent configuration, loaded from a TOML file mounted by the operator's
/// config map. `NODE_NAME` is deliberately
/// not part of this struct — it is read straight from the process
/// environment, and its absence is a fatal startup error regardless of
/// what this file contains.
#[derive(Clone, Debug, Deserialize)]
#[serde(default)]
pub struct Config {
    pub loader: LoaderConfig,
    pub reconcile: ReconcileConfig,
}

#[derive(Clone, Debug, Deserialize)]
#[serde(default)]
pub struct LoaderConfig {
    /// UNIX socket the loader's gRPC server listens on.
    pub socket_path: PathBuf,
}

impl Default for LoaderConfig {
    fn default() -> Self {
        LoaderConfig {
            socket_path: PathBuf::from("/run/bpfman-sock/bpfman.sock"),
        }
    }
}

#[derive(Clone, Copy, Debug, Deserialize)]
#[serde(default)]
pub struct ReconcileConfig {
    /// Requeue interval after a transient transport or cluster API error.
    pub retry_interval_secs: u64,
    /// Discovery reconciler's steady-state poll interval.
    pub discovery_poll_interval_secs: u64,
}

impl Default for ReconcileConfig {
    fn default() -> Self {
        ReconcileConfig {
            retry_interval_secs: 5,
            discovery_poll_interval_secs: 30,
        }
    }
}

impl Default for Config {
    fn default() -> Self {
        Config {
            loader: LoaderConfig::default(),
            reconcile: ReconcileConfig::default(),
        }
    }
}

impl FromStr for Config {
    type Err = toml::de::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        toml::from_str(s)
    }
}

impl Config {
    /// Loads the config file at `path`, falling back to defaults if the
    /// file does not exist — a freshly-installed cluster may not have
    /// populated the config map yet, and the agent should still start with
    /// sane values rather than refuse.
    pub async fn load(path: &std::path::Path) -> anyhow::Result<Self> {
        match tokio::fs::read_to_string(path).await {
            Ok(contents) => Ok(Self::from_str(&contents)?),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(Self::default()),
            Err(e) => Err(e.into()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_config_uses_defaults() {
        let cfg = Config::from_str("").unwrap();
        assert_eq!(cfg.reconcile.retry_interval_secs, 5);
        assert_eq!(cfg.reconcile.discovery_poll_interval_secs, 30);
    }

    #[test]
    fn overrides_one_field_without_disturbing_others() {
        let cfg: Config = toml::from_str(
            r#"
            [reconcile]
            retry_interval_secs = 15
            "#,
        )
        .unwrap();
        assert_eq!(cfg.reconcile.retry_interval_secs, 15);
        assert_eq!(cfg.reconcile.discovery_poll_interval_secs, 30);
    }

    #[test]
    fn loads_socket_path_override() {
        let cfg: Config = toml::from_str(
            r#"
            [loader]
            socket_path = "/tmp/bpfman.sock"
            "#,
        )
        .unwrap();
        assert_eq!(cfg.loader.socket_path, PathBuf::from("/tmp/bpfman.sock"));
    }
}

//! User-level settings read from `~/.config/stagehand/config.json`.
//!
//! Every field has a built-in value, so a partial file only overrides what it
//! names. A missing or unreadable file falls back to the built-ins silently.

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};
use crate::paths;
use crate::utils::io;

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct StagehandConfig {
    #[serde(default)]
    pub defaults: Defaults,
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct Defaults {
    pub ssh: SshConfig,
    pub exec: ExecConfig,
    pub api: ApiConfig,
    pub watch: WatchConfig,
}

/// Options passed to every `ssh`/`scp` invocation.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SshConfig {
    pub connect_timeout_secs: u32,
    pub control_persist_secs: u32,
    pub scp_flags: Vec<String>,
}

impl Default for SshConfig {
    fn default() -> Self {
        Self {
            connect_timeout_secs: 10,
            control_persist_secs: 60,
            // OpenSSH 9 defaults scp to SFTP; -O keeps the legacy protocol.
            scp_flags: vec!["-O".to_string()],
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ExecConfig {
    pub spinner_interval_ms: u64,
}

impl Default for ExecConfig {
    fn default() -> Self {
        Self { spinner_interval_ms: 250 }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ApiConfig {
    pub base_url: String,
    /// Name of the environment variable holding the project key.
    pub project_key_env: String,
    pub timeout_secs: u64,
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            base_url: "https://api.stagehand.dev/v1".to_string(),
            project_key_env: "STAGEHAND_PROJECT_KEY".to_string(),
            timeout_secs: 15,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct WatchConfig {
    pub debounce_ms: u64,
    pub ignore: Vec<String>,
}

impl Default for WatchConfig {
    fn default() -> Self {
        Self {
            debounce_ms: 300,
            ignore: [".git/**", "ssh-keys/**", "target/**", "node_modules/**"]
                .iter()
                .map(|pattern| pattern.to_string())
                .collect(),
        }
    }
}

pub fn load_defaults() -> Defaults {
    load_config().defaults
}

pub fn load_config() -> StagehandConfig {
    match read_config() {
        Ok(Some(config)) => config,
        Ok(None) => StagehandConfig::default(),
        Err(err) => {
            tracing::debug!(error = %err.message, "ignoring unreadable config.json");
            StagehandConfig::default()
        }
    }
}

fn read_config() -> Result<Option<StagehandConfig>> {
    let path = paths::config_json()?;
    if !path.is_file() {
        return Ok(None);
    }

    let content = io::read_file(&path, "read config.json")?;
    serde_json::from_str(&content)
        .map(Some)
        .map_err(|e| Error::config_invalid_json(path.display().to_string(), e))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn partial_config_keeps_builtin_values() {
        let config: StagehandConfig =
            serde_json::from_str(r#"{"defaults":{"exec":{"spinner_interval_ms":100}}}"#).unwrap();

        assert_eq!(config.defaults.exec.spinner_interval_ms, 100);
        assert_eq!(config.defaults.ssh.connect_timeout_secs, 10);
        assert_eq!(config.defaults.api.project_key_env, "STAGEHAND_PROJECT_KEY");
        assert!(config.defaults.watch.ignore.iter().any(|p| p.contains(".git")));
    }

    #[test]
    fn partial_section_keeps_sibling_fields() {
        let config: StagehandConfig =
            serde_json::from_str(r#"{"defaults":{"ssh":{"scp_flags":[]}}}"#).unwrap();

        assert!(config.defaults.ssh.scp_flags.is_empty());
        assert_eq!(config.defaults.ssh.control_persist_secs, 60);
    }

    #[test]
    fn builtin_spinner_interval_is_quarter_second() {
        assert_eq!(Defaults::default().exec.spinner_interval_ms, 250);
    }
}

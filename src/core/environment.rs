//! Hosts and the named environments that group them.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::config::Config;
use crate::defaults::SshConfig;
use crate::exec::CommandRunner;
use crate::paths;
use crate::tunnel::SshTunnel;

fn default_port() -> u16 {
    22
}

fn is_default_port(port: &u16) -> bool {
    *port == 22
}

/// One remote target.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Host {
    pub hostname: String,
    pub username: String,
    #[serde(default = "default_port", skip_serializing_if = "is_default_port")]
    pub port: u16,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub identity_file: Option<String>,
    /// Only ever supplied interactively; never read from or written to disk.
    #[serde(skip)]
    password: Option<String>,
}

impl Host {
    pub fn new(hostname: impl Into<String>, username: impl Into<String>) -> Self {
        Self {
            hostname: hostname.into(),
            username: username.into(),
            port: default_port(),
            identity_file: None,
            password: None,
        }
    }

    pub fn with_port(mut self, port: u16) -> Self {
        self.port = port;
        self
    }

    pub fn with_identity_file(mut self, path: impl Into<String>) -> Self {
        self.identity_file = Some(path.into());
        self
    }

    pub fn set_password(&mut self, password: impl Into<String>) {
        let password = password.into();
        self.password = if password.is_empty() { None } else { Some(password) };
    }

    pub fn password(&self) -> Option<&str> {
        self.password.as_deref()
    }

    /// `user@hostname`, as used on the ssh command line.
    pub fn address(&self) -> String {
        format!("{}@{}", self.username, self.hostname)
    }

    /// Identity file with `~` and environment variables expanded.
    pub fn identity_path(&self) -> Option<PathBuf> {
        let raw = self.identity_file.as_deref().filter(|p| !p.is_empty())?;
        let expanded = shellexpand::full(raw)
            .map(|p| p.into_owned())
            .unwrap_or_else(|_| raw.to_string());
        Some(PathBuf::from(expanded))
    }

    /// Resolve a relative identity file against the project root. A host
    /// without one uses the project key once it has been generated.
    pub fn resolve_identity_file(&mut self, root: &Path) {
        let resolved = match self.identity_path() {
            Some(path) if path.is_relative() => root.join(path),
            Some(_) => return,
            None => {
                let project_key = paths::private_key(root);
                if !project_key.is_file() {
                    return;
                }
                project_key
            }
        };
        self.identity_file = Some(resolved.to_string_lossy().into_owned());
    }

    pub fn has_requirements_for_ssh_use(&self) -> bool {
        if self.hostname.trim().is_empty() || self.username.trim().is_empty() {
            return false;
        }

        let has_identity = self.identity_path().is_some_and(|path| path.exists());
        has_identity || self.password.is_some()
    }

    /// Transport to this host, borrowing the caller's runner.
    pub fn tunnel<'a>(&self, runner: &'a dyn CommandRunner, settings: &SshConfig) -> SshTunnel<'a> {
        SshTunnel::new(self.clone(), runner, settings.clone())
    }
}

/// A named, ordered set of hosts plus its configuration sources.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Environment {
    #[serde(skip)]
    name: String,
    #[serde(default)]
    hosts: Vec<Host>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    manual_config: Option<Config>,
    /// Present when the environment's configuration is served by the API.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    api_config: Option<Config>,
}

impl Environment {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Self::default()
        }
    }

    pub fn with_host(mut self, host: Host) -> Self {
        self.hosts.push(host);
        self
    }

    pub fn with_manual_config(mut self, config: Config) -> Self {
        self.manual_config = Some(config);
        self
    }

    pub fn with_api_config(mut self, config: Config) -> Self {
        self.api_config = Some(config);
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn set_name(&mut self, name: impl Into<String>) {
        self.name = name.into();
    }

    pub fn hosts(&self) -> &[Host] {
        &self.hosts
    }

    pub fn hosts_mut(&mut self) -> &mut [Host] {
        &mut self.hosts
    }

    pub fn manual_config(&self) -> Option<&Config> {
        self.manual_config.as_ref()
    }

    pub fn api_config(&self) -> Option<&Config> {
        self.api_config.as_ref()
    }

    pub fn is_api_backed(&self) -> bool {
        self.api_config.is_some()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn host_without_credentials_is_not_ssh_ready() {
        assert!(!Host::new("web1", "deploy").has_requirements_for_ssh_use());
    }

    #[test]
    fn host_with_password_is_ssh_ready() {
        let mut host = Host::new("web1", "deploy");
        host.set_password("secret");
        assert!(host.has_requirements_for_ssh_use());
    }

    #[test]
    fn host_with_existing_identity_is_ssh_ready() {
        let key = tempfile::NamedTempFile::new().unwrap();
        let host = Host::new("web1", "deploy").with_identity_file(key.path().to_string_lossy());
        assert!(host.has_requirements_for_ssh_use());
    }

    #[test]
    fn host_with_missing_identity_is_not_ssh_ready() {
        let host = Host::new("web1", "deploy").with_identity_file("/nonexistent/id_rsa");
        assert!(!host.has_requirements_for_ssh_use());
    }

    #[test]
    fn host_without_username_is_not_ssh_ready() {
        let mut host = Host::new("web1", "");
        host.set_password("secret");
        assert!(!host.has_requirements_for_ssh_use());
    }

    #[test]
    fn relative_identity_resolves_against_root() {
        let root = tempfile::tempdir().unwrap();
        let mut host = Host::new("web1", "deploy").with_identity_file("ssh-keys/id_rsa");
        host.resolve_identity_file(root.path());
        assert_eq!(
            host.identity_path().unwrap(),
            root.path().join("ssh-keys").join("id_rsa")
        );
    }

    #[test]
    fn host_without_identity_uses_generated_project_key() {
        let root = tempfile::tempdir().unwrap();
        let mut host = Host::new("web1", "deploy");

        host.resolve_identity_file(root.path());
        assert!(host.identity_path().is_none());

        std::fs::create_dir_all(paths::ssh_keys(root.path())).unwrap();
        std::fs::write(paths::private_key(root.path()), "PRIVATE").unwrap();
        host.resolve_identity_file(root.path());

        assert_eq!(host.identity_path().unwrap(), paths::private_key(root.path()));
        assert!(host.has_requirements_for_ssh_use());
    }

    #[test]
    fn explicit_identity_wins_over_project_key() {
        let root = tempfile::tempdir().unwrap();
        std::fs::create_dir_all(paths::ssh_keys(root.path())).unwrap();
        std::fs::write(paths::private_key(root.path()), "PRIVATE").unwrap();
        let mut host = Host::new("web1", "deploy").with_identity_file("/etc/deploy/key");

        host.resolve_identity_file(root.path());

        assert_eq!(host.identity_path().unwrap(), Path::new("/etc/deploy/key"));
    }

    #[test]
    fn password_is_never_serialized() {
        let mut host = Host::new("web1", "deploy");
        host.set_password("secret");
        let json = serde_json::to_string(&host).unwrap();
        assert!(!json.contains("secret"));
    }
}

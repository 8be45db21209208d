//! Filesystem locations, both user-level (`~/.config/stagehand`) and
//! relative to a project root.

use std::env;
use std::path::{Path, PathBuf};

use crate::error::{Error, Result};

pub const PROJECT_FILE: &str = "stagehand.json";

const KEY_DIR: &str = "ssh-keys";
const PRIVATE_KEY: &str = "id_rsa";

fn config_home() -> Result<PathBuf> {
    let (var, suffix): (&str, &[&str]) = if cfg!(windows) {
        ("APPDATA", &["stagehand"])
    } else {
        ("HOME", &[".config", "stagehand"])
    };

    let base = env::var_os(var)
        .map(PathBuf::from)
        .ok_or_else(|| Error::internal_unexpected(format!("{} is not set", var)))?;

    Ok(suffix.iter().fold(base, |path, part| path.join(part)))
}

pub fn config_json() -> Result<PathBuf> {
    Ok(config_home()?.join("config.json"))
}

/// Per-user discovery cache, keyed by project.
pub fn cache() -> Result<PathBuf> {
    Ok(config_home()?.join("cache"))
}

pub fn project_file(root: &Path) -> PathBuf {
    root.join(PROJECT_FILE)
}

pub fn ssh_keys(root: &Path) -> PathBuf {
    root.join(KEY_DIR)
}

pub fn private_key(root: &Path) -> PathBuf {
    ssh_keys(root).join(PRIVATE_KEY)
}

pub fn public_key(root: &Path) -> PathBuf {
    ssh_keys(root).join(format!("{}.pub", PRIVATE_KEY))
}

/// ControlMaster sockets live in the system temp dir; paths must stay short.
pub fn control_sockets() -> PathBuf {
    env::temp_dir().join("stagehand-ssh")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn key_paths_sit_under_project_root() {
        let root = Path::new("/srv/shop");
        assert_eq!(private_key(root), Path::new("/srv/shop/ssh-keys/id_rsa"));
        assert_eq!(public_key(root), Path::new("/srv/shop/ssh-keys/id_rsa.pub"));
        assert_eq!(project_file(root), Path::new("/srv/shop/stagehand.json"));
    }
}

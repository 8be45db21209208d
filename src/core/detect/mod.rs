//! Remote configuration discovery.
//!
//! [`ConfigFactory::detect_configs_on_host`] probes candidate paths on a host
//! through its tunnel in three phases, each stopping at the first hit:
//!
//! 1. the detector remembered in the cache, all of its paths in order;
//! 2. every detector's most likely path, remembering the one that hits;
//! 3. every detector's other paths, detector by detector.
//!
//! API-backed environments skip probing. The environment's manual config is
//! always appended last.

mod detectors;

pub use detectors::{builtin_detectors, DotenvDetector, JsonDetector, TomlDetector, WordPressDetector};

use std::env;
use std::fs;
use std::path::{Path, PathBuf};

use tracing::{debug, warn};
use uuid::Uuid;

use crate::cache::Cache;
use crate::config::Config;
use crate::environment::Environment;
use crate::error::{Error, Result};
use crate::tunnel::{with_tunnel, Tunnel};
use crate::utils::{io, shell};

/// Cache slot holding the name of the last detector that hit.
pub const CACHE_KEY: &str = "config-detector";

/// A named strategy for locating and parsing one kind of config file.
pub trait Detector: Send + Sync {
    fn name(&self) -> &str;

    fn most_likely_path(&self) -> &str;

    fn potential_paths(&self) -> Vec<String>;

    fn create_config(&self, environment: &Environment, file: &Path) -> Result<Config>;
}

pub struct ConfigFactory {
    cache: Option<Box<dyn Cache>>,
    detectors: Vec<Box<dyn Detector>>,
}

impl ConfigFactory {
    pub fn new(cache: Option<Box<dyn Cache>>) -> Self {
        Self::with_detectors(cache, builtin_detectors())
    }

    pub fn with_detectors(cache: Option<Box<dyn Cache>>, detectors: Vec<Box<dyn Detector>>) -> Self {
        Self { cache, detectors }
    }

    pub fn cache(&self) -> Option<&dyn Cache> {
        self.cache.as_deref()
    }

    pub fn detector_names(&self) -> Vec<&str> {
        self.detectors.iter().map(|d| d.name()).collect()
    }

    pub fn detect_configs_on_host(
        &mut self,
        environment: &Environment,
        tunnel: &mut dyn Tunnel,
    ) -> Result<Vec<Config>> {
        let hostname = tunnel.host().hostname.clone();

        let mut configs = with_tunnel(tunnel, |tunnel| match environment.api_config() {
            Some(api_config) => Ok(vec![api_config.clone()]),
            None => self.detect_configs(environment, tunnel),
        })?;

        if let Some(manual) = environment.manual_config() {
            configs.push(manual.clone());
        }

        if configs.is_empty() {
            return Err(Error::config_not_found(hostname));
        }

        Ok(configs)
    }

    fn detect_configs(&mut self, environment: &Environment, tunnel: &dyn Tunnel) -> Result<Vec<Config>> {
        let cached = self.cache.as_ref().and_then(|cache| cache.fetch(CACHE_KEY));

        if let Some(cached) = cached {
            if let Some(detector) = self.detectors.iter().find(|d| d.name() == cached) {
                let mut paths = vec![detector.most_likely_path().to_string()];
                paths.extend(detector.potential_paths());

                for path in paths {
                    if let Some(config) = probe(detector.as_ref(), environment, tunnel, &path)? {
                        debug!(detector = detector.name(), path = %path, "config found via cached detector");
                        return Ok(vec![config]);
                    }
                }
            }
        }

        for detector in &self.detectors {
            let path = detector.most_likely_path();
            if let Some(config) = probe(detector.as_ref(), environment, tunnel, path)? {
                debug!(detector = detector.name(), path, "config found at most likely path");
                if let Some(cache) = self.cache.as_mut() {
                    if let Err(err) = cache.store(CACHE_KEY, detector.name()) {
                        warn!(error = %err, "could not remember config detector");
                    }
                }
                return Ok(vec![config]);
            }
        }

        for detector in &self.detectors {
            for path in detector.potential_paths() {
                if let Some(config) = probe(detector.as_ref(), environment, tunnel, &path)? {
                    debug!(detector = detector.name(), path = %path, "config found at fallback path");
                    return Ok(vec![config]);
                }
            }
        }

        Ok(Vec::new())
    }
}

/// Downloaded copy of a remote file, removed when dropped.
struct TemporaryDownload {
    path: PathBuf,
}

impl TemporaryDownload {
    fn new() -> Self {
        let name = format!("stagehand-config-{}", Uuid::new_v4().simple());
        Self {
            path: env::temp_dir().join(name),
        }
    }

    fn path(&self) -> &Path {
        &self.path
    }
}

impl Drop for TemporaryDownload {
    fn drop(&mut self) {
        if self.path.exists() {
            let _ = fs::remove_file(&self.path);
        }
    }
}

/// `Ok(None)` is a negative probe. `Err` means the transport itself broke.
fn probe(
    detector: &dyn Detector,
    environment: &Environment,
    tunnel: &dyn Tunnel,
    remote_path: &str,
) -> Result<Option<Config>> {
    let listing = tunnel.run(&format!("ls {} 2>&1", shell::quote_path(remote_path)))?;
    if !listing.success() {
        debug!(detector = detector.name(), remote_path, "not present");
        return Ok(None);
    }

    let download = TemporaryDownload::new();
    let copied = tunnel.download(remote_path, download.path())?;
    if !copied.success() || !download.path().exists() {
        debug!(detector = detector.name(), remote_path, exit_status = copied.exit_status, "download failed");
        return Ok(None);
    }

    if let Err(err) = io::set_mode(download.path(), 0o666, "make downloaded config readable") {
        debug!(error = %err, "could not adjust downloaded config permissions");
    }

    match detector.create_config(environment, download.path()) {
        Ok(config) => {
            let config = if config.path.is_none() {
                config.with_path(remote_path)
            } else {
                config
            };
            Ok(Some(config))
        }
        Err(err) => {
            debug!(detector = detector.name(), remote_path, error = %err.describe(), "unparseable config");
            Ok(None)
        }
    }
}

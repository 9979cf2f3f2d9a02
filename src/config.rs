//! Kernel configuration.
//!
//! Loaded once at boot, either from a JSON file or from the built-in
//! defaults. Only resource limits are configurable; everything else about
//! the machine (page size, user-space split) is fixed by the architecture.

use std::fs::File;
use std::io::Read;
use std::path::Path;

use serde::Deserialize;

use crate::prelude::*;

#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Config {
    #[serde(default)]
    pub resource_limits: ConfigResourceLimits,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ConfigResourceLimits {
    /// Number of page frames in the user pool.
    #[serde(default = "default_user_pool_pages")]
    pub user_pool_pages: usize,
    /// Upper bound on argv entries accepted by the loader.
    #[serde(default = "default_max_args")]
    pub max_args: usize,
}

fn default_user_pool_pages() -> usize {
    4096
}

fn default_max_args() -> usize {
    1024
}

impl Default for Config {
    fn default() -> Self {
        Self {
            resource_limits: ConfigResourceLimits::default(),
        }
    }
}

impl Default for ConfigResourceLimits {
    fn default() -> Self {
        Self {
            user_pool_pages: default_user_pool_pages(),
            max_args: default_max_args(),
        }
    }
}

lazy_static! {
    static ref KERNEL_CONFIG: RwLock<Config> = RwLock::new(Config::default());
}

/// Publishes the booted configuration; read back through the accessors
/// below by subsystems that cannot be handed a config value.
pub(crate) fn set_boot_config(config: &Config) {
    *KERNEL_CONFIG.write().unwrap() = config.clone();
}

/// The argv cap the loader enforces.
pub fn max_args() -> usize {
    KERNEL_CONFIG.read().unwrap().resource_limits.max_args
}

impl Config {
    pub fn from_file(path: &Path) -> Result<Config> {
        let config_json = {
            let mut file = File::open(path).map_err(|_| errno!(ENOENT, "no config file"))?;
            let mut config_json = String::new();
            file.read_to_string(&mut config_json)
                .map_err(|_| errno!(EIO, "cannot read config file"))?;
            config_json
        };
        let config: Config = serde_json::from_str(&config_json)
            .map_err(|_| errno!(EINVAL, "invalid config JSON"))?;
        debug!("config loaded: {:?}", config);
        Ok(config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults() {
        let config = Config::default();
        assert_eq!(config.resource_limits.user_pool_pages, 4096);
        assert_eq!(config.resource_limits.max_args, 1024);
    }

    #[test]
    fn partial_json_fills_in_defaults() {
        let config: Config =
            serde_json::from_str(r#"{ "resource_limits": { "user_pool_pages": 64 } }"#).unwrap();
        assert_eq!(config.resource_limits.user_pool_pages, 64);
        assert_eq!(config.resource_limits.max_args, 1024);
    }
}

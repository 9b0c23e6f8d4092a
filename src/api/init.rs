//! Initialization overrides the global config, from a hand-crafted entity,
//! a YAML file or environment variables, and then initializes the logger.

use crate::config::{self, ConfigEntity};
use crate::Result;

/// `init_default` initializes the crate using the configuration from system
/// environment and the default value.
#[inline]
pub fn init_default() -> Result<()> {
    init_with_config_file(&mut String::new())
}

/// `init_with_config` initializes the crate using given config.
#[inline]
pub fn init_with_config(config_entity: ConfigEntity) -> Result<()> {
    config_entity.check()?;
    config::reset_global_config(config_entity);
    config::override_config_from_env_and_init_log()
}

/// `init_with_config_file` loads the general configuration from the given YAML
/// file. An empty path falls back to `CONTROLFLOW_CONFIG_FILE_PATH`, then to the
/// default configuration.
#[inline]
pub fn init_with_config_file(config_path: &mut String) -> Result<()> {
    config::init_config_with_yaml(config_path)
}

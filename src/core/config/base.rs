use super::{constant::*, ConfigEntity};
use crate::{logging, utils, Error, Result};
use lazy_static::lazy_static;
use parking_lot::RwLock;
use std::env;
use std::fs::File;
use std::io::prelude::*;
use std::path::Path;
use std::time::Duration;

lazy_static! {
    static ref GLOBAL_CONFIG: RwLock<ConfigEntity> = RwLock::new(ConfigEntity::new());
}

pub fn reset_global_config(entity: ConfigEntity) {
    *GLOBAL_CONFIG.write() = entity;
}

/// A copy of the effective global configuration.
pub fn global_config() -> ConfigEntity {
    GLOBAL_CONFIG.read().clone()
}

// init_config_with_yaml loads general configuration from the YAML file under provided path.
pub fn init_config_with_yaml(config_path: &mut String) -> Result<()> {
    apply_yaml_config_file(config_path)?;
    override_config_from_env_and_init_log()?;
    Ok(())
}

// apply_yaml_config_file loads general configuration from the given YAML file.
fn apply_yaml_config_file(config_path: &mut String) -> Result<()> {
    // Priority: system environment > YAML file > default config
    if utils::is_blank(config_path) {
        *config_path = env::var(CONF_FILE_PATH_ENV_KEY).unwrap_or_else(|_| CONFIG_FILENAME.into());
    }
    load_global_config_from_yaml_file(config_path)?;
    Ok(())
}

fn load_global_config_from_yaml_file(path_str: &str) -> Result<()> {
    if path_str == CONFIG_FILENAME {
        // keep the default config
        return Ok(());
    }
    let path = Path::new(path_str);
    if !path.exists() {
        return Err(Error::msg(format!(
            "Control flow YAML configuration file {} does not exist!",
            path_str
        )));
    }
    let mut file = File::open(path)?;
    let mut content = String::new();
    file.read_to_string(&mut content)?;
    let entity: ConfigEntity = serde_yaml::from_str(&content)?;
    entity.check()?;
    logging::info!("[Config] Resolving control flow config from file, file {}", path_str);
    reset_global_config(entity);
    Ok(())
}

pub fn override_config_from_env_and_init_log() -> Result<()> {
    // values from the system env override the ones of the config file
    override_items_from_system_env()?;

    logging::logger_init(Some(log_config_file()));
    logging::info!("[Config] App name resolved, appName {}", app_name());
    logging::info!(
        "[Config] Print effective global config, globalConfig {}",
        GLOBAL_CONFIG.read()
    );
    Ok(())
}

fn override_items_from_system_env() -> Result<()> {
    let mut cfg = GLOBAL_CONFIG.write();
    if let Ok(app_name) = env::var(APP_NAME_ENV_KEY) {
        if !utils::is_blank(&app_name) {
            cfg.config.app.app_name = app_name;
        }
    }
    if let Ok(properties_path) = env::var(PROPERTIES_PATH_ENV_KEY) {
        if !utils::is_blank(&properties_path) {
            cfg.config.flow.properties_path = properties_path;
        }
    }
    cfg.check()?;
    Ok(())
}

#[inline]
pub fn app_name() -> String {
    GLOBAL_CONFIG.read().app_name().clone()
}

#[inline]
pub fn log_config_file() -> String {
    GLOBAL_CONFIG.read().log_config_file().clone()
}

#[inline]
pub fn properties_path() -> String {
    GLOBAL_CONFIG.read().properties_path().clone()
}

#[inline]
pub fn user_max_queues() -> usize {
    GLOBAL_CONFIG.read().user_max_queues()
}

#[inline]
pub fn user_max_age() -> Duration {
    GLOBAL_CONFIG.read().user_max_age()
}

#[inline]
pub fn cookie_name() -> String {
    GLOBAL_CONFIG.read().cookie_name().clone()
}

#[cfg(test)]
mod test {
    use super::*;
    use std::io::Write;

    // the global config is process wide, so the scenarios run in one test
    #[test]
    fn yaml_and_env() {
        let mut missing = "/definitely/not/here.yaml".to_string();
        assert!(init_config_with_yaml(&mut missing).is_err());

        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(
            file,
            "version: v1\nconfig:\n  app:\n    app_name: from_yaml\n  flow:\n    user_max_queues: 7\n    cookie_name: WHO"
        )
        .unwrap();
        let mut path = file.path().to_string_lossy().into_owned();
        init_config_with_yaml(&mut path).unwrap();
        assert_eq!(user_max_queues(), 7);
        assert_eq!(cookie_name(), "WHO");
        assert_eq!(properties_path(), DEFAULT_PROPERTIES_FILE);

        env::set_var(PROPERTIES_PATH_ENV_KEY, "/etc/controlflow.properties");
        override_config_from_env_and_init_log().unwrap();
        env::remove_var(PROPERTIES_PATH_ENV_KEY);
        assert_eq!(properties_path(), "/etc/controlflow.properties");

        reset_global_config(ConfigEntity::new());
        assert_eq!(user_max_queues(), DEFAULT_USER_MAX_QUEUES);
    }
}

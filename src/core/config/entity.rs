use super::constant::*;
use crate::{base::DEFAULT_COOKIE_NAME, utils, Error, Result};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::time::Duration;

#[derive(Serialize, Deserialize, Debug, Clone)]
#[serde(default)]
pub struct AppConfig {
    // app_name represents the name of current running service.
    pub app_name: String,
}

impl Default for AppConfig {
    fn default() -> Self {
        AppConfig {
            app_name: DEFAULT_APP_NAME.into(),
        }
    }
}

// LogConfig represent the configuration of logging.
#[derive(Serialize, Deserialize, Debug, Clone)]
#[serde(default)]
pub struct LogConfig {
    // config_file is the log4rs configuration, used with the `logger_log4rs` feature.
    pub config_file: String,
}

impl Default for LogConfig {
    fn default() -> Self {
        LogConfig {
            config_file: LOG_CONFIG_FILE.into(),
        }
    }
}

// FlowConfig locates the controller definitions and tunes the per user queues.
#[derive(Serialize, Deserialize, Debug, Clone)]
#[serde(default)]
pub struct FlowConfig {
    // properties_path is the `controlflow.properties` file describing the controllers.
    pub properties_path: String,
    // user_max_queues is the number of user queues above which stale ones are evicted eagerly.
    pub user_max_queues: usize,
    // user_max_age_ms is the idle time after which an empty user queue is evicted.
    pub user_max_age_ms: u64,
    // cookie_name carries the user identity.
    pub cookie_name: String,
}

impl Default for FlowConfig {
    fn default() -> Self {
        FlowConfig {
            properties_path: DEFAULT_PROPERTIES_FILE.into(),
            user_max_queues: DEFAULT_USER_MAX_QUEUES,
            user_max_age_ms: DEFAULT_USER_MAX_AGE_MS,
            cookie_name: DEFAULT_COOKIE_NAME.into(),
        }
    }
}

#[derive(Serialize, Deserialize, Debug, Clone, Default)]
#[serde(default)]
pub struct ControlFlowConfig {
    pub app: AppConfig,
    pub log: LogConfig,
    pub flow: FlowConfig,
}

#[derive(Serialize, Deserialize, Debug, Clone)]
pub struct ConfigEntity {
    pub version: String,
    pub config: ControlFlowConfig,
}

impl Default for ConfigEntity {
    fn default() -> Self {
        ConfigEntity {
            version: CONTROLFLOW_VERSION.into(),
            config: ControlFlowConfig::default(),
        }
    }
}

impl ConfigEntity {
    pub fn new() -> Self {
        ConfigEntity::default()
    }

    pub fn check(&self) -> Result<()> {
        if self.version.is_empty() {
            return Err(Error::msg("empty version"));
        }
        if self.config.app.app_name.is_empty() {
            return Err(Error::msg("empty app name"));
        }
        let flow = &self.config.flow;
        if utils::is_blank(&flow.properties_path) {
            return Err(Error::msg("empty properties path"));
        }
        if flow.user_max_queues == 0 {
            return Err(Error::msg(
                "illegal flow configuration: user_max_queues must be positive",
            ));
        }
        if flow.user_max_age_ms == 0 {
            return Err(Error::msg(
                "illegal flow configuration: user_max_age_ms must be positive",
            ));
        }
        let cookie_name = &flow.cookie_name;
        if cookie_name.is_empty()
            || cookie_name
                .chars()
                .any(|c| c.is_whitespace() || c.is_control() || c == '=' || c == ';' || c == ',')
        {
            return Err(Error::msg(format!(
                "illegal flow configuration: invalid cookie name {:?}",
                cookie_name
            )));
        }
        Ok(())
    }

    pub fn app_name(&self) -> &String {
        &self.config.app.app_name
    }

    pub fn log_config_file(&self) -> &String {
        &self.config.log.config_file
    }

    pub fn properties_path(&self) -> &String {
        &self.config.flow.properties_path
    }

    pub fn user_max_queues(&self) -> usize {
        self.config.flow.user_max_queues
    }

    pub fn user_max_age(&self) -> Duration {
        Duration::from_millis(self.config.flow.user_max_age_ms)
    }

    pub fn cookie_name(&self) -> &String {
        &self.config.flow.cookie_name
    }
}

impl fmt::Display for ConfigEntity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let fmtted = serde_json::to_string_pretty(self).map_err(|_| fmt::Error)?;
        write!(f, "{}", fmtted)
    }
}

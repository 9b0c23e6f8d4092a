// default app settings
pub const CONTROLFLOW_VERSION: &str = "v1";
pub const DEFAULT_APP_NAME: &str = "unknown_service";
pub const APP_NAME_ENV_KEY: &str = "CONTROLFLOW_APP_NAME";
pub const CONF_FILE_PATH_ENV_KEY: &str = "CONTROLFLOW_CONFIG_FILE_PATH";
pub const PROPERTIES_PATH_ENV_KEY: &str = "CONTROLFLOW_PROPERTIES_PATH";
pub const CONFIG_FILENAME: &str = "USE_DEFAULT_CONFIGURATION";

// default flow settings
pub const DEFAULT_PROPERTIES_FILE: &str = "controlflow.properties";
pub const DEFAULT_TIMEOUT_SECS: i64 = 60;
pub const DEFAULT_USER_MAX_QUEUES: usize = 100;
pub const DEFAULT_USER_MAX_AGE_MS: u64 = 10_000;

// keys of controlflow.properties
pub const TIMEOUT_KEY: &str = "timeout";
pub const OWS_PREFIX: &str = "ows.";
pub const OWS_GLOBAL_KEY: &str = "ows.global";
pub const OWS_PRIORITY_HTTP_KEY: &str = "ows.priority.http";
pub const USER_KEY: &str = "user";
pub const IP_KEY: &str = "ip";
pub const IP_PREFIX: &str = "ip.";
pub const IP_BLACKLIST_KEY: &str = "ip.blacklist";
pub const IP_WHITELIST_KEY: &str = "ip.whitelist";

// default log settings
pub const DEFAULT_LOG_LEVEL: &str = "warn";
// relative to the working directory, shipped in the repository
pub const LOG_CONFIG_FILE: &str = "testdata/config/log4rs.yaml";

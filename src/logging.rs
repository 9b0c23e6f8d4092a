use cfg_if::cfg_if;
pub use log::{debug, error, info, trace, warn};

cfg_if! {
    if #[cfg(feature = "logger_env")] {
        use crate::config::DEFAULT_LOG_LEVEL;
        fn init_env_logger() {
            // a second initialization from another entry point is not an error
            let _ = env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(DEFAULT_LOG_LEVEL))
                .try_init();
        }
        pub fn logger_init(_: Option<String>) {
            init_env_logger();
        }
    }
    else if #[cfg(feature = "logger_log4rs")] {
        use std::path::Path;
        fn init_log4rs(file_name: Option<String>) {
            let file_name = match file_name {
                Some(file_name) => file_name,
                None => return,
            };
            let path = Path::new(&file_name);
            if !path.exists() {
                eprintln!("[Logging] log4rs configuration {} not found, logging is disabled", file_name);
                return;
            }
            if let Err(err) = log4rs::init_file(path, Default::default()) {
                eprintln!("[Logging] Failed to initialize log4rs from {}: {:?}", file_name, err);
            }
        }
        pub fn logger_init(file_name: Option<String>) {
            init_log4rs(file_name);
        }
    } else {
        pub fn logger_init(_: Option<String>) {}
    }
}

#[cfg(test)]
mod test {
    use crate::config::LOG_CONFIG_FILE;
    use std::path::Path;

    #[test]
    fn default_log4rs_config_shipped() {
        let path = Path::new(env!("CARGO_MANIFEST_DIR")).join(LOG_CONFIG_FILE);
        assert!(path.exists());
    }

    #[cfg(feature = "logger_log4rs")]
    #[test]
    fn default_log4rs_config_parses() {
        let path = Path::new(env!("CARGO_MANIFEST_DIR")).join(LOG_CONFIG_FILE);
        log4rs::config::load_config_file(path, Default::default()).unwrap();
    }
}

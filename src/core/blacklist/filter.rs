use crate::base::{RejectError, RejectType, Request};
use crate::config::{self, PropertyFileWatcher, IP_BLACKLIST_KEY, IP_WHITELIST_KEY};
use crate::controller::remote_address;
use crate::{logging, utils, Error, Result};
use parking_lot::{Mutex, RwLock};
use regex::Regex;
use std::path::{Path, PathBuf};

// `*` stands for up to four dotted numbers, nothing else is translated
const WILDCARD_PATTERN: &str = "(.{0,1}[0-9]+.{0,1}){0,4}";

/// Compiles an address pattern such as `192.168.1.*`, matching whole addresses.
pub fn address_pattern(glob: &str) -> Result<Regex> {
    let pattern = glob.trim().replace('*', WILDCARD_PATTERN);
    Ok(Regex::new(&format!("^(?:{})$", pattern))?)
}

fn compile_list(key: &str, value: Option<&str>) -> Vec<Regex> {
    utils::split_list(value.unwrap_or_default())
        .iter()
        .filter_map(|glob| match address_pattern(glob) {
            Ok(regex) => Some(regex),
            Err(err) => {
                logging::warn!(
                    "[IpBlacklistFilter] Invalid pattern {} in {}, skipping it: {}",
                    glob,
                    key,
                    err
                );
                None
            }
        })
        .collect()
}

#[derive(Debug, Default)]
struct AddressLists {
    blacklist: Vec<Regex>,
    whitelist: Vec<Regex>,
}

impl AddressLists {
    fn is_blocked(&self, address: &str) -> bool {
        self.blacklist.iter().any(|r| r.is_match(address))
            && !self.whitelist.iter().any(|r| r.is_match(address))
    }
}

/// Blocks the addresses matching `ip.blacklist` and none of `ip.whitelist`,
/// reloading both lists whenever the properties file changes.
#[derive(Debug)]
pub struct IpBlacklistFilter {
    watcher: PropertyFileWatcher,
    lists: RwLock<AddressLists>,
    reload_lock: Mutex<()>,
}

impl IpBlacklistFilter {
    /// Fails when the directory holding `path` does not exist.
    /// A missing file only means an empty blacklist.
    pub fn new<P: Into<PathBuf>>(path: P) -> Result<Self> {
        let path = path.into();
        let dir = match path.parent() {
            Some(dir) if dir != Path::new("") => dir,
            _ => Path::new("."),
        };
        if !dir.is_dir() {
            return Err(Error::msg(format!(
                "Cannot resolve the control flow configuration directory {}",
                dir.display()
            )));
        }
        let filter = IpBlacklistFilter {
            watcher: PropertyFileWatcher::new(path),
            lists: RwLock::new(AddressLists::default()),
            reload_lock: Mutex::new(()),
        };
        filter.reload_if_stale();
        Ok(filter)
    }

    pub fn from_global_config() -> Result<Self> {
        IpBlacklistFilter::new(config::properties_path())
    }

    fn reload_if_stale(&self) {
        if !self.watcher.is_stale() {
            return;
        }
        let _guard = self.reload_lock.lock();
        // another thread may have reloaded while we were waiting
        if !self.watcher.is_stale() {
            return;
        }
        let lists = match self.watcher.read() {
            Ok(Some(properties)) => AddressLists {
                blacklist: compile_list(IP_BLACKLIST_KEY, properties.get(IP_BLACKLIST_KEY)),
                whitelist: compile_list(IP_WHITELIST_KEY, properties.get(IP_WHITELIST_KEY)),
            },
            Ok(None) => {
                logging::warn!(
                    "[IpBlacklistFilter] {} not found, no address is blacklisted",
                    self.watcher.path().display()
                );
                AddressLists::default()
            }
            Err(err) => {
                logging::warn!(
                    "[IpBlacklistFilter] Failed to load {}, no address is blacklisted: {}",
                    self.watcher.path().display(),
                    err
                );
                AddressLists::default()
            }
        };
        logging::info!(
            "[IpBlacklistFilter] Loaded {} blacklist and {} whitelist patterns",
            lists.blacklist.len(),
            lists.whitelist.len()
        );
        *self.lists.write() = lists;
    }

    pub fn is_blocked(&self, address: &str) -> bool {
        self.reload_if_stale();
        self.lists.read().is_blocked(address)
    }

    pub fn filter(&self, request: &Request) -> std::result::Result<(), RejectError> {
        let address = remote_address(request);
        if self.is_blocked(&address) {
            logging::debug!(
                "[IpBlacklistFilter] Request {} from blacklisted address {}",
                request.id(),
                address
            );
            return Err(RejectError::new_with_msg(
                RejectType::Blacklisted,
                format!("Address {} is blacklisted", address),
            ));
        }
        Ok(())
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::base::RequestBuilder;
    use std::fs;

    #[test]
    fn wildcard_patterns() {
        let regex = address_pattern("192.168.1.*").unwrap();
        assert!(regex.is_match("192.168.1.8"));
        assert!(regex.is_match("192.168.1.254"));
        assert!(!regex.is_match("10.192.168.1.8x"));
        assert!(!regex.is_match("10.0.0.1"));
        let regex = address_pattern("10.*").unwrap();
        assert!(regex.is_match("10.0.0.1"));
        assert!(!regex.is_match("110.0.0.1"));
        // dots are not escaped
        assert!(address_pattern("127.0.0.1").unwrap().is_match("127x0.0.1"));
    }

    #[test]
    fn black_and_white_lists() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("controlflow.properties");
        fs::write(
            &path,
            "ip.blacklist=192.168.1.*, 10.0.0.1\nip.whitelist=192.168.1.8\n",
        )
        .unwrap();
        let filter = IpBlacklistFilter::new(&path).unwrap();
        assert!(filter.is_blocked("192.168.1.7"));
        assert!(filter.is_blocked("10.0.0.1"));
        assert!(!filter.is_blocked("192.168.1.8"));
        assert!(!filter.is_blocked("10.0.0.2"));

        let request = RequestBuilder::new("10.0.0.2")
            .with_header("X-Forwarded-For", "192.168.1.7")
            .build();
        let err = filter.filter(&request).unwrap_err();
        assert_eq!(err.reject_type(), RejectType::Blacklisted);
        assert_eq!(err.status_code(), http::StatusCode::FORBIDDEN);
        assert!(filter.filter(&RequestBuilder::new("10.0.0.2").build()).is_ok());
    }

    #[test]
    fn whitelist_alone_blocks_nothing() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("controlflow.properties");
        fs::write(&path, "ip.whitelist=192.168.1.8\n").unwrap();
        let filter = IpBlacklistFilter::new(&path).unwrap();
        assert!(!filter.is_blocked("192.168.1.7"));
    }

    #[test]
    fn reloads_on_change() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("controlflow.properties");
        let filter = IpBlacklistFilter::new(&path).unwrap();
        assert!(!filter.is_blocked("10.0.0.1"));

        fs::write(&path, "ip.blacklist=10.0.0.1\n").unwrap();
        assert!(filter.is_blocked("10.0.0.1"));

        fs::write(&path, "ip.blacklist=10.0.0.1, 10.0.0.2\n").unwrap();
        assert!(filter.is_blocked("10.0.0.2"));

        fs::remove_file(&path).unwrap();
        assert!(!filter.is_blocked("10.0.0.1"));
    }

    #[test]
    fn invalid_patterns_skipped() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("controlflow.properties");
        fs::write(&path, "ip.blacklist=10.0.0.(, 10.0.0.1\n").unwrap();
        let filter = IpBlacklistFilter::new(&path).unwrap();
        assert!(filter.is_blocked("10.0.0.1"));
    }

    #[test]
    fn unresolvable_directory() {
        assert!(IpBlacklistFilter::new("/definitely/not/here/controlflow.properties").is_err());
    }
}

use super::{base, constant::*, Properties, PropertyFileWatcher};
use crate::blocker::{
    HttpHeaderPriorityProvider, PriorityProvider, PriorityThreadBlocker, SimpleThreadBlocker,
    ThreadBlocker,
};
use crate::controller::{
    ControllerChain, CookieKeyGenerator, FlowController, GlobalFlowController, IpFlowController,
    OwsFlowController, OwsRequestMatcher, SingleIpFlowController, UserConcurrentFlowController,
};
use crate::{logging, utils, Result};
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

/// Builds the controller chain out of `controlflow.properties`, and tells
/// when the file changed and the chain needs to be built again.
#[derive(Debug)]
pub struct ControlFlowConfigurator {
    watcher: PropertyFileWatcher,
    user_max_queues: usize,
    user_max_age: Duration,
    cookie_name: String,
}

impl ControlFlowConfigurator {
    pub fn new<P: Into<PathBuf>>(path: P) -> Self {
        ControlFlowConfigurator {
            watcher: PropertyFileWatcher::new(path),
            user_max_queues: DEFAULT_USER_MAX_QUEUES,
            user_max_age: Duration::from_millis(DEFAULT_USER_MAX_AGE_MS),
            cookie_name: crate::base::DEFAULT_COOKIE_NAME.into(),
        }
    }

    /// Uses the properties file and the user queue settings of the global config.
    pub fn from_global_config() -> Self {
        ControlFlowConfigurator::new(base::properties_path()).with_user_limits(
            base::user_max_queues(),
            base::user_max_age(),
            base::cookie_name(),
        )
    }

    pub fn with_user_limits<S: Into<String>>(
        mut self,
        max_queues: usize,
        max_age: Duration,
        cookie_name: S,
    ) -> Self {
        self.user_max_queues = max_queues;
        self.user_max_age = max_age;
        self.cookie_name = cookie_name.into();
        self
    }

    pub fn watcher(&self) -> &PropertyFileWatcher {
        &self.watcher
    }

    pub fn is_stale(&self) -> bool {
        self.watcher.is_stale()
    }

    /// Reads the properties file again and builds a new chain. A missing
    /// file means no controller at all.
    pub fn build_chain(&self) -> Result<ControllerChain> {
        let properties = match self.watcher.read()? {
            Some(properties) => properties,
            None => {
                logging::warn!(
                    "[ControlFlowConfigurator] {} not found, flow control is disabled",
                    self.watcher.path().display()
                );
                Properties::new()
            }
        };
        let chain = self.configure(&properties);
        logging::info!(
            "[ControlFlowConfigurator] Built {} controllers, timeout {:?}",
            chain.controllers().len(),
            chain.timeout()
        );
        Ok(chain)
    }

    pub fn configure(&self, properties: &Properties) -> ControllerChain {
        let mut chain = ControllerChain::new(parse_timeout(properties));
        let priority_provider = properties
            .get(OWS_PRIORITY_HTTP_KEY)
            .and_then(parse_priority_provider);

        for (key, value) in properties.iter() {
            if let Some(controller) = self.controller_for(key, value, &priority_provider) {
                logging::debug!("[ControlFlowConfigurator] Loaded {}", controller.name());
                chain.add_controller(controller);
            }
        }
        chain
    }

    fn controller_for(
        &self,
        key: &str,
        value: &str,
        priority_provider: &Option<Arc<dyn PriorityProvider>>,
    ) -> Option<Arc<dyn FlowController>> {
        let is_controller = key == OWS_GLOBAL_KEY
            || key == USER_KEY
            || key == IP_KEY
            || (key.starts_with(OWS_PREFIX) && key != OWS_PRIORITY_HTTP_KEY)
            || (key.starts_with(IP_PREFIX) && key != IP_BLACKLIST_KEY && key != IP_WHITELIST_KEY);
        if !is_controller {
            return None;
        }
        let queue_size = match value.trim().parse::<usize>() {
            Ok(queue_size) if queue_size > 0 => queue_size,
            _ => {
                logging::warn!(
                    "[ControlFlowConfigurator] Rule {}={} is not a positive queue size, skipping it",
                    key,
                    value
                );
                return None;
            }
        };

        let controller: Arc<dyn FlowController> = if key == OWS_GLOBAL_KEY {
            Arc::new(GlobalFlowController::new(
                queue_size,
                blocker(queue_size, priority_provider),
            ))
        } else if key == USER_KEY {
            Arc::new(
                UserConcurrentFlowController::with_limits(
                    queue_size,
                    self.user_max_queues,
                    self.user_max_age,
                )
                .with_key_generator(CookieKeyGenerator::new(self.cookie_name.clone())),
            )
        } else if key == IP_KEY {
            Arc::new(IpFlowController::new(queue_size))
        } else if let Some(ip) = key.strip_prefix(IP_PREFIX) {
            Arc::new(SingleIpFlowController::new(ip, queue_size))
        } else {
            let matcher = parse_ows_matcher(&key[OWS_PREFIX.len()..])?;
            Arc::new(OwsFlowController::new(
                matcher,
                queue_size,
                blocker(queue_size, priority_provider),
            ))
        };
        Some(controller)
    }
}

fn blocker(
    queue_size: usize,
    priority_provider: &Option<Arc<dyn PriorityProvider>>,
) -> Box<dyn ThreadBlocker> {
    match priority_provider {
        Some(provider) => Box::new(PriorityThreadBlocker::new(queue_size, Arc::clone(provider))),
        None => Box::new(SimpleThreadBlocker::new(queue_size)),
    }
}

fn parse_timeout(properties: &Properties) -> Option<Duration> {
    let secs = match properties.get(TIMEOUT_KEY) {
        None => DEFAULT_TIMEOUT_SECS,
        Some(value) => value.trim().parse::<i64>().unwrap_or_else(|_| {
            logging::warn!(
                "[ControlFlowConfigurator] Invalid timeout {}, using {} seconds",
                value,
                DEFAULT_TIMEOUT_SECS
            );
            DEFAULT_TIMEOUT_SECS
        }),
    };
    utils::timeout_from_millis(secs.saturating_mul(1000))
}

// `ows.priority.http=<header>,<default priority>`
fn parse_priority_provider(value: &str) -> Option<Arc<dyn PriorityProvider>> {
    let items = utils::split_list(value);
    let parsed = match items.as_slice() {
        [header, default] => default
            .parse::<i32>()
            .ok()
            .map(|default| HttpHeaderPriorityProvider::new(header.as_str(), default)),
        _ => None,
    };
    if parsed.is_none() {
        logging::warn!(
            "[ControlFlowConfigurator] Invalid {}={}, expected <header>,<default priority>",
            OWS_PRIORITY_HTTP_KEY,
            value
        );
    }
    parsed.map(|provider| Arc::new(provider) as Arc<dyn PriorityProvider>)
}

// `<service>[.<request>[.<output format>]]`, the output format may contain dots
fn parse_ows_matcher(rule: &str) -> Option<OwsRequestMatcher> {
    let mut parts = rule.splitn(3, '.').map(|part| {
        let part = part.trim();
        if part.is_empty() || part == "*" {
            None
        } else {
            Some(part.to_string())
        }
    });
    let service = parts.next().flatten();
    if service.is_none() {
        logging::warn!("[ControlFlowConfigurator] Invalid service rule ows.{}, skipping it", rule);
        return None;
    }
    Some(OwsRequestMatcher::new(
        service,
        parts.next().flatten(),
        parts.next().flatten(),
    ))
}

#[cfg(test)]
mod test {
    use super::*;
    use std::fs;

    fn names(chain: &ControllerChain) -> Vec<String> {
        chain.controllers().iter().map(|c| c.name()).collect()
    }

    #[test]
    fn builds_controllers() {
        let properties = Properties::parse(
            "timeout=10\n\
             ows.global=100\n\
             ows.wms.getmap=16\n\
             ows.wfs.getfeature.application/vnd.google-earth.kml+xml=2\n\
             user=4\n\
             ip=6\n\
             ip.192.168.1.8=12\n\
             ip.blacklist=192.168.1.*\n\
             ip.whitelist=192.168.1.8\n\
             unrelated=1\n",
        );
        let chain = ControlFlowConfigurator::new("unused").configure(&properties);
        assert_eq!(chain.timeout(), Some(Duration::from_secs(10)));
        assert_eq!(
            names(&chain),
            vec![
                "OwsFlowController(wfs.getfeature.application/vnd.google-earth.kml+xml, 2)",
                "UserConcurrentFlowController(4)",
                "IpFlowController(6)",
                "SingleIpFlowController(192.168.1.8, 12)",
                "OwsFlowController(wms.getmap, 16)",
                "GlobalFlowController(100)",
            ]
        );
    }

    #[test]
    fn invalid_rules_skipped() {
        let properties = Properties::parse("timeout=soon\nows.global=0\nip=many\nuser=-1\nows.=3\n");
        let chain = ControlFlowConfigurator::new("unused").configure(&properties);
        assert!(chain.controllers().is_empty());
        assert_eq!(chain.timeout(), Some(Duration::from_secs(DEFAULT_TIMEOUT_SECS as u64)));
    }

    #[test]
    fn non_positive_timeout_waits_forever() {
        let chain = ControlFlowConfigurator::new("unused").configure(&Properties::parse("timeout=0"));
        assert_eq!(chain.timeout(), None);
    }

    #[test]
    fn priority_provider() {
        assert!(parse_priority_provider("gs-priority,5").is_some());
        assert!(parse_priority_provider("gs-priority").is_none());
        assert!(parse_priority_provider("gs-priority,high").is_none());
    }

    #[test]
    fn ows_matchers() {
        let matcher = parse_ows_matcher("wms").unwrap();
        assert_eq!(matcher, OwsRequestMatcher::new(Some("wms".into()), None, None));
        let matcher = parse_ows_matcher("wms.*.image/png").unwrap();
        assert_eq!(
            matcher,
            OwsRequestMatcher::new(Some("wms".into()), None, Some("image/png".into()))
        );
        assert!(parse_ows_matcher("").is_none());
    }

    #[test]
    fn rebuilds_when_file_changes() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join(DEFAULT_PROPERTIES_FILE);
        let configurator = ControlFlowConfigurator::new(&path);
        assert!(configurator.is_stale());
        assert!(configurator.build_chain().unwrap().controllers().is_empty());
        assert!(!configurator.is_stale());

        fs::write(&path, "ip=6\n").unwrap();
        assert!(configurator.is_stale());
        let chain = configurator.build_chain().unwrap();
        assert_eq!(names(&chain), vec!["IpFlowController(6)"]);

        fs::write(&path, "ip=6\nows.global=10\n").unwrap();
        assert!(configurator.is_stale());
        assert_eq!(configurator.build_chain().unwrap().controllers().len(), 2);
    }
}

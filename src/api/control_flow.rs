use crate::base::{RejectError, Request};
use crate::blacklist::IpBlacklistFilter;
use crate::config::ControlFlowConfigurator;
use crate::controller::{Admission, ControllerChain};
use crate::{logging, Result};
use parking_lot::{Mutex, RwLock};
use std::path::PathBuf;
use std::sync::Arc;

/// The entrance of every request: the blacklist first, then the controller chain.
/// The chain is rebuilt whenever the properties file changes, requests already
/// admitted keep the chain they entered.
#[derive(Debug)]
pub struct ControlFlow {
    configurator: ControlFlowConfigurator,
    chain: RwLock<Arc<ControllerChain>>,
    blacklist: IpBlacklistFilter,
    reload_lock: Mutex<()>,
}

impl ControlFlow {
    pub fn new<P: Into<PathBuf>>(properties_path: P) -> Result<Self> {
        ControlFlow::with_configurator(ControlFlowConfigurator::new(properties_path))
    }

    /// Uses the properties file and user queue settings of the global config.
    pub fn from_global_config() -> Result<Self> {
        ControlFlow::with_configurator(ControlFlowConfigurator::from_global_config())
    }

    pub fn with_configurator(configurator: ControlFlowConfigurator) -> Result<Self> {
        let blacklist = IpBlacklistFilter::new(configurator.watcher().path())?;
        let chain = configurator.build_chain()?;
        Ok(ControlFlow {
            configurator,
            chain: RwLock::new(Arc::new(chain)),
            blacklist,
            reload_lock: Mutex::new(()),
        })
    }

    pub fn blacklist(&self) -> &IpBlacklistFilter {
        &self.blacklist
    }

    /// The chain new requests go through, rebuilt first if the configuration changed.
    pub fn chain(&self) -> Arc<ControllerChain> {
        if self.configurator.is_stale() {
            self.reload();
        }
        Arc::clone(&self.chain.read())
    }

    fn reload(&self) {
        let _guard = self.reload_lock.lock();
        if !self.configurator.is_stale() {
            return;
        }
        match self.configurator.build_chain() {
            Ok(chain) => *self.chain.write() = Arc::new(chain),
            Err(err) => logging::warn!(
                "[ControlFlow] Failed to reload the flow controllers, keeping the current ones: {:?}",
                err
            ),
        }
    }

    /// Blocks until the request may run. The returned `Admission` must be kept
    /// until the response is sent, dropping it releases the request's slots.
    pub fn admit(&self, request: Arc<Request>) -> std::result::Result<Admission, RejectError> {
        self.blacklist.filter(&request)?;
        self.chain().entry(request)
    }
}

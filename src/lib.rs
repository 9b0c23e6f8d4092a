#![cfg_attr(docsrs, feature(doc_cfg))]
#![cfg_attr(docsrs, allow(unused_attributes))]

//! # Control Flow
//!
//! Admission control for a thread-per-request HTTP service. Every inbound request
//! is handed to a chain of flow controllers, each one owning a bounded set of
//! concurrency slots. A controller either admits the request right away, or parks
//! the calling thread until a slot frees or the timeout elapses.
//!
//! The available controllers are:
//! - `GlobalFlowController`: one bounded queue shared by every request.
//! - `OwsFlowController`: a bounded queue for requests hitting a given service / operation / output format.
//! - `IpFlowController`: one bounded queue per client address (honouring `X-Forwarded-For`).
//! - `SingleIpFlowController`: one bounded queue for a single configured address.
//! - `UserConcurrentFlowController`: one bounded queue per cookie identity, with stale-queue eviction.
//!
//! Global and per-service controllers may use the `PriorityThreadBlocker`, admitting
//! waiters by priority (read from an HTTP header) instead of arrival order.
//!
//! An `IpBlacklistFilter` gates requests before flow control, and a
//! `TimeoutReadWriteLock` bounds lock waits in cache layers sitting behind it.
//!
//! ## Initialization
//!
//! - `init_default()`: Load configurations from environment variable. For undefined configurations, use default values.
//! - `init_with_config_file(config_path: &mut String)`: Load configurations from a YAML file.
//! - `init_with_config(config_entity: ConfigEntity)`: Use hand-crafted `ConfigEntity`.
//!
//! The controllers themselves are described in `controlflow.properties`:
//!
//! ```properties
//! timeout=60
//! ows.global=100
//! ows.wms.getmap=16
//! user=4
//! ip=6
//! ip.192.168.1.8=12
//! ip.blacklist=192.168.1.*
//! ip.whitelist=192.168.1.8
//! ows.priority.http=gs-priority,0
//! ```
//!
//! ## Admission
//!
//! ```rust
//! use controlflow::{api::ControlFlow, base::RequestBuilder};
//! use std::sync::Arc;
//!
//! controlflow::init_default().unwrap_or_else(|err| controlflow::logging::error!("{:?}", err));
//! let control_flow = ControlFlow::from_global_config()?;
//! let request = Arc::new(RequestBuilder::new("10.0.0.1").build());
//! match control_flow.admit(request) {
//!     Ok(admission) => {
//!         // serve the request, then release every slot it holds
//!         admission.exit();
//!     }
//!     Err(reject) => {
//!         // answer with `reject.status_code()`
//!     }
//! }
//! ```

/// Initialization and the `ControlFlow` facade.
pub mod api;
/// Blockers, controllers, dispatcher, blacklist, locks and configuration.
pub mod core;
/// Adapters for different logging crates.
pub mod logging;
// Utility functions.
pub mod utils;

// re-export precludes
pub use crate::core::*;
pub use api::*;

pub type Result<T> = anyhow::Result<T>;
pub type Error = anyhow::Error;

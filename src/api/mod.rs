//! mod `api` provides the topmost APIs of the crate. Initialize the global config
//! first, in one of three ways:
//!
//!  1. `init_default()`, using the default config overridden by environment variables.
//!  2. `init_with_config(config_entity: ConfigEntity)`, using a hand-crafted config.
//!  3. `init_with_config_file(config_path: &mut String)`, using a YAML file.
//!
//! then build a `ControlFlow` and hand it every incoming request.

mod control_flow;
mod init;

pub use control_flow::*;
pub use init::*;

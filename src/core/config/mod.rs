mod base;
mod configurator;
pub mod constant;
mod entity;
mod properties;

pub use base::*;
pub use configurator::*;
pub use constant::*;
pub use entity::*;
pub use properties::*;

mod timeout_lock;

pub use timeout_lock::*;

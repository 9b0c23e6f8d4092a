pub mod base;
// admission primitives
pub mod blocker;
// flow controllers and the dispatching chain
pub mod controller;
// gates evaluated before flow control
pub mod blacklist;
pub mod config;
pub mod lock;

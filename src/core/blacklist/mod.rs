//! Turns away requests coming from blacklisted client addresses,
//! before any flow controller gets to see them.

mod filter;

pub use filter::*;

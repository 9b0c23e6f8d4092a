//! Types shared by every blocker and controller: the request being admitted
//! and the error handed back when it is turned away.

pub mod constant;
mod reject_error;
mod request;

pub use constant::*;
pub use reject_error::*;
pub use request::*;

//! Scheduler side of the v1 API: calls a framework sends to the master and
//! events the master streams back.
pub mod call;
pub mod event;

pub use call::{Call, CallKind, CallType};
pub use event::Event;

//! Executor side of the v1 API, spoken between an executor and its agent.
pub mod call;
pub mod event;

pub use call::{Call, CallKind, CallType};
pub use event::Event;

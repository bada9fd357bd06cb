//! Byte source and command sink implementations

pub mod replay;
pub mod serial;

pub use replay::{NullCommandSink, ReplayProvider};
pub use serial::{SerialCommandSink, SerialProvider};

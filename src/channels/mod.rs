//! Channel abstraction for message I/O.

pub mod channel;
pub mod console;

pub use channel::*;
pub use console::ConsoleChannel;

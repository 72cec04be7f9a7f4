//! Command Dispatcher (spec.md §4.4): routes decoded controller commands to
//! the Access Encoder + Mesh PDU Assembler, to the Effect Engine, or to the
//! mesh security context's key setup, and publishes outbound events.
//!
//! Grounded on `ws_server.c`'s `handle_command` dispatch table.

#[path = "commands.rs"]
mod commands;
#[path = "dispatcher.rs"]
mod dispatcher;
#[path = "events.rs"]
mod events;

pub use commands::Command;
pub use dispatcher::Dispatcher;
pub use events::Event;

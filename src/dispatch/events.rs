//! Outbound events published to the external transport (spec.md §6).
//!
//! Grounded on `ws_server.c`'s `ws_server_send_event`/
//! `ws_server_notify_light_status`/`ws_server_notify_error` JSON bodies;
//! the transport owns turning these into wire bytes, the way it owns
//! turning wire bytes into [`super::Command`]s.

use crate::Unicast;

/// An event published to [`crate::Transport::publish`].
#[derive(Clone, Debug, PartialEq)]
pub enum Event {
    /// Published once when the Dispatcher attaches to a transport.
    Ready {
        version: &'static str,
        max_lights: usize,
    },
    /// A fixture's proxy connection state changed.
    LightStatus { unicast: Unicast, connected: bool },
    /// A command could not be completed.
    Error { message: String },
}

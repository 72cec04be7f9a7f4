//! Bluetooth Mesh bridge core for addressable film-lighting fixtures.
//!
//! Translates high-level fixture commands (set colour, start a software
//! lighting effect, put a fixture to sleep) into Bluetooth Mesh proxy PDUs
//! and hands them to a caller-supplied link. Provisioning, key refresh,
//! segmented messages, and inbound decryption are out of scope; see
//! `SPEC_FULL.md` for the full boundary.

#![cfg_attr(not(test), warn(unused_crate_dependencies))]
#![warn(missing_debug_implementations)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]

pub use error::{Error, ErrorKind, Result};

pub mod config;
mod error;

#[path = "access/access.rs"]
pub mod access;
#[path = "dispatch/dispatch.rs"]
pub mod dispatch;
#[path = "effects/effects.rs"]
pub mod effects;
#[path = "mesh/mesh.rs"]
pub mod mesh;

/// Crate version string, published in the `ready` event the way the
/// original firmware hardcodes `"1.0"` into its `ws_server_send_event`
/// bring-up message.
pub const PROTOCOL_VERSION: &str = env!("CARGO_PKG_VERSION");

/// Synchronous mutex alias, matching the teacher's `SyncMutex` alias in its
/// crate root: state that only ever needs a short critical section (here,
/// the mesh security context and the effect instance table) uses
/// `parking_lot` rather than `tokio::sync::Mutex`.
pub(crate) type SyncMutex<T> = parking_lot::Mutex<T>;

/// A fixture's 16-bit Bluetooth Mesh unicast address.
pub type Unicast = u16;

/// External collaborator: delivers a finished proxy PDU to one fixture's
/// GATT Proxy Data-In characteristic. Fire-and-forget from the core's
/// perspective; back-pressure at the radio is this trait's concern, not
/// the core's.
pub trait LinkSink: std::fmt::Debug + Send + Sync {
    /// Returns `true` if a proxy connection currently reaches `unicast`.
    /// The Dispatcher checks this before spending a sequence number, so
    /// that an unreachable fixture never consumes one (spec.md §4.4, §7).
    fn is_ready(&self, unicast: Unicast) -> bool;

    /// Sends `pdu` to the fixture addressed by `unicast`. Fire-and-forget:
    /// back-pressure and delivery failure at the radio are this trait's
    /// concern, not the core's.
    fn send(&self, unicast: Unicast, pdu: &[u8]);
}

/// External collaborator: maps a fixture's unicast address to whatever
/// transport-specific handle the registry holds. The core only ever reads
/// `unicast` back out of it; everything else is opaque.
pub trait FixtureDirectory: std::fmt::Debug + Send + Sync {
    /// Returns `true` if `unicast` names a known fixture.
    fn contains(&self, unicast: Unicast) -> bool;
}

/// External collaborator: publishes dispatcher events to the control
/// channel. Inbound commands reach the core through
/// [`dispatch::Dispatcher`] method calls rather than through a trait here;
/// only the outbound direction is.
pub trait Transport: std::fmt::Debug + Send + Sync {
    /// Publishes an event to the controller.
    fn publish(&self, event: dispatch::Event);
}

//! Per-effect step loops.
//!
//! Each submodule owns the async task body for one family of effects; see
//! `engine::Engine::start` for how a [`crate::effects::EffectKind`] is mapped
//! onto one of these.

#[path = "software.rs"]
pub(super) mod software;
#[path = "faulty_bulb.rs"]
pub(super) mod faulty_bulb;
#[path = "paparazzi.rs"]
pub(super) mod paparazzi;

use std::time::Duration;

use tokio_util::sync::CancellationToken;

/// Sleeps for `secs`, clamped to the firmware's 50 µs minimum arm delay
/// (spec.md §4.3), racing the sleep against cancellation. Returns `false`
/// once cancelled, signalling the caller to stop looping.
pub(super) async fn wait(cancel: &CancellationToken, secs: f64) -> bool {
    let micros = (secs.max(0.0) * 1_000_000.0) as u64;
    let micros = micros.max(50);
    tokio::select! {
        () = tokio::time::sleep(Duration::from_micros(micros)) => true,
        () = cancel.cancelled() => false,
    }
}

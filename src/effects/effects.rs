//! Software lighting effects engine.
//!
//! Ported from the Faulty Bulb, Paparazzi, and generic Software Effect
//! engines of `effect_engine.c`. Each running effect is one `tokio` task
//! looping between a colour output and a `tokio::time::sleep` raced against
//! a [`tokio_util::sync::CancellationToken`], replacing the original's
//! self-rearming one-shot timer with re-entrant `timer_ctx_t` payloads — see
//! `engine` for the instance table and `steps` for the per-effect loop
//! bodies.

#[path = "params.rs"]
mod params;
#[path = "sender.rs"]
mod sender;
#[path = "steps/steps.rs"]
mod steps;
#[path = "instance.rs"]
mod instance;
#[path = "engine.rs"]
mod engine;

pub use engine::Engine;
pub use params::{ColorMode, EffectKind, EffectParams};

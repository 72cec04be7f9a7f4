//! The effect instance table: at most one running effect per `unicast`,
//! capped at the configured number of fixture slots.
//!
//! Grounded on `effect_engine.c`'s `s_instances[MAX_LIGHTS]` pool and its
//! `effect_engine_start`/`_update`/`_stop`/`_stop_all` public API.

use std::collections::HashMap;
use std::sync::atomic::Ordering;
use std::sync::Arc;

use tracing::{info, warn};

use super::instance::EffectHandle;
use super::params::{EffectKind, EffectParams};
use super::sender::Sender;
use crate::mesh::SecurityContext;
use crate::{ErrorKind, LinkSink, Result, SyncMutex, Unicast};

/// Owns every running software effect. One instance lives inside the
/// Dispatcher; instances are exclusively mutable through `start`/`update`/
/// `stop`/`stop_all`, matching spec.md §5's ownership rule.
pub struct Engine {
    max_lights: usize,
    default_ttl: u8,
    security: Arc<SyncMutex<SecurityContext>>,
    link: Arc<dyn LinkSink>,
    instances: SyncMutex<HashMap<Unicast, EffectHandle>>,
}

impl std::fmt::Debug for Engine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Engine")
            .field("max_lights", &self.max_lights)
            .field("running", &self.instances.lock().len())
            .finish_non_exhaustive()
    }
}

impl Engine {
    #[must_use]
    pub fn new(max_lights: usize, default_ttl: u8, security: Arc<SyncMutex<SecurityContext>>, link: Arc<dyn LinkSink>) -> Self {
        Self { max_lights, default_ttl, security, link, instances: SyncMutex::new(HashMap::new()) }
    }

    /// Starts `kind` on `unicast`, replacing and cancelling any effect
    /// already running there (spec.md §4.3 "Start contract").
    ///
    /// # Errors
    /// [`ErrorKind::ResourceExhausted`] if `unicast` is not already running
    /// an effect and the table is already at `max_lights`.
    pub fn start(&self, unicast: Unicast, kind: EffectKind, params: EffectParams) -> Result<()> {
        let mut instances = self.instances.lock();
        let is_replacement = instances.contains_key(&unicast);
        if !is_replacement && instances.len() >= self.max_lights {
            return Err(ErrorKind::ResourceExhausted("no free effect slots").into());
        }
        if let Some(previous) = instances.remove(&unicast) {
            previous.stop();
        }

        let sender = Sender::new(unicast, self.default_ttl, Arc::clone(&self.security), Arc::clone(&self.link));
        let handle = EffectHandle::spawn(unicast, kind, params, sender);
        instances.insert(unicast, handle);
        info!(unicast = %format!("{unicast:#06x}"), %kind, "effect started");
        Ok(())
    }

    /// Replaces the parameter record for the effect running on `unicast`,
    /// preserving its runtime state, and clamps the party colour index into
    /// the new `party_color_count` (spec.md §4.3 "Update contract").
    ///
    /// # Errors
    /// [`ErrorKind::UnknownTarget`] if no effect is running on `unicast`.
    pub fn update(&self, unicast: Unicast, params: EffectParams) -> Result<()> {
        let instances = self.instances.lock();
        let Some(handle) = instances.get(&unicast) else {
            return Err(ErrorKind::UnknownTarget(unicast).into());
        };

        let count = params.party_color_count;
        *handle.params.lock() = params;
        if count > 0 {
            let idx = handle.party_index.load(Ordering::Relaxed);
            if idx >= count {
                handle.party_index.store(0, Ordering::Relaxed);
            }
        }
        Ok(())
    }

    /// Stops the effect running on `unicast`, if any. Returns `true` if one
    /// was found and stopped.
    pub fn stop(&self, unicast: Unicast) -> bool {
        let removed = self.instances.lock().remove(&unicast);
        let found = removed.is_some();
        if let Some(handle) = removed {
            handle.stop();
            info!(unicast = %format!("{unicast:#06x}"), "effect stopped");
        }
        found
    }

    /// Stops every running effect.
    pub fn stop_all(&self) {
        let removed: Vec<_> = self.instances.lock().drain().collect();
        let count = removed.len();
        for (_, handle) in removed {
            handle.stop();
        }
        if count > 0 {
            warn!(count, "all effects stopped");
        }
    }

    /// Returns `true` if an effect is currently running on `unicast`.
    #[must_use]
    pub fn is_running(&self, unicast: Unicast) -> bool {
        self.instances.lock().contains_key(&unicast)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mesh::KeySet;

    #[derive(Debug)]
    struct AlwaysReady;
    impl LinkSink for AlwaysReady {
        fn is_ready(&self, _unicast: Unicast) -> bool {
            true
        }
        fn send(&self, _unicast: Unicast, _pdu: &[u8]) {}
    }

    fn engine(max_lights: usize) -> Engine {
        let mut ctx = SecurityContext::new();
        ctx.init(KeySet { network_key: [1; 16], app_key: [2; 16], iv_index: 1, src_address: 1 });
        Engine::new(max_lights, 7, Arc::new(SyncMutex::new(ctx)), Arc::new(AlwaysReady))
    }

    #[tokio::test]
    async fn starting_replaces_existing_effect_on_same_unicast() {
        let engine = engine(9);
        engine.start(0x0100, EffectKind::Candle, EffectParams::default()).unwrap();
        assert!(engine.is_running(0x0100));
        engine.start(0x0100, EffectKind::Party, EffectParams::default()).unwrap();
        assert!(engine.is_running(0x0100));
        assert_eq!(engine.instances.lock().len(), 1);
    }

    #[tokio::test]
    async fn capacity_is_enforced_per_max_lights() {
        let engine = engine(1);
        engine.start(0x0100, EffectKind::Candle, EffectParams::default()).unwrap();
        let err = engine.start(0x0200, EffectKind::Candle, EffectParams::default()).unwrap_err();
        assert!(matches!(err.kind(), ErrorKind::ResourceExhausted(_)));
    }

    #[tokio::test]
    async fn stop_removes_the_instance() {
        let engine = engine(9);
        engine.start(0x0100, EffectKind::Candle, EffectParams::default()).unwrap();
        assert!(engine.stop(0x0100));
        assert!(!engine.is_running(0x0100));
        assert!(!engine.stop(0x0100));
    }

    #[tokio::test]
    async fn update_on_unknown_unicast_is_an_error() {
        let engine = engine(9);
        let err = engine.update(0x0100, EffectParams::default()).unwrap_err();
        assert!(matches!(err.kind(), ErrorKind::UnknownTarget(0x0100)));
    }

    #[derive(Debug, Default)]
    struct CountingLink {
        sends: std::sync::atomic::AtomicUsize,
    }
    impl CountingLink {
        fn count(&self) -> usize {
            self.sends.load(Ordering::Relaxed)
        }
    }
    impl LinkSink for CountingLink {
        fn is_ready(&self, _unicast: Unicast) -> bool {
            true
        }
        fn send(&self, _unicast: Unicast, _pdu: &[u8]) {
            self.sends.fetch_add(1, Ordering::Relaxed);
        }
    }

    fn engine_with_link(max_lights: usize, link: Arc<CountingLink>) -> Engine {
        let mut ctx = SecurityContext::new();
        ctx.init(KeySet { network_key: [1; 16], app_key: [2; 16], iv_index: 1, src_address: 1 });
        Engine::new(max_lights, 7, Arc::new(SyncMutex::new(ctx)), link as Arc<dyn LinkSink>)
    }

    /// spec.md §8 scenario 3: a strobe emits a zero frame, then flashes at
    /// the configured rate; after `stop_effect` no further emissions occur.
    #[tokio::test(start_paused = true)]
    async fn strobe_lifecycle_stops_emitting_after_stop() {
        let link = Arc::new(CountingLink::default());
        let engine = engine_with_link(9, Arc::clone(&link));

        let params = EffectParams { strobe_hz: 10.0, intensity: 80.0, ..EffectParams::default() };
        engine.start(0x0100, EffectKind::Strobe, params).unwrap();

        tokio::time::advance(std::time::Duration::from_millis(500)).await;
        tokio::task::yield_now().await;
        let running_count = link.count();
        assert!(running_count > 1, "expected multiple flashes by 500ms, got {running_count}");

        engine.stop(0x0100);
        tokio::time::advance(std::time::Duration::from_secs(1)).await;
        tokio::task::yield_now().await;
        assert_eq!(link.count(), running_count, "no emissions should occur after stop");
    }

    /// spec.md §4.3 "Update contract": replacing parameters mid-run clamps
    /// `party_color_index` into the new, smaller colour count.
    #[tokio::test(start_paused = true)]
    async fn update_clamps_party_color_index_into_new_count() {
        let link = Arc::new(CountingLink::default());
        let engine = engine_with_link(9, link);

        let mut params = EffectParams::default();
        params.party_colors = vec![0.0, 60.0, 120.0, 180.0];
        params.party_color_count = 4;
        params.frequency = 8.0;
        engine.start(0x0100, EffectKind::Party, params).unwrap();

        // Let the party loop advance its index a few steps.
        tokio::time::advance(std::time::Duration::from_secs(5)).await;
        tokio::task::yield_now().await;

        let smaller = EffectParams { party_colors: vec![0.0, 180.0], party_color_count: 2, ..EffectParams::default() };
        engine.update(0x0100, smaller).unwrap();

        let instances = engine.instances.lock();
        let handle = instances.get(&0x0100).unwrap();
        assert!(handle.party_index.load(Ordering::Relaxed) < 2);
    }
}

//! A single running effect: the task driving it, and the handles
//! [`super::engine::Engine`] needs to update or stop it from outside.

use std::sync::atomic::AtomicUsize;
use std::sync::Arc;

use tokio_util::sync::{CancellationToken, DropGuard};
use tracing::debug;

use super::params::{EffectKind, EffectParams};
use super::sender::Sender;
use super::steps::{faulty_bulb, paparazzi, software};
use crate::{SyncMutex, Unicast};

/// One running effect instance. Dropping this without calling
/// [`Self::stop`] still cancels its task via the drop guard, mirroring
/// `effect_engine_stop`'s timer teardown as a safety net.
pub(super) struct EffectHandle {
    pub(super) kind: EffectKind,
    pub(super) params: Arc<SyncMutex<EffectParams>>,
    pub(super) party_index: Arc<AtomicUsize>,
    cancel: CancellationToken,
    task: tokio::task::JoinHandle<()>,
    _guard: DropGuard,
}

impl EffectHandle {
    /// Starts the task appropriate for `kind` and returns a handle to it.
    pub(super) fn spawn(unicast: Unicast, kind: EffectKind, params: EffectParams, sender: Sender) -> Self {
        let params = Arc::new(SyncMutex::new(params));
        let party_index = Arc::new(AtomicUsize::new(0));
        let cancel = CancellationToken::new();

        debug!(unicast = %format!("{unicast:#06x}"), %kind, "starting effect");

        let task = match kind {
            EffectKind::FaultyBulb => {
                tokio::spawn(faulty_bulb::run(sender, Arc::clone(&params), cancel.clone()))
            }
            EffectKind::Paparazzi => {
                tokio::spawn(paparazzi::run(sender, Arc::clone(&params), cancel.clone()))
            }
            _ => tokio::spawn(software::run(
                kind,
                unicast,
                sender,
                Arc::clone(&params),
                Arc::clone(&party_index),
                cancel.clone(),
            )),
        };

        Self { kind, params, party_index, cancel: cancel.clone(), task, _guard: cancel.drop_guard() }
    }

    /// Cancels the task. Synchronous, matching spec.md §5's "`stop_effect`
    /// is synchronous": the task observes cancellation and exits on its own
    /// next scheduling, so this doesn't need to await it.
    pub(super) fn stop(self) {
        self.cancel.cancel();
        drop(self.task);
    }
}

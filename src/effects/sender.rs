//! The colour-output path shared by every running effect.
//!
//! Grounded on `effect_engine.c`'s `send_cct`/`send_hsi`/`send_color`/
//! `send_color_hue` helpers, which all funnel into `ble_mesh_send_cct`/`_hsi`
//! against the same global mesh context the Dispatcher's direct commands
//! use.

use std::sync::Arc;

use tracing::{trace, warn};

use super::params::{ColorMode, EffectParams};
use crate::mesh::SecurityContext;
use crate::{LinkSink, SyncMutex, Unicast};

/// Bundles what a running effect task needs to turn an intensity/colour
/// decision into a proxy PDU on the wire, without routing back through the
/// Dispatcher for every frame.
#[derive(Clone)]
pub(super) struct Sender {
    unicast: Unicast,
    ttl: u8,
    security: Arc<SyncMutex<SecurityContext>>,
    link: Arc<dyn LinkSink>,
}

impl Sender {
    pub(super) fn new(unicast: Unicast, ttl: u8, security: Arc<SyncMutex<SecurityContext>>, link: Arc<dyn LinkSink>) -> Self {
        Self { unicast, ttl, security, link }
    }

    /// Sends in the effect's configured colour mode.
    pub(super) fn send_color(&self, params: &EffectParams, intensity: f64, sleep_mode: bool) {
        match params.color_mode {
            ColorMode::Hsi => self.send_hsi(intensity, params.hue, params.saturation, params.hsi_cct, sleep_mode),
            ColorMode::Cct => self.send_cct(intensity, params.cct_kelvin, sleep_mode),
        }
    }

    /// Sends with an explicit hue override (party mode sweeps/steps).
    pub(super) fn send_hue(&self, params: &EffectParams, intensity: f64, hue: i32, sleep_mode: bool) {
        self.send_hsi(intensity, hue, params.saturation, params.hsi_cct, sleep_mode);
    }

    pub(super) fn send_cct(&self, intensity_percent: f64, cct_kelvin: i32, sleep_mode: bool) {
        let payload = crate::access::build_cct(intensity_percent, cct_kelvin, sleep_mode);
        self.send(crate::access::access_message(payload));
    }

    pub(super) fn send_hsi(&self, intensity_percent: f64, hue: i32, saturation: i32, cct_kelvin: i32, sleep_mode: bool) {
        let payload = crate::access::build_hsi(intensity_percent, hue, saturation, cct_kelvin, sleep_mode);
        self.send(crate::access::access_message(payload));
    }

    fn send(&self, access_message: [u8; 11]) {
        if !self.link.is_ready(self.unicast) {
            trace!(unicast = %format!("{:#06x}", self.unicast), "effect output dropped: link not ready");
            return;
        }
        let pdu = {
            let mut ctx = self.security.lock();
            match ctx.build_standard_pdu(self.unicast, &access_message, self.ttl) {
                Ok(pdu) => pdu,
                Err(error) => {
                    warn!(unicast = %format!("{:#06x}", self.unicast), %error, "effect output dropped: pdu build failed");
                    return;
                }
            }
        };
        self.link.send(self.unicast, &pdu);
    }
}

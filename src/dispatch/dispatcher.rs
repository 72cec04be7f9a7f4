//! The Command Dispatcher (spec.md §4.4): the single entry point that owns
//! the mesh security context and the Effect Engine, and routes every
//! decoded command to one of them.
//!
//! Grounded on `ws_server.c`'s `handle_command` match and its
//! `handle_*` bodies, and on `ble_mesh.c`'s `ble_mesh_send_cct`/`_hsi`
//! wrappers (folded here into [`Dispatcher::send_access`] rather than kept
//! as separate functions, since every direct command shares the same
//! send path).

use std::sync::Arc;

use tracing::{instrument, warn};

use super::commands::Command;
use super::events::Event;
use crate::access::{self, EffectCommand};
use crate::effects::{Engine, EffectKind};
use crate::mesh::{KeySet, SecurityContext};
use crate::{config::BridgeConfig, ErrorKind, FixtureDirectory, LinkSink, SyncMutex, Transport, Unicast};

/// Owns the mesh security context and the Effect Engine; routes every
/// decoded [`Command`] to Access Encoder + Mesh PDU assembly, to the Effect
/// Engine, or to key setup, and turns failures into published [`Event`]s
/// rather than returning a `Result` to the caller (spec.md §7: commands are
/// dropped, not propagated).
#[derive(Debug)]
pub struct Dispatcher {
    config: BridgeConfig,
    security: Arc<SyncMutex<SecurityContext>>,
    directory: Arc<dyn FixtureDirectory>,
    link: Arc<dyn LinkSink>,
    transport: Arc<dyn Transport>,
    engine: Engine,
}

impl Dispatcher {
    /// Builds a Dispatcher over the given collaborators. The mesh security
    /// context starts uninitialized; a `set_keys` command must run before
    /// any fixture output can be produced.
    #[must_use]
    pub fn new(
        config: BridgeConfig,
        directory: Arc<dyn FixtureDirectory>,
        link: Arc<dyn LinkSink>,
        transport: Arc<dyn Transport>,
    ) -> Self {
        let security = Arc::new(SyncMutex::new(SecurityContext::new()));
        let engine = Engine::new(config.max_lights, config.default_ttl, Arc::clone(&security), Arc::clone(&link));
        Self { config, security, directory, link, transport, engine }
    }

    /// Publishes the `ready` event, mirroring the original's bring-up
    /// message sent the moment a control-channel client attaches.
    pub fn on_attach(&self) {
        self.transport.publish(Event::Ready {
            version: crate::PROTOCOL_VERSION,
            max_lights: self.config.max_lights,
        });
    }

    /// Notifies the Dispatcher of a link-layer connection state change for
    /// `unicast` (spec.md §5's third entrypoint, "link status callbacks").
    /// A fixture that drops its proxy connection loses any running effect,
    /// the same way an explicit `disconnect` command does.
    pub fn on_link_status(&self, unicast: Unicast, connected: bool) {
        if !connected {
            self.engine.stop(unicast);
        }
        self.transport.publish(Event::LightStatus { unicast, connected });
    }

    /// Routes one decoded command. Never panics and never returns an error
    /// to the caller; failures become a published `error` event (spec.md
    /// §7), except an unknown effect `engine` name, which is only logged.
    #[instrument(skip(self, command), fields(command = command_name(&command)))]
    pub fn dispatch(&self, command: Command) {
        match command {
            Command::SetKeys { network_key, app_key, iv_index, src_address } => {
                self.handle_set_keys(&network_key, &app_key, iv_index, src_address);
            }
            Command::Connect { unicast } => self.handle_connect(unicast),
            Command::Disconnect { unicast } => self.handle_disconnect(unicast),
            Command::SetCct { unicast, intensity, cct_kelvin, sleep_mode } => {
                let payload = access::build_cct(intensity, cct_kelvin, sleep_mode);
                self.send_access(unicast, payload);
            }
            Command::SetHsi { unicast, intensity, hue, saturation, cct_kelvin, sleep_mode } => {
                let payload = access::build_hsi(intensity, hue, saturation, cct_kelvin, sleep_mode);
                self.send_access(unicast, payload);
            }
            Command::Sleep { unicast, on } => {
                let payload = access::build_sleep(on);
                self.send_access(unicast, payload);
            }
            Command::SetEffect {
                unicast,
                effect_type,
                intensity,
                frequency,
                cct_kelvin,
                cop_car_color,
                effect_mode,
                hue,
                saturation,
            } => {
                let cmd = EffectCommand {
                    effect_type: access::EffectType::from_raw_or_off(effect_type),
                    intensity_percent: intensity,
                    frequency,
                    cct_kelvin,
                    cop_car_color,
                    effect_mode,
                    hue,
                    saturation,
                };
                self.send_access(unicast, access::build_effect(&cmd));
            }
            Command::StartEffect { unicast, engine, params } => self.handle_start_effect(unicast, &engine, params),
            Command::UpdateEffect { unicast, params } => self.handle_update_effect(unicast, params),
            Command::StopEffect { unicast } => {
                self.engine.stop(unicast);
            }
            Command::StopAll => self.engine.stop_all(),
        }
    }

    /// The shared send path for every single-shot fixture output (spec.md
    /// §4.4 "Send path"): resolve the fixture, check the link is ready
    /// *before* building a PDU (so an unreachable fixture never consumes a
    /// sequence number), build, send.
    fn send_access(&self, unicast: Unicast, payload: [u8; 10]) {
        if !self.directory.contains(unicast) {
            self.emit_error(ErrorKind::UnknownTarget(unicast).to_string());
            return;
        }
        if !self.link.is_ready(unicast) {
            self.emit_error(ErrorKind::LinkUnready(unicast).to_string());
            return;
        }

        let access_message = access::access_message(payload);
        let pdu = {
            let mut ctx = self.security.lock();
            match ctx.build_standard_pdu(unicast, &access_message, self.config.default_ttl) {
                Ok(pdu) => pdu,
                Err(error) => {
                    self.emit_error(error.to_string());
                    return;
                }
            }
        };
        self.link.send(unicast, &pdu);
    }

    fn handle_set_keys(&self, network_key: &str, app_key: &str, iv_index: u32, src_address: Unicast) {
        let (network_key, app_key) = match (parse_key_hex(network_key), parse_key_hex(app_key)) {
            (Some(n), Some(a)) => (n, a),
            _ => {
                let error: crate::Error = ErrorKind::InvalidArgument(
                    "set_keys: network_key/app_key must each be 32 hex characters".into(),
                )
                .into();
                self.emit_error(error.to_string());
                return;
            }
        };
        self.security.lock().init(KeySet { network_key, app_key, iv_index, src_address });
    }

    fn handle_connect(&self, unicast: Unicast) {
        if !self.directory.contains(unicast) {
            self.emit_error(format!("light not registered: {unicast:#06x}"));
        }
        // Establishing the GATT proxy connection itself is the BLE stack's
        // concern (spec.md §1); the core has nothing further to do here.
    }

    fn handle_disconnect(&self, unicast: Unicast) {
        if !self.directory.contains(unicast) {
            return;
        }
        self.engine.stop(unicast);
        self.transport.publish(Event::LightStatus { unicast, connected: false });
    }

    fn handle_start_effect(&self, unicast: Unicast, engine_name: &str, params: crate::effects::EffectParams) {
        if !self.directory.contains(unicast) {
            self.emit_error(ErrorKind::UnknownTarget(unicast).to_string());
            return;
        }
        let Ok(kind) = engine_name.parse::<EffectKind>() else {
            warn!(engine = engine_name, "unknown effect engine, command dropped");
            return;
        };
        if let Err(error) = self.engine.start(unicast, kind, params) {
            self.emit_error(error.to_string());
        }
    }

    fn handle_update_effect(&self, unicast: Unicast, params: crate::effects::EffectParams) {
        if let Err(error) = self.engine.update(unicast, params) {
            self.emit_error(error.to_string());
        }
    }

    fn emit_error(&self, message: impl Into<String>) {
        let message = message.into();
        warn!(%message, "command dropped");
        self.transport.publish(Event::Error { message });
    }
}

/// 32 hex characters into 16 bytes, or `None` for bad length/characters.
fn parse_key_hex(s: &str) -> Option<[u8; 16]> {
    let bytes = hex::decode(s).ok()?;
    bytes.try_into().ok()
}

fn command_name(command: &Command) -> &'static str {
    match command {
        Command::SetKeys { .. } => "set_keys",
        Command::Connect { .. } => "connect",
        Command::Disconnect { .. } => "disconnect",
        Command::SetCct { .. } => "set_cct",
        Command::SetHsi { .. } => "set_hsi",
        Command::Sleep { .. } => "sleep",
        Command::SetEffect { .. } => "set_effect",
        Command::StartEffect { .. } => "start_effect",
        Command::UpdateEffect { .. } => "update_effect",
        Command::StopEffect { .. } => "stop_effect",
        Command::StopAll => "stop_all",
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Mutex as StdMutex;

    use super::*;
    use crate::effects::EffectParams;

    #[derive(Debug)]
    struct AllRegistered;
    impl FixtureDirectory for AllRegistered {
        fn contains(&self, _unicast: Unicast) -> bool {
            true
        }
    }

    #[derive(Debug)]
    struct NoneRegistered;
    impl FixtureDirectory for NoneRegistered {
        fn contains(&self, _unicast: Unicast) -> bool {
            false
        }
    }

    #[derive(Debug)]
    struct AlwaysReady;
    impl LinkSink for AlwaysReady {
        fn is_ready(&self, _unicast: Unicast) -> bool {
            true
        }
        fn send(&self, _unicast: Unicast, _pdu: &[u8]) {}
    }

    #[derive(Debug)]
    struct NeverReady;
    impl LinkSink for NeverReady {
        fn is_ready(&self, _unicast: Unicast) -> bool {
            false
        }
        fn send(&self, _unicast: Unicast, _pdu: &[u8]) {}
    }

    #[derive(Debug, Default)]
    struct RecordingTransport {
        events: StdMutex<Vec<Event>>,
    }
    impl Transport for RecordingTransport {
        fn publish(&self, event: Event) {
            self.events.lock().unwrap().push(event);
        }
    }

    fn dispatcher(directory: Arc<dyn FixtureDirectory>, link: Arc<dyn LinkSink>) -> (Dispatcher, Arc<RecordingTransport>) {
        let transport = Arc::new(RecordingTransport::default());
        let d = Dispatcher::new(BridgeConfig::default(), directory, link, Arc::clone(&transport) as Arc<dyn Transport>);
        (d, transport)
    }

    #[test]
    fn set_cct_before_set_keys_emits_error_and_never_sends() {
        let (d, transport) = dispatcher(Arc::new(AllRegistered), Arc::new(AlwaysReady));
        d.dispatch(Command::SetCct { unicast: 0x0100, intensity: 50.0, cct_kelvin: 5600, sleep_mode: true });
        let events = transport.events.lock().unwrap();
        assert_eq!(events.len(), 1);
        assert!(matches!(&events[0], Event::Error { .. }));
    }

    #[test]
    fn set_cct_after_set_keys_sends_a_standard_pdu() {
        let (d, transport) = dispatcher(Arc::new(AllRegistered), Arc::new(AlwaysReady));
        d.dispatch(Command::SetKeys {
            network_key: "01".repeat(16),
            app_key: "02".repeat(16),
            iv_index: 1,
            src_address: 0x0001,
        });
        d.dispatch(Command::SetCct { unicast: 0x0100, intensity: 50.0, cct_kelvin: 5600, sleep_mode: true });
        assert!(transport.events.lock().unwrap().is_empty());
    }

    #[test]
    fn unknown_fixture_emits_error() {
        let (d, transport) = dispatcher(Arc::new(NoneRegistered), Arc::new(AlwaysReady));
        d.dispatch(Command::SetKeys {
            network_key: "01".repeat(16),
            app_key: "02".repeat(16),
            iv_index: 1,
            src_address: 0x0001,
        });
        d.dispatch(Command::SetCct { unicast: 0x0100, intensity: 50.0, cct_kelvin: 5600, sleep_mode: true });
        let events = transport.events.lock().unwrap();
        assert_eq!(events.len(), 1);
        assert!(matches!(&events[0], Event::Error { .. }));
    }

    #[test]
    fn link_not_ready_emits_error_and_does_not_advance_sequence() {
        let (d, transport) = dispatcher(Arc::new(AllRegistered), Arc::new(NeverReady));
        d.dispatch(Command::SetKeys {
            network_key: "01".repeat(16),
            app_key: "02".repeat(16),
            iv_index: 1,
            src_address: 0x0001,
        });
        let before = d.security.lock().sequence_number();
        d.dispatch(Command::SetCct { unicast: 0x0100, intensity: 50.0, cct_kelvin: 5600, sleep_mode: true });
        assert_eq!(d.security.lock().sequence_number(), before);
        assert_eq!(transport.events.lock().unwrap().len(), 1);
    }

    #[test]
    fn unknown_engine_is_dropped_without_an_error_event() {
        let (d, transport) = dispatcher(Arc::new(AllRegistered), Arc::new(AlwaysReady));
        d.dispatch(Command::StartEffect { unicast: 0x0100, engine: "not_a_real_engine".into(), params: EffectParams::default() });
        assert!(transport.events.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn disconnect_stops_running_effect_and_publishes_light_status() {
        let (d, transport) = dispatcher(Arc::new(AllRegistered), Arc::new(AlwaysReady));
        d.dispatch(Command::StartEffect { unicast: 0x0100, engine: "candle".into(), params: EffectParams::default() });
        assert!(d.engine.is_running(0x0100));
        d.dispatch(Command::Disconnect { unicast: 0x0100 });
        assert!(!d.engine.is_running(0x0100));
        let events = transport.events.lock().unwrap();
        assert!(matches!(events.last(), Some(Event::LightStatus { unicast: 0x0100, connected: false })));
    }
}

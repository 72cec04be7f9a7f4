//! Decoded controller commands (spec.md §6).
//!
//! Parsing whatever wire format the control-channel transport speaks is out
//! of scope for this crate (spec.md §1); by the time a [`Command`] value
//! exists, field extraction and type coercion have already happened. Only
//! `set_keys`'s hex strings are still carried as text here, parsed by
//! [`super::Dispatcher`] itself, mirroring `ws_server.c`'s
//! `handle_set_keys` converting its JSON string fields immediately before
//! calling `mesh_crypto_init`.
//!
//! `add_light` has no variant here: the fixture registry is an external
//! collaborator (spec.md §1) the core never mutates, so that command is
//! consumed entirely before reaching the Dispatcher.

use crate::access::EffectMode;
use crate::effects::EffectParams;
use crate::Unicast;

/// One decoded inbound command (spec.md §6).
#[derive(Clone, Debug)]
pub enum Command {
    /// Initializes (or re-initializes) the mesh security context.
    SetKeys {
        network_key: String,
        app_key: String,
        iv_index: u32,
        src_address: Unicast,
    },
    /// Requests a proxy connection to `unicast`. The core only validates
    /// that the fixture is known; establishing the GATT link itself is the
    /// BLE stack's concern (spec.md §1).
    Connect { unicast: Unicast },
    /// Tears down a fixture's proxy connection, stopping any running effect
    /// first (spec.md §5 Cancellation).
    Disconnect { unicast: Unicast },
    /// Direct CCT colour command.
    SetCct {
        unicast: Unicast,
        intensity: f64,
        cct_kelvin: i32,
        sleep_mode: bool,
    },
    /// Direct HSI colour command.
    SetHsi {
        unicast: Unicast,
        intensity: f64,
        hue: i32,
        saturation: i32,
        cct_kelvin: i32,
        sleep_mode: bool,
    },
    /// Sleep/wake command.
    Sleep { unicast: Unicast, on: bool },
    /// Direct hardware effect command. `effect_type` is a raw wire value;
    /// an unrecognized one packs as Effect Off rather than failing (spec.md
    /// §4.1, §7).
    SetEffect {
        unicast: Unicast,
        effect_type: u8,
        intensity: f64,
        frequency: i32,
        cct_kelvin: i32,
        cop_car_color: i32,
        effect_mode: EffectMode,
        hue: i32,
        saturation: i32,
    },
    /// Starts a software Effect Engine instance. `engine` names one of the
    /// eleven known engines (spec.md §6); an unrecognized name is dropped
    /// with a warning rather than an `error` event (spec.md §7).
    StartEffect {
        unicast: Unicast,
        engine: String,
        params: EffectParams,
    },
    /// Replaces a running effect's parameter record in place.
    UpdateEffect { unicast: Unicast, params: EffectParams },
    /// Stops the effect running on `unicast`, if any.
    StopEffect { unicast: Unicast },
    /// Stops every running effect.
    StopAll,
}

//! Fixture access-message encoding.
//!
//! Every fixture command boils down to a 10-byte bit-packed payload
//! (wrapped with a fixed `0x26` access opcode to make an 11-byte access
//! message). The packing rule is shared across command families; only the
//! field schedule differs. See [`bitpack::BitWriter`] for the shared rule
//! and `schedules` for the per-command field layouts.

#[path = "bitpack.rs"]
mod bitpack;
#[path = "schedules.rs"]
mod schedules;

pub use schedules::EffectCommand;

use crate::access::bitpack::BitWriter;

/// Access opcode prefixed to every 10-byte payload to form an 11-byte
/// access message.
pub const ACCESS_OPCODE: u8 = 0x26;

/// The direct hardware effect family (`set_effect`). One of 1–11, 13–15;
/// 12 is not a valid effect type and packs as [`EffectType::Off`].
#[derive(Clone, Copy, Debug, Eq, PartialEq, num_enum::IntoPrimitive, num_enum::TryFromPrimitive)]
#[repr(u8)]
pub enum EffectType {
    Paparazzi = 1,
    Lightning = 2,
    Tv = 3,
    Candle = 4,
    Fire = 5,
    Strobe = 6,
    Explosion = 7,
    FaultyBulb = 8,
    Pulsing = 9,
    Welding = 10,
    CopCar = 11,
    Party = 13,
    Fireworks = 14,
    Off = 15,
}

impl EffectType {
    /// Converts a raw wire value, falling back to [`EffectType::Off`] for
    /// anything unrecognized rather than failing the command.
    #[must_use]
    pub fn from_raw_or_off(raw: u8) -> Self {
        Self::try_from_primitive(raw).unwrap_or(Self::Off)
    }
}

/// Fixture colour mode used by the direct hardware effect schedules
/// (`effect_mode` field). Distinct from [`crate::effects::ColorMode`],
/// which governs the software Effect Engine's own output mode.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum EffectMode {
    Cct,
    Hsi,
}

impl EffectMode {
    const fn as_field(self) -> u32 {
        match self {
            Self::Cct => 0,
            Self::Hsi => 1,
        }
    }
}

fn clamp_i32(v: i32, lo: i32, hi: i32) -> i32 {
    v.clamp(lo, hi)
}

/// `intensity = round(intensity_percent * 10)` clamped into `[0, 1000]`.
fn pack_intensity(intensity_percent: f64) -> u32 {
    clamp_i32((intensity_percent * 10.0).round() as i32, 0, 1000) as u32
}

/// CCT-mode field derivation: `cct = kelvin / 10` clamped into `[180,
/// 2000]`, plus the value/high-bit split described in §4.1.
fn pack_cct(cct_kelvin: i32) -> (u32 /* cct_high */, u32 /* cct_value */) {
    let cct = clamp_i32(cct_kelvin / 10, 180, 2000);
    let scaled = cct * 10;
    let cct_high = u32::from(scaled > 10000);
    let cct_value = if scaled > 10000 { scaled - 10000 } else { scaled } / 10;
    (cct_high, cct_value as u32)
}

/// HSI-mode CCT field derivation: operates on `cct = kelvin / 50`.
fn pack_cct_hsi(cct_kelvin: i32) -> (u32 /* cct_high */, u32 /* cct_value */) {
    let cct = cct_kelvin / 50;
    let scaled = cct * 50;
    let cct_high = u32::from(scaled > 10000);
    let value = if scaled > 10000 { scaled - 10000 } else { scaled } / 50;
    (cct_high, value as u32)
}

/// `gm = 100, gm_flag = 0` always in this protocol; the `gm_flag = 1`
/// branch is dead under every caller here but kept for fidelity with the
/// two-branch derivation the fixture firmware implements.
fn pack_gm(gm_flag: bool, gm: i32) -> (u32 /* gm_high */, u32 /* gm_value */) {
    if gm_flag {
        if gm > 100 {
            (1, (gm - 100) as u32)
        } else {
            (0, gm as u32)
        }
    } else {
        (0, (f64::from(gm) / 10.0).round() as u32)
    }
}

const GM: i32 = 100;
const GM_FLAG: bool = false;

/// Builds the CCT command payload (`command_type = 2`).
#[must_use]
pub fn build_cct(intensity_percent: f64, cct_kelvin: i32, sleep_mode: bool) -> [u8; 10] {
    let intensity = pack_intensity(intensity_percent);
    let (cct_high, cct_value) = pack_cct(cct_kelvin);
    let (gm_high, gm_value) = pack_gm(GM_FLAG, GM);

    let mut w = BitWriter::new();
    w.push(0, 8); // reserved
    w.push(u32::from(sleep_mode), 1);
    w.push(0, 20); // reserved
    w.push(0, 12); // reserved
    w.push(0, 1); // auto_patch
    w.push(cct_high, 1);
    w.push(u32::from(GM_FLAG), 1);
    w.push(gm_high, 1);
    w.push(gm_value, 7);
    w.push(cct_value, 10);
    w.push(intensity, 10);
    w.push(2, 7); // command_type
    w.push(1, 1);
    w.finish()
}

/// Builds the HSI command payload (`command_type = 1`).
#[must_use]
pub fn build_hsi(intensity_percent: f64, hue: i32, saturation: i32, cct_kelvin: i32, sleep_mode: bool) -> [u8; 10] {
    let intensity = pack_intensity(intensity_percent);
    let hue = clamp_i32(hue, 0, 360) as u32;
    let saturation = clamp_i32(saturation, 0, 100) as u32;
    let (cct_high, cct_value) = pack_cct_hsi(cct_kelvin);
    let (gm_high, gm_value) = pack_gm(GM_FLAG, GM);

    let mut w = BitWriter::new();
    w.push(0, 8); // reserved
    w.push(u32::from(sleep_mode), 1);
    w.push(0, 18); // reserved
    w.push(0, 1); // auto_patch
    w.push(cct_high, 1);
    w.push(u32::from(GM_FLAG), 1);
    w.push(gm_high, 1);
    w.push(gm_value, 7);
    w.push(cct_value, 8);
    w.push(saturation, 7);
    w.push(hue, 9);
    w.push(intensity, 10);
    w.push(1, 7); // command_type
    w.push(1, 1);
    w.finish()
}

/// Builds the sleep/wake command payload (`command_type = 12`).
#[must_use]
pub fn build_sleep(on: bool) -> [u8; 10] {
    let mut w = BitWriter::new();
    w.push(0, 8); // reserved
    w.push(u32::from(on), 1);
    w.push(0, 20); // reserved
    w.push(0, 12); // reserved
    w.push(0, 1);
    w.push(0, 1);
    w.push(0, 1);
    w.push(0, 1);
    w.push(0, 7);
    w.push(0, 10);
    w.push(0, 10);
    w.push(12, 7); // command_type
    w.push(1, 1);
    w.finish()
}

/// Builds a direct hardware effect command payload (`command_type = 7`
/// family). An unknown `effect_type` should be mapped to
/// [`EffectType::Off`] by the caller (see [`EffectType::from_raw_or_off`]);
/// this function never fails.
#[must_use]
pub fn build_effect(cmd: &EffectCommand) -> [u8; 10] {
    schedules::build_effect(cmd)
}

/// Prefixes the fixed access opcode, turning a 10-byte payload into an
/// 11-byte access message.
#[must_use]
pub fn access_message(payload: [u8; 10]) -> [u8; 11] {
    let mut out = [0u8; 11];
    out[0] = ACCESS_OPCODE;
    out[1..].copy_from_slice(&payload);
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    fn checksum_ok(payload: &[u8; 10]) -> bool {
        let sum: u8 = payload[1..].iter().fold(0u8, |acc, b| acc.wrapping_add(*b));
        payload[0] == sum
    }

    #[test]
    fn cct_checksum_invariant() {
        let p = build_cct(50.0, 5600, true);
        assert!(checksum_ok(&p));
    }

    #[test]
    fn hsi_checksum_invariant() {
        let p = build_hsi(80.0, 120, 50, 4000, false);
        assert!(checksum_ok(&p));
    }

    #[test]
    fn sleep_checksum_invariant() {
        let p = build_sleep(true);
        assert!(checksum_ok(&p));
        // command_type = 12, operaType (trailing const) = 1.
    }

    #[test]
    fn intensity_boundaries_clamp_into_range() {
        assert_eq!(pack_intensity(0.0), 0);
        assert_eq!(pack_intensity(100.0), 1000);
        assert_eq!(pack_intensity(150.0), 1000);
        assert_eq!(pack_intensity(-10.0), 0);
    }

    #[test]
    fn cct_high_bit_at_boundaries() {
        let (high_lo, _) = pack_cct(1800);
        let (high_hi, _) = pack_cct(20000);
        assert_eq!(high_lo, 0);
        assert_eq!(high_hi, 1);
    }

    #[test]
    fn access_message_prefixes_opcode() {
        let payload = build_sleep(false);
        let msg = access_message(payload);
        assert_eq!(msg[0], ACCESS_OPCODE);
        assert_eq!(&msg[1..], &payload);
    }

    #[test]
    fn unknown_effect_type_maps_to_off() {
        assert_eq!(EffectType::from_raw_or_off(12), EffectType::Off);
        assert_eq!(EffectType::from_raw_or_off(99), EffectType::Off);
        assert_eq!(EffectType::from_raw_or_off(1), EffectType::Paparazzi);
    }

    #[test]
    fn repacking_same_inputs_is_deterministic() {
        let a = build_hsi(33.3, 200, 40, 3000, true);
        let b = build_hsi(33.3, 200, 40, 3000, true);
        assert_eq!(a, b);
    }
}

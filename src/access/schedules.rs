//! Per-effect-type field schedules for the direct hardware effect command
//! (`set_effect`). Every schedule totals 80 bits and ends with the same
//! `command_type:7, 1:1` tail; the type code doubles as the discriminant.

use super::{clamp_i32, pack_cct, pack_cct_hsi, pack_gm, pack_intensity, EffectMode, EffectType, GM, GM_FLAG};
use crate::access::bitpack::BitWriter;

/// Parameters for a direct hardware effect command. Unused fields for a
/// given `effect_type` are simply ignored; callers do not need to know
/// which fields a given type consumes.
#[derive(Clone, Copy, Debug)]
pub struct EffectCommand {
    pub effect_type: EffectType,
    pub intensity_percent: f64,
    pub frequency: i32,
    pub cct_kelvin: i32,
    pub cop_car_color: i32,
    pub effect_mode: EffectMode,
    pub hue: i32,
    pub saturation: i32,
}

impl Default for EffectCommand {
    fn default() -> Self {
        Self {
            effect_type: EffectType::Off,
            intensity_percent: 0.0,
            frequency: 8,
            cct_kelvin: 5600,
            cop_car_color: 0,
            effect_mode: EffectMode::Cct,
            hue: 0,
            saturation: 100,
        }
    }
}

const SLEEP_MODE: bool = true;
const SPEED: u32 = 8;
const TRIGGER: u32 = 2;
const MIN_VAL: u32 = 0;
const TYPE_VAL: u32 = 0; // fireworks default pattern

pub(super) fn build_effect(cmd: &EffectCommand) -> [u8; 10] {
    let raw: u8 = cmd.effect_type.into();
    match cmd.effect_type {
        EffectType::Tv | EffectType::Candle | EffectType::Fire => tv_candle_fire(cmd, raw),
        EffectType::Paparazzi => paparazzi(cmd, raw),
        EffectType::Lightning => lightning(cmd, raw),
        EffectType::CopCar => cop_car(cmd, raw),
        EffectType::Party => party(cmd, raw),
        EffectType::Fireworks => fireworks(cmd, raw),
        EffectType::Strobe | EffectType::Explosion => strobe_explosion(cmd, raw),
        EffectType::FaultyBulb | EffectType::Pulsing => faulty_pulsing(cmd, raw),
        EffectType::Welding => welding(cmd, raw),
        EffectType::Off => off(),
    }
}

fn frq(cmd: &EffectCommand) -> u32 {
    clamp_i32(cmd.frequency, 0, 15) as u32
}

fn tail(w: &mut BitWriter, effect_type: u8) {
    w.push(u32::from(effect_type), 8);
    w.push(7, 7);
    w.push(1, 1);
}

/// TV(3) / Candle(4) / Fire(5): raw clamped CCT, not the compute_cct_value
/// split used elsewhere.
fn tv_candle_fire(cmd: &EffectCommand, effect_type: u8) -> [u8; 10] {
    let cct = clamp_i32(cmd.cct_kelvin / 10, 180, 2000) as u32;
    let intensity = pack_intensity(cmd.intensity_percent);

    let mut w = BitWriter::new();
    w.push(0, 8); // reserved
    w.push(u32::from(SLEEP_MODE), 1);
    w.push(0, 20); // reserved
    w.push(0, 11); // reserved
    w.push(cct, 10);
    w.push(frq(cmd), 4);
    w.push(intensity, 10);
    tail(&mut w, effect_type);
    w.finish()
}

fn paparazzi(cmd: &EffectCommand, effect_type: u8) -> [u8; 10] {
    let (cct_high, cct_value) = pack_cct(cmd.cct_kelvin);
    let (gm_high, gm_value) = pack_gm(GM_FLAG, GM);
    let intensity = pack_intensity(cmd.intensity_percent);

    let mut w = BitWriter::new();
    w.push(0, 8); // reserved
    w.push(u32::from(SLEEP_MODE), 1);
    w.push(0, 20); // reserved
    w.push(0, 1);
    w.push(cct_high, 1);
    w.push(u32::from(GM_FLAG), 1);
    w.push(gm_high, 1);
    w.push(gm_value, 7);
    w.push(cct_value, 10);
    w.push(frq(cmd), 4);
    w.push(intensity, 10);
    tail(&mut w, effect_type);
    w.finish()
}

fn lightning(cmd: &EffectCommand, effect_type: u8) -> [u8; 10] {
    let (cct_high, cct_value) = pack_cct(cmd.cct_kelvin);
    let (gm_high, gm_value) = pack_gm(GM_FLAG, GM);
    let intensity = pack_intensity(cmd.intensity_percent);

    let mut w = BitWriter::new();
    w.push(0, 8); // reserved
    w.push(u32::from(SLEEP_MODE), 1);
    w.push(0, 15); // reserved
    w.push(cct_high, 1);
    w.push(u32::from(GM_FLAG), 1);
    w.push(gm_high, 1);
    w.push(SPEED, 4);
    w.push(TRIGGER, 2);
    w.push(gm_value, 7);
    w.push(cct_value, 10);
    w.push(frq(cmd), 4);
    w.push(intensity, 10);
    tail(&mut w, effect_type);
    w.finish()
}

fn cop_car(cmd: &EffectCommand, effect_type: u8) -> [u8; 10] {
    let color = clamp_i32(cmd.cop_car_color, 0, 15) as u32;
    let intensity = pack_intensity(cmd.intensity_percent);

    let mut w = BitWriter::new();
    w.push(0, 8); // reserved
    w.push(u32::from(SLEEP_MODE), 1);
    w.push(0, 20); // reserved
    w.push(0, 17); // reserved
    w.push(color, 4);
    w.push(frq(cmd), 4);
    w.push(intensity, 10);
    tail(&mut w, effect_type);
    w.finish()
}

fn party(cmd: &EffectCommand, effect_type: u8) -> [u8; 10] {
    let saturation = clamp_i32(cmd.saturation, 0, 100) as u32;
    let intensity = pack_intensity(cmd.intensity_percent);

    let mut w = BitWriter::new();
    w.push(0, 8); // reserved
    w.push(u32::from(SLEEP_MODE), 1);
    w.push(0, 20); // reserved
    w.push(0, 14); // reserved
    w.push(saturation, 7);
    w.push(frq(cmd), 4);
    w.push(intensity, 10);
    tail(&mut w, effect_type);
    w.finish()
}

fn fireworks(cmd: &EffectCommand, effect_type: u8) -> [u8; 10] {
    let intensity = pack_intensity(cmd.intensity_percent);

    let mut w = BitWriter::new();
    w.push(0, 8); // reserved
    w.push(u32::from(SLEEP_MODE), 1);
    w.push(0, 20); // reserved
    w.push(0, 13); // reserved
    w.push(TYPE_VAL, 8);
    w.push(frq(cmd), 4);
    w.push(intensity, 10);
    tail(&mut w, effect_type);
    w.finish()
}

/// Strobe(6) / Explosion(7): the only two types whose schedule branches on
/// `effect_mode` (CCT vs HSI).
fn strobe_explosion(cmd: &EffectCommand, effect_type: u8) -> [u8; 10] {
    let intensity = pack_intensity(cmd.intensity_percent);
    let mut w = BitWriter::new();
    w.push(0, 8); // reserved
    w.push(u32::from(SLEEP_MODE), 1);

    match cmd.effect_mode {
        EffectMode::Hsi => {
            let (cct_high, cct_value) = pack_cct_hsi(cmd.cct_kelvin);
            let saturation = clamp_i32(cmd.saturation, 0, 100) as u32;
            let hue = clamp_i32(cmd.hue, 0, 360) as u32;
            let (gm_high, gm_value) = pack_gm(GM_FLAG, GM);
            w.push(0, 1); // reserved
            w.push(cct_high, 1);
            w.push(u32::from(GM_FLAG), 1);
            w.push(gm_high, 1);
            w.push(TRIGGER, 2);
            w.push(gm_value, 7);
            w.push(cct_value, 8);
            w.push(saturation, 7);
            w.push(hue, 9);
        }
        EffectMode::Cct => {
            let (cct_high, cct_value) = pack_cct(cmd.cct_kelvin);
            let (gm_high, gm_value) = pack_gm(GM_FLAG, GM);
            w.push(0, 15); // reserved
            w.push(cct_high, 1);
            w.push(u32::from(GM_FLAG), 1);
            w.push(gm_high, 1);
            w.push(TRIGGER, 2);
            w.push(gm_value, 7);
            w.push(cct_value, 10);
        }
    }

    w.push(intensity, 10);
    w.push(frq(cmd), 4);
    w.push(cmd.effect_mode.as_field(), 4);
    tail(&mut w, effect_type);
    w.finish()
}

fn faulty_pulsing(cmd: &EffectCommand, effect_type: u8) -> [u8; 10] {
    let (cct_high, cct_value) = pack_cct(cmd.cct_kelvin);
    let (gm_high, gm_value) = pack_gm(GM_FLAG, GM);
    let intensity = pack_intensity(cmd.intensity_percent);

    let mut w = BitWriter::new();
    w.push(0, 8); // reserved
    w.push(u32::from(SLEEP_MODE), 1);
    w.push(0, 11); // reserved
    w.push(cct_high, 1);
    w.push(u32::from(GM_FLAG), 1);
    w.push(gm_high, 1);
    w.push(SPEED, 4);
    w.push(TRIGGER, 2);
    w.push(gm_value, 7);
    w.push(cct_value, 10);
    w.push(intensity, 10);
    w.push(frq(cmd), 4);
    w.push(0, 4); // effect_mode: unused by this family
    tail(&mut w, effect_type);
    w.finish()
}

fn welding(cmd: &EffectCommand, effect_type: u8) -> [u8; 10] {
    let (cct_high, cct_value) = pack_cct(cmd.cct_kelvin);
    let (gm_high, gm_value) = pack_gm(GM_FLAG, GM);
    let intensity = pack_intensity(cmd.intensity_percent);

    let mut w = BitWriter::new();
    w.push(0, 8); // reserved
    w.push(u32::from(SLEEP_MODE), 1);
    w.push(0, 8); // reserved
    w.push(cct_high, 1);
    w.push(u32::from(GM_FLAG), 1);
    w.push(gm_high, 1);
    w.push(MIN_VAL, 7);
    w.push(TRIGGER, 2);
    w.push(gm_value, 7);
    w.push(cct_value, 10);
    w.push(intensity, 10);
    w.push(frq(cmd), 4);
    w.push(0, 4); // effect_mode: unused by this family
    tail(&mut w, effect_type);
    w.finish()
}

fn off() -> [u8; 10] {
    let mut w = BitWriter::new();
    w.push(0, 8); // reserved
    w.push(0, 1);
    w.push(0, 20); // reserved
    w.push(0, 20); // reserved
    w.push(0, 15); // reserved
    w.push(15, 8); // effect_type
    w.push(7, 7);
    w.push(1, 1);
    w.finish()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn checksum_ok(payload: &[u8; 10]) -> bool {
        let sum: u8 = payload[1..].iter().fold(0u8, |acc, b| acc.wrapping_add(*b));
        payload[0] == sum
    }

    fn cmd(effect_type: EffectType) -> EffectCommand {
        EffectCommand {
            effect_type,
            intensity_percent: 75.0,
            ..EffectCommand::default()
        }
    }

    #[test]
    fn every_effect_type_checksums() {
        for t in [
            EffectType::Paparazzi,
            EffectType::Lightning,
            EffectType::Tv,
            EffectType::Candle,
            EffectType::Fire,
            EffectType::Strobe,
            EffectType::Explosion,
            EffectType::FaultyBulb,
            EffectType::Pulsing,
            EffectType::Welding,
            EffectType::CopCar,
            EffectType::Party,
            EffectType::Fireworks,
            EffectType::Off,
        ] {
            let payload = build_effect(&cmd(t));
            assert!(checksum_ok(&payload), "checksum failed for {t:?}");
        }
    }

    #[test]
    fn off_always_carries_type_15() {
        let payload = off();
        // effect_type occupies bits 64..71, i.e. the whole of byte 8.
        assert_eq!(payload[8], 15);
        // bits 72..78 carry `7`, bit 79 carries the trailing `1`.
        assert_eq!(payload[9], 0x07 | 0x80);
    }

    #[test]
    fn strobe_mode_changes_payload() {
        let mut cct_mode = cmd(EffectType::Strobe);
        cct_mode.effect_mode = EffectMode::Cct;
        let mut hsi_mode = cmd(EffectType::Strobe);
        hsi_mode.effect_mode = EffectMode::Hsi;
        assert_ne!(build_effect(&cct_mode), build_effect(&hsi_mode));
    }

    #[test]
    fn unknown_raw_effect_type_routes_to_off() {
        let t = EffectType::from_raw_or_off(12);
        let payload = build_effect(&cmd(t));
        assert_eq!(payload, off());
    }
}

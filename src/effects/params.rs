//! Effect parameter record and the `engine` name vocabulary.
//!
//! Grounded on `effect_engine.h`'s `effect_params_t` and
//! `effect_params_from_json`'s documented per-field fallbacks
//! (`SPEC_FULL.md` §11).

/// Colour output mode for a running software effect. Distinct from
/// [`crate::access::EffectMode`], which governs the direct hardware effect
/// family instead.
#[derive(Clone, Copy, Debug, Default, Eq, PartialEq)]
pub enum ColorMode {
    #[default]
    Cct,
    Hsi,
}

/// One of the eleven software effects addressable via `start_effect`.
#[derive(Clone, Copy, Debug, Eq, PartialEq, strum::EnumString, strum::Display)]
#[strum(serialize_all = "snake_case")]
pub enum EffectKind {
    Pulsing,
    Strobe,
    Fire,
    Candle,
    Lightning,
    Tv,
    Party,
    Explosion,
    Welding,
    FaultyBulb,
    Paparazzi,
}

/// Superset of every software effect's tunable parameters. `start_effect`
/// and `update_effect` both take a partial record; missing fields fall back
/// to [`EffectParams::default`], matching `effect_params_from_json`.
#[derive(Clone, Debug)]
pub struct EffectParams {
    pub color_mode: ColorMode,
    pub intensity: f64,
    pub cct_kelvin: i32,
    pub hue: i32,
    pub saturation: i32,
    pub hsi_cct: i32,
    pub frequency: f64,

    // Pulsing
    pub pulsing_min: f64,
    pub pulsing_max: f64,
    pub pulsing_shape: f64,

    // Strobe
    pub strobe_hz: f64,

    // Faulty bulb
    pub faulty_min: f64,
    pub faulty_max: f64,
    pub faulty_bias: f64,
    pub faulty_recovery: f64,
    pub faulty_warmth: f64,
    pub faulty_warmest_cct: i32,
    pub faulty_points: i32,
    pub faulty_transition: f64,
    pub faulty_frequency: f64,

    // Party
    pub party_colors: Vec<f64>,
    pub party_color_count: usize,
    pub party_transition: f64,
    pub party_hue_bias: f64,
}

impl Default for EffectParams {
    fn default() -> Self {
        Self {
            color_mode: ColorMode::Cct,
            intensity: 100.0,
            cct_kelvin: 5600,
            hue: 0,
            saturation: 100,
            hsi_cct: 5600,
            frequency: 8.0,

            pulsing_min: 0.0,
            pulsing_max: 100.0,
            pulsing_shape: 50.0,

            strobe_hz: 4.0,

            faulty_min: 20.0,
            faulty_max: 100.0,
            faulty_bias: 100.0,
            faulty_recovery: 100.0,
            faulty_warmth: 0.0,
            faulty_warmest_cct: 2700,
            faulty_points: 2,
            faulty_transition: 0.0,
            faulty_frequency: 5.0,

            party_colors: vec![0.0, 60.0, 120.0, 180.0, 240.0, 300.0],
            party_color_count: 6,
            party_transition: 0.0,
            party_hue_bias: 0.0,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_matches_documented_fallback_table() {
        let p = EffectParams::default();
        assert_eq!(p.intensity, 100.0);
        assert_eq!(p.cct_kelvin, 5600);
        assert_eq!(p.faulty_warmest_cct, 2700);
        assert_eq!(p.party_color_count, 6);
        assert_eq!(p.party_colors, vec![0.0, 60.0, 120.0, 180.0, 240.0, 300.0]);
    }

    #[test]
    fn engine_name_parses_case_sensitively_to_snake_case() {
        assert_eq!("faulty_bulb".parse::<EffectKind>().unwrap(), EffectKind::FaultyBulb);
        assert_eq!("paparazzi".parse::<EffectKind>().unwrap(), EffectKind::Paparazzi);
        assert!("unknown_engine".parse::<EffectKind>().is_err());
    }
}

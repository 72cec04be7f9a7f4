//! Faulty Bulb: discrete intensity levels with a biased random walk and an
//! optional linear fade between levels.
//!
//! Grounded on `effect_engine.c`'s `faulty_fire`/`faulty_fade`/
//! `faulty_schedule`/`faulty_points`/`faulty_send`.

use std::sync::Arc;

use rand::Rng;
use tokio_util::sync::CancellationToken;

use super::wait;
use crate::effects::params::{ColorMode, EffectParams};
use crate::effects::sender::Sender;
use crate::SyncMutex;

/// Evenly spaced levels between `min` and `max`, at least two unless they
/// coincide (spec.md §8: "`faulty_points = 2` with `min = max` yields a
/// single level; engine never divides by zero").
fn levels(params: &EffectParams) -> Vec<f64> {
    let lo = params.faulty_min.min(params.faulty_max);
    let hi = params.faulty_min.max(params.faulty_max);
    if (lo - hi).abs() < f64::EPSILON {
        return vec![lo];
    }
    let n = params.faulty_points.max(2) as usize;
    (0..n).map(|i| lo + (hi - lo) * i as f64 / (n - 1) as f64).collect()
}

fn pick_lower(lower: &[f64], hi: f64, rng: &mut impl Rng) -> f64 {
    if lower.is_empty() {
        hi
    } else {
        lower[rng.gen_range(0..lower.len())]
    }
}

fn interval(params: &EffectParams, rng: &mut impl Rng) -> f64 {
    if params.faulty_frequency >= 10.0 {
        rng.gen_range(0.08..=2.0)
    } else {
        1.5 * 0.65f64.powf(params.faulty_frequency - 1.0) * rng.gen_range(0.85..=1.15)
    }
}

fn send(sender: &Sender, params: &EffectParams, percent: f64, sleep_mode: bool) {
    let adjusted_cct = if params.faulty_warmth > 0.0 && params.faulty_max > params.faulty_min {
        let dip = ((params.faulty_max - percent) / (params.faulty_max - params.faulty_min)).clamp(0.0, 1.0);
        let shift = dip * (params.faulty_warmth / 100.0);
        let base = match params.color_mode {
            ColorMode::Hsi => params.hsi_cct,
            ColorMode::Cct => params.cct_kelvin,
        };
        (f64::from(base) + f64::from(params.faulty_warmest_cct - base) * shift) as i32
    } else {
        match params.color_mode {
            ColorMode::Hsi => params.hsi_cct,
            ColorMode::Cct => params.cct_kelvin,
        }
    };

    match params.color_mode {
        ColorMode::Hsi => sender.send_hsi(percent, params.hue, params.saturation, adjusted_cct, sleep_mode),
        ColorMode::Cct => sender.send_cct(percent, adjusted_cct, sleep_mode),
    }
}

pub(crate) async fn run(sender: Sender, params: Arc<SyncMutex<EffectParams>>, cancel: CancellationToken) {
    let mut rng = rand::thread_rng();
    let mut current = params.lock().intensity;

    loop {
        let p = params.lock().clone();
        let pts = levels(&p);
        let hi = *pts.last().expect("levels() always returns at least one point");
        let bias = (p.faulty_bias / 100.0).powf(2.5);

        if bias <= 0.0 {
            if (current - hi).abs() > 0.5 {
                current = hi;
                send(&sender, &p, hi, true);
            }
            if !wait(&cancel, interval(&p, &mut rng)).await {
                return;
            }
            continue;
        }

        let on_high = (current - hi).abs() < 0.5;
        let lower: Vec<f64> = pts.iter().copied().filter(|v| *v < hi - 0.5).collect();

        let target = if on_high {
            if rng.gen_range(0.0..1.0) < bias {
                pick_lower(&lower, hi, &mut rng)
            } else {
                if !wait(&cancel, interval(&p, &mut rng)).await {
                    return;
                }
                continue;
            }
        } else {
            let recovery = 0.10 + 0.90 * (p.faulty_recovery / 100.0).powi(2);
            if rng.gen_range(0.0..1.0) < recovery {
                hi
            } else {
                pick_lower(&lower, hi, &mut rng)
            }
        };

        let lo = p.faulty_min.min(p.faulty_max);
        if p.faulty_transition < 0.005 {
            current = target;
            if target <= lo && lo < 1.0 {
                send(&sender, &p, 0.0, false);
            } else {
                send(&sender, &p, target, true);
            }
        } else {
            const DT: f64 = 0.02;
            let mut steps = ((p.faulty_transition / DT) as i32).max(1);
            loop {
                if steps <= 0 {
                    current = target;
                    send(&sender, &p, target, true);
                    break;
                }
                current += (target - current) / f64::from(steps);
                send(&sender, &p, current, true);
                if !wait(&cancel, DT).await {
                    return;
                }
                steps -= 1;
            }
        }

        if !wait(&cancel, interval(&p, &mut rng)).await {
            return;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn levels_collapses_to_one_point_when_min_equals_max() {
        let mut p = EffectParams::default();
        p.faulty_min = 50.0;
        p.faulty_max = 50.0;
        assert_eq!(levels(&p), vec![50.0]);
    }

    #[test]
    fn levels_spans_min_to_max_inclusive() {
        let mut p = EffectParams::default();
        p.faulty_min = 0.0;
        p.faulty_max = 100.0;
        p.faulty_points = 3;
        assert_eq!(levels(&p), vec![0.0, 50.0, 100.0]);
    }
}

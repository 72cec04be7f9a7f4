//! The nine effects that share the original's generic `sw_fire`/`sw_schedule`
//! step-and-reschedule shape (everything except Faulty Bulb and Paparazzi,
//! which keep their own state machines).

use std::f64::consts::PI;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use rand::Rng;
use tokio_util::sync::CancellationToken;

use super::wait;
use crate::effects::params::EffectParams;
use crate::effects::sender::Sender;
use crate::effects::EffectKind;
use crate::{SyncMutex, Unicast};

const TV_LEVELS: [f64; 6] = [0.10, 0.30, 0.50, 0.70, 0.85, 1.00];

/// Dispatches to the step loop for `kind`. Runs until `cancel` fires.
pub(crate) async fn run(
    kind: EffectKind,
    _unicast: Unicast,
    sender: Sender,
    params: Arc<SyncMutex<EffectParams>>,
    party_index: Arc<AtomicUsize>,
    cancel: CancellationToken,
) {
    match kind {
        EffectKind::Candle => candle(&sender, &params, &cancel).await,
        EffectKind::Fire => fire(&sender, &params, &cancel).await,
        EffectKind::Tv => tv_flicker(&sender, &params, &cancel).await,
        EffectKind::Lightning => lightning(&sender, &params, &cancel).await,
        EffectKind::Pulsing => pulsing(&sender, &params, &cancel).await,
        EffectKind::Explosion => explosion(&sender, &params, &cancel).await,
        EffectKind::Strobe => strobe(&sender, &params, &cancel).await,
        EffectKind::Party => party(&sender, &params, &party_index, &cancel).await,
        EffectKind::Welding => welding(&sender, &params, &cancel).await,
        EffectKind::FaultyBulb | EffectKind::Paparazzi => {
            unreachable!("dispatched to the dedicated faulty_bulb/paparazzi tasks instead")
        }
    }
}

async fn candle(sender: &Sender, params: &SyncMutex<EffectParams>, cancel: &CancellationToken) {
    let mut rng = rand::thread_rng();
    loop {
        let p = params.lock().clone();
        let t = p.intensity * rng.gen_range(0.60..=1.0);
        sender.send_color(&p, t, true);
        let delay = 0.15 * 0.85f64.powf(p.frequency) * rng.gen_range(0.7..=1.3);
        if !wait(cancel, delay).await {
            return;
        }
    }
}

async fn fire(sender: &Sender, params: &SyncMutex<EffectParams>, cancel: &CancellationToken) {
    let mut rng = rand::thread_rng();
    loop {
        let p = params.lock().clone();
        let burst = rng.gen_range(0.0..1.0) < 0.15;
        let t = if burst { p.intensity } else { p.intensity * rng.gen_range(0.15..=0.85) };
        sender.send_color(&p, t, true);
        let delay = 0.10 * 0.85f64.powf(p.frequency) * rng.gen_range(0.5..=1.5);
        if !wait(cancel, delay).await {
            return;
        }
    }
}

async fn tv_flicker(sender: &Sender, params: &SyncMutex<EffectParams>, cancel: &CancellationToken) {
    let mut rng = rand::thread_rng();
    loop {
        let p = params.lock().clone();
        let t = p.intensity * TV_LEVELS[rng.gen_range(0..TV_LEVELS.len())];
        sender.send_color(&p, t, true);
        let delay = 0.08 * 0.85f64.powf(p.frequency) * rng.gen_range(0.6..=1.4);
        if !wait(cancel, delay).await {
            return;
        }
    }
}

async fn lightning(sender: &Sender, params: &SyncMutex<EffectParams>, cancel: &CancellationToken) {
    let mut rng = rand::thread_rng();
    loop {
        let p = params.lock().clone();
        sender.send_color(&p, p.intensity, true);
        let flash_dur = rng.gen_range(0.04..=0.12);
        if !wait(cancel, flash_dur).await {
            return;
        }
        let p = params.lock().clone();
        sender.send_color(&p, 0.0, false);
        let background = 3.0 * 0.75f64.powf(p.frequency) * rng.gen_range(0.5..=1.5);
        if !wait(cancel, background).await {
            return;
        }
    }
}

async fn pulsing(sender: &Sender, params: &SyncMutex<EffectParams>, cancel: &CancellationToken) {
    let mut phase_time = 0.0_f64;
    loop {
        let p = params.lock().clone();
        phase_time += 0.03;
        let lo = p.pulsing_min.min(p.pulsing_max);
        let hi = p.pulsing_min.max(p.pulsing_max);
        let period = 4.0 * 0.80f64.powf(p.frequency);
        let sine = ((phase_time * 2.0 * PI / period).sin() + 1.0) / 2.0;
        let shape_norm = (p.pulsing_shape - 50.0) / 50.0;
        let shaped = sine.powf(10f64.powf(-0.8 * shape_norm));
        let t = lo + (hi - lo) * shaped;
        if t < 1.0 {
            sender.send_color(&p, 0.0, false);
        } else {
            sender.send_color(&p, t, true);
        }
        if !wait(cancel, 0.03).await {
            return;
        }
    }
}

async fn explosion(sender: &Sender, params: &SyncMutex<EffectParams>, cancel: &CancellationToken) {
    let mut rng = rand::thread_rng();
    loop {
        let p = params.lock().clone();
        sender.send_color(&p, p.intensity, true);
        let mut intensity = p.intensity;
        loop {
            if !wait(cancel, 0.04).await {
                return;
            }
            let p = params.lock().clone();
            intensity *= 0.88;
            if intensity < 2.0 {
                sender.send_color(&p, 0.0, false);
                let gap = 2.0 * 0.80f64.powf(p.frequency) * rng.gen_range(0.5..=1.5);
                if !wait(cancel, gap).await {
                    return;
                }
                break;
            }
            sender.send_color(&p, intensity, true);
        }
    }
}

async fn strobe(sender: &Sender, params: &SyncMutex<EffectParams>, cancel: &CancellationToken) {
    let entry = params.lock().clone();
    sender.send_color(&entry, 0.0, false);
    if !wait(cancel, 0.05).await {
        return;
    }
    const FLASH: f64 = 0.010;
    loop {
        let p = params.lock().clone();
        let cycle = 1.0 / p.strobe_hz;
        let off = (cycle - FLASH).max(0.01);
        sender.send_color(&p, p.intensity, true);
        if !wait(cancel, FLASH).await {
            return;
        }
        sender.send_color(&p, 0.0, false);
        if !wait(cancel, off).await {
            return;
        }
    }
}

fn biased_hue(hue: f64, bias: f64) -> f64 {
    let h = (hue + bias) % 360.0;
    if h < 0.0 {
        h + 360.0
    } else {
        h
    }
}

async fn party(sender: &Sender, params: &SyncMutex<EffectParams>, party_index: &AtomicUsize, cancel: &CancellationToken) {
    loop {
        let p = params.lock().clone();
        if p.party_color_count == 0 {
            if !wait(cancel, 1.0).await {
                return;
            }
            continue;
        }
        let count = p.party_color_count;
        let idx = party_index.load(Ordering::Relaxed) % count;
        let next_idx = (idx + 1) % count;
        party_index.store(next_idx, Ordering::Relaxed);

        let cur_hue = biased_hue(p.party_colors[idx], p.party_hue_bias);
        sender.send_hue(&p, p.intensity, cur_hue as i32, true);

        let total = 1.5 * 0.80f64.powf(p.frequency);
        if p.party_transition <= 0.0 || count < 2 {
            if !wait(cancel, total).await {
                return;
            }
            continue;
        }

        let next_hue = biased_hue(p.party_colors[next_idx], p.party_hue_bias);
        let tfrac = p.party_transition / 100.0;
        let hold = total * (1.0 - tfrac);
        let sweep = total * tfrac;
        if !wait(cancel, hold).await {
            return;
        }

        if sweep <= 0.03 {
            continue;
        }
        let mut delta = next_hue - cur_hue;
        if delta > 180.0 {
            delta -= 360.0;
        } else if delta < -180.0 {
            delta += 360.0;
        }
        const DT: f64 = 0.03;
        let total_steps = ((sweep / DT) as i32).max(1);
        for step in 1..=total_steps {
            let frac = f64::from(step) / f64::from(total_steps);
            let mut hue = cur_hue + delta * frac;
            if hue < 0.0 {
                hue += 360.0;
            } else if hue >= 360.0 {
                hue -= 360.0;
            }
            let p = params.lock().clone();
            sender.send_hue(&p, p.intensity, hue as i32, true);
            if !wait(cancel, DT).await {
                return;
            }
        }
    }
}

async fn welding(sender: &Sender, params: &SyncMutex<EffectParams>, cancel: &CancellationToken) {
    let mut rng = rand::thread_rng();
    loop {
        let p = params.lock().clone();
        let arcs = rng.gen_range(2..=5);
        for _ in 0..arcs {
            let p = params.lock().clone();
            let arc = p.intensity * rng.gen_range(0.7..=1.0);
            sender.send_color(&p, arc, true);
            if !wait(cancel, rng.gen_range(0.02..=0.08)).await {
                return;
            }
            sender.send_color(&p, 0.0, false);
            if !wait(cancel, rng.gen_range(0.01..=0.04)).await {
                return;
            }
        }
        let pause = 1.5 * 0.80f64.powf(p.frequency) * rng.gen_range(0.3..=1.0);
        if !wait(cancel, pause).await {
            return;
        }
    }
}

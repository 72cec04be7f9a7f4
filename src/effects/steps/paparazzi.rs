//! Paparazzi: a single flash, occasionally followed by a second burst, then
//! a variable gap before the next cycle. Grounded on `effect_engine.c`'s
//! `paparazzi_schedule`/`paparazzi_flash`/`paparazzi_off`/
//! `paparazzi_burst_on`/`paparazzi_burst_off`.

use std::sync::Arc;

use rand::Rng;
use tokio_util::sync::CancellationToken;

use super::wait;
use crate::effects::params::EffectParams;
use crate::effects::sender::Sender;
use crate::SyncMutex;

pub(crate) async fn run(sender: Sender, params: Arc<SyncMutex<EffectParams>>, cancel: CancellationToken) {
    let mut rng = rand::thread_rng();

    loop {
        // Start contract: Paparazzi schedules a gap before its first flash.
        let p = params.lock().clone();
        let gap = 3.0 * 0.75f64.powf(p.frequency) * rng.gen_range(0.5..=1.5);
        if !wait(&cancel, gap).await {
            return;
        }

        let p = params.lock().clone();
        let flash_dur = rng.gen_range(0.03..=0.08);
        sender.send_color(&p, p.intensity.max(10.0), true);
        if !wait(&cancel, flash_dur).await {
            return;
        }
        sender.send_color(&p, 0.0, false);

        if rng.gen_range(0.0..1.0) < 0.3 {
            let burst_delay = rng.gen_range(0.05..=0.15);
            if !wait(&cancel, burst_delay).await {
                return;
            }
            let p = params.lock().clone();
            sender.send_color(&p, p.intensity.max(10.0), true);
            if !wait(&cancel, flash_dur).await {
                return;
            }
            sender.send_color(&p, 0.0, false);
        }
    }
}

//! Async tick driver for hosts running on tokio.
//!
//! The engine stays on the calling task; the driver only supplies the cadence. Each period
//! the `before_tick` hook runs first (a host can feed input or advance a simulated clock
//! there) and then [`SyncEngine::tick`] runs. The loop ends on the shutdown signal or when
//! the hook breaks.

use std::ops::ControlFlow;
use std::time::Duration;

use tokio::sync::oneshot;
use tokio::time::{MissedTickBehavior, interval};
use tracing::{debug, info};

use crate::engine::SyncEngine;
use crate::transport::AudioTransport;

pub async fn run<T, F>(
    engine: &mut SyncEngine<T>,
    mut shutdown: oneshot::Receiver<()>,
    mut before_tick: F,
) -> u64
where
    T: AudioTransport,
    F: FnMut(&mut SyncEngine<T>, Duration) -> ControlFlow<()>,
{
    let period = engine.opts().tick_interval;
    let mut cadence = interval(period);
    cadence.set_missed_tick_behavior(MissedTickBehavior::Skip);

    info!(period_ms = period.as_millis() as u64, "tick driver started");
    let mut ticks = 0u64;
    loop {
        tokio::select! {
            _ = &mut shutdown => {
                debug!("tick driver shutdown requested");
                break;
            }
            _ = cadence.tick() => {
                if before_tick(engine, period).is_break() {
                    break;
                }
                engine.tick();
                ticks += 1;
            }
        }
    }

    engine.flush_autosave();
    info!(ticks, "tick driver stopped");
    ticks
}

use std::future::Future;
use std::time::Duration;

use chrono::Utc;
use tokio::time::MissedTickBehavior;
use tracing::{debug, info};

use crate::state::ReplayState;

/// Wall-clock milliseconds.
pub fn wall_clock_ms() -> f64 {
    Utc::now().timestamp_millis() as f64
}

/// Step `state` once per `interval` until `max_frames` frames ran or
/// `shutdown` resolves. Returns the number of frames run.
pub async fn run<C, S>(
    state: &mut ReplayState,
    interval: Duration,
    max_frames: Option<u64>,
    mut clock: C,
    shutdown: S,
) -> u64
where
    C: FnMut() -> f64,
    S: Future<Output = ()>,
{
    let mut ticker = tokio::time::interval(interval);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);
    tokio::pin!(shutdown);

    let start_frame = state.frame();
    loop {
        if max_frames.is_some_and(|max| state.frame() - start_frame >= max) {
            info!(frames = state.frame() - start_frame, "frame limit reached");
            break;
        }

        tokio::select! {
            biased;
            () = &mut shutdown => break,
            _ = ticker.tick() => {
                let outcome = state.step(clock());
                if let Some(summary) = outcome.placement {
                    info!(
                        frame = outcome.frame,
                        generation = summary.generation,
                        text_placed = summary.stats.text_placed,
                        text_rejected = summary.stats.text_rejected,
                        icon_placed = summary.stats.icon_placed,
                        icon_rejected = summary.stats.icon_rejected,
                        duplicates = summary.stats.duplicates,
                        claims = state.index().claim_count(),
                        "placement pass"
                    );
                }
                if outcome.digest_changed {
                    debug!(
                        frame = outcome.frame,
                        fading = outcome.fading,
                        digest = outcome.digest,
                        "opacity updated"
                    );
                }
            }
        }
    }

    state.frame() - start_frame
}

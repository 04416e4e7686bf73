use std::sync::Arc;

use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio::time::{self, MissedTickBehavior};

use super::controller::TestSession;

/// Handle to a running timer driver.
///
/// Dropping the handle stops the driver at its next wake-up.
#[derive(Debug)]
pub struct TimerHandle {
    stop: watch::Sender<bool>,
    task: JoinHandle<()>,
}

impl TimerHandle {
    /// Ask the driver to stop and wait for it to finish.
    ///
    /// A submission already started by the driver runs to completion first.
    pub async fn stop(self) {
        let _ = self.stop.send(true);
        if let Err(err) = self.task.await {
            tracing::warn!(error = %err, "timer driver task failed");
        }
    }

    #[must_use]
    pub fn is_finished(&self) -> bool {
        self.task.is_finished()
    }
}

/// Poll the session's countdown every `tick_interval` until the session
/// leaves the timed states.
///
/// Ticks that fall behind are skipped rather than bunched; the countdown is
/// recomputed from absolute instants anyway. On the expiry edge the driver
/// awaits the auto-submission outside the `select!`, so stopping the handle
/// never cancels a submission halfway.
#[must_use]
pub fn spawn_timer(session: Arc<TestSession>) -> TimerHandle {
    let (stop, mut stopped) = watch::channel(false);
    let period = session.config().tick_interval;

    let task = tokio::spawn(async move {
        let mut interval = time::interval(period);
        interval.set_missed_tick_behavior(MissedTickBehavior::Skip);
        tracing::debug!(period = ?period, "timer driver started");

        loop {
            tokio::select! {
                changed = stopped.changed() => {
                    if changed.is_err() || *stopped.borrow() {
                        break;
                    }
                    continue;
                }
                _ = interval.tick() => {}
            }

            if !session.state().is_timed() {
                break;
            }
            if let Err(err) = session.on_tick().await {
                tracing::warn!(error = %err, "auto-submit on expiry failed");
            }
        }

        tracing::debug!("timer driver stopped");
    });

    TimerHandle { stop, task }
}

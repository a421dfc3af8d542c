//! Periodic refresh of the sensor state.
//!
//! Runs a tokio task that invokes a tick callback every `interval`. Any fetch
//! (timer driven or not) calls [`PullTimer::reset`], which restarts the
//! countdown so the sensor isn't queried twice in quick succession.

use log::debug;
use parking_lot::Mutex;
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Notify;
use tokio::task::JoinHandle;

pub struct PullTimer {
    interval: Duration,
    reset: Arc<Notify>,
    handle: Mutex<Option<JoinHandle<()>>>,
}

impl PullTimer {
    /// Create a stopped timer.
    pub fn new(interval: Duration) -> Self {
        Self {
            interval,
            reset: Arc::new(Notify::new()),
            handle: Mutex::new(None),
        }
    }

    pub fn interval(&self) -> Duration {
        self.interval
    }

    /// Spawn the timer task.
    ///
    /// `tick` returns `false` to stop the timer (e.g. once its owner is gone).
    /// Starting an already running timer replaces the previous task.
    pub fn start<F, Fut>(&self, mut tick: F)
    where
        F: FnMut() -> Fut + Send + 'static,
        Fut: Future<Output = bool> + Send + 'static,
    {
        let interval = self.interval;
        let reset = self.reset.clone();

        let handle = tokio::spawn(async move {
            loop {
                tokio::select! {
                    _ = tokio::time::sleep(interval) => {
                        if !tick().await {
                            debug!("Pull timer owner dropped, stopping");
                            break;
                        }
                    }
                    _ = reset.notified() => {}
                }
            }
        });

        if let Some(previous) = self.handle.lock().replace(handle) {
            previous.abort();
        }
    }

    /// Restart the countdown from now.
    pub fn reset(&self) {
        self.reset.notify_one();
    }

    pub fn is_running(&self) -> bool {
        self.handle
            .lock()
            .as_ref()
            .is_some_and(|handle| !handle.is_finished())
    }

    pub fn stop(&self) {
        if let Some(handle) = self.handle.lock().take() {
            handle.abort();
        }
    }
}

impl Drop for PullTimer {
    fn drop(&mut self) {
        self.stop();
    }
}

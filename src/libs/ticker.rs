//! Owned recurring tick.
//!
//! A [`Ticker`] runs a callback on a `tokio::time::interval` inside a spawned
//! task. The task is aborted on [`Ticker::cancel`] and when the ticker is
//! dropped, so an interval can never outlive its owner.

use parking_lot::Mutex;
use std::time::Duration;
use tokio::task::JoinHandle;
use tokio::time::{self, MissedTickBehavior};
use tracing::debug;

pub struct Ticker {
    period: Duration,
    handle: Mutex<Option<JoinHandle<()>>>,
}

impl Ticker {
    pub fn new(period: Duration) -> Self {
        Self {
            period,
            handle: Mutex::new(None),
        }
    }

    /// Starts ticking, replacing any previous task. Requires a tokio runtime.
    pub fn start<F>(&self, mut on_tick: F)
    where
        F: FnMut() + Send + 'static,
    {
        let period = self.period;
        let handle = tokio::spawn(async move {
            let mut interval = time::interval(period);
            interval.set_missed_tick_behavior(MissedTickBehavior::Skip);
            // first tick completes immediately
            interval.tick().await;
            loop {
                interval.tick().await;
                on_tick();
            }
        });
        if let Some(previous) = self.handle.lock().replace(handle) {
            previous.abort();
        }
        debug!("ticker started ({} ms)", period.as_millis());
    }

    pub fn cancel(&self) {
        if let Some(handle) = self.handle.lock().take() {
            handle.abort();
            debug!("ticker cancelled");
        }
    }

    pub fn is_running(&self) -> bool {
        self.handle.lock().as_ref().is_some_and(|h| !h.is_finished())
    }
}

impl Drop for Ticker {
    fn drop(&mut self) {
        if let Some(handle) = self.handle.get_mut().take() {
            handle.abort();
        }
    }
}

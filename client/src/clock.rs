//! One-second wait clock shown while matching.

use log::warn;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::runtime::Handle;
use tokio::task::JoinHandle;
use tokio::time::{interval, MissedTickBehavior};

/// Counts whole seconds while running. Stopping (or dropping) the clock
/// always cancels its timer task.
#[derive(Debug, Default)]
pub struct WaitClock {
    seconds: Arc<AtomicU64>,
    task: Option<JoinHandle<()>>,
}

impl WaitClock {
    pub fn new() -> Self {
        Self::default()
    }

    /// Starts counting from zero. No-op if already running.
    pub fn start(&mut self) {
        if self.task.is_some() {
            return;
        }
        let Ok(handle) = Handle::try_current() else {
            warn!("No async runtime; wait clock not started");
            return;
        };

        self.seconds.store(0, Ordering::Relaxed);
        let seconds = Arc::clone(&self.seconds);
        self.task = Some(handle.spawn(async move {
            let mut ticker = interval(Duration::from_secs(1));
            ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);
            // The first tick fires immediately
            ticker.tick().await;
            loop {
                ticker.tick().await;
                seconds.fetch_add(1, Ordering::Relaxed);
            }
        }));
    }

    pub fn stop(&mut self) {
        if let Some(task) = self.task.take() {
            task.abort();
        }
        self.seconds.store(0, Ordering::Relaxed);
    }

    pub fn is_running(&self) -> bool {
        self.task.is_some()
    }

    pub fn seconds(&self) -> u64 {
        self.seconds.load(Ordering::Relaxed)
    }
}

impl Drop for WaitClock {
    fn drop(&mut self) {
        if let Some(task) = self.task.take() {
            task.abort();
        }
    }
}

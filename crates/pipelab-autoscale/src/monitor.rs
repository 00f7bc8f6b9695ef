//! Monitor driver — periodic tick source for the load controller.
//!
//! Owns the controller behind a mutex shared with a tokio tick task.
//! `start` spawns the task, `stop` signals a watch channel and awaits
//! the task's handle, so once `stop` returns no further tick runs and
//! no listener fires. Commands and snapshots go through the same mutex
//! that serializes ticks; the lock is never held across an await and
//! listeners are invoked after it is released.

use std::sync::{Arc, Mutex};
use std::time::Duration;

use thiserror::Error;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tracing::info;

use pipelab_state::LoadState;

use crate::controller::LoadController;

/// Callback invoked with a copy of the state produced by each tick.
pub type ChangeListener = Box<dyn Fn(LoadState) + Send + Sync>;

/// Errors from driver lifecycle misuse.
#[derive(Debug, Error)]
pub enum MonitorError {
    /// `start` was called while the tick task is already running. The
    /// existing timer keeps its cadence; call `stop` first.
    #[error("monitor driver is already running")]
    AlreadyRunning,
}

/// Handle to the running tick task.
struct TickTask {
    shutdown: watch::Sender<bool>,
    handle: JoinHandle<()>,
}

/// Drives a [`LoadController`] on a fixed cadence and fans post-tick
/// snapshots out to registered listeners.
pub struct MonitorDriver {
    controller: Arc<Mutex<LoadController>>,
    listeners: Arc<Mutex<Vec<ChangeListener>>>,
    task: Option<TickTask>,
}

impl MonitorDriver {
    /// Driver over a fresh controller with default jitter.
    pub fn new() -> Self {
        Self::with_controller(LoadController::new())
    }

    /// Driver over a caller-built controller (custom jitter source).
    pub fn with_controller(controller: LoadController) -> Self {
        Self {
            controller: Arc::new(Mutex::new(controller)),
            listeners: Arc::new(Mutex::new(Vec::new())),
            task: None,
        }
    }

    /// Register a listener for post-tick state copies.
    ///
    /// Listeners observe state strictly after the tick that produced
    /// it; they never see a partial update. Registration is allowed
    /// while the driver is running. The listener list is locked during
    /// fan-out, so a listener must not call `on_change` itself.
    pub fn on_change(&self, listener: ChangeListener) {
        self.listeners.lock().unwrap().push(listener);
    }

    /// Begin ticking at `interval`.
    ///
    /// Rejected with [`MonitorError::AlreadyRunning`] if a tick task is
    /// active; the running timer is left untouched.
    pub fn start(&mut self, interval: Duration) -> Result<(), MonitorError> {
        if self.task.is_some() {
            return Err(MonitorError::AlreadyRunning);
        }

        let (shutdown_tx, mut shutdown_rx) = watch::channel(false);
        let controller = Arc::clone(&self.controller);
        let listeners = Arc::clone(&self.listeners);

        let handle = tokio::spawn(async move {
            info!(interval_ms = interval.as_millis() as u64, "monitor driver started");

            loop {
                tokio::select! {
                    _ = tokio::time::sleep(interval) => {
                        let snapshot = {
                            let mut controller = controller.lock().unwrap();
                            controller.tick();
                            controller.snapshot()
                        };
                        let listeners = listeners.lock().unwrap();
                        for listener in listeners.iter() {
                            listener(snapshot);
                        }
                    }
                    _ = shutdown_rx.changed() => {
                        info!("monitor driver shutting down");
                        break;
                    }
                }
            }
        });

        self.task = Some(TickTask {
            shutdown: shutdown_tx,
            handle,
        });
        Ok(())
    }

    /// Stop the tick task and wait for it to exit.
    ///
    /// Idempotent; calling without a running task is a no-op. After
    /// this returns, state is no longer mutated and listeners receive
    /// nothing further.
    pub async fn stop(&mut self) {
        if let Some(task) = self.task.take() {
            let _ = task.shutdown.send(true);
            let _ = task.handle.await;
        }
    }

    /// Whether the tick task is currently running.
    pub fn is_running(&self) -> bool {
        self.task.is_some()
    }

    /// Flip the spike flag on the underlying controller.
    pub fn toggle_load_spike(&self) {
        self.controller.lock().unwrap().toggle_load_spike();
    }

    /// Restore the controller to its initial state.
    pub fn reset(&self) {
        self.controller.lock().unwrap().reset();
    }

    /// Copy of the current state.
    pub fn snapshot(&self) -> LoadState {
        self.controller.lock().unwrap().snapshot()
    }
}

impl Default for MonitorDriver {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::controller::JitterSource;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use tokio::sync::mpsc;

    struct FixedJitter(f64);

    impl JitterSource for FixedJitter {
        fn next_delta(&mut self) -> f64 {
            self.0
        }
    }

    fn quiet_driver() -> MonitorDriver {
        MonitorDriver::with_controller(LoadController::with_jitter(Box::new(FixedJitter(0.0))))
    }

    #[tokio::test]
    async fn ticks_notify_listeners_with_post_tick_state() {
        let mut driver = quiet_driver();
        let (tx, mut rx) = mpsc::unbounded_channel();
        driver.on_change(Box::new(move |state| {
            let _ = tx.send(state);
        }));

        driver.start(Duration::from_millis(10)).unwrap();
        tokio::time::sleep(Duration::from_millis(80)).await;
        driver.stop().await;

        let mut received = Vec::new();
        while let Ok(state) = rx.try_recv() {
            received.push(state);
        }
        assert!(!received.is_empty());
        for state in &received {
            assert!(state.in_bounds());
            // Zero jitter and no spike: load never moves.
            assert_eq!(state.load, LoadState::INITIAL_LOAD);
        }
    }

    #[tokio::test]
    async fn stop_halts_ticks_and_notifications() {
        let mut driver = quiet_driver();
        let count = Arc::new(AtomicUsize::new(0));
        let count_in = Arc::clone(&count);
        driver.on_change(Box::new(move |_| {
            count_in.fetch_add(1, Ordering::SeqCst);
        }));

        driver.start(Duration::from_millis(10)).unwrap();
        tokio::time::sleep(Duration::from_millis(50)).await;
        driver.stop().await;

        let at_stop = count.load(Ordering::SeqCst);
        let frozen = driver.snapshot();
        tokio::time::sleep(Duration::from_millis(50)).await;

        assert_eq!(count.load(Ordering::SeqCst), at_stop);
        assert_eq!(driver.snapshot(), frozen);
    }

    #[tokio::test]
    async fn second_start_is_rejected() {
        let mut driver = quiet_driver();
        driver.start(Duration::from_millis(10)).unwrap();
        assert!(matches!(
            driver.start(Duration::from_millis(10)),
            Err(MonitorError::AlreadyRunning)
        ));
        driver.stop().await;
    }

    #[tokio::test]
    async fn stop_is_idempotent() {
        let mut driver = quiet_driver();
        // Never started: no-op.
        driver.stop().await;

        driver.start(Duration::from_millis(10)).unwrap();
        driver.stop().await;
        driver.stop().await;
        assert!(!driver.is_running());

        // Restart after stop works.
        driver.start(Duration::from_millis(10)).unwrap();
        assert!(driver.is_running());
        driver.stop().await;
    }

    #[tokio::test]
    async fn commands_reach_the_controller() {
        let driver = quiet_driver();

        driver.toggle_load_spike();
        assert!(driver.snapshot().spike_active);
        driver.toggle_load_spike();
        assert!(!driver.snapshot().spike_active);

        driver.reset();
        assert_eq!(driver.snapshot(), LoadState::initial());
    }

    #[tokio::test]
    async fn spike_scales_up_while_running() {
        let mut driver = quiet_driver();
        driver.toggle_load_spike();

        driver.start(Duration::from_millis(5)).unwrap();
        // Enough ticks for the load to climb past the threshold and
        // replicas to follow.
        tokio::time::sleep(Duration::from_millis(120)).await;
        driver.stop().await;

        let state = driver.snapshot();
        assert_eq!(state.load, LoadState::LOAD_MAX);
        assert!(state.replicas > LoadState::REPLICAS_MIN);
        assert!(state.in_bounds());
    }
}

//! Periodic background workers
//!
//! Plain named threads driven by a condvar-interruptible sleep, so a
//! store close wakes them immediately instead of waiting out the period.

use parking_lot::{Condvar, Mutex};
use std::sync::Arc;
use std::thread::JoinHandle;
use std::time::Duration;

/// Cooperative shutdown signal shared by the workers.
pub(crate) struct Shutdown {
    stop: Mutex<bool>,
    cond: Condvar,
}

impl Shutdown {
    pub(crate) fn new() -> Self {
        Self {
            stop: Mutex::new(false),
            cond: Condvar::new(),
        }
    }

    /// Sleep for `period` or until shutdown. Returns true when shutting down.
    pub(crate) fn sleep(&self, period: Duration) -> bool {
        let mut stop = self.stop.lock();
        if *stop {
            return true;
        }
        self.cond.wait_for(&mut stop, period);
        *stop
    }

    pub(crate) fn signal(&self) {
        let mut stop = self.stop.lock();
        *stop = true;
        self.cond.notify_all();
    }
}

/// Spawn a named worker thread running `task` every `period` until shutdown.
pub(crate) fn spawn_periodic(
    name: &str,
    period: Duration,
    shutdown: Arc<Shutdown>,
    mut task: impl FnMut() + Send + 'static,
) -> JoinHandle<()> {
    std::thread::Builder::new()
        .name(name.to_string())
        .spawn(move || loop {
            if shutdown.sleep(period) {
                break;
            }
            task();
        })
        .expect("failed to spawn background worker thread")
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Instant;

    #[test]
    fn signal_wakes_sleeper_early() {
        let shutdown = Arc::new(Shutdown::new());
        let signal = Arc::clone(&shutdown);

        let start = Instant::now();
        let handle = std::thread::spawn(move || shutdown.sleep(Duration::from_secs(30)));
        std::thread::sleep(Duration::from_millis(50));
        signal.signal();

        assert!(handle.join().unwrap());
        assert!(start.elapsed() < Duration::from_secs(5));
    }

    #[test]
    fn periodic_task_runs_then_stops() {
        let shutdown = Arc::new(Shutdown::new());
        let ticks = Arc::new(AtomicUsize::new(0));

        let counted = Arc::clone(&ticks);
        let handle = spawn_periodic(
            "hearth-test-worker",
            Duration::from_millis(10),
            Arc::clone(&shutdown),
            move || {
                counted.fetch_add(1, Ordering::SeqCst);
            },
        );

        std::thread::sleep(Duration::from_millis(100));
        shutdown.signal();
        handle.join().unwrap();

        let after_stop = ticks.load(Ordering::SeqCst);
        assert!(after_stop > 0);
        std::thread::sleep(Duration::from_millis(50));
        assert_eq!(ticks.load(Ordering::SeqCst), after_stop);
    }
}

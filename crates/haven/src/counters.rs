//! Activity counters.
//!
//! Cheap atomic accumulators for the handful of operations worth tracking,
//! flushed and zeroed on a fixed interval by a background task.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use tokio::task::JoinHandle;
use tracing::info;

/// Operation counters, shared across the gateway.
#[derive(Debug, Default)]
pub struct Counters {
    connect: AtomicU64,
    newuser: AtomicU64,
    read: AtomicU64,
    write: AtomicU64,
    set_mode: AtomicU64,
}

/// One flushed window of counter values.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CounterWindow {
    pub connect: u64,
    pub newuser: u64,
    pub read: u64,
    pub write: u64,
    pub set_mode: u64,
}

impl CounterWindow {
    pub fn is_empty(&self) -> bool {
        self.connect == 0
            && self.newuser == 0
            && self.read == 0
            && self.write == 0
            && self.set_mode == 0
    }
}

impl Counters {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn incr_connect(&self) {
        self.connect.fetch_add(1, Ordering::Relaxed);
    }

    pub fn incr_newuser(&self) {
        self.newuser.fetch_add(1, Ordering::Relaxed);
    }

    pub fn incr_read(&self) {
        self.read.fetch_add(1, Ordering::Relaxed);
    }

    pub fn incr_write(&self) {
        self.write.fetch_add(1, Ordering::Relaxed);
    }

    pub fn incr_set_mode(&self) {
        self.set_mode.fetch_add(1, Ordering::Relaxed);
    }

    /// Take the current window, zeroing all counters.
    pub fn drain(&self) -> CounterWindow {
        CounterWindow {
            connect: self.connect.swap(0, Ordering::Relaxed),
            newuser: self.newuser.swap(0, Ordering::Relaxed),
            read: self.read.swap(0, Ordering::Relaxed),
            write: self.write.swap(0, Ordering::Relaxed),
            set_mode: self.set_mode.swap(0, Ordering::Relaxed),
        }
    }

    /// Spawn a task that drains and logs the counters every `interval`.
    ///
    /// Quiet windows are skipped. Abort the returned handle to stop.
    pub fn start_flush(self: &Arc<Self>, interval: Duration) -> JoinHandle<()> {
        let counters = Arc::clone(self);
        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(interval);
            ticker.tick().await;
            loop {
                ticker.tick().await;
                let window = counters.drain();
                if !window.is_empty() {
                    info!(
                        connect = window.connect,
                        newuser = window.newuser,
                        read = window.read,
                        write = window.write,
                        set_mode = window.set_mode,
                        "activity"
                    );
                }
            }
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_drain_resets() {
        let counters = Counters::default();
        counters.incr_connect();
        counters.incr_connect();
        counters.incr_write();

        let window = counters.drain();
        assert_eq!(window.connect, 2);
        assert_eq!(window.write, 1);
        assert_eq!(window.read, 0);

        assert!(counters.drain().is_empty());
    }

    #[tokio::test]
    async fn test_flush_task_stops_on_abort() {
        let counters = Counters::new();
        let handle = counters.start_flush(Duration::from_millis(5));
        counters.incr_read();
        tokio::time::sleep(Duration::from_millis(20)).await;
        handle.abort();
        assert!(handle.await.unwrap_err().is_cancelled());
    }
}

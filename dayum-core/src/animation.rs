//! Frame loop lifecycle for canvas effects.
//!
//! A [`FrameLoop`] drives a per-frame callback on a fixed interval until the callback
//! asks to stop, [`FrameLoop::stop`] is called, or the loop is dropped. After any of
//! those no further frame is requested. What the callback draws is its own business.

use std::ops::ControlFlow;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio::time::{Instant, MissedTickBehavior};
use tracing::debug;

/// Roughly 60 frames per second.
pub const DEFAULT_FRAME_INTERVAL: Duration = Duration::from_millis(16);

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FrameTick {
    /// Zero-based frame counter.
    pub frame: u64,
    /// Time since the loop started.
    pub elapsed: Duration,
    /// Time since the previous frame (zero for the first one).
    pub delta: Duration,
}

#[derive(Debug)]
pub struct FrameLoop {
    stop_tx: watch::Sender<bool>,
    handle: Option<JoinHandle<()>>,
    frames: Arc<AtomicU64>,
}

impl FrameLoop {
    /// Starts the loop on the current tokio runtime.
    pub fn spawn<F>(interval: Duration, mut on_frame: F) -> Self
    where
        F: FnMut(FrameTick) -> ControlFlow<()> + Send + 'static,
    {
        let (stop_tx, mut stop_rx) = watch::channel(false);
        let frames = Arc::new(AtomicU64::new(0));
        let counter = frames.clone();

        let handle = tokio::spawn(async move {
            let mut ticker = tokio::time::interval(interval);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);
            let started = Instant::now();
            let mut last = started;
            loop {
                tokio::select! {
                    biased;
                    _ = stop_rx.changed() => break,
                    now = ticker.tick() => {
                        if *stop_rx.borrow() {
                            break;
                        }
                        let tick = FrameTick {
                            frame: counter.load(Ordering::SeqCst),
                            elapsed: now.duration_since(started),
                            delta: now.duration_since(last),
                        };
                        last = now;
                        counter.fetch_add(1, Ordering::SeqCst);
                        if on_frame(tick).is_break() {
                            break;
                        }
                    }
                }
            }
            debug!(frames = counter.load(Ordering::SeqCst), "[FRAME] Loop finished");
        });

        Self {
            stop_tx,
            handle: Some(handle),
            frames,
        }
    }

    pub fn frames(&self) -> u64 {
        self.frames.load(Ordering::SeqCst)
    }

    pub fn is_finished(&self) -> bool {
        self.handle.as_ref().map_or(true, JoinHandle::is_finished)
    }

    /// Stops the loop and waits for the in-flight frame, if any, to complete.
    pub async fn stop(mut self) {
        let _ = self.stop_tx.send(true);
        if let Some(handle) = self.handle.take() {
            let _ = handle.await;
        }
    }
}

impl Drop for FrameLoop {
    fn drop(&mut self) {
        let _ = self.stop_tx.send(true);
        if let Some(handle) = self.handle.take() {
            handle.abort();
        }
    }
}

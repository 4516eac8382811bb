//! Progress ticker: polls the playing slot's position on a fixed interval.
//!
//! The progress bar only needs coarse updates, so this is a plain polling
//! thread rather than a player callback. The thread exits on its own once the
//! slot stops playing (checked every tick), so it never reads a released
//! player. Stopping the ticker wakes it immediately.

// The pager that drives playback only exists in `mpv` builds.
#![cfg_attr(not(feature = "mpv"), allow(dead_code))]

use std::sync::mpsc::{self, RecvTimeoutError};
use std::sync::{Arc, Mutex};
use std::thread::{self, JoinHandle};
use std::time::Duration;

use tracing::debug;

use crate::player::{Decoder, PlayerPool, PlayerState, Progress};

pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_millis(500);

/// Handle to a running ticker. Drop to stop.
pub struct ProgressTicker {
    stop_tx: Option<mpsc::Sender<()>>,
    thread: Option<JoinHandle<()>>,
}

impl ProgressTicker {
    /// Start sampling `index`. Samples arrive on the returned receiver; it
    /// disconnects when the ticker exits.
    pub fn start<D: Decoder + 'static>(
        pool: Arc<Mutex<PlayerPool<D>>>,
        index: usize,
        interval: Duration,
    ) -> (Self, mpsc::Receiver<Progress>) {
        let (tx, rx) = mpsc::channel();
        let (stop_tx, stop_rx) = mpsc::channel::<()>();

        let thread = thread::Builder::new()
            .name(format!("progress-{}", index))
            .spawn(move || run(pool, index, interval, tx, stop_rx))
            .expect("failed to spawn progress thread");

        (
            ProgressTicker {
                stop_tx: Some(stop_tx),
                thread: Some(thread),
            },
            rx,
        )
    }

    pub fn is_running(&self) -> bool {
        self.thread.as_ref().is_some_and(|t| !t.is_finished())
    }

    pub fn stop(&mut self) {
        // Dropping the sender disconnects the stop channel and wakes the thread.
        self.stop_tx.take();
        if let Some(t) = self.thread.take() {
            t.join().ok();
        }
    }
}

impl Drop for ProgressTicker {
    fn drop(&mut self) {
        self.stop();
    }
}

fn run<D: Decoder>(
    pool: Arc<Mutex<PlayerPool<D>>>,
    index: usize,
    interval: Duration,
    tx: mpsc::Sender<Progress>,
    stop_rx: mpsc::Receiver<()>,
) {
    loop {
        {
            let Ok(mut pool) = pool.lock() else { break };
            if pool.state(index) != Some(PlayerState::Playing) {
                break;
            }
            if let Some(p) = pool.progress(index) {
                if tx.send(p).is_err() {
                    break;
                }
            }
        }

        match stop_rx.recv_timeout(interval) {
            Err(RecvTimeoutError::Timeout) => continue,
            Ok(()) | Err(RecvTimeoutError::Disconnected) => break,
        }
    }
    debug!("progress: ticker for {} stopped", index);
}

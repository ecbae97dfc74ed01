// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 proxim contributors

//! Timers that post expiry as ordinary discovery events.
//!
//! Timers never mutate shared state themselves: expiry is a message into
//! the same serialized inbox every other producer uses. Cancellation is
//! synchronous (flag + join) and a cancelled timer posts nothing, so a
//! timeout racing a `stop()` resolves to a no-op.

use crate::events::{DiscoveryEvent, EventSink};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

/// Sleep granularity; bounds how long cancellation can lag.
const CANCEL_POLL: Duration = Duration::from_millis(50);

/// Fires one event after a delay unless cancelled first.
pub struct OneShotTimer {
    cancelled: Arc<AtomicBool>,
    handle: Option<JoinHandle<()>>,
}

impl OneShotTimer {
    /// Spawn the timer thread. `name` labels the thread for diagnostics.
    pub fn schedule(name: &str, delay: Duration, sink: EventSink, event: DiscoveryEvent) -> Self {
        let cancelled = Arc::new(AtomicBool::new(false));
        let flag = Arc::clone(&cancelled);

        let handle = thread::Builder::new()
            .name(format!("proxim-timer-{}", name))
            .spawn(move || {
                let deadline = Instant::now() + delay;
                while Instant::now() < deadline {
                    if flag.load(Ordering::Relaxed) {
                        return;
                    }
                    thread::sleep(CANCEL_POLL.min(deadline.saturating_duration_since(Instant::now())));
                }
                if !flag.load(Ordering::Relaxed) {
                    sink.post(event);
                }
            })
            .ok();

        if handle.is_none() {
            log::error!("[timer] Failed to spawn one-shot timer thread");
        }

        Self {
            cancelled,
            handle,
        }
    }

    /// Cancel and wait for the thread to exit. Firing after this returns is
    /// impossible.
    pub fn cancel(mut self) {
        self.cancel_inner();
    }

    fn cancel_inner(&mut self) {
        self.cancelled.store(true, Ordering::Relaxed);
        if let Some(handle) = self.handle.take() {
            let _ = handle.join();
        }
    }
}

impl Drop for OneShotTimer {
    fn drop(&mut self) {
        self.cancel_inner();
    }
}

/// Fires a cloned event on every tick until stopped.
pub struct PeriodicTimer {
    stop_flag: Arc<AtomicBool>,
    handle: Option<JoinHandle<()>>,
}

impl PeriodicTimer {
    pub fn start(name: &str, interval: Duration, sink: EventSink, event: DiscoveryEvent) -> Self {
        let stop_flag = Arc::new(AtomicBool::new(false));
        let flag = Arc::clone(&stop_flag);

        let handle = thread::Builder::new()
            .name(format!("proxim-tick-{}", name))
            .spawn(move || {
                loop {
                    let deadline = Instant::now() + interval;
                    while Instant::now() < deadline {
                        if flag.load(Ordering::Relaxed) {
                            return;
                        }
                        thread::sleep(
                            CANCEL_POLL.min(deadline.saturating_duration_since(Instant::now())),
                        );
                    }
                    if flag.load(Ordering::Relaxed) {
                        return;
                    }
                    sink.post(event.clone());
                }
            })
            .ok();

        if handle.is_none() {
            log::error!("[timer] Failed to spawn periodic timer thread");
        }

        Self { stop_flag, handle }
    }

    pub fn stop(mut self) {
        self.stop_inner();
    }

    fn stop_inner(&mut self) {
        self.stop_flag.store(true, Ordering::Relaxed);
        if let Some(handle) = self.handle.take() {
            let _ = handle.join();
        }
    }
}

impl Drop for PeriodicTimer {
    fn drop(&mut self) {
        self.stop_inner();
    }
}

// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 proxim contributors

//! Classic device enumeration wrapper.
//!
//! Used only during address-resolution assist, to physically observe a
//! nearby device's hardware address. One event is delivered per discovered
//! device through the embedder's sink.
//!
//! Mutual exclusion constraint: the beacon scan role must be paused before
//! enumeration starts, since running both concurrently corrupts the radio driver
//! state on reference hardware. The orchestrator enforces that ordering;
//! this wrapper only refuses to run twice.

use crate::events::{DiscoveryEvent, EventSink};
use crate::orchestrator::timer::OneShotTimer;
use crate::transport::DeviceScanner;
use std::sync::Arc;
use std::time::Duration;

pub struct DeviceEnumerator {
    scanner: Arc<dyn DeviceScanner>,
    sink: EventSink,
    timeout_timer: Option<OneShotTimer>,
    running: bool,
}

impl DeviceEnumerator {
    pub fn new(scanner: Arc<dyn DeviceScanner>, sink: EventSink) -> Self {
        Self {
            scanner,
            sink,
            timeout_timer: None,
            running: false,
        }
    }

    pub fn is_running(&self) -> bool {
        self.running
    }

    /// Begin one bounded enumeration pass. Already-running counts as
    /// started.
    pub fn start(&mut self, timeout: Duration) -> bool {
        if self.running {
            return true;
        }
        if !self.scanner.enumerate_devices() {
            log::error!("[enumerator] Device enumeration failed to start");
            return false;
        }
        self.timeout_timer = Some(OneShotTimer::schedule(
            "enumeration",
            timeout,
            self.sink.clone(),
            DiscoveryEvent::EnumerationTimeout,
        ));
        self.running = true;
        log::debug!("[enumerator] Started ({:?} bound)", timeout);
        true
    }

    /// Abort the pass and cancel its bound. Safe to call when idle.
    pub fn stop(&mut self) {
        if let Some(timer) = self.timeout_timer.take() {
            timer.cancel();
        }
        if self.running {
            self.scanner.stop();
            self.running = false;
            log::debug!("[enumerator] Stopped");
        }
    }
}

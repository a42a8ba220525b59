//! Intrusion detection
//!
//! Consumes distance samples from the range sensor and writes
//! `Intruder`/`Default` transitions into the shared lock state through
//! a two-threshold hysteresis: a near object raises the alert unless
//! the lock is open, and only a far sample clears it again. The
//! sampling loop runs on a dedicated OS thread so the blocking echo
//! measurement never touches the async runtime.

use std::time::Duration;

use tokio::sync::watch;
use tracing::{debug, info, warn};

use warden_core::{LockStatus, SharedLockState};

use crate::sensor::{RangeSensor, SensorError};

/// Applies intrusion hysteresis to a stream of distance samples
pub struct IntrusionMonitor {
    state: SharedLockState,
    near_threshold: f64,
    /// Whether the last sample we acted on was a near one; used to log
    /// transitions once instead of every 100ms.
    alerting: bool,
}

impl IntrusionMonitor {
    pub fn new(state: SharedLockState, near_threshold: f64) -> Self {
        Self {
            state,
            near_threshold,
            alerting: false,
        }
    }

    /// Feed one distance sample through the hysteresis.
    ///
    /// - near and not `Unlocked`: raise `Intruder`
    /// - far and currently `Intruder`: fall back to `Default`
    /// - otherwise no transition
    pub fn observe(&mut self, distance: f64) {
        if distance < self.near_threshold {
            match self.state.transition_unless(LockStatus::Unlocked, LockStatus::Intruder) {
                Some(previous) => {
                    if !self.alerting {
                        info!(distance, from = %previous, "intruder detected");
                    }
                    self.alerting = true;
                }
                None => {
                    // Lock is open; an approach is not an intrusion.
                    self.alerting = false;
                }
            }
        } else {
            if self.state.transition_from(LockStatus::Intruder, LockStatus::Default)
                && self.alerting
            {
                info!(distance, "intrusion cleared");
            }
            self.alerting = false;
        }
    }

    /// Run the sampling loop until shutdown is signalled.
    ///
    /// Blocking by design; spawn on its own thread. A timed-out or
    /// faulted measurement skips the cycle and retries on the next one.
    pub fn run_blocking<S: RangeSensor>(
        mut self,
        mut sensor: S,
        period: Duration,
        shutdown: watch::Receiver<bool>,
    ) {
        info!(threshold = self.near_threshold, "starting sensor loop");
        loop {
            if *shutdown.borrow() {
                break;
            }
            match sensor.measure() {
                Ok(distance) => {
                    debug!(distance, "range sample");
                    self.observe(distance);
                }
                Err(SensorError::Timeout) => {
                    warn!("sensor echo timed out, skipping sample");
                }
                Err(SensorError::Fault(reason)) => {
                    warn!(%reason, "sensor fault, skipping sample");
                }
            }
            std::thread::sleep(period);
        }
        info!("sensor loop stopped");
    }
}

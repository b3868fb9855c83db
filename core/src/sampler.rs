//! RSSI sampling schedule
//!
//! Pure bookkeeping for the periodic RSSI refresh: whether sampling is
//! enabled (interval > 0) and whether it is currently resumed. The
//! session owns the actual timer and rebuilds it whenever this schedule
//! reports a change, so a paused sampler never accumulates missed ticks.

use crate::config::DEFAULT_RSSI_INTERVAL;
use std::time::Duration;

/// Tick schedule for the RSSI refresh loop.
///
/// Starts paused; the session resumes it on entering Ready and pauses it
/// on leaving Ready (including for the duration of a transfer).
#[derive(Debug, Clone)]
pub struct RssiSampler {
    interval: Duration,
    paused: bool,
}

impl RssiSampler {
    /// Create a schedule with the given interval, initially paused.
    /// A zero interval disables sampling entirely.
    pub fn new(interval: Duration) -> Self {
        Self {
            interval,
            paused: true,
        }
    }

    /// Current refresh interval
    pub fn interval(&self) -> Duration {
        self.interval
    }

    /// Whether sampling is enabled at all (interval > 0)
    pub fn enabled(&self) -> bool {
        !self.interval.is_zero()
    }

    /// Whether ticks should fire right now
    pub fn active(&self) -> bool {
        self.enabled() && !self.paused
    }

    /// Suspend ticks without touching the interval
    pub fn pause(&mut self) {
        self.paused = true;
    }

    /// Resume ticks; the caller restarts its timer from "now"
    pub fn resume(&mut self) {
        self.paused = false;
    }

    /// Change the interval. Returns true when the caller must rebuild its
    /// timer; the new cadence applies immediately and never retroactively.
    pub fn set_interval(&mut self, interval: Duration) -> bool {
        if self.interval == interval {
            return false;
        }
        self.interval = interval;
        true
    }
}

impl Default for RssiSampler {
    fn default() -> Self {
        Self::new(DEFAULT_RSSI_INTERVAL)
    }
}

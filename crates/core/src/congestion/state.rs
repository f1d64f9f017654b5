//! Controller state snapshot.
//!
//! A flow's congestion state is a plain `Copy` value. Controllers never mutate
//! it in place: every transition takes the current snapshot and returns the
//! next one, which keeps runs replayable and lets tests drive controllers
//! through arbitrary event sequences.

use serde::{Deserialize, Serialize};

use crate::simulation::SimulationTime;

/// Window size every controller starts from.
pub const INITIAL_WINDOW: u64 = 1;

/// Slow start threshold Tahoe and Reno start from.
pub const DEFAULT_INITIAL_THRESHOLD: u64 = 16;

/// Bandwidth estimate BBR starts from, in packets per time unit.
pub const DEFAULT_INITIAL_BANDWIDTH_ESTIMATE: f64 = 20.0;

/// Congestion state of one flow after some number of ticks.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ControllerState {
    /// Packets the flow may send on the next tick.
    pub window_size: u64,
    /// Slow start threshold (Tahoe and Reno).
    pub threshold: u64,
    /// Running maximum of window over average delay (BBR).
    pub bandwidth_estimate: f64,
    /// Cumulative packets put on the wire.
    pub packets_sent: u64,
    /// Number of loss events.
    pub packets_lost: u64,
    /// Cumulative post-ack window sizes.
    pub acknowledged_packets: u64,
    /// Sum of the elapsed step over all ticks.
    pub total_delay: f64,
    /// Number of delay samples accumulated in `total_delay`.
    pub num_delays: u64,
    /// Time of the most recent loss, if any.
    pub last_loss_time: Option<SimulationTime>,
    /// Sum of the intervals between consecutive losses.
    pub recovery_time_total: f64,
    /// Number of intervals accumulated in `recovery_time_total`.
    pub recovery_samples: u64,
}

impl ControllerState {
    pub fn new(threshold: u64, bandwidth_estimate: f64) -> Self {
        Self {
            window_size: INITIAL_WINDOW,
            threshold,
            bandwidth_estimate,
            packets_sent: 0,
            packets_lost: 0,
            acknowledged_packets: 0,
            total_delay: 0.0,
            num_delays: 0,
            last_loss_time: None,
            recovery_time_total: 0.0,
            recovery_samples: 0,
        }
    }

    /// Books one tick worth of sending: the elapsed step becomes a delay
    /// sample and the whole current window goes on the wire.
    pub fn on_send(self, step: f64) -> Self {
        Self {
            total_delay: self.total_delay + step,
            num_delays: self.num_delays + 1,
            packets_sent: self.packets_sent + self.window_size,
            ..self
        }
    }

    /// Mean delay per tick, `None` before the first send.
    pub fn average_delay(&self) -> Option<f64> {
        (self.num_delays > 0).then(|| self.total_delay / self.num_delays as f64)
    }

    /// Mean interval between consecutive losses, `None` with fewer than two losses.
    pub fn average_recovery_time(&self) -> Option<f64> {
        (self.recovery_samples > 0)
            .then(|| self.recovery_time_total / self.recovery_samples as f64)
    }

    /// Whether the window is below the slow start threshold.
    pub fn in_slow_start(&self) -> bool {
        self.window_size < self.threshold
    }

    /// Slow start / congestion avoidance growth shared by Tahoe and Reno.
    ///
    /// Doubles the window below the threshold, adds one at or above it, clamps
    /// to `max_window` and credits the resulting window as acknowledged.
    pub(crate) fn grow_window(self, max_window: u64) -> Self {
        let grown = if self.in_slow_start() {
            self.window_size.saturating_mul(2)
        } else {
            self.window_size.saturating_add(1)
        };
        self.with_acked_window(grown, max_window)
    }

    /// Sets the window to `window` clamped into `[1, max_window]` and credits it
    /// as acknowledged.
    pub(crate) fn with_acked_window(self, window: u64, max_window: u64) -> Self {
        let window_size = window.clamp(INITIAL_WINDOW, max_window.max(INITIAL_WINDOW));
        Self {
            window_size,
            acknowledged_packets: self.acknowledged_packets + window_size,
            ..self
        }
    }

    /// Counts a loss event.
    pub(crate) fn count_loss(self) -> Self {
        Self {
            packets_lost: self.packets_lost + 1,
            ..self
        }
    }

    /// Records the interval since the previous loss, then remembers `now`.
    pub(crate) fn record_recovery(self, now: SimulationTime) -> Self {
        match self.last_loss_time {
            Some(previous) => Self {
                recovery_time_total: self.recovery_time_total + now.since(previous),
                recovery_samples: self.recovery_samples + 1,
                last_loss_time: Some(now),
                ..self
            },
            None => Self {
                last_loss_time: Some(now),
                ..self
            },
        }
    }

    /// Halved window used as the new threshold after a loss, never below 1.
    pub(crate) fn halved_window(&self) -> u64 {
        (self.window_size / 2).max(1)
    }
}

impl Default for ControllerState {
    fn default() -> Self {
        Self::new(DEFAULT_INITIAL_THRESHOLD, DEFAULT_INITIAL_BANDWIDTH_ESTIMATE)
    }
}

//! Recorded timeline of a flow.

use serde::{Deserialize, Serialize};

use crate::simulation::SimulationTime;

/// One per-tick observation.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Sample {
    pub time: SimulationTime,
    /// Window used for the tick's send.
    pub window_size: u64,
    /// Cumulative packets sent, including this tick.
    pub sent_cumulative: u64,
}

/// Append-only per-tick samples plus the times at which losses occurred.
///
/// Insertion order is the timeline; nothing is ever reordered or removed.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TimeSeries {
    samples: Vec<Sample>,
    losses: Vec<SimulationTime>,
}

impl TimeSeries {
    pub fn with_capacity(ticks: usize) -> Self {
        Self {
            samples: Vec::with_capacity(ticks),
            losses: Vec::new(),
        }
    }

    pub(crate) fn push_sample(&mut self, sample: Sample) {
        debug_assert!(
            self.samples.last().is_none_or(|last| last.time < sample.time),
            "samples must be appended in time order"
        );
        self.samples.push(sample);
    }

    pub(crate) fn push_loss(&mut self, time: SimulationTime) {
        self.losses.push(time);
    }

    pub fn samples(&self) -> &[Sample] {
        &self.samples
    }

    /// Times of the loss events, in order.
    pub fn losses(&self) -> &[SimulationTime] {
        &self.losses
    }

    pub fn len(&self) -> usize {
        self.samples.len()
    }

    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }

    pub fn loss_count(&self) -> usize {
        self.losses.len()
    }

    pub fn last_time(&self) -> Option<SimulationTime> {
        self.samples.last().map(|s| s.time)
    }

    /// `(time, window_size)` pairs.
    pub fn windows(&self) -> impl Iterator<Item = (SimulationTime, u64)> + '_ {
        self.samples.iter().map(|s| (s.time, s.window_size))
    }

    /// Average packets sent per time unit up to each sample.
    pub fn average_send_rate(&self) -> Vec<(SimulationTime, f64)> {
        self.samples
            .iter()
            .map(|s| (s.time, per_time(s.sent_cumulative as f64, s.time)))
            .collect()
    }

    /// Throughput curve of a finished run: the final acknowledged count divided
    /// by each sample time.
    pub fn throughput_over_time(&self, acknowledged: u64) -> Vec<(SimulationTime, f64)> {
        self.samples
            .iter()
            .map(|s| (s.time, per_time(acknowledged as f64, s.time)))
            .collect()
    }

    /// Cumulative loss count at each sample time.
    pub fn cumulative_losses(&self) -> Vec<(SimulationTime, usize)> {
        let mut seen = 0;
        self.samples
            .iter()
            .map(|s| {
                while seen < self.losses.len() && self.losses[seen] <= s.time {
                    seen += 1;
                }
                (s.time, seen)
            })
            .collect()
    }
}

fn per_time(value: f64, time: SimulationTime) -> f64 {
    if time.is_zero() {
        0.0
    } else {
        value / time.as_secs()
    }
}

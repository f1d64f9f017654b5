//! A single simulated sender and the loop that drives it.
//!
//! A [`Flow`] is the validated, immutable description of one run: data rate,
//! controller parameters, loss policy and termination. [`Flow::runner`] turns
//! it into a [`FlowRunner`] which owns the clock, the controller, the current
//! [`ControllerState`] and the recorded [`TimeSeries`].
//!
//! Each tick is processed in a fixed order:
//!
//! 1. the send is booked (delay sample, window added to `packets_sent`)
//! 2. a sample is appended to the series
//! 3. the loss policy is queried with the tick and the cumulative send count
//! 4. exactly one of `on_packet_loss` / `on_ack` produces the next state
//!
//! The run ends when the clock reaches the horizon or, if configured, once the
//! loss bound has been reached. The bound is checked before drawing a tick.

use serde::Serialize;

use crate::config::ConfigError;
use crate::congestion::{
    CongestionControl, CongestionControlAlgorithm, CongestionControlConfig, CongestionController,
    ControllerState,
};
use crate::metrics::{MetricsCollector, MetricsRecord};
use crate::simulation::{Clock, LossPolicy, SimulationTime, Termination, Tick};

mod series;

pub use series::{Sample, TimeSeries};

/// Validated configuration of one simulated flow.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Flow {
    data_rate: f64,
    controller: CongestionControlConfig,
    loss: LossPolicy,
    termination: Termination,
}

impl Flow {
    pub fn new(
        data_rate: f64,
        controller: CongestionControlConfig,
        loss: LossPolicy,
        termination: Termination,
    ) -> Result<Self, ConfigError> {
        Clock::validate(data_rate, termination.horizon)?;
        controller.validate()?;
        loss.validate()?;
        termination.validate()?;
        Ok(Self {
            data_rate,
            controller,
            loss,
            termination,
        })
    }

    pub fn data_rate(&self) -> f64 {
        self.data_rate
    }

    pub fn algorithm(&self) -> CongestionControlAlgorithm {
        self.controller.algorithm
    }

    pub fn controller(&self) -> &CongestionControlConfig {
        &self.controller
    }

    pub fn loss_policy(&self) -> &LossPolicy {
        &self.loss
    }

    pub fn termination(&self) -> &Termination {
        &self.termination
    }

    /// Creates a fresh runner. Every call starts from the initial state.
    pub fn runner(&self) -> Result<FlowRunner, ConfigError> {
        FlowRunner::new(self)
    }

    /// Runs the flow to completion.
    pub fn run(&self) -> Result<FlowReport, ConfigError> {
        Ok(self.runner()?.run_to_completion())
    }
}

/// What happened on one processed tick.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TickEvent {
    pub tick: Tick,
    /// Window used for this tick's send.
    pub window_sent: u64,
    pub lost: bool,
    /// State after the controller callback.
    pub state: ControllerState,
}

/// Samples reserved up front; longer runs grow the series as they go.
const MAX_PREALLOCATED_TICKS: usize = 1 << 16;

/// Drives one flow tick by tick.
#[derive(Debug)]
pub struct FlowRunner {
    controller: CongestionController,
    clock: Clock,
    loss: LossPolicy,
    termination: Termination,
    state: ControllerState,
    series: TimeSeries,
}

impl FlowRunner {
    fn new(flow: &Flow) -> Result<Self, ConfigError> {
        let controller = flow.controller.build()?;
        let clock = Clock::new(flow.data_rate, flow.termination.horizon)?;
        let expected_ticks = (flow.termination.horizon * flow.data_rate).ceil() as usize;
        let capacity = expected_ticks.min(MAX_PREALLOCATED_TICKS);
        Ok(Self {
            state: controller.initial_state(),
            controller,
            clock,
            loss: flow.loss,
            termination: flow.termination,
            series: TimeSeries::with_capacity(capacity),
        })
    }

    pub fn algorithm(&self) -> CongestionControlAlgorithm {
        self.controller.algorithm()
    }

    pub fn state(&self) -> &ControllerState {
        &self.state
    }

    pub fn series(&self) -> &TimeSeries {
        &self.series
    }

    pub fn now(&self) -> SimulationTime {
        self.clock.now()
    }

    /// Whether the run stopped because the loss bound was reached.
    pub fn loss_bound_reached(&self) -> bool {
        self.termination
            .loss_bound_reached(self.series.loss_count() as u64)
    }

    /// Processes the next tick, or returns `None` once the run is over.
    pub fn step(&mut self) -> Option<TickEvent> {
        if self.loss_bound_reached() {
            return None;
        }
        let tick = self.clock.next()?;
        let algorithm = self.controller.algorithm();

        let window_sent = self.state.window_size;
        let sent = self.state.on_send(tick.step);
        self.series.push_sample(Sample {
            time: tick.time,
            window_size: window_sent,
            sent_cumulative: sent.packets_sent,
        });
        tracing::debug!(
            variant = %algorithm,
            time = %tick.time,
            window = window_sent,
            "sent {window_sent} packets"
        );

        let lost = self.loss.is_loss(&tick, sent.packets_sent);
        self.state = if lost {
            self.series.push_loss(tick.time);
            tracing::debug!(variant = %algorithm, time = %tick.time, "experienced packet loss");
            self.controller.on_packet_loss(sent, tick.time)
        } else {
            self.controller.on_ack(sent)
        };

        Some(TickEvent {
            tick,
            window_sent,
            lost,
            state: self.state,
        })
    }

    /// Processes every remaining tick and returns the finished run.
    pub fn run_to_completion(mut self) -> FlowReport {
        while self.step().is_some() {}
        let report = self.finish();
        tracing::info!(
            variant = %report.algorithm,
            ticks = report.series.len(),
            sent = report.state.packets_sent,
            lost = report.state.packets_lost,
            acked = report.state.acknowledged_packets,
            "Flow finished"
        );
        report
    }

    /// Stops the run where it is.
    ///
    /// The final time is always the horizon: a run that stops early on its
    /// loss bound still spans the whole simulated interval.
    pub fn finish(self) -> FlowReport {
        FlowReport {
            algorithm: self.controller.algorithm(),
            max_window_size: self.controller.max_window_size(),
            final_time: self.clock.horizon(),
            state: self.state,
            series: self.series,
        }
    }
}

impl Iterator for FlowRunner {
    type Item = TickEvent;

    fn next(&mut self) -> Option<TickEvent> {
        self.step()
    }
}

/// Final counters and the recorded timeline of a finished run.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FlowReport {
    pub algorithm: CongestionControlAlgorithm,
    pub max_window_size: u64,
    /// Simulated time at which the run ended.
    pub final_time: SimulationTime,
    pub state: ControllerState,
    pub series: TimeSeries,
}

impl FlowReport {
    pub fn metrics(&self) -> MetricsRecord {
        MetricsCollector::collect(self)
    }

    pub fn average_send_rate(&self) -> Vec<(SimulationTime, f64)> {
        self.series.average_send_rate()
    }

    pub fn throughput_over_time(&self) -> Vec<(SimulationTime, f64)> {
        self.series
            .throughput_over_time(self.state.acknowledged_packets)
    }
}

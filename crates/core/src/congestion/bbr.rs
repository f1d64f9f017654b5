//! Bandwidth-estimation controller (simplified BBR).
//!
//! The window follows a running maximum of `window / average_delay`, where the
//! average delay is the mean tick step seen so far. Loss is counted but never
//! shapes the window.
//!
//! Because the estimate only ever takes the maximum with its previous value,
//! the window of this model never shrinks once it has risen. That is a
//! property of this simplification, not of BBR in general.

use serde::{Deserialize, Serialize};

use super::state::{ControllerState, DEFAULT_INITIAL_BANDWIDTH_ESTIMATE, DEFAULT_INITIAL_THRESHOLD};
use super::{CongestionControl, CongestionControlAlgorithm, DEFAULT_MAX_WINDOW};
use crate::config::ConfigError;
use crate::simulation::SimulationTime;

/// Configuration for the bandwidth-estimation controller.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BbrConfig {
    /// Upper clamp for the window.
    pub max_window_size: u64,
    /// Estimate the running maximum starts from (packets per time unit).
    pub initial_bandwidth_estimate: f64,
}

impl Default for BbrConfig {
    fn default() -> Self {
        Self {
            max_window_size: DEFAULT_MAX_WINDOW,
            initial_bandwidth_estimate: DEFAULT_INITIAL_BANDWIDTH_ESTIMATE,
        }
    }
}

impl BbrConfig {
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.max_window_size == 0 {
            return Err(ConfigError::ZeroMaxWindow);
        }
        let estimate = self.initial_bandwidth_estimate;
        if !estimate.is_finite() || estimate < 0.0 {
            return Err(ConfigError::InvalidBandwidthEstimate(estimate));
        }
        Ok(())
    }
}

/// Simplified BBR controller.
#[derive(Debug, Clone)]
pub struct BbrController {
    config: BbrConfig,
}

impl BbrController {
    pub fn new(config: BbrConfig) -> Self {
        Self { config }
    }

    /// Bandwidth sample for `state`: window over average delay, with the
    /// average taken as 1 before any delay was recorded.
    pub fn bandwidth_sample(state: &ControllerState) -> f64 {
        let average_delay = state.average_delay().unwrap_or(1.0);
        state.window_size as f64 / average_delay
    }
}

impl CongestionControl for BbrController {
    fn initial_state(&self) -> ControllerState {
        // threshold is unused by this controller
        ControllerState::new(DEFAULT_INITIAL_THRESHOLD, self.config.initial_bandwidth_estimate)
    }

    fn on_ack(&self, state: ControllerState) -> ControllerState {
        let bandwidth_estimate = state.bandwidth_estimate.max(Self::bandwidth_sample(&state));
        let window = (bandwidth_estimate.floor() as u64).min(self.config.max_window_size);
        ControllerState {
            bandwidth_estimate,
            ..state
        }
        .with_acked_window(window, self.config.max_window_size)
    }

    fn on_packet_loss(&self, state: ControllerState, _now: SimulationTime) -> ControllerState {
        state.count_loss()
    }

    fn max_window_size(&self) -> u64 {
        self.config.max_window_size
    }

    fn algorithm(&self) -> CongestionControlAlgorithm {
        CongestionControlAlgorithm::Bbr
    }
}

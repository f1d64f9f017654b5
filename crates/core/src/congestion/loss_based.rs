//! Loss-driven controllers: Tahoe and Reno.
//!
//! Both grow the window the same way (doubling in slow start, +1 in congestion
//! avoidance) and halve the window into the threshold on loss. They differ in
//! where the window restarts:
//!
//! | Variant | Window after loss |
//! |---------|-------------------|
//! | Tahoe   | 1 (full restart)  |
//! | Reno    | new threshold (fast recovery) |

use serde::{Deserialize, Serialize};

use super::state::{ControllerState, DEFAULT_INITIAL_THRESHOLD};
use super::{CongestionControl, CongestionControlAlgorithm, DEFAULT_MAX_WINDOW};
use crate::config::ConfigError;
use crate::simulation::SimulationTime;

/// Configuration shared by Tahoe and Reno.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct LossBasedConfig {
    /// Upper clamp for the window.
    pub max_window_size: u64,
    /// Slow start threshold before the first loss.
    pub initial_threshold: u64,
}

impl Default for LossBasedConfig {
    fn default() -> Self {
        Self {
            max_window_size: DEFAULT_MAX_WINDOW,
            initial_threshold: DEFAULT_INITIAL_THRESHOLD,
        }
    }
}

impl LossBasedConfig {
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.max_window_size == 0 {
            return Err(ConfigError::ZeroMaxWindow);
        }
        if self.initial_threshold == 0 {
            return Err(ConfigError::ZeroThreshold);
        }
        Ok(())
    }
}

/// TCP Tahoe: every loss restarts slow start from a window of 1.
#[derive(Debug, Clone)]
pub struct TahoeController {
    config: LossBasedConfig,
}

impl TahoeController {
    pub fn new(config: LossBasedConfig) -> Self {
        Self { config }
    }
}

impl CongestionControl for TahoeController {
    fn initial_state(&self) -> ControllerState {
        ControllerState::new(self.config.initial_threshold, 0.0)
    }

    fn on_ack(&self, state: ControllerState) -> ControllerState {
        state.grow_window(self.config.max_window_size)
    }

    fn on_packet_loss(&self, state: ControllerState, now: SimulationTime) -> ControllerState {
        let state = state.count_loss().record_recovery(now);
        ControllerState {
            threshold: state.halved_window(),
            window_size: 1,
            ..state
        }
    }

    fn max_window_size(&self) -> u64 {
        self.config.max_window_size
    }

    fn algorithm(&self) -> CongestionControlAlgorithm {
        CongestionControlAlgorithm::Tahoe
    }
}

/// TCP Reno: a loss halves the window and keeps sending from there.
#[derive(Debug, Clone)]
pub struct RenoController {
    config: LossBasedConfig,
}

impl RenoController {
    pub fn new(config: LossBasedConfig) -> Self {
        Self { config }
    }
}

impl CongestionControl for RenoController {
    fn initial_state(&self) -> ControllerState {
        ControllerState::new(self.config.initial_threshold, 0.0)
    }

    fn on_ack(&self, state: ControllerState) -> ControllerState {
        state.grow_window(self.config.max_window_size)
    }

    fn on_packet_loss(&self, state: ControllerState, now: SimulationTime) -> ControllerState {
        let state = state.count_loss().record_recovery(now);
        let threshold = state.halved_window();
        ControllerState {
            threshold,
            window_size: threshold,
            ..state
        }
    }

    fn max_window_size(&self) -> u64 {
        self.config.max_window_size
    }

    fn algorithm(&self) -> CongestionControlAlgorithm {
        CongestionControlAlgorithm::Reno
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn at(secs: f64) -> SimulationTime {
        SimulationTime::from_secs(secs)
    }

    #[test]
    fn test_default_config() {
        let config = LossBasedConfig::default();
        assert_eq!(config.max_window_size, 64);
        assert_eq!(config.initial_threshold, 16);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_config_validation() {
        let zero_window = LossBasedConfig {
            max_window_size: 0,
            ..Default::default()
        };
        assert!(matches!(zero_window.validate(), Err(ConfigError::ZeroMaxWindow)));

        let zero_threshold = LossBasedConfig {
            initial_threshold: 0,
            ..Default::default()
        };
        assert!(matches!(
            zero_threshold.validate(),
            Err(ConfigError::ZeroThreshold)
        ));
    }

    #[test]
    fn test_tahoe_slow_start_then_avoidance() {
        let tahoe = TahoeController::new(LossBasedConfig::default());
        let mut state = tahoe.initial_state();
        let mut windows = Vec::new();
        for _ in 0..7 {
            state = tahoe.on_ack(state);
            windows.push(state.window_size);
        }
        assert_eq!(windows, vec![2, 4, 8, 16, 17, 18, 19]);
        assert_eq!(state.acknowledged_packets, windows.iter().sum::<u64>());
    }

    #[test]
    fn test_tahoe_loss_resets_window() {
        let tahoe = TahoeController::new(LossBasedConfig::default());
        let state = ControllerState {
            window_size: 25,
            ..tahoe.initial_state()
        };
        let state = tahoe.on_packet_loss(state, at(14.0));
        assert_eq!(state.window_size, 1);
        assert_eq!(state.threshold, 12);
        assert_eq!(state.packets_lost, 1);
        assert_eq!(state.last_loss_time, Some(at(14.0)));
        assert_eq!(state.recovery_samples, 0);
    }

    #[test]
    fn test_reno_fast_recovery() {
        let reno = RenoController::new(LossBasedConfig::default());
        let state = ControllerState {
            window_size: 25,
            ..reno.initial_state()
        };
        let state = reno.on_packet_loss(state, at(14.0));
        assert_eq!(state.threshold, 12);
        assert_eq!(state.window_size, 12);
        assert_eq!(state.packets_lost, 1);
    }

    #[test]
    fn test_reno_loss_on_small_window() {
        let reno = RenoController::new(LossBasedConfig::default());
        let state = reno.on_packet_loss(reno.initial_state(), at(1.0));
        assert_eq!(state.threshold, 1);
        assert_eq!(state.window_size, 1);
        // window == threshold, so the next ack is congestion avoidance
        assert_eq!(reno.on_ack(state).window_size, 2);
    }

    #[test]
    fn test_loss_does_not_acknowledge() {
        let tahoe = TahoeController::new(LossBasedConfig::default());
        let state = tahoe.on_ack(tahoe.initial_state());
        let acked = state.acknowledged_packets;
        let state = tahoe.on_packet_loss(state, at(2.0));
        assert_eq!(state.acknowledged_packets, acked);
    }

    #[test]
    fn test_recovery_time_between_losses() {
        let reno = RenoController::new(LossBasedConfig::default());
        let state = reno.initial_state();
        let state = reno.on_packet_loss(state, at(5.0));
        let state = reno.on_packet_loss(state, at(9.0));
        let state = reno.on_packet_loss(state, at(15.0));
        assert_eq!(state.recovery_samples, 2);
        assert_eq!(state.average_recovery_time(), Some(5.0));
    }

    #[test]
    fn test_window_capped_at_max() {
        let config = LossBasedConfig {
            max_window_size: 20,
            initial_threshold: 64,
        };
        let tahoe = TahoeController::new(config);
        let mut state = tahoe.initial_state();
        for _ in 0..10 {
            state = tahoe.on_ack(state);
            assert!(state.window_size <= 20);
        }
        assert_eq!(state.window_size, 20);
    }
}

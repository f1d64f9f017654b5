//! Congestion control interface for simulated flows.
//!
//! This module provides a pluggable interface for the compared congestion
//! control algorithms, selected via configuration.
//!
//! ## Design
//!
//! The set of algorithms is closed, so dispatch goes through the
//! [`CongestionController`] enum rather than trait objects. Matching on the
//! variant keeps every state machine transition visible in one place and makes
//! the transitions exhaustively testable.
//!
//! Controllers hold configuration only. The congestion state lives in a
//! [`ControllerState`] snapshot owned by the flow, and every event handler
//! takes the current snapshot and returns the next one.
//!
//! ## Supported Algorithms
//!
//! - **Tahoe**: slow start below the threshold, +1 above it, full restart from
//!   a window of 1 on loss.
//! - **Reno**: same growth as Tahoe, fast recovery to the halved window on loss.
//! - **BBR**: window sized from a running maximum bandwidth estimate; loss is
//!   counted but does not move the window.
//!
//! ## Usage
//!
//! ```
//! use ccsim::congestion::{
//!     CongestionControl, CongestionControlAlgorithm, CongestionControlConfig,
//! };
//!
//! let controller = CongestionControlConfig::new(CongestionControlAlgorithm::Reno)
//!     .with_max_window(32)
//!     .build()
//!     .unwrap();
//!
//! let state = controller.initial_state().on_send(1.0);
//! let state = controller.on_ack(state);
//! assert_eq!(state.window_size, 2);
//! ```

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::config::ConfigError;
use crate::simulation::SimulationTime;

mod bbr;
mod loss_based;
mod state;

#[cfg(test)]
mod tests;

pub use bbr::{BbrConfig, BbrController};
pub use loss_based::{LossBasedConfig, RenoController, TahoeController};
pub use state::{
    ControllerState, DEFAULT_INITIAL_BANDWIDTH_ESTIMATE, DEFAULT_INITIAL_THRESHOLD, INITIAL_WINDOW,
};

/// Default upper clamp for the window, in packets.
pub const DEFAULT_MAX_WINDOW: u64 = 64;

// =============================================================================
// Algorithm Identification
// =============================================================================

/// Identifies the congestion control algorithm of a flow.
///
/// Used to select the controller in configuration, to tag sweep results and
/// for log output. The declaration order is the canonical reporting order.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Hash,
    PartialOrd,
    Ord,
    Default,
    Serialize,
    Deserialize,
    clap::ValueEnum,
)]
#[serde(rename_all = "lowercase")]
pub enum CongestionControlAlgorithm {
    /// TCP Tahoe.
    #[default]
    Tahoe,
    /// TCP Reno with fast recovery.
    Reno,
    /// Bandwidth-estimation controller.
    Bbr,
}

impl CongestionControlAlgorithm {
    /// All algorithms in reporting order.
    pub const ALL: [Self; 3] = [Self::Tahoe, Self::Reno, Self::Bbr];

    /// Whether the algorithm reacts to loss and tracks recovery time.
    pub fn is_loss_based(self) -> bool {
        matches!(self, Self::Tahoe | Self::Reno)
    }

    /// Short lowercase identifier, stable for file names.
    pub fn slug(self) -> &'static str {
        match self {
            Self::Tahoe => "tahoe",
            Self::Reno => "reno",
            Self::Bbr => "bbr",
        }
    }
}

impl fmt::Display for CongestionControlAlgorithm {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Tahoe => write!(f, "TCP Tahoe"),
            Self::Reno => write!(f, "TCP Reno"),
            Self::Bbr => write!(f, "TCP BBR"),
        }
    }
}

// =============================================================================
// Congestion Control Trait
// =============================================================================

/// Interface implemented by every controller and by the dispatch enum.
///
/// Exactly one of `on_ack` or `on_packet_loss` is called per tick, after the
/// runner booked the tick's send via [`ControllerState::on_send`]. Every
/// handler must keep `1 <= window_size <= max_window_size`.
pub trait CongestionControl: Send + Sync {
    /// State of a fresh flow: window 1, all counters zero.
    fn initial_state(&self) -> ControllerState;

    /// Transition for a tick whose packets were acknowledged.
    fn on_ack(&self, state: ControllerState) -> ControllerState;

    /// Transition for a tick that experienced a loss at `now`.
    fn on_packet_loss(&self, state: ControllerState, now: SimulationTime) -> ControllerState;

    /// Upper clamp for the window.
    fn max_window_size(&self) -> u64;

    /// Returns the algorithm identifier.
    fn algorithm(&self) -> CongestionControlAlgorithm;
}

// =============================================================================
// Congestion Controller Enum (Dispatch)
// =============================================================================

/// Congestion controller that dispatches to the configured algorithm.
#[derive(Debug, Clone)]
pub enum CongestionController {
    /// TCP Tahoe controller.
    Tahoe(TahoeController),
    /// TCP Reno controller.
    Reno(RenoController),
    /// Bandwidth-estimation controller.
    Bbr(BbrController),
}

impl CongestionControl for CongestionController {
    fn initial_state(&self) -> ControllerState {
        match self {
            Self::Tahoe(c) => c.initial_state(),
            Self::Reno(c) => c.initial_state(),
            Self::Bbr(c) => c.initial_state(),
        }
    }

    fn on_ack(&self, state: ControllerState) -> ControllerState {
        match self {
            Self::Tahoe(c) => c.on_ack(state),
            Self::Reno(c) => c.on_ack(state),
            Self::Bbr(c) => c.on_ack(state),
        }
    }

    fn on_packet_loss(&self, state: ControllerState, now: SimulationTime) -> ControllerState {
        match self {
            Self::Tahoe(c) => c.on_packet_loss(state, now),
            Self::Reno(c) => c.on_packet_loss(state, now),
            Self::Bbr(c) => c.on_packet_loss(state, now),
        }
    }

    fn max_window_size(&self) -> u64 {
        match self {
            Self::Tahoe(c) => c.max_window_size(),
            Self::Reno(c) => c.max_window_size(),
            Self::Bbr(c) => c.max_window_size(),
        }
    }

    fn algorithm(&self) -> CongestionControlAlgorithm {
        match self {
            Self::Tahoe(_) => CongestionControlAlgorithm::Tahoe,
            Self::Reno(_) => CongestionControlAlgorithm::Reno,
            Self::Bbr(_) => CongestionControlAlgorithm::Bbr,
        }
    }
}

// =============================================================================
// Configuration
// =============================================================================

/// Algorithm-agnostic controller configuration.
///
/// Holds the parameters of every algorithm; `build` picks the ones relevant to
/// `algorithm`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct CongestionControlConfig {
    pub algorithm: CongestionControlAlgorithm,
    /// Upper clamp for the window.
    pub max_window_size: u64,
    /// Initial slow start threshold (Tahoe, Reno).
    pub initial_threshold: u64,
    /// Initial bandwidth estimate (BBR).
    pub initial_bandwidth_estimate: f64,
}

impl Default for CongestionControlConfig {
    fn default() -> Self {
        Self::new(CongestionControlAlgorithm::default())
    }
}

impl CongestionControlConfig {
    /// Default parameters for the given algorithm.
    pub fn new(algorithm: CongestionControlAlgorithm) -> Self {
        Self {
            algorithm,
            max_window_size: DEFAULT_MAX_WINDOW,
            initial_threshold: DEFAULT_INITIAL_THRESHOLD,
            initial_bandwidth_estimate: DEFAULT_INITIAL_BANDWIDTH_ESTIMATE,
        }
    }

    /// Same parameters with a different algorithm.
    pub fn for_algorithm(mut self, algorithm: CongestionControlAlgorithm) -> Self {
        self.algorithm = algorithm;
        self
    }

    pub fn with_max_window(mut self, max_window_size: u64) -> Self {
        self.max_window_size = max_window_size;
        self
    }

    pub fn with_initial_threshold(mut self, threshold: u64) -> Self {
        self.initial_threshold = threshold;
        self
    }

    pub fn with_initial_bandwidth_estimate(mut self, estimate: f64) -> Self {
        self.initial_bandwidth_estimate = estimate;
        self
    }

    /// Validates the parameters the selected algorithm uses.
    pub fn validate(&self) -> Result<(), ConfigError> {
        match self.algorithm {
            CongestionControlAlgorithm::Tahoe | CongestionControlAlgorithm::Reno => {
                self.as_loss_based_config().validate()
            }
            CongestionControlAlgorithm::Bbr => self.as_bbr_config().validate(),
        }
    }

    /// Build a controller for the configured algorithm.
    pub fn build(&self) -> Result<CongestionController, ConfigError> {
        self.validate()?;
        let controller = match self.algorithm {
            CongestionControlAlgorithm::Tahoe => {
                CongestionController::Tahoe(TahoeController::new(self.as_loss_based_config()))
            }
            CongestionControlAlgorithm::Reno => {
                CongestionController::Reno(RenoController::new(self.as_loss_based_config()))
            }
            CongestionControlAlgorithm::Bbr => {
                CongestionController::Bbr(BbrController::new(self.as_bbr_config()))
            }
        };
        Ok(controller)
    }

    /// Tahoe/Reno view of this configuration.
    pub fn as_loss_based_config(&self) -> LossBasedConfig {
        LossBasedConfig {
            max_window_size: self.max_window_size,
            initial_threshold: self.initial_threshold,
        }
    }

    /// BBR view of this configuration.
    pub fn as_bbr_config(&self) -> BbrConfig {
        BbrConfig {
            max_window_size: self.max_window_size,
            initial_bandwidth_estimate: self.initial_bandwidth_estimate,
        }
    }
}

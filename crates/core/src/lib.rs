//! Discrete-time simulator comparing TCP congestion control algorithms.
//!
//! A flow sends its whole congestion window once per tick. A loss policy
//! marks some ticks as losses; the controller reacts to each tick with either
//! an acknowledgment or a loss. Tahoe, Reno and a simplified BBR run over the
//! same timeline and loss conditions, and their window evolution, throughput
//! and loss sensitivity are compared, optionally across a sweep of loss
//! frequencies.

/// Simulation parameters, TOML loading, command line arguments and logging.
pub mod config;

/// Congestion controller state machines.
pub mod congestion;

/// Output directory handling.
pub mod export;

/// Single flow runner and its recorded time series.
pub mod flow;

/// Per-run performance metrics.
pub mod metrics;

/// Console tables.
pub mod report;

/// Clock, loss policies and seeded randomness.
pub mod simulation;

/// Loss-frequency sweeps across algorithms.
pub mod sweep;

pub use config::{set_logger, ConfigError, SimulationConfig};
pub use congestion::{CongestionControlAlgorithm, CongestionControlConfig, CongestionController};
pub use flow::{Flow, FlowReport, FlowRunner};
pub use metrics::{MetricsCollector, MetricsRecord};
pub use sweep::{ExperimentSweep, SweepConfig, SweepResult};

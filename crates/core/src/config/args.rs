//! Command line arguments.
//!
//! Every numeric flag is optional: when present it overrides the value read
//! from `--config`, which in turn overrides the built-in defaults.

use std::path::PathBuf;

use clap::ValueEnum;
use tracing::level_filters::LevelFilter;

use super::{ConfigError, SimulationConfig};
use crate::congestion::CongestionControlAlgorithm;
use crate::simulation::LossPolicy;

/// Congestion control comparison simulator.
#[derive(clap::Parser, Debug, Clone)]
#[command(name = "ccsim", version)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,

    /// TOML file with simulation parameters.
    #[arg(long, global = true, env = "CCSIM_CONFIG")]
    pub config: Option<PathBuf>,

    #[arg(long, global = true, env = "LOG_LEVEL")]
    pub log_level: Option<LevelFilter>,
}

impl Cli {
    /// Loads `--config` (or the defaults) and applies the command's overrides.
    pub fn resolve(&self) -> Result<SimulationConfig, ConfigError> {
        let mut config = match &self.config {
            Some(path) => SimulationConfig::load(path)?,
            None => SimulationConfig::default(),
        };
        match &self.command {
            Command::Run(args) => args.apply(&mut config),
            Command::Sweep(args) => args.apply(&mut config),
        }
        config.validate()?;
        Ok(config)
    }
}

#[derive(clap::Subcommand, Debug, Clone)]
pub enum Command {
    /// Run single flows, one per selected algorithm.
    Run(RunArgs),
    /// Sweep the loss frequency and compare every algorithm.
    Sweep(SweepArgs),
}

/// Single-flow runs.
#[derive(clap::Args, Debug, Clone, Default)]
pub struct RunArgs {
    /// Algorithm to run. Runs all of them when omitted.
    #[arg(long, value_enum)]
    pub algorithm: Option<CongestionControlAlgorithm>,

    #[command(flatten)]
    pub flow: FlowArgs,

    #[command(flatten)]
    pub loss: LossArgs,

    /// Stop after this many losses.
    #[arg(long)]
    pub max_losses: Option<u64>,

    /// Directory the results are written to.
    #[arg(long, env = "CCSIM_OUTPUT_DIR")]
    pub output_dir: Option<PathBuf>,
}

impl RunArgs {
    pub fn apply(&self, config: &mut SimulationConfig) {
        if let Some(algorithm) = self.algorithm {
            config.flow.algorithm = algorithm;
        }
        if self.max_losses.is_some() {
            config.termination.max_losses = self.max_losses;
        }
        self.flow.apply(config);
        self.loss.apply(config);
    }

    /// Algorithms to run, in reporting order.
    pub fn algorithms(&self) -> Vec<CongestionControlAlgorithm> {
        match self.algorithm {
            Some(algorithm) => vec![algorithm],
            None => CongestionControlAlgorithm::ALL.to_vec(),
        }
    }
}

/// Loss-frequency sweep.
#[derive(clap::Args, Debug, Clone, Default)]
pub struct SweepArgs {
    #[command(flatten)]
    pub flow: FlowArgs,

    /// First loss frequency.
    #[arg(long)]
    pub start: Option<f64>,

    /// Last loss frequency, inclusive.
    #[arg(long)]
    pub end: Option<f64>,

    #[arg(long)]
    pub step: Option<f64>,

    /// Worker threads; 1 runs every pair on the main thread.
    #[arg(long, env = "CCSIM_WORKERS")]
    pub workers: Option<usize>,

    /// Comma separated algorithms to compare.
    #[arg(long, value_enum, value_delimiter = ',')]
    pub variants: Option<Vec<CongestionControlAlgorithm>>,

    /// Directory the results are written to.
    #[arg(long, env = "CCSIM_OUTPUT_DIR")]
    pub output_dir: Option<PathBuf>,
}

impl SweepArgs {
    pub fn apply(&self, config: &mut SimulationConfig) {
        self.flow.apply(config);
        let sweep = &mut config.sweep;
        if let Some(start) = self.start {
            sweep.start = start;
        }
        if let Some(end) = self.end {
            sweep.end = end;
        }
        if let Some(step) = self.step {
            sweep.step = step;
        }
        if let Some(workers) = self.workers {
            sweep.workers = workers;
        }
        if let Some(variants) = &self.variants {
            sweep.variants = variants.clone();
        }
    }
}

/// Parameters shared by single runs and sweeps.
#[derive(clap::Args, Debug, Clone, Default)]
pub struct FlowArgs {
    /// Ticks per simulated time unit.
    #[arg(long)]
    pub data_rate: Option<f64>,

    #[arg(long)]
    pub max_window_size: Option<u64>,

    /// Simulated time limit.
    #[arg(long)]
    pub horizon: Option<f64>,

    #[arg(long)]
    pub initial_threshold: Option<u64>,

    #[arg(long)]
    pub initial_bandwidth_estimate: Option<f64>,
}

impl FlowArgs {
    pub fn apply(&self, config: &mut SimulationConfig) {
        if let Some(data_rate) = self.data_rate {
            config.flow.data_rate = data_rate;
        }
        if let Some(max_window_size) = self.max_window_size {
            config.flow.max_window_size = max_window_size;
        }
        if let Some(horizon) = self.horizon {
            config.termination.horizon = horizon;
        }
        if let Some(threshold) = self.initial_threshold {
            config.controller.initial_threshold = threshold;
        }
        if let Some(estimate) = self.initial_bandwidth_estimate {
            config.controller.initial_bandwidth_estimate = estimate;
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum LossPolicyKind {
    ModuloCount,
    ModuloTime,
    Random,
    Never,
}

impl LossPolicyKind {
    fn of(policy: &LossPolicy) -> Self {
        match policy {
            LossPolicy::ModuloCount { .. } => Self::ModuloCount,
            LossPolicy::ModuloTime { .. } => Self::ModuloTime,
            LossPolicy::Random { .. } => Self::Random,
            LossPolicy::Never => Self::Never,
        }
    }
}

/// Loss policy overrides for single runs.
#[derive(clap::Args, Debug, Clone, Default)]
pub struct LossArgs {
    #[arg(long, value_enum)]
    pub loss_policy: Option<LossPolicyKind>,

    /// Modulus of the modulo-count policy.
    #[arg(long)]
    pub loss_every: Option<u64>,

    /// Period of the modulo-time policy.
    #[arg(long)]
    pub loss_frequency: Option<f64>,

    /// Per-tick probability of the random policy.
    #[arg(long)]
    pub loss_probability: Option<f64>,

    #[arg(long, env = "CCSIM_SEED")]
    pub seed: Option<u64>,
}

impl LossArgs {
    /// Picks the policy from `--loss-policy`, or from whichever parameter flag
    /// was given, and fills missing parameters from the current policy.
    pub fn apply(&self, config: &mut SimulationConfig) {
        let current = config.loss;
        let kind = self
            .loss_policy
            .or_else(|| self.loss_every.map(|_| LossPolicyKind::ModuloCount))
            .or_else(|| self.loss_frequency.map(|_| LossPolicyKind::ModuloTime))
            .or_else(|| self.loss_probability.map(|_| LossPolicyKind::Random))
            .or_else(|| self.seed.map(|_| LossPolicyKind::of(&current)));
        let Some(kind) = kind else {
            return;
        };

        config.loss = match kind {
            LossPolicyKind::ModuloCount => {
                let every = match current {
                    LossPolicy::ModuloCount { every } => every,
                    _ => LossPolicy::DEFAULT_PACKET_MODULUS,
                };
                LossPolicy::modulo_count(self.loss_every.unwrap_or(every))
            }
            LossPolicyKind::ModuloTime => {
                let frequency = match current {
                    LossPolicy::ModuloTime { frequency } => frequency,
                    _ => 1.0,
                };
                LossPolicy::modulo_time(self.loss_frequency.unwrap_or(frequency))
            }
            LossPolicyKind::Random => {
                let (probability, seed) = match current {
                    LossPolicy::Random { probability, seed } => (probability, seed),
                    _ => (0.1, 0),
                };
                LossPolicy::random(
                    self.loss_probability.unwrap_or(probability),
                    self.seed.unwrap_or(seed),
                )
            }
            LossPolicyKind::Never => LossPolicy::Never,
        };
    }
}

//! Simulation configuration.
//!
//! Parameters come from three layers, each overriding the previous one:
//! built-in defaults, an optional TOML file and command line flags (see
//! [`args`]). The merged [`SimulationConfig`] is validated once and then
//! turned into flows or sweeps.
//!
//! ```toml
//! [flow]
//! data-rate = 1.0
//! max-window-size = 64
//! algorithm = "tahoe"
//!
//! [termination]
//! horizon = 50.0
//!
//! [loss]
//! policy = "modulo-count"
//! every = 10
//!
//! [controller]
//! initial-threshold = 16
//! initial-bandwidth-estimate = 20.0
//!
//! [sweep]
//! start = 1.0
//! end = 25.0
//! step = 1.0
//! workers = 1
//! variants = ["tahoe", "reno", "bbr"]
//! ```

use std::{fs, path::Path};

use serde::{Deserialize, Serialize};

use crate::congestion::{
    CongestionControlAlgorithm, CongestionControlConfig, DEFAULT_INITIAL_BANDWIDTH_ESTIMATE,
    DEFAULT_INITIAL_THRESHOLD, DEFAULT_MAX_WINDOW,
};
use crate::flow::Flow;
use crate::simulation::{LossPolicy, Termination};
use crate::sweep::{ExperimentSweep, LossFrequencyRange, SweepConfig};

pub mod args;
mod error;

pub use error::ConfigError;

/// Complete parameter set of a simulation session.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SimulationConfig {
    #[serde(default)]
    pub flow: FlowSection,
    #[serde(default)]
    pub termination: TerminationSection,
    #[serde(default)]
    pub loss: LossPolicy,
    #[serde(default)]
    pub controller: ControllerSection,
    #[serde(default)]
    pub sweep: SweepSection,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct FlowSection {
    /// Ticks per simulated time unit.
    #[serde(default = "default_data_rate", rename = "data-rate")]
    pub data_rate: f64,
    #[serde(default = "default_max_window", rename = "max-window-size")]
    pub max_window_size: u64,
    /// Algorithm used by single runs.
    #[serde(default)]
    pub algorithm: CongestionControlAlgorithm,
}

impl Default for FlowSection {
    fn default() -> Self {
        Self {
            data_rate: default_data_rate(),
            max_window_size: default_max_window(),
            algorithm: CongestionControlAlgorithm::default(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct TerminationSection {
    #[serde(default = "default_horizon")]
    pub horizon: f64,
    #[serde(
        default,
        rename = "max-losses",
        skip_serializing_if = "Option::is_none"
    )]
    pub max_losses: Option<u64>,
}

impl Default for TerminationSection {
    fn default() -> Self {
        Self {
            horizon: default_horizon(),
            max_losses: None,
        }
    }
}

impl From<TerminationSection> for Termination {
    fn from(section: TerminationSection) -> Self {
        Termination {
            horizon: section.horizon,
            max_losses: section.max_losses,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ControllerSection {
    /// Tahoe and Reno.
    #[serde(default = "default_initial_threshold", rename = "initial-threshold")]
    pub initial_threshold: u64,
    /// BBR.
    #[serde(
        default = "default_initial_bandwidth_estimate",
        rename = "initial-bandwidth-estimate"
    )]
    pub initial_bandwidth_estimate: f64,
}

impl Default for ControllerSection {
    fn default() -> Self {
        Self {
            initial_threshold: default_initial_threshold(),
            initial_bandwidth_estimate: default_initial_bandwidth_estimate(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SweepSection {
    #[serde(default = "default_sweep_start")]
    pub start: f64,
    #[serde(default = "default_sweep_end")]
    pub end: f64,
    #[serde(default = "default_sweep_step")]
    pub step: f64,
    #[serde(default = "default_workers")]
    pub workers: usize,
    #[serde(default = "default_variants")]
    pub variants: Vec<CongestionControlAlgorithm>,
}

impl Default for SweepSection {
    fn default() -> Self {
        Self {
            start: default_sweep_start(),
            end: default_sweep_end(),
            step: default_sweep_step(),
            workers: default_workers(),
            variants: default_variants(),
        }
    }
}

fn default_data_rate() -> f64 {
    1.0
}

fn default_max_window() -> u64 {
    DEFAULT_MAX_WINDOW
}

fn default_horizon() -> f64 {
    Termination::DEFAULT_HORIZON
}

fn default_initial_threshold() -> u64 {
    DEFAULT_INITIAL_THRESHOLD
}

fn default_initial_bandwidth_estimate() -> f64 {
    DEFAULT_INITIAL_BANDWIDTH_ESTIMATE
}

fn default_sweep_start() -> f64 {
    LossFrequencyRange::default().start
}

fn default_sweep_end() -> f64 {
    LossFrequencyRange::default().end
}

fn default_sweep_step() -> f64 {
    LossFrequencyRange::default().step
}

fn default_workers() -> usize {
    1
}

fn default_variants() -> Vec<CongestionControlAlgorithm> {
    CongestionControlAlgorithm::ALL.to_vec()
}

impl SimulationConfig {
    pub fn from_toml_str(contents: &str) -> Result<Self, ConfigError> {
        Ok(toml::from_str(contents)?)
    }

    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let contents = fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        let config = Self::from_toml_str(&contents)?;
        tracing::debug!(path = %path.display(), "Loaded configuration file");
        Ok(config)
    }

    pub fn to_toml_string(&self) -> Result<String, toml::ser::Error> {
        toml::to_string_pretty(self)
    }

    /// Checks every parameter, including the sweep section.
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.flow()?;
        self.sweep_config().validate()
    }

    /// Controller parameters for `algorithm`.
    pub fn controller_config(&self, algorithm: CongestionControlAlgorithm) -> CongestionControlConfig {
        CongestionControlConfig::new(algorithm)
            .with_max_window(self.flow.max_window_size)
            .with_initial_threshold(self.controller.initial_threshold)
            .with_initial_bandwidth_estimate(self.controller.initial_bandwidth_estimate)
    }

    pub fn termination(&self) -> Termination {
        self.termination.into()
    }

    /// The single flow described by the `flow` section.
    pub fn flow(&self) -> Result<Flow, ConfigError> {
        self.flow_for(self.flow.algorithm)
    }

    /// Same parameters, different algorithm.
    pub fn flow_for(&self, algorithm: CongestionControlAlgorithm) -> Result<Flow, ConfigError> {
        Flow::new(
            self.flow.data_rate,
            self.controller_config(algorithm),
            self.loss,
            self.termination(),
        )
    }

    pub fn sweep_config(&self) -> SweepConfig {
        SweepConfig {
            data_rate: self.flow.data_rate,
            controller: self.controller_config(self.flow.algorithm),
            termination: self.termination(),
            range: LossFrequencyRange {
                start: self.sweep.start,
                end: self.sweep.end,
                step: self.sweep.step,
            },
            variants: self.sweep.variants.clone(),
            workers: self.sweep.workers,
        }
    }

    pub fn sweep(&self) -> Result<ExperimentSweep, ConfigError> {
        ExperimentSweep::new(self.sweep_config())
    }
}

/// Installs the global tracing subscriber.
///
/// Only the first call has an effect. Without the `trace` feature this is a
/// no-op.
pub fn set_logger(level: Option<tracing::level_filters::LevelFilter>) {
    #[cfg(feature = "trace")]
    {
        use std::sync::atomic::AtomicBool;

        static LOGGER_SET: AtomicBool = AtomicBool::new(false);
        if LOGGER_SET
            .compare_exchange(
                false,
                true,
                std::sync::atomic::Ordering::Release,
                std::sync::atomic::Ordering::SeqCst,
            )
            .is_err()
        {
            return;
        }

        if let Err(err) = tracer::init_tracer(level) {
            eprintln!("failed tracing initialization: {err}");
        }
    }
    #[cfg(not(feature = "trace"))]
    let _ = level;
}

#[cfg(feature = "trace")]
mod tracer {
    use tracing::level_filters::LevelFilter;
    use tracing_subscriber::{
        layer::SubscriberExt, util::SubscriberInitExt, util::TryInitError, Layer, Registry,
    };

    pub(super) fn init_tracer(level: Option<LevelFilter>) -> Result<(), TryInitError> {
        let default_filter = if cfg!(any(test, debug_assertions)) {
            LevelFilter::DEBUG
        } else {
            LevelFilter::INFO
        };
        let filter_layer = tracing_subscriber::EnvFilter::builder()
            .with_default_directive(level.unwrap_or(default_filter).into())
            .from_env_lossy();

        if std::env::var("CCSIM_DISABLE_LOGS").is_ok() {
            return Ok(());
        }
        let to_stderr = std::env::var("CCSIM_LOG_TO_STDERR").is_ok();
        let use_json = std::env::var("CCSIM_LOG_FORMAT")
            .map(|v| v.to_lowercase() == "json")
            .unwrap_or(false);
        let with_location = cfg!(any(test, debug_assertions));

        let fmt_layer: Box<dyn Layer<Registry> + Send + Sync> = match (use_json, to_stderr) {
            (true, true) => tracing_subscriber::fmt::layer()
                .with_level(true)
                .json()
                .with_file(with_location)
                .with_line_number(with_location)
                .with_writer(std::io::stderr)
                .boxed(),
            (true, false) => tracing_subscriber::fmt::layer()
                .with_level(true)
                .json()
                .with_file(with_location)
                .with_line_number(with_location)
                .boxed(),
            (false, true) => tracing_subscriber::fmt::layer()
                .with_level(true)
                .pretty()
                .with_file(with_location)
                .with_line_number(with_location)
                .with_writer(std::io::stderr)
                .boxed(),
            (false, false) => tracing_subscriber::fmt::layer()
                .with_level(true)
                .pretty()
                .with_file(with_location)
                .with_line_number(with_location)
                .boxed(),
        };

        Registry::default()
            .with(fmt_layer.with_filter(filter_layer))
            .try_init()
    }
}

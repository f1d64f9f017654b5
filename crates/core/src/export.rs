//! Writes results to an output directory.
//!
//! Layout:
//!
//! ```text
//! <root>/config.toml          effective configuration
//! <root>/metrics.json         one record per run or sweep pair
//! <root>/runs/<variant>.json          series of a single run
//! <root>/runs/<variant>_<freq>.json   series of a sweep pair
//! ```

use std::{
    fs,
    path::{Path, PathBuf},
};

use serde::Serialize;

use crate::config::SimulationConfig;
use crate::congestion::{CongestionControlAlgorithm, ControllerState};
use crate::flow::{FlowReport, Sample};
use crate::metrics::MetricsRecord;
use crate::simulation::SimulationTime;
use crate::sweep::SweepResult;

#[derive(Debug, thiserror::Error)]
pub enum ExportError {
    #[error("failed to create {}: {source}", .path.display())]
    CreateDir {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to write {}: {source}", .path.display())]
    Write {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to encode JSON: {0}")]
    Json(#[from] serde_json::Error),
    #[error("failed to encode TOML: {0}")]
    Toml(#[from] toml::ser::Error),
}

/// Everything recorded about one run, as written to `runs/`.
#[derive(Debug, Serialize)]
pub struct RunExport<'a> {
    pub algorithm: CongestionControlAlgorithm,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub loss_frequency: Option<f64>,
    pub final_time: SimulationTime,
    pub state: &'a ControllerState,
    pub metrics: MetricsRecord,
    pub samples: &'a [Sample],
    pub losses: &'a [SimulationTime],
    pub average_send_rate: Vec<(SimulationTime, f64)>,
    pub throughput_over_time: Vec<(SimulationTime, f64)>,
    pub cumulative_losses: Vec<(SimulationTime, usize)>,
}

impl<'a> RunExport<'a> {
    pub fn new(report: &'a FlowReport, loss_frequency: Option<f64>) -> Self {
        Self {
            algorithm: report.algorithm,
            loss_frequency,
            final_time: report.final_time,
            state: &report.state,
            metrics: report.metrics(),
            samples: report.series.samples(),
            losses: report.series.losses(),
            average_send_rate: report.average_send_rate(),
            throughput_over_time: report.throughput_over_time(),
            cumulative_losses: report.series.cumulative_losses(),
        }
    }

    fn file_name(&self) -> String {
        match self.loss_frequency {
            Some(frequency) => format!("{}_{frequency}.json", self.algorithm.slug()),
            None => format!("{}.json", self.algorithm.slug()),
        }
    }
}

#[derive(Debug, Serialize)]
struct RunRecord {
    algorithm: CongestionControlAlgorithm,
    metrics: MetricsRecord,
}

/// Output directory, created on demand.
#[derive(Debug, Clone)]
pub struct ResultsDir {
    root: PathBuf,
}

impl ResultsDir {
    pub const CONFIG_FILE: &'static str = "config.toml";
    pub const METRICS_FILE: &'static str = "metrics.json";
    pub const RUNS_DIR: &'static str = "runs";

    /// Creates `root` and its `runs/` subdirectory if missing.
    pub fn create(root: impl Into<PathBuf>) -> Result<Self, ExportError> {
        let root = root.into();
        let runs = root.join(Self::RUNS_DIR);
        fs::create_dir_all(&runs).map_err(|source| ExportError::CreateDir {
            path: runs.clone(),
            source,
        })?;
        tracing::debug!(path = %root.display(), "Results directory ready");
        Ok(Self { root })
    }

    pub fn path(&self) -> &Path {
        &self.root
    }

    pub fn write_config(&self, config: &SimulationConfig) -> Result<PathBuf, ExportError> {
        let path = self.root.join(Self::CONFIG_FILE);
        write_file(&path, config.to_toml_string()?)?;
        Ok(path)
    }

    /// Writes the metrics table and every run's series.
    pub fn write_sweep(&self, result: &SweepResult) -> Result<(), ExportError> {
        self.write_json(&self.root.join(Self::METRICS_FILE), &result.records)?;
        for run in &result.runs {
            self.write_run(&RunExport::new(&run.report, Some(run.loss_frequency)))?;
        }
        tracing::info!(
            path = %self.root.display(),
            runs = result.runs.len(),
            "Sweep results written"
        );
        Ok(())
    }

    /// Writes one metrics row and one series file per report.
    pub fn write_runs(&self, reports: &[FlowReport]) -> Result<(), ExportError> {
        let records: Vec<RunRecord> = reports
            .iter()
            .map(|report| RunRecord {
                algorithm: report.algorithm,
                metrics: report.metrics(),
            })
            .collect();
        self.write_json(&self.root.join(Self::METRICS_FILE), &records)?;
        for report in reports {
            self.write_run(&RunExport::new(report, None))?;
        }
        tracing::info!(path = %self.root.display(), runs = reports.len(), "Run results written");
        Ok(())
    }

    pub fn write_run(&self, run: &RunExport<'_>) -> Result<PathBuf, ExportError> {
        let path = self.root.join(Self::RUNS_DIR).join(run.file_name());
        self.write_json(&path, run)?;
        Ok(path)
    }

    fn write_json(&self, path: &Path, value: &impl Serialize) -> Result<(), ExportError> {
        write_file(path, serde_json::to_string_pretty(value)?)
    }
}

fn write_file(path: &Path, contents: String) -> Result<(), ExportError> {
    fs::write(path, contents).map_err(|source| ExportError::Write {
        path: path.to_path_buf(),
        source,
    })
}

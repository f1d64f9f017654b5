//! Loss-frequency sweeps.
//!
//! A sweep runs one flow per `(loss_frequency, variant)` pair, every flow
//! using the modulo-time loss policy with that frequency and otherwise
//! identical parameters. Runs are independent, so they may be spread over a
//! bounded pool of worker threads. Results are always returned in canonical
//! order: ascending frequency, then variant order.

use std::sync::{
    atomic::{AtomicBool, Ordering},
    Arc,
};

use parking_lot::Mutex;
use serde::{Deserialize, Serialize};

use crate::config::ConfigError;
use crate::congestion::{CongestionControlAlgorithm, CongestionControlConfig};
use crate::flow::{Flow, FlowReport};
use crate::metrics::MetricsRecord;
use crate::simulation::{Clock, LossPolicy, Termination};

/// Relative slack when comparing the last generated frequency with `end`.
const RANGE_EPSILON: f64 = 1e-9;

/// Ascending range of loss frequencies: `start, start + step, ...` up to and
/// including `end`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct LossFrequencyRange {
    pub start: f64,
    pub end: f64,
    pub step: f64,
}

impl Default for LossFrequencyRange {
    fn default() -> Self {
        Self {
            start: 1.0,
            end: 25.0,
            step: 1.0,
        }
    }
}

impl LossFrequencyRange {
    pub fn new(start: f64, end: f64, step: f64) -> Result<Self, ConfigError> {
        let range = Self { start, end, step };
        range.validate()?;
        Ok(range)
    }

    /// Integer-spaced range `start..=end`.
    pub fn inclusive(start: u32, end: u32) -> Result<Self, ConfigError> {
        Self::new(start as f64, end as f64, 1.0)
    }

    /// A descending range is valid and simply empty.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if !self.start.is_finite() || self.start <= 0.0 {
            return Err(ConfigError::InvalidLossFrequency(self.start));
        }
        if !self.end.is_finite() {
            return Err(ConfigError::InvalidLossFrequency(self.end));
        }
        if !self.step.is_finite() || self.step <= 0.0 {
            return Err(ConfigError::InvalidSweepStep(self.step));
        }
        Ok(())
    }

    pub fn values(&self) -> Vec<f64> {
        if self.end < self.start {
            return Vec::new();
        }
        let limit = self.end + self.step * RANGE_EPSILON;
        (0u64..)
            .map(|i| self.start + i as f64 * self.step)
            .take_while(|value| *value <= limit)
            .collect()
    }

    pub fn is_empty(&self) -> bool {
        self.end < self.start
    }
}

/// Parameters shared by every run of a sweep.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SweepConfig {
    pub data_rate: f64,
    /// Controller parameters; the algorithm field is replaced per variant.
    pub controller: CongestionControlConfig,
    pub termination: Termination,
    pub range: LossFrequencyRange,
    /// Variants run for every frequency, reported in sorted order.
    pub variants: Vec<CongestionControlAlgorithm>,
    /// Worker threads. 1 runs everything on the calling thread.
    pub workers: usize,
}

impl Default for SweepConfig {
    fn default() -> Self {
        Self {
            data_rate: 1.0,
            controller: CongestionControlConfig::default(),
            termination: Termination::default(),
            range: LossFrequencyRange::default(),
            variants: CongestionControlAlgorithm::ALL.to_vec(),
            workers: 1,
        }
    }
}

impl SweepConfig {
    pub fn validate(&self) -> Result<(), ConfigError> {
        Clock::validate(self.data_rate, self.termination.horizon)?;
        if self.variants.is_empty() {
            return Err(ConfigError::NoAlgorithms);
        }
        if self.workers == 0 {
            return Err(ConfigError::ZeroWorkers);
        }
        for variant in &self.variants {
            self.controller.for_algorithm(*variant).validate()?;
        }
        self.termination.validate()?;
        self.range.validate()
    }
}

/// One metrics row of a sweep.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SweepRecord {
    pub loss_frequency: f64,
    pub algorithm: CongestionControlAlgorithm,
    pub metrics: MetricsRecord,
}

/// The raw run behind a [`SweepRecord`].
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SweepRun {
    pub loss_frequency: f64,
    pub report: FlowReport,
}

/// Output of a sweep, in canonical order.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct SweepResult {
    pub records: Vec<SweepRecord>,
    pub runs: Vec<SweepRun>,
    /// Set when the sweep was aborted before every pair ran.
    pub aborted: bool,
}

impl SweepResult {
    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn records_for(
        &self,
        algorithm: CongestionControlAlgorithm,
    ) -> impl Iterator<Item = &SweepRecord> + '_ {
        self.records
            .iter()
            .filter(move |record| record.algorithm == algorithm)
    }
}

/// Stops a running sweep from another thread.
///
/// Pairs that already started still finish and are kept; no further pair is
/// scheduled.
#[derive(Debug, Clone)]
pub struct AbortHandle(Arc<AtomicBool>);

impl AbortHandle {
    pub fn abort(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    pub fn is_aborted(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }
}

#[derive(Debug, Clone, Copy)]
struct Job {
    index: usize,
    loss_frequency: f64,
    algorithm: CongestionControlAlgorithm,
}

type JobOutput = (usize, Result<SweepRun, ConfigError>);

/// Runs every `(loss_frequency, variant)` pair of a [`SweepConfig`].
#[derive(Debug)]
pub struct ExperimentSweep {
    config: SweepConfig,
    abort: Arc<AtomicBool>,
}

impl ExperimentSweep {
    pub fn new(mut config: SweepConfig) -> Result<Self, ConfigError> {
        config.validate()?;
        config.variants.sort();
        config.variants.dedup();
        Ok(Self {
            config,
            abort: Arc::new(AtomicBool::new(false)),
        })
    }

    pub fn config(&self) -> &SweepConfig {
        &self.config
    }

    pub fn abort_handle(&self) -> AbortHandle {
        AbortHandle(self.abort.clone())
    }

    fn is_aborted(&self) -> bool {
        self.abort.load(Ordering::SeqCst)
    }

    fn jobs(&self) -> Vec<Job> {
        self.config
            .range
            .values()
            .into_iter()
            .flat_map(|loss_frequency| {
                self.config
                    .variants
                    .iter()
                    .map(move |algorithm| (loss_frequency, *algorithm))
            })
            .enumerate()
            .map(|(index, (loss_frequency, algorithm))| Job {
                index,
                loss_frequency,
                algorithm,
            })
            .collect()
    }

    fn run_job(&self, job: &Job) -> Result<SweepRun, ConfigError> {
        let flow = Flow::new(
            self.config.data_rate,
            self.config.controller.for_algorithm(job.algorithm),
            LossPolicy::modulo_time(job.loss_frequency),
            self.config.termination,
        )?;
        let report = flow.run()?;
        tracing::debug!(
            variant = %job.algorithm,
            loss_frequency = job.loss_frequency,
            lost = report.state.packets_lost,
            "Sweep pair finished"
        );
        Ok(SweepRun {
            loss_frequency: job.loss_frequency,
            report,
        })
    }

    /// Runs the sweep and returns every finished pair in canonical order.
    pub fn run(&self) -> Result<SweepResult, ConfigError> {
        let jobs = self.jobs();
        let total = jobs.len();
        tracing::info!(
            pairs = total,
            workers = self.config.workers,
            range = ?self.config.range,
            "Starting loss-frequency sweep"
        );

        let mut outputs = if self.config.workers == 1 || total <= 1 {
            self.run_sequential(jobs)
        } else {
            self.run_parallel(jobs)
        };
        outputs.sort_by_key(|(index, _)| *index);

        let mut result = SweepResult {
            aborted: outputs.len() < total,
            ..Default::default()
        };
        for (_, output) in outputs {
            let run = output?;
            result.records.push(SweepRecord {
                loss_frequency: run.loss_frequency,
                algorithm: run.report.algorithm,
                metrics: run.report.metrics(),
            });
            result.runs.push(run);
        }

        if result.aborted {
            tracing::warn!(
                finished = result.len(),
                pairs = total,
                "Sweep aborted before all pairs ran"
            );
        } else {
            tracing::info!(records = result.len(), "Sweep finished");
        }
        Ok(result)
    }

    fn run_sequential(&self, jobs: Vec<Job>) -> Vec<JobOutput> {
        let mut outputs = Vec::with_capacity(jobs.len());
        for job in jobs {
            if self.is_aborted() {
                break;
            }
            outputs.push((job.index, self.run_job(&job)));
        }
        outputs
    }

    fn run_parallel(&self, jobs: Vec<Job>) -> Vec<JobOutput> {
        let workers = self.config.workers.min(jobs.len());
        let collector: Mutex<Vec<JobOutput>> = Mutex::new(Vec::with_capacity(jobs.len()));
        let (tx, rx) = crossbeam::channel::unbounded();
        for job in jobs {
            // the receiver is alive for the whole function
            let _ = tx.send(job);
        }
        drop(tx);

        let scoped = crossbeam::scope(|scope| {
            for _ in 0..workers {
                let rx = rx.clone();
                let collector = &collector;
                scope.spawn(move |_| {
                    while let Ok(job) = rx.recv() {
                        if self.is_aborted() {
                            break;
                        }
                        let output = self.run_job(&job);
                        collector.lock().push((job.index, output));
                    }
                });
            }
        });
        if let Err(panic) = scoped {
            std::panic::resume_unwind(panic);
        }
        collector.into_inner()
    }
}

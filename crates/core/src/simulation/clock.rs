//! Simulated time and the tick clock driving a flow.
//!
//! This module provides:
//! - `SimulationTime`, the non-negative simulated clock value
//! - `Termination`, the stop conditions of one run
//! - `Clock`, a lazy, finite iterator of fixed-size ticks

use std::{fmt, iter::FusedIterator};

use serde::{Deserialize, Serialize};

use crate::config::ConfigError;

/// A point on the simulated timeline, in simulated seconds.
///
/// Time is produced by repeatedly adding the tick step to the previous value,
/// so two clocks with the same step visit exactly the same floating point
/// values. Loss policies that test for multiples of a period rely on that.
#[derive(Debug, Clone, Copy, Default, PartialEq, PartialOrd, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SimulationTime(f64);

impl SimulationTime {
    pub const ZERO: Self = Self(0.0);

    pub fn from_secs(secs: f64) -> Self {
        Self(secs)
    }

    pub fn as_secs(self) -> f64 {
        self.0
    }

    pub fn is_zero(self) -> bool {
        self.0 == 0.0
    }

    /// Returns the time one step later.
    pub fn advance(self, step: f64) -> Self {
        Self(self.0 + step)
    }

    /// Returns the elapsed time since `earlier`.
    pub fn since(self, earlier: Self) -> f64 {
        self.0 - earlier.0
    }

    /// Whether this time is a positive multiple of `period`.
    ///
    /// Zero is never a multiple: a run must not see a loss before its first tick.
    pub fn is_multiple_of(self, period: f64) -> bool {
        self.0 > 0.0 && self.0 % period == 0.0
    }
}

impl fmt::Display for SimulationTime {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Stop conditions for a single run.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Termination {
    /// Simulated-time limit. Ticks landing at or past it are never processed.
    pub horizon: f64,
    /// Stop drawing ticks once this many losses were observed.
    pub max_losses: Option<u64>,
}

impl Termination {
    pub const DEFAULT_HORIZON: f64 = 50.0;

    pub fn horizon(horizon: f64) -> Self {
        Self {
            horizon,
            max_losses: None,
        }
    }

    pub fn with_max_losses(mut self, max_losses: u64) -> Self {
        self.max_losses = Some(max_losses);
        self
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if !self.horizon.is_finite() || self.horizon <= 0.0 {
            return Err(ConfigError::InvalidHorizon(self.horizon));
        }
        if self.max_losses == Some(0) {
            return Err(ConfigError::ZeroLossBound);
        }
        Ok(())
    }

    /// Whether a run that observed `losses` losses must stop.
    pub fn loss_bound_reached(&self, losses: u64) -> bool {
        self.max_losses.is_some_and(|bound| losses >= bound)
    }
}

impl Default for Termination {
    fn default() -> Self {
        Self::horizon(Self::DEFAULT_HORIZON)
    }
}

/// One discrete simulation step.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Tick {
    /// 1-based tick number within the run.
    pub index: u64,
    /// Time at which the tick fires.
    pub time: SimulationTime,
    /// Duration of the step that led to this tick.
    pub step: f64,
}

/// Fixed-step clock for one flow.
///
/// Iterating the clock yields ticks at `step, 2*step, ...` while they stay
/// strictly below the horizon. Once exhausted it keeps returning `None`; a
/// clock cannot be rewound.
#[derive(Debug, Clone)]
pub struct Clock {
    step: f64,
    now: SimulationTime,
    horizon: SimulationTime,
    ticks: u64,
}

impl Clock {
    /// Upper bound on the number of ticks in one run.
    ///
    /// Far below 2^53, so adding the step always moves the clock forward.
    pub const MAX_TICKS: f64 = 1e8;

    /// Creates a clock ticking `data_rate` times per simulated second.
    pub fn new(data_rate: f64, horizon: f64) -> Result<Self, ConfigError> {
        Self::validate(data_rate, horizon)?;
        Ok(Self {
            step: 1.0 / data_rate,
            now: SimulationTime::ZERO,
            horizon: SimulationTime::from_secs(horizon),
            ticks: 0,
        })
    }

    /// Checks the parameters of a clock without building it.
    pub fn validate(data_rate: f64, horizon: f64) -> Result<(), ConfigError> {
        if !data_rate.is_finite() || data_rate <= 0.0 {
            return Err(ConfigError::InvalidDataRate(data_rate));
        }
        if !horizon.is_finite() || horizon <= 0.0 {
            return Err(ConfigError::InvalidHorizon(horizon));
        }
        let ticks = horizon * data_rate;
        if !ticks.is_finite() || ticks > Self::MAX_TICKS {
            return Err(ConfigError::TooManyTicks(ticks));
        }
        Ok(())
    }

    pub fn step(&self) -> f64 {
        self.step
    }

    /// Time of the last tick drawn, zero before the first one.
    pub fn now(&self) -> SimulationTime {
        self.now
    }

    pub fn horizon(&self) -> SimulationTime {
        self.horizon
    }

    pub fn ticks_elapsed(&self) -> u64 {
        self.ticks
    }

    /// Whether another tick would still land before the horizon.
    pub fn has_next(&self) -> bool {
        self.now.advance(self.step) < self.horizon
    }
}

impl Iterator for Clock {
    type Item = Tick;

    fn next(&mut self) -> Option<Tick> {
        let next = self.now.advance(self.step);
        if next >= self.horizon {
            return None;
        }
        self.now = next;
        self.ticks += 1;
        Some(Tick {
            index: self.ticks,
            time: next,
            step: self.step,
        })
    }
}

impl FusedIterator for Clock {}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_unit_rate_ticks_stop_before_horizon() {
        let clock = Clock::new(1.0, 50.0).unwrap();
        let times: Vec<f64> = clock.map(|t| t.time.as_secs()).collect();
        assert_eq!(times.len(), 49);
        assert_eq!(times.first(), Some(&1.0));
        assert_eq!(times.last(), Some(&49.0));
    }

    #[test]
    fn test_time_strictly_increases_by_step() {
        let clock = Clock::new(4.0, 10.0).unwrap();
        let ticks: Vec<Tick> = clock.collect();
        for pair in ticks.windows(2) {
            assert!(pair[1].time > pair[0].time);
            assert_eq!(pair[1].index, pair[0].index + 1);
            assert!((pair[1].time.since(pair[0].time) - 0.25).abs() < 1e-9);
        }
    }

    #[test]
    fn test_exhausted_clock_stays_exhausted() {
        let mut clock = Clock::new(1.0, 3.0).unwrap();
        assert_eq!(clock.by_ref().count(), 2);
        assert!(clock.next().is_none());
        assert!(clock.next().is_none());
        assert_eq!(clock.ticks_elapsed(), 2);
        assert_eq!(clock.now(), SimulationTime::from_secs(2.0));
        assert!(!clock.has_next());
    }

    #[test]
    fn test_horizon_shorter_than_step_yields_nothing() {
        let mut clock = Clock::new(1.0, 0.5).unwrap();
        assert!(clock.next().is_none());
        assert!(clock.now().is_zero());
    }

    #[test]
    fn test_invalid_clock_parameters() {
        assert!(matches!(
            Clock::new(0.0, 10.0),
            Err(ConfigError::InvalidDataRate(_))
        ));
        assert!(matches!(
            Clock::new(-2.0, 10.0),
            Err(ConfigError::InvalidDataRate(_))
        ));
        assert!(matches!(
            Clock::new(f64::NAN, 10.0),
            Err(ConfigError::InvalidDataRate(_))
        ));
        assert!(matches!(
            Clock::new(1.0, 0.0),
            Err(ConfigError::InvalidHorizon(_))
        ));
    }

    #[test]
    fn test_oversized_run_rejected() {
        assert!(matches!(
            Clock::new(1e20, 1.0),
            Err(ConfigError::TooManyTicks(_))
        ));
        assert!(matches!(
            Clock::new(f64::MAX, 10.0),
            Err(ConfigError::TooManyTicks(ticks)) if ticks.is_infinite()
        ));
        assert!(matches!(
            Clock::validate(1e6, 1e3),
            Err(ConfigError::TooManyTicks(_))
        ));
        assert!(Clock::validate(1e4, 1e4).is_ok());
    }

    #[test]
    fn test_multiple_of_excludes_zero() {
        assert!(!SimulationTime::ZERO.is_multiple_of(5.0));
        assert!(SimulationTime::from_secs(10.0).is_multiple_of(5.0));
        assert!(!SimulationTime::from_secs(12.0).is_multiple_of(5.0));
        assert!(SimulationTime::from_secs(3.0).is_multiple_of(1.5));
    }

    #[test]
    fn test_termination_validation() {
        assert!(Termination::default().validate().is_ok());
        assert!(matches!(
            Termination::horizon(-1.0).validate(),
            Err(ConfigError::InvalidHorizon(_))
        ));
        assert!(matches!(
            Termination::default().with_max_losses(0).validate(),
            Err(ConfigError::ZeroLossBound)
        ));
    }

    #[test]
    fn test_loss_bound() {
        let unbounded = Termination::default();
        assert!(!unbounded.loss_bound_reached(1_000));

        let bounded = Termination::default().with_max_losses(6);
        assert!(!bounded.loss_bound_reached(5));
        assert!(bounded.loss_bound_reached(6));
    }
}

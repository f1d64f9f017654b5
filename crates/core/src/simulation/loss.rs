//! Loss injection policies.
//!
//! A policy decides, once per tick, whether the tick is a loss event. The
//! decision only looks at the tick and the cumulative send count, so the same
//! inputs always yield the same answer.
//!
//! The modulo rules are deliberately crude: depending on the step size and on
//! how the window grows they can fire on every tick or never at all. Comparing
//! controllers requires every run to use exactly the same rule, so they are
//! kept as they are.

use serde::{Deserialize, Serialize};

use super::clock::Tick;
use super::rng::SimulationRng;
use crate::config::ConfigError;

/// Loss trigger applied to every tick of a flow.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "policy", rename_all = "kebab-case")]
pub enum LossPolicy {
    /// Loss whenever the cumulative number of sent packets is a positive
    /// multiple of `every`.
    ModuloCount { every: u64 },
    /// Loss whenever the tick time is a positive multiple of `frequency`.
    ModuloTime { frequency: f64 },
    /// Loss with a fixed probability per tick, decided by a generator derived
    /// from `seed` and the tick index.
    Random { probability: f64, seed: u64 },
    /// No loss at all.
    Never,
}

impl Default for LossPolicy {
    fn default() -> Self {
        Self::ModuloCount {
            every: Self::DEFAULT_PACKET_MODULUS,
        }
    }
}

impl LossPolicy {
    /// Every 10th sent packet is lost by default.
    pub const DEFAULT_PACKET_MODULUS: u64 = 10;

    pub fn modulo_count(every: u64) -> Self {
        Self::ModuloCount { every }
    }

    pub fn modulo_time(frequency: f64) -> Self {
        Self::ModuloTime { frequency }
    }

    pub fn random(probability: f64, seed: u64) -> Self {
        Self::Random { probability, seed }
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        match *self {
            Self::ModuloCount { every } if every == 0 => Err(ConfigError::ZeroLossModulus),
            Self::ModuloTime { frequency } if !frequency.is_finite() || frequency <= 0.0 => {
                Err(ConfigError::InvalidLossFrequency(frequency))
            }
            Self::Random { probability, .. } if !(0.0..=1.0).contains(&probability) => {
                Err(ConfigError::InvalidLossProbability(probability))
            }
            _ => Ok(()),
        }
    }

    /// Returns true if `tick` is a loss event given the cumulative send count
    /// including the packets sent on this tick.
    pub fn is_loss(&self, tick: &Tick, packets_sent: u64) -> bool {
        match *self {
            Self::ModuloCount { every } => packets_sent > 0 && packets_sent % every == 0,
            Self::ModuloTime { frequency } => tick.time.is_multiple_of(frequency),
            Self::Random { probability, seed } => {
                probability > 0.0 && SimulationRng::for_tick(seed, tick.index).gen_bool(probability)
            }
            Self::Never => false,
        }
    }
}

impl std::fmt::Display for LossPolicy {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::ModuloCount { every } => write!(f, "every {every} packets"),
            Self::ModuloTime { frequency } => write!(f, "every {frequency} time units"),
            Self::Random { probability, seed } => write!(f, "p={probability} (seed {seed})"),
            Self::Never => write!(f, "never"),
        }
    }
}

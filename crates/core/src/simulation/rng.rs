//! Seeded random number generation for deterministic loss decisions.
//!
//! Every random decision in a run is derived from the run seed and the tick
//! index, never from shared generator state. Replaying a tick therefore
//! reproduces the same decision regardless of which worker ran it or in which
//! order the runs of a sweep were scheduled.

use rand::{rngs::SmallRng, Rng, SeedableRng};

/// Multiplier used to spread consecutive indices across the seed space.
const SEED_MIX: u64 = 0x517c_c1b7_2722_0a95;

/// A seeded random number generator owned by a single decision site.
pub struct SimulationRng {
    inner: SmallRng,
    seed: u64,
}

impl SimulationRng {
    /// Creates a new simulation RNG with the given seed.
    pub fn new(seed: u64) -> Self {
        Self {
            inner: SmallRng::seed_from_u64(seed),
            seed,
        }
    }

    /// Creates the generator dedicated to tick `index` of a run seeded with `seed`.
    pub fn for_tick(seed: u64, index: u64) -> Self {
        Self::new(seed.wrapping_mul(SEED_MIX).wrapping_add(index))
    }

    /// Generates a random boolean with the given probability of being true.
    pub fn gen_bool(&mut self, probability: f64) -> bool {
        self.inner.random_bool(probability)
    }
}

impl std::fmt::Debug for SimulationRng {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SimulationRng")
            .field("seed", &self.seed)
            .finish()
    }
}

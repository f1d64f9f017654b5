//! Discrete-time simulation primitives.
//!
//! - **Clock**: fixed-step simulated time, the only driver of a run
//! - **LossPolicy**: per-tick loss decisions
//! - **SimulationRng**: seeded randomness derived per tick
//!
//! A run is single-threaded cooperative stepping: each tick is fully processed
//! (loss decision, controller transition, recording) before the next one is
//! drawn. Nothing here touches wall-clock time.

mod clock;
mod loss;
mod rng;

pub use clock::{Clock, SimulationTime, Termination, Tick};
pub use loss::LossPolicy;
pub use rng::SimulationRng;

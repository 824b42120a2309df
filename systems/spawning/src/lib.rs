#![deny(
    unsafe_code,
    missing_docs,
    dead_code,
    unused_results,
    non_snake_case,
    unreachable_pub
)]

//! Deterministic spawning system deciding what each spawn tick does.
//!
//! The system is pure apart from its seeded random stream: it receives the
//! entity's spawn mode, the visual currently alive for it and the placement
//! bounds, and answers with a [`SpawnPlan`] the session carries out.

use pounce_core::{Bounds, Position, SpawnMode, VisualHandle};
use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;
use tracing::trace;

/// Configuration parameters required to construct the spawning system.
#[derive(Clone, Copy, Debug)]
pub struct Config {
    rng_seed: u64,
}

impl Config {
    /// Creates a new configuration using the provided seed.
    #[must_use]
    pub const fn new(rng_seed: u64) -> Self {
        Self { rng_seed }
    }
}

/// Work requested by a single spawn tick.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct SpawnPlan {
    /// Live instance that must be removed before anything is placed.
    pub remove: Option<VisualHandle>,
    /// Position of the new instance, if one should be placed.
    pub place: Option<Position>,
}

impl SpawnPlan {
    /// Reports whether the tick leaves the play area untouched.
    #[must_use]
    pub fn is_idle(&self) -> bool {
        self.remove.is_none() && self.place.is_none()
    }
}

/// Spawning system owning the random stream used for gating and placement.
#[derive(Debug)]
pub struct Spawning {
    rng: ChaCha8Rng,
}

impl Spawning {
    /// Creates a new spawning system using the supplied configuration.
    #[must_use]
    pub fn new(config: Config) -> Self {
        Self {
            rng: ChaCha8Rng::seed_from_u64(config.rng_seed),
        }
    }

    /// Decides what a spawn tick does for one entity.
    ///
    /// The presence check always happens before the probability draw, so an
    /// exclusive entity that is already on screen consumes no randomness.
    pub fn plan(
        &mut self,
        mode: SpawnMode,
        live: Option<VisualHandle>,
        probability: f64,
        bounds: Bounds,
    ) -> SpawnPlan {
        let remove = match mode {
            SpawnMode::Exclusive => {
                if live.is_some() {
                    return SpawnPlan::default();
                }
                None
            }
            SpawnMode::Replacing => live,
        };

        if !self.passes_gate(probability) {
            trace!(?mode, probability, "spawn gated");
            return SpawnPlan {
                remove,
                place: None,
            };
        }

        SpawnPlan {
            remove,
            place: Some(self.position_within(bounds)),
        }
    }

    fn passes_gate(&mut self, probability: f64) -> bool {
        let draw: f64 = self.rng.gen();
        draw < probability
    }

    fn position_within(&mut self, bounds: Bounds) -> Position {
        let x = sample_axis(&mut self.rng, bounds.min_x, bounds.max_x);
        let y = sample_axis(&mut self.rng, bounds.min_y, bounds.max_y);
        Position::new(x, y)
    }
}

fn sample_axis(rng: &mut ChaCha8Rng, min: f32, max: f32) -> f32 {
    if max > min {
        rng.gen_range(min..max)
    } else {
        min
    }
}

//! Randomness used for decision tie-breaking.
use rand::rngs::SmallRng;
use rand::{Rng, SeedableRng};

/// A small seedable PRNG used for `random_var_freq`/`random_pol_freq` decisions.
///
/// Kept separate from `std`'s thread-local RNG so runs with the same seed are reproducible,
/// which matters for debugging and for the proptest suite.
pub struct Random {
    rng: SmallRng,
}

impl Default for Random {
    fn default() -> Random {
        Random {
            rng: SmallRng::seed_from_u64(0),
        }
    }
}

impl Random {
    /// Reseed the generator.
    pub fn seed(&mut self, seed: u64) {
        self.rng = SmallRng::seed_from_u64(seed);
    }

    /// Sample a `f32` in `[0, 1)`.
    pub fn ratio(&mut self) -> f32 {
        self.rng.gen::<f32>()
    }

    /// Sample a `bool`.
    pub fn bool(&mut self) -> bool {
        self.rng.gen::<bool>()
    }

    /// Sample an index in `0..bound`.
    ///
    /// Panics if `bound` is zero.
    pub fn below(&mut self, bound: usize) -> usize {
        self.rng.gen_range(0, bound)
    }
}

//! Deterministic random number generation.
//!
//! The kernel itself is RNG-free: for a fixed input script the history is
//! byte-identical across runs. Randomness enters exactly once, when a prefab
//! is built into a game and the role deck is shuffled. `GameRng` keeps that
//! step reproducible from a seed.

use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;

/// Deterministic seeded RNG.
///
/// Uses ChaCha8 for speed while maintaining high-quality randomness.
/// The same seed always produces the same sequence.
#[derive(Clone, Debug)]
pub struct GameRng {
    inner: ChaCha8Rng,
    seed: u64,
}

impl GameRng {
    /// Create a new RNG with the given seed.
    #[must_use]
    pub fn new(seed: u64) -> Self {
        Self {
            inner: ChaCha8Rng::seed_from_u64(seed),
            seed,
        }
    }

    /// The seed this RNG was created with.
    #[must_use]
    pub fn seed(&self) -> u64 {
        self.seed
    }

    /// Shuffle a slice in place.
    pub fn shuffle<T>(&mut self, slice: &mut [T]) {
        use rand::seq::SliceRandom;
        slice.shuffle(&mut self.inner);
    }

    /// Choose a random element from a slice.
    #[must_use]
    pub fn choose<'a, T>(&mut self, slice: &'a [T]) -> Option<&'a T> {
        use rand::seq::SliceRandom;
        slice.choose(&mut self.inner)
    }
}

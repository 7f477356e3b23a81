//! Seeded random source for the simulation.
//!
//! The simulation owns exactly one [`GameRng`], seeded once per session from
//! the two session seeds. All randomness consumed by kernel code or by
//! registered traits must go through it; an ambient source would desync peers.
//!
//! Every draw pulls one `u32` from the underlying ChaCha stream and records it
//! as [`GameRng::last_value`], which is folded into the state hash.

use rand::{RngCore, SeedableRng};
use rand_chacha::ChaCha8Rng;
use serde::{Deserialize, Serialize};

/// The two values a session is seeded from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub struct GameSeeds {
    /// Per-game seed, usually chosen by the host.
    pub game: u64,
    /// Map seed.
    pub map: u64,
}

impl GameSeeds {
    /// Creates a seed pair.
    #[must_use]
    pub const fn new(game: u64, map: u64) -> Self {
        Self { game, map }
    }

    fn to_chacha_seed(self) -> [u8; 32] {
        let mut seed = [0u8; 32];
        seed[0..8].copy_from_slice(&self.game.to_le_bytes());
        seed[8..16].copy_from_slice(&self.map.to_le_bytes());
        seed[16..24].copy_from_slice(&(self.game.rotate_left(29) ^ self.map).to_le_bytes());
        seed[24..32].copy_from_slice(&(self.map.rotate_left(17) ^ !self.game).to_le_bytes());
        seed
    }
}

/// Deterministic pseudo-random source.
#[derive(Debug, Clone)]
pub struct GameRng {
    inner: ChaCha8Rng,
    seeds: GameSeeds,
    last: u32,
}

impl GameRng {
    /// Creates a generator from the session seeds.
    #[must_use]
    pub fn new(seeds: GameSeeds) -> Self {
        Self {
            inner: ChaCha8Rng::from_seed(seeds.to_chacha_seed()),
            seeds,
            last: 0,
        }
    }

    /// Returns the seeds this generator was created from.
    #[must_use]
    pub const fn seeds(&self) -> GameSeeds {
        self.seeds
    }

    /// Returns a float in `[0, 1)`.
    ///
    /// Built from a single `u32` draw divided by 2^32, which is exact in `f64`
    /// and therefore identical on every platform.
    pub fn next(&mut self) -> f64 {
        self.last = self.inner.next_u32();
        f64::from(self.last) / 4_294_967_296.0
    }

    /// Returns an integer in `[min, max]` (both inclusive).
    ///
    /// If `max < min` the bounds are swapped.
    pub fn next_int(&mut self, min: i32, max: i32) -> i32 {
        let (lo, hi) = if max < min { (max, min) } else { (min, max) };
        let span = i64::from(hi) - i64::from(lo) + 1;
        #[allow(clippy::cast_possible_truncation, clippy::cast_precision_loss)]
        let offset = (self.next() * span as f64) as i64;
        #[allow(clippy::cast_possible_truncation)]
        let value = (i64::from(lo) + offset) as i32;
        value
    }

    /// Returns the raw value of the most recent draw (0 before any draw).
    #[must_use]
    pub const fn last_value(&self) -> u32 {
        self.last
    }
}

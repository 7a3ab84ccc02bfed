//! Seeded random number generation.
//!
//! Packing runs must be reproducible from a single integer seed, so the
//! optimizer draws every random decision from [`XorShift`], a Marsaglia
//! xorshift128 generator that plugs into `rand` through [`RngCore`].

use rand::{Error as RandError, Rng, RngCore, SeedableRng};
use std::f64::consts::TAU;

/// Marsaglia xorshift128 generator seeded from a 32-bit value.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct XorShift {
    x: u32,
    y: u32,
    z: u32,
    w: u32,
}

impl XorShift {
    /// Creates a generator from a seed.
    ///
    /// The state words are derived from `seed + 1`. The one seed that would
    /// wrap to an all-zero state (`u32::MAX`) is mapped onto seed `0`.
    pub fn new(seed: u32) -> Self {
        let w = seed.wrapping_add(1).max(1);
        let x = w.wrapping_shl(13);
        let y = (w >> 9) ^ x.wrapping_shl(6);
        let z = y >> 7;
        Self { x, y, z, w }
    }

    /// Advances the generator and returns the next 32-bit word.
    #[inline]
    pub fn next_word(&mut self) -> u32 {
        let t = self.x ^ self.x.wrapping_shl(11);
        self.x = self.y;
        self.y = self.z;
        self.z = self.w;
        self.w = (self.w ^ (self.w >> 19)) ^ (t ^ (t >> 8));
        self.w
    }
}

impl RngCore for XorShift {
    fn next_u32(&mut self) -> u32 {
        self.next_word()
    }

    fn next_u64(&mut self) -> u64 {
        let hi = self.next_word() as u64;
        let lo = self.next_word() as u64;
        (hi << 32) | lo
    }

    fn fill_bytes(&mut self, dest: &mut [u8]) {
        for chunk in dest.chunks_mut(4) {
            let bytes = self.next_word().to_le_bytes();
            chunk.copy_from_slice(&bytes[..chunk.len()]);
        }
    }

    fn try_fill_bytes(&mut self, dest: &mut [u8]) -> std::result::Result<(), RandError> {
        self.fill_bytes(dest);
        Ok(())
    }
}

impl SeedableRng for XorShift {
    type Seed = [u8; 4];

    fn from_seed(seed: Self::Seed) -> Self {
        Self::new(u32::from_le_bytes(seed))
    }
}

/// Draws a normally distributed value with the Box-Muller transform.
///
/// The first uniform sample is taken from `(0, 1]` so the logarithm stays finite.
pub fn gaussian<R: Rng + ?Sized>(rng: &mut R, mean: f64, sigma: f64) -> f64 {
    let u1 = 1.0 - rng.gen::<f64>();
    let u2 = rng.gen::<f64>();
    let standard = (-2.0 * u1.ln()).sqrt() * (TAU * u2).sin();
    mean + sigma * standard
}

//! Deterministic PRNG for spawning decisions (group size, variant, dish,
//! patience).
//!
//! Uses the SplitMix64 algorithm: fast, 8 bytes of state, and trivially
//! serializable so a restored snapshot continues the same sequence.

use crate::fixed::Fixed64;

/// SplitMix64 pseudo-random number generator.
#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct SimRng {
    state: u64,
}

impl SimRng {
    /// Create a new RNG with the given seed.
    pub fn new(seed: u64) -> Self {
        Self { state: seed }
    }

    /// Generate the next `u64` in the sequence.
    pub fn next_u64(&mut self) -> u64 {
        self.state = self.state.wrapping_add(0x9E37_79B9_7F4A_7C15);
        let mut z = self.state;
        z = (z ^ (z >> 30)).wrapping_mul(0xBF58_476D_1CE4_E5B9);
        z = (z ^ (z >> 27)).wrapping_mul(0x94D0_49BB_1331_11EB);
        z ^ (z >> 31)
    }

    /// A uniform fraction in `[0, 1)`.
    pub fn unit(&mut self) -> Fixed64 {
        // The upper 32 bits become the fractional bits of a Q32.32 value.
        Fixed64::from_bits((self.next_u64() >> 32) as i64)
    }

    /// A uniform value in `[lo, hi)`. Returns `lo` when the range is empty.
    pub fn range(&mut self, lo: Fixed64, hi: Fixed64) -> Fixed64 {
        if hi <= lo {
            return lo;
        }
        lo + (hi - lo) * self.unit()
    }

    /// A uniform index in `0..len`. `len` of 0 yields 0.
    pub fn index(&mut self, len: usize) -> usize {
        if len == 0 {
            return 0;
        }
        (self.next_u64() % len as u64) as usize
    }

    /// Pick an index with probability proportional to its weight.
    ///
    /// Returns `None` if the slice is empty or all weights are zero.
    pub fn weighted_index(&mut self, weights: &[u32]) -> Option<usize> {
        let total: u64 = weights.iter().map(|&w| w as u64).sum();
        if total == 0 {
            return None;
        }
        let mut roll = self.next_u64() % total;
        for (i, &w) in weights.iter().enumerate() {
            if roll < w as u64 {
                return Some(i);
            }
            roll -= w as u64;
        }
        None
    }

    /// Get the internal state (for hashing/serialization).
    pub fn state(&self) -> u64 {
        self.state
    }
}

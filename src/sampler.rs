//! Per-decision pseudo-random generator.
//!
//! [`Prg`] is a 64-bit linear congruential generator (`merand48`). It is created fresh from the
//! salted seed for every decision and is never shared between calls. The exact sequence is a
//! compatibility surface with external evaluators replaying logged decisions, so neither the
//! constants nor the bit extraction may change.
use rand::{RngCore, SeedableRng};

const MULTIPLIER: u64 = 0xeece_66d5_deec_e66d;
const INCREMENT: u64 = 2_147_483_647;
const EXPONENT_BIAS: u32 = 127 << 23;
const MANTISSA_MASK: u64 = 0x7f_ffff;

/// Deterministic pseudo-random generator seeded per decision.
#[derive(Debug, Clone)]
pub struct Prg {
    state: u64,
}

impl Prg {
    /// Create a generator from a salted seed.
    pub fn new(seed: u64) -> Prg {
        Prg { state: seed }
    }

    fn advance(&mut self) -> u64 {
        self.state = MULTIPLIER.wrapping_mul(self.state).wrapping_add(INCREMENT);
        self.state
    }

    /// Draw a value uniformly from `[0, 1)`.
    ///
    /// The value has 23 bits of precision: it is built as an `f32` in `[1, 2)` and shifted down,
    /// which is exact.
    pub fn uniform_unit_interval(&mut self) -> f64 {
        let bits = ((self.advance() >> 25) & MANTISSA_MASK) as u32 | EXPONENT_BIAS;
        f64::from(f32::from_bits(bits) - 1.0)
    }

    /// Draw an integer uniformly from `[low, high]` (inclusive).
    ///
    /// `low` must not exceed `high`.
    pub fn uniform_int(&mut self, low: u32, high: u32) -> u32 {
        debug_assert!(low <= high);
        let span = u64::from(high - low) + 1;
        // The remainder is below `span`, which fits in u32.
        low + ((self.advance() >> 25) % span) as u32
    }

    /// Sample an index from a normalized probability mass function with a single unit draw.
    ///
    /// Returns the first index whose cumulative mass exceeds the draw. If rounding leaves the
    /// cumulative sum at or below the draw, the last index with positive mass is returned. Returns
    /// `None` only if no index has positive mass.
    pub fn sample_pmf(&mut self, pmf: &[f64]) -> Option<usize> {
        let draw = self.uniform_unit_interval();
        let mut cumulative = 0.0;
        pmf.iter()
            .position(|&p| {
                cumulative += p;
                p > 0.0 && cumulative > draw
            })
            .or_else(|| pmf.iter().rposition(|&p| p > 0.0))
    }
}

impl RngCore for Prg {
    fn next_u32(&mut self) -> u32 {
        (self.advance() >> 32) as u32
    }

    fn next_u64(&mut self) -> u64 {
        let high = u64::from(self.next_u32());
        let low = u64::from(self.next_u32());
        (high << 32) | low
    }

    fn fill_bytes(&mut self, dest: &mut [u8]) {
        for chunk in dest.chunks_mut(4) {
            let bytes = self.next_u32().to_le_bytes();
            chunk.copy_from_slice(&bytes[..chunk.len()]);
        }
    }

    fn try_fill_bytes(&mut self, dest: &mut [u8]) -> Result<(), rand::Error> {
        self.fill_bytes(dest);
        Ok(())
    }
}

impl SeedableRng for Prg {
    type Seed = [u8; 8];

    fn from_seed(seed: Self::Seed) -> Self {
        Prg::new(u64::from_le_bytes(seed))
    }

    // Salted seeds are already well mixed; use them verbatim.
    fn seed_from_u64(state: u64) -> Self {
        Prg::new(state)
    }
}

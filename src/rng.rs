//! Deterministic RNG for scheduling decisions (victim selection).
//!
//! XorShift64 is plenty here: we pick steal victims from a handful of
//! workers, not run Monte Carlo. Determinism matters more than quality —
//! same seed, same victim sequence, reproducible steal patterns.
//!
//! Bounded sampling uses Lemire's multiply-high method (no division) with a
//! bitmask fast path for power-of-two bounds.

/// Deterministic RNG for scheduling decisions.
///
/// Not thread-safe; each worker owns one, forked from the pool's master
/// seed. Intentionally not `Copy` — duplicating the stream makes two
/// workers take identical "random" decisions.
#[derive(Clone, Debug)]
pub struct XorShift64 {
    state: u64,
}

impl XorShift64 {
    /// Create a new RNG. Seed 0 is remapped to avoid the all-zero lockup
    /// state.
    #[inline]
    pub fn new(seed: u64) -> Self {
        let seed = if seed == 0 { 0x9E3779B97F4A7C15 } else { seed };
        Self { state: seed }
    }

    /// Next value of the xorshift sequence (Marsaglia's 13/7/17 variant,
    /// full period 2^64 - 1).
    #[inline]
    pub fn next_u64(&mut self) -> u64 {
        let mut x = self.state;
        x ^= x << 13;
        x ^= x >> 7;
        x ^= x << 17;
        self.state = x;
        x
    }

    /// Uniform value in `[0, upper)`.
    ///
    /// # Panics
    /// Panics in debug builds if `upper` is 0.
    #[inline]
    pub fn next_usize(&mut self, upper: usize) -> usize {
        debug_assert!(upper > 0, "upper bound must be > 0");

        if upper.is_power_of_two() {
            return (self.next_u64() as usize) & (upper - 1);
        }

        // Lemire's nearly-divisionless bounded sampling. Rejection keeps the
        // result unbiased; rejection probability is upper / 2^64.
        let upper = upper as u64;
        let threshold = upper.wrapping_neg() % upper;
        loop {
            let m = (self.next_u64() as u128) * (upper as u128);
            if m as u64 >= threshold {
                return (m >> 64) as usize;
            }
        }
    }

    /// Derive an independent stream for a child worker.
    ///
    /// Mixes with splitmix64 so parent and child sequences stay
    /// uncorrelated.
    pub fn fork(&mut self) -> Self {
        Self::new(splitmix64(self.next_u64()))
    }
}

#[inline]
fn splitmix64(mut x: u64) -> u64 {
    x = x.wrapping_add(0x9E3779B97F4A7C15);
    x = (x ^ (x >> 30)).wrapping_mul(0xBF58476D1CE4E5B9);
    x = (x ^ (x >> 27)).wrapping_mul(0x94D049BB133111EB);
    x ^ (x >> 31)
}

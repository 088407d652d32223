//! Seeded pseudo-random number generator
//!
//! Strategy scripts get their randomness (`Math.random()`) from here, so a
//! match replays identically for the same arena seed. Uses xorshift64*.

/// Seeded random number generator
///
/// Deterministic: same seed + match index = same sequence
#[derive(Clone, Debug)]
pub struct SeededRng {
    state: u64,
}

impl SeededRng {
    /// Create a new RNG for one match of an arena seeded with `seed`
    pub fn new(seed: u64, match_index: u32) -> Self {
        let mut state = seed ^ 0x6a09e667f3bcc908;
        state ^= (match_index as u64).wrapping_mul(0x517cc1b727220a95);
        // xorshift never leaves the all-zero state
        if state == 0 {
            state = 0x9e3779b97f4a7c15;
        }

        // Warm up the generator
        let mut rng = Self { state };
        for _ in 0..8 {
            rng.next_u64();
        }

        rng
    }

    /// Independent stream for one player's decision in one round.
    ///
    /// `slot` is 0 for player A and 1 for player B, so a strategy playing
    /// itself still draws from two separate streams.
    pub fn for_round(&self, round: u32, slot: u8) -> Self {
        let lane = ((round as u64) << 1) | (slot as u64 & 1);
        let mut new_state = self.state ^ lane.wrapping_add(1).wrapping_mul(0x9e3779b97f4a7c15);
        if new_state == 0 {
            new_state = 0x9e3779b97f4a7c15;
        }

        let mut rng = Self { state: new_state };
        rng.next_u64(); // Mix
        rng
    }

    /// Generate next u64
    pub fn next_u64(&mut self) -> u64 {
        // xorshift64*
        self.state ^= self.state >> 12;
        self.state ^= self.state << 25;
        self.state ^= self.state >> 27;
        self.state.wrapping_mul(0x2545f4914f6cdd1d)
    }

    /// Uniform float in [0, 1), 53 bits of precision
    pub fn next_f64(&mut self) -> f64 {
        (self.next_u64() >> 11) as f64 * (1.0 / (1u64 << 53) as f64)
    }
}

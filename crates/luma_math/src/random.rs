//! xoshiro256+ pseudo random number generator.
//!
//! Seeded through splitmix64 so that a single `u64` seed expands into the
//! 256 bit state. The same seed always reproduces the same sequence, which
//! is what keeps tile rendering deterministic per (seed, tile) pair.
//!
//! Reference: <https://prng.di.unimi.it/xoshiro256plus.c>

use rand::{Error, RngCore, SeedableRng};

const DEFAULT_SEED: u64 = 1234567890;

// Multipliers turning the top bits of a draw into a double
const CLOSED_CLOSED: f64 = 1.0 / 9007199254740991.0; // 1/(2^53 - 1)
const CLOSED_OPEN: f64 = 1.0 / 9007199254740992.0; // 1/2^53
const OPEN_OPEN: f64 = 1.0 / 4503599627370496.0; // 1/2^52

const JUMP: [u64; 4] = [
    0x180e_c6d3_3cfd_0aba,
    0xd5a6_1266_f0c9_392c,
    0xa958_2618_e03f_c9aa,
    0x39ab_dc45_29b1_661c,
];

const LONG_JUMP: [u64; 4] = [
    0x76e1_5d3e_fefd_cbbf,
    0xc500_4e44_1c52_2fb3,
    0x7771_0069_854e_e241,
    0x3910_9bb0_2acb_e635,
];

/// Deterministic generator passed explicitly to every sampling routine.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Random {
    s: [u64; 4],
}

#[inline]
fn splitmix64(x: &mut u64) -> u64 {
    *x = x.wrapping_add(0x9e37_79b9_7f4a_7c15);
    let mut z = *x;
    z = (z ^ (z >> 30)).wrapping_mul(0xbf58_476d_1ce4_e5b9);
    z = (z ^ (z >> 27)).wrapping_mul(0x94d0_49bb_1331_11eb);
    z ^ (z >> 31)
}

impl Random {
    /// Create a generator from a 64-bit seed.
    pub fn new(seed: u64) -> Self {
        let mut rng = Self { s: [0; 4] };
        rng.set_seed(seed);
        rng
    }

    /// Reseed in place.
    pub fn set_seed(&mut self, seed: u64) {
        let mut x = seed;
        for word in self.s.iter_mut() {
            *word = splitmix64(&mut x);
        }
    }

    /// Next raw 64-bit value.
    #[inline]
    pub fn next(&mut self) -> u64 {
        let s = &mut self.s;
        let result = s[0].wrapping_add(s[3]);
        let t = s[1] << 17;

        s[2] ^= s[0];
        s[3] ^= s[1];
        s[1] ^= s[2];
        s[0] ^= s[3];

        s[2] ^= t;
        s[3] = s[3].rotate_left(45);

        result
    }

    /// Uniform double in [0, 1].
    #[inline]
    pub fn next_f64_cc(&mut self) -> f64 {
        (self.next() >> 11) as f64 * CLOSED_CLOSED
    }

    /// Uniform double in [0, 1). This is the draw used by all sampling code.
    #[inline]
    pub fn next_f64_co(&mut self) -> f64 {
        (self.next() >> 11) as f64 * CLOSED_OPEN
    }

    /// Uniform double in (0, 1) on a 52-bit grid.
    #[inline]
    pub fn next_f64_oo(&mut self) -> f64 {
        (self.next() >> 12) as f64 * OPEN_OPEN
    }

    /// Uniform double in [-1, 1].
    #[inline]
    pub fn next_f64_signed_cc(&mut self) -> f64 {
        self.next_f64_cc() * 2.0 - 1.0
    }

    /// Uniform double in (-1, 1).
    #[inline]
    pub fn next_f64_signed_oo(&mut self) -> f64 {
        // Half a step off the [-1, 1) grid; every term is exact in this order
        self.next_f64_co() * 2.0 - 1.0 + CLOSED_OPEN
    }

    /// Advance the state by 2^128 draws. Used to hand out
    /// non-overlapping subsequences.
    pub fn jump(&mut self) {
        self.apply_polynomial(&JUMP);
    }

    /// Advance the state by 2^192 draws.
    pub fn long_jump(&mut self) {
        self.apply_polynomial(&LONG_JUMP);
    }

    fn apply_polynomial(&mut self, poly: &[u64; 4]) {
        let mut acc = [0u64; 4];
        for word in poly {
            for b in 0..64 {
                if word & (1u64 << b) != 0 {
                    for (a, s) in acc.iter_mut().zip(self.s.iter()) {
                        *a ^= *s;
                    }
                }
                self.next();
            }
        }
        self.s = acc;
    }
}

impl Default for Random {
    fn default() -> Self {
        Self::new(DEFAULT_SEED)
    }
}

impl RngCore for Random {
    fn next_u32(&mut self) -> u32 {
        (self.next() >> 32) as u32
    }

    fn next_u64(&mut self) -> u64 {
        self.next()
    }

    fn fill_bytes(&mut self, dest: &mut [u8]) {
        for chunk in dest.chunks_mut(8) {
            let bytes = self.next().to_le_bytes();
            chunk.copy_from_slice(&bytes[..chunk.len()]);
        }
    }

    fn try_fill_bytes(&mut self, dest: &mut [u8]) -> Result<(), Error> {
        self.fill_bytes(dest);
        Ok(())
    }
}

impl SeedableRng for Random {
    type Seed = [u8; 32];

    fn from_seed(seed: Self::Seed) -> Self {
        let mut s = [0u64; 4];
        for (word, bytes) in s.iter_mut().zip(seed.chunks_exact(8)) {
            let mut le = [0u8; 8];
            le.copy_from_slice(bytes);
            *word = u64::from_le_bytes(le);
        }
        // The all-zero state is a fixed point of the generator
        if s.iter().all(|&w| w == 0) {
            return Self::new(0);
        }
        Self { s }
    }

    fn seed_from_u64(state: u64) -> Self {
        Self::new(state)
    }
}

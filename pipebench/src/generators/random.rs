use rand::rngs::StdRng;
use rand::{RngCore, SeedableRng};

use super::NumberGenerator;

/// Seeded 32-bit pseudo-random numbers.  The same seed always yields the same
/// sequence; different seeds may collide.
pub struct Random {
    rng: StdRng,
}

impl Random {
    pub fn new(seed: u32) -> Self {
        Random {
            rng: StdRng::seed_from_u64(seed as u64),
        }
    }
}

impl NumberGenerator for Random {
    fn next(&mut self) -> u64 {
        self.rng.next_u32() as u64
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn same_seed_same_sequence() {
        let mut a = Random::new(42);
        let mut b = Random::new(42);
        for _ in 0..100 {
            assert_eq!(a.next(), b.next());
        }
    }

    #[test]
    fn stays_within_32_bits() {
        let mut r = Random::new(1);
        for _ in 0..100 {
            assert!(r.next() <= u32::MAX as u64);
        }
    }
}

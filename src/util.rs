/// Small deterministic PRNG so generator output only depends on the seed.
#[derive(Clone)]
pub struct SplitMix64(u64);

impl SplitMix64 {
    pub fn new(seed: u64) -> Self {
        Self(seed)
    }

    pub fn next_u64(&mut self) -> u64 {
        self.0 = self.0.wrapping_add(0x9E37_79B9_7F4A_7C15);
        let mut z = self.0;
        z = (z ^ (z >> 30)).wrapping_mul(0xBF58_476D_1CE4_E5B9);
        z = (z ^ (z >> 27)).wrapping_mul(0x94D0_49BB_1331_11EB);
        z ^ (z >> 31)
    }

    /// Uniform in `[0, 1)`
    pub fn next_f32(&mut self) -> f32 {
        (self.next_u64() >> 40) as f32 / (1u64 << 24) as f32
    }

    pub fn range_f32(&mut self, min: f32, max: f32) -> f32 {
        min + (max - min) * self.next_f32()
    }
}

/// Stateless hash of a lattice point, used by the value noise generator.
pub fn hash_2d(seed: u64, x: i32, y: i32) -> f32 {
    let mut rng = SplitMix64::new(
        seed ^ (x as u32 as u64).wrapping_mul(0x8CB9_2BA7_2F3D_8DD7)
            ^ (y as u32 as u64).wrapping_mul(0xD6E8_FEB8_6659_FD93),
    );
    rng.next_f32()
}

pub fn is_power_of_two_plus_one(value: u32) -> bool {
    value >= 2 && (value - 1).is_power_of_two()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn splitmix_is_deterministic_per_seed() {
        let a: Vec<u64> = {
            let mut rng = SplitMix64::new(7);
            (0..4).map(|_| rng.next_u64()).collect()
        };
        let mut rng = SplitMix64::new(7);
        let b: Vec<u64> = (0..4).map(|_| rng.next_u64()).collect();
        assert_eq!(a, b);
        assert_ne!(SplitMix64::new(8).next_u64(), a[0]);
    }

    #[test]
    fn next_f32_stays_in_unit_range() {
        let mut rng = SplitMix64::new(1234);
        for _ in 0..10_000 {
            let v = rng.next_f32();
            assert!((0.0..1.0).contains(&v));
        }
    }

    #[test]
    fn terrain_sizes() {
        assert!(is_power_of_two_plus_one(65));
        assert!(is_power_of_two_plus_one(513));
        assert!(!is_power_of_two_plus_one(64));
        assert!(!is_power_of_two_plus_one(1));
        assert!(!is_power_of_two_plus_one(0));
    }
}

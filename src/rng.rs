use rand::rngs::StdRng;
use rand::Rng as _;

pub trait RandomSource {
    // Uniform in [0, 1).
    fn next_f32(&mut self) -> f32;

    fn pick_index(&mut self, len: usize) -> usize {
        if len <= 1 {
            return 0;
        }
        (self.next_f32() * len as f32).floor().min((len - 1) as f32) as usize
    }

    fn bool(&mut self, probability: f32) -> bool {
        self.next_f32() < probability
    }

    fn range_f32(&mut self, min: f32, max: f32) -> f32 {
        if max <= min {
            return min;
        }
        min + self.next_f32() * (max - min)
    }
}

#[derive(Clone, Debug)]
pub struct Rng {
    seed: u32,
}

impl Rng {
    pub fn new(seed: u32) -> Self {
        Self { seed }
    }
}

impl RandomSource for Rng {
    fn next_f32(&mut self) -> f32 {
        self.seed = self.seed.wrapping_add(0x6d2b79f5);
        let mut t = self.seed;
        t = (t ^ (t >> 15)).wrapping_mul(t | 1);
        t ^= t.wrapping_add((t ^ (t >> 7)).wrapping_mul(t | 61));
        let out = t ^ (t >> 14);
        // 24 bits keep the quotient exactly representable and below 1.0.
        (out >> 8) as f32 / 16_777_216.0
    }
}

impl RandomSource for StdRng {
    fn next_f32(&mut self) -> f32 {
        self.random::<f32>()
    }

    fn pick_index(&mut self, len: usize) -> usize {
        if len <= 1 {
            return 0;
        }
        self.random_range(0..len)
    }
}

#[cfg(test)]
mod tests {
    use rand::SeedableRng;

    use super::*;

    #[test]
    fn same_seed_replays_same_sequence() {
        let mut a = Rng::new(42);
        let mut b = Rng::new(42);
        for _ in 0..100 {
            assert_eq!(a.next_f32().to_bits(), b.next_f32().to_bits());
        }
    }

    #[test]
    fn values_stay_in_unit_interval() {
        let mut rng = Rng::new(7);
        for _ in 0..10_000 {
            let value = rng.next_f32();
            assert!((0.0..1.0).contains(&value), "out of range: {value}");
        }
    }

    #[test]
    fn pick_index_never_exceeds_len() {
        let mut rng = Rng::new(99);
        assert_eq!(rng.pick_index(0), 0);
        assert_eq!(rng.pick_index(1), 0);
        for _ in 0..1_000 {
            assert!(rng.pick_index(4) < 4);
        }

        let mut std_rng = StdRng::seed_from_u64(99);
        for _ in 0..1_000 {
            assert!(std_rng.pick_index(3) < 3);
        }
    }

    #[test]
    fn range_f32_collapses_empty_range() {
        let mut rng = Rng::new(3);
        assert_eq!(rng.range_f32(5.0, 5.0), 5.0);
        let value = rng.range_f32(0.0, 300.0);
        assert!((0.0..300.0).contains(&value));
    }
}

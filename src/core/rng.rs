//! Seedable random source driving all scheduling decisions.
//!
//! Without a seed the generator delegates to the platform entropy source
//! via the `rand` crate. With a seed string it is a small linear
//! congruential generator, so the same seed replays the exact same
//! schedule — the property every strategy test leans on.

const LCG_MULTIPLIER: u64 = 1_103_515_245;
const LCG_INCREMENT: u64 = 12_345;
const LCG_MODULUS: u64 = 1 << 31;

/// Uniform `f64` source in `[0, 1)`, optionally deterministic.
///
/// One instance belongs to exactly one strategy; it is never shared
/// across jobs.
#[derive(Debug, Clone)]
pub struct Rng {
    source: Source,
}

#[derive(Debug, Clone)]
enum Source {
    /// Platform entropy via `rand`.
    Entropy,
    /// Seeded linear congruential generator.
    Lcg { state: u32 },
}

impl Rng {
    /// A non-deterministic generator backed by platform entropy.
    pub fn from_entropy() -> Self {
        Self {
            source: Source::Entropy,
        }
    }

    /// A deterministic generator keyed by a seed string.
    ///
    /// The seed is folded to a non-zero 31-bit state with the classic
    /// `hash*31 + byte` accumulation; zero folds are replaced by 1 so the
    /// LCG never sticks at its fixed point.
    pub fn seeded(seed: &str) -> Self {
        let mut hash: i32 = 0;
        for byte in seed.bytes() {
            hash = hash.wrapping_mul(31).wrapping_add(byte as i32);
        }
        let state = (hash.unsigned_abs() % LCG_MODULUS as u32).max(1);
        Self {
            source: Source::Lcg { state },
        }
    }

    /// Derive a generator for one strategy instance: seeded by
    /// `"{seed}:{label}"` when a global seed is set, entropy otherwise.
    pub fn derive(seed: Option<&str>, label: &str) -> Self {
        match seed {
            Some(seed) => Self::seeded(&format!("{}:{}", seed, label)),
            None => Self::from_entropy(),
        }
    }

    /// Next uniform draw in `[0, 1)`.
    pub fn next_f64(&mut self) -> f64 {
        match &mut self.source {
            Source::Entropy => rand::random::<f64>(),
            Source::Lcg { state } => {
                let next = (LCG_MULTIPLIER * *state as u64 + LCG_INCREMENT) % LCG_MODULUS;
                *state = next as u32;
                next as f64 / LCG_MODULUS as f64
            }
        }
    }

    /// Uniform draw in `[lo, hi)`.
    pub fn uniform_range(&mut self, lo: f64, hi: f64) -> f64 {
        lo + self.next_f64() * (hi - lo)
    }

    /// Standard-normal draw via Box-Muller, resampled until `|z| <= 3`.
    ///
    /// The hard clip keeps window picks from ever escaping the half-window
    /// that 3 standard deviations are sized to.
    pub fn gaussian(&mut self) -> f64 {
        loop {
            let u1 = self.next_f64().max(f64::EPSILON);
            let u2 = self.next_f64();
            let z = (-2.0 * u1.ln()).sqrt() * (std::f64::consts::TAU * u2).cos();
            if z.abs() <= 3.0 {
                return z;
            }
        }
    }

    /// Pick an index with probability proportional to its weight.
    ///
    /// Falls through to the last index when accumulated rounding leaves
    /// the draw positive after the final subtraction.
    pub fn weighted_index(&mut self, weights: &[f64]) -> usize {
        let total: f64 = weights.iter().sum();
        let mut r = self.next_f64() * total;
        for (i, w) in weights.iter().enumerate() {
            r -= w;
            if r <= 0.0 {
                return i;
            }
        }
        weights.len().saturating_sub(1)
    }

    /// Scale `base` by a symmetric noise factor: a jitter of `j` maps the
    /// value into `[base*(1-j), base*(1+j)]`.
    pub fn jittered(&mut self, base: f64, jitter: f64) -> f64 {
        base * (1.0 + (2.0 * self.next_f64() - 1.0) * jitter)
    }
}

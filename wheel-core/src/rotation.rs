use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;

/// Two full turns: the shortest spin that still reads as a spin.
pub const MIN_ROTATION: f64 = 720.0;
/// Four full turns, exclusive.
pub const MAX_ROTATION: f64 = 1440.0;

/// Source of the final rotation for each spin.
pub trait RotationSource: Send {
    /// Degrees in `[MIN_ROTATION, MAX_ROTATION)`.
    fn draw_rotation(&mut self) -> f64;
}

pub struct RngRotation<R = ChaCha8Rng> {
    rng: R,
}

impl RngRotation<ChaCha8Rng> {
    pub fn from_entropy() -> Self {
        Self {
            rng: ChaCha8Rng::from_entropy(),
        }
    }

    pub fn seeded(seed: u64) -> Self {
        Self {
            rng: ChaCha8Rng::seed_from_u64(seed),
        }
    }
}

impl<R: Rng + Send> RotationSource for RngRotation<R> {
    fn draw_rotation(&mut self) -> f64 {
        self.rng.gen_range(MIN_ROTATION..MAX_ROTATION)
    }
}

/// Always lands on the same rotation. Values outside the allowed range are clamped.
#[derive(Debug, Clone, Copy)]
pub struct FixedRotation(pub f64);

impl RotationSource for FixedRotation {
    fn draw_rotation(&mut self) -> f64 {
        if self.0 < MIN_ROTATION {
            MIN_ROTATION
        } else if self.0 >= MAX_ROTATION {
            MIN_ROTATION + self.0.rem_euclid(MAX_ROTATION - MIN_ROTATION)
        } else {
            self.0
        }
    }
}

//! Maps a settled wheel rotation to the sector under the fixed pointer.
//!
//! The pointer sits at 0 degrees (12 o'clock). Turning the wheel clockwise by
//! `rotation` is the same as moving the pointer counter-clockwise by it, so the
//! sector under the pointer is the one containing `360 - (rotation mod 360)`.

use tracing::warn;

use crate::registry::{Sector, FULL_TURN};

/// Angle on the wheel, in `[0, 360)`, that ends up under the pointer.
pub fn pointer_relative_angle(final_rotation: f64) -> f64 {
    let relative = (FULL_TURN - final_rotation.rem_euclid(FULL_TURN)).rem_euclid(FULL_TURN);
    // rem_euclid can round up to exactly 360 for tiny negative inputs
    if relative >= FULL_TURN {
        0.0
    } else {
        relative
    }
}

/// Sector containing `angle`, falling back to the sector with the smallest start.
pub fn sector_at(sectors: &[Sector], angle: f64) -> Option<&Sector> {
    if let Some(sector) = sectors.iter().find(|s| s.contains(angle)) {
        return Some(sector);
    }
    let fallback = sectors
        .iter()
        .min_by(|a, b| a.start.total_cmp(&b.start))?;
    warn!(
        angle,
        winner = %fallback.name,
        "no sector matched pointer angle, using first sector"
    );
    Some(fallback)
}

/// Winner for a spin that settled after turning `final_rotation` degrees.
///
/// Pure: the same sectors and rotation always give the same name, which is
/// what lets late joiners agree with the original spin.
pub fn resolve(sectors: &[Sector], final_rotation: f64) -> Option<&str> {
    sector_at(sectors, pointer_relative_angle(final_rotation)).map(|s| s.name.as_str())
}

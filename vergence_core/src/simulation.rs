// Copyright 2026 the Vergence Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! World animation state.
//!
//! Deliberately tiny: the only animation is a global rotation driven
//! directly by the predicted display time, so a frame rendered for a given
//! display time always shows the same world regardless of when it was
//! simulated. Cubes spin at their per-instance rates times this rotation.

use glam::Vec3;

/// Animation state advanced once per frame.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct Simulation {
    /// Current rotation angle per axis, in radians.
    pub current_rotation: Vec3,
}

impl Simulation {
    /// Advances the rotation to the given predicted display time.
    pub fn advance(&mut self, predicted_display_time: f64) {
        #[expect(
            clippy::cast_possible_truncation,
            reason = "display times are small enough that f32 precision suffices for a rotation angle"
        )]
        let angle = predicted_display_time as f32;
        self.current_rotation = Vec3::splat(angle);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rotation_tracks_display_time() {
        let mut simulation = Simulation::default();
        simulation.advance(2.5);
        assert_eq!(
            simulation.current_rotation,
            Vec3::splat(2.5),
            "all three axes follow the display time"
        );
    }

    #[test]
    fn advance_is_idempotent_for_equal_times() {
        let mut a = Simulation::default();
        let mut b = Simulation::default();
        a.advance(1.0);
        a.advance(7.25);
        b.advance(7.25);
        assert_eq!(a, b, "state depends only on the latest display time");
    }
}

//! Particle sphere layout.
//!
//! Particles are spread over a sphere surface with a golden-ratio spiral,
//! projected to screen space with a simple perspective scale, and given a
//! life value from their depth so back-facing particles render dimmer.
//! The layout is fully deterministic in (count, radius, center); it is
//! recomputed wholesale whenever the particle count or the viewport
//! changes, never migrated in place.

use bytemuck::{Pod, Zeroable};
use glam::Vec2;
use std::f32::consts::TAU;

/// Fractional part of the golden ratio, the azimuth increment that spaces
/// spiral points evenly around the sphere
const GOLDEN_FRAC: f32 = 0.618034;

/// One particle as laid out in the GPU storage buffer.
/// Layout must match the `Particle` struct in `shaders/particles.wgsl`.
#[repr(C)]
#[derive(Copy, Clone, Debug, PartialEq, Pod, Zeroable)]
pub struct Particle {
    pub position: [f32; 2],
    pub velocity: [f32; 2],
    /// Brightness/depth factor in [0.3, 1.0]
    pub life: f32,
    _pad: f32,
}

/// Spiral azimuth for particle `index`
fn azimuth(index: usize) -> f32 {
    TAU * (index as f32 * GOLDEN_FRAC).fract()
}

/// Place `count` particles on a sphere of `radius` pixels centered on
/// `center`, projected to 2D. Velocities start at zero.
pub fn sphere_layout(count: usize, radius: f32, center: Vec2) -> Vec<Particle> {
    let total = count as f32;
    let mut particles = Vec::with_capacity(count);

    for index in 0..count {
        let n = index as f32;

        let phi = azimuth(index);
        let cos_theta = 1.0 - (2.0 * n + 1.0) / total;
        let sin_theta = (1.0 - cos_theta * cos_theta).max(0.0).sqrt();

        let x = phi.cos() * sin_theta * radius;
        let y = phi.sin() * sin_theta * radius;
        let z = cos_theta * radius;

        // Points nearer the viewer project larger
        let scale = (z + radius * 2.0) / (radius * 3.0);
        let position = center + Vec2::new(x, y) * scale;

        particles.push(Particle {
            position: position.to_array(),
            velocity: [0.0, 0.0],
            life: 0.3 + 0.7 * ((z / radius) * 0.5 + 0.5),
            _pad: 0.0,
        });
    }

    particles
}

#[cfg(test)]
mod tests {
    use super::*;

    const CENTER: Vec2 = Vec2::new(640.0, 360.0);

    fn assert_invariants(particles: &[Particle], radius: f32, center: Vec2) {
        for (i, p) in particles.iter().enumerate() {
            assert!(
                (0.3..=1.0).contains(&p.life),
                "particle {} life {} out of [0.3, 1.0]",
                i,
                p.life
            );
            assert_eq!(p.velocity, [0.0, 0.0], "particle {} has initial velocity", i);

            let distance = (Vec2::from_array(p.position) - center).length();
            assert!(
                distance <= radius + 1e-3,
                "particle {} projected {}px from center, radius {}",
                i,
                distance,
                radius
            );
        }
    }

    #[test]
    fn test_life_bounds_for_all_counts() {
        for count in [1, 2, 7, 500, 2000] {
            let particles = sphere_layout(count, 400.0, CENTER);
            assert_eq!(particles.len(), count);
            assert_invariants(&particles, 400.0, CENTER);
        }
    }

    #[test]
    fn test_layout_deterministic() {
        let a = sphere_layout(777, 300.0, CENTER);
        let b = sphere_layout(777, 300.0, CENTER);
        assert_eq!(a, b);
    }

    #[test]
    fn test_azimuths_pairwise_distinct() {
        let mut angles: Vec<f32> = (0..1000).map(azimuth).collect();
        angles.sort_by(|a, b| a.partial_cmp(b).unwrap());
        for pair in angles.windows(2) {
            assert_ne!(pair[0], pair[1], "duplicate azimuth {}", pair[0]);
        }
    }

    #[test]
    fn test_depth_ordering_of_life() {
        // The spiral walks from the near pole (i = 0) to the far pole, so
        // life decreases monotonically with index
        let particles = sphere_layout(100, 400.0, CENTER);
        for pair in particles.windows(2) {
            assert!(pair[0].life > pair[1].life);
        }
    }

    #[test]
    fn test_recenter_translates_layout() {
        let at_origin = sphere_layout(50, 200.0, Vec2::ZERO);
        let shifted = sphere_layout(50, 200.0, Vec2::new(100.0, -40.0));

        for (a, b) in at_origin.iter().zip(&shifted) {
            let delta = Vec2::from_array(b.position) - Vec2::from_array(a.position);
            assert!((delta - Vec2::new(100.0, -40.0)).length() < 1e-3);
            assert_eq!(a.life, b.life);
        }
    }

    #[test]
    fn test_count_change_reinitializes_fully() {
        // Grow 500 → 800 as a settings change would: the new layout is a
        // complete re-spread over the sphere, not the old points plus 300
        let before = sphere_layout(500, 400.0, CENTER);
        let after = sphere_layout(800, 400.0, CENTER);

        assert_eq!(after.len(), 800);
        assert_invariants(&after, 400.0, CENTER);

        // Same index lands elsewhere because depth spacing depends on N
        assert_ne!(before[1].position, after[1].position);
        assert_ne!(before[499].life, after[499].life);
    }
}

//! Per-pixel color function for the gradient discs.
//!
//! Points are expressed in the disc's own unit space: the mesh is a unit
//! circle and the instance transform applies radius and eccentricity
//! afterwards, so nothing here depends on either. The GLSL fragment shader in
//! `compile.rs` evaluates the same formula from the values packed by
//! [`GradientParams`] into the frame uniforms.

use glam::{Vec2, Vec3, Vec4};

pub const STOP_COUNT: usize = 4;

/// A color pinned to a normalized distance from the focal point.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GradientStop {
    pub position: f32,
    pub color: Vec3,
}

impl GradientStop {
    pub fn new(position: f32, color: Vec3) -> Self {
        Self { position, color }
    }
}

/// Stop table and animation constants for the disc gradient.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GradientParams {
    /// Sorted by ascending position.
    pub stops: [GradientStop; STOP_COUNT],
    pub shimmer_amplitude: f32,
    pub shimmer_speed: f32,
    pub shimmer_frequency: f32,
    pub glow_strength: f32,
    pub pulse_amplitude: f32,
    pub pulse_frequency: f32,
}

impl Default for GradientParams {
    fn default() -> Self {
        Self {
            stops: [
                GradientStop::new(0.0, hex_color(0x0A0D2C)),
                GradientStop::new(0.75, hex_color(0x0D1548)),
                GradientStop::new(0.9, hex_color(0x1B307A)),
                GradientStop::new(1.0, hex_color(0x294BAB)),
            ],
            shimmer_amplitude: 0.03,
            shimmer_speed: 0.5,
            shimmer_frequency: 10.0,
            glow_strength: 1.2,
            pulse_amplitude: 0.1,
            pulse_frequency: 5.0,
        }
    }
}

impl GradientParams {
    /// Color of the outermost stop, also used for the edge glow.
    pub fn outer_color(&self) -> Vec3 {
        self.stops[STOP_COUNT - 1].color
    }

    /// Applies the animated shimmer to a focal distance.
    pub fn distorted_distance(&self, distance: f32, time: f32) -> f32 {
        distance
            + self.shimmer_amplitude
                * (self.shimmer_speed * time + distance * self.shimmer_frequency).sin()
    }

    /// Piecewise smoothstep interpolation across the stop table.
    ///
    /// The first segment whose upper stop lies beyond `distance` wins; values
    /// past the last stop stay in the final segment and clamp to its color.
    pub fn stop_color(&self, distance: f32) -> Vec3 {
        let last_segment = STOP_COUNT - 2;
        let segment = (0..last_segment)
            .find(|&index| distance < self.stops[index + 1].position)
            .unwrap_or(last_segment);
        let lower = self.stops[segment];
        let upper = self.stops[segment + 1];
        let span = upper.position - lower.position;
        let t = if span > 0.0 {
            (distance - lower.position) / span
        } else {
            1.0
        };
        lower.color.lerp(upper.color, smoothstep(t))
    }

    /// Additive bloom term; grows with the cube of the distance and is not clamped.
    pub fn edge_glow(&self, distance: f32) -> Vec3 {
        self.outer_color() * distance.powi(3) * self.glow_strength
    }

    pub fn alpha(&self, distance: f32, time: f32) -> f32 {
        1.0 - self.pulse_amplitude * (time + distance * self.pulse_frequency).sin()
    }

    /// Full RGBA for a unit-space point. Color channels may exceed 1.0.
    pub fn shade(&self, point: Vec2, focal_offset: Vec2, time: f32) -> Vec4 {
        let distance = focal_distance(point, focal_offset);
        let distorted = self.distorted_distance(distance, time);
        let color = self.stop_color(distorted) + self.edge_glow(distance);
        color.extend(self.alpha(distance, time))
    }
}

/// Distance from the (possibly off-center) focal point in unit disc space.
pub fn focal_distance(point: Vec2, focal_offset: Vec2) -> f32 {
    point.distance(focal_offset)
}

/// Hermite ease `3t² − 2t³` over `t` clamped to `[0, 1]`.
pub fn smoothstep(t: f32) -> f32 {
    let t = t.clamp(0.0, 1.0);
    t * t * (3.0 - 2.0 * t)
}

pub fn hex_color(rgb: u32) -> Vec3 {
    Vec3::new(
        ((rgb >> 16) & 0xff) as f32 / 255.0,
        ((rgb >> 8) & 0xff) as f32 / 255.0,
        (rgb & 0xff) as f32 / 255.0,
    )
}

#[cfg(test)]
mod tests {
    use std::f32::consts::PI;

    use super::*;

    const EPSILON: f32 = 1e-4;

    fn assert_close(a: Vec3, b: Vec3) {
        assert!(a.abs_diff_eq(b, EPSILON), "{a:?} != {b:?}");
    }

    #[test]
    fn smoothstep_hits_endpoints_and_midpoint() {
        assert_eq!(smoothstep(-1.0), 0.0);
        assert_eq!(smoothstep(0.0), 0.0);
        assert!((smoothstep(0.5) - 0.5).abs() < 1e-6);
        assert_eq!(smoothstep(1.0), 1.0);
        assert_eq!(smoothstep(4.0), 1.0);
    }

    #[test]
    fn stop_colors_are_continuous_at_boundaries() {
        let params = GradientParams::default();
        for stop in &params.stops[1..STOP_COUNT - 1] {
            let below = params.stop_color(stop.position - 1e-5);
            let above = params.stop_color(stop.position + 1e-5);
            assert_close(below, above);
            assert_close(params.stop_color(stop.position), stop.color);
        }
    }

    #[test]
    fn stop_colors_clamp_outside_the_table() {
        let params = GradientParams::default();
        assert_close(params.stop_color(-0.2), params.stops[0].color);
        assert_close(params.stop_color(0.0), params.stops[0].color);
        assert_close(params.stop_color(1.0), params.outer_color());
        assert_close(params.stop_color(1.7), params.outer_color());
    }

    #[test]
    fn centered_gradient_is_radially_symmetric() {
        let params = GradientParams::default();
        let time = 2.5;
        for radius in [0.1_f32, 0.5, 0.8, 0.95] {
            let reference = params.shade(Vec2::new(radius, 0.0), Vec2::ZERO, time);
            for step in 1..8 {
                let angle = step as f32 * PI / 4.0;
                let point = Vec2::new(angle.cos(), angle.sin()) * radius;
                let sample = params.shade(point, Vec2::ZERO, time);
                assert!(sample.abs_diff_eq(reference, EPSILON), "radius {radius} angle {angle}");
            }
        }
    }

    #[test]
    fn glow_at_rim_adds_scaled_outer_color() {
        let params = GradientParams::default();
        let outer = params.outer_color();
        assert_close(params.edge_glow(1.0), outer * 1.2);
        assert_close(params.stop_color(1.0) + params.edge_glow(1.0), outer * 2.2);

        // At this time the shimmer term vanishes for d = 1.
        let time = 8.0 * PI - 20.0;
        let rim = params.shade(Vec2::new(1.0, 0.0), Vec2::ZERO, time);
        assert_close(rim.truncate(), outer * 2.2);
    }

    #[test]
    fn focal_point_takes_the_center_color() {
        let params = GradientParams::default();
        let focal = Vec2::new(0.3, -0.2);
        let sample = params.shade(focal, focal, 0.0);
        assert_close(sample.truncate(), params.stops[0].color);
        assert!((sample.w - 1.0).abs() < 1e-6);
    }

    #[test]
    fn off_center_focal_point_brightens_the_far_rim() {
        let params = GradientParams::default();
        let focal = Vec2::new(0.5, 0.0);
        let near = params.shade(Vec2::new(1.0, 0.0), focal, 0.0);
        let far = params.shade(Vec2::new(-1.0, 0.0), focal, 0.0);
        assert!(far.truncate().length() > near.truncate().length());
    }

    #[test]
    fn alpha_pulse_stays_within_amplitude() {
        let params = GradientParams::default();
        for step in 0..50 {
            let time = step as f32 * 0.37;
            let alpha = params.alpha(0.6, time);
            assert!((0.9..=1.1).contains(&alpha), "alpha {alpha}");
        }
    }

    #[test]
    fn hex_colors_decode_channels() {
        assert_close(hex_color(0xff8000), Vec3::new(1.0, 128.0 / 255.0, 0.0));
    }
}

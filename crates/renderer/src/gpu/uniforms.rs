use bytemuck::{Pod, Zeroable};

use crate::gradient::STOP_COUNT;
use crate::scene::{DiscInstance, SceneFrame};

/// Per-frame block shared by all discs (`FrameParams` in GLSL).
#[repr(C, align(16))]
#[derive(Clone, Copy, Debug, PartialEq)]
pub(crate) struct FrameUniforms {
    pub view_proj: [[f32; 4]; 4],
    pub stops: [[f32; 4]; STOP_COUNT],
    pub shimmer: [f32; 4],
    pub glow_pulse: [f32; 4],
}

unsafe impl Zeroable for FrameUniforms {}
unsafe impl Pod for FrameUniforms {}

impl FrameUniforms {
    pub fn from_frame(frame: &SceneFrame, aspect: f32) -> Self {
        let gradient = &frame.gradient;
        let stops = gradient
            .stops
            .map(|stop| stop.color.extend(stop.position).to_array());
        Self {
            view_proj: frame.camera.view_projection(aspect).to_cols_array_2d(),
            stops,
            shimmer: [
                gradient.shimmer_amplitude,
                gradient.shimmer_speed,
                gradient.shimmer_frequency,
                frame.clock_time,
            ],
            glow_pulse: [
                gradient.glow_strength,
                gradient.pulse_amplitude,
                gradient.pulse_frequency,
                0.0,
            ],
        }
    }
}

/// Per-disc block (`DiscParams` in GLSL).
#[repr(C, align(16))]
#[derive(Clone, Copy, Debug, PartialEq)]
pub(crate) struct DiscUniforms {
    pub model: [[f32; 4]; 4],
    /// Focal offset in `xy`, eccentricity and radius in `zw`.
    pub focal: [f32; 4],
}

unsafe impl Zeroable for DiscUniforms {}
unsafe impl Pod for DiscUniforms {}

impl DiscUniforms {
    pub fn from_disc(frame: &SceneFrame, disc: &DiscInstance) -> Self {
        Self {
            model: frame.model_matrix(disc).to_cols_array_2d(),
            focal: [
                disc.focal_offset.x,
                disc.focal_offset.y,
                disc.eccentricity,
                disc.radius,
            ],
        }
    }
}

#[cfg(test)]
mod tests {
    use discconfig::DiscConfig;

    use super::*;
    use crate::camera::OrbitCamera;
    use crate::runtime::TimeSample;
    use crate::scene::SceneComposer;

    fn frame() -> SceneFrame {
        let config = DiscConfig {
            focal_offset: [0.25, -0.5],
            ..DiscConfig::default()
        };
        SceneComposer::default().compose(&config, TimeSample::new(6.5, 3), &OrbitCamera::new())
    }

    #[test]
    fn uniform_sizes_follow_std140() {
        assert_eq!(std::mem::size_of::<FrameUniforms>(), 160);
        assert_eq!(std::mem::size_of::<DiscUniforms>(), 80);
    }

    #[test]
    fn frame_uniforms_pack_stops_and_clock() {
        let frame = frame();
        let uniforms = FrameUniforms::from_frame(&frame, 1.5);
        assert_eq!(uniforms.stops[1][3], 0.75);
        assert_eq!(uniforms.stops[3][3], 1.0);
        assert_eq!(uniforms.shimmer, [0.03, 0.5, 10.0, 6.5]);
        assert_eq!(uniforms.glow_pulse[..3], [1.2, 0.1, 5.0]);
    }

    #[test]
    fn disc_uniforms_carry_focal_offset() {
        let frame = frame();
        let uniforms = DiscUniforms::from_disc(&frame, &frame.discs[2]);
        assert_eq!(uniforms.focal, [0.25, -0.5, 1.0, 2.0]);
        assert_eq!(
            uniforms.model,
            frame.model_matrix(&frame.discs[2]).to_cols_array_2d()
        );
    }
}

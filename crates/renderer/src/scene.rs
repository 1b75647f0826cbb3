//! Scene composition: three discs stacked along one axis under a fixed tilt.
//!
//! ```text
//!   ConfigStore snapshot ─┐
//!   TimeSample ───────────┼─▶ SceneComposer::compose ─▶ SceneFrame ─▶ render target
//!   OrbitCamera ──────────┘
//! ```
//!
//! A frame is built from exactly one configuration snapshot and one clock
//! sample, so every disc in it observes the same parameters and time.

use discconfig::{DiscConfig, DiscSlot};
use glam::{EulerRot, Mat4, Quat, Vec2, Vec3};

use crate::camera::{CameraView, OrbitCamera};
use crate::gradient::GradientParams;
use crate::runtime::TimeSample;

/// Yaw then pitch applied to the whole disc group, in radians.
pub const GROUP_YAW: f32 = -0.55;
pub const GROUP_PITCH: f32 = 0.3;

pub fn group_orientation() -> Quat {
    Quat::from_euler(EulerRot::YXZ, GROUP_YAW, GROUP_PITCH, 0.0)
}

/// Render description of one disc for one frame.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DiscInstance {
    pub slot: DiscSlot,
    pub radius: f32,
    pub eccentricity: f32,
    pub focal_offset: Vec2,
    pub clock_time: f32,
    /// Position inside the group, before the group orientation.
    pub position: Vec3,
}

impl DiscInstance {
    /// Non-uniform scale mapping the unit mesh onto the disc silhouette.
    pub fn local_scale(&self) -> Vec3 {
        Vec3::new(self.radius, self.radius * self.eccentricity, 1.0)
    }

    /// Width and height of the silhouette in the disc's own plane.
    pub fn extent(&self) -> Vec2 {
        let scale = self.local_scale();
        Vec2::new(2.0 * scale.x, 2.0 * scale.y)
    }

    pub fn model_matrix(&self, orientation: Quat) -> Mat4 {
        Mat4::from_quat(orientation)
            * Mat4::from_scale_rotation_translation(
                self.local_scale(),
                Quat::IDENTITY,
                self.position,
            )
    }
}

/// Everything a render target needs to draw one frame.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SceneFrame {
    pub discs: [DiscInstance; 3],
    pub orientation: Quat,
    pub clock_time: f32,
    pub frame_index: u64,
    pub camera: CameraView,
    pub gradient: GradientParams,
}

impl SceneFrame {
    pub fn model_matrix(&self, disc: &DiscInstance) -> Mat4 {
        disc.model_matrix(self.orientation)
    }

    pub fn world_center(&self, disc: &DiscInstance) -> Vec3 {
        self.orientation * disc.position
    }

    /// Disc indices ordered from farthest to nearest to the camera, the
    /// order translucent discs have to be blended in.
    pub fn back_to_front(&self) -> [usize; 3] {
        let mut order = [0, 1, 2];
        let eye = self.camera.eye;
        order.sort_by(|&a, &b| {
            let da = self.world_center(&self.discs[a]).distance_squared(eye);
            let db = self.world_center(&self.discs[b]).distance_squared(eye);
            db.total_cmp(&da)
        });
        order
    }
}

/// Turns configuration snapshots and clock samples into [`SceneFrame`]s.
#[derive(Debug, Clone)]
pub struct SceneComposer {
    orientation: Quat,
    gradient: GradientParams,
}

impl Default for SceneComposer {
    fn default() -> Self {
        Self::new(GradientParams::default())
    }
}

impl SceneComposer {
    pub fn new(gradient: GradientParams) -> Self {
        Self {
            orientation: group_orientation(),
            gradient,
        }
    }

    pub fn orientation(&self) -> Quat {
        self.orientation
    }

    pub fn compose(
        &self,
        config: &DiscConfig,
        sample: TimeSample,
        camera: &OrbitCamera,
    ) -> SceneFrame {
        let focal_offset = Vec2::from(config.focal_offset);
        let discs = DiscSlot::ALL.map(|slot| DiscInstance {
            slot,
            radius: config.size(slot),
            eccentricity: config.eccentricity,
            focal_offset,
            clock_time: sample.seconds,
            position: Vec3::new(0.0, 0.0, slot.axis_sign() * config.spacing),
        });

        SceneFrame {
            discs,
            orientation: self.orientation,
            clock_time: sample.seconds,
            frame_index: sample.frame_index,
            camera: camera.view(config.field_of_view),
            gradient: self.gradient,
        }
    }
}

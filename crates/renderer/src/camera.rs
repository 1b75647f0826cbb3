use glam::{Mat4, Vec3};

pub const DEFAULT_CAMERA_DISTANCE: f32 = 10.0;
pub const MIN_CAMERA_DISTANCE: f32 = 5.0;
pub const MAX_CAMERA_DISTANCE: f32 = 20.0;
pub const NEAR_PLANE: f32 = 0.1;
pub const FAR_PLANE: f32 = 1000.0;

const PITCH_LIMIT: f32 = std::f32::consts::FRAC_PI_2 - 0.01;

/// Camera orbiting a target point, driven by pointer input.
///
/// The initial pose looks down `-Z` from `(0, 0, 10)`. Zoom is clamped to
/// `[MIN_CAMERA_DISTANCE, MAX_CAMERA_DISTANCE]`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct OrbitCamera {
    target: Vec3,
    yaw: f32,
    pitch: f32,
    distance: f32,
}

impl Default for OrbitCamera {
    fn default() -> Self {
        Self {
            target: Vec3::ZERO,
            yaw: 0.0,
            pitch: 0.0,
            distance: DEFAULT_CAMERA_DISTANCE,
        }
    }
}

impl OrbitCamera {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn target(&self) -> Vec3 {
        self.target
    }

    pub fn distance(&self) -> f32 {
        self.distance
    }

    pub fn eye(&self) -> Vec3 {
        let (sin_yaw, cos_yaw) = self.yaw.sin_cos();
        let (sin_pitch, cos_pitch) = self.pitch.sin_cos();
        self.target + Vec3::new(sin_yaw * cos_pitch, sin_pitch, cos_yaw * cos_pitch) * self.distance
    }

    /// Orbits around the target by the given angles in radians.
    pub fn rotate(&mut self, yaw: f32, pitch: f32) {
        self.yaw = (self.yaw + yaw).rem_euclid(std::f32::consts::TAU);
        self.pitch = (self.pitch + pitch).clamp(-PITCH_LIMIT, PITCH_LIMIT);
    }

    /// Multiplies the orbit distance; factors below 1.0 move closer.
    pub fn zoom(&mut self, factor: f32) {
        if !factor.is_finite() || factor <= 0.0 {
            return;
        }
        self.distance = (self.distance * factor).clamp(MIN_CAMERA_DISTANCE, MAX_CAMERA_DISTANCE);
    }

    /// Slides the target in the view plane; offsets scale with distance.
    pub fn pan(&mut self, right: f32, up: f32) {
        let forward = (self.target - self.eye()).normalize_or_zero();
        let right_axis = forward.cross(Vec3::Y).normalize_or_zero();
        let up_axis = right_axis.cross(forward).normalize_or_zero();
        self.target += (right_axis * right + up_axis * up) * self.distance;
    }

    pub fn view(&self, field_of_view: f32) -> CameraView {
        CameraView {
            eye: self.eye(),
            target: self.target,
            field_of_view,
        }
    }
}

/// Camera pose captured for a single frame.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CameraView {
    pub eye: Vec3,
    pub target: Vec3,
    /// Vertical field of view in degrees.
    pub field_of_view: f32,
}

impl CameraView {
    pub fn view_matrix(&self) -> Mat4 {
        Mat4::look_at_rh(self.eye, self.target, Vec3::Y)
    }

    pub fn projection_matrix(&self, aspect: f32) -> Mat4 {
        Mat4::perspective_rh(
            self.field_of_view.to_radians(),
            aspect.max(f32::EPSILON),
            NEAR_PLANE,
            FAR_PLANE,
        )
    }

    pub fn view_projection(&self, aspect: f32) -> Mat4 {
        self.projection_matrix(aspect) * self.view_matrix()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_pose_matches_initial_camera() {
        let camera = OrbitCamera::new();
        assert!(camera.eye().abs_diff_eq(Vec3::new(0.0, 0.0, 10.0), 1e-5));
    }

    #[test]
    fn zoom_is_clamped_to_bounds() {
        let mut camera = OrbitCamera::new();
        camera.zoom(0.01);
        assert_eq!(camera.distance(), MIN_CAMERA_DISTANCE);
        camera.zoom(100.0);
        assert_eq!(camera.distance(), MAX_CAMERA_DISTANCE);
        camera.zoom(-1.0);
        assert_eq!(camera.distance(), MAX_CAMERA_DISTANCE);
    }

    #[test]
    fn rotation_keeps_distance_and_limits_pitch() {
        let mut camera = OrbitCamera::new();
        camera.rotate(1.0, 10.0);
        assert!((camera.eye().distance(camera.target()) - DEFAULT_CAMERA_DISTANCE).abs() < 1e-4);
        assert!(camera.eye().y < DEFAULT_CAMERA_DISTANCE);
        assert!(camera.eye().y > 9.9);
    }

    #[test]
    fn pan_moves_target_and_eye_together() {
        let mut camera = OrbitCamera::new();
        let offset = camera.eye() - camera.target();
        camera.pan(0.1, 0.0);
        assert!(camera.target().x > 0.0);
        assert!((camera.eye() - camera.target()).abs_diff_eq(offset, 1e-4));
    }

    #[test]
    fn projection_maps_target_to_screen_center() {
        let view = OrbitCamera::new().view(50.0);
        let clip = view.view_projection(16.0 / 9.0) * view.target.extend(1.0);
        let ndc = clip.truncate() / clip.w;
        assert!(ndc.x.abs() < 1e-5 && ndc.y.abs() < 1e-5);
    }
}

use glam::{Mat4, Vec2, Vec3, Vec4};
use crate::bounding_box::Aabb;
use crate::picking::Ray;

/// Extra distance applied on top of the exact fit so the model never touches the viewport edge
pub const FRAME_PADDING: f32 = 2.0;

/// Keeps the camera off the target when a model has no extent
const MIN_FRAME_DISTANCE: f32 = 0.1;

const MIN_ORBIT_DISTANCE: f32 = 0.05;
const MAX_PITCH_DEG: f32 = 89.0;

/// Camera placement computed from model bounds
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CameraFrame {
    pub position: Vec3,
    pub target: Vec3,
    /// Offset applied on each axis from the model center
    pub distance: f32,
}

/// Fit-to-view framing for a vertical field of view given in degrees.
///
/// `distance = (max_extent / 2) / tan(fov / 2) * FRAME_PADDING`, and the camera
/// sits at `center + (distance, distance, distance)` looking at the center.
pub fn auto_frame(bounds: &Aabb, fov_deg: f32) -> CameraFrame {
    let center = bounds.center();
    let half_fov = (fov_deg.to_radians() / 2.0).max(f32::EPSILON);
    let distance = ((bounds.max_extent() / 2.0) / half_fov.tan() * FRAME_PADDING).max(MIN_FRAME_DISTANCE);

    CameraFrame {
        position: center + Vec3::splat(distance),
        target: center,
        distance,
    }
}

/// Orbit camera around a target, Z up
#[derive(Debug, Clone)]
pub struct Camera {
    pub target: Vec3,
    pub distance: f32,
    /// Radians around Z, measured from +X
    pub yaw: f32,
    /// Radians above the XY plane
    pub pitch: f32,
    pub fov_deg: f32,
    pub aspect_ratio: f32,
    pub near: f32,
    pub far: f32,
    position: Vec3,
}

impl Default for Camera {
    fn default() -> Self {
        Self::new(45.0)
    }
}

impl Camera {
    pub fn new(fov_deg: f32) -> Self {
        let mut camera = Self {
            target: Vec3::ZERO,
            distance: 10.0,
            yaw: 45f32.to_radians(),
            // Same elevation as a (1, 1, 1) offset
            pitch: (1.0f32 / 3.0f32.sqrt()).asin(),
            fov_deg,
            aspect_ratio: 16.0 / 9.0,
            near: 0.1,
            far: 1000.0,
            position: Vec3::ZERO,
        };
        camera.update_position();
        camera
    }

    pub fn position(&self) -> Vec3 {
        self.position
    }

    pub fn update_position(&mut self) {
        let (sin_yaw, cos_yaw) = self.yaw.sin_cos();
        let (sin_pitch, cos_pitch) = self.pitch.sin_cos();
        let offset = Vec3::new(cos_pitch * cos_yaw, cos_pitch * sin_yaw, sin_pitch) * self.distance;
        self.position = self.target + offset;
    }

    /// Place the camera exactly at a computed frame
    pub fn apply_frame(&mut self, frame: &CameraFrame) {
        let offset = frame.position - frame.target;
        let length = offset.length();

        self.target = frame.target;
        if length > f32::EPSILON {
            self.distance = length;
            self.yaw = offset.y.atan2(offset.x);
            self.pitch = (offset.z / length).clamp(-1.0, 1.0).asin();
        }
        self.near = (self.distance / 1000.0).max(0.01);
        self.far = self.distance * 100.0;
        self.position = frame.position;
    }

    /// Frame a model and return the placement used
    pub fn frame(&mut self, bounds: &Aabb) -> CameraFrame {
        let frame = auto_frame(bounds, self.fov_deg);
        self.apply_frame(&frame);
        frame
    }

    /// Orbit by the given angles in degrees
    pub fn rotate(&mut self, yaw_deg: f32, pitch_deg: f32) {
        let limit = MAX_PITCH_DEG.to_radians();
        self.yaw += yaw_deg.to_radians();
        self.pitch = (self.pitch + pitch_deg.to_radians()).clamp(-limit, limit);
        self.update_position();
    }

    /// Positive values move away from the target
    pub fn zoom(&mut self, delta: f32) {
        self.distance = (self.distance * (1.0 + delta)).max(MIN_ORBIT_DISTANCE);
        self.update_position();
    }

    pub fn view_matrix(&self) -> Mat4 {
        Mat4::look_at_rh(self.position, self.target, Vec3::Z)
    }

    pub fn projection_matrix(&self) -> Mat4 {
        Mat4::perspective_rh(self.fov_deg.to_radians(), self.aspect_ratio, self.near, self.far)
    }

    pub fn view_projection(&self) -> Mat4 {
        self.projection_matrix() * self.view_matrix()
    }

    /// World-space ray through a point in normalized device coordinates
    /// (x and y in [-1, 1], y up)
    pub fn ray_from_ndc(&self, ndc: Vec2) -> Ray {
        let inverse = self.view_projection().inverse();
        let near = inverse.project_point3(Vec3::new(ndc.x, ndc.y, 0.0));
        let far = inverse.project_point3(Vec3::new(ndc.x, ndc.y, 1.0));
        Ray::new(near, far - near)
    }

    /// Normalized device coordinates of a world point, `None` behind the camera
    pub fn project(&self, world: Vec3) -> Option<Vec2> {
        let clip = self.view_projection() * Vec4::new(world.x, world.y, world.z, 1.0);
        if clip.w <= f32::EPSILON {
            return None;
        }
        Some(Vec2::new(clip.x / clip.w, clip.y / clip.w))
    }
}

use foundation::BoundingSphere;
use foundation::math::Vec3;

/// Vertical field of view used when none is configured.
pub const DEFAULT_FOV_Y_DEG: f64 = 45.0;

/// How much room to leave around the framed sphere (1.0 = touching).
pub const FIT_MARGIN: f64 = 1.2;

/// Distance used when the mesh gives no usable extent (empty placeholder).
pub const DEFAULT_FRAMING_DISTANCE: f64 = 100.0;

/// Elevated three-quarter view used for every fit.
pub const FIT_YAW_RAD: f64 = -std::f64::consts::FRAC_PI_4;
pub const FIT_PITCH_RAD: f64 = std::f64::consts::FRAC_PI_6;

const MIN_DISTANCE: f64 = 0.25;
const MAX_PITCH_RAD: f64 = 1.55;

#[derive(Debug, Copy, Clone, PartialEq)]
pub struct Viewport {
    pub width: f64,
    pub height: f64,
}

impl Viewport {
    pub fn new(width: f64, height: f64) -> Self {
        Self { width, height }
    }

    pub fn aspect(&self) -> f64 {
        if self.height <= 0.0 || !self.height.is_finite() || !self.width.is_finite() {
            1.0
        } else {
            (self.width / self.height).max(1e-6)
        }
    }
}

impl Default for Viewport {
    fn default() -> Self {
        Self::new(1280.0, 720.0)
    }
}

/// Orbit camera: looks at `target` from `distance` along the direction given
/// by `yaw_rad`/`pitch_rad` (y is up).
#[derive(Debug, Copy, Clone, PartialEq)]
pub struct CameraState {
    pub yaw_rad: f64,
    pub pitch_rad: f64,
    pub distance: f64,
    pub target: Vec3,
}

impl Default for CameraState {
    fn default() -> Self {
        Self {
            yaw_rad: 0.6,
            pitch_rad: 0.3,
            distance: 3.0,
            target: Vec3::ZERO,
        }
    }
}

impl CameraState {
    /// Unit vector from the target towards the eye.
    pub fn view_direction(&self) -> Vec3 {
        Vec3::new(
            self.pitch_rad.cos() * self.yaw_rad.cos(),
            self.pitch_rad.sin(),
            self.pitch_rad.cos() * self.yaw_rad.sin(),
        )
    }

    pub fn position(&self) -> Vec3 {
        self.target + self.view_direction() * self.distance
    }

    pub fn is_finite(&self) -> bool {
        self.yaw_rad.is_finite()
            && self.pitch_rad.is_finite()
            && self.distance.is_finite()
            && self.target.is_finite()
    }

    /// Orbit around the target by a pointer delta in pixels.
    pub fn orbit(&mut self, delta_x_px: f64, delta_y_px: f64) {
        let speed = 0.005;
        self.yaw_rad += delta_x_px * speed;
        self.pitch_rad = (self.pitch_rad + delta_y_px * speed).clamp(-MAX_PITCH_RAD, MAX_PITCH_RAD);
    }

    /// Move the target in the view plane by a pointer delta in pixels.
    pub fn pan(&mut self, delta_x_px: f64, delta_y_px: f64) {
        let forward = (-self.view_direction()).normalize();
        let right = forward.cross(Vec3::Y).normalize();
        let up = right.cross(forward);

        let pan_scale = self.distance * 0.002;
        self.target = self.target + right * (-delta_x_px * pan_scale) + up * (delta_y_px * pan_scale);
    }

    /// Dolly in/out by a wheel delta.
    pub fn zoom(&mut self, wheel_delta_y: f64) {
        let factor = (wheel_delta_y * 0.0015).exp();
        self.distance = (self.distance * factor).max(MIN_DISTANCE);
    }
}

/// Place the camera so `sphere` fits in both the vertical and horizontal
/// field of view, with [`FIT_MARGIN`] to spare.
///
/// Degenerate spheres (zero or non-finite radius) are framed from
/// [`DEFAULT_FRAMING_DISTANCE`]. The result is always finite.
pub fn frame_sphere(sphere: &BoundingSphere, viewport: Viewport, fov_y_rad: f64) -> CameraState {
    let fov_y = if fov_y_rad.is_finite() && fov_y_rad > 0.01 && fov_y_rad < std::f64::consts::PI - 0.01 {
        fov_y_rad
    } else {
        DEFAULT_FOV_Y_DEG.to_radians()
    };
    let half_y = 0.5 * fov_y;
    let half_x = (half_y.tan() * viewport.aspect()).atan();
    let half = half_y.min(half_x);

    let target = if sphere.center.is_finite() {
        sphere.center
    } else {
        Vec3::ZERO
    };

    let distance = if sphere.is_degenerate() {
        DEFAULT_FRAMING_DISTANCE
    } else {
        (sphere.radius * FIT_MARGIN / half.sin()).max(MIN_DISTANCE)
    };

    CameraState {
        yaw_rad: FIT_YAW_RAD,
        pitch_rad: FIT_PITCH_RAD,
        distance,
        target,
    }
}

/// The camera as the rest of the viewer sees it.
#[derive(Debug, Copy, Clone, PartialEq)]
pub struct ViewerCameraState {
    pub position: Vec3,
    pub target: Vec3,
    pub distance: f64,
    pub yaw_rad: f64,
    pub pitch_rad: f64,
    pub fitted: bool,
}

impl ViewerCameraState {
    pub fn capture(camera: &CameraState, fitted: bool) -> Self {
        Self {
            position: camera.position(),
            target: camera.target,
            distance: camera.distance,
            yaw_rad: camera.yaw_rad,
            pitch_rad: camera.pitch_rad,
            fitted,
        }
    }
}

use glam::{Mat4, Vec3, Vec4};

use crate::error::RendererError;
use crate::math::matrix::{self, EPSILON};

/// Who configured the active camera.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CameraMode {
    /// Derived from the canvas size; follows resizes.
    Default,
    /// Set explicitly by the caller; left alone on resize.
    Custom,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Projection {
    Perspective {
        fov_y: f32,
        aspect: f32,
        near: f32,
        far: f32,
    },
    Orthographic {
        left: f32,
        right: f32,
        bottom: f32,
        top: f32,
        near: f32,
        far: f32,
    },
}

impl Projection {
    pub fn matrix(&self) -> Result<Mat4, RendererError> {
        match *self {
            Projection::Perspective {
                fov_y,
                aspect,
                near,
                far,
            } => matrix::perspective(fov_y, aspect, near, far),
            Projection::Orthographic {
                left,
                right,
                bottom,
                top,
                near,
                far,
            } => matrix::ortho(left, right, bottom, top, near, far),
        }
    }

    /// 60 degree vertical field of view framing the whole canvas at z = 0.
    pub fn default_perspective(width: f32, height: f32) -> Self {
        let eye_z = Camera::default_eye_z(height);
        Projection::Perspective {
            fov_y: std::f32::consts::FRAC_PI_3,
            aspect: width / height.max(1.0),
            near: eye_z / 10.0,
            far: eye_z * 10.0,
        }
    }

    pub fn default_ortho(width: f32, height: f32) -> Self {
        Projection::Orthographic {
            left: -width / 2.0,
            right: width / 2.0,
            bottom: -height / 2.0,
            top: height / 2.0,
            near: 0.0,
            far: width.max(height),
        }
    }
}

/// Eye position plus the orthonormal basis derived from it.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Camera {
    pub eye: Vec3,
    pub center: Vec3,
    pub up: Vec3,
    right_axis: Vec3,
    up_axis: Vec3,
    forward_axis: Vec3,
}

impl Camera {
    /// Builds the basis as forward = eye - center, right = up x forward,
    /// up' = forward x right. A zero-length vector is left unnormalised.
    pub fn look_at(eye: Vec3, center: Vec3, up: Vec3) -> Self {
        let forward = normalize_or_keep(eye - center);
        let right = normalize_or_keep(up.cross(forward));
        let up_axis = normalize_or_keep(forward.cross(right));
        if right.length_squared() < EPSILON {
            log::warn!(
                "Camera up vector {:?} is parallel to the view direction; view matrix is degenerate",
                up
            );
        }
        Self {
            eye,
            center,
            up,
            right_axis: right,
            up_axis,
            forward_axis: forward,
        }
    }

    pub fn default_eye_z(height: f32) -> f32 {
        (height / 2.0) / (std::f32::consts::PI / 6.0).tan()
    }

    /// Looks at the origin from +z, far enough back to frame the canvas.
    pub fn default_for(height: f32) -> Self {
        Self::look_at(
            Vec3::new(0.0, 0.0, Self::default_eye_z(height)),
            Vec3::ZERO,
            Vec3::Y,
        )
    }

    /// (right, up, forward) unit vectors.
    pub fn basis(&self) -> (Vec3, Vec3, Vec3) {
        (self.right_axis, self.up_axis, self.forward_axis)
    }

    pub fn view_matrix(&self) -> Mat4 {
        let (r, u, f) = self.basis();
        let rotation = Mat4::from_cols(
            Vec4::new(r.x, u.x, f.x, 0.0),
            Vec4::new(r.y, u.y, f.y, 0.0),
            Vec4::new(r.z, u.z, f.z, 0.0),
            Vec4::W,
        );
        rotation * Mat4::from_translation(-self.eye)
    }
}

fn normalize_or_keep(v: Vec3) -> Vec3 {
    let len = v.length();
    if len > EPSILON {
        v / len
    } else {
        v
    }
}

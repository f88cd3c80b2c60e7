//! 4x4 transform helpers and the saved model-view stack.
//!
//! All matrices are column-major `glam` matrices composed the way GL expects:
//! a transform call post-multiplies the current matrix, so the most recent
//! call applies first to incoming vertices. Angles are radians.
//!
//! Screen-space Y grows downwards on the canvas while GL clip space grows
//! upwards, so [`translate`] negates the Y component it is given. Nothing
//! else flips Y.

use glam::{Mat3, Mat4, Vec3};

use crate::error::RendererError;

pub const EPSILON: f32 = 1e-6;

pub fn translate(m: Mat4, v: Vec3) -> Mat4 {
    m * Mat4::from_translation(Vec3::new(v.x, -v.y, v.z))
}

pub fn scale(m: Mat4, v: Vec3) -> Mat4 {
    m * Mat4::from_scale(v)
}

/// Rotates `m` by `angle` around `axis`, which is normalised first.
pub fn rotate(m: Mat4, angle: f32, axis: Vec3) -> Result<Mat4, RendererError> {
    let len = axis.length();
    if len < EPSILON || !len.is_finite() {
        return Err(RendererError::DegenerateTransform("rotation axis has zero length"));
    }
    Ok(m * Mat4::from_axis_angle(axis / len, angle))
}

pub fn perspective(fov_y: f32, aspect: f32, near: f32, far: f32) -> Result<Mat4, RendererError> {
    if fov_y <= EPSILON || fov_y >= std::f32::consts::PI {
        return Err(RendererError::DegenerateTransform(
            "field of view must lie strictly between 0 and PI",
        ));
    }
    if aspect.abs() < EPSILON {
        return Err(RendererError::DegenerateTransform("aspect ratio is zero"));
    }
    if near <= 0.0 {
        return Err(RendererError::DegenerateTransform("near plane must be positive"));
    }
    if (far - near).abs() < EPSILON {
        return Err(RendererError::DegenerateTransform("near and far planes coincide"));
    }
    Ok(Mat4::perspective_rh_gl(fov_y, aspect, near, far))
}

pub fn ortho(
    left: f32,
    right: f32,
    bottom: f32,
    top: f32,
    near: f32,
    far: f32,
) -> Result<Mat4, RendererError> {
    if (right - left).abs() < EPSILON {
        return Err(RendererError::DegenerateTransform("ortho box has zero width"));
    }
    if (top - bottom).abs() < EPSILON {
        return Err(RendererError::DegenerateTransform("ortho box has zero height"));
    }
    if (far - near).abs() < EPSILON {
        return Err(RendererError::DegenerateTransform("near and far planes coincide"));
    }
    Ok(Mat4::orthographic_rh_gl(left, right, bottom, top, near, far))
}

/// Normal matrix: inverse-transpose of the upper 3x3 of `model_view`.
pub fn inverse_transpose(model_view: &Mat4) -> Result<Mat3, RendererError> {
    let upper = Mat3::from_mat4(*model_view);
    let det = upper.determinant();
    if det.abs() < EPSILON || !det.is_finite() {
        return Err(RendererError::DegenerateTransform("model-view matrix is singular"));
    }
    Ok(upper.inverse().transpose())
}

/// Saved model-view matrices, one per open `push()`.
#[derive(Debug, Default, Clone)]
pub struct MatrixStack {
    saved: Vec<Mat4>,
}

impl MatrixStack {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, current: Mat4) {
        self.saved.push(current);
    }

    pub fn pop(&mut self) -> Result<Mat4, RendererError> {
        self.saved.pop().ok_or(RendererError::MatrixStackUnderflow)
    }

    pub fn depth(&self) -> usize {
        self.saved.len()
    }

    pub fn clear(&mut self) {
        self.saved.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::f32::consts::{FRAC_PI_2, FRAC_PI_3};

    #[test]
    fn translate_flips_y() {
        let m = translate(Mat4::IDENTITY, Vec3::new(1.0, 2.0, 3.0));
        let p = m.transform_point3(Vec3::ZERO);
        assert!(p.abs_diff_eq(Vec3::new(1.0, -2.0, 3.0), 1e-6));
    }

    #[test]
    fn scale_does_not_flip_y() {
        let m = scale(Mat4::IDENTITY, Vec3::new(2.0, 3.0, 4.0));
        let p = m.transform_point3(Vec3::ONE);
        assert!(p.abs_diff_eq(Vec3::new(2.0, 3.0, 4.0), 1e-6));
    }

    #[test]
    fn rotate_normalises_axis() {
        let a = rotate(Mat4::IDENTITY, FRAC_PI_2, Vec3::new(0.0, 0.0, 5.0)).unwrap();
        let b = rotate(Mat4::IDENTITY, FRAC_PI_2, Vec3::Z).unwrap();
        assert!(a.abs_diff_eq(b, 1e-6));
        let p = a.transform_point3(Vec3::X);
        assert!(p.abs_diff_eq(Vec3::Y, 1e-6));
    }

    #[test]
    fn rotate_rejects_zero_axis() {
        let err = rotate(Mat4::IDENTITY, 1.0, Vec3::ZERO).unwrap_err();
        assert!(matches!(err, RendererError::DegenerateTransform(_)));
    }

    #[test]
    fn perspective_rejects_degenerate_inputs() {
        assert!(perspective(FRAC_PI_3, 0.0, 1.0, 10.0).is_err());
        assert!(perspective(FRAC_PI_3, 1.0, 10.0, 10.0).is_err());
        assert!(perspective(0.0, 1.0, 1.0, 10.0).is_err());
        assert!(perspective(FRAC_PI_3, 1.0, 0.0, 10.0).is_err());
        assert!(perspective(FRAC_PI_3, 1.0, 1.0, 10.0).unwrap().is_finite());
    }

    #[test]
    fn ortho_rejects_flat_boxes() {
        assert!(ortho(1.0, 1.0, -1.0, 1.0, 0.0, 10.0).is_err());
        assert!(ortho(-1.0, 1.0, 2.0, 2.0, 0.0, 10.0).is_err());
        assert!(ortho(-1.0, 1.0, -1.0, 1.0, 5.0, 5.0).is_err());
    }

    #[test]
    fn inverse_transpose_undoes_non_uniform_scale() {
        let mv = scale(Mat4::IDENTITY, Vec3::new(2.0, 1.0, 1.0));
        let n = inverse_transpose(&mv).unwrap();
        let normal = n * Vec3::X;
        assert!(normal.abs_diff_eq(Vec3::new(0.5, 0.0, 0.0), 1e-6));
        assert!(inverse_transpose(&scale(Mat4::IDENTITY, Vec3::ZERO)).is_err());
    }

    #[test]
    fn inverse_transpose_of_rotation_is_rotation() {
        let mv = rotate(Mat4::IDENTITY, 0.7, Vec3::Y).unwrap();
        let n = inverse_transpose(&mv).unwrap();
        assert!(n.abs_diff_eq(Mat3::from_mat4(mv), 1e-5));
    }

    #[test]
    fn stack_pops_in_reverse_order() {
        let mut stack = MatrixStack::new();
        let a = Mat4::from_translation(Vec3::X);
        let b = Mat4::from_translation(Vec3::Y);
        stack.push(a);
        stack.push(b);
        assert_eq!(stack.depth(), 2);
        assert_eq!(stack.pop().unwrap(), b);
        assert_eq!(stack.pop().unwrap(), a);
        assert_eq!(stack.pop(), Err(RendererError::MatrixStackUnderflow));
    }
}

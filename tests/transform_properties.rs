//! Randomised checks of the camera basis and push/pop restoration.

use glam::{Mat3, Mat4, Vec3};
use rand::rngs::SmallRng;
use rand::{Rng, SeedableRng};
use sketch_gl::renderer::HeadlessFactory;
use sketch_gl::{ContextAttributes, Renderer, RendererError};

const TOLERANCE: f32 = 1e-4;

fn renderer() -> Renderer<HeadlessFactory> {
    Renderer::new(HeadlessFactory::new(), 64, 48, ContextAttributes::default()).unwrap()
}

fn random_vec3(rng: &mut SmallRng, extent: f32) -> Vec3 {
    Vec3::new(
        rng.gen_range(-extent..extent),
        rng.gen_range(-extent..extent),
        rng.gen_range(-extent..extent),
    )
}

#[test]
fn camera_basis_is_orthonormal() {
    let mut rng = SmallRng::seed_from_u64(0x5eed);
    let mut r = renderer();
    let mut checked = 0;

    while checked < 200 {
        let eye = random_vec3(&mut rng, 500.0);
        let center = random_vec3(&mut rng, 50.0);
        let up = random_vec3(&mut rng, 1.0);
        let forward = eye - center;
        if forward.length() < 1.0 || up.length() < 0.1 {
            continue;
        }
        if up.normalize().dot(forward.normalize()).abs() > 0.99 {
            continue;
        }

        r.camera(eye, center, up);
        let rotation = Mat3::from_mat4(r.camera_matrix()).transpose();
        let rows = [rotation.x_axis, rotation.y_axis, rotation.z_axis];
        for (i, a) in rows.iter().enumerate() {
            assert!((a.length() - 1.0).abs() < TOLERANCE, "row {i} not unit: {a:?}");
            for b in &rows[i + 1..] {
                assert!(a.dot(*b).abs() < TOLERANCE, "rows not orthogonal: {a:?} {b:?}");
            }
        }
        let eye_in_view = r.camera_matrix().transform_point3(eye);
        assert!(eye_in_view.length() < 1e-2 * eye.length().max(1.0));
        checked += 1;
    }
}

fn random_transform(r: &mut Renderer<HeadlessFactory>, rng: &mut SmallRng) {
    match rng.gen_range(0..7) {
        0 => r.translate(
            rng.gen_range(-100.0..100.0),
            rng.gen_range(-100.0..100.0),
            rng.gen_range(-100.0..100.0),
        ),
        1 => r.scale(
            rng.gen_range(0.1..3.0),
            rng.gen_range(0.1..3.0),
            rng.gen_range(0.1..3.0),
        ),
        2 => r.rotate_x(rng.gen_range(-3.0..3.0)),
        3 => r.rotate_y(rng.gen_range(-3.0..3.0)),
        4 => r.rotate_z(rng.gen_range(-3.0..3.0)),
        5 => r
            .rotate(rng.gen_range(-3.0..3.0), Vec3::new(1.0, rng.gen_range(-1.0..1.0), 0.5))
            .unwrap(),
        _ => r.apply_matrix(Mat4::from_scale(Vec3::splat(rng.gen_range(0.5..2.0)))),
    }
}

#[test]
fn pop_restores_pre_push_matrix_exactly() {
    let mut rng = SmallRng::seed_from_u64(42);
    let mut r = renderer();

    for _ in 0..100 {
        for _ in 0..rng.gen_range(0..4) {
            random_transform(&mut r, &mut rng);
        }
        let before = r.model_view();
        r.push();
        for _ in 0..rng.gen_range(1..10) {
            random_transform(&mut r, &mut rng);
        }
        r.pop().unwrap();
        assert_eq!(r.model_view(), before);
        r.reset_matrix();
    }
}

#[test]
fn nested_scopes_unwind_in_order() {
    let mut rng = SmallRng::seed_from_u64(7);
    let mut r = renderer();
    let mut expected = Vec::new();

    for _ in 0..16 {
        expected.push(r.model_view());
        r.push();
        random_transform(&mut r, &mut rng);
    }
    assert_eq!(r.stack_depth(), 16);
    while let Some(matrix) = expected.pop() {
        r.pop().unwrap();
        assert_eq!(r.model_view(), matrix);
    }
    assert_eq!(r.pop(), Err(RendererError::MatrixStackUnderflow));
}

#[test]
fn zero_axis_rotation_is_rejected_without_side_effects() {
    let mut r = renderer();
    let before = r.model_view();
    assert!(matches!(
        r.rotate(1.0, Vec3::ZERO),
        Err(RendererError::DegenerateTransform(_))
    ));
    assert_eq!(r.model_view(), before);
}

//! Two unit cubes, one inside a push/pop scope with a translation.

use std::f32::consts::PI;

use glam::{Mat4, Vec3};
use sketch_gl::renderer::headless::DrawCall;
use sketch_gl::renderer::HeadlessFactory;
use sketch_gl::{ContextAttributes, Renderer};

fn eye_space_vertices(draw: &DrawCall) -> Vec<Vec3> {
    let model_view = draw.mat4("uModelViewMatrix").unwrap();
    draw.vec3_attribute("aPosition")
        .unwrap()
        .into_iter()
        .map(|p| model_view.transform_point3(p))
        .collect()
}

#[test]
fn scoped_translation_moves_only_the_first_cube() {
    let mut r = Renderer::new(HeadlessFactory::new(), 100, 100, ContextAttributes::default()).unwrap();
    r.camera((0.0, 0.0, 500.0), (0.0, 0.0, 0.0), (0.0, 1.0, 0.0));
    r.perspective(PI / 3.0, 1.0, 50.0, 5000.0).unwrap();

    r.push();
    r.translate(10.0, 0.0, 0.0);
    r.draw_box(1.0, 1.0, 1.0).unwrap();
    r.pop().unwrap();
    r.draw_box(1.0, 1.0, 1.0).unwrap();

    let draws = r.gl().draws();
    assert_eq!(draws.len(), 2);
    assert_eq!(
        draws[0].mat4("uProjectionMatrix"),
        Some(Mat4::perspective_rh_gl(PI / 3.0, 1.0, 50.0, 5000.0))
    );

    let moved = eye_space_vertices(&draws[0]);
    let origin = eye_space_vertices(&draws[1]);
    assert_eq!(moved.len(), 24);
    assert_eq!(moved.len(), origin.len());
    for (a, b) in moved.iter().zip(&origin) {
        assert!(
            (*a - *b).abs_diff_eq(Vec3::new(10.0, 0.0, 0.0), 1e-4),
            "{a:?} - {b:?}"
        );
    }

    // Outside the scope the model-view is just the camera.
    assert_eq!(draws[1].mat4("uModelViewMatrix"), Some(r.camera_matrix()));
    for (v, p) in origin.iter().zip(draws[1].vec3_attribute("aPosition").unwrap()) {
        assert!(v.abs_diff_eq(p - Vec3::new(0.0, 0.0, 500.0), 1e-4));
    }
}

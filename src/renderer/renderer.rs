// renderer/renderer.rs
use std::collections::HashMap;

use glam::{Mat3, Mat4, Vec3};
use log::{debug, info, warn};

use crate::asset::AssetCache;
use crate::color::{Color, ColorArg};
use crate::error::RendererError;
use crate::math::matrix::{self, MatrixStack};
use crate::renderer::camera::{Camera, CameraMode, Projection};
use crate::renderer::geometry::{Geometry, GpuGeometry};
use crate::renderer::gl::{Capability, ContextFactory, GlContext};
use crate::renderer::immediate::{ImmediateBuffers, ImmediateShape};
use crate::renderer::lights::{LightAccumulator, LightCounts, USE_LIGHTING};
use crate::renderer::material::DrawMode;
use crate::renderer::shader::{BuiltinShaders, ProgramKey, ShaderCache, ShaderSource, UniformValue};
use crate::renderer::texture::Texture;
use crate::settings::{ContextAttribute, ContextAttributes};

const MODEL_VIEW: &str = "uModelViewMatrix";
const PROJECTION: &str = "uProjectionMatrix";
const NORMAL_MATRIX: &str = "uNormalMatrix";

const OPAQUE_BLACK: [u8; 4] = [0, 0, 0, 255];

type Gl<F> = <F as ContextFactory>::Context;

/// The 3D drawing state machine: one GL context, the programs built for
/// it, the current transforms, camera, material and lights.
pub struct Renderer<F: ContextFactory> {
    pub(super) factory: F,
    pub(super) gl: Gl<F>,
    pub(super) attributes: ContextAttributes,
    pub(super) width: u32,
    pub(super) height: u32,

    pub(super) sources: Box<dyn ShaderSource>,
    pub(super) shaders: ShaderCache<Gl<F>>,
    pub(super) current_shader: Option<ProgramKey>,

    pub(super) model_view: Mat4,
    pub(super) projection: Mat4,
    pub(super) camera_matrix: Mat4,
    pub(super) stack: MatrixStack,
    pub(super) camera: Camera,
    pub(super) projection_params: Projection,
    pub(super) camera_mode: CameraMode,

    pub(super) draw_mode: DrawMode,
    pub(super) fill_color: Color,
    pub(super) stroke_color: Color,
    pub(super) stroke_weight: f32,
    pub(super) blending: bool,
    pub(super) lights: LightAccumulator,

    pub(super) textures: AssetCache<Texture<<Gl<F> as GlContext>::Texture>>,
    pub(super) geometry: HashMap<String, CachedMesh<Gl<F>>>,
    pub(super) frame: u64,
    pub(super) immediate: Option<ImmediateShape>,
    pub(super) immediate_buffers: Option<ImmediateBuffers<<Gl<F> as GlContext>::Buffer>>,
}

/// A retained mesh and the frame it was last drawn in.
pub(super) struct CachedMesh<C: GlContext> {
    gpu: GpuGeometry<C>,
    last_frame: u64,
}

impl<F: ContextFactory> Renderer<F> {
    pub fn new(
        factory: F,
        width: u32,
        height: u32,
        attributes: ContextAttributes,
    ) -> Result<Self, RendererError> {
        Self::with_shader_source(factory, width, height, attributes, Box::new(BuiltinShaders))
    }

    /// Like [`Renderer::new`], compiling programs from `sources` instead of
    /// the built-in GLSL.
    pub fn with_shader_source(
        mut factory: F,
        width: u32,
        height: u32,
        attributes: ContextAttributes,
        sources: Box<dyn ShaderSource>,
    ) -> Result<Self, RendererError> {
        let attributes = attributes.validate();
        let (width, height) = (width.max(1), height.max(1));
        let gl = factory.create(&attributes, width, height)?;
        info!("Created {}x{} GL context ({:?})", width, height, attributes.flags());

        let camera = Camera::default_for(height as f32);
        let projection_params = Projection::default_perspective(width as f32, height as f32);
        let mut renderer = Self {
            factory,
            gl,
            attributes,
            width,
            height,
            sources,
            shaders: ShaderCache::new(),
            current_shader: None,
            model_view: Mat4::IDENTITY,
            projection: Mat4::IDENTITY,
            camera_matrix: Mat4::IDENTITY,
            stack: MatrixStack::new(),
            camera,
            projection_params,
            camera_mode: CameraMode::Default,
            draw_mode: DrawMode::Fill,
            fill_color: Color::WHITE,
            stroke_color: Color::BLACK,
            stroke_weight: 1.0,
            blending: false,
            lights: LightAccumulator::new(),
            textures: AssetCache::new(),
            geometry: HashMap::new(),
            frame: 0,
            immediate: None,
            immediate_buffers: None,
        };
        renderer.init_state()?;
        Ok(renderer)
    }

    /// Default GL state, default camera and the normal material.
    fn init_state(&mut self) -> Result<(), RendererError> {
        self.gl
            .viewport(0, 0, self.width as i32, self.height as i32);
        self.gl.set_capability(Capability::DepthTest, true);
        self.gl.set_capability(Capability::CullFace, false);

        self.current_shader = None;
        self.stack.clear();
        self.lights.reset();
        self.immediate = None;
        self.fill_color = Color::WHITE;
        self.stroke_color = Color::BLACK;
        self.stroke_weight = 1.0;

        self.camera_mode = CameraMode::Default;
        self.apply_default_camera()?;
        self.normal_material()
    }

    fn apply_default_camera(&mut self) -> Result<(), RendererError> {
        let (w, h) = (self.width as f32, self.height as f32);
        let projection_params = Projection::default_perspective(w, h);
        self.projection = projection_params.matrix()?;
        self.projection_params = projection_params;
        self.camera = Camera::default_for(h);
        self.camera_matrix = self.camera.view_matrix();
        self.model_view = self.camera_matrix;
        Ok(())
    }

    /// Binds the program for `key`, building it on first use. Binding the
    /// program that is already current does nothing.
    pub fn use_shader(&mut self, key: ProgramKey) -> Result<(), RendererError> {
        if self.current_shader == Some(key) {
            return Ok(());
        }
        let handle = self
            .shaders
            .get_or_create(&mut self.gl, &*self.sources, key)?
            .handle();
        self.gl.use_program(Some(handle));
        self.current_shader = Some(key);
        debug!("Using shader program {}", key);
        Ok(())
    }

    /// Writes a uniform on the current program. Names it does not declare
    /// are ignored.
    pub fn set_uniform(
        &mut self,
        name: &str,
        value: UniformValue<'_, <Gl<F> as GlContext>::Texture>,
    ) -> Result<(), RendererError> {
        let Some(key) = self.current_shader else {
            return Ok(());
        };
        self.shaders.set_uniform(&mut self.gl, key, name, value)
    }

    /// Recreates the context with new attributes. Programs, textures and
    /// geometry are deleted from the old context first. If creation fails
    /// the current context stays in place.
    pub fn set_attributes(&mut self, attributes: ContextAttributes) -> Result<(), RendererError> {
        let attributes = attributes.validate();
        let gl = self.factory.create(&attributes, self.width, self.height)?;
        info!("Recreated GL context ({:?})", attributes.flags());

        self.release_gpu_resources();
        self.gl = gl;
        self.attributes = attributes;
        self.init_state()
    }

    /// Deletes everything this renderer created on the current context.
    fn release_gpu_resources(&mut self) {
        self.shaders.release(&mut self.gl);
        self.current_shader = None;
        let textures: Vec<_> = self.textures.drain().collect();
        if !textures.is_empty() {
            debug!("Deleting {} textures", textures.len());
        }
        for texture in textures {
            self.gl.delete_texture(texture.raw());
        }
        for (_, mesh) in self.geometry.drain() {
            mesh.gpu.release(&mut self.gl);
        }
        if let Some(buffers) = self.immediate_buffers.take() {
            buffers.release(&mut self.gl);
        }
    }

    pub fn set_attribute(
        &mut self,
        attribute: ContextAttribute,
        enabled: bool,
    ) -> Result<(), RendererError> {
        self.set_attributes(self.attributes.with(attribute, enabled))
    }

    pub fn attributes(&self) -> &ContextAttributes {
        &self.attributes
    }

    pub fn resize(&mut self, width: u32, height: u32) -> Result<(), RendererError> {
        let (width, height) = (width.max(1), height.max(1));
        self.width = width;
        self.height = height;
        self.factory.resize(&mut self.gl, width, height);
        self.gl.viewport(0, 0, width as i32, height as i32);
        if self.camera_mode == CameraMode::Default {
            self.apply_default_camera()?;
        }
        debug!("Resized to {}x{}", width, height);
        Ok(())
    }

    pub fn size(&self) -> (u32, u32) {
        (self.width, self.height)
    }

    /// Starts a frame: clears lights, resets model-view to the camera and
    /// frees retained meshes that were not drawn during the last frame.
    pub fn begin_frame(&mut self) {
        self.evict_unused_geometry();
        if self.stack.depth() > 0 {
            warn!(
                "{} push() calls were never popped last frame; discarding them",
                self.stack.depth()
            );
            self.stack.clear();
        }
        self.lights.reset();
        self.model_view = self.camera_matrix;
        if let Some(shape) = self.immediate.take() {
            warn!("Shape left open across frames was discarded");
            if let Some(previous) = shape.previous_shader() {
                if let Err(err) = self.use_shader(previous) {
                    warn!("Could not restore shader {}: {}", previous, err);
                }
            }
        }
    }

    pub fn background(&mut self, color: impl Into<ColorArg>) -> Result<(), RendererError> {
        let color = color.into().resolve()?;
        self.gl.clear(color.rgba());
        Ok(())
    }

    // Camera

    /// Places the camera at `eye` looking at `center`.
    pub fn camera(&mut self, eye: impl Into<Vec3>, center: impl Into<Vec3>, up: impl Into<Vec3>) {
        self.camera = Camera::look_at(eye.into(), center.into(), up.into());
        self.camera_matrix = self.camera.view_matrix();
        self.model_view = self.camera_matrix;
        self.camera_mode = CameraMode::Custom;
    }

    /// The camera `new` starts with, for the current canvas height.
    pub fn camera_default(&mut self) {
        let camera = Camera::default_for(self.height as f32);
        self.camera(camera.eye, camera.center, camera.up);
    }

    pub fn perspective(
        &mut self,
        fov_y: f32,
        aspect: f32,
        near: f32,
        far: f32,
    ) -> Result<(), RendererError> {
        self.set_projection(Projection::Perspective {
            fov_y,
            aspect,
            near,
            far,
        })
    }

    pub fn perspective_default(&mut self) -> Result<(), RendererError> {
        self.set_projection(Projection::default_perspective(
            self.width as f32,
            self.height as f32,
        ))
    }

    pub fn ortho(
        &mut self,
        left: f32,
        right: f32,
        bottom: f32,
        top: f32,
        near: f32,
        far: f32,
    ) -> Result<(), RendererError> {
        self.set_projection(Projection::Orthographic {
            left,
            right,
            bottom,
            top,
            near,
            far,
        })
    }

    pub fn ortho_default(&mut self) -> Result<(), RendererError> {
        self.set_projection(Projection::default_ortho(
            self.width as f32,
            self.height as f32,
        ))
    }

    fn set_projection(&mut self, projection: Projection) -> Result<(), RendererError> {
        self.projection = projection.matrix()?;
        self.projection_params = projection;
        self.camera_mode = CameraMode::Custom;
        Ok(())
    }

    /// Back to the size-derived camera and projection, which then follow
    /// resizes again.
    pub fn reset_camera(&mut self) -> Result<(), RendererError> {
        self.camera_mode = CameraMode::Default;
        self.apply_default_camera()
    }

    pub fn camera_state(&self) -> &Camera {
        &self.camera
    }

    pub fn projection_params(&self) -> Projection {
        self.projection_params
    }

    pub fn camera_mode(&self) -> CameraMode {
        self.camera_mode
    }

    // Transforms

    pub fn translate(&mut self, x: f32, y: f32, z: f32) {
        self.model_view = matrix::translate(self.model_view, Vec3::new(x, y, z));
    }

    pub fn scale(&mut self, x: f32, y: f32, z: f32) {
        self.model_view = matrix::scale(self.model_view, Vec3::new(x, y, z));
    }

    /// Rotates by `angle` radians around `axis`.
    pub fn rotate(&mut self, angle: f32, axis: impl Into<Vec3>) -> Result<(), RendererError> {
        self.model_view = matrix::rotate(self.model_view, angle, axis.into())?;
        Ok(())
    }

    pub fn rotate_x(&mut self, angle: f32) {
        self.model_view *= Mat4::from_rotation_x(angle);
    }

    pub fn rotate_y(&mut self, angle: f32) {
        self.model_view *= Mat4::from_rotation_y(angle);
    }

    pub fn rotate_z(&mut self, angle: f32) {
        self.model_view *= Mat4::from_rotation_z(angle);
    }

    pub fn apply_matrix(&mut self, m: Mat4) {
        self.model_view *= m;
    }

    /// Drops every transform since the camera was set.
    pub fn reset_matrix(&mut self) {
        self.model_view = self.camera_matrix;
    }

    pub fn push(&mut self) {
        self.stack.push(self.model_view);
    }

    pub fn pop(&mut self) -> Result<(), RendererError> {
        self.model_view = self.stack.pop()?;
        Ok(())
    }

    pub fn stack_depth(&self) -> usize {
        self.stack.depth()
    }

    // Retained geometry

    pub fn draw_box(&mut self, width: f32, height: f32, depth: f32) -> Result<(), RendererError> {
        let key = format!("box|{}|{}|{}", width, height, depth);
        self.draw_cached(key, || Geometry::cuboid(width, height, depth))
    }

    pub fn draw_sphere(
        &mut self,
        radius: f32,
        detail_x: u32,
        detail_y: u32,
    ) -> Result<(), RendererError> {
        let key = format!("sphere|{}|{}|{}", radius, detail_x, detail_y);
        self.draw_cached(key, || Geometry::sphere(radius, detail_x, detail_y))
    }

    pub fn draw_plane(&mut self, width: f32, height: f32) -> Result<(), RendererError> {
        let key = format!("plane|{}|{}", width, height);
        self.draw_cached(key, || Geometry::plane(width, height))
    }

    /// Draws caller-built geometry, uploading it the first time `key` is seen.
    pub fn draw_geometry(&mut self, key: &str, geometry: &Geometry) -> Result<(), RendererError> {
        self.draw_cached(key.to_string(), || geometry.clone())
    }

    /// Number of distinct meshes uploaded to the current context.
    pub fn cached_geometry(&self) -> usize {
        self.geometry.len()
    }

    fn draw_cached(
        &mut self,
        key: String,
        build: impl FnOnce() -> Geometry,
    ) -> Result<(), RendererError> {
        match self.geometry.get_mut(&key) {
            Some(mesh) => mesh.last_frame = self.frame,
            None => {
                let gpu = GpuGeometry::upload(&mut self.gl, &build())?;
                debug!("Cached geometry {}", key);
                self.geometry.insert(
                    key.clone(),
                    CachedMesh {
                        gpu,
                        last_frame: self.frame,
                    },
                );
            }
        }
        let program_key = self.prepare_draw()?;

        let (Some(mesh), Some(program)) = (self.geometry.get(&key), self.shaders.get(program_key))
        else {
            return Ok(());
        };
        mesh.gpu.draw(&mut self.gl, program, self.draw_mode);
        Ok(())
    }

    fn evict_unused_geometry(&mut self) {
        let frame = self.frame;
        let (kept, stale): (HashMap<_, _>, HashMap<_, _>) = std::mem::take(&mut self.geometry)
            .into_iter()
            .partition(|(_, mesh)| mesh.last_frame >= frame);
        self.geometry = kept;
        if !stale.is_empty() {
            debug!("Releasing {} meshes unused last frame", stale.len());
        }
        for (_, mesh) in stale {
            mesh.gpu.release(&mut self.gl);
        }
        self.frame += 1;
    }

    /// Pushes matrices (and lights, for lit programs) to the current
    /// program, binding the normal-material program if none is bound yet.
    fn prepare_draw(&mut self) -> Result<ProgramKey, RendererError> {
        let key = match self.current_shader {
            Some(key) => key,
            None => {
                self.use_shader(ProgramKey::NORMAL)?;
                ProgramKey::NORMAL
            }
        };
        self.set_matrix_uniforms()?;
        let lit = self
            .shaders
            .get(key)
            .is_some_and(|program| program.has_uniform(USE_LIGHTING));
        if lit {
            self.upload_lights()?;
        }
        Ok(key)
    }

    pub(crate) fn set_matrix_uniforms(&mut self) -> Result<(), RendererError> {
        self.set_uniform(PROJECTION, UniformValue::Mat4(self.projection))?;
        self.set_uniform(MODEL_VIEW, UniformValue::Mat4(self.model_view))?;
        let normal = self.normal_matrix().unwrap_or_else(|_| {
            debug!("Model-view is singular; using a zero normal matrix");
            Mat3::ZERO
        });
        self.set_uniform(NORMAL_MATRIX, UniformValue::Mat3(normal))
    }

    // Readback

    /// RGBA8 pixels of a canvas rectangle, GL row order (bottom row first).
    /// The rectangle is clipped to the canvas first, so the result covers
    /// only the overlap and is empty when there is none.
    pub fn read_pixels(&mut self, x: i32, y: i32, width: i32, height: i32) -> Vec<u8> {
        match clip_to_canvas(x, y, width, height, self.width, self.height) {
            Some((x, y, width, height)) => self.gl.read_pixels(x, y, width, height),
            None => Vec::new(),
        }
    }

    /// One pixel in canvas coordinates (origin top-left). Pixels outside
    /// the canvas read as opaque black.
    pub fn get_pixel(&mut self, x: i32, y: i32) -> [u8; 4] {
        if x < 0 || y < 0 || x >= self.width as i32 || y >= self.height as i32 {
            return OPAQUE_BLACK;
        }
        let gl_y = self.height as i32 - 1 - y;
        let data = self.gl.read_pixels(x, gl_y, 1, 1);
        match data.as_slice() {
            [r, g, b, a, ..] => [*r, *g, *b, *a],
            _ => OPAQUE_BLACK,
        }
    }

    // Accessors

    pub fn gl(&self) -> &Gl<F> {
        &self.gl
    }

    pub fn gl_mut(&mut self) -> &mut Gl<F> {
        &mut self.gl
    }

    pub fn factory(&self) -> &F {
        &self.factory
    }

    pub fn factory_mut(&mut self) -> &mut F {
        &mut self.factory
    }

    pub fn model_view(&self) -> Mat4 {
        self.model_view
    }

    pub fn projection(&self) -> Mat4 {
        self.projection
    }

    pub fn camera_matrix(&self) -> Mat4 {
        self.camera_matrix
    }

    /// Inverse-transpose of the model-view's upper 3x3.
    pub fn normal_matrix(&self) -> Result<Mat3, RendererError> {
        matrix::inverse_transpose(&self.model_view)
    }

    pub fn draw_mode(&self) -> DrawMode {
        self.draw_mode
    }

    pub fn fill_color(&self) -> Color {
        self.fill_color
    }

    pub fn stroke_color(&self) -> Color {
        self.stroke_color
    }

    pub fn blending(&self) -> bool {
        self.blending
    }

    pub fn light_counts(&self) -> LightCounts {
        self.lights.counts()
    }

    pub fn current_shader(&self) -> Option<ProgramKey> {
        self.current_shader
    }

    pub fn shader_cache(&self) -> &ShaderCache<Gl<F>> {
        &self.shaders
    }

    pub fn texture_count(&self) -> usize {
        self.textures.len()
    }
}

impl<F: ContextFactory> Drop for Renderer<F> {
    fn drop(&mut self) {
        self.release_gpu_resources();
    }
}

fn clip_to_canvas(
    x: i32,
    y: i32,
    width: i32,
    height: i32,
    canvas_width: u32,
    canvas_height: u32,
) -> Option<(i32, i32, i32, i32)> {
    let (x, y) = (i64::from(x), i64::from(y));
    let x0 = x.max(0);
    let y0 = y.max(0);
    let x1 = (x + i64::from(width.max(0))).min(i64::from(canvas_width));
    let y1 = (y + i64::from(height.max(0))).min(i64::from(canvas_height));
    (x1 > x0 && y1 > y0).then(|| (x0 as i32, y0 as i32, (x1 - x0) as i32, (y1 - y0) as i32))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::renderer::headless::HeadlessFactory;

    fn renderer() -> Renderer<HeadlessFactory> {
        Renderer::new(HeadlessFactory::new(), 100, 100, ContextAttributes::default()).unwrap()
    }

    #[test]
    fn starts_with_default_camera_and_normal_material() {
        let r = renderer();
        assert_eq!(r.camera_mode(), CameraMode::Default);
        assert_eq!(r.current_shader(), Some(ProgramKey::NORMAL));
        assert_eq!(r.model_view(), r.camera_matrix());
        assert_eq!(r.draw_mode(), DrawMode::Fill);
        assert!(r.gl().capability_enabled(Capability::DepthTest));
    }

    #[test]
    fn use_shader_skips_rebinding_current_program() {
        let mut r = renderer();
        let switches = r.gl().stats().program_switches;
        r.use_shader(ProgramKey::NORMAL).unwrap();
        assert_eq!(r.gl().stats().program_switches, switches);
        r.use_shader(ProgramKey::BASIC).unwrap();
        r.use_shader(ProgramKey::NORMAL).unwrap();
        assert_eq!(r.gl().stats().program_switches, switches + 2);
        assert_eq!(r.shader_cache().compile_count(), 2);
    }

    #[test]
    fn begin_frame_discards_unbalanced_pushes() {
        let mut r = renderer();
        r.push();
        r.translate(10.0, 0.0, 0.0);
        r.begin_frame();
        assert_eq!(r.stack_depth(), 0);
        assert_eq!(r.model_view(), r.camera_matrix());
        assert_eq!(r.pop(), Err(RendererError::MatrixStackUnderflow));
    }

    #[test]
    fn reset_matrix_returns_to_camera() {
        let mut r = renderer();
        r.rotate_y(0.5);
        r.scale(2.0, 2.0, 2.0);
        r.reset_matrix();
        assert_eq!(r.model_view(), r.camera_matrix());
    }

    #[test]
    fn resize_follows_default_camera_only() {
        let mut r = renderer();
        r.resize(200, 100).unwrap();
        match r.projection_params() {
            Projection::Perspective { aspect, .. } => assert_eq!(aspect, 2.0),
            other => panic!("unexpected projection {other:?}"),
        }
        assert_eq!(r.gl().viewport_rect(), [0, 0, 200, 100]);
        assert_eq!(r.gl().size(), (200, 100));

        r.ortho(-1.0, 1.0, -1.0, 1.0, 0.1, 10.0).unwrap();
        let before = r.projection();
        r.resize(50, 50).unwrap();
        assert_eq!(r.projection(), before);
    }

    #[test]
    fn read_pixels_clips_to_canvas() {
        let mut r = renderer();
        r.background((0.0, 255.0, 0.0)).unwrap();
        assert_eq!(r.read_pixels(0, 0, 40_000, 40_000).len(), 100 * 100 * 4);
        assert_eq!(r.read_pixels(-10, 90, 20, 20).len(), 10 * 10 * 4);
        assert_eq!(&r.read_pixels(95, 95, 1, 1)[..], &[0, 255, 0, 255]);
        assert!(r.read_pixels(i32::MAX, 0, i32::MAX, 1).is_empty());
        assert!(r.read_pixels(100, 0, 5, 5).is_empty());
    }

    #[test]
    fn get_pixel_flips_rows_and_guards_bounds() {
        let mut r = renderer();
        r.background((255.0, 0.0, 0.0)).unwrap();
        assert_eq!(r.get_pixel(0, 0), [255, 0, 0, 255]);
        assert_eq!(r.get_pixel(99, 99), [255, 0, 0, 255]);
        assert_eq!(r.get_pixel(100, 0), [0, 0, 0, 255]);
        assert_eq!(r.get_pixel(-1, 5), [0, 0, 0, 255]);
    }

    #[test]
    fn degenerate_projection_keeps_previous_matrix() {
        let mut r = renderer();
        let before = r.projection();
        assert!(r.perspective(1.0, 1.0, 5.0, 5.0).is_err());
        assert_eq!(r.projection(), before);
    }
}

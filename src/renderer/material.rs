//! Fill/stroke colors, materials, textures and lights.
//!
//! Every call here picks the program it needs, pushes its uniforms to it
//! and sets the blend state that goes with the color's alpha.

use glam::Vec3;
use image::RgbaImage;
use log::{debug, trace};

use crate::asset::Handle;
use crate::color::{Color, ColorArg};
use crate::error::RendererError;
use crate::renderer::gl::{BlendFactor, Capability, ContextFactory, GlContext};
use crate::renderer::lights::{
    LightVector, AMBIENT_COLOR, AMBIENT_COUNT, DIRECTIONAL_COLOR, DIRECTIONAL_COUNT,
    DIRECTIONAL_DIRECTION, POINT_COLOR, POINT_COUNT, POINT_LOCATION, USE_LIGHTING,
};
use crate::renderer::renderer::Renderer;
use crate::renderer::shader::{ProgramKey, UniformValue};
use crate::renderer::texture::Texture;

pub(crate) const MATERIAL_COLOR: &str = "uMaterialColor";
pub(crate) const SAMPLER: &str = "uSampler";
pub(crate) const IS_TEXTURE: &str = "isTexture";
pub(crate) const SPECULAR: &str = "uSpecular";

/// How retained geometry is shaded.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum DrawMode {
    #[default]
    Fill,
    /// Edges only, in the stroke color.
    Wireframe,
    Texture,
}

pub type TextureHandle<F> =
    Handle<Texture<<<F as ContextFactory>::Context as GlContext>::Texture>>;

impl<F: ContextFactory> Renderer<F> {
    pub fn fill(&mut self, color: impl Into<ColorArg>) -> Result<(), RendererError> {
        let color = color.into().resolve()?;
        self.fill_color = color;
        self.draw_mode = DrawMode::Fill;

        if self.immediate.is_some() {
            self.use_shader(ProgramKey::IMMEDIATE)?;
        } else if self.lights.counts().total() > 0 {
            // Keep lighting in effect for fills issued after lights.
            self.use_shader(ProgramKey::LIGHT)?;
            self.set_uniform(MATERIAL_COLOR, UniformValue::Vec4(color.rgba()))?;
            self.set_uniform(IS_TEXTURE, UniformValue::Bool(false))?;
            self.set_uniform(SPECULAR, UniformValue::Bool(false))?;
        } else {
            self.use_shader(ProgramKey::BASIC)?;
            self.set_uniform(MATERIAL_COLOR, UniformValue::Vec4(color.rgba()))?;
        }
        self.apply_color_blend(color);
        Ok(())
    }

    /// Switches retained geometry to wireframe in the stroke color.
    pub fn no_fill(&mut self) -> Result<(), RendererError> {
        self.draw_mode = DrawMode::Wireframe;
        self.use_shader(ProgramKey::BASIC)?;
        let stroke = self.stroke_color;
        self.set_uniform(MATERIAL_COLOR, UniformValue::Vec4(stroke.rgba()))?;
        self.apply_color_blend(stroke);
        Ok(())
    }

    pub fn stroke(&mut self, color: impl Into<ColorArg>) -> Result<(), RendererError> {
        let color = color.into().resolve()?;
        self.stroke_color = color;
        if self.draw_mode == DrawMode::Wireframe {
            self.use_shader(ProgramKey::BASIC)?;
            self.set_uniform(MATERIAL_COLOR, UniformValue::Vec4(color.rgba()))?;
            self.apply_color_blend(color);
        }
        Ok(())
    }

    pub fn stroke_weight(&mut self, weight: f32) {
        self.stroke_weight = weight.max(0.0);
    }

    /// Colors surfaces by their view-space normal.
    pub fn normal_material(&mut self) -> Result<(), RendererError> {
        self.draw_mode = DrawMode::Fill;
        self.use_shader(ProgramKey::NORMAL)?;
        self.apply_color_blend(Color::WHITE);
        Ok(())
    }

    pub fn ambient_material(&mut self, color: impl Into<ColorArg>) -> Result<(), RendererError> {
        self.lit_material(color.into().resolve()?, false)
    }

    pub fn specular_material(&mut self, color: impl Into<ColorArg>) -> Result<(), RendererError> {
        self.lit_material(color.into().resolve()?, true)
    }

    fn lit_material(&mut self, color: Color, specular: bool) -> Result<(), RendererError> {
        self.draw_mode = DrawMode::Fill;
        self.use_shader(ProgramKey::LIGHT)?;
        self.set_uniform(MATERIAL_COLOR, UniformValue::Vec4(color.rgba()))?;
        self.set_uniform(SPECULAR, UniformValue::Bool(specular))?;
        self.set_uniform(IS_TEXTURE, UniformValue::Bool(false))?;
        self.apply_color_blend(color);
        Ok(())
    }

    /// Uploads `image` as a texture owned by this renderer's context.
    pub fn create_texture(&mut self, image: &RgbaImage) -> Result<TextureHandle<F>, RendererError> {
        let raw = self
            .gl
            .create_texture(image.width(), image.height(), image.as_raw())
            .map_err(RendererError::TextureCreation)?;
        let texture = Texture::new(raw, image);
        debug!(
            "Created {}x{} texture (translucent: {})",
            image.width(),
            image.height(),
            texture.is_translucent()
        );
        Ok(self.textures.insert(texture))
    }

    /// Frees `texture` on the GPU. Every copy of the handle stops resolving.
    pub fn delete_texture(&mut self, texture: TextureHandle<F>) -> Result<(), RendererError> {
        let texture = self
            .textures
            .remove(texture)
            .ok_or(RendererError::UnknownTexture)?;
        self.gl.delete_texture(texture.raw());
        Ok(())
    }

    /// Samples `texture` for subsequent retained draws.
    pub fn texture(&mut self, texture: TextureHandle<F>) -> Result<(), RendererError> {
        let texture = *self
            .textures
            .get(texture)
            .ok_or(RendererError::UnknownTexture)?;
        self.draw_mode = DrawMode::Texture;
        self.use_shader(ProgramKey::LIGHT)?;
        self.set_uniform(SPECULAR, UniformValue::Bool(false))?;
        self.set_uniform(IS_TEXTURE, UniformValue::Bool(true))?;
        self.set_uniform(SAMPLER, UniformValue::Sampler(texture.raw()))?;
        self.apply_blend(texture.is_translucent());
        Ok(())
    }

    /// Alpha below one turns on straight alpha blending and stops depth
    /// writes. Opaque colors turn both back.
    pub fn apply_color_blend(&mut self, color: Color) {
        self.apply_blend(!color.is_opaque());
    }

    fn apply_blend(&mut self, translucent: bool) {
        if translucent {
            self.gl.set_capability(Capability::Blend, true);
            self.gl
                .blend_func(BlendFactor::SrcAlpha, BlendFactor::OneMinusSrcAlpha);
            self.gl.depth_mask(false);
        } else {
            self.gl.set_capability(Capability::Blend, false);
            self.gl.depth_mask(true);
        }
        self.blending = translucent;
    }

    pub fn ambient_light(&mut self, color: impl Into<ColorArg>) -> Result<(), RendererError> {
        let color = color.into().resolve()?;
        self.ensure_light_shader()?;
        let capacity = self.light_capacity(AMBIENT_COLOR);
        self.lights.add_ambient(color.rgb(), capacity)?;
        self.upload_lights()
    }

    /// Adds a directional light shining along `direction`.
    pub fn directional_light(
        &mut self,
        color: impl Into<ColorArg>,
        direction: impl Into<LightVector>,
    ) -> Result<(), RendererError> {
        let color = color.into().resolve()?;
        let direction = direction.into().resolve()?;
        self.ensure_light_shader()?;
        let capacity = self.light_capacity(DIRECTIONAL_COLOR);
        self.lights.add_directional(color.rgb(), direction, capacity)?;
        self.upload_lights()
    }

    /// Adds a point light at `location`, given in view space.
    pub fn point_light(
        &mut self,
        color: impl Into<ColorArg>,
        location: impl Into<LightVector>,
    ) -> Result<(), RendererError> {
        let color = color.into().resolve()?;
        let location: Vec3 = location.into().resolve()?;
        self.ensure_light_shader()?;
        let capacity = self.light_capacity(POINT_COLOR);
        self.lights.add_point(color.rgb(), location, capacity)?;
        self.upload_lights()
    }

    fn ensure_light_shader(&mut self) -> Result<(), RendererError> {
        if self.current_shader == Some(ProgramKey::LIGHT) {
            return Ok(());
        }
        self.use_shader(ProgramKey::LIGHT)?;
        if self.draw_mode == DrawMode::Fill {
            let fill = self.fill_color;
            self.set_uniform(MATERIAL_COLOR, UniformValue::Vec4(fill.rgba()))?;
            self.set_uniform(IS_TEXTURE, UniformValue::Bool(false))?;
            self.set_uniform(SPECULAR, UniformValue::Bool(false))?;
        }
        Ok(())
    }

    fn light_capacity(&self, array: &str) -> usize {
        self.shaders
            .get(ProgramKey::LIGHT)
            .and_then(|program| program.uniform_capacity(array))
            .unwrap_or(0)
    }

    /// Writes the accumulated lights to the bound program. Programs without
    /// light uniforms ignore the writes.
    pub(crate) fn upload_lights(&mut self) -> Result<(), RendererError> {
        let Some(key) = self.current_shader else {
            return Ok(());
        };
        let counts = self.lights.counts();
        trace!("Uploading lights to {}: {:?}", key, counts);

        let arrays: [(&str, usize, &str, &[f32]); 5] = [
            (AMBIENT_COUNT, counts.ambient, AMBIENT_COLOR, self.lights.ambient_colors()),
            (
                DIRECTIONAL_COUNT,
                counts.directional,
                DIRECTIONAL_COLOR,
                self.lights.directional_colors(),
            ),
            (
                DIRECTIONAL_COUNT,
                counts.directional,
                DIRECTIONAL_DIRECTION,
                self.lights.directional_directions(),
            ),
            (POINT_COUNT, counts.point, POINT_COLOR, self.lights.point_colors()),
            (POINT_COUNT, counts.point, POINT_LOCATION, self.lights.point_locations()),
        ];
        for (count_name, count, array_name, data) in arrays {
            self.shaders.set_uniform(
                &mut self.gl,
                key,
                count_name,
                UniformValue::Int(count as i32),
            )?;
            if count > 0 {
                self.shaders
                    .set_uniform(&mut self.gl, key, array_name, UniformValue::Floats(data))?;
            }
        }
        self.shaders.set_uniform(
            &mut self.gl,
            key,
            USE_LIGHTING,
            UniformValue::Bool(counts.total() > 0),
        )
    }
}

// renderer/texture.rs

use image::RgbaImage;

use crate::error::RendererError;

/// A texture created by the renderer, plus what the material setup needs
/// to know about its pixels.
#[derive(Debug, Clone, Copy)]
pub struct Texture<T> {
    raw: T,
    width: u32,
    height: u32,
    translucent: bool,
}

impl<T: Copy> Texture<T> {
    pub(crate) fn new(raw: T, image: &RgbaImage) -> Self {
        Self {
            raw,
            width: image.width(),
            height: image.height(),
            translucent: image.pixels().any(|p| p[3] < 255),
        }
    }

    pub fn raw(&self) -> T {
        self.raw
    }

    pub fn size(&self) -> (u32, u32) {
        (self.width, self.height)
    }

    /// Any pixel with alpha below 255.
    pub fn is_translucent(&self) -> bool {
        self.translucent
    }
}

/// Decodes an encoded image (PNG) into RGBA8.
pub fn decode_rgba(bytes: &[u8]) -> Result<RgbaImage, RendererError> {
    let img = image::load_from_memory(bytes)
        .map_err(|e| RendererError::TextureCreation(format!("Failed to decode image: {}", e)))?;
    Ok(img.to_rgba8())
}

#[cfg(not(target_arch = "wasm32"))]
pub fn load_rgba(path: impl AsRef<std::path::Path>) -> Result<RgbaImage, RendererError> {
    let path = path.as_ref();
    log::info!("Loading texture: {:?}", path);
    let bytes = std::fs::read(path).map_err(|e| {
        RendererError::TextureCreation(format!("Failed to read {:?}: {}", path, e))
    })?;
    decode_rgba(&bytes)
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::Rgba;

    #[test]
    fn translucency_comes_from_alpha_channel() {
        let mut img = RgbaImage::from_pixel(2, 2, Rgba([10, 20, 30, 255]));
        assert!(!Texture::new(0u8, &img).is_translucent());
        img.put_pixel(1, 1, Rgba([0, 0, 0, 128]));
        let texture = Texture::new(0u8, &img);
        assert!(texture.is_translucent());
        assert_eq!(texture.size(), (2, 2));
    }

    #[test]
    fn png_round_trips_through_decoder() {
        let img = RgbaImage::from_pixel(3, 1, Rgba([1, 2, 3, 4]));
        let mut bytes = Vec::new();
        img.write_to(&mut std::io::Cursor::new(&mut bytes), image::ImageFormat::Png)
            .unwrap();
        let decoded = decode_rgba(&bytes).unwrap();
        assert_eq!(decoded.dimensions(), (3, 1));
        assert_eq!(decoded.get_pixel(2, 0), &Rgba([1, 2, 3, 4]));
    }

    #[test]
    fn garbage_is_a_texture_error() {
        assert!(matches!(
            decode_rgba(b"not an image"),
            Err(RendererError::TextureCreation(_))
        ));
    }
}

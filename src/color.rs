//! Color resolution for fill, stroke, material and light calls.
//!
//! Channel values are given in the 0..255 range and normalised to 0..1.

use crate::error::RendererError;

const MAX_CHANNEL: f32 = 255.0;

/// A normalised RGBA color, every channel in 0..1.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Color {
    rgba: [f32; 4],
}

impl Color {
    pub const BLACK: Self = Self::new(0.0, 0.0, 0.0, 1.0);
    pub const WHITE: Self = Self::new(1.0, 1.0, 1.0, 1.0);
    pub const TRANSPARENT: Self = Self::new(0.0, 0.0, 0.0, 0.0);

    pub const fn new(r: f32, g: f32, b: f32, a: f32) -> Self {
        Self { rgba: [r, g, b, a] }
    }

    /// Builds a color from 0..255 channel values, clamping out-of-range input.
    pub fn from_channels(r: f32, g: f32, b: f32, a: f32) -> Self {
        let n = |v: f32| v.clamp(0.0, MAX_CHANNEL) / MAX_CHANNEL;
        Self::new(n(r), n(g), n(b), n(a))
    }

    pub fn rgba(&self) -> [f32; 4] {
        self.rgba
    }

    pub fn rgb(&self) -> [f32; 3] {
        [self.rgba[0], self.rgba[1], self.rgba[2]]
    }

    pub fn alpha(&self) -> f32 {
        self.rgba[3]
    }

    pub fn is_opaque(&self) -> bool {
        self.rgba[3] >= 1.0
    }

    pub fn to_bytes(&self) -> [u8; 4] {
        self.rgba.map(|c| (c.clamp(0.0, 1.0) * MAX_CHANNEL).round() as u8)
    }
}

/// Every shape a color argument may take.
#[derive(Debug, Clone, PartialEq)]
pub enum ColorArg {
    Gray(f32),
    GrayAlpha(f32, f32),
    Rgb(f32, f32, f32),
    Rgba(f32, f32, f32, f32),
    Channels(Vec<f32>),
    Color(Color),
    Css(String),
}

impl ColorArg {
    pub fn resolve(&self) -> Result<Color, RendererError> {
        match self {
            ColorArg::Gray(v) => Ok(Color::from_channels(*v, *v, *v, MAX_CHANNEL)),
            ColorArg::GrayAlpha(v, a) => Ok(Color::from_channels(*v, *v, *v, *a)),
            ColorArg::Rgb(r, g, b) => Ok(Color::from_channels(*r, *g, *b, MAX_CHANNEL)),
            ColorArg::Rgba(r, g, b, a) => Ok(Color::from_channels(*r, *g, *b, *a)),
            ColorArg::Channels(values) => match values.as_slice() {
                [v] => ColorArg::Gray(*v).resolve(),
                [v, a] => ColorArg::GrayAlpha(*v, *a).resolve(),
                [r, g, b] => ColorArg::Rgb(*r, *g, *b).resolve(),
                [r, g, b, a] => ColorArg::Rgba(*r, *g, *b, *a).resolve(),
                other => Err(RendererError::InvalidColorArguments(format!(
                    "expected 1 to 4 channel values, got {}",
                    other.len()
                ))),
            },
            ColorArg::Color(color) => Ok(*color),
            ColorArg::Css(text) => parse_css(text),
        }
    }
}

impl From<f32> for ColorArg {
    fn from(v: f32) -> Self {
        ColorArg::Gray(v)
    }
}

impl From<(f32, f32)> for ColorArg {
    fn from((v, a): (f32, f32)) -> Self {
        ColorArg::GrayAlpha(v, a)
    }
}

impl From<(f32, f32, f32)> for ColorArg {
    fn from((r, g, b): (f32, f32, f32)) -> Self {
        ColorArg::Rgb(r, g, b)
    }
}

impl From<(f32, f32, f32, f32)> for ColorArg {
    fn from((r, g, b, a): (f32, f32, f32, f32)) -> Self {
        ColorArg::Rgba(r, g, b, a)
    }
}

impl From<[f32; 3]> for ColorArg {
    fn from([r, g, b]: [f32; 3]) -> Self {
        ColorArg::Rgb(r, g, b)
    }
}

impl From<[f32; 4]> for ColorArg {
    fn from([r, g, b, a]: [f32; 4]) -> Self {
        ColorArg::Rgba(r, g, b, a)
    }
}

impl From<&[f32]> for ColorArg {
    fn from(values: &[f32]) -> Self {
        ColorArg::Channels(values.to_vec())
    }
}

impl From<Color> for ColorArg {
    fn from(color: Color) -> Self {
        ColorArg::Color(color)
    }
}

impl From<&str> for ColorArg {
    fn from(text: &str) -> Self {
        ColorArg::Css(text.to_string())
    }
}

fn parse_css(text: &str) -> Result<Color, RendererError> {
    let trimmed = text.trim().to_ascii_lowercase();
    let invalid = || RendererError::InvalidColorArguments(format!("unrecognised color {:?}", text));

    if let Some(hex) = trimmed.strip_prefix('#') {
        return parse_hex(hex).ok_or_else(invalid);
    }

    if let Some(body) = trimmed
        .strip_prefix("rgba(")
        .or_else(|| trimmed.strip_prefix("rgb("))
        .and_then(|rest| rest.strip_suffix(')'))
    {
        let parts: Vec<f32> = body
            .split(',')
            .map(|p| p.trim().parse::<f32>())
            .collect::<Result<_, _>>()
            .map_err(|_| invalid())?;
        return match parts.as_slice() {
            [r, g, b] => Ok(Color::from_channels(*r, *g, *b, MAX_CHANNEL)),
            // css alpha is already 0..1
            [r, g, b, a] => Ok(Color::from_channels(*r, *g, *b, a * MAX_CHANNEL)),
            _ => Err(invalid()),
        };
    }

    named_color(&trimmed).ok_or_else(invalid)
}

fn parse_hex(hex: &str) -> Option<Color> {
    let nibble = |i: usize| u8::from_str_radix(&hex[i..i + 1], 16).ok().map(|v| v * 17);
    let byte = |i: usize| u8::from_str_radix(&hex[i..i + 2], 16).ok();
    if !hex.is_ascii() {
        return None;
    }

    let [r, g, b, a] = match hex.len() {
        3 => [nibble(0)?, nibble(1)?, nibble(2)?, 255],
        4 => [nibble(0)?, nibble(1)?, nibble(2)?, nibble(3)?],
        6 => [byte(0)?, byte(2)?, byte(4)?, 255],
        8 => [byte(0)?, byte(2)?, byte(4)?, byte(6)?],
        _ => return None,
    };
    Some(Color::from_channels(r as f32, g as f32, b as f32, a as f32))
}

fn named_color(name: &str) -> Option<Color> {
    let [r, g, b] = match name {
        "black" => [0, 0, 0],
        "white" => [255, 255, 255],
        "red" => [255, 0, 0],
        "lime" => [0, 255, 0],
        "green" => [0, 128, 0],
        "blue" => [0, 0, 255],
        "yellow" => [255, 255, 0],
        "cyan" | "aqua" => [0, 255, 255],
        "magenta" | "fuchsia" => [255, 0, 255],
        "gray" | "grey" => [128, 128, 128],
        "orange" => [255, 165, 0],
        "purple" => [128, 0, 128],
        "transparent" => return Some(Color::TRANSPARENT),
        _ => return None,
    };
    Some(Color::from_channels(r as f32, g as f32, b as f32, MAX_CHANNEL))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn resolve(arg: impl Into<ColorArg>) -> Color {
        arg.into().resolve().unwrap()
    }

    #[test]
    fn gray_expands_to_opaque_rgb() {
        assert_eq!(resolve(255.0), Color::WHITE);
        assert_eq!(resolve(0.0).rgba(), [0.0, 0.0, 0.0, 1.0]);
    }

    #[test]
    fn rgba_channels_are_normalised() {
        let c = resolve((255.0, 0.0, 0.0, 128.0));
        assert_eq!(c.rgb(), [1.0, 0.0, 0.0]);
        assert!((c.alpha() - 128.0 / 255.0).abs() < 1e-6);
        assert!(!c.is_opaque());
    }

    #[test]
    fn out_of_range_channels_clamp() {
        let c = resolve((300.0, -5.0, 255.0));
        assert_eq!(c.rgba(), [1.0, 0.0, 1.0, 1.0]);
    }

    #[test]
    fn slices_dispatch_on_length() {
        assert_eq!(resolve(&[10.0, 20.0, 30.0][..]), resolve((10.0, 20.0, 30.0)));
        let err = ColorArg::from(&[1.0, 2.0, 3.0, 4.0, 5.0][..]).resolve();
        assert!(matches!(err, Err(RendererError::InvalidColorArguments(_))));
        assert!(ColorArg::Channels(Vec::new()).resolve().is_err());
    }

    #[test]
    fn css_forms_resolve() {
        assert_eq!(resolve("#f00"), resolve((255.0, 0.0, 0.0)));
        assert_eq!(resolve("#00ff00"), resolve((0.0, 255.0, 0.0)));
        assert_eq!(resolve("#0000ff80").to_bytes(), [0, 0, 255, 128]);
        assert_eq!(resolve("rgb(1, 2, 3)"), resolve((1.0, 2.0, 3.0)));
        assert_eq!(resolve("rgba(0, 0, 0, 0.5)").to_bytes(), [0, 0, 0, 128]);
        assert_eq!(resolve(" White "), Color::WHITE);
    }

    #[test]
    fn unknown_css_is_rejected() {
        assert!(ColorArg::from("#12").resolve().is_err());
        assert!(ColorArg::from("chartreuse-ish").resolve().is_err());
        assert!(ColorArg::from("rgb(1,2)").resolve().is_err());
    }
}

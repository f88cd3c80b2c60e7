use bitflags::bitflags;
use log::{info, warn};
use serde::{Deserialize, Serialize};

bitflags! {
    /// Individual drawing-buffer creation flags, for flipping one at a time.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
    pub struct ContextAttribute: u8 {
        const ALPHA = 1 << 0;
        const DEPTH = 1 << 1;
        const STENCIL = 1 << 2;
        const ANTIALIAS = 1 << 3;
        const PREMULTIPLIED_ALPHA = 1 << 4;
        const PRESERVE_DRAWING_BUFFER = 1 << 5;
    }
}

/// Flags the GL context is created with. Changing any of them requires a
/// brand new context.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ContextAttributes {
    #[serde(default = "enabled")]
    pub alpha: bool,
    #[serde(default = "enabled")]
    pub depth: bool,
    #[serde(default = "enabled")]
    pub stencil: bool,
    #[serde(default)]
    pub antialias: bool,
    #[serde(default)]
    pub premultiplied_alpha: bool,
    #[serde(default = "enabled")]
    pub preserve_drawing_buffer: bool,
}

const fn enabled() -> bool {
    true
}

impl Default for ContextAttributes {
    fn default() -> Self {
        Self {
            alpha: true,
            depth: true,
            stencil: true,
            antialias: false,
            premultiplied_alpha: false,
            preserve_drawing_buffer: true,
        }
    }
}

impl ContextAttributes {
    pub fn load() -> Self {
        #[cfg(target_arch = "wasm32")]
        {
            info!("Using default context attributes for WebAssembly build");
            return Self::default();
        }

        #[cfg(not(target_arch = "wasm32"))]
        {
            Self::load_from_path("context.json")
        }
    }

    #[cfg(not(target_arch = "wasm32"))]
    pub fn load_from_path<P: AsRef<std::path::Path>>(path: P) -> Self {
        use std::fs;

        let path = path.as_ref();
        match fs::read_to_string(path) {
            Ok(contents) => match serde_json::from_str::<ContextAttributes>(&contents) {
                Ok(attributes) => {
                    info!("Loaded context attributes from {:?}", path);
                    attributes.validate()
                }
                Err(err) => {
                    warn!(
                        "Failed to parse {:?} ({}). Falling back to default context attributes.",
                        path, err
                    );
                    ContextAttributes::default()
                }
            },
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => {
                info!(
                    "Context attributes file {:?} not found. Using defaults.",
                    path
                );
                ContextAttributes::default()
            }
            Err(err) => {
                warn!(
                    "Failed to read {:?} ({}). Falling back to default context attributes.",
                    path, err
                );
                ContextAttributes::default()
            }
        }
    }

    pub fn validate(mut self) -> Self {
        if self.premultiplied_alpha && !self.alpha {
            warn!("premultiplied_alpha has no effect without an alpha channel. Disabling it.");
            self.premultiplied_alpha = false;
        }
        self
    }

    pub fn flags(&self) -> ContextAttribute {
        let mut flags = ContextAttribute::empty();
        flags.set(ContextAttribute::ALPHA, self.alpha);
        flags.set(ContextAttribute::DEPTH, self.depth);
        flags.set(ContextAttribute::STENCIL, self.stencil);
        flags.set(ContextAttribute::ANTIALIAS, self.antialias);
        flags.set(ContextAttribute::PREMULTIPLIED_ALPHA, self.premultiplied_alpha);
        flags.set(
            ContextAttribute::PRESERVE_DRAWING_BUFFER,
            self.preserve_drawing_buffer,
        );
        flags
    }

    pub fn from_flags(flags: ContextAttribute) -> Self {
        Self {
            alpha: flags.contains(ContextAttribute::ALPHA),
            depth: flags.contains(ContextAttribute::DEPTH),
            stencil: flags.contains(ContextAttribute::STENCIL),
            antialias: flags.contains(ContextAttribute::ANTIALIAS),
            premultiplied_alpha: flags.contains(ContextAttribute::PREMULTIPLIED_ALPHA),
            preserve_drawing_buffer: flags.contains(ContextAttribute::PRESERVE_DRAWING_BUFFER),
        }
    }

    /// Returns a copy with `attribute` switched on or off.
    pub fn with(self, attribute: ContextAttribute, value: bool) -> Self {
        let mut flags = self.flags();
        flags.set(attribute, value);
        Self::from_flags(flags).validate()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_sketch_canvas() {
        let attrs = ContextAttributes::default();
        assert!(attrs.alpha && attrs.depth && attrs.stencil);
        assert!(!attrs.antialias);
        assert!(!attrs.premultiplied_alpha);
        assert!(attrs.preserve_drawing_buffer);
    }

    #[test]
    fn flags_round_trip_through_struct() {
        let attrs = ContextAttributes {
            antialias: true,
            stencil: false,
            ..ContextAttributes::default()
        };
        assert_eq!(ContextAttributes::from_flags(attrs.flags()), attrs);
    }

    #[test]
    fn with_flips_single_flag() {
        let attrs = ContextAttributes::default().with(ContextAttribute::ANTIALIAS, true);
        assert!(attrs.antialias);
        assert!(attrs.depth);
    }

    #[test]
    fn validate_drops_premultiplied_without_alpha() {
        let attrs = ContextAttributes {
            alpha: false,
            premultiplied_alpha: true,
            ..ContextAttributes::default()
        }
        .validate();
        assert!(!attrs.premultiplied_alpha);
    }

    #[test]
    fn missing_fields_use_defaults() {
        let attrs: ContextAttributes = serde_json::from_str(r#"{ "antialias": true }"#).unwrap();
        assert!(attrs.antialias);
        assert!(attrs.alpha);
        assert!(attrs.preserve_drawing_buffer);
    }

    #[test]
    fn missing_file_falls_back_to_defaults() {
        let attrs = ContextAttributes::load_from_path("does/not/exist/context.json");
        assert_eq!(attrs, ContextAttributes::default());
    }
}

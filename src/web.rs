//! Browser glue: a [`GlowFactory`] drawing into an HTML canvas.

use std::cell::RefCell;
use std::rc::Rc;

use wasm_bindgen::{JsCast, JsValue};
use web_sys::{HtmlCanvasElement, WebGl2RenderingContext};

use crate::renderer::glow_backend::GlowFactory;
use crate::settings::ContextAttributes;

fn context_options(attributes: &ContextAttributes) -> Result<js_sys::Object, String> {
    let options = js_sys::Object::new();
    for (key, value) in [
        ("alpha", attributes.alpha),
        ("depth", attributes.depth),
        ("stencil", attributes.stencil),
        ("antialias", attributes.antialias),
        ("premultipliedAlpha", attributes.premultiplied_alpha),
        ("preserveDrawingBuffer", attributes.preserve_drawing_buffer),
    ] {
        js_sys::Reflect::set(&options, &JsValue::from_str(key), &JsValue::from_bool(value))
            .map_err(|e| format!("Failed to set context option {}: {:?}", key, e))?;
    }
    Ok(options)
}

/// A canvas only ever hands out one context, so every context after the
/// first is created on a fresh canvas that replaces the old element.
fn replace_canvas(old: &HtmlCanvasElement) -> Result<HtmlCanvasElement, String> {
    let document = old
        .owner_document()
        .ok_or_else(|| "canvas is not attached to a document".to_string())?;
    let fresh = document
        .create_element("canvas")
        .map_err(|e| format!("Failed to create canvas: {:?}", e))?
        .dyn_into::<HtmlCanvasElement>()
        .map_err(|_| "created element is not a canvas".to_string())?;
    fresh.set_id(&old.id());
    if let Some(parent) = old.parent_node() {
        parent
            .replace_child(&fresh, old)
            .map_err(|e| format!("Failed to replace canvas: {:?}", e))?;
    }
    Ok(fresh)
}

impl GlowFactory {
    pub fn from_canvas(canvas: HtmlCanvasElement) -> Self {
        let canvas = Rc::new(RefCell::new(canvas));
        let resize_canvas = Rc::clone(&canvas);
        let mut created = false;

        GlowFactory::new(move |attributes, width, height| {
            let mut canvas = canvas.borrow_mut();
            if created {
                let fresh = replace_canvas(&canvas)?;
                *canvas = fresh;
            }
            canvas.set_width(width);
            canvas.set_height(height);

            let options = context_options(attributes)?;
            let context = canvas
                .get_context_with_context_options("webgl2", &options)
                .map_err(|e| format!("getContext failed: {:?}", e))?
                .ok_or_else(|| "WebGL2 is not available".to_string())?
                .dyn_into::<WebGl2RenderingContext>()
                .map_err(|_| "context is not a WebGl2RenderingContext".to_string())?;
            created = true;
            log::info!("Created WebGL2 context on a {}x{} canvas", width, height);
            Ok(glow::Context::from_webgl2_context(context))
        })
        .with_resize(move |width, height| {
            let canvas = resize_canvas.borrow();
            canvas.set_width(width);
            canvas.set_height(height);
        })
    }
}

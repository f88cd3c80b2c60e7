use sketch_gl::renderer::{HeadlessFactory, Primitive};
use sketch_gl::{ContextAttributes, Renderer, RendererError};

const WIDTH: u32 = 400;
const HEIGHT: u32 = 300;

/// Draws one lit frame into a headless context and logs what was submitted.
fn run() -> Result<(), RendererError> {
    let attributes = ContextAttributes::load();
    let mut renderer = Renderer::new(HeadlessFactory::new(), WIDTH, HEIGHT, attributes)?;

    renderer.begin_frame();
    renderer.background(30.0)?;
    renderer.ambient_light((60.0, 60.0, 60.0))?;
    renderer.directional_light((255.0, 255.0, 255.0), (0.0, 0.0, -1.0))?;
    renderer.point_light("orange", (0.0, 0.0, 200.0))?;

    renderer.push();
    renderer.translate(-80.0, 0.0, 0.0);
    renderer.rotate_y(0.6);
    renderer.specular_material((250.0, 120.0, 120.0))?;
    renderer.draw_box(80.0, 80.0, 80.0)?;
    renderer.pop()?;

    renderer.push();
    renderer.translate(80.0, 0.0, 0.0);
    renderer.ambient_material((120.0, 120.0, 250.0, 128.0))?;
    renderer.draw_sphere(50.0, 24, 16)?;
    renderer.pop()?;

    renderer.no_fill()?;
    renderer.stroke("white")?;
    renderer.draw_plane(300.0, 200.0)?;

    renderer.fill((255.0, 255.0, 0.0))?;
    renderer.begin_shape(Primitive::Triangles)?;
    renderer.vertex(-20.0, -20.0, 0.0);
    renderer.vertex(20.0, -20.0, 0.0);
    renderer.vertex(0.0, 20.0, 0.0);
    renderer.end_shape()?;

    let stats = renderer.gl().stats();
    log::info!(
        "Frame done: {} draw calls, {} programs linked, {} program switches, {} GL errors",
        renderer.gl().draws().len(),
        stats.programs_linked,
        stats.program_switches,
        stats.errors
    );
    log::info!("Lights this frame: {:?}", renderer.light_counts());
    log::info!("Center pixel: {:?}", renderer.get_pixel(WIDTH as i32 / 2, HEIGHT as i32 / 2));
    Ok(())
}

#[cfg(not(target_arch = "wasm32"))]
fn main() {
    sketch_gl::init_logging();
    if let Err(err) = run() {
        log::error!("Demo frame failed: {err}");
        std::process::exit(1);
    }
}

#[cfg(target_arch = "wasm32")]
fn main() {}

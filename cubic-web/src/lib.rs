//! CuBiC in the browser
//!
//! Boots a full-window WebGL2 canvas, the `#info` overlay and an "Enter VR"
//! button, then forwards DOM and WebXR input to [`cubic::CubicCore`] and
//! executes the commands it returns.

mod controllers;
mod dom;
mod error;
mod gl;
mod input;
mod shell;
mod xr;

pub use error::{Result, WebError};

use cubic::CubicCore;
use cubic_protocol::{Event, InitEvent, LifecycleEvent, Platform};
use shell::{WebApp, WebShell};
use std::cell::RefCell;
use std::rc::Rc;
use wasm_bindgen::prelude::*;
use wasm_bindgen::JsCast;
use web_sys::Window;

type FlatCallback = Closure<dyn FnMut(f64)>;

#[wasm_bindgen(start)]
pub fn main() {
    std::panic::set_hook(Box::new(console_error_panic_hook::hook));
    if let Err(e) = console_log::init_with_level(log::Level::Info) {
        web_sys::console::error_1(&format!("Failed to initialize logger: {}", e).into());
    }

    log::info!("CuBiC starting...");
    wasm_bindgen_futures::spawn_local(async {
        if let Err(e) = run().await {
            log::error!("Error: {}", e);
        }
    });
}

async fn run() -> Result<()> {
    let window = web_sys::window().ok_or(WebError::Missing("window"))?;
    let document = window.document().ok_or(WebError::Missing("document"))?;

    let config = dom::read_config(&document)?;
    let canvas = dom::create_canvas(&document)?;
    let (width, height, dpr) = dom::fit_canvas(&window, &canvas)?;
    let renderer = gl::GlRenderer::new(gl::create_context(&canvas)?)?;
    let info = dom::info_panel(&document)?;

    let xr_supported = xr::is_supported(&window).await;
    let vr_button = dom::vr_button(&document, xr_supported)?;

    log::info!(
        "Canvas {}x{} (dpr {}), immersive VR supported: {}",
        width,
        height,
        dpr,
        xr_supported
    );

    let app = Rc::new(RefCell::new(WebApp::new(
        CubicCore::new(&config),
        WebShell::new(renderer, canvas, info, vr_button),
    )));

    app.borrow_mut()
        .send(Event::Lifecycle(LifecycleEvent::Init(InitEvent {
            platform: Platform::WebGL,
            viewport_width: width,
            viewport_height: height,
            dpr: dpr as f32,
            xr_supported,
        })));

    input::install(&window, &app)?;
    start_render_loop(&window, app)?;

    log::info!("CuBiC initialized");
    Ok(())
}

/// Window animation frames drive the flat view; they are skipped while an
/// immersive session supplies its own.
fn start_render_loop(window: &Window, app: Rc<RefCell<WebApp>>) -> Result<()> {
    let callback: Rc<RefCell<Option<FlatCallback>>> = Rc::new(RefCell::new(None));
    let next = callback.clone();
    let scheduler = window.clone();

    *callback.borrow_mut() = Some(Closure::new(move |time: f64| {
        {
            let mut app = app.borrow_mut();
            if !app.shell.xr_active() {
                app.tick(time);
            }
        }
        if let Some(callback) = next.borrow().as_ref() {
            if let Err(e) = scheduler.request_animation_frame(callback.as_ref().unchecked_ref()) {
                log::error!("requestAnimationFrame failed: {:?}", e);
            }
        }
    }));

    if let Some(callback) = callback.borrow().as_ref() {
        window.request_animation_frame(callback.as_ref().unchecked_ref())?;
    }
    Ok(())
}
